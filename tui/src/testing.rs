use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use seo_core::{Image, ImagePage, PageQuery};
use tokio::sync::Notify;

use crate::api::ImageSource;
use crate::error::FetchError;
use crate::fetcher::lock;

const MOCK_TOTAL: u64 = 100;

/// In-memory source with 100 images (`id` = position, alt text
/// `"Image {id}"`). Requests for a gated offset wait until the gate is
/// notified.
#[derive(Default)]
pub struct MockSource {
    calls: Mutex<Vec<PageQuery>>,
    gates: Mutex<HashMap<u64, Arc<Notify>>>,
    failure: Mutex<Option<fn() -> FetchError>>,
    server_max_limit: Option<u32>,
    saves: Mutex<Vec<(String, Option<String>)>>,
    fail_saves: Mutex<bool>,
}

impl MockSource {
    pub fn gate(&self, offset: u64) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        lock(&self.gates).insert(offset, Arc::clone(&notify));
        notify
    }

    pub fn failing(self, failure: fn() -> FetchError) -> Self {
        self.set_failure(Some(failure));
        self
    }

    pub fn with_server_max_limit(mut self, limit: u32) -> Self {
        self.server_max_limit = Some(limit);
        self
    }

    pub fn set_failure(&self, failure: Option<fn() -> FetchError>) {
        *lock(&self.failure) = failure;
    }

    pub fn set_fail_saves(&self, fail: bool) {
        *lock(&self.fail_saves) = fail;
    }

    pub fn calls(&self) -> Vec<PageQuery> {
        lock(&self.calls).clone()
    }

    pub fn saves(&self) -> Vec<(String, Option<String>)> {
        lock(&self.saves).clone()
    }
}

impl ImageSource for MockSource {
    async fn list(&self, query: &PageQuery) -> Result<ImagePage, FetchError> {
        lock(&self.calls).push(query.clone());
        let gate = lock(&self.gates).get(&query.offset).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failure = *lock(&self.failure);
        if let Some(failure) = failure {
            return Err(failure());
        }

        let limit = match self.server_max_limit {
            Some(max) => query.limit.min(max),
            None => query.limit,
        };
        let end = (query.offset + u64::from(limit)).min(MOCK_TOTAL);
        let images = (query.offset..end)
            .map(|idx| Image::new(idx.to_string(), Some(&format!("Image {idx}"))))
            .collect();
        Ok(ImagePage {
            images,
            total: MOCK_TOTAL,
            offset: query.offset,
            limit,
        })
    }

    async fn update_alt_text(&self, id: &str, alt_text: Option<&str>) -> Result<Image, FetchError> {
        lock(&self.saves).push((id.to_string(), alt_text.map(str::to_string)));
        if *lock(&self.fail_saves) {
            return Err(FetchError::Status {
                status: 500,
                message: "save rejected".to_string(),
            });
        }
        Ok(Image::new(id, alt_text))
    }
}
