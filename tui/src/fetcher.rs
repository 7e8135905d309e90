//! Paginated image list fetching with at most one request in flight.
//!
//! Every call to [`ImageListFetcher::fetch_page`] opens a new session and
//! cancels the previous one, so a slow response can never overwrite the
//! result of a newer request. Cancelled sessions end as
//! [`FetchOutcome::Aborted`] and leave the list state untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use seo_core::{Image, ImagePage, PageQuery, clamp_limit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ImageSource;
use crate::error::FetchError;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub images: Vec<Image>,
    pub total: u64,
    pub offset: u64,
    pub limit: u32,
    pub search: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    /// Bumped on every change to `images`.
    pub revision: u64,
    /// Bumped on every failed fetch, even when `error` repeats.
    pub failures: u64,
}

impl ListState {
    fn apply(&mut self, page: ImagePage, search: Option<String>) {
        self.images = page.images;
        self.total = page.total;
        self.offset = page.offset;
        self.limit = page.limit;
        self.search = search;
        self.error = None;
        self.revision += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { total: u64, offset: u64, limit: u32 },
    Aborted,
    Failed(String),
}

#[derive(Debug)]
struct FetchSession {
    id: u64,
    token: CancellationToken,
}

pub struct ImageListFetcher<S> {
    source: Arc<S>,
    state: Mutex<ListState>,
    session: Mutex<Option<FetchSession>>,
    next_session: AtomicU64,
}

impl<S: ImageSource> ImageListFetcher<S> {
    pub fn new(source: S, page_size: u32) -> Self {
        Self {
            source: Arc::new(source),
            state: Mutex::new(ListState {
                limit: clamp_limit(page_size),
                ..ListState::default()
            }),
            session: Mutex::new(None),
            next_session: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn snapshot(&self) -> ListState {
        lock(&self.state).clone()
    }

    pub fn current_query(&self) -> PageQuery {
        let state = lock(&self.state);
        PageQuery::new(state.offset, state.limit, state.search.clone())
    }

    pub async fn fetch_page(&self, offset: u64, limit: u32, search: Option<String>) -> FetchOutcome {
        let query = PageQuery::new(offset, limit, search);
        let (id, token) = self.begin_session();
        let _loading = LoadingGuard { fetcher: self, id };
        debug!(session = id, ?query, "fetching image page");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(FetchError::Cancelled),
            result = self.source.list(&query) => result,
        };
        self.finish(id, query, result)
    }

    /// Re-issues the last applied query; the manual retry path.
    pub async fn refresh(&self) -> FetchOutcome {
        let query = self.current_query();
        self.fetch_page(query.offset, query.limit, query.search).await
    }

    /// Local optimistic edit. Returns the previous alt text, or `None` when
    /// the image is not on the current page.
    pub fn patch_alt_text(&self, id: &str, alt_text: Option<String>) -> Option<Option<String>> {
        let mut state = lock(&self.state);
        let image = state.images.iter_mut().find(|image| image.id == id)?;
        let previous = std::mem::replace(&mut image.alt_text, alt_text);
        state.revision += 1;
        Some(previous)
    }

    fn begin_session(&self) -> (u64, CancellationToken) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        let previous = lock(&self.session).replace(FetchSession {
            id,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            debug!(session = previous.id, superseded_by = id, "cancelling in-flight fetch");
            previous.token.cancel();
        }
        lock(&self.state).loading = true;
        (id, token)
    }

    fn finish(
        &self,
        id: u64,
        query: PageQuery,
        result: Result<ImagePage, FetchError>,
    ) -> FetchOutcome {
        // Holding the session slot while applying orders us against any
        // fetch that starts concurrently.
        let session = lock(&self.session);
        let current = session.as_ref().is_some_and(|session| session.id == id);

        match result {
            Err(FetchError::Cancelled) => FetchOutcome::Aborted,
            _ if !current => FetchOutcome::Aborted,
            Ok(page) => {
                let (total, offset, limit) = (page.total, page.offset, page.limit);
                lock(&self.state).apply(page, query.search);
                debug!(session = id, total, offset, limit, "image page applied");
                FetchOutcome::Applied { total, offset, limit }
            }
            Err(err) => {
                let message = err.to_string();
                warn!(session = id, status = ?err.status(), "image list fetch failed: {message}");
                let mut state = lock(&self.state);
                state.error = Some(message.clone());
                state.failures += 1;
                FetchOutcome::Failed(message)
            }
        }
    }
}

/// Clears `loading` on every exit path of the session that is still current,
/// including when the fetch future is dropped mid-flight.
struct LoadingGuard<'a, S> {
    fetcher: &'a ImageListFetcher<S>,
    id: u64,
}

impl<S> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        let mut session = lock(&self.fetcher.session);
        if session.as_ref().is_some_and(|session| session.id == self.id) {
            *session = None;
            lock(&self.fetcher.state).loading = false;
        }
    }
}
