//! Catalog server for the image alt text admin.
//!
//! Serves a JSON image catalog over the paginated list contract used by the
//! admin client, plus alt text updates and a per-page lint summary.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{Next, from_fn},
    response::Response,
    routing::{get, post},
};
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::info;

mod api;
pub mod catalog;
pub mod config;
pub mod error;

use crate::catalog::Catalog;
use crate::error::ApiError;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct AppState {
    catalog: RwLock<Catalog>,
    limiter: Option<Limiter>,
}

impl AppState {
    pub fn new(catalog: Catalog, rate_limit_per_minute: Option<NonZeroU32>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            limiter: rate_limit_per_minute.map(|rate| RateLimiter::direct(Quota::per_minute(rate))),
        }
    }

    fn check_rate(&self) -> Result<(), ApiError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        limiter.check().map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            ApiError::RateLimited {
                retry_after_secs: wait.as_secs_f64().ceil().max(1.0) as u64,
            }
        })
    }
}

pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    let prefix = seo_core::API_PREFIX;
    Router::new()
        .route("/health", get(api::health))
        .route(&format!("{prefix}/images"), get(api::list_images))
        .route(
            &format!("{prefix}/images/:id/alt-text"),
            post(api::update_alt_text),
        )
        .route(&format!("{prefix}/lint"), get(api::lint_page))
        .with_state(state)
        .layer(from_fn(log_request))
        .layer(cors)
}

async fn log_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;
    info!("{} {} -> {}", method, uri, response.status());
    response
}
