mod image;
mod lint;
mod paging;
mod undo;
mod view;

use serde::{Deserialize, Serialize};

pub use image::{CatalogFile, Image, ImagePage, ListEnvelope, RawImage};
pub use lint::{
    LONG_ALT_THRESHOLD, LintCounts, LintReport, LintResult, LintStatus, NEAR_DUPLICATE_THRESHOLD,
    SHORT_ALT_THRESHOLD, classify, find_duplicates, find_near_duplicates, normalize_alt, similarity,
};
pub use paging::{
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, MIN_PAGE_LIMIT, PagePosition, PageQuery, clamp_limit,
    page_position,
};
pub use undo::UndoBuffer;
pub use view::{LintFilter, SortMode, visible_images};

pub const API_PREFIX: &str = "/api/image-alt-media-seo";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    pub page_size: u32,
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_token: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_LIMIT,
            debounce_ms: 420,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787".to_string(),
            auth_token: String::new(),
        }
    }
}

pub fn images_url(base_url: &str) -> String {
    format!("{}{API_PREFIX}/images", base_url.trim_end_matches('/'))
}

pub fn alt_text_url(base_url: &str, id: &str) -> String {
    format!("{}/{id}/alt-text", images_url(base_url))
}
