use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::paging::PageQuery;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Image {
    pub fn new(id: impl Into<String>, alt_text: Option<&str>) -> Self {
        Self {
            id: id.into(),
            url: None,
            alt_text: alt_text.map(str::to_string),
            created_at: None,
            score: None,
        }
    }

    pub fn alt(&self) -> &str {
        self.alt_text.as_deref().unwrap_or("")
    }
}

/// Image record as it arrives over the wire.
///
/// Storefront payloads are loosely typed: ids may be numbers, the alt text
/// may live under any of several keys and timestamps may be strings or epoch
/// millis. [`RawImage::into_image`] is the only place these are reconciled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "altText")]
    alt_text: Option<String>,
    #[serde(default)]
    alt: Option<String>,
    #[serde(default)]
    alttext: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, rename = "createdAt")]
    created_at: Value,
    #[serde(default)]
    score: Option<f64>,
}

impl RawImage {
    pub fn into_image(self) -> Image {
        let id = match self.id {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            _ => String::new(),
        };
        let alt_text = self
            .alt_text
            .or(self.alt)
            .or(self.alttext)
            .or(self.content);
        Image {
            id,
            url: self.url,
            alt_text,
            created_at: parse_timestamp(&self.created_at),
            score: self.score,
        }
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(millis) => millis
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePage {
    pub images: Vec<Image>,
    pub total: u64,
    pub offset: u64,
    pub limit: u32,
}

/// Response body of the image list endpoint, success or failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListEnvelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub images: Vec<RawImage>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ListEnvelope {
    /// Server-reported paging wins; the request only fills gaps.
    pub fn into_page(self, requested: &PageQuery) -> ImagePage {
        let images: Vec<Image> = self.images.into_iter().map(RawImage::into_image).collect();
        let total = self.total.unwrap_or(images.len() as u64);
        ImagePage {
            total,
            offset: self.offset.unwrap_or(requested.offset),
            limit: self.limit.unwrap_or(requested.limit),
            images,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CatalogFile {
    Wrapped { images: Vec<RawImage> },
    Bare(Vec<RawImage>),
}

impl CatalogFile {
    pub fn parse(content: &str) -> serde_json::Result<Vec<Image>> {
        let file: CatalogFile = serde_json::from_str(content)?;
        let raw = match file {
            CatalogFile::Wrapped { images } => images,
            CatalogFile::Bare(images) => images,
        };
        Ok(raw.into_iter().map(RawImage::into_image).collect())
    }
}
