use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use serde_json::json;
use seo_core::{ApiConfig, Image, ImagePage, ListEnvelope, PageQuery, RawImage, alt_text_url, images_url};
use tracing::debug;

use crate::error::{ConfigError, FetchError, parse_retry_after};

/// Remote collection of storefront images.
pub trait ImageSource: Send + Sync + 'static {
    fn list(&self, query: &PageQuery) -> impl Future<Output = Result<ImagePage, FetchError>> + Send;

    fn update_alt_text(
        &self,
        id: &str,
        alt_text: Option<&str>,
    ) -> impl Future<Output = Result<Image, FetchError>> + Send;
}

#[derive(Debug)]
pub struct HttpImageSource {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    ok: bool,
    image: Option<RawImage>,
    error: Option<String>,
}

impl HttpImageSource {
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        let auth_token = Some(config.auth_token.trim().to_string()).filter(|token| !token.is_empty());
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            auth_token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl ImageSource for HttpImageSource {
    async fn list(&self, query: &PageQuery) -> Result<ImagePage, FetchError> {
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        debug!(?params, "GET images");

        let request = self.client.get(images_url(&self.base_url)).query(&params);
        let response = check_status(self.authorize(request).send().await?).await?;
        let envelope: ListEnvelope = response.json().await?;
        if !envelope.ok {
            return Err(FetchError::Status {
                status: StatusCode::OK.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| "image list request failed".to_string()),
            });
        }
        Ok(envelope.into_page(query))
    }

    async fn update_alt_text(&self, id: &str, alt_text: Option<&str>) -> Result<Image, FetchError> {
        debug!(%id, "POST alt text");
        let request = self
            .client
            .post(alt_text_url(&self.base_url, id))
            .json(&json!({ "altText": alt_text }));
        let response = check_status(self.authorize(request).send().await?).await?;
        let body: UpdateResponse = response.json().await?;
        match body.image {
            Some(image) if body.ok => Ok(image.into_image()),
            _ => Err(FetchError::Status {
                status: StatusCode::OK.as_u16(),
                message: body
                    .error
                    .unwrap_or_else(|| "alt text update failed".to_string()),
            }),
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok());
        return Err(FetchError::RateLimited {
            retry_after_secs: parse_retry_after(retry_after),
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    Err(FetchError::Status {
        status: status.as_u16(),
        message,
    })
}
