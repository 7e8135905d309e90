use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::ConfigError;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub catalog_path: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    /// `None` disables rate limiting.
    pub rate_limit_per_minute: Option<NonZeroU32>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let allowed_origins = lookup("ALLOWED_ORIGIN")
            .unwrap_or_default()
            .split(',')
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();

        let rate_limit_per_minute = match lookup("RATE_LIMIT_PER_MINUTE") {
            Some(raw) => {
                let value: u32 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "RATE_LIMIT_PER_MINUTE",
                    value: raw.clone(),
                })?;
                NonZeroU32::new(value)
            }
            None => NonZeroU32::new(DEFAULT_RATE_LIMIT_PER_MINUTE),
        };

        Ok(Self {
            bind_addr,
            catalog_path: lookup("CATALOG_PATH").map(PathBuf::from),
            allowed_origins,
            rate_limit_per_minute,
        })
    }

    pub fn cors_layer(&self) -> Result<CorsLayer, ConfigError> {
        if self.allowed_origins.is_empty() {
            return Ok(CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any));
        }
        let origins = self
            .allowed_origins
            .iter()
            .map(|origin| {
                origin.parse::<HeaderValue>().map_err(|_| ConfigError::Invalid {
                    name: "ALLOWED_ORIGIN",
                    value: origin.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any))
    }
}
