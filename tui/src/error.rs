use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Superseded by a newer request; never shown to the user.
    #[error("request cancelled")]
    Cancelled,

    #[error("{}", rate_limit_message(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Cancelled => None,
            FetchError::RateLimited { .. } => Some(429),
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport(err) => err.status().map(|status| status.as_u16()),
        }
    }
}

fn rate_limit_message(retry_after_secs: &Option<u64>) -> String {
    match *retry_after_secs {
        Some(secs) => format!("Rate limit exceeded. Please wait {secs}s and retry."),
        None => "Rate limit exceeded. Please wait a minute and retry.".to_string(),
    }
}

/// Only the delta-seconds form of `Retry-After` is understood.
pub fn parse_retry_after(value: Option<&str>) -> Option<u64> {
    value.and_then(|raw| raw.trim().parse().ok())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
