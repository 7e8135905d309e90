use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use seo_core::{ApiConfig, ListConfig};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub list: ListConfig,
}

impl ConfigFile {
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ALT_SEO_API_URL").filter(|url| !url.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        if let Some(token) = lookup("ALT_SEO_API_TOKEN") {
            self.api.auth_token = token;
        }
    }
}

pub fn config_dir() -> PathBuf {
    ProjectDirs::from("com", "altseo", "Alt Text SEO")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Reads `path`, writing the defaults there first when it does not exist.
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    if path.exists() {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    } else {
        let cfg = ConfigFile::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(&cfg)?)?;
        Ok(cfg)
    }
}
