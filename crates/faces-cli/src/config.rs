//! Application configuration management.
//!
//! Settings for where the site and cache live, which origin the site is
//! deployed to, and how much to fetch. Stored at
//! `~/.config/github-faces/config.json`; every field has a default so the
//! file is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use faces_core::api::client::API_BASE_URL;
use faces_core::pipeline::{DEFAULT_REQUEST_DELAY, DEFAULT_TARGET_USERS};
use faces_core::site::{SiteOptions, DEFAULT_DESCRIPTION, DEFAULT_TITLE};
use faces_core::FetchOptions;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "github-faces";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_SITE_DIR: &str = "./docs";
const DEFAULT_BASE_URL: &str = "https://john-bampton.github.io";
const DEFAULT_CACHE_MAX_AGE_HOURS: i64 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site_dir: PathBuf,
    /// Defaults to the platform cache directory
    pub cache_dir: Option<PathBuf>,
    pub base_url: String,
    pub api_base_url: String,
    pub title: String,
    pub description: String,
    pub target_users: usize,
    pub request_delay_ms: u64,
    /// A cached fetch younger than this is reused
    pub cache_max_age_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_dir: PathBuf::from(DEFAULT_SITE_DIR),
            cache_dir: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            target_users: DEFAULT_TARGET_USERS,
            request_delay_ms: DEFAULT_REQUEST_DELAY.as_millis() as u64,
            cache_max_age_hours: DEFAULT_CACHE_MAX_AGE_HOURS,
        }
    }
}

impl Config {
    /// Load from `path`, or the default location when `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn cache_max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_max_age_hours)
    }

    pub fn site_options(&self) -> SiteOptions {
        let mut options = SiteOptions::new(&self.site_dir, &self.base_url);
        options.title = self.title.clone();
        options.description = self.description.clone();
        options
    }

    pub fn fetch_options(&self) -> FetchOptions {
        let mut options = FetchOptions::new(&self.site_dir);
        options.target_users = self.target_users;
        options.request_delay = Duration::from_millis(self.request_delay_ms);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(config.target_users, 400);
        assert_eq!(config.site_dir, PathBuf::from("./docs"));
        assert_eq!(config.base_url, "https://john-bampton.github.io");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "target_users": 50, "cache_dir": "/tmp/faces" }"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.target_users, 50);
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/faces"));
        assert_eq!(config.request_delay_ms, 150);
        assert_eq!(config.fetch_options().target_users, 50);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
