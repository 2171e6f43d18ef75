//! Console configuration.
//!
//! Holds the API base URL, list page size, request timeout and hub cache
//! lifetime. Stored at `~/.config/agromech/config.json`; `AGROMECH_API_URL`
//! and `AGROMECH_TOKEN` override the file at runtime.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_PER_PAGE;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "agromech";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const API_URL_ENV: &str = "AGROMECH_API_URL";
pub const TOKEN_ENV: &str = "AGROMECH_TOKEN";

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HUB_CACHE_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub per_page: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub hub_cache_minutes: Option<i64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Base URL, preferring the environment over the file.
    pub fn api_base_url(&self) -> String {
        Self::resolve_api_url(std::env::var(API_URL_ENV).ok(), self.api_base_url.as_deref())
    }

    fn resolve_api_url(env: Option<String>, file: Option<&str>) -> String {
        env.filter(|v| !v.trim().is_empty())
            .or_else(|| file.map(str::to_string))
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Bearer token issued by the sign-in flow, if one is available.
    pub fn api_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.filter(|n| *n >= 1).unwrap_or(DEFAULT_PER_PAGE)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Minutes after which the cached hub list is refetched.
    pub fn hub_cache_minutes(&self) -> i64 {
        self.hub_cache_minutes
            .filter(|m| *m >= 0)
            .unwrap_or(DEFAULT_HUB_CACHE_MINUTES)
    }
}
