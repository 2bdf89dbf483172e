//! Client configuration.
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. `~/.config/innovachat/config.toml`
//! 3. environment (`INNOVACHAT_BACKEND_URL`, `INNOVACHAT_DATA_DIR`,
//!    `INNOVACHAT_REQUEST_TIMEOUT_SECS`)
//!
//! Command-line flags are applied on top by the binary.

use crate::paths::InnovaPaths;
use innova_core::error::{InnovaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Backend used when running against a locally started service.
pub const LOCAL_BACKEND_URL: &str = "http://127.0.0.1:5000";
/// Hosted deployment of the service.
pub const HOSTED_BACKEND_URL: &str = "https://innovachat.onrender.com";

pub const ENV_BACKEND_URL: &str = "INNOVACHAT_BACKEND_URL";
pub const ENV_DATA_DIR: &str = "INNOVACHAT_DATA_DIR";
pub const ENV_REQUEST_TIMEOUT: &str = "INNOVACHAT_REQUEST_TIMEOUT_SECS";

/// Settings for the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the chat service, without a trailing slash.
    pub backend_url: String,
    /// Directory of the file-backed key-value store. `None` means the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: LOCAL_BACKEND_URL.to_string(),
            data_dir: None,
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Loads defaults, then the config file, then environment overrides.
    pub fn load() -> Result<Self> {
        let path = InnovaPaths::config_file().map_err(|e| InnovaError::config(e.to_string()))?;
        let mut config = Self::from_file(&path)?.unwrap_or_default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Reads a config file. A missing file yields `Ok(None)`.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(InnovaError::config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        let config: Self = toml::from_str(&content)?;
        tracing::debug!("[ClientConfig] Loaded {}", path.display());
        Ok(Some(config))
    }

    /// Applies overrides looked up through `lookup` (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT).filter(|v| !v.trim().is_empty()) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                InnovaError::config(format!(
                    "{} must be a number of seconds, got '{}'",
                    ENV_REQUEST_TIMEOUT, raw
                ))
            })?;
            self.request_timeout_secs = Some(secs);
        }
        self.backend_url = normalize_base_url(&self.backend_url)?;
        Ok(())
    }

    /// Directory for the key-value store, falling back to the platform data dir.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => InnovaPaths::data_dir().map_err(|e| InnovaError::config(e.to_string())),
        }
    }
}

/// Parses a backend base URL and returns its normalized form.
///
/// The URL needs an http(s) scheme and a host. Query strings and fragments
/// are refused since request paths are appended to it. The result carries
/// no trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| InnovaError::config(format!("invalid backend URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InnovaError::config(format!(
            "backend URL must use http or https, got '{}'",
            raw
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(InnovaError::config(format!(
            "backend URL has no host: '{}'",
            raw
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(InnovaError::config(format!(
            "backend URL cannot carry a query or fragment: '{}'",
            raw
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
