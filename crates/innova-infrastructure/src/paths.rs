//! Unified path management for InnovaChat files.
//!
//! ```text
//! ~/.config/innovachat/          # Config directory
//! └── config.toml                # Client configuration
//!
//! ~/.local/share/innovachat/     # Data directory (default key-value store)
//! ├── innovachat_chats.json      # Session collection blob
//! └── innovachat_active_chat.json
//! ```

use std::path::PathBuf;
use thiserror::Error;

const APP_DIR: &str = "innovachat";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Platform config/data directory could not be determined.
    #[error("Cannot find home directory")]
    HomeDirNotFound,
}

/// Path resolution for InnovaChat.
///
/// Uses the platform conventions from `dirs` (XDG on Linux, Application
/// Support on macOS, AppData on Windows).
pub struct InnovaPaths;

impl InnovaPaths {
    /// Returns the configuration directory (e.g. `~/.config/innovachat/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the data directory (e.g. `~/.local/share/innovachat/`).
    ///
    /// The file-backed key-value store lives here unless configured otherwise.
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
