//! User configuration
//!
//! Read from `$XDG_CONFIG_HOME/pybox/config.toml` (or the path given with
//! `--config` / `PYBOX_CONFIG`). Every key is optional:
//!
//! ```toml
//! tool = "pyinstaller"
//! python = "python3"
//! pinned_version = "6.3.0"
//! history_file = "/home/me/.local/share/pybox/build_history.json"
//! onefile = true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::command::PACKAGER;
use super::error::{PackError, Result};
use super::history::HISTORY_FILE;
use super::runner::DEFAULT_PYTHON;

/// PyInstaller release installed when the tool is missing
pub const DEFAULT_PINNED_VERSION: &str = "6.3.0";

const APP_DIR: &str = "pybox";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Packaging tool executable
    pub tool: String,
    /// Interpreter used for `pip install`
    pub python: String,
    /// Version installed by `pybox install`
    pub pinned_version: String,
    /// Where build history is stored
    pub history_file: PathBuf,
    /// Default for `--onefile` when neither `--onefile` nor `--onedir` is given
    pub onefile: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: PACKAGER.to_string(),
            python: DEFAULT_PYTHON.to_string(),
            pinned_version: DEFAULT_PINNED_VERSION.to_string(),
            history_file: default_history_path(),
            onefile: true,
        }
    }
}

impl Config {
    /// Load `path`, or the default location when `path` is `None`.
    ///
    /// A missing file yields the defaults. A file that exists but does not
    /// parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| PackError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&content).map_err(|reason| PackError::Config { path, reason })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

/// `$XDG_CONFIG_HOME/pybox/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

/// `$XDG_DATA_HOME/pybox/build_history.json`, falling back to the current
/// directory when no data directory is known.
pub fn default_history_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(HISTORY_FILE)
}
