//! Run settings
//!
//! Every knob has a default, so a settings file is optional. When one is
//! given it is a JSON object with any subset of the fields below.

use crate::error::{CiteError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CACHE_FILE: &str = "doi_cache.json";
pub const DEFAULT_LEGACY_FILE: &str = "trialreport.txt";
pub const DEFAULT_OUTPUT_FILE: &str = "citations_dois.txt";
pub const DEFAULT_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

/// Env var that overrides `api_key` from the settings file
pub const API_KEY_ENV: &str = "SEMANTIC_SCHOLAR_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
    #[serde(default = "default_legacy_file")]
    pub legacy_file: PathBuf,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    /// Left (body) column width
    #[serde(default = "default_left_width")]
    pub left_width: usize,
    /// Right (references) column width, used for the banner rules
    #[serde(default = "default_right_width")]
    pub right_width: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First rate-limit wait; doubles on every further 429
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Pause between two different lookups
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_cache_file() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_FILE)
}

fn default_legacy_file() -> PathBuf {
    PathBuf::from(DEFAULT_LEGACY_FILE)
}

fn default_output_file() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

fn default_left_width() -> usize {
    95
}

fn default_right_width() -> usize {
    80
}

fn default_delimiter() -> String {
    " | ".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_base_secs() -> u64 {
    3
}

fn default_request_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_file: default_cache_file(),
            legacy_file: default_legacy_file(),
            output_file: default_output_file(),
            left_width: default_left_width(),
            right_width: default_right_width(),
            delimiter: default_delimiter(),
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            request_delay_ms: default_request_delay_ms(),
            timeout_secs: default_timeout_secs(),
            api_base: default_api_base(),
            api_key: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. A missing file gives the defaults; a
    /// file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path).map_err(|source| CiteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content)
            .map_err(|e| CiteError::Settings(format!("{}: {}", path.display(), e)))
    }

    /// API key for the lookup service (env var takes precedence)
    pub fn api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                return Some(key);
            }
        }
        self.api_key.clone().filter(|k| !k.is_empty())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
