//! Runtime configuration, read from the environment with fallbacks.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_DATA_DIR: &str = ".workbench";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbenchConfig {
    /// Backend base URL, without a trailing slash.
    pub api_url: String,
    /// Applied to every outbound call.
    pub timeout: Duration,
    /// Maximum number of entries kept in the local history log.
    pub history_limit: usize,
    /// Directory of the durable local store.
    pub data_dir: PathBuf,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl WorkbenchConfig {
    /// Read `WORKBENCH_API_URL`, `WORKBENCH_TIMEOUT_MS` and
    /// `WORKBENCH_DATA_DIR`. Unset or invalid values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("WORKBENCH_API_URL").filter(|u| !u.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("WORKBENCH_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.timeout = Duration::from_millis(ms),
                _ => tracing::warn!(value = %raw, "ignoring invalid WORKBENCH_TIMEOUT_MS"),
            }
        }
        if let Some(dir) = lookup("WORKBENCH_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        config
    }
}
