//! Bridge configuration.
//!
//! `BridgeConfig` is the opaque configuration object handed to the core; the
//! core never reads environment variables itself. Loaded by the infra layer
//! from `{data_dir}/config.toml` with defaults for every field.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// SQLite url; when unset the infra layer derives one from its data dir.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Seconds between automatic sync cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Wall-clock budget for a single sync run.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Overlap subtracted from the incremental cursor to absorb source-side
    /// clock skew and pagination races.
    #[serde(default = "default_cursor_overlap_secs")]
    pub cursor_overlap_secs: u64,

    /// Max threads requested per account-scope fetch.
    #[serde(default = "default_thread_page_size")]
    pub thread_page_size: u32,

    /// Max messages requested per thread fetch.
    #[serde(default = "default_message_page_size")]
    pub message_page_size: u32,

    /// Credentials passed through to the source-platform client.
    #[serde(default)]
    pub source: SourceCredentials,
}

/// Source-platform credentials, opaque to the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Persisted login session, so restarts skip the challenge flow.
    #[serde(default)]
    pub session_file: Option<String>,
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_run_timeout_secs() -> u64 {
    600
}

fn default_cursor_overlap_secs() -> u64 {
    120
}

fn default_thread_page_size() -> u32 {
    100
}

fn default_message_page_size() -> u32 {
    50
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            poll_interval_secs: default_poll_interval_secs(),
            run_timeout_secs: default_run_timeout_secs(),
            cursor_overlap_secs: default_cursor_overlap_secs(),
            thread_page_size: default_thread_page_size(),
            message_page_size: default_message_page_size(),
            source: SourceCredentials::default(),
        }
    }
}
