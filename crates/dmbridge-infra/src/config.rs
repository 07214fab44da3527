//! Configuration loader.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`BridgeConfig`]. Falls back to defaults when the file is missing or
//! malformed -- a broken config file degrades to default behavior instead of
//! refusing to start.

use std::path::Path;

use dmbridge_types::config::BridgeConfig;

/// Load bridge configuration from `{data_dir}/config.toml`.
pub async fn load_config(data_dir: &Path) -> BridgeConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, using defaults", config_path.display());
            return BridgeConfig::default();
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}, using defaults", config_path.display());
            return BridgeConfig::default();
        }
    };

    match toml::from_str::<BridgeConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            BridgeConfig::default()
        }
    }
}
