//! Configuration loaded from `folio.toml`.
//!
//! Missing fields fall back to defaults. The `FOLIO_STAGE_BASE_URL`
//! environment variable takes precedence over the file for the stage
//! endpoint.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct FolioConfig {
    /// Base URL of the hosted stage services.
    #[serde(default = "default_stage_base_url")]
    pub stage_base_url: String,

    /// Per-attempt stage deadline in seconds.
    #[serde(default = "default_stage_timeout_seconds")]
    pub stage_timeout_seconds: u64,

    /// Total attempts per stage before the job is failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Directory holding job records.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
}

fn default_stage_base_url() -> String {
    "http://localhost:8700/stages".to_string()
}

fn default_stage_timeout_seconds() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_store_dir() -> String {
    "folio-jobs".to_string()
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            stage_base_url: default_stage_base_url(),
            stage_timeout_seconds: default_stage_timeout_seconds(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            store_dir: default_store_dir(),
        }
    }
}

impl FolioConfig {
    /// Loads `folio.toml` from the current directory, falling back to
    /// defaults when the file is absent.
    pub fn load() -> Result<Self> {
        let path = Path::new("folio.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<FolioConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("FOLIO_STAGE_BASE_URL")
            && !url.is_empty()
        {
            config.stage_base_url = url;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = FolioConfig::default();
        assert_eq!(config.stage_base_url, "http://localhost:8700/stages");
        assert_eq!(config.stage_timeout_seconds, 30);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.store_dir, "folio-jobs");
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            stage_base_url = "http://stages.internal:9000"
            max_attempts = 5
        "#;
        let config: FolioConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stage_base_url, "http://stages.internal:9000");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.stage_timeout_seconds, 30);
        assert_eq!(config.base_delay_ms, 1000);
    }

    #[test]
    fn load_falls_back_to_defaults() {
        // No folio.toml in the test working directory.
        let config = FolioConfig::load().unwrap();
        assert_eq!(config.max_attempts, 3);
    }
}
