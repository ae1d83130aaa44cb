//! TOML configuration file loading
//!
//! Supports `~/.config/vigia/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VigiaConfigFile {
    /// Text-to-speech endpoint configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Queue, retry and warm-up timing
    #[serde(default)]
    pub queue: QueueFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Optional path to a statement catalog overriding the built-in one
    #[serde(default)]
    pub catalog_path: Option<String>,
}

/// Text-to-speech endpoint configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub voice_id: Option<String>,
    pub model: Option<String>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
}

/// Queue timing configuration, all durations in milliseconds or seconds as named
#[derive(Debug, Default, Deserialize)]
pub struct QueueFileConfig {
    pub rate_limit_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub backoff_base_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub startup_delay_secs: Option<u64>,
    pub retry_pass_delay_secs: Option<u64>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Requests per minute accepted by the API (unlimited when absent)
    pub requests_per_minute: Option<u32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VigiaConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VigiaConfigFile {
    config_file_path().map_or_else(VigiaConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from an explicit path
pub fn load_from(path: &Path) -> VigiaConfigFile {
    if !path.exists() {
        return VigiaConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VigiaConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VigiaConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/vigia/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("vigia").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_from(Path::new("/nonexistent/vigia/config.toml"));
        assert!(cfg.tts.api_key.is_none());
        assert!(cfg.server.port.is_none());
    }

    #[test]
    fn parses_partial_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            catalog_path = "/etc/vigia/statements.toml"

            [tts]
            voice_id = "abc123"

            [queue]
            rate_limit_ms = 500
            max_retries = 1
            "#,
        )
        .unwrap();

        let cfg = load_from(&path);
        assert_eq!(cfg.tts.voice_id.as_deref(), Some("abc123"));
        assert_eq!(cfg.queue.rate_limit_ms, Some(500));
        assert_eq!(cfg.queue.max_retries, Some(1));
        assert!(cfg.queue.backoff_base_ms.is_none());
        assert_eq!(
            cfg.catalog_path.as_deref(),
            Some("/etc/vigia/statements.toml")
        );
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tts\nvoice_id = ").unwrap();

        let cfg = load_from(&path);
        assert!(cfg.tts.voice_id.is_none());
    }
}
