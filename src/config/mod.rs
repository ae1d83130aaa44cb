//! Configuration management for the VÍGIA speech service

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::speech::RetryPolicy;
use file::VigiaConfigFile;

/// Default text-to-speech endpoint
pub const DEFAULT_TTS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Default voice (multilingual female narrator)
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

/// Default synthesis model; multilingual so Spanish statements read correctly
pub const DEFAULT_TTS_MODEL: &str = "eleven_multilingual_v2";

/// Default API port
pub const DEFAULT_PORT: u16 = 8790;

/// Top-level service configuration
#[derive(Debug)]
pub struct Config {
    /// Speech cache/queue configuration
    pub speech: SpeechConfig,

    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Optional statement catalog replacing the built-in one
    pub catalog_path: Option<PathBuf>,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Requests per minute accepted across all clients
    pub requests_per_minute: Option<u32>,
}

/// Voice tuning sent with every synthesis request
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

/// Speech cache, queue and endpoint configuration
#[derive(Debug)]
pub struct SpeechConfig {
    /// API key for the synthesis endpoint
    pub api_key: Option<SecretString>,

    /// Base URL of the synthesis endpoint
    pub base_url: String,

    /// Voice identifier
    pub voice_id: String,

    /// Model identifier
    pub model: String,

    /// Voice tuning
    pub voice_settings: VoiceSettings,

    /// Minimum spacing between the starts of two outbound requests
    pub rate_limit: Duration,

    /// Backoff policy around each request
    pub retry: RetryPolicy,

    /// Upper bound on a single request
    pub request_timeout: Duration,

    /// Delay before the bulk initializer starts its first pass
    pub startup_delay: Duration,

    /// Delay before the bulk initializer retries failed statements
    pub retry_pass_delay: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_TTS_BASE_URL.to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model: DEFAULT_TTS_MODEL.to_string(),
            voice_settings: VoiceSettings::default(),
            rate_limit: Duration::from_millis(2000),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            startup_delay: Duration::from_secs(5),
            retry_pass_delay: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the standard config file
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed config file and an environment lookup
    ///
    /// Precedence is env > file > default.
    pub fn from_sources(fc: VigiaConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = SpeechConfig::default();
        let env_u64 = |key: &str| env(key).and_then(|v| v.parse::<u64>().ok());

        let api_key = env("VIGIA_TTS_API_KEY")
            .or_else(|| env("ELEVENLABS_API_KEY"))
            .or(fc.tts.api_key)
            .filter(|k| !k.is_empty())
            .map(SecretString::from);

        let voice_settings = VoiceSettings {
            stability: fc
                .tts
                .stability
                .unwrap_or(defaults.voice_settings.stability),
            similarity_boost: fc
                .tts
                .similarity_boost
                .unwrap_or(defaults.voice_settings.similarity_boost),
        };

        let retry = RetryPolicy {
            max_retries: env("VIGIA_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .or(fc.queue.max_retries)
                .unwrap_or(defaults.retry.max_retries),
            base_delay: env_u64("VIGIA_BACKOFF_BASE_MS")
                .or(fc.queue.backoff_base_ms)
                .map_or(defaults.retry.base_delay, Duration::from_millis),
            ..defaults.retry
        };

        let speech = SpeechConfig {
            api_key,
            base_url: env("VIGIA_TTS_BASE_URL")
                .or(fc.tts.base_url)
                .unwrap_or(defaults.base_url),
            voice_id: env("VIGIA_TTS_VOICE_ID")
                .or(fc.tts.voice_id)
                .unwrap_or(defaults.voice_id),
            model: env("VIGIA_TTS_MODEL")
                .or(fc.tts.model)
                .unwrap_or(defaults.model),
            voice_settings,
            rate_limit: env_u64("VIGIA_RATE_LIMIT_MS")
                .or(fc.queue.rate_limit_ms)
                .map_or(defaults.rate_limit, Duration::from_millis),
            retry,
            request_timeout: env_u64("VIGIA_REQUEST_TIMEOUT_SECS")
                .or(fc.queue.request_timeout_secs)
                .map_or(defaults.request_timeout, Duration::from_secs),
            startup_delay: env_u64("VIGIA_STARTUP_DELAY_SECS")
                .or(fc.queue.startup_delay_secs)
                .map_or(defaults.startup_delay, Duration::from_secs),
            retry_pass_delay: env_u64("VIGIA_RETRY_PASS_DELAY_SECS")
                .or(fc.queue.retry_pass_delay_secs)
                .map_or(defaults.retry_pass_delay, Duration::from_secs),
        };

        let server = ServerConfig {
            port: env("VIGIA_PORT")
                .and_then(|v| v.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            requests_per_minute: env("VIGIA_API_RPM")
                .and_then(|v| v.parse().ok())
                .or(fc.server.requests_per_minute),
        };

        let catalog_path = env("VIGIA_CATALOG_PATH")
            .or(fc.catalog_path)
            .map(PathBuf::from);

        Self {
            speech,
            server,
            catalog_path,
        }
    }
}
