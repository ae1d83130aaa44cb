//! Text-to-speech endpoint client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{SpeechConfig, VoiceSettings};
use crate::error::SynthesisFailure;
use crate::{Error, Result};

/// Converts text into playable audio bytes
///
/// One call is one network attempt; retrying and spacing are the caller's
/// concern.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text`, returning encoded audio
    async fn synthesize(&self, text: &str) -> std::result::Result<Vec<u8>, SynthesisFailure>;
}

/// Synthesizer backed by an ElevenLabs-compatible HTTP endpoint
pub struct HttpSynthesizer {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    voice_id: String,
    model: String,
    voice_settings: VoiceSettings,
}

impl std::fmt::Debug for HttpSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSynthesizer")
            .field("base_url", &self.base_url)
            .field("voice_id", &self.voice_id)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HttpSynthesizer {
    /// Create a synthesizer from the speech configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the HTTP client cannot be built
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_owned()))
            .ok_or_else(|| Error::Config("TTS API key required for speech synthesis".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            voice_id: config.voice_id.clone(),
            model: config.model.clone(),
            voice_settings: config.voice_settings,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id)
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> std::result::Result<Vec<u8>, SynthesisFailure> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            text: &'a str,
            model_id: &'a str,
            voice_settings: VoiceSettings,
        }

        let request = SpeechRequest {
            text,
            model_id: &self.model,
            voice_settings: self.voice_settings,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", self.api_key.expose_secret())
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisFailure::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let audio = response.bytes().await.map_err(|e| classify_transport(&e))?;
        Ok(audio.to_vec())
    }
}

fn classify_transport(e: &reqwest::Error) -> SynthesisFailure {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    SynthesisFailure::Transport(format!("{kind}: {e}"))
}

/// Pull a human-readable message out of an optional JSON error body
///
/// Understands `{"detail": {"message": ..}}`, `{"detail": ".."}`,
/// `{"message": ..}` and `{"error": ..}`; anything else is returned as-is.
#[must_use]
pub fn error_message(body: &str) -> String {
    let Ok(v) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    let detail = v.get("detail");
    let candidates = [
        detail.and_then(|d| d.get("message")),
        detail,
        v.get("message"),
        v.get("error").and_then(|e| e.get("message")),
        v.get("error"),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|c| c.as_str().map(ToString::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
