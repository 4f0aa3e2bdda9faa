use crate::config::TtsConfig;
use crate::error::VoiceError;
use bytes::Bytes;
use persona_types::VoiceId;
use serde::Serialize;
use std::time::Duration;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

const SPEECH_PATH: &str = "/v1/audio/speech";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
}

/// Client for the upstream text-to-speech provider.
///
/// Built once at startup; the inner `reqwest::Client` pools connections and
/// is cheap to clone.
#[derive(Debug, Clone)]
pub struct TtsService {
    client: reqwest::Client,
    config: TtsConfig,
}

impl TtsService {
    /// Creates a new `TtsService` from provider settings.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Http` if the HTTP client cannot be built.
    pub fn new(config: TtsConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// The voice used when nothing else decides.
    pub fn default_voice(&self) -> VoiceId {
        self.config.default_voice
    }

    /// Synthesizes `text` with `voice`, returning the provider's MP3 bytes
    /// unmodified.
    pub async fn synthesize(&self, text: &str, voice: VoiceId) -> Result<Bytes, VoiceError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::InputTooLarge {
                len: text.len(),
                limit: MAX_TTS_INPUT_BYTES,
            });
        }
        let api_key = self
            .config
            .credential()
            .ok_or(VoiceError::MissingCredential)?;

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), SPEECH_PATH);
        let body = SpeechRequest {
            model: &self.config.model,
            voice: voice.as_str(),
            input: text,
            response_format: "mp3",
        };

        tracing::debug!(%voice, model = %self.config.model, chars = text.chars().count(), "requesting speech synthesis");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.bytes().await.unwrap_or_default();
            let message = upstream_error_message(&raw)
                .unwrap_or_else(|| format!("TTS provider returned {}", status));
            tracing::warn!(status = status.as_u16(), %message, "TTS provider rejected request");
            return Err(VoiceError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?)
    }
}

/// Extracts `error.message`, or a bare string `error`, from a provider
/// error body.
fn upstream_error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let error = value.get("error")?;
    let message = match error {
        serde_json::Value::String(s) => s.as_str(),
        other => other.get("message")?.as_str()?,
    };
    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}
