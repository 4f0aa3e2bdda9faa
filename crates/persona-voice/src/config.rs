use persona_types::VoiceId;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini-tts".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Settings for the upstream text-to-speech provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Provider base URL; `/v1/audio/speech` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer credential. Requests fail with `MissingCredential` when unset.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Voice used when neither the caller nor the persona yields one.
    #[serde(default)]
    pub default_voice: VoiceId,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            default_voice: VoiceId::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("default_voice", &self.default_voice)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TtsConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            ..Self::default()
        }
    }

    /// The credential, treating blank strings as absent.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
