use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    /// No provider credential is configured.
    #[error("TTS provider credential is not configured")]
    MissingCredential,

    #[error("text exceeds maximum size: {len} bytes (limit: {limit} bytes)")]
    InputTooLarge { len: usize, limit: usize },

    /// The provider answered with a non-success status.
    #[error("TTS provider error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("TTS request failed: {0}")]
    Http(#[from] reqwest::Error),
}
