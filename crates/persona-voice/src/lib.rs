//! Voice infrastructure for the persona platform.
//!
//! Two concerns live here:
//!
//! - [`selector`]: a pure, deterministic heuristic mapping a persona's
//!   descriptive attributes (gender, mentality, speaking style, rhythm) to one
//!   of the provider's fixed voices. It never fails; absence of any signal
//!   falls through to a configured default.
//! - [`tts`]: the HTTP client for the text-to-speech provider. The resolved
//!   voice and the text are forwarded verbatim and the returned audio bytes
//!   are passed back unmodified.

pub mod config;
pub mod error;
pub mod selector;
pub mod tts;

pub use config::TtsConfig;
pub use error::VoiceError;
pub use selector::{explain, normalize, resolve_voice, score, Scores, VoiceDecision, VoiceSource};
pub use tts::TtsService;
