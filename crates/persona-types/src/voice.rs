//! Voice identifiers accepted by the upstream TTS provider.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the six voices the TTS provider accepts.
///
/// The declaration order is the canonical order used for tie-breaking when
/// several voices share the top score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceId {
    #[default]
    Alloy,
    Nova,
    Shimmer,
    Echo,
    Fable,
    Onyx,
}

/// Error returned when a string does not name a known voice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown voice: {0}")]
pub struct UnknownVoice(pub String);

impl VoiceId {
    /// Every voice, in canonical tie-break order.
    pub const ALL: [VoiceId; 6] = [
        VoiceId::Alloy,
        VoiceId::Nova,
        VoiceId::Shimmer,
        VoiceId::Echo,
        VoiceId::Fable,
        VoiceId::Onyx,
    ];

    /// Returns the lowercase token sent to the provider.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Nova => "nova",
            Self::Shimmer => "shimmer",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
        }
    }

    /// Position of this voice in [`VoiceId::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Parses a caller-supplied token, ignoring surrounding whitespace and case.
    ///
    /// Returns `None` for anything outside the fixed set.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim();
        Self::ALL
            .into_iter()
            .find(|voice| voice.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceId {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownVoice(s.to_string()))
    }
}
