//! Persona records and the descriptor handed to the voice selector.

use serde::{Deserialize, Serialize};

/// Descriptive attributes that drive voice selection.
///
/// Values are free text (French in practice) and are normalized by the
/// selector before matching. Built fresh per request from a [`PersonaRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaDescriptor {
    pub gender: Option<String>,
    pub mentality: Option<String>,
    pub speaking_style: Option<String>,
    pub speaking_rhythm: Option<String>,
    /// The persona's own stored voice preference, if any.
    pub voice: Option<String>,
}

/// A stored persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaRecord {
    pub id: String,
    pub name: String,
    pub gender: Option<String>,
    pub mentality: Option<String>,
    /// Labeled "voice" in the persona editor; describes the vocal style.
    pub speaking_style: Option<String>,
    pub speaking_rhythm: Option<String>,
    pub voice: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PersonaRecord {
    /// Projects the fields the voice selector reads.
    pub fn descriptor(&self) -> PersonaDescriptor {
        PersonaDescriptor {
            gender: self.gender.clone(),
            mentality: self.mentality.clone(),
            speaking_style: self.speaking_style.clone(),
            speaking_rhythm: self.speaking_rhythm.clone(),
            voice: self.voice.clone(),
        }
    }
}
