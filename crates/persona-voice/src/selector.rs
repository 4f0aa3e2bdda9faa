//! Persona-driven voice selection.
//!
//! Persona attributes are free-text French labels. Each field is normalized
//! (trimmed, lowercased, diacritics removed) and checked against a declarative
//! table of keyword rules. A rule fires when the normalized text *contains*
//! one of its keywords, and every firing rule adds its weight to each voice
//! it names. Rules stack across fields and within a field.
//!
//! Resolution order, first valid wins:
//!
//! 1. explicit caller override
//! 2. the persona's stored voice preference
//! 3. the top-scoring voice, only when its score is above zero
//! 4. the configured fallback
//!
//! Ties are broken by [`VoiceId::ALL`] order, so `alloy` wins among equals.

use persona_types::PersonaDescriptor;
use persona_types::VoiceId::{self, Alloy, Echo, Fable, Nova, Onyx, Shimmer};
use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// A single keyword rule: any keyword match boosts every listed voice.
#[derive(Debug, Clone, Copy)]
pub struct VoiceRule {
    pub keywords: &'static [&'static str],
    pub voices: &'static [VoiceId],
    pub weight: u32,
}

impl VoiceRule {
    /// Whether this rule fires for already-normalized text.
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|kw| normalized.contains(kw))
    }
}

const fn rule(
    keywords: &'static [&'static str],
    voices: &'static [VoiceId],
    weight: u32,
) -> VoiceRule {
    VoiceRule {
        keywords,
        voices,
        weight,
    }
}

// Keywords are stored pre-normalized (lowercase, no accents).

pub const GENDER_RULES: &[VoiceRule] = &[
    rule(&["femme"], &[Shimmer, Nova], 3),
    rule(&["homme"], &[Onyx, Echo], 3),
    rule(&["neutre"], &[Alloy, Fable], 2),
];

pub const MENTALITY_RULES: &[VoiceRule] = &[
    rule(&["coach", "motiv"], &[Echo, Nova], 2),
    rule(&["romanti"], &[Shimmer, Nova], 2),
    rule(&["sarcas"], &[Onyx, Echo], 2),
    rule(&["philosoph"], &[Fable, Alloy], 2),
    rule(&["calme", "zen"], &[Alloy, Fable], 2),
    rule(&["protect"], &[Onyx, Alloy], 2),
    rule(&["joueu", "fun", "ludique"], &[Nova, Shimmer], 2),
];

pub const SPEAKING_STYLE_RULES: &[VoiceRule] = &[
    rule(&["calme", "pose"], &[Alloy, Fable], 2),
    rule(&["energi", "dynamique", "rythm"], &[Echo, Nova], 2),
    rule(&["chaleureu", "doux", "douce"], &[Shimmer, Nova], 2),
    rule(&["grave", "profond"], &[Onyx, Alloy], 2),
];

pub const SPEAKING_RHYTHM_RULES: &[VoiceRule] = &[
    rule(&["lent"], &[Fable, Alloy], 2),
    rule(&["modere"], &[Alloy, Fable], 1),
    rule(&["rapide"], &[Echo, Nova], 2),
    rule(&["punch", "saccade"], &[Onyx, Echo], 2),
    rule(&["progressi"], &[Fable, Nova], 1),
];

/// Trims, lowercases and strips diacritics.
///
/// `"  Sénior "` and `"senior"` normalize identically.
pub fn normalize(text: &str) -> String {
    // Lowercasing can itself introduce combining marks ('İ' -> "i\u{307}"),
    // so fold case before decomposing.
    text.trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Per-voice score accumulator for one scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scores([u32; 6]);

impl Scores {
    pub fn get(&self, voice: VoiceId) -> u32 {
        self.0[voice.index()]
    }

    fn boost(&mut self, voices: &[VoiceId], weight: u32) {
        for voice in voices {
            self.0[voice.index()] += weight;
        }
    }

    fn apply(&mut self, text: Option<&str>, rules: &[VoiceRule]) {
        let Some(text) = text else { return };
        let normalized = normalize(text);
        if normalized.is_empty() {
            return;
        }
        for rule in rules.iter().filter(|r| r.matches(&normalized)) {
            self.boost(rule.voices, rule.weight);
        }
    }

    pub fn max(&self) -> u32 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// First voice in canonical order holding the maximum score, or `None`
    /// when nothing scored.
    pub fn winner(&self) -> Option<VoiceId> {
        let max = self.max();
        if max == 0 {
            return None;
        }
        VoiceId::ALL.into_iter().find(|v| self.get(*v) == max)
    }

    /// `(voice, score)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (VoiceId, u32)> + '_ {
        VoiceId::ALL.into_iter().map(|v| (v, self.get(v)))
    }
}

/// Runs the keyword table over every persona field.
pub fn score(persona: &PersonaDescriptor) -> Scores {
    let mut scores = Scores::default();
    scores.apply(persona.gender.as_deref(), GENDER_RULES);
    scores.apply(persona.mentality.as_deref(), MENTALITY_RULES);
    scores.apply(persona.speaking_style.as_deref(), SPEAKING_STYLE_RULES);
    scores.apply(persona.speaking_rhythm.as_deref(), SPEAKING_RHYTHM_RULES);
    scores
}

/// Which resolution step produced the voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceSource {
    Explicit,
    Stored,
    Scored,
    Fallback,
}

/// A resolved voice together with how it was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceDecision {
    pub voice: VoiceId,
    pub source: VoiceSource,
    /// Scores from the heuristic pass; all zero when no persona was given.
    pub scores: Scores,
}

/// Resolves a voice and reports which step decided it.
pub fn explain(
    explicit: Option<&str>,
    persona: Option<&PersonaDescriptor>,
    fallback: VoiceId,
) -> VoiceDecision {
    let scores = persona.map(score).unwrap_or_default();
    let decide = |voice, source| VoiceDecision {
        voice,
        source,
        scores,
    };

    if let Some(voice) = explicit.and_then(VoiceId::parse) {
        return decide(voice, VoiceSource::Explicit);
    }
    let Some(persona) = persona else {
        return decide(fallback, VoiceSource::Fallback);
    };
    if let Some(voice) = persona.voice.as_deref().and_then(VoiceId::parse) {
        return decide(voice, VoiceSource::Stored);
    }
    match scores.winner() {
        Some(voice) => decide(voice, VoiceSource::Scored),
        None => decide(fallback, VoiceSource::Fallback),
    }
}

/// Picks the voice for a synthesis request. Never fails.
pub fn resolve_voice(
    explicit: Option<&str>,
    persona: Option<&PersonaDescriptor>,
    fallback: VoiceId,
) -> VoiceId {
    explain(explicit, persona, fallback).voice
}
