//! Shared types for the persona platform.
//!
//! This crate holds the domain vocabulary used across the workspace: the
//! closed set of TTS voice identifiers, persona descriptors that drive voice
//! selection, and the manifest describing a chunked avatar asset.
//!
//! Nothing here performs I/O. Storage lives in `persona-db`, voice logic in
//! `persona-voice` and asset reassembly in `persona-avatar`.

pub mod avatar;
pub mod persona;
pub mod voice;

pub use avatar::{chunk_key, AvatarManifest, DEFAULT_AVATAR_CONTENT_TYPE, MAX_AVATAR_CHUNKS};
pub use persona::{PersonaDescriptor, PersonaRecord};
pub use voice::{UnknownVoice, VoiceId};
