//! Server configuration loading from file and environment variables.

use persona_avatar::{AvatarTimeouts, IngestSettings};
use persona_db::DbRuntimeSettings;
use persona_types::{VoiceId, MAX_AVATAR_CHUNKS};
use persona_voice::TtsConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Text-to-speech provider settings.
    #[serde(default)]
    pub tts: TtsConfig,

    /// Avatar storage settings.
    #[serde(default)]
    pub avatar: AvatarConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Upper bound on concurrent avatar chunk reads.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// Wait for a free pooled connection. Should not exceed
    /// `avatar.chunk_timeout_ms`.
    #[serde(default = "default_checkout_timeout_ms")]
    pub checkout_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "persona_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Avatar read and ingest tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarConfig {
    /// Budget for a single chunk read.
    #[serde(default = "default_chunk_timeout_ms")]
    pub chunk_timeout_ms: u64,

    /// Budget for reassembling a whole avatar.
    #[serde(default = "default_total_timeout_ms")]
    pub total_timeout_ms: u64,

    /// Bytes per stored chunk at ingestion.
    #[serde(default = "default_chunk_size_bytes")]
    pub chunk_size_bytes: usize,

    /// Largest accepted avatar upload.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "persona.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_checkout_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chunk_timeout_ms() -> u64 {
    5_000
}

fn default_total_timeout_ms() -> u64 {
    15_000
}

fn default_chunk_size_bytes() -> usize {
    512 * 1024
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            checkout_timeout_ms: default_checkout_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            chunk_timeout_ms: default_chunk_timeout_ms(),
            total_timeout_ms: default_total_timeout_ms(),
            chunk_size_bytes: default_chunk_size_bytes(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl DatabaseConfig {
    pub fn runtime_settings(&self) -> DbRuntimeSettings {
        DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
            checkout_timeout_ms: self.checkout_timeout_ms,
        }
    }
}

impl AvatarConfig {
    pub fn timeouts(&self) -> AvatarTimeouts {
        AvatarTimeouts {
            per_chunk: Duration::from_millis(self.chunk_timeout_ms),
            total: Duration::from_millis(self.total_timeout_ms),
        }
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            chunk_size: self.chunk_size_bytes,
            max_bytes: self.max_upload_bytes,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but cannot work together.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PERSONA_HOST` overrides `server.host`
/// - `PERSONA_PORT` overrides `server.port`
/// - `PERSONA_DB_PATH` overrides `database.path`
/// - `PERSONA_LOG_LEVEL` overrides `logging.level`
/// - `PERSONA_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `PERSONA_TTS_BASE_URL` overrides `tts.base_url`
/// - `PERSONA_TTS_API_KEY` (or `OPENAI_API_KEY`) overrides `tts.api_key`
/// - `PERSONA_TTS_MODEL` overrides `tts.model`
/// - `PERSONA_DEFAULT_VOICE` overrides `tts.default_voice`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the resulting settings fail [`validate`].
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Rejects settings that would let an upload be stored but never served.
///
/// The largest accepted avatar must fit in [`MAX_AVATAR_CHUNKS`] chunks.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` naming the offending values.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.database.pool_max_size == 0 {
        return Err(ConfigError::Invalid(
            "database.pool_max_size must be greater than zero".to_string(),
        ));
    }
    let ingest = config.avatar.ingest_settings();
    if ingest.chunk_size == 0 {
        return Err(ConfigError::Invalid(
            "avatar.chunk_size_bytes must be greater than zero".to_string(),
        ));
    }
    if !ingest.is_consistent() {
        return Err(ConfigError::Invalid(format!(
            "avatar.max_upload_bytes = {} needs {} chunks of {} bytes; at most {} are addressable",
            ingest.max_bytes,
            ingest.chunks_for(ingest.max_bytes),
            ingest.chunk_size,
            MAX_AVATAR_CHUNKS
        )));
    }
    Ok(())
}

/// Applies overrides read through `var`, so tests need not touch the
/// process environment.
pub fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("PERSONA_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("PERSONA_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = var("PERSONA_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("PERSONA_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("PERSONA_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(base_url) = var("PERSONA_TTS_BASE_URL") {
        config.tts.base_url = base_url;
    }
    if let Some(key) = var("PERSONA_TTS_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
        config.tts.api_key = Some(key);
    }
    if let Some(model) = var("PERSONA_TTS_MODEL") {
        config.tts.model = model;
    }
    if let Some(voice) = var("PERSONA_DEFAULT_VOICE") {
        match VoiceId::parse(&voice) {
            Some(parsed) => config.tts.default_voice = parsed,
            None => tracing::warn!(value = %voice, "ignoring invalid PERSONA_DEFAULT_VOICE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_no_file() {
        let config = load_config(Some("/nonexistent/persona-config.toml")).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "persona.db");
        assert_eq!(config.avatar.chunk_timeout_ms, 5_000);
        assert_eq!(config.avatar.total_timeout_ms, 15_000);
        assert_eq!(config.tts.model, "gpt-4o-mini-tts");
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [tts]
            default_voice = "fable"
            base_url = "http://tts.local"

            [avatar]
            chunk_size_bytes = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.tts.default_voice, VoiceId::Fable);
        assert_eq!(config.tts.base_url, "http://tts.local");
        assert_eq!(config.tts.api_key, None);
        assert_eq!(config.avatar.ingest_settings().chunk_size, 1024);
        assert_eq!(config.avatar.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PERSONA_PORT", "9000"),
                ("PERSONA_LOG_JSON", "1"),
                ("OPENAI_API_KEY", "sk-fallback"),
                ("PERSONA_DEFAULT_VOICE", "Onyx"),
            ]),
        );
        assert_eq!(config.server.port, 9000);
        assert!(config.logging.json);
        assert_eq!(config.tts.api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(config.tts.default_voice, VoiceId::Onyx);
    }

    #[test]
    fn dedicated_key_beats_openai_key() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PERSONA_TTS_API_KEY", "sk-dedicated"),
                ("OPENAI_API_KEY", "sk-fallback"),
            ]),
        );
        assert_eq!(config.tts.api_key.as_deref(), Some("sk-dedicated"));
    }

    #[test]
    fn invalid_values_are_ignored() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[("PERSONA_PORT", "not-a-port"), ("PERSONA_DEFAULT_VOICE", "tenor")]),
        );
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.tts.default_voice, VoiceId::Alloy);
    }

    #[test]
    fn defaults_validate() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn chunking_that_cannot_hold_the_upload_limit_is_rejected() {
        let mut config = Config::default();
        config.avatar.chunk_size_bytes = 2;
        config.avatar.max_upload_bytes = 64 * 1024;
        match validate(&config) {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("32768 chunks"), "{msg}"),
            other => panic!("expected Invalid, got {other:?}"),
        }

        config.avatar.chunk_size_bytes = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_pool_is_rejected() {
        let mut config = Config::default();
        config.database.pool_max_size = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn database_settings_carry_checkout_timeout() {
        let config: Config = toml::from_str(
            r#"
            [database]
            pool_max_size = 16
            checkout_timeout_ms = 2000
            "#,
        )
        .unwrap();
        let settings = config.database.runtime_settings();
        assert_eq!(settings.pool_max_size, 16);
        assert_eq!(settings.checkout_timeout_ms, 2_000);
        assert_eq!(settings.busy_timeout_ms, 5_000);
    }

    #[test]
    fn avatar_timeouts_convert_to_durations() {
        let timeouts = AvatarConfig::default().timeouts();
        assert_eq!(timeouts.per_chunk, Duration::from_secs(5));
        assert_eq!(timeouts.total, Duration::from_secs(15));
    }
}
