use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::chat::cache::CacheConfig;
use crate::chat::stream::StreamOptions;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub cache_max_entries: usize,
    pub cache_ttl_minutes: u64,
    pub cache_preload_ttl_minutes: u64,
    pub cache_similarity_threshold: f64,
    pub cache_preload: bool,
    pub stream_chunk_words: usize,
    pub stream_delay_ms: u64,
    pub stream_typing_effect: bool,
}

impl Config {
    /// Defaults for every optional setting.
    pub fn with_api_key(anthropic_api_key: String) -> Self {
        Config {
            anthropic_api_key,
            port: 8080,
            rust_log: "info".to_string(),
            cache_max_entries: 1000,
            cache_ttl_minutes: 45,
            cache_preload_ttl_minutes: 60,
            cache_similarity_threshold: 0.8,
            cache_preload: true,
            stream_chunk_words: 15,
            stream_delay_ms: 50,
            stream_typing_effect: true,
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::with_api_key(require_env("ANTHROPIC_API_KEY")?);
        let config = Config {
            port: optional_env("PORT", defaults.port)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| defaults.rust_log.clone()),
            cache_max_entries: optional_env("CACHE_MAX_ENTRIES", defaults.cache_max_entries)?,
            cache_ttl_minutes: optional_env("CACHE_TTL_MINUTES", defaults.cache_ttl_minutes)?,
            cache_preload_ttl_minutes: optional_env(
                "CACHE_PRELOAD_TTL_MINUTES",
                defaults.cache_preload_ttl_minutes,
            )?,
            cache_similarity_threshold: optional_env(
                "CACHE_SIMILARITY_THRESHOLD",
                defaults.cache_similarity_threshold,
            )?,
            cache_preload: optional_flag("CACHE_PRELOAD", defaults.cache_preload)?,
            stream_chunk_words: optional_env("STREAM_CHUNK_WORDS", defaults.stream_chunk_words)?,
            stream_delay_ms: optional_env("STREAM_DELAY_MS", defaults.stream_delay_ms)?,
            stream_typing_effect: optional_flag(
                "STREAM_TYPING_EFFECT",
                defaults.stream_typing_effect,
            )?,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_max_entries == 0 {
            bail!("CACHE_MAX_ENTRIES must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.cache_similarity_threshold) {
            bail!(
                "CACHE_SIMILARITY_THRESHOLD must be within [0, 1], got {}",
                self.cache_similarity_threshold
            );
        }
        if self.stream_chunk_words == 0 {
            bail!("STREAM_CHUNK_WORDS must be at least 1");
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.cache_max_entries,
            default_ttl: minutes(self.cache_ttl_minutes),
            preload_ttl: minutes(self.cache_preload_ttl_minutes),
            similarity_threshold: self.cache_similarity_threshold,
        }
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            chunk_word_count: self.stream_chunk_words,
            inter_event_delay_ms: self.stream_delay_ms,
            typing_effect_enabled: self.stream_typing_effect,
        }
    }
}

fn minutes(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(60))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn optional_flag(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(raw) => parse_flag(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("{key} has invalid value '{raw}': {e}"))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{key} must be a boolean (true/false), got '{raw}'"),
    }
}
