//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has sensible defaults, so a missing or partial file
//! still yields a runnable configuration. Secrets (API keys) are
//! referenced by env-var name in the config and resolved at runtime.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub game: GameSettings,
    pub source: SourceSettings,
    pub session: SessionSettings,
    pub highscore: HighScoreSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GameSettings {
    /// Asset symbol the game is played against.
    pub symbol: String,
    /// Delay between price polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            symbol: "BTC".to_string(),
            poll_interval_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SourceSettings {
    /// Env var holding the optional CoinGecko API key.
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionSettings {
    /// Where the in-progress session is persisted.
    pub file: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            file: "updown_session.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HighScoreSettings {
    pub enabled: bool,
    pub port: u16,
    pub database_url: String,
}

impl Default for HighScoreSettings {
    fn default() -> Self {
        HighScoreSettings {
            enabled: true,
            port: 8080,
            database_url: "sqlite:updown_highscores.db?mode=rwc".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .context(format!("Failed to read config file {path}"))?;
        let config: AppConfig =
            toml::from_str(&raw).context(format!("Failed to parse config file {path}"))?;
        Ok(config)
    }

    /// Load from `path`, or fall back to defaults when no file exists.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(AppConfig::default())
        }
    }

    /// Resolve the price-source API key from the configured env var.
    pub fn source_api_key(&self) -> Option<SecretString> {
        self.source
            .api_key_env
            .as_deref()
            .and_then(|env| std::env::var(env).ok())
            .map(SecretString::new)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
