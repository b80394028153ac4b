//! Engine configuration loading and typed config structures.
//!
//! The canonical configuration lives in `arbiter-config.yaml` at the
//! project root. This module defines strongly-typed structs mirroring the
//! YAML structure and a loader that reads and validates the file. All
//! fields default to the engine's built-in constants, so an empty file is
//! a valid configuration.

use std::path::{Path, PathBuf};

use arbiter_types::MapBounds;
use serde::Deserialize;

use crate::defense::DEFENSE_WINDOW_MS;
use crate::gm::PROXIMITY_RADIUS;
use crate::offers::OFFER_TTL_MS;
use crate::outbox::{DRAIN_BATCH, OUTBOX_CAP};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Map dimensions and proximity tuning.
    #[serde(default)]
    pub world: WorldConfig,

    /// Offer and defense-window timing.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Broadcast loop and outbox tuning.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Path to the rulebook JSON file.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Persistence connection settings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `DATABASE_URL` environment variable overrides
    /// `infrastructure.database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Map dimensions and proximity tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Map width in distance units.
    #[serde(default = "default_width")]
    pub width: f64,
    /// Map height in distance units.
    #[serde(default = "default_height")]
    pub height: f64,
    /// Actor radius; positions stay this far from map edges.
    #[serde(default = "default_actor_radius")]
    pub actor_radius: f64,
    /// Maximum distance for trades, skill transfers, and attacks.
    #[serde(default = "default_proximity_radius")]
    pub proximity_radius: f64,
}

impl WorldConfig {
    /// The map bounds described by this config.
    pub const fn bounds(&self) -> MapBounds {
        MapBounds {
            width: self.width,
            height: self.height,
            actor_radius: self.actor_radius,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            actor_radius: default_actor_radius(),
            proximity_radius: default_proximity_radius(),
        }
    }
}

/// Offer and defense-window timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Offer time-to-live, milliseconds.
    #[serde(default = "default_offer_ttl_ms")]
    pub offer_ttl_ms: u64,
    /// Armed defense-window duration, milliseconds.
    #[serde(default = "default_defense_window_ms")]
    pub defense_window_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            offer_ttl_ms: default_offer_ttl_ms(),
            defense_window_ms: default_defense_window_ms(),
        }
    }
}

/// Broadcast loop and outbox tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfig {
    /// Broadcast interval, milliseconds.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
    /// Simulation poll interval, milliseconds.
    #[serde(default = "default_sim_poll_ms")]
    pub sim_poll_ms: u64,
    /// Maximum queued outbound messages.
    #[serde(default = "default_outbox_cap")]
    pub outbox_cap: usize,
    /// Outbound messages drained per broadcast interval.
    #[serde(default = "default_outbox_batch")]
    pub outbox_batch: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: default_broadcast_interval_ms(),
            sim_poll_ms: default_sim_poll_ms(),
            outbox_cap: default_outbox_cap(),
            outbox_batch: default_outbox_batch(),
        }
    }
}

/// Rulebook file location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RulesConfig {
    /// Path to the rulebook JSON file.
    #[serde(default = "default_rulebook_path")]
    pub rulebook_path: PathBuf,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            rulebook_path: default_rulebook_path(),
        }
    }
}

/// Persistence connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Postgres connection string; absent disables the mirror.
    #[serde(default)]
    pub database_url: Option<String>,
}

impl InfrastructureConfig {
    /// Apply environment-variable overrides for connection strings.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database_url = Some(url);
            }
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive, overridable via `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON-formatted log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

const fn default_width() -> f64 {
    10_000.0
}

const fn default_height() -> f64 {
    8_000.0
}

const fn default_actor_radius() -> f64 {
    10.0
}

const fn default_proximity_radius() -> f64 {
    PROXIMITY_RADIUS
}

const fn default_offer_ttl_ms() -> u64 {
    OFFER_TTL_MS
}

const fn default_defense_window_ms() -> u64 {
    DEFENSE_WINDOW_MS
}

const fn default_broadcast_interval_ms() -> u64 {
    15
}

const fn default_sim_poll_ms() -> u64 {
    4
}

const fn default_outbox_cap() -> usize {
    OUTBOX_CAP
}

const fn default_outbox_batch() -> usize {
    DRAIN_BATCH
}

fn default_rulebook_path() -> PathBuf {
    PathBuf::from("arbiter-rules.json")
}

fn default_log_filter() -> String {
    "info".to_owned()
}
