//! Relay configuration loading.
//!
//! TOML is the primary config source, with environment-variable overrides
//! for the two settings an operator most often needs to flip per-deploy
//! (bind address, config file path): an `Option<T>`-raw-then-defaulted
//! loading style, with env vars layered on top the way `main.rs` layers
//! `LOG_LEVEL`.
//!
//! Missing config file falls back to built-in defaults (no stored-for
//! peers, ephemeral relay) so the binary runs with zero setup.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Fully resolved, defaulted relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub ws_bind_addr: String,
    pub rest_bind_addr: String,
    /// Hex public keys the relay buffers messages for while they are offline.
    pub stored_for: Vec<String>,
    pub heartbeat_interval: Duration,
    pub idle_timeout: Duration,
    pub rest_token_ttl: Duration,
    pub rest_queue_capacity: usize,
    pub stored_buffer_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ws_bind_addr: "0.0.0.0:8080".to_owned(),
            rest_bind_addr: "0.0.0.0:8081".to_owned(),
            stored_for: Vec::new(),
            heartbeat_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
            rest_token_ttl: Duration::from_secs(24 * 60 * 60),
            rest_queue_capacity: 256,
            stored_buffer_capacity: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    ws_bind_addr: Option<String>,
    rest_bind_addr: Option<String>,
    #[serde(default)]
    stored_for: Vec<String>,
    heartbeat_interval_secs: Option<u64>,
    idle_timeout_secs: Option<u64>,
    rest_token_ttl_secs: Option<u64>,
    rest_queue_capacity: Option<usize>,
    stored_buffer_capacity: Option<usize>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "reading relay config: {msg}"),
            ConfigError::Parse(msg) => write!(f, "parsing relay config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn raw_to_config(raw: RawConfig) -> RelayConfig {
    let defaults = RelayConfig::default();
    RelayConfig {
        ws_bind_addr: raw.ws_bind_addr.unwrap_or(defaults.ws_bind_addr),
        rest_bind_addr: raw.rest_bind_addr.unwrap_or(defaults.rest_bind_addr),
        stored_for: raw
            .stored_for
            .into_iter()
            .map(|pk| pk.to_lowercase())
            .collect(),
        heartbeat_interval: raw
            .heartbeat_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.heartbeat_interval),
        idle_timeout: raw
            .idle_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.idle_timeout),
        rest_token_ttl: raw
            .rest_token_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.rest_token_ttl),
        rest_queue_capacity: raw
            .rest_queue_capacity
            .unwrap_or(defaults.rest_queue_capacity),
        stored_buffer_capacity: raw
            .stored_buffer_capacity
            .unwrap_or(defaults.stored_buffer_capacity),
    }
}

/// Loads config from a TOML string (used directly by tests and by
/// `load_from_path`).
pub fn load_from_str(toml_str: &str) -> Result<RelayConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(raw_to_config(raw))
}

/// Loads config from a TOML file at `path`.
pub fn load_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
    load_from_str(&toml_str)
}

/// Loads config the way `main.rs` does: `RELAY_CONFIG_PATH` names a TOML
/// file to read (if unset, or the file is absent, built-in defaults apply);
/// `RELAY_WS_BIND_ADDR`/`RELAY_REST_BIND_ADDR` override the bind addresses
/// from either source.
pub fn load_from_env() -> RelayConfig {
    let mut config = match std::env::var("RELAY_CONFIG_PATH") {
        Ok(path) => match load_from_path(Path::new(&path)) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load relay config file, using defaults");
                RelayConfig::default()
            }
        },
        Err(_) => RelayConfig::default(),
    };

    if let Ok(addr) = std::env::var("RELAY_WS_BIND_ADDR") {
        config.ws_bind_addr = addr;
    }
    if let Ok(addr) = std::env::var("RELAY_REST_BIND_ADDR") {
        config.rest_bind_addr = addr;
    }
    config
}
