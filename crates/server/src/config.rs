use std::net::SocketAddr;
use std::path::Path;

use pulse_common::retry::RetryConfig;
use pulse_workers::bridge::BridgeConfig;
use serde::Deserialize;

use crate::hub::HubConfig;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub nats_url: String,
    /// Without a database, alert history and rules live in process memory.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub api_token: Option<String>,
    pub log_json: bool,
    pub hub: HubConfig,
    pub bridge: BridgeConfig,
    pub startup_retry: RetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            nats_url: "nats://127.0.0.1:4222".into(),
            database_url: None,
            database_max_connections: 10,
            api_token: None,
            log_json: true,
            hub: HubConfig::default(),
            bridge: BridgeConfig::default(),
            startup_retry: RetryConfig {
                max_attempts: 5,
                initial_delay_ms: 500,
                max_delay_ms: 10_000,
                backoff_factor: 2.0,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("env {var}: invalid value {value:?}")]
    Env { var: &'static str, value: String },
    #[error("validation: {0}")]
    Validation(String),
}

/// Reads the file if one is given, applies `PULSE_*` overrides from the
/// process environment, then validates.
pub fn load(path: Option<&Path>) -> Result<ServerConfig, LoadError> {
    let mut cfg = match path {
        Some(path) => parse_file(path)?,
        None => ServerConfig::default(),
    };
    apply_env_overrides(&mut cfg, |var| std::env::var(var).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_from_file(path: &Path) -> Result<ServerConfig, LoadError> {
    let cfg = parse_file(path)?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_from_str(yaml: &str) -> Result<ServerConfig, LoadError> {
    let cfg = parse_str(yaml)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn parse_file(path: &Path) -> Result<ServerConfig, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    parse_str(&contents)
}

fn parse_str(yaml: &str) -> Result<ServerConfig, LoadError> {
    if yaml.trim().is_empty() {
        return Ok(ServerConfig::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

pub fn apply_env_overrides<F>(cfg: &mut ServerConfig, lookup: F) -> Result<(), LoadError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("PULSE_LISTEN_ADDR") {
        cfg.listen_addr = value.parse().map_err(|_| LoadError::Env {
            var: "PULSE_LISTEN_ADDR",
            value,
        })?;
    }
    if let Some(value) = lookup("PULSE_NATS_URL") {
        cfg.nats_url = value;
    }
    if let Some(value) = lookup("PULSE_DATABASE_URL") {
        cfg.database_url = Some(value).filter(|v| !v.is_empty());
    }
    if let Some(value) = lookup("PULSE_API_TOKEN") {
        cfg.api_token = Some(value).filter(|v| !v.is_empty());
    }
    if let Some(value) = lookup("PULSE_LOG_JSON") {
        cfg.log_json = match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(LoadError::Env {
                    var: "PULSE_LOG_JSON",
                    value,
                })
            }
        };
    }
    Ok(())
}

pub fn validate(cfg: &ServerConfig) -> Result<(), LoadError> {
    if cfg.nats_url.trim().is_empty() {
        return Err(LoadError::Validation("nats_url must not be empty".into()));
    }
    if cfg.api_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(LoadError::Validation("api_token must not be blank".into()));
    }
    if cfg.database_max_connections == 0 {
        return Err(LoadError::Validation(
            "database_max_connections must be > 0".into(),
        ));
    }
    if cfg.hub.client_queue_capacity == 0 {
        return Err(LoadError::Validation(
            "hub.client_queue_capacity must be > 0".into(),
        ));
    }
    if cfg.hub.max_consecutive_drops == 0 {
        return Err(LoadError::Validation(
            "hub.max_consecutive_drops must be > 0".into(),
        ));
    }
    if cfg.hub.command_queue_capacity == 0 {
        return Err(LoadError::Validation(
            "hub.command_queue_capacity must be > 0".into(),
        ));
    }
    if cfg.bridge.batch_size == 0 {
        return Err(LoadError::Validation("bridge.batch_size must be > 0".into()));
    }
    Ok(())
}
