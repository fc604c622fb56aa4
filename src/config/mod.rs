//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::modes::GameMode;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Simulation ticks per second for hosted matches
    pub tick_rate: u32,
    /// Maximum combatants per match
    pub max_combatants: usize,
    /// Number of spawn points on the hosted map
    pub spawn_points: usize,

    /// Mode used when a create request doesn't name one
    pub default_mode: GameMode,
    /// Map used when a create request doesn't name one
    pub default_map: String,
    /// Score target override (0 = mode default)
    pub score_target: i32,

    /// Allowed client origins for CORS (comma-separated, empty = any)
    pub client_origin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let default_mode = match env::var("DEFAULT_MODE") {
            Ok(raw) => raw
                .parse::<GameMode>()
                .map_err(|_| ConfigError::Invalid("DEFAULT_MODE"))?,
            Err(_) => GameMode::Deathmatch,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            tick_rate: parse_or("TICK_RATE", crate::util::time::SIMULATION_TPS)?,
            max_combatants: parse_or("MAX_COMBATANTS", 8)?,
            spawn_points: parse_or("SPAWN_POINTS", 8)?,

            default_mode,
            default_map: env::var("DEFAULT_MAP").unwrap_or_else(|_| "arena".to_string()),
            score_target: parse_or("SCORE_TARGET", 0)?,

            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_default(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            tick_rate: crate::util::time::SIMULATION_TPS,
            max_combatants: 8,
            spawn_points: 8,
            default_mode: GameMode::Deathmatch,
            default_map: "arena".to_string(),
            score_target: 0,
            client_origin: String::new(),
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
