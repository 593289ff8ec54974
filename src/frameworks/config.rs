use crate::domain::{MatchSettings, SettingsError};
use std::{env, path::Path, time::Duration};
use thiserror::Error;

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn tick_interval() -> Duration {
    let hz = env::var("TICK_RATE_HZ")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|hz| (1..=1000).contains(hz))
        .unwrap_or(60);
    Duration::from_secs_f64(1.0 / f64::from(hz))
}

pub fn lobby_linger() -> Duration {
    let secs = env::var("LOBBY_LINGER_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(secs)
}

pub fn lobby_idle_timeout() -> Duration {
    let secs = env::var("LOBBY_IDLE_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(300);
    Duration::from_secs(secs)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;

pub const DEFAULT_LOBBY_ID: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read match config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse match config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid match config: {0}")]
    Invalid(#[from] SettingsError),
}

/// Match tuning from `MATCH_CONFIG_PATH`, or the built-in table when unset.
pub fn match_settings() -> Result<MatchSettings, ConfigLoadError> {
    match env::var("MATCH_CONFIG_PATH") {
        Ok(path) if !path.trim().is_empty() => load_match_settings(Path::new(path.trim())),
        _ => Ok(MatchSettings::default()),
    }
}

pub fn load_match_settings(path: &Path) -> Result<MatchSettings, ConfigLoadError> {
    let content = std::fs::read_to_string(path)?;
    parse_match_settings(&content)
}

/// Parses a TOML match table. Missing keys keep their defaults.
pub fn parse_match_settings(content: &str) -> Result<MatchSettings, ConfigLoadError> {
    let settings: MatchSettings = toml::from_str(content)?;
    settings.validate()?;
    Ok(settings)
}
