//! Configuration for the canvas server.
//!
//! Defaults can be overridden via environment variables (and then by
//! command-line flags in `main`):
//!
//! - `CANVAS_BIND_ADDR`         (default: "0.0.0.0")
//! - `CANVAS_PORT`              (default: "9100")
//! - `CANVAS_MAX_PLAYERS`       (default: "4096")
//! - `CANVAS_WIDTH`             (default: "200")
//! - `CANVAS_HEIGHT`            (default: "200")
//! - `CANVAS_COOLDOWN_SECS`     (default: "5")
//! - `CANVAS_TICK_MS`           (default: "100")
//! - `CANVAS_HEARTBEAT_MS`      (default: "1000")
//! - `CANVAS_RESYNC_MS`         (default: "5000")
//! - `CANVAS_OUTBOUND_CAPACITY` (default: "256")
//! - `CANVAS_DATA_DIR`          (unset: in-memory storage)
//! - `CANVAS_SESSIONS_FILE`     (unset: any token is accepted as the player id)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Parse { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously registered players.
    pub max_players: usize,

    /// Canvas width in cells.
    pub width: u8,

    /// Canvas height in cells.
    pub height: u8,

    /// Minimum interval between accepted edits from one player.
    pub cooldown: Duration,

    /// Period of the diff broadcast + persist tick.
    pub tick_period: Duration,

    /// Period of the player counter broadcast.
    pub heartbeat_period: Duration,

    /// Period of the full-snapshot resync.
    pub resync_period: Duration,

    /// Frames queued per player before it is disconnected as too slow.
    pub outbound_capacity: usize,

    /// Directory for persisted state. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,

    /// TOML token table. `None` accepts any token as the player id.
    pub sessions_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 9100,
            max_players: 4096,
            width: 200,
            height: 200,
            cooldown: Duration::from_secs(5),
            tick_period: Duration::from_millis(100),
            heartbeat_period: Duration::from_secs(1),
            resync_period: Duration::from_secs(5),
            outbound_capacity: 256,
            data_dir: None,
            sessions_file: None,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to reasonable defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            bind_addr: lookup("CANVAS_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: read_or_default(&lookup, "CANVAS_PORT", defaults.port)?,
            max_players: read_or_default(&lookup, "CANVAS_MAX_PLAYERS", defaults.max_players)?,
            width: read_or_default(&lookup, "CANVAS_WIDTH", defaults.width)?,
            height: read_or_default(&lookup, "CANVAS_HEIGHT", defaults.height)?,
            cooldown: Duration::from_secs(read_or_default(
                &lookup,
                "CANVAS_COOLDOWN_SECS",
                defaults.cooldown.as_secs(),
            )?),
            tick_period: read_millis_or_default(&lookup, "CANVAS_TICK_MS", defaults.tick_period)?,
            heartbeat_period: read_millis_or_default(
                &lookup,
                "CANVAS_HEARTBEAT_MS",
                defaults.heartbeat_period,
            )?,
            resync_period: read_millis_or_default(
                &lookup,
                "CANVAS_RESYNC_MS",
                defaults.resync_period,
            )?,
            outbound_capacity: read_or_default(
                &lookup,
                "CANVAS_OUTBOUND_CAPACITY",
                defaults.outbound_capacity,
            )?,
            data_dir: lookup("CANVAS_DATA_DIR").map(PathBuf::from),
            sessions_file: lookup("CANVAS_SESSIONS_FILE").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::Zero("width"));
        }
        if self.height == 0 {
            return Err(ConfigError::Zero("height"));
        }
        if self.tick_period.is_zero() {
            return Err(ConfigError::Zero("tick period"));
        }
        if self.heartbeat_period.is_zero() {
            return Err(ConfigError::Zero("heartbeat period"));
        }
        if self.resync_period.is_zero() {
            return Err(ConfigError::Zero("resync period"));
        }
        if self.outbound_capacity == 0 {
            return Err(ConfigError::Zero("outbound capacity"));
        }
        if self.max_players == 0 {
            return Err(ConfigError::Zero("max players"));
        }
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_or_default<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Parse { key, value: val }),
        None => Ok(default),
    }
}

fn read_millis_or_default<F>(
    lookup: &F,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let millis = read_or_default(lookup, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}
