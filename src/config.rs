use crate::error::{ConfigErrorKind, InfraError};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tcp_addr: String,       // e.g. "0.0.0.0:4000"
    pub max_clients: usize,     // connection slots, fixed for the lifetime of the server
    pub buffer_size: usize,     // longest inbound frame in bytes, longer ones are truncated
    pub data_dir: PathBuf,      // chunk records and the account file live below this
    pub shutdown_sentinel: String, // frame that stops the server, empty disables it
    pub outbound_queue: usize,  // frames queued per client before it counts as stalled
    pub event_queue: usize,     // inbound events queued before readers wait for the game loop

    pub shot_broadcast_ms: u64,
    pub shot_clear_ms: u64,
    pub departure_ms: u64,
    pub player_count_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tcp_addr: "0.0.0.0:4000".to_string(),
            max_clients: 99,
            buffer_size: 512,
            data_dir: PathBuf::from("data"),
            shutdown_sentinel: "/shutdown".to_string(),
            outbound_queue: 128,
            event_queue: 256,
            shot_broadcast_ms: 50,
            shot_clear_ms: 160,
            departure_ms: 250,
            player_count_ms: 2000,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InfraError> {
        let path = path.as_ref();
        let wrap = |source| InfraError::Config {
            path: path.to_path_buf(),
            source,
        };

        let data = std::fs::read_to_string(path).map_err(|e| wrap(ConfigErrorKind::Read(e)))?;
        let cfg: Self = toml::from_str(&data).map_err(|e| wrap(ConfigErrorKind::Parse(e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self, InfraError> {
        let _ = dotenvy::from_filename(".env");
        let d = Self::default();
        let cfg = Self {
            tcp_addr: env_or("ORBIS_TCP_ADDR", d.tcp_addr)?,
            max_clients: env_or("ORBIS_MAX_CLIENTS", d.max_clients)?,
            buffer_size: env_or("ORBIS_BUFFER_SIZE", d.buffer_size)?,
            data_dir: env_or("ORBIS_DATA_DIR", d.data_dir)?,
            shutdown_sentinel: env_or("ORBIS_SHUTDOWN_SENTINEL", d.shutdown_sentinel)?,
            outbound_queue: env_or("ORBIS_OUTBOUND_QUEUE", d.outbound_queue)?,
            event_queue: env_or("ORBIS_EVENT_QUEUE", d.event_queue)?,
            shot_broadcast_ms: env_or("ORBIS_SHOT_BROADCAST_MS", d.shot_broadcast_ms)?,
            shot_clear_ms: env_or("ORBIS_SHOT_CLEAR_MS", d.shot_clear_ms)?,
            departure_ms: env_or("ORBIS_DEPARTURE_MS", d.departure_ms)?,
            player_count_ms: env_or("ORBIS_PLAYER_COUNT_MS", d.player_count_ms)?,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigErrorKind> {
        self.socket_addr()?;
        if self.max_clients == 0 {
            return Err(invalid("max_clients", "must be at least 1"));
        }
        for (field, size) in [
            ("buffer_size", self.buffer_size),
            ("outbound_queue", self.outbound_queue),
            ("event_queue", self.event_queue),
        ] {
            if size == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }
        for (field, ms) in [
            ("shot_broadcast_ms", self.shot_broadcast_ms),
            ("shot_clear_ms", self.shot_clear_ms),
            ("departure_ms", self.departure_ms),
            ("player_count_ms", self.player_count_ms),
        ] {
            if ms == 0 {
                return Err(invalid(field, "interval must be non-zero"));
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigErrorKind> {
        self.tcp_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("tcp_addr", e.to_string()))
    }

    /// Replace the port of `tcp_addr`, keeping the host.
    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigErrorKind> {
        let mut addr = self.socket_addr()?;
        addr.set_port(port);
        self.tcp_addr = addr.to_string();
        Ok(())
    }

    pub fn is_shutdown_sentinel(&self, frame: &[u8]) -> bool {
        !self.shutdown_sentinel.is_empty() && frame == self.shutdown_sentinel.as_bytes()
    }

    pub fn chunk_dir(&self) -> PathBuf {
        self.data_dir.join("chunks")
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join("accounts.txt")
    }

    pub fn shot_broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.shot_broadcast_ms)
    }

    pub fn shot_clear_interval(&self) -> Duration {
        Duration::from_millis(self.shot_clear_ms)
    }

    pub fn departure_interval(&self) -> Duration {
        Duration::from_millis(self.departure_ms)
    }

    pub fn player_count_interval(&self) -> Duration {
        Duration::from_millis(self.player_count_ms)
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigErrorKind {
    ConfigErrorKind::Invalid {
        field,
        message: message.into(),
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, ConfigErrorKind> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigErrorKind::InvalidEnv(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}
