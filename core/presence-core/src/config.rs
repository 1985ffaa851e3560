//! Daemon configuration (`config.toml`).
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below. Relative file locations are resolved through
//! [`StorageConfig`].
//!
//! ```toml
//! [rcon]
//! host = "mc.example.net"
//! port = 3870
//! password = "..."   # or PRESENCE_RCON_PASSWORD
//!
//! [indicator]
//! enabled = true
//! join_pin = 23
//! leave_pin = 24
//!
//! [mirror]
//! kind = "scp"
//! host = "web.example.net"
//! user = "ec2-user"
//! identity_file = "/home/pi/keys/pair.pem"
//! target = "/var/www/players.json"
//! ```

use fs_err as fs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::error::{PresenceError, Result};
use crate::indicator::{PinMap, DEFAULT_DEVICE_PATH, DEFAULT_JOIN_PIN, DEFAULT_LEAVE_PIN};
use crate::monitor::DEFAULT_POLL_INTERVAL;
use crate::rcon::DEFAULT_RCON_PORT;
use crate::source::RconSettings;
use crate::storage::StorageConfig;
use crate::transition::DEFAULT_DWELL;

pub const PASSWORD_ENV: &str = "PRESENCE_RCON_PASSWORD";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    pub rcon: RconConfig,
    pub poll: PollConfig,
    pub indicator: IndicatorConfig,
    pub display: DisplayConfig,
    pub snapshot: SnapshotConfig,
    pub mirror: MirrorConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RconConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub timeout_ms: u64,
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_RCON_PORT,
            password: String::new(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub enabled: bool,
    pub device: PathBuf,
    pub join_pin: u32,
    pub leave_pin: u32,
    pub dwell_ms: u64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            device: PathBuf::from(DEFAULT_DEVICE_PATH),
            join_pin: DEFAULT_JOIN_PIN,
            leave_pin: DEFAULT_LEAVE_PIN,
            dwell_ms: DEFAULT_DWELL.as_millis() as u64,
        }
    }
}

impl IndicatorConfig {
    pub fn pins(&self) -> PinMap {
        PinMap {
            join: self.join_pin,
            leave: self.leave_pin,
        }
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    #[default]
    Console,
    File,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DisplayConfig {
    pub kind: DisplayKind,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MirrorKind {
    #[default]
    None,
    Copy,
    Scp,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MirrorConfig {
    pub kind: MirrorKind,
    /// Destination path: local for `copy`, remote for `scp`.
    pub target: String,
    pub host: String,
    pub user: String,
    pub identity_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: Option<PathBuf>,
}

impl MonitorConfig {
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|err| PresenceError::ConfigMalformed {
            path: origin.to_path_buf(),
            details: err.to_string(),
        })
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found; using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(PresenceError::io("Failed to read config file", err)),
        };
        Self::parse(&content, path)
    }

    /// A non-empty password override replaces the configured one.
    pub fn with_password_override(mut self, password: Option<String>) -> Self {
        if let Some(password) = password.filter(|value| !value.is_empty()) {
            self.rcon.password = password;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let origin = PathBuf::from("config.toml");
        if self.poll.interval_secs == 0 {
            return Err(PresenceError::ConfigMalformed {
                path: origin,
                details: "poll.interval_secs must be positive".to_string(),
            });
        }
        if self.mirror.kind != MirrorKind::None && self.mirror.target.trim().is_empty() {
            return Err(PresenceError::ConfigMalformed {
                path: origin,
                details: "mirror.target is required when a mirror is configured".to_string(),
            });
        }
        if self.mirror.kind == MirrorKind::Scp
            && (self.mirror.host.trim().is_empty() || self.mirror.user.trim().is_empty())
        {
            return Err(PresenceError::ConfigMalformed {
                path: origin,
                details: "mirror.host and mirror.user are required for scp".to_string(),
            });
        }
        Ok(())
    }

    pub fn rcon_settings(&self) -> RconSettings {
        RconSettings {
            host: self.rcon.host.clone(),
            port: self.rcon.port,
            password: self.rcon.password.clone(),
            timeout: Duration::from_millis(self.rcon.timeout_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }

    pub fn snapshot_path(&self, storage: &StorageConfig) -> PathBuf {
        self.snapshot
            .path
            .clone()
            .unwrap_or_else(|| storage.snapshot_file())
    }

    pub fn ledger_path(&self, storage: &StorageConfig) -> PathBuf {
        self.ledger
            .path
            .clone()
            .unwrap_or_else(|| storage.ledger_file())
    }

    pub fn display_path(&self, storage: &StorageConfig) -> PathBuf {
        self.display
            .path
            .clone()
            .unwrap_or_else(|| storage.display_file())
    }
}
