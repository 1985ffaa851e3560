//! Default file locations for the presence monitor.
//!
//! Production code uses `StorageConfig::from_home()`, rooted at `~/.presence`.
//! Tests use `StorageConfig::with_root(temp_dir)`.

use std::path::{Path, PathBuf};

use crate::error::{PresenceError, Result};

#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(PresenceError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(".presence"),
        })
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// config.toml (daemon settings).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// players.json (published snapshot).
    pub fn snapshot_file(&self) -> PathBuf {
        self.root.join("players.json")
    }

    /// last_seen.db (ledger of offline players).
    pub fn ledger_file(&self) -> PathBuf {
        self.root.join("last_seen.db")
    }

    /// display.txt (file display target).
    pub fn display_file(&self) -> PathBuf {
        self.root.join("display.txt")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted() {
        let storage = StorageConfig::with_root(PathBuf::from("/tmp/presence-test"));
        assert_eq!(storage.config_file(), PathBuf::from("/tmp/presence-test/config.toml"));
        assert_eq!(storage.snapshot_file(), PathBuf::from("/tmp/presence-test/players.json"));
        assert_eq!(storage.ledger_file(), PathBuf::from("/tmp/presence-test/last_seen.db"));
        assert_eq!(storage.logs_dir(), PathBuf::from("/tmp/presence-test/logs"));
    }
}
