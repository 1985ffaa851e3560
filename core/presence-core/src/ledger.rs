//! "Last seen" ledger of players who are not currently online.
//!
//! A row exists only while its player is offline. Joining deletes the row,
//! leaving upserts it with the departure time. Both operations are
//! idempotent.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{PresenceError, Result};

/// `DD/MM/YYYY HH:MM:SS`
pub const LAST_SEEN_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub username: String,
    pub last_seen: String,
}

impl LedgerEntry {
    pub fn last_seen_at(&self) -> Option<NaiveDateTime> {
        parse_last_seen(&self.last_seen)
    }
}

pub trait Ledger {
    fn put(&mut self, username: &str, last_seen: &str) -> Result<()>;
    fn delete(&mut self, username: &str) -> Result<()>;
    fn scan(&self) -> Result<Vec<LedgerEntry>>;
}

impl<L: Ledger + ?Sized> Ledger for Box<L> {
    fn put(&mut self, username: &str, last_seen: &str) -> Result<()> {
        (**self).put(username, last_seen)
    }

    fn delete(&mut self, username: &str) -> Result<()> {
        (**self).delete(username)
    }

    fn scan(&self) -> Result<Vec<LedgerEntry>> {
        (**self).scan()
    }
}

pub fn format_last_seen<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(LAST_SEEN_FORMAT).to_string()
}

pub fn parse_last_seen(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, LAST_SEEN_FORMAT).ok()
}

/// Most recently seen first. Unparseable timestamps go last, by name.
pub fn sort_recently_offline(entries: &mut [LedgerEntry]) {
    entries.sort_by(|left, right| {
        right
            .last_seen_at()
            .cmp(&left.last_seen_at())
            .then_with(|| left.username.cmp(&right.username))
    });
}

/// SQLite-backed ledger. Opens a connection per call so the handle stays
/// cheap to hold for the process lifetime.
#[derive(Debug)]
pub struct SqliteLedger {
    path: PathBuf,
}

impl SqliteLedger {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)
                .map_err(|err| PresenceError::io("Failed to create ledger directory", err))?;
        }
        let ledger = Self { path };
        ledger.init_schema()?;
        Ok(ledger)
    }

    fn init_schema(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS last_seen (
                    username TEXT PRIMARY KEY,
                    last_seen TEXT NOT NULL
                );",
            )
            .map_err(|err| PresenceError::ledger("Failed to initialize ledger schema", err))
        })
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(|err| PresenceError::ledger("Failed to open ledger database", err))?;
        f(&conn)
    }
}

impl Ledger for SqliteLedger {
    fn put(&mut self, username: &str, last_seen: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO last_seen (username, last_seen) VALUES (?1, ?2)
                 ON CONFLICT(username) DO UPDATE SET last_seen = excluded.last_seen",
                params![username, last_seen],
            )
            .map_err(|err| PresenceError::ledger("Failed to upsert last-seen entry", err))?;
            Ok(())
        })
    }

    fn delete(&mut self, username: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM last_seen WHERE username = ?1",
                params![username],
            )
            .map_err(|err| PresenceError::ledger("Failed to delete last-seen entry", err))?;
            Ok(())
        })
    }

    fn scan(&self) -> Result<Vec<LedgerEntry>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT username, last_seen FROM last_seen")
                .map_err(|err| PresenceError::ledger("Failed to prepare ledger scan", err))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(LedgerEntry {
                        username: row.get(0)?,
                        last_seen: row.get(1)?,
                    })
                })
                .map_err(|err| PresenceError::ledger("Failed to scan ledger", err))?;

            let mut entries = Vec::new();
            for row in rows {
                entries
                    .push(row.map_err(|err| PresenceError::ledger("Failed to decode ledger row", err))?);
            }
            Ok(entries)
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    entries: HashMap<String, String>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, username: &str) -> Option<&str> {
        self.entries.get(username).map(String::as_str)
    }
}

impl Ledger for MemoryLedger {
    fn put(&mut self, username: &str, last_seen: &str) -> Result<()> {
        self.entries
            .insert(username.to_string(), last_seen.to_string());
        Ok(())
    }

    fn delete(&mut self, username: &str) -> Result<()> {
        self.entries.remove(username);
        Ok(())
    }

    fn scan(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .entries
            .iter()
            .map(|(username, last_seen)| LedgerEntry {
                username: username.clone(),
                last_seen: last_seen.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate};

    fn sqlite_ledger() -> (tempfile::TempDir, SqliteLedger) {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let ledger = SqliteLedger::open(temp_dir.path().join("ledger.db")).expect("ledger");
        (temp_dir, ledger)
    }

    #[test]
    fn deleting_missing_key_is_not_an_error() {
        let (_dir, mut ledger) = sqlite_ledger();
        ledger.delete("nobody").expect("delete missing");
        assert!(ledger.scan().expect("scan").is_empty());
    }

    #[test]
    fn upsert_overwrites_existing_timestamp() {
        let (_dir, mut ledger) = sqlite_ledger();
        ledger.put("alice", "01/02/2026 10:00:00").expect("put");
        ledger.put("alice", "01/02/2026 11:30:00").expect("put again");

        let entries = ledger.scan().expect("scan");
        assert_eq!(
            entries,
            vec![LedgerEntry {
                username: "alice".to_string(),
                last_seen: "01/02/2026 11:30:00".to_string(),
            }]
        );
    }

    #[test]
    fn delete_removes_entry() {
        let (_dir, mut ledger) = sqlite_ledger();
        ledger.put("alice", "01/02/2026 10:00:00").expect("put");
        ledger.put("bob", "01/02/2026 10:05:00").expect("put");
        ledger.delete("alice").expect("delete");

        let names: Vec<_> = ledger
            .scan()
            .expect("scan")
            .into_iter()
            .map(|entry| entry.username)
            .collect();
        assert_eq!(names, vec!["bob".to_string()]);
    }

    #[test]
    fn ledger_survives_reopen() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("ledger.db");
        SqliteLedger::open(path.clone())
            .expect("ledger")
            .put("alice", "01/02/2026 10:00:00")
            .expect("put");

        let reopened = SqliteLedger::open(path).expect("reopen");
        assert_eq!(reopened.scan().expect("scan").len(), 1);
    }

    #[test]
    fn memory_ledger_is_idempotent() {
        let mut ledger = MemoryLedger::new();
        ledger.delete("alice").expect("delete missing");
        ledger.put("alice", "01/02/2026 10:00:00").expect("put");
        ledger.put("alice", "02/02/2026 10:00:00").expect("put");
        assert_eq!(ledger.get("alice"), Some("02/02/2026 10:00:00"));
    }

    #[test]
    fn last_seen_uses_day_first_format() {
        let at = NaiveDate::from_ymd_opt(2026, 3, 4)
            .and_then(|date| date.and_hms_opt(5, 6, 7))
            .expect("date");
        let local = Local.from_local_datetime(&at).single().expect("local");
        assert_eq!(format_last_seen(&local), "04/03/2026 05:06:07");
        assert_eq!(parse_last_seen("04/03/2026 05:06:07"), Some(at));
    }

    #[test]
    fn recently_offline_sorts_newest_first() {
        let mut entries = vec![
            LedgerEntry {
                username: "alice".to_string(),
                last_seen: "02/01/2026 09:00:00".to_string(),
            },
            LedgerEntry {
                username: "bob".to_string(),
                last_seen: "garbage".to_string(),
            },
            LedgerEntry {
                username: "carol".to_string(),
                last_seen: "01/02/2026 08:00:00".to_string(),
            },
        ];

        sort_recently_offline(&mut entries);

        let names: Vec<_> = entries.iter().map(|entry| entry.username.as_str()).collect();
        assert_eq!(names, vec!["carol", "alice", "bob"]);
    }
}
