//! The published snapshot: the last roster written to the local file and
//! pushed to the remote mirror.
//!
//! # File Format
//!
//! ```json
//! [
//!   "alice",
//!   "bob"
//! ]
//! ```
//!
//! The file is rewritten in full on every change. The local file is the
//! source of truth; mirror failures are logged and left for the next push
//! to repair.

use fs_err as fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{PresenceError, Result};
use crate::mirror::RemoteMirror;
use crate::roster::Roster;

pub struct SnapshotStore<M: RemoteMirror> {
    path: PathBuf,
    mirror: M,
    published: Roster,
}

impl<M: RemoteMirror> SnapshotStore<M> {
    /// The in-memory snapshot starts empty; nothing is written until the
    /// first publish.
    pub fn new(path: PathBuf, mirror: M) -> Self {
        Self {
            path,
            mirror,
            published: Roster::empty(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn published(&self) -> &Roster {
        &self.published
    }

    /// Replaces the snapshot wholesale.
    pub fn publish(&mut self, roster: &Roster) -> Result<()> {
        self.published = roster.clone();
        self.persist()
    }

    pub fn add(&mut self, player: &str) -> Result<()> {
        if self.published.contains(player) {
            return Err(PresenceError::Consistency(format!(
                "{} joined but is already in the snapshot",
                player
            )));
        }
        self.published.push(player.to_string());
        self.persist()
    }

    /// Rewrites the file and pushes the mirror without changing the roster.
    pub fn refresh(&mut self) -> Result<()> {
        self.persist()
    }

    pub fn remove(&mut self, player: &str) -> Result<()> {
        if !self.published.remove(player) {
            return Err(PresenceError::Consistency(format!(
                "{} left but is not in the snapshot",
                player
            )));
        }
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        write_snapshot(&self.path, &self.published)?;
        debug!(path = %self.path.display(), players = self.published.len(), "Snapshot written");

        if let Err(err) = self.mirror.push(&self.path) {
            warn!(error = %err, "Snapshot mirror push failed; remote copy is stale");
        }
        Ok(())
    }
}

pub fn write_snapshot(path: &Path, roster: &Roster) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| PresenceError::io("Failed to create snapshot directory", err))?;
    }
    let content = serde_json::to_string_pretty(roster).map_err(|err| PresenceError::Json {
        context: "Failed to serialize snapshot".to_string(),
        source: err,
    })?;
    fs::write(path, content).map_err(|err| PresenceError::io("Failed to write snapshot", err))
}

/// Reads a snapshot file. A missing or blank file is an empty roster.
pub fn load_snapshot(path: &Path) -> Result<Roster> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Roster::empty()),
        Err(err) => return Err(PresenceError::io("Failed to read snapshot", err)),
    };
    if content.trim().is_empty() {
        return Ok(Roster::empty());
    }
    serde_json::from_str(&content).map_err(|err| PresenceError::Json {
        context: format!("Failed to parse snapshot {}", path.display()),
        source: err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::NoMirror;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FailingMirror {
        attempts: Rc<Cell<usize>>,
    }

    impl RemoteMirror for FailingMirror {
        fn push(&mut self, _local: &Path) -> Result<()> {
            self.attempts.set(self.attempts.get() + 1);
            Err(PresenceError::Mirror("unreachable".to_string()))
        }
    }

    fn store(temp_dir: &tempfile::TempDir) -> SnapshotStore<NoMirror> {
        SnapshotStore::new(temp_dir.path().join("players.json"), NoMirror)
    }

    #[test]
    fn publish_writes_pretty_json_array() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = store(&temp_dir);

        store
            .publish(&Roster::from_names(vec!["alice", "bob"]))
            .expect("publish");

        let content = std::fs::read_to_string(store.path()).expect("read");
        assert_eq!(content, "[\n  \"alice\",\n  \"bob\"\n]");
    }

    #[test]
    fn publish_of_sentinel_roster_writes_empty_array() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = store(&temp_dir);

        store.publish(&Roster::from_names(vec![""])).expect("publish");

        assert_eq!(std::fs::read_to_string(store.path()).expect("read"), "[]");
    }

    #[test]
    fn add_and_remove_rewrite_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = store(&temp_dir);
        store
            .publish(&Roster::from_names(vec!["alice"]))
            .expect("publish");

        store.add("bob").expect("add");
        store.remove("alice").expect("remove");

        let loaded = load_snapshot(store.path()).expect("load");
        assert_eq!(loaded.names(), &["bob".to_string()]);
        assert_eq!(store.published(), &loaded);
    }

    #[test]
    fn removing_unknown_player_is_a_consistency_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = store(&temp_dir);

        let err = store.remove("ghost").expect_err("unknown player");
        assert!(err.is_consistency());
        assert!(!store.path().exists());
    }

    #[test]
    fn adding_duplicate_player_is_a_consistency_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = store(&temp_dir);
        store.add("alice").expect("add");

        let err = store.add("alice").expect_err("duplicate");
        assert!(err.is_consistency());
        assert_eq!(store.published().len(), 1);
    }

    #[test]
    fn mirror_failure_keeps_local_write() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let attempts = Rc::new(Cell::new(0));
        let mut store = SnapshotStore::new(
            temp_dir.path().join("players.json"),
            FailingMirror {
                attempts: Rc::clone(&attempts),
            },
        );

        store.add("alice").expect("local write succeeds");

        assert_eq!(attempts.get(), 1);
        let loaded = load_snapshot(store.path()).expect("load");
        assert!(loaded.contains("alice"));
    }

    #[test]
    fn load_missing_or_blank_snapshot_is_empty() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("players.json");
        assert!(load_snapshot(&path).expect("missing").is_empty());

        std::fs::write(&path, "  \n").expect("write");
        assert!(load_snapshot(&path).expect("blank").is_empty());

        std::fs::write(&path, "[\"\"]").expect("write");
        assert!(load_snapshot(&path).expect("sentinel").is_empty());
    }
}
