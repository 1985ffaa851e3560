//! In-memory collaborators for driving the monitor in tests.
//!
//! Every fake appends to one shared [`Journal`], so a test can assert the
//! exact order of side effects across snapshot mirror, display, ledger,
//! indicator and clock.

use chrono::{DateTime, Local, TimeZone};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::display::DisplaySurface;
use crate::error::{PresenceError, Result};
use crate::indicator::{Channel, Indicator};
use crate::ledger::{Ledger, LedgerEntry, MemoryLedger};
use crate::mirror::RemoteMirror;
use crate::roster::Roster;
use crate::source::{PollOutcome, RosterSource};
use crate::transition::{Collaborators, TransitionHandler};

#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Entries starting with `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// Replays a fixed list of outcomes. Reports `NoResponse` once drained and
/// raises `stop` (if given) when the last outcome is handed out.
pub struct ScriptedSource {
    outcomes: VecDeque<PollOutcome>,
    stop: Option<Arc<AtomicBool>>,
    journal: Journal,
}

impl ScriptedSource {
    pub fn new(outcomes: Vec<PollOutcome>, journal: Journal) -> Self {
        Self {
            outcomes: outcomes.into(),
            stop: None,
            journal,
        }
    }

    pub fn stopping(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }
}

impl RosterSource for ScriptedSource {
    fn poll(&mut self) -> PollOutcome {
        self.journal.record("source:poll");
        let outcome = self.outcomes.pop_front().unwrap_or(PollOutcome::NoResponse);
        if self.outcomes.is_empty() {
            if let Some(stop) = &self.stop {
                stop.store(true, Ordering::SeqCst);
            }
        }
        outcome
    }

    fn shutdown(&mut self) {
        self.journal.record("source:shutdown");
    }
}

pub fn roster(names: &[&str]) -> PollOutcome {
    PollOutcome::Roster(Roster::from_names(names.iter().copied()))
}

pub struct RecordingDisplay {
    journal: Journal,
}

impl DisplaySurface for RecordingDisplay {
    fn clear(&mut self) -> Result<()> {
        self.journal.record("display:clear");
        Ok(())
    }

    fn render(&mut self, text: &str) -> Result<()> {
        self.journal.record(format!("display:{text}"));
        Ok(())
    }
}

pub struct RecordingIndicator {
    journal: Journal,
}

impl Indicator for RecordingIndicator {
    fn set(&mut self, channel: Channel, on: bool) -> Result<()> {
        let state = if on { "on" } else { "off" };
        self.journal
            .record(format!("indicator:{}:{state}", channel.as_str()));
        Ok(())
    }
}

pub struct RecordingMirror {
    journal: Journal,
    fail: bool,
}

impl RemoteMirror for RecordingMirror {
    fn push(&mut self, local: &Path) -> Result<()> {
        let contents = fs_err::read_to_string(local)
            .map_err(|err| PresenceError::io("Failed to read snapshot for mirror", err))?;
        let names: Vec<String> = serde_json::from_str(&contents).map_err(|err| PresenceError::Json {
            context: "Failed to parse snapshot for mirror".to_string(),
            source: err,
        })?;
        self.journal.record(format!("mirror:{}", names.join(",")));
        if self.fail {
            return Err(PresenceError::Mirror("mirror host unreachable".to_string()));
        }
        Ok(())
    }
}

/// Ledger shared between the handler under test and the test body.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Rc<RefCell<MemoryLedger>>,
    journal: Option<Journal>,
    fail: bool,
}

impl SharedLedger {
    pub fn get(&self, username: &str) -> Option<String> {
        self.inner.borrow().get(username).map(str::to_string)
    }

    pub fn seed(&self, username: &str, last_seen: &str) {
        self.inner
            .borrow_mut()
            .put(username, last_seen)
            .expect("seed ledger");
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(PresenceError::ledger(
                "ledger offline",
                rusqlite::Error::InvalidQuery,
            ));
        }
        Ok(())
    }
}

impl Ledger for SharedLedger {
    fn put(&mut self, username: &str, last_seen: &str) -> Result<()> {
        if let Some(journal) = &self.journal {
            journal.record(format!("ledger:put:{username}:{last_seen}"));
        }
        self.check()?;
        self.inner.borrow_mut().put(username, last_seen)
    }

    fn delete(&mut self, username: &str) -> Result<()> {
        if let Some(journal) = &self.journal {
            journal.record(format!("ledger:delete:{username}"));
        }
        self.check()?;
        self.inner.borrow_mut().delete(username)
    }

    fn scan(&self) -> Result<Vec<LedgerEntry>> {
        self.check()?;
        self.inner.borrow().scan()
    }
}

/// Fixed wall clock that records sleeps instead of blocking.
pub struct ManualClock {
    now: DateTime<Local>,
    journal: Journal,
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.now
    }

    fn sleep(&self, duration: Duration) {
        self.journal.record(format!("sleep:{}ms", duration.as_millis()));
    }

    fn sleep_until_stopped(&self, duration: Duration, stop: &AtomicBool) -> bool {
        self.journal.record(format!("wait:{}ms", duration.as_millis()));
        stop.load(Ordering::SeqCst)
    }
}

/// 04/03/2026 05:06:07 local time.
pub fn fixed_now() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 3, 4, 5, 6, 7)
        .earliest()
        .unwrap_or_else(Local::now)
}

/// Builds a [`TransitionHandler`] wired to recording fakes.
#[derive(Debug, Clone)]
pub struct Harness {
    pub journal: Journal,
    pub ledger: SharedLedger,
    pub failing_mirror: bool,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let journal = Journal::default();
        let ledger = SharedLedger {
            journal: Some(journal.clone()),
            ..SharedLedger::default()
        };
        Self {
            journal,
            ledger,
            failing_mirror: false,
        }
    }

    pub fn with_failing_ledger(mut self) -> Self {
        self.ledger.fail = true;
        self
    }

    pub fn with_failing_mirror(mut self) -> Self {
        self.failing_mirror = true;
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            mirror: Box::new(RecordingMirror {
                journal: self.journal.clone(),
                fail: self.failing_mirror,
            }),
            ledger: Box::new(self.ledger.clone()),
            indicator: Box::new(RecordingIndicator {
                journal: self.journal.clone(),
            }),
            display: Box::new(RecordingDisplay {
                journal: self.journal.clone(),
            }),
            clock: Box::new(ManualClock {
                now: fixed_now(),
                journal: self.journal.clone(),
            }),
        }
    }

    pub fn handler(&self, snapshot_path: PathBuf, dwell: Duration) -> TransitionHandler {
        TransitionHandler::new(snapshot_path, self.collaborators(), dwell)
    }

    pub fn source(&self, outcomes: Vec<PollOutcome>) -> ScriptedSource {
        ScriptedSource::new(outcomes, self.journal.clone())
    }
}
