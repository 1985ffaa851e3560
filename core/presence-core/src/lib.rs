//! # presence-core
//!
//! Core library for the presence monitor: polls a game server's player
//! roster, turns roster changes into join/leave events and drives the
//! collaborators that react to them (published snapshot, remote mirror,
//! last-seen ledger, indicator pins, display).
//!
//! ## Design Principles
//!
//! - **Synchronous**: one thread, one poll cycle at a time. No async runtime.
//! - **Outages are data**: an unreachable or unauthorized source is a poll
//!   outcome shown on the display, never a crash.
//! - **Collaborators behind traits**: every side effect goes through a trait
//!   so the whole cycle runs against in-memory fakes in tests.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use presence_core::{PresenceMonitor, RconRosterSource, TransitionHandler};
//!
//! let source = RconRosterSource::connect(&config.rcon_settings())?;
//! let handler = TransitionHandler::new(snapshot_path, collaborators, dwell);
//! let mut monitor = PresenceMonitor::new(Box::new(source), handler, interval);
//! monitor.run(&stop)?;
//! monitor.shutdown();
//! ```

pub mod clock;
pub mod config;
pub mod diff;
pub mod display;
pub mod error;
pub mod indicator;
pub mod ledger;
pub mod mirror;
pub mod monitor;
pub mod rcon;
pub mod roster;
pub mod snapshot;
pub mod source;
pub mod status;
pub mod storage;
pub mod transition;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use clock::{Clock, SystemClock};
pub use config::MonitorConfig;
pub use diff::{compute_diff, diff, ChangeKind, PresenceEvent, RosterDiff};
pub use display::{ConsoleDisplay, DisplaySurface, FileDisplay};
pub use error::{PresenceError, Result};
pub use indicator::{Channel, DeviceIndicator, Indicator, LogIndicator, PinMap};
pub use ledger::{Ledger, LedgerEntry, MemoryLedger, SqliteLedger};
pub use mirror::{CopyMirror, NoMirror, RemoteMirror, ScpMirror};
pub use monitor::{CycleReport, PresenceMonitor};
pub use roster::Roster;
pub use source::{PollOutcome, RconRosterSource, RosterSource};
pub use status::{build_report, PresenceReport};
pub use storage::StorageConfig;
pub use transition::{Collaborators, TransitionHandler};
