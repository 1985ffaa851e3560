//! Applies presence events to the outside world.
//!
//! Each event runs the same fixed sequence: snapshot (local file, then
//! mirror), display, ledger, indicator pulse. The pulse holds its channel on
//! for the dwell time before the next event is touched, so two pulses never
//! overlap.
//!
//! Failure policy per step:
//!
//! | step      | on failure                                   |
//! |-----------|----------------------------------------------|
//! | snapshot  | error (consistency or local write)           |
//! | mirror    | logged inside [`SnapshotStore`], ignored     |
//! | display   | error                                        |
//! | ledger    | logged, ignored                              |
//! | indicator | error                                        |

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::diff::PresenceEvent;
use crate::display::{joined_message, left_message, DisplaySurface};
use crate::error::Result;
use crate::indicator::{Channel, Indicator};
use crate::ledger::{format_last_seen, Ledger};
use crate::mirror::RemoteMirror;
use crate::roster::Roster;
use crate::snapshot::SnapshotStore;

pub const DEFAULT_DWELL: Duration = Duration::from_secs(2);

/// The long-lived handles a handler drives. Built once at startup.
pub struct Collaborators {
    pub mirror: Box<dyn RemoteMirror>,
    pub ledger: Box<dyn Ledger>,
    pub indicator: Box<dyn Indicator>,
    pub display: Box<dyn DisplaySurface>,
    pub clock: Box<dyn Clock>,
}

pub struct TransitionHandler {
    snapshot: SnapshotStore<Box<dyn RemoteMirror>>,
    ledger: Box<dyn Ledger>,
    indicator: Box<dyn Indicator>,
    display: Box<dyn DisplaySurface>,
    clock: Box<dyn Clock>,
    dwell: Duration,
}

impl TransitionHandler {
    pub fn new(snapshot_path: PathBuf, parts: Collaborators, dwell: Duration) -> Self {
        let Collaborators {
            mirror,
            ledger,
            indicator,
            display,
            clock,
        } = parts;
        Self {
            snapshot: SnapshotStore::new(snapshot_path, mirror),
            ledger,
            indicator,
            display,
            clock,
            dwell,
        }
    }

    pub fn published(&self) -> &Roster {
        self.snapshot.published()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn apply(&mut self, event: &PresenceEvent) -> Result<()> {
        debug!(event = %event, "Applying presence event");
        match event {
            PresenceEvent::Joined(player) => self.on_joined(player),
            PresenceEvent::Left(player) => self.on_left(player),
        }
    }

    pub fn on_joined(&mut self, player: &str) -> Result<()> {
        info!(player = %player, "Player joined");
        self.snapshot.add(player)?;
        self.display.render(&joined_message(player))?;
        if let Err(err) = self.ledger.delete(player) {
            warn!(error = %err, player = %player, "Failed to clear last-seen entry");
        }
        self.pulse(Channel::Join)
    }

    pub fn on_left(&mut self, player: &str) -> Result<()> {
        info!(player = %player, "Player left");
        self.snapshot.remove(player)?;
        self.display.render(&left_message(player))?;
        let last_seen = format_last_seen(&self.clock.now());
        if let Err(err) = self.ledger.put(player, &last_seen) {
            warn!(error = %err, player = %player, "Failed to record last-seen entry");
        }
        self.pulse(Channel::Leave)
    }

    /// First successful poll: publish the roster wholesale and drop any
    /// stale ledger rows for players who are online right now.
    pub fn publish_baseline(&mut self, roster: &Roster) -> Result<()> {
        info!(players = roster.len(), "Publishing baseline roster");
        self.snapshot.publish(roster)?;
        for player in roster.names() {
            if let Err(err) = self.ledger.delete(player) {
                warn!(error = %err, player = %player, "Failed to clear last-seen entry");
            }
        }
        Ok(())
    }

    /// Rewrites the snapshot as it stands, repairing a stale mirror or a
    /// missing local file.
    pub fn republish(&mut self) -> Result<()> {
        self.snapshot.refresh()
    }

    pub fn show(&mut self, text: &str) -> Result<()> {
        self.display.render(text)
    }

    /// Best-effort cleanup: both channels off, display cleared. Handles are
    /// released when the handler is dropped.
    pub fn shutdown(&mut self) {
        for channel in [Channel::Join, Channel::Leave] {
            if let Err(err) = self.indicator.set(channel, false) {
                warn!(error = %err, channel = channel.as_str(), "Failed to reset indicator");
            }
        }
        if let Err(err) = self.display.clear() {
            warn!(error = %err, "Failed to clear display");
        }
    }

    fn pulse(&mut self, channel: Channel) -> Result<()> {
        self.indicator.set(channel, true)?;
        self.clock.sleep(self.dwell);
        self.indicator.set(channel, false)
    }
}
