//! The poll loop.
//!
//! One cycle: poll the roster source, then either show the outage message or
//! diff against the last good roster and apply every event in order, then
//! render the steady-state text. Cycles run back to back with a fixed pause
//! between them and never overlap.
//!
//! ```text
//! Idle -> Polling -> ErrorDisplay ------------------> Idle
//!                 \-> Diffing -> Applying(n events) -> Idle
//! ```
//!
//! The first good roster is a baseline: it is published as-is and produces
//! no events. Every later good roster rewrites the snapshot, either through
//! its events or, when nothing changed, by republishing it unchanged. After an outage the next good roster is diffed against the
//! last good one, so changes during the outage are reported once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::diff::{compute_diff, ChangeKind, PresenceEvent};
use crate::display::{steady_state_message, AUTH_ERROR_MESSAGE, NO_RESPONSE_MESSAGE};
use crate::error::{PresenceError, Result};
use crate::roster::Roster;
use crate::source::{PollOutcome, RosterSource};
use crate::transition::TransitionHandler;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Polling,
    ErrorDisplay,
    Diffing,
    Applying,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// First good roster; published without events.
    Baseline { players: usize },
    /// Diff applied. `events` is empty when nothing changed.
    Applied {
        kind: ChangeKind,
        events: Vec<PresenceEvent>,
    },
    AuthError,
    NoResponse,
}

pub struct PresenceMonitor {
    source: Box<dyn RosterSource>,
    handler: TransitionHandler,
    previous: Option<Roster>,
    phase: CyclePhase,
    interval: Duration,
}

impl PresenceMonitor {
    pub fn new(source: Box<dyn RosterSource>, handler: TransitionHandler, interval: Duration) -> Self {
        Self {
            source,
            handler,
            previous: None,
            phase: CyclePhase::Idle,
            interval,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Last roster that completed a cycle.
    pub fn last_roster(&self) -> Option<&Roster> {
        self.previous.as_ref()
    }

    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.enter(CyclePhase::Polling);
        let report = match self.source.poll() {
            PollOutcome::AuthError => {
                self.enter(CyclePhase::ErrorDisplay);
                warn!("Roster source rejected credentials");
                self.handler.show(AUTH_ERROR_MESSAGE)?;
                CycleReport::AuthError
            }
            PollOutcome::NoResponse => {
                self.enter(CyclePhase::ErrorDisplay);
                warn!("Roster source did not respond");
                self.handler.show(NO_RESPONSE_MESSAGE)?;
                CycleReport::NoResponse
            }
            PollOutcome::Roster(roster) => self.apply_roster(roster)?,
        };
        self.enter(CyclePhase::Idle);
        Ok(report)
    }

    /// Runs cycles until `stop` is set or a cycle fails.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        info!(interval_secs = self.interval.as_secs(), "Presence monitor running");
        loop {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = self.run_cycle() {
                error!(error = %err, phase = ?self.phase, "Poll cycle failed");
                return Err(err);
            }
            if self.handler.clock().sleep_until_stopped(self.interval, stop) {
                break;
            }
        }
        info!("Stop requested");
        Ok(())
    }

    /// Clears the display, ends the roster session and releases every
    /// handle.
    pub fn shutdown(mut self) {
        self.handler.shutdown();
        self.source.shutdown();
        info!("Presence monitor stopped");
    }

    pub fn handler_mut(&mut self) -> &mut TransitionHandler {
        &mut self.handler
    }

    fn apply_roster(&mut self, roster: Roster) -> Result<CycleReport> {
        let report = match self.previous.clone() {
            None => {
                self.handler.publish_baseline(&roster)?;
                CycleReport::Baseline {
                    players: roster.len(),
                }
            }
            Some(old) => {
                self.enter(CyclePhase::Diffing);
                let diff = compute_diff(&old, &roster);
                let kind = diff.kind();
                let events = diff.events();
                if !events.is_empty() {
                    info!(
                        kind = ?kind,
                        joined = diff.joined.len(),
                        left = diff.left.len(),
                        "Roster changed"
                    );
                }

                self.enter(CyclePhase::Applying);
                for event in &events {
                    self.handler.apply(event)?;
                }

                if !self.handler.published().same_members(&roster) {
                    return Err(PresenceError::Consistency(format!(
                        "snapshot {:?} does not match roster {:?} after applying events",
                        self.handler.published().names(),
                        roster.names()
                    )));
                }
                if events.is_empty() {
                    self.handler.republish()?;
                }
                CycleReport::Applied { kind, events }
            }
        };

        self.handler.show(&steady_state_message(&roster))?;
        self.previous = Some(roster);
        Ok(report)
    }

    fn enter(&mut self, phase: CyclePhase) {
        debug!(from = ?self.phase, to = ?phase, "Cycle phase");
        self.phase = phase;
    }
}
