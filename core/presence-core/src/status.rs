//! Read-only presence report built from the published snapshot and the
//! ledger. Never touches the roster source.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;
use crate::ledger::{sort_recently_offline, Ledger, LedgerEntry};
use crate::snapshot::load_snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceReport {
    pub online: Vec<String>,
    pub recently_offline: Vec<LedgerEntry>,
}

pub fn build_report(snapshot_path: &Path, ledger: &dyn Ledger) -> Result<PresenceReport> {
    let online = load_snapshot(snapshot_path)?;
    let mut recently_offline = ledger.scan()?;
    sort_recently_offline(&mut recently_offline);

    Ok(PresenceReport {
        online: online.names().to_vec(),
        recently_offline,
    })
}

pub fn render_text(report: &PresenceReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Online ({}):", report.online.len());
    for name in &report.online {
        let _ = writeln!(out, "  {name}");
    }
    let _ = writeln!(out, "Recently offline ({}):", report.recently_offline.len());
    for entry in &report.recently_offline {
        let _ = writeln!(out, "  {:<16} {}", entry.username, entry.last_seen);
    }
    out
}
