//! Error types for presence-core operations.

use std::path::PathBuf;

/// All errors that can occur in presence-core operations.
///
/// Roster outages (`AuthError`, `NoResponse`) are not errors here; they are
/// ordinary poll outcomes, see [`crate::source::PollOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    // ─────────────────────────────────────────────────────────────────────
    // Roster Source Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Roster source unreachable: {0}")]
    SourceUnavailable(String),

    #[error("Roster source protocol error: {0}")]
    Protocol(String),

    // ─────────────────────────────────────────────────────────────────────
    // Snapshot Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Snapshot consistency violated: {0}")]
    Consistency(String),

    #[error("Snapshot mirror push failed: {0}")]
    Mirror(String),

    // ─────────────────────────────────────────────────────────────────────
    // Collaborator Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Ledger operation failed: {context}: {source}")]
    Ledger {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Indicator failure on pin {pin}: {details}")]
    Indicator { pin: u32, details: String },

    #[error("Display failure: {0}")]
    Display(String),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PresenceError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PresenceError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn ledger(context: impl Into<String>, source: rusqlite::Error) -> Self {
        PresenceError::Ledger {
            context: context.into(),
            source,
        }
    }

    /// Consistency violations mean the diff produced an event that does not
    /// match the published snapshot.
    pub fn is_consistency(&self) -> bool {
        matches!(self, PresenceError::Consistency(_))
    }
}

/// Convenience type alias for Results using PresenceError.
pub type Result<T> = std::result::Result<T, PresenceError>;
