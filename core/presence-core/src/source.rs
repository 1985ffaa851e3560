//! Where rosters come from.

use std::time::Duration;
use tracing::{info, warn};

use crate::error::Result;
use crate::rcon::RconClient;
use crate::roster::{parse_list_response, Roster};

const LIST_COMMAND: &str = "list";

/// Result of one poll. Outages are ordinary outcomes, not errors: the cycle
/// reports them on the display and the loop carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Roster(Roster),
    AuthError,
    NoResponse,
}

pub trait RosterSource {
    fn poll(&mut self) -> PollOutcome;

    /// Ends the session. Called once during shutdown.
    fn shutdown(&mut self) {}
}

impl<S: RosterSource + ?Sized> RosterSource for Box<S> {
    fn poll(&mut self) -> PollOutcome {
        (**self).poll()
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

#[derive(Debug, Clone)]
pub struct RconSettings {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub timeout: Duration,
}

/// Roster source backed by a game server's RCON `list` command.
///
/// Logs in once. If the password is rejected every later poll reports
/// [`PollOutcome::AuthError`] without touching the network.
#[derive(Debug)]
pub struct RconRosterSource {
    client: RconClient,
    authenticated: bool,
}

impl RconRosterSource {
    pub fn connect(settings: &RconSettings) -> Result<Self> {
        let mut client = RconClient::connect(&settings.host, settings.port, settings.timeout)?;
        let authenticated = client.login(&settings.password)?;
        if authenticated {
            info!(host = %settings.host, port = settings.port, "RCON session established");
        } else {
            warn!(host = %settings.host, port = settings.port, "RCON password rejected");
        }
        Ok(Self {
            client,
            authenticated,
        })
    }
}

impl RosterSource for RconRosterSource {
    fn poll(&mut self) -> PollOutcome {
        if !self.authenticated {
            return PollOutcome::AuthError;
        }

        let raw = match self.client.command(LIST_COMMAND) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Player list request failed");
                return PollOutcome::NoResponse;
            }
        };

        match parse_list_response(&raw) {
            Some(names) => PollOutcome::Roster(Roster::from_names(names)),
            None => {
                warn!(reply = %raw, "Unrecognized player list reply");
                PollOutcome::NoResponse
            }
        }
    }

    fn shutdown(&mut self) {
        self.client.shutdown();
        info!("RCON session closed");
    }
}
