//! Text display surfaces and the messages shown on them.
//!
//! Every render replaces the whole visible area.

use fs_err as fs;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{PresenceError, Result};
use crate::roster::Roster;

pub const NO_PLAYERS_MESSAGE: &str = "No players online";
pub const NO_RESPONSE_MESSAGE: &str = "Error: No response";
pub const AUTH_ERROR_MESSAGE: &str = "Auth Error";

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub trait DisplaySurface {
    fn clear(&mut self) -> Result<()>;
    fn render(&mut self, text: &str) -> Result<()>;
}

impl<D: DisplaySurface + ?Sized> DisplaySurface for Box<D> {
    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn render(&mut self, text: &str) -> Result<()> {
        (**self).render(text)
    }
}

/// Idle text for a roster: a count header and one name per line.
pub fn steady_state_message(roster: &Roster) -> String {
    if roster.is_empty() {
        return NO_PLAYERS_MESSAGE.to_string();
    }

    let mut message = format!("Players online: {}\n", roster.len());
    for name in roster.names() {
        message.push_str(name);
        message.push('\n');
    }
    message
}

pub fn joined_message(player: &str) -> String {
    format!("{} joined.", player)
}

pub fn left_message(player: &str) -> String {
    format!("{} left.", player)
}

/// Renders to the process's stdout, clearing the terminal first.
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl DisplaySurface for ConsoleDisplay {
    fn clear(&mut self) -> Result<()> {
        write_stdout(CLEAR_SCREEN)
    }

    fn render(&mut self, text: &str) -> Result<()> {
        write_stdout(&format!("{}{}\n", CLEAR_SCREEN, text))
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|err| PresenceError::Display(format!("Failed to write to stdout: {}", err)))
}

/// Writes the current text to a file for an external renderer to pick up.
#[derive(Debug)]
pub struct FileDisplay {
    path: PathBuf,
}

impl FileDisplay {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                PresenceError::Display(format!("Failed to create display directory: {}", err))
            })?;
        }
        Ok(Self { path })
    }
}

impl DisplaySurface for FileDisplay {
    fn clear(&mut self) -> Result<()> {
        self.render("")
    }

    fn render(&mut self, text: &str) -> Result<()> {
        fs::write(&self.path, text)
            .map_err(|err| PresenceError::Display(format!("Failed to write display file: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_state_lists_players_in_roster_order() {
        let roster = Roster::from_names(vec!["alice", "bob"]);
        assert_eq!(steady_state_message(&roster), "Players online: 2\nalice\nbob\n");
    }

    #[test]
    fn steady_state_for_empty_and_sentinel_rosters() {
        assert_eq!(steady_state_message(&Roster::empty()), "No players online");
        assert_eq!(
            steady_state_message(&Roster::from_names(vec![""])),
            "No players online"
        );
    }

    #[test]
    fn transition_messages() {
        assert_eq!(joined_message("alice"), "alice joined.");
        assert_eq!(left_message("bob"), "bob left.");
    }

    #[test]
    fn file_display_replaces_content() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("screen").join("display.txt");
        let mut display = FileDisplay::new(path.clone()).expect("display");

        display.render("alice joined.").expect("render");
        display.render("bob left.").expect("render");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "bob left.");

        display.clear().expect("clear");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "");
    }
}
