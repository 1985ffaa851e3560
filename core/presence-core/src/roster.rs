//! The roster: one poll's worth of present players.
//!
//! The upstream `list` command reports "nobody online" as a single empty
//! name (`[""]`), not as an empty list. Both shapes are accepted here and
//! compare equal; [`Roster::names`] never yields the sentinel.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static ANSI_ESCAPES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\x9B|\x1B\[)[0-?]*[ -/]*[@-~]").expect("valid ANSI regex"));

/// Ordered list of present player names.
///
/// Order is kept for display; diffing treats the roster as a set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a roster from raw names as the upstream reports them.
    ///
    /// `[""]` becomes the empty roster. Repeated names keep their first
    /// position.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = names.into_iter().map(Into::into).collect();
        if is_empty_sentinel(&raw) {
            return Self::empty();
        }

        let mut seen = HashSet::new();
        let names = raw
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }

    pub fn name_set(&self) -> HashSet<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// Same members regardless of order.
    pub fn same_members(&self, other: &Roster) -> bool {
        self.len() == other.len() && self.name_set() == other.name_set()
    }

    pub(crate) fn push(&mut self, name: String) {
        self.names.push(name);
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        match self.names.iter().position(|candidate| candidate == name) {
            Some(index) => {
                self.names.remove(index);
                true
            }
            None => false,
        }
    }
}

impl From<Vec<String>> for Roster {
    fn from(names: Vec<String>) -> Self {
        Roster::from_names(names)
    }
}

impl From<Roster> for Vec<String> {
    fn from(roster: Roster) -> Self {
        roster.names
    }
}

/// True for the upstream "nobody online" shape: exactly one empty name.
pub fn is_empty_sentinel(names: &[String]) -> bool {
    names.len() == 1 && names[0].is_empty()
}

/// Splits the raw `list` command reply into names.
///
/// Replies look like `There are 2 of a max of 20 players online: alice, bob`.
/// With nobody online the tail after `": "` is blank, which yields the `[""]`
/// sentinel. A reply without the separator is a protocol error.
pub fn parse_list_response(raw: &str) -> Option<Vec<String>> {
    let cleaned = ANSI_ESCAPES.replace_all(raw, "");
    let tail = match cleaned.split_once(": ") {
        Some((_, tail)) => tail,
        // Some servers trim the trailing space when nobody is online.
        None => {
            cleaned.trim_end().strip_suffix(':')?;
            ""
        }
    };
    Some(tail.trim().split(", ").map(str::to_string).collect())
}
