//! Roster diffing.
//!
//! A diff is plain set difference over exact player names:
//! `new \ old` are joins (in `new` order), `old \ new` are leaves (in `old`
//! order), joins first. Applying the events to `old` always reproduces the
//! member set of `new`, however many players changed in one cycle.

use serde::Serialize;
use std::fmt;

use crate::roster::Roster;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "player", rename_all = "snake_case")]
pub enum PresenceEvent {
    Joined(String),
    Left(String),
}

impl fmt::Display for PresenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceEvent::Joined(name) => write!(f, "{} joined", name),
            PresenceEvent::Left(name) => write!(f, "{} left", name),
        }
    }
}

/// Shape of the change between two polls, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Unchanged,
    /// Only joins.
    Growth,
    /// Only leaves.
    Shrink,
    /// Joins and leaves in equal number; the roster size did not move.
    Swap,
    /// Joins and leaves in unequal number.
    Mixed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    pub joined: Vec<String>,
    pub left: Vec<String>,
}

impl RosterDiff {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }

    pub fn kind(&self) -> ChangeKind {
        match (self.joined.len(), self.left.len()) {
            (0, 0) => ChangeKind::Unchanged,
            (_, 0) => ChangeKind::Growth,
            (0, _) => ChangeKind::Shrink,
            (joined, left) if joined == left => ChangeKind::Swap,
            _ => ChangeKind::Mixed,
        }
    }

    /// Events in application order: every join, then every leave.
    pub fn events(&self) -> Vec<PresenceEvent> {
        self.joined
            .iter()
            .cloned()
            .map(PresenceEvent::Joined)
            .chain(self.left.iter().cloned().map(PresenceEvent::Left))
            .collect()
    }
}

pub fn compute_diff(old: &Roster, new: &Roster) -> RosterDiff {
    if old.same_members(new) {
        return RosterDiff::default();
    }

    let old_names = old.name_set();
    let new_names = new.name_set();

    let joined = new
        .names()
        .iter()
        .filter(|name| !old_names.contains(name.as_str()))
        .cloned()
        .collect();
    let left = old
        .names()
        .iter()
        .filter(|name| !new_names.contains(name.as_str()))
        .cloned()
        .collect();

    RosterDiff { joined, left }
}

/// Convenience wrapper returning the ordered event list.
pub fn diff(old: &Roster, new: &Roster) -> Vec<PresenceEvent> {
    compute_diff(old, new).events()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn roster(names: &[&str]) -> Roster {
        Roster::from_names(names.iter().copied())
    }

    fn joined(name: &str) -> PresenceEvent {
        PresenceEvent::Joined(name.to_string())
    }

    fn left(name: &str) -> PresenceEvent {
        PresenceEvent::Left(name.to_string())
    }

    fn apply(old: &Roster, events: &[PresenceEvent]) -> BTreeSet<String> {
        let mut members: BTreeSet<String> = old.names().iter().cloned().collect();
        for event in events {
            match event {
                PresenceEvent::Joined(name) => {
                    assert!(members.insert(name.clone()), "duplicate join {}", name);
                }
                PresenceEvent::Left(name) => {
                    assert!(members.remove(name), "leave of absent {}", name);
                }
            }
        }
        members
    }

    #[test]
    fn first_player_joins_empty_server() {
        assert_eq!(diff(&roster(&[]), &roster(&["alice"])), vec![joined("alice")]);
    }

    #[test]
    fn growth_reports_only_new_player() {
        assert_eq!(
            diff(&roster(&["alice"]), &roster(&["alice", "bob"])),
            vec![joined("bob")]
        );
    }

    #[test]
    fn shrink_reports_only_departed_player() {
        assert_eq!(
            diff(&roster(&["alice", "bob"]), &roster(&["alice"])),
            vec![left("bob")]
        );
        assert_eq!(diff(&roster(&["alice"]), &roster(&[])), vec![left("alice")]);
    }

    #[test]
    fn everyone_leaving_follows_old_order() {
        assert_eq!(
            diff(&roster(&["carol", "alice", "bob"]), &roster(&[""])),
            vec![left("carol"), left("alice"), left("bob")]
        );
    }

    #[test]
    fn equal_size_swap_emits_join_before_leave() {
        let diff = compute_diff(&roster(&["alice", "bob"]), &roster(&["alice", "carol"]));
        assert_eq!(diff.kind(), ChangeKind::Swap);
        assert_eq!(diff.events(), vec![joined("carol"), left("bob")]);
    }

    #[test]
    fn multi_player_swap_resolves_by_set_difference() {
        let events = diff(
            &roster(&["alice", "bob", "carol"]),
            &roster(&["dave", "alice", "erin"]),
        );
        assert_eq!(
            events,
            vec![joined("dave"), joined("erin"), left("bob"), left("carol")]
        );
    }

    #[test]
    fn growth_that_hides_a_leave_still_reports_it() {
        let diff = compute_diff(&roster(&["alice", "bob"]), &roster(&["alice", "carol", "dave"]));
        assert_eq!(diff.kind(), ChangeKind::Mixed);
        assert_eq!(
            diff.events(),
            vec![joined("carol"), joined("dave"), left("bob")]
        );
    }

    #[test]
    fn sentinel_behaves_like_empty_roster() {
        assert_eq!(diff(&roster(&[""]), &roster(&["alice"])), vec![joined("alice")]);
        assert!(diff(&roster(&[""]), &roster(&[])).is_empty());
    }

    #[test]
    fn reordering_is_not_a_change() {
        let diff = compute_diff(&roster(&["alice", "bob"]), &roster(&["bob", "alice"]));
        assert_eq!(diff.kind(), ChangeKind::Unchanged);
        assert!(diff.is_empty());
    }

    #[test]
    fn identical_rosters_produce_no_events() {
        let cases: [&[&str]; 4] = [&[], &[""], &["alice"], &["alice", "bob", "carol"]];
        for names in cases {
            let value = roster(names);
            assert!(diff(&value, &value).is_empty());
        }
    }

    fn assert_round_trip(old: &[&str], new: &[&str]) {
        let old = roster(old);
        let new = roster(new);
        let events = diff(&old, &new);
        let expected: BTreeSet<String> = new.names().iter().cloned().collect();
        assert_eq!(apply(&old, &events), expected, "{:?} -> {:?}", old, new);
    }

    #[test]
    fn applying_events_reproduces_new_roster() {
        assert_round_trip(&[], &["alice"]);
        assert_round_trip(&[""], &["alice", "bob"]);
        assert_round_trip(&["alice"], &[""]);
        assert_round_trip(&["alice", "bob"], &["bob", "carol"]);
        assert_round_trip(&["alice", "bob", "carol"], &["carol"]);
        assert_round_trip(&["alice"], &["bob", "carol", "dave"]);
        assert_round_trip(&["a", "b", "c", "d"], &["e", "f", "a", "g"]);
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let json = serde_json::to_value(joined("alice")).expect("serialize");
        assert_eq!(json, serde_json::json!({"kind": "joined", "player": "alice"}));
    }
}
