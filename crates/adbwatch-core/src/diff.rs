//! Change detection between consecutive device lists.
//!
//! Both inputs are complete listings. The diff is computed in two passes:
//!
//! 1. every serial in the old list, ascending: gone → removed, different
//!    state → changed, same state → nothing;
//! 2. every serial only in the new list, ascending: added.
//!
//! Removals and changes therefore always precede additions within one
//! batch.

use serde::Serialize;
use strum::{Display, EnumString};

use crate::states::DeviceStates;

/// One device whose state differs between two snapshots.
///
/// An empty `old_state` means the device just appeared; an empty
/// `new_state` means it disappeared. Both are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceStateChange {
    pub serial: String,
    pub old_state: String,
    pub new_state: String,
}

/// What a [`DeviceStateChange`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

impl DeviceStateChange {
    pub fn added(serial: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            old_state: String::new(),
            new_state: state.into(),
        }
    }

    pub fn removed(serial: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            old_state: state.into(),
            new_state: String::new(),
        }
    }

    pub fn changed(
        serial: impl Into<String>,
        old_state: impl Into<String>,
        new_state: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            old_state: old_state.into(),
            new_state: new_state.into(),
        }
    }

    pub fn kind(&self) -> ChangeKind {
        if self.old_state.is_empty() {
            ChangeKind::Added
        } else if self.new_state.is_empty() {
            ChangeKind::Removed
        } else {
            ChangeKind::Changed
        }
    }
}

/// Compute the events that turn `old` into `new`.
pub fn diff(old: &DeviceStates, new: &DeviceStates) -> Vec<DeviceStateChange> {
    let mut changes = Vec::new();

    for (serial, old_state) in old.iter() {
        match new.get(serial) {
            None => changes.push(DeviceStateChange::removed(serial, old_state)),
            Some(new_state) if new_state != old_state => {
                changes.push(DeviceStateChange::changed(serial, old_state, new_state));
            }
            Some(_) => {}
        }
    }

    for (serial, new_state) in new.iter() {
        if !old.contains(serial) {
            changes.push(DeviceStateChange::added(serial, new_state));
        }
    }

    changes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn states(pairs: &[(&str, &str)]) -> DeviceStates {
        pairs.iter().copied().collect()
    }

    /// Replay `changes` on top of `old`.
    fn apply(old: &DeviceStates, changes: &[DeviceStateChange]) -> DeviceStates {
        let mut map: BTreeMap<String, String> = old.clone().into_iter().collect();
        for change in changes {
            match change.kind() {
                ChangeKind::Removed => {
                    map.remove(&change.serial);
                }
                ChangeKind::Added | ChangeKind::Changed => {
                    map.insert(change.serial.clone(), change.new_state.clone());
                }
            }
        }
        map.into_iter().collect()
    }

    #[test]
    fn added_device() {
        let changes = diff(&states(&[]), &states(&[("A", "device")]));
        assert_eq!(changes, vec![DeviceStateChange::added("A", "device")]);
        assert_eq!(changes[0].kind(), ChangeKind::Added);
    }

    #[test]
    fn removed_device() {
        let changes = diff(&states(&[("A", "device")]), &states(&[]));
        assert_eq!(changes, vec![DeviceStateChange::removed("A", "device")]);
        assert_eq!(changes[0].kind(), ChangeKind::Removed);
    }

    #[test]
    fn changed_device() {
        let changes = diff(&states(&[("A", "device")]), &states(&[("A", "offline")]));
        assert_eq!(
            changes,
            vec![DeviceStateChange::changed("A", "device", "offline")]
        );
        assert_eq!(changes[0].kind(), ChangeKind::Changed);
    }

    #[test]
    fn removals_and_changes_precede_additions() {
        let old = states(&[("b", "device"), ("d", "offline"), ("e", "device")]);
        let new = states(&[("a", "device"), ("d", "device"), ("e", "device"), ("c", "recovery")]);

        assert_eq!(
            diff(&old, &new),
            vec![
                DeviceStateChange::removed("b", "device"),
                DeviceStateChange::changed("d", "offline", "device"),
                DeviceStateChange::added("a", "device"),
                DeviceStateChange::added("c", "recovery"),
            ]
        );
    }

    #[test]
    fn kind_display_is_lowercase() {
        assert_eq!(ChangeKind::Added.to_string(), "added");
        assert_eq!("removed".parse::<ChangeKind>().unwrap(), ChangeKind::Removed);
    }

    fn arb_states() -> impl Strategy<Value = DeviceStates> {
        prop::collection::btree_map(
            "[a-e]{1,2}",
            prop::sample::select(vec!["device", "offline", "unauthorized", "recovery"]),
            0..8,
        )
        .prop_map(|map| map.into_iter().map(|(k, v)| (k, v.to_owned())).collect())
    }

    proptest! {
        #[test]
        fn diff_against_self_is_empty(s in arb_states()) {
            prop_assert!(diff(&s, &s).is_empty());
        }

        #[test]
        fn replaying_diff_reproduces_new(old in arb_states(), new in arb_states()) {
            let changes = diff(&old, &new);
            prop_assert_eq!(apply(&old, &changes), new);
        }

        #[test]
        fn no_change_has_both_states_empty(old in arb_states(), new in arb_states()) {
            for change in diff(&old, &new) {
                prop_assert!(!(change.old_state.is_empty() && change.new_state.is_empty()));
                prop_assert_ne!(&change.old_state, &change.new_state);
            }
        }
    }
}
