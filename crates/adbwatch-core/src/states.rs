// ── Device list snapshots ──
//
// One `host:track-devices` message is a complete listing of the
// connected devices, never a delta.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::error::WatchError;

const FIELD_SEPARATOR: char = '\t';

/// Serial → state mapping decoded from a single device list message.
///
/// Ordered by serial so that anything derived from it (diffs, output)
/// comes out in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStates(BTreeMap<String, String>);

impl DeviceStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a device list payload.
    ///
    /// The payload is zero or more `<serial>\t<state>` lines. Blank lines
    /// are skipped and the last line needs no terminator, so an empty
    /// payload is the valid encoding of "no devices". Any other line that
    /// does not have exactly two tab-separated fields fails with
    /// [`WatchError::Parse`], numbered from 1.
    pub fn parse(payload: &str) -> Result<Self, WatchError> {
        let mut states = BTreeMap::new();

        for (idx, line) in payload.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split(FIELD_SEPARATOR);
            let (Some(serial), Some(state), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(WatchError::Parse {
                    line: idx + 1,
                    text: line.to_owned(),
                });
            };

            states.insert(serial.to_owned(), state.to_owned());
        }

        Ok(Self(states))
    }

    pub fn get(&self, serial: &str) -> Option<&str> {
        self.0.get(serial).map(String::as_str)
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.0.contains_key(serial)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(serial, state)` pairs in ascending serial order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for DeviceStates {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for DeviceStates {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(serial, state)| (serial.to_owned(), state.to_owned()))
                .collect(),
        )
    }
}

impl IntoIterator for DeviceStates {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
