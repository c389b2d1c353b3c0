//! Fixed-capacity history of recent ticks and its serialized form.

use crate::compress::CompressedDump;
use crate::error::{Error, Result};
use crate::intern::KeyMap;
use serde::{Deserialize, Serialize};

/// Serialized history layout version. Bump on any incompatible change.
pub const FORMAT_VERSION: u32 = 1;

/// Default number of ticks kept.
pub const DEFAULT_CAPACITY: usize = 30;

/// Index of the slot `tick` lands in. `capacity` must be non-zero.
fn slot_for(tick: u64, capacity: usize) -> usize {
    (tick % capacity as u64) as usize
}

/// Circular buffer of dumps indexed by `tick % capacity`.
///
/// A slot holds whatever was written there last. Once `capacity` ticks have
/// passed without a slot being rewritten, `get(tick)` hands back a dump from
/// an older tick that shares the same index; check the dump's root key if
/// the exact tick matters.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRing {
    slots: Vec<Option<CompressedDump>>,
}

impl HistoryRing {
    /// A ring with `capacity` empty slots. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        HistoryRing {
            slots: vec![None; capacity.max(1)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_index(&self, tick: u64) -> usize {
        slot_for(tick, self.slots.len())
    }

    /// Store `dump` for `tick`, overwriting whatever held the slot.
    pub fn put(&mut self, tick: u64, dump: CompressedDump) {
        let idx = self.slot_index(tick);
        self.slots[idx] = Some(dump);
    }

    pub fn get(&self, tick: u64) -> Option<&CompressedDump> {
        self.slots[self.slot_index(tick)].as_ref()
    }

    pub fn clear_slot(&mut self, tick: u64) {
        let idx = self.slot_index(tick);
        self.slots[idx] = None;
    }

    pub fn slots(&self) -> &[Option<CompressedDump>] {
        &self.slots
    }

    /// Populated slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &CompressedDump> {
        self.slots.iter().flatten()
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// The persisted blob: key map plus every slot of the ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub format_version: u32,
    pub key_map: KeyMap,
    pub slots: Vec<Option<CompressedDump>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionHeader {
    format_version: u32,
}

impl History {
    pub fn new(key_map: KeyMap, ring: &HistoryRing) -> Self {
        History {
            format_version: FORMAT_VERSION,
            key_map,
            slots: ring.slots().to_vec(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot `tick` lands in, `None` for a history without slots.
    pub fn slot_index(&self, tick: u64) -> Option<usize> {
        (!self.slots.is_empty()).then(|| slot_for(tick, self.slots.len()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a blob, rejecting layouts from another format version.
    pub fn from_json(json: &str) -> Result<Self> {
        let header: VersionHeader = serde_json::from_str(json)?;
        if header.format_version != FORMAT_VERSION {
            return Err(Error::FormatVersion {
                found: header.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Populated slots in slot order.
    pub fn dumps(&self) -> impl Iterator<Item = &CompressedDump> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::CompressedNode;

    fn dump(cpu: f64) -> CompressedDump {
        CompressedDump {
            captured_at: 0,
            marks: Vec::new(),
            root: CompressedNode(0, 0.0, cpu, 0, Vec::new()),
        }
    }

    #[test]
    fn wraps_around_and_overwrites() {
        let mut ring = HistoryRing::new(2);
        ring.put(0, dump(10.0));
        ring.put(1, dump(11.0));
        ring.put(2, dump(12.0));

        assert_eq!(ring.len(), 2);
        // Tick 0's slot now holds tick 2.
        assert_eq!(ring.get(0).map(CompressedDump::cpu), Some(12.0));
        assert_eq!(ring.get(1).map(CompressedDump::cpu), Some(11.0));
        assert_eq!(ring.get(2).map(CompressedDump::cpu), Some(12.0));
    }

    #[test]
    fn get_can_return_an_older_tick() {
        let mut ring = HistoryRing::new(3);
        ring.put(1, dump(1.0));
        // Ticks 2..=4 never wrote slot 1 again, so tick 4 aliases tick 1.
        assert_eq!(ring.get(4).map(CompressedDump::cpu), Some(1.0));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let ring = HistoryRing::new(0);
        assert_eq!(ring.capacity(), 1);
        assert!(ring.is_empty());
    }

    #[test]
    fn blob_and_ring_agree_on_slots() {
        let ring = HistoryRing::new(3);
        let history = History::new(KeyMap::new(), &ring);
        for tick in [0, 4, 11] {
            assert_eq!(history.slot_index(tick), Some(ring.slot_index(tick)));
        }
        let empty = History {
            format_version: FORMAT_VERSION,
            key_map: KeyMap::new(),
            slots: Vec::new(),
        };
        assert_eq!(empty.slot_index(4), None);
    }

    #[test]
    fn rejects_other_format_versions() {
        let json = r#"{"formatVersion":99,"keyMap":{"nextId":0,"nameToId":{}},"slots":[]}"#;
        let err = History::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            Error::FormatVersion {
                found: 99,
                expected: FORMAT_VERSION
            }
        ));
    }

    #[test]
    fn empty_slots_serialize_as_null() {
        let mut ring = HistoryRing::new(2);
        ring.put(1, dump(1.0));
        let history = History::new(KeyMap::new(), &ring);
        let value: serde_json::Value = serde_json::from_str(&history.to_json().unwrap()).unwrap();
        assert_eq!(value["formatVersion"], FORMAT_VERSION);
        assert!(value["slots"][0].is_null());
        assert_eq!(value["slots"][1]["d"][2], 1.0);
        assert_eq!(History::from_json(&history.to_json().unwrap()).unwrap(), history);
    }
}
