use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Span name -> small integer id table shared by every dump in a history.
///
/// Ids are handed out in first-seen order and never reused, so a name keeps
/// the same id for the lifetime of the engine. The map only grows.
///
/// Tick roots are interned too (`Tick 41`, `Tick 42`, ...), so a recording
/// profiler adds one entry per tick on top of its fixed set of span names.
/// In the serialized history an entry such as `"Tick 12345678":1234567,`
/// costs about 25 bytes, so the blob grows by that much per tick. Hosts
/// with a hard storage quota should re-create the profiler periodically;
/// `Profiler::init` keeps the key map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMap {
    next_id: u32,
    name_to_id: BTreeMap<String, u32>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, allocating the next one on first sight.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.name_to_id.insert(name.to_owned(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }

    /// Reverse lookup table, id -> name.
    pub fn invert(&self) -> HashMap<u32, &str> {
        self.name_to_id
            .iter()
            .map(|(name, &id)| (id, name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_id() {
        let mut keys = KeyMap::new();
        let first = keys.intern("X");
        let second = keys.intern("X");
        assert_eq!(first, second);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.next_id(), 1);
    }

    #[test]
    fn distinct_names_never_collide() {
        let mut keys = KeyMap::new();
        let ids: Vec<u32> = ["a", "b", "c", "a", "d", "b"]
            .iter()
            .map(|name| keys.intern(name))
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 0, 3, 1]);
        assert_eq!(keys.next_id(), 4);
    }

    #[test]
    fn invert_maps_ids_back_to_names() {
        let mut keys = KeyMap::new();
        keys.intern("Room:run");
        keys.intern("Creep:move");
        let inverted = keys.invert();
        assert_eq!(inverted[&0], "Room:run");
        assert_eq!(inverted[&1], "Creep:move");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut keys = KeyMap::new();
        keys.intern("f");
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"{"nextId":1,"nameToId":{"f":0}}"#);
    }
}
