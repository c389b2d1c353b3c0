use crate::error::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Durable key/value store the serialized history is written into.
///
/// Writes are best effort: the engine logs a failed write and carries on,
/// it never retries or reads back.
pub trait PersistenceSink {
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process sink, handy for hosts that poll the blob themselves.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: HashMap<String, String>,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PersistenceSink for MemorySink {
    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.writes += 1;
        Ok(())
    }
}

/// Shared handle, so a host can keep reading a sink it handed to the engine.
impl<S: PersistenceSink> PersistenceSink for Rc<RefCell<S>> {
    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.borrow_mut().write(key, value)
    }
}
