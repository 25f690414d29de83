//! Transaction-scoped read cache.
//!
//! Within one transaction the world is assumed frozen: nothing outside the
//! transaction mutates the device. Under that assumption a Show command
//! issued by the same reader is idempotent and its output can be replayed
//! from cache instead of re-querying the device. The cache lives and dies
//! with its transaction and is never shared across them.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::command::{Command, CommandKind};

/// Cache of Show outputs keyed by (reader identity, command).
///
/// Two distinct readers issuing the same command get separate entries; the
/// key is the pair, not the command alone.
#[derive(Debug, Default)]
pub struct ModificationCache {
    entries: HashMap<(String, Command), String>,
}

impl ModificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached output for this reader and command, if present.
    pub fn get(&self, reader: &str, command: &Command) -> Option<&str> {
        self.entries
            .get(&(reader.to_string(), command.clone()))
            .map(String::as_str)
    }

    /// Record an output. Write commands are not cacheable and are ignored.
    pub fn put(&mut self, reader: impl Into<String>, command: Command, output: String) {
        if command.kind() != CommandKind::Show {
            return;
        }
        self.entries.insert((reader.into(), command), output);
    }

    pub fn contains(&self, reader: &str, command: &Command) -> bool {
        self.get(reader, command).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct commands cached, across all readers.
    pub fn distinct_commands(&self) -> usize {
        self.entries
            .keys()
            .map(|(_, cmd)| cmd)
            .collect::<HashSet<_>>()
            .len()
    }
}
