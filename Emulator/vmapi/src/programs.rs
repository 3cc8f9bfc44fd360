//! Parsed-procedure cache.

use std::collections::HashMap;
use std::sync::Arc;

use basalt_primitives::crypto::hash_sha256;
use basalt_primitives::Identifier;

/// Cache of parsed procedures keyed by script digest.
///
/// The VM may reuse entries across the transactions of one block; the
/// emulator hands a fresh cache to each execution sequence so cached
/// parses never outlive the state they were built against.
#[derive(Debug, Clone, Default)]
pub struct ProgramsCache {
    entries: HashMap<Identifier, Arc<Vec<String>>>,
}

impl ProgramsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache key for a script.
    pub fn key_for(script: &[u8]) -> Identifier {
        hash_sha256(script)
    }

    pub fn get(&self, key: &Identifier) -> Option<Arc<Vec<String>>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: Identifier, parsed: Arc<Vec<String>>) {
        self.entries.insert(key, parsed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
