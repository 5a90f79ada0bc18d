//! Late-bound column mapping used by the result-processor chain (§3).
//!
//! Field names are resolved once to small integer keys (`RLookupKey`); a
//! row is then a sparse array indexed by key, so looking up a field during
//! scoring/grouping/loading never touches a string map.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// An interned column name, scoped to one `RLookupTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RLookupKey(pub usize);

/// Resolves field names to keys, shared by every row produced against one
/// query's schema.
#[derive(Debug, Default)]
pub struct RLookupTable {
    names: Vec<Arc<str>>,
    by_name: HashMap<Arc<str>, RLookupKey>,
}

impl RLookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` to a key, interning it if this is the first time
    /// it's been seen.
    pub fn get_key(&mut self, name: &str) -> RLookupKey {
        if let Some(key) = self.by_name.get(name) {
            return *key;
        }
        let key = RLookupKey(self.names.len());
        let name: Arc<str> = Arc::from(name);
        self.names.push(name.clone());
        self.by_name.insert(name, key);
        key
    }

    pub fn find_key(&self, name: &str) -> Option<RLookupKey> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, key: RLookupKey) -> Option<&str> {
        self.names.get(key.0).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A sparse row of values, indexed by `RLookupKey`. Wiped between results
/// but the backing `Vec` is reused by the caller to avoid reallocating
/// per row.
#[derive(Debug, Clone, Default)]
pub struct RLookupRow {
    values: Vec<Option<Value>>,
}

impl RLookupRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: RLookupKey) -> Option<&Value> {
        self.values.get(key.0).and_then(|v| v.as_ref())
    }

    pub fn set(&mut self, key: RLookupKey, value: Value) {
        if self.values.len() <= key.0 {
            self.values.resize(key.0 + 1, None);
        }
        self.values[key.0] = Some(value);
    }

    /// Wipe all values but keep the allocation for reuse.
    pub fn clear(&mut self) {
        for slot in self.values.iter_mut() {
            *slot = None;
        }
    }

    /// Upper bound on the keys currently populated in this row; callers
    /// iterate `0..len_hint()` to enumerate set values without a table.
    pub fn len_hint(&self) -> usize {
        self.values.len()
    }
}
