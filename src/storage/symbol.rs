//! Symbol dictionaries.

use hashbrown::HashMap;

/// Key returned for a value the table has never seen.
pub const VALUE_NOT_FOUND: i32 = -2;

/// Key stored for a null symbol.
pub const VALUE_IS_NULL: i32 = -1;

/// Dense string dictionary: keys are assigned in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    values: Vec<String>,
    keys: HashMap<String, i32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for `value`, interning it if new.
    pub fn put(&mut self, value: &str) -> i32 {
        if let Some(key) = self.keys.get(value) {
            return *key;
        }
        let key = self.values.len() as i32;
        self.values.push(value.to_string());
        self.keys.insert(value.to_string(), key);
        key
    }

    pub fn key_of(&self, value: Option<&str>) -> i32 {
        match value {
            None => VALUE_IS_NULL,
            Some(v) => self.keys.get(v).copied().unwrap_or(VALUE_NOT_FOUND),
        }
    }

    pub fn value_of(&self, key: i32) -> Option<&str> {
        if key < 0 {
            return None;
        }
        self.values.get(key as usize).map(String::as_str)
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Forgets every value interned after the first `size`.
    pub fn truncate(&mut self, size: usize) {
        for value in self.values.drain(size.min(self.values.len())..) {
            self.keys.remove(&value);
        }
    }
}
