//! Attribute translation.

use std::collections::HashMap;

/// Two-way dictionary mapping repeated object keys to compact
/// integer ids.
///
/// Filled once, then sealed; a builder only consults a sealed
/// translator, and a sealed translator may be shared read-only
/// between any number of readers.
#[derive(Debug, Default)]
pub struct AttributeTranslator {
    by_name: HashMap<String, u64>,
    by_id: HashMap<u64, String>,
    sealed: bool,
}

impl AttributeTranslator {
    #[inline]
    pub fn new() -> AttributeTranslator {
        AttributeTranslator::default()
    }

    /// Registers a key. Ignored once the translator is sealed.
    #[inline]
    pub fn add<T: AsRef<str>>(&mut self, name: T, id: u64) {
        if self.sealed {
            return;
        }
        let name = name.as_ref();
        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(id, name.to_string());
    }

    /// Freezes the dictionary.
    #[inline]
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of registered keys.
    #[inline]
    pub fn count(&self) -> usize {
        self.by_name.len()
    }

    /// The id registered for `name`, if any.
    #[inline]
    pub fn lookup_name(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).copied()
    }

    /// The key registered under `id`, if any.
    #[inline]
    pub fn lookup_id(&self, id: u64) -> Option<&str> {
        self.by_id.get(&id).map(|name| name.as_str())
    }
}
