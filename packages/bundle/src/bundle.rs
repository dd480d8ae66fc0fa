//! # LoadedComponentSet - records fetched for one render
//!
//! Holds every component record fetched while resolving a single render,
//! keyed by identifier, along with the reference edges discovered between
//! them and the identifiers whose fetch failed.
//!
//! Membership is the cycle guard: an identifier that is loaded or failed
//! is never fetched again for the same set.
//!
//! ## Usage
//!
//! ```rust
//! use tessera_bundle::LoadedComponentSet;
//! use tessera_common::ComponentRecord;
//!
//! let mut set = LoadedComponentSet::new();
//! set.insert(ComponentRecord::new("card", "<div></div>"));
//! assert!(set.is_known("card"));
//! ```

use indexmap::IndexMap;
use tessera_common::{ComponentRecord, StoreError};

#[derive(Debug, Clone, Default)]
pub struct LoadedComponentSet {
    /// Records in load order
    records: IndexMap<String, ComponentRecord>,

    /// Identifier -> referenced identifiers, in markup order with duplicates
    references: IndexMap<String, Vec<String>>,

    /// Identifiers whose fetch failed
    failures: IndexMap<String, StoreError>,

    root_id: Option<String>,
}

impl LoadedComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ComponentRecord) {
        self.failures.shift_remove(&record.id);
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<&ComponentRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Loaded or failed; either way it must not be fetched again
    pub fn is_known(&self, id: &str) -> bool {
        self.records.contains_key(id) || self.failures.contains_key(id)
    }

    pub fn record_failure(&mut self, id: impl Into<String>, error: StoreError) {
        self.failures.insert(id.into(), error);
    }

    pub fn failure(&self, id: &str) -> Option<&StoreError> {
        self.failures.get(id)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &StoreError)> {
        self.failures.iter().map(|(id, err)| (id.as_str(), err))
    }

    pub fn set_references(&mut self, id: impl Into<String>, references: Vec<String>) {
        self.references.insert(id.into(), references);
    }

    pub fn references_of(&self, id: &str) -> &[String] {
        self.references
            .get(id)
            .map(|refs| refs.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_root(&mut self, id: impl Into<String>) {
        self.root_id = Some(id.into());
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    pub fn root(&self) -> Option<&ComponentRecord> {
        self.root_id.as_deref().and_then(|id| self.records.get(id))
    }

    /// Identifiers in load order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|id| id.as_str())
    }

    pub fn records(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut set = LoadedComponentSet::new();
        set.insert(ComponentRecord::new("a", "<p>a</p>"));
        set.insert(ComponentRecord::new("b", "<p>b</p>"));
        set.set_root("a");

        assert_eq!(set.len(), 2);
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(set.root().map(|r| r.markup.as_str()), Some("<p>a</p>"));
        assert!(set.get("c").is_none());
    }

    #[test]
    fn test_failures_are_known_but_not_loaded() {
        let mut set = LoadedComponentSet::new();
        set.record_failure("gone", StoreError::NotFound { id: "gone".into() });

        assert!(set.is_known("gone"));
        assert!(!set.contains("gone"));
        assert!(set.failure("gone").is_some_and(|e| e.is_not_found()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_references_default_empty() {
        let mut set = LoadedComponentSet::new();
        set.set_references("a", vec!["b".into(), "b".into()]);

        assert_eq!(set.references_of("a"), &["b".to_string(), "b".to_string()]);
        assert!(set.references_of("zzz").is_empty());
    }
}
