// Duplicate Association & Registry

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::record::KeyId;

/// How a duplicate was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    ExactKey,
    ContentMatch,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::ExactKey => write!(f, "EXACT_KEY"),
            MatchType::ContentMatch => write!(f, "CONTENT_MATCH"),
        }
    }
}

/// One detected duplicate pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateAssociation {
    pub original_key_id: KeyId,
    pub duplicate_key_id: KeyId,
    pub match_type: MatchType,
}

impl DuplicateAssociation {
    pub fn new(
        original_key_id: impl Into<KeyId>,
        duplicate_key_id: impl Into<KeyId>,
        match_type: MatchType,
    ) -> Self {
        Self {
            original_key_id: original_key_id.into(),
            duplicate_key_id: duplicate_key_id.into(),
            match_type,
        }
    }

    /// Exact-key matches pair a posting with itself
    pub fn is_self_match(&self) -> bool {
        self.original_key_id == self.duplicate_key_id
    }
}

/// Registry value: what a known duplicate resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub original_id: KeyId,
    pub match_type: MatchType,
}

/// Persistent `duplicate_id -> original` map.
///
/// Additive only: an id that is already registered keeps its first original.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuplicateRegistry {
    entries: BTreeMap<KeyId, RegistryEntry>,
}

impl DuplicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key_id: &str) -> bool {
        self.entries.contains_key(key_id)
    }

    pub fn original_of(&self, key_id: &str) -> Option<&RegistryEntry> {
        self.entries.get(key_id)
    }

    /// Register an association; returns true if the registry changed.
    ///
    /// Self-matches are never stored: registering a survivor as its own
    /// duplicate would make the filter pipeline drop it.
    pub fn register(&mut self, association: &DuplicateAssociation) -> bool {
        if association.is_self_match() || self.entries.contains_key(&association.duplicate_key_id) {
            return false;
        }
        self.entries.insert(
            association.duplicate_key_id.clone(),
            RegistryEntry {
                original_id: association.original_key_id.clone(),
                match_type: association.match_type,
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyId, &RegistryEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_additive() {
        let mut registry = DuplicateRegistry::new();
        let first = DuplicateAssociation::new("a:1", "b:9", MatchType::ContentMatch);
        let second = DuplicateAssociation::new("a:2", "b:9", MatchType::ContentMatch);

        assert!(registry.register(&first));
        assert!(!registry.register(&second));
        assert_eq!(registry.original_of("b:9").unwrap().original_id, "a:1");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_self_match_not_registered() {
        let mut registry = DuplicateRegistry::new();
        let exact = DuplicateAssociation::new("a:1", "a:1", MatchType::ExactKey);
        assert!(!registry.register(&exact));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_serializes_as_sorted_object() {
        let mut registry = DuplicateRegistry::new();
        registry.register(&DuplicateAssociation::new("o:1", "z:2", MatchType::ContentMatch));
        registry.register(&DuplicateAssociation::new("o:1", "b:3", MatchType::ContentMatch));

        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(
            json,
            r#"{"b:3":{"original_id":"o:1","match_type":"CONTENT_MATCH"},"z:2":{"original_id":"o:1","match_type":"CONTENT_MATCH"}}"#
        );
    }
}
