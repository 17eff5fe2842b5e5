//! Per-document table of registered objects.
//!
//! # Responsibility
//! - Issue durable identifiers for objects that are linked from other
//!   documents.
//! - Resolve identifiers back to objects.
//!
//! # Invariants
//! - Keys are generated here, never supplied by callers.
//! - An object handle appears at most once as a value.
//! - Lookups never mutate state.

use crate::model::handle::{DocumentId, ObjectHandle, ReferenceId};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The null object cannot be registered.
    InvalidTarget,
    /// Persisted rows map two identifiers to the same object.
    DuplicateObject {
        object: ObjectHandle,
        existing: ReferenceId,
        duplicate: ReferenceId,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTarget => write!(f, "cannot register a null object"),
            Self::DuplicateObject {
                object,
                existing,
                duplicate,
            } => write!(
                f,
                "object {object} is registered twice (`{existing}` and `{duplicate}`)"
            ),
        }
    }
}

impl Error for RegistryError {}

/// Result of `ReferenceRegistry::register`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: ReferenceId,
    /// `true` when a new entry was inserted and the document needs saving.
    pub changed: bool,
}

/// Identifier -> object table owned by one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRegistry {
    document: DocumentId,
    entries: BTreeMap<ReferenceId, ObjectHandle>,
}

impl ReferenceRegistry {
    pub fn new(document: DocumentId) -> Self {
        Self {
            document,
            entries: BTreeMap::new(),
        }
    }

    /// Rebuilds a registry from persisted rows.
    ///
    /// # Errors
    /// - `InvalidTarget` when a row holds the null object.
    /// - `DuplicateObject` when two rows hold the same object.
    pub fn from_entries(
        document: DocumentId,
        entries: impl IntoIterator<Item = (ReferenceId, ObjectHandle)>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(document);
        for (id, object) in entries {
            if object.is_nil() {
                return Err(RegistryError::InvalidTarget);
            }
            if let Some(existing) = registry.find_identifier(object) {
                return Err(RegistryError::DuplicateObject {
                    object,
                    existing,
                    duplicate: id,
                });
            }
            registry.entries.insert(id, object);
        }
        Ok(registry)
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// Registers `object`, reusing its identifier when already present.
    ///
    /// # Errors
    /// - `InvalidTarget` when `object` is the null object. Nothing is inserted.
    pub fn register(&mut self, object: ObjectHandle) -> Result<Registration, RegistryError> {
        if object.is_nil() {
            warn!(
                "event=registry_register module=registry status=error document={} error_code=invalid_target",
                self.document
            );
            return Err(RegistryError::InvalidTarget);
        }

        if let Some(id) = self.find_identifier(object) {
            debug!(
                "event=registry_register module=registry status=ok document={} reused=true",
                self.document
            );
            return Ok(Registration { id, changed: false });
        }

        let mut id = ReferenceId::generate();
        while self.entries.contains_key(&id) {
            id = ReferenceId::generate();
        }
        self.entries.insert(id.clone(), object);
        info!(
            "event=registry_register module=registry status=ok document={} reused=false entries={}",
            self.document,
            self.entries.len()
        );
        Ok(Registration { id, changed: true })
    }

    /// Looks up one identifier. `None` means the reference is lost.
    pub fn resolve(&self, id: &ReferenceId) -> Option<ObjectHandle> {
        self.entries.get(id).copied()
    }

    /// Reverse lookup by linear scan.
    pub fn find_identifier(&self, object: ObjectHandle) -> Option<ReferenceId> {
        self.entries
            .iter()
            .find(|(_, value)| **value == object)
            .map(|(id, _)| id.clone())
    }

    /// Removes one entry, returning the object it pointed at.
    pub fn unregister(&mut self, id: &ReferenceId) -> Option<ObjectHandle> {
        let removed = self.entries.remove(id);
        if removed.is_some() {
            info!(
                "event=registry_unregister module=registry status=ok document={} entries={}",
                self.document,
                self.entries.len()
            );
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by identifier.
    pub fn entries(&self) -> impl Iterator<Item = (&ReferenceId, ObjectHandle)> {
        self.entries.iter().map(|(id, object)| (id, *object))
    }
}

#[cfg(test)]
mod tests {
    use super::{ReferenceRegistry, RegistryError};
    use crate::model::handle::{DocumentId, ObjectHandle, ReferenceId};

    fn registry() -> ReferenceRegistry {
        ReferenceRegistry::new(DocumentId::new("Assets/Scenes/Level1.scene").unwrap())
    }

    #[test]
    fn register_is_idempotent_per_object() {
        let mut registry = registry();
        let object = ObjectHandle::new();

        let first = registry.register(object).expect("first registration");
        let second = registry.register(object).expect("second registration");

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.id, second.id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_objects_get_distinct_ids() {
        let mut registry = registry();
        let a = registry.register(ObjectHandle::new()).unwrap().id;
        let b = registry.register(ObjectHandle::new()).unwrap().id;
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn resolve_returns_registered_object() {
        let mut registry = registry();
        let object = ObjectHandle::new();
        let id = registry.register(object).unwrap().id;

        assert_eq!(registry.resolve(&id), Some(object));
        assert_eq!(registry.find_identifier(object), Some(id));
    }

    #[test]
    fn resolve_unknown_id_is_none() {
        let registry = registry();
        assert_eq!(registry.resolve(&ReferenceId::generate()), None);
        assert_eq!(registry.find_identifier(ObjectHandle::new()), None);
    }

    #[test]
    fn register_rejects_null_object_without_mutation() {
        let mut registry = registry();
        let err = registry.register(ObjectHandle::nil()).unwrap_err();
        assert_eq!(err, RegistryError::InvalidTarget);
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_loses_only_that_entry() {
        let mut registry = registry();
        let kept = ObjectHandle::new();
        let dropped = ObjectHandle::new();
        let kept_id = registry.register(kept).unwrap().id;
        let dropped_id = registry.register(dropped).unwrap().id;

        assert_eq!(registry.unregister(&dropped_id), Some(dropped));
        assert_eq!(registry.unregister(&dropped_id), None);
        assert_eq!(registry.resolve(&dropped_id), None);
        assert_eq!(registry.resolve(&kept_id), Some(kept));
    }

    #[test]
    fn from_entries_rejects_duplicate_objects() {
        let document = DocumentId::new("Assets/Scenes/Level1.scene").unwrap();
        let object = ObjectHandle::new();
        let first = ReferenceId::parse("a").unwrap();
        let second = ReferenceId::parse("b").unwrap();

        let err = ReferenceRegistry::from_entries(
            document.clone(),
            vec![(first.clone(), object), (second.clone(), object)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateObject {
                object,
                existing: first,
                duplicate: second,
            }
        );

        let err = ReferenceRegistry::from_entries(
            document,
            vec![(ReferenceId::parse("c").unwrap(), ObjectHandle::nil())],
        )
        .unwrap_err();
        assert_eq!(err, RegistryError::InvalidTarget);
    }
}
