//! Session cache of resolved indirect links.
//!
//! Lives beside the persisted descriptors, never inside them. Keys are
//! `(document, identifier)` pairs, which never change meaning, so entries
//! only go stale when a registry entry or a whole registry is removed.

use crate::model::handle::{DocumentId, ObjectHandle, ReferenceId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<(DocumentId, ReferenceId), ObjectHandle>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, document: &DocumentId, id: &ReferenceId) -> Option<ObjectHandle> {
        self.entries.get(&(document.clone(), id.clone())).copied()
    }

    pub fn insert(&mut self, document: DocumentId, id: ReferenceId, object: ObjectHandle) {
        self.entries.insert((document, id), object);
    }

    pub fn evict(&mut self, document: &DocumentId, id: &ReferenceId) -> Option<ObjectHandle> {
        self.entries.remove(&(document.clone(), id.clone()))
    }

    /// Drops every entry that points into `document`.
    pub fn evict_document(&mut self, document: &DocumentId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(cached, _), _| cached != document);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::ResolutionCache;
    use crate::model::handle::{DocumentId, ObjectHandle, ReferenceId};

    #[test]
    fn evict_document_keeps_other_documents() {
        let level1 = DocumentId::new("Assets/Scenes/Level1.scene").unwrap();
        let level2 = DocumentId::new("Assets/Scenes/Level2.scene").unwrap();
        let mut cache = ResolutionCache::new();
        let id1 = ReferenceId::generate();
        let id2 = ReferenceId::generate();
        let object = ObjectHandle::new();

        cache.insert(level1.clone(), id1.clone(), object);
        cache.insert(level1.clone(), ReferenceId::generate(), ObjectHandle::new());
        cache.insert(level2.clone(), id2.clone(), object);

        assert_eq!(cache.evict_document(&level1), 2);
        assert_eq!(cache.get(&level1, &id1), None);
        assert_eq!(cache.get(&level2, &id2), Some(object));
        assert_eq!(cache.len(), 1);
    }
}
