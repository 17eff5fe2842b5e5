//! In-process document host.
//!
//! Keeps documents, object placement and registries in memory. The CLI
//! fills it from the SQLite store; tests build scenes by hand.

use crate::host::{DocumentHost, HostError};
use crate::model::handle::{DocumentId, ObjectHandle};
use crate::model::task_list::TaskList;
use crate::registry::reference_registry::ReferenceRegistry;
use log::info;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Default)]
struct DocumentState {
    loaded: bool,
    dirty: bool,
    registry: Option<ReferenceRegistry>,
}

#[derive(Debug, Clone)]
struct Placement {
    document: Option<DocumentId>,
    instance_root: Option<ObjectHandle>,
}

/// Memory-backed `DocumentHost`.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    documents: BTreeMap<DocumentId, DocumentState>,
    objects: HashMap<ObjectHandle, Placement>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a loaded document. Existing documents are left untouched.
    pub fn open_document(&mut self, document: &DocumentId) {
        self.documents
            .entry(document.clone())
            .or_insert_with(|| DocumentState {
                loaded: true,
                ..DocumentState::default()
            });
    }

    /// Marks a known document as unloaded; its registry is kept.
    pub fn unload_document(&mut self, document: &DocumentId) {
        if let Some(state) = self.documents.get_mut(document) {
            state.loaded = false;
        }
    }

    /// Reloads a known document.
    pub fn load_document(&mut self, document: &DocumentId) {
        if let Some(state) = self.documents.get_mut(document) {
            state.loaded = true;
        }
    }

    /// Creates an object inside `document`, opening the document if needed.
    pub fn spawn_in(&mut self, document: &DocumentId) -> ObjectHandle {
        self.open_document(document);
        self.place(ObjectHandle::new(), Some(document.clone()), None)
    }

    /// Creates a project asset (no owning document).
    pub fn spawn_asset(&mut self) -> ObjectHandle {
        self.place(ObjectHandle::new(), None, None)
    }

    /// Creates a template instance root inside `document`.
    pub fn spawn_instance_root(&mut self, document: &DocumentId) -> ObjectHandle {
        self.open_document(document);
        let root = ObjectHandle::new();
        self.place(root, Some(document.clone()), Some(root))
    }

    /// Creates an object that belongs to the instance rooted at `root`.
    ///
    /// Returns `None` when `root` is not a known instance root.
    pub fn spawn_in_instance(&mut self, root: ObjectHandle) -> Option<ObjectHandle> {
        let placement = self.objects.get(&root)?.clone();
        if placement.instance_root != Some(root) {
            return None;
        }
        Some(self.place(ObjectHandle::new(), placement.document, Some(root)))
    }

    /// Records where an externally created object lives.
    pub fn place(
        &mut self,
        object: ObjectHandle,
        document: Option<DocumentId>,
        instance_root: Option<ObjectHandle>,
    ) -> ObjectHandle {
        if let Some(document) = document.as_ref() {
            self.open_document(document);
        }
        self.objects.insert(
            object,
            Placement {
                document,
                instance_root,
            },
        );
        object
    }

    /// Opens every document that `list` links into indirectly.
    ///
    /// A target without a registry then reads as lost instead of unloaded.
    pub fn open_link_targets(&mut self, list: &TaskList) -> usize {
        let targets: BTreeSet<DocumentId> = list
            .iter()
            .filter_map(|item| item.reference.as_ref())
            .filter_map(|reference| reference.target_document())
            .filter(|document| !self.documents.contains_key(*document))
            .cloned()
            .collect();
        for document in &targets {
            self.open_document(document);
        }
        targets.len()
    }

    /// Installs a registry loaded from storage into its (loaded) document.
    pub fn install_registry(&mut self, registry: ReferenceRegistry) {
        let document = registry.document().clone();
        self.open_document(&document);
        if let Some(state) = self.documents.get_mut(&document) {
            state.registry = Some(registry);
        }
    }

    pub fn is_dirty(&self, document: &DocumentId) -> bool {
        self.documents
            .get(document)
            .is_some_and(|state| state.dirty)
    }

    /// Clears the dirty flag after a save.
    pub fn mark_saved(&mut self, document: &DocumentId) {
        if let Some(state) = self.documents.get_mut(document) {
            state.dirty = false;
        }
    }

    /// Documents that currently need saving.
    pub fn dirty_documents(&self) -> Vec<DocumentId> {
        self.documents
            .iter()
            .filter(|(_, state)| state.dirty)
            .map(|(document, _)| document.clone())
            .collect()
    }
}

impl DocumentHost for InMemoryHost {
    fn owning_document(&self, object: ObjectHandle) -> Option<DocumentId> {
        self.objects
            .get(&object)
            .and_then(|placement| placement.document.clone())
    }

    fn is_loaded(&self, document: &DocumentId) -> bool {
        self.documents
            .get(document)
            .is_some_and(|state| state.loaded)
    }

    fn instance_root(&self, object: ObjectHandle) -> Option<ObjectHandle> {
        self.objects
            .get(&object)
            .and_then(|placement| placement.instance_root)
    }

    fn registry(&self, document: &DocumentId) -> Option<&ReferenceRegistry> {
        self.documents
            .get(document)
            .filter(|state| state.loaded)
            .and_then(|state| state.registry.as_ref())
    }

    fn registry_or_create(
        &mut self,
        document: &DocumentId,
    ) -> Result<&mut ReferenceRegistry, HostError> {
        let state = self
            .documents
            .get_mut(document)
            .filter(|state| state.loaded)
            .ok_or_else(|| HostError::DocumentUnavailable(document.clone()))?;

        if state.registry.is_none() {
            info!(
                "event=registry_anchor_create module=host status=ok document={}",
                document
            );
            state.dirty = true;
        }
        Ok(state
            .registry
            .get_or_insert_with(|| ReferenceRegistry::new(document.clone())))
    }

    fn remove_registry(&mut self, document: &DocumentId) -> bool {
        let Some(state) = self.documents.get_mut(document) else {
            return false;
        };
        let removed = state.registry.take().is_some();
        if removed {
            state.dirty = true;
        }
        removed
    }

    fn mark_dirty(&mut self, document: &DocumentId) {
        if let Some(state) = self.documents.get_mut(document) {
            state.dirty = true;
        }
    }
}
