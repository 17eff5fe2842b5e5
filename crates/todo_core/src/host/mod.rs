//! Host environment contract.
//!
//! # Responsibility
//! - Describe what core needs from the editor: document membership of
//!   objects, document availability, and the hidden registry anchor.
//!
//! # Invariants
//! - A registry is only reachable while its document is loaded.
//! - Every registry write is followed by `mark_dirty` on its document.

use crate::model::handle::{DocumentId, ObjectHandle};
use crate::registry::reference_registry::ReferenceRegistry;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;

pub use memory::InMemoryHost;

/// Host-side failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Document is unknown or not currently loaded.
    DocumentUnavailable(DocumentId),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentUnavailable(document) => {
                write!(f, "document is not loaded: {document}")
            }
        }
    }
}

impl Error for HostError {}

/// Editor services consumed by the reference policy.
pub trait DocumentHost {
    /// Document a scene-resident object lives in; `None` for assets.
    fn owning_document(&self, object: ObjectHandle) -> Option<DocumentId>;

    /// Whether `document` can currently be located.
    fn is_loaded(&self, document: &DocumentId) -> bool;

    /// Root of the template instance `object` belongs to, if any.
    fn instance_root(&self, object: ObjectHandle) -> Option<ObjectHandle>;

    /// Registry anchored in `document`, if it exists and is loaded.
    fn registry(&self, document: &DocumentId) -> Option<&ReferenceRegistry>;

    /// Finds the anchored registry or creates a hidden one.
    fn registry_or_create(
        &mut self,
        document: &DocumentId,
    ) -> Result<&mut ReferenceRegistry, HostError>;

    /// Destroys the anchored registry. Returns `false` if there was none.
    fn remove_registry(&mut self, document: &DocumentId) -> bool;

    /// Flags `document` as needing a save.
    fn mark_dirty(&mut self, document: &DocumentId);
}
