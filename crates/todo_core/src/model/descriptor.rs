//! Persisted link from a checklist item to a host object.
//!
//! # Invariants
//! - `Direct` handles are only meaningful inside the list's own document.
//! - `Indirect` never carries a resolved object; resolution results live in
//!   `reference::ResolutionCache`.

use crate::model::handle::{DocumentId, ObjectHandle, ReferenceId};
use serde::{Deserialize, Serialize};

/// How a checklist item finds its linked object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceDescriptor {
    /// Object lives in the same document as the list (or is an asset).
    Direct { object: ObjectHandle },
    /// Object lives in `document` and is looked up through its registry.
    Indirect { document: DocumentId, id: ReferenceId },
}

impl ReferenceDescriptor {
    pub fn direct(object: ObjectHandle) -> Self {
        Self::Direct { object }
    }

    pub fn indirect(document: DocumentId, id: ReferenceId) -> Self {
        Self::Indirect { document, id }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct { .. })
    }

    /// Target document of an indirect link.
    pub fn target_document(&self) -> Option<&DocumentId> {
        match self {
            Self::Direct { .. } => None,
            Self::Indirect { document, .. } => Some(document),
        }
    }
}
