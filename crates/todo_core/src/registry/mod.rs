//! Cross-document reference registries.
//!
//! One registry lives in each document that is the target of at least one
//! indirect link. The host keeps it on a hidden anchor so it is saved and
//! loaded with the document.

pub mod reference_registry;
