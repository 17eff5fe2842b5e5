//! Domain model for task lists and cross-document object links.
//!
//! # Responsibility
//! - Define the persisted shapes of task lists, items and link descriptors.
//! - Define typed identities for host objects, documents and registry keys.
//!
//! # Invariants
//! - A list exclusively owns its items.
//! - Descriptors only hold identifiers, never resolved objects.

pub mod descriptor;
pub mod handle;
pub mod task_list;
