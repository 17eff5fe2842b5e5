//! Repository layer over the SQLite document store.
//!
//! # Responsibility
//! - Define persistence contracts for task lists and reference registries.
//! - Isolate SQL details from the service layer.
//!
//! # Invariants
//! - Writes replace a whole list or registry atomically.
//! - Repositories return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to transport errors.

pub mod registry_repo;
pub mod task_list_repo;
