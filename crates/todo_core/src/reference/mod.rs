//! Link policy between checklist items and host objects.
//!
//! # Responsibility
//! - Decide between direct and indirect links on assignment.
//! - Resolve links lazily, degrading to a "lost" display state.
//! - Rewrite links before a template instance is synchronized.
//!
//! # See also
//! - `registry` for the per-document identifier tables.

pub mod cache;
pub mod policy;
pub mod template_sync;
