//! Core domain logic for the checklist tool.
//! This crate owns the task list model, cross-document link policy and
//! the SQLite document store.

pub mod config;
pub mod db;
pub mod host;
pub mod logging;
pub mod model;
pub mod reference;
pub mod registry;
pub mod repo;
pub mod service;
pub mod transfer;

pub use config::{ConfigError, CoreConfig, ReferenceConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use host::{DocumentHost, HostError, InMemoryHost};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::descriptor::ReferenceDescriptor;
pub use model::handle::{DocumentId, HandleError, ObjectHandle, ReferenceId};
pub use model::task_list::{ChecklistItem, TaskList, DEFAULT_LIST_NAME};
pub use reference::policy::{LinkError, LinkOutcome, Placement, ReferencePolicy, Resolution};
pub use reference::template_sync::{SyncOutcome, SyncReport};
pub use registry::reference_registry::{ReferenceRegistry, Registration, RegistryError};
pub use repo::registry_repo::{RegistryRepository, SqliteRegistryRepository};
pub use repo::task_list_repo::{
    ListId, ListSummary, RepoError, RepoResult, SqliteTaskListRepository, StoredTaskList,
    TaskListRepository,
};
pub use service::checklist_service::ChecklistService;
pub use transfer::TransferError;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
