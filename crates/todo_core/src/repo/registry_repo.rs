//! Reference registry persistence.
//!
//! # Responsibility
//! - Save and load the registry anchored in each document.
//! - Provide the administrative destroy used to drop a document's registry.
//!
//! # Invariants
//! - One registry row per document; entries cascade with it.
//! - `(document, object_handle)` is unique, matching the in-memory invariant.

use crate::model::handle::{DocumentId, ObjectHandle, ReferenceId};
use crate::registry::reference_registry::ReferenceRegistry;
use crate::repo::task_list_repo::{RepoError, RepoResult};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for per-document registries.
pub trait RegistryRepository {
    fn save_registry(&self, registry: &ReferenceRegistry) -> RepoResult<()>;
    fn load_registry(&self, document: &DocumentId) -> RepoResult<Option<ReferenceRegistry>>;
    /// Removes the registry. Returns `false` when none was stored.
    fn delete_registry(&self, document: &DocumentId) -> RepoResult<bool>;
    fn list_documents(&self) -> RepoResult<Vec<DocumentId>>;
}

/// SQLite-backed registry repository.
pub struct SqliteRegistryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RegistryRepository for SqliteRegistryRepository<'_> {
    fn save_registry(&self, registry: &ReferenceRegistry) -> RepoResult<()> {
        let document = registry.document().as_str();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO reference_registries (document) VALUES (?1)
             ON CONFLICT(document) DO UPDATE SET
                updated_at = (strftime('%s', 'now') * 1000);",
            [document],
        )?;
        tx.execute(
            "DELETE FROM reference_entries WHERE document = ?1;",
            [document],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO reference_entries (document, reference_id, object_handle)
                 VALUES (?1, ?2, ?3);",
            )?;
            for (id, object) in registry.entries() {
                insert.execute(params![document, id.as_str(), object.to_string()])?;
            }
        }
        tx.commit()?;

        info!(
            "event=registry_save module=repo status=ok document={} entries={}",
            document,
            registry.len()
        );
        Ok(())
    }

    fn load_registry(&self, document: &DocumentId) -> RepoResult<Option<ReferenceRegistry>> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM reference_registries WHERE document = ?1;",
                [document.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT reference_id, object_handle
             FROM reference_entries
             WHERE document = ?1
             ORDER BY reference_id ASC;",
        )?;
        let mut rows = stmt.query([document.as_str()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("reference_id")?;
            let handle: String = row.get("object_handle")?;
            let object = ObjectHandle::parse(&handle).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid object handle `{handle}` in reference_entries.object_handle"
                ))
            })?;
            entries.push((ReferenceId::parse(id)?, object));
        }

        Ok(Some(ReferenceRegistry::from_entries(
            document.clone(),
            entries,
        )?))
    }

    fn delete_registry(&self, document: &DocumentId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM reference_registries WHERE document = ?1;",
            [document.as_str()],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        warn!("event=registry_destroy module=repo status=ok document={document}");
        Ok(true)
    }

    fn list_documents(&self) -> RepoResult<Vec<DocumentId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT document FROM reference_registries ORDER BY document ASC;")?;
        let mut rows = stmt.query([])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            documents.push(DocumentId::new(raw)?);
        }
        Ok(documents)
    }
}
