//! Task list repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist whole task lists (name, ordered items, link descriptors).
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `save_list` replaces all items in one transaction, in list order.
//! - `editing` is never written.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::descriptor::ReferenceDescriptor;
use crate::model::handle::{DocumentId, HandleError};
use crate::model::task_list::{ChecklistItem, TaskList};
use crate::registry::reference_registry::RegistryError;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one persisted list.
pub type ListId = Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for list and registry persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(String),
    InvalidData(String),
    Registry(RegistryError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Registry(err) => write!(f, "invalid persisted registry: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RegistryError> for RepoError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<HandleError> for RepoError {
    fn from(value: HandleError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// A list together with its identity and owning document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTaskList {
    pub id: ListId,
    /// `None` when the list lives in an asset rather than a scene.
    pub document: Option<DocumentId>,
    pub list: TaskList,
}

impl StoredTaskList {
    /// Wraps a list that has never been saved under a fresh id.
    pub fn create(document: Option<DocumentId>, list: TaskList) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            list,
        }
    }
}

/// Lightweight row for list pickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub id: ListId,
    pub document: Option<DocumentId>,
    pub name: String,
    pub item_count: usize,
    pub completed_count: usize,
}

/// Repository interface for task lists.
pub trait TaskListRepository {
    fn save_list(&self, stored: &StoredTaskList) -> RepoResult<()>;
    fn load_list(&self, id: ListId) -> RepoResult<Option<StoredTaskList>>;
    fn find_list_by_name(&self, name: &str) -> RepoResult<Option<StoredTaskList>>;
    fn list_lists(&self) -> RepoResult<Vec<ListSummary>>;
    fn delete_list(&self, id: ListId) -> RepoResult<()>;
}

/// SQLite-backed task list repository.
pub struct SqliteTaskListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskListRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_items(&self, id: ListId) -> RepoResult<Vec<ChecklistItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT completed, text, reference_json
             FROM task_items
             WHERE list_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn load_header(&self, sql: &str, key: &str) -> RepoResult<Option<StoredTaskList>> {
        let header = self
            .conn
            .query_row(sql, [key], |row| {
                Ok((
                    row.get::<_, String>("list_uuid")?,
                    row.get::<_, Option<String>>("document")?,
                    row.get::<_, String>("name")?,
                ))
            })
            .optional()?;

        let Some((uuid_text, document, name)) = header else {
            return Ok(None);
        };
        let id = parse_list_id(&uuid_text)?;
        let document = document.map(DocumentId::new).transpose()?;
        let items = self.load_items(id)?;
        Ok(Some(StoredTaskList {
            id,
            document,
            list: TaskList { name, items },
        }))
    }
}

impl TaskListRepository for SqliteTaskListRepository<'_> {
    fn save_list(&self, stored: &StoredTaskList) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let id_text = stored.id.to_string();

        tx.execute(
            "INSERT INTO task_lists (list_uuid, document, name)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(list_uuid) DO UPDATE SET
                document = excluded.document,
                name = excluded.name,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                id_text,
                stored.document.as_ref().map(DocumentId::as_str),
                stored.list.name.as_str(),
            ],
        )?;
        tx.execute("DELETE FROM task_items WHERE list_uuid = ?1;", [&id_text])?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO task_items (list_uuid, position, completed, text, reference_json)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for (position, item) in stored.list.items.iter().enumerate() {
                let reference_json = item
                    .reference
                    .as_ref()
                    .map(encode_reference)
                    .transpose()?;
                insert.execute(params![
                    id_text,
                    position as i64,
                    bool_to_int(item.completed),
                    item.text.as_str(),
                    reference_json,
                ])?;
            }
        }
        tx.commit()?;

        info!(
            "event=task_list_save module=repo status=ok list_id={} items={}",
            stored.id,
            stored.list.len()
        );
        Ok(())
    }

    fn load_list(&self, id: ListId) -> RepoResult<Option<StoredTaskList>> {
        self.load_header(
            "SELECT list_uuid, document, name FROM task_lists WHERE list_uuid = ?1;",
            &id.to_string(),
        )
    }

    fn find_list_by_name(&self, name: &str) -> RepoResult<Option<StoredTaskList>> {
        self.load_header(
            "SELECT list_uuid, document, name FROM task_lists
             WHERE name = ?1
             ORDER BY updated_at DESC, list_uuid ASC
             LIMIT 1;",
            name,
        )
    }

    fn list_lists(&self) -> RepoResult<Vec<ListSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                l.list_uuid,
                l.document,
                l.name,
                COUNT(i.position) AS item_count,
                COALESCE(SUM(i.completed), 0) AS completed_count
             FROM task_lists l
             LEFT JOIN task_items i ON i.list_uuid = l.list_uuid
             GROUP BY l.list_uuid
             ORDER BY l.name ASC, l.list_uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("list_uuid")?;
            let document: Option<String> = row.get("document")?;
            summaries.push(ListSummary {
                id: parse_list_id(&uuid_text)?,
                document: document.map(DocumentId::new).transpose()?,
                name: row.get("name")?,
                item_count: count_to_usize(row.get("item_count")?)?,
                completed_count: count_to_usize(row.get("completed_count")?)?,
            });
        }
        Ok(summaries)
    }

    fn delete_list(&self, id: ListId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM task_lists WHERE list_uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("task list {id}")));
        }
        info!("event=task_list_delete module=repo status=ok list_id={id}");
        Ok(())
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<ChecklistItem> {
    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in task_items.completed"
            )));
        }
    };
    let reference = match row.get::<_, Option<String>>("reference_json")? {
        Some(raw) => Some(decode_reference(&raw)?),
        None => None,
    };
    Ok(ChecklistItem {
        completed,
        text: row.get("text")?,
        reference,
        editing: false,
    })
}

fn parse_list_id(value: &str) -> RepoResult<ListId> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{value}` in task_lists.list_uuid"))
    })
}

fn encode_reference(reference: &ReferenceDescriptor) -> RepoResult<String> {
    serde_json::to_string(reference)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode reference: {err}")))
}

fn decode_reference(raw: &str) -> RepoResult<ReferenceDescriptor> {
    serde_json::from_str(raw).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid reference `{raw}` in task_items.reference_json: {err}"
        ))
    })
}

fn count_to_usize(value: i64) -> RepoResult<usize> {
    usize::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative item count `{value}`")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
