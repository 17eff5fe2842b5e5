//! Plain-text import/export of task lists.
//!
//! # Responsibility
//! - Encode items as one line each: optional `[Complete]` marker followed by
//!   the text with newlines escaped as `\n` and carriage returns as `\r`.
//! - Decode such text back into appended items.
//!
//! # Invariants
//! - Object links are never written; imported items carry no link.
//! - Import never modifies existing items and never rejects a line.

use crate::model::task_list::{ChecklistItem, TaskList};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Marker that flags a completed item.
pub const COMPLETE_MARKER: &str = "[Complete]";

const ESCAPED_NEWLINE: &str = "\\n";
const ESCAPED_CARRIAGE_RETURN: &str = "\\r";

/// File transfer errors.
#[derive(Debug)]
pub enum TransferError {
    Io(std::io::Error),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "task file i/o failed: {err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for TransferError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Encodes one item as a single line (without terminator).
pub fn export_line(item: &ChecklistItem) -> String {
    let escaped = item
        .text
        .replace('\r', ESCAPED_CARRIAGE_RETURN)
        .replace('\n', ESCAPED_NEWLINE);
    if item.completed {
        format!("{COMPLETE_MARKER}{escaped}")
    } else {
        escaped
    }
}

/// Decodes one line into an item.
pub fn import_line(line: &str) -> ChecklistItem {
    let (completed, text) = match line.strip_prefix(COMPLETE_MARKER) {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    ChecklistItem {
        completed,
        ..ChecklistItem::new(
            text.replace(ESCAPED_NEWLINE, "\n")
                .replace(ESCAPED_CARRIAGE_RETURN, "\r"),
        )
    }
}

/// Encodes every item, one `\n`-terminated line each.
pub fn export_text(list: &TaskList) -> String {
    let mut out = String::new();
    for item in list.iter() {
        out.push_str(&export_line(item));
        out.push('\n');
    }
    out
}

/// Appends one item per line of `text` and returns how many were added.
pub fn import_text(list: &mut TaskList, text: &str) -> usize {
    let before = list.len();
    list.items.extend(text.lines().map(import_line));
    list.len() - before
}

/// Writes `list` to `path`, replacing any existing file.
pub fn export_file(list: &TaskList, path: impl AsRef<Path>) -> Result<(), TransferError> {
    let path = path.as_ref();
    match std::fs::write(path, export_text(list)) {
        Ok(()) => {
            info!(
                "event=tasks_export module=transfer status=ok items={}",
                list.len()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=tasks_export module=transfer status=error error_code=write_failed error={}",
                err
            );
            Err(err.into())
        }
    }
}

/// Reads `path` and appends its items to `list`.
pub fn import_file(list: &mut TaskList, path: impl AsRef<Path>) -> Result<usize, TransferError> {
    let raw = match std::fs::read_to_string(path.as_ref()) {
        Ok(raw) => raw,
        Err(err) => {
            error!(
                "event=tasks_import module=transfer status=error error_code=read_failed error={}",
                err
            );
            return Err(err.into());
        }
    };
    let added = import_text(list, &raw);
    info!("event=tasks_import module=transfer status=ok items={added}");
    Ok(added)
}

/// Default file name offered when exporting, e.g. `To Do_MyGame.txt`.
pub fn default_export_file_name(list_name: &str, product_name: &str) -> String {
    format!("{list_name}_{product_name}.txt")
}
