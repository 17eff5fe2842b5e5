//! Host object and document identity primitives.
//!
//! # Responsibility
//! - Give host objects, documents and registry keys distinct types.
//! - Keep "null object" and "blank document" checks in one place.
//!
//! # Invariants
//! - A nil `ObjectHandle` is the null object and never a valid link target.
//! - `DocumentId` and `ReferenceId` are never blank after construction.

use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque handle of one host object (scene entity, component or asset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(Uuid);

impl ObjectHandle {
    /// Allocates a fresh random handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The null object.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Parses the hyphenated text form used in persisted rows.
    pub fn parse(value: &str) -> Result<Self, HandleError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| HandleError::InvalidObjectHandle(value.to_string()))
    }
}

impl Default for ObjectHandle {
    fn default() -> Self {
        Self::nil()
    }
}

impl Display for ObjectHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable identifier of one document, typically its asset path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Result<Self, HandleError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(HandleError::EmptyDocumentId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry key that resolves to one object inside one document.
///
/// Generated keys are hyphenated UUID v4 text, but any non-blank string
/// read back from storage is accepted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Issues a new 128-bit random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(value: impl Into<String>) -> Result<Self, HandleError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(HandleError::EmptyReferenceId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ReferenceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

impl Display for ReferenceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Construction errors for identity primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    EmptyDocumentId,
    EmptyReferenceId,
    InvalidObjectHandle(String),
}

impl Display for HandleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDocumentId => write!(f, "document id must not be blank"),
            Self::EmptyReferenceId => write!(f, "reference id must not be blank"),
            Self::InvalidObjectHandle(value) => write!(f, "invalid object handle `{value}`"),
        }
    }
}

impl Error for HandleError {}

#[cfg(test)]
mod tests {
    use super::{DocumentId, HandleError, ObjectHandle, ReferenceId};

    #[test]
    fn document_id_trims_and_rejects_blank() {
        let id = DocumentId::new("  Assets/Scenes/Level1.scene ").expect("valid document id");
        assert_eq!(id.as_str(), "Assets/Scenes/Level1.scene");
        assert_eq!(DocumentId::new("   "), Err(HandleError::EmptyDocumentId));
    }

    #[test]
    fn generated_reference_ids_are_distinct_uuid_text() {
        let first = ReferenceId::generate();
        let second = ReferenceId::generate();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 36);
        assert!(uuid::Uuid::parse_str(first.as_str()).is_ok());
    }

    #[test]
    fn object_handle_text_form_parses_back() {
        let handle = ObjectHandle::new();
        let parsed = ObjectHandle::parse(&handle.to_string()).expect("handle should parse");
        assert_eq!(parsed, handle);
        assert!(ObjectHandle::parse("not-a-handle").is_err());
        assert!(ObjectHandle::default().is_nil());
    }

    #[test]
    fn blank_ids_are_rejected_when_deserializing() {
        let err = serde_json::from_str::<DocumentId>("\"  \"").unwrap_err();
        assert!(err.to_string().contains("document id must not be blank"));
        let err = serde_json::from_str::<ReferenceId>("\"\"").unwrap_err();
        assert!(err.to_string().contains("reference id must not be blank"));
    }
}
