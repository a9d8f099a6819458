use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned document identifier, unique within a debtor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebtorId(pub String);

impl fmt::Display for DebtorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DebtorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// An uploaded file as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    #[serde(default)]
    pub doc_type: Option<String>,
}

impl Document {
    pub fn new(id: i64, filename: impl Into<String>) -> Self {
        Self {
            id: DocumentId(id),
            filename: filename.into(),
            doc_type: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebtorDocuments {
    #[serde(default)]
    pub uploaded: Vec<Document>,
    #[serde(default)]
    pub generated: Vec<Document>,
}

/// Debtor payload returned by `GET /api/debtors/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtorRecord {
    pub id: DebtorId,
    pub full_name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_lawyer")]
    pub lawyer: String,
    #[serde(default)]
    pub documents: DebtorDocuments,
}

fn default_lawyer() -> String {
    "urist1".to_string()
}

impl DebtorRecord {
    pub fn uploaded(&self) -> &[Document] {
        &self.documents.uploaded
    }

    pub fn find_uploaded(&self, id: DocumentId) -> Option<&Document> {
        self.documents.uploaded.iter().find(|d| d.id == id)
    }
}
