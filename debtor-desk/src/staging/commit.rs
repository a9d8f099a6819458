//! Sending staged document edits to the backend.
//!
//! A commit is three independent phases: deletions, renames and one batch
//! upload. Every backend call of every phase runs concurrently, and the report
//! is only built once all of them have finished, so the caller always knows
//! exactly which calls failed.

use crate::models::{DebtorId, DocumentId, NewFile};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Serialize, Serializer};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to decode backend response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// The document operations a commit needs from the backend.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn delete_document(&self, id: DocumentId) -> Result<(), BackendError>;

    async fn rename_document(&self, id: DocumentId, new_name: &str) -> Result<(), BackendError>;

    async fn upload_documents(
        &self,
        debtor_id: &DebtorId,
        files: &[NewFile],
    ) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPhase {
    Delete,
    Rename,
    Upload,
}

impl CommitPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitPhase::Delete => "delete",
            CommitPhase::Rename => "rename",
            CommitPhase::Upload => "upload",
        }
    }
}

/// The backend calls one commit attempt makes.
#[derive(Debug, Clone)]
pub struct CommitBatch {
    pub debtor_id: DebtorId,
    pub to_delete: Vec<DocumentId>,
    pub to_rename: Vec<(DocumentId, String)>,
    pub new_files: Vec<NewFile>,
}

impl CommitBatch {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_rename.is_empty() && self.new_files.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedDocument {
    pub id: DocumentId,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct PhaseFailure {
    pub phase: CommitPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    #[serde(serialize_with = "serialize_display")]
    pub error: BackendError,
}

fn serialize_display<S: Serializer>(
    error: &BackendError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Default, Serialize)]
pub struct CommitReport {
    pub deleted: Vec<DocumentId>,
    pub renamed: Vec<RenamedDocument>,
    /// Renames that failed on documents this commit deleted. They are moot,
    /// not failures.
    pub superseded_renames: Vec<DocumentId>,
    pub uploaded: usize,
    pub failures: Vec<PhaseFailure>,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Phases with at least one failed call, in phase order.
    pub fn failed_phases(&self) -> Vec<CommitPhase> {
        let mut phases: Vec<CommitPhase> = self.failures.iter().map(|f| f.phase).collect();
        phases.sort();
        phases.dedup();
        phases
    }

    pub fn failures(&self) -> &[PhaseFailure] {
        &self.failures
    }
}

async fn within<F>(timeout: Duration, call: F) -> Result<(), BackendError>
where
    F: Future<Output = Result<(), BackendError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(BackendError::Timeout(timeout)))
}

/// Run every call in `batch` concurrently and collect the outcome of each.
pub async fn execute(
    batch: &CommitBatch,
    backend: &dyn DocumentBackend,
    timeout: Duration,
) -> CommitReport {
    let deletes = join_all(batch.to_delete.iter().map(|&id| async move {
        (id, within(timeout, backend.delete_document(id)).await)
    }));

    let renames = join_all(batch.to_rename.iter().map(|(id, name)| async move {
        (*id, name, within(timeout, backend.rename_document(*id, name)).await)
    }));

    let upload = async {
        if batch.new_files.is_empty() {
            None
        } else {
            Some(
                within(
                    timeout,
                    backend.upload_documents(&batch.debtor_id, &batch.new_files),
                )
                .await,
            )
        }
    };

    let (deletes, renames, upload) = futures::join!(deletes, renames, upload);

    let mut report = CommitReport::default();

    for (id, result) in deletes {
        match result {
            Ok(()) => report.deleted.push(id),
            Err(error) => {
                tracing::warn!(
                    debtor_id = %batch.debtor_id,
                    document_id = %id,
                    error = %error,
                    "Document delete failed"
                );
                report.failures.push(PhaseFailure {
                    phase: CommitPhase::Delete,
                    document_id: Some(id),
                    error,
                });
            }
        }
    }

    for (id, name, result) in renames {
        match result {
            Ok(()) => report.renamed.push(RenamedDocument {
                id,
                filename: name.clone(),
            }),
            Err(error) if report.deleted.contains(&id) => {
                tracing::debug!(
                    debtor_id = %batch.debtor_id,
                    document_id = %id,
                    error = %error,
                    "Rename of deleted document ignored"
                );
                report.superseded_renames.push(id);
            }
            Err(error) => {
                tracing::warn!(
                    debtor_id = %batch.debtor_id,
                    document_id = %id,
                    error = %error,
                    "Document rename failed"
                );
                report.failures.push(PhaseFailure {
                    phase: CommitPhase::Rename,
                    document_id: Some(id),
                    error,
                });
            }
        }
    }

    match upload {
        Some(Ok(())) => report.uploaded = batch.new_files.len(),
        Some(Err(error)) => {
            tracing::warn!(
                debtor_id = %batch.debtor_id,
                file_count = batch.new_files.len(),
                error = %error,
                "Document upload failed"
            );
            report.failures.push(PhaseFailure {
                phase: CommitPhase::Upload,
                document_id: None,
                error,
            });
        }
        None => {}
    }

    tracing::info!(
        debtor_id = %batch.debtor_id,
        deleted = report.deleted.len(),
        renamed = report.renamed.len(),
        uploaded = report.uploaded,
        failed = report.failures.len(),
        "Commit finished"
    );

    report
}
