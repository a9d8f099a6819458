use super::commit::{self, CommitBatch, CommitReport, DocumentBackend};
use crate::models::{DebtorId, DocumentId, NewFile};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ACCEPTED_EXTENSION: &str = ".pdf";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 200 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StagingError {
    #[error("File name must not be empty")]
    EmptyName,
}

/// Which locally chosen files may be staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePolicy {
    pub accepted_extension: String,
    pub max_file_size: u64,
}

impl Default for FilePolicy {
    fn default() -> Self {
        Self {
            accepted_extension: DEFAULT_ACCEPTED_EXTENSION.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FilePolicy {
    pub fn check(&self, file: &NewFile) -> Result<(), RejectReason> {
        let extension = self.accepted_extension.to_lowercase();
        if !file.name.to_lowercase().ends_with(&extension) {
            return Err(RejectReason::Extension);
        }
        if file.size() > self.max_file_size {
            return Err(RejectReason::TooLarge);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Extension,
    TooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedFile {
    pub name: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    pub accepted: usize,
    pub rejected: Vec<RejectedFile>,
}

/// Uncommitted edits against one debtor's uploaded documents.
///
/// A document may be staged for deletion and renaming at the same time. Both
/// calls are sent; once the deletion is confirmed the rename no longer
/// matters.
///
/// New files have no id. They are addressed by their current position in
/// [`PendingChanges::new_files`], which shifts whenever the list changes.
#[derive(Debug, Clone, Default)]
pub struct PendingChanges {
    to_delete: Vec<DocumentId>,
    to_rename: BTreeMap<DocumentId, String>,
    new_files: Vec<NewFile>,
    policy: FilePolicy,
}

impl PendingChanges {
    pub fn new(policy: FilePolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Drop every staged edit. The file policy is kept.
    pub fn reset(&mut self) {
        self.to_delete.clear();
        self.to_rename.clear();
        self.new_files.clear();
    }

    /// Returns `false` when the id was already staged.
    pub fn mark_for_delete(&mut self, id: DocumentId) -> bool {
        if self.to_delete.contains(&id) {
            return false;
        }
        self.to_delete.push(id);
        true
    }

    pub fn rename(&mut self, id: DocumentId, new_name: &str) -> Result<(), StagingError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(StagingError::EmptyName);
        }
        self.to_rename.insert(id, new_name.to_string());
        Ok(())
    }

    pub fn add_new_files(&mut self, files: impl IntoIterator<Item = NewFile>) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        for file in files {
            match self.policy.check(&file) {
                Ok(()) => {
                    self.new_files.push(file);
                    outcome.accepted += 1;
                }
                Err(reason) => {
                    tracing::debug!(file_name = %file.name, ?reason, "New file rejected");
                    outcome.rejected.push(RejectedFile {
                        name: file.name,
                        reason,
                    });
                }
            }
        }
        outcome
    }

    /// Remove the new file currently at `index`.
    ///
    /// The index is resolved against the list as it is now, so repeating a
    /// cancel with the same index removes the file that has since moved into
    /// that position. Out-of-range indices are ignored.
    pub fn cancel_new_file(&mut self, index: usize) -> Option<NewFile> {
        if index < self.new_files.len() {
            Some(self.new_files.remove(index))
        } else {
            None
        }
    }

    pub fn pending_count(&self) -> usize {
        self.to_delete.len() + self.to_rename.len() + self.new_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn to_delete(&self) -> &[DocumentId] {
        &self.to_delete
    }

    pub fn to_rename(&self) -> &BTreeMap<DocumentId, String> {
        &self.to_rename
    }

    pub fn new_files(&self) -> &[NewFile] {
        &self.new_files
    }

    pub fn policy(&self) -> &FilePolicy {
        &self.policy
    }

    pub fn is_marked_for_delete(&self, id: DocumentId) -> bool {
        self.to_delete.contains(&id)
    }

    pub fn pending_name(&self, id: DocumentId) -> Option<&str> {
        self.to_rename.get(&id).map(String::as_str)
    }

    /// Snapshot the staged edits as the set of backend calls a commit makes.
    pub fn batch(&self, debtor_id: &DebtorId) -> CommitBatch {
        CommitBatch {
            debtor_id: debtor_id.clone(),
            to_delete: self.to_delete.clone(),
            to_rename: self
                .to_rename
                .iter()
                .map(|(id, name)| (*id, name.clone()))
                .collect(),
            new_files: self.new_files.clone(),
        }
    }

    /// Clear the edits a commit confirmed; everything that failed stays staged.
    ///
    /// Callers must not mutate the store between taking the batch and
    /// applying its report: uploaded files are removed from the front of the
    /// list by count.
    pub fn apply_report(&mut self, report: &CommitReport) {
        for id in &report.deleted {
            self.to_delete.retain(|staged| staged != id);
            if report.superseded_renames.contains(id) {
                self.to_rename.remove(id);
            }
        }

        for renamed in &report.renamed {
            if self.pending_name(renamed.id) == Some(renamed.filename.as_str()) {
                self.to_rename.remove(&renamed.id);
            }
        }

        let uploaded = report.uploaded.min(self.new_files.len());
        self.new_files.drain(..uploaded);
    }

    /// Send every staged edit to `backend` and clear what succeeded.
    pub async fn commit(
        &mut self,
        debtor_id: &DebtorId,
        backend: &dyn DocumentBackend,
        timeout: Duration,
    ) -> CommitReport {
        let batch = self.batch(debtor_id);
        let report = commit::execute(&batch, backend, timeout).await;
        self.apply_report(&report);
        report
    }
}
