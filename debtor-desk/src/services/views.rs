//! Open debtor-detail views and their staged edits.
//!
//! Each view owns one [`PendingChanges`]; nothing is shared between views.
//! A commit runs outside the entry lock with the view marked busy, and a busy
//! view rejects further commits and edits until the report is applied.

use crate::models::{DebtorId, DebtorRecord, DocumentId};
use crate::services::backend_client::BackendClient;
use crate::services::metrics;
use crate::staging::{
    categorize_documents, commit, BackendError, CategoryGroup, CommitBatch, CommitReport,
    DocumentBackend, FilePolicy, PendingChanges,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("View {0} not found")]
    NotFound(Uuid),

    #[error("View {0} is committing changes")]
    Busy(Uuid),
}

pub struct DebtorView {
    pub view_id: Uuid,
    pub debtor: DebtorRecord,
    pub pending: PendingChanges,
    pub busy: bool,
    pub opened_at: DateTime<Utc>,
    last_seen: Instant,
}

impl DebtorView {
    fn open(view_id: Uuid, debtor: DebtorRecord, policy: FilePolicy) -> Self {
        Self {
            view_id,
            debtor,
            pending: PendingChanges::new(policy),
            busy: false,
            opened_at: Utc::now(),
            last_seen: Instant::now(),
        }
    }

    pub fn has_document(&self, id: DocumentId) -> bool {
        self.debtor.find_uploaded(id).is_some()
    }

    pub fn categories(&self) -> Vec<CategoryGroup> {
        categorize_documents(self.debtor.uploaded(), &self.pending)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let pending_count = self.pending.pending_count();
        ViewSnapshot {
            view_id: self.view_id,
            debtor_id: self.debtor.id.to_string(),
            full_name: self.debtor.full_name.clone(),
            lawyer: self.debtor.lawyer.clone(),
            categories: self.categories(),
            generated: self
                .debtor
                .documents
                .generated
                .iter()
                .map(|d| GeneratedDocument {
                    id: d.id,
                    filename: d.filename.clone(),
                })
                .collect(),
            pending_count,
            has_pending: pending_count > 0,
            commit_label: commit_label(pending_count),
            busy: self.busy,
            opened_at: self.opened_at,
        }
    }
}

/// Label of the commit button for `pending_count` staged edits.
pub fn commit_label(pending_count: usize) -> String {
    if pending_count > 0 {
        format!("Применить ({})", pending_count)
    } else {
        "Применить изменения".to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDocument {
    pub id: DocumentId,
    pub filename: String,
}

/// What the browser needs to render a debtor's document panel.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub view_id: Uuid,
    pub debtor_id: String,
    pub full_name: String,
    pub lawyer: String,
    pub categories: Vec<CategoryGroup>,
    pub generated: Vec<GeneratedDocument>,
    pub pending_count: usize,
    pub has_pending: bool,
    pub commit_label: String,
    pub busy: bool,
    pub opened_at: DateTime<Utc>,
}

pub struct ViewRegistry {
    views: DashMap<Uuid, DebtorView>,
    policy: FilePolicy,
    idle_timeout: Duration,
}

impl ViewRegistry {
    pub fn new(policy: FilePolicy, idle_timeout: Duration) -> Self {
        Self {
            views: DashMap::new(),
            policy,
            idle_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn open(&self, debtor: DebtorRecord) -> ViewSnapshot {
        let view_id = Uuid::new_v4();
        let view = DebtorView::open(view_id, debtor, self.policy.clone());
        let snapshot = view.snapshot();
        self.views.insert(view_id, view);
        metrics::set_open_views(self.views.len());

        tracing::info!(view_id = %view_id, debtor_id = %snapshot.debtor_id, "View opened");
        snapshot
    }

    /// Point an existing view at `debtor`, discarding everything staged.
    pub fn reopen(&self, view_id: Uuid, debtor: DebtorRecord) -> Result<ViewSnapshot, ViewError> {
        self.update(view_id, |view| {
            tracing::info!(
                view_id = %view_id,
                debtor_id = %debtor.id,
                discarded = view.pending.pending_count(),
                "View reopened"
            );
            view.debtor = debtor;
            view.pending.reset();
            view.opened_at = Utc::now();
            view.snapshot()
        })
    }

    /// Discard a view and its staged edits. A view with a commit in flight
    /// stays until the commit reports back.
    pub fn close(&self, view_id: Uuid) -> Result<(), ViewError> {
        if self.views.remove_if(&view_id, |_, view| !view.busy).is_none() {
            return Err(if self.views.contains_key(&view_id) {
                ViewError::Busy(view_id)
            } else {
                ViewError::NotFound(view_id)
            });
        }
        metrics::set_open_views(self.views.len());
        Ok(())
    }

    /// Read a view without counting as a mutation.
    pub fn read<R>(&self, view_id: Uuid, f: impl FnOnce(&DebtorView) -> R) -> Result<R, ViewError> {
        let mut view = self
            .views
            .get_mut(&view_id)
            .ok_or(ViewError::NotFound(view_id))?;
        view.last_seen = Instant::now();
        Ok(f(&view))
    }

    /// Mutate a view's staging area. Rejected while a commit is in flight.
    pub fn update<R>(
        &self,
        view_id: Uuid,
        f: impl FnOnce(&mut DebtorView) -> R,
    ) -> Result<R, ViewError> {
        let mut view = self
            .views
            .get_mut(&view_id)
            .ok_or(ViewError::NotFound(view_id))?;
        if view.busy {
            return Err(ViewError::Busy(view_id));
        }
        view.last_seen = Instant::now();
        Ok(f(&mut view))
    }

    /// Mark the view busy and snapshot its staged edits.
    pub fn begin_commit(&self, view_id: Uuid) -> Result<CommitBatch, ViewError> {
        self.update(view_id, |view| {
            view.busy = true;
            view.pending.batch(&view.debtor.id)
        })
    }

    /// Apply a commit report, optionally swap in a fresh snapshot, and clear
    /// the busy flag.
    ///
    /// Without a fresh snapshot the confirmed deletes and renames are applied
    /// to the held one, so they do not reappear as unstaged documents.
    pub fn finish_commit(
        &self,
        view_id: Uuid,
        report: &CommitReport,
        refreshed: Option<DebtorRecord>,
    ) -> Result<ViewSnapshot, ViewError> {
        let mut view = self
            .views
            .get_mut(&view_id)
            .ok_or(ViewError::NotFound(view_id))?;
        view.pending.apply_report(report);
        match refreshed {
            Some(debtor) => view.debtor = debtor,
            None => apply_confirmed(&mut view.debtor, report),
        }
        view.busy = false;
        view.last_seen = Instant::now();
        Ok(view.snapshot())
    }

    /// Drop views idle for longer than the configured timeout.
    pub fn evict_idle(&self) -> usize {
        let before = self.views.len();
        let idle_timeout = self.idle_timeout;
        self.views.retain(|view_id, view| {
            let keep = view.busy || view.last_seen.elapsed() < idle_timeout;
            if !keep {
                tracing::info!(
                    view_id = %view_id,
                    discarded = view.pending.pending_count(),
                    "Idle view evicted"
                );
            }
            keep
        });
        let evicted = before.saturating_sub(self.views.len());
        metrics::set_open_views(self.views.len());
        evicted
    }
}

fn apply_confirmed(debtor: &mut DebtorRecord, report: &CommitReport) {
    let uploaded = &mut debtor.documents.uploaded;
    uploaded.retain(|doc| !report.deleted.contains(&doc.id));
    for renamed in &report.renamed {
        if let Some(doc) = uploaded.iter_mut().find(|doc| doc.id == renamed.id) {
            doc.filename = renamed.filename.clone();
        }
    }
}

/// Source of fresh debtor snapshots after a commit.
#[async_trait]
pub trait DebtorSource: Send + Sync {
    async fn load_debtor(&self, debtor_id: &DebtorId) -> Result<DebtorRecord, BackendError>;
}

#[async_trait]
impl DebtorSource for BackendClient {
    async fn load_debtor(&self, debtor_id: &DebtorId) -> Result<DebtorRecord, BackendError> {
        self.fetch_debtor(debtor_id).await
    }
}

#[derive(Debug, Serialize)]
pub struct CommitOutcome {
    pub report: CommitReport,
    pub refreshed: bool,
    pub view: ViewSnapshot,
}

/// Commit a view's staged edits and refresh its snapshot.
///
/// The snapshot is refetched whenever at least one call went through, since
/// even a partial commit changes the backend's document list.
pub async fn commit_view<B>(
    registry: &ViewRegistry,
    backend: &B,
    view_id: Uuid,
    timeout: Duration,
) -> Result<CommitOutcome, ViewError>
where
    B: DocumentBackend + DebtorSource,
{
    let batch = registry.begin_commit(view_id)?;
    let report = commit::execute(&batch, backend, timeout).await;
    metrics::record_commit(&report);

    let anything_applied =
        !report.deleted.is_empty() || !report.renamed.is_empty() || report.uploaded > 0;
    let refreshed = if anything_applied {
        match backend.load_debtor(&batch.debtor_id).await {
            Ok(debtor) => Some(debtor),
            Err(e) => {
                tracing::warn!(
                    view_id = %view_id,
                    debtor_id = %batch.debtor_id,
                    error = %e,
                    "Failed to refresh debtor after commit"
                );
                None
            }
        }
    } else {
        None
    };
    let was_refreshed = refreshed.is_some();

    let view = registry.finish_commit(view_id, &report, refreshed)?;
    Ok(CommitOutcome {
        report,
        refreshed: was_refreshed,
        view,
    })
}
