use crate::handlers::debtor_fetch_error;
use crate::models::{DebtorId, DocumentId, NewFile};
use crate::services::{commit_view, CommitOutcome, ViewSnapshot};
use crate::staging::{AddOutcome, CommitPhase, CommitReport};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use desk_core::error::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct OpenViewRequest {
    #[validate(length(min = 1, max = 128, message = "debtor_id must not be empty"))]
    pub debtor_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameRequest {
    #[validate(length(max = 255, message = "filename is too long"))]
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct AddFilesResponse {
    pub outcome: AddOutcome,
    pub view: ViewSnapshot,
}

#[derive(Debug, Serialize)]
pub struct CancelFileResponse {
    pub cancelled: Option<String>,
    pub view: ViewSnapshot,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient message shown after a commit.
#[derive(Debug, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn for_report(report: &CommitReport) -> Self {
        if report.is_success() {
            return Self {
                level: NoticeLevel::Success,
                message: "Изменения сохранены".to_string(),
            };
        }

        let phases: Vec<&str> = report
            .failed_phases()
            .into_iter()
            .map(phase_label)
            .collect();
        Self {
            level: NoticeLevel::Error,
            message: format!("Ошибка при сохранении: {}", phases.join(", ")),
        }
    }
}

fn phase_label(phase: CommitPhase) -> &'static str {
    match phase {
        CommitPhase::Delete => "удаление",
        CommitPhase::Rename => "переименование",
        CommitPhase::Upload => "загрузка",
    }
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub notice: Notice,
    #[serde(flatten)]
    pub outcome: CommitOutcome,
}

pub async fn open_view(
    State(state): State<AppState>,
    Json(payload): Json<OpenViewRequest>,
) -> Result<(StatusCode, Json<ViewSnapshot>), AppError> {
    payload.validate()?;
    let debtor_id = DebtorId(payload.debtor_id);

    let debtor = state
        .backend
        .fetch_debtor(&debtor_id)
        .await
        .map_err(|e| debtor_fetch_error(&debtor_id, e))?;

    Ok((StatusCode::CREATED, Json(state.views.open(debtor))))
}

pub async fn get_view(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<Json<ViewSnapshot>, AppError> {
    let snapshot = state.views.read(view_id, |view| view.snapshot())?;
    Ok(Json(snapshot))
}

/// Switch an existing view to another debtor. Staged edits are discarded.
pub async fn reopen_view(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
    Json(payload): Json<OpenViewRequest>,
) -> Result<Json<ViewSnapshot>, AppError> {
    payload.validate()?;
    // Fail fast before the backend round trip.
    state.views.read(view_id, |_| ())?;

    let debtor_id = DebtorId(payload.debtor_id);
    let debtor = state
        .backend
        .fetch_debtor(&debtor_id)
        .await
        .map_err(|e| debtor_fetch_error(&debtor_id, e))?;

    Ok(Json(state.views.reopen(view_id, debtor)?))
}

pub async fn close_view(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.views.close(view_id)?;
    tracing::info!(view_id = %view_id, "View closed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_for_delete(
    State(state): State<AppState>,
    Path((view_id, document_id)): Path<(Uuid, i64)>,
) -> Result<Json<ViewSnapshot>, AppError> {
    let id = DocumentId(document_id);
    let snapshot = state.views.update(view_id, |view| {
        if !view.has_document(id) {
            return Err(unknown_document(id));
        }
        if !view.pending.mark_for_delete(id) {
            tracing::debug!(view_id = %view_id, document_id = %id, "Document already marked");
        }
        Ok(view.snapshot())
    })??;

    Ok(Json(snapshot))
}

pub async fn rename_document(
    State(state): State<AppState>,
    Path((view_id, document_id)): Path<(Uuid, i64)>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<ViewSnapshot>, AppError> {
    payload.validate()?;
    let id = DocumentId(document_id);

    let snapshot = state.views.update(view_id, |view| {
        if !view.has_document(id) {
            return Err(unknown_document(id));
        }
        view.pending.rename(id, &payload.filename)?;
        Ok::<_, AppError>(view.snapshot())
    })??;

    Ok(Json(snapshot))
}

pub async fn add_new_files(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<AddFilesResponse>, AppError> {
    // The view must exist before the body is read.
    state.views.read(view_id, |_| ())?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Malformed multipart body: {}", e))
        })?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|e| {
            tracing::error!(file_name = %file_name, error = %e, "Failed to read uploaded file");
            AppError::BadRequest(anyhow::anyhow!("Failed to read file {}: {}", file_name, e))
        })?;

        files.push(NewFile::new(file_name, content_type, data));
    }

    let (outcome, view) = state.views.update(view_id, |view| {
        let outcome = view.pending.add_new_files(files);
        (outcome, view.snapshot())
    })?;

    if !outcome.rejected.is_empty() {
        tracing::info!(
            view_id = %view_id,
            rejected = outcome.rejected.len(),
            "Some files were not staged"
        );
    }

    Ok(Json(AddFilesResponse { outcome, view }))
}

pub async fn cancel_new_file(
    State(state): State<AppState>,
    Path((view_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<CancelFileResponse>, AppError> {
    let (cancelled, view) = state.views.update(view_id, |view| {
        let cancelled = view.pending.cancel_new_file(index).map(|file| file.name);
        (cancelled, view.snapshot())
    })?;

    Ok(Json(CancelFileResponse { cancelled, view }))
}

/// Send the view's staged edits to the backend.
///
/// The commit runs on its own task so that a dropped connection cannot leave
/// the view marked busy.
pub async fn commit(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<Json<CommitResponse>, AppError> {
    let views = state.views.clone();
    let backend = state.backend.clone();
    let timeout = state.commit_timeout;

    let outcome = tokio::spawn(async move {
        commit_view(views.as_ref(), backend.as_ref(), view_id, timeout).await
    })
    .await
    .map_err(|e| AppError::InternalError(anyhow::anyhow!("Commit task failed: {}", e)))??;

    if outcome.report.is_success() {
        tracing::info!(view_id = %view_id, "Changes committed");
    } else {
        tracing::warn!(
            view_id = %view_id,
            failures = outcome.report.failures.len(),
            "Commit finished with failures"
        );
    }

    Ok(Json(CommitResponse {
        notice: Notice::for_report(&outcome.report),
        outcome,
    }))
}

fn unknown_document(id: DocumentId) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Document {} not found", id))
}
