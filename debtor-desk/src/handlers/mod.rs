pub mod app;
pub mod panel;
pub mod views;

use crate::models::DebtorId;
use crate::services::ViewError;
use crate::staging::{BackendError, StagingError};
use desk_core::error::AppError;

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::NotFound(_) => AppError::NotFound(anyhow::Error::new(err)),
            ViewError::Busy(_) => AppError::Conflict(anyhow::Error::new(err)),
        }
    }
}

impl From<StagingError> for AppError {
    fn from(err: StagingError) -> Self {
        AppError::UnprocessableEntity(anyhow::Error::new(err))
    }
}

/// Map a failed debtor fetch onto the response the browser should see.
pub(crate) fn debtor_fetch_error(debtor_id: &DebtorId, err: BackendError) -> AppError {
    match err {
        BackendError::Status { status: 404, .. } => {
            AppError::NotFound(anyhow::anyhow!("Debtor {} not found", debtor_id))
        }
        other => {
            tracing::error!(debtor_id = %debtor_id, error = %other, "Failed to load debtor");
            AppError::BadGateway(other.to_string())
        }
    }
}
