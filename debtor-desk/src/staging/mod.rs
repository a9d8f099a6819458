//! Staging area for a debtor's document edits.

pub mod categories;
pub mod commit;
pub mod pending;

pub use categories::{
    CATEGORY_DEFS, CategoryDef, CategoryGroup, NEW_FILES_CATEGORY, OTHER_CATEGORY, PanelEntry,
    categorize, categorize_documents,
};
pub use commit::{
    BackendError, CommitBatch, CommitPhase, CommitReport, DocumentBackend, PhaseFailure,
    RenamedDocument,
};
pub use pending::{AddOutcome, FilePolicy, PendingChanges, RejectReason, RejectedFile, StagingError};
