pub mod backend_client;
pub mod metrics;
pub mod views;

pub use backend_client::BackendClient;
pub use views::{
    commit_label, commit_view, CommitOutcome, DebtorSource, DebtorView, ViewError, ViewRegistry,
    ViewSnapshot,
};
