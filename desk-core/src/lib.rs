//! desk-core: error, tracing and middleware plumbing shared by debtor-desk.
pub mod error;
pub mod middleware;
pub mod observability;
