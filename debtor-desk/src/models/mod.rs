pub mod document;
pub mod new_file;

pub use document::{DebtorDocuments, DebtorId, DebtorRecord, Document, DocumentId};
pub use new_file::NewFile;
