use axum::body::Bytes;

/// A locally chosen file that has not been uploaded yet, so it has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl NewFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn pdf(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(name, "application/pdf", data.into())
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
