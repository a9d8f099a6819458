//! HTTP client for the debtor-document backend.

use crate::config::BackendSettings;
use crate::models::{DebtorId, DebtorRecord, DocumentId, NewFile};
use crate::staging::{BackendError, DocumentBackend};
use async_trait::async_trait;
use desk_core::observability::TracedClientExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::json;

pub struct BackendClient {
    client: Client,
    settings: BackendSettings,
}

impl BackendClient {
    pub fn new(settings: BackendSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn base_url(&self) -> &str {
        self.settings.url.trim_end_matches('/')
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Fetch the debtor with its authoritative document list.
    pub async fn fetch_debtor(&self, debtor_id: &DebtorId) -> Result<DebtorRecord, BackendError> {
        let url = self.url(&format!("/api/debtors/{}", debtor_id));

        let response = self
            .client
            .traced_get(&url)
            .timeout(self.settings.request_timeout())
            .send()
            .await
            .map_err(|e| transport_error(&url, e, &self.settings))?;

        let response = ensure_success(response).await?;
        response.json::<DebtorRecord>().await.map_err(|e| {
            tracing::error!(debtor_id = %debtor_id, error = %e, "Failed to decode debtor");
            BackendError::Decode(e)
        })
    }
}

#[async_trait]
impl DocumentBackend for BackendClient {
    async fn delete_document(&self, id: DocumentId) -> Result<(), BackendError> {
        let url = self.url(&format!("/api/documents/{}", id));

        let response = self
            .client
            .traced_delete(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e, &self.settings))?;

        ensure_success(response).await?;
        tracing::info!(document_id = %id, "Document deleted");
        Ok(())
    }

    async fn rename_document(&self, id: DocumentId, new_name: &str) -> Result<(), BackendError> {
        let url = self.url(&format!("/api/documents/{}/rename", id));

        let response = self
            .client
            .traced_put(&url)
            .json(&json!({ "filename": new_name }))
            .send()
            .await
            .map_err(|e| transport_error(&url, e, &self.settings))?;

        ensure_success(response).await?;
        tracing::info!(document_id = %id, new_name = %new_name, "Document renamed");
        Ok(())
    }

    async fn upload_documents(
        &self,
        debtor_id: &DebtorId,
        files: &[NewFile],
    ) -> Result<(), BackendError> {
        let url = self.url(&format!("/api/debtors/{}/documents", debtor_id));

        let mut form = Form::new();
        for file in files {
            let part = Part::stream_with_length(reqwest::Body::from(file.data.clone()), file.size())
                .file_name(file.name.clone())
                .mime_str(&file.content_type)
                .map_err(BackendError::Transport)?;
            form = form.part("files[]", part);
        }

        let response = self
            .client
            .traced_post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(&url, e, &self.settings))?;

        ensure_success(response).await?;
        tracing::info!(debtor_id = %debtor_id, file_count = files.len(), "Documents uploaded");
        Ok(())
    }
}

fn transport_error(url: &str, error: reqwest::Error, settings: &BackendSettings) -> BackendError {
    if error.is_timeout() {
        tracing::error!(url = %url, "Backend request timed out");
        return BackendError::Timeout(settings.request_timeout());
    }
    tracing::error!("Failed to send request to {}: {}", url, error);
    BackendError::Transport(error)
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::error!(status = %status, body = %body, "Backend request failed");
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}
