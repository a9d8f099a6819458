pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod staging;
pub mod startup;

use config::Settings;
use services::{BackendClient, ViewRegistry};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state: the backend client and every open view.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub views: Arc<ViewRegistry>,
    pub commit_timeout: Duration,
    pub upload_body_limit: usize,
}

impl AppState {
    pub fn new(backend: Arc<BackendClient>, views: Arc<ViewRegistry>, settings: &Settings) -> Self {
        Self {
            backend,
            views,
            commit_timeout: settings.backend.request_timeout(),
            upload_body_limit: settings.staging.upload_body_limit(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let backend = Arc::new(BackendClient::new(settings.backend.clone()));
        let views = Arc::new(ViewRegistry::new(
            settings.staging.file_policy(),
            settings.staging.view_idle_timeout(),
        ));
        Self::new(backend, views, settings)
    }
}
