use crate::staging::FilePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub staging: StagingSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BackendSettings {
    /// Base URL of the debtor-document backend (e.g., http://localhost:5000).
    pub url: String,
    /// Applied to every backend call; an expired call counts as failed.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct StagingSettings {
    #[serde(default = "default_accepted_extension")]
    pub accepted_extension: String,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// Body limit for one multipart upload, which may carry several files.
    #[serde(default = "default_max_upload_request_mb")]
    pub max_upload_request_mb: u64,
    /// Views untouched for this long are discarded with their pending edits.
    #[serde(default = "default_view_idle_timeout_secs")]
    pub view_idle_timeout_secs: u64,
}

fn default_accepted_extension() -> String {
    ".pdf".to_string()
}

fn default_max_file_size_mb() -> u64 {
    200
}

fn default_max_upload_request_mb() -> u64 {
    1024
}

fn default_view_idle_timeout_secs() -> u64 {
    4 * 60 * 60
}

impl Default for StagingSettings {
    fn default() -> Self {
        Self {
            accepted_extension: default_accepted_extension(),
            max_file_size_mb: default_max_file_size_mb(),
            max_upload_request_mb: default_max_upload_request_mb(),
            view_idle_timeout_secs: default_view_idle_timeout_secs(),
        }
    }
}

impl StagingSettings {
    pub fn file_policy(&self) -> FilePolicy {
        FilePolicy {
            accepted_extension: self.accepted_extension.clone(),
            max_file_size: self.max_file_size_mb * 1024 * 1024,
        }
    }

    pub fn upload_body_limit(&self) -> usize {
        usize::try_from(self.max_upload_request_mb * 1024 * 1024).unwrap_or(usize::MAX)
    }

    pub fn view_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.view_idle_timeout_secs)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint (e.g., http://tempo:4317). Spans are not exported when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;

    get_configuration_from(&configuration_directory(&base_path))
}

/// Works both from the workspace root and from inside the crate directory.
fn configuration_directory(base_path: &Path) -> PathBuf {
    if base_path.ends_with("debtor-desk") {
        base_path.join("config")
    } else {
        base_path.join("debtor-desk").join("config")
    }
}

pub fn get_configuration_from(
    configuration_directory: &Path,
) -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
