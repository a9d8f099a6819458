//! Server-rendered document panel for one view.

use crate::services::ViewSnapshot;
use crate::staging::{CategoryGroup, PanelEntry};
use crate::AppState;
use askama::Template;
use axum::extract::{Path, State};
use desk_core::error::AppError;
use uuid::Uuid;

pub struct PanelRow {
    pub filename: String,
    pub is_new: bool,
    pub renamed: bool,
    /// Stored documents are marked for deletion; provisional files are
    /// dropped from the staging list.
    pub delete_method: &'static str,
    pub delete_url: String,
    pub rename_url: String,
    pub size_label: String,
}

pub struct PanelGroup {
    pub name: &'static str,
    pub count: usize,
    pub expanded: bool,
    pub is_new_files: bool,
    pub rows: Vec<PanelRow>,
}

#[derive(Template)]
#[template(path = "panel.html")]
pub struct PanelTemplate {
    pub full_name: String,
    pub lawyer: String,
    pub commit_url: String,
    pub commit_label: String,
    pub has_pending: bool,
    pub busy: bool,
    pub groups: Vec<PanelGroup>,
}

impl PanelTemplate {
    pub fn from_snapshot(snapshot: &ViewSnapshot) -> Self {
        let base = format!("/api/views/{}", snapshot.view_id);
        Self {
            full_name: snapshot.full_name.clone(),
            lawyer: snapshot.lawyer.clone(),
            commit_url: format!("{}/commit", base),
            commit_label: snapshot.commit_label.clone(),
            has_pending: snapshot.has_pending,
            busy: snapshot.busy,
            groups: snapshot
                .categories
                .iter()
                .map(|group| panel_group(&base, group))
                .collect(),
        }
    }
}

fn panel_group(base: &str, group: &CategoryGroup) -> PanelGroup {
    PanelGroup {
        name: group.name,
        count: group.count(),
        expanded: group.expanded,
        is_new_files: group.is_new_files(),
        rows: group.entries.iter().map(|entry| panel_row(base, entry)).collect(),
    }
}

fn panel_row(base: &str, entry: &PanelEntry) -> PanelRow {
    match entry {
        PanelEntry::Stored {
            id,
            filename,
            renamed,
        } => PanelRow {
            filename: filename.clone(),
            is_new: false,
            renamed: *renamed,
            delete_method: "POST",
            delete_url: format!("{}/documents/{}/delete", base, id),
            rename_url: format!("{}/documents/{}/rename", base, id),
            size_label: String::new(),
        },
        PanelEntry::Provisional {
            index,
            filename,
            size,
        } => PanelRow {
            filename: filename.clone(),
            is_new: true,
            renamed: false,
            delete_method: "DELETE",
            delete_url: format!("{}/new-files/{}", base, index),
            rename_url: String::new(),
            size_label: size_label(*size),
        },
    }
}

fn size_label(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} МБ", bytes as f64 / MIB as f64)
    } else {
        format!("{} КБ", bytes.div_ceil(1024))
    }
}

pub async fn render_panel(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<PanelTemplate, AppError> {
    let snapshot = state.views.read(view_id, |view| view.snapshot())?;
    Ok(PanelTemplate::from_snapshot(&snapshot))
}
