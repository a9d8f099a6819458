use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{delete, get, post, put},
    Router,
};
use desk_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    app::{health_check, metrics},
    panel::render_panel,
    views::{
        add_new_files, cancel_new_file, close_view, commit, get_view, mark_for_delete,
        open_view, rename_document, reopen_view,
    },
};
use crate::middleware::metrics::metrics_middleware;
use crate::services::ViewRegistry;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.upload_body_limit);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/api/views", post(open_view))
        .route("/api/views/:view_id", get(get_view).delete(close_view))
        .route("/api/views/:view_id/open", post(reopen_view))
        .route("/api/views/:view_id/panel", get(render_panel))
        .route(
            "/api/views/:view_id/documents/:document_id/delete",
            post(mark_for_delete),
        )
        .route(
            "/api/views/:view_id/documents/:document_id/rename",
            put(rename_document),
        )
        .route(
            "/api/views/:view_id/new-files",
            post(add_new_files).layer(upload_limit),
        )
        .route("/api/views/:view_id/new-files/:index", delete(cancel_new_file))
        .route("/api/views/:view_id/commit", post(commit))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Periodically drop views nobody has touched within the idle timeout.
pub fn spawn_idle_view_sweeper(
    views: Arc<ViewRegistry>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let evicted = views.evict_idle();
            if evicted > 0 {
                tracing::info!(evicted, remaining = views.len(), "Swept idle views");
            }
        }
    })
}
