use axum::response::IntoResponse;

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn metrics() -> impl IntoResponse {
    crate::services::metrics::get_metrics()
}
