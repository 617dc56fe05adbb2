use axum::extract::State;

use crate::AppState;

/// Prometheus metrics in text exposition format
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Current metrics", body = String),
    ),
    tag = "Observability"
)]
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
