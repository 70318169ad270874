use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use relay_api::SensorRecord;

use super::AppState;

// ═══════════════════════════════════════════════════════════════
//  POST /
// ═══════════════════════════════════════════════════════════════

/// Hands the record to the publisher and answers at once; delivery and
/// rejections are reported through the publisher's handler.
pub(crate) async fn handle_ingest(
    State(state): State<AppState>,
    Json(record): Json<SensorRecord>,
) -> &'static str {
    state.publisher.publish(&state.topic, record);
    "ok"
}

// ═══════════════════════════════════════════════════════════════
//  GET /health, GET /stats
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

pub(crate) async fn handle_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.publisher.stats())
}
