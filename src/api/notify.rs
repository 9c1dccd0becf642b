//! Build-step notification endpoint

use axum::{
    Json,
    extract::{Query, State as AxumState},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::SharedState;
use crate::record::RunRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyParams {
    #[serde(default)]
    pub enable_export: bool,
}

/// POST /api/notify?enableExport=true
///
/// Delivery problems still answer 200 with the outcome; only a run whose
/// payload cannot be assembled is refused.
pub async fn notify(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<NotifyParams>,
    Json(record): Json<RunRecord>,
) -> impl IntoResponse {
    match state.notifier.perform(&record, params.enable_export).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            error!("[#{}] Notification aborted: {}", record.number, e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "outcome": "error",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}
