use axum::{Json, extract::State};
use serde::Serialize;
use tracing::error;

use super::error::ApiError;
use crate::{app::AppState, classifier::ModelStatus, export::SweepReport};

pub(crate) async fn sweep_exports(
    State(state): State<AppState>,
) -> Result<Json<SweepReport>, ApiError> {
    state.telemetry().record_admin_sweep_invocation();
    state.sweeper().sweep_once().await.map(Json).map_err(|err| {
        error!(error = %err, "manual export sweep failed");
        ApiError::internal("sweep_failed")
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct ResetResponse {
    reset: bool,
    status: ModelStatus,
}

/// Failed 状態の分類器を未初期化に戻す。次の分類要求でロードが再試行される。
pub(crate) async fn reset_classifier(State(state): State<AppState>) -> Json<ResetResponse> {
    let classifier = state.pipeline().classifier().clone();
    let reset = classifier.reset();
    state.telemetry().record_admin_reset_invocation(reset);
    Json(ResetResponse {
        reset,
        status: classifier.status(),
    })
}
