use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::{app::AppState, classifier::ModelStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct HealthReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<ModelStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// モデルが Failed の場合のみ 503 を返す。未ロードは遅延ロード待ちなので ready 扱い。
pub(crate) async fn ready(
    State(state): State<AppState>,
) -> Result<Json<HealthReport>, (StatusCode, Json<HealthReport>)> {
    let status = state.pipeline().classifier().status();
    let ready = !status.is_failed();
    state.telemetry().record_ready_probe(ready);
    state.telemetry().metrics().set_model_ready(status.is_ready());

    if let ModelStatus::Failed { reason } = &status {
        error!(reason = %reason, "sentiment model readiness check failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthReport {
                status: "degraded",
                detail: Some("sentiment model failed to load".to_string()),
                model: Some(status),
            }),
        ));
    }

    Ok(Json(HealthReport {
        status: "ready",
        model: Some(status),
        detail: None,
    }))
}

pub(crate) async fn live(State(state): State<AppState>) -> Json<HealthReport> {
    state.telemetry().record_live_probe();
    Json(HealthReport {
        status: "live",
        model: None,
        detail: None,
    })
}
