pub(crate) mod admin;
pub(crate) mod analysis;
pub(crate) mod dashboard;
pub(crate) mod error;
pub(crate) mod exports;
pub(crate) mod health;
pub(crate) mod metrics;

use axum::{
    Router,
    routing::{get, post},
};

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/v1/analysis/text", post(analysis::classify_text))
        .route("/v1/analysis/file", post(analysis::analyze_file))
        .route("/v1/exports/{token}", get(exports::download))
        .route("/v1/dashboard", get(dashboard::snapshot))
        .route("/admin/exports/sweep", post(admin::sweep_exports))
        .route("/admin/classifier/reset", post(admin::reset_classifier))
        .with_state(state)
}
