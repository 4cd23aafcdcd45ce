use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{debug, error};

use super::error::ApiError;
use crate::app::AppState;

/// 保存済みのエクスポートをダウンロードさせる。ファイル全体を一度に読むので、
/// スイープと競合しても途中までの本文は返らない。
pub(crate) async fn download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = state.pipeline();
    let artifact = tokio::task::spawn_blocking(move || pipeline.exporter().fetch(&token))
        .await
        .map_err(|join_error| {
            error!(error = %join_error, "export fetch task failed");
            ApiError::internal("export_task_failed")
        })??;

    debug!(token = %artifact.token, bytes = artifact.bytes.len(), "serving export artifact");
    let disposition = format!(
        "attachment; filename=\"{}\"",
        artifact.format.download_name()
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    ))
}
