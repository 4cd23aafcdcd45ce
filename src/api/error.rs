//! HTTP 境界でのエラー変換。内部の詳細はここで一度だけログに出す。
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::AnalysisError;
use crate::export::ExportError;

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
    code: &'static str,
}

#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub(crate) fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }

    pub(crate) fn timeout() -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            code: "analysis_timeout",
            message: "Error: Analysis took too long.".to_string(),
        }
    }

    pub(crate) fn internal(code: &'static str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code,
            message: "Error: Internal server error.".to_string(),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        let status = match &err {
            AnalysisError::ColumnNotFound { available, column } => {
                warn!(column = %column, ?available, "requested column missing");
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AnalysisError::ParseFailed { .. } => {
                warn!(error = ?err, "uploaded file could not be parsed");
                StatusCode::BAD_REQUEST
            }
            AnalysisError::UnsupportedFormat { .. } | AnalysisError::FileNotFound => {
                warn!(error = ?err, "uploaded file rejected");
                StatusCode::BAD_REQUEST
            }
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        // ボディ上限超過は 413 としてそのまま返す
        let status = err.status();
        warn!(error = %err, %status, "malformed multipart upload");
        Self {
            status,
            code: "invalid_upload",
            message: "Error: Invalid upload.".to_string(),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        let status = match &err {
            ExportError::ArtifactNotFound => StatusCode::NOT_FOUND,
            ExportError::PathTraversalRejected => {
                warn!("export token rejected as path traversal");
                StatusCode::BAD_REQUEST
            }
            ExportError::Serialize { .. } | ExportError::Io(_) => {
                error!(error = ?err, "export retrieval failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                code: self.code,
            }),
        )
            .into_response()
    }
}
