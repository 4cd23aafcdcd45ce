use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::error::ApiError;
use crate::{
    app::AppState,
    classifier::{Label, prediction_text},
    export::ExportTokens,
    pipeline::AnalysisReport,
    table::{CellValue, TableFormat},
};

#[derive(Debug, Deserialize)]
pub(crate) struct TextRequest {
    text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextResponse {
    text: String,
    label: Option<Label>,
    /// 失敗時の番兵文字列。成功時は `null`。
    error: Option<String>,
}

pub(crate) async fn classify_text(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Result<Json<TextResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request(
            "empty_text",
            "Error: Text must not be empty.",
        ));
    }

    let pipeline = state.pipeline();
    let text = request.text;
    let (text, prediction) = tokio::task::spawn_blocking(move || {
        let prediction = pipeline.classify_text(&text);
        (text, prediction)
    })
    .await
    .map_err(|join_error| {
        error!(error = %join_error, "text classification task failed");
        ApiError::internal("classification_task_failed")
    })?;

    Ok(Json(TextResponse {
        text,
        label: prediction.as_ref().ok().copied(),
        error: prediction.as_ref().err().map(|_| prediction_text(&prediction)),
    }))
}

#[derive(Debug, Serialize)]
pub(crate) struct ExportLinks {
    csv_url: String,
    xlsx_url: String,
    expires_at: DateTime<Utc>,
}

impl From<&ExportTokens> for ExportLinks {
    fn from(tokens: &ExportTokens) -> Self {
        Self {
            csv_url: format!("/v1/exports/{}", tokens.csv),
            xlsx_url: format!("/v1/exports/{}", tokens.xlsx),
            expires_at: tokens.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FileAnalysisResponse {
    text_column: String,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    counts: BTreeMap<Label, usize>,
    failed: usize,
    word_cloud: Option<String>,
    exports: Option<ExportLinks>,
}

impl From<AnalysisReport> for FileAnalysisResponse {
    fn from(report: AnalysisReport) -> Self {
        let table = report.labeled.table();
        Self {
            text_column: report.labeled.text_column().to_string(),
            columns: table.columns().to_vec(),
            rows: table.rows().to_vec(),
            counts: report.counts.as_map(),
            failed: report.counts.failed(),
            word_cloud: report.word_cloud.as_ref().map(|image| image.to_data_uri()),
            exports: report.exports.as_ref().map(ExportLinks::from),
        }
    }
}

struct Upload {
    file_name: String,
    format: TableFormat,
    bytes: Bytes,
    text_column: String,
}

/// multipart の `file` と `text_column` を取り出し、解析前に検証する。
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut text_column: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(ToOwned::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                file = Some((file_name, bytes));
            }
            Some("text_column") => {
                text_column = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let Some((file_name, bytes)) = file else {
        return Err(ApiError::bad_request("missing_file", "Error: No file part."));
    };
    if file_name.trim().is_empty() {
        return Err(ApiError::bad_request(
            "missing_file",
            "Error: No file selected.",
        ));
    }
    let text_column = text_column
        .map(|column| column.trim().to_string())
        .filter(|column| !column.is_empty())
        .ok_or_else(|| {
            ApiError::bad_request("missing_column", "Error: Text column name is required.")
        })?;
    let format = TableFormat::from_file_name(&file_name).ok_or_else(|| {
        ApiError::bad_request(
            "unsupported_format",
            "Error: Unsupported file format. Use .csv or .xlsx",
        )
    })?;

    Ok(Upload {
        file_name,
        format,
        bytes,
        text_column,
    })
}

pub(crate) async fn analyze_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileAnalysisResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    info!(
        file_name = %upload.file_name,
        bytes = upload.bytes.len(),
        column = %upload.text_column,
        "file analysis requested"
    );

    let pipeline = state.pipeline();
    let upload_dir = state.config().upload_dir().to_path_buf();
    let task = tokio::task::spawn_blocking(move || -> Result<AnalysisReport, ApiError> {
        // アップロードは解析が終われば消える一時ファイルに置く
        let staged = stage_upload(&upload_dir, &upload)?;
        pipeline
            .analyze_file(staged.path(), &upload.text_column)
            .map_err(ApiError::from)
    });

    // タイムアウト後もブロッキングタスク自体は最後まで走り、一時ファイルを片付ける
    let report = match tokio::time::timeout(state.config().analysis_timeout(), task).await {
        Err(_) => return Err(ApiError::timeout()),
        Ok(Err(join_error)) => {
            error!(error = %join_error, "file analysis task failed");
            return Err(ApiError::internal("analysis_task_failed"));
        }
        Ok(Ok(result)) => result?,
    };

    Ok(Json(FileAnalysisResponse::from(report)))
}

fn stage_upload(upload_dir: &Path, upload: &Upload) -> Result<tempfile::NamedTempFile, ApiError> {
    let suffix = format!(".{}", upload.format.extension());
    let stage = || -> std::io::Result<tempfile::NamedTempFile> {
        let mut staged = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(upload_dir)?;
        staged.write_all(&upload.bytes)?;
        staged.flush()?;
        Ok(staged)
    };
    stage().map_err(|err| {
        error!(error = %err, dir = %upload_dir.display(), "failed to stage upload");
        ApiError::internal("upload_storage")
    })
}
