//! 解析結果のエクスポート（CSV / XLSX）。
//!
//! 成果物はストレージルート直下に `results_<uuid>.<ext>` の名前で保存し、
//! このファイル名そのものをダウンロード用トークンとして扱う。
mod store;
mod sweeper;
mod writer;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::pipeline::LabeledTable;

pub use store::{Artifact, ArtifactStore};
pub use sweeper::{ExportSweeper, SweepReport};
pub use writer::{write_csv, write_xlsx};

const TOKEN_PREFIX: &str = "results_";
/// Prefix of in-flight temporary files inside the storage root.
pub(crate) const PARTIAL_PREFIX: &str = ".partial-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Csv, ExportFormat::Xlsx];

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// User-facing file name, independent of the storage name.
    #[must_use]
    pub fn download_name(self) -> &'static str {
        match self {
            Self::Csv => "sentiment_results.csv",
            Self::Xlsx => "sentiment_results.xlsx",
        }
    }

    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export artifact not found")]
    ArtifactNotFound,
    #[error("invalid export token")]
    PathTraversalRejected,
    #[error("failed to serialize {format} export")]
    Serialize {
        format: ExportFormat,
        #[source]
        source: anyhow::Error,
    },
    #[error("export storage I/O failed")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArtifactNotFound => "artifact_not_found",
            Self::PathTraversalRejected => "path_traversal_rejected",
            Self::Serialize { .. } => "serialize_failed",
            Self::Io(_) => "storage_io",
        }
    }
}

/// Builds the storage name for a fresh export id.
#[must_use]
pub fn artifact_token(id: Uuid, format: ExportFormat) -> String {
    format!("{TOKEN_PREFIX}{}.{}", id.simple(), format.extension())
}

/// Validates a download token and returns its format.
///
/// Anything that could address another directory is rejected as traversal;
/// everything else that is not exactly `results_<32 hex>.<csv|xlsx>` is
/// simply not found.
///
/// # Errors
/// [`ExportError::PathTraversalRejected`] or [`ExportError::ArtifactNotFound`].
pub fn parse_token(token: &str) -> Result<ExportFormat, ExportError> {
    if token.contains(['/', '\\', '\0']) || token.contains("..") || Path::new(token).is_absolute()
    {
        return Err(ExportError::PathTraversalRejected);
    }

    let (stem, extension) = token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|rest| rest.split_once('.'))
        .ok_or(ExportError::ArtifactNotFound)?;
    let format = ExportFormat::from_extension(extension).ok_or(ExportError::ArtifactNotFound)?;
    if stem.len() != 32 || Uuid::try_parse(stem).is_err() {
        return Err(ExportError::ArtifactNotFound);
    }
    Ok(format)
}

/// Tokens of one export, both formats share the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTokens {
    pub csv: String,
    pub xlsx: String,
    pub created_at: DateTime<Utc>,
    /// Earliest time the sweeper may remove the artifacts.
    pub expires_at: DateTime<Utc>,
}

/// Serializes labeled tables into the shared artifact store.
#[derive(Debug, Clone)]
pub struct ResultExporter {
    store: ArtifactStore,
    max_age: Duration,
}

impl ResultExporter {
    #[must_use]
    pub fn new(store: ArtifactStore, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Writes the CSV and XLSX forms of `labeled` under a fresh id.
    ///
    /// # Errors
    /// Serialization or storage failures. A half-finished export removes the
    /// artifact it already wrote.
    pub fn export(&self, labeled: &LabeledTable) -> Result<ExportTokens, ExportError> {
        let table = labeled.table();
        let id = Uuid::new_v4();
        let csv = artifact_token(id, ExportFormat::Csv);
        let xlsx = artifact_token(id, ExportFormat::Xlsx);

        let csv_bytes = write_csv(table).map_err(|source| ExportError::Serialize {
            format: ExportFormat::Csv,
            source,
        })?;
        let xlsx_bytes = write_xlsx(table).map_err(|source| ExportError::Serialize {
            format: ExportFormat::Xlsx,
            source,
        })?;

        self.store.save(&csv, &csv_bytes)?;
        if let Err(err) = self.store.save(&xlsx, &xlsx_bytes) {
            if let Err(cleanup) = self.store.remove(&csv) {
                warn!(token = %csv, error = %cleanup, "failed to remove orphaned export");
            }
            return Err(err);
        }

        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(self.max_age)
            .ok()
            .and_then(|age| created_at.checked_add_signed(age))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        info!(
            csv = %csv,
            xlsx = %xlsx,
            rows = table.len(),
            "export artifacts written"
        );
        Ok(ExportTokens {
            csv,
            xlsx,
            created_at,
            expires_at,
        })
    }

    /// # Errors
    /// See [`ArtifactStore::fetch`].
    pub fn fetch(&self, token: &str) -> Result<Artifact, ExportError> {
        self.store.fetch(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn token_round_trips_through_parser() {
        let id = Uuid::new_v4();
        for format in ExportFormat::ALL {
            let token = artifact_token(id, format);
            assert!(token.starts_with("results_"));
            assert_eq!(parse_token(&token).expect("valid token"), format);
        }
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("..")]
    #[case("results_../../x.csv")]
    #[case("/etc/passwd")]
    #[case("sub/results_0123456789abcdef0123456789abcdef.csv")]
    #[case("..\\secret.xlsx")]
    #[case("results_0123456789abcdef0123456789abcdef.csv\0")]
    fn traversal_attempts_are_rejected(#[case] token: &str) {
        assert!(matches!(
            parse_token(token),
            Err(ExportError::PathTraversalRejected)
        ));
    }

    #[rstest]
    #[case("results_123.csv")]
    #[case("results_0123456789abcdef0123456789abcdef.txt")]
    #[case("results_zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz.csv")]
    #[case("report.csv")]
    #[case("")]
    fn malformed_tokens_are_not_found(#[case] token: &str) {
        assert!(matches!(
            parse_token(token),
            Err(ExportError::ArtifactNotFound)
        ));
    }

    #[test]
    fn download_names_keep_extension() {
        assert_eq!(ExportFormat::Csv.download_name(), "sentiment_results.csv");
        assert_eq!(ExportFormat::Xlsx.download_name(), "sentiment_results.xlsx");
    }
}
