//! ファイル単位の解析エラー。
//!
//! `Display` はそのまま利用者に返せる短い文言に留め、内部の詳細は
//! `#[source]` 経由で境界（HTTP ハンドラ）でのみログに出す。
use thiserror::Error;

/// Errors that abort one file analysis request.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Error: Unsupported file format. Use .csv or .xlsx")]
    UnsupportedFormat { extension: Option<String> },

    #[error("Error: File not found.")]
    FileNotFound,

    #[error("Error: Column '{column}' not found in the file.")]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error("Error: Could not process the file.")]
    ParseFailed {
        #[source]
        source: anyhow::Error,
    },
}

impl AnalysisError {
    pub(crate) fn parse_failed(source: impl Into<anyhow::Error>) -> Self {
        Self::ParseFailed {
            source: source.into(),
        }
    }

    /// Stable machine-readable code for API payloads and metrics labels.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::FileNotFound => "file_not_found",
            Self::ColumnNotFound { .. } => "column_not_found",
            Self::ParseFailed { .. } => "parse_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failed_hides_internal_detail() {
        let error = AnalysisError::parse_failed(anyhow::anyhow!("line 3: unexpected quote"));
        assert_eq!(error.to_string(), "Error: Could not process the file.");
        let source = std::error::Error::source(&error).expect("source kept for logging");
        assert!(source.to_string().contains("unexpected quote"));
    }

    #[test]
    fn column_not_found_names_the_column() {
        let error = AnalysisError::ColumnNotFound {
            column: "comment".into(),
            available: vec!["review".into()],
        };
        assert_eq!(
            error.to_string(),
            "Error: Column 'comment' not found in the file."
        );
        assert_eq!(error.code(), "column_not_found");
    }
}
