use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use super::aggregate::{SentimentCounts, count_labels};
use super::labeler::{BatchLabeler, LabeledTable};
use crate::classifier::{Label, Prediction, SentimentClassifier};
use crate::error::AnalysisError;
use crate::export::{ExportTokens, ResultExporter};
use crate::observability::Metrics;
use crate::table::load_table;
use crate::wordcloud::{WordCloudConfig, WordCloudError, WordCloudImage, try_render_word_cloud};

/// Everything one file analysis produces.
///
/// `word_cloud` and `exports` are `None` when those stages degraded; the
/// labeled table and the counts are always present.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub labeled: LabeledTable,
    pub counts: SentimentCounts,
    pub word_cloud: Option<WordCloudImage>,
    pub exports: Option<ExportTokens>,
}

/// ステージを束ねて 1 ファイル分の分析を実行する。
pub struct SentimentPipeline {
    labeler: BatchLabeler,
    word_cloud: WordCloudConfig,
    exporter: ResultExporter,
    metrics: Arc<Metrics>,
}

impl SentimentPipeline {
    #[must_use]
    pub fn new(
        labeler: BatchLabeler,
        word_cloud: WordCloudConfig,
        exporter: ResultExporter,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            labeler,
            word_cloud,
            exporter,
            metrics,
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &Arc<SentimentClassifier> {
        self.labeler.classifier()
    }

    #[must_use]
    pub fn exporter(&self) -> &ResultExporter {
        &self.exporter
    }

    /// 単一テキストを分類する。失敗は行と同じ番兵で返る。
    pub fn classify_text(&self, text: &str) -> Prediction {
        let prediction = self.classifier().classify(text);
        self.metrics.texts_classified.inc();
        self.sync_model_gauge();
        prediction
    }

    /// Loads `path`, labels `text_column`, aggregates, renders the word cloud
    /// and writes the export artifacts.
    ///
    /// Blocking: call from a blocking thread.
    ///
    /// # Errors
    /// Only loading and column validation fail the request. Word cloud and
    /// export failures are logged and leave the corresponding field empty.
    #[instrument(skip_all, fields(path = %path.display(), column = text_column))]
    pub fn analyze_file(
        &self,
        path: &Path,
        text_column: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();

        let labeled = load_table(path, text_column)
            .and_then(|table| self.labeler.label(&table, text_column))
            .inspect_err(|_| self.metrics.files_rejected.inc())?;

        #[allow(clippy::cast_precision_loss)]
        let (rows, failed) = (labeled.len() as f64, labeled.failed_rows() as f64);
        self.metrics.rows_classified.inc_by(rows);
        self.metrics.classification_failures.inc_by(failed);

        // 集計とワードクラウド描画は互いに独立
        let (counts, word_cloud) = rayon::join(
            || count_labels(&labeled),
            || self.render_word_cloud(&labeled),
        );

        let exports = match self.exporter.export(&labeled) {
            Ok(tokens) => {
                self.metrics.exports_written.inc_by(2.0);
                Some(tokens)
            }
            Err(err) => {
                warn!(error = ?err, code = err.code(), "export failed, report has no download links");
                None
            }
        };

        let elapsed = started.elapsed();
        self.metrics.files_analyzed.inc();
        self.metrics
            .analysis_duration
            .observe(elapsed.as_secs_f64());
        self.sync_model_gauge();

        info!(
            rows = labeled.len(),
            positive = counts.get(Label::Positive),
            neutral = counts.get(Label::Neutral),
            negative = counts.get(Label::Negative),
            failed = counts.failed(),
            word_cloud = word_cloud.is_some(),
            exported = exports.is_some(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "file analysis completed"
        );

        Ok(AnalysisReport {
            labeled,
            counts,
            word_cloud,
            exports,
        })
    }

    fn render_word_cloud(&self, labeled: &LabeledTable) -> Option<WordCloudImage> {
        match try_render_word_cloud(labeled.table(), labeled.text_column(), &self.word_cloud) {
            Ok(image) => Some(image),
            Err(WordCloudError::EmptyCorpus) => {
                debug!("word cloud skipped: no words after cleaning");
                None
            }
            Err(err) => {
                warn!(error = ?err, "word cloud rendering failed");
                self.metrics.wordcloud_failures.inc();
                None
            }
        }
    }

    fn sync_model_gauge(&self) {
        self.metrics
            .set_model_ready(self.classifier().status().is_ready());
    }
}
