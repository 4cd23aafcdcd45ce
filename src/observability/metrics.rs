/// Prometheusメトリクス定義。
use prometheus::{
    Counter, Gauge, Histogram, HistogramOpts, Registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub rows_classified: Counter,
    pub classification_failures: Counter,
    pub texts_classified: Counter,
    pub files_analyzed: Counter,
    pub files_rejected: Counter,
    pub exports_written: Counter,
    pub exports_swept: Counter,
    pub wordcloud_failures: Counter,

    // ヒストグラム
    pub analysis_duration: Histogram,

    // ゲージ
    pub model_ready: Gauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    ///
    /// # Errors
    /// 同名のメトリクスが既に登録されている場合はエラーを返す。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            rows_classified: register_counter_with_registry!(
                "sentiment_rows_classified_total",
                "Total number of table rows passed through the classifier",
                registry
            )?,
            classification_failures: register_counter_with_registry!(
                "sentiment_classification_failures_total",
                "Rows that ended with a failure sentinel instead of a label",
                registry
            )?,
            texts_classified: register_counter_with_registry!(
                "sentiment_texts_classified_total",
                "Single-text classification requests",
                registry
            )?,
            files_analyzed: register_counter_with_registry!(
                "sentiment_files_analyzed_total",
                "Uploaded files analysed successfully",
                registry
            )?,
            files_rejected: register_counter_with_registry!(
                "sentiment_files_rejected_total",
                "Uploaded files rejected by format, column or parse checks",
                registry
            )?,
            exports_written: register_counter_with_registry!(
                "sentiment_exports_written_total",
                "Export artifacts written",
                registry
            )?,
            exports_swept: register_counter_with_registry!(
                "sentiment_exports_swept_total",
                "Expired export artifacts removed by the sweeper",
                registry
            )?,
            wordcloud_failures: register_counter_with_registry!(
                "sentiment_wordcloud_failures_total",
                "Word cloud renders that failed for a reason other than an empty corpus",
                registry
            )?,
            analysis_duration: register_histogram_with_registry!(
                HistogramOpts::new(
                    "sentiment_analysis_duration_seconds",
                    "Duration of one file analysis (load, label, aggregate, render, export)"
                )
                .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
                registry
            )?,
            model_ready: register_gauge_with_registry!(
                "sentiment_model_ready",
                "1 when the sentiment model is loaded, 0 otherwise",
                registry
            )?,
        })
    }

    /// Mirrors the classifier state into the readiness gauge.
    pub fn set_model_ready(&self, ready: bool) {
        self.model_ready.set(if ready { 1.0 } else { 0.0 });
    }
}
