pub(crate) mod metrics;
pub mod tracing;

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

pub use self::metrics::Metrics;

/// Telemetry（メトリクスとトレーシング）を管理する構造体。
#[derive(Debug, Clone)]
pub struct Telemetry {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// 新しいTelemetryインスタンスを作成し、トレーシングとメトリクスを初期化する。
    ///
    /// # Errors
    /// トレーシングまたはメトリクスの初期化に失敗した場合はエラーを返す。
    pub fn new() -> Result<Self> {
        tracing::init()?;
        Self::without_tracing()
    }

    /// メトリクスのみを初期化する（テストや組み込み用途）。
    ///
    /// # Errors
    /// メトリクスの登録に失敗した場合はエラーを返す。
    pub fn without_tracing() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(Arc::clone(&registry))?);
        Ok(Self { registry, metrics })
    }

    /// メトリクスへのアクセスを提供する。
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn metrics_arc(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// 準備完了プローブを記録する。
    pub fn record_ready_probe(&self, ready: bool) {
        ::tracing::debug!(ready, "service ready probe");
    }

    /// ライブプローブを記録する。
    pub fn record_live_probe(&self) {
        ::tracing::debug!("service live probe");
    }

    /// 管理 API からの手動スイープを記録する。
    pub fn record_admin_sweep_invocation(&self) {
        ::tracing::warn!("admin export sweep invoked");
    }

    /// 管理 API からの分類器リセットを記録する。
    pub fn record_admin_reset_invocation(&self, reset: bool) {
        ::tracing::warn!(reset, "admin classifier reset invoked");
    }

    /// Prometheusメトリクスをレンダリングする。
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_owned_registry() {
        let telemetry = Telemetry::without_tracing().expect("telemetry");
        telemetry.metrics().files_analyzed.inc();

        let text = telemetry.render_prometheus();
        assert!(text.contains("sentiment_files_analyzed_total 1"));
    }

    #[test]
    fn instances_do_not_share_metrics() {
        let first = Telemetry::without_tracing().expect("first");
        let second = Telemetry::without_tracing().expect("second");
        first.metrics().files_rejected.inc();

        assert!(
            second
                .render_prometheus()
                .contains("sentiment_files_rejected_total 0")
        );
    }
}
