use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, extract::DefaultBodyLimit};
use tower_http::trace::TraceLayer;

use crate::{
    api,
    classifier::{BertModelSettings, ModelLoader, SentimentClassifier},
    config::Config,
    export::{ArtifactStore, ExportSweeper, ResultExporter},
    observability::Telemetry,
    pipeline::{BatchLabeler, SentimentPipeline},
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    pipeline: Arc<SentimentPipeline>,
    sweeper: ExportSweeper,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }

    pub(crate) fn pipeline(&self) -> Arc<SentimentPipeline> {
        Arc::clone(&self.registry.pipeline)
    }

    pub(crate) fn sweeper(&self) -> &ExportSweeper {
        &self.registry.sweeper
    }
}

impl ComponentRegistry {
    /// 構成情報と依存をまとめて初期化し、アプリケーションの共有レジストリを構築する。
    ///
    /// モデル本体はここでは読み込まない。最初の分類要求 (または warm-up) で遅延ロードされる。
    ///
    /// # Errors
    /// Telemetry の初期化、ディレクトリ作成、スレッドプール構築が失敗した場合はエラーを返す。
    pub fn build(config: Config) -> Result<Self> {
        let telemetry = Telemetry::new()?;
        let loader = BertModelSettings::new(config.model_dir(), config.model_lower_case());
        Self::with_loader(config, telemetry, loader)
    }

    /// 任意のモデルローダーでレジストリを構築する。テストや組み込み用途向け。
    ///
    /// # Errors
    /// アップロード/エクスポート用ディレクトリの作成やスレッドプール構築が失敗した場合。
    pub fn with_loader(
        config: Config,
        telemetry: Telemetry,
        loader: impl ModelLoader + 'static,
    ) -> Result<Self> {
        let config = Arc::new(config);
        ensure_dir(config.upload_dir())?;
        let store = ArtifactStore::open(config.export_dir()).with_context(|| {
            format!(
                "failed to open export directory {}",
                config.export_dir().display()
            )
        })?;

        let metrics = telemetry.metrics_arc();
        let classifier = Arc::new(SentimentClassifier::new(loader));
        let labeler = BatchLabeler::with_threads(classifier, config.labeler_threads())?;
        let sweeper = ExportSweeper::new(
            store.root(),
            config.export_max_age(),
            config.export_sweep_interval(),
        )
        .with_metrics(Arc::clone(&metrics));
        let exporter = ResultExporter::new(store, config.export_max_age());
        let pipeline = Arc::new(SentimentPipeline::new(
            labeler,
            config.word_cloud(),
            exporter,
            metrics,
        ));

        Ok(Self {
            config,
            telemetry,
            pipeline,
            sweeper,
        })
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    #[must_use]
    pub fn pipeline(&self) -> Arc<SentimentPipeline> {
        Arc::clone(&self.pipeline)
    }

    #[must_use]
    pub fn sweeper(&self) -> &ExportSweeper {
        &self.sweeper
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory {}", path.display()))
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let body_limit = registry.config.max_upload_bytes();
    let state = AppState::new(registry);
    api::router(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
