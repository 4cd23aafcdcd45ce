//! ファイル分析パイプライン。
//!
//! 読み込み → 行ラベル付け → 集計 / ワードクラウド → エクスポートの順で実行する。

pub mod aggregate;
pub mod labeler;
pub mod orchestrator;

pub use aggregate::{SentimentCounts, count_labels};
pub use labeler::{BatchLabeler, LabeledTable, PREDICTION_COLUMN};
pub use orchestrator::{AnalysisReport, SentimentPipeline};
