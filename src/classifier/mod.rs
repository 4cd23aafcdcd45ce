//! 感情分類器のアダプタ層。
//!
//! 実モデル（rust-bert）と呼び出し側の間に立ち、遅延ロード・失敗の保持・
//! 行単位のエラー表現を担う。
mod adapter;
mod bert;
mod label;

pub use adapter::{ModelLoader, ModelStatus, SentimentClassifier, SentimentModel};
pub use bert::{BertModelSettings, RustBertSentimentModel};
pub use label::{ClassifierError, Label, Prediction, prediction_text};
