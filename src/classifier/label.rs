use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentiment class emitted by the classifier.
///
/// 宣言順はモデル出力のインデックス順 `[Positive, Neutral, Negative]` と一致させる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Positive,
    Neutral,
    Negative,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Positive, Label::Neutral, Label::Negative];

    /// Maps an arg-max index of the classification head to a label.
    #[must_use]
    pub fn from_model_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-row classification failure. `Display` is the sentinel text written
/// into the prediction column for that row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("Error: Model not loaded.")]
    ModelUnavailable,
    #[error("Error: Prediction failed.")]
    InferenceFailed { detail: String },
}

impl ClassifierError {
    pub(crate) fn inference(detail: impl fmt::Display) -> Self {
        Self::InferenceFailed {
            detail: detail.to_string(),
        }
    }
}

pub type Prediction = Result<Label, ClassifierError>;

/// Text shown for a prediction: the label name or the failure sentinel.
#[must_use]
pub fn prediction_text(prediction: &Prediction) -> String {
    match prediction {
        Ok(label) => label.as_str().to_string(),
        Err(err) => err.to_string(),
    }
}
