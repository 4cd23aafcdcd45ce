//! ラベル集計。
//!
//! 失敗行（センチネル）は 3 つのラベルのどれにも数えず、`failed` に分けて
//! 数える。したがって `positive + neutral + negative == labeled()`、
//! `labeled() + failed == total()` が常に成り立つ。
use std::collections::BTreeMap;

use serde::Serialize;

use super::labeler::LabeledTable;
use crate::classifier::{Label, Prediction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    positive: usize,
    neutral: usize,
    negative: usize,
    failed: usize,
}

impl SentimentCounts {
    pub fn record(&mut self, prediction: &Prediction) {
        match prediction {
            Ok(Label::Positive) => self.positive += 1,
            Ok(Label::Neutral) => self.neutral += 1,
            Ok(Label::Negative) => self.negative += 1,
            Err(_) => self.failed += 1,
        }
    }

    #[must_use]
    pub fn get(&self, label: Label) -> usize {
        match label {
            Label::Positive => self.positive,
            Label::Neutral => self.neutral,
            Label::Negative => self.negative,
        }
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Rows that received a real label.
    #[must_use]
    pub fn labeled(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.labeled() + self.failed
    }

    /// Exactly the three known labels, zero-filled.
    #[must_use]
    pub fn as_map(&self) -> BTreeMap<Label, usize> {
        Label::ALL
            .into_iter()
            .map(|label| (label, self.get(label)))
            .collect()
    }
}

impl<'a> FromIterator<&'a Prediction> for SentimentCounts {
    fn from_iter<I: IntoIterator<Item = &'a Prediction>>(iter: I) -> Self {
        let mut counts = Self::default();
        for prediction in iter {
            counts.record(prediction);
        }
        counts
    }
}

/// Tallies the prediction column of a labeled table.
#[must_use]
pub fn count_labels(labeled: &LabeledTable) -> SentimentCounts {
    labeled.predictions().iter().collect()
}
