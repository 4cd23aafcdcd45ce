use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::Context;
use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::debug;

use crate::classifier::{Prediction, SentimentClassifier, prediction_text};
use crate::error::AnalysisError;
use crate::table::{CellValue, Table};

/// Name of the column appended with one label (or failure sentinel) per row.
pub const PREDICTION_COLUMN: &str = "Sentiment_Prediction";

/// Source table plus the per-row classification results.
///
/// `table()` already contains [`PREDICTION_COLUMN`]; `predictions()` keeps the
/// typed results aligned with the rows by index.
#[derive(Debug, Clone)]
pub struct LabeledTable {
    table: Table,
    text_column: String,
    predictions: Vec<Prediction>,
}

impl LabeledTable {
    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub fn text_column(&self) -> &str {
        &self.text_column
    }

    #[must_use]
    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    #[must_use]
    pub fn failed_rows(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_err()).count()
    }
}

/// Applies the classifier to every value of one column.
pub struct BatchLabeler {
    classifier: Arc<SentimentClassifier>,
    pool: Option<Arc<ThreadPool>>,
}

impl BatchLabeler {
    /// Labels rows one after another on the calling thread.
    #[must_use]
    pub fn sequential(classifier: Arc<SentimentClassifier>) -> Self {
        Self {
            classifier,
            pool: None,
        }
    }

    /// Labels rows on a dedicated rayon pool of `threads` workers.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created.
    pub fn with_threads(
        classifier: Arc<SentimentClassifier>,
        threads: NonZeroUsize,
    ) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.get())
            .thread_name(|index| format!("sentiment-labeler-{index}"))
            .build()
            .context("failed to build labeler thread pool")?;
        Ok(Self {
            classifier,
            pool: Some(Arc::new(pool)),
        })
    }

    #[must_use]
    pub fn classifier(&self) -> &Arc<SentimentClassifier> {
        &self.classifier
    }

    /// Classifies every value of `text_column` and appends
    /// [`PREDICTION_COLUMN`]. Row count and order are preserved; a failing row
    /// carries its sentinel and the batch continues.
    ///
    /// # Errors
    /// Returns [`AnalysisError::ColumnNotFound`] before classifying anything
    /// when the column is absent.
    pub fn label(&self, table: &Table, text_column: &str) -> Result<LabeledTable, AnalysisError> {
        let Some(index) = table.column_index(text_column) else {
            return Err(AnalysisError::ColumnNotFound {
                column: text_column.to_string(),
                available: table.columns().to_vec(),
            });
        };

        let classify = |row: &Vec<CellValue>| self.classifier.classify_value(&row[index]);
        let predictions: Vec<Prediction> = match &self.pool {
            // par_iter の collect は添字順を保つ
            Some(pool) => pool.install(|| table.rows().par_iter().map(classify).collect()),
            None => table.rows().iter().map(classify).collect(),
        };

        let labels = predictions
            .iter()
            .map(|prediction| CellValue::Text(prediction_text(prediction)))
            .collect();
        let labeled = table
            .with_column(PREDICTION_COLUMN, labels)
            .map_err(AnalysisError::parse_failed)?;

        let failed = predictions.iter().filter(|p| p.is_err()).count();
        debug!(rows = predictions.len(), failed, column = text_column, "rows labeled");

        Ok(LabeledTable {
            table: labeled,
            text_column: text_column.to_string(),
            predictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassifierError, Label, SentimentModel};

    /// 文字数で決まる決定的なモデル。`"boom"` だけ推論失敗にする。
    struct LengthModel;

    impl SentimentModel for LengthModel {
        fn predict(&self, text: &str) -> Result<Label, ClassifierError> {
            if text == "boom" {
                return Err(ClassifierError::inference("boom"));
            }
            Ok(Label::ALL[text.len() % 3])
        }
    }

    fn table(values: &[&str]) -> Table {
        Table::from_rows(
            vec!["id".into(), "review".into()],
            values
                .iter()
                .enumerate()
                .map(|(i, v)| vec![CellValue::Int(i as i64), CellValue::from(*v)])
                .collect(),
        )
        .expect("table")
    }

    fn classifier() -> Arc<SentimentClassifier> {
        Arc::new(SentimentClassifier::with_model(Arc::new(LengthModel)))
    }

    #[test]
    fn appends_prediction_column_in_row_order() {
        let labeler = BatchLabeler::sequential(classifier());
        let labeled = labeler
            .label(&table(&["abc", "a", "ab"]), "review")
            .expect("label");

        assert_eq!(labeled.table().columns(), &["id", "review", PREDICTION_COLUMN]);
        let column: Vec<String> = labeled
            .table()
            .column_values(PREDICTION_COLUMN)
            .expect("prediction column")
            .map(ToString::to_string)
            .collect();
        assert_eq!(column, vec!["Positive", "Neutral", "Negative"]);
    }

    #[test]
    fn failing_row_does_not_stop_the_batch() {
        let labeler = BatchLabeler::sequential(classifier());
        let labeled = labeler
            .label(&table(&["a", "boom", "abc"]), "review")
            .expect("label");

        assert_eq!(labeled.len(), 3);
        assert_eq!(labeled.failed_rows(), 1);
        assert_eq!(labeled.predictions()[2], Ok(Label::Positive));
        assert_eq!(
            labeled.table().rows()[1][2],
            CellValue::Text("Error: Prediction failed.".into())
        );
    }

    #[test]
    fn parallel_labeling_matches_sequential_order() {
        let values: Vec<String> = (0..500).map(|i| "x".repeat(i % 7)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let input = table(&refs);

        let sequential = BatchLabeler::sequential(classifier())
            .label(&input, "review")
            .expect("sequential");
        let parallel = BatchLabeler::with_threads(classifier(), NonZeroUsize::new(4).expect("4"))
            .expect("pool")
            .label(&input, "review")
            .expect("parallel");

        assert_eq!(sequential.predictions(), parallel.predictions());
    }

    #[test]
    fn missing_column_classifies_nothing() {
        let loads = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let classifier = Arc::new(SentimentClassifier::new(
            move || -> anyhow::Result<Arc<dyn SentimentModel>> {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(Arc::new(LengthModel))
            },
        ));
        let error = BatchLabeler::sequential(classifier)
            .label(&table(&["a"]), "comment")
            .expect_err("missing column");

        assert!(matches!(error, AnalysisError::ColumnNotFound { .. }));
        assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn existing_prediction_column_is_overwritten() {
        let input = Table::from_rows(
            vec!["review".into(), PREDICTION_COLUMN.into()],
            vec![vec!["abc".into(), "stale".into()]],
        )
        .expect("table");
        let labeled = BatchLabeler::sequential(classifier())
            .label(&input, "review")
            .expect("label");

        assert_eq!(labeled.table().columns().len(), 2);
        assert_eq!(labeled.table().rows()[0][1], CellValue::from("Positive"));
    }
}
