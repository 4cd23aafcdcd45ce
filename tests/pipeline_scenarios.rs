//! ファイル読み込みからエクスポートまでを決定的なモデルで通すシナリオテスト。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use prometheus::Registry;
use rstest::rstest;
use sentiment_worker::{
    classifier::{ClassifierError, Label, SentimentClassifier, SentimentModel},
    error::AnalysisError,
    export::{ArtifactStore, ExportError, ExportFormat, ResultExporter},
    observability::Metrics,
    pipeline::{BatchLabeler, PREDICTION_COLUMN, SentimentPipeline},
    table::{CellValue, load_table},
    wordcloud::WordCloudConfig,
};
use tempfile::TempDir;

/// "bagus" / "mantap" → Positive, "buruk" / "lambat" → Negative, otherwise Neutral.
struct KeywordModel;

impl SentimentModel for KeywordModel {
    fn predict(&self, text: &str) -> Result<Label, ClassifierError> {
        let lowered = text.to_lowercase();
        if ["bagus", "mantap"].iter().any(|w| lowered.contains(w)) {
            Ok(Label::Positive)
        } else if ["buruk", "lambat"].iter().any(|w| lowered.contains(w)) {
            Ok(Label::Negative)
        } else {
            Ok(Label::Neutral)
        }
    }
}

fn keyword_loader() -> impl Fn() -> anyhow::Result<Arc<dyn SentimentModel>> + Send + Sync {
    || -> anyhow::Result<Arc<dyn SentimentModel>> { Ok(Arc::new(KeywordModel)) }
}

fn build_pipeline(classifier: Arc<SentimentClassifier>, export_dir: &Path) -> SentimentPipeline {
    let metrics = Arc::new(Metrics::new(Arc::new(Registry::new())).expect("metrics"));
    let exporter = ResultExporter::new(
        ArtifactStore::open(export_dir).expect("artifact store"),
        Duration::from_secs(3600),
    );
    SentimentPipeline::new(
        BatchLabeler::sequential(classifier),
        WordCloudConfig {
            seed: Some(42),
            ..WordCloudConfig::default()
        },
        exporter,
        metrics,
    )
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn three_row_csv_gets_three_labels() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_file(
        &dir,
        "ulasan.csv",
        "id,review\n1,Pelayanan kereta cepat sangat bagus\n2,Antrian tiket lambat sekali\n3,Stasiun Halim ramai pengunjung\n",
    );
    let classifier = Arc::new(SentimentClassifier::new(keyword_loader()));
    let pipeline = build_pipeline(Arc::clone(&classifier), &dir.path().join("exports"));

    let report = pipeline.analyze_file(&input, "review").expect("analysis");

    let table = report.labeled.table();
    assert_eq!(table.len(), 3);
    let labels: Vec<String> = table
        .column_values(PREDICTION_COLUMN)
        .expect("prediction column")
        .map(|value| value.as_text().into_owned())
        .collect();
    assert_eq!(labels, vec!["Positive", "Negative", "Neutral"]);
    assert_eq!(report.counts.total(), 3);
    assert_eq!(
        report.counts.as_map().values().sum::<usize>(),
        report.counts.labeled()
    );
    assert_eq!(classifier.load_attempts(), 1);
}

#[test]
fn missing_column_fails_before_any_classification() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_file(&dir, "ulasan.csv", "id,review\n1,bagus\n2,buruk\n");
    let classifier = Arc::new(SentimentClassifier::new(keyword_loader()));
    let pipeline = build_pipeline(Arc::clone(&classifier), &dir.path().join("exports"));

    let err = pipeline
        .analyze_file(&input, "comment")
        .expect_err("column is absent");

    match err {
        AnalysisError::ColumnNotFound { column, available } => {
            assert_eq!(column, "comment");
            assert_eq!(available, vec!["id".to_string(), "review".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(classifier.load_attempts(), 0);
}

#[test]
fn unavailable_model_marks_every_row_with_sentinel() {
    let dir = TempDir::new().expect("tempdir");
    let body: String = (1..=5).map(|i| format!("{i},teks nomor {i}\n")).collect();
    let input = write_file(&dir, "ulasan.csv", &format!("id,review\n{body}"));
    let classifier = Arc::new(SentimentClassifier::new(
        || -> anyhow::Result<Arc<dyn SentimentModel>> { anyhow::bail!("weights missing") },
    ));
    let pipeline = build_pipeline(Arc::clone(&classifier), &dir.path().join("exports"));

    let report = pipeline.analyze_file(&input, "review").expect("analysis");

    let sentinels: Vec<String> = report
        .labeled
        .table()
        .column_values(PREDICTION_COLUMN)
        .expect("prediction column")
        .map(|value| value.as_text().into_owned())
        .collect();
    assert_eq!(sentinels, vec!["Error: Model not loaded."; 5]);
    assert_eq!(report.counts.failed(), 5);
    assert_eq!(report.counts.labeled(), 0);
    assert_eq!(classifier.load_attempts(), 1);
}

#[test]
fn exported_csv_loads_back_with_prediction_column() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_file(
        &dir,
        "ulasan.csv",
        "id,review,rating\n1,mantap jiwa,5\n2,kereta lambat,2\n",
    );
    let pipeline = build_pipeline(
        Arc::new(SentimentClassifier::new(keyword_loader())),
        &dir.path().join("exports"),
    );

    let report = pipeline.analyze_file(&input, "review").expect("analysis");
    let tokens = report.exports.expect("exports written");
    let artifact = pipeline.exporter().fetch(&tokens.csv).expect("fetch csv");
    assert_eq!(artifact.format, ExportFormat::Csv);

    let reloaded_path = write_file(
        &dir,
        "reloaded.csv",
        std::str::from_utf8(&artifact.bytes).expect("utf8 csv"),
    );
    let reloaded = load_table(&reloaded_path, PREDICTION_COLUMN).expect("reload export");
    assert_eq!(
        reloaded.columns(),
        ["id", "review", "rating", PREDICTION_COLUMN]
    );
    let labels: Vec<&CellValue> = reloaded
        .column_values(PREDICTION_COLUMN)
        .expect("column")
        .collect();
    assert_eq!(
        labels,
        vec![
            &CellValue::Text("Positive".into()),
            &CellValue::Text("Negative".into())
        ]
    );

    let xlsx = pipeline.exporter().fetch(&tokens.xlsx).expect("fetch xlsx");
    assert!(xlsx.bytes.starts_with(b"PK"));
}

#[rstest]
#[case("../../etc/passwd")]
#[case("results_0123456789abcdef0123456789abcdef.csv/..")]
#[case("..\\results.csv")]
#[case("/etc/passwd")]
fn traversal_tokens_are_rejected(#[case] token: &str) {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = build_pipeline(
        Arc::new(SentimentClassifier::new(keyword_loader())),
        &dir.path().join("exports"),
    );

    let err = pipeline.exporter().fetch(token).expect_err("rejected");
    assert!(matches!(err, ExportError::PathTraversalRejected));
}

#[test]
fn unknown_token_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = build_pipeline(
        Arc::new(SentimentClassifier::new(keyword_loader())),
        &dir.path().join("exports"),
    );

    let err = pipeline
        .exporter()
        .fetch("results_0123456789abcdef0123456789abcdef.csv")
        .expect_err("never written");
    assert!(matches!(err, ExportError::ArtifactNotFound));
}

#[test]
fn classification_is_idempotent_and_accepts_empty_text() {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = build_pipeline(
        Arc::new(SentimentClassifier::new(keyword_loader())),
        &dir.path().join("exports"),
    );

    let first = pipeline.classify_text("Pelayanannya bagus");
    let second = pipeline.classify_text("Pelayanannya bagus");
    assert_eq!(first, second);
    assert_eq!(first, Ok(Label::Positive));
    assert_eq!(pipeline.classify_text(""), Ok(Label::Neutral));
}

#[test]
fn unsupported_extension_is_rejected_before_reading() {
    let dir = TempDir::new().expect("tempdir");
    let pipeline = build_pipeline(
        Arc::new(SentimentClassifier::new(keyword_loader())),
        &dir.path().join("exports"),
    );

    let err = pipeline
        .analyze_file(&dir.path().join("does-not-exist.txt"), "review")
        .expect_err("txt is not accepted");
    assert!(matches!(err, AnalysisError::UnsupportedFormat { .. }));
}

#[test]
fn xlsx_upload_is_labeled() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("ulasan.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "review").expect("header");
    sheet.write_string(1, 0, "pelayanan bagus").expect("row");
    sheet.write_number(2, 0, 42.0).expect("numeric row");
    workbook.save(&input).expect("save workbook");

    let pipeline = build_pipeline(
        Arc::new(SentimentClassifier::new(keyword_loader())),
        &dir.path().join("exports"),
    );
    let report = pipeline.analyze_file(&input, "review").expect("analysis");

    assert_eq!(report.labeled.len(), 2);
    assert_eq!(report.counts.get(Label::Positive), 1);
    assert_eq!(report.counts.get(Label::Neutral), 1);
}
