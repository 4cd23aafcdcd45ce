/// コーパス整形・頻度集計・ラベル集計のベンチマーク。
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sentiment_worker::classifier::{ClassifierError, Label, SentimentClassifier, SentimentModel};
use sentiment_worker::pipeline::{BatchLabeler, count_labels};
use sentiment_worker::table::{CellValue, Table};
use sentiment_worker::wordcloud::{
    WordCloudConfig, clean_corpus, try_render_word_cloud, word_frequencies,
};

const PHRASES: [&str; 6] = [
    "Pelayanan kereta cepat Whoosh sangat bagus dan nyaman https://t.co/abc",
    "Harga tiketnya mahal sekali, antrian di stasiun juga lambat",
    "Pembangunan IKN berjalan terus, semoga bermanfaat untuk rakyat",
    "Stasiun Halim ramai pengunjung saat akhir pekan",
    "I can't believe the trains are this fast!!! #whoosh",
    "Biasa saja, tidak ada yang istimewa dari proyek ini",
];

struct CyclingModel;

impl SentimentModel for CyclingModel {
    fn predict(&self, text: &str) -> Result<Label, ClassifierError> {
        Ok(Label::ALL[text.len() % 3])
    }
}

fn synthetic_table(rows: usize) -> Table {
    let body = (0..rows)
        .map(|i| {
            vec![
                CellValue::Int(i64::try_from(i).unwrap_or_default()),
                CellValue::from(PHRASES[i % PHRASES.len()]),
            ]
        })
        .collect();
    Table::from_rows(vec!["id".into(), "review".into()], body).expect("rectangular table")
}

fn bench_corpus_cleaning(c: &mut Criterion) {
    let corpus = PHRASES.repeat(2000).join(" ");
    c.bench_function("clean_and_count_12k_docs", |b| {
        b.iter(|| {
            let frequencies = word_frequencies(&clean_corpus(black_box(&corpus)));
            black_box(frequencies.len());
        });
    });
}

fn bench_aggregation(c: &mut Criterion) {
    let classifier = Arc::new(SentimentClassifier::with_model(Arc::new(CyclingModel)));
    let labeled = BatchLabeler::sequential(classifier)
        .label(&synthetic_table(10_000), "review")
        .expect("labeled");

    c.bench_function("count_labels_10k_rows", |b| {
        b.iter(|| black_box(count_labels(&labeled)));
    });
}

fn bench_word_cloud(c: &mut Criterion) {
    let table = synthetic_table(2_000);
    let config = WordCloudConfig {
        seed: Some(7),
        ..WordCloudConfig::default()
    };
    c.bench_function("render_word_cloud_2k_rows", |b| {
        b.iter(|| {
            let image = try_render_word_cloud(&table, "review", &config).expect("cloud");
            black_box(image.words_drawn());
        });
    });
}

criterion_group!(
    benches,
    bench_corpus_cleaning,
    bench_aggregation,
    bench_word_cloud
);
criterion_main!(benches);
