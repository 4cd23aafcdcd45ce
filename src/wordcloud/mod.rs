//! ワードクラウド生成。
//!
//! 列の値を行順に空白で連結してコーパスを作り、前処理 → 頻度計算 →
//! 配置 → 描画 → PNG エンコードの順に処理する。どの段階で失敗しても
//! リクエスト全体は失敗させず、呼び出し側は画像なしで続行する。
mod clean;
mod layout;
mod render;
mod stopwords;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::debug;

use crate::table::Table;

pub use clean::{clean_corpus, word_frequencies};
pub use layout::{Orientation, PlacedWord, layout_words};
pub use render::{draw_words, encode_png, viridis};
pub use stopwords::is_stopword;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCloudConfig {
    pub width: u32,
    pub height: u32,
    pub max_words: usize,
    pub min_font_size: u32,
    /// Fixed RNG seed; `None` draws a fresh layout on every call.
    pub seed: Option<u64>,
}

impl Default for WordCloudConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            max_words: 200,
            min_font_size: 10,
            seed: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum WordCloudError {
    #[error("no words left after cleaning")]
    EmptyCorpus,
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },
    #[error("canvas too small to place any word")]
    NothingPlaced,
    #[error("failed to encode word cloud image")]
    Encode(#[from] image::ImageError),
}

/// Encoded word cloud raster.
#[derive(Debug, Clone)]
pub struct WordCloudImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
    words_drawn: usize,
}

impl WordCloudImage {
    #[must_use]
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn words_drawn(&self) -> usize {
        self.words_drawn
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    /// `data:image/png;base64,...` for inline embedding.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }
}

/// Renders a word cloud from one text column.
///
/// # Errors
/// See [`WordCloudError`]; callers usually degrade to "no image".
pub fn try_render_word_cloud(
    table: &Table,
    column: &str,
    config: &WordCloudConfig,
) -> Result<WordCloudImage, WordCloudError> {
    let values = table
        .column_values(column)
        .ok_or_else(|| WordCloudError::ColumnNotFound {
            column: column.to_string(),
        })?;
    let corpus = values
        .map(|value| value.as_text().into_owned())
        .collect::<Vec<_>>()
        .join(" ");

    let mut frequencies = word_frequencies(&clean_corpus(&corpus));
    if frequencies.is_empty() {
        return Err(WordCloudError::EmptyCorpus);
    }
    frequencies.truncate(config.max_words);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let placed = layout_words(
        &frequencies,
        config.width,
        config.height,
        config.min_font_size,
        &mut rng,
    );
    if placed.is_empty() {
        return Err(WordCloudError::NothingPlaced);
    }

    let canvas = draw_words(&placed, config.width, config.height);
    let png = encode_png(&canvas)?;
    debug!(
        distinct_words = frequencies.len(),
        words_drawn = placed.len(),
        bytes = png.len(),
        "word cloud rendered"
    );
    Ok(WordCloudImage {
        png,
        width: config.width,
        height: config.height,
        words_drawn: placed.len(),
    })
}
