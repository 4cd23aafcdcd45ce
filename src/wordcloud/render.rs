use std::io::Cursor;

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageFormat, ImageResult, Rgb, RgbImage};

use super::layout::{Orientation, PlacedWord};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GLYPH_CELLS: u32 = 8;

/// matplotlib の viridis を 10 点で近似したもの。
const VIRIDIS: [[u8; 3]; 10] = [
    [68, 1, 84],
    [72, 40, 120],
    [62, 73, 137],
    [49, 104, 142],
    [38, 130, 142],
    [31, 158, 137],
    [53, 183, 121],
    [110, 206, 88],
    [181, 222, 43],
    [253, 231, 37],
];

/// Colour at `position` in `[0, 1]`, linearly interpolated between stops.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn viridis(position: f64) -> Rgb<u8> {
    let scaled = position.clamp(0.0, 1.0) * (VIRIDIS.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lower = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let fraction = scaled - lower as f64;
    let (from, to) = (VIRIDIS[lower], VIRIDIS[lower + 1]);
    let mut channels = [0u8; 3];
    for (channel, (a, b)) in channels.iter_mut().zip(from.iter().zip(to.iter())) {
        let value = f64::from(*a) + (f64::from(*b) - f64::from(*a)) * fraction;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    Rgb(channels)
}

/// Draws placed words onto a white canvas.
#[must_use]
pub fn draw_words(words: &[PlacedWord], width: u32, height: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
    for word in words {
        draw_word(&mut canvas, word);
    }
    canvas
}

fn draw_word(canvas: &mut RgbImage, word: &PlacedWord) {
    let size = word.font_size.max(1);
    let color = viridis(word.color_position);
    let run = u32::try_from(word.word.chars().count()).unwrap_or(u32::MAX).saturating_mul(size);

    for (index, ch) in (0u32..).zip(word.word.chars()) {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        for py in 0..size {
            let bits = glyph[(py * GLYPH_CELLS / size) as usize];
            for px in 0..size {
                // bit 0 が左端
                if (bits >> (px * GLYPH_CELLS / size)) & 1 == 0 {
                    continue;
                }
                // 横書き時の座標 (u, v)
                let u = index * size + px;
                let v = py;
                let (x, y) = match word.orientation {
                    Orientation::Horizontal => (word.x + u, word.y + v),
                    Orientation::Vertical => (word.x + v, word.y + (run - 1 - u)),
                };
                if x < canvas.width() && y < canvas.height() {
                    canvas.put_pixel(x, y, color);
                }
            }
        }
    }
}

/// PNG-encodes the canvas.
///
/// # Errors
/// Propagates encoder failures from `image`.
pub fn encode_png(canvas: &RgbImage) -> ImageResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    canvas.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
