//! 単語の配置。
//!
//! 占有領域は累積和テーブル（summed-area table）で管理し、矩形が空いているかを
//! O(1) で判定する。空き位置の候補からランダムに 1 つ選び、入らなければ
//! フォントを小さくして再試行する。最小フォントを下回った時点で打ち切る。
use rand::Rng;

/// Pixels kept free around every word.
const MARGIN: u32 = 2;
const RELATIVE_SCALING: f64 = 0.5;
const PREFER_HORIZONTAL: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    /// Rotated 90 degrees counter-clockwise.
    Vertical,
}

impl Orientation {
    fn flip(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

/// One word with its position on the canvas. `x`/`y` is the top-left corner
/// of the glyph box (margin excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub word: String,
    pub font_size: u32,
    pub x: u32,
    pub y: u32,
    pub orientation: Orientation,
    /// Position in `[0, 1]` along the colour map.
    pub color_position: f64,
}

impl PlacedWord {
    /// Glyph box width and height for the orientation.
    #[must_use]
    pub fn extent(&self) -> (u32, u32) {
        glyph_box(&self.word, self.font_size, self.orientation)
    }
}

fn glyph_box(word: &str, font_size: u32, orientation: Orientation) -> (u32, u32) {
    let length = u32::try_from(word.chars().count()).unwrap_or(u32::MAX);
    let along = length.saturating_mul(font_size);
    match orientation {
        Orientation::Horizontal => (along, font_size),
        Orientation::Vertical => (font_size, along),
    }
}

/// Summed-area table over an occupancy grid.
struct Occupancy {
    width: usize,
    height: usize,
    occupied: Vec<bool>,
    integral: Vec<u32>,
}

impl Occupancy {
    fn new(width: u32, height: u32) -> Self {
        let width = width as usize;
        let height = height as usize;
        Self {
            width,
            height,
            occupied: vec![false; width * height],
            integral: vec![0; (width + 1) * (height + 1)],
        }
    }

    fn sum(&self, x: usize, y: usize, w: usize, h: usize) -> u32 {
        let stride = self.width + 1;
        let a = self.integral[y * stride + x];
        let b = self.integral[y * stride + x + w];
        let c = self.integral[(y + h) * stride + x];
        let d = self.integral[(y + h) * stride + x + w];
        d + a - b - c
    }

    /// Picks a uniformly random free `w` x `h` position among those found on
    /// a strided scan, or `None` if nothing fits.
    fn sample_position<R: Rng>(&self, w: usize, h: usize, rng: &mut R) -> Option<(usize, usize)> {
        if w == 0 || h == 0 || w > self.width || h > self.height {
            return None;
        }
        let step = (w.min(h) / 4).max(1);

        let mut free = 0usize;
        self.scan_free(w, h, step, |_, _| {
            free += 1;
            true
        });
        if free == 0 {
            return None;
        }

        let mut target = rng.random_range(0..free);
        let mut chosen = None;
        self.scan_free(w, h, step, |x, y| {
            if target == 0 {
                chosen = Some((x, y));
                false
            } else {
                target -= 1;
                true
            }
        });
        chosen
    }

    /// Visits free positions in row-major order until `visit` returns false.
    fn scan_free(&self, w: usize, h: usize, step: usize, mut visit: impl FnMut(usize, usize) -> bool) {
        for y in (0..=self.height - h).step_by(step) {
            for x in (0..=self.width - w).step_by(step) {
                if self.sum(x, y, w, h) == 0 && !visit(x, y) {
                    return;
                }
            }
        }
    }

    fn mark(&mut self, x: usize, y: usize, w: usize, h: usize) {
        let x_end = (x + w).min(self.width);
        let y_end = (y + h).min(self.height);
        for row in y..y_end {
            let start = row * self.width;
            self.occupied[start + x..start + x_end].fill(true);
        }
        self.rebuild_from(y);
    }

    /// Recomputes integral rows from `y` downwards; rows above are unchanged.
    fn rebuild_from(&mut self, y: usize) {
        let stride = self.width + 1;
        for row in y..self.height {
            let mut row_sum = 0u32;
            for col in 0..self.width {
                row_sum += u32::from(self.occupied[row * self.width + col]);
                self.integral[(row + 1) * stride + col + 1] =
                    self.integral[row * stride + col + 1] + row_sum;
            }
        }
    }
}

/// Places `frequencies` (most frequent first) on a `width` x `height` canvas.
///
/// Font sizes follow the relative frequency with a scaling of 0.5; most words
/// are horizontal. Placement stops at the first word that no longer fits at
/// `min_font_size`.
pub fn layout_words<R: Rng>(
    frequencies: &[(String, usize)],
    width: u32,
    height: u32,
    min_font_size: u32,
    rng: &mut R,
) -> Vec<PlacedWord> {
    let mut occupancy = Occupancy::new(width, height);
    let mut placed = Vec::with_capacity(frequencies.len());
    let Some((first_word, _)) = frequencies.first() else {
        return placed;
    };

    let mut font_size = initial_font_size(first_word, width, height);
    let mut last_frequency: Option<usize> = None;

    for (word, frequency) in frequencies {
        if *frequency == 0 {
            continue;
        }
        if let Some(last) = last_frequency {
            #[allow(clippy::cast_precision_loss)]
            let ratio = *frequency as f64 / last as f64;
            let scaled = (RELATIVE_SCALING * ratio + (1.0 - RELATIVE_SCALING)) * f64::from(font_size);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                font_size = scaled.round().max(0.0) as u32;
            }
        }

        let mut orientation = if rng.random::<f64>() < PREFER_HORIZONTAL {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let mut tried_other_orientation = false;
        let mut position = None;

        while font_size >= min_font_size.max(1) {
            let (w, h) = glyph_box(word, font_size, orientation);
            let margin = MARGIN as usize;
            position = occupancy.sample_position(w as usize + margin, h as usize + margin, rng);
            if position.is_some() {
                break;
            }
            if tried_other_orientation {
                font_size -= (font_size / 10).max(1);
                orientation = Orientation::Horizontal;
            } else {
                orientation = orientation.flip();
                tried_other_orientation = true;
            }
        }

        let Some((x, y)) = position else {
            break;
        };

        let (w, h) = glyph_box(word, font_size, orientation);
        occupancy.mark(x, y, w as usize + MARGIN as usize, h as usize + MARGIN as usize);
        let half = MARGIN / 2;
        placed.push(PlacedWord {
            word: word.clone(),
            font_size,
            x: u32::try_from(x).unwrap_or(u32::MAX).saturating_add(half),
            y: u32::try_from(y).unwrap_or(u32::MAX).saturating_add(half),
            orientation,
            color_position: rng.random::<f64>(),
        });
        last_frequency = Some(*frequency);
    }

    placed
}

/// Largest size at which the most frequent word still spans most of the
/// canvas width, capped at 60% of the height.
fn initial_font_size(word: &str, width: u32, height: u32) -> u32 {
    let length = u32::try_from(word.chars().count().max(1)).unwrap_or(u32::MAX);
    let by_width = width.saturating_mul(19) / 20 / length;
    let by_height = height.saturating_mul(3) / 5;
    by_width.min(by_height).max(1)
}
