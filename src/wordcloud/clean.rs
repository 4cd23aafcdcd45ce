//! コーパスの前処理と単語頻度。
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::stopwords::is_stopword;

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"http\S+").expect("valid URL regex"));
static NON_ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z\s]+").expect("valid regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

const MIN_TOKEN_LEN: usize = 2;

/// URL 除去 → 小文字化 → `a-z` 以外を空白に置換、の順で適用する。
///
/// Apostrophes are dropped rather than turned into spaces so contractions
/// stay one token (`don't` becomes `dont`).
#[must_use]
pub fn clean_corpus(text: &str) -> String {
    let without_urls = URL.replace_all(text, " ");
    let lowered = without_urls.to_lowercase().replace(['\'', '\u{2019}'], "");
    let alpha_only = NON_ALPHA.replace_all(&lowered, " ");
    SPACES.replace_all(alpha_only.trim(), " ").into_owned()
}

/// Word frequencies of a cleaned corpus, most frequent first (ties broken
/// alphabetically). Stopwords and one-letter tokens are removed and a plural
/// `xs` is folded into `x` when both occur.
///
/// Adjacent pairs whose log-likelihood collocation score exceeds 30 are
/// counted as one `"first second"` entry and their occurrences are taken
/// out of the single-word counts.
#[must_use]
pub fn word_frequencies(cleaned: &str) -> Vec<(String, usize)> {
    let tokens: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .collect();

    // ペアはストップワード除去の前に作る。除去後だと離れた語同士が隣接してしまう
    let mut pairs: HashMap<(&str, &str), usize> = HashMap::new();
    for window in tokens.windows(2) {
        let &[first, second] = window else {
            continue;
        };
        if !is_stopword(first) && !is_stopword(second) {
            *pairs.entry((first, second)).or_default() += 1;
        }
    }

    let words: Vec<&str> = tokens
        .into_iter()
        .filter(|token| !is_stopword(token))
        .collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in &words {
        *counts.entry(*word).or_default() += 1;
    }
    let singular_of = fold_plurals(&mut counts);
    let standard = |word: &'_ str| -> String {
        singular_of.get(word).copied().unwrap_or(word).to_string()
    };

    let mut frequencies: HashMap<String, usize> = counts
        .iter()
        .map(|(word, count)| ((*word).to_string(), *count))
        .collect();
    for ((first, second), together) in pairs {
        let (first_form, second_form) = (standard(first), standard(second));
        let (Some(&first_total), Some(&second_total)) = (
            counts.get(first_form.as_str()),
            counts.get(second_form.as_str()),
        ) else {
            continue;
        };
        if collocation_score(together, first_total, second_total, words.len())
            <= COLLOCATION_THRESHOLD
        {
            continue;
        }
        for form in [&first_form, &second_form] {
            if let Some(count) = frequencies.get_mut(form) {
                *count = count.saturating_sub(together);
            }
        }
        frequencies.insert(format!("{first} {second}"), together);
    }

    let mut frequencies: Vec<(String, usize)> = frequencies
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect();
    frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    frequencies
}

/// Minimum log-likelihood ratio for a pair to be kept as a collocation.
const COLLOCATION_THRESHOLD: f64 = 30.0;

/// `xs` を `x` に寄せる。戻り値は複数形から単数形への対応表。
fn fold_plurals<'a>(counts: &mut HashMap<&'a str, usize>) -> HashMap<&'a str, &'a str> {
    let plurals: Vec<&'a str> = counts
        .keys()
        .copied()
        .filter(|word| {
            word.len() > MIN_TOKEN_LEN
                && word.ends_with('s')
                && !word.ends_with("ss")
                && counts.contains_key(&word[..word.len() - 1])
        })
        .collect();

    let mut singular_of = HashMap::with_capacity(plurals.len());
    for plural in plurals {
        let singular = &plural[..plural.len() - 1];
        if let Some(count) = counts.remove(plural) {
            *counts.entry(singular).or_default() += count;
        }
        singular_of.insert(plural, singular);
    }
    singular_of
}

/// Dunning's log-likelihood ratio for `second` following `first`.
#[allow(clippy::cast_precision_loss)]
fn collocation_score(together: usize, first: usize, second: usize, total: usize) -> f64 {
    if first == 0 || total <= first {
        return 0.0;
    }
    let (c12, c1, c2, n) = (
        together as f64,
        first as f64,
        second as f64,
        total as f64,
    );
    let p = c2 / n;
    let p1 = c12 / c1;
    let p2 = (c2 - c12) / (n - c1);
    -2.0 * (log_likelihood(c12, c1, p) + log_likelihood(c2 - c12, n - c1, p)
        - log_likelihood(c12, c1, p1)
        - log_likelihood(c2 - c12, n - c1, p2))
}

fn log_likelihood(k: f64, n: f64, x: f64) -> f64 {
    k * x.max(1e-10).ln() + (n - k) * (1.0 - x).max(1e-10).ln()
}
