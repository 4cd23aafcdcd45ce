use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Generic English list shipped with the `wordcloud` package.
const ENGLISH: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "can't", "cannot", "com", "could", "couldn't", "did", "didn't",
    "do", "does", "doesn't", "doing", "don't", "down", "during", "each", "else", "ever", "few",
    "for", "from", "further", "get", "had", "hadn't", "has", "hasn't", "have", "haven't",
    "having", "he", "he'd", "he'll", "he's", "hence", "her", "here", "here's", "hers",
    "herself", "him", "himself", "his", "how", "how's", "however", "http", "i", "i'd", "i'll",
    "i'm", "i've", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "just", "k",
    "let's", "like", "me", "more", "most", "mustn't", "my", "myself", "no", "nor", "not", "of",
    "off", "on", "once", "only", "or", "other", "otherwise", "ought", "our", "ours",
    "ourselves", "out", "over", "own", "r", "same", "shall", "shan't", "she", "she'd",
    "she'll", "she's", "should", "shouldn't", "since", "so", "some", "such", "than", "that",
    "that's", "the", "their", "theirs", "them", "themselves", "then", "there", "there's",
    "therefore", "these", "they", "they'd", "they'll", "they're", "they've", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "wasn't", "we", "we'd",
    "we'll", "we're", "we've", "were", "weren't", "what", "what's", "when", "when's", "where",
    "where's", "which", "while", "who", "who's", "whom", "why", "why's", "with", "won't",
    "would", "wouldn't", "www", "you", "you'd", "you'll", "you're", "you've", "your", "yours",
    "yourself", "yourselves",
];

/// インドネシア語の補助リスト（短縮形・機能語）。
const INDONESIAN: &[&str] = &[
    "yg", "dg", "rt", "dgn", "ny", "d", "k", "ke", "di", "dari", "dan", "ini", "itu", "atau",
    "pada", "untuk", "juga", "dengan", "yang", "ya", "ga", "gak", "tidak", "ada", "adalah",
    "saya", "dia", "kamu", "kita", "mereka", "saja", "seperti", "telah", "akan", "tapi",
    "namun", "karena", "oleh", "saat", "sebagai", "bahwa",
];

/// Union of both lists, spelled the way cleaned tokens are (apostrophes
/// removed).
static STOPWORDS: Lazy<HashSet<String>> = Lazy::new(|| {
    ENGLISH
        .iter()
        .chain(INDONESIAN)
        .map(|word| word.replace('\'', ""))
        .collect()
});

#[must_use]
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_both_languages_without_apostrophes() {
        assert!(is_stopword("the"));
        assert!(is_stopword("dont"));
        assert!(is_stopword("yang"));
        assert!(is_stopword("gak"));
        assert!(!is_stopword("don't"));
        assert!(!is_stopword("bagus"));
    }

    #[test]
    fn overlapping_entries_are_deduplicated() {
        // "k" はどちらのリストにも入っている
        assert!(STOPWORDS.len() < ENGLISH.len() + INDONESIAN.len());
    }
}
