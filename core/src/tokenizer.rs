use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}_]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","and","are","as","at",
            "be","but","by",
            "for",
            "if","in","into","is","it",
            "near","no","not",
            "of","on","or",
            "such",
            "that","the","their","then","there","these","they","this","to",
            "was","will","with",
        ];
        words.iter().copied().collect()
    };
}

/// Term normalization policy. Build and query must use the same options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerOptions {
    /// Reduce words to their English stem ("running" -> "run")
    pub stem: bool,
    /// Drop short connector words ("the", "and", ...)
    pub stopwords: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self { stem: true, stopwords: true }
    }
}

impl TokenizerOptions {
    pub fn raw() -> Self {
        Self { stem: false, stopwords: false }
    }
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into (term, position) with the default policy.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    tokenize_with(text, &TokenizerOptions::default())
}

/// Tokenize text into (term, position) using NFKC normalization, lowercase, and
/// splitting on non-alphanumeric boundaries. Stop-word removal and stemming are
/// applied as `opts` says. Positions count every word, including dropped ones.
pub fn tokenize_with(text: &str, opts: &TokenizerOptions) -> Vec<(String, usize)> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for (pos, mat) in RE.find_iter(&normalized).enumerate() {
        let token = mat.as_str();
        if opts.stopwords && is_stopword(token) { continue; }
        let term = if opts.stem { STEMMER.stem(token).into_owned() } else { token.to_string() };
        if term.is_empty() { continue; }
        tokens.push((term, pos));
    }
    tokens
}

/// Normalize a single query word the same way document words are normalized.
/// Returns `None` for words the index never stores (stop words, punctuation).
pub fn normalize_term(word: &str, opts: &TokenizerOptions) -> Option<String> {
    tokenize_with(word, opts).into_iter().next().map(|(t, _)| t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Running, runner's run!");
        assert!(t.iter().any(|(w, _)| w == "run"));
    }

    #[test]
    fn splits_on_punctuation_and_keeps_underscores() {
        let t = tokenize_with("awk -F: '{print $1}' ssh_failed_login", &TokenizerOptions::raw());
        let words: Vec<&str> = t.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(words, vec!["awk", "f", "print", "1", "ssh_failed_login"]);
    }

    #[test]
    fn positions_skip_dropped_words() {
        let t = tokenize("the line");
        assert_eq!(t, vec![("line".to_string(), 1)]);
    }

    #[test]
    fn raw_options_keep_stopwords() {
        let t = tokenize_with("The End", &TokenizerOptions::raw());
        assert_eq!(t, vec![("the".to_string(), 0), ("end".to_string(), 1)]);
    }

    #[test]
    fn normalize_term_drops_stopwords() {
        let opts = TokenizerOptions::default();
        assert_eq!(normalize_term("The", &opts), None);
        assert_eq!(normalize_term("Deleting", &opts).as_deref(), Some("delet"));
    }
}
