//! Lookup over a built [`SearchIndex`], scored the way the site's search box
//! scores results: title hits outrank body hits.

use crate::index::{DocId, Postings, SearchIndex};
use crate::tokenizer::normalize_term;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

const TITLE_TERM_SCORE: u32 = 15;
const BODY_TERM_SCORE: u32 = 5;
const EXACT_TITLE_SCORE: u32 = 15;
/// Extra body points for repeated occurrences, kept below a title hit
const MAX_FREQUENCY_BONUS: u32 = 9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Every query term must match
    #[default]
    And,
    /// Any query term may match
    Or,
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(QueryMode::And),
            "or" => Ok(QueryMode::Or),
            other => Err(format!("unknown query mode {other:?}, expected \"and\" or \"or\"")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub docname: String,
    pub filename: String,
    pub title: String,
    pub score: u32,
}

/// Query words after normalization: terms to match and terms to exclude.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub required: Vec<String>,
    pub excluded: Vec<String>,
}

/// Split a query on whitespace; a leading `-` marks an exclusion. Words the
/// index never stores (stop words, punctuation) are dropped.
pub fn parse_query(query: &str, index: &SearchIndex) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();
    for word in query.split_whitespace() {
        let (excluded, word) = match word.strip_prefix('-') {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, word),
        };
        // "-F:" style words can hold several terms
        let terms: Vec<String> = crate::tokenizer::tokenize_with(word, &index.options).into_iter().map(|(t, _)| t).collect();
        for term in terms {
            let bucket = if excluded { &mut parsed.excluded } else { &mut parsed.required };
            if !bucket.contains(&term) { bucket.push(term); }
        }
    }
    parsed
}

fn matching_docs(index: &SearchIndex, term: &str) -> BTreeSet<DocId> {
    let empty = Postings::new();
    let body = index.postings(term).unwrap_or(&empty);
    let title = index.title_postings(term).unwrap_or(&empty);
    body.union(title).copied().collect()
}

/// Run a query against the index and return hits ranked by score, ties broken
/// by document id. At most `limit` hits are returned.
pub fn search(index: &SearchIndex, query: &str, mode: QueryMode, limit: usize) -> Vec<SearchHit> {
    let parsed = parse_query(query, index);
    if parsed.required.is_empty() {
        return Vec::new();
    }

    let mut candidates: Option<BTreeSet<DocId>> = None;
    for term in &parsed.required {
        let docs = matching_docs(index, term);
        candidates = Some(match (candidates, mode) {
            (None, _) => docs,
            (Some(acc), QueryMode::And) => acc.intersection(&docs).copied().collect(),
            (Some(acc), QueryMode::Or) => acc.union(&docs).copied().collect(),
        });
    }
    let mut candidates = candidates.unwrap_or_default();
    for term in &parsed.excluded {
        for id in matching_docs(index, term) { candidates.remove(&id); }
    }

    let whole_query = query.trim().to_lowercase();
    let mut scores: HashMap<DocId, u32> = HashMap::new();
    for &doc_id in &candidates {
        let mut score = 0;
        for term in &parsed.required {
            if index.title_postings(term).map_or(false, |p| p.contains(&doc_id)) { score += TITLE_TERM_SCORE; }
            let tf = index.term_frequency(term, doc_id);
            if tf > 0 { score += BODY_TERM_SCORE + (tf - 1).min(MAX_FREQUENCY_BONUS); }
        }
        if index.doc(doc_id).map_or(false, |d| d.title.to_lowercase() == whole_query) { score += EXACT_TITLE_SCORE; }
        scores.insert(doc_id, score);
    }

    let mut ranked: Vec<(DocId, u32)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(limit)
        .filter_map(|(doc_id, score)| {
            let meta = index.doc(doc_id)?;
            Some(SearchHit { doc_id, docname: meta.docname.clone(), filename: meta.filename.clone(), title: meta.title.clone(), score })
        })
        .collect()
}

/// Documents containing a single word, normalized with the index's policy.
pub fn term_hits(index: &SearchIndex, word: &str) -> BTreeSet<DocId> {
    match normalize_term(word, &index.options) {
        Some(term) => matching_docs(index, &term),
        None => BTreeSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{build_index, Document};
    use crate::tokenizer::TokenizerOptions;

    fn shell_docs() -> SearchIndex {
        build_index(
            vec![
                Document::new(0, "awk", "bash/awk.md", "print each line with awk"),
                Document::new(1, "sed", "bash/sed.md", "delete each line matching a regex"),
                Document::new(2, "find", "bash/find.md", "find files and delete them, sed not needed"),
            ],
            TokenizerOptions::default(),
        )
    }

    #[test]
    fn and_mode_intersects() {
        let idx = shell_docs();
        let hits: Vec<DocId> = search(&idx, "delete line", QueryMode::And, 10).iter().map(|h| h.doc_id).collect();
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn or_mode_unions() {
        let idx = shell_docs();
        let mut hits: Vec<DocId> = search(&idx, "print delete", QueryMode::Or, 10).iter().map(|h| h.doc_id).collect();
        hits.sort();
        assert_eq!(hits, vec![0, 1, 2]);
    }

    #[test]
    fn title_match_ranks_first() {
        let idx = shell_docs();
        let hits = search(&idx, "sed", QueryMode::And, 10);
        assert_eq!(hits[0].doc_id, 1);
        assert_eq!(hits[1].doc_id, 2);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn more_occurrences_rank_higher() {
        let idx = build_index(
            vec![
                Document::new(0, "awk", "bash/awk.md", "print a line"),
                Document::new(1, "sed", "bash/sed.md", "line after line, the last line"),
            ],
            TokenizerOptions::default(),
        );
        let hits = search(&idx, "line", QueryMode::And, 10);
        assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![1, 0]);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn frequency_bonus_stays_below_a_title_hit() {
        let idx = build_index(
            vec![
                Document::new(0, "notes", "notes.md", &"awk ".repeat(40)),
                Document::new(1, "awk", "bash/awk.md", "field splitting"),
            ],
            TokenizerOptions::default(),
        );
        let hits = search(&idx, "awk", QueryMode::And, 10);
        assert_eq!(hits[0].doc_id, 1);
    }

    #[test]
    fn exclusion_removes_docs() {
        let idx = shell_docs();
        let hits: Vec<DocId> = search(&idx, "delete -find", QueryMode::And, 10).iter().map(|h| h.doc_id).collect();
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn stopword_only_query_is_empty() {
        let idx = shell_docs();
        assert!(search(&idx, "the and", QueryMode::Or, 10).is_empty());
    }

    #[test]
    fn limit_truncates() {
        let idx = shell_docs();
        assert_eq!(search(&idx, "each", QueryMode::And, 1).len(), 1);
    }

    #[test]
    fn parse_mode() {
        assert_eq!("OR".parse::<QueryMode>(), Ok(QueryMode::Or));
        assert!("xor".parse::<QueryMode>().is_err());
    }
}
