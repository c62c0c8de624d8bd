use crate::error::{IndexError, Result};
use crate::markup::{slugify, Heading};
use crate::tokenizer::{normalize_term, tokenize_with, TokenizerOptions};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub type DocId = u32;

/// Set of documents containing a term, ordered by id.
pub type Postings = BTreeSet<DocId>;

/// Title of a page without any heading. Never indexed as title text.
pub const NO_TITLE: &str = "<no title>";

/// One source file as seen by the builder. Consumed by [`IndexBuilder::add`];
/// only the derived [`DocMeta`] and postings outlive the build.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    /// Relative path without suffix, `/`-separated, e.g. `bash/awk`
    pub docname: String,
    pub title: String,
    /// Relative source path, e.g. `bash/awk.md`
    pub filename: String,
    pub body: String,
    pub headings: Vec<Heading>,
}

impl Document {
    pub fn new(id: DocId, title: impl Into<String>, filename: impl Into<String>, body: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            id,
            docname: docname_for(&filename),
            title: title.into(),
            filename,
            body: body.into(),
            headings: Vec::new(),
        }
    }

    /// Decode raw file contents. Fails with [`IndexError::Parse`] naming the
    /// file when the bytes are not UTF-8.
    pub fn from_bytes(id: DocId, title: impl Into<String>, filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let filename = filename.into();
        let body = String::from_utf8(bytes).map_err(|e| IndexError::Parse {
            path: filename.clone().into(),
            reason: format!("not valid UTF-8 text ({})", e.utf8_error()),
        })?;
        Ok(Self::new(id, title, filename, body))
    }

    pub fn with_headings(mut self, headings: Vec<Heading>) -> Self {
        self.headings = headings;
        self
    }

    /// False for blank titles and the [`NO_TITLE`] placeholder.
    pub fn has_title(&self) -> bool {
        let title = self.title.trim();
        !title.is_empty() && title != NO_TITLE
    }
}

/// `bash/awk.md` -> `bash/awk`
pub fn docname_for(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path.with_extension("");
    stem.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub id: DocId,
    pub docname: String,
    pub filename: String,
    pub title: String,
}

/// Where a section heading lives: document and anchor slug.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TitleLocation {
    pub doc_id: DocId,
    pub anchor: String,
}

/// The complete static search artifact: per-document metadata plus term
/// postings. Built once, then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndex {
    /// Ordered by id
    pub docs: Vec<DocMeta>,
    /// Terms from document bodies and titles
    pub terms: BTreeMap<String, Postings>,
    /// Occurrences of each term per document; same keys as `terms`
    pub frequencies: BTreeMap<String, BTreeMap<DocId, u32>>,
    /// Terms from page titles and section headings only
    pub titleterms: BTreeMap<String, Postings>,
    /// Section heading text -> where it occurs
    pub alltitles: BTreeMap<String, Vec<TitleLocation>>,
    pub options: TokenizerOptions,
}

impl SearchIndex {
    pub fn new(options: TokenizerOptions) -> Self {
        Self { options, ..Self::default() }
    }

    pub fn num_docs(&self) -> usize { self.docs.len() }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn doc(&self, id: DocId) -> Option<&DocMeta> {
        self.docs.binary_search_by_key(&id, |d| d.id).ok().map(|i| &self.docs[i])
    }

    /// Postings for an already-normalized term.
    pub fn postings(&self, term: &str) -> Option<&Postings> { self.terms.get(term) }

    pub fn title_postings(&self, term: &str) -> Option<&Postings> { self.titleterms.get(term) }

    /// How often a normalized term occurs in a document. Indexes loaded
    /// without frequencies report 1 for every posting.
    pub fn term_frequency(&self, term: &str, id: DocId) -> u32 {
        match self.frequencies.get(term).and_then(|counts| counts.get(&id)) {
            Some(&tf) => tf,
            None => u32::from(self.postings(term).map_or(false, |p| p.contains(&id))),
        }
    }

    /// Postings for a raw word, normalized with this index's tokenizer policy.
    pub fn lookup(&self, word: &str) -> Option<&Postings> {
        let term = normalize_term(word, &self.options)?;
        self.terms.get(&term)
    }
}

/// Accumulates documents into a [`SearchIndex`].
pub struct IndexBuilder {
    index: SearchIndex,
    seen: BTreeSet<DocId>,
}

impl IndexBuilder {
    pub fn new(options: TokenizerOptions) -> Self {
        Self { index: SearchIndex::new(options), seen: BTreeSet::new() }
    }

    pub fn add(&mut self, doc: Document) {
        let opts = self.index.options;
        let has_title = doc.has_title();
        if !self.seen.insert(doc.id) {
            tracing::warn!(doc_id = doc.id, filename = %doc.filename, "duplicate document id, metadata of the first document kept");
        } else {
            self.index.docs.push(DocMeta { id: doc.id, docname: doc.docname, filename: doc.filename, title: doc.title.clone() });
        }

        let title_tokens = if has_title { tokenize_with(&doc.title, &opts) } else { Vec::new() };
        let mut tokens = 0usize;
        for (term, _pos) in tokenize_with(&doc.body, &opts).into_iter().chain(title_tokens.iter().cloned()) {
            *self.index.frequencies.entry(term.clone()).or_default().entry(doc.id).or_insert(0) += 1;
            self.index.terms.entry(term).or_default().insert(doc.id);
            tokens += 1;
        }

        let mut headings = doc.headings;
        if headings.is_empty() && has_title {
            headings.push(Heading { anchor: slugify(&doc.title), title: doc.title.trim().to_string() });
        }
        for (term, _pos) in title_tokens {
            self.index.titleterms.entry(term).or_default().insert(doc.id);
        }
        for heading in headings {
            for (term, _pos) in tokenize_with(&heading.title, &opts) {
                self.index.titleterms.entry(term).or_default().insert(doc.id);
            }
            let locations = self.index.alltitles.entry(heading.title).or_default();
            let loc = TitleLocation { doc_id: doc.id, anchor: heading.anchor };
            if !locations.contains(&loc) { locations.push(loc); }
        }
        tracing::debug!(doc_id = doc.id, tokens, "indexed document");
    }

    pub fn finish(mut self) -> SearchIndex {
        self.index.docs.sort_by_key(|d| d.id);
        for locations in self.index.alltitles.values_mut() { locations.sort(); }
        tracing::info!(num_docs = self.index.num_docs(), num_terms = self.index.num_terms(), "built search index");
        self.index
    }
}

/// Build an index from a document set in one pass.
pub fn build_index<I>(docs: I, options: TokenizerOptions) -> SearchIndex
where
    I: IntoIterator<Item = Document>,
{
    let mut builder = IndexBuilder::new(options);
    for doc in docs { builder.add(doc); }
    builder.finish()
}
