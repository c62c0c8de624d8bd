//! Static search index for a documentation site.
//!
//! Source documents are tokenized into a term -> document postings map plus
//! per-document metadata, then written out as the `searchindex.js` artifact
//! read by the site's search box.

pub mod config;
pub mod error;
pub mod index;
pub mod markup;
pub mod persist;
pub mod query;
pub mod source;
pub mod tokenizer;

pub use config::SiteConfig;
pub use error::{IndexError, Result};
pub use index::{build_index, DocId, DocMeta, Document, IndexBuilder, Postings, SearchIndex, TitleLocation};
pub use query::{search, QueryMode, SearchHit};
pub use tokenizer::TokenizerOptions;
