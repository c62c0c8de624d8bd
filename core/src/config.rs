//! Site configuration, read from `docsearch.json` in the source root.
//!
//! Every field is optional; a missing file means defaults:
//!
//! ```json
//! {
//!   "project": "PowrUsr Docs",
//!   "source_suffix": { ".rst": "restructuredtext", ".md": "markdown", ".txt": "markdown" },
//!   "exclude_patterns": ["_build/**"],
//!   "tokenizer": { "stem": true, "stopwords": true }
//! }
//! ```

use crate::error::{IndexError, Result};
use crate::markup::MarkupKind;
use crate::tokenizer::TokenizerOptions;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "docsearch.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub project: String,
    /// File suffix (with leading dot) -> markup language
    pub source_suffix: BTreeMap<String, MarkupKind>,
    /// Globs relative to the source root, `/`-separated
    pub exclude_patterns: Vec<String>,
    pub tokenizer: TokenizerOptions,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let mut source_suffix = BTreeMap::new();
        source_suffix.insert(".rst".to_string(), MarkupKind::ReStructuredText);
        source_suffix.insert(".md".to_string(), MarkupKind::Markdown);
        source_suffix.insert(".txt".to_string(), MarkupKind::Markdown);
        Self {
            project: "Documentation".to_string(),
            source_suffix,
            exclude_patterns: vec!["_build/**".to_string()],
            tokenizer: TokenizerOptions::default(),
        }
    }
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| IndexError::Config(format!("{}: {e}", path.display())))
    }

    /// `docsearch.json` from the source root if present, defaults otherwise.
    pub fn discover(source_root: &Path) -> Result<Self> {
        let path = source_root.join(CONFIG_FILENAME);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading site config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Markup language for a file, or `None` if the suffix is not a source suffix.
    pub fn markup_for(&self, path: &Path) -> Option<MarkupKind> {
        let ext = path.extension()?.to_str()?;
        self.source_suffix.get(&format!(".{ext}")).copied()
    }

    pub fn exclude_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|e| IndexError::Config(format!("exclude pattern {pattern:?}: {e}")))?;
            builder.add(glob);
        }
        builder.build().map_err(|e| IndexError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: SiteConfig = serde_json::from_str(r#"{"project":"PowrUsr Docs","tokenizer":{"stem":false}}"#).unwrap();
        assert_eq!(cfg.project, "PowrUsr Docs");
        assert!(!cfg.tokenizer.stem);
        assert!(cfg.tokenizer.stopwords);
        assert_eq!(cfg.markup_for(Path::new("bash/awk.md")), Some(MarkupKind::Markdown));
        assert_eq!(cfg.markup_for(Path::new("index.rst")), Some(MarkupKind::ReStructuredText));
        assert_eq!(cfg.markup_for(Path::new("logo.png")), None);
    }

    #[test]
    fn bad_glob_is_a_config_error() {
        let cfg = SiteConfig { exclude_patterns: vec!["[".into()], ..SiteConfig::default() };
        assert!(matches!(cfg.exclude_set(), Err(IndexError::Config(_))));
    }
}
