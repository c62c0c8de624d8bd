use crate::config::SiteConfig;
use crate::error::{IndexError, Result};
use crate::index::{docname_for, DocId, Document, NO_TITLE};
use crate::markup::{headings, MarkupKind};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().map_or(false, |s| s.starts_with('.'))
}

fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Source files under `root` selected by suffix and exclude patterns, as
/// `(relative filename, absolute path, markup)` sorted by docname. When two
/// files share a docname (`awk.md` and `awk.rst`) only the first by filename
/// is kept.
pub fn discover_sources(root: &Path, config: &SiteConfig) -> Result<Vec<(String, PathBuf, MarkupKind)>> {
    if !root.is_dir() {
        return Err(IndexError::io(root, io::Error::new(io::ErrorKind::NotFound, "source directory not found")));
    }
    let excludes = config.exclude_set()?;
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            let source = e.into_io_error().unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
            IndexError::io(path, source)
        })?;
        let p = entry.path();
        if !p.is_file() { continue; }
        let rel = relative_name(root, p);
        if excludes.is_match(&rel) {
            tracing::debug!(file = %rel, "excluded");
            continue;
        }
        if let Some(kind) = config.markup_for(p) {
            files.push((rel, p.to_path_buf(), kind));
        }
    }
    files.sort_by(|a, b| docname_for(&a.0).cmp(&docname_for(&b.0)).then_with(|| a.0.cmp(&b.0)));
    let mut kept: Vec<(String, PathBuf, MarkupKind)> = Vec::with_capacity(files.len());
    for file in files {
        if let Some(prev) = kept.last() {
            if docname_for(&prev.0) == docname_for(&file.0) {
                tracing::warn!(docname = %docname_for(&file.0), kept = %prev.0, skipped = %file.0, "multiple files for one document");
                continue;
            }
        }
        kept.push(file);
    }
    Ok(kept)
}

/// Load one source file. Unreadable or non-UTF-8 files are parse errors.
pub fn load_document(id: DocId, filename: &str, path: &Path, kind: MarkupKind) -> Result<Document> {
    let bytes = fs::read(path).map_err(|e| IndexError::Parse { path: path.to_path_buf(), reason: e.to_string() })?;
    let doc = Document::from_bytes(id, "", filename, bytes).map_err(|e| match e {
        IndexError::Parse { reason, .. } => IndexError::Parse { path: path.to_path_buf(), reason },
        other => other,
    })?;
    let hs = headings(&doc.body, kind);
    let title = hs.first().map_or_else(|| NO_TITLE.to_string(), |h| h.title.clone());
    Ok(Document { title, ..doc }.with_headings(hs))
}

/// Load every source document under `root`, assigning dense ids in docname order.
pub fn load_documents(root: &Path, config: &SiteConfig) -> Result<Vec<Document>> {
    let files = discover_sources(root, config)?;
    let mut docs = Vec::with_capacity(files.len());
    for (id, (rel, path, kind)) in files.into_iter().enumerate() {
        let doc = load_document(id as DocId, &rel, &path, kind)?;
        tracing::debug!(doc_id = doc.id, file = %rel, title = %doc.title, "loaded document");
        docs.push(doc);
    }
    tracing::info!(root = %root.display(), num_docs = docs.len(), "loaded source documents");
    Ok(docs)
}
