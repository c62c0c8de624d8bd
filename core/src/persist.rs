use crate::error::{IndexError, Result};
use crate::index::{DocId, DocMeta, Postings, SearchIndex, TitleLocation};
use crate::tokenizer::TokenizerOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;
const JS_PREFIX: &str = "Search.setIndex(";
const JS_SUFFIX: &str = ")";

/// Environment versions stamped into `envversion`; the site's search script
/// expects the key and these are the values the generator writes.
const ENV_VERSION: &[(&str, u32)] = &[
    ("sphinx", 60),
    ("sphinx.domains.c", 3),
    ("sphinx.domains.changeset", 1),
    ("sphinx.domains.citation", 1),
    ("sphinx.domains.cpp", 9),
    ("sphinx.domains.index", 1),
    ("sphinx.domains.javascript", 3),
    ("sphinx.domains.math", 2),
    ("sphinx.domains.python", 4),
    ("sphinx.domains.rst", 2),
    ("sphinx.domains.std", 2),
];

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub project: String,
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn script(&self) -> PathBuf { self.root.join("searchindex.js") }
    pub fn snapshot(&self) -> PathBuf { self.root.join("searchindex.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// A posting set as the browser reads it: a bare id when there is one
/// document, a sorted list otherwise.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PostingRepr {
    One(DocId),
    Many(Vec<DocId>),
}

/// Layout of the object passed to `Search.setIndex`, keys in the order the
/// generator writes them. Document ids are positions in the
/// `docnames`/`filenames`/`titles` arrays. `objects`, `objtypes`, `objnames`
/// and `indexentries` describe API objects, which prose docs never have.
#[derive(Debug, Serialize, Deserialize)]
struct ScriptIndex {
    docnames: Vec<String>,
    filenames: Vec<String>,
    titles: Vec<String>,
    terms: BTreeMap<String, PostingRepr>,
    #[serde(default)]
    objects: BTreeMap<String, Value>,
    #[serde(default)]
    objtypes: BTreeMap<String, Value>,
    #[serde(default)]
    objnames: BTreeMap<String, Value>,
    titleterms: BTreeMap<String, PostingRepr>,
    #[serde(default)]
    envversion: BTreeMap<String, u32>,
    alltitles: BTreeMap<String, Vec<(DocId, String)>>,
    #[serde(default)]
    indexentries: BTreeMap<String, Value>,
    #[serde(default)]
    termfreqs: BTreeMap<String, BTreeMap<DocId, u32>>,
    #[serde(default)]
    tokenizer: TokenizerOptions,
}

fn encode_postings(map: &BTreeMap<String, Postings>, position: &HashMap<DocId, DocId>) -> BTreeMap<String, PostingRepr> {
    map.iter()
        .map(|(term, ids)| {
            let mut ids: Vec<DocId> = ids.iter().filter_map(|id| position.get(id).copied()).collect();
            ids.sort_unstable();
            let repr = if ids.len() == 1 { PostingRepr::One(ids[0]) } else { PostingRepr::Many(ids) };
            (term.clone(), repr)
        })
        .collect()
}

fn decode_postings(map: BTreeMap<String, PostingRepr>, num_docs: usize, path: &Path) -> Result<BTreeMap<String, Postings>> {
    let mut out = BTreeMap::new();
    for (term, repr) in map {
        let ids = match repr {
            PostingRepr::One(id) => vec![id],
            PostingRepr::Many(ids) => ids,
        };
        if let Some(bad) = ids.iter().find(|&&id| id as usize >= num_docs) {
            return Err(IndexError::Format { path: path.to_path_buf(), reason: format!("term {term:?} references unknown document {bad}") });
        }
        out.insert(term, ids.into_iter().collect());
    }
    Ok(out)
}

/// Render the index as the `searchindex.js` script body.
pub fn to_script(index: &SearchIndex) -> Result<String> {
    let position: HashMap<DocId, DocId> = index.docs.iter().enumerate().map(|(pos, d)| (d.id, pos as DocId)).collect();
    let script = ScriptIndex {
        docnames: index.docs.iter().map(|d| d.docname.clone()).collect(),
        filenames: index.docs.iter().map(|d| d.filename.clone()).collect(),
        titles: index.docs.iter().map(|d| d.title.clone()).collect(),
        terms: encode_postings(&index.terms, &position),
        objects: BTreeMap::new(),
        objtypes: BTreeMap::new(),
        objnames: BTreeMap::new(),
        titleterms: encode_postings(&index.titleterms, &position),
        envversion: ENV_VERSION.iter().map(|&(k, v)| (k.to_string(), v)).collect(),
        alltitles: index
            .alltitles
            .iter()
            .map(|(title, locs)| {
                let locs = locs.iter().filter_map(|l| position.get(&l.doc_id).map(|&p| (p, l.anchor.clone()))).collect();
                (title.clone(), locs)
            })
            .collect(),
        indexentries: BTreeMap::new(),
        termfreqs: index
            .frequencies
            .iter()
            .map(|(term, counts)| {
                let counts = counts.iter().filter_map(|(id, &tf)| position.get(id).map(|&p| (p, tf))).collect();
                (term.clone(), counts)
            })
            .collect(),
        tokenizer: index.options,
    };
    let json = serde_json::to_string(&script).map_err(|e| IndexError::Encode(e.to_string()))?;
    Ok(format!("{JS_PREFIX}{json}{JS_SUFFIX}"))
}

/// Parse a `searchindex.js` script body. `path` is only used in errors.
pub fn from_script(text: &str, path: &Path) -> Result<SearchIndex> {
    let format_err = |reason: String| IndexError::Format { path: path.to_path_buf(), reason };
    let body = text
        .trim()
        .trim_end_matches(';')
        .strip_prefix(JS_PREFIX)
        .and_then(|s| s.strip_suffix(JS_SUFFIX))
        .ok_or_else(|| format_err(format!("expected {JS_PREFIX}...{JS_SUFFIX}")))?;
    let script: ScriptIndex = serde_json::from_str(body).map_err(|e| format_err(e.to_string()))?;
    let n = script.docnames.len();
    if script.filenames.len() != n || script.titles.len() != n {
        return Err(format_err(format!(
            "document arrays differ in length: {} docnames, {} filenames, {} titles",
            n, script.filenames.len(), script.titles.len()
        )));
    }

    let docs = script
        .docnames
        .into_iter()
        .zip(script.filenames)
        .zip(script.titles)
        .enumerate()
        .map(|(id, ((docname, filename), title))| DocMeta { id: id as DocId, docname, filename, title })
        .collect();
    let mut alltitles = BTreeMap::new();
    for (title, locs) in script.alltitles {
        let locs: Vec<TitleLocation> = locs.into_iter().map(|(doc_id, anchor)| TitleLocation { doc_id, anchor }).collect();
        alltitles.insert(title, locs);
    }
    if let Some((term, bad)) = script
        .termfreqs
        .iter()
        .find_map(|(term, counts)| counts.keys().find(|&&id| id as usize >= n).map(|bad| (term, bad)))
    {
        return Err(format_err(format!("frequency of {term:?} references unknown document {bad}")));
    }
    Ok(SearchIndex {
        docs,
        terms: decode_postings(script.terms, n, path)?,
        frequencies: script.termfreqs,
        titleterms: decode_postings(script.titleterms, n, path)?,
        alltitles,
        options: script.tokenizer,
    })
}

pub fn save_script(paths: &IndexPaths, index: &SearchIndex) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| IndexError::io(&paths.root, e))?;
    let path = paths.script();
    let script = to_script(index)?;
    let mut f = File::create(&path).map_err(|e| IndexError::io(&path, e))?;
    f.write_all(script.as_bytes()).map_err(|e| IndexError::io(&path, e))?;
    Ok(())
}

pub fn load_script(paths: &IndexPaths) -> Result<SearchIndex> {
    let path = paths.script();
    let mut f = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf).map_err(|e| IndexError::io(&path, e))?;
    from_script(&buf, &path)
}

pub fn save_snapshot(paths: &IndexPaths, index: &SearchIndex) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| IndexError::io(&paths.root, e))?;
    let path = paths.snapshot();
    let bytes = bincode::serialize(index).map_err(|e| IndexError::Encode(e.to_string()))?;
    let mut f = File::create(&path).map_err(|e| IndexError::io(&path, e))?;
    f.write_all(&bytes).map_err(|e| IndexError::io(&path, e))?;
    Ok(())
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<SearchIndex> {
    let path = paths.snapshot();
    let mut f = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| IndexError::io(&path, e))?;
    bincode::deserialize(&buf).map_err(|e| IndexError::Format { path, reason: e.to_string() })
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| IndexError::io(&paths.root, e))?;
    let path = paths.meta();
    let json = serde_json::to_string_pretty(meta).map_err(|e| IndexError::Encode(e.to_string()))?;
    let mut f = File::create(&path).map_err(|e| IndexError::io(&path, e))?;
    f.write_all(json.as_bytes()).map_err(|e| IndexError::io(&path, e))?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let mut f = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf).map_err(|e| IndexError::io(&path, e))?;
    serde_json::from_str(&buf).map_err(|e| IndexError::Format { path, reason: e.to_string() })
}

/// Write every artifact of a build: the browser script, the binary snapshot
/// and the manifest.
pub fn save_index(paths: &IndexPaths, index: &SearchIndex, project: &str) -> Result<MetaFile> {
    save_script(paths, index)?;
    save_snapshot(paths, index)?;
    let meta = MetaFile {
        project: project.to_string(),
        num_docs: index.num_docs() as u32,
        num_terms: index.num_terms() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    Ok(meta)
}

/// Load a built index, preferring the binary snapshot over the script.
pub fn load_index(paths: &IndexPaths) -> Result<SearchIndex> {
    if paths.snapshot().is_file() {
        load_snapshot(paths)
    } else {
        load_script(paths)
    }
}
