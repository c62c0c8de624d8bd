//! Heading extraction for Markdown and reStructuredText sources.
//!
//! Only section structure is recognised; body text is tokenized as-is, since
//! markup punctuation never survives tokenization anyway.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    Markdown,
    #[serde(rename = "restructuredtext")]
    ReStructuredText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub title: String,
    pub anchor: String,
}

impl Heading {
    fn new(title: &str) -> Self {
        let title = title.trim().to_string();
        let anchor = slugify(&title);
        Self { title, anchor }
    }
}

/// Section anchor for a heading: lowercase, runs of non-alphanumerics become a
/// single `-`, no leading or trailing `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() { slug.push('-'); }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// All section headings of a document in source order.
pub fn headings(text: &str, kind: MarkupKind) -> Vec<Heading> {
    match kind {
        MarkupKind::Markdown => markdown_headings(text),
        MarkupKind::ReStructuredText => rst_headings(text),
    }
}

fn markdown_headings(text: &str) -> Vec<Heading> {
    let mut out = Vec::new();
    // (explicit `{#id}` anchor, text collected so far) while inside a heading
    let mut current: Option<(Option<String>, String)> = None;
    for event in Parser::new_ext(text, Options::ENABLE_HEADING_ATTRIBUTES) {
        match event {
            Event::Start(Tag::Heading { id, .. }) => {
                current = Some((id.map(|id| id.to_string()), String::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((id, title)) = current.take() {
                    let mut heading = Heading::new(&title);
                    if heading.title.is_empty() { continue; }
                    if let Some(id) = id { heading.anchor = id; }
                    out.push(heading);
                }
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some((_, title)) = current.as_mut() { title.push_str(&t); }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, title)) = current.as_mut() { title.push(' '); }
            }
            _ => {}
        }
    }
    out
}

fn is_rst_adornment(line: &str) -> bool {
    let line = line.trim_end();
    let mut chars = line.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    first.is_ascii_punctuation() && line.chars().count() >= 2 && chars.all(|c| c == first)
}

fn rst_headings(text: &str) -> Vec<Heading> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        // overline + title + underline
        if is_rst_adornment(line) {
            if let (Some(title), Some(under)) = (lines.get(i + 1), lines.get(i + 2)) {
                if !title.trim().is_empty() && is_rst_adornment(under) && under.trim_end() == line.trim_end() {
                    out.push(Heading::new(title));
                    i += 3;
                    continue;
                }
            }
            i += 1;
            continue;
        }
        // title + underline, underline at least as long as the title
        if !line.trim().is_empty() && !line.starts_with(char::is_whitespace) {
            if let Some(under) = lines.get(i + 1) {
                if is_rst_adornment(under) && under.trim_end().chars().count() >= line.trim_end().chars().count() {
                    out.push(Heading::new(line));
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_matches_generator_anchors() {
        assert_eq!(slugify("custom FS OFS"), "custom-fs-ofs");
        assert_eq!(slugify("begin-main-end block"), "begin-main-end-block");
        assert_eq!(slugify("Welcome to PowrUsr Docs\u{2019}s documentation!"), "welcome-to-powrusr-docs-s-documentation");
    }

    #[test]
    fn markdown_atx_and_setext() {
        let text = "# awk\n\nintro\n\n## basics ##\n\nspecial variables\n-----------------\n";
        let hs = headings(text, MarkupKind::Markdown);
        let titles: Vec<&str> = hs.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["awk", "basics", "special variables"]);
    }

    #[test]
    fn markdown_ignores_fenced_code() {
        let text = "# find\n\n```bash\n# not a heading\nfind . -name '*.md'\n```\n";
        let hs = headings(text, MarkupKind::Markdown);
        assert_eq!(hs.len(), 1);
        assert_eq!(hs[0].anchor, "find");
    }

    #[test]
    fn markdown_longer_fence_is_not_closed_by_shorter_one() {
        let text = "# awk\n\n````md\n```\n# not a heading\n```\n````\n";
        let titles: Vec<String> = headings(text, MarkupKind::Markdown).into_iter().map(|h| h.title).collect();
        assert_eq!(titles, vec!["awk"]);
    }

    #[test]
    fn markdown_inline_markup_is_stripped_from_titles() {
        let hs = headings("# `awk` **basics**\n", MarkupKind::Markdown);
        assert_eq!(hs, vec![Heading { title: "awk basics".into(), anchor: "awk-basics".into() }]);
    }

    #[test]
    fn markdown_setext_heading_takes_the_whole_paragraph() {
        let text = "# sed\nsome intro\nline selection\n--------------\n";
        let titles: Vec<String> = headings(text, MarkupKind::Markdown).into_iter().map(|h| h.title).collect();
        assert_eq!(titles, vec!["sed", "some intro line selection"]);
    }

    #[test]
    fn markdown_explicit_anchor_wins() {
        let hs = headings("## custom FS OFS {#fs-ofs}\n", MarkupKind::Markdown);
        assert_eq!(hs, vec![Heading { title: "custom FS OFS".into(), anchor: "fs-ofs".into() }]);
    }

    #[test]
    fn markdown_requires_space_after_hashes() {
        assert!(headings("#!/bin/bash\n", MarkupKind::Markdown).is_empty());
    }

    #[test]
    fn rst_over_and_underlined() {
        let text = "=====\nTitle\n=====\n\nSection\n-------\n\nbody\n";
        let hs = headings(text, MarkupKind::ReStructuredText);
        let titles: Vec<&str> = hs.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Title", "Section"]);
    }

    #[test]
    fn rst_short_underline_is_not_a_heading() {
        assert!(headings("Long title\n---\n", MarkupKind::ReStructuredText).is_empty());
    }
}
