use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn indexer(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_indexer")).args(args).output().expect("run indexer")
}

fn write_site(root: &Path) {
    fs::create_dir_all(root.join("bash")).unwrap();
    fs::write(root.join("bash/awk.md"), "# awk\n\nprint each line\n").unwrap();
    fs::write(root.join("bash/sed.md"), "# sed\n\ndelete each line\n").unwrap();
    fs::write(root.join("docsearch.json"), r#"{"project":"PowrUsr Docs"}"#).unwrap();
}

#[test]
fn build_then_search() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("source");
    let out = dir.path().join("out");
    write_site(&src);

    let build = indexer(&["build", "--source", src.to_str().unwrap(), "--output", out.to_str().unwrap()]);
    assert!(build.status.success(), "stderr: {}", String::from_utf8_lossy(&build.stderr));
    let script = fs::read_to_string(out.join("searchindex.js")).unwrap();
    assert!(script.starts_with("Search.setIndex("));
    let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(out.join("meta.json")).unwrap()).unwrap();
    assert_eq!(meta["project"], "PowrUsr Docs");
    assert_eq!(meta["num_docs"], 2);

    let found = indexer(&["search", "--index", out.to_str().unwrap(), "--query", "each"]);
    assert!(found.status.success());
    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&found.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let files: Vec<&str> = lines.iter().map(|v| v["filename"].as_str().unwrap()).collect();
    assert_eq!(files, vec!["bash/awk.md", "bash/sed.md"]);

    let none = indexer(&["search", "--index", out.to_str().unwrap(), "--query", "nomatch", "--mode", "or"]);
    assert!(none.status.success());
    assert!(none.stdout.is_empty());
}

#[test]
fn unreadable_source_fails_the_build() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("source");
    write_site(&src);
    fs::write(src.join("broken.md"), [0xffu8, 0xfe, 0x00]).unwrap();

    let build = indexer(&["build", "--source", src.to_str().unwrap(), "--output", dir.path().join("out").to_str().unwrap()]);
    assert!(!build.status.success());
    assert!(String::from_utf8_lossy(&build.stderr).contains("broken.md"));
}

#[test]
fn empty_source_builds_empty_index() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("source");
    fs::create_dir_all(&src).unwrap();
    let out = dir.path().join("out");

    let build = indexer(&["build", "--source", src.to_str().unwrap(), "--output", out.to_str().unwrap()]);
    assert!(build.status.success());
    let script = fs::read_to_string(out.join("searchindex.js")).unwrap();
    assert!(script.contains(r#""docnames":[]"#));
    assert!(script.contains(r#""terms":{}"#));
}
