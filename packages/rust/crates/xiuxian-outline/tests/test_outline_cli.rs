//! Integration tests for the `outline` CLI binary.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn outline_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_outline"));
    cmd.env_remove("XIUXIAN_OUTLINE_BATCH_SIZE")
        .env_remove("XIUXIAN_OUTLINE_SUMMARY_CHAR_CAP")
        .arg("--root")
        .arg(root);
    cmd
}

fn json_stdout(output: &Output, what: &str) -> Result<Value, Box<dyn std::error::Error>> {
    assert!(
        output.status.success(),
        "outline {what} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

fn sample_graph() -> Result<TempDir, Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(
        &tmp.path().join("pages/Rust%3A Ownership.md"),
        "- TODO borrow checker notes\n  - moves\n",
    )?;
    write_file(
        &tmp.path().join("pages/journals/2025_01_01.md"),
        "- new year\n",
    )?;
    write_file(&tmp.path().join("pages/logseq/bak/old.md"), "- backup\n")?;
    Ok(tmp)
}

#[test]
fn test_candidates_include_journal_forms() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let output = outline_cmd(tmp.path())
        .arg("candidates")
        .arg("2025-01-01")
        .output()?;
    let payload = json_stdout(&output, "candidates")?;
    let candidates: Vec<&str> = payload
        .get("candidates")
        .and_then(Value::as_array)
        .ok_or("candidates should be an array")?
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(candidates.contains(&"2025-01-01"));
    assert!(candidates.contains(&"2025_01_01"));
    assert!(candidates.contains(&"journals/2025_01_01"));
    Ok(())
}

#[test]
fn test_resolve_and_render_decoded_page() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = sample_graph()?;

    let output = outline_cmd(tmp.path())
        .arg("resolve")
        .arg("Rust: Ownership")
        .output()?;
    let payload = json_stdout(&output, "resolve")?;
    assert_eq!(payload.get("found").and_then(Value::as_bool), Some(true));

    let filters = tmp.path().join("filters.yaml");
    write_file(&filters, "normalize_tasks: true\n")?;
    let output = outline_cmd(tmp.path())
        .arg("render")
        .arg("Rust: Ownership")
        .arg("--mode")
        .arg("outline")
        .arg("--filters")
        .arg(&filters)
        .output()?;
    let payload = json_stdout(&output, "render")?;
    assert_eq!(payload.get("state").and_then(Value::as_str), Some("blocks"));
    assert_eq!(payload.get("mode").and_then(Value::as_str), Some("outline"));
    assert_eq!(
        payload.get("text").and_then(Value::as_str),
        Some("- [ ] borrow checker notes\n  - moves")
    );

    let output = outline_cmd(tmp.path())
        .arg("render")
        .arg("nowhere")
        .output()?;
    let payload = json_stdout(&output, "render missing")?;
    assert_eq!(payload.get("state").and_then(Value::as_str), Some("not_found"));
    Ok(())
}

#[test]
fn test_index_then_list() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = sample_graph()?;
    let store = tmp.path().join("state/index.json");

    let output = outline_cmd(tmp.path())
        .arg("--graph")
        .arg("notes")
        .arg("index")
        .arg("--store")
        .arg(&store)
        .output()?;
    let payload = json_stdout(&output, "index")?;
    assert_eq!(
        payload
            .pointer("/stats/pages_indexed")
            .and_then(Value::as_u64),
        Some(2)
    );
    assert!(store.exists());

    let output = outline_cmd(tmp.path())
        .arg("--graph")
        .arg("notes")
        .arg("list")
        .arg("--store")
        .arg(&store)
        .output()?;
    let payload = json_stdout(&output, "list")?;
    let page_names: Vec<&str> = payload
        .get("pages")
        .and_then(Value::as_array)
        .ok_or("pages should be an array")?
        .iter()
        .filter_map(|page| page.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(page_names, vec!["Rust: Ownership"]);
    let journal_names: Vec<&str> = payload
        .get("journals")
        .and_then(Value::as_array)
        .ok_or("journals should be an array")?
        .iter()
        .filter_map(|page| page.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(journal_names, vec!["2025_01_01"]);

    let output = outline_cmd(tmp.path())
        .arg("--graph")
        .arg("notes")
        .arg("list")
        .arg("--store")
        .arg(&store)
        .arg("--favorites")
        .output()?;
    let payload = json_stdout(&output, "list favorites")?;
    assert_eq!(
        payload.get("pages").and_then(Value::as_array).map(Vec::len),
        Some(0)
    );
    Ok(())
}
