use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn magenote_cmd(data_dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_magenote"));
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd.env_remove("MAGENOTE_DATA_DIR");
    cmd
}

fn run(data_dir: &TempDir, args: &[&str]) -> Output {
    magenote_cmd(data_dir).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn list_json(data_dir: &TempDir) -> Vec<serde_json::Value> {
    let output = run(data_dir, &["list", "--json"]);
    assert!(output.status.success(), "list failed: {}", stderr(&output));
    serde_json::from_str(&stdout(&output)).unwrap()
}

#[test]
fn test_empty_list() {
    let tmp = TempDir::new().unwrap();

    let output = run(&tmp, &["list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No notes found."));
    assert!(tmp.path().join("MageNote.db").exists());
}

#[test]
fn test_full_note_workflow() {
    let tmp = TempDir::new().unwrap();

    // Add two notes
    let output = run(&tmp, &["add", "First note"]);
    assert!(output.status.success(), "add failed: {}", stderr(&output));
    assert!(stdout(&output).contains("Created note #1"));
    assert!(stderr(&output).contains("Your notes have been updated."));

    let output = run(&tmp, &["add", "Second note"]);
    assert!(stdout(&output).contains("Created note #2"));

    // Newest first
    let notes = list_json(&tmp);
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0]["id"], 2);
    assert_eq!(notes[1]["body"], "First note");

    // Edit keeps the id
    let output = run(&tmp, &["edit", "1", "First note, revised"]);
    assert!(output.status.success());

    let output = run(&tmp, &["show", "1"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("#1: "));
    assert!(out.contains("First note, revised"));

    // Delete
    let output = run(&tmp, &["delete", "2", "--force"]);
    assert!(output.status.success(), "delete failed: {}", stderr(&output));
    assert!(stdout(&output).contains("Deleted note #2"));

    let notes = list_json(&tmp);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["id"], 1);
}

#[test]
fn test_add_from_stdin() {
    let tmp = TempDir::new().unwrap();

    let mut child = magenote_cmd(&tmp)
        .args(["add", "--stdin"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"line one\nline two")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let notes = list_json(&tmp);
    assert_eq!(notes[0]["body"], "line one\nline two");
}

#[test]
fn test_delete_without_force_in_non_interactive_mode() {
    let tmp = TempDir::new().unwrap();
    run(&tmp, &["add", "keep me"]);

    let output = magenote_cmd(&tmp)
        .args(["delete", "1"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--force"));
    assert_eq!(list_json(&tmp).len(), 1);
}

#[test]
fn test_missing_note() {
    let tmp = TempDir::new().unwrap();

    let output = run(&tmp, &["show", "42"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Note not found: 42"));

    let output = run(&tmp, &["delete", "42", "--force"]);
    assert!(!output.status.success());
}

#[test]
fn test_export_then_import_into_fresh_store() {
    let tmp = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    run(&tmp, &["add", "alpha"]);
    run(&tmp, &["add", "beta"]);
    let before = list_json(&tmp);

    let output = run(&tmp, &["export", "--output", out.path().to_str().unwrap()]);
    assert!(output.status.success(), "export failed: {}", stderr(&output));

    let backups: Vec<_> = fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(backups.len(), 1);
    let name = backups[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("MageNote-"));
    assert!(name.ends_with(".json"));

    let other = TempDir::new().unwrap();
    let output = run(&other, &["import", backups[0].to_str().unwrap()]);
    assert!(output.status.success(), "import failed: {}", stderr(&output));
    assert!(stdout(&output).contains("Imported 2 notes"));

    assert_eq!(list_json(&other), before);
}

#[test]
fn test_bad_import_leaves_notes_alone() {
    let tmp = TempDir::new().unwrap();
    run(&tmp, &["add", "precious"]);

    let bad = tmp.path().join("bad.json");
    fs::write(&bad, r#"[{"id": 9, "date": "not-a-date", "note": "x"}]"#).unwrap();

    let output = run(&tmp, &["import", bad.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Import failed"));

    let notes = list_json(&tmp);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["body"], "precious");
}

#[test]
fn test_corrupt_store_then_reset() {
    let tmp = TempDir::new().unwrap();
    {
        let conn = rusqlite::Connection::open(tmp.path().join("MageNote.db")).unwrap();
        conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    }

    let output = run(&tmp, &["list"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("corrupted"));

    let output = run(&tmp, &["reset", "--force"]);
    assert!(output.status.success(), "reset failed: {}", stderr(&output));

    let output = run(&tmp, &["add", "fresh start"]);
    assert!(stdout(&output).contains("Created note #1"));
}

#[test]
fn test_reset_clears_notes() {
    let tmp = TempDir::new().unwrap();
    run(&tmp, &["add", "gone soon"]);

    let output = run(&tmp, &["reset", "--force"]);
    assert!(output.status.success());
    assert!(list_json(&tmp).is_empty());
}

#[test]
fn test_draft_dictation_workflow() {
    let tmp = TempDir::new().unwrap();

    let output = run(&tmp, &["draft", "dictate", "remember the milk"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim_end(), "Remember the milk.");

    run(&tmp, &["draft", "dictate", "and the bread"]);
    let output = run(&tmp, &["draft", "show"]);
    assert!(stdout(&output).contains("Remember the milk.\r\n\nAnd the bread."));

    let output = run(&tmp, &["draft", "save"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Created note #1 from draft"));

    let output = run(&tmp, &["draft", "show"]);
    assert!(stdout(&output).contains("No draft."));
    assert_eq!(list_json(&tmp)[0]["body"], "Remember the milk.\r\n\nAnd the bread.");
}

#[test]
fn test_language() {
    let tmp = TempDir::new().unwrap();

    let output = run(&tmp, &["language"]);
    assert!(stdout(&output).contains("english (en-US)"));

    let output = run(&tmp, &["language", "klingon"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unsupported language"));
}

#[test]
fn test_backup_reminder_after_notes_exist() {
    let tmp = TempDir::new().unwrap();
    run(&tmp, &["add", "unbacked"]);

    let output = run(&tmp, &["list"]);
    assert!(stderr(&output).contains("Please consider backing up soon!"));

    let out = TempDir::new().unwrap();
    run(&tmp, &["export", "--output", out.path().to_str().unwrap()]);

    let output = run(&tmp, &["list"]);
    assert!(!stderr(&output).contains("Please consider backing up soon!"));
}
