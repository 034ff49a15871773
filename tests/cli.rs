mod common;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

use common::{build_pdf, SHORT_PAGE};

fn pagechat_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pagechat"))
}

/// A working directory with a config that needs no network for these flows.
fn setup_test_env() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("config")).unwrap();

    let config = format!(
        r#"[db]
path = "{}/data/pagechat.sqlite"

[embedding]
provider = "disabled"

[model]
secrets_path = "{}/config/secrets.toml"

[cli]
pdf_path = "{}/notes.pdf"
"#,
        root.display(),
        root.display(),
        root.display()
    );
    fs::write(root.join("config").join("pagechat.toml"), config).unwrap();
    tmp
}

/// Run the binary with no AWS credentials anywhere: no secrets file, no
/// environment keys, and an empty home directory.
fn run(root: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(pagechat_binary())
        .args(["--config", root.join("config/pagechat.toml").to_str().unwrap()])
        .args(args)
        .current_dir(root)
        .env("HOME", root)
        .env_remove("AWS_ACCESS_KEY_ID")
        .env_remove("AWS_SECRET_ACCESS_KEY")
        .env_remove("AWS_SESSION_TOKEN")
        .env_remove("AWS_PROFILE")
        .env_remove("AWS_SHARED_CREDENTIALS_FILE")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start pagechat");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn console_reports_missing_pdf_and_exits_cleanly() {
    let tmp = setup_test_env();
    let out = run(tmp.path(), &[], "exit\n");
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.starts_with("--- INITIALIZING SYSTEMS ---"));
    assert!(stdout.contains(&format!(
        "ERROR: Could not find {}/notes.pdf. Please put a PDF in this folder.",
        tmp.path().display()
    )));
    assert!(stdout.contains("System Ready. Type 'exit' to quit."));
    assert!(stdout.contains("Ask a question: "));
}

#[test]
fn console_answers_from_empty_store_with_fallback() {
    let tmp = setup_test_env();
    let out = run(tmp.path(), &["chat"], "What is osmosis?\nExit\n");
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains(
        "=== AI ANSWER ===\nI don't know the answer to that based on the documents.\n=================\n"
    ));
}

#[test]
fn console_runs_without_aws_credentials() {
    let tmp = setup_test_env();
    fs::write(tmp.path().join("notes.pdf"), build_pdf(&[SHORT_PAGE])).unwrap();

    let out = run(tmp.path(), &[], "What is osmosis?\nexit\n");
    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);

    assert!(out.status.success(), "stderr: {}", stderr);
    assert!(stdout.starts_with("--- INITIALIZING SYSTEMS ---"));
    assert!(stdout.contains("Ingestion Complete."));
    assert!(stdout.contains(
        "=== AI ANSWER ===\nI don't know the answer to that based on the documents.\n=================\n"
    ));
    assert!(stderr.contains("AWS credentials unavailable"));
}

#[test]
fn console_stops_at_end_of_input() {
    let tmp = setup_test_env();
    let out = run(tmp.path(), &[], "");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.matches("Ask a question: ").count(), 1);
}

#[test]
fn console_ingests_pdf_without_informative_pages() {
    let tmp = setup_test_env();
    fs::write(tmp.path().join("notes.pdf"), build_pdf(&[SHORT_PAGE])).unwrap();

    let out = run(tmp.path(), &[], "exit\n");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("Reading "));
    assert!(stdout.contains("Memorizing 0 pages..."));
    assert!(stdout.contains("Ingestion Complete."));
}

#[test]
fn ask_prints_fallback_for_empty_store() {
    let tmp = setup_test_env();
    let out = run(tmp.path(), &["ask", "what", "is", "osmosis?"], "");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("I don't know the answer to that based on the documents."));
}

#[test]
fn ingest_missing_file_fails() {
    let tmp = setup_test_env();
    let out = run(tmp.path(), &["ingest", "missing.pdf"], "");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Could not find"));
}

#[test]
fn ingest_reports_counts() {
    let tmp = setup_test_env();
    let pdf = tmp.path().join("cover.pdf");
    fs::write(&pdf, build_pdf(&[SHORT_PAGE, SHORT_PAGE])).unwrap();

    let out = run(tmp.path(), &["ingest", pdf.to_str().unwrap()], "");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("Ingested cover.pdf: 2 pages read, 0 stored in 'university_knowledge'."));
}

#[test]
fn missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();
    let out = Command::new(pagechat_binary())
        .args(["--config", "/nonexistent/pagechat.toml", "ask", "hi"])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to read config file"));
}
