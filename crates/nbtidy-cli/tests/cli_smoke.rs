use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::{json, Value};
use tempfile::tempdir;

const NOTEBOOK: &str = r##"{
 "cells": [
  {
   "cell_type": "markdown",
   "id": "m0",
   "metadata": {},
   "source": "# Title"
  },
  {
   "cell_type": "code",
   "execution_count": 5,
   "id": "c1",
   "metadata": {
    "papermill": {
     "status": "completed"
    },
    "tags": []
   },
   "outputs": [
    {
     "name": "stdout",
     "output_type": "stream",
     "text": "a\n"
    },
    {
     "name": "stdout",
     "output_type": "stream",
     "text": "b\n"
    }
   ],
   "source": "print('a'); print('b')"
  }
 ],
 "metadata": {
  "papermill": {
   "parameters": {}
  }
 },
 "nbformat": 4,
 "nbformat_minor": 5
}
"##;

fn nbtidy(args: &[&str], stdin: Option<&str>) -> Output {
    nbtidy_with_env(args, stdin, &[])
}

fn nbtidy_with_env(args: &[&str], stdin: Option<&str>, env: &[(&str, &str)]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_nbtidy"))
        .args(args)
        .env_remove("RUST_LOG")
        .envs(env.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn nbtidy");
    {
        let mut pipe = child.stdin.take().expect("stdin");
        // Commands that fail before reading stdin close the pipe early.
        let _ = pipe.write_all(stdin.unwrap_or("").as_bytes());
    }
    child.wait_with_output().expect("wait for nbtidy")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn write_notebook(dir: &Path) -> String {
    let path = dir.join("nb.ipynb");
    fs::write(&path, NOTEBOOK).expect("write notebook");
    path.display().to_string()
}

#[test]
fn merge_outputs_reads_stdin_and_keeps_layout() {
    let output = nbtidy(&["merge-outputs"], Some(NOTEBOOK));
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = String::from_utf8(output.stdout.clone()).expect("utf8");
    assert!(text.starts_with("{\n \"cells\": [\n"));
    assert!(text.ends_with("}\n"));
    let value = stdout_json(&output);
    assert_eq!(
        value["cells"][1]["outputs"],
        json!([{"name": "stdout", "output_type": "stream", "text": "a\nb\n"}])
    );
}

#[test]
fn renumber_in_place_reports_changes() {
    let dir = tempdir().expect("tempdir");
    let path = write_notebook(dir.path());
    let output = nbtidy(&["renumber", "-i", &path], None);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(".cells[1].execution_count: 5 → 1"), "{stderr}");
    let value: Value = serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(value["cells"][1]["execution_count"], json!(1));

    let quiet = nbtidy(&["renumber", "-q", &path], None);
    assert!(quiet.stderr.is_empty());
}

#[test]
fn clean_drops_bookkeeping_ids_and_empty_tags() {
    let output = nbtidy(&["clean", "-n", "2", "-T"], Some(NOTEBOOK));
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout.clone()).expect("utf8");
    assert!(text.starts_with("{\n  \"cells\""));
    assert!(text.ends_with('}'));
    let value = stdout_json(&output);
    assert!(value["metadata"].get("papermill").is_none());
    assert!(value["cells"][1].get("id").is_none());
    assert_eq!(value["cells"][1]["metadata"], json!({}));

    let kept = nbtidy(&["clean", "-I", "-k"], Some(NOTEBOOK));
    let value = stdout_json(&kept);
    assert_eq!(value["cells"][0]["id"], json!("m0"));
    assert_eq!(value["cells"][0]["metadata"], json!({"tags": []}));
}

#[test]
fn fmt_keeps_only_sources() {
    let output = nbtidy(&["fmt", "-s"], Some(NOTEBOOK));
    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["cells"][1], json!({"cell_type": "code", "source": "print('a'); print('b')"}));
    assert_eq!(value["metadata"], json!({}));
}

#[test]
fn cells_prints_raw_source_and_json_slices() {
    let output = nbtidy(&["cells", "-s", "-1"], Some(NOTEBOOK));
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "print('a'); print('b')\n");

    let output = nbtidy(&["cells", "-t", "md", "-M", "0:"], Some(NOTEBOOK));
    let value = stdout_json(&output);
    assert_eq!(value, json!([{"cell_type": "markdown", "id": "m0", "source": "# Title"}]));
}

#[test]
fn conflicting_output_options_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = write_notebook(dir.path());
    let out = dir.path().join("out.ipynb").display().to_string();

    let both = nbtidy(&["clean", &path, &out, "-o", &out], None);
    assert!(!both.status.success());
    assert!(String::from_utf8_lossy(&both.stderr).contains("nbtidy.out_path_conflict"));

    let in_place_with_out = nbtidy(&["clean", "-i", &path, "-o", &out], None);
    assert!(!in_place_with_out.status.success());

    let in_place_stdin = nbtidy(&["clean", "-i"], Some(NOTEBOOK));
    assert!(!in_place_stdin.status.success());
    assert!(String::from_utf8_lossy(&in_place_stdin.stderr).contains("nbtidy.in_place_stdin"));
}

#[test]
fn compact_input_written_to_a_new_file_gets_default_indent() {
    let dir = tempdir().expect("tempdir");
    let compact = r#"{"cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5}"#;
    let out = dir.path().join("out.ipynb");
    let output = nbtidy(&["clean", "-", &out.display().to_string()], Some(compact));
    assert!(output.status.success());
    let written = fs::read_to_string(&out).expect("read output");
    assert_eq!(written, "{\n \"cells\": [],\n \"metadata\": {},\n \"nbformat\": 4,\n \"nbformat_minor\": 5\n}");
}

#[cfg(unix)]
fn engine_config(dir: &Path, exit_code: i32) -> String {
    let path = dir.join(format!("engine-{exit_code}.yaml"));
    let script = format!("cp \"$0\" \"$1\"; exit {exit_code}");
    let config = json!({
        "engine": {"program": "sh", "args": ["-c", script]},
    });
    // JSON is valid YAML.
    fs::write(&path, config.to_string()).expect("write config");
    path.display().to_string()
}

#[cfg(unix)]
#[test]
fn run_with_successful_engine_cleans_output() {
    let dir = tempdir().expect("tempdir");
    let path = write_notebook(dir.path());
    let config = engine_config(dir.path(), 0);
    let output = nbtidy(&["--config", &config, "run", &path, "-p", "n=3"], None);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let value = stdout_json(&output);
    assert!(value["metadata"].get("papermill").is_none());
    assert_eq!(value["cells"][1]["outputs"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["cells"][1]["metadata"], json!({"tags": []}));
}

#[cfg(unix)]
#[test]
fn run_with_failing_engine_writes_document_then_fails() {
    let dir = tempdir().expect("tempdir");
    let path = write_notebook(dir.path());
    let out = dir.path().join("out.ipynb");
    let config = engine_config(dir.path(), 3);
    let output = nbtidy(
        &["--config", &config, "run", &path, "-o", &out.display().to_string()],
        None,
    );
    assert!(!output.status.success());
    assert!(out.exists(), "partial document is written");
    assert!(String::from_utf8_lossy(&output.stderr).contains("nbtidy.engine.exit"));
}

#[test]
fn bad_parameter_is_a_usage_error() {
    let dir = tempdir().expect("tempdir");
    let path = write_notebook(dir.path());
    let output = nbtidy(&["run", &path, "-p", "novalue"], None);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nbtidy.param_format"));
}

#[test]
fn rust_log_controls_logging_without_verbose() {
    let dir = tempdir().expect("tempdir");
    let path = write_notebook(dir.path());

    let quiet = nbtidy(&["merge-outputs", &path], None);
    assert!(quiet.status.success());
    assert!(quiet.stderr.is_empty(), "{}", String::from_utf8_lossy(&quiet.stderr));

    let logged = nbtidy_with_env(&["merge-outputs", &path], None, &[("RUST_LOG", "debug")]);
    assert!(logged.status.success());
    assert!(String::from_utf8_lossy(&logged.stderr).contains("loaded notebook"));

    let verbose = nbtidy(&["-v", "merge-outputs", &path], None);
    assert!(String::from_utf8_lossy(&verbose.stderr).contains("loaded notebook"));
}
