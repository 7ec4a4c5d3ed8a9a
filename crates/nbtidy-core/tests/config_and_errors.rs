use std::error::Error;
use std::fs;

use nbtidy_core::{AlignmentPolicy, Config, ErrorInfo, NbError, RunFailure};
use tempfile::tempdir;

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("cell", "2")
        .with_hint("check the notebook")
}

#[test]
fn empty_config_uses_defaults() {
    let config = Config::from_yaml_str("{}").expect("parses");
    assert_eq!(config, Config::default());
    assert_eq!(config.alignment, AlignmentPolicy::Defer);
    assert_eq!(config.engine.program, "papermill");
    assert!(config.marker_set().contains("papermill-error-cell-tag"));
}

#[test]
fn config_file_round_trip() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nbtidy.yaml");
    fs::write(
        &path,
        "marker_tags: [engine-banner]\nalignment: abort\nengine:\n  program: /opt/bin/runner\n  args: [--log-output]\n",
    )
    .expect("write config");
    let config = Config::load(&path).expect("loads");
    assert_eq!(config.alignment, AlignmentPolicy::Abort);
    assert_eq!(config.engine.program, "/opt/bin/runner");
    assert_eq!(config.engine.args, vec!["--log-output".to_string()]);
    let markers = config.marker_set();
    assert!(markers.contains("engine-banner"));
    assert!(markers.contains("injected-parameters"));
}

#[test]
fn bad_config_surfaces_serde_error() {
    let err = Config::from_yaml_str("alignment: sometimes").expect_err("unknown policy");
    assert!(matches!(err, NbError::Serde(_)));
    assert_eq!(err.info().code, "nbtidy.config_parse");

    let missing = Config::load(std::path::Path::new("/nonexistent/nbtidy.yaml")).expect_err("missing");
    assert!(matches!(missing, NbError::Io(_)));
}

#[test]
fn error_display_includes_context_and_hint() {
    let err = NbError::Alignment(sample_info("nbtidy.align.source_mismatch", "cell 2 differs"));
    assert_eq!(
        err.to_string(),
        "alignment failed: cell 2 differs (code: nbtidy.align.source_mismatch) | context: [cell=2] | hint: check the notebook"
    );
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = NbError::Execution(ErrorInfo::new("nbtidy.engine.exit", "exit status 1"));
    let value = serde_json::to_value(&err).expect("serializes");
    assert_eq!(value["family"], "Execution");
    assert_eq!(value["detail"]["code"], "nbtidy.engine.exit");
    let back: NbError = serde_json::from_value(value).expect("deserializes");
    assert_eq!(back, err);
}

#[test]
fn run_failure_keeps_first_secondary() {
    let primary = NbError::Execution(ErrorInfo::new("nbtidy.engine.exit", "exit status 1"));
    let first = NbError::Alignment(ErrorInfo::new("nbtidy.align.extra_cells", "extra"));
    let second = NbError::Alignment(ErrorInfo::new("nbtidy.align.marker_tags", "tags"));
    let failure = RunFailure::new(primary.clone()).attach(first.clone()).attach(second);
    assert_eq!(failure.primary, primary);
    assert_eq!(failure.secondary.as_deref(), Some(&first));
    assert!(failure.source().is_some());

    let alone = RunFailure::combine(None, first.clone());
    assert_eq!(alone.primary, first);
    assert!(alone.source().is_none());
}
