use std::cell::RefCell;

use nbtidy_core::model::{Cell, Document, Output};
use nbtidy_core::{
    postprocess, run_pipeline, AlignmentPolicy, CleanOptions, EngineOptions, EngineOutcome,
    ErrorInfo, ExecutionEngine, ExecutionRequest, MarkerTags, NbError, Parameters, RunFailure,
    RunOptions,
};
use serde_json::json;

struct FakeEngine {
    outcome: Result<EngineOutcome, NbError>,
    seen: RefCell<Vec<Parameters>>,
}

impl FakeEngine {
    fn new(outcome: Result<EngineOutcome, NbError>) -> Self {
        Self {
            outcome,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl ExecutionEngine for FakeEngine {
    fn execute(&self, request: &ExecutionRequest<'_>) -> Result<EngineOutcome, NbError> {
        self.seen.borrow_mut().push(request.parameters.clone());
        self.outcome.clone()
    }
}

fn pre_document() -> Document {
    Document::new(vec![
        Cell::code("n = 1").with_tags(&["parameters"]),
        Cell::code("print(n); print(n)"),
    ])
}

fn executed(second_source: &str) -> Document {
    let mut doc = Document::new(vec![
        Cell::code("n = 1")
            .with_tags(&["parameters"])
            .with_execution_count(Some(1)),
        Cell::code("# Parameters\nn = 2\n")
            .with_tags(&["injected-parameters"])
            .with_execution_count(Some(2)),
        Cell::code(second_source)
            .with_tags(&[])
            .with_execution_count(Some(3))
            .with_outputs(vec![Output::stream("stdout", "2\n"), Output::stream("stdout", "2\n")]),
    ]);
    for cell in &mut doc.cells {
        if let Some(metadata) = cell.metadata.as_mut() {
            metadata.insert("papermill".to_string(), json!({"status": "completed"}));
        }
    }
    doc.metadata.insert("papermill".to_string(), json!({"parameters": {"n": 2}}));
    doc
}

fn execution_error() -> NbError {
    NbError::Execution(ErrorInfo::new("nbtidy.engine.exit", "kernel died"))
}

fn request<'a>(doc: &'a Document, params: &'a Parameters) -> ExecutionRequest<'a> {
    ExecutionRequest {
        notebook_path: None,
        document: doc,
        parameters: params,
        options: EngineOptions::default(),
    }
}

#[test]
fn successful_run_merges_aligns_and_cleans() {
    let pre = pre_document();
    let mut params = Parameters::new();
    params.insert("n".to_string(), json!(2));
    let engine = FakeEngine::new(Ok(EngineOutcome::Completed(executed("print(n); print(n)"))));
    let output = run_pipeline(&engine, &request(&pre, &params), &RunOptions::default())
        .expect("pipeline succeeds");
    assert!(output.failure.is_none());
    assert_eq!(output.merge.merged, 1);
    let doc = output.document;
    assert!(!doc.metadata.contains_key("papermill"));
    assert_eq!(doc.cells.len(), 3);
    assert!(!doc.cells[2].has_tags_key());
    assert_eq!(doc.cells[0].tags(), vec!["parameters"]);
    assert!(doc.cells.iter().all(|cell| {
        cell.metadata
            .as_ref()
            .map_or(true, |md| !md.contains_key("papermill"))
    }));
    let outputs = doc.cells[2].outputs.as_ref().expect("outputs");
    assert_eq!(outputs.len(), 1);
    assert_eq!(engine.seen.borrow()[0].get("n"), Some(&json!(2)));
}

#[test]
fn execution_failure_stays_primary_with_alignment_attached() {
    let pre = pre_document();
    let params = Parameters::new();
    let engine = FakeEngine::new(Ok(EngineOutcome::Failed {
        document: executed("print(n) # edited"),
        error: execution_error(),
    }));
    let output = run_pipeline(&engine, &request(&pre, &params), &RunOptions::default())
        .expect("document produced");
    let failure = output.failure.expect("failure recorded");
    assert!(matches!(failure.primary, NbError::Execution(_)));
    let secondary = failure.secondary.as_deref().expect("alignment attached");
    assert!(matches!(secondary, NbError::Alignment(_)));
    assert_eq!(secondary.info().code, "nbtidy.align.source_mismatch");
    let source = std::error::Error::source(&failure).expect("source exposed");
    assert!(source.to_string().contains("alignment failed"));
}

#[test]
fn execution_failure_without_alignment_problem_has_no_secondary() {
    let pre = pre_document();
    let params = Parameters::new();
    let engine = FakeEngine::new(Ok(EngineOutcome::Failed {
        document: executed("print(n); print(n)"),
        error: execution_error(),
    }));
    let output = run_pipeline(&engine, &request(&pre, &params), &RunOptions::default())
        .expect("document produced");
    let failure = output.failure.expect("failure recorded");
    assert!(failure.secondary.is_none());
    assert_eq!(failure.to_string(), execution_error().to_string());
}

#[test]
fn deferred_alignment_failure_keeps_document() {
    let pre = pre_document();
    let params = Parameters::new();
    let engine = FakeEngine::new(Ok(EngineOutcome::Completed(executed("changed"))));
    let output = run_pipeline(&engine, &request(&pre, &params), &RunOptions::default())
        .expect("document produced");
    let failure = output.failure.expect("alignment failure deferred");
    assert!(matches!(failure.primary, NbError::Alignment(_)));
    assert!(!output.document.metadata.contains_key("papermill"));
}

#[test]
fn abort_policy_returns_alignment_error_alone() {
    let pre = pre_document();
    let params = Parameters::new();
    let engine = FakeEngine::new(Ok(EngineOutcome::Completed(executed("changed"))));
    let opts = RunOptions {
        alignment: AlignmentPolicy::Abort,
        ..RunOptions::default()
    };
    let failure = run_pipeline(&engine, &request(&pre, &params), &opts).expect_err("aborted");
    assert!(matches!(failure.primary, NbError::Alignment(_)));
    assert!(failure.secondary.is_none());
}

#[test]
fn abort_policy_still_defers_behind_execution_failure() {
    let pre = pre_document();
    let params = Parameters::new();
    let engine = FakeEngine::new(Ok(EngineOutcome::Failed {
        document: executed("changed"),
        error: execution_error(),
    }));
    let opts = RunOptions {
        alignment: AlignmentPolicy::Abort,
        ..RunOptions::default()
    };
    let output = run_pipeline(&engine, &request(&pre, &params), &opts).expect("document produced");
    let failure = output.failure.expect("failure recorded");
    assert!(matches!(failure.primary, NbError::Execution(_)));
    assert!(failure.secondary.is_some());
}

#[test]
fn hard_engine_error_is_surfaced_immediately() {
    let pre = pre_document();
    let params = Parameters::new();
    let engine = FakeEngine::new(Err(NbError::Io(ErrorInfo::new("nbtidy.engine.spawn", "not found"))));
    let failure = run_pipeline(&engine, &request(&pre, &params), &RunOptions::default())
        .expect_err("no document");
    assert!(matches!(failure.primary, NbError::Io(_)));
}

#[test]
fn explicit_tag_mode_skips_alignment() {
    let pre = pre_document();
    let opts = RunOptions {
        clean: CleanOptions {
            keep_ids: false,
            keep_tags: Some(true),
        },
        markers: MarkerTags::default(),
        alignment: AlignmentPolicy::Abort,
    };
    let output = postprocess(&pre, executed("changed"), None, &opts).expect("alignment skipped");
    assert!(output.failure.is_none());
    assert!(output.document.cells.iter().all(|cell| cell.has_tags_key()));
}

#[test]
fn into_parts_splits_document_and_failure() {
    let pre = pre_document();
    let output = postprocess(
        &pre,
        executed("print(n); print(n)"),
        Some(RunFailure::new(execution_error())),
        &RunOptions::default(),
    )
    .expect("document produced");
    let (doc, result) = output.into_parts();
    assert_eq!(doc.cells.len(), 3);
    assert!(result.is_err());
}
