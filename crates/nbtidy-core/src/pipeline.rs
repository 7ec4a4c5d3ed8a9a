//! Execute-then-reconcile pipeline.
//!
//! The engine runs the pre-execution document and hands back a
//! post-execution document (possibly partial). The post document then has
//! its stream outputs merged, its cells aligned against the pre document
//! and its bookkeeping metadata removed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::align::{reconcile_cells, MarkerTags};
use crate::clean::{clean_document, CleanOptions};
use crate::config::{AlignmentPolicy, Config};
use crate::errors::{NbError, RunFailure};
use crate::merge::{merge_outputs, MergeReport};
use crate::model::Document;
use crate::params::Parameters;

/// Knobs forwarded to the execution engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Ask the engine to save the notebook after each cell.
    #[serde(default)]
    pub request_save_on_cell_execute: Option<bool>,
    /// Ask the engine to autosave at most every `n` seconds.
    #[serde(default)]
    pub autosave_cell_every: Option<u64>,
}

/// Everything the engine needs to execute one notebook.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    /// Where the pre-execution document was read from, if anywhere.
    pub notebook_path: Option<&'a Path>,
    /// Pre-execution document.
    pub document: &'a Document,
    /// Parameters injected by the engine.
    pub parameters: &'a Parameters,
    /// Engine knobs.
    pub options: EngineOptions,
}

/// Result of an engine run that produced a document.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// Every cell ran.
    Completed(Document),
    /// The engine stopped early but wrote a partial document.
    Failed {
        /// Partial post-execution document.
        document: Document,
        /// Why execution stopped.
        error: NbError,
    },
}

/// Executes notebooks.
///
/// Returning `Err` means no post-execution document exists at all; the
/// pipeline surfaces such errors immediately.
pub trait ExecutionEngine {
    /// Runs the request's document and returns the post-execution document.
    fn execute(&self, request: &ExecutionRequest<'_>) -> Result<EngineOutcome, NbError>;
}

/// Post-processing settings for [`run_pipeline`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Cleaning behaviour; `keep_tags: None` enables alignment.
    pub clean: CleanOptions,
    /// Tags identifying engine-inserted cells.
    pub markers: MarkerTags,
    /// Alignment failure handling when execution succeeded.
    pub alignment: AlignmentPolicy,
}

impl RunOptions {
    /// Builds options from a loaded configuration.
    pub fn from_config(config: &Config, clean: CleanOptions) -> Self {
        Self {
            clean,
            markers: config.marker_set(),
            alignment: config.alignment,
        }
    }
}

/// Document produced by a pipeline run, with any deferred failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Post-processed document.
    pub document: Document,
    /// Failure to report after the document has been written.
    pub failure: Option<RunFailure>,
    /// Stream merge diagnostics.
    pub merge: MergeReport,
}

impl RunOutput {
    /// Splits into the document and a `Result` for the deferred failure.
    pub fn into_parts(self) -> (Document, Result<(), RunFailure>) {
        let result = match self.failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        };
        (self.document, result)
    }
}

/// Runs the engine and post-processes its output.
pub fn run_pipeline(
    engine: &dyn ExecutionEngine,
    request: &ExecutionRequest<'_>,
    opts: &RunOptions,
) -> Result<RunOutput, RunFailure> {
    tracing::debug!(
        cells = request.document.cells.len(),
        parameters = request.parameters.len(),
        "executing notebook"
    );
    let (post, pending) = match engine.execute(request)? {
        EngineOutcome::Completed(document) => (document, None),
        EngineOutcome::Failed { document, error } => {
            tracing::warn!(%error, "execution failed; post-processing partial document");
            (document, Some(RunFailure::new(error)))
        }
    };
    postprocess(request.document, post, pending, opts)
}

/// Merges, aligns and cleans a post-execution document.
///
/// `pending` is an execution failure already observed; it stays the primary
/// failure and any alignment error is attached behind it.
pub fn postprocess(
    pre: &Document,
    mut post: Document,
    pending: Option<RunFailure>,
    opts: &RunOptions,
) -> Result<RunOutput, RunFailure> {
    let merge = merge_outputs(&mut post);
    tracing::debug!(merged = merge.merged, mismatches = merge.mismatches.len(), "merged stream outputs");

    let mut failure = pending;
    if opts.clean.keep_tags.is_none() {
        match reconcile_cells(&pre.cells, &mut post.cells, &opts.markers) {
            Ok(alignment) => {
                tracing::debug!(
                    pairs = alignment.pairs.len(),
                    skipped = alignment.skipped.len(),
                    repaired = alignment.repaired.len(),
                    "aligned cells"
                );
            }
            Err(err) => {
                tracing::warn!(%err, "cell alignment failed");
                if failure.is_none() && opts.alignment == AlignmentPolicy::Abort {
                    return Err(RunFailure::new(err));
                }
                failure = Some(RunFailure::combine(failure, err));
            }
        }
    }

    clean_document(&mut post, &opts.clean);
    Ok(RunOutput {
        document: post,
        failure,
        merge,
    })
}
