#![deny(missing_docs)]
#![doc = "Post-execution reconciliation of notebook documents: stream output merging, metadata cleaning, cell alignment and execution-count renumbering."]

/// Pre/post cell alignment.
pub mod align;
/// Engine bookkeeping removal.
pub mod clean;
/// YAML run configuration.
pub mod config;
/// Structured errors.
pub mod errors;
/// Stream output merging.
pub mod merge;
/// Typed notebook document model.
pub mod model;
/// Engine parameter parsing.
pub mod params;
/// Execute-then-reconcile pipeline.
pub mod pipeline;
/// Execution count renumbering.
pub mod renumber;
/// Notebook JSON reading and writing.
pub mod serde;
/// Field filtering and cell slicing.
pub mod view;

pub use align::{reconcile_cells, AlignState, Alignment, CellAligner, MarkerTags};
pub use clean::{clean_cell, clean_document, CleanOptions};
pub use config::{AlignmentPolicy, Config, EngineConfig};
pub use errors::{ErrorInfo, NbError, RunFailure};
pub use merge::{merge_cell_outputs, merge_outputs, MergeKeyMismatch, MergeReport};
pub use model::{Cell, CellType, Document, Metadata, MultilineText, Output, OutputType};
pub use params::{parse_parameter, parse_parameters, Parameters};
pub use pipeline::{
    postprocess, run_pipeline, EngineOptions, EngineOutcome, ExecutionEngine, ExecutionRequest,
    RunOptions, RunOutput,
};
pub use renumber::{renumber, Renumbering};
pub use crate::serde::{from_json_str, to_json_string, JsonStyle};
pub use view::{
    filter_document, parse_cell_type, select_cells, CellProjection, CellSlice, FieldFilter,
    FieldSelection, Projected, Selection,
};
