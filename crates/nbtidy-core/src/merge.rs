use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Cell, Document, Output};

/// Exact key set of a mergeable stream output.
pub const STREAM_KEYS: [&str; 3] = ["name", "output_type", "text"];

/// A pair of adjacent same-stream outputs left unmerged because of their keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeKeyMismatch {
    /// Index of the cell, when merging a whole document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<usize>,
    /// Index (in the unmerged outputs) of the record that was not folded
    /// into its predecessor.
    pub output: usize,
    /// Stream name shared by the pair.
    pub stream: String,
    /// Keys found on either record beyond [`STREAM_KEYS`].
    pub unexpected: Vec<String>,
    /// Keys of [`STREAM_KEYS`] missing from either record.
    pub missing: Vec<String>,
}

impl fmt::Display for MergeKeyMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cell) = self.cell {
            write!(f, ".cells[{cell}]")?;
        }
        write!(
            f,
            ".outputs[{}]: not merging \"{}\" stream output",
            self.output, self.stream
        )?;
        if !self.unexpected.is_empty() {
            write!(f, "; unexpected keys: {}", self.unexpected.join(", "))?;
        }
        if !self.missing.is_empty() {
            write!(f, "; missing keys: {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}

/// Outcome of merging the outputs of a cell or a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Number of outputs folded into a predecessor.
    pub merged: usize,
    /// Pairs skipped because of unexpected keys.
    pub mismatches: Vec<MergeKeyMismatch>,
}

impl MergeReport {
    fn absorb(&mut self, other: MergeReport) {
        self.merged += other.merged;
        self.mismatches.extend(other.mismatches);
    }
}

/// Merges consecutive same-stream outputs of one cell.
///
/// Cells without an `outputs` key are left untouched.
pub fn merge_cell_outputs(cell: &mut Cell) -> MergeReport {
    merge_cell(cell, None)
}

/// Merges consecutive same-stream outputs in every cell of `doc`.
pub fn merge_outputs(doc: &mut Document) -> MergeReport {
    let mut report = MergeReport::default();
    for (idx, cell) in doc.cells.iter_mut().enumerate() {
        report.absorb(merge_cell(cell, Some(idx)));
    }
    report
}

fn merge_cell(cell: &mut Cell, cell_index: Option<usize>) -> MergeReport {
    let mut report = MergeReport::default();
    let Some(outputs) = cell.outputs.take() else {
        return report;
    };
    let mut merged: Vec<Output> = Vec::with_capacity(outputs.len());
    for (idx, output) in outputs.into_iter().enumerate() {
        if let Some(prev) = merged.last_mut() {
            if continues_run(prev, &output) {
                match key_mismatch(prev, &output) {
                    None => {
                        if let (Some(text), Some(more)) = (prev.text.as_mut(), output.text.as_ref()) {
                            text.append(more);
                        }
                        report.merged += 1;
                        continue;
                    }
                    Some((unexpected, missing)) => {
                        let mismatch = MergeKeyMismatch {
                            cell: cell_index,
                            output: idx,
                            stream: output.stream_name().unwrap_or_default().to_string(),
                            unexpected,
                            missing,
                        };
                        tracing::warn!(%mismatch, "stream outputs left unmerged");
                        report.mismatches.push(mismatch);
                    }
                }
            }
        }
        merged.push(output);
    }
    cell.outputs = Some(merged);
    report
}

fn continues_run(prev: &Output, next: &Output) -> bool {
    if !prev.is_stream() || !next.is_stream() {
        return false;
    }
    matches!((prev.stream_name(), next.stream_name()), (Some(a), Some(b)) if a == b)
}

fn key_mismatch(prev: &Output, next: &Output) -> Option<(Vec<String>, Vec<String>)> {
    let expected: BTreeSet<String> = STREAM_KEYS.iter().map(|key| key.to_string()).collect();
    let mut unexpected = BTreeSet::new();
    let mut missing = BTreeSet::new();
    for output in [prev, next] {
        let keys = output.keys();
        unexpected.extend(keys.difference(&expected).cloned());
        missing.extend(expected.difference(&keys).cloned());
    }
    if unexpected.is_empty() && missing.is_empty() {
        None
    } else {
        Some((unexpected.into_iter().collect(), missing.into_iter().collect()))
    }
}
