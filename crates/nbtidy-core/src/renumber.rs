use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Document;

/// One rewritten `execution_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renumbering {
    /// Cell index.
    pub cell: usize,
    /// Output index, when the count lives on an output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<usize>,
    /// Count before renumbering.
    pub old: i64,
    /// Count after renumbering.
    pub new: i64,
}

impl fmt::Display for Renumbering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".cells[{}]", self.cell)?;
        if let Some(output) = self.output {
            write!(f, ".outputs[{output}]")?;
        }
        write!(f, ".execution_count: {} → {}", self.old, self.new)
    }
}

/// Renumbers non-null execution counts densely from 1, in document order.
///
/// A cell and its outputs share one number; the counter advances once per
/// cell that held at least one non-null count. Returns every rewrite, in
/// order, whether or not the value actually changed.
pub fn renumber(doc: &mut Document) -> Vec<Renumbering> {
    let mut changes = Vec::new();
    let mut next = 1i64;
    for (cell_idx, cell) in doc.cells.iter_mut().enumerate() {
        let mut found = false;
        if let Some(Some(old)) = cell.execution_count {
            changes.push(Renumbering {
                cell: cell_idx,
                output: None,
                old,
                new: next,
            });
            cell.execution_count = Some(Some(next));
            found = true;
        }
        for (output_idx, output) in cell.outputs.iter_mut().flatten().enumerate() {
            if let Some(Some(old)) = output.execution_count {
                changes.push(Renumbering {
                    cell: cell_idx,
                    output: Some(output_idx),
                    old,
                    new: next,
                });
                output.execution_count = Some(Some(next));
                found = true;
            }
        }
        if found {
            next += 1;
        }
    }
    tracing::debug!(rewritten = changes.len(), cells = next - 1, "renumbered execution counts");
    changes
}
