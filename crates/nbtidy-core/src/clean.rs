use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Cell, Document, TAGS_KEY};

/// Cell metadata keys written by the execution engine.
pub const CELL_BOOKKEEPING_KEYS: [&str; 3] = ["papermill", "execution", "widgets"];

/// Document metadata key written by the execution engine.
pub const DOCUMENT_BOOKKEEPING_KEY: &str = "papermill";

/// Controls identifier and tag handling while cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanOptions {
    /// Keep cell `id` fields.
    #[serde(default)]
    pub keep_ids: bool,
    /// `Some(true)` forces a `tags` key on every cell, `Some(false)` drops
    /// empty `tags`, `None` leaves tags to the alignment step.
    #[serde(default)]
    pub keep_tags: Option<bool>,
}

impl CleanOptions {
    /// Options used by the standalone `clean` command: drop ids and empty tags.
    pub fn strict() -> Self {
        Self {
            keep_ids: false,
            keep_tags: Some(false),
        }
    }
}

/// Removes engine bookkeeping from a single cell.
pub fn clean_cell(cell: &mut Cell, opts: &CleanOptions) {
    if !opts.keep_ids {
        cell.id = None;
    }
    let Some(metadata) = cell.metadata.as_mut() else {
        return;
    };
    for key in CELL_BOOKKEEPING_KEYS {
        metadata.remove(key);
    }
    match opts.keep_tags {
        Some(true) => {
            metadata
                .entry(TAGS_KEY)
                .or_insert_with(|| Value::Array(Vec::new()));
        }
        Some(false) => {
            if matches!(metadata.get(TAGS_KEY), Some(Value::Array(tags)) if tags.is_empty()) {
                metadata.remove(TAGS_KEY);
            }
        }
        None => {}
    }
}

/// Removes engine bookkeeping from every cell and from the document metadata.
pub fn clean_document(doc: &mut Document, opts: &CleanOptions) {
    for cell in &mut doc.cells {
        clean_cell(cell, opts);
    }
    doc.metadata.remove(DOCUMENT_BOOKKEEPING_KEY);
}
