//! Read-only views over cleaned documents: field filtering and cell slicing.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{serde_error, ErrorInfo, NbError};
use crate::model::{Cell, CellType, Document};

/// Per-field choice: `Some(true)` keeps only the chosen fields, `Some(false)`
/// drops a field, `None` has no opinion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    /// Cell `source`.
    pub source: Option<bool>,
    /// Cell `outputs`.
    pub outputs: Option<bool>,
    /// Cell `attachments`.
    pub attachments: Option<bool>,
    /// Document-level `metadata`.
    pub document_metadata: Option<bool>,
    /// Cell `metadata`.
    pub cell_metadata: Option<bool>,
    /// Cell `execution_count`.
    pub execution_count: Option<bool>,
    /// Cell `id`.
    pub cell_id: Option<bool>,
}

/// Resolved set of fields to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct FieldFilter {
    /// "Keep only" mode: cell keys not listed here are dropped too.
    pub only: bool,
    pub source: bool,
    pub outputs: bool,
    pub attachments: bool,
    pub document_metadata: bool,
    pub cell_metadata: bool,
    pub execution_count: bool,
    pub cell_id: bool,
}

impl FieldSelection {
    fn choices(&self) -> [Option<bool>; 7] {
        [
            self.source,
            self.outputs,
            self.attachments,
            self.document_metadata,
            self.cell_metadata,
            self.execution_count,
            self.cell_id,
        ]
    }

    /// Resolves the selection.
    ///
    /// If any field is explicitly kept, only the explicitly kept fields
    /// survive ("keep only" mode). Otherwise every field survives except the
    /// explicitly dropped ones ("drop" mode).
    pub fn resolve(&self) -> FieldFilter {
        let only = self.choices().iter().any(|choice| *choice == Some(true));
        let keep = |choice: Option<bool>| {
            if only {
                choice == Some(true)
            } else {
                choice != Some(false)
            }
        };
        FieldFilter {
            only,
            source: keep(self.source),
            outputs: keep(self.outputs),
            attachments: keep(self.attachments),
            document_metadata: keep(self.document_metadata),
            cell_metadata: keep(self.cell_metadata),
            execution_count: keep(self.execution_count),
            cell_id: keep(self.cell_id),
        }
    }
}

impl FieldFilter {
    fn cell_fields(&self) -> [(&'static str, bool); 6] {
        [
            ("source", self.source),
            ("outputs", self.outputs),
            ("attachments", self.attachments),
            ("metadata", self.cell_metadata),
            ("execution_count", self.execution_count),
            ("id", self.cell_id),
        ]
    }

    fn keeps_cell_key(&self, key: &str) -> bool {
        if key == "cell_type" {
            return true;
        }
        match self.cell_fields().iter().find(|(name, _)| *name == key) {
            Some((_, kept)) => *kept,
            None => !self.only,
        }
    }
}

/// Produces a copy of `doc` with the filtered fields removed.
///
/// `cell_type` is always kept. Unmodelled cell keys survive in drop mode
/// only. A dropped document metadata becomes `{}`.
pub fn filter_document(doc: &Document, filter: &FieldFilter) -> Result<Value, NbError> {
    let mut value = serde_json::to_value(doc).map_err(|err| serde_error("nbtidy.view_serialize", err))?;
    if let Some(Value::Array(cells)) = value.get_mut("cells") {
        for cell in cells.iter_mut().filter_map(Value::as_object_mut) {
            cell.retain(|key, _| filter.keeps_cell_key(key));
        }
    }
    if !filter.document_metadata {
        if let Some(metadata) = value.get_mut("metadata") {
            *metadata = Value::Object(Map::new());
        }
    }
    Ok(value)
}

/// Parses a cell type name or its abbreviation (`c`, `m`/`md`, `r`).
pub fn parse_cell_type(name: &str) -> Result<CellType, NbError> {
    match name {
        "c" | "code" => Ok(CellType::Code),
        "m" | "md" | "markdown" => Ok(CellType::Markdown),
        "r" | "raw" => Ok(CellType::Raw),
        other => Err(NbError::Usage(
            ErrorInfo::new("nbtidy.cell_type", format!("unrecognized cell type: {other}"))
                .with_hint("use code/markdown/raw or c/m/md/r"),
        )),
    }
}

/// A cell index (`3`, `-1`) or a half-open range (`1:4`, `:2`, `-2:`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellSlice {
    /// A single cell; negative values count from the end.
    Index(i64),
    /// A range with optional bounds, clamped like a Python slice.
    Range(Option<i64>, Option<i64>),
}

impl FromStr for CellSlice {
    type Err = NbError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bad = || {
            NbError::Usage(ErrorInfo::new(
                "nbtidy.cell_slice",
                format!("unrecognized <cells slice>: {text}"),
            ))
        };
        let bound = |part: &str| -> Result<Option<i64>, NbError> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse().map(Some).map_err(|_| bad())
            }
        };
        let pieces: Vec<&str> = text.split(':').collect();
        match pieces.as_slice() {
            [single] => single.trim().parse().map(CellSlice::Index).map_err(|_| bad()),
            [start, end] => Ok(CellSlice::Range(bound(start)?, bound(end)?)),
            _ => Err(bad()),
        }
    }
}

fn clamp(bound: i64, len: usize) -> usize {
    let len = len as i64;
    let idx = if bound < 0 { bound + len } else { bound };
    idx.clamp(0, len) as usize
}

/// Cells selected by type and slice.
#[derive(Debug, Clone)]
pub enum Selection<'a> {
    /// A single cell.
    One(&'a Cell),
    /// Any number of cells.
    Many(Vec<&'a Cell>),
}

/// Filters cells by type, then applies the slice.
pub fn select_cells<'a>(
    cells: &'a [Cell],
    cell_type: Option<CellType>,
    slice: CellSlice,
) -> Result<Selection<'a>, NbError> {
    let candidates: Vec<&Cell> = cells
        .iter()
        .filter(|cell| cell_type.map_or(true, |kind| cell.cell_type == kind))
        .collect();
    let len = candidates.len();
    match slice {
        CellSlice::Index(idx) => {
            let resolved = if idx < 0 { idx + len as i64 } else { idx };
            if resolved < 0 || resolved >= len as i64 {
                return Err(NbError::Usage(
                    ErrorInfo::new("nbtidy.cell_index", format!("cell index {idx} out of range"))
                        .with_context("cells", len.to_string()),
                ));
            }
            Ok(Selection::One(candidates[resolved as usize]))
        }
        CellSlice::Range(start, end) => {
            let start = start.map_or(0, |bound| clamp(bound, len));
            let end = end.map_or(len, |bound| clamp(bound, len));
            let picked = if start < end {
                candidates[start..end].to_vec()
            } else {
                Vec::new()
            };
            Ok(Selection::Many(picked))
        }
    }
}

/// Which cell keys to show when printing cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellProjection {
    /// Cell `metadata`.
    pub metadata: Option<bool>,
    /// Cell `outputs`.
    pub outputs: Option<bool>,
    /// Cell `source`; shown alone it prints as raw text.
    pub source: Option<bool>,
}

/// A projected cell: raw source text or a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Projected {
    /// Joined source, printed verbatim.
    Source(String),
    /// Anything else, printed as JSON.
    Json(Value),
}

impl Projected {
    /// Converts to a JSON value (source text becomes a JSON string).
    pub fn into_value(self) -> Value {
        match self {
            Projected::Source(text) => Value::String(text),
            Projected::Json(value) => value,
        }
    }
}

impl CellProjection {
    fn flags(&self) -> [(&'static str, Option<bool>); 3] {
        [
            ("metadata", self.metadata),
            ("outputs", self.outputs),
            ("source", self.source),
        ]
    }

    /// Projects one cell.
    ///
    /// Several kept keys yield an object with just those keys; a single kept
    /// key yields its bare value (joined text for `source`); otherwise the
    /// cell minus any dropped keys.
    pub fn project(&self, cell: &Cell) -> Result<Projected, NbError> {
        let value = serde_json::to_value(cell).map_err(|err| serde_error("nbtidy.view_serialize", err))?;
        let Value::Object(map) = value else {
            return Ok(Projected::Json(value));
        };
        let kept: Vec<&str> = self
            .flags()
            .iter()
            .filter(|(_, flag)| *flag == Some(true))
            .map(|(key, _)| *key)
            .collect();
        match kept.as_slice() {
            [] => {
                let dropped: Vec<&str> = self
                    .flags()
                    .iter()
                    .filter(|(_, flag)| *flag == Some(false))
                    .map(|(key, _)| *key)
                    .collect();
                let map = map
                    .into_iter()
                    .filter(|(key, _)| !dropped.contains(&key.as_str()))
                    .collect();
                Ok(Projected::Json(Value::Object(map)))
            }
            ["source"] => Ok(Projected::Source(cell.source.joined().into_owned())),
            [key] => Ok(Projected::Json(map.get(*key).cloned().unwrap_or(Value::Null))),
            keys => {
                let map = map
                    .into_iter()
                    .filter(|(key, _)| keys.contains(&key.as_str()))
                    .collect();
                Ok(Projected::Json(Value::Object(map)))
            }
        }
    }

    /// Projects a selection; many cells become a JSON array.
    pub fn project_selection(&self, selection: &Selection<'_>) -> Result<Projected, NbError> {
        match selection {
            Selection::One(cell) => self.project(cell),
            Selection::Many(cells) => {
                let values = cells
                    .iter()
                    .map(|cell| self.project(cell).map(Projected::into_value))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Projected::Json(Value::Array(values)))
            }
        }
    }
}
