//! Notebook data model.
//!
//! Fields are declared in nbformat's sorted key order so that serializing a
//! parsed notebook reproduces the key order nbformat writes. Keys the model
//! does not know about are kept in `extra` maps and written back unchanged.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata mapping attached to documents, cells and outputs.
pub type Metadata = Map<String, Value>;

/// Metadata key holding a cell's tag list.
pub const TAGS_KEY: &str = "tags";

/// Distinguishes an absent field from an explicit `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Text stored either as one string or as a list of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultilineText {
    /// A single string.
    Text(String),
    /// Lines that concatenate to the full text (each keeps its `\n`).
    Lines(Vec<String>),
}

impl Default for MultilineText {
    fn default() -> Self {
        MultilineText::Text(String::new())
    }
}

impl MultilineText {
    /// Returns the canonical joined text.
    pub fn joined(&self) -> Cow<'_, str> {
        match self {
            MultilineText::Text(text) => Cow::Borrowed(text.as_str()),
            MultilineText::Lines(lines) if lines.len() == 1 => Cow::Borrowed(lines[0].as_str()),
            MultilineText::Lines(lines) => Cow::Owned(lines.concat()),
        }
    }

    /// Compares two texts regardless of representation.
    pub fn same_text(&self, other: &MultilineText) -> bool {
        self.joined() == other.joined()
    }

    /// Appends `other` after this text.
    ///
    /// Line lists extend line lists and strings extend strings; mixing the
    /// two collapses the result into a single string.
    pub fn append(&mut self, other: &MultilineText) {
        match (&mut *self, other) {
            (MultilineText::Text(text), MultilineText::Text(more)) => text.push_str(more),
            (MultilineText::Lines(lines), MultilineText::Lines(more)) => {
                lines.extend(more.iter().cloned())
            }
            (current, more) => {
                let mut text = current.joined().into_owned();
                text.push_str(&more.joined());
                *current = MultilineText::Text(text);
            }
        }
    }
}

impl From<&str> for MultilineText {
    fn from(text: &str) -> Self {
        MultilineText::Text(text.to_string())
    }
}

impl From<String> for MultilineText {
    fn from(text: String) -> Self {
        MultilineText::Text(text)
    }
}

impl From<Vec<String>> for MultilineText {
    fn from(lines: Vec<String>) -> Self {
        MultilineText::Lines(lines)
    }
}

impl fmt::Display for MultilineText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Kind of a notebook cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// Executable code.
    Code,
    /// Markdown prose.
    Markdown,
    /// Raw, uninterpreted text.
    Raw,
}

impl CellType {
    /// Returns the serialized name of the cell type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
            CellType::Raw => "raw",
        }
    }
}

/// Kind of a cell output. Unrecognized kinds are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputType {
    /// Text written to a named stream (stdout/stderr).
    Stream,
    /// The value of the last expression in a cell.
    ExecuteResult,
    /// Rich display output.
    DisplayData,
    /// An exception raised while executing the cell.
    Error,
    /// Any other output type.
    Other(String),
}

impl OutputType {
    /// Returns the serialized name of the output type.
    pub fn as_str(&self) -> &str {
        match self {
            OutputType::Stream => "stream",
            OutputType::ExecuteResult => "execute_result",
            OutputType::DisplayData => "display_data",
            OutputType::Error => "error",
            OutputType::Other(other) => other.as_str(),
        }
    }
}

impl From<String> for OutputType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stream" => OutputType::Stream,
            "execute_result" => OutputType::ExecuteResult,
            "display_data" => OutputType::DisplayData,
            "error" => OutputType::Error,
            _ => OutputType::Other(value),
        }
    }
}

impl From<OutputType> for String {
    fn from(value: OutputType) -> Self {
        match value {
            OutputType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

/// One recorded result of executing a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// MIME bundle for rich outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Exception class name for error outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ename: Option<String>,
    /// Exception message for error outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evalue: Option<String>,
    /// Execution counter of an `execute_result`; `Some(None)` is an explicit null.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_count: Option<Option<i64>>,
    /// Output-level metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Stream name (`stdout`, `stderr`) for stream outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Output kind.
    pub output_type: OutputType,
    /// Stream text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<MultilineText>,
    /// Formatted traceback lines for error outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<Vec<String>>,
    /// Keys not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Output {
    /// Creates an output of the given kind with no other fields.
    pub fn bare(output_type: OutputType) -> Self {
        Self {
            data: None,
            ename: None,
            evalue: None,
            execution_count: None,
            metadata: None,
            name: None,
            output_type,
            text: None,
            traceback: None,
            extra: Map::new(),
        }
    }

    /// Creates a stream output.
    pub fn stream(name: &str, text: impl Into<MultilineText>) -> Self {
        Self {
            name: Some(name.to_string()),
            text: Some(text.into()),
            ..Self::bare(OutputType::Stream)
        }
    }

    /// Creates an `execute_result` output carrying `data`.
    pub fn execute_result(execution_count: Option<i64>, data: Value) -> Self {
        Self {
            data: Some(data),
            execution_count: Some(execution_count),
            metadata: Some(Value::Object(Map::new())),
            ..Self::bare(OutputType::ExecuteResult)
        }
    }

    /// Creates an `error` output.
    pub fn error(ename: &str, evalue: &str, traceback: Vec<String>) -> Self {
        Self {
            ename: Some(ename.to_string()),
            evalue: Some(evalue.to_string()),
            traceback: Some(traceback),
            ..Self::bare(OutputType::Error)
        }
    }

    /// Returns true for stream outputs.
    pub fn is_stream(&self) -> bool {
        self.output_type == OutputType::Stream
    }

    /// Returns the non-empty stream name, if any.
    pub fn stream_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Returns the literal key set this output serializes with.
    pub fn keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        let known = [
            ("data", self.data.is_some()),
            ("ename", self.ename.is_some()),
            ("evalue", self.evalue.is_some()),
            ("execution_count", self.execution_count.is_some()),
            ("metadata", self.metadata.is_some()),
            ("name", self.name.is_some()),
            ("output_type", true),
            ("text", self.text.is_some()),
            ("traceback", self.traceback.is_some()),
        ];
        for (key, is_present) in known {
            if is_present {
                keys.insert(key.to_string());
            }
        }
        keys.extend(self.extra.keys().cloned());
        keys
    }
}

/// One unit of source text with its metadata and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Inline attachments (markdown and raw cells).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Value>,
    /// Cell kind.
    pub cell_type: CellType,
    /// Execution counter of a code cell; `Some(None)` is an explicit null.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_count: Option<Option<i64>>,
    /// Opaque identifier (nbformat 4.5+).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Cell metadata; absent metadata is left absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Recorded outputs (code cells only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Output>>,
    /// Cell source text.
    pub source: MultilineText,
    /// Keys not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    /// Creates a cell with empty metadata and no optional fields.
    pub fn new(cell_type: CellType, source: impl Into<MultilineText>) -> Self {
        Self {
            attachments: None,
            cell_type,
            execution_count: None,
            id: None,
            metadata: Some(Metadata::new()),
            outputs: None,
            source: source.into(),
            extra: Map::new(),
        }
    }

    /// Creates an unexecuted code cell (null count, no outputs).
    pub fn code(source: impl Into<MultilineText>) -> Self {
        Self {
            execution_count: Some(None),
            outputs: Some(Vec::new()),
            ..Self::new(CellType::Code, source)
        }
    }

    /// Creates a markdown cell.
    pub fn markdown(source: impl Into<MultilineText>) -> Self {
        Self::new(CellType::Markdown, source)
    }

    /// Sets the cell's `tags` metadata.
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        let tags = tags.iter().map(|tag| Value::String(tag.to_string())).collect();
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(TAGS_KEY.to_string(), Value::Array(tags));
        self
    }

    /// Sets the execution count.
    pub fn with_execution_count(mut self, count: Option<i64>) -> Self {
        self.execution_count = Some(count);
        self
    }

    /// Replaces the outputs.
    pub fn with_outputs(mut self, outputs: Vec<Output>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Sets the cell identifier.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Returns the raw `tags` value, if the key exists.
    pub fn tags_value(&self) -> Option<&Value> {
        self.metadata.as_ref().and_then(|md| md.get(TAGS_KEY))
    }

    /// Returns true when the metadata carries a `tags` key.
    pub fn has_tags_key(&self) -> bool {
        self.tags_value().is_some()
    }

    /// Returns the string tags of this cell; non-string entries are ignored.
    pub fn tags(&self) -> Vec<&str> {
        match self.tags_value() {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Returns true when `tags` exists and is an empty sequence.
    pub fn has_empty_tags(&self) -> bool {
        matches!(self.tags_value(), Some(Value::Array(items)) if items.is_empty())
    }

    /// Removes the `tags` key, returning its previous value.
    pub fn remove_tags(&mut self) -> Option<Value> {
        self.metadata.as_mut().and_then(|md| md.remove(TAGS_KEY))
    }
}

/// A whole notebook: metadata plus cells in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Cells in execution order.
    pub cells: Vec<Cell>,
    /// Document-level metadata.
    pub metadata: Metadata,
    /// Remaining top-level keys (`nbformat`, `nbformat_minor`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Creates an nbformat 4.5 document holding `cells`.
    pub fn new(cells: Vec<Cell>) -> Self {
        let mut extra = Map::new();
        extra.insert("nbformat".to_string(), Value::from(4));
        extra.insert("nbformat_minor".to_string(), Value::from(5));
        Self {
            cells,
            metadata: Metadata::new(),
            extra,
        }
    }
}
