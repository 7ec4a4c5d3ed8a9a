//! Document (de)serialization with formatting that matches the input.
//!
//! Notebooks are written with the layout Python's `json.dump` produces:
//! `", "`/`": "` separators on a single line when no indent is set, `","`
//! and `": "` with newlines otherwise, and optional `\uXXXX` escaping of
//! every non-ASCII character.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::errors::{serde_error, ErrorInfo, NbError};
use crate::model::Document;

/// Indent used when writing a new file with no other hint.
pub const DEFAULT_INDENT: usize = 1;

/// Layout of a serialized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonStyle {
    /// Spaces per nesting level; `None` writes a single line.
    pub indent: Option<usize>,
    /// Append `\n` after the closing brace.
    pub trailing_newline: bool,
    /// Escape every non-ASCII character.
    pub ensure_ascii: bool,
}

impl Default for JsonStyle {
    fn default() -> Self {
        Self {
            indent: Some(DEFAULT_INDENT),
            trailing_newline: true,
            ensure_ascii: false,
        }
    }
}

impl JsonStyle {
    /// Infers indent and trailing newline from serialized text.
    pub fn infer(text: &str) -> Result<Self, NbError> {
        Ok(Self {
            indent: infer_indent(text)?,
            trailing_newline: infer_trailing_newline(text),
            ensure_ascii: false,
        })
    }

    /// Applies explicit caller choices on top of this style.
    pub fn with_overrides(
        self,
        indent: Option<usize>,
        trailing_newline: Option<bool>,
        ensure_ascii: bool,
    ) -> Self {
        Self {
            indent: indent.or(self.indent),
            trailing_newline: trailing_newline.unwrap_or(self.trailing_newline),
            ensure_ascii,
        }
    }

    /// Fills a missing indent from the file about to be overwritten, falling
    /// back to [`DEFAULT_INDENT`].
    pub fn fill_indent_from(self, existing: Option<&str>) -> Result<Self, NbError> {
        if self.indent.is_some() {
            return Ok(self);
        }
        let inferred = match existing {
            Some(text) => infer_indent(text)?,
            None => None,
        };
        Ok(Self {
            indent: Some(inferred.unwrap_or(DEFAULT_INDENT)),
            ..self
        })
    }
}

/// Infers the indent of a serialized document.
///
/// A document whose opening brace is followed by a newline is indented by
/// the number of spaces starting the next line; any other JSON object is
/// single-line.
pub fn infer_indent(text: &str) -> Result<Option<usize>, NbError> {
    let Some(rest) = text.strip_prefix('{') else {
        let head: String = text.chars().take(30).collect();
        return Err(NbError::Malformed(
            ErrorInfo::new(
                "nbtidy.infer_indent",
                format!("cannot infer indent from non-JSON input beginning with {head:?}"),
            )
            .with_hint("notebooks must be JSON objects"),
        ));
    };
    match rest.strip_prefix('\n') {
        Some(body) => Ok(Some(body.bytes().take_while(|byte| *byte == b' ').count())),
        None => Ok(None),
    }
}

/// Returns true if the text ends with a newline.
pub fn infer_trailing_newline(text: &str) -> bool {
    text.ends_with('\n')
}

/// Parses a notebook document.
pub fn from_json_str(text: &str) -> Result<Document, NbError> {
    serde_json::from_str(text).map_err(|err| {
        NbError::Malformed(
            ErrorInfo::new("nbtidy.json_deserialize", err.to_string())
                .with_context("line", err.line().to_string())
                .with_context("column", err.column().to_string()),
        )
    })
}

/// Serializes any value with the given layout.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T, style: &JsonStyle) -> Result<String, NbError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, NotebookFormatter::new(style));
    value
        .serialize(&mut ser)
        .map_err(|err| serde_error("nbtidy.json_serialize", err))?;
    if style.trailing_newline {
        buf.push(b'\n');
    }
    String::from_utf8(buf).map_err(|err| serde_error("nbtidy.json_utf8", err))
}

struct NotebookFormatter {
    indent: Option<Vec<u8>>,
    ensure_ascii: bool,
    level: usize,
    has_value: bool,
}

impl NotebookFormatter {
    fn new(style: &JsonStyle) -> Self {
        Self {
            indent: style.indent.map(|width| vec![b' '; width]),
            ensure_ascii: style.ensure_ascii,
            level: 0,
            has_value: false,
        }
    }

    fn newline<W: ?Sized + io::Write>(&self, writer: &mut W) -> io::Result<()> {
        if let Some(indent) = &self.indent {
            writer.write_all(b"\n")?;
            for _ in 0..self.level {
                writer.write_all(indent)?;
            }
        }
        Ok(())
    }

    fn open<W: ?Sized + io::Write>(&mut self, writer: &mut W, token: &[u8]) -> io::Result<()> {
        self.level += 1;
        self.has_value = false;
        writer.write_all(token)
    }

    fn close<W: ?Sized + io::Write>(&mut self, writer: &mut W, token: &[u8]) -> io::Result<()> {
        self.level -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(token)
    }

    fn item<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if !first {
            let separator: &[u8] = if self.indent.is_some() { b"," } else { b", " };
            writer.write_all(separator)?;
        }
        self.newline(writer)
    }
}

impl Formatter for NotebookFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.item(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.item(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        if !self.ensure_ascii {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
