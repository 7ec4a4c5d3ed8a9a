//! Reading notebooks from files or stdin and writing them back.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use nbtidy_core::{from_json_str, to_json_string, Document, ErrorInfo, JsonStyle, NbError};
use serde::Serialize;

/// Input/output options shared by every notebook-rewriting command.
#[derive(Args, Debug, Clone)]
pub struct NotebookArgs {
    /// Input notebook; stdin when absent or `-`.
    #[arg(value_name = "NB_PATH")]
    pub nb_path: Option<PathBuf>,
    /// Output notebook; stdout when absent or `-`.
    #[arg(value_name = "OUT_PATH")]
    pub out_path_arg: Option<PathBuf>,
    /// Write to this file instead of stdout.
    #[arg(short = 'o', long = "out-path", value_name = "PATH")]
    pub out_path: Option<PathBuf>,
    /// Modify NB_PATH in place.
    #[arg(short = 'i', long)]
    pub in_place: bool,
    /// Indentation of the output JSON (default: match the input).
    #[arg(short = 'n', long)]
    pub indent: Option<usize>,
    /// Escape non-ASCII characters in the output JSON.
    #[arg(short = 'a', long)]
    pub ensure_ascii: bool,
    /// Always end the output with a newline.
    #[arg(short = 't', long, overrides_with = "no_trailing_newline")]
    pub trailing_newline: bool,
    /// Never end the output with a newline.
    #[arg(short = 'T', long, overrides_with = "trailing_newline")]
    pub no_trailing_newline: bool,
}

/// A parsed input notebook and the layout it was written with.
#[derive(Debug)]
pub struct LoadedNotebook {
    pub document: Document,
    pub style: JsonStyle,
}

fn usage(code: &str, message: impl Into<String>) -> NbError {
    NbError::Usage(ErrorInfo::new(code, message))
}

fn io_failure(code: &str, path: Option<&Path>, err: io::Error) -> NbError {
    let info = ErrorInfo::new(code, err.to_string());
    NbError::Io(match path {
        Some(path) => info.with_context("path", path.display().to_string()),
        None => info.with_context("path", "-"),
    })
}

/// Treats `-` as "no path" (stdin/stdout).
fn real_path(path: Option<&PathBuf>) -> Option<&Path> {
    path.map(PathBuf::as_path).filter(|path| *path != Path::new("-"))
}

/// Reads a file, or stdin when `path` is `None`.
pub fn read_text(path: Option<&Path>) -> Result<String, NbError> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|err| io_failure("nbtidy.read", Some(path), err)),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|err| io_failure("nbtidy.read", None, err))?;
            Ok(text)
        }
    }
}

impl NotebookArgs {
    /// Input path, `None` for stdin.
    pub fn input_path(&self) -> Option<&Path> {
        real_path(self.nb_path.as_ref())
    }

    fn trailing_newline_choice(&self) -> Option<bool> {
        if self.trailing_newline {
            Some(true)
        } else if self.no_trailing_newline {
            Some(false)
        } else {
            None
        }
    }

    /// Resolves where output goes; `None` is stdout.
    ///
    /// Call before doing any work so conflicting options fail fast.
    pub fn output_target(&self) -> Result<Option<PathBuf>, NbError> {
        if let (Some(positional), Some(option)) = (&self.out_path_arg, &self.out_path) {
            return Err(usage(
                "nbtidy.out_path_conflict",
                format!(
                    "specify -o/--out-path or a second positional argument, not both: {} != {}",
                    positional.display(),
                    option.display()
                ),
            ));
        }
        let out_path = self.out_path_arg.as_ref().or(self.out_path.as_ref());
        if self.in_place {
            if out_path.is_some() {
                return Err(usage("nbtidy.in_place_conflict", "cannot use -i with -o"));
            }
            return match self.input_path() {
                Some(path) => Ok(Some(path.to_path_buf())),
                None => Err(usage(
                    "nbtidy.in_place_stdin",
                    "cannot use -i without an explicit NB_PATH",
                )),
            };
        }
        Ok(real_path(out_path).map(Path::to_path_buf))
    }

    /// Reads and parses the input notebook.
    pub fn load(&self) -> Result<LoadedNotebook, NbError> {
        let text = read_text(self.input_path())?;
        let style = JsonStyle::infer(&text)?.with_overrides(
            self.indent,
            self.trailing_newline_choice(),
            self.ensure_ascii,
        );
        let document = from_json_str(&text)?;
        tracing::debug!(cells = document.cells.len(), indent = ?style.indent, "loaded notebook");
        Ok(LoadedNotebook { document, style })
    }

    /// Writes `value` to `target` (stdout when `None`) with the input's layout.
    ///
    /// A single-line input written to a file takes its indent from the file
    /// being replaced, or the default indent.
    pub fn write<T: Serialize + ?Sized>(
        &self,
        value: &T,
        style: &JsonStyle,
        target: Option<&Path>,
    ) -> Result<(), NbError> {
        match target {
            Some(path) => {
                let existing = if style.indent.is_none() && path.exists() {
                    Some(read_text(Some(path))?)
                } else {
                    None
                };
                let style = style.fill_indent_from(existing.as_deref())?;
                let text = to_json_string(value, &style)?;
                fs::write(path, text).map_err(|err| io_failure("nbtidy.write", Some(path), err))?;
                tracing::debug!(path = %path.display(), "wrote notebook");
                Ok(())
            }
            None => {
                let text = to_json_string(value, style)?;
                write_stdout(&text)
            }
        }
    }
}

/// Writes text to stdout.
pub fn write_stdout(text: &str) -> Result<(), NbError> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|err| io_failure("nbtidy.write", None, err))
}
