//! Execution engine backed by an external program.

use std::fs;
use std::path::Path;
use std::process::Command;

use nbtidy_core::params::render_value;
use nbtidy_core::{
    from_json_str, to_json_string, EngineConfig, EngineOutcome, ErrorInfo, ExecutionEngine,
    ExecutionRequest, JsonStyle, NbError,
};

/// Lines of engine stderr kept in error context.
const STDERR_TAIL: usize = 20;

/// Runs `<program> <args..> <input> <output> -p <name> <value> ...` in a
/// scratch directory and reads the output notebook back.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
}

impl ProcessEngine {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    fn command(&self, request: &ExecutionRequest<'_>, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(input).arg(output).env("PAPERMILL", "1");
        for (name, value) in request.parameters {
            cmd.arg("-p").arg(name).arg(render_value(value));
        }
        if request.options.request_save_on_cell_execute == Some(true) {
            cmd.arg("--request-save-on-cell-execute");
        }
        if let Some(seconds) = request.options.autosave_cell_every {
            cmd.arg("--autosave-cell-every").arg(seconds.to_string());
        }
        cmd
    }
}

fn engine_io(code: &str, err: impl ToString) -> NbError {
    NbError::Io(ErrorInfo::new(code, err.to_string()))
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL);
    lines[start..].join("\n")
}

impl ExecutionEngine for ProcessEngine {
    fn execute(&self, request: &ExecutionRequest<'_>) -> Result<EngineOutcome, NbError> {
        let scratch = tempfile::tempdir().map_err(|err| engine_io("nbtidy.engine.tempdir", err))?;
        let input = match request.notebook_path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = scratch.path().join("in.ipynb");
                let text = to_json_string(request.document, &JsonStyle::default())?;
                fs::write(&path, text).map_err(|err| engine_io("nbtidy.engine.write_input", err))?;
                path
            }
        };
        let output = scratch.path().join("out.ipynb");

        let mut cmd = self.command(request, &input, &output);
        tracing::debug!(program = %self.program, input = %input.display(), "launching execution engine");
        let result = cmd.output().map_err(|err| {
            NbError::Io(
                ErrorInfo::new("nbtidy.engine.spawn", err.to_string())
                    .with_context("program", self.program.clone())
                    .with_hint("set engine.program in the configuration file"),
            )
        })?;
        let stderr = stderr_tail(&result.stderr);
        for line in stderr.lines() {
            tracing::debug!(target: "nbtidy::engine", "{line}");
        }

        let text = match fs::read_to_string(&output) {
            Ok(text) => text,
            Err(err) => {
                return Err(NbError::Execution(
                    ErrorInfo::new(
                        "nbtidy.engine.no_output",
                        format!("engine wrote no output notebook: {err}"),
                    )
                    .with_context("status", result.status.to_string())
                    .with_context("stderr", stderr),
                ))
            }
        };
        let document = from_json_str(&text)?;

        if result.status.success() {
            return Ok(EngineOutcome::Completed(document));
        }
        Ok(EngineOutcome::Failed {
            document,
            error: NbError::Execution(
                ErrorInfo::new(
                    "nbtidy.engine.exit",
                    format!("{} exited with {}", self.program, result.status),
                )
                .with_context("status", result.status.to_string())
                .with_context("stderr", stderr),
            ),
        })
    }
}
