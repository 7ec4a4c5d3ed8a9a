//! Structured error types shared across nbtidy crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`NbError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (cell indices, paths, counts, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for notebook processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum NbError {
    /// The document is missing required structure or is not valid JSON.
    #[error("malformed document: {0}")]
    Malformed(ErrorInfo),
    /// The execution engine did not run the notebook to completion.
    #[error("execution failed: {0}")]
    Execution(ErrorInfo),
    /// Pre- and post-execution cells could not be matched.
    #[error("alignment failed: {0}")]
    Alignment(ErrorInfo),
    /// File, pipe or process I/O errors.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and configuration parsing errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Invalid arguments supplied by the caller.
    #[error("usage error: {0}")]
    Usage(ErrorInfo),
}

impl NbError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            NbError::Malformed(info)
            | NbError::Execution(info)
            | NbError::Alignment(info)
            | NbError::Io(info)
            | NbError::Serde(info)
            | NbError::Usage(info) => info,
        }
    }
}

pub(crate) fn serde_error(code: &str, err: impl ToString) -> NbError {
    NbError::Serde(ErrorInfo::new(code, err.to_string()))
}

pub(crate) fn io_error(code: &str, err: impl ToString) -> NbError {
    NbError::Io(ErrorInfo::new(code, err.to_string()))
}

/// Failure surfaced at the end of a pipeline run.
///
/// The primary error is the one the caller should act on. When the engine
/// failed and alignment failed as well, the alignment error rides along as
/// the secondary cause and is reachable through [`std::error::Error::source`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{primary}")]
pub struct RunFailure {
    /// Error reported to the caller.
    pub primary: NbError,
    /// Error observed after the primary one, if any.
    #[source]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<Box<NbError>>,
}

impl RunFailure {
    /// Wraps a single error with no secondary cause.
    pub fn new(primary: NbError) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    /// Records `later` behind the current primary error.
    ///
    /// An existing secondary cause is kept; only the first follow-up error is
    /// retained.
    pub fn attach(mut self, later: NbError) -> Self {
        if self.secondary.is_none() {
            self.secondary = Some(Box::new(later));
        }
        self
    }

    /// Folds `later` into an optional pending failure.
    pub fn combine(pending: Option<RunFailure>, later: NbError) -> RunFailure {
        match pending {
            Some(failure) => failure.attach(later),
            None => RunFailure::new(later),
        }
    }
}

impl From<NbError> for RunFailure {
    fn from(err: NbError) -> Self {
        RunFailure::new(err)
    }
}
