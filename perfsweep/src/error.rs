//! Error types for the perfsweep library.

use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// A required option was absent from both the parameter set and the
    /// fixed configuration.
    MissingOption(String),
    /// A parameter set carries a parameter with no command-line binding.
    UnboundParameter(String),
    /// A binding sets both or neither of `flag` and `extra_input`.
    InvalidBinding(String),
    /// A fixed extra input is not of the form `key:value`.
    InvalidExtraInput(String),
    /// A grid declaration could not be expanded.
    InvalidGrid(String),
    /// A results log line could not be decoded.
    ResultsLog {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingOption(name) => write!(f, "missing required option '{name}'"),
            Error::UnboundParameter(name) => {
                write!(f, "parameter '{name}' has no command-line binding")
            }
            Error::InvalidBinding(param) => write!(
                f,
                "binding for '{param}' must set exactly one of flag or extra_input"
            ),
            Error::InvalidExtraInput(raw) => {
                write!(f, "extra input '{raw}' is not of the form key:value")
            }
            Error::InvalidGrid(msg) => write!(f, "invalid grid: {msg}"),
            Error::ResultsLog { path, line, .. } => {
                write!(f, "malformed results log {} at line {}", path.display(), line)
            }
            Error::Io(_) => f.write_str("i/o error"),
            Error::Json(_) => f.write_str("json encoding error"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ResultsLog { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl Error {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingOption(name.into())
    }

    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }
}
