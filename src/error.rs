use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures surfaced to whoever drives the interpreter.
///
/// Runtime errors inside the language are `Error` values; they only become
/// a [`SimianError::Runtime`] once they reach the top of a session.
#[derive(Debug, Error)]
pub enum SimianError {
    #[error("{}", .0.join("\n"))]
    Syntax(Vec<String>),
    #[error("{0}")]
    Runtime(String),
    #[error("could not read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
}

impl SimianError {
    /// Name of the error category, as the fixtures spell it.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "SyntaxError",
            Self::Runtime(_) => "RuntimeError",
            Self::Io { .. } => "IoError",
            Self::UnsupportedExtension(_) => "UnsupportedExtension",
        }
    }
}
