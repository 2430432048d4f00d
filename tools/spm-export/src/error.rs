//! Errors raised while compiling a mesh

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// A required intermediate file cannot be opened. Treated as "nothing to do".
    #[error("missing intermediate file {path:?}")]
    MissingInput { path: PathBuf },

    #[error("too many {what}: {count} (maximum {max})")]
    CapacityExceeded {
        what: &'static str,
        count: usize,
        max: usize,
    },

    #[error("{path:?} ends early at byte {offset}")]
    Truncated { path: PathBuf, offset: usize },

    #[error("corrupt intermediate data: {reason}")]
    CorruptIntermediate { reason: String },

    #[error("malformed XML in {path:?}")]
    MalformedXml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub(crate) fn capacity(what: &'static str, count: usize, max: usize) -> Self {
        Self::CapacityExceeded { what, count, max }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptIntermediate {
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
