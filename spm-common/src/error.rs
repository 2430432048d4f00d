//! Errors raised while decoding SPM data

use std::io;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unexpected end of data")]
    UnexpectedEof,
    #[error("missing SP magic bytes")]
    BadMagic,
    #[error("unsupported SPM version {0}")]
    UnsupportedVersion(u8),
    #[error("unknown SPM mesh type {0}")]
    UnknownMeshType(u8),
    #[error("texture id {id} is out of range ({count} textures)")]
    TextureOutOfRange { id: u16, count: usize },
}

/// Decoding reads from in-memory slices, so running out of bytes is the
/// only way a read can fail.
impl From<io::Error> for FormatError {
    fn from(_: io::Error) -> Self {
        Self::UnexpectedEof
    }
}
