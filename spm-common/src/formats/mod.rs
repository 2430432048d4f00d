//! SPM binary format building blocks
//!
//! All multi-byte values are little-endian. The full file layout is
//! documented on [`crate::reader`].

mod bbox;
mod header;
mod serialization;
mod transform;

pub use bbox::Aabb;
pub use header::*;
pub use serialization::BinarySerializable;
pub use transform::BoneTransform;

/// Largest number of texture entries or sectors in one file
pub const MAX_TABLE_ENTRIES: usize = u16::MAX as usize;
/// Parent-table sentinel for a bone without parent
pub const NO_PARENT: u16 = u16::MAX;
