//! Shared types and utilities for SPM meshes
//!
//! This crate provides the pieces shared between:
//! - `spm-export` (mesh compiler)
//! - anything that needs to read `.spm` files back
//!
//! # Modules
//!
//! - [`packing`] - Vertex data packing utilities (f32 → f16 / 10:10:10:2 / RGB8)
//! - [`formats`] - SPM header, bounding box and bone transform layouts
//! - [`reader`] - Full `.spm` decoder

pub mod error;
pub mod formats;
pub mod packing;
pub mod reader;

pub use error::FormatError;

// Re-export commonly used packing items
pub use packing::{
    COLOR_RGB_TAG, COLOR_WHITE_TAG, IndexWidth, pack_direction, pack_uv_f16, pack_vertex_color,
    pack_weights_f16, quantize_color, unpack_direction,
};

// Re-export commonly used format items
pub use formats::{
    Aabb, BinarySerializable, BoneTransform, FLAG_NORMALS, FLAG_TANGENTS, FLAG_VERTEX_COLOR,
    MAX_TABLE_ENTRIES, MeshType, NO_PARENT, SPM_MAGIC, SPM_VERSION, SpmHeader,
};

pub use reader::{SpmFile, read_spm};
