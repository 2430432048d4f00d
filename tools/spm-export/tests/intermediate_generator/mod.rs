//! Programmatic intermediate-stream generation for integration tests.
//!
//! Writes the same byte layout the content exporter produces:
//! - `<base>.mesh_data`: 244-byte vertex records
//! - `<base>.joint_data`: per-vertex joint weight groups
//! - `<base><i>.animated_data`: one armature per file

#![allow(dead_code)]

mod scenes;
mod streams;

pub use scenes::*;
pub use streams::*;
