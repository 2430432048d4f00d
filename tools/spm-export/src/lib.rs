//! spm-export library
//!
//! Compiles the intermediate streams written by the content exporter
//! (`<base>.mesh_data`, `<base>.joint_data`, `<base><i>.animated_data`)
//! into a single `.spm` mesh file.

pub mod compile;
pub mod config;
pub mod encoder;
pub mod error;
pub mod intermediate;
pub mod mesh;
pub mod scene;
pub mod skeleton;

pub use compile::{CompileInput, CompileReport, CompiledMesh, compile, compile_mesh};
pub use config::{CompileOptions, SectorSettings, load_options};
pub use error::{CompileError, Result};
pub use scene::{Quad, SceneContext, load_scene};

// Re-export the file format crate for readers of the output
pub use spm_common::{MeshType, SpmFile, read_spm};
