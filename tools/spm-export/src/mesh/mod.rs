//! Mesh pipeline stages (records -> triangles -> sectors -> batches)

mod assemble;
mod batch;
mod packing;
mod sector;
mod tangent;
mod types;
mod weld;

// Re-export public API
pub use assemble::{AssembledMesh, assemble_triangles};
pub use batch::{TextureRun, TextureTable, sort_triangles, texture_runs};
pub use packing::{VertexLayout, pack_vertex};
pub use sector::{Partition, Sector, partition, single_sector};
pub use tangent::{compute_tangents, face_basis};
pub use types::{NO_BONE, Triangle, Vertex};
pub use weld::{WeldedBuffer, weld};
