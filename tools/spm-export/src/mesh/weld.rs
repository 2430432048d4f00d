//! Vertex welding
//!
//! Merges structurally identical corners into one vertex buffer entry.
//! The first occurrence of a vertex fixes its index, so the buffer keeps
//! insertion order and welding the same input twice gives the same result.

use hashbrown::HashMap;

use super::types::{Triangle, Vertex};
use crate::error::{CompileError, Result};

/// Vertex buffer + index buffer for one serialization unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeldedBuffer {
    pub vertices: Vec<Vertex>,
    /// Three indices per input triangle, in input order
    pub indices: Vec<u32>,
}

/// Weld the corners of `triangles` into an indexed buffer
pub fn weld(triangles: &[Triangle]) -> Result<WeldedBuffer> {
    let mut lookup: HashMap<Vertex, u32> = HashMap::with_capacity(triangles.len() * 3);
    let mut vertices = Vec::new();
    let mut indices = Vec::with_capacity(triangles.len() * 3);

    for corner in triangles.iter().flat_map(|t| &t.corners) {
        let index = match lookup.get(corner) {
            Some(&index) => index,
            None => {
                let index = u32::try_from(vertices.len()).map_err(|_| {
                    CompileError::capacity(
                        "vertices in one buffer",
                        vertices.len() + 1,
                        u32::MAX as usize,
                    )
                })?;
                vertices.push(*corner);
                lookup.insert(*corner, index);
                index
            }
        };
        indices.push(index);
    }

    Ok(WeldedBuffer { vertices, indices })
}
