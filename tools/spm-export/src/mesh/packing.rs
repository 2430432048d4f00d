//! Vertex packing for SPM vertex buffers
//!
//! Vertex layout (in order): Position → Normal → Color → UV1 → UV2 →
//! Tangent/Bitangent → Skinning
//! - Position: f32 × 3 (12 bytes)
//! - Normal: 10:10:10:2 (4 bytes), if normals are exported
//! - Color: 1 byte (white) or 4 bytes, if vertex colors are exported
//! - UV1: f16 × 2 (4 bytes), if the run has a primary texture
//! - UV2: f16 × 2 (4 bytes), if the run also has a secondary texture
//! - Tangent + bitangent: 10:10:10:2 × 2 (8 bytes), if tangents are exported
//!   and the run has a primary texture
//! - Skinning: i16 × 4 bone indices + f16 × 4 weights (16 bytes)

use bytemuck::cast_slice;
use spm_common::{
    MeshType, SpmHeader, pack_direction, pack_uv_f16, pack_vertex_color, pack_weights_f16,
};

use super::batch::TextureRun;
use super::types::Vertex;

/// Attribute switches for one batch's vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub normals: bool,
    pub vertex_color: bool,
    pub uv_one: bool,
    pub uv_two: bool,
    pub tangents: bool,
    pub skinned: bool,
}

impl VertexLayout {
    pub fn for_run(header: &SpmHeader, run: &TextureRun) -> Self {
        Self {
            normals: header.has_normals(),
            vertex_color: header.has_vertex_color(),
            uv_one: run.has_uv_one,
            uv_two: run.has_uv_one && run.has_uv_two,
            tangents: run.has_uv_one && header.has_tangents(),
            skinned: header.mesh_type == MeshType::Skinned,
        }
    }
}

/// Append one packed vertex to `out`
pub fn pack_vertex(out: &mut Vec<u8>, vertex: &Vertex, layout: VertexLayout) {
    for value in vertex.position.to_array() {
        out.extend_from_slice(&value.to_le_bytes());
    }

    if layout.normals {
        out.extend_from_slice(&pack_direction(vertex.normal).to_le_bytes());
    }

    if layout.vertex_color {
        pack_vertex_color(out, vertex.color);
    }

    if layout.uv_one {
        push_u16s(out, &pack_uv_f16(vertex.uv_one.x, vertex.uv_one.y));
        if layout.uv_two {
            push_u16s(out, &pack_uv_f16(vertex.uv_two.x, vertex.uv_two.y));
        }
        if layout.tangents {
            out.extend_from_slice(&pack_direction(vertex.tangent).to_le_bytes());
            out.extend_from_slice(&pack_direction(vertex.bitangent).to_le_bytes());
        }
    }

    if layout.skinned {
        push_u16s(out, cast_slice(&vertex.bones));
        push_u16s(out, &pack_weights_f16(vertex.weights));
    }
}

fn push_u16s(out: &mut Vec<u8>, values: &[u16]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}
