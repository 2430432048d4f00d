//! Triangle assembly from decoded vertex records

use spm_common::{Aabb, quantize_color};

use super::types::{Triangle, Vertex};
use crate::intermediate::ExportRecord;
use crate::skeleton::SkinBinding;

#[derive(Debug, Clone, Default)]
pub struct AssembledMesh {
    pub triangles: Vec<Triangle>,
    /// Scene bounds; `None` when there are no triangles
    pub bounds: Option<Aabb>,
}

/// Group every three records into a triangle
///
/// The texture names of the last corner name the triangle. Trailing records
/// that do not complete a triangle are dropped. `skin` must have one entry
/// per record when present.
pub fn assemble_triangles(records: &[ExportRecord], skin: Option<&[SkinBinding]>) -> AssembledMesh {
    let leftover = records.len() % 3;
    if leftover != 0 {
        tracing::warn!("Dropping {} vertex record(s) that do not form a triangle", leftover);
    }

    let mut triangles = Vec::with_capacity(records.len() / 3);
    let mut bounds: Option<Aabb> = None;

    for (t, chunk) in records.chunks_exact(3).enumerate() {
        let corners = std::array::from_fn(|i| {
            let binding = skin
                .and_then(|s| s.get(t * 3 + i))
                .copied()
                .unwrap_or_default();
            to_vertex(&chunk[i], binding)
        });
        let last = &chunk[2];
        let triangle = Triangle::new(
            corners,
            last.uv_one_name.clone(),
            last.uv_two_name.clone(),
        );

        let tri_bounds = triangle.bounds();
        match bounds.as_mut() {
            Some(b) => b.add_box(&tri_bounds),
            None => bounds = Some(tri_bounds),
        }
        triangles.push(triangle);
    }

    AssembledMesh { triangles, bounds }
}

fn to_vertex(record: &ExportRecord, binding: SkinBinding) -> Vertex {
    Vertex {
        position: record.position(),
        normal: record.normal(),
        color: quantize_color(record.color()),
        uv_one: record.uv_one(),
        uv_two: record.uv_two(),
        bones: binding.bones,
        weights: binding.weights,
        ..Default::default()
    }
}
