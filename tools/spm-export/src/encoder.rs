//! SPM binary writer
//!
//! Serializes sorted, partitioned triangles into the layout decoded by
//! [`spm_common::reader`]. Every sector is split into texture runs and each
//! run is welded into its own vertex/index buffer.

use spm_common::{Aabb, IndexWidth, MeshType, SpmHeader};

use crate::error::{CompileError, Result};
use crate::mesh::{Sector, TextureTable, VertexLayout, pack_vertex, texture_runs, weld};
use crate::skeleton::{Armature, write_armature_block};

/// Everything that goes into one `.spm` file
#[derive(Debug, Clone, Copy)]
pub struct SpmContents<'a> {
    pub header: SpmHeader,
    /// Scene box written after the header
    pub bounds: Aabb,
    pub textures: &'a TextureTable,
    /// Triangles of every sector must already be sorted by material key
    pub sectors: &'a [Sector],
    /// Required for skinned meshes, ignored otherwise
    pub armatures: Option<&'a [Armature]>,
}

fn to_u16(value: usize, what: &'static str) -> Result<u16> {
    u16::try_from(value).map_err(|_| CompileError::capacity(what, value, u16::MAX as usize))
}

fn push_short_name(out: &mut Vec<u8>, name: &str) -> Result<()> {
    let len = u8::try_from(name.len())
        .map_err(|_| CompileError::capacity("texture name bytes", name.len(), u8::MAX as usize))?;
    out.push(len);
    out.extend_from_slice(name.as_bytes());
    Ok(())
}

/// Append the batches of one sector, preceded by their count
fn write_sector(out: &mut Vec<u8>, header: &SpmHeader, sector: &Sector, textures: &TextureTable) -> Result<()> {
    let runs = texture_runs(&sector.triangles, textures)?;
    out.extend_from_slice(&to_u16(runs.len(), "batches per sector")?.to_le_bytes());

    for run in &runs {
        let buffer = weld(&sector.triangles[run.range()])?;
        let vertex_count = buffer.vertices.len() as u32;
        let index_count = u32::try_from(buffer.indices.len()).map_err(|_| {
            CompileError::capacity("indices in one batch", buffer.indices.len(), u32::MAX as usize)
        })?;

        out.extend_from_slice(&vertex_count.to_le_bytes());
        out.extend_from_slice(&index_count.to_le_bytes());
        out.extend_from_slice(&run.texture_id.to_le_bytes());

        let layout = VertexLayout::for_run(header, run);
        for vertex in &buffer.vertices {
            pack_vertex(out, vertex, layout);
        }

        let width = IndexWidth::for_vertex_count(vertex_count);
        for &index in &buffer.indices {
            width.push(out, index);
        }

        tracing::debug!(
            "Batch texture {}: {} vertices, {} indices ({:?})",
            run.texture_id,
            vertex_count,
            index_count,
            width
        );
    }

    if header.mesh_type == MeshType::StaticSectored {
        out.extend_from_slice(&sector.bbox.to_bytes());
    }
    Ok(())
}

/// Encode a complete `.spm` file into memory
pub fn encode_spm(contents: &SpmContents) -> Result<Vec<u8>> {
    let SpmContents {
        header,
        bounds,
        textures,
        sectors,
        armatures,
    } = *contents;

    let mut out = Vec::new();
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&bounds.to_bytes());

    out.extend_from_slice(&to_u16(textures.len(), "textures")?.to_le_bytes());
    for (primary, secondary) in textures.entries() {
        push_short_name(&mut out, primary)?;
        push_short_name(&mut out, secondary)?;
    }

    out.extend_from_slice(&to_u16(sectors.len(), "sectors")?.to_le_bytes());
    for sector in sectors {
        write_sector(&mut out, &header, sector, textures)?;
    }

    match header.mesh_type {
        MeshType::Skinned => {
            let armatures = armatures.ok_or_else(|| {
                CompileError::corrupt("skinned mesh without armatures")
            })?;
            write_armature_block(&mut out, armatures)?;
        }
        // Reserved slot for precomputed visibility
        MeshType::StaticSectored => out.extend_from_slice(&0u16.to_le_bytes()),
        MeshType::Plain => {}
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Triangle, Vertex, single_sector, sort_triangles};
    use glam::{Vec2, Vec3};
    use spm_common::{FLAG_NORMALS, FLAG_VERTEX_COLOR, read_spm};

    fn vertex(p: Vec3) -> Vertex {
        Vertex {
            position: p,
            normal: Vec3::Z,
            color: [200, 100, 50],
            uv_one: Vec2::new(p.x, p.y),
            ..Default::default()
        }
    }

    /// Quad at `origin` split along its diagonal
    fn quad(origin: Vec3, texture: &str) -> [Triangle; 2] {
        let a = vertex(origin);
        let b = vertex(origin + Vec3::X);
        let c = vertex(origin + Vec3::X + Vec3::Y);
        let d = vertex(origin + Vec3::Y);
        [
            Triangle::new([a, b, c], texture.into(), String::new()),
            Triangle::new([a, c, d], texture.into(), String::new()),
        ]
    }

    fn encode_plain(mut triangles: Vec<Triangle>, flags: u8) -> Vec<u8> {
        sort_triangles(&mut triangles);
        let textures = TextureTable::from_sorted(&triangles).unwrap();
        let bounds = Aabb::from_points(
            triangles.iter().flat_map(|t| t.corners.map(|v| v.position)),
        )
        .unwrap_or(Aabb::ZERO);
        let partition = single_sector(triangles, bounds);
        encode_spm(&SpmContents {
            header: SpmHeader::new(MeshType::Plain, flags),
            bounds,
            textures: &textures,
            sectors: &partition.sectors,
            armatures: None,
        })
        .unwrap()
    }

    fn three_quads() -> Vec<Triangle> {
        [0.0, 2.0, 4.0]
            .into_iter()
            .flat_map(|x| quad(Vec3::new(x, 0.0, 0.0), "stone.png"))
            .collect()
    }

    #[test]
    fn test_six_triangle_plain_mesh() {
        let bytes = encode_plain(three_quads(), FLAG_NORMALS | FLAG_VERTEX_COLOR);
        let file = read_spm(&bytes).unwrap();

        assert_eq!(file.header.mesh_type, MeshType::Plain);
        assert_eq!(file.textures.len(), 1);
        assert_eq!(file.sectors.len(), 1);
        assert!(file.sectors[0].bbox.is_none());

        let batches = &file.sectors[0].batches;
        assert_eq!(batches.len(), 1);
        assert!(batches[0].vertices.len() <= 12);
        assert_eq!(batches[0].indices.len(), 18);
        assert_eq!(batches[0].index_width, IndexWidth::U8);
        assert_eq!(batches[0].vertices[0].color, Some([200, 100, 50]));
        assert!(batches[0].vertices[0].uv_one.is_some());
        assert!(batches[0].vertices[0].tangent.is_none());
        assert_eq!(file.triangle_count(), 6);
        assert_eq!(file.bbox.max, Vec3::new(5.0, 1.0, 0.0));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let first = encode_plain(three_quads(), FLAG_NORMALS);
        let second = encode_plain(three_quads(), FLAG_NORMALS);
        assert_eq!(first, second);
    }

    #[test]
    fn test_one_batch_per_texture_run() {
        let mut triangles = three_quads();
        triangles.extend(quad(Vec3::new(0.0, 5.0, 0.0), "grass.png"));
        triangles.extend(quad(Vec3::new(0.0, 7.0, 0.0), ""));
        let bytes = encode_plain(triangles, 0);
        let file = read_spm(&bytes).unwrap();

        let ids: Vec<u16> = file.sectors[0].batches.iter().map(|b| b.texture_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(file.textures[0].primary, "");
        assert_eq!(file.textures[1].primary, "grass.png");
        // Untextured runs carry no UVs
        assert!(file.sectors[0].batches[0].vertices[0].uv_one.is_none());
    }

    #[test]
    fn test_static_sectors_carry_boxes_and_reserved_slot() {
        let triangles = three_quads();
        let textures = {
            let mut sorted = triangles.clone();
            sort_triangles(&mut sorted);
            TextureTable::from_sorted(&sorted).unwrap()
        };
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(5.0, 1.0, 0.0));
        let sectors = vec![
            Sector {
                triangles: Vec::new(),
                bbox: Aabb::ZERO,
            },
            Sector {
                triangles,
                bbox: bounds,
            },
        ];
        let bytes = encode_spm(&SpmContents {
            header: SpmHeader::new(MeshType::StaticSectored, 0),
            bounds,
            textures: &textures,
            sectors: &sectors,
            armatures: None,
        })
        .unwrap();
        let file = read_spm(&bytes).unwrap();

        assert_eq!(file.sectors.len(), 2);
        assert!(file.sectors[0].batches.is_empty());
        assert_eq!(file.sectors[0].bbox, Some(Aabb::ZERO));
        assert_eq!(file.sectors[1].bbox, Some(bounds));
        assert_eq!(file.visibility_reserved, Some(0));
        assert_eq!(file.triangle_count(), 6);
    }

    #[test]
    fn test_wide_batches_use_wider_indices() {
        // 100 disjoint quads -> 400 vertices
        let triangles: Vec<Triangle> = (0..100)
            .flat_map(|i| quad(Vec3::new(i as f32 * 2.0, 0.0, 0.0), "a"))
            .collect();
        let bytes = encode_plain(triangles, 0);
        let file = read_spm(&bytes).unwrap();
        let batch = &file.sectors[0].batches[0];
        assert_eq!(batch.vertices.len(), 400);
        assert_eq!(batch.index_width, IndexWidth::U16);
        assert_eq!(batch.indices[599], 399);
    }

    #[test]
    fn test_overlong_texture_name() {
        let name = "x".repeat(300);
        let mut triangles: Vec<Triangle> = quad(Vec3::ZERO, &name).into();
        sort_triangles(&mut triangles);
        let textures = TextureTable::from_sorted(&triangles).unwrap();
        let partition = single_sector(triangles, Aabb::ZERO);
        let err = encode_spm(&SpmContents {
            header: SpmHeader::new(MeshType::Plain, 0),
            bounds: Aabb::ZERO,
            textures: &textures,
            sectors: &partition.sectors,
            armatures: None,
        })
        .unwrap_err();
        assert!(matches!(err, CompileError::CapacityExceeded { count: 300, .. }));
    }

    #[test]
    fn test_skinned_without_armatures_is_rejected() {
        let textures = TextureTable::default();
        let err = encode_spm(&SpmContents {
            header: SpmHeader::new(MeshType::Skinned, 0),
            bounds: Aabb::ZERO,
            textures: &textures,
            sectors: &[],
            armatures: None,
        })
        .unwrap_err();
        assert!(matches!(err, CompileError::CorruptIntermediate { .. }));
    }
}
