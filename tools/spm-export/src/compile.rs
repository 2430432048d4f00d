//! Compilation pipeline
//!
//! records -> (skinning) -> triangles -> tangents -> material sort ->
//! texture table -> sectors -> `.spm` bytes
//!
//! [`compile_mesh`] is pure and works on decoded inputs. [`compile`] adds the
//! file handling: reading and deleting intermediates, loading auxiliary
//! scene XML and writing the output.

use spm_common::{Aabb, FLAG_NORMALS, FLAG_TANGENTS, FLAG_VERTEX_COLOR, MeshType, SpmHeader};
use std::path::{Path, PathBuf};

use crate::config::CompileOptions;
use crate::encoder::{SpmContents, encode_spm};
use crate::error::Result;
use crate::intermediate::{
    ArmatureData, ExportRecord, JointWeights, armature_path, decode_armature_stream,
    decode_joint_stream, decode_vertex_stream, joint_data_path, mesh_data_path, read_optional,
    read_required, remove_consumed,
};
use crate::mesh::{
    TextureTable, assemble_triangles, compute_tangents, partition, single_sector, sort_triangles,
};
use crate::scene::{SceneContext, load_scene};
use crate::skeleton::{Armature, has_skin_weights, resolve_skinning};

/// Decoded intermediate streams
#[derive(Debug, Clone, Default)]
pub struct CompileInput {
    pub records: Vec<ExportRecord>,
    /// One entry per record; only read for skinned output
    pub joints: Vec<JointWeights>,
    pub armatures: Vec<ArmatureData>,
}

/// Encoded file plus what went into it
#[derive(Debug, Clone)]
pub struct CompiledMesh {
    pub bytes: Vec<u8>,
    pub mesh_type: MeshType,
    pub triangle_count: usize,
    pub texture_count: usize,
    pub sector_count: usize,
    pub unsectored_triangles: usize,
}

/// Summary of one `compile` run
#[derive(Debug, Clone, PartialEq)]
pub struct CompileReport {
    pub mesh_type: MeshType,
    pub triangle_count: usize,
    pub texture_count: usize,
    pub sector_count: usize,
    pub unsectored_triangles: usize,
    pub bytes_written: usize,
    pub transparent_materials: usize,
    pub quads: usize,
}

fn header_flags(options: &CompileOptions) -> u8 {
    let mut flags = 0;
    if options.export_normals {
        flags |= FLAG_NORMALS;
    }
    if options.export_vertex_color {
        flags |= FLAG_VERTEX_COLOR;
    }
    if options.export_tangents {
        flags |= FLAG_TANGENTS;
    }
    flags
}

/// Compile decoded intermediate data into `.spm` bytes
pub fn compile_mesh(input: CompileInput, options: &CompileOptions) -> Result<CompiledMesh> {
    options.validate()?;
    let CompileInput {
        records,
        joints,
        armatures,
    } = input;

    let mut mesh_type = if options.armature_count > 0 {
        MeshType::Skinned
    } else if options.space_partition {
        MeshType::StaticSectored
    } else {
        MeshType::Plain
    };

    let mut armatures: Vec<Armature> = armatures.into_iter().map(Armature::from).collect();
    let skin = if mesh_type == MeshType::Skinned {
        let bindings = resolve_skinning(&records, &joints, &mut armatures)?;
        if !has_skin_weights(&bindings) {
            tracing::warn!("No vertex carries skin weight, writing a plain mesh");
            mesh_type = MeshType::Plain;
        }
        Some(bindings)
    } else {
        None
    };

    let assembled = assemble_triangles(&records, skin.as_deref());
    let mut triangles = assembled.triangles;
    let bounds = assembled.bounds.unwrap_or(Aabb::ZERO);
    let triangle_count = triangles.len();

    if options.export_tangents {
        compute_tangents(&mut triangles)?;
    }

    sort_triangles(&mut triangles);
    let textures = TextureTable::from_sorted(&triangles)?;
    tracing::info!("{} triangles, {} texture entries", triangle_count, textures.len());

    let mut sectors = if mesh_type == MeshType::StaticSectored {
        partition(triangles, bounds, &options.sectors)?
    } else {
        single_sector(triangles, bounds)
    };
    for sector in &mut sectors.sectors {
        sort_triangles(&mut sector.triangles);
    }
    if mesh_type == MeshType::StaticSectored {
        tracing::info!("{} sectors", sectors.sectors.len());
    }

    let header = SpmHeader::new(mesh_type, header_flags(options));
    let bytes = encode_spm(&SpmContents {
        header,
        bounds,
        textures: &textures,
        sectors: &sectors.sectors,
        armatures: Some(&armatures),
    })?;

    Ok(CompiledMesh {
        bytes,
        mesh_type,
        triangle_count,
        texture_count: textures.len(),
        sector_count: sectors.sectors.len(),
        unsectored_triangles: sectors.unsectored,
    })
}

/// Decode every intermediate file that belongs to `base`
///
/// Returns the decoded input and every path that was consumed.
fn read_inputs(base: &Path, options: &CompileOptions) -> Result<(CompileInput, Vec<PathBuf>)> {
    let mut consumed = Vec::new();

    let mesh_path = mesh_data_path(base);
    let records = decode_vertex_stream(&read_required(&mesh_path)?);
    tracing::info!("Read {} vertex records from {:?}", records.len(), mesh_path);
    consumed.push(mesh_path);

    let mut input = CompileInput {
        records,
        ..Default::default()
    };

    if options.armature_count > 0 {
        let joint_path = joint_data_path(base);
        input.joints = decode_joint_stream(&joint_path, &read_required(&joint_path)?)?;
        tracing::info!("Read {} joint records from {:?}", input.joints.len(), joint_path);
        consumed.push(joint_path);

        for index in 0..options.armature_count {
            let path = armature_path(base, index);
            match read_optional(&path) {
                Some(bytes) => {
                    let armature = decode_armature_stream(&path, &bytes)?;
                    tracing::info!(
                        "Read armature {:?} ({} bones, {} frames) from {:?}",
                        armature.name,
                        armature.bind_pose.len(),
                        armature.poses.len(),
                        path
                    );
                    input.armatures.push(armature);
                }
                None => tracing::warn!("Skipping missing armature file {:?}", path),
            }
            consumed.push(path);
        }
    }

    Ok((input, consumed))
}

/// Compile the intermediates of `base` into the `.spm` file `base`
pub fn compile(base: &Path, options: &CompileOptions) -> Result<CompileReport> {
    options.validate()?;
    let (input, consumed) = read_inputs(base, options)?;

    if options.keep_intermediate {
        tracing::debug!("Keeping {} intermediate files", consumed.len());
    } else {
        remove_consumed(&consumed);
    }

    let scene = if options.armature_count == 0 && options.space_partition {
        load_scene(base)
    } else {
        SceneContext::default()
    };

    let compiled = compile_mesh(input, options)?;
    std::fs::write(base, &compiled.bytes)?;
    tracing::info!(
        "Wrote {} ({} bytes, {})",
        base.display(),
        compiled.bytes.len(),
        compiled.mesh_type.tag()
    );

    Ok(CompileReport {
        mesh_type: compiled.mesh_type,
        triangle_count: compiled.triangle_count,
        texture_count: compiled.texture_count,
        sector_count: compiled.sector_count,
        unsectored_triangles: compiled.unsectored_triangles,
        bytes_written: compiled.bytes.len(),
        transparent_materials: scene.transparent_materials.len(),
        quads: scene.quads.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::intermediate::NO_ARMATURE;
    use spm_common::read_spm;

    fn record(p: [f32; 3], uv: [f32; 2], texture: &str) -> ExportRecord {
        let mut floats = [0.0; 13];
        floats[..3].copy_from_slice(&p);
        floats[3..6].copy_from_slice(&[0.0, 0.0, 1.0]);
        floats[6..8].copy_from_slice(&uv);
        floats[10..].copy_from_slice(&[1.0, 1.0, 1.0]);
        ExportRecord {
            floats,
            uv_one_name: texture.to_string(),
            uv_two_name: String::new(),
            armature_name: NO_ARMATURE.to_string(),
        }
    }

    fn triangle_at(x: f32, texture: &str) -> Vec<ExportRecord> {
        vec![
            record([x, 0.0, 0.0], [0.0, 0.0], texture),
            record([x + 1.0, 0.0, 0.0], [1.0, 0.0], texture),
            record([x, 1.0, 1.0], [0.0, 1.0], texture),
        ]
    }

    fn input(records: Vec<ExportRecord>) -> CompileInput {
        CompileInput {
            records,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_mode_single_sector() {
        let mut records = triangle_at(0.0, "b.png");
        records.extend(triangle_at(500.0, "a.png"));
        let options = CompileOptions {
            export_normals: true,
            ..Default::default()
        };
        let compiled = compile_mesh(input(records), &options).unwrap();
        assert_eq!(compiled.mesh_type, MeshType::Plain);
        assert_eq!(compiled.sector_count, 1);
        assert_eq!(compiled.texture_count, 2);

        let file = read_spm(&compiled.bytes).unwrap();
        assert!(file.header.has_normals());
        assert_eq!(file.textures[0].primary, "a.png");
        assert_eq!(file.sectors[0].batches.len(), 2);
        assert_eq!(file.triangle_count(), 2);
    }

    #[test]
    fn test_static_mode_partitions() {
        let mut records = triangle_at(0.0, "a.png");
        records.extend(triangle_at(500.0, "a.png"));
        let options = CompileOptions {
            space_partition: true,
            ..Default::default()
        };
        let compiled = compile_mesh(input(records), &options).unwrap();
        assert_eq!(compiled.mesh_type, MeshType::StaticSectored);
        // sector 0 plus 6 cells along x
        assert_eq!(compiled.sector_count, 7);
        assert_eq!(compiled.unsectored_triangles, 0);

        let file = read_spm(&compiled.bytes).unwrap();
        assert_eq!(file.visibility_reserved, Some(0));
        assert_eq!(file.triangle_count(), 2);
        assert!(file.sectors.iter().all(|s| s.bbox.is_some()));
    }

    #[test]
    fn test_huge_static_scene_exceeds_sector_limit() {
        let records = vec![
            record([0.0, 0.0, 0.0], [0.0, 0.0], "a.png"),
            record([1.0e6, 0.0, 0.0], [1.0, 0.0], "a.png"),
            record([0.0, 1.0e6, 1.0e6], [0.0, 1.0], "a.png"),
        ];
        let options = CompileOptions {
            space_partition: true,
            ..Default::default()
        };
        let err = compile_mesh(input(records), &options).unwrap_err();
        assert!(matches!(
            err,
            CompileError::CapacityExceeded { what: "sectors", .. }
        ));
    }

    #[test]
    fn test_tangents_written_for_textured_runs() {
        let mut records = triangle_at(0.0, "a.png");
        records.extend(triangle_at(2.0, ""));
        let options = CompileOptions {
            export_tangents: true,
            ..Default::default()
        };
        let compiled = compile_mesh(input(records), &options).unwrap();
        let file = read_spm(&compiled.bytes).unwrap();
        let batches = &file.sectors[0].batches;
        // "" sorts first and carries no UVs
        assert!(batches[0].vertices[0].tangent.is_none());
        assert!(batches[1].vertices[0].tangent.is_some());
    }

    #[test]
    fn test_skinned_without_weights_degrades() {
        let records = triangle_at(0.0, "a.png");
        let joints = vec![JointWeights::default(); 3];
        let options = CompileOptions {
            armature_count: 1,
            ..Default::default()
        };
        let compiled = compile_mesh(
            CompileInput {
                records,
                joints,
                armatures: Vec::new(),
            },
            &options,
        )
        .unwrap();
        assert_eq!(compiled.mesh_type, MeshType::Plain);
        let file = read_spm(&compiled.bytes).unwrap();
        assert!(file.armatures.is_none());
    }

    #[test]
    fn test_empty_input() {
        let compiled = compile_mesh(CompileInput::default(), &CompileOptions::default()).unwrap();
        let file = read_spm(&compiled.bytes).unwrap();
        assert_eq!(file.bbox, Aabb::ZERO);
        assert!(file.textures.is_empty());
        assert_eq!(file.sectors.len(), 1);
        assert!(file.sectors[0].batches.is_empty());
    }
}
