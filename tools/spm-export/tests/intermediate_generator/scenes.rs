//! Ready-made scenes written as intermediate streams

use spm_common::BoneTransform;
use std::path::Path;

use super::streams::*;

/// Name of the rig used by [`write_skinned_scene`]
pub const RIG: &str = "Rig";

/// Quad split along its diagonal, six records
pub fn quad(origin: [f32; 3], texture: &str) -> Vec<RecordSpec> {
    let [x, y, z] = origin;
    let a = RecordSpec::new([x, y, z], texture);
    let b = RecordSpec::new([x + 1.0, y, z], texture);
    let c = RecordSpec::new([x + 1.0, y + 1.0, z + 1.0], texture);
    let d = RecordSpec::new([x, y + 1.0, z + 1.0], texture);
    vec![a.clone(), b, c.clone(), a, c, d]
}

/// Three textured quads laid out along x, 300 units apart
pub fn scenery_records() -> Vec<RecordSpec> {
    let mut records = quad([0.0, 0.0, 0.0], "road.png");
    records.extend(quad([300.0, 0.0, 0.0], "grass.png"));
    records.extend(quad([600.0, 0.0, 0.0], "road.png"));
    records
}

pub fn write_scenery(base: &Path) {
    write_mesh_data(base, &scenery_records());
}

pub fn transform(x: f32) -> BoneTransform {
    BoneTransform {
        location: [x, 0.0, 0.0],
        ..Default::default()
    }
}

/// Three bones: root <- spine <- tip, one animation frame
pub fn rig() -> ArmatureSpec {
    let bones = [("root", ""), ("spine", "root"), ("tip", "spine")];
    ArmatureSpec {
        name: RIG.to_string(),
        bind_frame: 0,
        bind_pose: bones
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.to_string(), transform(i as f32)))
            .collect(),
        frames: vec![(
            1,
            bones
                .iter()
                .enumerate()
                .map(|(i, (name, parent))| PoseBoneSpec {
                    name: name.to_string(),
                    parent: parent.to_string(),
                    transform: transform(i as f32 + 10.0),
                })
                .collect(),
        )],
    }
}

/// One skinned triangle bound to [`rig`]
///
/// `spine` is the first bone to carry weight, then `root`; `tip` never
/// carries weight.
pub fn write_skinned_scene(base: &Path) {
    let records: Vec<RecordSpec> = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        .into_iter()
        .map(|p| RecordSpec::new(p, "skin.png").with_armature(RIG))
        .collect();
    write_mesh_data(base, &records);
    write_joint_data(
        base,
        &[
            vec![("spine", 1.0)],
            vec![("spine", 0.5), ("root", 0.5)],
            vec![("spine", 2.0), ("spine", 0.1)],
        ],
    );
    write_armature(base, 0, &rig());
}
