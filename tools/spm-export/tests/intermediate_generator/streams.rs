//! Byte writers for the three intermediate streams

use spm_common::BoneTransform;
use std::path::{Path, PathBuf};

/// Width of every name field
pub const NAME_LEN: usize = 64;

/// One vertex record as the exporter writes it
#[derive(Debug, Clone)]
pub struct RecordSpec {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv_one: [f32; 2],
    pub uv_two: [f32; 2],
    pub color: [f32; 3],
    pub uv_one_name: String,
    pub uv_two_name: String,
    pub armature: String,
}

impl RecordSpec {
    pub fn new(position: [f32; 3], texture: &str) -> Self {
        Self {
            position,
            normal: [0.0, 0.0, 1.0],
            uv_one: [position[0], position[1]],
            uv_two: [0.0, 0.0],
            color: [1.0, 1.0, 1.0],
            uv_one_name: texture.to_string(),
            uv_two_name: String::new(),
            armature: "NULL".to_string(),
        }
    }

    pub fn with_armature(mut self, armature: &str) -> Self {
        self.armature = armature.to_string();
        self
    }
}

/// Bone entry of one animation frame
#[derive(Debug, Clone)]
pub struct PoseBoneSpec {
    pub name: String,
    pub parent: String,
    pub transform: BoneTransform,
}

#[derive(Debug, Clone)]
pub struct ArmatureSpec {
    pub name: String,
    pub bind_frame: u32,
    pub bind_pose: Vec<(String, BoneTransform)>,
    pub frames: Vec<(u32, Vec<PoseBoneSpec>)>,
}

fn push_name(out: &mut Vec<u8>, name: &str) {
    let mut field = [0u8; NAME_LEN];
    let len = name.len().min(NAME_LEN - 1);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    out.extend_from_slice(&field);
}

fn push_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

pub fn encode_mesh_data(records: &[RecordSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    for r in records {
        push_f32s(&mut out, &r.position);
        push_f32s(&mut out, &r.normal);
        push_f32s(&mut out, &r.uv_one);
        push_f32s(&mut out, &r.uv_two);
        push_f32s(&mut out, &r.color);
        push_name(&mut out, &r.uv_one_name);
        push_name(&mut out, &r.uv_two_name);
        push_name(&mut out, &r.armature);
    }
    out
}

/// One group per vertex record
pub fn encode_joint_data(groups: &[Vec<(&str, f32)>]) -> Vec<u8> {
    let mut out = Vec::new();
    for group in groups {
        out.extend_from_slice(&(group.len() as i32).to_le_bytes());
        for (name, weight) in group {
            push_name(&mut out, name);
            out.extend_from_slice(&weight.to_le_bytes());
        }
    }
    out
}

pub fn encode_armature(armature: &ArmatureSpec) -> Vec<u8> {
    let mut out = Vec::new();
    push_name(&mut out, &armature.name);
    out.extend_from_slice(&armature.bind_frame.to_le_bytes());

    out.extend_from_slice(&(armature.bind_pose.len() as u32).to_le_bytes());
    for (name, transform) in &armature.bind_pose {
        push_name(&mut out, name);
        out.extend_from_slice(&transform.to_bytes());
    }

    out.extend_from_slice(&(armature.frames.len() as u32).to_le_bytes());
    for (frame, bones) in &armature.frames {
        out.extend_from_slice(&frame.to_le_bytes());
        out.extend_from_slice(&(bones.len() as u32).to_le_bytes());
        for bone in bones {
            push_name(&mut out, &bone.name);
            push_name(&mut out, &bone.parent);
            out.extend_from_slice(&bone.transform.to_bytes());
        }
    }
    out
}

fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

pub fn mesh_data_path(base: &Path) -> PathBuf {
    suffixed(base, ".mesh_data")
}

pub fn joint_data_path(base: &Path) -> PathBuf {
    suffixed(base, ".joint_data")
}

pub fn armature_path(base: &Path, index: u32) -> PathBuf {
    suffixed(base, &format!("{index}.animated_data"))
}

pub fn write_mesh_data(base: &Path, records: &[RecordSpec]) {
    std::fs::write(mesh_data_path(base), encode_mesh_data(records))
        .expect("Failed to write mesh data");
}

pub fn write_joint_data(base: &Path, groups: &[Vec<(&str, f32)>]) {
    std::fs::write(joint_data_path(base), encode_joint_data(groups))
        .expect("Failed to write joint data");
}

pub fn write_armature(base: &Path, index: u32, armature: &ArmatureSpec) {
    std::fs::write(armature_path(base, index), encode_armature(armature))
        .expect("Failed to write armature");
}
