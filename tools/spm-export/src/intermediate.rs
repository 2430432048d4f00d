//! Intermediate stream decoding
//!
//! The content tool leaves up to three kinds of files next to the output
//! path `<base>`:
//!
//! - `<base>.mesh_data` - vertex records, three per triangle
//! - `<base>.joint_data` - per-vertex joint weights (skinned meshes)
//! - `<base><i>.animated_data` - one bind pose + animation per armature
//!
//! All values are little-endian. Names are NUL-padded 64-byte fields.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use spm_common::formats::BoneTransform;
use std::io::{self, Cursor, ErrorKind, Read};
use std::path::{Path, PathBuf};

use crate::error::{CompileError, Result};

/// Size of every fixed name field
pub const NAME_LEN: usize = 64;
/// f32 values at the start of a vertex record
pub const RECORD_FLOATS: usize = 13;
/// Size of one vertex record: 13 floats + uv1/uv2/armature names
pub const RECORD_SIZE: usize = RECORD_FLOATS * 4 + 3 * NAME_LEN;
/// Size of one joint entry: name + f32 weight
const JOINT_SIZE: usize = NAME_LEN + 4;
/// Armature name written for vertices without a skin
pub const NO_ARMATURE: &str = "NULL";

// ============================================================================
// File naming
// ============================================================================

pub fn mesh_data_path(base: &Path) -> PathBuf {
    with_suffix(base, ".mesh_data")
}

pub fn joint_data_path(base: &Path) -> PathBuf {
    with_suffix(base, ".joint_data")
}

pub fn armature_path(base: &Path, index: u32) -> PathBuf {
    with_suffix(base, &format!("{index}.animated_data"))
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// Read a required intermediate file
pub fn read_required(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => CompileError::MissingInput {
            path: path.to_path_buf(),
        },
        _ => CompileError::Io(e),
    })
}

/// Read an optional intermediate file; `None` if it cannot be opened
pub fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::debug!("Skipping {:?}: {}", path, e);
            None
        }
    }
}

/// Delete consumed intermediate files; files already gone are ignored
pub fn remove_consumed(paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed {:?}", path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {:?}: {}", path, e),
        }
    }
}

/// Map a failed read to `Truncated` at the byte where the data ran out
fn truncated(path: &Path, len: usize) -> impl Fn(io::Error) -> CompileError + '_ {
    move |e| match e.kind() {
        ErrorKind::UnexpectedEof => CompileError::Truncated {
            path: path.to_path_buf(),
            offset: len,
        },
        _ => CompileError::Io(e),
    }
}

/// Bytes left after the cursor position
fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let position = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    cursor.get_ref().len().saturating_sub(position)
}

// ============================================================================
// Vertex stream
// ============================================================================

/// One raw vertex record from the content tool
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    /// position(3), normal(3), uv1(2), uv2(2), linear color(3)
    pub floats: [f32; RECORD_FLOATS],
    pub uv_one_name: String,
    pub uv_two_name: String,
    pub armature_name: String,
}

impl ExportRecord {
    pub fn position(&self) -> glam::Vec3 {
        glam::Vec3::from_slice(&self.floats[0..3])
    }

    pub fn normal(&self) -> glam::Vec3 {
        glam::Vec3::from_slice(&self.floats[3..6])
    }

    pub fn uv_one(&self) -> glam::Vec2 {
        glam::Vec2::from_slice(&self.floats[6..8])
    }

    pub fn uv_two(&self) -> glam::Vec2 {
        glam::Vec2::from_slice(&self.floats[8..10])
    }

    pub fn color(&self) -> [f32; 3] {
        [self.floats[10], self.floats[11], self.floats[12]]
    }
}

/// Decode the vertex stream. A trailing partial record is ignored.
pub fn decode_vertex_stream(bytes: &[u8]) -> Vec<ExportRecord> {
    if bytes.len() % RECORD_SIZE != 0 {
        tracing::warn!(
            "Ignoring {} trailing bytes of partial vertex record",
            bytes.len() % RECORD_SIZE
        );
    }

    bytes
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| {
            let mut floats = [0.0f32; RECORD_FLOATS];
            LittleEndian::read_f32_into(&chunk[..RECORD_FLOATS * 4], &mut floats);
            let names = &chunk[RECORD_FLOATS * 4..];
            ExportRecord {
                floats,
                uv_one_name: fixed_name(&names[0..NAME_LEN]),
                uv_two_name: fixed_name(&names[NAME_LEN..2 * NAME_LEN]),
                armature_name: fixed_name(&names[2 * NAME_LEN..]),
            }
        })
        .collect()
}

fn fixed_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

// ============================================================================
// Joint stream
// ============================================================================

/// Raw joint weights of one vertex, in stream order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointWeights {
    pub joints: Vec<(String, f32)>,
}

/// Decode the joint stream. Weights above 1.0 are clamped.
pub fn decode_joint_stream(path: &Path, bytes: &[u8]) -> Result<Vec<JointWeights>> {
    let mut cursor = Cursor::new(bytes);
    let eof = truncated(path, bytes.len());
    let mut groups = Vec::new();

    // A count that does not fit in the remaining bytes ends the stream
    while remaining(&cursor) >= 4 {
        let start = cursor.position();
        let count = cursor.read_i32::<LittleEndian>().map_err(&eof)?;
        if count < 0 {
            return Err(CompileError::corrupt(format!(
                "negative joint count {} at byte {}",
                count, start
            )));
        }
        let count = count as usize;
        let mut joints = Vec::with_capacity(count.min(remaining(&cursor) / JOINT_SIZE));
        for _ in 0..count {
            let name = read_fixed_name(&mut cursor).map_err(&eof)?;
            let weight = cursor.read_f32::<LittleEndian>().map_err(&eof)?;
            joints.push((name, weight.min(1.0)));
        }
        groups.push(JointWeights { joints });
    }

    Ok(groups)
}

// ============================================================================
// Armature stream
// ============================================================================

/// One bone entry of an animation frame
#[derive(Debug, Clone, PartialEq)]
pub struct PoseBone {
    pub name: String,
    /// Empty or unknown when the bone is a root
    pub parent: String,
    pub transform: BoneTransform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    pub frame: u32,
    pub bones: Vec<PoseBone>,
}

/// Decoded `<base><i>.animated_data`
#[derive(Debug, Clone, PartialEq)]
pub struct ArmatureData {
    pub name: String,
    /// Frame index of the non-animated (bind) pose
    pub bind_frame: u32,
    pub bind_pose: Vec<(String, BoneTransform)>,
    pub poses: Vec<PoseFrame>,
}

pub fn decode_armature_stream(path: &Path, bytes: &[u8]) -> Result<ArmatureData> {
    let mut cursor = Cursor::new(bytes);
    let eof = truncated(path, bytes.len());

    let name = read_fixed_name(&mut cursor).map_err(&eof)?;
    let bind_frame = cursor.read_u32::<LittleEndian>().map_err(&eof)?;

    let bone_count = cursor.read_u32::<LittleEndian>().map_err(&eof)?;
    let mut bind_pose = Vec::new();
    for _ in 0..bone_count {
        let bone = read_fixed_name(&mut cursor).map_err(&eof)?;
        let transform = read_transform(&mut cursor).map_err(&eof)?;
        bind_pose.push((bone, transform));
    }

    let pose_count = cursor.read_u32::<LittleEndian>().map_err(&eof)?;
    let mut poses = Vec::new();
    for _ in 0..pose_count {
        let frame = cursor.read_u32::<LittleEndian>().map_err(&eof)?;
        let bones_in_pose = cursor.read_u32::<LittleEndian>().map_err(&eof)?;
        let mut bones = Vec::new();
        for _ in 0..bones_in_pose {
            let name = read_fixed_name(&mut cursor).map_err(&eof)?;
            let parent = read_fixed_name(&mut cursor).map_err(&eof)?;
            let transform = read_transform(&mut cursor).map_err(&eof)?;
            bones.push(PoseBone {
                name,
                parent,
                transform,
            });
        }
        poses.push(PoseFrame { frame, bones });
    }

    Ok(ArmatureData {
        name,
        bind_frame,
        bind_pose,
        poses,
    })
}

fn read_fixed_name(cursor: &mut Cursor<&[u8]>) -> io::Result<String> {
    let mut raw = [0u8; NAME_LEN];
    cursor.read_exact(&mut raw)?;
    Ok(fixed_name(&raw))
}

fn read_transform(cursor: &mut Cursor<&[u8]>) -> io::Result<BoneTransform> {
    let mut raw = [0u8; BoneTransform::SIZE];
    cursor.read_exact(&mut raw)?;
    BoneTransform::from_bytes(&raw).ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
}
