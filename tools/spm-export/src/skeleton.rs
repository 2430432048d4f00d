//! Armature handling for skinned meshes
//!
//! - resolves every vertex's joint list to at most 4 file-global bone
//!   indices with renormalized weights
//! - writes the armature block that trails a skinned `.spm` file
//!
//! Bones receive a global index the first time they carry weight on some
//! vertex. The counter runs across all armatures in order, so armature `k`
//! owns a contiguous range of global indices. Bones that never carry weight
//! are appended after the weighted ones when the block is written.

use hashbrown::HashMap;
use spm_common::formats::{BoneTransform, NO_PARENT};

use crate::error::{CompileError, Result};
use crate::intermediate::{ArmatureData, ExportRecord, JointWeights, PoseFrame};
use crate::mesh::NO_BONE;

/// Maximum influences stored per vertex
pub const MAX_INFLUENCES: usize = 4;

/// Resolved skin data of one vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinBinding {
    pub bones: [i16; MAX_INFLUENCES],
    pub weights: [f32; MAX_INFLUENCES],
}

impl Default for SkinBinding {
    fn default() -> Self {
        Self {
            bones: [NO_BONE; MAX_INFLUENCES],
            weights: [0.0; MAX_INFLUENCES],
        }
    }
}

// ============================================================================
// Bone table
// ============================================================================

/// Bone names of one armature in insertion order, with their global index
/// once assigned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneTable {
    names: Vec<String>,
    slots: HashMap<String, usize>,
    global: Vec<Option<u32>>,
}

impl BoneTable {
    /// Build from a name list; repeated names keep their first slot
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = Self::default();
        for name in names {
            if table.slots.contains_key(name) {
                continue;
            }
            table.slots.insert(name.to_string(), table.names.len());
            table.names.push(name.to_string());
            table.global.push(None);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn name(&self, slot: usize) -> &str {
        &self.names[slot]
    }

    pub fn global(&self, slot: usize) -> Option<u32> {
        self.global[slot]
    }

    /// Number of bones that received a global index
    pub fn weighted_count(&self) -> usize {
        self.global.iter().filter(|g| g.is_some()).count()
    }

    /// Global index of `slot`, taking the next one from `counter` on first use
    fn assign(&mut self, slot: usize, counter: &mut u32) -> u32 {
        *self.global[slot].get_or_insert_with(|| {
            let index = *counter;
            *counter += 1;
            index
        })
    }

    /// Dense per-armature index of every slot: weighted bones first (global
    /// index minus `offset`), then unweighted bones in insertion order
    fn local_indices(&self, offset: u32) -> Vec<usize> {
        let mut next = self.weighted_count();
        self.global
            .iter()
            .map(|global| match global {
                Some(g) => (g - offset) as usize,
                None => {
                    next += 1;
                    next - 1
                }
            })
            .collect()
    }
}

// ============================================================================
// Armature
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Armature {
    pub name: String,
    pub bind_frame: u32,
    pub bones: BoneTable,
    pub bind_pose: Vec<(String, BoneTransform)>,
    pub frames: Vec<PoseFrame>,
}

impl From<ArmatureData> for Armature {
    /// The bone list comes from the first animation frame, or from the
    /// bind pose when the armature has no frames
    fn from(data: ArmatureData) -> Self {
        let bones = match data.poses.first() {
            Some(frame) => BoneTable::from_names(frame.bones.iter().map(|b| b.name.as_str())),
            None => BoneTable::from_names(data.bind_pose.iter().map(|(name, _)| name.as_str())),
        };
        Self {
            name: data.name,
            bind_frame: data.bind_frame,
            bones,
            bind_pose: data.bind_pose,
            frames: data.poses,
        }
    }
}

// ============================================================================
// Weight resolution
// ============================================================================

/// Reduce candidate `(bone, weight)` pairs to exactly 4 influences
///
/// Candidates are sorted by descending weight (ties keep their order),
/// truncated or padded with `(0, 0.0)`, and renormalized to sum to 1.0
/// unless the kept weights sum to zero.
pub fn select_influences(
    mut candidates: Vec<(u32, f32)>,
) -> ([u32; MAX_INFLUENCES], [f32; MAX_INFLUENCES]) {
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    candidates.resize(MAX_INFLUENCES, (0, 0.0));

    let total: f32 = candidates.iter().map(|(_, w)| w).sum();
    if total > 0.0 {
        for (_, weight) in &mut candidates {
            *weight /= total;
        }
    }

    let mut bones = [0u32; MAX_INFLUENCES];
    let mut weights = [0.0f32; MAX_INFLUENCES];
    for (i, (bone, weight)) in candidates.into_iter().enumerate() {
        bones[i] = bone;
        weights[i] = weight;
    }
    (bones, weights)
}

/// Resolve the skin binding of every vertex record
///
/// `joints` must hold one entry per record. Records whose armature name
/// matches no armature keep the default (no bones, zero weights). Within a
/// record's joint list only the first entry of each bone counts.
pub fn resolve_skinning(
    records: &[ExportRecord],
    joints: &[JointWeights],
    armatures: &mut [Armature],
) -> Result<Vec<SkinBinding>> {
    if joints.len() != records.len() {
        return Err(CompileError::corrupt(format!(
            "{} joint records for {} vertex records",
            joints.len(),
            records.len()
        )));
    }

    let mut bindings = vec![SkinBinding::default(); records.len()];
    let mut counter = 0u32;

    for armature in armatures.iter_mut() {
        for ((record, joint), binding) in records.iter().zip(joints).zip(&mut bindings) {
            if record.armature_name != armature.name {
                continue;
            }

            let mut seen = Vec::with_capacity(joint.joints.len());
            let mut candidates = Vec::with_capacity(joint.joints.len());
            for (name, weight) in &joint.joints {
                let Some(slot) = armature.bones.slot(name) else {
                    continue;
                };
                if seen.contains(&slot) {
                    continue;
                }
                seen.push(slot);
                if *weight > 0.0 {
                    candidates.push((armature.bones.assign(slot, &mut counter), *weight));
                }
            }

            let (bones, weights) = select_influences(candidates);
            for (out, bone) in binding.bones.iter_mut().zip(bones) {
                *out = i16::try_from(bone).map_err(|_| {
                    CompileError::capacity(
                        "skinned bones",
                        bone as usize + 1,
                        i16::MAX as usize + 1,
                    )
                })?;
            }
            binding.weights = weights;
        }
    }

    tracing::debug!("Resolved {} weighted bones", counter);
    Ok(bindings)
}

/// True when at least one vertex has a nonzero primary weight
pub fn has_skin_weights(bindings: &[SkinBinding]) -> bool {
    bindings.iter().any(|b| b.weights[0] != 0.0)
}

// ============================================================================
// Armature block
// ============================================================================

fn to_u16(value: usize, what: &'static str) -> Result<u16> {
    u16::try_from(value).map_err(|_| CompileError::capacity(what, value, u16::MAX as usize))
}

/// Arrange `(name, value)` pairs by the dense index of their bone
fn by_local_index<'a, T>(
    armature: &Armature,
    local: &[usize],
    entries: impl IntoIterator<Item = (&'a str, T)>,
    what: &str,
) -> Result<Vec<T>> {
    let mut ordered: Vec<Option<T>> = std::iter::repeat_with(|| None).take(local.len()).collect();
    let mut count = 0;
    for (name, value) in entries {
        let slot = armature.bones.slot(name).ok_or_else(|| {
            CompileError::corrupt(format!(
                "{} of armature {:?} references unknown bone {:?}",
                what, armature.name, name
            ))
        })?;
        ordered[local[slot]] = Some(value);
        count += 1;
    }
    if count != local.len() {
        return Err(CompileError::corrupt(format!(
            "{} of armature {:?} has {} bones, expected {}",
            what,
            armature.name,
            count,
            local.len()
        )));
    }
    ordered
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| {
            CompileError::corrupt(format!(
                "{} of armature {:?} repeats a bone",
                what, armature.name
            ))
        })
}

/// Append the armature block of a skinned mesh
pub fn write_armature_block(out: &mut Vec<u8>, armatures: &[Armature]) -> Result<()> {
    let count = u8::try_from(armatures.len())
        .map_err(|_| CompileError::capacity("armatures", armatures.len(), u8::MAX as usize))?;
    out.push(count);
    let bind_frame = armatures.first().map_or(0, |a| a.bind_frame) as usize;
    out.extend_from_slice(&to_u16(bind_frame, "bind frame index")?.to_le_bytes());

    let mut offset = 0u32;
    for armature in armatures {
        let bones = &armature.bones;
        let weighted = bones.weighted_count();
        let local = bones.local_indices(offset);
        offset += weighted as u32;

        let mut order = vec![0usize; local.len()];
        for (slot, &index) in local.iter().enumerate() {
            order[index] = slot;
        }

        out.extend_from_slice(&to_u16(weighted, "weighted bones")?.to_le_bytes());
        out.extend_from_slice(&to_u16(bones.len(), "bones")?.to_le_bytes());

        for &slot in &order {
            let name = bones.name(slot);
            let len = u8::try_from(name.len())
                .map_err(|_| CompileError::capacity("bone name bytes", name.len(), 255))?;
            out.push(len);
            out.extend_from_slice(name.as_bytes());
        }

        let bind_pose = by_local_index(
            armature,
            &local,
            armature.bind_pose.iter().map(|(n, t)| (n.as_str(), t)),
            "bind pose",
        )?;
        for transform in bind_pose {
            out.extend_from_slice(&transform.to_bytes());
        }

        let frames = armature
            .frames
            .iter()
            .map(|frame| {
                by_local_index(
                    armature,
                    &local,
                    frame.bones.iter().map(|b| (b.name.as_str(), b)),
                    "animation frame",
                )
            })
            .collect::<Result<Vec<_>>>()?;

        // Parents come from the first frame only
        match frames.first() {
            Some(first) => {
                for bone in first {
                    let parent = bones
                        .slot(&bone.parent)
                        .map_or(NO_PARENT, |slot| local[slot] as u16);
                    out.extend_from_slice(&parent.to_le_bytes());
                }
            }
            None => {
                for _ in 0..bones.len() {
                    out.extend_from_slice(&NO_PARENT.to_le_bytes());
                }
            }
        }

        out.extend_from_slice(&to_u16(frames.len(), "animation frames")?.to_le_bytes());
        for (frame, pose) in armature.frames.iter().zip(&frames) {
            let index = to_u16(frame.frame as usize, "animation frame index")?;
            out.extend_from_slice(&index.to_le_bytes());
            for bone in pose {
                out.extend_from_slice(&bone.transform.to_bytes());
            }
        }
    }

    Ok(())
}
