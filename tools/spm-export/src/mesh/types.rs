//! Vertex and triangle types for mesh compilation

use glam::{Vec2, Vec3};
use spm_common::Aabb;
use std::hash::{Hash, Hasher};

/// Bone index of an unused influence slot
pub const NO_BONE: i16 = -1;

/// One triangle corner after assembly
///
/// Identity (`Eq`/`Hash`) covers position, normal, color, both UV sets,
/// bones and weights. `tangent`/`bitangent` are derived values and never
/// take part in welding. NaN components are not supported.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// 8-bit quantized vertex color
    pub color: [u8; 3],
    pub uv_one: Vec2,
    pub uv_two: Vec2,
    pub bones: [i16; 4],
    pub weights: [f32; 4],
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            color: [255, 255, 255],
            uv_one: Vec2::ZERO,
            uv_two: Vec2::ZERO,
            bones: [NO_BONE; 4],
            weights: [0.0; 4],
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
        }
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.normal == other.normal
            && self.color == other.color
            && self.uv_one == other.uv_one
            && self.uv_two == other.uv_two
            && self.bones == other.bones
            && self.weights == other.weights
    }
}

impl Eq for Vertex {}

/// Bits of `value` with -0.0 folded onto 0.0, so equal floats hash equally
#[inline]
fn canonical_bits(value: f32) -> u32 {
    if value == 0.0 { 0 } else { value.to_bits() }
}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let floats = self
            .position
            .to_array()
            .into_iter()
            .chain(self.normal.to_array())
            .chain(self.uv_one.to_array())
            .chain(self.uv_two.to_array())
            .chain(self.weights);
        for value in floats {
            state.write_u32(canonical_bits(value));
        }
        self.color.hash(state);
        self.bones.hash(state);
    }
}

/// Three corners plus the texture pair they are drawn with
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub corners: [Vertex; 3],
    pub primary: String,
    pub secondary: String,
    key: String,
}

impl Triangle {
    pub fn new(corners: [Vertex; 3], primary: String, secondary: String) -> Self {
        let key = format!("{primary}{secondary}");
        Self {
            corners,
            primary,
            secondary,
            key,
        }
    }

    /// Material sort key: primary name followed by secondary name
    pub fn key(&self) -> &str {
        &self.key
    }

    /// True when all three corners lie inside `bbox` (bounds inclusive)
    pub fn inside(&self, bbox: &Aabb) -> bool {
        self.corners.iter().all(|v| bbox.contains(v.position))
    }

    pub fn bounds(&self) -> Aabb {
        let mut bbox = Aabb::new(self.corners[0].position, self.corners[0].position);
        bbox.add_point(self.corners[1].position);
        bbox.add_point(self.corners[2].position);
        bbox
    }
}
