//! Vertex data quantization helpers
//!
//! Converts f32 vertex attributes into the compact encodings stored in SPM
//! vertex buffers:
//! - f32 → f16 (IEEE 754 half-float) for UVs and skin weights
//! - f32x4 → signed 10:10:10:2 for normals, tangents and bitangents
//! - linear f32 RGB → 8-bit color with a one-byte "pure white" shortcut
//!
//! Used by both `spm-export` (writer) and [`crate::reader`].

use half::f16;

// ============================================================================
// Index Width
// ============================================================================

/// Width of one index in a batch's index buffer.
///
/// Chosen from the size of the batch's vertex buffer so small batches use
/// 1-byte indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    /// Select the narrowest width able to address `vertex_count` vertices
    #[inline]
    pub const fn for_vertex_count(vertex_count: u32) -> Self {
        if vertex_count > u16::MAX as u32 {
            Self::U32
        } else if vertex_count > u8::MAX as u32 {
            Self::U16
        } else {
            Self::U8
        }
    }

    /// Size of one index in bytes
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Append `index` truncated to this width (little-endian)
    #[inline]
    pub fn push(self, out: &mut Vec<u8>, index: u32) {
        out.extend_from_slice(&index.to_le_bytes()[..self.bytes()]);
    }
}

// ============================================================================
// Half-Float (f16) Conversion
// ============================================================================

/// Convert f32 to f16 bits
#[inline]
pub fn f32_to_f16(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

/// Convert f16 bits to f32
#[inline]
pub fn f16_to_f32(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Pack a 2D UV coordinate (f32x2) to Float16x2 bits
#[inline]
pub fn pack_uv_f16(u: f32, v: f32) -> [u16; 2] {
    [f32_to_f16(u), f32_to_f16(v)]
}

/// Pack four skin weights to Float16x4 bits
#[inline]
pub fn pack_weights_f16(weights: [f32; 4]) -> [u16; 4] {
    weights.map(f32_to_f16)
}

// ============================================================================
// 10:10:10:2 Signed Packing
// ============================================================================

/// Quantize one clamped component to a signed integer.
///
/// Positive values scale by `positive_scale` (511 / 1), negative values by
/// `positive_scale + 1` (512 / 2), both rounded away from zero and then
/// truncated toward zero like a C integer cast.
#[inline]
fn quantize_signed(value: f32, positive_scale: f32) -> i32 {
    let v = value.clamp(-1.0, 1.0);
    if v > 0.0 {
        (v * positive_scale + 0.5) as i32
    } else {
        (v * (positive_scale + 1.0) - 0.5) as i32
    }
}

/// Pack four signed components into one u32 as `[x:10][y:10][z:10][w:2]`
/// (x in the lowest bits).
pub fn pack_10_10_10_2(v: [f32; 4]) -> u32 {
    let x = (quantize_signed(v[0], 511.0) as u32) & 0x3FF;
    let y = (quantize_signed(v[1], 511.0) as u32) & 0x3FF;
    let z = (quantize_signed(v[2], 511.0) as u32) & 0x3FF;
    let w = (quantize_signed(v[3], 1.0) as u32) & 0x3;
    x | (y << 10) | (z << 20) | (w << 30)
}

/// Pack a direction (normal, tangent or bitangent) with w = 0
#[inline]
pub fn pack_direction(dir: glam::Vec3) -> u32 {
    pack_10_10_10_2([dir.x, dir.y, dir.z, 0.0])
}

#[inline]
fn sign_extend(bits: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((bits << shift) as i32) >> shift
}

#[inline]
fn dequantize_signed(part: i32, positive_scale: f32) -> f32 {
    if part > 0 {
        part as f32 / positive_scale
    } else {
        part as f32 / (positive_scale + 1.0)
    }
}

/// Unpack a 10:10:10:2 value back to four floats in [-1, 1]
pub fn unpack_10_10_10_2(packed: u32) -> [f32; 4] {
    [
        dequantize_signed(sign_extend(packed & 0x3FF, 10), 511.0),
        dequantize_signed(sign_extend((packed >> 10) & 0x3FF, 10), 511.0),
        dequantize_signed(sign_extend((packed >> 20) & 0x3FF, 10), 511.0),
        dequantize_signed(sign_extend((packed >> 30) & 0x3, 2), 1.0),
    ]
}

/// Unpack a 10:10:10:2 direction, dropping w
#[inline]
pub fn unpack_direction(packed: u32) -> glam::Vec3 {
    let [x, y, z, _] = unpack_10_10_10_2(packed);
    glam::Vec3::new(x, y, z)
}

// ============================================================================
// Color Packing
// ============================================================================

/// Leading byte of a vertex color that is pure white (no RGB follows)
pub const COLOR_WHITE_TAG: u8 = 128;
/// Leading byte of a vertex color followed by three RGB bytes
pub const COLOR_RGB_TAG: u8 = 255;

/// Quantize a linear RGB color to 8 bits per channel (round to nearest)
#[inline]
pub fn quantize_color(rgb: [f32; 3]) -> [u8; 3] {
    rgb.map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
}

/// Append an 8-bit vertex color: `[128]` for white, `[255, r, g, b]` otherwise
pub fn pack_vertex_color(out: &mut Vec<u8>, rgb: [u8; 3]) {
    if rgb == [255, 255, 255] {
        out.push(COLOR_WHITE_TAG);
    } else {
        out.push(COLOR_RGB_TAG);
        out.extend_from_slice(&rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_width_thresholds() {
        assert_eq!(IndexWidth::for_vertex_count(0), IndexWidth::U8);
        assert_eq!(IndexWidth::for_vertex_count(200), IndexWidth::U8);
        assert_eq!(IndexWidth::for_vertex_count(255), IndexWidth::U8);
        assert_eq!(IndexWidth::for_vertex_count(256), IndexWidth::U16);
        assert_eq!(IndexWidth::for_vertex_count(60000), IndexWidth::U16);
        assert_eq!(IndexWidth::for_vertex_count(65535), IndexWidth::U16);
        assert_eq!(IndexWidth::for_vertex_count(65536), IndexWidth::U32);
        assert_eq!(IndexWidth::for_vertex_count(70000), IndexWidth::U32);
    }

    #[test]
    fn test_index_width_push_truncates_little_endian() {
        let mut out = Vec::new();
        IndexWidth::U16.push(&mut out, 0x0102);
        IndexWidth::U8.push(&mut out, 7);
        IndexWidth::U32.push(&mut out, 0x0A0B0C0D);
        assert_eq!(out, vec![0x02, 0x01, 7, 0x0D, 0x0C, 0x0B, 0x0A]);
    }

    #[test]
    fn test_half_float_uv() {
        let packed = pack_uv_f16(0.5, 1.0);
        assert_eq!(packed[0], 0x3800);
        assert_eq!(packed[1], 0x3C00);
        assert_eq!(f16_to_f32(packed[0]), 0.5);
    }

    #[test]
    fn test_pack_10_10_10_2_extremes() {
        assert_eq!(pack_10_10_10_2([0.0, 0.0, 0.0, 0.0]), 0);
        // +1 -> 511, -1 -> -512 (0x200 after masking)
        assert_eq!(pack_10_10_10_2([1.0, 0.0, 0.0, 0.0]), 511);
        assert_eq!(pack_10_10_10_2([-1.0, 0.0, 0.0, 0.0]), 0x200);
        assert_eq!(pack_10_10_10_2([0.0, 1.0, 0.0, 0.0]), 511 << 10);
        assert_eq!(pack_10_10_10_2([0.0, 0.0, 0.0, 1.0]), 1 << 30);
        assert_eq!(pack_10_10_10_2([0.0, 0.0, 0.0, -1.0]), 2 << 30);
        // Out-of-range input is clamped
        assert_eq!(pack_10_10_10_2([4.0, 0.0, 0.0, 0.0]), 511);
    }

    #[test]
    fn test_direction_roundtrip_precision() {
        let dirs = [
            glam::Vec3::X,
            glam::Vec3::NEG_Y,
            glam::Vec3::new(0.577, -0.577, 0.577),
        ];
        for dir in dirs {
            let decoded = unpack_direction(pack_direction(dir));
            assert!((decoded - dir).length() < 0.01, "roundtrip failed for {dir:?}");
        }
    }

    #[test]
    fn test_vertex_color_white_shortcut() {
        let mut out = Vec::new();
        pack_vertex_color(&mut out, [255, 255, 255]);
        assert_eq!(out, vec![COLOR_WHITE_TAG]);

        out.clear();
        pack_vertex_color(&mut out, [10, 20, 255]);
        assert_eq!(out, vec![COLOR_RGB_TAG, 10, 20, 255]);
    }

    #[test]
    fn test_quantize_color() {
        assert_eq!(quantize_color([1.0, 1.0, 1.0]), [255, 255, 255]);
        assert_eq!(quantize_color([0.0, 0.5, 2.0]), [0, 128, 255]);
    }
}
