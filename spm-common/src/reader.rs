//! SPM file decoder
//!
//! Parses a complete `.spm` file back into plain Rust values. Used by the
//! `spm-export inspect` command and by tests to check encoder output.
//!
//! # Layout
//! ```text
//! header                      4 bytes (see SpmHeader)
//! bounding box                24 bytes
//! texture count               u16
//!   per texture               u8 len + primary name, u8 len + secondary name
//! sector count                u16
//!   per sector                u16 batch count
//!     per batch               u32 vertex count, u32 index count, u16 texture id,
//!                             vertex buffer, index buffer (1/2/4-byte indices)
//!     sector bbox             24 bytes (static-sectored only)
//! static-sectored:            u16 reserved (0)
//! skinned:                    armature block
//! ```

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::FormatError;
use crate::formats::{
    Aabb, BinarySerializable, BoneTransform, MeshType, SPM_MAGIC, SPM_VERSION, SpmHeader,
};
use crate::packing::{COLOR_WHITE_TAG, IndexWidth, f16_to_f32};

/// Decoded SPM file
#[derive(Debug, Clone, PartialEq)]
pub struct SpmFile {
    pub header: SpmHeader,
    pub bbox: Aabb,
    pub textures: Vec<TextureEntry>,
    pub sectors: Vec<Sector>,
    /// Present for skinned meshes
    pub armatures: Option<ArmatureBlock>,
    /// Visibility placeholder of static-sectored meshes
    pub visibility_reserved: Option<u16>,
}

impl SpmFile {
    /// Total number of triangles across all sectors and batches
    pub fn triangle_count(&self) -> usize {
        self.sectors
            .iter()
            .flat_map(|s| &s.batches)
            .map(|b| b.indices.len() / 3)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureEntry {
    pub primary: String,
    pub secondary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    pub batches: Vec<Batch>,
    /// Written only for static-sectored meshes
    pub bbox: Option<Aabb>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub texture_id: u16,
    pub index_width: IndexWidth,
    pub vertices: Vec<DecodedVertex>,
    pub indices: Vec<u32>,
}

/// One vertex with every attribute the file carried for it.
///
/// Normals and tangents stay in their packed 10:10:10:2 form; unpack them
/// with [`crate::packing::unpack_direction`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecodedVertex {
    pub position: [f32; 3],
    pub normal: Option<u32>,
    pub color: Option<[u8; 3]>,
    pub uv_one: Option<[f32; 2]>,
    pub uv_two: Option<[f32; 2]>,
    pub tangent: Option<u32>,
    pub bitangent: Option<u32>,
    pub bones: Option<[i16; 4]>,
    pub weights: Option<[f32; 4]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArmatureBlock {
    pub bind_frame: u16,
    pub armatures: Vec<DecodedArmature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedArmature {
    /// Bones `0..weighted_bone_count` carry skin weight
    pub weighted_bone_count: u16,
    pub bone_names: Vec<String>,
    pub bind_pose: Vec<BoneTransform>,
    pub parents: Vec<u16>,
    pub frames: Vec<DecodedFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub frame_index: u16,
    pub pose: Vec<BoneTransform>,
}

/// Smallest encoded vertex: a bare position
const MIN_VERTEX_SIZE: usize = 12;

/// Per-batch attribute switches derived from the header and texture entry
#[derive(Debug, Clone, Copy)]
struct VertexAttributes {
    normals: bool,
    vertex_color: bool,
    uv_one: bool,
    uv_two: bool,
    tangents: bool,
    skinned: bool,
}

/// Decode a complete SPM file
pub fn read_spm(bytes: &[u8]) -> Result<SpmFile, FormatError> {
    let mut cursor = Cursor::new(bytes);
    let header = read_header(&mut cursor)?;
    let bbox = read_record::<Aabb>(&mut cursor)?;

    let texture_count = cursor.read_u16::<LittleEndian>()? as usize;
    let mut textures = Vec::with_capacity(texture_count);
    for _ in 0..texture_count {
        let primary = read_short_name(&mut cursor)?;
        let secondary = read_short_name(&mut cursor)?;
        textures.push(TextureEntry { primary, secondary });
    }

    let sectored = header.mesh_type == MeshType::StaticSectored;
    let sector_count = cursor.read_u16::<LittleEndian>()? as usize;
    let mut sectors = Vec::with_capacity(sector_count);
    for _ in 0..sector_count {
        let batch_count = cursor.read_u16::<LittleEndian>()? as usize;
        let mut batches = Vec::with_capacity(batch_count);
        for _ in 0..batch_count {
            batches.push(read_batch(&mut cursor, &header, &textures)?);
        }
        let bbox = if sectored {
            Some(read_record::<Aabb>(&mut cursor)?)
        } else {
            None
        };
        sectors.push(Sector { batches, bbox });
    }

    let (armatures, visibility_reserved) = match header.mesh_type {
        MeshType::Skinned => (Some(read_armature_block(&mut cursor)?), None),
        MeshType::StaticSectored => (None, Some(cursor.read_u16::<LittleEndian>()?)),
        MeshType::Plain => (None, None),
    };

    Ok(SpmFile {
        header,
        bbox,
        textures,
        sectors,
        armatures,
        visibility_reserved,
    })
}

/// Bytes left after the cursor position
fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let position = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    cursor.get_ref().len().saturating_sub(position)
}

fn read_header(cursor: &mut Cursor<&[u8]>) -> Result<SpmHeader, FormatError> {
    let mut raw = [0u8; SpmHeader::SIZE];
    cursor.read_exact(&mut raw)?;
    if raw[0..2] != SPM_MAGIC {
        return Err(FormatError::BadMagic);
    }
    let version = raw[2] >> 3;
    if version != SPM_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }
    SpmHeader::from_bytes(&raw).ok_or(FormatError::UnknownMeshType(raw[2] & 0x7))
}

/// Read one fixed-size record
fn read_record<T: BinarySerializable>(cursor: &mut Cursor<&[u8]>) -> Result<T, FormatError> {
    let mut raw = vec![0u8; T::SIZE];
    cursor.read_exact(&mut raw)?;
    T::deserialize(&raw).ok_or(FormatError::UnexpectedEof)
}

/// Read a u8-length-prefixed name
fn read_short_name(cursor: &mut Cursor<&[u8]>) -> Result<String, FormatError> {
    let len = cursor.read_u8()? as usize;
    let mut raw = vec![0u8; len];
    cursor.read_exact(&mut raw)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn read_index(cursor: &mut Cursor<&[u8]>, width: IndexWidth) -> Result<u32, FormatError> {
    Ok(match width {
        IndexWidth::U8 => cursor.read_u8()? as u32,
        IndexWidth::U16 => cursor.read_u16::<LittleEndian>()? as u32,
        IndexWidth::U32 => cursor.read_u32::<LittleEndian>()?,
    })
}

fn read_batch(
    cursor: &mut Cursor<&[u8]>,
    header: &SpmHeader,
    textures: &[TextureEntry],
) -> Result<Batch, FormatError> {
    let vertex_count = cursor.read_u32::<LittleEndian>()?;
    let index_count = cursor.read_u32::<LittleEndian>()?;
    let texture_id = cursor.read_u16::<LittleEndian>()?;
    let texture = textures
        .get(texture_id as usize)
        .ok_or(FormatError::TextureOutOfRange {
            id: texture_id,
            count: textures.len(),
        })?;

    let uv_one = !texture.primary.is_empty();
    let attributes = VertexAttributes {
        normals: header.has_normals(),
        vertex_color: header.has_vertex_color(),
        uv_one,
        uv_two: uv_one && !texture.secondary.is_empty(),
        tangents: uv_one && header.has_tangents(),
        skinned: header.mesh_type == MeshType::Skinned,
    };

    // Counts come from the file; never reserve more than the bytes left can hold
    let vertex_count = vertex_count as usize;
    let mut vertices = Vec::with_capacity(vertex_count.min(remaining(cursor) / MIN_VERTEX_SIZE));
    for _ in 0..vertex_count {
        vertices.push(read_vertex(cursor, attributes)?);
    }

    let index_width = IndexWidth::for_vertex_count(vertex_count as u32);
    let index_count = index_count as usize;
    let index_bytes = index_count
        .checked_mul(index_width.bytes())
        .ok_or(FormatError::UnexpectedEof)?;
    if index_bytes > remaining(cursor) {
        return Err(FormatError::UnexpectedEof);
    }
    let indices = (0..index_count)
        .map(|_| read_index(cursor, index_width))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Batch {
        texture_id,
        index_width,
        vertices,
        indices,
    })
}

fn read_vertex(
    cursor: &mut Cursor<&[u8]>,
    attributes: VertexAttributes,
) -> Result<DecodedVertex, FormatError> {
    let mut position = [0.0f32; 3];
    cursor.read_f32_into::<LittleEndian>(&mut position)?;
    let mut vertex = DecodedVertex {
        position,
        ..Default::default()
    };

    if attributes.normals {
        vertex.normal = Some(cursor.read_u32::<LittleEndian>()?);
    }
    if attributes.vertex_color {
        vertex.color = Some(if cursor.read_u8()? == COLOR_WHITE_TAG {
            [255, 255, 255]
        } else {
            let mut rgb = [0u8; 3];
            cursor.read_exact(&mut rgb)?;
            rgb
        });
    }
    if attributes.uv_one {
        vertex.uv_one = Some(read_half2(cursor)?);
        if attributes.uv_two {
            vertex.uv_two = Some(read_half2(cursor)?);
        }
        if attributes.tangents {
            vertex.tangent = Some(cursor.read_u32::<LittleEndian>()?);
            vertex.bitangent = Some(cursor.read_u32::<LittleEndian>()?);
        }
    }
    if attributes.skinned {
        let mut bones = [0i16; 4];
        cursor.read_i16_into::<LittleEndian>(&mut bones)?;
        let mut weights = [0u16; 4];
        cursor.read_u16_into::<LittleEndian>(&mut weights)?;
        vertex.bones = Some(bones);
        vertex.weights = Some(weights.map(f16_to_f32));
    }

    Ok(vertex)
}

fn read_half2(cursor: &mut Cursor<&[u8]>) -> Result<[f32; 2], FormatError> {
    let mut raw = [0u16; 2];
    cursor.read_u16_into::<LittleEndian>(&mut raw)?;
    Ok(raw.map(f16_to_f32))
}

fn read_armature_block(cursor: &mut Cursor<&[u8]>) -> Result<ArmatureBlock, FormatError> {
    let armature_count = cursor.read_u8()? as usize;
    let bind_frame = cursor.read_u16::<LittleEndian>()?;
    let mut armatures = Vec::with_capacity(armature_count);

    for _ in 0..armature_count {
        let weighted_bone_count = cursor.read_u16::<LittleEndian>()?;
        let bone_count = cursor.read_u16::<LittleEndian>()? as usize;

        let bone_names = (0..bone_count)
            .map(|_| read_short_name(cursor))
            .collect::<Result<Vec<_>, _>>()?;
        let bind_pose = (0..bone_count)
            .map(|_| read_record::<BoneTransform>(cursor))
            .collect::<Result<Vec<_>, _>>()?;
        let mut parents = vec![0u16; bone_count];
        cursor.read_u16_into::<LittleEndian>(&mut parents)?;

        let frame_count = cursor.read_u16::<LittleEndian>()? as usize;
        let mut frames = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            let frame_index = cursor.read_u16::<LittleEndian>()?;
            let pose = (0..bone_count)
                .map(|_| read_record::<BoneTransform>(cursor))
                .collect::<Result<Vec<_>, _>>()?;
            frames.push(DecodedFrame { frame_index, pose });
        }

        armatures.push(DecodedArmature {
            weighted_bone_count,
            bone_names,
            bind_pose,
            parents,
            frames,
        });
    }

    Ok(ArmatureBlock {
        bind_frame,
        armatures,
    })
}
