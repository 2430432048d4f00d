//! SPM file header (.spm)
//!
//! # Layout
//! ```text
//! 0x00: magic "SP" (2 bytes)
//! 0x02: version << 3 | mesh type (u8, 5-bit version, 3-bit type)
//! 0x03: attribute flags (u8)
//! ```

/// Magic bytes at the start of every SPM file
pub const SPM_MAGIC: [u8; 2] = *b"SP";
/// Current format version (5 bits)
pub const SPM_VERSION: u8 = 1;

/// Attribute flag: packed normals are present
pub const FLAG_NORMALS: u8 = 1 << 0;
/// Attribute flag: vertex colors are present
pub const FLAG_VERTEX_COLOR: u8 = 1 << 1;
/// Attribute flag: tangents/bitangents are present (for batches with UVs)
pub const FLAG_TANGENTS: u8 = 1 << 2;

/// Kind of mesh stored in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MeshType {
    /// Static scenery partitioned into spatial sectors
    StaticSectored = 0,
    /// Skinned mesh followed by an armature block
    Skinned = 1,
    /// Plain mesh in a single sector
    Plain = 2,
}

impl MeshType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::StaticSectored),
            1 => Some(Self::Skinned),
            2 => Some(Self::Plain),
            _ => None,
        }
    }

    /// Legacy four-letter name of the mesh type
    pub fn tag(self) -> &'static str {
        match self {
            Self::StaticSectored => "SPMS",
            Self::Skinned => "SPMA",
            Self::Plain => "SPMN",
        }
    }
}

/// SPM header (4 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpmHeader {
    pub version: u8,
    pub mesh_type: MeshType,
    pub flags: u8,
}

impl SpmHeader {
    pub const SIZE: usize = 4;

    pub fn new(mesh_type: MeshType, flags: u8) -> Self {
        Self {
            version: SPM_VERSION,
            mesh_type,
            flags,
        }
    }

    pub fn has_normals(&self) -> bool {
        self.flags & FLAG_NORMALS != 0
    }

    pub fn has_vertex_color(&self) -> bool {
        self.flags & FLAG_VERTEX_COLOR != 0
    }

    pub fn has_tangents(&self) -> bool {
        self.flags & FLAG_TANGENTS != 0
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [
            SPM_MAGIC[0],
            SPM_MAGIC[1],
            (self.version << 3) | (self.mesh_type as u8 & 0x7),
            self.flags,
        ]
    }

    /// Read header from bytes
    ///
    /// Returns `None` if the slice is short, the magic is wrong or the mesh
    /// type is unknown. Use [`crate::reader`] for a detailed error.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE || bytes[0..2] != SPM_MAGIC {
            return None;
        }
        Some(Self {
            version: bytes[2] >> 3,
            mesh_type: MeshType::from_u8(bytes[2] & 0x7)?,
            flags: bytes[3],
        })
    }
}
