//! Fixed-size SPM records: the file header, bounding boxes and bone
//! transforms.
//!
//! The decoder reads every fixed record through this trait.

/// A record with a constant encoded size in the `.spm` layout
pub trait BinarySerializable: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Encode as little-endian bytes
    fn serialize(&self) -> Vec<u8>;

    /// Decode from the front of `bytes`; `None` when fewer than `SIZE`
    /// bytes are given or the header fields are invalid
    fn deserialize(bytes: &[u8]) -> Option<Self>;
}

impl BinarySerializable for super::SpmHeader {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes)
    }
}

impl BinarySerializable for super::Aabb {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes)
    }
}

impl BinarySerializable for super::BoneTransform {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{Aabb, BoneTransform, MeshType, SpmHeader};

    fn record_size<T: BinarySerializable>() -> usize {
        T::SIZE
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(record_size::<SpmHeader>(), 4);
        assert_eq!(record_size::<Aabb>(), 24);
        assert_eq!(record_size::<BoneTransform>(), 40);
    }

    #[test]
    fn test_deserialize_insufficient_bytes() {
        assert!(SpmHeader::deserialize(&[b'S', b'P', 0x0A]).is_none());
        assert!(Aabb::deserialize(&[0; 23]).is_none());
        assert!(BoneTransform::deserialize(&[0; 39]).is_none());
    }

    #[test]
    fn test_header_trait_roundtrip() {
        let header = SpmHeader::new(MeshType::Skinned, 0x07);
        let bytes = header.serialize();
        assert_eq!(bytes.len(), SpmHeader::SIZE);
        assert_eq!(SpmHeader::deserialize(&bytes), Some(header));
    }
}
