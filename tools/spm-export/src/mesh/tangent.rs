//! Tangent / bitangent derivation from primary UV gradients
//!
//! All triangles are welded into one temporary pool. Every face computes a
//! basis for each of its corners and stores it on the pooled vertex; when
//! several faces share a pooled vertex the last face processed wins. The
//! final basis is then copied back onto every triangle corner.

use glam::{Vec2, Vec3};

use super::types::Triangle;
use super::weld::weld;
use crate::error::Result;

/// Face basis seen from corner `p1` of the triangle (p1, p2, p3)
///
/// Returns `(tangent, bitangent)`. Degenerate UV layouts produce zero
/// vectors instead of dividing by zero.
pub fn face_basis(p1: Vec3, p2: Vec3, p3: Vec3, t1: Vec2, t2: Vec2, t3: Vec2) -> (Vec3, Vec3) {
    let v1 = p1 - p2;
    let v2 = p3 - p1;
    let normal = v2.cross(v1).normalize_or_zero();

    let dx1 = t1.x - t2.x;
    let dx2 = t3.x - t1.x;
    let mut bitangent = (v1 * dx2 - v2 * dx1).normalize_or_zero();

    let dy1 = t1.y - t2.y;
    let dy2 = t3.y - t1.y;
    let mut tangent = (v1 * dy2 - v2 * dy1).normalize_or_zero();

    if tangent.cross(bitangent).dot(normal) < 0.0 {
        tangent = -tangent;
        bitangent = -bitangent;
    }

    (tangent, bitangent)
}

/// Fill in `tangent`/`bitangent` on every corner of `triangles`
pub fn compute_tangents(triangles: &mut [Triangle]) -> Result<()> {
    let pool = weld(triangles)?;
    let mut basis = vec![(Vec3::ZERO, Vec3::ZERO); pool.vertices.len()];

    for face in pool.indices.chunks_exact(3) {
        for corner in 0..3 {
            let a = face[corner] as usize;
            let b = face[(corner + 1) % 3] as usize;
            let c = face[(corner + 2) % 3] as usize;
            let (va, vb, vc) = (&pool.vertices[a], &pool.vertices[b], &pool.vertices[c]);
            basis[a] = face_basis(
                va.position,
                vb.position,
                vc.position,
                va.uv_one,
                vb.uv_one,
                vc.uv_one,
            );
        }
    }

    for (triangle, face) in triangles.iter_mut().zip(pool.indices.chunks_exact(3)) {
        for (vertex, &index) in triangle.corners.iter_mut().zip(face) {
            let (tangent, bitangent) = basis[index as usize];
            vertex.tangent = tangent;
            vertex.bitangent = bitangent;
        }
    }

    Ok(())
}
