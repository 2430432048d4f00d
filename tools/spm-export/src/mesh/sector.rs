//! Spatial sector partitioning for static scenery
//!
//! The scene box is tiled into cubic cells walking from `max` down to `min`
//! on every axis. Each cell claims the triangles that lie fully inside it.
//! Cells then grow step by step to absorb triangles straddling a cell
//! border; whatever is left after the last step lands in sector 0, which
//! has a zero box and is always written first.
//!
//! Partitioning consumes the triangle list: every triangle is moved into
//! exactly one sector.

use glam::Vec3;
use spm_common::{Aabb, MAX_TABLE_ENTRIES};

use super::types::Triangle;
use crate::config::SectorSettings;
use crate::error::{CompileError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    pub triangles: Vec<Triangle>,
    pub bbox: Aabb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Sector 0 holds the unsectored triangles, cells follow in grid order
    pub sectors: Vec<Sector>,
    /// Number of triangles that fit no cell even after growth
    pub unsectored: usize,
}

impl Partition {
    pub fn triangle_count(&self) -> usize {
        self.sectors.iter().map(|s| s.triangles.len()).sum()
    }
}

/// All triangles in one sector with the scene box (plain and skinned meshes)
pub fn single_sector(triangles: Vec<Triangle>, bounds: Aabb) -> Partition {
    Partition {
        sectors: vec![Sector {
            triangles,
            bbox: bounds,
        }],
        unsectored: 0,
    }
}

/// Upper edges of the cells along one axis, from `max` towards `min`
///
/// Stops after `MAX_TABLE_ENTRIES` edges; more than that can never be
/// written.
fn cell_edges(min: f32, max: f32, size: f32) -> Vec<f32> {
    let mut edges = Vec::new();
    let mut edge = max;
    while edge > min && edges.len() < MAX_TABLE_ENTRIES {
        edges.push(edge);
        let next = edge - size;
        // Stop if the step is lost to float precision
        if next >= edge {
            break;
        }
        edge = next;
    }
    edges
}

/// Move every triangle of `triangles` that fits `bbox` into `claimed`
fn claim(triangles: &mut Vec<Triangle>, bbox: &Aabb, claimed: &mut Vec<Triangle>) {
    let (inside, outside): (Vec<_>, Vec<_>) = std::mem::take(triangles)
        .into_iter()
        .partition(|t| t.inside(bbox));
    claimed.extend(inside);
    *triangles = outside;
}

/// Partition `triangles` into grid cells of `settings.size` over `bounds`
pub fn partition(
    mut triangles: Vec<Triangle>,
    bounds: Aabb,
    settings: &SectorSettings,
) -> Result<Partition> {
    let total = triangles.len();
    let size = settings.size;

    let xs = cell_edges(bounds.min.x, bounds.max.x, size);
    let ys = cell_edges(bounds.min.y, bounds.max.y, size);
    let zs = cell_edges(bounds.min.z, bounds.max.z, size);

    // Sector 0 takes one of the u16 sector slots
    let cell_count = xs
        .len()
        .checked_mul(ys.len())
        .and_then(|n| n.checked_mul(zs.len()))
        .filter(|&n| n < MAX_TABLE_ENTRIES)
        .ok_or_else(|| {
            let count = xs
                .len()
                .saturating_mul(ys.len())
                .saturating_mul(zs.len())
                .saturating_add(1);
            CompileError::capacity("sectors", count, MAX_TABLE_ENTRIES)
        })?;

    let mut cells = Vec::with_capacity(cell_count);
    for &x in &xs {
        for &y in &ys {
            for &z in &zs {
                let max = Vec3::new(x, y, z);
                let bbox = Aabb::new(max - Vec3::splat(size), max);
                let mut claimed = Vec::new();
                claim(&mut triangles, &bbox, &mut claimed);
                cells.push(Sector {
                    triangles: claimed,
                    bbox,
                });
            }
        }
    }

    // `growth_limit` passes that grow and claim, then one claim-only pass
    let mut step = 0u32;
    loop {
        step += 1;
        let last = step > settings.growth_limit;
        for cell in &mut cells {
            if !last {
                cell.bbox = cell.bbox.grown(settings.growth_step);
            }
            // Only cells that already own geometry absorb stragglers
            if cell.triangles.is_empty() || triangles.is_empty() {
                continue;
            }
            claim(&mut triangles, &cell.bbox, &mut cell.triangles);
        }
        if last {
            break;
        }
    }

    let unsectored = triangles.len();
    if unsectored > 0 {
        tracing::warn!("{} triangle(s) too large to fit in any sector", unsectored);
    }

    let mut sectors = Vec::with_capacity(cells.len() + 1);
    sectors.push(Sector {
        triangles,
        bbox: Aabb::ZERO,
    });
    sectors.extend(cells);

    let partition = Partition {
        sectors,
        unsectored,
    };
    debug_assert_eq!(partition.triangle_count(), total);
    Ok(partition)
}
