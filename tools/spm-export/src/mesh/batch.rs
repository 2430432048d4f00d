//! Texture-run batching
//!
//! Triangles are ordered by their material key so that triangles sharing
//! a texture pair become contiguous. Each contiguous span is a run and
//! becomes one batch in the file.

use hashbrown::HashMap;
use spm_common::MAX_TABLE_ENTRIES;

use super::types::Triangle;
use crate::error::{CompileError, Result};

/// Stable sort by material key; equal keys keep their input order
pub fn sort_triangles(triangles: &mut [Triangle]) {
    triangles.sort_by(|a, b| a.key().cmp(b.key()));
}

/// Texture pair table with ids in first-seen order
#[derive(Debug, Clone, Default)]
pub struct TextureTable {
    entries: Vec<(String, String)>,
    ids: HashMap<String, u16>,
}

impl TextureTable {
    /// Build the table from a globally sorted triangle list
    pub fn from_sorted(triangles: &[Triangle]) -> Result<Self> {
        let mut table = Self::default();
        for triangle in triangles {
            if table.ids.contains_key(triangle.key()) {
                continue;
            }
            if table.entries.len() >= MAX_TABLE_ENTRIES {
                let distinct = count_keys(triangles);
                return Err(CompileError::capacity(
                    "textures",
                    distinct,
                    MAX_TABLE_ENTRIES,
                ));
            }
            let id = table.entries.len() as u16;
            table.ids.insert(triangle.key().to_string(), id);
            table
                .entries
                .push((triangle.primary.clone(), triangle.secondary.clone()));
        }
        Ok(table)
    }

    pub fn id(&self, key: &str) -> Option<u16> {
        self.ids.get(key).copied()
    }

    /// `(primary, secondary)` names in id order
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn count_keys(triangles: &[Triangle]) -> usize {
    let mut keys = hashbrown::HashSet::new();
    for triangle in triangles {
        keys.insert(triangle.key());
    }
    keys.len()
}

/// One contiguous span of triangles sharing a texture pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRun {
    /// Offset of the first triangle of the run
    pub start: usize,
    /// Number of triangles in the run
    pub count: usize,
    pub texture_id: u16,
    pub has_uv_one: bool,
    pub has_uv_two: bool,
}

impl TextureRun {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.count
    }
}

/// Split a key-sorted triangle list into texture runs
pub fn texture_runs(triangles: &[Triangle], table: &TextureTable) -> Result<Vec<TextureRun>> {
    let mut runs: Vec<TextureRun> = Vec::new();
    let mut current: Option<&str> = None;

    for (offset, triangle) in triangles.iter().enumerate() {
        if current == Some(triangle.key()) {
            if let Some(run) = runs.last_mut() {
                run.count += 1;
            }
            continue;
        }
        let texture_id = table.id(triangle.key()).ok_or_else(|| {
            CompileError::corrupt(format!("texture pair {:?} has no id", triangle.key()))
        })?;
        runs.push(TextureRun {
            start: offset,
            count: 1,
            texture_id,
            has_uv_one: !triangle.primary.is_empty(),
            has_uv_two: !triangle.secondary.is_empty(),
        });
        current = Some(triangle.key());
    }

    Ok(runs)
}
