//! Compile options
//!
//! Options come from an optional TOML file (`--config`) and are then
//! overridden by explicit command line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::error::CompileError;

/// Switches controlling what the compiler emits
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Write packed normals into every vertex
    pub export_normals: bool,
    /// Write vertex colors into every vertex
    pub export_vertex_color: bool,
    /// Compute and write tangent/bitangent for batches with UVs
    pub export_tangents: bool,
    /// Partition static scenery into spatial sectors
    pub space_partition: bool,
    /// Number of `<base><i>.animated_data` files to look for.
    /// Any value above zero selects skinned output.
    pub armature_count: u32,
    /// Leave consumed intermediate files on disk
    pub keep_intermediate: bool,
    pub sectors: SectorSettings,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            export_normals: false,
            export_vertex_color: false,
            export_tangents: false,
            space_partition: false,
            armature_count: 0,
            keep_intermediate: false,
            sectors: SectorSettings::default(),
        }
    }
}

/// Sector grid parameters for static-sectored output
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SectorSettings {
    /// Edge length of one grid cell in world units
    pub size: f32,
    /// Distance each cell grows per growth iteration
    pub growth_step: f32,
    /// Number of growth iterations
    pub growth_limit: u32,
}

impl Default for SectorSettings {
    fn default() -> Self {
        Self {
            size: 100.0,
            growth_step: 1.0,
            growth_limit: 20,
        }
    }
}

impl CompileOptions {
    pub fn validate(&self) -> Result<(), CompileError> {
        let sectors = &self.sectors;
        if !(sectors.size.is_finite() && sectors.size > 0.0) {
            return Err(CompileError::InvalidOptions(format!(
                "sector size must be positive, got {}",
                sectors.size
            )));
        }
        if !(sectors.growth_step.is_finite() && sectors.growth_step >= 0.0) {
            return Err(CompileError::InvalidOptions(format!(
                "sector growth step must not be negative, got {}",
                sectors.growth_step
            )));
        }
        if self.armature_count > u8::MAX as u32 {
            return Err(CompileError::capacity(
                "armatures",
                self.armature_count as usize,
                u8::MAX as usize,
            ));
        }
        Ok(())
    }
}

/// Load options from a TOML file
pub fn load_options(path: &Path) -> Result<CompileOptions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read options: {:?}", path))?;
    let options: CompileOptions = toml::from_str(&content)
        .with_context(|| format!("Failed to parse options: {:?}", path))?;
    options.validate()?;
    Ok(options)
}
