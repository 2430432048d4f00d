//! spm-export - SPM mesh compiler
//!
//! Turns exporter intermediate streams into `.spm` meshes and inspects
//! existing `.spm` files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use spm_export::{CompileError, CompileOptions, load_options, read_spm};

#[derive(Parser)]
#[command(name = "spm-export")]
#[command(about = "SPM mesh compiler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile `<BASE>.mesh_data` (and skin streams) into the SPM file `<BASE>`
    Compile {
        /// Output path; intermediate files are named after it
        base: PathBuf,

        /// Options file (TOML); flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Partition static scenery into sectors
        #[arg(long)]
        space_partition: bool,

        /// Number of armature files; above zero selects skinned output
        #[arg(long, value_name = "N")]
        armatures: Option<u32>,

        /// Export vertex normals
        #[arg(long)]
        normals: bool,

        /// Export vertex colors
        #[arg(long)]
        vertex_color: bool,

        /// Export tangents and bitangents
        #[arg(long)]
        tangents: bool,

        /// Do not delete consumed intermediate files
        #[arg(long)]
        keep_intermediate: bool,
    },

    /// Print a summary of an SPM file
    Inspect {
        /// Input .spm file
        input: PathBuf,
    },
}

fn inspect(input: &Path) -> Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let file = read_spm(&bytes).with_context(|| format!("Failed to decode {:?}", input))?;

    tracing::info!(
        "{:?}: {} v{}, normals={} vertex_color={} tangents={}",
        input,
        file.header.mesh_type.tag(),
        file.header.version,
        file.header.has_normals(),
        file.header.has_vertex_color(),
        file.header.has_tangents()
    );
    tracing::info!("Bounds {:?} .. {:?}", file.bbox.min, file.bbox.max);

    for (id, texture) in file.textures.iter().enumerate() {
        tracing::info!("Texture {}: {:?} {:?}", id, texture.primary, texture.secondary);
    }
    for (index, sector) in file.sectors.iter().enumerate() {
        let vertices: usize = sector.batches.iter().map(|b| b.vertices.len()).sum();
        let triangles: usize = sector.batches.iter().map(|b| b.indices.len() / 3).sum();
        tracing::info!(
            "Sector {}: {} batches, {} vertices, {} triangles",
            index,
            sector.batches.len(),
            vertices,
            triangles
        );
    }
    if let Some(block) = &file.armatures {
        tracing::info!("Bind frame {}", block.bind_frame);
        for armature in &block.armatures {
            tracing::info!(
                "Armature: {} bones ({} weighted), {} frames",
                armature.bone_names.len(),
                armature.weighted_bone_count,
                armature.frames.len()
            );
        }
    }
    tracing::info!("{} triangles total", file.triangle_count());
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            base,
            config,
            space_partition,
            armatures,
            normals,
            vertex_color,
            tangents,
            keep_intermediate,
        } => {
            let mut options = match config {
                Some(path) => load_options(&path)?,
                None => CompileOptions::default(),
            };
            options.space_partition |= space_partition;
            options.export_normals |= normals;
            options.export_vertex_color |= vertex_color;
            options.export_tangents |= tangents;
            options.keep_intermediate |= keep_intermediate;
            if let Some(count) = armatures {
                options.armature_count = count;
            }

            tracing::info!("Compiling {:?}", base);
            match spm_export::compile(&base, &options) {
                Ok(report) => tracing::info!(
                    "Done! {} triangles in {} sectors",
                    report.triangle_count,
                    report.sector_count
                ),
                Err(CompileError::MissingInput { path }) => {
                    tracing::warn!("Missing {:?}, nothing to do", path);
                }
                Err(e) => return Err(e).with_context(|| format!("Failed to compile {:?}", base)),
            }
        }

        Commands::Inspect { input } => inspect(&input)?,
    }

    Ok(())
}
