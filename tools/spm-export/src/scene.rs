//! Auxiliary scene XML next to a static-sectored output file
//!
//! - `materials.xml` (shared library two levels above the output directory,
//!   then the track's own): materials drawn with a transparent shader
//! - `quads.xml`, or `navmesh.xml` when there is no quad graph: driveable
//!   quads with a trace position above their center
//!
//! None of these files is required. Missing files are logged, malformed
//! files are reported and skipped, and the run always continues.

use glam::Vec3;
use hashbrown::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{CompileError, Result};

/// Shaders whose materials count as transparent
const TRANSPARENT_SHADERS: [&str; 4] = ["additive", "alphablend", "alphatest", "grass"];

/// One driveable quad
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub points: [Vec3; 4],
    /// Negated mean normal of the triangles (p0, p1, p2) and (p0, p2, p3)
    pub normal: Vec3,
    /// Center offset by one unit along `normal`
    pub trace_pos: Vec3,
}

impl Quad {
    pub fn new(points: [Vec3; 4]) -> Self {
        let [p0, p1, p2, p3] = points;
        let n1 = (p1 - p0).cross(p2 - p0);
        let n2 = (p2 - p0).cross(p3 - p0);
        let normal = (-0.5 * (n1 + n2)).normalize_or_zero();
        let center = 0.25 * (p0 + p1 + p2 + p3);
        Self {
            points,
            normal,
            trace_pos: center + normal,
        }
    }
}

/// Everything collected from the auxiliary XML files
#[derive(Debug, Clone, Default)]
pub struct SceneContext {
    pub transparent_materials: HashSet<String>,
    pub quads: Vec<Quad>,
}

impl SceneContext {
    pub fn is_transparent(&self, material: &str) -> bool {
        self.transparent_materials.contains(material)
    }
}

/// Read `path` if it exists
fn read_xml(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!("Failed to read {:?}: {}", path, e);
            None
        }
    }
}

fn parse_document<'a>(path: &Path, text: &'a str) -> Result<roxmltree::Document<'a>> {
    roxmltree::Document::parse(text).map_err(|source| CompileError::MalformedXml {
        path: path.to_path_buf(),
        source,
    })
}

/// Collect the names of transparent materials into `out`
pub fn parse_materials(path: &Path, text: &str, out: &mut HashSet<String>) -> Result<()> {
    let doc = parse_document(path, text)?;
    for node in doc.descendants().filter(|n| n.has_tag_name("material")) {
        let shader = node.attribute("shader").unwrap_or_default();
        if TRANSPARENT_SHADERS.contains(&shader) {
            out.insert(node.attribute("name").unwrap_or_default().to_string());
        }
    }
    Ok(())
}

fn parse_vec3(text: &str) -> Option<Vec3> {
    let mut parts = text.split_whitespace().map(|p| p.parse::<f32>());
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    Some(Vec3::new(x, y, z))
}

/// Resolve a quad graph point: `"x y z"` or `"q:i"` (point `i` of quad `q`)
fn parse_quad_point(text: &str, quads: &[Quad]) -> Option<Vec3> {
    match text.split_once(':') {
        Some((quad, point)) => {
            let quad: usize = quad.trim().parse().ok()?;
            let point: usize = point.trim().parse().ok()?;
            quads.get(quad)?.points.get(point).copied()
        }
        None => parse_vec3(text),
    }
}

/// Append every `<quad>` of a quad graph to `quads`
pub fn parse_quad_graph(path: &Path, text: &str, quads: &mut Vec<Quad>) -> Result<()> {
    let doc = parse_document(path, text)?;
    for (n, node) in doc
        .descendants()
        .filter(|n| n.has_tag_name("quad"))
        .enumerate()
    {
        let mut points = [Vec3::ZERO; 4];
        let mut valid = true;
        for (i, point) in points.iter_mut().enumerate() {
            let resolved = node
                .attribute(format!("p{i}").as_str())
                .and_then(|value| parse_quad_point(value, quads));
            match resolved {
                Some(p) => *point = p,
                None => {
                    valid = false;
                    break;
                }
            }
        }
        if valid {
            quads.push(Quad::new(points));
        } else {
            tracing::warn!("Skipping quad {} in {:?}: bad point", n, path);
        }
    }
    Ok(())
}

fn coordinate(node: &roxmltree::Node, name: &str, path: &Path) -> f32 {
    let Some(value) = node.attribute(name) else {
        return 0.0;
    };
    value.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("Bad navmesh coordinate {}={:?} in {:?}", name, value, path);
        0.0
    })
}

/// Append one quad per navmesh `<face>` to `quads`
pub fn parse_navmesh(path: &Path, text: &str, quads: &mut Vec<Quad>) -> Result<()> {
    let doc = parse_document(path, text)?;
    let mut vertices = Vec::new();

    for node in doc.descendants().filter(|n| n.is_element()) {
        if node.has_tag_name("vertex") {
            vertices.push(Vec3::new(
                coordinate(&node, "x", path),
                coordinate(&node, "y", path),
                coordinate(&node, "z", path),
            ));
        } else if node.has_tag_name("face") {
            let corners: Option<Vec<Vec3>> = node
                .attribute("indices")
                .unwrap_or_default()
                .split_whitespace()
                .take(4)
                .map(|i| i.parse::<usize>().ok().and_then(|i| vertices.get(i).copied()))
                .collect();
            match corners.as_deref() {
                Some(&[a, b, c, d]) => quads.push(Quad::new([a, b, c, d])),
                _ => tracing::warn!("Skipping navmesh face with bad indices in {:?}", path),
            }
        }
    }
    Ok(())
}

/// Run `parse` on `path` if it exists; malformed files are logged
fn ingest<T>(
    path: &Path,
    out: &mut T,
    parse: impl FnOnce(&Path, &str, &mut T) -> Result<()>,
) -> bool {
    let Some(text) = read_xml(path) else {
        return false;
    };
    if let Err(e) = parse(path, &text, out) {
        tracing::warn!("{}", e);
        if let CompileError::MalformedXml { source, .. } = &e {
            tracing::warn!("  {}", source);
        }
    }
    true
}

/// Load every auxiliary file that belongs to the output file `output`
pub fn load_scene(output: &Path) -> SceneContext {
    let dir = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut scene = SceneContext::default();

    let library = dir
        .parent()
        .and_then(Path::parent)
        .map(|root| root.join("textures").join("materials.xml"));
    match library {
        Some(path) if ingest(&path, &mut scene.transparent_materials, parse_materials) => {}
        _ => tracing::info!("Missing global materials file"),
    }
    if !ingest(
        &dir.join("materials.xml"),
        &mut scene.transparent_materials,
        parse_materials,
    ) {
        tracing::info!("Missing track materials file");
    }

    if !ingest(&dir.join("quads.xml"), &mut scene.quads, parse_quad_graph) {
        ingest(&dir.join("navmesh.xml"), &mut scene.quads, parse_navmesh);
    }
    if scene.quads.is_empty() {
        tracing::info!("Missing quad or navmesh file, won't do raytrace preprocessing");
    }

    tracing::debug!(
        "Scene: {} transparent materials, {} quads",
        scene.transparent_materials.len(),
        scene.quads.len()
    );
    scene
}
