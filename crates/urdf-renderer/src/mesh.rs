//! Mesh loading
//!
//! Visual geometry references meshes by renderer URI. A [`MeshLoader`] turns
//! such a URI into triangle data; [`FileMeshLoader`] maps URIs of a
//! [`ResourceBase`] back to local files and reads STL, OBJ or Collada.

use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;

use dae_parser::source::XYZ;
use dae_parser::{Document, Geometry, Primitive, Semantic, Source, Vertices};
use glam::Vec3;
use urdf_core::ResourceBase;

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Scale every vertex component-wise
    pub fn scaled(mut self, scale: [f32; 3]) -> Self {
        for vertex in &mut self.vertices {
            vertex[0] *= scale[0];
            vertex[1] *= scale[1];
            vertex[2] *= scale[2];
        }
        self
    }
}

/// Mesh loading errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("Mesh resource is not reachable: {0}")]
    Unreachable(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error in {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Unsupported mesh format: {0} (supported: stl, obj, dae)")]
    UnsupportedFormat(String),
}

/// The rendering engine's native mesh loader
pub trait MeshLoader: Send + Sync {
    fn load(&self, uri: &str) -> Result<MeshData, MeshError>;
}

/// Loads meshes from the local file system
#[derive(Debug, Clone, Default)]
pub struct FileMeshLoader {
    base: ResourceBase,
}

impl FileMeshLoader {
    pub fn new(base: ResourceBase) -> Self {
        Self { base }
    }
}

impl MeshLoader for FileMeshLoader {
    fn load(&self, uri: &str) -> Result<MeshData, MeshError> {
        let path = match self.base.path_for(uri) {
            Some(path) => path,
            None => {
                let plain = uri.strip_prefix("file://").unwrap_or(uri);
                if plain.contains("://") {
                    return Err(MeshError::Unreachable(uri.to_string()));
                }
                Path::new(plain).to_path_buf()
            }
        };

        if !path.is_file() {
            return Err(MeshError::Unreachable(uri.to_string()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "stl" => load_stl(&path),
            "obj" => load_obj(&path),
            "dae" => load_dae(&path),
            _ => Err(MeshError::UnsupportedFormat(uri.to_string())),
        }
    }
}

/// Load an STL file as an indexed mesh
pub fn load_stl(path: &Path) -> Result<MeshData, MeshError> {
    let file = std::fs::File::open(path).map_err(|e| MeshError::Io(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let mesh = stl_io::read_stl(&mut reader).map_err(|e| MeshError::Parse {
        path: path.to_string_lossy().to_string(),
        reason: e.to_string(),
    })?;

    Ok(weld_vertices(&mesh))
}

/// Merge coincident STL vertices
fn weld_vertices(mesh: &stl_io::IndexedMesh) -> MeshData {
    // Vertices closer than 1/PRECISION are treated as one
    const PRECISION: f32 = 10000.0;

    let mut data = MeshData::default();
    let mut seen: HashMap<[i32; 3], u32> = HashMap::new();

    for face in &mesh.faces {
        data.normals.push([face.normal[0], face.normal[1], face.normal[2]]);

        for &vertex_idx in &face.vertices {
            let vertex = mesh.vertices[vertex_idx];
            let v = [vertex[0], vertex[1], vertex[2]];
            let key = [
                (v[0] * PRECISION).round() as i32,
                (v[1] * PRECISION).round() as i32,
                (v[2] * PRECISION).round() as i32,
            ];

            let index = *seen.entry(key).or_insert_with(|| {
                data.vertices.push(v);
                (data.vertices.len() - 1) as u32
            });
            data.indices.push(index);
        }
    }

    data
}

/// Load an OBJ file, merging all of its models into one mesh
pub fn load_obj(path: &Path) -> Result<MeshData, MeshError> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };

    let (models, _materials) = tobj::load_obj(path, &options).map_err(|e| MeshError::Parse {
        path: path.to_string_lossy().to_string(),
        reason: e.to_string(),
    })?;

    let mut data = MeshData::default();
    for model in models {
        let mesh = model.mesh;
        let offset = data.vertices.len() as u32;

        data.vertices
            .extend(mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]));
        data.normals
            .extend(mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]));
        data.indices
            .extend(mesh.indices.iter().map(|i| i + offset));
    }

    Ok(data)
}

/// Load every triangle and polygon list of a Collada document
///
/// Positions are scaled to meters using the document's `<unit>`.
pub fn load_dae(path: &Path) -> Result<MeshData, MeshError> {
    let parse_error = |reason: String| MeshError::Parse {
        path: path.to_string_lossy().to_string(),
        reason,
    };

    let document = Document::from_file(path).map_err(|e| parse_error(format!("{e:?}")))?;
    let sources = document
        .local_map::<Source>()
        .map_err(|e| parse_error(format!("{e:?}")))?;
    let vertex_sets = document
        .local_map::<Vertices>()
        .map_err(|e| parse_error(format!("{e:?}")))?;
    let meter = document.asset.unit.meter;

    let mut data = MeshData::default();
    for geometry in document.iter::<Geometry>() {
        let Some(mesh) = geometry.element.as_mesh() else {
            continue;
        };

        for primitive in &mesh.elements {
            let (inputs, polygons) = match primitive {
                Primitive::Triangles(triangles) => {
                    let prim = triangles.data.prim.as_deref().unwrap_or_default();
                    let corners = triangles.inputs.stride * 3;
                    let polygons = if corners == 0 {
                        Vec::new()
                    } else {
                        prim.chunks_exact(corners).collect()
                    };
                    (&triangles.inputs, polygons)
                }
                Primitive::PolyList(list) => {
                    let stride = list.inputs.stride;
                    let mut polygons = Vec::with_capacity(list.data.vcount.len());
                    let mut start = 0;
                    for &count in list.data.vcount.iter() {
                        let end = start + count as usize * stride;
                        let polygon = list
                            .data
                            .prim
                            .get(start..end)
                            .ok_or_else(|| parse_error("polylist is shorter than vcount".into()))?;
                        polygons.push(polygon);
                        start = end;
                    }
                    (&list.inputs, polygons)
                }
                _ => {
                    tracing::debug!("Skipping non-triangle primitive in {}", path.display());
                    continue;
                }
            };

            let Some(vertex_input) = inputs.iter().find(|i| i.semantic == Semantic::Vertex) else {
                return Err(parse_error("primitive has no VERTEX input".into()));
            };
            let positions = vertex_sets
                .get_raw(&vertex_input.source)
                .and_then(|set| set.inputs.iter().find(|i| i.semantic == Semantic::Position))
                .and_then(|input| sources.get_raw(&input.source))
                .and_then(|source| source.reader(XYZ))
                .ok_or_else(|| parse_error("unresolved vertex positions".into()))?
                .map(|p: [f32; 3]| [p[0] * meter, p[1] * meter, p[2] * meter])
                .collect::<Vec<_>>();

            let offset = data.vertices.len() as u32;
            let corner = vertex_input.offset as usize;
            let stride = inputs.stride;
            for polygon in polygons {
                let indices = polygon
                    .chunks_exact(stride)
                    .map(|c| c[corner])
                    .collect::<Vec<_>>();
                if indices.iter().any(|&i| i as usize >= positions.len()) {
                    return Err(parse_error("vertex index out of range".into()));
                }
                for i in 1..indices.len().saturating_sub(1) {
                    let triangle = [indices[0], indices[i], indices[i + 1]];
                    data.normals.push(face_normal(&positions, triangle));
                    data.indices.extend(triangle.iter().map(|&v| v + offset));
                }
            }
            data.vertices.extend(positions);
        }
    }

    if data.indices.is_empty() {
        return Err(parse_error("no triangles found".into()));
    }
    Ok(data)
}

fn face_normal(positions: &[[f32; 3]], triangle: [u32; 3]) -> [f32; 3] {
    let [a, b, c] = triangle.map(|i| Vec3::from(positions[i as usize]));
    (b - a).cross(c - a).normalize_or_zero().to_array()
}
