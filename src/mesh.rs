use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;

use anyhow::Result;
use glam::Vec3;

/// One unique `(position, texcoord)` vertex, attribute-packed as
/// `[x, y, z, u, v]` — five floats, matching the VAO's attribute stride.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Vertex {
    position: [f32; 3],
    texcoord: [f32; 2],
}

impl Eq for Vertex {}
impl std::hash::Hash for Vertex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for f in self.position.iter().chain(self.texcoord.iter()) {
            f.to_bits().hash(state);
        }
    }
}

/// A bounding sphere (center + radius) computed from a mesh's vertex set.
#[derive(Debug, Clone, Copy)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// A loaded triangle mesh: deduplicated vertex attribute data (position +
/// texcoord, 5 floats per vertex), a triangle-list index buffer, a
/// bounding sphere, and the diffuse texture path resolved from its
/// material, if any.
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub bounding_sphere: BoundingSphere,
    pub diffuse_texture_path: Option<std::path::PathBuf>,
}

impl Mesh {
    pub const ATTRIBUTE_STRIDE: u32 = 5;

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck_cast(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck_cast(&self.indices)
    }
}

fn bytemuck_cast<T>(data: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data)) }
}

fn bounding_sphere(vertices: &[Vertex]) -> BoundingSphere {
    let mut center = Vec3::ZERO;
    for v in vertices {
        center += Vec3::from(v.position);
    }
    center /= vertices.len().max(1) as f32;

    let radius = vertices
        .iter()
        .map(|v| (Vec3::from(v.position) - center).length())
        .fold(0.0f32, f32::max);

    BoundingSphere { center, radius }
}

/// Load the first mesh of an OBJ file (with its MTL, if present),
/// flipping the texcoord v-axis to the top-to-bottom convention the rest
/// of the pipeline uses, and deduplicating shared vertices via a
/// hashmap, the same way the teacher's model loader does for its vertex
/// format.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);

    let (models, materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::GPU_LOAD_OPTIONS,
        |mtl_path| {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            tobj::load_mtl(dir.join(mtl_path))
        },
    )?;

    let mut unique: HashMap<Vertex, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for model in &models {
        let mesh = &model.mesh;
        for &index in &mesh.indices {
            let i = index as usize;
            let position = [mesh.positions[3 * i], mesh.positions[3 * i + 1], mesh.positions[3 * i + 2]];
            let texcoord = if mesh.texcoords.is_empty() {
                [0.0, 0.0]
            } else {
                [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
            };
            let vertex = Vertex { position, texcoord };

            let vertex_index = *unique.entry(vertex).or_insert_with(|| {
                let idx = (vertices.len() / Mesh::ATTRIBUTE_STRIDE as usize) as u32;
                vertices.extend_from_slice(&position);
                vertices.extend_from_slice(&texcoord);
                idx
            });
            indices.push(vertex_index);
        }
    }

    let unique_vertices: Vec<Vertex> = unique.into_iter().map(|(v, _)| v).collect();
    let sphere = bounding_sphere(&unique_vertices);

    let diffuse_texture_path = materials.ok().and_then(|mats| mats.into_iter().next()).and_then(|mat| mat.diffuse_texture).map(|name| {
        path.parent().unwrap_or_else(|| Path::new(".")).join(name)
    });

    Ok(Mesh {
        vertices,
        indices,
        bounding_sphere: sphere,
        diffuse_texture_path,
    })
}
