use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};

use super::{Position, VertexAttributes, VertexStreams};

const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

#[derive(Debug, Default)]
struct ObjData {
    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
    vertex_positions: Vec<Position>,
    vertex_attributes: Vec<VertexAttributes>,
    corner_lookup: HashMap<(usize, Option<usize>, Option<usize>), u32>,
}

/// Resolves a 1-based (or negative, end-relative) OBJ index against `len` elements.
fn resolve_index(token: &str, len: usize, what: &str) -> Result<usize> {
    let i: i64 = token
        .parse()
        .map_err(|_| anyhow!("Invalid {} index '{}'", what, token))?;
    let resolved = if i < 0 { len as i64 + i } else { i - 1 };
    if resolved < 0 || resolved >= len as i64 {
        return Err(anyhow!("{} index {} out of range ({} defined)", what, i, len));
    }
    Ok(resolved as usize)
}

impl ObjData {
    fn parse_line(&mut self, tokens: &[&str]) -> Result<()> {
        match tokens[0] {
            "v" => {
                if tokens.len() < 4 {
                    return Err(anyhow!("Invalid vertex position"));
                }
                self.positions.push([
                    tokens[1].parse()?,
                    tokens[2].parse()?,
                    tokens[3].parse()?,
                ]);
            }
            "vt" => {
                if tokens.len() < 3 {
                    return Err(anyhow!("Invalid texture coordinate"));
                }
                self.tex_coords.push([tokens[1].parse()?, tokens[2].parse()?]);
            }
            "vn" => {
                if tokens.len() < 4 {
                    return Err(anyhow!("Invalid normal"));
                }
                self.normals.push([
                    tokens[1].parse()?,
                    tokens[2].parse()?,
                    tokens[3].parse()?,
                ]);
            }
            "f" => {
                if tokens.len() < 4 {
                    return Err(anyhow!("Invalid face"));
                }
                self.process_face(&tokens[1..])?;
            }
            _ => {}
        }
        Ok(())
    }

    fn process_face(&mut self, face_tokens: &[&str]) -> Result<()> {
        let mut vertex_indices = Vec::with_capacity(face_tokens.len());

        for vertex_str in face_tokens {
            let mut parts = vertex_str.split('/');

            let position_idx = parts
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| anyhow!("Invalid position index"))
                .and_then(|s| resolve_index(s, self.positions.len(), "position"))?;

            let tex_coord_idx = match parts.next().filter(|s| !s.is_empty()) {
                Some(s) => Some(resolve_index(s, self.tex_coords.len(), "texture coordinate")?),
                None => None,
            };

            let normal_idx = match parts.next().filter(|s| !s.is_empty()) {
                Some(s) => Some(resolve_index(s, self.normals.len(), "normal")?),
                None => None,
            };

            let key = (position_idx, tex_coord_idx, normal_idx);
            let vertex_idx = match self.corner_lookup.get(&key) {
                Some(&idx) => idx,
                None => {
                    let idx = self.vertex_positions.len() as u32;
                    self.vertex_positions.push(Position(self.positions[position_idx]));
                    self.vertex_attributes.push(VertexAttributes {
                        normal: normal_idx.map_or(DEFAULT_NORMAL, |i| self.normals[i]),
                        tangent: [0.0; 3],
                        uv: tex_coord_idx.map_or([0.0, 0.0], |i| self.tex_coords[i]),
                    });
                    self.corner_lookup.insert(key, idx);
                    idx
                }
            };

            vertex_indices.push(vertex_idx);
        }

        // Fan triangulation, faces are assumed convex
        for i in 1..(vertex_indices.len() - 1) {
            self.indices.push(vertex_indices[0]);
            self.indices.push(vertex_indices[i]);
            self.indices.push(vertex_indices[i + 1]);
        }

        Ok(())
    }
}

/// Geometry in the two-stream layout the vertex shader consumes.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Position>,
    pub attributes: Vec<VertexAttributes>,
    pub indices: Vec<u32>,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

impl Mesh {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path.extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "obj" => Self::load_obj(path),
            _ => Err(anyhow!("Unsupported mesh format: {}", extension)),
        }
    }

    pub fn streams(&self) -> Result<VertexStreams<'_>> {
        VertexStreams::new(&self.positions, &self.attributes)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn load_obj(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut mesh = Self::parse_obj(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        mesh.name = path
            .file_stem()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("mesh")
            .to_string();

        log::info!(
            "Loaded mesh '{}': {} vertices, {} indices",
            mesh.name,
            mesh.vertex_count(),
            mesh.indices.len()
        );
        Ok(mesh)
    }

    /// Parses Wavefront OBJ geometry. Material statements are ignored.
    pub fn parse_obj<R: BufRead>(reader: R) -> Result<Self> {
        let mut obj_data = ObjData::default();

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }

            obj_data
                .parse_line(&tokens)
                .with_context(|| format!("line {}", line_number + 1))?;
        }

        let ObjData {
            indices,
            vertex_positions: positions,
            vertex_attributes: mut attributes,
            ..
        } = obj_data;

        generate_tangents(&positions, &mut attributes, &indices);
        let (bounds_min, bounds_max) = calculate_bounds(&positions);

        Ok(Self {
            name: String::new(),
            positions,
            attributes,
            indices,
            bounds_min,
            bounds_max,
        })
    }
}

fn calculate_bounds(positions: &[Position]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];

    for position in positions {
        for i in 0..3 {
            min[i] = min[i].min(position.0[i]);
            max[i] = max[i].max(position.0[i]);
        }
    }

    (min, max)
}

/// Per-vertex tangents from triangle uv derivatives, orthogonalised against the normal.
fn generate_tangents(positions: &[Position], attributes: &mut [VertexAttributes], indices: &[u32]) {
    let mut accumulated = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];

        let p0 = Vec3::from_array(positions[i0].0);
        let e1 = Vec3::from_array(positions[i1].0) - p0;
        let e2 = Vec3::from_array(positions[i2].0) - p0;

        let uv0 = Vec2::from_array(attributes[i0].uv);
        let duv1 = Vec2::from_array(attributes[i1].uv) - uv0;
        let duv2 = Vec2::from_array(attributes[i2].uv) - uv0;

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() <= f32::EPSILON {
            continue;
        }

        let tangent = (e1 * duv2.y - e2 * duv1.y) / det;
        for i in [i0, i1, i2] {
            accumulated[i] += tangent;
        }
    }

    let mut fallbacks = 0;
    for (attribute, tangent) in attributes.iter_mut().zip(accumulated) {
        let normal = Vec3::from_array(attribute.normal).try_normalize().unwrap_or(Vec3::Y);
        let orthogonal = tangent - normal * normal.dot(tangent);

        let tangent = match orthogonal.try_normalize() {
            Some(t) => t,
            None => {
                fallbacks += 1;
                normal.any_orthonormal_vector()
            }
        };
        attribute.tangent = tangent.to_array();
    }

    if fallbacks > 0 {
        log::warn!("{} vertices have no usable uv mapping, using an arbitrary tangent", fallbacks);
    }
}
