//! OBJ file loader for 3D models
//!
//! Produces the renderer's fixed vertex layout, including the tangent frame
//! the normal-mapped PBR shader needs. Every face corner becomes its own
//! vertex; polygons are fan-triangulated.

use crate::assets::mesh::{Face, Mesh, Vertex};
use crate::foundation::math::{Vec2, Vec3};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// OBJ parsing errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A number or index failed to parse
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// Structurally invalid file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Wavefront OBJ loader
pub struct ObjLoader;

/// Face corner indices as written: 1-based, or negative relative to the end
struct Corner {
    position: isize,
    tex_coord: Option<isize>,
    normal: Option<isize>,
}

impl ObjLoader {
    /// Load an OBJ file and return a mesh
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, ObjError> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Parse OBJ text from any buffered reader
    pub fn parse<R: BufRead>(reader: R) -> Result<Mesh, ObjError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = line_index + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let Some(keyword) = parts.next() else {
                continue;
            };
            let args: Vec<&str> = parts.collect();

            match keyword {
                "v" => positions.push(parse_floats::<3>(&args, line_number)?),
                "vn" => normals.push(parse_floats::<3>(&args, line_number)?),
                "vt" => tex_coords.push(parse_floats::<2>(&args, line_number)?),
                "f" => {
                    if args.len() < 3 {
                        return Err(ObjError::ParseError {
                            line: line_number,
                            message: format!("face needs at least 3 vertices, got {}", args.len()),
                        });
                    }

                    let corners = args
                        .iter()
                        .map(|token| parse_corner(token, line_number))
                        .collect::<Result<Vec<_>, _>>()?;

                    let mut corner_vertices = Vec::with_capacity(corners.len());
                    for corner in &corners {
                        let position = lookup(&positions, corner.position, "Position", line_number)?;
                        let tex_coord = corner
                            .tex_coord
                            .map(|raw| lookup(&tex_coords, raw, "Texture coordinate", line_number))
                            .transpose()?
                            .unwrap_or([0.0, 0.0]);
                        let normal = corner
                            .normal
                            .map(|raw| lookup(&normals, raw, "Normal", line_number))
                            .transpose()?
                            .unwrap_or([0.0, 0.0, 0.0]);

                        corner_vertices.push(Vertex {
                            position,
                            normal,
                            tex_coord,
                            ..Vertex::default()
                        });
                    }

                    // Fan triangulation, each triangle gets its own corners
                    for i in 1..(corner_vertices.len() - 1) {
                        let base = vertices.len() as u32;
                        let mut triangle =
                            [corner_vertices[0], corner_vertices[i], corner_vertices[i + 1]];
                        compute_tangent_frame(&mut triangle);
                        vertices.extend_from_slice(&triangle);
                        faces.push(Face::new(base, base + 1, base + 2));
                    }
                }
                _ => {
                    // Ignore other commands (o, g, s, usemtl, mtllib)
                }
            }
        }

        if faces.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ file".to_string()));
        }

        log::debug!("Parsed OBJ mesh: {} vertices, {} faces", vertices.len(), faces.len());
        Ok(Mesh::new(vertices, faces))
    }
}

fn parse_floats<const N: usize>(args: &[&str], line: usize) -> Result<[f32; N], ObjError> {
    if args.len() < N {
        return Err(ObjError::ParseError {
            line,
            message: format!("expected {N} components, got {}", args.len()),
        });
    }
    let mut out = [0.0; N];
    for (slot, token) in out.iter_mut().zip(args) {
        *slot = token.parse().map_err(|_| ObjError::ParseError {
            line,
            message: format!("invalid number '{token}'"),
        })?;
    }
    Ok(out)
}

fn parse_corner(token: &str, line: usize) -> Result<Corner, ObjError> {
    let mut fields = token.split('/');
    let index = |field: Option<&str>| -> Result<Option<isize>, ObjError> {
        match field {
            None | Some("") => Ok(None),
            Some(text) => {
                let value: isize = text.parse().map_err(|_| ObjError::ParseError {
                    line,
                    message: format!("invalid index '{text}'"),
                })?;
                if value == 0 {
                    return Err(ObjError::ParseError {
                        line,
                        message: "index 0 is not valid in OBJ".to_string(),
                    });
                }
                Ok(Some(value))
            }
        }
    };

    let position = index(fields.next())?.ok_or_else(|| ObjError::ParseError {
        line,
        message: format!("missing position index in '{token}'"),
    })?;
    let tex_coord = index(fields.next())?;
    let normal = index(fields.next())?;

    Ok(Corner { position, tex_coord, normal })
}

/// Resolve a raw OBJ index against the elements declared so far
fn lookup<T: Copy>(elements: &[T], raw: isize, kind: &str, line: usize) -> Result<T, ObjError> {
    let resolved = if raw > 0 {
        Some(raw.unsigned_abs() - 1)
    } else {
        elements.len().checked_sub(raw.unsigned_abs())
    };

    resolved
        .and_then(|index| elements.get(index))
        .copied()
        .ok_or_else(|| {
            ObjError::InvalidFormat(format!(
                "{kind} index {raw} out of bounds on line {line} ({} declared)",
                elements.len()
            ))
        })
}

/// Fill normal (when absent), tangent and bitangent of one triangle
fn compute_tangent_frame(triangle: &mut [Vertex; 3]) {
    let p: [Vec3; 3] = triangle.map(|v| Vec3::from(v.position));
    let uv: [Vec2; 3] = triangle.map(|v| Vec2::from(v.tex_coord));

    let edge1 = p[1] - p[0];
    let edge2 = p[2] - p[0];
    let face_normal = edge1.cross(&edge2).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);

    let duv1 = uv[1] - uv[0];
    let duv2 = uv[2] - uv[0];
    let det = duv1.x * duv2.y - duv2.x * duv1.y;

    let (raw_tangent, raw_bitangent) = if det.abs() > f32::EPSILON {
        let r = 1.0 / det;
        ((edge1 * duv2.y - edge2 * duv1.y) * r, (edge2 * duv1.x - edge1 * duv2.x) * r)
    } else {
        // No usable UV mapping; any frame perpendicular to the normal will do
        let helper = if face_normal.x.abs() < 0.9 { Vec3::x() } else { Vec3::z() };
        let tangent = helper.cross(&face_normal);
        (tangent, face_normal.cross(&tangent))
    };

    for vertex in triangle.iter_mut() {
        let normal = Vec3::from(vertex.normal)
            .try_normalize(f32::EPSILON)
            .unwrap_or(face_normal);

        // Gram-Schmidt against the vertex normal
        let tangent = (raw_tangent - normal * normal.dot(&raw_tangent))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| normal.cross(&Vec3::y()).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x));
        let mut bitangent = normal.cross(&tangent);
        if bitangent.dot(&raw_bitangent) < 0.0 {
            bitangent = -bitangent;
        }

        vertex.normal = normal.into();
        vertex.tangent = tangent.into();
        vertex.bitangent = bitangent.into();
    }
}
