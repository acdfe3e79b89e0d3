//! PLY (Stanford polygon) format support.
//!
//! Meshes are stored with per-face attributes: each face row carries its
//! vertex indices, its face normal, and its face color, which is exactly
//! the attribute layout of [`crate::mesh::Mesh`]. Files written by other
//! tools load fine without those properties; normals are recomputed and
//! colors default to white.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{CairnError, Result};
use crate::mesh::Mesh;

/// Load a mesh from a PLY file.
///
/// # Example
///
/// ```no_run
/// use cairn::io::ply;
///
/// let mesh = ply::load("model.ply").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| CairnError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let vertex_element = ply.payload.get("vertex").ok_or_else(|| CairnError::Load {
        path: path.to_path_buf(),
        message: "PLY file has no vertex element".to_string(),
    })?;

    let mut vertices: Vec<Point3<f32>> = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let x = get_float(vertex, "x").ok_or_else(|| missing(path, "vertex x"))?;
        let y = get_float(vertex, "y").ok_or_else(|| missing(path, "vertex y"))?;
        let z = get_float(vertex, "z").ok_or_else(|| missing(path, "vertex z"))?;
        vertices.push(Point3::new(x, y, z));
    }

    let face_element = ply.payload.get("face").ok_or_else(|| CairnError::Load {
        path: path.to_path_buf(),
        message: "PLY file has no face element".to_string(),
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mesh")
        .to_string();
    let mut mesh = Mesh::new(&name);
    mesh.vertices = vertices;

    let mut has_all_normals = true;
    for face in face_element {
        let indices = get_list(face, "vertex_indices")
            .or_else(|| get_list(face, "vertex_index"))
            .ok_or_else(|| missing(path, "face vertex_indices"))?;
        if indices.len() < 3 {
            continue;
        }

        let normal = match (get_float(face, "nx"), get_float(face, "ny"), get_float(face, "nz")) {
            (Some(nx), Some(ny), Some(nz)) => Vector3::new(nx, ny, nz),
            _ => {
                has_all_normals = false;
                Vector3::zeros()
            }
        };
        let color = match (
            get_uchar(face, "red"),
            get_uchar(face, "green"),
            get_uchar(face, "blue"),
        ) {
            (Some(r), Some(g), Some(b)) => {
                Vector3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
            }
            _ => Vector3::new(1.0, 1.0, 1.0),
        };

        // Fan-triangulate polygons; attributes replicate per triangle.
        for i in 1..indices.len() - 1 {
            mesh.indices.extend_from_slice(&[
                indices[0] as u32,
                indices[i] as u32,
                indices[i + 1] as u32,
            ]);
            mesh.normals.push(normal);
            mesh.colors.push(color);
        }
    }

    if mesh.indices.is_empty() {
        return Err(CairnError::Load {
            path: path.to_path_buf(),
            message: "PLY file contains no faces".to_string(),
        });
    }
    for &index in &mesh.indices {
        if index as usize >= mesh.vertices.len() {
            return Err(CairnError::Load {
                path: path.to_path_buf(),
                message: format!("face references vertex {index} out of range"),
            });
        }
    }
    if !has_all_normals {
        mesh.compute_normals();
    }
    Ok(mesh)
}

fn missing(path: &Path, what: &str) -> CairnError {
    CairnError::Load {
        path: path.to_path_buf(),
        message: format!("missing {what} property"),
    }
}

fn get_float(element: &DefaultElement, name: &str) -> Option<f32> {
    match element.get(name)? {
        Property::Float(v) => Some(*v),
        Property::Double(v) => Some(*v as f32),
        Property::Int(v) => Some(*v as f32),
        Property::UInt(v) => Some(*v as f32),
        Property::Short(v) => Some(*v as f32),
        Property::UShort(v) => Some(*v as f32),
        Property::Char(v) => Some(*v as f32),
        Property::UChar(v) => Some(*v as f32),
        _ => None,
    }
}

fn get_uchar(element: &DefaultElement, name: &str) -> Option<u8> {
    match element.get(name)? {
        Property::UChar(v) => Some(*v),
        Property::Char(v) => Some(*v as u8),
        Property::UShort(v) => Some((*v).min(255) as u8),
        Property::Int(v) => Some((*v).clamp(0, 255) as u8),
        _ => None,
    }
}

fn get_list(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh to a PLY file (ASCII format) with per-face normals and
/// colors.
///
/// # Example
///
/// ```no_run
/// use cairn::io::ply;
/// use cairn::mesh::Mesh;
///
/// let mesh = Mesh::new("empty");
/// ply::save(&mesh, "output.ply").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let triangle_count = mesh.valid_triangle_count();

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by cairn")?;
    writeln!(writer, "element vertex {}", mesh.vertices.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "element face {triangle_count}")?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "property float nx")?;
    writeln!(writer, "property float ny")?;
    writeln!(writer, "property float nz")?;
    writeln!(writer, "property uchar red")?;
    writeln!(writer, "property uchar green")?;
    writeln!(writer, "property uchar blue")?;
    writeln!(writer, "end_header")?;

    for v in &mesh.vertices {
        writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
    }

    for t in 0..mesh.triangle_count() {
        if mesh.is_triangle_invalid(t) {
            continue;
        }
        let [i0, i1, i2] = mesh.triangle(t);
        let n = mesh.normals[t];
        let c = mesh.colors[t];
        writeln!(
            writer,
            "3 {} {} {} {} {} {} {} {} {}",
            i0,
            i1,
            i2,
            n.x,
            n.y,
            n.z,
            channel(c.x),
            channel(c.y),
            channel(c.z),
        )?;
    }

    writer.flush()?;
    Ok(())
}

fn channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
