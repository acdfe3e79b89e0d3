//! Mesh file I/O and build artifacts.
//!
//! The pipeline persists one mesh file per LOD level plus a small
//! metadata text file per level describing its clusters. PLY is the one
//! mesh format supported: it is the only common interchange format that
//! round-trips the per-face normals and colors this pipeline carries.
//!
//! ```no_run
//! use cairn::io;
//!
//! let mesh = io::load("model.ply").unwrap();
//! io::save(&mesh, "out/model_lod0.ply").unwrap();
//! ```

pub mod ply;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{CairnError, Result};
use crate::mesh::Mesh;
use crate::partition::{cluster_color, Cluster};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from a file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect<P: AsRef<Path>>(path: P) -> Result<Format> {
    let path = path.as_ref();
    Format::from_path(path).ok_or_else(|| CairnError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh, detecting the format from the file extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    match detect(&path)? {
        Format::Ply => ply::load(path),
    }
}

/// Save a mesh, detecting the format from the file extension.
pub fn save<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    match detect(&path)? {
        Format::Ply => ply::save(mesh, path),
    }
}

/// Write a cluster metadata file: one line per cluster holding nine floats,
/// the bounding box corners followed by the cluster's colorization triple.
///
/// ```text
/// min.x min.y min.z max.x max.y max.z r g b
/// ```
pub fn write_cluster_metadata<P: AsRef<Path>>(path: P, clusters: &[Cluster]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    for (index, cluster) in clusters.iter().enumerate() {
        let aabb = &cluster.bounds;
        let color = cluster_color(index);
        writeln!(
            writer,
            "{} {} {} {} {} {} {} {} {}",
            aabb.min.x,
            aabb.min.y,
            aabb.min.z,
            aabb.max.x,
            aabb.max.y,
            aabb.max.z,
            color.x,
            color.y,
            color.z,
        )?;
    }
    writer.flush()?;
    Ok(())
}
