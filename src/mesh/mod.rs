//! Core mesh data structures.
//!
//! The pipeline works on a flat face-vertex representation: a vertex
//! position array, a triangle index array, and one normal and one color per
//! triangle. There is no connectivity structure kept alongside the arrays;
//! adjacency is derived on demand from edge maps, which is what the
//! clustering and simplification passes actually need.
//!
//! Triangles and vertices are never spliced out of the middle of their
//! arrays while an algorithm is running. Instead they are overwritten with
//! sentinels ([`INVALID_INDEX`], [`invalid_vertex`]) so that indices stay
//! stable, and compacted in a final pass.
//!
//! # Construction
//!
//! ```
//! use cairn::mesh::Mesh;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mesh = Mesh::from_triangles("tri", vertices, &[[0, 1, 2]]);
//! assert_eq!(mesh.triangle_count(), 1);
//! ```

mod edge;
mod repair;

pub use edge::Edge;

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::aabb::Aabb;

/// Sentinel index marking a dead triangle slot.
pub const INVALID_INDEX: u32 = u32::MAX;

/// Sentinel position marking a dead vertex slot.
pub fn invalid_vertex() -> Point3<f32> {
    Point3::new(f32::MAX, f32::MAX, f32::MAX)
}

/// Unit normal of the triangle `(v0, v1, v2)`.
///
/// Returns the zero vector for degenerate triangles, which downstream
/// orientation tests treat as a rejection.
pub fn face_normal(v0: &Point3<f32>, v1: &Point3<f32>, v2: &Point3<f32>) -> Vector3<f32> {
    (v1 - v0)
        .cross(&(v2 - v0))
        .try_normalize(1.0e-12)
        .unwrap_or_else(Vector3::zeros)
}

/// Area of the triangle `(v0, v1, v2)`.
pub fn face_area(v0: &Point3<f32>, v1: &Point3<f32>, v2: &Point3<f32>) -> f32 {
    (v1 - v0).cross(&(v2 - v0)).norm() * 0.5
}

/// A triangle mesh with per-triangle attributes.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Display name, carried through LOD levels and into output file names.
    pub name: String,
    /// Vertex positions.
    pub vertices: Vec<Point3<f32>>,
    /// Triangle index triples, flattened; length is a multiple of 3.
    pub indices: Vec<u32>,
    /// One face normal per triangle.
    pub normals: Vec<Vector3<f32>>,
    /// One linear-RGB face color per triangle.
    pub colors: Vec<Vector3<f32>>,
}

impl Mesh {
    /// Create an empty mesh with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Build a mesh from a vertex array and triangle index triples.
    ///
    /// Face normals are computed from the winding; colors default to white.
    pub fn from_triangles(name: &str, vertices: Vec<Point3<f32>>, faces: &[[u32; 3]]) -> Self {
        let mut mesh = Self::new(name);
        mesh.vertices = vertices;
        mesh.indices.reserve(faces.len() * 3);
        for f in faces {
            mesh.indices.extend_from_slice(f);
        }
        mesh.compute_normals();
        mesh.colors = vec![Vector3::new(1.0, 1.0, 1.0); faces.len()];
        mesh
    }

    /// Number of vertex slots, including invalidated ones.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangle slots, including invalidated ones.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of triangles that have not been invalidated.
    pub fn valid_triangle_count(&self) -> usize {
        (0..self.triangle_count())
            .filter(|&t| !self.is_triangle_invalid(t))
            .count()
    }

    /// The index triple of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        [
            self.indices[3 * t],
            self.indices[3 * t + 1],
            self.indices[3 * t + 2],
        ]
    }

    /// Overwrite the index triple of triangle `t`.
    #[inline]
    pub fn set_triangle(&mut self, t: usize, tri: [u32; 3]) {
        self.indices[3 * t] = tri[0];
        self.indices[3 * t + 1] = tri[1];
        self.indices[3 * t + 2] = tri[2];
    }

    /// True if triangle `t` has been overwritten with the sentinel triple.
    #[inline]
    pub fn is_triangle_invalid(&self, t: usize) -> bool {
        self.indices[3 * t] == INVALID_INDEX
    }

    /// The three corner positions of triangle `t`.
    #[inline]
    pub fn triangle_vertices(&self, t: usize) -> [Point3<f32>; 3] {
        let [i0, i1, i2] = self.triangle(t);
        [
            self.vertices[i0 as usize],
            self.vertices[i1 as usize],
            self.vertices[i2 as usize],
        ]
    }

    /// The three canonical edges of triangle `t`.
    #[inline]
    pub fn triangle_edges(&self, t: usize) -> [Edge; 3] {
        let [i0, i1, i2] = self.triangle(t);
        [Edge::new(i0, i1), Edge::new(i1, i2), Edge::new(i2, i0)]
    }

    /// Recompute every face normal from the current windings.
    ///
    /// Invalid triangles get a zero normal so the array stays index-aligned.
    pub fn compute_normals(&mut self) {
        self.normals.clear();
        self.normals.reserve(self.triangle_count());
        for t in 0..self.triangle_count() {
            if self.is_triangle_invalid(t) {
                self.normals.push(Vector3::zeros());
                continue;
            }
            let [v0, v1, v2] = self.triangle_vertices(t);
            self.normals.push(face_normal(&v0, &v1, &v2));
        }
    }

    /// Usage count per edge over the valid triangles.
    pub(crate) fn edge_usage(&self) -> HashMap<Edge, u32> {
        let mut usage = HashMap::with_capacity(self.triangle_count() * 3);
        for t in 0..self.triangle_count() {
            if self.is_triangle_invalid(t) {
                continue;
            }
            for e in self.triangle_edges(t) {
                *usage.entry(e).or_insert(0) += 1;
            }
        }
        usage
    }

    /// True if every edge is used by at most two triangles.
    pub fn is_manifold(&self) -> bool {
        self.edge_usage().values().all(|&count| count <= 2)
    }

    /// The tightest box containing every non-sentinel vertex.
    pub fn bounding_box(&self) -> Aabb {
        let sentinel = invalid_vertex();
        Aabb::from_points(self.vertices.iter().filter(|&&v| v != sentinel))
    }

    /// Extract the given triangles into a new mesh.
    ///
    /// With `keep_all_vertices` the full vertex array is carried over
    /// unchanged, so vertex indices in the sub-mesh agree with the source;
    /// this is what level-of-detail group assembly relies on. Without it,
    /// unreferenced positions are dropped and indices compacted.
    pub fn sub_mesh(&self, triangles: &[u32], keep_all_vertices: bool) -> Mesh {
        let mut sub = Mesh::new(&self.name);
        sub.vertices = self.vertices.clone();
        sub.indices.reserve(triangles.len() * 3);
        sub.normals.reserve(triangles.len());
        sub.colors.reserve(triangles.len());
        for &t in triangles {
            let t = t as usize;
            sub.indices.extend_from_slice(&self.triangle(t));
            sub.normals.push(self.normals[t]);
            sub.colors.push(self.colors[t]);
        }
        if !keep_all_vertices {
            sub.remove_unused_vertices();
        }
        sub
    }
}
