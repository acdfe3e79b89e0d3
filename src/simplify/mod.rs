//! Mesh simplification by quadric error metrics.
//!
//! The simplifier shrinks a mesh toward a target triangle count by
//! repeatedly collapsing the interior edge with the lowest quadric error
//! (Garland & Heckbert, SIGGRAPH '97). Boundary vertices are pinned, and
//! every candidate is vetted against orientation flips, degenerate
//! triangles, and non-manifold fallout before it commits, so the output is
//! always a manifold mesh with consistently oriented faces.
//!
//! # Example
//!
//! ```
//! use cairn::mesh::Mesh;
//! use cairn::simplify::{simplify_mesh, SimplifyOptions};
//! use nalgebra::Point3;
//!
//! # let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
//! # let vertices = vec![
//! #     Point3::new(-1.0, phi, 0.0), Point3::new(1.0, phi, 0.0),
//! #     Point3::new(-1.0, -phi, 0.0), Point3::new(1.0, -phi, 0.0),
//! #     Point3::new(0.0, -1.0, phi), Point3::new(0.0, 1.0, phi),
//! #     Point3::new(0.0, -1.0, -phi), Point3::new(0.0, 1.0, -phi),
//! #     Point3::new(phi, 0.0, -1.0), Point3::new(phi, 0.0, 1.0),
//! #     Point3::new(-phi, 0.0, -1.0), Point3::new(-phi, 0.0, 1.0),
//! # ];
//! # let faces = [
//! #     [0u32, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
//! #     [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
//! #     [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
//! #     [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
//! # ];
//! # let mesh = Mesh::from_triangles("ico", vertices, &faces);
//! let (simplified, remaining) = simplify_mesh(&mesh, &SimplifyOptions::with_target(10));
//! assert!(remaining <= mesh.triangle_count());
//! assert!(simplified.is_manifold());
//! ```

mod qem;
pub mod quadric;
pub mod queue;

pub use qem::simplify_mesh;
pub use quadric::Quadric;
pub use queue::{Collapse, CollapseQueue};

/// Options for quadric simplification.
#[derive(Debug, Clone)]
pub struct SimplifyOptions {
    /// Stop once at most this many valid triangles remain.
    pub target_triangles: usize,

    /// Compact sentinel slots away and deduplicate undirected triangles in
    /// the output. Turn this off to keep triangle indices aligned with the
    /// input, which the hierarchy builder needs when it stitches group
    /// outputs back together.
    pub organize: bool,

    /// Minimum allowed dot product between a triangle's stored normal and
    /// its post-collapse normal. The default of 0.1 is deliberately
    /// stricter than zero so near-degenerate slivers are rejected along
    /// with outright flips; change it only if reproducing another tool's
    /// output is not a concern.
    pub flip_threshold: f32,
}

impl SimplifyOptions {
    /// Options targeting `target_triangles`, with organizing enabled and
    /// the default flip threshold.
    pub fn with_target(target_triangles: usize) -> Self {
        Self {
            target_triangles,
            organize: true,
            flip_threshold: 0.1,
        }
    }

    /// Set whether the output is compacted and deduplicated.
    pub fn with_organize(mut self, organize: bool) -> Self {
        self.organize = organize;
        self
    }

    /// Set the orientation guard threshold.
    pub fn with_flip_threshold(mut self, flip_threshold: f32) -> Self {
        self.flip_threshold = flip_threshold;
        self
    }
}
