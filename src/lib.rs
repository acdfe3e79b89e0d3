//! # Cairn
//!
//! An offline builder for cluster-based hierarchical level-of-detail
//! representations of triangle meshes, of the kind consumed by
//! virtualized-geometry renderers.
//!
//! Given a watertight input mesh, cairn produces a stack of progressively
//! simplified meshes together with a DAG of *clusters* (bounded groups of
//! triangles) linking each coarse cluster to the finer clusters it stands
//! in for. A renderer walks that DAG at runtime, cutting it at whatever
//! granularity the viewpoint demands.
//!
//! ## Pipeline
//!
//! - **Partitioning** ([`partition`]): a mesh is split into roughly
//!   equal-area, compactly shaped clusters by k-way partitioning of its
//!   triangle-adjacency graph.
//! - **Simplification** ([`simplify`]): quadric error metric edge
//!   collapse, preserving manifoldness and face orientation.
//! - **Hierarchy** ([`hierarchy`]): clusters are grouped with their
//!   neighbors, each group is simplified to half its triangle count and
//!   re-split in two, and the halves adopt the group as children; the loop
//!   repeats until a single root cluster covers the coarsest mesh.
//!
//! ## Quick start
//!
//! ```no_run
//! use cairn::prelude::*;
//!
//! let mut mesh = cairn::io::load("model.ply").unwrap();
//! mesh.merge_duplicated_vertices();
//! mesh.remove_unused_vertices();
//!
//! let partitioner = cairn::partition::default_partitioner();
//! let dag = LodDag::build(&mesh, &BuildOptions::default(), &partitioner);
//!
//! for lod in 0..dag.lod_count() {
//!     println!("LOD {lod}: {} triangles", dag.lod_mesh(lod).triangle_count());
//! }
//! cairn::io::save(dag.lod_mesh(dag.lod_count() - 1), "root.ply").unwrap();
//! ```
//!
//! The graph partitioning backend is swappable: the built-in
//! deterministic partitioner is used by default, and the `metis` cargo
//! feature switches [`partition::default_partitioner`] to the METIS
//! solver.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aabb;
pub mod error;
pub mod hierarchy;
pub mod io;
pub mod mesh;
pub mod partition;
pub mod simplify;

/// Prelude module for convenient imports.
///
/// ```
/// use cairn::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aabb::Aabb;
    pub use crate::error::{CairnError, Result};
    pub use crate::hierarchy::{BuildOptions, LodDag, LodNode};
    pub use crate::mesh::{Edge, Mesh};
    pub use crate::partition::{
        build_clusters, group_clusters, Cluster, GraphPartitioner, GreedyPartitioner,
    };
    pub use crate::simplify::{simplify_mesh, SimplifyOptions};
}

// Re-export nalgebra for downstream convenience
pub use nalgebra;
