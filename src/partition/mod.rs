//! Mesh partitioning into triangle clusters.
//!
//! Partitioning treats the mesh as a graph whose nodes are triangles and
//! whose links are shared edges. Node weights encode triangle area so that
//! equal-weight parts tend toward equal surface area; link weights encode
//! edge length so that heavy (long) adjacencies stay inside one part,
//! which keeps clusters round and their perimeters short.
//!
//! ```
//! use cairn::mesh::Mesh;
//! use cairn::partition::{build_clusters, GreedyPartitioner};
//! use nalgebra::Point3;
//!
//! # let vertices = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(1.0, 1.0, 0.0),
//! #     Point3::new(0.0, 1.0, 0.0),
//! # ];
//! # let mesh = Mesh::from_triangles("quad", vertices, &[[0, 1, 2], [0, 2, 3]]);
//! let clusters = build_clusters(&mesh, 128, &GreedyPartitioner);
//! assert_eq!(clusters.iter().map(|c| c.triangles.len()).sum::<usize>(), 2);
//! ```

pub mod graph;
mod group;
#[cfg(feature = "metis")]
pub mod metis;

pub use graph::{CsrGraph, GraphPartitioner, GreedyPartitioner, KwayPartition};
pub use group::group_clusters;
#[cfg(feature = "metis")]
pub use metis::MetisPartitioner;

use std::collections::BTreeMap;

use log::{debug, warn};
use nalgebra::Vector3;

use crate::aabb::Aabb;
use crate::mesh::{face_area, Edge, Mesh};

/// Slack factor applied to part counts so the partitioner has room to
/// balance without producing oversized parts.
const PART_SLACK: f32 = 1.2;

/// A subset of a mesh's triangles with a precomputed bounding box.
///
/// Clusters do not reference the mesh they index into; the context that
/// produced them (a partition call, a LOD level) knows which mesh their
/// triangle indices are valid for.
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    /// Triangle indices into the owning mesh, in ascending order.
    pub triangles: Vec<u32>,
    /// Box around every vertex referenced by `triangles`.
    pub bounds: Aabb,
}

impl Cluster {
    /// Build a cluster over `triangles`, folding the bounding box over the
    /// referenced vertices.
    pub fn from_triangles(mesh: &Mesh, triangles: Vec<u32>) -> Self {
        let mut bounds = Aabb::empty();
        for &t in &triangles {
            for v in mesh.triangle_vertices(t as usize) {
                bounds.encapsulate_point(&v);
            }
        }
        Self { triangles, bounds }
    }
}

/// Encode a geometric weight as a positive integer for the partitioner.
///
/// Fixed-point at four decimal places, clamped to at least 1 so zero-area
/// triangles and zero-length edges do not violate the backend's
/// positive-weight assumption.
pub fn encode_weight(w: f32) -> i32 {
    let scaled = (w * 10_000.0).round();
    if scaled >= i32::MAX as f32 {
        i32::MAX
    } else if scaled < 1.0 {
        1
    } else {
        scaled as i32
    }
}

/// Build the triangle-adjacency graph of `subset`.
///
/// Graph nodes are subset positions (so every subset member gets a node
/// even if it shares no edge with anything). Every pair of triangles on a
/// shared edge is linked; an edge carried by `k` triangles contributes all
/// `k*(k-1)/2` pairs, deliberately, so non-manifold patches stay connected.
fn triangle_graph(mesh: &Mesh, subset: &[u32]) -> CsrGraph {
    let n = subset.len();
    let mut edge_to_triangles: BTreeMap<Edge, Vec<i32>> = BTreeMap::new();
    for (local, &t) in subset.iter().enumerate() {
        for e in mesh.triangle_edges(t as usize) {
            edge_to_triangles.entry(e).or_default().push(local as i32);
        }
    }

    // Neighbor maps keep the first weight recorded for a pair; triangles
    // sharing two edges stay linked once.
    let mut adjacency: Vec<BTreeMap<i32, i32>> = vec![BTreeMap::new(); n];
    for (edge, triangles) in &edge_to_triangles {
        if triangles.len() < 2 {
            continue;
        }
        let length = (mesh.vertices[edge.a() as usize] - mesh.vertices[edge.b() as usize]).norm();
        let weight = encode_weight(length);
        for i in 0..triangles.len() {
            for j in i + 1..triangles.len() {
                let (t0, t1) = (triangles[i], triangles[j]);
                adjacency[t0 as usize].entry(t1).or_insert(weight);
                adjacency[t1 as usize].entry(t0).or_insert(weight);
            }
        }
    }

    let mut graph = CsrGraph {
        xadj: Vec::with_capacity(n + 1),
        adjncy: Vec::new(),
        vwgt: Vec::with_capacity(n),
        adjwgt: Vec::new(),
    };
    graph.xadj.push(0);
    for (local, &t) in subset.iter().enumerate() {
        for (&neighbor, &weight) in &adjacency[local] {
            graph.adjncy.push(neighbor);
            graph.adjwgt.push(weight);
        }
        graph.xadj.push(graph.adjncy.len() as i32);
        let [v0, v1, v2] = mesh.triangle_vertices(t as usize);
        graph.vwgt.push(encode_weight(face_area(&v0, &v1, &v2)));
    }
    graph
}

/// Partition the given triangles of `mesh` into `parts` clusters.
///
/// Returns clusters whose triangle lists jointly cover `subset` exactly
/// once. A single requested part returns one cluster without consulting
/// the backend. On backend failure the error is logged and an empty vector
/// returned; callers degrade by treating the level as unpartitionable.
pub fn partition_subset(
    mesh: &Mesh,
    subset: &[u32],
    parts: i32,
    imbalance: f32,
    partitioner: &dyn GraphPartitioner,
) -> Vec<Cluster> {
    if subset.is_empty() {
        return Vec::new();
    }
    if parts <= 1 {
        return vec![Cluster::from_triangles(mesh, subset.to_vec())];
    }

    let graph = triangle_graph(mesh, subset);
    let partition = match partitioner.part_kway(&graph, parts, imbalance) {
        Ok(partition) => partition,
        Err(e) => {
            warn!("partitioning {} triangles into {parts} parts failed: {e}", subset.len());
            return Vec::new();
        }
    };
    debug!(
        "partitioned {} triangles into {parts} parts, edge cut {}",
        subset.len(),
        partition.edge_cut
    );

    let mut clusters: Vec<Cluster> = vec![Cluster::default(); parts as usize];
    for (local, &t) in subset.iter().enumerate() {
        let cluster = &mut clusters[partition.parts[local] as usize];
        cluster.triangles.push(t);
        for v in mesh.triangle_vertices(t as usize) {
            cluster.bounds.encapsulate_point(&v);
        }
    }
    clusters.retain(|c| !c.triangles.is_empty());
    clusters
}

/// Partition every triangle of `mesh` into `parts` clusters.
pub fn partition_mesh(
    mesh: &Mesh,
    parts: i32,
    imbalance: f32,
    partitioner: &dyn GraphPartitioner,
) -> Vec<Cluster> {
    let all: Vec<u32> = (0..mesh.triangle_count() as u32).collect();
    partition_subset(mesh, &all, parts, imbalance, partitioner)
}

/// Split `mesh` into clusters of at most roughly `max_triangles` triangles.
///
/// The part count gets 20% slack over the exact quotient to give the
/// partitioner balancing room; any cluster that still exceeds the cap is
/// re-partitioned into sub-clusters with the same slack.
pub fn build_clusters(
    mesh: &Mesh,
    max_triangles: usize,
    partitioner: &dyn GraphPartitioner,
) -> Vec<Cluster> {
    let triangle_count = mesh.triangle_count();
    let parts = ((triangle_count as f32 / max_triangles as f32) * PART_SLACK).ceil() as i32;
    if parts < 2 {
        let all: Vec<u32> = (0..triangle_count as u32).collect();
        return vec![Cluster::from_triangles(mesh, all)];
    }

    let first_pass = partition_mesh(mesh, parts, PART_SLACK, partitioner);
    let mut clusters = Vec::with_capacity(first_pass.len());
    for cluster in first_pass {
        if cluster.triangles.len() <= max_triangles {
            clusters.push(cluster);
            continue;
        }
        let sub_parts =
            ((cluster.triangles.len() as f32 / max_triangles as f32) * PART_SLACK).ceil() as i32;
        let sub = partition_subset(mesh, &cluster.triangles, sub_parts, PART_SLACK, partitioner);
        if sub.is_empty() {
            clusters.push(cluster);
        } else {
            clusters.extend(sub);
        }
    }

    if let (Some(min), Some(max)) = (
        clusters.iter().map(|c| c.triangles.len()).min(),
        clusters.iter().map(|c| c.triangles.len()).max(),
    ) {
        debug!(
            "{} clusters over {} triangles, sizes {min}..={max}",
            clusters.len(),
            triangle_count
        );
    }
    clusters
}

/// Convert an HSV color (all components in `[0, 1]`) to linear RGB.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vector3<f32> {
    let c = v * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let rgb = if h < 1.0 / 6.0 {
        Vector3::new(c, x, 0.0)
    } else if h < 2.0 / 6.0 {
        Vector3::new(x, c, 0.0)
    } else if h < 3.0 / 6.0 {
        Vector3::new(0.0, c, x)
    } else if h < 4.0 / 6.0 {
        Vector3::new(0.0, x, c)
    } else if h < 5.0 / 6.0 {
        Vector3::new(x, 0.0, c)
    } else {
        Vector3::new(c, 0.0, x)
    };
    rgb + Vector3::new(m, m, m)
}

/// The colorization triple used for cluster `index` in debug output and
/// metadata files: eight hues cycled at full saturation and value.
pub fn cluster_color(index: usize) -> Vector3<f32> {
    hsv_to_rgb((index as f32 / 8.0) % 1.0, 1.0, 1.0)
}

/// Overwrite face colors so every cluster renders in a distinct hue.
///
/// Debug visualization aid; triangles not covered by any cluster keep
/// their colors.
pub fn paint_by_cluster(mesh: &mut Mesh, clusters: &[Cluster]) {
    for (index, cluster) in clusters.iter().enumerate() {
        let color = cluster_color(index);
        for &t in &cluster.triangles {
            mesh.colors[t as usize] = color;
        }
    }
}

/// The partitioning backend compiled into this build: METIS when the
/// `metis` feature is enabled, the built-in region-growing partitioner
/// otherwise.
#[cfg(feature = "metis")]
pub fn default_partitioner() -> MetisPartitioner {
    MetisPartitioner
}

/// The partitioning backend compiled into this build: METIS when the
/// `metis` feature is enabled, the built-in region-growing partitioner
/// otherwise.
#[cfg(not(feature = "metis"))]
pub fn default_partitioner() -> GreedyPartitioner {
    GreedyPartitioner
}
