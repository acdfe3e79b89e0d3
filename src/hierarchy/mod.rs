//! The cluster LOD hierarchy.
//!
//! A [`LodDag`] stacks progressively simplified copies of a mesh and links
//! them through a directed acyclic graph of cluster nodes. Level 0 holds
//! the input mesh split into leaf clusters; each coarser level is built by
//! grouping neighboring clusters, simplifying every group to half its
//! triangle count with the group border pinned, re-splitting each group's
//! simplified footprint in two, and adopting the group's nodes as the
//! children of both halves. The stack ends in a single root node covering
//! the whole coarsest mesh.
//!
//! Nodes never point upward and children always live in the next-finer
//! level, so the parent/child relation cannot cycle. A node's bounds
//! always contain the bounds of everything below it, which is what makes
//! the root usable as a whole-object proxy.

use log::{debug, info, warn};
use uuid::Uuid;

use crate::mesh::{invalid_vertex, Mesh};
use crate::partition::{
    build_clusters, group_clusters, partition_subset, Cluster, GraphPartitioner,
};
use crate::simplify::{simplify_mesh, SimplifyOptions};

/// Options for [`LodDag::build`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Target triangle count per leaf cluster.
    pub leaf_triangles: usize,
    /// Maximum clusters joined into one simplification group.
    pub max_group_size: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            leaf_triangles: 128,
            max_group_size: 4,
        }
    }
}

impl BuildOptions {
    /// Set the leaf cluster triangle target.
    pub fn with_leaf_triangles(mut self, leaf_triangles: usize) -> Self {
        self.leaf_triangles = leaf_triangles;
        self
    }

    /// Set the maximum group size.
    pub fn with_max_group_size(mut self, max_group_size: usize) -> Self {
        self.max_group_size = max_group_size.max(2);
        self
    }
}

/// A node in the LOD DAG: one cluster of one LOD mesh plus links to the
/// finer nodes it was coarsened from.
#[derive(Debug, Clone)]
pub struct LodNode {
    /// Stable identity, assigned at creation.
    pub id: Uuid,
    /// The triangles this node covers in its level's mesh.
    pub cluster: Cluster,
    /// Indices into the node list of the next-finer level. Empty for
    /// leaves.
    pub children: Vec<usize>,
}

impl LodNode {
    fn new(cluster: Cluster, children: Vec<usize>) -> Self {
        Self {
            id: Uuid::new_v4(),
            cluster,
            children,
        }
    }

    /// True if this node sits at the finest level.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A hierarchical cluster LOD representation of one mesh.
#[derive(Debug, Clone, Default)]
pub struct LodDag {
    /// Name carried from the source mesh.
    pub name: String,
    lod_meshes: Vec<Mesh>,
    levels: Vec<Vec<LodNode>>,
}

impl LodDag {
    /// Number of LOD levels (finest first).
    pub fn lod_count(&self) -> usize {
        self.lod_meshes.len()
    }

    /// The mesh at `lod` (0 is the input mesh).
    pub fn lod_mesh(&self, lod: usize) -> &Mesh {
        &self.lod_meshes[lod]
    }

    /// All LOD meshes, finest first.
    pub fn meshes(&self) -> &[Mesh] {
        &self.lod_meshes
    }

    /// The node list of `lod`.
    pub fn level(&self, lod: usize) -> &[LodNode] {
        &self.levels[lod]
    }

    /// All node lists, finest first.
    pub fn levels(&self) -> &[Vec<LodNode>] {
        &self.levels
    }

    /// The single node of the coarsest level.
    pub fn root(&self) -> &LodNode {
        &self.levels[self.levels.len() - 1][0]
    }

    /// Build the full hierarchy over `origin`.
    ///
    /// The build always terminates: it finalizes a root when only one
    /// group remains, when coarsening stops making progress, or when the
    /// assembled coarser mesh comes out non-manifold (a known failure mode
    /// of stitching independently simplified groups, tolerated by ending
    /// the stack early).
    pub fn build(
        origin: &Mesh,
        options: &BuildOptions,
        partitioner: &dyn GraphPartitioner,
    ) -> LodDag {
        let mut dag = LodDag {
            name: origin.name.clone(),
            lod_meshes: vec![origin.clone()],
            levels: Vec::new(),
        };

        let mut leaf_clusters = build_clusters(origin, options.leaf_triangles, partitioner);
        if leaf_clusters.is_empty() {
            warn!("leaf clustering failed, building a single-cluster hierarchy");
            let all: Vec<u32> = (0..origin.triangle_count() as u32).collect();
            leaf_clusters = vec![Cluster::from_triangles(origin, all)];
        }
        info!(
            "level 0: {} triangles in {} leaf clusters",
            origin.triangle_count(),
            leaf_clusters.len()
        );
        dag.levels.push(
            leaf_clusters
                .into_iter()
                .map(|cluster| LodNode::new(cluster, Vec::new()))
                .collect(),
        );

        loop {
            let src = dag.lod_meshes.last().unwrap();
            let child_nodes = dag.levels.last().unwrap();
            let child_clusters: Vec<Cluster> =
                child_nodes.iter().map(|n| n.cluster.clone()).collect();

            let mut groups =
                group_clusters(src, &child_clusters, options.max_group_size, partitioner);
            if groups.is_empty() {
                groups = vec![(0..child_clusters.len()).collect()];
            }

            // Simplify every group on the shared vertex array so the group
            // outputs agree on vertex numbering.
            let group_meshes: Vec<Mesh> = groups
                .iter()
                .map(|group| {
                    let triangles: Vec<u32> = group
                        .iter()
                        .flat_map(|&c| child_clusters[c].triangles.iter().copied())
                        .collect();
                    let sub = src.sub_mesh(&triangles, true);
                    let target = sub.triangle_count() / 2;
                    let simplify_options =
                        SimplifyOptions::with_target(target).with_organize(false);
                    simplify_mesh(&sub, &simplify_options).0
                })
                .collect();

            let (coarse, ranges) = assemble_coarse_mesh(src, &group_meshes);
            debug!(
                "level {}: {} groups -> {} triangles",
                dag.lod_meshes.len(),
                groups.len(),
                coarse.triangle_count()
            );

            let stalled = coarse.triangle_count() >= src.triangle_count();
            if groups.len() == 1 || stalled || !coarse.is_manifold() {
                if stalled {
                    debug!("coarsening stalled, finalizing root");
                } else if groups.len() > 1 {
                    debug!("coarser mesh is non-manifold, finalizing root");
                }
                let child_count = dag.levels.last().unwrap().len();
                let all: Vec<u32> = (0..coarse.triangle_count() as u32).collect();
                let mut root_cluster = Cluster::from_triangles(&coarse, all);
                for node in dag.levels.last().unwrap() {
                    root_cluster.bounds.encapsulate(&node.cluster.bounds);
                }
                let root = LodNode::new(root_cluster, (0..child_count).collect());
                dag.lod_meshes.push(coarse);
                dag.levels.push(vec![root]);
                break;
            }

            // Each group's footprint in the coarser mesh becomes two
            // parent clusters; every node of the group is a child of both.
            let mut parents: Vec<LodNode> = Vec::with_capacity(groups.len() * 2);
            for (group, &(start, count)) in groups.iter().zip(&ranges) {
                let range: Vec<u32> = (start..start + count).collect();
                let mut halves = partition_subset(&coarse, &range, 2, 1.2, partitioner);
                if halves.is_empty() {
                    halves = vec![Cluster::from_triangles(&coarse, range)];
                }
                for mut half in halves {
                    for &child in group {
                        half.bounds
                            .encapsulate(&child_clusters[child].bounds);
                    }
                    parents.push(LodNode::new(half, group.clone()));
                }
            }
            info!(
                "level {}: {} triangles in {} parent clusters",
                dag.lod_meshes.len(),
                coarse.triangle_count(),
                parents.len()
            );
            dag.lod_meshes.push(coarse);
            dag.levels.push(parents);
        }

        dag
    }
}

/// Stitch simplified group meshes back into one coarser mesh.
///
/// All group meshes carry the source's full vertex array, mutated only at
/// slots their own collapses touched. A slot survives when no group
/// invalidated it; a slot moved by a group (necessarily interior to that
/// one group, since shared vertices sit on pinned group borders) takes its
/// moved position. Surviving triangles of each group are appended in group
/// order and remapped onto the compacted vertex array, and normals are
/// recomputed on the result.
///
/// Returns the coarser mesh plus each group's `(start, count)` triangle
/// range inside it.
fn assemble_coarse_mesh(src: &Mesh, group_meshes: &[Mesh]) -> (Mesh, Vec<(u32, u32)>) {
    let sentinel = invalid_vertex();
    let vertex_count = src.vertex_count();
    let mut alive = vec![true; vertex_count];
    let mut positions = src.vertices.clone();
    for group in group_meshes {
        debug_assert_eq!(group.vertex_count(), vertex_count);
        for i in 0..vertex_count {
            let v = group.vertices[i];
            if v == sentinel {
                alive[i] = false;
            } else if v != src.vertices[i] {
                positions[i] = v;
            }
        }
    }

    let mut coarse = Mesh::new(&src.name);
    let mut vertex_map = vec![u32::MAX; vertex_count];
    for i in 0..vertex_count {
        if alive[i] {
            vertex_map[i] = coarse.vertices.len() as u32;
            coarse.vertices.push(positions[i]);
        }
    }

    let mut ranges = Vec::with_capacity(group_meshes.len());
    for group in group_meshes {
        let start = coarse.triangle_count() as u32;
        for t in 0..group.triangle_count() {
            if group.is_triangle_invalid(t) {
                continue;
            }
            let tri = group.triangle(t).map(|i| vertex_map[i as usize]);
            debug_assert!(tri.iter().all(|&i| i != u32::MAX));
            coarse.indices.extend_from_slice(&tri);
            coarse.normals.push(group.normals[t]);
            coarse.colors.push(group.colors[t]);
        }
        ranges.push((start, coarse.triangle_count() as u32 - start));
    }
    coarse.compute_normals();
    (coarse, ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::fixtures::*;
    use crate::partition::GreedyPartitioner;
    use nalgebra::Point3;
    use std::collections::HashMap;

    /// Midpoint-subdivide every triangle of a unit-sphere mesh and push
    /// the new vertices back onto the sphere.
    fn subdivide_on_sphere(mesh: &Mesh) -> Mesh {
        let mut vertices: Vec<Point3<f32>> = mesh
            .vertices
            .iter()
            .map(|v| Point3::from(v.coords.normalize()))
            .collect();
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut faces = Vec::with_capacity(mesh.triangle_count() * 4);
        for t in 0..mesh.triangle_count() {
            let [i0, i1, i2] = mesh.triangle(t);
            let mut midpoint = |a: u32, b: u32| -> u32 {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let m = nalgebra::center(&vertices[a as usize], &vertices[b as usize]);
                    vertices.push(Point3::from(m.coords.normalize()));
                    (vertices.len() - 1) as u32
                })
            };
            let (m01, m12, m20) = (midpoint(i0, i1), midpoint(i1, i2), midpoint(i2, i0));
            faces.push([i0, m01, m20]);
            faces.push([i1, m12, m01]);
            faces.push([i2, m20, m12]);
            faces.push([m01, m12, m20]);
        }
        Mesh::from_triangles(&mesh.name, vertices, &faces)
    }

    fn icosphere(subdivisions: usize) -> Mesh {
        let mut mesh = icosahedron();
        for _ in 0..subdivisions {
            mesh = subdivide_on_sphere(&mesh);
        }
        mesh.name = "icosphere".into();
        mesh
    }

    fn check_dag_shape(dag: &LodDag) {
        assert_eq!(dag.lod_count(), dag.levels().len());
        assert!(dag.lod_count() >= 2);

        // Single root whose level is the coarsest.
        assert_eq!(dag.level(dag.lod_count() - 1).len(), 1);
        assert!(!dag.root().is_leaf());

        // Leaves carry no children; every non-leaf child index points into
        // the next-finer level, so the relation cannot cycle.
        for node in dag.level(0) {
            assert!(node.is_leaf());
        }
        for lod in 1..dag.lod_count() {
            let finer = dag.level(lod - 1).len();
            for node in dag.level(lod) {
                assert!(!node.children.is_empty());
                for &child in &node.children {
                    assert!(child < finer);
                }
            }
        }
    }

    fn check_bounds_cover(dag: &LodDag) {
        for lod in 1..dag.lod_count() {
            for node in dag.level(lod) {
                for &child in &node.children {
                    let child_bounds = &dag.level(lod - 1)[child].cluster.bounds;
                    assert!(
                        node.cluster.bounds.contains(child_bounds, 1.0e-4),
                        "node bounds at lod {lod} do not cover child {child}"
                    );
                }
            }
        }
        // Transitively, the root covers every leaf.
        for leaf in dag.level(0) {
            assert!(dag.root().cluster.bounds.contains(&leaf.cluster.bounds, 1.0e-4));
        }
    }

    #[test]
    fn test_tiny_mesh_two_levels() {
        let tet = tetrahedron();
        let dag = LodDag::build(&tet, &BuildOptions::default(), &GreedyPartitioner);
        assert_eq!(dag.lod_count(), 2);
        assert_eq!(dag.level(0).len(), 1);
        assert_eq!(dag.root().children, vec![0]);
        check_dag_shape(&dag);
        check_bounds_cover(&dag);
    }

    #[test]
    fn test_leaf_clusters_cover_input() {
        let mesh = grid(8);
        let options = BuildOptions::default().with_leaf_triangles(16);
        let dag = LodDag::build(&mesh, &options, &GreedyPartitioner);

        let mut seen = vec![false; mesh.triangle_count()];
        for leaf in dag.level(0) {
            for &t in &leaf.cluster.triangles {
                assert!(!seen[t as usize]);
                seen[t as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_grid_hierarchy_shape() {
        let mesh = grid(8);
        let options = BuildOptions::default().with_leaf_triangles(16);
        let dag = LodDag::build(&mesh, &options, &GreedyPartitioner);
        check_dag_shape(&dag);
        check_bounds_cover(&dag);
        // Coarser levels do not grow.
        for lod in 1..dag.lod_count() {
            assert!(dag.lod_mesh(lod).triangle_count() <= dag.lod_mesh(lod - 1).triangle_count());
        }
    }

    #[test]
    fn test_sphere_hierarchy() {
        let sphere = icosphere(2); // 320 triangles
        let options = BuildOptions::default().with_leaf_triangles(16);
        let dag = LodDag::build(&sphere, &options, &GreedyPartitioner);
        check_dag_shape(&dag);
        check_bounds_cover(&dag);
        assert!(dag.lod_count() >= 3, "expected several levels, got {}", dag.lod_count());

        // The root proxy spans the whole sphere.
        let input_bounds = sphere.bounding_box();
        let root_bounds = &dag.root().cluster.bounds;
        assert!(root_bounds.contains(&input_bounds, 1.0e-4));
        assert!((root_bounds.min - input_bounds.min).norm() < 0.5);
        assert!((root_bounds.max - input_bounds.max).norm() < 0.5);
    }

    #[test]
    fn test_intermediate_levels_shrink() {
        let sphere = icosphere(2);
        let options = BuildOptions::default().with_leaf_triangles(16);
        let dag = LodDag::build(&sphere, &options, &GreedyPartitioner);
        for lod in 1..dag.lod_count() {
            let coarser = dag.lod_mesh(lod).triangle_count();
            let finer = dag.lod_mesh(lod - 1).triangle_count();
            assert!(coarser <= finer, "level {lod} grew: {finer} -> {coarser}");
        }
        let coarsest = dag.lod_mesh(dag.lod_count() - 1).triangle_count();
        assert!(coarsest < sphere.triangle_count() / 2);
    }

    #[test]
    fn test_parent_children_links() {
        let sphere = icosphere(1); // 80 triangles
        let options = BuildOptions::default()
            .with_leaf_triangles(8)
            .with_max_group_size(4);
        let dag = LodDag::build(&sphere, &options, &GreedyPartitioner);
        check_dag_shape(&dag);

        // Every intermediate node's children form a group that was adopted
        // by exactly two parents (or one, at the root).
        for lod in 1..dag.lod_count() - 1 {
            let mut adopters: HashMap<Vec<usize>, usize> = HashMap::new();
            for node in dag.level(lod) {
                *adopters.entry(node.children.clone()).or_insert(0) += 1;
            }
            for (group, count) in adopters {
                assert!(
                    count <= 2,
                    "group {group:?} adopted by {count} parents"
                );
            }
        }
    }

    #[test]
    fn test_node_ids_unique() {
        let mesh = grid(6);
        let options = BuildOptions::default().with_leaf_triangles(12);
        let dag = LodDag::build(&mesh, &options, &GreedyPartitioner);
        let mut ids = std::collections::HashSet::new();
        for level in dag.levels() {
            for node in level {
                assert!(ids.insert(node.id));
            }
        }
    }
}
