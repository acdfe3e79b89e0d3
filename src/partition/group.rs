//! Grouping sibling clusters for joint simplification.
//!
//! Coarsening works on batches of neighboring clusters: every group is
//! simplified as one sub-mesh so that collapses can cross the internal
//! cluster seams while the group border stays pinned. Groups are formed by
//! partitioning the cluster-adjacency graph, so members tend to be
//! topologically contiguous.

use std::collections::BTreeMap;

use log::{debug, warn};

use super::graph::{CsrGraph, GraphPartitioner};
use super::Cluster;
use crate::mesh::{Edge, Mesh};

/// Partition `clusters` into groups of at most roughly `max_group_size`
/// members.
///
/// Two clusters are adjacent when they share an edge; every pair of
/// clusters sharing an edge is linked, even when more than two meet there
/// (simplification of earlier levels can leave local non-manifold seams,
/// which is tolerated here). Exact balance is requested so group sizes stay
/// uniform. Every cluster index lands in exactly one group.
///
/// Returns an empty vector when the backend fails; callers treat that as
/// the end of the road for grouping.
pub fn group_clusters(
    mesh: &Mesh,
    clusters: &[Cluster],
    max_group_size: usize,
    partitioner: &dyn GraphPartitioner,
) -> Vec<Vec<usize>> {
    let cluster_count = clusters.len();
    if cluster_count == 0 {
        return Vec::new();
    }
    let parts = cluster_count.div_ceil(max_group_size);
    if parts <= 1 {
        return vec![(0..cluster_count).collect()];
    }

    // Map every edge to the clusters that use it, one entry per cluster
    // even when several of its triangles share the edge.
    let mut edge_to_clusters: BTreeMap<Edge, Vec<i32>> = BTreeMap::new();
    for (index, cluster) in clusters.iter().enumerate() {
        for &t in &cluster.triangles {
            for e in mesh.triangle_edges(t as usize) {
                let entry = edge_to_clusters.entry(e).or_default();
                if entry.last() != Some(&(index as i32)) {
                    entry.push(index as i32);
                }
            }
        }
    }

    let mut adjacency: Vec<BTreeMap<i32, i32>> = vec![BTreeMap::new(); cluster_count];
    for owners in edge_to_clusters.values() {
        for i in 0..owners.len() {
            for j in i + 1..owners.len() {
                let (c0, c1) = (owners[i], owners[j]);
                if c0 == c1 {
                    continue;
                }
                // Shared-edge multiplicity as the link weight keeps strongly
                // stitched clusters together.
                *adjacency[c0 as usize].entry(c1).or_insert(0) += 1;
                *adjacency[c1 as usize].entry(c0).or_insert(0) += 1;
            }
        }
    }

    let mut graph = CsrGraph {
        xadj: Vec::with_capacity(cluster_count + 1),
        adjncy: Vec::new(),
        vwgt: vec![1; cluster_count],
        adjwgt: Vec::new(),
    };
    graph.xadj.push(0);
    for neighbor_map in &adjacency {
        for (&neighbor, &weight) in neighbor_map {
            graph.adjncy.push(neighbor);
            graph.adjwgt.push(weight);
        }
        graph.xadj.push(graph.adjncy.len() as i32);
    }

    let partition = match partitioner.part_kway(&graph, parts as i32, 1.0) {
        Ok(partition) => partition,
        Err(e) => {
            warn!("grouping {cluster_count} clusters into {parts} groups failed: {e}");
            return Vec::new();
        }
    };
    debug!(
        "grouped {cluster_count} clusters into {parts} groups, edge cut {}",
        partition.edge_cut
    );

    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); parts];
    for (index, &part) in partition.parts.iter().enumerate() {
        groups[part as usize].push(index);
    }
    groups.retain(|g| !g.is_empty());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{build_clusters, GreedyPartitioner};
    use crate::mesh::fixtures::*;

    #[test]
    fn test_small_set_single_group() {
        let mesh = grid(2);
        let clusters = build_clusters(&mesh, 4, &GreedyPartitioner);
        let n = clusters.len();
        if n <= 4 {
            let groups = group_clusters(&mesh, &clusters, 4, &GreedyPartitioner);
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0], (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_group_coverage() {
        let mesh = grid(8);
        let clusters = build_clusters(&mesh, 8, &GreedyPartitioner);
        let n = clusters.len();
        assert!(n > 4, "expected several clusters, got {n}");

        let groups = group_clusters(&mesh, &clusters, 4, &GreedyPartitioner);
        let mut seen = vec![false; n];
        for group in &groups {
            assert!(!group.is_empty());
            for &index in group {
                assert!(!seen[index], "cluster {index} grouped twice");
                seen[index] = true;
            }
        }
        assert!(seen.iter().all(|&s| s), "some cluster ungrouped");
        assert_eq!(groups.len(), n.div_ceil(4));
    }

    #[test]
    fn test_group_sizes_balanced() {
        let mesh = grid(10);
        let clusters = build_clusters(&mesh, 16, &GreedyPartitioner);
        let groups = group_clusters(&mesh, &clusters, 4, &GreedyPartitioner);
        if groups.len() > 1 {
            let max = groups.iter().map(Vec::len).max().unwrap();
            let min = groups.iter().map(Vec::len).min().unwrap();
            assert!(max - min <= 1, "group sizes spread too far: {min}..{max}");
        }
    }
}
