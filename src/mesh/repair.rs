//! Post-load mesh normalization.
//!
//! Imported assets frequently arrive with duplicated seam vertices (one copy
//! per smoothing group or UV island) and with several disjoint shells in one
//! file. The clustering and simplification passes assume welded, connected
//! input, so the loader runs these passes first.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use log::debug;

use super::{face_normal, Edge, Mesh};
use nalgebra::Vector3;

/// Distance below which two boundary vertices are considered the same point.
const WELD_THRESHOLD: f32 = 1.0e-4;

impl Mesh {
    /// Weld duplicated seam vertices and close the boundary loops that remain.
    ///
    /// Only vertices incident exclusively to boundary edges (edges used by a
    /// single triangle) are candidates; interior vertices are never merged,
    /// so already-stitched regions keep their topology. Each candidate is
    /// paired with its nearest unpaired candidate within a small threshold,
    /// unless the two already share an edge (welding those would collapse a
    /// sliver into a degenerate triangle). The pass repeats until no further
    /// weld changes the boundary, then any boundary loops still open are
    /// closed by fan triangulation.
    pub fn merge_duplicated_vertices(&mut self) {
        let mut prev_boundary_count = usize::MAX;
        loop {
            let usage = self.edge_usage();
            let edges: HashSet<Edge> = usage.keys().copied().collect();

            let mut boundary: BTreeSet<u32> = BTreeSet::new();
            let mut interior: BTreeSet<u32> = BTreeSet::new();
            for (edge, &count) in &usage {
                debug_assert!(count <= 2, "non-manifold edge in weld pass");
                if count == 1 {
                    boundary.insert(edge.a());
                    boundary.insert(edge.b());
                } else {
                    interior.insert(edge.a());
                    interior.insert(edge.b());
                }
            }
            for v in &boundary {
                interior.remove(v);
            }

            if boundary.is_empty() || boundary.len() == prev_boundary_count {
                break;
            }
            prev_boundary_count = boundary.len();
            debug!(
                "weld pass: {} boundary vertices, {} interior",
                boundary.len(),
                interior.len()
            );

            // Pair each boundary vertex with its nearest unpaired peer.
            let candidates: Vec<u32> = boundary.iter().copied().collect();
            let mut merged_into: HashMap<u32, u32> = HashMap::new();
            for i in 0..candidates.len() {
                let index = candidates[i];
                if merged_into.contains_key(&index) {
                    continue;
                }
                let vertex = self.vertices[index as usize];
                let mut min_distance = f32::MAX;
                let mut closest = None;
                for &other in &candidates[i + 1..] {
                    if merged_into.contains_key(&other) {
                        continue;
                    }
                    let distance = (self.vertices[other as usize] - vertex).norm();
                    if distance < min_distance && !edges.contains(&Edge::new(index, other)) {
                        min_distance = distance;
                        closest = Some(other);
                    }
                }
                if let Some(other) = closest {
                    if min_distance < WELD_THRESHOLD {
                        merged_into.insert(other, index);
                    }
                }
            }

            // Rebuild the vertex array. Boundary vertices come first in index
            // order so a merged vertex's target is always mapped before it.
            let mut merged_vertices = Vec::with_capacity(self.vertices.len());
            let mut index_map: HashMap<u32, u32> = HashMap::with_capacity(self.vertices.len());
            for &index in &boundary {
                match merged_into.get(&index) {
                    None => {
                        index_map.insert(index, merged_vertices.len() as u32);
                        merged_vertices.push(self.vertices[index as usize]);
                    }
                    Some(target) => {
                        let mapped = index_map[target];
                        index_map.insert(index, mapped);
                    }
                }
            }
            for &index in &interior {
                index_map.insert(index, merged_vertices.len() as u32);
                merged_vertices.push(self.vertices[index as usize]);
            }

            for index in &mut self.indices {
                *index = index_map[index];
            }
            self.vertices = merged_vertices;
        }

        self.close_boundary_loops();
    }

    /// Close every boundary loop with a triangle fan anchored at the loop's
    /// first vertex. Open chains (boundaries that do not cycle) are left
    /// alone.
    pub fn close_boundary_loops(&mut self) {
        let mut open: BTreeSet<Edge> = self
            .edge_usage()
            .into_iter()
            .filter(|&(_, count)| count == 1)
            .map(|(edge, _)| edge)
            .collect();

        let mut polygons: Vec<Vec<u32>> = Vec::new();
        while let Some(&start) = open.iter().next() {
            open.remove(&start);
            let head = start.a();
            let mut tail = start.b();
            let mut polygon = vec![head, tail];
            loop {
                let next = open.iter().find(|e| e.touches(tail)).copied();
                match next {
                    Some(edge) => {
                        open.remove(&edge);
                        let vertex = edge.opposite(tail);
                        if vertex == head {
                            tail = head;
                            break;
                        }
                        polygon.push(vertex);
                        tail = vertex;
                    }
                    None => break,
                }
            }
            if tail == head && polygon.len() >= 3 {
                polygons.push(polygon);
            }
        }

        for polygon in polygons {
            debug!("closing boundary loop of {} vertices", polygon.len());
            for i in 1..polygon.len() - 1 {
                let (i0, i1, i2) = (polygon[0], polygon[i], polygon[i + 1]);
                self.indices.extend_from_slice(&[i0, i1, i2]);
                self.normals.push(face_normal(
                    &self.vertices[i0 as usize],
                    &self.vertices[i1 as usize],
                    &self.vertices[i2 as usize],
                ));
                self.colors.push(Vector3::new(1.0, 1.0, 1.0));
            }
        }
    }

    /// Drop vertex positions that no valid triangle references and compact
    /// the index array. Kept vertices appear in first-use order.
    pub fn remove_unused_vertices(&mut self) {
        let mut index_map: HashMap<u32, u32> = HashMap::with_capacity(self.vertices.len());
        let mut kept = Vec::with_capacity(self.vertices.len());
        for t in 0..self.triangle_count() {
            if self.is_triangle_invalid(t) {
                continue;
            }
            for index in self.triangle(t) {
                index_map.entry(index).or_insert_with(|| {
                    kept.push(self.vertices[index as usize]);
                    (kept.len() - 1) as u32
                });
            }
        }
        for t in 0..self.triangle_count() {
            if self.is_triangle_invalid(t) {
                continue;
            }
            let tri = self.triangle(t).map(|i| index_map[&i]);
            self.set_triangle(t, tri);
        }
        self.vertices = kept;
    }

    /// Split the mesh into its connected components (triangles joined
    /// through shared edges), largest first by vertex count.
    pub fn split_connected_components(&self) -> Vec<Mesh> {
        let triangle_count = self.triangle_count();
        let mut edge_to_triangles: HashMap<Edge, Vec<u32>> =
            HashMap::with_capacity(triangle_count * 3);
        for t in 0..triangle_count {
            for e in self.triangle_edges(t) {
                edge_to_triangles.entry(e).or_default().push(t as u32);
            }
        }

        let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); triangle_count];
        for triangles in edge_to_triangles.values() {
            for i in 0..triangles.len() {
                for j in i + 1..triangles.len() {
                    adjacency[triangles[i] as usize].push(triangles[j]);
                    adjacency[triangles[j] as usize].push(triangles[i]);
                }
            }
        }

        let mut visited = vec![false; triangle_count];
        let mut components: Vec<Vec<u32>> = Vec::new();
        for t in 0..triangle_count {
            if visited[t] {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back(t as u32);
            visited[t] = true;
            while let Some(current) = queue.pop_front() {
                component.push(current);
                for &neighbor in &adjacency[current as usize] {
                    if !visited[neighbor as usize] {
                        visited[neighbor as usize] = true;
                        queue.push_back(neighbor);
                    }
                }
            }
            components.push(component);
        }

        let mut meshes: Vec<Mesh> = components
            .iter()
            .map(|component| self.sub_mesh(component, false))
            .collect();
        meshes.sort_by(|a, b| b.vertex_count().cmp(&a.vertex_count()));
        meshes
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use nalgebra::Point3;

    /// Tetrahedron with one face detached onto a duplicated copy of vertex 0.
    fn cracked_tetrahedron() -> Mesh {
        let vertices = vec![
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(-1.0, 1.0, -1.0),
            Point3::new(-1.0, -1.0, 1.0),
            Point3::new(1.0 + 5.0e-5, 1.0, 1.0),
        ];
        let faces = [[0, 1, 2], [0, 3, 1], [4, 2, 3], [1, 3, 2]];
        Mesh::from_triangles("cracked", vertices, &faces)
    }

    #[test]
    fn test_weld_closes_crack() {
        let mut mesh = cracked_tetrahedron();
        assert!(mesh.edge_usage().values().any(|&c| c == 1));
        mesh.merge_duplicated_vertices();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 4);
        assert!(mesh.is_manifold());
        assert!(mesh.edge_usage().values().all(|&c| c == 2));
    }

    #[test]
    fn test_weld_leaves_clean_mesh_alone() {
        let mut mesh = tetrahedron();
        mesh.merge_duplicated_vertices();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 4);
    }

    #[test]
    fn test_close_boundary_loops_fills_hole() {
        // Tetrahedron with one face missing: a 3-cycle boundary.
        let vertices = tetrahedron().vertices;
        let faces = [[0, 1, 2], [0, 3, 1], [0, 2, 3]];
        let mut mesh = Mesh::from_triangles("open_tet", vertices, &faces);
        mesh.close_boundary_loops();
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.normals.len(), 4);
        assert_eq!(mesh.colors.len(), 4);
        assert!(mesh.edge_usage().values().all(|&c| c == 2));
    }

    #[test]
    fn test_remove_unused_vertices() {
        let mut mesh = grid(2);
        // Keep a single corner triangle; most of the grid goes unreferenced.
        mesh.indices.truncate(3);
        mesh.normals.truncate(1);
        mesh.colors.truncate(1);
        let before = mesh.triangle_vertices(0);
        mesh.remove_unused_vertices();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_vertices(0), before);
    }

    #[test]
    fn test_split_connected_components() {
        // A tetrahedron and a far-away triangle in one index buffer.
        let mut vertices = tetrahedron().vertices;
        vertices.push(Point3::new(10.0, 0.0, 0.0));
        vertices.push(Point3::new(11.0, 0.0, 0.0));
        vertices.push(Point3::new(10.0, 1.0, 0.0));
        let faces = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2], [4, 5, 6]];
        let mesh = Mesh::from_triangles("two_shells", vertices, &faces);

        let components = mesh.split_connected_components();
        assert_eq!(components.len(), 2);
        // Largest first.
        assert_eq!(components[0].vertex_count(), 4);
        assert_eq!(components[0].triangle_count(), 4);
        assert_eq!(components[1].vertex_count(), 3);
        assert_eq!(components[1].triangle_count(), 1);
    }

    #[test]
    fn test_split_single_component() {
        let components = icosahedron().split_connected_components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].triangle_count(), 20);
    }
}
