//! The quadric edge-collapse loop.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::debug;

use super::queue::{Collapse, CollapseQueue};
use super::quadric::Quadric;
use super::SimplifyOptions;
use crate::mesh::{face_area, face_normal, invalid_vertex, Edge, Mesh, INVALID_INDEX};

/// Minimum area a triangle may have after a collapse.
const AREA_EPSILON: f32 = 1.0e-6;

/// Compose a collapse candidate for `edge` from the current vertex,
/// quadric, and pinned-vertex state. Returns `None` when both endpoints
/// are pinned; such an edge is never collapsible.
fn build_collapse(
    mesh: &Mesh,
    quadrics: &[Quadric],
    fixed: &BTreeSet<u32>,
    edge: Edge,
    phase: i32,
) -> Option<Collapse> {
    let fix_a = fixed.contains(&edge.a());
    let fix_b = fixed.contains(&edge.b());
    if fix_a && fix_b {
        return None;
    }
    let a = mesh.vertices[edge.a() as usize];
    let b = mesh.vertices[edge.b() as usize];
    let quadric = quadrics[edge.a() as usize].sum(&quadrics[edge.b() as usize]);
    let position = Collapse::optimal_position(&quadric, &a, &b, fix_a, fix_b);
    let error = quadric.evaluate(&position);
    let length = (a - b).norm();
    Some(Collapse {
        edge,
        quadric,
        position,
        error,
        length,
        fix_a,
        fix_b,
        phase,
    })
}

/// Reduce `mesh` to at most `options.target_triangles` valid triangles by
/// iterative edge collapse.
///
/// Returns the simplified mesh and the number of valid triangles left.
/// With `organize` set, dead vertex and triangle slots are compacted away
/// and duplicate undirected triangles removed; otherwise the working copy
/// is returned with its sentinels in place so triangle indices stay
/// aligned with the input.
///
/// The result is never non-manifold and never contains a triangle whose
/// orientation flipped: candidates that would do either are discarded and
/// the loop moves on. Inputs too small to have a legal interior collapse
/// pass through unchanged.
pub fn simplify_mesh(mesh: &Mesh, options: &SimplifyOptions) -> (Mesh, usize) {
    let mut src = mesh.clone();

    // Per-vertex quadrics, edge usage, and the vertex -> triangles multimap.
    let mut quadrics = vec![Quadric::zero(); src.vertex_count()];
    let mut edges: BTreeSet<Edge> = BTreeSet::new();
    let mut edge_usage: HashMap<Edge, u32> = HashMap::with_capacity(src.triangle_count() * 3);
    let mut vert_to_tri: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    for t in 0..src.triangle_count() {
        let [i0, i1, i2] = src.triangle(t);
        let v0 = src.vertices[i0 as usize];
        let normal = src.normals[t];
        let d = -normal.dot(&v0.coords);
        quadrics[i0 as usize].add_plane(&normal, d);
        quadrics[i1 as usize].add_plane(&normal, d);
        quadrics[i2 as usize].add_plane(&normal, d);
        for e in src.triangle_edges(t) {
            edges.insert(e);
            *edge_usage.entry(e).or_insert(0) += 1;
        }
        for i in [i0, i1, i2] {
            vert_to_tri.entry(i).or_default().insert(t as u32);
        }
    }

    // Vertices on a boundary edge (used by a single triangle) are pinned.
    let mut fixed: BTreeSet<u32> = BTreeSet::new();
    for (edge, &count) in &edge_usage {
        debug_assert!(count <= 2, "non-manifold input edge");
        if count == 1 {
            fixed.insert(edge.a());
            fixed.insert(edge.b());
        }
    }

    let mut queue = CollapseQueue::with_capacity(edges.len());
    for &edge in &edges {
        if let Some(collapse) = build_collapse(&src, &quadrics, &fixed, edge, 0) {
            queue.insert(collapse);
        }
    }
    drop(edge_usage);

    let mut valid_vertices = src.vertex_count();
    let mut valid_triangles = src.triangle_count();
    let mut committed = 0usize;

    'collapse: while valid_triangles > options.target_triangles {
        let Some(best) = queue.peek().cloned() else {
            break;
        };
        let (keep, remove) = if best.fix_b {
            (best.edge.b(), best.edge.a())
        } else {
            (best.edge.a(), best.edge.b())
        };

        let tris_with_keep = vert_to_tri.get(&keep).cloned().unwrap_or_default();
        let tris_with_remove = vert_to_tri.get(&remove).cloned().unwrap_or_default();

        // Triangles carrying both endpoints die with the edge. Anything
        // other than exactly two means this is not a legal manifold
        // interior edge right now.
        let removed: BTreeSet<u32> = tris_with_keep
            .intersection(&tris_with_remove)
            .copied()
            .collect();
        if removed.len() != 2 {
            queue.erase(&best.edge);
            continue;
        }
        let updated_all: BTreeSet<u32> =
            tris_with_keep.union(&tris_with_remove).copied().collect();
        let updated: BTreeSet<u32> = updated_all.difference(&removed).copied().collect();

        let target = best.position;

        // Orientation and degeneracy guard over the surviving fan.
        for &t in &updated {
            let old_normal = src.normals[t as usize];
            let [i0, i1, i2] = src.triangle(t as usize);
            let substitute = |i: u32| {
                if i == keep || i == remove {
                    target
                } else {
                    src.vertices[i as usize]
                }
            };
            let (v0, v1, v2) = (substitute(i0), substitute(i1), substitute(i2));
            let new_normal = face_normal(&v0, &v1, &v2);
            if old_normal.dot(&new_normal) < options.flip_threshold
                || face_area(&v0, &v1, &v2) < AREA_EPSILON
            {
                queue.erase(&best.edge);
                continue 'collapse;
            }
        }

        // Topology guard: after rewriting `remove` to `keep`, no edge of
        // the surviving fan may be carried by more than two triangles, and
        // no two surviving triangles may land on the same vertex triple
        // (a doubled face is a degenerate pocket even though each of its
        // edges counts only twice).
        let mut usage: HashMap<Edge, u32> = HashMap::new();
        let mut triples: HashSet<[u32; 3]> = HashSet::new();
        for &t in &updated {
            let [i0, i1, i2] = src.triangle(t as usize);
            let rewrite = |i: u32| if i == remove { keep } else { i };
            let (u0, u1, u2) = (rewrite(i0), rewrite(i1), rewrite(i2));
            for e in [Edge::new(u0, u1), Edge::new(u1, u2), Edge::new(u2, u0)] {
                *usage.entry(e).or_insert(0) += 1;
            }
            let mut triple = [u0, u1, u2];
            triple.sort_unstable();
            if !triples.insert(triple) {
                queue.erase(&best.edge);
                continue 'collapse;
            }
        }
        if usage.values().any(|&count| count > 2) {
            queue.erase(&best.edge);
            continue;
        }

        // Commit.
        valid_vertices -= 1;
        valid_triangles -= removed.len();
        debug_assert_eq!(removed.len(), 2);

        // Scrub every queued edge that touches the dying vertex; survivors
        // around it are re-queued at the end against the new geometry.
        for &t in &tris_with_remove {
            for e in src.triangle_edges(t as usize) {
                if e.touches(remove) {
                    queue.erase(&e);
                }
            }
        }

        // Multimap surgery: fold the dying vertex's triangles into the kept
        // vertex, drop the dead triangles from every endpoint's set.
        let remove_entry = vert_to_tri.remove(&remove).unwrap_or_default();
        vert_to_tri
            .entry(keep)
            .or_default()
            .extend(remove_entry.iter().copied());
        for &t in &removed {
            for i in src.triangle(t as usize) {
                if let Some(set) = vert_to_tri.get_mut(&i) {
                    set.remove(&t);
                }
            }
        }

        // Retire the old face planes of everything about to change, dead
        // triangles included, before any geometry moves.
        for &t in &updated_all {
            let [i0, i1, i2] = src.triangle(t as usize);
            let v0 = src.vertices[i0 as usize];
            let normal = src.normals[t as usize];
            let d = -normal.dot(&v0.coords);
            quadrics[i0 as usize].remove_plane(&normal, d);
            quadrics[i1 as usize].remove_plane(&normal, d);
            quadrics[i2 as usize].remove_plane(&normal, d);
        }

        // Move the kept vertex, kill the other.
        src.vertices[keep as usize] = target;
        src.vertices[remove as usize] = invalid_vertex();

        // Rewrite indices, sentinel the dead triangles.
        for &t in &tris_with_remove {
            let tri = src
                .triangle(t as usize)
                .map(|i| if i == remove { keep } else { i });
            src.set_triangle(t as usize, tri);
        }
        for &t in &removed {
            src.set_triangle(t as usize, [INVALID_INDEX; 3]);
        }

        // Refresh normals of the surviving fan, then re-accumulate its
        // face planes against the post-collapse geometry.
        for &t in &updated {
            let [v0, v1, v2] = src.triangle_vertices(t as usize);
            src.normals[t as usize] = face_normal(&v0, &v1, &v2);
        }
        for &t in &updated {
            let [i0, i1, i2] = src.triangle(t as usize);
            let v0 = src.vertices[i0 as usize];
            let normal = src.normals[t as usize];
            let d = -normal.dot(&v0.coords);
            quadrics[i0 as usize].add_plane(&normal, d);
            quadrics[i1 as usize].add_plane(&normal, d);
            quadrics[i2 as usize].add_plane(&normal, d);
        }

        // Every edge around the fan has stale error now. Re-queue the ones
        // that were queued, preserving their phase.
        let mut affected: BTreeSet<Edge> = BTreeSet::new();
        for &t in &updated {
            for i in src.triangle(t as usize) {
                if let Some(triangles) = vert_to_tri.get(&i) {
                    for &t2 in triangles {
                        for e in src.triangle_edges(t2 as usize) {
                            if e.touches(i) {
                                affected.insert(e);
                            }
                        }
                    }
                }
            }
        }
        for edge in affected {
            if let Some(phase) = queue.erase(&edge) {
                if let Some(collapse) = build_collapse(&src, &quadrics, &fixed, edge, phase) {
                    queue.insert(collapse);
                }
            }
        }
        committed += 1;
    }

    debug!(
        "simplified {} -> {} triangles in {committed} collapses ({} candidates left)",
        mesh.triangle_count(),
        valid_triangles,
        queue.len()
    );

    if !options.organize {
        return (src, valid_triangles);
    }
    (organize(&src, valid_vertices, valid_triangles), valid_triangles)
}

/// Compact away sentinel slots and deduplicate undirected triangles.
fn organize(src: &Mesh, valid_vertices: usize, valid_triangles: usize) -> Mesh {
    let mut out = Mesh::new(&src.name);
    out.vertices.reserve(valid_vertices);
    out.indices.reserve(valid_triangles * 3);
    out.normals.reserve(valid_triangles);
    out.colors.reserve(valid_triangles);

    let sentinel = invalid_vertex();
    let mut vertex_map: HashMap<u32, u32> = HashMap::with_capacity(src.vertex_count());
    for (i, &v) in src.vertices.iter().enumerate() {
        if v == sentinel {
            continue;
        }
        vertex_map.insert(i as u32, out.vertices.len() as u32);
        out.vertices.push(v);
    }

    // Key triangles by their sorted index triple; the first occurrence of
    // each undirected triangle wins and keeps its winding and attributes.
    let mut unique: BTreeMap<[u32; 3], ([u32; 3], usize)> = BTreeMap::new();
    for t in 0..src.triangle_count() {
        if src.is_triangle_invalid(t) {
            continue;
        }
        let remapped = src.triangle(t).map(|i| vertex_map[&i]);
        let mut key = remapped;
        key.sort_unstable();
        unique.entry(key).or_insert((remapped, t));
    }
    for (remapped, t) in unique.into_values() {
        out.indices.extend_from_slice(&remapped);
        out.normals.push(src.normals[t]);
        out.colors.push(src.colors[t]);
    }
    out
}
