use crate::geom::{EdgeKey, EdgeTopology};

#[test]
fn quad_has_one_interior_edge() {
    // Two triangles sharing the diagonal (0, 2).
    let topo = EdgeTopology::build(&[0, 1, 2, 0, 2, 3], 4);

    assert_eq!(topo.edge_count(), 5);
    assert_eq!(topo.boundary_edge_count(), 4);
    assert_eq!(topo.interior_edge_count(), 1);
    assert_eq!(topo.ignored_registrations(), 0);

    let diagonal = topo.edge(2, 0).unwrap();
    assert_eq!(diagonal.key(), EdgeKey::new(0, 2));
    assert_eq!((diagonal.v0, diagonal.v1), (0, 2));
    assert_eq!(diagonal.opposite0, 1);
    assert_eq!(diagonal.opposite1, Some(3));
    assert!(diagonal.is_interior());
    assert_eq!(diagonal.incidence, 2);

    let side = topo.edge(0, 1).unwrap();
    assert!(side.is_boundary());
    assert_eq!(side.opposite0, 2);
    assert_eq!(side.other(0), Some(1));
    assert_eq!(side.other(5), None);
}

#[test]
fn neighbors_and_valence() {
    let topo = EdgeTopology::build(&[0, 1, 2, 0, 2, 3], 4);

    let ring: Vec<u32> = topo.neighbors(0).unwrap().iter().copied().collect();
    assert_eq!(ring, vec![1, 2, 3]);
    assert_eq!(topo.valence(0), 3);
    assert_eq!(topo.valence(1), 2);
    assert_eq!(topo.valence(99), 0);
    assert!(topo.neighbors(99).is_none());
}

#[test]
fn boundary_neighbors_follow_edge_order() {
    let topo = EdgeTopology::build(&[0, 1, 2, 0, 2, 3], 4);

    // Boundary edges in order: (0,1), (1,2), (2,3), (0,3).
    assert_eq!(topo.boundary_neighbors(0), &[1, 3]);
    assert_eq!(topo.boundary_neighbors(1), &[0, 2]);
    assert_eq!(topo.boundary_neighbors(2), &[1, 3]);
    assert_eq!(topo.boundary_neighbors(3), &[2, 0]);
    assert!(topo.is_boundary_vertex(2));
}

#[test]
fn closed_tetrahedron_has_no_boundary() {
    let topo = EdgeTopology::build(&[0, 1, 2, 0, 3, 1, 0, 2, 3, 1, 3, 2], 4);

    assert_eq!(topo.edge_count(), 6);
    assert_eq!(topo.boundary_edge_count(), 0);
    assert_eq!(topo.interior_edge_count(), 6);
    for v in 0..4 {
        assert!(!topo.is_boundary_vertex(v));
        assert_eq!(topo.valence(v), 3);
    }
}

#[test]
fn third_triangle_on_an_edge_is_ignored() {
    let topo = EdgeTopology::build(&[0, 1, 2, 1, 0, 3, 0, 1, 4], 5);

    let shared = topo.edge(0, 1).unwrap();
    assert_eq!(shared.opposite0, 2);
    assert_eq!(shared.opposite1, Some(3));
    assert_eq!(shared.incidence, 3);
    assert!(shared.is_non_manifold());

    assert_eq!(topo.ignored_registrations(), 1);
    assert_eq!(topo.non_manifold_edge_count(), 1);
    // Vertex 4 still sees both endpoints of the shared edge.
    assert_eq!(topo.valence(4), 2);
}

#[test]
fn empty_index_buffer() {
    let topo = EdgeTopology::build(&[], 3);
    assert_eq!(topo.edge_count(), 0);
    assert_eq!(topo.vertex_count(), 3);
    assert!(!topo.is_boundary_vertex(0));
    assert!(topo.boundary_neighbors(0).is_empty());
}
