use crate::geom::{GeomMesh, IndexFormat, Tolerance, WeldError, weld_mesh, weld_mesh_vertices};

/// Unit quad exported as two triangles with split corners.
fn split_quad() -> GeomMesh {
    GeomMesh::new(
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        vec![0, 1, 2, 3, 4, 5],
    )
}

#[test]
fn weld_merges_split_corners() {
    let (welded, diag) = weld_mesh(&split_quad(), 1e-6).unwrap();

    assert_eq!(
        welded.positions,
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]
    );
    assert_eq!(welded.indices, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(diag.input_vertex_count, 6);
    assert_eq!(diag.output_vertex_count, 4);
    assert_eq!(diag.welded_vertex_count, 2);
    assert_eq!(diag.index_format, Some(IndexFormat::U16));
    welded.validate().unwrap();
}

#[test]
fn weld_is_idempotent() {
    let (once, _) = weld_mesh(&split_quad(), 1e-6).unwrap();
    let (twice, diag) = weld_mesh(&once, 1e-6).unwrap();
    assert_eq!(once, twice);
    assert_eq!(diag.welded_vertex_count, 0);
}

#[test]
fn weld_collapses_within_one_grid_cell() {
    let points = [[0.0, 0.0, 0.0], [0.4e-6, 0.0, 0.0], [0.6e-6, 0.0, 0.0]];
    let (out, _, indices, welded) =
        weld_mesh_vertices(&points, None, &[0, 1, 2], Tolerance::WELD).unwrap();

    // 0.4e-6 rounds into cell 0, 0.6e-6 into cell 1.
    assert_eq!(out, vec![[0.0, 0.0, 0.0], [0.6e-6, 0.0, 0.0]]);
    assert_eq!(indices, vec![0, 0, 1]);
    assert_eq!(welded, 1);
}

#[test]
fn weld_is_cell_based_not_distance_based() {
    // 0.02e-6 apart but on opposite sides of a rounding boundary.
    let points = [[0.49e-6, 0.0, 0.0], [0.51e-6, 0.0, 0.0]];
    let (out, _, _, welded) =
        weld_mesh_vertices(&points, None, &[], Tolerance::WELD).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(welded, 0);
}

#[test]
fn weld_keeps_first_seen_uv() {
    let mut mesh = split_quad();
    mesh.uvs = Some(vec![
        [0.0, 0.0],
        [1.0, 0.0],
        [1.0, 1.0],
        [0.5, 0.5], // duplicate of vertex 0 with a different UV
        [1.0, 1.0],
        [0.0, 1.0],
    ]);

    let (welded, diag) = weld_mesh(&mesh, 1e-6).unwrap();
    let uvs = welded.uvs.unwrap();
    assert_eq!(uvs, vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    assert_eq!(diag.discarded_uv_count, 1);
}

#[test]
fn weld_recomputes_normals_only_when_present() {
    let (plain, _) = weld_mesh(&split_quad(), 1e-6).unwrap();
    assert!(plain.normals.is_none());

    let mut with_normals = split_quad();
    with_normals.normals = Some(vec![[1.0, 0.0, 0.0]; 6]);
    let (welded, _) = weld_mesh(&with_normals, 1e-6).unwrap();
    let normals = welded.normals.unwrap();
    assert_eq!(normals.len(), 4);
    for n in normals {
        assert!((n[2] - 1.0).abs() < 1e-12);
    }
}

#[test]
fn weld_rejects_invalid_input() {
    assert_eq!(
        weld_mesh(&split_quad(), 0.0).unwrap_err(),
        WeldError::InvalidTolerance { tolerance: 0.0 }
    );

    let broken = GeomMesh::new(vec![[0.0, 0.0, 0.0]], vec![0, 0, 7]);
    assert!(matches!(
        weld_mesh(&broken, 1e-6),
        Err(WeldError::InvalidMesh(_))
    ));

    assert!(matches!(
        weld_mesh_vertices(&[], None, &[], Tolerance::new(-1.0)),
        Err(WeldError::InvalidTolerance { .. })
    ));
}
