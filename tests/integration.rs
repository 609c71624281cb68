use subd_engine::geom::{EdgeTopology, Tolerance, loop_alpha};
use subd_engine::{
    CurveError, CurveRefineOptions, GeomMesh, GeomMeshDiagnostics, IndexFormat,
    LoopSubdivisionOptions, SubdivisionError, WeldError, chaikin_refine_once, loop_subdivide,
    refine_curve, subdivide_once, try_refine_curve, weld_mesh,
};

fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Two triangles sharing the diagonal, exported with split corners and
/// matching UVs.
fn split_quad_with_uvs() -> GeomMesh {
    GeomMesh::with_uvs(
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        vec![0, 1, 2, 3, 4, 5],
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
    )
}

fn cube() -> GeomMesh {
    GeomMesh::new(
        vec![
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ],
        vec![
            0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7, 0, 1, 5, 0, 5, 4, 2, 3, 7, 2, 7, 6, 0, 4, 7,
            0, 7, 3, 1, 2, 6, 1, 6, 5,
        ],
    )
}

#[test]
fn weld_then_subdivide_pipeline() {
    let input = split_quad_with_uvs();

    let (welded, weld_diag) = weld_mesh(&input, Tolerance::WELD.eps).expect("weld");
    assert_eq!(weld_diag.welded_vertex_count, 2);
    assert_eq!(weld_diag.discarded_uv_count, 0);
    assert_eq!(welded.vertex_count(), 4);

    let (smooth, diag) =
        loop_subdivide(&input, LoopSubdivisionOptions::new(2)).expect("subdivide");
    assert_eq!(diag.welded_vertex_count, 2);
    assert_eq!(smooth.triangle_count(), 2 * 16);
    assert_eq!(smooth.uvs.as_ref().map(Vec::len), Some(smooth.vertex_count()));

    // On a flat quad the UVs track the xy coordinates exactly.
    let uvs = smooth.uvs.as_ref().unwrap();
    for (uv, p) in uvs.iter().zip(&smooth.positions) {
        assert!(approx_eq(uv[0], p[0], 1e-12));
        assert!(approx_eq(uv[1], p[1], 1e-12));
    }
}

#[test]
fn cube_converges_towards_a_closed_smooth_surface() {
    let (smooth, diag) = loop_subdivide(&cube(), LoopSubdivisionOptions::new(3)).expect("subdivide");

    assert_eq!(smooth.triangle_count(), 12 * 64);
    assert_eq!(diag.boundary_edge_count, 0);
    assert_eq!(diag.low_valence_vertex_count, 0);

    let report = diag.to_mesh_diagnostics(&smooth);
    assert!(report.is_valid_solid(), "{report}");
    assert_eq!(report.index_format, Some(IndexFormat::U16));

    // Euler characteristic of a sphere.
    let euler = report.vertex_count as i64 - report.edge_count as i64 + report.triangle_count as i64;
    assert_eq!(euler, 2);

    for p in &smooth.positions {
        for c in p {
            assert!(c.abs() < 1.0);
        }
    }
}

#[test]
fn single_pass_matches_driver_without_weld_or_normals() {
    let mesh = cube();
    let once = subdivide_once(&mesh).expect("subdivide once");
    let options = LoopSubdivisionOptions::new(1)
        .with_weld_tolerance(None)
        .with_recompute_normals(false);
    let (driven, _) = loop_subdivide(&mesh, options).expect("subdivide");
    assert_eq!(once, driven);
}

#[test]
fn vertex_count_grows_by_edge_count() {
    let mut mesh = cube();
    for _ in 0..3 {
        let edges = EdgeTopology::build(&mesh.indices, mesh.vertex_count()).edge_count();
        let next = subdivide_once(&mesh).expect("subdivide once");
        assert_eq!(next.vertex_count(), mesh.vertex_count() + edges);
        assert_eq!(next.triangle_count(), 4 * mesh.triangle_count());
        mesh = next;
    }
}

#[test]
fn loop_alpha_matches_known_weights() {
    assert_eq!(loop_alpha(0), 0.0);
    assert_eq!(loop_alpha(3), 3.0 / 16.0);
    // Regular valence 6 gives 1/16.
    assert!(approx_eq(loop_alpha(6), 1.0 / 16.0, 1e-15));
    assert!(loop_alpha(12) < loop_alpha(6));
}

#[test]
fn errors_surface_through_the_public_api() {
    let out_of_range = GeomMesh::new(vec![[0.0; 3]; 3], vec![0, 1, 9]);
    assert!(matches!(
        loop_subdivide(&out_of_range, LoopSubdivisionOptions::default()),
        Err(SubdivisionError::InvalidMesh(_))
    ));
    assert!(matches!(
        weld_mesh(&out_of_range, 1e-6),
        Err(WeldError::InvalidMesh(_))
    ));
    assert!(matches!(
        weld_mesh(&cube(), f64::NAN),
        Err(WeldError::InvalidTolerance { .. })
    ));

    let far = GeomMesh::new(vec![[0.0; 3], [0.0, 1.0, 0.0], [-1e14, 0.0, 0.0]], vec![0, 1, 2]);
    assert!(matches!(
        loop_subdivide(&far, LoopSubdivisionOptions::default()),
        Err(SubdivisionError::Weld(WeldError::CoordinateOutOfRange { index: 2, .. }))
    ));

    let err = try_refine_curve(&[], CurveRefineOptions::default()).unwrap_err();
    assert_eq!(err, CurveError::InsufficientPoints { count: 0 });
    assert!(err.to_string().contains("at least 2"));
}

#[test]
fn chaikin_open_and_closed_share_interior_points() {
    let points = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0]];
    let open = chaikin_refine_once(&points, false);
    let closed = chaikin_refine_once(&points, true);

    assert_eq!(open.len(), 6);
    assert_eq!(closed.len(), 6);
    assert_eq!(open[1..5], closed[0..4]);
}

#[test]
fn curve_refinement_shrinks_displacement_each_pass() {
    let points = [
        [0.0, 0.0, 0.0],
        [3.0, 0.0, 1.0],
        [3.0, 3.0, 0.0],
        [0.0, 3.0, -1.0],
    ];
    let mut previous = f64::INFINITY;
    for iterations in 1..=5 {
        let (refined, diag) = refine_curve(&points, CurveRefineOptions::new(iterations, true));
        assert_eq!(refined.len(), points.len() << iterations);
        assert!(diag.max_displacement < previous);
        previous = diag.max_displacement;
    }
}

#[test]
fn diagnostics_serialize_shape_is_stable() {
    let (smooth, diag) = loop_subdivide(&cube(), LoopSubdivisionOptions::new(1)).expect("subdivide");
    let report: GeomMeshDiagnostics = diag.to_mesh_diagnostics(&smooth);
    let summary = report.summary();
    assert!(summary.starts_with(&format!(
        "V:{} T:{} E:{}",
        smooth.vertex_count(),
        smooth.triangle_count(),
        report.edge_count
    )));
}
