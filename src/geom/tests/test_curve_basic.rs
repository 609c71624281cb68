use crate::geom::{
    CurveError, CurveRefineOptions, Tolerance, chaikin_refine_once, refine_curve,
    try_refine_curve,
};

fn unit_square() -> Vec<[f64; 3]> {
    vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ]
}

#[test]
fn closed_pass_cuts_every_corner() {
    let out = chaikin_refine_once(&unit_square(), true);
    assert_eq!(
        out,
        vec![
            [0.25, 0.0, 0.0],
            [0.75, 0.0, 0.0],
            [1.0, 0.25, 0.0],
            [1.0, 0.75, 0.0],
            [0.75, 1.0, 0.0],
            [0.25, 1.0, 0.0],
            [0.0, 0.75, 0.0],
            [0.0, 0.25, 0.0],
        ]
    );
}

#[test]
fn open_pass_keeps_endpoints() {
    let points = [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 4.0, 0.0]];
    let out = chaikin_refine_once(&points, false);

    assert_eq!(out.len(), 2 * (points.len() - 1) + 2);
    assert_eq!(out.first(), points.first());
    assert_eq!(out.last(), points.last());
    assert_eq!(out[1], [1.0, 0.0, 0.0]);
    assert_eq!(out[2], [3.0, 0.0, 0.0]);
    assert_eq!(out[3], [4.0, 1.0, 0.0]);
    assert_eq!(out[4], [4.0, 3.0, 0.0]);
}

#[test]
fn size_laws_over_iterations() {
    let (closed, diag) = refine_curve(&unit_square(), CurveRefineOptions::new(3, true));
    assert_eq!(closed.len(), 4 * 8);
    assert_eq!(diag.output_point_count, 32);
    assert_eq!(diag.iterations_applied, 3);

    let (open, _) = refine_curve(&unit_square(), CurveRefineOptions::new(2, false));
    // 4 -> 8 -> 16
    assert_eq!(open.len(), 16);
    assert_eq!(open[0], [0.0, 0.0, 0.0]);
    assert_eq!(open[15], [0.0, 1.0, 0.0]);
}

#[test]
fn fewer_than_two_points() {
    assert!(chaikin_refine_once(&[], true).is_empty());
    assert!(chaikin_refine_once(&[[1.0, 2.0, 3.0]], false).is_empty());

    let (out, diag) = refine_curve(&[[1.0, 2.0, 3.0]], CurveRefineOptions::default());
    assert!(out.is_empty());
    assert_eq!(diag.iterations_applied, 0);
    assert_eq!(diag.warnings.len(), 1);

    assert_eq!(
        try_refine_curve(&[[1.0, 2.0, 3.0]], CurveRefineOptions::default()),
        Err(CurveError::InsufficientPoints { count: 1 })
    );
}

#[test]
fn zero_iterations_is_identity() {
    let (out, diag) = refine_curve(&unit_square(), CurveRefineOptions::new(0, true));
    assert_eq!(out, unit_square());
    assert_eq!(diag.max_displacement, 0.0);
    assert!(!diag.has_converged(1.0));

    let single = [[1.0, 2.0, 3.0]];
    let (out, diag) = refine_curve(&single, CurveRefineOptions::new(0, true));
    assert_eq!(out, single.to_vec());
    assert!(diag.warnings.is_empty());
}

#[test]
fn square_converges() {
    let (_, three) = refine_curve(&unit_square(), CurveRefineOptions::new(3, true));
    let (_, four) = refine_curve(&unit_square(), CurveRefineOptions::new(4, true));
    let (_, five) = refine_curve(&unit_square(), CurveRefineOptions::new(5, true));

    assert!(four.max_displacement < three.max_displacement);
    assert!(four.max_displacement < 5e-3, "{}", four.max_displacement);
    assert!(five.has_converged(Tolerance::CONVERGENCE.eps));

    // Corner cutting only ever shortens the polygon.
    assert!((five.input_length - 4.0).abs() < 1e-12);
    assert!(five.output_length < five.input_length);
}

#[test]
fn non_finite_points_are_rejected() {
    let points = [[0.0, 0.0, 0.0], [f64::NAN, 0.0, 0.0]];
    assert_eq!(
        try_refine_curve(&points, CurveRefineOptions::default()),
        Err(CurveError::NonFinitePoint { index: 1 })
    );
}
