//! Chaikin corner-cutting refinement of polylines.
//!
//! Every pass replaces each segment `p_i → p_{i+1}` with the two points at
//! its quarter and three-quarter marks. Repeated passes converge to the
//! uniform quadratic B-spline of the control polygon. Closed polygons wrap
//! around and drop their original vertices; open polylines keep both
//! endpoints.

use super::core::{Point3, weighted_sum};
use super::metrics::{GeomMetrics, GeomTimingReport, TimingBucket};

/// Errors from [`try_refine_curve`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    #[error("curve refinement needs at least 2 points, got {count}")]
    InsufficientPoints { count: usize },

    #[error("curve point {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },
}

/// Options for [`refine_curve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CurveRefineOptions {
    /// Number of corner-cutting passes. Zero returns the input unchanged.
    pub iterations: usize,
    /// Treat the last point as connected back to the first.
    pub closed: bool,
}

impl Default for CurveRefineOptions {
    fn default() -> Self {
        Self::new(3, true)
    }
}

impl CurveRefineOptions {
    #[must_use]
    pub const fn new(iterations: usize, closed: bool) -> Self {
        Self { iterations, closed }
    }

    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub const fn with_closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }
}

/// Diagnostics from [`refine_curve`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CurveRefineDiagnostics {
    pub input_point_count: usize,
    pub output_point_count: usize,
    pub iterations_applied: usize,
    pub closed: bool,
    /// Polygon length before refinement.
    pub input_length: f64,
    /// Polygon length after refinement. Corner cutting never lengthens a
    /// polygon.
    pub output_length: f64,
    /// How far the last pass moved the curve: the largest distance from a
    /// vertex of the previous polygon to the chord that cut it off.
    ///
    /// Shrinks by roughly a factor of four per pass; zero when no pass ran.
    pub max_displacement: f64,
    /// Only populated with the `mesh_engine_metrics` feature on non-WASM targets.
    pub timing: Option<GeomTimingReport>,
    pub warnings: Vec<String>,
}

impl CurveRefineDiagnostics {
    /// `true` once the last pass moved no vertex by more than `tolerance`.
    #[must_use]
    pub fn has_converged(&self, tolerance: f64) -> bool {
        self.iterations_applied > 0 && self.max_displacement < tolerance
    }

    fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

fn quarter_points(a: [f64; 3], b: [f64; 3]) -> ([f64; 3], [f64; 3]) {
    (
        weighted_sum(&[(0.75, a), (0.25, b)]),
        weighted_sum(&[(0.25, a), (0.75, b)]),
    )
}

/// One Chaikin pass.
///
/// Returns `2n` points for a closed polygon and `2(n - 1) + 2` for an open
/// polyline, or an empty vector when `points` has fewer than two entries.
#[must_use]
pub fn chaikin_refine_once(points: &[[f64; 3]], closed: bool) -> Vec<[f64; 3]> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(2 * n);
    if closed {
        for i in 0..n {
            let (q, r) = quarter_points(points[i], points[(i + 1) % n]);
            out.push(q);
            out.push(r);
        }
    } else {
        out.push(points[0]);
        for pair in points.windows(2) {
            let (q, r) = quarter_points(pair[0], pair[1]);
            out.push(q);
            out.push(r);
        }
        out.push(points[n - 1]);
    }
    out
}

/// Length of the polygon through `points`, including the closing segment
/// when `closed`.
#[must_use]
pub fn polyline_length(points: &[[f64; 3]], closed: bool) -> f64 {
    let open: f64 = points
        .windows(2)
        .map(|pair| Point3::from_array(pair[0]).distance_to(Point3::from_array(pair[1])))
        .sum();
    match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 2 => {
            open + Point3::from_array(*last).distance_to(Point3::from_array(*first))
        }
        _ => open,
    }
}

fn distance_to_segment(p: [f64; 3], a: [f64; 3], b: [f64; 3]) -> f64 {
    let p = Point3::from_array(p);
    let a = Point3::from_array(a);
    let b = Point3::from_array(b);
    let ab = b - a;
    let len2 = ab.length_squared();
    let t = if len2 > 0.0 {
        ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p.distance_to(a.lerp(b, t))
}

/// Distance from each vertex of `previous` to the chord that replaced it in
/// `refined = chaikin_refine_once(previous, closed)`; returns the maximum.
fn cut_depth(previous: &[[f64; 3]], refined: &[[f64; 3]], closed: bool) -> f64 {
    let n = previous.len();
    if n < 2 || refined.len() != 2 * n {
        return 0.0;
    }
    let m = refined.len();
    let chord = |i: usize| -> (usize, usize) {
        if closed {
            ((2 * i + m - 1) % m, 2 * i)
        } else {
            (2 * i, 2 * i + 1)
        }
    };
    // Open endpoints are carried over verbatim.
    let cut = if closed { 0..n } else { 1..n - 1 };
    cut.map(|i| {
        let (a, b) = chord(i);
        distance_to_segment(previous[i], refined[a], refined[b])
    })
    .fold(0.0, f64::max)
}

/// Applies `options.iterations` Chaikin passes to `points`.
///
/// Zero iterations returns the input unchanged. Fewer than two points with
/// at least one iteration returns an empty sequence and a warning.
#[must_use]
pub fn refine_curve(
    points: &[[f64; 3]],
    options: CurveRefineOptions,
) -> (Vec<[f64; 3]>, CurveRefineDiagnostics) {
    let mut metrics = GeomMetrics::default();
    metrics.begin();

    let mut diagnostics = CurveRefineDiagnostics {
        input_point_count: points.len(),
        closed: options.closed,
        input_length: polyline_length(points, options.closed),
        ..Default::default()
    };

    if options.iterations > 0 && points.len() < 2 {
        log::warn!(
            "curve refinement skipped: {} control points, at least 2 required",
            points.len()
        );
        diagnostics.add_warning(format!(
            "curve refinement needs at least 2 points, got {}",
            points.len()
        ));
        diagnostics.timing = metrics.end();
        return (Vec::new(), diagnostics);
    }

    let mut current = points.to_vec();
    for _ in 0..options.iterations {
        let next = metrics.time(TimingBucket::CurveRefinement, || {
            chaikin_refine_once(&current, options.closed)
        });
        diagnostics.max_displacement = cut_depth(&current, &next, options.closed);
        diagnostics.iterations_applied += 1;
        current = next;
    }

    diagnostics.output_point_count = current.len();
    diagnostics.output_length = polyline_length(&current, options.closed);
    diagnostics.timing = metrics.end();

    log::debug!(
        "chaikin: {} -> {} points over {} passes (closed: {}, last displacement {:e})",
        diagnostics.input_point_count,
        diagnostics.output_point_count,
        diagnostics.iterations_applied,
        diagnostics.closed,
        diagnostics.max_displacement
    );

    (current, diagnostics)
}

/// Like [`refine_curve`], but reports unusable input as an error instead of
/// an empty result.
///
/// # Errors
/// [`CurveError::InsufficientPoints`] for fewer than two points and
/// [`CurveError::NonFinitePoint`] for NaN or infinite coordinates.
pub fn try_refine_curve(
    points: &[[f64; 3]],
    options: CurveRefineOptions,
) -> Result<(Vec<[f64; 3]>, CurveRefineDiagnostics), CurveError> {
    if points.len() < 2 {
        return Err(CurveError::InsufficientPoints {
            count: points.len(),
        });
    }
    if let Some(index) = points
        .iter()
        .position(|p| !Point3::from_array(*p).is_finite())
    {
        return Err(CurveError::NonFinitePoint { index });
    }
    Ok(refine_curve(points, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_points() {
        let (q, r) = quarter_points([0.0, 0.0, 0.0], [4.0, 0.0, 0.0]);
        assert_eq!(q, [1.0, 0.0, 0.0]);
        assert_eq!(r, [3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_polyline_length() {
        let square = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        assert!((polyline_length(&square, true) - 4.0).abs() < 1e-12);
        assert!((polyline_length(&square, false) - 3.0).abs() < 1e-12);
        assert_eq!(polyline_length(&[], true), 0.0);
    }

    #[test]
    fn test_cut_depth_of_square_corner() {
        let square = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let refined = chaikin_refine_once(&square, true);
        let depth = cut_depth(&square, &refined, true);
        assert!((depth - 0.25 / 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_open_two_points_have_no_cut() {
        let line = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let refined = chaikin_refine_once(&line, false);
        assert_eq!(refined.len(), 4);
        assert_eq!(cut_depth(&line, &refined, false), 0.0);
    }
}
