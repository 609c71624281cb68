//! Loop subdivision of indexed triangle meshes.
//!
//! One pass splits every triangle into four: each original vertex is
//! repositioned by a weighted average of its 1-ring, one new vertex is
//! inserted per edge, and the corner/midpoint sextuple is re-stitched into
//! four triangles. Boundaries use the curve masks so open meshes keep their
//! outline instead of shrinking into the interior.
//!
//! Output layout is fixed: repositioned originals keep their indices
//! `0..V`, edge points follow in edge registration order, so a pass maps
//! `V` vertices and `E` edges to `V + E` vertices and `T` triangles to `4T`.
//!
//! # Example
//! ```ignore
//! use subd_engine::geom::{loop_subdivide, GeomMesh, LoopSubdivisionOptions};
//!
//! let mesh = GeomMesh::new(
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     vec![0, 1, 2],
//! );
//! let (smooth, diag) = loop_subdivide(&mesh, LoopSubdivisionOptions::new(2))?;
//! assert_eq!(smooth.triangle_count(), 16);
//! ```

use std::collections::BTreeSet;

use super::core::{Tolerance, sum_of, weighted_sum};
use super::diagnostics::GeomMeshDiagnostics;
use super::mesh::{GeomMesh, IndexFormat, MeshValidationError};
use super::metrics::{GeomMetrics, GeomTimingReport, TimingBucket};
use super::topology::{EdgeRecord, EdgeTopology};
use super::weld::{WeldError, weld_mesh};

/// Iteration count above which the output size is flagged in diagnostics.
///
/// Every pass multiplies the triangle count by four.
pub const RECOMMENDED_MAX_ITERATIONS: usize = 6;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur during Loop subdivision.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubdivisionError {
    #[error(transparent)]
    InvalidMesh(#[from] MeshValidationError),

    #[error(transparent)]
    Weld(#[from] WeldError),

    /// The refined mesh would have more vertices than a `u32` index addresses.
    #[error("subdivided mesh would need {vertex_count} vertices, more than a u32 index can address")]
    TooManyVertices { vertex_count: usize },
}

// ============================================================================
// Options and diagnostics
// ============================================================================

/// Options for [`loop_subdivide`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoopSubdivisionOptions {
    /// Number of subdivision passes. Zero leaves the (welded) mesh as is.
    pub iterations: usize,
    /// Grid cell size for the single weld before the first pass; `None`
    /// skips welding.
    pub weld_tolerance: Option<f64>,
    /// Recompute area-weighted vertex normals on the final mesh.
    pub recompute_normals: bool,
}

impl Default for LoopSubdivisionOptions {
    fn default() -> Self {
        Self::new(1)
    }
}

impl LoopSubdivisionOptions {
    #[must_use]
    pub const fn new(iterations: usize) -> Self {
        Self {
            iterations,
            weld_tolerance: Some(Tolerance::WELD.eps),
            recompute_normals: true,
        }
    }

    #[must_use]
    pub const fn with_weld_tolerance(mut self, weld_tolerance: Option<f64>) -> Self {
        self.weld_tolerance = weld_tolerance;
        self
    }

    #[must_use]
    pub const fn with_recompute_normals(mut self, recompute_normals: bool) -> Self {
        self.recompute_normals = recompute_normals;
        self
    }
}

/// Diagnostics from [`loop_subdivide`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoopSubdivisionDiagnostics {
    pub input_vertex_count: usize,
    pub input_triangle_count: usize,
    pub output_vertex_count: usize,
    pub output_triangle_count: usize,
    /// Vertices merged by the weld before the first pass.
    pub welded_vertex_count: usize,
    pub iterations_applied: usize,
    /// Boundary edges of the mesh fed into the last pass.
    pub boundary_edge_count: usize,
    /// Interior edges of the mesh fed into the last pass.
    pub interior_edge_count: usize,
    /// Edge references beyond the second triangle, summed over all passes.
    pub ignored_edge_registrations: usize,
    /// Interior vertices left in place because their valence was below 3,
    /// summed over all passes.
    pub low_valence_vertex_count: usize,
    pub index_format: Option<IndexFormat>,
    /// Only populated with the `mesh_engine_metrics` feature on non-WASM targets.
    pub timing: Option<GeomTimingReport>,
    pub warnings: Vec<String>,
}

impl LoopSubdivisionDiagnostics {
    /// Topology report of `mesh` (normally the mesh this run produced),
    /// carrying over the weld count, warnings and timing.
    #[must_use]
    pub fn to_mesh_diagnostics(&self, mesh: &GeomMesh) -> GeomMeshDiagnostics {
        let mut diag = GeomMeshDiagnostics::from_mesh(mesh);
        diag.welded_vertex_count = self.welded_vertex_count;
        diag.timing = self.timing.clone();
        diag.warnings.extend(self.warnings.iter().cloned());
        diag
    }
}

// ============================================================================
// Masks
// ============================================================================

/// Loop's vertex weight `alpha(n)` for an interior vertex of valence `n`.
///
/// `(1/n) * (5/8 - (3/8 + 1/4 * cos(2π/n))²)`, with `n == 3` pinned to the
/// exact `3/16` and `n == 0` mapped to zero.
#[must_use]
pub fn loop_alpha(valence: usize) -> f64 {
    match valence {
        0 => 0.0,
        3 => 3.0 / 16.0,
        n => {
            let n = n as f64;
            let term = 3.0 / 8.0 + 0.25 * (std::f64::consts::TAU / n).cos();
            (1.0 / n) * (5.0 / 8.0 - term * term)
        }
    }
}

/// How an original vertex moves during a pass.
#[derive(Debug, Clone, Copy)]
enum VertexRule<'a> {
    /// Boundary vertex without two boundary neighbors.
    Keep,
    /// Interior vertex with valence below 3.
    LowValence,
    Boundary { n0: u32, n1: u32 },
    Interior { alpha: f64, ring: &'a BTreeSet<u32> },
}

fn classify(topo: &EdgeTopology, v: u32) -> VertexRule<'_> {
    if topo.is_boundary_vertex(v) {
        // A well-formed boundary vertex has exactly two; extra ones past the
        // first two in edge order are not used.
        return match topo.boundary_neighbors(v) {
            [n0, n1, ..] => VertexRule::Boundary { n0: *n0, n1: *n1 },
            _ => VertexRule::Keep,
        };
    }
    match topo.neighbors(v) {
        Some(ring) if ring.len() >= 3 => VertexRule::Interior {
            alpha: loop_alpha(ring.len()),
            ring,
        },
        _ => VertexRule::LowValence,
    }
}

fn vertex_point<const N: usize>(values: &[[f64; N]], v: usize, rule: VertexRule<'_>) -> [f64; N] {
    let value = values[v];
    match rule {
        VertexRule::Keep | VertexRule::LowValence => value,
        VertexRule::Boundary { n0, n1 } => weighted_sum(&[
            (0.75, value),
            (0.125, values[n0 as usize]),
            (0.125, values[n1 as usize]),
        ]),
        VertexRule::Interior { alpha, ring } => {
            let n = ring.len() as f64;
            let ring_sum = sum_of(ring.iter().map(|&nb| values[nb as usize]));
            weighted_sum(&[(1.0 - n * alpha, value), (alpha, ring_sum)])
        }
    }
}

fn edge_point<const N: usize>(values: &[[f64; N]], edge: &EdgeRecord) -> [f64; N] {
    let a = values[edge.v0 as usize];
    let b = values[edge.v1 as usize];
    match edge.opposite1 {
        None => weighted_sum(&[(0.5, a), (0.5, b)]),
        Some(right) => weighted_sum(&[
            (0.375, a),
            (0.375, b),
            (0.125, values[edge.opposite0 as usize]),
            (0.125, values[right as usize]),
        ]),
    }
}

/// Applies both masks to one per-vertex attribute (positions or UVs).
fn refine_attribute<const N: usize>(
    values: &[[f64; N]],
    rules: &[VertexRule<'_>],
    topo: &EdgeTopology,
) -> Vec<[f64; N]> {
    let mut out = Vec::with_capacity(rules.len() + topo.edge_count());
    out.extend(
        rules
            .iter()
            .enumerate()
            .map(|(v, rule)| vertex_point(values, v, *rule)),
    );
    out.extend(topo.edges().iter().map(|edge| edge_point(values, edge)));
    out
}

// ============================================================================
// Passes
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct PassStats {
    boundary_edges: usize,
    interior_edges: usize,
    ignored_registrations: usize,
    low_valence_vertices: usize,
}

/// One pass over an already validated mesh. Normals are left unset.
fn subdivide_pass(
    mesh: &GeomMesh,
    metrics: &mut GeomMetrics,
) -> Result<(GeomMesh, PassStats), SubdivisionError> {
    let vertex_count = mesh.vertex_count();
    let mut topo = metrics.time(TimingBucket::Topology, || {
        EdgeTopology::build(&mesh.indices, vertex_count)
    });

    let total = vertex_count + topo.edge_count();
    if u32::try_from(total).is_err() {
        return Err(SubdivisionError::TooManyVertices {
            vertex_count: total,
        });
    }
    // Both fit: total did.
    topo.assign_midpoint_indices(vertex_count as u32);

    let stats = PassStats {
        boundary_edges: topo.boundary_edge_count(),
        interior_edges: topo.interior_edge_count(),
        ignored_registrations: topo.ignored_registrations(),
        low_valence_vertices: 0,
    };

    let (out, low_valence_vertices) = metrics.time(TimingBucket::Subdivision, || {
        let rules: Vec<VertexRule<'_>> = (0..vertex_count as u32)
            .map(|v| classify(&topo, v))
            .collect();
        let low_valence = rules
            .iter()
            .filter(|rule| matches!(rule, VertexRule::LowValence))
            .count();

        let positions = refine_attribute(&mesh.positions, &rules, &topo);
        let uvs = mesh
            .uvs
            .as_deref()
            .map(|uvs| refine_attribute(uvs, &rules, &topo));

        let mut indices = Vec::with_capacity(mesh.indices.len() * 4);
        for [x1, x2, x3] in mesh.triangles() {
            let midpoints = (
                topo.midpoint_index(x1, x2),
                topo.midpoint_index(x2, x3),
                topo.midpoint_index(x3, x1),
            );
            // Every triangle side was registered while building `topo`.
            debug_assert!(
                matches!(midpoints, (Some(_), Some(_), Some(_))),
                "triangle ({x1}, {x2}, {x3}) has a side without a midpoint"
            );
            let (Some(x12), Some(x23), Some(x31)) = midpoints else {
                continue;
            };
            indices.extend_from_slice(&[
                x1, x12, x31, //
                x2, x23, x12, //
                x3, x31, x23, //
                x12, x23, x31,
            ]);
        }

        let out = GeomMesh {
            positions,
            indices,
            uvs,
            normals: None,
        };
        (out, low_valence)
    });

    Ok((
        out,
        PassStats {
            low_valence_vertices,
            ..stats
        },
    ))
}

/// Applies a single Loop subdivision pass to `mesh`.
///
/// No welding happens here; split vertices are treated as separate
/// boundary vertices. Normals are recomputed when the input carries them.
///
/// # Errors
/// Returns [`SubdivisionError::InvalidMesh`] if `mesh` breaks the
/// triangle-list contract and [`SubdivisionError::TooManyVertices`] if the
/// result would outgrow 32-bit indices.
pub fn subdivide_once(mesh: &GeomMesh) -> Result<GeomMesh, SubdivisionError> {
    mesh.validate()?;
    let mut metrics = GeomMetrics::default();
    let (mut out, _) = subdivide_pass(mesh, &mut metrics)?;
    if mesh.normals.is_some() {
        out.recompute_normals();
    }
    Ok(out)
}

/// Welds `mesh` once and applies `options.iterations` Loop passes.
///
/// Each pass rebuilds topology from the previous output. With zero
/// iterations the result is the welded input.
///
/// # Errors
/// Fails before producing any output if the mesh is invalid or the weld
/// tolerance is unusable, or during a pass if the vertex count outgrows
/// 32-bit indices.
pub fn loop_subdivide(
    mesh: &GeomMesh,
    options: LoopSubdivisionOptions,
) -> Result<(GeomMesh, LoopSubdivisionDiagnostics), SubdivisionError> {
    mesh.validate()?;

    let mut metrics = GeomMetrics::default();
    metrics.begin();

    let mut diagnostics = LoopSubdivisionDiagnostics {
        input_vertex_count: mesh.vertex_count(),
        input_triangle_count: mesh.triangle_count(),
        ..Default::default()
    };

    let mut current = match options.weld_tolerance {
        Some(tolerance) => {
            let (welded, weld_diag) =
                metrics.time(TimingBucket::Welding, || weld_mesh(mesh, tolerance))?;
            diagnostics.welded_vertex_count = weld_diag.welded_vertex_count;
            if weld_diag.discarded_uv_count > 0 {
                diagnostics.warnings.push(format!(
                    "welding discarded {} differing UVs",
                    weld_diag.discarded_uv_count
                ));
            }
            welded
        }
        None => mesh.clone(),
    };
    current.normals = None;

    if options.iterations > RECOMMENDED_MAX_ITERATIONS {
        log::warn!(
            "loop subdivision: {} iterations multiply the triangle count by 4^{}",
            options.iterations,
            options.iterations
        );
        diagnostics.warnings.push(format!(
            "{} iterations exceeds the recommended maximum of {RECOMMENDED_MAX_ITERATIONS}",
            options.iterations
        ));
    }

    for pass in 0..options.iterations {
        let (next, stats) = subdivide_pass(&current, &mut metrics)?;
        log::debug!(
            "loop subdivision pass {}: V {} -> {}, T {} -> {} ({} boundary / {} interior edges)",
            pass + 1,
            current.vertex_count(),
            next.vertex_count(),
            current.triangle_count(),
            next.triangle_count(),
            stats.boundary_edges,
            stats.interior_edges
        );
        diagnostics.boundary_edge_count = stats.boundary_edges;
        diagnostics.interior_edge_count = stats.interior_edges;
        diagnostics.ignored_edge_registrations += stats.ignored_registrations;
        diagnostics.low_valence_vertex_count += stats.low_valence_vertices;
        diagnostics.iterations_applied += 1;
        current = next;
    }

    if diagnostics.ignored_edge_registrations > 0 {
        diagnostics.warnings.push(format!(
            "{} edge references beyond two triangles were ignored (non-manifold input)",
            diagnostics.ignored_edge_registrations
        ));
    }
    if diagnostics.low_valence_vertex_count > 0 {
        diagnostics.warnings.push(format!(
            "{} interior vertices with valence below 3 were left in place",
            diagnostics.low_valence_vertex_count
        ));
    }

    if options.recompute_normals {
        metrics.time(TimingBucket::Normals, || current.recompute_normals());
    }

    diagnostics.output_vertex_count = current.vertex_count();
    diagnostics.output_triangle_count = current.triangle_count();
    diagnostics.index_format = Some(current.index_format());
    diagnostics.timing = metrics.end();

    Ok((current, diagnostics))
}

// ============================================================================
// Tests
// ============================================================================
