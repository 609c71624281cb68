//! Mesh diagnostics.
//!
//! [`GeomMeshDiagnostics`] summarizes the topology of a mesh after welding
//! or subdivision: counts, open and non-manifold edges, degenerate
//! triangles, warnings and optional timing.
//!
//! # Example
//!
//! ```ignore
//! use subd_engine::geom::{loop_subdivide, GeomMeshDiagnostics, LoopSubdivisionOptions};
//!
//! let (mesh, diag) = loop_subdivide(&input, LoopSubdivisionOptions::default())?;
//! let summary = diag.to_mesh_diagnostics(&mesh);
//!
//! if summary.is_watertight() {
//!     println!("closed surface with {} triangles", summary.triangle_count);
//! } else {
//!     println!("{} open edges", summary.open_edge_count);
//! }
//! ```

use std::fmt;

use super::core::{Point3, Tolerance};
use super::mesh::{GeomMesh, IndexFormat};
use super::topology::EdgeTopology;

/// Topology and quality report for a triangle mesh.
///
/// - `open_edge_count`: edges with only one adjacent triangle
/// - `non_manifold_edge_count`: edges with more than two adjacent triangles
/// - `degenerate_triangle_count`: zero-area or collapsed triangles (kept, only counted)
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeomMeshDiagnostics {
    /// Total number of vertices in the mesh.
    pub vertex_count: usize,

    /// Total number of triangles in the mesh.
    pub triangle_count: usize,

    /// Number of unique undirected edges.
    pub edge_count: usize,

    /// Number of vertices merged during welding.
    ///
    /// A high value relative to `vertex_count` may indicate overlapping geometry
    /// or a tolerance that is too loose.
    pub welded_vertex_count: usize,

    /// Number of zero-area triangles.
    pub degenerate_triangle_count: usize,

    /// Number of open (boundary) edges.
    ///
    /// A closed surface has zero open edges, and stays closed under Loop
    /// subdivision.
    pub open_edge_count: usize,

    /// Number of edges referenced by more than two triangles.
    pub non_manifold_edge_count: usize,

    /// Index width the mesh needs.
    pub index_format: Option<IndexFormat>,

    /// Only populated when the `mesh_engine_metrics` feature is enabled
    /// and the target is not WASM.
    pub timing: Option<super::metrics::GeomTimingReport>,

    /// Human-readable warnings about the mesh or the operation that built it.
    pub warnings: Vec<String>,
}

impl GeomMeshDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes counts and topology issues of `mesh`.
    ///
    /// Triangles that reference out-of-range vertices are neither measured
    /// for area nor treated as degenerate.
    #[must_use]
    pub fn from_mesh(mesh: &GeomMesh) -> Self {
        let topo = EdgeTopology::build(&mesh.indices, mesh.vertex_count());
        let mut diag = Self {
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangle_count(),
            edge_count: topo.edge_count(),
            degenerate_triangle_count: count_degenerate_triangles(mesh, Tolerance::ZERO_LENGTH),
            open_edge_count: topo.boundary_edge_count(),
            non_manifold_edge_count: topo.non_manifold_edge_count(),
            index_format: Some(mesh.index_format()),
            ..Self::default()
        };
        if diag.non_manifold_edge_count > 0 {
            diag.add_warning(format!(
                "mesh has {} non-manifold edges",
                diag.non_manifold_edge_count
            ));
        }
        diag
    }

    /// Returns `true` if the mesh has no open edges.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.open_edge_count == 0
    }

    /// Returns `true` if no edge is shared by more than two triangles.
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    #[must_use]
    pub fn is_valid_solid(&self) -> bool {
        self.is_watertight() && self.is_manifold()
    }

    /// Returns `true` if no issues were detected and no warnings recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.open_edge_count == 0
            && self.non_manifold_edge_count == 0
            && self.degenerate_triangle_count == 0
            && self.warnings.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Returns the total number of topology issues (open + non-manifold edges).
    #[must_use]
    pub fn topology_issue_count(&self) -> usize {
        self.open_edge_count + self.non_manifold_edge_count
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Merges another diagnostics struct into this one.
    ///
    /// Counts are summed and warnings appended. `timing` and `index_format`
    /// of `other` are ignored.
    pub fn merge(&mut self, other: &Self) {
        self.vertex_count += other.vertex_count;
        self.triangle_count += other.triangle_count;
        self.edge_count += other.edge_count;
        self.welded_vertex_count += other.welded_vertex_count;
        self.degenerate_triangle_count += other.degenerate_triangle_count;
        self.open_edge_count += other.open_edge_count;
        self.non_manifold_edge_count += other.non_manifold_edge_count;
        self.warnings.extend(other.warnings.iter().cloned());
    }

    /// Returns a short summary string suitable for logging.
    ///
    /// Format: `"V:{vertices} T:{triangles} E:{edges} [issues...]"`
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "V:{} T:{} E:{}",
            self.vertex_count, self.triangle_count, self.edge_count
        )];

        if self.welded_vertex_count > 0 {
            parts.push(format!("welded:{}", self.welded_vertex_count));
        }
        if self.degenerate_triangle_count > 0 {
            parts.push(format!("degenerate:{}", self.degenerate_triangle_count));
        }
        if self.open_edge_count > 0 {
            parts.push(format!("open:{}", self.open_edge_count));
        }
        if self.non_manifold_edge_count > 0 {
            parts.push(format!("non-manifold:{}", self.non_manifold_edge_count));
        }

        parts.join(" ")
    }
}

impl fmt::Display for GeomMeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mesh Diagnostics:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;
        writeln!(f, "  Edges: {}", self.edge_count)?;

        if let Some(format) = self.index_format {
            writeln!(f, "  Index format: {format:?}")?;
        }
        if self.welded_vertex_count > 0 {
            writeln!(f, "  Welded vertices: {}", self.welded_vertex_count)?;
        }

        if self.open_edge_count > 0
            || self.non_manifold_edge_count > 0
            || self.degenerate_triangle_count > 0
        {
            writeln!(f, "  Topology issues:")?;
            if self.open_edge_count > 0 {
                writeln!(f, "    - Open edges: {}", self.open_edge_count)?;
            }
            if self.non_manifold_edge_count > 0 {
                writeln!(f, "    - Non-manifold edges: {}", self.non_manifold_edge_count)?;
            }
            if self.degenerate_triangle_count > 0 {
                writeln!(f, "    - Degenerate triangles: {}", self.degenerate_triangle_count)?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {warning}")?;
            }
        }

        if let Some(ref timing) = self.timing {
            writeln!(f, "  Timing: {} ms total", timing.total_ms())?;
        }

        let status = if self.is_clean() {
            "CLEAN"
        } else if self.is_valid_solid() {
            "CLOSED"
        } else {
            "ISSUES DETECTED"
        };
        writeln!(f, "  Status: {status}")?;

        Ok(())
    }
}

fn count_degenerate_triangles(mesh: &GeomMesh, tol: Tolerance) -> usize {
    mesh.triangles()
        .filter(|&[a, b, c]| {
            let (Some(pa), Some(pb), Some(pc)) = (
                mesh.positions.get(a as usize),
                mesh.positions.get(b as usize),
                mesh.positions.get(c as usize),
            ) else {
                return false;
            };
            let a = Point3::from_array(*pa);
            let twice_area = (Point3::from_array(*pb) - a)
                .cross(Point3::from_array(*pc) - a)
                .length();
            twice_area <= tol.eps
        })
        .count()
}
