mod core;
mod curve;
mod diagnostics;
mod mesh;
mod metrics;
mod subdivision;
mod topology;
mod weld;

pub use core::{BBox, Point3, Tolerance, Vec3, sum_of, weighted_sum};
pub use curve::{
    CurveError, CurveRefineDiagnostics, CurveRefineOptions, chaikin_refine_once,
    polyline_length, refine_curve, try_refine_curve,
};
pub use diagnostics::GeomMeshDiagnostics;
pub use mesh::{
    GeomMesh, IndexFormat, MeshValidationError, U16_INDEX_LIMIT, compute_vertex_normals,
};
pub use metrics::{GeomMetrics, GeomTimingReport, TimingBucket};
pub use subdivision::{
    LoopSubdivisionDiagnostics, LoopSubdivisionOptions, RECOMMENDED_MAX_ITERATIONS,
    SubdivisionError, loop_alpha, loop_subdivide, subdivide_once,
};
pub use topology::{EdgeKey, EdgeRecord, EdgeTopology};
pub use weld::{WeldDiagnostics, WeldError, WeldedBuffers, weld_mesh, weld_mesh_vertices};

#[cfg(test)]
mod tests;
