#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Loop subdivision for indexed triangle meshes and Chaikin refinement for
//! polylines.
//!
//! The mesh pipeline welds coincident vertices once, then applies Loop
//! passes that each quadruple the triangle count while smoothing the surface
//! towards its limit:
//!
//! ```ignore
//! use subd_engine::{GeomMesh, LoopSubdivisionOptions, loop_subdivide};
//!
//! let mesh = GeomMesh::new(positions, indices);
//! let (smooth, diagnostics) = loop_subdivide(&mesh, LoopSubdivisionOptions::new(2))?;
//! log::info!("{}", diagnostics.to_mesh_diagnostics(&smooth).summary());
//! ```
//!
//! All operations are pure: inputs are borrowed, outputs are new values, and
//! no state survives between calls.

pub mod geom;

pub use geom::{
    CurveError, CurveRefineDiagnostics, CurveRefineOptions, GeomMesh, GeomMeshDiagnostics,
    IndexFormat, LoopSubdivisionDiagnostics, LoopSubdivisionOptions, MeshValidationError,
    SubdivisionError, WeldDiagnostics, WeldError, chaikin_refine_once, loop_subdivide,
    refine_curve, subdivide_once, try_refine_curve, weld_mesh,
};
