//! Tolerance-based vertex welding.
//!
//! Positions are snapped to an integer grid whose cell size is the weld
//! tolerance (`round(component / tolerance)`). Every vertex that lands in an
//! already-occupied cell is collapsed onto the first vertex that claimed it,
//! and the index buffer is rewritten through the resulting remap table.
//!
//! Welding runs once before subdivision so that meshes exported with split
//! vertices (one copy per face corner) regain the shared topology that Loop
//! subdivision needs to tell interior edges from boundary edges.
//!
//! # Example
//!
//! ```ignore
//! use subd_engine::geom::{weld_mesh, GeomMesh};
//!
//! let (welded, diag) = weld_mesh(&mesh, 1e-6)?;
//! assert_eq!(diag.welded_vertex_count, mesh.vertex_count() - welded.vertex_count());
//! ```

use std::collections::HashMap;

use super::core::Tolerance;
use super::mesh::{GeomMesh, IndexFormat, MeshValidationError};

/// Errors that can occur while welding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeldError {
    /// The grid cell size is zero, negative or not finite.
    #[error("weld tolerance must be finite and greater than zero, got {tolerance}")]
    InvalidTolerance { tolerance: f64 },

    /// A coordinate lies too many cells away from the origin to get a grid key.
    #[error("vertex {index} is out of range for weld tolerance {tolerance}")]
    CoordinateOutOfRange { index: usize, tolerance: f64 },

    #[error(transparent)]
    InvalidMesh(#[from] MeshValidationError),
}

/// Diagnostics for a weld pass.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WeldDiagnostics {
    /// Number of input vertices.
    pub input_vertex_count: usize,
    /// Number of vertices after merging.
    pub output_vertex_count: usize,
    /// Number of input vertices that were merged into an earlier one.
    pub welded_vertex_count: usize,
    /// Merged vertices whose UV differed from the UV that was kept.
    ///
    /// The first-seen UV of a cluster wins, so a non-zero count means UV seam
    /// information was dropped.
    pub discarded_uv_count: usize,
    /// Index width selected for the welded mesh.
    pub index_format: Option<IndexFormat>,
}

/// Output of [`weld_mesh_vertices`]: positions, UVs, remapped indices and
/// the number of merged vertices.
pub type WeldedBuffers = (Vec<[f64; 3]>, Option<Vec<[f64; 2]>>, Vec<u32>, usize);

/// Cell indices must stay strictly below this magnitude to fit an `i64`.
const CELL_LIMIT: f64 = i64::MAX as f64;

/// Quantize a coordinate value to a grid cell index.
///
/// Returns `None` when the cell index does not fit an `i64`; `as` would
/// saturate and fold distant vertices into the same cell.
fn quantize(value: f64, cell: f64) -> Option<i64> {
    let q = (value / cell).round();
    (q.abs() < CELL_LIMIT).then(|| q as i64)
}

fn grid_key(p: [f64; 3], cell: f64) -> Option<(i64, i64, i64)> {
    Some((
        quantize(p[0], cell)?,
        quantize(p[1], cell)?,
        quantize(p[2], cell)?,
    ))
}

/// Welds raw vertex buffers.
///
/// Indices that fall outside `points` are passed through unchanged; callers
/// that need the contract enforced should go through [`weld_mesh`], which
/// validates first.
///
/// # Errors
/// Returns [`WeldError::InvalidTolerance`] if `tol` is not a usable cell size
/// and [`WeldError::CoordinateOutOfRange`] for the first vertex whose grid
/// cell cannot be represented.
pub fn weld_mesh_vertices(
    points: &[[f64; 3]],
    uvs: Option<&[[f64; 2]]>,
    indices: &[u32],
    tol: Tolerance,
) -> Result<WeldedBuffers, WeldError> {
    if !tol.is_valid() {
        return Err(WeldError::InvalidTolerance { tolerance: tol.eps });
    }

    let mut cells: HashMap<(i64, i64, i64), u32> = HashMap::with_capacity(points.len());
    let mut remap: Vec<u32> = Vec::with_capacity(points.len());
    let mut out_points: Vec<[f64; 3]> = Vec::with_capacity(points.len());
    let mut out_uvs: Option<Vec<[f64; 2]>> = uvs.map(|_| Vec::with_capacity(points.len()));

    for (i, p) in points.iter().copied().enumerate() {
        let key = grid_key(p, tol.eps).ok_or(WeldError::CoordinateOutOfRange {
            index: i,
            tolerance: tol.eps,
        })?;
        let out_idx = *cells.entry(key).or_insert_with(|| {
            let new_idx = out_points.len() as u32;
            out_points.push(p);
            if let (Some(src), Some(dst)) = (uvs, out_uvs.as_mut()) {
                dst.push(src.get(i).copied().unwrap_or([0.0, 0.0]));
            }
            new_idx
        });
        remap.push(out_idx);
    }

    let out_indices = indices
        .iter()
        .map(|&idx| remap.get(idx as usize).copied().unwrap_or(idx))
        .collect();

    let welded = points.len() - out_points.len();
    Ok((out_points, out_uvs, out_indices, welded))
}

/// Welds coincident vertices of `mesh` using a grid of cell size `tolerance`.
///
/// The first vertex seen in a cell survives together with its UV. Normals,
/// when the input carries them, are recomputed for the welded topology.
/// An empty mesh welds to an empty mesh.
///
/// # Errors
/// Fails fast on a non-positive or non-finite tolerance, on any
/// [`MeshValidationError`] and on coordinates too far from the origin for
/// the chosen tolerance.
pub fn weld_mesh(mesh: &GeomMesh, tolerance: f64) -> Result<(GeomMesh, WeldDiagnostics), WeldError> {
    let tol = Tolerance::new(tolerance);
    if !tol.is_valid() {
        return Err(WeldError::InvalidTolerance { tolerance });
    }
    mesh.validate()?;

    let (positions, uvs, indices, welded) =
        weld_mesh_vertices(&mesh.positions, mesh.uvs.as_deref(), &mesh.indices, tol)?;

    let discarded_uv_count = match (mesh.uvs.as_deref(), uvs.as_deref()) {
        (Some(src), Some(kept)) => count_discarded_uvs(&mesh.positions, src, &positions, kept, tol),
        _ => 0,
    };
    if discarded_uv_count > 0 {
        log::debug!(
            "weld: {discarded_uv_count} merged vertices carried a UV different from the kept one"
        );
    }

    let mut out = GeomMesh {
        positions,
        indices,
        uvs,
        normals: None,
    };
    if mesh.normals.is_some() {
        out.recompute_normals();
    }

    let diagnostics = WeldDiagnostics {
        input_vertex_count: mesh.vertex_count(),
        output_vertex_count: out.vertex_count(),
        welded_vertex_count: welded,
        discarded_uv_count,
        index_format: Some(out.index_format()),
    };

    log::trace!(
        "weld: {} -> {} vertices (tolerance {tolerance:e})",
        diagnostics.input_vertex_count,
        diagnostics.output_vertex_count
    );

    Ok((out, diagnostics))
}

fn count_discarded_uvs(
    src_positions: &[[f64; 3]],
    src_uvs: &[[f64; 2]],
    kept_positions: &[[f64; 3]],
    kept_uvs: &[[f64; 2]],
    tol: Tolerance,
) -> usize {
    let lookup: HashMap<(i64, i64, i64), usize> = kept_positions
        .iter()
        .enumerate()
        .filter_map(|(i, p)| grid_key(*p, tol.eps).map(|key| (key, i)))
        .collect();

    src_positions
        .iter()
        .zip(src_uvs)
        .filter(|(p, uv)| {
            grid_key(**p, tol.eps)
                .and_then(|key| lookup.get(&key))
                .and_then(|&kept| kept_uvs.get(kept))
                .is_some_and(|kept_uv| kept_uv != *uv)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_rounds_to_nearest_cell() {
        assert_eq!(quantize(0.4e-6, 1e-6), Some(0));
        assert_eq!(quantize(0.6e-6, 1e-6), Some(1));
        assert_eq!(quantize(-0.6e-6, 1e-6), Some(-1));
        assert_eq!(quantize(1e13, 1e-6), None);
        assert_eq!(quantize(-1e13, 1e-6), None);
    }

    #[test]
    fn test_weld_rejects_coordinates_beyond_the_grid() {
        let mesh = GeomMesh::new(
            vec![[1e13, 0.0, 0.0], [1e13 + 1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2],
        );
        assert_eq!(
            weld_mesh(&mesh, 1e-6).unwrap_err(),
            WeldError::CoordinateOutOfRange {
                index: 0,
                tolerance: 1e-6
            }
        );

        // A coarser grid keeps the two far vertices apart.
        let (welded, diag) = weld_mesh(&mesh, 1e-3).unwrap();
        assert_eq!(welded.vertex_count(), 3);
        assert_eq!(diag.welded_vertex_count, 0);
    }

    #[test]
    fn test_weld_rejects_bad_tolerance() {
        let mesh = GeomMesh::new(vec![[0.0, 0.0, 0.0]; 3], vec![0, 1, 2]);
        for tolerance in [0.0, -1e-6, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                weld_mesh(&mesh, tolerance),
                Err(WeldError::InvalidTolerance { .. })
            ));
        }
    }

    #[test]
    fn test_weld_empty_mesh() {
        let (welded, diag) = weld_mesh(&GeomMesh::default(), 1e-6).unwrap();
        assert!(welded.is_empty());
        assert_eq!(diag.welded_vertex_count, 0);
        assert_eq!(diag.index_format, Some(IndexFormat::U16));
    }
}
