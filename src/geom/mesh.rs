use super::core::{BBox, Point3, Vec3};

/// Largest vertex count whose every index still fits a 16-bit index buffer.
pub const U16_INDEX_LIMIT: usize = u16::MAX as usize;

/// Width of the index buffer a host should allocate for a mesh.
///
/// Indices are always stored as `u32` inside [`GeomMesh`]; the format is a
/// pure function of the vertex count and tells the host which width it can
/// narrow to. The narrowest width that fits is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    #[must_use]
    pub const fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count <= U16_INDEX_LIMIT {
            Self::U16
        } else {
            Self::U32
        }
    }

    #[must_use]
    pub const fn bytes_per_index(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Errors raised when a mesh violates the indexed-triangle-list contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshValidationError {
    #[error("mesh indices are not a triangle list (len {index_count} % 3 != 0)")]
    NotTriangleList { index_count: usize },

    #[error("mesh index {index} is out of bounds (vertex count {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("mesh {attribute} buffer has {len} entries but the mesh has {vertex_count} vertices")]
    AttributeLengthMismatch {
        attribute: &'static str,
        len: usize,
        vertex_count: usize,
    },

    #[error("mesh vertex {index} has a non-finite coordinate")]
    NonFiniteVertex { index: usize },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
    pub uvs: Option<Vec<[f64; 2]>>,
    /// Per-vertex normals. Recomputed as a finishing step after welding and
    /// subdivision; nothing in the refinement reads them.
    pub normals: Option<Vec<[f64; 3]>>,
}

impl GeomMesh {
    /// Create a new mesh with positions and indices only.
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            uvs: None,
            normals: None,
        }
    }

    /// Create a new mesh with positions, indices and UVs.
    #[must_use]
    pub fn with_uvs(positions: Vec<[f64; 3]>, indices: Vec<u32>, uvs: Vec<[f64; 2]>) -> Self {
        Self {
            positions,
            indices,
            uvs: Some(uvs),
            normals: None,
        }
    }

    /// Create a mesh from a 16-bit index buffer.
    #[must_use]
    pub fn from_u16_indices(positions: Vec<[f64; 3]>, indices: &[u16]) -> Self {
        Self::new(positions, indices.iter().map(|&i| u32::from(i)).collect())
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.indices.is_empty()
    }

    /// Iterate over triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// The index width this mesh needs, derived from its vertex count.
    #[must_use]
    pub fn index_format(&self) -> IndexFormat {
        IndexFormat::for_vertex_count(self.positions.len())
    }

    /// Returns the indices narrowed to 16 bits, or `None` when the mesh
    /// needs a 32-bit index buffer.
    #[must_use]
    pub fn indices_u16(&self) -> Option<Vec<u16>> {
        match self.index_format() {
            IndexFormat::U16 => self
                .indices
                .iter()
                .map(|&i| u16::try_from(i).ok())
                .collect(),
            IndexFormat::U32 => None,
        }
    }

    /// Returns true if indices represent a triangle list.
    #[must_use]
    pub fn has_triangle_indices(&self) -> bool {
        self.indices.len() % 3 == 0
    }

    /// Checks the indexed-triangle-list contract, reporting the first violation.
    ///
    /// # Errors
    /// Returns the first [`MeshValidationError`] found, checked in the order
    /// stride, finite coordinates, index range, attribute lengths.
    pub fn validate(&self) -> Result<(), MeshValidationError> {
        if !self.has_triangle_indices() {
            return Err(MeshValidationError::NotTriangleList {
                index_count: self.indices.len(),
            });
        }
        if let Some(index) = self
            .positions
            .iter()
            .position(|p| !Point3::from_array(*p).is_finite())
        {
            return Err(MeshValidationError::NonFiniteVertex { index });
        }
        let vertex_count = self.positions.len();
        if let Some(&index) = self.indices.iter().find(|&&i| (i as usize) >= vertex_count) {
            return Err(MeshValidationError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        if let Some(uvs) = self.uvs.as_ref().filter(|uvs| uvs.len() != vertex_count) {
            return Err(MeshValidationError::AttributeLengthMismatch {
                attribute: "uv",
                len: uvs.len(),
                vertex_count,
            });
        }
        if let Some(normals) = self
            .normals
            .as_ref()
            .filter(|normals| normals.len() != vertex_count)
        {
            return Err(MeshValidationError::AttributeLengthMismatch {
                attribute: "normal",
                len: normals.len(),
                vertex_count,
            });
        }
        Ok(())
    }

    /// Axis-aligned bounds of the vertex positions, `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<BBox> {
        let points: Vec<Point3> = self.positions.iter().copied().map(Point3::from).collect();
        BBox::from_points(&points)
    }

    /// Replace `normals` with freshly computed area-weighted vertex normals.
    pub fn recompute_normals(&mut self) {
        self.normals = Some(compute_vertex_normals(&self.positions, &self.indices));
    }

    /// Returns the position buffer as a flat `Vec`: `[x0, y0, z0, x1, ...]`.
    #[must_use]
    pub fn positions_flat(&self) -> Vec<f64> {
        self.positions.iter().flatten().copied().collect()
    }

    /// Returns the UV buffer as a flat `Vec`: `[u0, v0, u1, v1, ...]`.
    #[must_use]
    pub fn uvs_flat(&self) -> Option<Vec<f64>> {
        self.uvs
            .as_ref()
            .map(|uvs| uvs.iter().flatten().copied().collect())
    }
}

/// Compute vertex normals by accumulating area-weighted face normals.
///
/// Triangles referencing out-of-range vertices are skipped. A vertex whose
/// accumulated normal has zero length falls back to `+Z`.
#[must_use]
pub fn compute_vertex_normals(positions: &[[f64; 3]], indices: &[u32]) -> Vec<[f64; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let i0 = tri[0] as usize;
        let i1 = tri[1] as usize;
        let i2 = tri[2] as usize;

        let (Some(p0), Some(p1), Some(p2)) =
            (positions.get(i0), positions.get(i1), positions.get(i2))
        else {
            continue;
        };

        let a = Point3::from_array(*p0);
        let b = Point3::from_array(*p1);
        let c = Point3::from_array(*p2);

        // Cross product magnitude is twice the triangle area.
        let face_normal = (b - a).cross(c - a);

        normals[i0] = normals[i0] + face_normal;
        normals[i1] = normals[i1] + face_normal;
        normals[i2] = normals[i2] + face_normal;
    }

    normals
        .into_iter()
        .map(|n| n.normalized().unwrap_or(Vec3::Z).to_array())
        .collect()
}
