//! Edge adjacency for indexed triangle lists.
//!
//! [`EdgeTopology`] is rebuilt from scratch for every refinement pass and
//! thrown away afterwards. Edges are stored in first-registration order so
//! that anything derived from them (midpoint vertices in particular) comes
//! out in the same order on every run.

use std::collections::{BTreeSet, HashMap};

/// Unordered vertex pair identifying an edge.
///
/// Construct with [`EdgeKey::new`]; the smaller index always comes first, so
/// `(a, b)` and `(b, a)` compare and hash equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(u32, u32);

impl EdgeKey {
    #[must_use]
    pub const fn new(a: u32, b: u32) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    #[must_use]
    pub const fn min(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn max(self) -> u32 {
        self.1
    }
}

/// One undirected edge and the triangle corners opposite to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    /// Smaller endpoint index.
    pub v0: u32,
    /// Larger endpoint index.
    pub v1: u32,
    /// Vertex opposite the edge in the first referencing triangle.
    pub opposite0: u32,
    /// Vertex opposite the edge in the second referencing triangle, if any.
    pub opposite1: Option<u32>,
    /// Index of the midpoint vertex inserted for this edge during a
    /// subdivision pass.
    pub new_index: Option<u32>,
    /// How many triangle sides referenced this edge, including ignored ones.
    pub incidence: usize,
}

impl EdgeRecord {
    fn new(v0: u32, v1: u32, opposite: u32) -> Self {
        Self {
            v0,
            v1,
            opposite0: opposite,
            opposite1: None,
            new_index: None,
            incidence: 1,
        }
    }

    #[must_use]
    pub const fn key(&self) -> EdgeKey {
        EdgeKey::new(self.v0, self.v1)
    }

    /// An edge with a single adjacent triangle.
    #[must_use]
    pub const fn is_boundary(&self) -> bool {
        self.opposite1.is_none()
    }

    #[must_use]
    pub const fn is_interior(&self) -> bool {
        self.opposite1.is_some()
    }

    /// Referenced by more than two triangles.
    #[must_use]
    pub const fn is_non_manifold(&self) -> bool {
        self.incidence > 2
    }

    /// The endpoint across from `v`, or `None` when `v` is not on this edge.
    #[must_use]
    pub const fn other(&self, v: u32) -> Option<u32> {
        if self.v0 == v {
            Some(self.v1)
        } else if self.v1 == v {
            Some(self.v0)
        } else {
            None
        }
    }
}

/// Edge records, 1-ring neighbor sets and boundary classification of a
/// triangle list.
#[derive(Debug, Clone, Default)]
pub struct EdgeTopology {
    edges: Vec<EdgeRecord>,
    lookup: HashMap<EdgeKey, usize>,
    neighbors: Vec<BTreeSet<u32>>,
    boundary_neighbors: Vec<Vec<u32>>,
    ignored_registrations: usize,
}

impl EdgeTopology {
    /// Builds the topology of `indices`, read as a triangle list over
    /// `vertex_count` vertices.
    ///
    /// A trailing partial triangle is ignored. Indices outside
    /// `0..vertex_count` still produce edge records but are left out of the
    /// neighbor sets; callers are expected to validate beforehand.
    #[must_use]
    pub fn build(indices: &[u32], vertex_count: usize) -> Self {
        let mut topo = Self {
            edges: Vec::with_capacity(indices.len()),
            lookup: HashMap::with_capacity(indices.len()),
            neighbors: vec![BTreeSet::new(); vertex_count],
            boundary_neighbors: vec![Vec::new(); vertex_count],
            ignored_registrations: 0,
        };

        for tri in indices.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            topo.register(a, b, c);
            topo.register(b, c, a);
            topo.register(c, a, b);
        }

        for edge in topo.edges.iter().filter(|e| e.is_boundary()) {
            if edge.v0 == edge.v1 {
                continue;
            }
            if let Some(list) = topo.boundary_neighbors.get_mut(edge.v0 as usize) {
                list.push(edge.v1);
            }
            if let Some(list) = topo.boundary_neighbors.get_mut(edge.v1 as usize) {
                list.push(edge.v0);
            }
        }

        if topo.ignored_registrations > 0 {
            log::debug!(
                "topology: ignored {} edge registrations beyond two triangles per edge",
                topo.ignored_registrations
            );
        }

        topo
    }

    fn register(&mut self, a: u32, b: u32, opposite: u32) {
        let key = EdgeKey::new(a, b);
        match self.lookup.get(&key) {
            Some(&slot) => {
                let edge = &mut self.edges[slot];
                edge.incidence += 1;
                if edge.opposite1.is_none() {
                    edge.opposite1 = Some(opposite);
                } else {
                    self.ignored_registrations += 1;
                }
            }
            None => {
                self.lookup.insert(key, self.edges.len());
                self.edges.push(EdgeRecord::new(key.min(), key.max(), opposite));
            }
        }

        if a != b {
            if let Some(set) = self.neighbors.get_mut(a as usize) {
                set.insert(b);
            }
            if let Some(set) = self.neighbors.get_mut(b as usize) {
                set.insert(a);
            }
        }
    }

    /// Looks up an edge by its endpoints in either order.
    #[must_use]
    pub fn edge(&self, a: u32, b: u32) -> Option<&EdgeRecord> {
        self.lookup
            .get(&EdgeKey::new(a, b))
            .map(|&slot| &self.edges[slot])
    }

    /// All edges in first-registration order.
    #[must_use]
    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_boundary()).count()
    }

    #[must_use]
    pub fn interior_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_interior()).count()
    }

    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_non_manifold()).count()
    }

    /// Triangle sides that referenced an edge which already had two
    /// opposite vertices.
    #[must_use]
    pub const fn ignored_registrations(&self) -> usize {
        self.ignored_registrations
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.neighbors.len()
    }

    /// The 1-ring of `v`, sorted ascending.
    #[must_use]
    pub fn neighbors(&self, v: u32) -> Option<&BTreeSet<u32>> {
        self.neighbors.get(v as usize)
    }

    #[must_use]
    pub fn valence(&self, v: u32) -> usize {
        self.neighbors(v).map_or(0, BTreeSet::len)
    }

    /// True when `v` is an endpoint of at least one boundary edge.
    #[must_use]
    pub fn is_boundary_vertex(&self, v: u32) -> bool {
        !self.boundary_neighbors(v).is_empty()
    }

    /// Vertices joined to `v` by a boundary edge, in edge order.
    ///
    /// A vertex on a well-formed open boundary has exactly two.
    #[must_use]
    pub fn boundary_neighbors(&self, v: u32) -> &[u32] {
        self.boundary_neighbors
            .get(v as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// Numbers edge midpoints consecutively from `first`, in edge order.
    ///
    /// Returns the index one past the last assigned slot.
    pub fn assign_midpoint_indices(&mut self, first: u32) -> u32 {
        let mut next = first;
        for edge in &mut self.edges {
            edge.new_index = Some(next);
            next += 1;
        }
        next
    }

    /// Midpoint vertex index of edge `(a, b)`, once assigned.
    #[must_use]
    pub fn midpoint_index(&self, a: u32, b: u32) -> Option<u32> {
        self.edge(a, b).and_then(|e| e.new_index)
    }
}
