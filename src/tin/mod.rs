//! The incremental triangulation engine.
//!
//! [`IncrementalTin`] maintains a Delaunay triangulation of a planar
//! point set under incremental insertion and removal, supports the
//! addition of linear constraints to form a constrained Delaunay
//! triangulation, and answers structural queries (perimeter, triangle
//! survey, point-in-mesh).
//!
//! # Algorithm notes
//!
//! Point location uses a stochastic Lawson walk from a cached search
//! edge. Insertion is Bowyer-Watson: the containing triangle is split
//! by a pinwheel of new spokes and non-Delaunay edges are flipped out
//! of the growing cavity until its boundary is locally Delaunay. Hull
//! growth is uniform with interior insertion because the unbounded
//! face is triangulated with ghost edges, for which the in-circle
//! test degenerates to a half-plane test. Removal is Devillers'
//! ear-based algorithm. Constraint insertion carves a channel between
//! segment endpoints and refills both sides (see [`crate::constraint`]).
//!
//! # Example
//!
//! ```
//! use delaunum::{IncrementalTin, Vertex};
//!
//! let mut tin = IncrementalTin::new();
//! tin.add(Vertex::new(0.0, 0.0, 0.0, 0)).unwrap();
//! tin.add(Vertex::new(1.0, 0.0, 0.0, 1)).unwrap();
//! tin.add(Vertex::new(0.0, 1.0, 0.0, 2)).unwrap();
//! assert!(tin.is_bootstrapped());
//! assert_eq!(tin.count_triangles().count(), 1);
//! ```

mod constraints;
mod removal;
mod stats;

pub use stats::{Diagnostics, TriangleCount};

use log::debug;

use crate::constraint::Constraint;
use crate::error::{Result, TinError};
use crate::geometry::Rect;
use crate::mesh::{BootstrapUtility, EdgeIndex, EdgePool, Pinwheel, StochasticLawsonWalk, VertexIndex};
use crate::predicates::{GeometricOperations, Thresholds};
use crate::progress::ProgressMonitor;
use crate::vertex::{MeshVertex, ResolutionRule, Vertex, VertexMergerGroup};

/// An incremental Delaunay / constrained Delaunay triangulation.
///
/// The mesh is single-threaded and stateful. Edge indices returned by
/// query methods remain valid only until the next mutating call.
#[derive(Debug)]
pub struct IncrementalTin {
    /// Arena of mesh occupants referenced by edge origins.
    pub(crate) vertices: Vec<MeshVertex>,
    /// Vertices buffered until the mesh bootstraps.
    vertex_list: Option<Vec<Vertex>>,
    pub(crate) pool: EdgePool,
    pub(crate) geo: GeometricOperations,
    walker: StochasticLawsonWalk,
    thresholds: Thresholds,
    pub(crate) search_edge: Option<EdgeIndex>,
    constraints: Vec<Constraint>,
    merge_rule: ResolutionRule,
    bounds: Rect,
    bootstrapped: bool,
    locked: bool,
    disposed: bool,
    n_coincidence_sets: usize,
    n_vertices_inserted: usize,
    n_edges_replaced: usize,
    max_edges_replaced: usize,
    pub(crate) n_synthetic_vertices: usize,
}

impl Default for IncrementalTin {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalTin {
    /// Create a mesh with thresholds for a nominal point spacing of
    /// one unit.
    pub fn new() -> Self {
        Self::with_nominal_point_spacing(1.0)
    }

    /// Create a mesh with thresholds derived from the given nominal
    /// point spacing.
    ///
    /// The spacing is an estimate of the typical distance between
    /// neighboring samples; within one or two orders of magnitude of
    /// the true value is sufficient.
    pub fn with_nominal_point_spacing(nominal_point_spacing: f64) -> Self {
        let thresholds = Thresholds::new(nominal_point_spacing);
        Self {
            vertices: Vec::new(),
            vertex_list: None,
            pool: EdgePool::new(),
            geo: GeometricOperations::new(thresholds),
            walker: StochasticLawsonWalk::new(thresholds),
            thresholds,
            search_edge: None,
            constraints: Vec::new(),
            merge_rule: ResolutionRule::default(),
            bounds: Rect::empty(),
            bootstrapped: false,
            locked: false,
            disposed: false,
            n_coincidence_sets: 0,
            n_vertices_inserted: 0,
            n_edges_replaced: 0,
            max_edges_replaced: 0,
            n_synthetic_vertices: 0,
        }
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            if self.disposed {
                Err(TinError::Disposed)
            } else {
                Err(TinError::Locked)
            }
        } else {
            Ok(())
        }
    }

    // ==================== Insertion ====================

    /// Insert a vertex.
    ///
    /// Until three non-collinear vertices have been received, input is
    /// buffered and the mesh is not yet bootstrapped. Vertices closer
    /// than the vertex tolerance to an existing vertex are merged into
    /// a [`VertexMergerGroup`] rather than inserted.
    ///
    /// Returns whether the mesh is bootstrapped.
    pub fn add(&mut self, v: Vertex) -> Result<bool> {
        self.ensure_unlocked()?;
        self.n_vertices_inserted += 1;
        if self.bootstrapped {
            self.add_with_insert_or_append(v);
            return Ok(true);
        }
        let list = self.vertex_list.get_or_insert_with(Vec::new);
        list.push(v);
        if list.len() < 3 {
            return Ok(false);
        }
        self.try_bootstrap_buffered()
    }

    /// Insert a list of vertices, with optional progress reporting.
    ///
    /// The monitor is polled between vertex insertions; if it reports
    /// cancellation, the insertion of the current vertex completes and
    /// the method returns cleanly.
    ///
    /// Returns whether the mesh is bootstrapped.
    pub fn add_all(
        &mut self,
        list: &[Vertex],
        mut monitor: Option<&mut dyn ProgressMonitor>,
    ) -> Result<bool> {
        self.ensure_unlocked()?;
        if list.is_empty() {
            return Ok(self.bootstrapped);
        }
        self.n_vertices_inserted += list.len();

        let a_list: Vec<Vertex> = if self.bootstrapped {
            list.to_vec()
        } else {
            let mut buffered = self.vertex_list.take().unwrap_or_default();
            buffered.extend_from_slice(list);
            let mut bu = BootstrapUtility::new(self.thresholds);
            match bu.bootstrap(&buffered) {
                Some(triple) => {
                    self.build_initial_mesh(triple);
                    buffered
                }
                None => {
                    // keep a private copy for future attempts
                    self.vertex_list = Some(buffered);
                    return Ok(false);
                }
            }
        };

        let n = a_list.len();
        self.pool.pre_allocate(n * 3);

        let mut progress_threshold = usize::MAX;
        if let Some(m) = monitor.as_mut() {
            m.report_progress(0);
            let pct = m.reporting_interval_percent().clamp(1, 100) as usize;
            progress_threshold = ((n * pct) / 100).max(1);
        }

        let mut pending = 0usize;
        for (i, v) in a_list.iter().enumerate() {
            self.add_with_insert_or_append(*v);
            pending += 1;
            if pending >= progress_threshold {
                pending = 0;
                if let Some(m) = monitor.as_mut() {
                    m.report_progress((0.1 + (100.0 * (i + 1) as f64) / n as f64) as i32);
                    if m.is_canceled() {
                        debug!("bulk insertion canceled after {} of {} vertices", i + 1, n);
                        break;
                    }
                }
            }
        }
        Ok(true)
    }

    /// Attempt to bootstrap from the buffered vertex list; on success,
    /// feed the whole buffer through normal insertion.
    fn try_bootstrap_buffered(&mut self) -> Result<bool> {
        let buffered = self.vertex_list.take().unwrap_or_default();
        let mut bu = BootstrapUtility::new(self.thresholds);
        match bu.bootstrap(&buffered) {
            Some(triple) => {
                self.build_initial_mesh(triple);
                for v in &buffered {
                    self.add_with_insert_or_append(*v);
                }
                Ok(true)
            }
            None => {
                self.vertex_list = Some(buffered);
                Ok(false)
            }
        }
    }

    /// Build the initial three-triangle mesh: the seed triangle plus
    /// three ghost edges closing the hull around the virtual point at
    /// infinity.
    fn build_initial_mesh(&mut self, triple: [Vertex; 3]) {
        let v: Vec<VertexIndex> = triple
            .iter()
            .map(|&p| self.add_occupant(MeshVertex::Single(p)))
            .collect();

        let e1 = self.pool.allocate_edge(Some(v[0]), Some(v[1]));
        let e2 = self.pool.allocate_edge(Some(v[1]), Some(v[2]));
        let e3 = self.pool.allocate_edge(Some(v[2]), Some(v[0]));
        let e4 = self.pool.allocate_edge(Some(v[0]), None);
        let e5 = self.pool.allocate_edge(Some(v[1]), None);
        let e6 = self.pool.allocate_edge(Some(v[2]), None);

        self.pool.set_forward(e1, e2);
        self.pool.set_forward(e2, e3);
        self.pool.set_forward(e3, e1);
        self.pool.set_forward(e4, e5.dual());
        self.pool.set_forward(e5, e6.dual());
        self.pool.set_forward(e6, e4.dual());
        self.pool.set_forward(e1.dual(), e4);
        self.pool.set_forward(e2.dual(), e5);
        self.pool.set_forward(e3.dual(), e6);
        self.pool.set_forward(e4.dual(), e3.dual());
        self.pool.set_forward(e5.dual(), e1.dual());
        self.pool.set_forward(e6.dual(), e2.dual());

        for p in &triple {
            self.bounds.add_point(p.x, p.y);
        }
        self.search_edge = Some(e1);
        self.bootstrapped = true;
        debug!(
            "bootstrapped with vertices {}, {}, {}",
            triple[0].index(),
            triple[1].index(),
            triple[2].index()
        );
    }

    fn add_occupant(&mut self, occupant: MeshVertex) -> VertexIndex {
        let idx = VertexIndex::new(self.vertices.len());
        self.vertices.push(occupant);
        idx
    }

    pub(crate) fn coords_of(&self, v: VertexIndex) -> (f64, f64) {
        let mv = &self.vertices[v.index()];
        (mv.x(), mv.y())
    }

    /// A valid non-ghost edge from which to start a search.
    pub(crate) fn search_start(&self) -> EdgeIndex {
        match self.search_edge {
            Some(e) if self.pool.is_live(e) && !self.pool.is_ghost(e) => e,
            _ => self
                .pool
                .starting_edge()
                .expect("bootstrapped mesh has a non-ghost edge"),
        }
    }

    /// Insert a vertex into the bootstrapped mesh, or merge it into an
    /// existing occupant within the vertex tolerance. Returns false if
    /// the vertex was merged rather than inserted.
    fn add_with_insert_or_append(&mut self, v: Vertex) -> bool {
        let x = v.x;
        let y = v.y;
        self.bounds.add_point(x, y);

        let start = self.search_start();
        let search = self
            .walker
            .find_enclosing(&self.pool, &self.vertices, start, x, y);

        // coincident-vertex check: re-aim the search edge so a matched
        // vertex sits at its origin, then merge
        let tol2 = self.thresholds.vertex_tolerance2();
        if let Some(adjusted) = self.match_triangle_vertex(search, x, y, tol2) {
            self.search_edge = Some(adjusted);
            self.merge_vertex_or_ignore(adjusted, v);
            return false;
        }

        let vidx = self.add_occupant(MeshVertex::Single(v));
        let anchor = self.pool.a(search);

        // seed the pinwheel with a spoke to the anchor vertex and
        // pre-close the far side of the initial triangle
        let p_start = self.pool.allocate_edge(Some(vidx), anchor);
        self.pool.set_forward(p_start, search);
        let n1 = self.pool.forward(search);
        let n2 = self.pool.forward(n1);
        self.pool.set_forward(n2, p_start.dual());

        // A one-slot scratch buffer holds the most recently removed
        // edge pair for preferential reuse, sparing the free list.
        let mut buffer: Option<EdgeIndex> = None;
        let mut n_replacements = 0usize;

        let mut p = p_start;
        let mut c = search;
        loop {
            let n0 = c.dual();
            let n1 = self.pool.forward(n0);
            let va = self.pool.a(n0);
            let vb = self.pool.a(n1);
            let vc = self.pool.b(n1);

            let h = if vc.is_none() {
                self.in_circle_with_ghosts(va.unwrap(), vb.unwrap(), x, y)
            } else if va.is_none() {
                self.in_circle_with_ghosts(vb.unwrap(), vc.unwrap(), x, y)
            } else if vb.is_none() {
                self.in_circle_with_ghosts(vc.unwrap(), va.unwrap(), x, y)
            } else {
                let (ax, ay) = self.coords_of(va.unwrap());
                let (bx, by) = self.coords_of(vb.unwrap());
                let (cx, cy) = self.coords_of(vc.unwrap());
                self.geo.in_circle(ax, ay, bx, by, cx, cy, x, y)
            };

            if h >= 0.0 {
                // the neighbor triangle's far vertex is inside the
                // circumcircle: remove edge c, extending the cavity
                let n2 = self.pool.forward(n1);
                let cf = self.pool.forward(c);
                self.pool.set_forward(n2, cf);
                self.pool.set_forward(p, n1);
                n_replacements += 1;
                if buffer.is_none() {
                    buffer = Some(c.base());
                } else {
                    self.pool.deallocate_edge(c);
                }
                c = n1;
            } else {
                if self.pool.b(c) == anchor {
                    // cavity boundary is closed; seal the last triangle
                    self.pool.set_forward(p_start.dual(), p);
                    self.search_edge = Some(p_start);
                    if let Some(slot) = buffer.take() {
                        self.pool.deallocate_edge(slot);
                    }
                    self.n_edges_replaced += n_replacements;
                    if n_replacements > self.max_edges_replaced {
                        self.max_edges_replaced = n_replacements;
                    }
                    break;
                }
                let next_c = self.pool.forward(c);
                let cb = self.pool.b(c);
                let e = if let Some(slot) = buffer.take() {
                    self.pool.reassign(slot, Some(vidx), cb);
                    slot
                } else {
                    self.pool.allocate_edge(Some(vidx), cb)
                };
                self.pool.set_forward(e, next_c);
                self.pool.set_forward(e.dual(), p);
                self.pool.set_forward(c, e.dual());
                p = e;
                c = next_c;
            }
        }
        true
    }

    /// Pseudo in-circle test against a ghost triangle whose real edge
    /// is `(a, b)`: a half-plane test with an on-ray tie-break. A
    /// positive result marks the edge non-Delaunay (to be replaced),
    /// which is how the hull grows to take in exterior points.
    fn in_circle_with_ghosts(&mut self, a: VertexIndex, b: VertexIndex, x: f64, y: f64) -> f64 {
        let (ax, ay) = self.coords_of(a);
        let (bx, by) = self.coords_of(b);
        let mut h = (x - ax) * (ay - by) + (y - ay) * (bx - ax);
        if h.abs() < self.thresholds.half_plane_threshold() {
            h = self.geo.half_plane(ax, ay, bx, by, x, y);
            if h == 0.0 {
                // the point lies on the ray of segment (a, b): treat
                // positions within the segment as non-Delaunay and
                // positions beyond either end as Delaunay
                let dx = x - ax;
                let dy = y - ay;
                let nx = bx - ax;
                let ny = by - ay;
                let along = dx * nx + dy * ny;
                if along < 0.0 {
                    h = -1.0;
                } else if dx * dx + dy * dy > nx * nx + ny * ny {
                    h = -1.0;
                } else {
                    h = 1.0;
                }
            }
        }
        h
    }

    /// Test the vertices of the triangle at `search` against the
    /// coordinates; on a match within tolerance, return the triangle
    /// edge whose origin is the matched vertex.
    fn match_triangle_vertex(
        &self,
        search: EdgeIndex,
        x: f64,
        y: f64,
        tol2: f64,
    ) -> Option<EdgeIndex> {
        let a = self.pool.a(search);
        if let Some(a) = a {
            if self.vertices[a.index()].distance_sq(x, y) < tol2 {
                return Some(search);
            }
        }
        let b = self.pool.b(search);
        if let Some(b) = b {
            if self.vertices[b.index()].distance_sq(x, y) < tol2 {
                return Some(self.pool.forward(search));
            }
        }
        if let Some(c) = self.pool.triangle_apex(search) {
            if self.vertices[c.index()].distance_sq(x, y) < tol2 {
                return Some(self.pool.reverse(search));
            }
        }
        None
    }

    /// Merge a vertex into the occupant at the origin of `edge`,
    /// promoting a single vertex to a merger group on first contact.
    /// Re-insertions of a vertex already present are ignored.
    fn merge_vertex_or_ignore(&mut self, edge: EdgeIndex, v: Vertex) {
        let a = self
            .pool
            .a(edge)
            .expect("matched edge must have a real origin");
        match &mut self.vertices[a.index()] {
            MeshVertex::Single(s) => {
                if s.same(&v) {
                    // already present; typically a vertex reinserted
                    // after being consumed by the bootstrap
                    return;
                }
                let mut group = VertexMergerGroup::new(*s);
                group.set_resolution_rule(self.merge_rule);
                group.add_vertex(v);
                self.vertices[a.index()] = MeshVertex::Group(group);
                self.n_coincidence_sets += 1;
            }
            MeshVertex::Group(g) => {
                g.add_vertex(v);
            }
        }
    }

    // ==================== Queries ====================

    /// True once three non-collinear vertices have been received and
    /// the mesh structure exists.
    #[inline]
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// The nominal point spacing the instance was configured with.
    #[inline]
    pub fn nominal_point_spacing(&self) -> f64 {
        self.thresholds.nominal_point_spacing()
    }

    /// Bounds of the vertices added so far, or `None` before any
    /// vertex has been placed in the mesh.
    pub fn bounds(&self) -> Option<Rect> {
        if self.bounds.is_empty() {
            None
        } else {
            Some(self.bounds)
        }
    }

    /// The base side of every live edge pair. Indices are invalidated
    /// by the next mutating call.
    pub fn edges(&self) -> Vec<EdgeIndex> {
        self.pool.pairs().collect()
    }

    /// Number of live edge pairs.
    pub fn edge_count(&self) -> usize {
        self.pool.size()
    }

    /// The interior-side hull edges, counterclockwise; each hull
    /// vertex appears exactly once as an edge origin. Empty when the
    /// mesh is not bootstrapped.
    pub fn perimeter(&self) -> Vec<EdgeIndex> {
        let mut list = Vec::new();
        if !self.bootstrapped {
            return list;
        }
        let g = self
            .pool
            .starting_ghost_edge()
            .expect("bootstrapped mesh has ghost edges");
        let s0 = self.pool.reverse(g);
        let mut s = s0;
        loop {
            list.push(s.dual());
            let f2 = self.pool.forward(self.pool.forward(s));
            s = self.pool.reverse(f2.dual());
            if s == s0 {
                break;
            }
        }
        list
    }

    /// The unique occupants of the mesh. Merged vertices appear as
    /// their group.
    pub fn vertices(&self) -> Vec<&MeshVertex> {
        let mut seen = vec![false; self.vertices.len()];
        let mut out = Vec::new();
        for e in self.pool.pairs() {
            for side in [e, e.dual()] {
                if let Some(v) = self.pool.a(side) {
                    if !seen[v.index()] {
                        seen[v.index()] = true;
                        out.push(&self.vertices[v.index()]);
                    }
                }
            }
        }
        out
    }

    /// Survey the triangles of the mesh.
    pub fn count_triangles(&self) -> TriangleCount {
        let mut t_count = TriangleCount::new();
        if !self.bootstrapped {
            return t_count;
        }
        let mut mark = vec![false; self.pool.max_allocation_index()];
        for e in self.pool.pairs() {
            if self.pool.is_ghost(e) {
                mark[e.index()] = true;
                mark[e.dual().index()] = true;
                continue;
            }
            self.count_triangle_edge(&mut t_count, &mut mark, e);
            self.count_triangle_edge(&mut t_count, &mut mark, e.dual());
        }
        t_count
    }

    fn count_triangle_edge(&self, t_count: &mut TriangleCount, mark: &mut [bool], e: EdgeIndex) {
        if mark[e.index()] {
            return;
        }
        mark[e.index()] = true;
        let f = self.pool.forward(e);
        if self.pool.b(f).is_none() {
            // ghost triangle, not tabulated
            return;
        }
        let r = self.pool.reverse(e);
        if mark[f.index()] || mark[r.index()] {
            return;
        }
        mark[f.index()] = true;
        mark[r.index()] = true;
        let (ax, ay) = self.coords_of(self.pool.a(e).expect("non-ghost"));
        let (bx, by) = self.coords_of(self.pool.a(f).expect("non-ghost"));
        let (cx, cy) = self.coords_of(self.pool.a(r).expect("non-ghost"));
        t_count.tabulate(ax, ay, bx, by, cx, cy);
    }

    /// True if `(x, y)` lies inside the convex hull of the mesh.
    ///
    /// Takes `&mut self` because the point-location walk updates the
    /// cached search edge.
    pub fn is_point_inside_tin(&mut self, x: f64, y: f64) -> bool {
        if !self.bootstrapped {
            return false;
        }
        let start = self.search_start();
        let e = self
            .walker
            .find_enclosing(&self.pool, &self.vertices, start, x, y);
        if !self.pool.is_ghost(e) {
            self.search_edge = Some(e);
        }
        self.pool.triangle_apex(e).is_some()
    }

    /// The constraints added to the mesh.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Number of synthetic vertices created by the engine (conformity
    /// subdivision midpoints).
    #[inline]
    pub fn synthetic_vertex_count(&self) -> usize {
        self.n_synthetic_vertices
    }

    /// Set the rule for resolving the z values of coincident-vertex
    /// groups, re-applying it to any groups already formed.
    pub fn set_resolution_rule(&mut self, rule: ResolutionRule) {
        self.merge_rule = rule;
        for occupant in &mut self.vertices {
            if let MeshVertex::Group(g) = occupant {
                g.set_resolution_rule(rule);
            }
        }
    }

    /// Reserve edge-pool capacity for roughly `n_vertices` insertions.
    pub fn pre_allocate_edges(&mut self, n_vertices: usize) {
        self.pool.pre_allocate(n_vertices * 3);
    }

    // ==================== Edge accessors ====================

    /// The occupant at the origin of `e`, or `None` for a ghost side.
    pub fn edge_a(&self, e: EdgeIndex) -> Option<&MeshVertex> {
        self.pool.a(e).map(|v| &self.vertices[v.index()])
    }

    /// The occupant at the terminus of `e`, or `None` for a ghost side.
    pub fn edge_b(&self, e: EdgeIndex) -> Option<&MeshVertex> {
        self.pool.b(e).map(|v| &self.vertices[v.index()])
    }

    /// The forward link of `e` (next edge around the face to its left).
    pub fn edge_forward(&self, e: EdgeIndex) -> EdgeIndex {
        self.pool.forward(e)
    }

    /// The reverse link of `e`.
    pub fn edge_reverse(&self, e: EdgeIndex) -> EdgeIndex {
        self.pool.reverse(e)
    }

    /// True if `e` touches the virtual point at infinity.
    pub fn is_ghost_edge(&self, e: EdgeIndex) -> bool {
        self.pool.is_ghost(e)
    }

    /// True if the pair containing `e` is constrained.
    pub fn is_edge_constrained(&self, e: EdgeIndex) -> bool {
        self.pool.is_constrained(e)
    }

    /// The constraint index of the pair containing `e`.
    pub fn edge_constraint_index(&self, e: EdgeIndex) -> usize {
        self.pool.constraint_index(e)
    }

    /// True if the pair containing `e` borders or lies inside a
    /// constrained data area.
    pub fn is_edge_area_member(&self, e: EdgeIndex) -> bool {
        self.pool.is_area_member(e)
    }

    /// Length of `e`, or NaN for a ghost edge.
    pub fn edge_length(&self, e: EdgeIndex) -> f64 {
        match (self.pool.a(e), self.pool.b(e)) {
            (Some(a), Some(b)) => {
                let (ax, ay) = self.coords_of(a);
                let (bx, by) = self.coords_of(b);
                ((ax - bx) * (ax - bx) + (ay - by) * (ay - by)).sqrt()
            }
            _ => f64::NAN,
        }
    }

    /// Iterate the edges sharing the origin of `e`, in rotational
    /// order.
    pub fn pinwheel(&self, e: EdgeIndex) -> Pinwheel<'_> {
        self.pool.pinwheel(e)
    }

    // ==================== Lifecycle ====================

    /// Release the edge pool and all internal references. The
    /// instance refuses further operations.
    pub fn dispose(&mut self) {
        if !self.disposed {
            self.locked = true;
            self.disposed = true;
            self.pool.dispose();
            self.search_edge = None;
            self.vertex_list = None;
            self.vertices.clear();
            self.constraints.clear();
        }
    }

    /// Reset all state for reuse, keeping allocated storage where
    /// possible. A disposed instance stays disposed.
    pub fn clear(&mut self) {
        if self.disposed {
            return;
        }
        self.locked = false;
        self.bootstrapped = false;
        self.pool.clear();
        self.search_edge = None;
        self.vertex_list = None;
        self.vertices.clear();
        self.constraints.clear();
        self.walker.reset();
        self.geo.reset_counters();
        self.bounds = Rect::empty();
        self.n_coincidence_sets = 0;
        self.n_vertices_inserted = 0;
        self.n_edges_replaced = 0;
        self.max_edges_replaced = 0;
        self.n_synthetic_vertices = 0;
    }

    /// Collect a snapshot of construction statistics.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut n_ordinary = 0usize;
        let mut n_ghost = 0usize;
        let mut sum_length = 0.0;
        for e in self.pool.pairs() {
            if self.pool.is_ghost(e) {
                n_ghost += 1;
            } else {
                n_ordinary += 1;
                sum_length += self.edge_length(e);
            }
        }
        let average_point_spacing = if n_ordinary > 0 {
            sum_length / n_ordinary as f64
        } else {
            0.0
        };
        Diagnostics {
            vertices_inserted: self.n_vertices_inserted,
            coincidence_sets: self.n_coincidence_sets,
            perimeter_edges: self.perimeter().len(),
            ordinary_edges: n_ordinary,
            ghost_edges: n_ghost,
            average_point_spacing,
            nominal_point_spacing: self.thresholds.nominal_point_spacing(),
            edges_replaced: self.n_edges_replaced,
            max_edges_replaced_by_one_insert: self.max_edges_replaced,
            walks: self.walker.walk_count(),
            walk_steps: self.walker.step_count(),
            in_circle_calls: self.geo.in_circle_count(),
            in_circle_extended: self.geo.in_circle_extended_count(),
            in_circle_conflicts: self.geo.in_circle_conflict_count(),
            synthetic_vertices: self.n_synthetic_vertices,
            triangles: self.count_triangles(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Validate the structural invariants of the mesh: reciprocal
    /// links, triangulation closure, and the Delaunay criterion on
    /// unconstrained interior edges.
    pub fn check_integrity(tin: &mut IncrementalTin) {
        let edges = tin.edges();
        for e in edges {
            for side in [e, e.dual()] {
                assert_eq!(side.dual().dual(), side);
                let f = tin.pool.forward(side);
                assert_eq!(tin.pool.reverse(f), side, "forward/reverse mismatch");
                let r = tin.pool.reverse(side);
                assert_eq!(tin.pool.forward(r), side, "reverse/forward mismatch");
                // every face, ghost faces included, is a 3-cycle
                let f3 = tin.pool.forward(tin.pool.forward(f));
                assert_eq!(f3, side, "face is not a triangle");
            }

            // Delaunay criterion on unconstrained interior edges
            if tin.pool.is_ghost(e) || tin.pool.is_constrained(e) {
                continue;
            }
            let c = tin.pool.triangle_apex(e);
            let d = tin.pool.triangle_apex(e.dual());
            if let (Some(c), Some(d)) = (c, d) {
                let (ax, ay) = tin.coords_of(tin.pool.a(e).unwrap());
                let (bx, by) = tin.coords_of(tin.pool.b(e).unwrap());
                let (cx, cy) = tin.coords_of(c);
                let (dx, dy) = tin.coords_of(d);
                let h = tin.geo.in_circle(ax, ay, bx, by, cx, cy, dx, dy);
                assert!(
                    h <= tin.geo.thresholds().in_circle_threshold(),
                    "edge {:?} violates the Delaunay criterion (h = {})",
                    e,
                    h
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::check_integrity;
    use super::*;

    fn v(x: f64, y: f64, id: usize) -> Vertex {
        Vertex::new(x, y, 0.0, id)
    }

    #[test]
    fn test_single_triangle() {
        let mut tin = IncrementalTin::new();
        assert!(!tin.add(v(0.0, 0.0, 0)).unwrap());
        assert!(!tin.add(v(1.0, 0.0, 1)).unwrap());
        assert!(tin.add(v(0.0, 1.0, 2)).unwrap());
        assert!(tin.is_bootstrapped());
        assert_eq!(tin.count_triangles().count(), 1);
        assert_eq!(tin.perimeter().len(), 3);
        check_integrity(&mut tin);
    }

    #[test]
    fn test_unit_square_with_center() {
        let mut tin = IncrementalTin::new();
        let pts = [
            v(0.0, 0.0, 0),
            v(1.0, 0.0, 1),
            v(1.0, 1.0, 2),
            v(0.0, 1.0, 3),
            v(0.5, 0.5, 4),
        ];
        tin.add_all(&pts, None).unwrap();
        assert_eq!(tin.count_triangles().count(), 4);

        // the center vertex has degree 4
        let center = tin
            .edges()
            .into_iter()
            .flat_map(|e| [e, e.dual()])
            .find(|&e| tin.edge_a(e).map(|m| m.index()) == Some(4))
            .expect("center vertex present");
        assert_eq!(tin.pinwheel(center).count(), 4);
        check_integrity(&mut tin);
    }

    #[test]
    fn test_hull_growth_from_exterior_points() {
        let mut tin = IncrementalTin::new();
        tin.add_all(&[v(0.0, 0.0, 0), v(1.0, 0.0, 1), v(0.5, 1.0, 2)], None)
            .unwrap();
        // each of these lies outside the current hull
        tin.add(v(2.0, 0.0, 3)).unwrap();
        tin.add(v(-1.0, 0.5, 4)).unwrap();
        tin.add(v(0.5, -2.0, 5)).unwrap();
        assert_eq!(tin.vertices().len(), 6);
        check_integrity(&mut tin);
    }

    #[test]
    fn test_grid_satisfies_euler_relation() {
        // full 32 x 32 unit grid plus 8 duplicate submissions
        let mut pts = Vec::new();
        let mut id = 0usize;
        for i in 0..32 {
            for j in 0..32 {
                pts.push(v(i as f64, j as f64, id));
                id += 1;
            }
        }
        for k in 0..8 {
            pts.push(v((k * 3) as f64, (k * 2) as f64, id));
            id += 1;
        }
        let mut tin = IncrementalTin::new();
        tin.add_all(&pts, None).unwrap();

        let n = tin.vertices().len();
        assert_eq!(n, 1024);
        let h = tin.perimeter().len();
        assert_eq!(h, 124);
        assert_eq!(tin.count_triangles().count(), 2 * n - 2 - h);
        check_integrity(&mut tin);
    }

    #[test]
    fn test_collinear_points_do_not_bootstrap() {
        let mut tin = IncrementalTin::new();
        for i in 0..4 {
            assert!(!tin.add(v(i as f64, 0.0, i)).unwrap());
        }
        assert!(!tin.is_bootstrapped());
        assert_eq!(tin.count_triangles().count(), 0);

        assert!(tin.add(v(1.0, 1.0, 4)).unwrap());
        assert!(tin.is_bootstrapped());
        assert_eq!(tin.vertices().len(), 5);
        check_integrity(&mut tin);
    }

    #[test]
    fn test_duplicate_insertion_merges() {
        let mut tin = IncrementalTin::new();
        tin.add_all(
            &[v(0.0, 0.0, 0), v(4.0, 0.0, 1), v(0.0, 4.0, 2), v(1.0, 1.0, 3)],
            None,
        )
        .unwrap();
        let before = tin.count_triangles().count();

        // coincident with vertex 3, different id and z
        tin.add(Vertex::new(1.0, 1.0, 9.0, 4)).unwrap();
        assert_eq!(tin.count_triangles().count(), before);

        let groups: Vec<_> = tin
            .vertices()
            .into_iter()
            .filter(|m| matches!(m, MeshVertex::Group(_)))
            .collect();
        assert_eq!(groups.len(), 1);
        // mean of 0.0 and 9.0
        assert_eq!(groups[0].z(), 4.5);
        check_integrity(&mut tin);
    }

    #[test]
    fn test_point_containment() {
        let mut tin = IncrementalTin::new();
        tin.add_all(&[v(0.0, 0.0, 0), v(2.0, 0.0, 1), v(0.0, 2.0, 2)], None)
            .unwrap();
        assert!(tin.is_point_inside_tin(0.5, 0.5));
        assert!(!tin.is_point_inside_tin(5.0, 5.0));
        assert!(!tin.is_point_inside_tin(-0.5, -0.5));
    }

    #[test]
    fn test_locked_after_dispose() {
        let mut tin = IncrementalTin::new();
        tin.add_all(&[v(0.0, 0.0, 0), v(1.0, 0.0, 1), v(0.0, 1.0, 2)], None)
            .unwrap();
        tin.dispose();
        assert!(matches!(tin.add(v(5.0, 5.0, 9)), Err(TinError::Disposed)));
    }

    #[test]
    fn test_clear_allows_reuse() {
        let mut tin = IncrementalTin::new();
        tin.add_all(&[v(0.0, 0.0, 0), v(1.0, 0.0, 1), v(0.0, 1.0, 2)], None)
            .unwrap();
        tin.clear();
        assert!(!tin.is_bootstrapped());
        assert_eq!(tin.edge_count(), 0);

        tin.add_all(&[v(5.0, 5.0, 0), v(6.0, 5.0, 1), v(5.0, 6.0, 2)], None)
            .unwrap();
        assert!(tin.is_bootstrapped());
        assert_eq!(tin.count_triangles().count(), 1);
    }

    #[test]
    fn test_progress_reporting_and_cancellation() {
        use crate::progress::ProgressMonitor;

        struct CancelAfter {
            reports: usize,
            cancel_at: usize,
        }
        impl ProgressMonitor for CancelAfter {
            fn reporting_interval_percent(&self) -> i32 {
                10
            }
            fn report_progress(&mut self, _percent: i32) {
                self.reports += 1;
            }
            fn is_canceled(&self) -> bool {
                self.reports > self.cancel_at
            }
        }

        let mut pts = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                pts.push(v(i as f64, j as f64, i * 20 + j));
            }
        }
        let mut monitor = CancelAfter {
            reports: 0,
            cancel_at: 3,
        };
        let mut tin = IncrementalTin::new();
        tin.add_all(&pts, Some(&mut monitor)).unwrap();
        assert!(monitor.reports > 0);
        // cancellation left a consistent, partially built mesh
        assert!(tin.is_bootstrapped());
        assert!(tin.vertices().len() < 400);
        check_integrity(&mut tin);
    }

    #[test]
    fn test_diagnostics_snapshot() {
        let mut tin = IncrementalTin::new();
        tin.add_all(
            &[v(0.0, 0.0, 0), v(1.0, 0.0, 1), v(0.0, 1.0, 2), v(1.0, 1.0, 3)],
            None,
        )
        .unwrap();
        let d = tin.diagnostics();
        assert_eq!(d.vertices_inserted, 4);
        assert_eq!(d.triangles.count(), 2);
        assert_eq!(d.perimeter_edges, 4);
        assert!(d.ghost_edges >= 4);
        let text = d.to_string();
        assert!(text.contains("triangles"));
    }
}
