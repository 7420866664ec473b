//! Devillers vertex removal.
//!
//! Removal proceeds in three steps: cavitation (delete every edge
//! incident to the vertex, patching the forward links of the star
//! polygon left behind), ear creation (one candidate triangle per
//! boundary edge, scored by the power of the removed point with
//! respect to the ear's circumcircle), and ear closing (repeatedly
//! close the lowest-scoring ear until only the final triangle
//! remains). The score discipline keeps every intermediate state
//! Delaunay.
//!
//! When the removed vertex lies on the perimeter, some ears touch the
//! ghost vertex. Those are scored so that ghost-producing ears are
//! selected last (through an explicit fallback) and degenerate ears
//! are never selected at all, which lets the exterior region close up
//! with ghost triangles in the usual discipline.

use log::debug;
use smallvec::SmallVec;

use crate::error::{Result, TinError};
use crate::mesh::{EdgeIndex, VertexIndex};
use crate::vertex::{MeshVertex, Vertex};

use super::IncrementalTin;

/// A candidate triangle on the cavity boundary: edges `c` from `v0`
/// to `v1` and `n` from `v1` to `v2`. Ears form a doubly linked ring
/// backed by a vector.
#[derive(Debug, Clone)]
struct Ear {
    c: EdgeIndex,
    n: EdgeIndex,
    v0: Option<VertexIndex>,
    v1: Option<VertexIndex>,
    v2: Option<VertexIndex>,
    score: f64,
    prior: usize,
    next: usize,
}

impl IncrementalTin {
    /// Remove a vertex from the mesh.
    ///
    /// If the vertex is one member of a merger group, it is removed
    /// from the group and the mesh structure is unchanged. Removal of
    /// a vertex from a mesh of only three occupants is not supported
    /// and returns false.
    ///
    /// Returns true if the vertex was found and removed.
    pub fn remove(&mut self, v: &Vertex) -> Result<bool> {
        self.ensure_unlocked()?;
        if !self.is_bootstrapped() {
            if let Some(list) = &mut self.vertex_list {
                if let Some(pos) = list.iter().position(|m| m.same(v)) {
                    list.remove(pos);
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        let start = self.search_start();
        let found = self
            .walker
            .find_enclosing(&self.pool, &self.vertices, start, v.x, v.y);
        let match_edge = match self.find_matching_reference(found, v) {
            Some(e) => e,
            None => return Ok(false),
        };

        // merger-group handling: removing one member of a group leaves
        // the mesh untouched
        let a_idx = self
            .pool
            .a(match_edge)
            .expect("matched edge has a real origin");
        if let MeshVertex::Group(g) = &mut self.vertices[a_idx.index()] {
            if !g.remove_vertex(v) {
                return Ok(false);
            }
            if g.size() > 0 {
                return Ok(true);
            }
            // the group is empty: fall through and remove its
            // topological vertex like any other
        }

        if self.vertices().len() <= 3 {
            debug!("removal refused: mesh has only three occupants");
            return Ok(false);
        }

        let (rx, ry) = self.coords_of(a_idx);
        self.search_edge = None;
        self.remove_structural(match_edge, rx, ry)
    }

    /// Cavitate the star of the vertex at the origin of `n0` and
    /// refill the cavity with Devillers ears.
    fn remove_structural(&mut self, n0: EdgeIndex, rx: f64, ry: f64) -> Result<bool> {
        // Step 1: cavitation. Delete each spoke, patching the forward
        // links of the boundary polygon.
        let mut n1 = self.pool.forward(n0);
        let boundary;
        loop {
            let n2 = self.pool.forward(n1);
            let n3 = self.pool.forward_from_dual(n2);
            self.pool.set_forward(n1, n3);
            let finished = n2 == n0.dual();
            self.pool.deallocate_edge(n2);
            n1 = n3;
            if finished {
                boundary = n1;
                break;
            }
        }

        // Step 2: ear creation around the boundary polygon.
        let mut ears: SmallVec<[Ear; 16]> = SmallVec::new();
        let p_start = boundary;
        let mut c = boundary;
        let mut n = self.pool.forward(c);
        loop {
            let prior = ears.len().wrapping_sub(1);
            ears.push(Ear {
                c,
                n,
                v0: self.pool.a(c),
                v1: self.pool.b(c),
                v2: self.pool.b(n),
                score: f64::INFINITY,
                prior,
                next: ears.len() + 1,
            });
            c = n;
            n = self.pool.forward(n);
            if c == p_start {
                break;
            }
        }
        let mut n_ear = ears.len();
        ears[0].prior = n_ear - 1;
        ears[n_ear - 1].next = 0;

        if n_ear == 3 {
            // the cavity is already a single triangle
            let c0 = ears[0].c;
            self.set_search_edge_after_removal(c0);
            return Ok(true);
        }

        for i in 0..n_ear {
            ears[i].score = self.removal_score(&ears[i], rx, ry);
        }

        // Step 3: ear closing.
        let mut first = 0usize;
        loop {
            let mut ear_min: Option<usize> = None;
            let mut min_score = f64::INFINITY;
            let mut i = first;
            loop {
                if ears[i].score < min_score {
                    min_score = ears[i].score;
                    ear_min = Some(i);
                } else if min_score.is_infinite() && ears[i].v0.is_none() {
                    ear_min = Some(i);
                }
                i = ears[i].next;
                if i == first {
                    break;
                }
            }
            let em = ear_min.ok_or(TinError::InternalFailure {
                details: "vertex removal could not identify an ear to close",
            })?;

            // close the ear: the new edge runs from v2 back to v0; its
            // forward side completes the new triangle, its dual side
            // maintains the cavity polygon
            let prior = ears[em].prior;
            let next = ears[em].next;
            let e = self.pool.allocate_edge(ears[em].v2, ears[em].v0);
            self.pool.set_forward(e, ears[em].c);
            self.pool.set_forward(ears[em].n, e);
            self.pool.set_forward(e.dual(), ears[next].n);
            self.pool.set_forward(ears[prior].c, e.dual());

            if n_ear == 4 {
                // the closing edge finished the final quadrilateral
                let c0 = ears[first].c;
                self.set_search_edge_after_removal(c0);
                return Ok(true);
            }

            // drop the closed ear from the ring and update the
            // geometry and scores of its neighbors
            ears[prior].next = next;
            ears[next].prior = prior;
            ears[prior].v2 = ears[em].v2;
            ears[prior].n = e.dual();
            ears[next].c = e.dual();
            ears[next].v0 = ears[em].v0;

            ears[prior].score = self.removal_score(&ears[prior], rx, ry);
            ears[next].score = self.removal_score(&ears[next], rx, ry);

            first = prior;
            n_ear -= 1;
        }
    }

    /// The Devillers power of the removal point with respect to the
    /// ear's circumcircle: the in-circle value normalized by the
    /// ear's signed area. Ghost-touching ears score infinite and are
    /// chosen only through the explicit fallback; non-positive-area
    /// ears score infinite and are never chosen.
    fn removal_score(&mut self, ear: &Ear, rx: f64, ry: f64) -> f64 {
        let (v0, v1, v2) = match (ear.v0, ear.v1, ear.v2) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return f64::INFINITY,
        };
        let (x0, y0) = self.coords_of(v0);
        let (x1, y1) = self.coords_of(v1);
        let (x2, y2) = self.coords_of(v2);
        let area = self.geo.area(x0, y0, x1, y1, x2, y2);
        if area <= 0.0 {
            return f64::INFINITY;
        }
        self.geo.in_circle(x0, y0, x1, y1, x2, y2, rx, ry) / area
    }

    /// Re-seat the cached search edge off the removal result. The
    /// insertion logic requires a non-ghost search edge, but removal
    /// can leave a ghost here.
    fn set_search_edge_after_removal(&mut self, e: EdgeIndex) {
        let mut b = e.base();
        if self.pool.b(b).is_none() {
            b = self.pool.reverse(b);
        }
        if self.pool.is_ghost(b) {
            self.search_edge = None;
        } else {
            self.search_edge = Some(b);
        }
    }

    /// Check the triangle at `edge` for a vertex representing `v`,
    /// returning the triangle edge that starts with the match.
    fn find_matching_reference(&self, edge: EdgeIndex, v: &Vertex) -> Option<EdgeIndex> {
        if let Some(a) = self.edge_a(edge) {
            if a.represents(v) {
                return Some(edge);
            }
        }
        if let Some(b) = self.edge_b(edge) {
            if b.represents(v) {
                return Some(self.pool.forward(edge));
            }
        }
        let r = self.pool.reverse(edge);
        if let Some(c) = self.edge_a(r) {
            if c.represents(v) {
                return Some(r);
            }
        }
        None
    }
}
