//! Constraint insertion and conformity restoration.
//!
//! Constraints are embedded in four phases. First, every constraint
//! vertex is inserted through the normal insertion engine (merger
//! tolerance applies) and the mesh is locked against further vertex
//! additions. Second, each constraint segment is realized: if the
//! segment already exists as an edge it is simply marked; if an
//! existing edge is collinear with the segment, its far vertex is
//! spliced into the constraint and processing advances to the
//! sub-segment; otherwise the segment is carved across the mesh,
//! deallocating every straddled edge, and the polygonal cavities left
//! on either side are refilled with ears and a bounded flip pass.
//! Third, if requested, conformity is restored by subdividing
//! constrained edges that violate the local Delaunay criterion.
//! Fourth, data-area constraints flood-fill their interior triangles
//! with the owning constraint index.
//!
//! The conformity restoration and the flood fill are iterative with
//! explicit work stacks; on large meshes the natural recursion depth
//! is unbounded.

use log::debug;
use smallvec::SmallVec;

use crate::constraint::{Constraint, CONSTRAINT_INDEX_MAX};
use crate::error::{Result, TinError};
use crate::mesh::{EdgeIndex, VertexIndex};
use crate::vertex::{MeshVertex, Vertex, BIT_CONSTRAINT, BIT_SYNTHETIC};

use super::IncrementalTin;

/// An ear of a cavity polygon under refill: edges `c` from `v0` to
/// `v1` and `n` from `v1` to `v2`, ring-linked through vector indices.
#[derive(Debug, Clone)]
struct FillEar {
    c: EdgeIndex,
    n: EdgeIndex,
    v0: VertexIndex,
    v1: VertexIndex,
    v2: VertexIndex,
    score: f64,
    prior: usize,
    next: usize,
}

impl IncrementalTin {
    /// Add constraints to the mesh, forming a constrained Delaunay
    /// triangulation.
    ///
    /// The mesh is locked against vertex addition and removal once
    /// this method runs; it may be called at most once per instance.
    /// When `restore_conformity` is set, constrained edges violating
    /// the local Delaunay criterion are subdivided with synthetic
    /// midpoint vertices until the triangulation conforms.
    pub fn add_constraints(
        &mut self,
        constraints: Vec<Constraint>,
        restore_conformity: bool,
    ) -> Result<()> {
        if self.locked {
            return Err(if self.disposed {
                TinError::Disposed
            } else if !self.constraints.is_empty() {
                TinError::ConstraintsAlreadyAdded
            } else {
                TinError::Locked
            });
        }
        if constraints.is_empty() {
            return Ok(());
        }
        if constraints.len() > CONSTRAINT_INDEX_MAX {
            return Err(TinError::TooManyConstraints {
                given: constraints.len(),
                max: CONSTRAINT_INDEX_MAX,
            });
        }

        // validate before mutating anything
        let mut constraints = constraints;
        for (i, c) in constraints.iter_mut().enumerate() {
            c.complete();
            if c.vertices().len() < 2 {
                return Err(TinError::InvalidConstraint { index: i });
            }
        }

        // Phase 1: insert every constraint vertex
        for c in &constraints {
            let list: Vec<Vertex> = c.vertices().to_vec();
            self.add_all(&list, None)?;
        }
        self.constraints = constraints;
        self.locked = true;

        // Phase 2: realize the constraint edges
        let mut found_data_area = false;
        for k in 0..self.constraints.len() {
            if self.constraints[k].defines_data_area() {
                found_data_area = true;
            }
            self.constraints[k].set_constraint_index(k);
            self.process_constraint(k)?;
        }
        debug!("processed {} constraints", self.constraints.len());

        // Phase 3: restore conformity by subdividing constrained edges
        if restore_conformity {
            let snapshot: Vec<EdgeIndex> = self.pool.pairs().collect();
            for e in snapshot {
                if self.pool.is_constrained(e) {
                    self.restore_conformity_from(e);
                }
            }
        }

        // Phase 4: flood data-area membership
        if found_data_area {
            self.fill_constraint_data_areas();
        }
        Ok(())
    }

    fn set_constrained_edge(&mut self, e: EdgeIndex, k: usize, defines_area: bool) {
        self.pool.set_constrained(e, k);
        if defines_area {
            self.pool.set_area_member_flag(e);
        }
    }

    /// Realize one constraint's segments in the mesh.
    fn process_constraint(&mut self, k: usize) -> Result<()> {
        let defines_area = self.constraints[k].defines_data_area();
        let mut cv: Vec<Vertex> = self.constraints[k].vertices().to_vec();
        let v_tol = self.geo.thresholds().vertex_tolerance();

        // locate an edge whose origin is the first constraint vertex
        let first = cv[0];
        let start = self.search_start();
        let se = self
            .walker
            .find_enclosing(&self.pool, &self.vertices, start, first.x, first.y);
        let mut e0 = if self.represents(self.pool.a(se), &first) {
            se
        } else if self.represents(self.pool.b(se), &first) {
            se.dual()
        } else if self.represents(self.pool.a(self.pool.reverse(se)), &first) {
            self.pool.reverse(se)
        } else {
            return Err(TinError::InternalFailure {
                details: "constraint vertex not found in mesh",
            });
        };
        cv[0] = self.occupant_vertex(self.pool.a(e0).expect("constraint origin is real"));

        // processing changes the mesh; the cached search edge cannot
        // be trusted afterwards
        self.search_edge = None;

        let mut i_seg = 0usize;
        'segment: while i_seg + 1 < cv.len() {
            let v0 = cv[i_seg];
            let v1 = cv[i_seg + 1];
            let v0_idx = self.pool.a(e0).expect("segment origin is real");

            // Pinwheel around v0: the segment may already exist as an
            // edge. If the pinwheel crosses the hull, remember the
            // re-entry edge so the straddle search below starts inside
            // the mesh.
            {
                let mut prior_null = false;
                let mut re_entry: Option<EdgeIndex> = None;
                let mut e = e0;
                loop {
                    match self.pool.b(e) {
                        None => {
                            prior_null = true;
                        }
                        Some(bi) => {
                            if self.vertices[bi.index()].represents(&v1) {
                                cv[i_seg + 1] = self.occupant_vertex(bi);
                                self.set_constrained_edge(e, k, defines_area);
                                e0 = e.dual();
                                i_seg += 1;
                                continue 'segment;
                            }
                            if prior_null {
                                re_entry = Some(e);
                            }
                            prior_null = false;
                        }
                    }
                    e = self.pool.dual_from_reverse(e);
                    if e == e0 {
                        break;
                    }
                }
                if let Some(re) = re_entry {
                    e0 = re;
                }
            }

            let x0 = v0.x;
            let y0 = v0.y;
            let mut ux = v1.x - x0;
            let mut uy = v1.y - y0;
            let u = (ux * ux + uy * uy).sqrt();
            if u == 0.0 {
                return Err(TinError::InternalFailure {
                    details: "zero-length constraint segment",
                });
            }
            ux /= u;
            uy /= u;
            let px = -uy;
            let py = ux;

            // pre-test the first pinwheel edge for collinearity with
            // the segment
            let b0 = self.pool.b(e0).expect("re-entry edge is interior");
            let (b0x, b0y) = self.coords_of(b0);
            let mut bx = b0x - x0;
            let mut by = b0y - y0;
            let mut bh = bx * px + by * py;
            if bh.abs() <= v_tol && bx * ux + by * uy > 0.0 {
                // edge e0 runs along the segment: splice its far
                // vertex into the constraint and take the sub-segment
                cv.insert(i_seg + 1, self.occupant_vertex(b0));
                self.set_constrained_edge(e0, k, defines_area);
                e0 = e0.dual();
                i_seg += 1;
                continue 'segment;
            }

            // pinwheel for the triangle whose opposite edge straddles
            // the segment
            let mut ax;
            let mut ay;
            let mut ah;
            let mut straddle: Option<(EdgeIndex, EdgeIndex, EdgeIndex)> = None;
            let mut e = e0;
            loop {
                ax = bx;
                ay = by;
                ah = bh;
                let n = self.pool.forward(e); // the edge opposite v0
                let bi = self.pool.b(n).ok_or(TinError::InternalFailure {
                    details: "constraint straddle search crossed the hull",
                })?;
                let (bix, biy) = self.coords_of(bi);
                bx = bix - x0;
                by = biy - y0;
                bh = bx * px + by * py;
                if bh.abs() <= v_tol {
                    // the pinwheel's far vertex lies on the segment
                    // line; splice it in if the crossing is ahead of v0
                    let dx = bx - ax;
                    let dy = by - ay;
                    let t = (ax * dy - ay * dx) / (ux * dy - uy * dx);
                    if t > 0.0 {
                        cv.insert(i_seg + 1, self.occupant_vertex(bi));
                        let r = self.pool.reverse(e); // (b, v0)
                        self.set_constrained_edge(r.dual(), k, defines_area);
                        e0 = r;
                        i_seg += 1;
                        continue 'segment;
                    }
                }

                // does the edge (a, b) straddle the segment ahead of v0?
                if ah * bh <= 0.0 {
                    let dx = bx - ax;
                    let dy = by - ay;
                    let t = (ax * dy - ay * dx) / (ux * dy - uy * dx);
                    if t > 0.0 {
                        straddle = Some((
                            self.pool.forward(e).dual(),
                            e,
                            self.pool.reverse(e),
                        ));
                        break;
                    }
                }
                e = self.pool.dual_from_reverse(e);
                if e == e0 {
                    break;
                }
            }

            let (mut h, right0, left0) = straddle.ok_or(TinError::InternalFailure {
                details: "constraint straddle not found",
            })?;

            // carve the channel: remove straddled edges, tracking the
            // cavity walls on either side, until a vertex on the
            // segment (normally v1) is reached
            let c_final;
            let mut right1;
            let mut left1;
            loop {
                right1 = self.pool.forward(h);
                left1 = self.pool.reverse(h);
                let ci = self.pool.b(right1).ok_or(TinError::InternalFailure {
                    details: "constraint carve crossed the hull",
                })?;
                self.remove_straddled_edge(h);
                let (cix, ciy) = self.coords_of(ci);
                let cx = cix - x0;
                let cy = ciy - y0;
                let ch = cx * px + cy * py;
                if ch.abs() < v_tol && cx * ux + cy * uy > 0.0 {
                    // the far vertex lies on the segment: end the
                    // carve here and record it in the constraint
                    if self.vertices[ci.index()].represents(&v1) {
                        cv[i_seg + 1] = self.occupant_vertex(ci);
                    } else {
                        cv.insert(i_seg + 1, self.occupant_vertex(ci));
                    }
                    c_final = ci;
                    break;
                }

                let hac = ah * ch;
                let hbc = bh * ch;
                if hac == 0.0 || hbc == 0.0 {
                    return Err(TinError::InternalFailure {
                        details: "constraint carve produced a degenerate crossing",
                    });
                }
                if hac < 0.0 {
                    // branch right: c joins the left wall
                    h = right1.dual();
                    bh = ch;
                } else {
                    // branch left: c joins the right wall
                    h = left1.dual();
                    ah = ch;
                }
            }

            // insert the constraint edge and seal the two cavities
            let n = self.pool.allocate_edge(Some(v0_idx), Some(c_final));
            self.set_constrained_edge(n, k, defines_area);
            let d = n.dual();
            self.pool.set_forward(n, left1);
            self.pool.set_reverse(n, left0);
            self.pool.set_forward(d, right0);
            self.pool.set_reverse(d, right1);
            e0 = d;

            self.fill_cavity(n)?;
            self.fill_cavity(d)?;
            i_seg += 1;
        }

        self.constraints[k].replace_vertices(cv);
        Ok(())
    }

    fn represents(&self, v: Option<VertexIndex>, target: &Vertex) -> bool {
        v.map(|vi| self.vertices[vi.index()].represents(target))
            .unwrap_or(false)
    }

    fn occupant_vertex(&self, vi: VertexIndex) -> Vertex {
        self.vertices[vi.index()].to_vertex()
    }

    /// Unlink a straddled edge from the mesh, patching the cavity
    /// walls on both sides, and deallocate it.
    fn remove_straddled_edge(&mut self, e: EdgeIndex) {
        let d = e.dual();
        let dr = self.pool.reverse(d);
        let df = self.pool.forward(d);
        let ef = self.pool.forward(e);
        let er = self.pool.reverse(e);
        self.pool.set_forward(dr, ef);
        self.pool.set_reverse(df, er);
        self.pool.deallocate_edge(e);
    }

    /// Refill one cavity left by the carve. The cavity boundary is
    /// the forward cycle of `cavity_edge`; every boundary edge is
    /// either Delaunay or constrained.
    fn fill_cavity(&mut self, cavity_edge: EdgeIndex) -> Result<()> {
        // build the ear ring around the cavity polygon
        let mut ears: SmallVec<[FillEar; 16]> = SmallVec::new();
        let p_start = cavity_edge;
        let mut c = cavity_edge;
        let mut n = self.pool.forward(c);
        loop {
            ears.push(FillEar {
                c,
                n,
                v0: self.pool.a(c).expect("cavity vertices are interior"),
                v1: self.pool.b(c).expect("cavity vertices are interior"),
                v2: self.pool.b(n).expect("cavity vertices are interior"),
                score: 0.0,
                prior: ears.len().wrapping_sub(1),
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
            return Ok(());
        }

        for i in 0..n_ear {
            ears[i].score = self.fill_score(&ears, i);
        }

        let mut new_edges: Vec<EdgeIndex> = Vec::new();
        let mut first = 0usize;
        loop {
            let mut ear_min: Option<usize> = None;
            let mut min_score = f64::INFINITY;
            let mut i = first;
            loop {
                if ears[i].score < min_score && ears[i].score > 0.0 {
                    min_score = ears[i].score;
                    ear_min = Some(i);
                }
                i = ears[i].next;
                if i == first {
                    break;
                }
            }
            let em = ear_min.ok_or(TinError::InternalFailure {
                details: "cavity fill could not identify an ear to close",
            })?;

            let prior = ears[em].prior;
            let next = ears[em].next;
            let e = self
                .pool
                .allocate_edge(Some(ears[em].v2), Some(ears[em].v0));
            let d = e.dual();
            self.pool.set_forward(e, ears[em].c);
            self.pool.set_reverse(e, ears[em].n);
            self.pool.set_forward(d, ears[next].n);
            self.pool.set_reverse(d, ears[prior].c);
            new_edges.push(e);

            // with four ears left, the new edge closes the remaining
            // quadrilateral
            if n_ear == 4 {
                break;
            }

            ears[prior].next = next;
            ears[next].prior = prior;
            ears[prior].v2 = ears[em].v2;
            ears[prior].n = d;
            ears[next].c = d;
            ears[next].v0 = ears[em].v0;
            ears[prior].score = self.fill_score(&ears, prior);
            ears[next].score = self.fill_score(&ears, next);

            first = prior;
            n_ear -= 1;
        }

        // bounded Lawson flip pass restoring the Delaunay criterion on
        // the interior cavity edges; constrained edges are never
        // candidates because only the newly created edges are examined
        let k2 = new_edges.len() * new_edges.len();
        for _ in 0..k2 {
            let mut flipped = 0;
            for &n in &new_edges {
                let d = n.dual();
                let nf = self.pool.forward(n);
                let df = self.pool.forward(d);
                let a = self.pool.a(n).expect("cavity edges are interior");
                let b = self.pool.b(n).expect("cavity edges are interior");
                let c = self.pool.b(nf).expect("cavity edges are interior");
                let t = self.pool.b(df).expect("cavity edges are interior");
                let (ax, ay) = self.coords_of(a);
                let (bx, by) = self.coords_of(b);
                let (cx, cy) = self.coords_of(c);
                let (tx, ty) = self.coords_of(t);
                let hv = self.geo.in_circle(ax, ay, bx, by, cx, cy, tx, ty);
                if hv > 0.0 {
                    flipped += 1;
                    let nr = self.pool.reverse(n);
                    let dr = self.pool.reverse(d);
                    self.pool.set_vertices(n, Some(t), Some(c));
                    self.pool.set_forward(n, nr);
                    self.pool.set_reverse(n, df);
                    self.pool.set_forward(d, dr);
                    self.pool.set_reverse(d, nf);
                    self.pool.set_forward(dr, nf);
                    self.pool.set_forward(nr, df);
                }
            }
            if flipped == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Score a fill ear: its signed area, or infinity when another
    /// cavity vertex lies inside the candidate triangle (which
    /// suppresses the ear until the offender is consumed).
    fn fill_score(&mut self, ears: &[FillEar], target: usize) -> f64 {
        let ear = &ears[target];
        let (x0, y0) = self.coords_of(ear.v0);
        let (x1, y1) = self.coords_of(ear.v1);
        let (x2, y2) = self.coords_of(ear.v2);
        let area = self.geo.area(x0, y0, x1, y1, x2, y2);
        if area > 0.0 {
            let mut i = ear.next;
            while i != ear.prior {
                let w = ears[i].v2;
                if w != ear.v0 && w != ear.v1 && w != ear.v2 {
                    let (wx, wy) = self.coords_of(w);
                    if self.geo.half_plane(x0, y0, x1, y1, wx, wy) >= 0.0
                        && self.geo.half_plane(x1, y1, x2, y2, wx, wy) >= 0.0
                        && self.geo.half_plane(x2, y2, x0, y0, wx, wy) >= 0.0
                    {
                        return f64::INFINITY;
                    }
                }
                i = ears[i].next;
            }
        }
        area
    }

    /// Restore local Delaunay conformity starting from a constrained
    /// edge, subdividing constrained edges and flipping unconstrained
    /// ones. Iterative with an explicit work stack.
    fn restore_conformity_from(&mut self, first: EdgeIndex) {
        let mut stack: Vec<EdgeIndex> = vec![first];
        while let Some(ab) = stack.pop() {
            let ba = ab.dual();
            let bc = self.pool.forward(ab);
            let ad = self.pool.forward(ba);
            let (a, b, c, d) = match (
                self.pool.a(ab),
                self.pool.b(ab),
                self.pool.b(bc),
                self.pool.b(ad),
            ) {
                (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
                _ => continue,
            };
            let (ax, ay) = self.coords_of(a);
            let (bx, by) = self.coords_of(b);
            let (cx, cy) = self.coords_of(c);
            let (dx, dy) = self.coords_of(d);
            let h = self.geo.in_circle(ax, ay, bx, by, cx, cy, dx, dy);
            if h <= 0.0 {
                continue;
            }

            let ca = self.pool.reverse(ab);
            let db = self.pool.reverse(ba);

            if self.pool.is_constrained(ab) {
                // subdivide the constraint edge at its midpoint to
                // restore conformity
                let mz = (self.vertices[a.index()].z() + self.vertices[b.index()].z()) / 2.0;
                let mut m = Vertex::new(
                    (ax + bx) / 2.0,
                    (ay + by) / 2.0,
                    mz,
                    self.n_synthetic_vertices,
                );
                m.set_status(BIT_SYNTHETIC | BIT_CONSTRAINT);
                self.n_synthetic_vertices += 1;
                let mi = self.add_occupant(MeshVertex::Single(m));

                // reuse the pair ab as the m->b half of the split
                let mb = ab;
                let bm = ba;
                self.pool.set_vertices(mb, Some(mi), Some(b));

                let am = self.pool.allocate_edge(Some(a), Some(mi));
                let cm = self.pool.allocate_edge(Some(c), Some(mi));
                let dm = self.pool.allocate_edge(Some(d), Some(mi));
                let ma = am.dual();
                let mc = cm.dual();
                let md = dm.dual();

                // the a->m half carries the constraint state of the
                // edge it subdivides
                self.pool.copy_constraint_state(mb, am);

                self.pool.set_forward(ma, ad);
                self.pool.set_forward(ad, dm);
                self.pool.set_forward(dm, ma);

                self.pool.set_forward(mb, bc);
                self.pool.set_forward(bc, cm);
                self.pool.set_forward(cm, mb);

                self.pool.set_forward(mc, ca);
                self.pool.set_forward(ca, am);
                self.pool.set_forward(am, mc);

                self.pool.set_forward(md, db);
                self.pool.set_forward(db, bm);
                self.pool.set_forward(bm, md);

                stack.push(db.dual());
                stack.push(ad.dual());
                stack.push(ca.dual());
                stack.push(bc.dual());
                stack.push(mb);
                stack.push(am);
            } else {
                // unconstrained: an ordinary flip restores Delaunay
                self.pool.set_vertices(ab, Some(d), Some(c));
                self.pool.set_reverse(ab, ad);
                self.pool.set_forward(ab, ca);
                self.pool.set_reverse(ba, bc);
                self.pool.set_forward(ba, db);
                self.pool.set_forward(ca, ad);
                self.pool.set_forward(db, bc);

                stack.push(db.dual());
                stack.push(ad.dual());
                stack.push(ca.dual());
                stack.push(bc.dual());
            }
        }
    }

    /// Flood the interior of each data-area constraint, tagging every
    /// enclosed edge pair with the owning constraint index.
    fn fill_constraint_data_areas(&mut self) {
        let mut stack: Vec<EdgeIndex> = Vec::new();
        let seeds: Vec<EdgeIndex> = self.pool.pairs().collect();
        for e in seeds {
            for side in [e, e.dual()] {
                if self.pool.is_area_edge(side) && self.pool.is_area_on_this_side(side) {
                    stack.push(side);
                }
            }
        }
        while let Some(e) = stack.pop() {
            let index = self.pool.constraint_index(e);
            let f = self.pool.forward(e);
            if !self.pool.is_area_member(f) {
                self.pool.set_area_member_flag(f);
                self.pool.set_constraint_index(f, index);
                stack.push(f.dual());
            }
            let r = self.pool.reverse(e);
            if !self.pool.is_area_member(r) {
                self.pool.set_area_member_flag(r);
                self.pool.set_constraint_index(r, index);
                stack.push(r.dual());
            }
        }
    }
}
