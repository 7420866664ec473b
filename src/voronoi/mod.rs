//! Bounded Voronoi (Thiessen) diagrams.
//!
//! A true Voronoi diagram covers the whole plane; this builder
//! produces the restriction of the diagram to a rectangular domain.
//! The construction is the dual of the Delaunay triangulation:
//!
//! 1. Every non-ghost triangle contributes its circumcircle center,
//!    shared by the triangle's three edges.
//! 2. Every interior triangulation edge contributes the segment
//!    between its two adjacent circumcenters, clipped to the domain
//!    with Liang-Barsky. Synthetic clip endpoints are stamped with a
//!    border parameter in `[0, 4)` running bottom, right, top, left.
//! 3. Every hull edge contributes an outward perpendicular ray from
//!    its triangle's circumcenter, clipped to the domain boundary.
//! 4. Per site, the dual pinwheel is threaded into a closed loop,
//!    inserting synthetic border edges (and corner vertices, walking
//!    corner to corner) wherever consecutive pieces end on the
//!    domain boundary.
//!
//! Sites on the convex hull produce polygons marked open; all others
//! are closed. The polygon containing a query point is simply the one
//! whose site is nearest, by the definition of the diagram.

mod polygon;

pub use polygon::ThiessenPolygon;

use log::debug;

use crate::error::{Result, TinError};
use crate::geometry::{Circumcircle, Rect};
use crate::mesh::{EdgeIndex, EdgePool, VertexIndex};
use crate::tin::IncrementalTin;
use crate::vertex::Vertex;
use nalgebra::Point2;

/// Options governing the construction of a [`BoundedVoronoi`].
#[derive(Debug, Clone)]
pub struct BoundedVoronoiOptions {
    /// The clipping domain. When `None`, the sample bounds expanded by
    /// one quarter of the mean triangulation edge length are used.
    /// When given, the rectangle must contain the sample bounds.
    pub bounds: Option<Rect>,
    /// Accept the perimeter-triangle collapse adjustment. The
    /// adjustment itself is a presentation-side concern and is not
    /// applied by this builder; the flag and threshold are carried for
    /// callers that post-process the triangulation.
    pub enable_adjustments: bool,
    /// Threshold for the perimeter-triangle collapse adjustment.
    pub adjustment_threshold: f64,
    /// Accept a request for automatic color assignment over the site
    /// adjacency graph. Colorization is a presentation-side concern
    /// and is not applied by this builder; the flag is carried for
    /// callers that colorize the result.
    pub enable_automatic_color_assignment: bool,
}

impl Default for BoundedVoronoiOptions {
    fn default() -> Self {
        Self {
            bounds: None,
            enable_adjustments: false,
            adjustment_threshold: 0.05,
            enable_automatic_color_assignment: false,
        }
    }
}

/// A Voronoi diagram restricted to a rectangular domain.
#[derive(Debug)]
pub struct BoundedVoronoi {
    bounds: Rect,
    sample_bounds: Rect,
    pool: EdgePool,
    /// Vertices owned by the diagram: circumcenters, clip points,
    /// ray endpoints, and corner vertices.
    vertices: Vec<Vertex>,
    /// Arena indices of the circumcenter vertices.
    circle_list: Vec<VertexIndex>,
    polygons: Vec<ThiessenPolygon>,
    max_radius: f64,
}

impl BoundedVoronoi {
    /// Build a diagram from a set of sites.
    ///
    /// A Delaunay triangulation is constructed internally with a
    /// nominal point spacing estimated from the sample density.
    pub fn from_vertices(sites: &[Vertex], options: &BoundedVoronoiOptions) -> Result<Self> {
        if sites.len() < 3 {
            return Err(TinError::InsufficientVertices {
                needed: 3,
                given: sites.len(),
            });
        }
        let mut sample_bounds = Rect::empty();
        for s in sites {
            sample_bounds.add_point(s.x, s.y);
        }

        // estimate a nominal spacing assuming a roughly uniform
        // density; 0.866 reflects a regular hexagonal tessellation
        let area = sample_bounds.area();
        let mut spacing = (area / sites.len() as f64 / 0.866).sqrt();
        if !(spacing > 0.0) {
            spacing = 1.0;
        }
        let mut tin = IncrementalTin::with_nominal_point_spacing(spacing);
        tin.add_all(sites, None)?;
        if !tin.is_bootstrapped() {
            return Err(TinError::BootstrapFailure);
        }

        let mut diagram = Self::empty(sample_bounds);
        diagram.build_structure(&tin, options)?;
        tin.dispose();
        Ok(diagram)
    }

    /// Build a diagram from an existing triangulation, with default
    /// options.
    pub fn from_tin(tin: &IncrementalTin) -> Result<Self> {
        let sample_bounds = tin.bounds().ok_or(TinError::BootstrapFailure)?;
        if !tin.is_bootstrapped() {
            return Err(TinError::BootstrapFailure);
        }
        let mut diagram = Self::empty(sample_bounds);
        diagram.build_structure(tin, &BoundedVoronoiOptions::default())?;
        Ok(diagram)
    }

    fn empty(sample_bounds: Rect) -> Self {
        Self {
            bounds: sample_bounds,
            sample_bounds,
            pool: EdgePool::new(),
            vertices: Vec::new(),
            circle_list: Vec::new(),
            polygons: Vec::new(),
            max_radius: -1.0,
        }
    }

    fn add_vertex(&mut self, v: Vertex) -> VertexIndex {
        let idx = VertexIndex::new(self.vertices.len());
        self.vertices.push(v);
        idx
    }

    fn vx(&self, v: VertexIndex) -> &Vertex {
        &self.vertices[v.index()]
    }

    // ==================== Construction ====================

    fn build_structure(
        &mut self,
        tin: &IncrementalTin,
        options: &BoundedVoronoiOptions,
    ) -> Result<()> {
        let max_index = tin.pool.max_allocation_index();
        let mut visited = vec![false; max_index];
        let mut centers: Vec<Option<VertexIndex>> = vec![None; max_index];
        let mut parts: Vec<Option<EdgeIndex>> = vec![None; max_index];
        let perimeter = tin.perimeter();

        // circumcircle centers, one per non-ghost triangle, shared by
        // the triangle's three edges; also gather the mean edge length
        let mut sum_length = 0.0;
        let mut n_length = 0usize;
        for e in tin.pool.pairs() {
            if tin.pool.is_ghost(e) {
                visited[e.index()] = true;
                visited[e.dual().index()] = true;
                continue;
            }
            sum_length += tin.edge_length(e);
            n_length += 1;
            self.build_center(tin, e, &mut centers)?;
            self.build_center(tin, e.dual(), &mut centers)?;
        }

        match options.bounds {
            None => {
                let margin = sum_length / n_length as f64 / 4.0;
                self.bounds = self.sample_bounds.expanded(margin);
            }
            Some(b) => {
                if !b.contains_rect(&self.sample_bounds) {
                    return Err(TinError::BoundsTooSmall);
                }
                self.bounds = b;
            }
        }

        // with the domain fixed, stamp each center with its border
        // parameter (NaN when interior) and its clipping outcode
        for i in 0..self.circle_list.len() {
            let ci = self.circle_list[i];
            let (x, y) = (self.vx(ci).x, self.vx(ci).y);
            let z = self.compute_z(x, y);
            let outcode = self.compute_outcode(x, y);
            let v = &mut self.vertices[ci.index()];
            v.z = z;
            v.set_color_index(outcode);
        }

        // perimeter edges give rise to rays outward from the
        // circumcenter, clipped to the domain boundary
        for &p in &perimeter {
            visited[p.index()] = true;
            visited[p.dual().index()] = true;
            self.build_perimeter_ray(tin, p, &centers, &mut parts);
        }

        // interior edges become segments between adjacent centers
        for e in tin.pool.pairs() {
            if visited[e.index()] || visited[e.dual().index()] {
                continue;
            }
            visited[e.index()] = true;
            visited[e.dual().index()] = true;
            self.build_part(e, &centers, &mut parts);
        }

        // polygon assembly: ghost edges are excluded, then the open
        // (hull-site) polygons are built from the perimeter, and all
        // remaining sites produce closed polygons
        visited.fill(false);
        for &e in &perimeter {
            let f = tin.pool.forward_from_dual(e);
            visited[f.index()] = true;
            visited[f.dual().index()] = true;
        }
        for &e in &perimeter {
            if !visited[e.index()] {
                self.build_polygon(tin, e, &mut visited, &parts, true);
            }
        }
        for e in tin.pool.pairs() {
            for side in [e, e.dual()] {
                if tin.pool.a(side).is_none() {
                    visited[side.index()] = true;
                } else if !visited[side.index()] {
                    self.build_polygon(tin, side, &mut visited, &parts, false);
                }
            }
        }
        debug!(
            "bounded voronoi: {} polygons, {} edges, {} centers",
            self.polygons.len(),
            self.pool.size(),
            self.circle_list.len()
        );
        Ok(())
    }

    /// Compute the circumcircle of the triangle to the left of `e` and
    /// record its center under all three edge indices of the triangle.
    fn build_center(
        &mut self,
        tin: &IncrementalTin,
        e: EdgeIndex,
        centers: &mut [Option<VertexIndex>],
    ) -> Result<()> {
        if centers[e.index()].is_some() {
            return Ok(());
        }
        let f = tin.pool.forward(e);
        let apex = match tin.pool.b(f) {
            Some(c) => c,
            None => return Ok(()), // ghost triangle
        };
        let r = tin.pool.reverse(e);
        let (ax, ay) = tin.coords_of(tin.pool.a(e).expect("non-ghost edge"));
        let (bx, by) = tin.coords_of(tin.pool.b(e).expect("non-ghost edge"));
        let (cx, cy) = tin.coords_of(apex);
        let circle = Circumcircle::from_points(
            Point2::new(ax, ay),
            Point2::new(bx, by),
            Point2::new(cx, cy),
        )
        .ok_or(TinError::InternalFailure {
            details: "triangle does not yield a circumcircle",
        })?;

        // the diagnostic index of a center is the smallest edge index
        // of its triangle
        let mindex = e.index().min(f.index()).min(r.index());
        let v = Vertex::new(circle.center.x, circle.center.y, f64::NAN, mindex);
        let vi = self.add_vertex(v);
        centers[e.index()] = Some(vi);
        centers[f.index()] = Some(vi);
        centers[r.index()] = Some(vi);
        self.circle_list.push(vi);
        if circle.radius > self.max_radius {
            self.max_radius = circle.radius;
        }
        Ok(())
    }

    /// The Cohen-Sutherland style outcode of a point relative to the
    /// domain, with points on a border carrying that border's bit.
    fn compute_outcode(&self, x: f64, y: f64) -> u8 {
        let mut code = 0u8;
        if x <= self.bounds.x_min {
            code = 0b0001;
        } else if x >= self.bounds.x_max {
            code = 0b0010;
        }
        if y <= self.bounds.y_min {
            code |= 0b0100;
        } else if y >= self.bounds.y_max {
            code |= 0b1000;
        }
        code
    }

    /// The border parameter of a point lying on the domain boundary,
    /// in `[0, 4)` running bottom, right, top, left; NaN for interior
    /// points.
    fn compute_z(&self, x: f64, y: f64) -> f64 {
        let b = &self.bounds;
        if y == b.y_min {
            if b.x_min <= x && x <= b.x_max {
                return (x - b.x_min) / b.width();
            }
        } else if x == b.x_max {
            if b.y_min <= y && y <= b.y_max {
                return 1.0 + (y - b.y_min) / b.height();
            }
        } else if y == b.y_max {
            if b.x_min <= x && x <= b.x_max {
                return 3.0 - (x - b.x_min) / b.width();
            }
        } else if x == b.x_min && b.y_min <= y && y <= b.y_max {
            return 4.0 - (y - b.y_min) / b.height();
        }
        f64::NAN
    }

    /// The border parameter of a point known to lie on the given
    /// border (0 bottom, 1 right, 2 top, 3 left).
    fn border_z(&self, border: usize, x: f64, y: f64) -> f64 {
        let b = &self.bounds;
        match border {
            0 => (x - b.x_min) / b.width(),
            1 => 1.0 + (y - b.y_min) / b.height(),
            2 => 3.0 - (x - b.x_min) / b.width(),
            _ => 4.0 - (y - b.y_min) / b.height(),
        }
    }

    /// The Voronoi piece dual to the interior triangulation edge `e`:
    /// the segment between the two adjacent circumcenters, clipped to
    /// the domain.
    fn build_part(
        &mut self,
        e: EdgeIndex,
        centers: &[Option<VertexIndex>],
        parts: &mut [Option<EdgeIndex>],
    ) {
        let d = e.dual();
        let v0 = match centers[d.index()] {
            Some(v) => v,
            None => return, // ghost triangle
        };
        let v1 = match centers[e.index()] {
            Some(v) => v,
            None => return,
        };
        // trivial rejection: both centers beyond the same border, which
        // also rejects pieces lying exactly along a border
        if self.vx(v0).color_index() & self.vx(v1).color_index() != 0 {
            return;
        }
        if let Some(n) = self.liang_barsky(v0, v1) {
            parts[e.index()] = Some(n);
            parts[d.index()] = Some(n.dual());
        }
    }

    /// Clip the segment from `v0` to `v1` to the domain with the
    /// Liang-Barsky algorithm, allocating an edge for the surviving
    /// piece. Synthetic endpoints are stamped with their border
    /// parameter. Returns `None` when nothing survives.
    fn liang_barsky(&mut self, v0: VertexIndex, v1: VertexIndex) -> Option<EdgeIndex> {
        let (x0, y0) = (self.vx(v0).x, self.vx(v0).y);
        let (x1, y1) = (self.vx(v1).x, self.vx(v1).y);
        let x_delta = x1 - x0;
        let y_delta = y1 - y0;

        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        let mut border0: i32 = -1;
        let mut border1: i32 = -1;

        for border in 0..4 {
            let (p, q) = match border {
                0 => (-y_delta, -(self.bounds.y_min - y0)),
                1 => (x_delta, self.bounds.x_max - x0),
                2 => (y_delta, self.bounds.y_max - y0),
                _ => (-x_delta, -(self.bounds.x_min - x0)),
            };
            if p == 0.0 {
                // parallel to this border: outside if q is negative
                if q < 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    if r > t1 {
                        return None;
                    } else if r > t0 {
                        t0 = r;
                        border0 = border as i32;
                    }
                } else if r < t0 {
                    return None;
                } else if r < t1 {
                    t1 = r;
                    border1 = border as i32;
                }
            }
        }

        let p0 = if border0 < 0 {
            v0
        } else {
            let x = x0 + t0 * x_delta;
            let y = y0 + t0 * y_delta;
            let z = self.border_z(border0 as usize, x, y);
            let mut v = Vertex::new(x, y, z, self.vx(v0).index());
            v.set_synthetic(true);
            self.add_vertex(v)
        };
        let p1 = if border1 < 0 {
            v1
        } else {
            let x = x0 + t1 * x_delta;
            let y = y0 + t1 * y_delta;
            let z = self.border_z(border1 as usize, x, y);
            let mut v = Vertex::new(x, y, z, self.vx(v1).index());
            v.set_synthetic(true);
            self.add_vertex(v)
        };
        Some(self.pool.allocate_edge(Some(p0), Some(p1)))
    }

    /// The Voronoi piece dual to a hull edge: a ray from the interior
    /// triangle's circumcenter, perpendicular to the hull edge and
    /// directed outward, clipped to the domain boundary.
    fn build_perimeter_ray(
        &mut self,
        tin: &IncrementalTin,
        e: EdgeIndex,
        centers: &[Option<VertexIndex>],
        parts: &mut [Option<EdgeIndex>],
    ) {
        let center = match centers[e.index()] {
            Some(c) => c,
            None => return,
        };
        let (ax, ay) = tin.coords_of(tin.pool.a(e).expect("hull edge"));
        let (bx, by) = tin.coords_of(tin.pool.b(e).expect("hull edge"));

        // the hull interior lies to the left of e, so the outward
        // perpendicular of the direction (ex, ey) is (ey, -ex)
        let ex = bx - ax;
        let ey = by - ay;
        let u = (ex * ex + ey * ey).sqrt();
        let ux = ey / u;
        let uy = -ex / u;
        let cx = self.vx(center).x;
        let cy = self.vx(center).y;

        // find the first boundary the ray meets; a ray parallel to an
        // axis meets only one boundary
        let mut tx = f64::INFINITY;
        let mut ty = f64::INFINITY;
        if ux < 0.0 {
            tx = (self.bounds.x_min - cx) / ux;
        } else if ux > 0.0 {
            tx = (self.bounds.x_max - cx) / ux;
        }
        if uy < 0.0 {
            ty = (self.bounds.y_min - cy) / uy;
        } else if uy > 0.0 {
            ty = (self.bounds.y_max - cy) / uy;
        }

        let (x, y, z);
        if tx < ty {
            // the ray exits through a vertical border
            let xb = if ux < 0.0 {
                self.bounds.x_min
            } else {
                self.bounds.x_max
            };
            let yb = tx * uy + cy;
            let s = (yb - self.bounds.y_min) / self.bounds.height();
            z = if ux < 0.0 { 4.0 - s } else { 1.0 + s };
            x = xb;
            y = yb;
        } else {
            // the ray exits through a horizontal border
            let yb = if uy < 0.0 {
                self.bounds.y_min
            } else {
                self.bounds.y_max
            };
            let xb = ty * ux + cx;
            let s = (xb - self.bounds.x_min) / self.bounds.width();
            z = if uy < 0.0 { s } else { 3.0 - s };
            x = xb;
            y = yb;
        }

        let mut v_out = Vertex::new(x, y, z, self.vx(center).index());
        v_out.set_synthetic(true);
        let out = self.add_vertex(v_out);

        // from the boundary inward to the center
        let n = self.pool.allocate_edge(Some(out), Some(center));
        parts[e.index()] = Some(n);
        parts[e.dual().index()] = Some(n.dual());
    }

    /// Assemble the polygon of the site at the origin of `e` by
    /// walking its dual pinwheel and linking consecutive pieces.
    fn build_polygon(
        &mut self,
        tin: &IncrementalTin,
        e: EdgeIndex,
        visited: &mut [bool],
        parts: &[Option<EdgeIndex>],
        open: bool,
    ) {
        let hub = tin
            .edge_a(e)
            .expect("polygon hub is a real vertex")
            .to_vertex();
        let mut scratch: Vec<EdgeIndex> = Vec::new();
        let mut first: Option<EdgeIndex> = None;
        let mut prior: Option<EdgeIndex> = None;
        for p in tin.pool.pinwheel(e) {
            visited[p.index()] = true;
            // a missing piece is a discontinuity from clipping or from
            // the ghost spokes of a hull site; links complete at the
            // next valid piece
            let q = match parts[p.index()] {
                Some(q) => q,
                None => continue,
            };
            match prior {
                None => {
                    first = Some(q);
                    prior = Some(q);
                }
                Some(pr) => {
                    self.link_edges(pr, q, &mut scratch);
                    prior = Some(q);
                }
            }
        }
        let (first, prior) = match (first, prior) {
            (Some(f), Some(p)) => (f, p),
            _ => return, // no surviving pieces, no polygon
        };
        self.link_edges(prior, first, &mut scratch);

        let area = self.ring_area(&scratch);
        self.polygons
            .push(ThiessenPolygon::new(hub, scratch, open, area));
    }

    /// Link `prior` to `q`, inserting synthetic border edges (and
    /// corner-to-corner edges) when the junction runs along the domain
    /// boundary. Appends `q` (and any synthetic edges) to the scratch
    /// list.
    fn link_edges(&mut self, prior: EdgeIndex, q: EdgeIndex, scratch: &mut Vec<EdgeIndex>) {
        let mut prior = prior;
        let mut v0 = self.pool.b(prior).expect("voronoi edges are real");
        let v1 = self.pool.a(q).expect("voronoi edges are real");
        let z0 = self.vx(v0).z;
        let z1 = self.vx(v1).z;
        if z0.is_nan() {
            // interior junction: the endpoints are the same center
            scratch.push(q);
            self.pool.set_forward(prior, q);
            return;
        }

        // nearly equal border parameters can arise from clipping
        // round-off; link directly
        let test = (z0 - z1).abs();
        if test < 1.0e-9 || test > 4.0 - 1.0e-9 {
            scratch.push(q);
            self.pool.set_forward(prior, q);
            return;
        }

        // thread along the boundary from z0 to z1, inserting one edge
        // per intervening corner; the parameter wraps at 4
        let i_last = z0.floor() as i64;
        let mut i_first = z1.floor() as i64;
        if i_first < i_last {
            i_first += 4;
        }
        for i in (i_last + 1)..=i_first {
            let (x, y) = match i & 0x03 {
                0 => (self.bounds.x_min, self.bounds.y_min),
                1 => (self.bounds.x_max, self.bounds.y_min),
                2 => (self.bounds.x_max, self.bounds.y_max),
                _ => (self.bounds.x_min, self.bounds.y_max),
            };
            let mut v = Vertex::new(x, y, f64::NAN, self.vertices.len());
            v.set_synthetic(true);
            let corner = self.add_vertex(v);
            let n = self.pool.allocate_edge(Some(v0), Some(corner));
            v0 = corner;
            scratch.push(n);
            self.pool.set_reverse(n, prior);
            prior = n;
        }

        let n = self.pool.allocate_edge(Some(v0), Some(v1));
        scratch.push(n);
        scratch.push(q);
        self.pool.set_reverse(n, prior);
        self.pool.set_reverse(q, n);
    }

    /// Shoelace area of an edge loop.
    fn ring_area(&self, edges: &[EdgeIndex]) -> f64 {
        let mut sum = 0.0;
        for &e in edges {
            let a = self.vx(self.pool.a(e).expect("voronoi edges are real"));
            let b = self.vx(self.pool.b(e).expect("voronoi edges are real"));
            sum += a.x * b.y - b.x * a.y;
        }
        (sum * 0.5).abs()
    }

    // ==================== Queries ====================

    /// The clipping domain of the diagram.
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The bounds of the input sample set.
    #[inline]
    pub fn sample_bounds(&self) -> Rect {
        self.sample_bounds
    }

    /// The polygons of the diagram, one per site.
    pub fn polygons(&self) -> &[ThiessenPolygon] {
        &self.polygons
    }

    /// The base side of every edge pair of the diagram.
    pub fn edges(&self) -> Vec<EdgeIndex> {
        self.pool.pairs().collect()
    }

    /// The site vertices of the diagram, one per polygon.
    pub fn vertices(&self) -> Vec<Vertex> {
        self.polygons.iter().map(|p| *p.vertex()).collect()
    }

    /// The circumcircle-center vertices created for the diagram.
    pub fn voronoi_vertices(&self) -> Vec<Vertex> {
        self.circle_list.iter().map(|&vi| *self.vx(vi)).collect()
    }

    /// The largest circumcircle radius observed during construction.
    #[inline]
    pub fn max_circumcircle_radius(&self) -> f64 {
        self.max_radius
    }

    /// The vertex at the origin of a diagram edge.
    pub fn edge_a(&self, e: EdgeIndex) -> &Vertex {
        self.vx(self.pool.a(e).expect("voronoi edges are real"))
    }

    /// The vertex at the terminus of a diagram edge.
    pub fn edge_b(&self, e: EdgeIndex) -> &Vertex {
        self.vx(self.pool.b(e).expect("voronoi edges are real"))
    }

    /// The polygon containing `(x, y)`: the one whose site is nearest.
    /// Returns `None` for points outside the diagram's domain.
    pub fn containing_polygon(&self, x: f64, y: f64) -> Option<&ThiessenPolygon> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let mut min_d = f64::INFINITY;
        let mut min_p = None;
        for p in &self.polygons {
            let d = p.vertex().distance_sq(x, y);
            if d < min_d {
                min_d = d;
                min_p = Some(p);
            }
        }
        min_p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64, id: usize) -> Vertex {
        Vertex::new(x, y, 0.0, id)
    }

    fn three_sites() -> Vec<Vertex> {
        vec![v(0.0, 0.0, 0), v(2.0, 0.0, 1), v(1.0, 2.0, 2)]
    }

    #[test]
    fn test_three_sites_all_open() {
        let sites = three_sites();
        let dia = BoundedVoronoi::from_vertices(&sites, &BoundedVoronoiOptions::default()).unwrap();
        let polygons = dia.polygons();
        assert_eq!(polygons.len(), 3);
        assert!(polygons.iter().all(ThiessenPolygon::is_open));

        // each site lies in its own polygon
        for s in &sites {
            let p = dia.containing_polygon(s.x, s.y).unwrap();
            assert_eq!(p.vertex().index(), s.index());
        }
    }

    #[test]
    fn test_three_sites_area_accounting() {
        let sites = three_sites();
        let dia = BoundedVoronoi::from_vertices(&sites, &BoundedVoronoiOptions::default()).unwrap();
        let total: f64 = dia.polygons().iter().map(ThiessenPolygon::area).sum();
        let expect = dia.bounds().area();
        assert!(
            (total - expect).abs() < 1e-9 * expect,
            "polygon areas {} do not cover the domain {}",
            total,
            expect
        );
    }

    #[test]
    fn test_grid_sites_interior_polygons_closed() {
        let mut sites = Vec::new();
        let mut id = 0;
        for i in 0..5 {
            for j in 0..5 {
                sites.push(v(i as f64, j as f64, id));
                id += 1;
            }
        }
        let dia = BoundedVoronoi::from_vertices(&sites, &BoundedVoronoiOptions::default()).unwrap();
        assert_eq!(dia.polygons().len(), 25);

        let n_open = dia.polygons().iter().filter(|p| p.is_open()).count();
        assert_eq!(n_open, 16); // the hull sites of a 5x5 grid

        // interior cells of a unit lattice are unit squares
        for p in dia.polygons().iter().filter(|p| !p.is_open()) {
            assert!((p.area() - 1.0).abs() < 1e-9);
        }

        let total: f64 = dia.polygons().iter().map(ThiessenPolygon::area).sum();
        let expect = dia.bounds().area();
        assert!((total - expect).abs() < 1e-9 * expect);
    }

    #[test]
    fn test_voronoi_duality() {
        let sites = vec![
            v(0.3, 0.1, 0),
            v(2.2, 0.4, 1),
            v(1.4, 1.9, 2),
            v(0.2, 2.3, 3),
            v(2.8, 2.6, 4),
            v(1.1, 0.9, 5),
        ];
        let dia = BoundedVoronoi::from_vertices(&sites, &BoundedVoronoiOptions::default()).unwrap();
        assert_eq!(dia.polygons().len(), sites.len());
        for s in &sites {
            let p = dia.containing_polygon(s.x, s.y).unwrap();
            assert_eq!(p.vertex().index(), s.index(), "site {} mislocated", s.index());
        }
    }

    #[test]
    fn test_explicit_bounds() {
        let sites = three_sites();
        let options = BoundedVoronoiOptions {
            bounds: Some(Rect::new(-1.0, -1.0, 3.0, 3.0)),
            ..BoundedVoronoiOptions::default()
        };
        let dia = BoundedVoronoi::from_vertices(&sites, &options).unwrap();
        assert_eq!(dia.bounds(), Rect::new(-1.0, -1.0, 3.0, 3.0));
        let total: f64 = dia.polygons().iter().map(ThiessenPolygon::area).sum();
        assert!((total - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_must_contain_samples() {
        let sites = three_sites();
        let options = BoundedVoronoiOptions {
            bounds: Some(Rect::new(0.5, 0.5, 3.0, 3.0)),
            ..BoundedVoronoiOptions::default()
        };
        assert!(matches!(
            BoundedVoronoi::from_vertices(&sites, &options),
            Err(TinError::BoundsTooSmall)
        ));
    }

    #[test]
    fn test_too_few_sites() {
        let sites = vec![v(0.0, 0.0, 0), v(1.0, 0.0, 1)];
        assert!(matches!(
            BoundedVoronoi::from_vertices(&sites, &BoundedVoronoiOptions::default()),
            Err(TinError::InsufficientVertices { needed: 3, given: 2 })
        ));
    }

    #[test]
    fn test_from_tin() {
        let mut tin = IncrementalTin::new();
        tin.add_all(&three_sites(), None).unwrap();
        let dia = BoundedVoronoi::from_tin(&tin).unwrap();
        assert_eq!(dia.polygons().len(), 3);
        // the source triangulation remains usable
        assert_eq!(tin.count_triangles().count(), 1);
    }

    #[test]
    fn test_outside_query_returns_none() {
        let dia =
            BoundedVoronoi::from_vertices(&three_sites(), &BoundedVoronoiOptions::default())
                .unwrap();
        let b = dia.bounds();
        assert!(dia.containing_polygon(b.x_max + 1.0, 0.0).is_none());
    }

    #[test]
    fn test_voronoi_vertices_are_circumcenters() {
        let dia =
            BoundedVoronoi::from_vertices(&three_sites(), &BoundedVoronoiOptions::default())
                .unwrap();
        // a single triangle yields a single circumcenter, equidistant
        // from all three sites
        let centers = dia.voronoi_vertices();
        assert_eq!(centers.len(), 1);
        let c = centers[0];
        let d0 = c.distance_sq(0.0, 0.0);
        let d1 = c.distance_sq(2.0, 0.0);
        let d2 = c.distance_sq(1.0, 2.0);
        assert!((d0 - d1).abs() < 1e-9);
        assert!((d0 - d2).abs() < 1e-9);
    }
}
