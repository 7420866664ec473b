//! # Delaunum
//!
//! An incremental 2D Delaunay triangulation engine with constrained
//! Delaunay (CDT) support and bounded Voronoi (Thiessen) diagrams.
//!
//! Delaunum maintains a triangulated irregular network (TIN) over a
//! planar point set under incremental insertion and removal, embeds
//! linear and polygon constraints, and derives the dual Voronoi
//! diagram clipped to a rectangular domain.
//!
//! ## Features
//!
//! - **Quad-edge topology**: compact, index-addressed edge pairs with
//!   O(1) dual lookup and an allocator that recycles storage
//! - **Robust predicates**: fast floating-point in-circle and
//!   half-plane tests with adaptive-precision fallback
//! - **Stochastic point location**: a randomized Lawson walk immune to
//!   the cycling that afflicts deterministic walks
//! - **Coincident-vertex merging**: near-duplicate samples collapse
//!   into merger groups with configurable z resolution
//! - **Constrained triangulation**: constraint polylines and data-area
//!   polygons, with optional conformity restoration
//! - **Bounded Voronoi diagrams**: per-site polygons clipped to a
//!   rectangular domain
//!
//! ## Quick Start
//!
//! ```
//! use delaunum::prelude::*;
//!
//! let mut tin = IncrementalTin::new();
//! tin.add_all(
//!     &[
//!         Vertex::new(0.0, 0.0, 1.0, 0),
//!         Vertex::new(1.0, 0.0, 2.0, 1),
//!         Vertex::new(1.0, 1.0, 3.0, 2),
//!         Vertex::new(0.0, 1.0, 4.0, 3),
//!     ],
//!     None,
//! )
//! .unwrap();
//!
//! assert!(tin.is_bootstrapped());
//! let survey = tin.count_triangles();
//! println!("triangles: {}", survey.count());
//! println!("total area: {}", survey.area_sum());
//! ```
//!
//! ## Constrained Triangulation
//!
//! ```
//! use delaunum::prelude::*;
//!
//! let mut tin = IncrementalTin::new();
//! tin.add_all(
//!     &[
//!         Vertex::new(0.0, 0.0, 0.0, 0),
//!         Vertex::new(4.0, 0.0, 0.0, 1),
//!         Vertex::new(4.0, 4.0, 0.0, 2),
//!         Vertex::new(0.0, 4.0, 0.0, 3),
//!         Vertex::new(2.0, 2.0, 0.0, 4),
//!     ],
//!     None,
//! )
//! .unwrap();
//!
//! // force the diagonal into the mesh
//! let constraint = Constraint::linear(vec![
//!     Vertex::new(0.0, 0.0, 0.0, 0),
//!     Vertex::new(4.0, 4.0, 0.0, 2),
//! ]);
//! tin.add_constraints(vec![constraint], false).unwrap();
//! ```
//!
//! ## Voronoi Diagrams
//!
//! ```
//! use delaunum::prelude::*;
//!
//! let sites = vec![
//!     Vertex::new(0.0, 0.0, 0.0, 0),
//!     Vertex::new(2.0, 0.0, 0.0, 1),
//!     Vertex::new(1.0, 2.0, 0.0, 2),
//! ];
//! let diagram =
//!     BoundedVoronoi::from_vertices(&sites, &BoundedVoronoiOptions::default()).unwrap();
//! for polygon in diagram.polygons() {
//!     println!("site {} area {}", polygon.vertex().index(), polygon.area());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constraint;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod predicates;
pub mod progress;
pub mod tin;
pub mod vertex;
pub mod voronoi;

pub use constraint::Constraint;
pub use error::{Result, TinError};
pub use geometry::Rect;
pub use tin::IncrementalTin;
pub use vertex::{MeshVertex, ResolutionRule, Vertex, VertexMergerGroup};
pub use voronoi::{BoundedVoronoi, BoundedVoronoiOptions, ThiessenPolygon};

/// Prelude module for convenient imports.
///
/// ```
/// use delaunum::prelude::*;
/// ```
pub mod prelude {
    pub use crate::constraint::Constraint;
    pub use crate::error::{Result, TinError};
    pub use crate::geometry::Rect;
    pub use crate::mesh::EdgeIndex;
    pub use crate::progress::ProgressMonitor;
    pub use crate::tin::{IncrementalTin, TriangleCount};
    pub use crate::vertex::{MeshVertex, ResolutionRule, Vertex, VertexMergerGroup};
    pub use crate::voronoi::{BoundedVoronoi, BoundedVoronoiOptions, ThiessenPolygon};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_tin_to_voronoi_round_trip() {
        let mut sites = Vec::new();
        let mut id = 0;
        for i in 0..4 {
            for j in 0..4 {
                sites.push(Vertex::new(i as f64 * 2.0, j as f64 * 2.0, 0.0, id));
                id += 1;
            }
        }

        let mut tin = IncrementalTin::with_nominal_point_spacing(2.0);
        tin.add_all(&sites, None).unwrap();
        let n = tin.vertices().len();
        let h = tin.perimeter().len();
        assert_eq!(tin.count_triangles().count(), 2 * n - 2 - h);

        let diagram = BoundedVoronoi::from_tin(&tin).unwrap();
        assert_eq!(diagram.polygons().len(), n);
        for s in &sites {
            let p = diagram.containing_polygon(s.x, s.y).unwrap();
            assert_eq!(p.vertex().index(), s.index());
        }
    }
}
