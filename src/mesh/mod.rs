//! Quad-edge mesh infrastructure.
//!
//! The triangulation is represented with quad-edges: each edge of the
//! mesh is a pair of half-edges sharing identity, one for each
//! direction of traversal. The pair occupies consecutive slots of an
//! arena ([`EdgePool`]), so the dual lookup is a single XOR and all
//! links are stable integer indices ([`EdgeIndex`]).
//!
//! The unbounded face outside the convex hull is modeled with ghost
//! edges whose origin is `None`, standing in for a virtual vertex at
//! infinity. Ghost half-edges form triangular faces around the hull,
//! which lets the insertion algorithm treat hull growth uniformly.
//!
//! This module also hosts the two location utilities that operate
//! directly on the structure: the stochastic Lawson walk and the
//! bootstrap triple selection.

mod bootstrap;
mod edge;
mod index;
mod pool;
mod walk;

pub use bootstrap::BootstrapUtility;
pub use edge::{
    CONSTRAINT_AREA_BASE_FLAG, CONSTRAINT_AREA_FLAG, CONSTRAINT_FLAG, CONSTRAINT_INDEX_MASK,
};
pub use index::{EdgeIndex, VertexIndex};
pub use pool::{EdgePool, Pinwheel};
pub use walk::StochasticLawsonWalk;
