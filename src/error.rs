//! Error types for delaunum.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias using [`TinError`].
pub type Result<T> = std::result::Result<T, TinError>;

/// Errors that can occur while building or querying a triangulation.
#[derive(Error, Debug)]
pub enum TinError {
    /// The operation requires an unlocked mesh, but constraints have
    /// already been added.
    #[error("mesh is locked; vertices cannot be added or removed after constraints")]
    Locked,

    /// The mesh has been disposed and can no longer be used.
    #[error("mesh has been disposed")]
    Disposed,

    /// Constraints were already added; a second call is not supported.
    #[error("constraints have already been added to this mesh")]
    ConstraintsAlreadyAdded,

    /// The operation requires more input vertices than were supplied.
    #[error("insufficient input: {needed} vertices required, {given} given")]
    InsufficientVertices {
        /// Minimum number of vertices required.
        needed: usize,
        /// Number of vertices actually supplied.
        given: usize,
    },

    /// The input vertex set never yielded three non-collinear points.
    #[error("bootstrap failed: all candidate vertex triples are collinear")]
    BootstrapFailure,

    /// The number of constraints exceeds the storable index range.
    #[error("too many constraints: {given} exceeds the maximum of {max}")]
    TooManyConstraints {
        /// Number of constraints supplied.
        given: usize,
        /// Maximum number of constraints supported.
        max: usize,
    },

    /// A constraint is malformed (fewer than two distinct points).
    #[error("constraint {index} contains fewer than 2 distinct points")]
    InvalidConstraint {
        /// Position of the offending constraint in the input list.
        index: usize,
    },

    /// A caller-specified bounding rectangle does not contain the samples.
    #[error("specified bounds do not entirely contain the sample set")]
    BoundsTooSmall,

    /// An internal invariant was violated. This indicates an
    /// implementation defect and is fatal for the instance.
    #[error("internal failure: {details}")]
    InternalFailure {
        /// Description of the violated invariant.
        details: &'static str,
    },
}
