//! Lattice errors.
//!
//! Every variant is a compiler bug or a resource failure, never a user
//! error. Contradictions that dataflow analysis produces legitimately are
//! values (Top), not errors.

use thiserror::Error;

/// Failure inside the lattice algebra.
///
/// Operands are carried as their textual dumps so the error outlives the
/// store that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LatticeError {
    /// `meet(a, b) != meet(b, a)`.
    #[error("meet not commutative: {left} meet {right} = {forward}, reversed = {reversed}")]
    NotCommutative {
        left: String,
        right: String,
        forward: String,
        reversed: String,
    },

    /// The dual of a meet is not above the duals of its operands.
    #[error("meet not symmetric: {left} meet {right} = {result}, dual check failed on {failed}")]
    NotSymmetric {
        left: String,
        right: String,
        result: String,
        failed: String,
    },

    /// Tuples of different length describe incompatible call sites.
    #[error("tuple arity mismatch: {left} has {left_len} fields, {right} has {right_len}")]
    ArityMismatch {
        left: String,
        right: String,
        left_len: usize,
        right_len: usize,
    },

    /// Vectors must agree in register class and lane count.
    #[error("vector shape mismatch: {left} vs {right}")]
    VectorShapeMismatch { left: String, right: String },

    /// The two values live in disjoint sub-lattices that have no meet.
    #[error("incompatible lattice values: {left} meet {right}")]
    IncompatibleKinds { left: String, right: String },

    /// A pointer was built with a niceness its variant cannot hold.
    #[error("invalid pointer value: {value}")]
    InvalidPointer { value: String },

    /// Interning found a value's dual already linked to something else.
    #[error("dual of {value} already interned as {dual}")]
    DualMismatch { value: String, dual: String },

    /// The store ran out of handles.
    #[error("type arena exhausted after {count} values")]
    ArenaExhausted { count: usize },
}

/// Convenience alias for lattice results.
pub type LatticeResult<T> = Result<T, LatticeError>;

/// Abort on a lattice failure.
///
/// Optimizing with a broken lattice can miscompile silently, so the error
/// is logged and the compilation is torn down.
#[cold]
#[track_caller]
pub(crate) fn fatal(err: LatticeError) -> ! {
    tracing::error!(error = %err, "lattice invariant violated");
    panic!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LatticeError::ArityMismatch {
            left: "{0:int}".into(),
            right: "{0:int, 1:long}".into(),
            left_len: 1,
            right_len: 2,
        };
        assert_eq!(
            err.to_string(),
            "tuple arity mismatch: {0:int} has 1 fields, {0:int, 1:long} has 2"
        );

        let err = LatticeError::ArenaExhausted { count: 12 };
        assert_eq!(err.to_string(), "type arena exhausted after 12 values");
    }

    #[test]
    #[should_panic(expected = "incompatible lattice values")]
    fn test_fatal_panics() {
        fatal(LatticeError::IncompatibleKinds {
            left: "control".into(),
            right: "int".into(),
        });
    }
}
