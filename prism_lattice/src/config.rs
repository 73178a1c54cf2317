//! Lattice configuration parameters.
//!
//! These knobs belong to the surrounding compiler driver; the lattice only
//! reads them when a [`TypeStore`](crate::TypeStore) is created.

use crate::arena::DEFAULT_INITIAL_CAPACITY;

/// Configuration for a [`TypeStore`](crate::TypeStore).
///
/// # Example
///
/// ```ignore
/// use prism_lattice::LatticeConfig;
///
/// // Converge loop ranges faster at the cost of precision
/// let config = LatticeConfig {
///     widen_limit: 1,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct LatticeConfig {
    /// Highest widening level an integer range can reach.
    ///
    /// Ranges climb one level per growing `widen` step. Once a range sits
    /// at this level, the next growth snaps it to a half-open or full
    /// range, so any monotone sequence converges in a bounded number of
    /// steps.
    ///
    /// Default: 3 (four levels, 0 through 3)
    pub widen_limit: u8,

    /// Check commutativity and dual symmetry on every `meet`.
    ///
    /// A failed check is fatal. Roughly quintuples the cost of a meet.
    ///
    /// Default: on in debug builds
    pub verify_symmetry: bool,

    /// Record inline depths on speculative guesses.
    ///
    /// When off, `with_inline_depth` leaves values unchanged and every
    /// guess is treated as coming from the same depth.
    ///
    /// Default: true
    pub speculative_inline_depth: bool,

    /// Number of values the store pre-allocates room for.
    ///
    /// Default: 256
    pub initial_capacity: usize,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            widen_limit: 3,
            verify_symmetry: cfg!(debug_assertions),
            speculative_inline_depth: true,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl LatticeConfig {
    /// Configuration with every law check enabled, for tests and fuzzing.
    pub fn checked() -> Self {
        Self {
            verify_symmetry: true,
            ..Self::default()
        }
    }

    /// Configuration for release compiles: no law checks.
    pub fn fast() -> Self {
        Self {
            verify_symmetry: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LatticeConfig::default();
        assert_eq!(config.widen_limit, 3);
        assert!(config.speculative_inline_depth);
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
    }

    #[test]
    fn test_presets() {
        assert!(LatticeConfig::checked().verify_symmetry);
        assert!(!LatticeConfig::fast().verify_symmetry);
        assert_eq!(LatticeConfig::fast().widen_limit, 3);
    }
}
