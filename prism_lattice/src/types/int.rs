//! Integer range payloads.
//!
//! `IntRange<T>` is an inclusive `[lo, hi]` range of a fixed-width signed
//! integer plus a widening level. The same code serves 32-bit ints and
//! 64-bit longs through [`IntegerWidth`].
//!
//! A range with `lo > hi` is above the centerline: it is the dual of the
//! range `[hi, lo]` and contains no value.
//!
//! Widening levels keep loop analyses finite. Every growing `widen` step
//! raises the level by one; at the configured limit the range snaps to a
//! half-open or full range instead of creeping outward one value at a
//! time.

use std::fmt;
use std::hash::Hash;

/// Ranges spanning at most this many steps are always at widen level 0.
pub const SMALL_SPAN: u64 = 3;

// =============================================================================
// Integer Width
// =============================================================================

/// A signed machine integer a range can be built over.
pub trait IntegerWidth: Copy + Ord + Eq + Hash + fmt::Debug + fmt::Display + 'static {
    const MIN: Self;
    const MAX: Self;
    const ZERO: Self;
    /// Span of the full range, `MAX - MIN` as unsigned.
    const FULL_SPAN: u64;
    /// Name used in dumps.
    const NAME: &'static str;

    /// `hi - lo` as an unsigned distance, wrapping at the type width.
    fn span(lo: Self, hi: Self) -> u64;

    fn to_i64(self) -> i64;
}

impl IntegerWidth for i32 {
    const MIN: Self = i32::MIN;
    const MAX: Self = i32::MAX;
    const ZERO: Self = 0;
    const FULL_SPAN: u64 = u32::MAX as u64;
    const NAME: &'static str = "int";

    #[inline]
    fn span(lo: Self, hi: Self) -> u64 {
        u64::from(hi.wrapping_sub(lo) as u32)
    }

    fn to_i64(self) -> i64 {
        i64::from(self)
    }
}

impl IntegerWidth for i64 {
    const MIN: Self = i64::MIN;
    const MAX: Self = i64::MAX;
    const ZERO: Self = 0;
    const FULL_SPAN: u64 = u64::MAX;
    const NAME: &'static str = "long";

    #[inline]
    fn span(lo: Self, hi: Self) -> u64 {
        hi.wrapping_sub(lo) as u64
    }

    fn to_i64(self) -> i64 {
        self
    }
}

// =============================================================================
// Range
// =============================================================================

/// Inclusive integer range with a widening level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntRange<T> {
    pub lo: T,
    pub hi: T,
    pub widen: u8,
}

impl<T: IntegerWidth> IntRange<T> {
    /// Build a range, normalizing the widen level against `widen_limit`.
    pub fn new(lo: T, hi: T, widen: u8, widen_limit: u8) -> Self {
        Self {
            lo,
            hi,
            widen: normalize_widen(lo, hi, widen.min(widen_limit), widen_limit),
        }
    }

    /// The single value `v`.
    pub fn constant(v: T) -> Self {
        Self {
            lo: v,
            hi: v,
            widen: 0,
        }
    }

    /// Every value of the width, at the highest widen level.
    pub fn full(widen_limit: u8) -> Self {
        Self {
            lo: T::MIN,
            hi: T::MAX,
            widen: widen_limit,
        }
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        self.lo == self.hi
    }

    /// Above the centerline: holds no value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    #[inline]
    pub fn contains(&self, v: T) -> bool {
        self.lo <= v && v <= self.hi
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.lo == T::MIN && self.hi == T::MAX
    }

    /// Smallest range containing both.
    pub fn meet(&self, other: &Self, widen_limit: u8) -> Self {
        Self::new(
            self.lo.min(other.lo),
            self.hi.max(other.hi),
            self.widen.max(other.widen),
            widen_limit,
        )
    }

    /// Swap the bound roles; constants and the empty range reflect onto
    /// themselves, the full range onto the canonical empty one.
    pub fn dual(&self, widen_limit: u8) -> Self {
        Self::new(
            self.hi,
            self.lo,
            widen_limit.saturating_sub(self.widen),
            widen_limit,
        )
    }

    /// Generalize `self` (the newer value) against `old`.
    ///
    /// `limit` bounds the half-open ranges a saturated range snaps to.
    pub fn widen(&self, old: &Self, limit: Option<&Self>, widen_limit: u8) -> Self {
        if self.lo == old.lo && self.hi == old.hi {
            return *old;
        }

        if self.lo <= old.lo && self.hi >= old.hi {
            // A jump in widen level is already progress.
            if self.widen > old.widen {
                return *self;
            }
            // Growing out of a constant: no loop has been seen yet.
            if old.is_constant() {
                return *self;
            }
            if self.widen >= widen_limit {
                let (min, max) = limit.map_or((T::MIN, T::MAX), |l| (l.lo, l.hi));
                if min < self.lo && self.hi < max {
                    // Keep the bound with more headroom closed.
                    return if self.lo >= T::ZERO || T::span(min, self.lo) >= T::span(self.hi, max) {
                        Self::new(self.lo, max, widen_limit, widen_limit)
                    } else {
                        Self::new(min, self.hi, widen_limit, widen_limit)
                    };
                }
                tracing::debug!(lo = %self.lo, hi = %self.hi, "{} range widened to full", T::NAME);
                return Self::full(widen_limit);
            }
            return Self::new(self.lo, self.hi, self.widen + 1, widen_limit);
        }

        if old.lo <= self.lo && old.hi >= self.hi {
            return *old;
        }

        tracing::debug!(lo = %self.lo, hi = %self.hi, "{} range widened to full", T::NAME);
        Self::full(widen_limit)
    }

    /// Tighten `old` toward `self` when the shrink is worth another pass.
    ///
    /// Refuses small successive shrinks so repeated narrowing cannot walk a
    /// bound in one value at a time.
    pub fn narrow(&self, old: &Self) -> Self {
        if self.lo >= self.hi {
            return *self;
        }
        if self.lo == old.lo && self.hi == old.hi {
            return *old;
        }
        if old.is_full() {
            return *self;
        }
        if self.lo < old.lo || self.hi > old.hi {
            return *self;
        }

        let new_span = T::span(self.lo, self.hi);
        let old_span = T::span(old.lo, old.hi);
        if new_span < T::FULL_SPAN - 1 && new_span > (old_span >> 1) + SMALL_SPAN * 2 {
            return *old;
        }
        *self
    }

    /// Intersection of `self` with `kills`, keeping `self`'s widen level.
    ///
    /// Returns `None` when nothing survives.
    pub fn filter(&self, kills: &Self, widen_limit: u8) -> Option<Self> {
        let joined = self.dual(widen_limit).meet(&kills.dual(widen_limit), widen_limit).dual(widen_limit);
        if joined.is_empty() {
            return None;
        }
        if joined.widen < self.widen {
            return Some(Self::new(joined.lo, joined.hi, self.widen, widen_limit));
        }
        Some(joined)
    }
}

/// Pin the widen level of ranges whose size already decides it.
fn normalize_widen<T: IntegerWidth>(lo: T, hi: T, widen: u8, widen_limit: u8) -> u8 {
    if lo <= hi {
        let span = T::span(lo, hi);
        if span <= SMALL_SPAN {
            return 0;
        }
        if span >= T::FULL_SPAN {
            return widen_limit;
        }
    } else {
        let span = T::span(hi, lo);
        if span <= SMALL_SPAN || span >= T::FULL_SPAN {
            return 0;
        }
    }
    widen
}

// =============================================================================
// Dump
// =============================================================================

/// Name for a bound: `min`, `max`, `min+N`, `max-N` near the edges.
fn bound_name<T: IntegerWidth>(v: T) -> String {
    const NEAR: u64 = 10_000;
    if v == T::MIN {
        "min".to_string()
    } else if v == T::MAX {
        "max".to_string()
    } else if T::span(T::MIN, v) < NEAR {
        format!("min+{}", T::span(T::MIN, v))
    } else if T::span(v, T::MAX) < NEAR {
        format!("max-{}", T::span(v, T::MAX))
    } else {
        v.to_string()
    }
}

impl<T: IntegerWidth> IntRange<T> {
    /// Short name for a few well-known int ranges.
    fn well_known_name(&self) -> Option<&'static str> {
        if T::NAME != "int" {
            return None;
        }
        match (self.lo.to_i64(), self.hi.to_i64()) {
            (0, 1) => Some("bool"),
            (-128, 127) => Some("byte"),
            (0, 65535) => Some("char"),
            (-32768, 32767) => Some("short"),
            _ => None,
        }
    }
}

impl<T: IntegerWidth> fmt::Display for IntRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_full() {
            f.write_str(T::NAME)?;
        } else if let Some(name) = self.well_known_name() {
            f.write_str(name)?;
        } else if self.is_constant() {
            write!(f, "{}:{}", T::NAME, bound_name(self.lo))?;
        } else if self.hi == T::MAX {
            write!(f, "{}:>={}", T::NAME, bound_name(self.lo))?;
        } else if self.lo == T::MIN {
            write!(f, "{}:<={}", T::NAME, bound_name(self.hi))?;
        } else {
            write!(f, "{}:{}..{}", T::NAME, bound_name(self.lo), bound_name(self.hi))?;
        }
        if self.widen != 0 && !self.is_full() {
            write!(f, ":{}", ".".repeat(self.widen as usize))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: u8 = 3;

    fn range(lo: i32, hi: i32) -> IntRange<i32> {
        IntRange::new(lo, hi, 0, LIMIT)
    }

    // =========================================================================
    // Construction Tests
    // =========================================================================

    #[test]
    fn test_small_ranges_pin_widen_to_zero() {
        assert_eq!(IntRange::new(0, 3, 2, LIMIT).widen, 0);
        assert_eq!(IntRange::new(0, 4, 2, LIMIT).widen, 2);
    }

    #[test]
    fn test_full_range_pins_widen_to_limit() {
        assert_eq!(IntRange::new(i32::MIN, i32::MAX, 0, LIMIT).widen, LIMIT);
        assert_eq!(IntRange::new(i64::MIN, i64::MAX, 1, LIMIT).widen, LIMIT);
    }

    #[test]
    fn test_widen_clamped_to_limit() {
        assert_eq!(IntRange::new(0, 100, 9, LIMIT).widen, LIMIT);
    }

    // =========================================================================
    // Algebra Tests
    // =========================================================================

    #[test]
    fn test_meet_covers_both() {
        let m = range(1, 5).meet(&range(10, 20), LIMIT);
        assert_eq!((m.lo, m.hi), (1, 20));
    }

    #[test]
    fn test_constants_are_self_dual() {
        let c = IntRange::constant(7);
        assert_eq!(c.dual(LIMIT), c);
    }

    #[test]
    fn test_full_dual_is_empty() {
        let full = IntRange::<i32>::full(LIMIT);
        let dual = full.dual(LIMIT);
        assert!(dual.is_empty());
        assert_eq!(dual.dual(LIMIT), full);
    }

    #[test]
    fn test_dual_involution() {
        for r in [range(-50, 50), range(0, 2), IntRange::new(3, 900, 2, LIMIT)] {
            assert_eq!(r.dual(LIMIT).dual(LIMIT), r);
        }
    }

    #[test]
    fn test_filter_keeps_widen() {
        let wide = IntRange::new(0, 1000, 2, LIMIT);
        let f = wide.filter(&range(10, 20), LIMIT).unwrap();
        assert_eq!((f.lo, f.hi, f.widen), (10, 20, 2));
        assert!(range(0, 5).filter(&range(10, 20), LIMIT).is_none());
    }

    // =========================================================================
    // Widen / Narrow Tests
    // =========================================================================

    #[test]
    fn test_widen_from_constant_keeps_new() {
        let old = IntRange::constant(0);
        let new = range(0, 10);
        assert_eq!(new.widen(&old, None, LIMIT), new);
    }

    #[test]
    fn test_widen_climbs_levels() {
        let old = range(0, 10);
        let new = range(0, 100);
        assert_eq!(new.widen(&old, None, LIMIT).widen, 1);
    }

    #[test]
    fn test_widen_saturated_snaps_half_open() {
        let old = IntRange::new(0, 100, LIMIT, LIMIT);
        let new = IntRange::new(0, 1000, LIMIT, LIMIT);
        let w = new.widen(&old, None, LIMIT);
        assert_eq!((w.lo, w.hi), (0, i32::MAX));
    }

    #[test]
    fn test_widen_saturated_negative_snaps_low() {
        let old = IntRange::new(-100, 0, LIMIT, LIMIT);
        let new = IntRange::new(-1000, 0, LIMIT, LIMIT);
        let w = new.widen(&old, None, LIMIT);
        assert_eq!((w.lo, w.hi), (i32::MIN, 0));
    }

    #[test]
    fn test_widen_respects_limit() {
        let limit = range(-5000, 5000);
        let old = IntRange::new(0, 100, LIMIT, LIMIT);
        let new = IntRange::new(0, 1000, LIMIT, LIMIT);
        let w = new.widen(&old, Some(&limit), LIMIT);
        assert_eq!((w.lo, w.hi), (0, 5000));
    }

    #[test]
    fn test_widen_shrunk_returns_old() {
        let old = range(0, 100);
        assert_eq!(range(10, 20).widen(&old, None, LIMIT), old);
    }

    #[test]
    fn test_narrow_refuses_small_shrink() {
        let old = range(0, 100);
        assert_eq!(range(0, 99).narrow(&old), old);
        assert_eq!(range(0, 10).narrow(&old), range(0, 10));
    }

    #[test]
    fn test_narrow_from_full() {
        let old = IntRange::<i32>::full(LIMIT);
        assert_eq!(range(0, 99).narrow(&old), range(0, 99));
    }

    // =========================================================================
    // Dump Tests
    // =========================================================================

    #[test]
    fn test_display() {
        assert_eq!(IntRange::<i32>::full(LIMIT).to_string(), "int");
        assert_eq!(IntRange::<i64>::full(LIMIT).to_string(), "long");
        assert_eq!(range(0, 1).to_string(), "bool");
        assert_eq!(IntRange::constant(42).to_string(), "int:42");
        assert_eq!(range(0, i32::MAX).to_string(), "int:>=0");
        assert_eq!(range(i32::MIN, 5).to_string(), "int:<=5");
        assert_eq!(range(-100_000, 100_000).to_string(), "int:-100000..100000");
        assert_eq!(IntRange::constant(i32::MIN + 1).to_string(), "int:min+1");
        assert_eq!(IntRange::new(0, 100, 2, LIMIT).to_string(), "int:0..100:..");
    }
}
