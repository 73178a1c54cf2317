//! Pointer sub-lattices.
//!
//! A reference value is refined along independent axes, each a small
//! lattice of its own:
//!
//! ```text
//!   niceness          offset            instance id
//!
//!     Top              Top                 Top
//!      |                |                   |
//!   AnyNull       .. -8 0 8 ..       .. #1 #2 #3 ..
//!      |                |                   |
//!   Constant          Bottom              Bottom
//!    /    \
//!  Null  NotNull
//!    \    /
//!    Bottom
//! ```
//!
//! Values above the centerline (`Top`, `AnyNull`) are the duals of the
//! ones below it (`Bottom`, `NotNull`); `Constant` and `Null` sit on it.

use std::fmt;

use crate::intern::TypeId;

// =============================================================================
// Niceness
// =============================================================================

/// Definedness and nullability of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Ptr {
    /// No value at all.
    Top = 0,
    /// The dual of `NotNull`: any null or non-null constant.
    AnyNull = 1,
    /// One specific non-null object.
    Constant = 2,
    /// Definitely null.
    Null = 3,
    /// Definitely not null.
    NotNull = 4,
    /// Null or any object.
    Bottom = 5,
}

use Ptr::{AnyNull, Bottom as BotP, Constant, Null, NotNull, Top as TopP};

const MEET_TABLE: [[Ptr; 6]; 6] = [
    //  Top       AnyNull   Constant  Null   NotNull  Bottom
    [TopP, AnyNull, Constant, Null, NotNull, BotP], // Top
    [AnyNull, AnyNull, Constant, BotP, NotNull, BotP], // AnyNull
    [Constant, Constant, Constant, BotP, NotNull, BotP], // Constant
    [Null, BotP, BotP, Null, BotP, BotP],        // Null
    [NotNull, NotNull, NotNull, BotP, NotNull, BotP], // NotNull
    [BotP, BotP, BotP, BotP, BotP, BotP],        // Bottom
];

const DUAL_TABLE: [Ptr; 6] = [BotP, NotNull, Constant, Null, AnyNull, TopP];

impl Ptr {
    /// All niceness values, top to bottom.
    pub const ALL: [Ptr; 6] = [TopP, AnyNull, Constant, Null, NotNull, BotP];

    #[inline]
    pub fn meet(self, other: Ptr) -> Ptr {
        MEET_TABLE[self as usize][other as usize]
    }

    #[inline]
    pub fn dual(self) -> Ptr {
        DUAL_TABLE[self as usize]
    }

    #[inline]
    pub fn join(self, other: Ptr) -> Ptr {
        self.dual().meet(other.dual()).dual()
    }

    #[inline]
    pub fn above_centerline(self) -> bool {
        matches!(self, TopP | AnyNull)
    }

    #[inline]
    pub fn below_centerline(self) -> bool {
        matches!(self, NotNull | BotP)
    }

    /// Whether null is among the possible values.
    #[inline]
    pub fn maybe_null(self) -> bool {
        self.meet(Null) == self
    }

    pub fn name(self) -> &'static str {
        match self {
            TopP => "TopPTR",
            AnyNull => "AnyNull",
            Constant => "Constant",
            Null => "NULL",
            NotNull => "NotNull",
            BotP => "BotPTR",
        }
    }
}

impl fmt::Display for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Offset
// =============================================================================

/// Byte offset of a pointer from the start of its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Offset {
    /// Not yet known; meets to anything.
    Top,
    /// Any offset.
    Bottom,
    /// Exactly this many bytes.
    At(i32),
}

impl Offset {
    pub const ZERO: Offset = Offset::At(0);

    #[inline]
    pub fn meet(self, other: Offset) -> Offset {
        match (self, other) {
            (Offset::Top, o) | (o, Offset::Top) => o,
            (Offset::Bottom, _) | (_, Offset::Bottom) => Offset::Bottom,
            (Offset::At(a), Offset::At(b)) if a == b => self,
            _ => Offset::Bottom,
        }
    }

    #[inline]
    pub fn dual(self) -> Offset {
        match self {
            Offset::Top => Offset::Bottom,
            Offset::Bottom => Offset::Top,
            at => at,
        }
    }

    /// Displace by `delta`; unknown offsets absorb, overflow goes to Bottom.
    pub fn add(self, delta: Offset) -> Offset {
        match (self, delta) {
            (Offset::Top, _) | (_, Offset::Top) => Offset::Top,
            (Offset::Bottom, _) | (_, Offset::Bottom) => Offset::Bottom,
            (Offset::At(a), Offset::At(b)) => a.checked_add(b).map_or(Offset::Bottom, Offset::At),
        }
    }

    /// Displace by a raw byte count, which may not fit an offset.
    pub fn add_bytes(self, delta: i64) -> Offset {
        match i32::try_from(delta) {
            Ok(d) => self.add(Offset::At(d)),
            Err(_) if self == Offset::Top => Offset::Top,
            Err(_) => Offset::Bottom,
        }
    }

    #[inline]
    pub fn is_exact(self) -> bool {
        matches!(self, Offset::At(_))
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Top => f.write_str("+top"),
            Offset::Bottom => f.write_str("+bot"),
            Offset::At(0) => Ok(()),
            Offset::At(n) => write!(f, "+{}", n),
        }
    }
}

// =============================================================================
// Instance identity
// =============================================================================

/// Allocation site a reference is known to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceId {
    Top,
    /// Shared or unknown allocation.
    Bottom,
    Known(u32),
}

impl InstanceId {
    #[inline]
    pub fn meet(self, other: InstanceId) -> InstanceId {
        match (self, other) {
            (InstanceId::Top, o) | (o, InstanceId::Top) => o,
            (InstanceId::Known(a), InstanceId::Known(b)) if a == b => self,
            _ => InstanceId::Bottom,
        }
    }

    #[inline]
    pub fn dual(self) -> InstanceId {
        match self {
            InstanceId::Top => InstanceId::Bottom,
            InstanceId::Bottom => InstanceId::Top,
            known => known,
        }
    }

    #[inline]
    pub fn is_known(self) -> bool {
        matches!(self, InstanceId::Known(_))
    }
}

// =============================================================================
// Inline depth
// =============================================================================

/// Inlining depth a speculative guess was profiled at.
///
/// Meets to the deeper of the two; the dual negates so that the two
/// sentinel depths swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InlineDepth(i32);

impl InlineDepth {
    /// No depth recorded (the default for every non-speculative value).
    pub const BOTTOM: InlineDepth = InlineDepth(i32::MAX);
    pub const TOP: InlineDepth = InlineDepth(-i32::MAX);

    /// Depth of a profile taken `depth` frames into the inlining tree.
    pub fn at(depth: u16) -> InlineDepth {
        InlineDepth(i32::from(depth))
    }

    #[inline]
    pub fn meet(self, other: InlineDepth) -> InlineDepth {
        self.max(other)
    }

    #[inline]
    pub fn dual(self) -> InlineDepth {
        InlineDepth(-self.0)
    }

    pub fn is_sentinel(self) -> bool {
        self == Self::TOP || self == Self::BOTTOM
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl Default for InlineDepth {
    fn default() -> Self {
        Self::BOTTOM
    }
}

// =============================================================================
// Speculative overlay
// =============================================================================

/// Profiling side channel carried by every speculative pointer variant.
///
/// `guess` is an interned pointer value that is probably, but not
/// provably, true of the primary value. `inline_depth` is where the value
/// itself was profiled, when it is used as someone else's guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Speculation {
    pub guess: Option<TypeId>,
    pub inline_depth: InlineDepth,
}

impl Speculation {
    /// No guess, no depth.
    pub const NONE: Speculation = Speculation {
        guess: None,
        inline_depth: InlineDepth::BOTTOM,
    };

    /// Same depth, guess removed.
    #[inline]
    pub fn without_guess(self) -> Speculation {
        Speculation {
            guess: None,
            ..self
        }
    }
}
