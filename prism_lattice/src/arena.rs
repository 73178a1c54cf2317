//! Slot table behind the interning store.
//!
//! Every canonical value occupies one slot addressed by a [`TypeId`]. The
//! slot records the value's dual next to its payload, so reflecting a
//! value is one load:
//!
//! ```text
//!   TypeId ──► ┌──────────────┬──────┐
//!              │ TypeKind     │ dual │──► TypeId of the reflection
//!              └──────────────┴──────┘
//! ```
//!
//! Slots are append-only and released together when the store drops.

use std::fmt;
use std::ops::Index;

use crate::types::TypeKind;

/// Default initial capacity (values).
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Slot count at which the table refuses further values.
const MAX_SLOTS: usize = u32::MAX as usize;

// =============================================================================
// Handle
// =============================================================================

/// Handle to an interned lattice value.
///
/// Handles are only meaningful for the store that produced them, with the
/// exception of the reserved ids below `FIRST_DYNAMIC_ID`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    #[inline]
    pub(crate) const fn from_index(index: u32) -> Self {
        TypeId(index)
    }

    /// Position of the value in its store.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone)]
struct Slot {
    kind: TypeKind,
    dual: TypeId,
}

/// Append-only storage for interned values and their dual links.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    slots: Vec<Slot>,
}

impl TypeTable {
    pub fn with_capacity(capacity: usize) -> Self {
        TypeTable {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Append `kind`, initially linked to itself as its own dual.
    ///
    /// Returns `None` once the handle space is used up.
    pub fn push(&mut self, kind: TypeKind) -> Option<TypeId> {
        if self.slots.len() >= MAX_SLOTS {
            return None;
        }
        let id = TypeId(self.slots.len() as u32);
        self.slots.push(Slot { kind, dual: id });
        Some(id)
    }

    /// Pair `a` and `b` as each other's dual.
    pub fn link_duals(&mut self, a: TypeId, b: TypeId) {
        self.slots[a.slot()].dual = b;
        self.slots[b.slot()].dual = a;
    }

    #[inline]
    pub fn dual(&self, id: TypeId) -> TypeId {
        self.slots[id.slot()].dual
    }

    #[inline]
    pub fn get(&self, id: TypeId) -> Option<&TypeKind> {
        self.slots.get(id.slot()).map(|slot| &slot.kind)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Index<TypeId> for TypeTable {
    type Output = TypeKind;

    #[inline]
    fn index(&self, id: TypeId) -> &TypeKind {
        &self.slots[id.slot()].kind
    }
}
