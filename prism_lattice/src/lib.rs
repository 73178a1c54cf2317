//! Prism Abstract Value Lattice
//!
//! The type lattice the optimizing JIT reasons with. Every value in the
//! IR is described by a lattice element: a set of runtime values it may
//! take. The optimizer combines elements as it walks the graph and reads
//! back facts (constant, range, class, nullness) to decide which rewrites
//! are legal.
//!
//! # Architecture
//!
//! - **Interning**: [`TypeStore`] hash-conses every value into a
//!   [`TypeId`]. Equal values share one id, so equality is an integer
//!   compare, and each value's dual is interned alongside it.
//!
//! - **Algebra**: `meet`, `join`, `dual`, `filter`, `widen`, `narrow` and
//!   `higher_equal` are methods on the store (see [`lattice`]).
//!
//! - **Families**: integer and long ranges with a widening counter,
//!   floats, pointers (generic, raw, object, instance, array, class,
//!   metadata) with niceness, offset, exactness and allocation identity,
//!   and the aggregate tuple, array, vector and signature values.
//!
//! - **Speculation**: pointer values carry an optional profiled guess
//!   that is advisory and strippable.
//!
//! # Usage
//!
//! ```ignore
//! use prism_lattice::{ClassHierarchy, Ptr, TypeStore};
//!
//! let mut classes = ClassHierarchy::new();
//! let shape = classes.define_class("Shape", classes.object_class());
//! let mut store = TypeStore::new(&classes);
//!
//! let a = store.int(0, 10);
//! let b = store.int(5, 20);
//! let range = store.meet(a, b); // int:0..20
//!
//! let s = store.instance(Ptr::NotNull, shape, false);
//! let maybe = store.meet(s, prism_lattice::TypeId::NULL_PTR); // Shape *
//! ```
//!
//! # Lifetime
//!
//! A store belongs to one compilation and borrows the class model for
//! that long. Dropping the store releases every value it interned.

#![warn(clippy::all)]

pub mod arena;
pub mod class_model;
pub mod config;
pub mod dump;
pub mod error;
pub mod intern;
pub mod lattice;
pub mod shared;
pub mod types;

// Re-exports for convenient access
pub use class_model::{ClassHierarchy, ClassId, ClassModel, MetadataId, ObjectId};
pub use config::LatticeConfig;
pub use dump::TypeDisplay;
pub use error::{LatticeError, LatticeResult};
pub use intern::{TypeId, TypeStore, FIRST_DYNAMIC_ID};
pub use lattice::ProfilePtrKind;
pub use shared::SharedTypeStore;
pub use types::{
    Category, ConstValue, InlineDepth, InstanceId, IntRange, Offset, Ptr, Speculation, TypeKind,
    VectorKind,
};
