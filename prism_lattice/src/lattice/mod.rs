//! The lattice algebra over interned values.
//!
//! Every operation is a method on [`TypeStore`](crate::TypeStore), since
//! each may need to intern its result:
//!
//! - `dual`: reflection across the centerline, computed at intern time
//! - `meet`: greatest lower bound, join, and dispatch by variant
//! - `pointer`: meets between pointer variants and class refinement
//! - `speculative`: profiling overlays on pointer values
//! - `ops`: filter, widen/narrow, ordering, constants and casts
//! - `verify`: commutativity and symmetry checks run with `meet`

mod dual;
mod meet;
mod ops;
mod pointer;
mod speculative;
mod verify;

pub use speculative::ProfilePtrKind;
