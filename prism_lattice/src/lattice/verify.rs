//! Lattice law checks run alongside `meet`.
//!
//! For a meet `mt = a ^ b` two properties are checked:
//!
//! ```text
//! commutative:  b ^ a == mt
//! symmetric:    ~mt ^ ~a == ~a   and   ~mt ^ ~b == ~b
//! ```
//!
//! The second says `a` and `b` both sit above `mt` in the dual lattice,
//! which fails whenever a meet rule forgets to handle one side of a
//! reflection. Interface pointers meeting class pointers are exempt: the
//! interface rules are deliberately not symmetric.

use crate::class_model::ClassId;
use crate::error::{LatticeError, LatticeResult};
use crate::intern::{TypeId, TypeStore};
use crate::types::TypeKind;

impl<'cm> TypeStore<'cm> {
    pub(crate) fn check_symmetrical(&mut self, a: TypeId, b: TypeId, mt: TypeId) -> LatticeResult<()> {
        let reversed = self.xmeet(b, a)?;
        if reversed != mt {
            let err = LatticeError::NotCommutative {
                left: self.dump(a),
                right: self.dump(b),
                forward: self.dump(mt),
                reversed: self.dump(reversed),
            };
            tracing::error!(%err, "lattice law violated");
            return Err(err);
        }

        if self.interface_vs_oop(a, b) {
            return Ok(());
        }

        let dual_mt = self.dual(mt);
        for side in [b, a] {
            let dual_side = self.dual(side);
            let above = self.xmeet(dual_mt, dual_side)?;
            if above != dual_side {
                let err = LatticeError::NotSymmetric {
                    left: self.dump(a),
                    right: self.dump(b),
                    result: self.dump(mt),
                    failed: self.dump(side),
                };
                tracing::error!(%err, "lattice law violated");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Whether one side is an interface instance and the other a class
    /// instance, possibly inside arrays or compressed references.
    pub(crate) fn interface_vs_oop(&self, a: TypeId, b: TypeId) -> bool {
        let (Some(ca), Some(cb)) = (self.instance_class(a), self.instance_class(b)) else {
            return false;
        };
        let classes = self.classes;
        if !classes.is_loaded(ca) || !classes.is_loaded(cb) {
            return false;
        }
        classes.is_interface(ca) != classes.is_interface(cb)
    }

    /// Class of an instance pointer, looking through compressed references
    /// and array elements.
    fn instance_class(&self, id: TypeId) -> Option<ClassId> {
        match self.kind(id) {
            TypeKind::InstPtr(inst) => Some(inst.class),
            TypeKind::NarrowOop(ptr) => self.instance_class(*ptr),
            TypeKind::ArrayPtr(ary) => self.instance_class(ary.body),
            TypeKind::Array(body) => self.instance_class(body.elem),
            _ => None,
        }
    }
}
