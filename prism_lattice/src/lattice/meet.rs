//! Meet (greatest lower bound) and join.
//!
//! `meet` is the entry point passes use. It strips speculative overlays,
//! dispatches on the pair of variants, and, when symmetry verification is
//! on, checks the result against the reversed and dualized meets before
//! handing it back.
//!
//! Rules by family:
//! - Top meets to the other operand, Bottom absorbs
//! - Two data values from different families meet to Bottom
//! - Control, memory, I/O, return addresses and signatures only meet
//!   with an identical value; anything else is a compiler bug
//! - Aggregates meet field by field

use crate::error::{fatal, LatticeError, LatticeResult};
use crate::intern::{TypeId, TypeStore};
use crate::types::{ArrayBody, TypeKind, TypeList, VectorType};

impl<'cm> TypeStore<'cm> {
    // =========================================================================
    // Public Entry Points
    // =========================================================================

    /// Greatest lower bound of `a` and `b`, ignoring speculative overlays.
    ///
    /// Incompatible operands are fatal.
    pub fn meet(&mut self, a: TypeId, b: TypeId) -> TypeId {
        self.try_meet(a, b).unwrap_or_else(|err| fatal(err))
    }

    pub fn try_meet(&mut self, a: TypeId, b: TypeId) -> LatticeResult<TypeId> {
        self.meet_helper(a, b, false)
    }

    /// Meet that keeps speculative overlays, then drops the ones that no
    /// longer say anything useful.
    pub fn meet_speculative(&mut self, a: TypeId, b: TypeId) -> TypeId {
        self.try_meet_speculative(a, b).unwrap_or_else(|err| fatal(err))
    }

    pub fn try_meet_speculative(&mut self, a: TypeId, b: TypeId) -> LatticeResult<TypeId> {
        let mt = self.meet_helper(a, b, true)?;
        Ok(self.cleanup_speculative(mt))
    }

    /// Least upper bound: `dual(meet(dual(a), dual(b)))`.
    pub fn join(&mut self, a: TypeId, b: TypeId) -> TypeId {
        self.try_join(a, b).unwrap_or_else(|err| fatal(err))
    }

    pub fn try_join(&mut self, a: TypeId, b: TypeId) -> LatticeResult<TypeId> {
        self.join_helper(a, b, false)
    }

    /// Join that keeps speculative overlays.
    pub fn join_speculative(&mut self, a: TypeId, b: TypeId) -> TypeId {
        self.join_helper(a, b, true).unwrap_or_else(|err| fatal(err))
    }

    pub(crate) fn join_helper(
        &mut self,
        a: TypeId,
        b: TypeId,
        include_speculative: bool,
    ) -> LatticeResult<TypeId> {
        let (da, db) = (self.dual(a), self.dual(b));
        let mt = self.meet_helper(da, db, include_speculative)?;
        Ok(self.dual(mt))
    }

    /// Meet of a list of values; the meet of nothing is Top.
    pub fn meet_all(&mut self, ids: &[TypeId]) -> TypeId {
        ids.iter().fold(TypeId::TOP, |acc, id| self.meet(acc, *id))
    }

    pub(crate) fn meet_helper(
        &mut self,
        a: TypeId,
        b: TypeId,
        include_speculative: bool,
    ) -> LatticeResult<TypeId> {
        let (a, b) = if include_speculative {
            (a, b)
        } else {
            (self.remove_speculative(a), self.remove_speculative(b))
        };

        // Compressed references are verified at the pointer level.
        if let (TypeKind::NarrowOop(pa), TypeKind::NarrowOop(pb)) = (self.kind(a), self.kind(b)) {
            let (pa, pb) = (*pa, *pb);
            let mt = self.meet_helper(pa, pb, include_speculative)?;
            return Ok(self.wrap_narrow(mt, TypeKind::NarrowOop));
        }
        if let (TypeKind::NarrowClass(pa), TypeKind::NarrowClass(pb)) = (self.kind(a), self.kind(b)) {
            let (pa, pb) = (*pa, *pb);
            let mt = self.meet_helper(pa, pb, include_speculative)?;
            return Ok(self.wrap_narrow(mt, TypeKind::NarrowClass));
        }

        let mt = self.xmeet(a, b)?;
        if self.kind(a).is_narrow() || self.kind(b).is_narrow() || !self.verify_now {
            return Ok(mt);
        }

        self.check_symmetrical(a, b, mt)?;
        let (da, db) = (self.dual(a), self.dual(b));
        self.verify_now = false;
        let checked = self
            .xmeet(da, db)
            .and_then(|mt_dual| self.check_symmetrical(da, db, mt_dual));
        self.verify_now = true;
        checked?;
        Ok(mt)
    }

    fn wrap_narrow(&mut self, mt: TypeId, wrap: fn(TypeId) -> TypeKind) -> TypeId {
        if self.kind(mt).is_ptr() {
            self.intern(wrap(mt))
        } else {
            mt
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Raw meet without overlay stripping or verification.
    pub(crate) fn xmeet(&mut self, a: TypeId, b: TypeId) -> LatticeResult<TypeId> {
        if a == b {
            return Ok(a);
        }
        let ka = self.kind(a).clone();
        let kb = self.kind(b).clone();

        match (&ka, &kb) {
            (TypeKind::Top, _) => Ok(b),
            (_, TypeKind::Top) => Ok(a),
            (TypeKind::Bottom, _) | (_, TypeKind::Bottom) => Ok(TypeId::BOTTOM),

            (TypeKind::Int(x), TypeKind::Int(y)) => {
                let r = x.meet(y, self.config.widen_limit);
                Ok(self.intern(TypeKind::Int(r)))
            }
            (TypeKind::Long(x), TypeKind::Long(y)) => {
                let r = x.meet(y, self.config.widen_limit);
                Ok(self.intern(TypeKind::Long(r)))
            }

            (TypeKind::FloatTop, k) if k.is_float() => Ok(b),
            (k, TypeKind::FloatTop) if k.is_float() => Ok(a),
            (x, y) if x.is_float() && y.is_float() => Ok(TypeId::FLOAT),
            (TypeKind::DoubleTop, k) if k.is_double() => Ok(b),
            (k, TypeKind::DoubleTop) if k.is_double() => Ok(a),
            (x, y) if x.is_double() && y.is_double() => Ok(TypeId::DOUBLE),

            (TypeKind::NarrowOop(pa), TypeKind::NarrowOop(pb)) => {
                let mt = self.xmeet(*pa, *pb)?;
                Ok(self.wrap_narrow(mt, TypeKind::NarrowOop))
            }
            (TypeKind::NarrowClass(pa), TypeKind::NarrowClass(pb)) => {
                let mt = self.xmeet(*pa, *pb)?;
                Ok(self.wrap_narrow(mt, TypeKind::NarrowClass))
            }

            (TypeKind::Tuple(x), TypeKind::Tuple(y)) => self.meet_tuples(a, b, x, y),
            (TypeKind::Array(x), TypeKind::Array(y)) => self.meet_arrays(x, y),
            (TypeKind::Vector(x), TypeKind::Vector(y)) => self.meet_vectors(a, b, x, y),

            (x, y) if x.is_ptr() && y.is_ptr() => self.xmeet_ptr(a, b),

            (x, y) if x.is_data() && y.is_data() => Ok(TypeId::BOTTOM),

            _ => Err(LatticeError::IncompatibleKinds {
                left: self.dump(a),
                right: self.dump(b),
            }),
        }
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    fn meet_tuples(
        &mut self,
        a: TypeId,
        b: TypeId,
        x: &TypeList,
        y: &TypeList,
    ) -> LatticeResult<TypeId> {
        if x.len() != y.len() {
            return Err(LatticeError::ArityMismatch {
                left: self.dump(a),
                right: self.dump(b),
                left_len: x.len(),
                right_len: y.len(),
            });
        }
        let mut fields = TypeList::with_capacity(x.len());
        for (fa, fb) in x.iter().zip(y.iter()) {
            fields.push(self.xmeet(*fa, *fb)?);
        }
        Ok(self.intern(TypeKind::Tuple(fields)))
    }

    fn meet_arrays(&mut self, x: &ArrayBody, y: &ArrayBody) -> LatticeResult<TypeId> {
        let elem = self.try_meet_speculative(x.elem, y.elem)?;
        let size = self.xmeet(x.size, y.size)?;
        let stable = x.stable && y.stable;
        Ok(self.array(elem, size, stable))
    }

    fn meet_vectors(
        &mut self,
        a: TypeId,
        b: TypeId,
        x: &VectorType,
        y: &VectorType,
    ) -> LatticeResult<TypeId> {
        if x.kind != y.kind || x.length != y.length {
            return Err(LatticeError::VectorShapeMismatch {
                left: self.dump(a),
                right: self.dump(b),
            });
        }
        let elem = self.xmeet(x.elem, y.elem)?;
        Ok(self.vector(x.kind, elem, x.length))
    }
}

#[cfg(test)]
mod tests {
    use crate::class_model::ClassHierarchy;
    use crate::config::LatticeConfig;
    use crate::error::LatticeError;
    use crate::intern::{TypeId, TypeStore};
    use crate::types::{Offset, Ptr, VectorKind};

    fn checked(classes: &ClassHierarchy) -> TypeStore<'_> {
        TypeStore::with_config(classes, LatticeConfig::checked())
    }

    // =========================================================================
    // Top / Bottom Tests
    // =========================================================================

    #[test]
    fn test_top_is_identity() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        for id in [TypeId::INT, TypeId::CONTROL, TypeId::MEMORY, TypeId::PTR_BOTTOM] {
            assert_eq!(store.meet(TypeId::TOP, id), id);
            assert_eq!(store.meet(id, TypeId::TOP), id);
        }
    }

    #[test]
    fn test_bottom_absorbs() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let five = store.int_con(5);
        assert_eq!(store.meet(five, TypeId::BOTTOM), TypeId::BOTTOM);
        assert_eq!(store.meet(TypeId::BOTTOM, TypeId::ABIO), TypeId::BOTTOM);
    }

    // =========================================================================
    // Scalar Tests
    // =========================================================================

    #[test]
    fn test_range_meet() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let a = store.int(1, 5);
        let b = store.int(10, 20);
        assert_eq!(store.meet(a, b), store.int(1, 20));
    }

    #[test]
    fn test_constant_meet() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let seven = store.int_con(7);
        let nine = store.int_con(9);
        assert_eq!(store.meet(seven, seven), seven);
        let both = store.meet(seven, nine);
        assert_eq!(both, store.int(7, 9));
        assert!(!store.is_singleton(both));
    }

    #[test]
    fn test_mixed_data_meets_to_bottom() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let one = store.long_con(1);
        assert_eq!(store.meet(TypeId::INT, one), TypeId::BOTTOM);
        assert_eq!(store.meet(TypeId::FLOAT, TypeId::DOUBLE), TypeId::BOTTOM);
        assert_eq!(store.meet(TypeId::INT, TypeId::NULL_PTR), TypeId::BOTTOM);
    }

    #[test]
    fn test_float_meets() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let half = store.float_con(0.5);
        let quarter = store.float_con(0.25);
        assert_eq!(store.meet(TypeId::FLOAT_TOP, half), half);
        assert_eq!(store.meet(half, quarter), TypeId::FLOAT);
        assert_eq!(store.meet(half, TypeId::FLOAT), TypeId::FLOAT);

        let pos = store.double_con(0.0);
        let neg = store.double_con(-0.0);
        assert_eq!(store.meet(pos, neg), TypeId::DOUBLE);
    }

    #[test]
    fn test_incompatible_kinds_error() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let err = store.try_meet(TypeId::CONTROL, TypeId::INT).unwrap_err();
        assert!(matches!(err, LatticeError::IncompatibleKinds { .. }));
        assert!(store.try_meet(TypeId::MEMORY, TypeId::ABIO).is_err());
    }

    #[test]
    #[should_panic(expected = "incompatible lattice values")]
    fn test_incompatible_kinds_fatal() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);
        store.meet(TypeId::CONTROL, TypeId::HALF);
    }

    // =========================================================================
    // Aggregate Tests
    // =========================================================================

    #[test]
    fn test_tuple_meet_is_field_wise() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let (one, two) = (store.int_con(1), store.int_con(2));
        let a = store.tuple(&[one, TypeId::FLOAT_TOP]);
        let b = store.tuple(&[two, TypeId::FLOAT]);
        let expected_first = store.int(1, 2);
        let expected = store.tuple(&[expected_first, TypeId::FLOAT]);
        assert_eq!(store.meet(a, b), expected);
    }

    #[test]
    fn test_tuple_arity_mismatch() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let a = store.tuple(&[TypeId::INT]);
        let b = store.tuple(&[TypeId::INT, TypeId::INT]);
        let err = store.try_meet(a, b).unwrap_err();
        assert!(matches!(
            err,
            LatticeError::ArityMismatch {
                left_len: 1,
                right_len: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_call_tuple_prefix() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let a = store.call_tuple(&[TypeId::INT]);
        let b = store.call_tuple(&[TypeId::NULL_PTR]);
        let m = store.meet(a, b);
        let expected = store.call_tuple(&[TypeId::BOTTOM]);
        assert_eq!(m, expected);
    }

    #[test]
    fn test_array_meet() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let (s1, s2) = (store.int(0, 10), store.int(5, 100));
        let a = store.array(TypeId::INT, s1, true);
        let b = store.array(TypeId::INT, s2, false);
        let size = store.int(0, 100);
        assert_eq!(store.meet(a, b), store.array(TypeId::INT, size, false));
    }

    #[test]
    fn test_vector_meet() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let (one, two) = (store.int_con(1), store.int_con(2));
        let a = store.vector(VectorKind::X, one, 4);
        let b = store.vector(VectorKind::X, two, 4);
        let elem = store.int(1, 2);
        assert_eq!(store.meet(a, b), store.vector(VectorKind::X, elem, 4));

        let c = store.vector(VectorKind::Y, one, 8);
        assert!(matches!(
            store.try_meet(a, c),
            Err(LatticeError::VectorShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_function_meets_only_itself() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let f = store.function(&[TypeId::INT], &[TypeId::LONG]);
        let g = store.function(&[TypeId::LONG], &[TypeId::LONG]);
        assert_eq!(store.meet(f, f), f);
        assert_eq!(store.meet(f, TypeId::TOP), f);
        assert!(store.try_meet(f, g).is_err());
    }

    #[test]
    fn test_join_derivation() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let a = store.int(0, 100);
        let b = store.int(50, 200);
        assert_eq!(store.join(a, b), store.int(50, 100));

        let p = store.any_ptr(Ptr::NotNull, Offset::ZERO);
        // Not null and null join to an empty pointer at offset 0.
        assert_eq!(store.join(p, TypeId::NULL_PTR), store.any_ptr(Ptr::Top, Offset::ZERO));
    }

    #[test]
    fn test_meet_all() {
        let classes = ClassHierarchy::new();
        let mut store = checked(&classes);

        let vals: Vec<TypeId> = (0..5).map(|v| store.int_con(v * 10)).collect();
        assert_eq!(store.meet_all(&vals), store.int(0, 40));
        assert_eq!(store.meet_all(&[]), TypeId::TOP);
    }
}
