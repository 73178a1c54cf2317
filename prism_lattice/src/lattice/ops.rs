//! Operations derived from the core algebra.
//!
//! - `filter`: join that maps contradictions to Top
//! - `widen` / `narrow`: convergence control for integer ranges
//! - `higher_equal`: the partial order
//! - constant and emptiness queries
//! - pointer casts that rebuild one component of a pointer value

use crate::class_model::ClassId;
use crate::error::{fatal, LatticeResult};
use crate::intern::{TypeId, TypeStore};
use crate::types::{Category, ConstValue, InstanceId, IntRange, Offset, Ptr, TypeKind};

impl<'cm> TypeStore<'cm> {
    // =========================================================================
    // Filter
    // =========================================================================

    /// Narrow `id` by the facts in `kills`.
    ///
    /// Like `join`, except that a contradiction comes back as Top and an
    /// integer range keeps its own widen level.
    pub fn filter(&mut self, id: TypeId, kills: TypeId) -> TypeId {
        self.try_filter(id, kills).unwrap_or_else(|err| fatal(err))
    }

    pub fn try_filter(&mut self, id: TypeId, kills: TypeId) -> LatticeResult<TypeId> {
        self.filter_helper(id, kills, false)
    }

    /// Filter that keeps speculative overlays.
    pub fn filter_speculative(&mut self, id: TypeId, kills: TypeId) -> TypeId {
        self.filter_helper(id, kills, true)
            .unwrap_or_else(|err| fatal(err))
    }

    fn filter_helper(
        &mut self,
        id: TypeId,
        kills: TypeId,
        include_speculative: bool,
    ) -> LatticeResult<TypeId> {
        let widen_limit = self.config.widen_limit;
        let kind = self.kind(id).clone();
        let kills_kind = self.kind(kills).clone();

        match (&kind, &kills_kind) {
            (TypeKind::Int(x), TypeKind::Int(k)) => Ok(match x.filter(k, widen_limit) {
                Some(r) => self.intern(TypeKind::Int(r)),
                None => TypeId::TOP,
            }),
            (TypeKind::Long(x), TypeKind::Long(k)) => Ok(match x.filter(k, widen_limit) {
                Some(r) => self.intern(TypeKind::Long(r)),
                None => TypeId::TOP,
            }),
            (TypeKind::Int(x), _) => {
                let ft = self.join_helper(id, kills, include_speculative)?;
                let joined = match self.kind(ft) {
                    TypeKind::Int(r) if !r.is_empty() => Some(*r),
                    _ => None,
                };
                Ok(match joined {
                    Some(r) => self.intern(TypeKind::Int(keep_widen(r, x, widen_limit))),
                    None => TypeId::TOP,
                })
            }
            (TypeKind::Long(x), _) => {
                let ft = self.join_helper(id, kills, include_speculative)?;
                let joined = match self.kind(ft) {
                    TypeKind::Long(r) if !r.is_empty() => Some(*r),
                    _ => None,
                };
                Ok(match joined {
                    Some(r) => self.intern(TypeKind::Long(keep_widen(r, x, widen_limit))),
                    None => TypeId::TOP,
                })
            }

            (TypeKind::NarrowOop(p), TypeKind::NarrowOop(k)) => {
                let ft = self.filter_helper(*p, *k, include_speculative)?;
                Ok(self.rewrap_filtered(ft, TypeKind::NarrowOop))
            }
            (TypeKind::NarrowClass(p), TypeKind::NarrowClass(k)) => {
                let ft = self.filter_helper(*p, *k, include_speculative)?;
                Ok(self.rewrap_filtered(ft, TypeKind::NarrowClass))
            }
            (TypeKind::NarrowOop(p) | TypeKind::NarrowClass(p), k) if k.is_ptr() => {
                let ft = self.join_helper(*p, kills, include_speculative)?;
                Ok(if self.is_empty_value(ft) { TypeId::TOP } else { ft })
            }
            (TypeKind::NarrowOop(_) | TypeKind::NarrowClass(_), _) => Ok(TypeId::TOP),

            (k, _) if k.is_oop_ptr() => self.filter_oop(id, kills, include_speculative),

            _ => {
                let ft = self.join_helper(id, kills, include_speculative)?;
                Ok(if self.is_empty_value(ft) { TypeId::TOP } else { ft })
            }
        }
    }

    fn rewrap_filtered(&mut self, ft: TypeId, wrap: fn(TypeId) -> TypeKind) -> TypeId {
        if self.is_empty_value(ft) {
            TypeId::TOP
        } else if self.kind(ft).is_ptr() {
            self.intern(wrap(ft))
        } else {
            ft
        }
    }

    /// Object pointers need two interface corrections on top of the join.
    fn filter_oop(
        &mut self,
        id: TypeId,
        kills: TypeId,
        include_speculative: bool,
    ) -> LatticeResult<TypeId> {
        let ft = self.join_helper(id, kills, include_speculative)?;
        let kills_interface = match self.kind(kills) {
            TypeKind::InstPtr(k) => Some(self.is_loaded_interface(k.class)),
            _ => None,
        };

        if self.is_empty_value(ft) {
            // A class value flowing into an interface-typed slot: the class
            // meet fell to the root, which says nothing about the interface.
            // Same for arrays of classes flowing into arrays of interfaces.
            if !self.is_empty_value(id) {
                if kills_interface == Some(true) {
                    return Ok(kills);
                }
                let base = self.array_base_elements(ft, kills).map(|(_, k)| k);
                if base.is_some_and(|k| self.is_loaded_interface(k)) {
                    return Ok(kills);
                }
            }
            return Ok(TypeId::TOP);
        }

        // An interface result narrowed by a class: report the class.
        let interface_ptr = match self.kind(ft) {
            TypeKind::InstPtr(f) if self.is_loaded_interface(f.class) => Some(f.info.ptr),
            _ => None,
        };
        match (interface_ptr, kills_interface) {
            (Some(ptr), Some(false)) => Ok(self.cast_to_ptr_type(kills, ptr)),
            _ => Ok(ft),
        }
    }

    fn is_loaded_interface(&self, class: ClassId) -> bool {
        self.classes.is_loaded(class) && self.classes.is_interface(class)
    }

    /// Element classes at the bottom of two array pointers of the same
    /// depth, when both bottom out in instances.
    fn array_base_elements(&self, a: TypeId, b: TypeId) -> Option<(ClassId, ClassId)> {
        let (TypeKind::ArrayPtr(x), TypeKind::ArrayPtr(y)) = (self.kind(a), self.kind(b)) else {
            return None;
        };
        let mut a = self.array_elem_ptr(x.body)?;
        let mut b = self.array_elem_ptr(y.body)?;
        loop {
            match (self.kind(a), self.kind(b)) {
                (TypeKind::ArrayPtr(x), TypeKind::ArrayPtr(y)) => {
                    a = self.array_elem_ptr(x.body)?;
                    b = self.array_elem_ptr(y.body)?;
                }
                (TypeKind::InstPtr(x), TypeKind::InstPtr(y)) => return Some((x.class, y.class)),
                _ => return None,
            }
        }
    }

    /// Element of an array body as a pointer, looking through compressed
    /// references.
    fn array_elem_ptr(&self, body: TypeId) -> Option<TypeId> {
        let TypeKind::Array(body) = self.kind(body) else {
            return None;
        };
        match self.kind(body.elem) {
            TypeKind::NarrowOop(ptr) => Some(*ptr),
            kind if kind.is_ptr() => Some(body.elem),
            _ => None,
        }
    }

    // =========================================================================
    // Widen / Narrow
    // =========================================================================

    /// Generalize `id` (the new value) against `old` during iteration.
    ///
    /// `limit`, when an integer range of the same width, bounds the
    /// half-open ranges a saturated range snaps to. Values other than
    /// integer ranges are returned unchanged.
    pub fn widen(&mut self, id: TypeId, old: TypeId, limit: Option<TypeId>) -> TypeId {
        let widen_limit = self.config.widen_limit;
        let limit_kind = limit.map(|l| self.kind(l).clone());
        match (self.kind(id).clone(), self.kind(old).clone()) {
            (TypeKind::Int(x), TypeKind::Int(o)) => {
                let lim = match &limit_kind {
                    Some(TypeKind::Int(l)) => Some(*l),
                    _ => None,
                };
                let r = x.widen(&o, lim.as_ref(), widen_limit);
                self.intern(TypeKind::Int(r))
            }
            (TypeKind::Long(x), TypeKind::Long(o)) => {
                let lim = match &limit_kind {
                    Some(TypeKind::Long(l)) => Some(*l),
                    _ => None,
                };
                let r = x.widen(&o, lim.as_ref(), widen_limit);
                self.intern(TypeKind::Long(r))
            }
            _ => id,
        }
    }

    /// Tighten `old` toward `id` when the shrink is large enough.
    pub fn narrow(&mut self, id: TypeId, old: TypeId) -> TypeId {
        match (self.kind(id).clone(), self.kind(old).clone()) {
            (TypeKind::Int(x), TypeKind::Int(o)) => self.intern(TypeKind::Int(x.narrow(&o))),
            (TypeKind::Long(x), TypeKind::Long(o)) => self.intern(TypeKind::Long(x.narrow(&o))),
            _ => id,
        }
    }

    // =========================================================================
    // Order and Queries
    // =========================================================================

    /// Whether `a` is at or above `b`: `meet(a, b) == b`, overlays ignored.
    ///
    /// Values that cannot be met are unordered.
    pub fn higher_equal(&mut self, a: TypeId, b: TypeId) -> bool {
        let b = self.remove_speculative(b);
        self.try_meet(a, b).is_ok_and(|mt| mt == b)
    }

    /// Whether `id` holds no value at all.
    pub fn is_empty_value(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Top | TypeKind::FloatTop | TypeKind::DoubleTop => true,
            TypeKind::Int(r) => r.is_empty(),
            TypeKind::Long(r) => r.is_empty(),
            TypeKind::NarrowOop(p) | TypeKind::NarrowClass(p) => self.is_empty_value(*p),
            TypeKind::Tuple(fields) => fields.iter().any(|f| self.is_empty_value(*f)),
            TypeKind::Array(body) => {
                self.is_empty_value(body.elem) || self.is_empty_value(body.size)
            }
            TypeKind::ArrayPtr(ary) if self.is_empty_value(ary.body) => true,
            kind if kind.is_ptr() => {
                kind.offset() == Some(Offset::Top) || kind.ptr().is_some_and(Ptr::above_centerline)
            }
            _ => false,
        }
    }

    /// Whether `id` denotes exactly one runtime value.
    pub fn is_singleton(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Int(r) => r.is_constant(),
            TypeKind::Long(r) => r.is_constant(),
            TypeKind::FloatCon(_) | TypeKind::DoubleCon(_) => true,
            TypeKind::NarrowOop(p) | TypeKind::NarrowClass(p) => self.is_singleton(*p),
            TypeKind::AnyPtr(info) => info.ptr == Ptr::Null && info.offset.is_exact(),
            TypeKind::RawPtr(raw) => raw.ptr == Ptr::Constant,
            kind @ (TypeKind::ObjectPtr(_)
            | TypeKind::InstPtr(_)
            | TypeKind::ArrayPtr(_)
            | TypeKind::ClassPtr(_)
            | TypeKind::MetadataPtr(_)) => {
                kind.ptr() == Some(Ptr::Constant) && kind.offset() == Some(Offset::ZERO)
            }
            _ => false,
        }
    }

    /// The value of a singleton.
    pub fn as_constant(&self, id: TypeId) -> Option<ConstValue> {
        if !self.is_singleton(id) {
            return None;
        }
        match self.kind(id) {
            TypeKind::Int(r) => Some(ConstValue::Int(r.lo)),
            TypeKind::Long(r) => Some(ConstValue::Long(r.lo)),
            TypeKind::FloatCon(f) => Some(ConstValue::Float(f.value())),
            TypeKind::DoubleCon(d) => Some(ConstValue::Double(d.value())),
            TypeKind::NarrowOop(p) | TypeKind::NarrowClass(p) => self.as_constant(*p),
            TypeKind::AnyPtr(_) => Some(ConstValue::Null),
            TypeKind::RawPtr(raw) => Some(ConstValue::RawAddress(raw.bits)),
            TypeKind::InstPtr(inst) => inst.constant.map(ConstValue::Object),
            TypeKind::ArrayPtr(ary) => ary.constant.map(ConstValue::Object),
            TypeKind::ClassPtr(k) => Some(ConstValue::Class(k.class)),
            TypeKind::MetadataPtr(m) => m.metadata.map(ConstValue::Metadata),
            _ => None,
        }
    }

    pub fn category(&self, id: TypeId) -> Category {
        match self.kind(id) {
            TypeKind::Top | TypeKind::Bottom => Category::Undefined,
            TypeKind::Control => Category::Control,
            TypeKind::Memory => Category::Memory,
            TypeKind::AbstractIo | TypeKind::ReturnAddress | TypeKind::Function(_) => {
                Category::Other
            }
            TypeKind::Tuple(fields) => {
                if fields.iter().all(|f| self.category(*f) == Category::Data) {
                    Category::Data
                } else {
                    Category::Mixed
                }
            }
            _ => Category::Data,
        }
    }

    /// Whether a float or double constant is finite.
    pub fn is_finite(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::FloatCon(f) => f.value().is_finite(),
            TypeKind::DoubleCon(d) => d.value().is_finite(),
            _ => false,
        }
    }

    pub fn is_nan(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::FloatCon(f) => f.value().is_nan(),
            TypeKind::DoubleCon(d) => d.value().is_nan(),
            _ => false,
        }
    }

    /// Whether a pointer (or compressed pointer) may be null.
    pub fn maybe_null(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::NarrowOop(p) | TypeKind::NarrowClass(p) => self.maybe_null(*p),
            kind => kind.ptr().is_some_and(Ptr::maybe_null),
        }
    }

    /// Whether an object pointer names a single allocation site.
    pub fn is_known_instance(&self, id: TypeId) -> bool {
        self.kind(id).instance().is_some_and(InstanceId::is_known)
    }

    // =========================================================================
    // Pointer Casts
    // =========================================================================

    /// Same pointer moved by `delta` bytes.
    pub fn add_offset(&mut self, id: TypeId, delta: i64) -> TypeId {
        let mut kind = self.kind(id).clone();
        match &mut kind {
            TypeKind::RawPtr(raw) => {
                if raw.ptr != Ptr::Constant {
                    return id;
                }
                let bits = raw.bits.wrapping_add(delta as u64);
                return self.raw_const(bits);
            }
            TypeKind::AnyPtr(info) => info.offset = info.offset.add_bytes(delta),
            TypeKind::ObjectPtr(o) => o.info.offset = o.info.offset.add_bytes(delta),
            TypeKind::InstPtr(i) => i.info.offset = i.info.offset.add_bytes(delta),
            TypeKind::ArrayPtr(a) => a.info.offset = a.info.offset.add_bytes(delta),
            TypeKind::ClassPtr(k) => k.offset = k.offset.add_bytes(delta),
            TypeKind::MetadataPtr(m) => m.offset = m.offset.add_bytes(delta),
            TypeKind::NarrowOop(p) => {
                let moved = self.add_offset(*p, delta);
                return self.intern(TypeKind::NarrowOop(moved));
            }
            _ => return id,
        }
        self.intern(kind)
    }

    /// Same pointer with niceness `ptr`.
    pub fn cast_to_ptr_type(&mut self, id: TypeId, ptr: Ptr) -> TypeId {
        let mut kind = self.kind(id).clone();
        if kind.ptr() == Some(ptr) {
            return id;
        }
        match &mut kind {
            TypeKind::AnyPtr(info) => {
                if ptr == Ptr::Constant {
                    return id;
                }
                info.ptr = ptr;
            }
            TypeKind::RawPtr(raw) => {
                if matches!(ptr, Ptr::Constant | Ptr::Null) {
                    return id;
                }
                raw.ptr = ptr;
                raw.bits = 0;
            }
            TypeKind::ObjectPtr(o) => o.info.ptr = ptr,
            TypeKind::InstPtr(i) => {
                i.info.ptr = ptr;
                if ptr != Ptr::Constant {
                    i.constant = None;
                }
            }
            TypeKind::ArrayPtr(a) => {
                a.info.ptr = ptr;
                if ptr != Ptr::Constant {
                    a.constant = None;
                }
            }
            TypeKind::ClassPtr(k) => k.ptr = ptr,
            TypeKind::MetadataPtr(m) => m.ptr = ptr,
            TypeKind::NarrowOop(p) => {
                let cast = self.cast_to_ptr_type(*p, ptr);
                return self.intern(TypeKind::NarrowOop(cast));
            }
            TypeKind::NarrowClass(p) => {
                let cast = self.cast_to_ptr_type(*p, ptr);
                return self.intern(TypeKind::NarrowClass(cast));
            }
            _ => return id,
        }
        self.intern(kind)
    }

    /// Same pointer with the class marked exact or inexact.
    ///
    /// Exactness that the class itself forces (final classes, constants,
    /// primitive arrays) cannot be cleared; interfaces cannot be exact.
    pub fn cast_to_exactness(&mut self, id: TypeId, exact: bool) -> TypeId {
        let classes = self.classes;
        let mut kind = self.kind(id).clone();
        match &mut kind {
            TypeKind::InstPtr(i) => {
                if i.exact == exact || !classes.is_loaded(i.class) {
                    return id;
                }
                if classes.is_final(i.class) || i.constant.is_some() {
                    return id;
                }
                if classes.is_interface(i.class) {
                    return id;
                }
                i.exact = exact;
            }
            TypeKind::ArrayPtr(a) => {
                if a.exact == exact || self.array_must_be_exact(a.body) {
                    return id;
                }
                a.exact = exact;
            }
            TypeKind::ClassPtr(k) => {
                if exact == (k.ptr == Ptr::Constant) {
                    return id;
                }
                k.ptr = if exact { Ptr::Constant } else { Ptr::NotNull };
            }
            _ => return id,
        }
        self.intern(kind)
    }

    /// Same object pointer tied to allocation site `instance`.
    pub fn cast_to_instance_id(&mut self, id: TypeId, instance: InstanceId) -> TypeId {
        let mut kind = self.kind(id).clone();
        match &mut kind {
            TypeKind::ObjectPtr(o) => o.instance = instance,
            TypeKind::InstPtr(i) => i.instance = instance,
            TypeKind::ArrayPtr(a) => a.instance = instance,
            _ => return id,
        }
        self.intern(kind)
    }

    /// Class of an instance pointer.
    pub fn instance_class_of(&self, id: TypeId) -> Option<ClassId> {
        match self.kind(id) {
            TypeKind::InstPtr(inst) => Some(inst.class),
            TypeKind::ArrayPtr(ary) => ary.class,
            TypeKind::ClassPtr(k) => Some(k.class),
            TypeKind::NarrowOop(p) | TypeKind::NarrowClass(p) => self.instance_class_of(*p),
            _ => None,
        }
    }
}

/// Filtered range with the receiver's widen level when that is higher.
fn keep_widen<T: crate::types::IntegerWidth>(
    r: IntRange<T>,
    receiver: &IntRange<T>,
    widen_limit: u8,
) -> IntRange<T> {
    if r.widen < receiver.widen {
        IntRange::new(r.lo, r.hi, receiver.widen, widen_limit)
    } else {
        r
    }
}
