//! Pointer meets.
//!
//! The pointer variants form a small hierarchy:
//!
//! ```text
//!                  AnyPtr
//!      /      /       |        \          \
//!   RawPtr  ObjectPtr  MetadataPtr  ClassPtr
//!            /     \
//!        InstPtr  ArrayPtr
//! ```
//!
//! A meet between two pointer variants is computed by the more derived
//! operand, which knows how to absorb its ancestors. Raw, metadata and
//! class pointers never mix with each other or with heap references; such
//! pairs meet to the generic pointer bottom.
//!
//! Class refinement follows a few rules that matter for soundness:
//! - Above the centerline the more specific class wins, below it the
//!   common ancestor
//! - Unrelated exact classes cannot both be non-null at the same time, so
//!   their meet drops exactness and any constant
//! - Interfaces are not trusted unless exact: an interface meeting a class
//!   that implements it keeps the class

use crate::class_model::ClassId;
use crate::error::{LatticeError, LatticeResult};
use crate::intern::{TypeId, TypeStore};
use crate::types::{
    ArrayPtr, ClassPtr, InstPtr, InstanceId, MetadataPtr, ObjectPtr, Offset, Ptr, PtrInfo, RawPtr,
    Speculation, TypeKind,
};

/// Position in the pointer hierarchy; the higher rank handles the meet.
fn rank(kind: &TypeKind) -> u8 {
    match kind {
        TypeKind::AnyPtr(_) => 0,
        TypeKind::RawPtr(_) => 1,
        TypeKind::ObjectPtr(_) => 2,
        TypeKind::InstPtr(_) => 3,
        TypeKind::ArrayPtr(_) => 4,
        TypeKind::MetadataPtr(_) => 5,
        TypeKind::ClassPtr(_) => 6,
        _ => u8::MAX,
    }
}

impl<'cm> TypeStore<'cm> {
    pub(crate) fn xmeet_ptr(&mut self, a: TypeId, b: TypeId) -> LatticeResult<TypeId> {
        let (hi, lo) = if rank(self.kind(a)) >= rank(self.kind(b)) {
            (a, b)
        } else {
            (b, a)
        };
        let kh = self.kind(hi).clone();
        let kl = self.kind(lo).clone();

        let res = match (&kh, &kl) {
            (TypeKind::AnyPtr(x), TypeKind::AnyPtr(y)) => {
                let spec = self.meet_overlay(hi, lo)?;
                Ok(self.make_any(x.ptr.meet(y.ptr), x.offset.meet(y.offset), spec))
            }

            (TypeKind::RawPtr(x), TypeKind::RawPtr(y)) => Ok(self.meet_raw_raw(hi, lo, x, y)),
            (TypeKind::RawPtr(x), TypeKind::AnyPtr(tp)) => self.meet_raw_any(hi, lo, x, tp),
            (_, TypeKind::RawPtr(_)) => Ok(TypeId::PTR_BOTTOM),

            (TypeKind::ObjectPtr(x), TypeKind::AnyPtr(tp)) => self.meet_object_any(hi, lo, x, tp),
            (TypeKind::ObjectPtr(x), TypeKind::ObjectPtr(y)) => {
                let spec = self.meet_overlay(hi, lo)?;
                Ok(self.make_object(
                    x.info.ptr.meet(y.info.ptr),
                    x.info.offset.meet(y.info.offset),
                    x.instance.meet(y.instance),
                    spec,
                ))
            }

            (TypeKind::InstPtr(x), TypeKind::AnyPtr(tp)) => self.meet_inst_any(hi, lo, x, tp),
            (TypeKind::InstPtr(x), TypeKind::ObjectPtr(tp)) => self.meet_inst_object(hi, lo, x, tp),
            (TypeKind::InstPtr(x), TypeKind::InstPtr(y)) => self.meet_inst_inst(hi, lo, x, y),

            (TypeKind::ArrayPtr(x), TypeKind::AnyPtr(tp)) => self.meet_array_any(hi, lo, x, tp),
            (TypeKind::ArrayPtr(x), TypeKind::ObjectPtr(tp)) => {
                self.meet_array_object(hi, lo, x, tp)
            }
            (TypeKind::ArrayPtr(x), TypeKind::InstPtr(tp)) => self.meet_array_inst(hi, lo, x, tp),
            (TypeKind::ArrayPtr(x), TypeKind::ArrayPtr(y)) => self.meet_array_array(hi, lo, x, y),

            (TypeKind::MetadataPtr(x), TypeKind::AnyPtr(tp)) => self.meet_metadata_any(hi, x, tp),
            (TypeKind::MetadataPtr(x), TypeKind::MetadataPtr(y)) => {
                Ok(self.meet_metadata_metadata(hi, lo, x, y))
            }
            (TypeKind::MetadataPtr(_), _) => Ok(TypeId::PTR_BOTTOM),

            (TypeKind::ClassPtr(x), TypeKind::AnyPtr(tp)) => self.meet_class_any(hi, x, tp),
            (TypeKind::ClassPtr(x), TypeKind::ClassPtr(y)) => Ok(self.meet_class_class(x, y)),
            (TypeKind::ClassPtr(_), _) => Ok(TypeId::PTR_BOTTOM),

            _ => Err(LatticeError::IncompatibleKinds {
                left: self.dump(a),
                right: self.dump(b),
            }),
        }?;

        Ok(self.drop_redundant_speculation(res))
    }

    fn invalid_pointer(&self, id: TypeId) -> LatticeError {
        LatticeError::InvalidPointer {
            value: self.dump(id),
        }
    }

    // =========================================================================
    // Speculative Overlay
    // =========================================================================

    /// Meet of two overlays. A side without a guess contributes its primary
    /// value; depths meet independently.
    fn meet_overlay(&mut self, a: TypeId, b: TypeId) -> LatticeResult<Speculation> {
        let sa = self.kind(a).speculation().unwrap_or(Speculation::NONE);
        let sb = self.kind(b).speculation().unwrap_or(Speculation::NONE);
        let guess = match (sa.guess, sb.guess) {
            (None, None) => None,
            (ga, gb) => Some(self.meet_helper(ga.unwrap_or(a), gb.unwrap_or(b), false)?),
        };
        Ok(Speculation {
            guess,
            inline_depth: sa.inline_depth.meet(sb.inline_depth),
        })
    }

    /// A guess equal to the primary value adds nothing.
    fn drop_redundant_speculation(&mut self, id: TypeId) -> TypeId {
        let Some(guess) = self.kind(id).speculation().and_then(|s| s.guess) else {
            return id;
        };
        let stripped = self.remove_speculative(id);
        if stripped == guess {
            stripped
        } else {
            id
        }
    }

    // =========================================================================
    // Raw Pointers
    // =========================================================================

    fn meet_raw_raw(&mut self, hi: TypeId, lo: TypeId, x: &RawPtr, y: &RawPtr) -> TypeId {
        let mut ptr = x.ptr.meet(y.ptr);
        if ptr == Ptr::Constant {
            if y.ptr == Ptr::Constant && x.ptr != Ptr::Constant {
                return lo;
            }
            if x.ptr == Ptr::Constant && y.ptr != Ptr::Constant {
                return hi;
            }
            // Two different addresses.
            ptr = Ptr::NotNull;
        }
        self.make_raw(ptr)
    }

    fn meet_raw_any(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        raw: &RawPtr,
        tp: &PtrInfo,
    ) -> LatticeResult<TypeId> {
        match tp.ptr {
            Ptr::Top => Ok(hi),
            Ptr::Bottom => Ok(lo),
            Ptr::Null => Ok(if raw.ptr == Ptr::Top {
                lo
            } else {
                TypeId::RAW_BOTTOM
            }),
            Ptr::NotNull => Ok(self.make_any(
                raw.ptr.meet(Ptr::NotNull),
                tp.offset.meet(Offset::ZERO),
                tp.spec,
            )),
            Ptr::AnyNull => Ok(if raw.ptr == Ptr::Constant {
                hi
            } else {
                self.make_raw(raw.ptr.meet(Ptr::AnyNull))
            }),
            Ptr::Constant => Err(self.invalid_pointer(lo)),
        }
    }

    // =========================================================================
    // Object Pointers
    // =========================================================================

    fn meet_object_any(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        obj: &ObjectPtr,
        tp: &PtrInfo,
    ) -> LatticeResult<TypeId> {
        let offset = obj.info.offset.meet(tp.offset);
        let ptr = obj.info.ptr.meet(tp.ptr);
        let spec = self.meet_overlay(hi, lo)?;
        match tp.ptr {
            Ptr::Null if ptr == Ptr::Null => Ok(self.make_any(ptr, offset, spec)),
            Ptr::Null | Ptr::Top | Ptr::AnyNull => {
                Ok(self.make_object(ptr, offset, obj.instance, spec))
            }
            Ptr::NotNull | Ptr::Bottom => Ok(self.make_any(ptr, offset, spec)),
            Ptr::Constant => Err(self.invalid_pointer(lo)),
        }
    }

    // =========================================================================
    // Instance Pointers
    // =========================================================================

    fn meet_inst_any(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        inst: &InstPtr,
        tp: &PtrInfo,
    ) -> LatticeResult<TypeId> {
        let offset = inst.info.offset.meet(tp.offset);
        let ptr = inst.info.ptr.meet(tp.ptr);
        let spec = self.meet_overlay(hi, lo)?;
        match tp.ptr {
            Ptr::Null if ptr == Ptr::Null => Ok(self.make_any(ptr, offset, spec)),
            Ptr::Null | Ptr::Top | Ptr::AnyNull => {
                let constant = if ptr == Ptr::Constant {
                    inst.constant
                } else {
                    None
                };
                Ok(self.make_inst(ptr, inst.class, inst.exact, constant, offset, inst.instance, spec))
            }
            Ptr::NotNull | Ptr::Bottom => Ok(self.make_any(ptr, offset, spec)),
            Ptr::Constant => Err(self.invalid_pointer(lo)),
        }
    }

    fn meet_inst_object(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        inst: &InstPtr,
        tp: &ObjectPtr,
    ) -> LatticeResult<TypeId> {
        let offset = inst.info.offset.meet(tp.info.offset);
        let ptr = inst.info.ptr.meet(tp.info.ptr);
        let spec = self.meet_overlay(hi, lo)?;
        match tp.info.ptr {
            Ptr::Top | Ptr::AnyNull => {
                let constant = if ptr == Ptr::Constant {
                    inst.constant
                } else {
                    None
                };
                Ok(self.make_inst(ptr, inst.class, inst.exact, constant, offset, inst.instance, spec))
            }
            Ptr::NotNull | Ptr::Bottom => {
                let instance = inst.instance.meet(tp.instance);
                Ok(self.make_object(ptr, offset, instance, spec))
            }
            Ptr::Null | Ptr::Constant => Err(self.invalid_pointer(lo)),
        }
    }

    fn meet_inst_inst(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        this: &InstPtr,
        tinst: &InstPtr,
    ) -> LatticeResult<TypeId> {
        let classes = self.classes;
        let off = this.info.offset.meet(tinst.info.offset);
        let mut ptr = this.info.ptr.meet(tinst.info.ptr);
        let mut instance = this.instance.meet(tinst.instance);
        let spec = self.meet_overlay(hi, lo)?;

        if ptr != Ptr::Constant && this.class == tinst.class && this.exact == tinst.exact {
            return Ok(self.make_inst(ptr, this.class, this.exact, None, off, instance, spec));
        }

        if !classes.is_loaded(this.class) || !classes.is_loaded(tinst.class) {
            return Ok(self.meet_unloaded(hi, lo, this, tinst, ptr, off, instance, spec));
        }

        let object = classes.object_class();
        let mut this_class = this.class;
        let mut tinst_class = tinst.class;
        let mut this_xk = this.exact;
        let mut tinst_xk = tinst.exact;

        // Put an interface, if any, on the tinst side.
        if classes.is_interface(this_class)
            && !(classes.is_interface(tinst_class) || tinst_class == object)
        {
            std::mem::swap(&mut this_class, &mut tinst_class);
            std::mem::swap(&mut this_xk, &mut tinst_xk);
        }

        // A class meeting an interface.
        if classes.is_interface(tinst_class)
            && !(classes.is_interface(this_class) || this_class == object)
        {
            let (class, xk);
            if classes.is_subtype_of(this_class, tinst_class) {
                // Below the centerline the interface is the more general
                // answer; above it the implementing class is.
                let below = ptr.below_centerline();
                class = if below { tinst_class } else { this_class };
                xk = if below { tinst_xk } else { this_xk };
            } else {
                let above = ptr.above_centerline();
                class = if above { tinst_class } else { object };
                xk = if above { tinst_xk } else { false };
                if ptr == Ptr::Constant {
                    ptr = Ptr::NotNull;
                }
                if instance.is_known() {
                    instance = InstanceId::Bottom;
                }
            }
            let constant = if ptr == Ptr::Constant {
                if this_class == this.class {
                    this.constant
                } else {
                    tinst.constant
                }
            } else {
                None
            };
            return Ok(self.make_inst(ptr, class, xk, constant, off, instance, spec));
        }

        // Pick the more specific class when one side is a subtype of the
        // other and the supertype side is not exact.
        let mut subtype: Option<ClassId> = None;
        let mut subtype_exact = false;
        if tinst_class == this_class {
            subtype = Some(this_class);
            subtype_exact = if ptr.below_centerline() {
                this_xk && tinst_xk
            } else {
                this_xk || tinst_xk
            };
        } else if !tinst_xk && classes.is_subtype_of(this_class, tinst_class) {
            subtype = Some(this_class);
            subtype_exact = this_xk;
        } else if !this_xk && classes.is_subtype_of(tinst_class, this_class) {
            subtype = Some(tinst_class);
            subtype_exact = tinst_xk;
        }

        if let Some(sub) = subtype {
            if ptr.above_centerline() {
                this_class = sub;
                tinst_class = sub;
                this_xk = subtype_exact;
                tinst_xk = subtype_exact;
            } else if this.info.ptr.above_centerline() && !tinst.info.ptr.above_centerline() {
                this_class = tinst_class;
                this_xk = tinst_xk;
            } else if tinst.info.ptr.above_centerline() && !this.info.ptr.above_centerline() {
                tinst_class = this_class;
            } else {
                this_xk = subtype_exact;
            }
        }

        if tinst_class == this_class {
            let mut constant = None;
            if ptr == Ptr::Constant {
                if this.constant.is_some() && this.constant == tinst.constant {
                    constant = this.constant;
                } else if this.info.ptr.above_centerline() {
                    constant = tinst.constant;
                } else if tinst.info.ptr.above_centerline() {
                    constant = this.constant;
                } else {
                    // Two different constants.
                    ptr = Ptr::NotNull;
                }
            }
            return Ok(self.make_inst(ptr, this_class, this_xk, constant, off, instance, spec));
        }

        // Unrelated classes, or a subtype meeting an exact supertype. The
        // values cannot be the same object, so fall below the centerline
        // to the common ancestor.
        if matches!(ptr, Ptr::Top | Ptr::AnyNull | Ptr::Constant) {
            ptr = Ptr::NotNull;
        }
        let lca = classes.least_common_ancestor(this_class, tinst_class);
        Ok(self.make_inst(ptr, lca, false, None, off, InstanceId::Bottom, spec))
    }

    /// Meet where at least one class is unloaded. Only the root class
    /// relates to an unloaded class.
    #[allow(clippy::too_many_arguments)]
    fn meet_unloaded(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        this: &InstPtr,
        tinst: &InstPtr,
        ptr: Ptr,
        off: Offset,
        instance: InstanceId,
        spec: Speculation,
    ) -> TypeId {
        let classes = self.classes;
        let this_loaded = classes.is_loaded(this.class);
        let (loaded, unloaded, unloaded_id) = if this_loaded {
            (this, tinst, lo)
        } else {
            (tinst, this, hi)
        };
        tracing::trace!(
            loaded = classes.class_name(loaded.class),
            unloaded = classes.class_name(unloaded.class),
            "meeting unloaded class"
        );

        if loaded.class == classes.object_class() {
            match loaded.info.ptr {
                Ptr::Top => return unloaded_id,
                Ptr::AnyNull => {
                    return self.make_inst(ptr, unloaded.class, false, None, off, instance, spec)
                }
                Ptr::Bottom => return self.inst_bottom(),
                Ptr::Constant | Ptr::NotNull => {
                    return if unloaded.info.ptr == Ptr::Bottom {
                        self.inst_bottom()
                    } else {
                        self.inst_not_null()
                    };
                }
                Ptr::Null => {
                    if unloaded.info.ptr == Ptr::Top {
                        return unloaded_id;
                    }
                    return self.cast_to_ptr_type(unloaded_id, Ptr::AnyNull);
                }
            }
        }

        if ptr != Ptr::Bottom {
            self.inst_not_null()
        } else {
            self.inst_bottom()
        }
    }

    // =========================================================================
    // Array Pointers
    // =========================================================================

    fn array_body(&self, body: TypeId) -> Option<crate::types::ArrayBody> {
        match self.kind(body) {
            TypeKind::Array(b) => Some(*b),
            _ => None,
        }
    }

    fn array_elem_is_int(&self, body: TypeId) -> bool {
        self.array_body(body)
            .is_some_and(|b| matches!(self.kind(b.elem), TypeKind::Int(_)))
    }

    /// Whether the element, seen as a pointer, sits above the centerline.
    fn array_elem_above_centerline(&self, body: TypeId) -> bool {
        let Some(b) = self.array_body(body) else {
            return false;
        };
        let elem = match self.kind(b.elem) {
            TypeKind::NarrowOop(p) => *p,
            _ => b.elem,
        };
        self.kind(elem)
            .ptr()
            .is_some_and(|p| p.above_centerline())
    }

    /// Same body with a Bottom element.
    fn array_with_bottom_elem(&mut self, body: TypeId) -> TypeId {
        match self.array_body(body) {
            Some(b) => self.array(TypeId::BOTTOM, b.size, b.stable),
            None => body,
        }
    }

    /// Compare array classes, deriving unknown ones from the element.
    fn same_array_class(&self, x: &ArrayPtr, y: &ArrayPtr) -> bool {
        match (x.class, y.class) {
            (Some(cx), Some(cy)) => cx == cy,
            _ => self.array_elem_class(x.body) == self.array_elem_class(y.body),
        }
    }

    fn array_elem_class(&self, body: TypeId) -> Option<ClassId> {
        let b = self.array_body(body)?;
        let elem = match self.kind(b.elem) {
            TypeKind::NarrowOop(p) => *p,
            _ => b.elem,
        };
        match self.kind(elem) {
            TypeKind::InstPtr(inst) => Some(inst.class),
            _ => None,
        }
    }

    fn meet_array_any(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        ary: &ArrayPtr,
        tp: &PtrInfo,
    ) -> LatticeResult<TypeId> {
        let offset = ary.info.offset.meet(tp.offset);
        let ptr = ary.info.ptr.meet(tp.ptr);
        let spec = self.meet_overlay(hi, lo)?;
        match tp.ptr {
            Ptr::Top => Ok(hi),
            Ptr::Bottom | Ptr::NotNull => Ok(self.make_any(ptr, offset, spec)),
            Ptr::Null if ptr == Ptr::Null => Ok(self.make_any(ptr, offset, spec)),
            Ptr::Null | Ptr::AnyNull => {
                let constant = if ptr == Ptr::Constant {
                    ary.constant
                } else {
                    None
                };
                Ok(self.make_ary(
                    ptr,
                    constant,
                    ary.body,
                    ary.class,
                    ary.exact,
                    offset,
                    ary.instance,
                    spec,
                ))
            }
            Ptr::Constant => Err(self.invalid_pointer(lo)),
        }
    }

    fn meet_array_object(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        ary: &ArrayPtr,
        tp: &ObjectPtr,
    ) -> LatticeResult<TypeId> {
        let offset = ary.info.offset.meet(tp.info.offset);
        let ptr = ary.info.ptr.meet(tp.info.ptr);
        let spec = self.meet_overlay(hi, lo)?;
        match tp.info.ptr {
            Ptr::Top | Ptr::AnyNull => {
                let constant = if ptr == Ptr::Constant {
                    ary.constant
                } else {
                    None
                };
                Ok(self.make_ary(
                    ptr,
                    constant,
                    ary.body,
                    ary.class,
                    ary.exact,
                    offset,
                    ary.instance,
                    spec,
                ))
            }
            Ptr::Bottom | Ptr::NotNull => {
                let instance = ary.instance.meet(tp.instance);
                Ok(self.make_object(ptr, offset, instance, spec))
            }
            Ptr::Null | Ptr::Constant => Err(self.invalid_pointer(lo)),
        }
    }

    fn meet_array_inst(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        ary: &ArrayPtr,
        tp: &InstPtr,
    ) -> LatticeResult<TypeId> {
        let object = self.classes.object_class();
        let offset = ary.info.offset.meet(tp.info.offset);
        let ptr = ary.info.ptr.meet(tp.info.ptr);
        let instance = ary.instance.meet(tp.instance);
        let spec = self.meet_overlay(hi, lo)?;
        let tp_is_root = tp.class == object && !tp.exact;

        match ptr {
            Ptr::Top | Ptr::AnyNull => {
                // Only the root class has arrays as subtypes.
                if tp_is_root {
                    Ok(self.make_ary(
                        ptr, None, ary.body, ary.class, ary.exact, offset, instance, spec,
                    ))
                } else {
                    // No subclass relation, so fall below the centerline.
                    Ok(self.make_inst(
                        Ptr::NotNull,
                        object,
                        false,
                        None,
                        offset,
                        InstanceId::Bottom,
                        spec,
                    ))
                }
            }
            Ptr::Constant | Ptr::NotNull | Ptr::Bottom => {
                if tp.info.ptr.above_centerline() && tp_is_root {
                    let constant = if ptr == Ptr::Constant {
                        ary.constant
                    } else {
                        None
                    };
                    return Ok(self.make_ary(
                        ptr, constant, ary.body, ary.class, ary.exact, offset, instance, spec,
                    ));
                }
                let ptr = if ptr == Ptr::Constant {
                    Ptr::NotNull
                } else {
                    ptr
                };
                let instance = if instance.is_known() {
                    InstanceId::Bottom
                } else {
                    instance
                };
                Ok(self.make_inst(ptr, object, false, None, offset, instance, spec))
            }
            Ptr::Null => Err(self.invalid_pointer(lo)),
        }
    }

    fn meet_array_array(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        this: &ArrayPtr,
        tap: &ArrayPtr,
    ) -> LatticeResult<TypeId> {
        let classes = self.classes;
        let off = this.info.offset.meet(tap.info.offset);
        let mut tary = self.try_meet_speculative(this.body, tap.body)?;
        let mut ptr = this.info.ptr.meet(tap.info.ptr);
        let mut instance = this.instance.meet(tap.instance);
        let spec = self.meet_overlay(hi, lo)?;
        let mut lazy_class = None;

        if self.array_elem_is_int(tary) {
            // Integral arrays carry their class explicitly.
            if this.class.is_none() {
                lazy_class = tap.class;
            } else if tap.class.is_none() || tap.class == this.class {
                lazy_class = this.class;
            } else {
                // Something like byte[] meeting int[].
                instance = InstanceId::Bottom;
                tary = self.array_with_bottom_elem(tary);
            }
        } else if let (Some(tc), Some(thc)) = (tap.class, this.class) {
            let conflicting = tc != thc
                && (ptr.above_centerline() || ptr == Ptr::Constant)
                && ((tap.exact && this.exact)
                    || (tap.exact && !classes.is_subtype_of(tc, thc))
                    || (this.exact && !classes.is_subtype_of(thc, tc)));
            if conflicting {
                if ptr.above_centerline() || self.array_elem_above_centerline(tary) {
                    tary = self.array_with_bottom_elem(tary);
                }
                return Ok(self.make_ary(
                    Ptr::NotNull,
                    None,
                    tary,
                    lazy_class,
                    false,
                    off,
                    InstanceId::Bottom,
                    spec,
                ));
            }
        }

        let same_class = self.same_array_class(this, tap);
        let (constant, xk) = match tap.info.ptr {
            Ptr::AnyNull | Ptr::Top => {
                let xk = if this.info.ptr.below_centerline() {
                    this.exact
                } else {
                    tap.exact || this.exact
                };
                let constant = if ptr == Ptr::Constant {
                    this.constant
                } else {
                    None
                };
                (constant, xk)
            }
            Ptr::Constant => {
                if this.info.ptr == Ptr::Constant {
                    if tap.constant.is_some() && this.constant != tap.constant {
                        // Two different array constants.
                        ptr = Ptr::NotNull;
                        instance = InstanceId::Bottom;
                        (None, same_class)
                    } else {
                        (this.constant, true)
                    }
                } else if this.info.ptr.above_centerline() {
                    (tap.constant, true)
                } else {
                    (None, this.exact && same_class)
                }
            }
            Ptr::NotNull | Ptr::Bottom => {
                let xk = if this.info.ptr.above_centerline() {
                    tap.exact
                } else {
                    tap.exact && this.exact && same_class
                };
                (None, xk)
            }
            Ptr::Null => return Err(self.invalid_pointer(lo)),
        };

        Ok(self.make_ary(ptr, constant, tary, lazy_class, xk, off, instance, spec))
    }

    // =========================================================================
    // Metadata and Class Pointers
    // =========================================================================

    fn meet_metadata_any(
        &mut self,
        hi: TypeId,
        meta: &MetadataPtr,
        tp: &PtrInfo,
    ) -> LatticeResult<TypeId> {
        let offset = meta.offset.meet(tp.offset);
        let ptr = meta.ptr.meet(tp.ptr);
        match tp.ptr {
            Ptr::Null if ptr == Ptr::Null => Ok(self.make_any(ptr, offset, tp.spec)),
            Ptr::Null | Ptr::Top | Ptr::AnyNull => {
                Ok(self.make_metadata(ptr, meta.metadata, offset))
            }
            Ptr::NotNull | Ptr::Bottom => Ok(self.make_any(ptr, offset, tp.spec)),
            Ptr::Constant => Err(self.invalid_pointer(hi)),
        }
    }

    fn meet_metadata_metadata(
        &mut self,
        hi: TypeId,
        lo: TypeId,
        this: &MetadataPtr,
        tp: &MetadataPtr,
    ) -> TypeId {
        let offset = this.offset.meet(tp.offset);
        let mut ptr = this.ptr.meet(tp.ptr);
        let metadata = if tp.ptr == Ptr::Top {
            this.metadata
        } else {
            tp.metadata
        };
        if tp.ptr == Ptr::Top || this.ptr == Ptr::Top || this.metadata == tp.metadata {
            return self.make_metadata(ptr, metadata, offset);
        }
        if ptr == Ptr::Constant {
            if tp.ptr == Ptr::Constant && this.ptr != Ptr::Constant {
                return lo;
            }
            if this.ptr == Ptr::Constant && tp.ptr != Ptr::Constant {
                return hi;
            }
            ptr = Ptr::NotNull;
        }
        self.make_metadata(ptr, None, offset)
    }

    fn meet_class_any(
        &mut self,
        hi: TypeId,
        k: &ClassPtr,
        tp: &PtrInfo,
    ) -> LatticeResult<TypeId> {
        let offset = k.offset.meet(tp.offset);
        let ptr = k.ptr.meet(tp.ptr);
        match tp.ptr {
            Ptr::Top => Ok(hi),
            Ptr::Null if ptr == Ptr::Null => Ok(self.make_any(ptr, offset, tp.spec)),
            Ptr::Null | Ptr::AnyNull => Ok(self.make_class(ptr, k.class, offset)),
            Ptr::NotNull | Ptr::Bottom => Ok(self.make_any(ptr, offset, tp.spec)),
            Ptr::Constant => Err(self.invalid_pointer(hi)),
        }
    }

    fn meet_class_class(&mut self, this: &ClassPtr, tkls: &ClassPtr) -> TypeId {
        let classes = self.classes;
        let off = this.offset.meet(tkls.offset);
        let mut ptr = this.ptr.meet(tkls.ptr);

        if ptr != Ptr::Constant && this.class == tkls.class {
            return self.make_class(ptr, this.class, off);
        }

        let mut this_class = this.class;
        let mut tkls_class = tkls.class;
        // Above the centerline a class may be replaced by its subclass.
        if this.ptr.above_centerline() && classes.is_subtype_of(tkls_class, this_class) {
            this_class = tkls_class;
        }
        if tkls.ptr.above_centerline() && classes.is_subtype_of(this_class, tkls_class) {
            tkls_class = this_class;
        }

        if this_class == tkls_class {
            if ptr == Ptr::Constant {
                let same_constant = this.ptr == Ptr::Constant
                    && tkls.ptr == Ptr::Constant
                    && this.class == tkls.class;
                if !same_constant
                    && !this.ptr.above_centerline()
                    && !tkls.ptr.above_centerline()
                {
                    ptr = Ptr::NotNull;
                }
            }
            return self.make_class(ptr, this_class, off);
        }

        if matches!(ptr, Ptr::Top | Ptr::AnyNull | Ptr::Constant) {
            ptr = Ptr::NotNull;
        }
        let lca = classes.least_common_ancestor(this_class, tkls_class);
        self.make_class(ptr, lca, off)
    }
}
