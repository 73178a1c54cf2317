//! Hash-consing store for lattice values.
//!
//! A [`TypeStore`] owns every value created during one compilation:
//!
//! - **Canonical handles**: structurally equal values intern to the same
//!   [`TypeId`], so equality anywhere else is an integer compare
//! - **Eager duals**: interning a value also interns its dual and links
//!   the pair, making `dual` a table lookup
//! - **Reserved ids**: the compile-invariant base values occupy the same
//!   ids in every store and can be named without one
//!
//! Values are never mutated or freed individually; dropping the store
//! releases the whole type graph.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::arena::TypeTable;
use crate::class_model::{ClassId, ClassModel, MetadataId, ObjectId};
use crate::config::LatticeConfig;
use crate::error::{fatal, LatticeError, LatticeResult};
use crate::types::{
    call_slot, ArrayBody, ArrayPtr, ClassPtr, DoubleBits, FloatBits, FunctionType, InstPtr,
    InstanceId, IntRange, MetadataPtr, ObjectPtr, Offset, Ptr, PtrInfo, RawPtr, Speculation,
    TypeKind, TypeList, VectorKind, VectorType,
};

pub use crate::arena::TypeId;

// =============================================================================
// Reserved Values
// =============================================================================

impl TypeId {
    pub const TOP: TypeId = TypeId::from_index(0);
    pub const BOTTOM: TypeId = TypeId::from_index(1);
    pub const CONTROL: TypeId = TypeId::from_index(2);
    pub const ABIO: TypeId = TypeId::from_index(3);
    pub const MEMORY: TypeId = TypeId::from_index(4);
    pub const RETURN_ADDRESS: TypeId = TypeId::from_index(5);
    pub const HALF: TypeId = TypeId::from_index(6);
    /// Any float.
    pub const FLOAT: TypeId = TypeId::from_index(7);
    pub const FLOAT_TOP: TypeId = TypeId::from_index(8);
    /// Any double.
    pub const DOUBLE: TypeId = TypeId::from_index(9);
    pub const DOUBLE_TOP: TypeId = TypeId::from_index(10);
    /// Full 32-bit range.
    pub const INT: TypeId = TypeId::from_index(11);
    /// Full 64-bit range.
    pub const LONG: TypeId = TypeId::from_index(13);
    /// Any pointer at any offset.
    pub const PTR_BOTTOM: TypeId = TypeId::from_index(15);
    /// The null pointer.
    pub const NULL_PTR: TypeId = TypeId::from_index(17);
    /// Any raw pointer.
    pub const RAW_BOTTOM: TypeId = TypeId::from_index(19);
    pub const RAW_TOP: TypeId = TypeId::from_index(20);
}

/// Ids below this are reserved and identical in every store.
pub const FIRST_DYNAMIC_ID: u32 = 21;

/// Base values in reserved-id order. Each is followed by its dual when it
/// is not self-dual.
fn reserved_values(widen_limit: u8) -> [TypeKind; 13] {
    [
        TypeKind::Top,
        TypeKind::Control,
        TypeKind::AbstractIo,
        TypeKind::Memory,
        TypeKind::ReturnAddress,
        TypeKind::Half,
        TypeKind::FloatBottom,
        TypeKind::DoubleBottom,
        TypeKind::Int(IntRange::full(widen_limit)),
        TypeKind::Long(IntRange::full(widen_limit)),
        TypeKind::AnyPtr(PtrInfo::new(Ptr::Bottom, Offset::Bottom)),
        TypeKind::AnyPtr(PtrInfo::new(Ptr::Null, Offset::ZERO)),
        TypeKind::RawPtr(RawPtr {
            ptr: Ptr::Bottom,
            bits: 0,
        }),
    ]
}

// =============================================================================
// Type Store
// =============================================================================

/// Per-compilation interning context and entry point for the algebra.
pub struct TypeStore<'cm> {
    values: TypeTable,
    lookup: FxHashMap<TypeKind, TypeId>,
    pub(crate) classes: &'cm dyn ClassModel,
    pub(crate) config: LatticeConfig,
    /// Cleared while the dual half of a symmetry check runs.
    pub(crate) verify_now: bool,
}

impl fmt::Debug for TypeStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeStore")
            .field("values", &self.values.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<'cm> TypeStore<'cm> {
    /// Store with the default configuration.
    pub fn new(classes: &'cm dyn ClassModel) -> Self {
        Self::with_config(classes, LatticeConfig::default())
    }

    pub fn with_config(classes: &'cm dyn ClassModel, config: LatticeConfig) -> Self {
        let capacity = config.initial_capacity;
        let mut store = Self {
            values: TypeTable::with_capacity(capacity),
            lookup: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            classes,
            verify_now: config.verify_symmetry,
            config,
        };
        for kind in reserved_values(store.config.widen_limit) {
            store.intern(kind);
        }
        debug_assert_eq!(store.values.len() as u32, FIRST_DYNAMIC_ID);
        store
    }

    #[inline]
    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    #[inline]
    pub fn classes(&self) -> &'cm dyn ClassModel {
        self.classes
    }

    /// Number of interned values, duals included.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Payload of an interned value.
    #[inline]
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.values[id]
    }

    /// Reflection of `id` across the centerline.
    #[inline]
    pub fn dual(&self, id: TypeId) -> TypeId {
        self.values.dual(id)
    }

    pub fn log_stats(&self) {
        tracing::debug!(
            values = self.values.len(),
            dynamic = self.values.len().saturating_sub(FIRST_DYNAMIC_ID as usize),
            "type store statistics"
        );
    }

    // =========================================================================
    // Interning
    // =========================================================================

    /// Canonical handle for `kind`; running out of handles is fatal.
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        self.try_intern(kind).unwrap_or_else(|err| fatal(err))
    }

    /// Canonical handle for `kind`, allocating it (and its dual) on first
    /// sight.
    pub fn try_intern(&mut self, kind: TypeKind) -> LatticeResult<TypeId> {
        let kind = self.canonical(kind);
        if let Some(&id) = self.lookup.get(&kind) {
            return Ok(id);
        }

        let id = self.alloc(kind.clone())?;
        let dual_kind = self.xdual(&kind)?;
        let dual_kind = self.canonical(dual_kind);
        if dual_kind != kind {
            // A dual interned on its own would already have brought its
            // reflection along, so finding one here means xdual is not an
            // involution for this value.
            if let Some(&existing) = self.lookup.get(&dual_kind) {
                tracing::error!(%id, %existing, "dual interned without its primary");
                return Err(LatticeError::DualMismatch {
                    value: self.dump(id),
                    dual: self.dump(existing),
                });
            }
            let dual_id = self.alloc(dual_kind)?;
            self.values.link_duals(id, dual_id);
        }

        tracing::trace!(%id, variant = kind.variant_name(), "interned lattice value");
        Ok(id)
    }

    fn alloc(&mut self, kind: TypeKind) -> LatticeResult<TypeId> {
        let count = self.values.len();
        let id = self
            .values
            .push(kind.clone())
            .ok_or(LatticeError::ArenaExhausted { count })?;
        self.lookup.insert(kind, id);
        Ok(id)
    }

    /// Apply the normalizations every constructor agrees on.
    fn canonical(&self, kind: TypeKind) -> TypeKind {
        let widen_limit = self.config.widen_limit;
        match kind {
            TypeKind::Int(r) => TypeKind::Int(IntRange::new(r.lo, r.hi, r.widen, widen_limit)),
            TypeKind::Long(r) => TypeKind::Long(IntRange::new(r.lo, r.hi, r.widen, widen_limit)),
            TypeKind::InstPtr(mut inst) => {
                inst.exact = self.normalized_inst_exactness(&inst);
                if inst.info.ptr != Ptr::Constant {
                    inst.constant = None;
                }
                TypeKind::InstPtr(inst)
            }
            TypeKind::ArrayPtr(mut ary) => {
                if !ary.exact {
                    ary.exact = ary.constant.is_some() || self.array_must_be_exact(ary.body);
                }
                if ary.info.ptr != Ptr::Constant {
                    ary.constant = None;
                }
                TypeKind::ArrayPtr(ary)
            }
            other => other,
        }
    }

    /// Constants are exact; loaded final classes are exact; loaded
    /// interfaces never are.
    fn normalized_inst_exactness(&self, inst: &InstPtr) -> bool {
        if inst.info.ptr == Ptr::Constant {
            return true;
        }
        if !self.classes.is_loaded(inst.class) {
            return inst.exact;
        }
        if self.classes.is_interface(inst.class) {
            return false;
        }
        inst.exact || self.classes.is_final(inst.class)
    }

    /// Whether every array with this body necessarily has one class.
    pub(crate) fn array_must_be_exact(&self, body: TypeId) -> bool {
        let TypeKind::Array(body) = self.kind(body) else {
            return false;
        };
        let mut elem = body.elem;
        if elem == TypeId::TOP || elem == TypeId::BOTTOM {
            return false;
        }
        if let TypeKind::NarrowOop(ptr) = self.kind(elem) {
            elem = *ptr;
        }
        match self.kind(elem) {
            TypeKind::InstPtr(inst) => {
                self.classes.is_loaded(inst.class) && self.classes.is_final(inst.class)
            }
            TypeKind::ArrayPtr(ary) => self.array_must_be_exact(ary.body),
            TypeKind::ObjectPtr(_) => false,
            // Primitive elements.
            _ => true,
        }
    }

    // =========================================================================
    // Scalar Constructors
    // =========================================================================

    /// Int range `[lo, hi]` at widen level 0.
    pub fn int(&mut self, lo: i32, hi: i32) -> TypeId {
        self.intern(TypeKind::Int(IntRange::new(lo, hi, 0, self.config.widen_limit)))
    }

    pub fn int_with_widen(&mut self, lo: i32, hi: i32, widen: u8) -> TypeId {
        self.intern(TypeKind::Int(IntRange::new(lo, hi, widen, self.config.widen_limit)))
    }

    pub fn int_con(&mut self, v: i32) -> TypeId {
        self.intern(TypeKind::Int(IntRange::constant(v)))
    }

    pub fn long(&mut self, lo: i64, hi: i64) -> TypeId {
        self.intern(TypeKind::Long(IntRange::new(lo, hi, 0, self.config.widen_limit)))
    }

    pub fn long_with_widen(&mut self, lo: i64, hi: i64, widen: u8) -> TypeId {
        self.intern(TypeKind::Long(IntRange::new(lo, hi, widen, self.config.widen_limit)))
    }

    pub fn long_con(&mut self, v: i64) -> TypeId {
        self.intern(TypeKind::Long(IntRange::constant(v)))
    }

    /// `[0, 1]`.
    pub fn bool_type(&mut self) -> TypeId {
        self.int(0, 1)
    }

    pub fn byte_type(&mut self) -> TypeId {
        self.int(i32::from(i8::MIN), i32::from(i8::MAX))
    }

    pub fn char_type(&mut self) -> TypeId {
        self.int(0, i32::from(u16::MAX))
    }

    pub fn short_type(&mut self) -> TypeId {
        self.int(i32::from(i16::MIN), i32::from(i16::MAX))
    }

    /// `[0, max]`.
    pub fn non_negative_int(&mut self) -> TypeId {
        self.int(0, i32::MAX)
    }

    pub fn float_con(&mut self, v: f32) -> TypeId {
        self.intern(TypeKind::FloatCon(FloatBits::new(v)))
    }

    pub fn double_con(&mut self, v: f64) -> TypeId {
        self.intern(TypeKind::DoubleCon(DoubleBits::new(v)))
    }

    // =========================================================================
    // Aggregate Constructors
    // =========================================================================

    pub fn tuple(&mut self, fields: &[TypeId]) -> TypeId {
        self.intern(TypeKind::Tuple(fields.iter().copied().collect()))
    }

    /// Tuple describing a call: the fixed frame slots, then `args`.
    pub fn call_tuple(&mut self, args: &[TypeId]) -> TypeId {
        let mut fields = TypeList::with_capacity(call_slot::PARMS + args.len());
        fields.push(TypeId::CONTROL);
        fields.push(TypeId::ABIO);
        fields.push(TypeId::MEMORY);
        fields.push(TypeId::RAW_BOTTOM);
        fields.push(TypeId::RETURN_ADDRESS);
        fields.extend(args.iter().copied());
        self.intern(TypeKind::Tuple(fields))
    }

    /// Signature taking `args` and producing `results` (both wrapped in
    /// call tuples).
    pub fn function(&mut self, args: &[TypeId], results: &[TypeId]) -> TypeId {
        let domain = self.call_tuple(args);
        let range = self.call_tuple(results);
        self.intern(TypeKind::Function(FunctionType { domain, range }))
    }

    /// Array body. The size is renormalized to widen level 0 so arrays do
    /// not differ only in how wide their length range has become.
    pub fn array(&mut self, elem: TypeId, size: TypeId, stable: bool) -> TypeId {
        let size = self.normalize_array_size(size);
        self.intern(TypeKind::Array(ArrayBody { elem, size, stable }))
    }

    pub(crate) fn normalize_array_size(&mut self, size: TypeId) -> TypeId {
        match *self.kind(size) {
            TypeKind::Int(r) if r.widen != 0 => {
                self.intern(TypeKind::Int(IntRange::new(r.lo, r.hi, 0, self.config.widen_limit)))
            }
            _ => size,
        }
    }

    pub fn vector(&mut self, kind: VectorKind, elem: TypeId, length: u32) -> TypeId {
        self.intern(TypeKind::Vector(VectorType { kind, elem, length }))
    }

    // =========================================================================
    // Pointer Constructors
    // =========================================================================

    /// Generic pointer. `ptr` must not be `Constant`.
    pub fn any_ptr(&mut self, ptr: Ptr, offset: Offset) -> TypeId {
        debug_assert_ne!(ptr, Ptr::Constant, "generic pointers are never constant");
        self.intern(TypeKind::AnyPtr(PtrInfo::new(ptr, offset)))
    }

    /// Raw pointer. `ptr` must be neither `Constant` nor `Null`.
    pub fn raw_ptr(&mut self, ptr: Ptr) -> TypeId {
        debug_assert!(!matches!(ptr, Ptr::Constant | Ptr::Null));
        self.intern(TypeKind::RawPtr(RawPtr { ptr, bits: 0 }))
    }

    /// Raw pointer constant. Address 0 is the null pointer.
    pub fn raw_const(&mut self, bits: u64) -> TypeId {
        if bits == 0 {
            return TypeId::NULL_PTR;
        }
        self.intern(TypeKind::RawPtr(RawPtr {
            ptr: Ptr::Constant,
            bits,
        }))
    }

    /// Object of unknown class at offset 0.
    pub fn object(&mut self, ptr: Ptr) -> TypeId {
        self.make_object(ptr, Offset::ZERO, InstanceId::Bottom, Speculation::NONE)
    }

    /// Instance of `class` at offset 0.
    pub fn instance(&mut self, ptr: Ptr, class: ClassId, exact: bool) -> TypeId {
        self.make_inst(ptr, class, exact, None, Offset::ZERO, InstanceId::Bottom, Speculation::NONE)
    }

    /// The constant object `object`, an instance of `class`.
    pub fn instance_const(&mut self, class: ClassId, object: ObjectId) -> TypeId {
        self.make_inst(
            Ptr::Constant,
            class,
            true,
            Some(object),
            Offset::ZERO,
            InstanceId::Bottom,
            Speculation::NONE,
        )
    }

    /// Instance of `class` allocated at site `instance`.
    pub fn known_instance(&mut self, class: ClassId, instance: u32) -> TypeId {
        self.make_inst(
            Ptr::NotNull,
            class,
            true,
            None,
            Offset::ZERO,
            InstanceId::Known(instance),
            Speculation::NONE,
        )
    }

    /// Array of `body` at offset 0. `class` is the array class when known.
    pub fn array_ptr(&mut self, ptr: Ptr, body: TypeId, class: Option<ClassId>, exact: bool) -> TypeId {
        self.make_ary(
            ptr,
            None,
            body,
            class,
            exact,
            Offset::ZERO,
            InstanceId::Bottom,
            Speculation::NONE,
        )
    }

    pub fn class_ptr(&mut self, ptr: Ptr, class: ClassId) -> TypeId {
        self.make_class(ptr, class, Offset::ZERO)
    }

    pub fn metadata_ptr(&mut self, ptr: Ptr, metadata: Option<MetadataId>) -> TypeId {
        self.make_metadata(ptr, metadata, Offset::ZERO)
    }

    /// Compressed form of an object pointer.
    pub fn narrow_oop(&mut self, ptr: TypeId) -> TypeId {
        self.intern(TypeKind::NarrowOop(ptr))
    }

    /// Compressed form of a class pointer.
    pub fn narrow_class(&mut self, ptr: TypeId) -> TypeId {
        self.intern(TypeKind::NarrowClass(ptr))
    }

    /// Instances of the root class: any object or null.
    pub fn inst_bottom(&mut self) -> TypeId {
        let object = self.classes.object_class();
        self.instance(Ptr::Bottom, object, false)
    }

    /// Any non-null instance of the root class.
    pub fn inst_not_null(&mut self) -> TypeId {
        let object = self.classes.object_class();
        self.instance(Ptr::NotNull, object, false)
    }

    // =========================================================================
    // Internal Pointer Constructors
    // =========================================================================

    pub(crate) fn make_any(&mut self, ptr: Ptr, offset: Offset, spec: Speculation) -> TypeId {
        self.intern(TypeKind::AnyPtr(PtrInfo { ptr, offset, spec }))
    }

    pub(crate) fn make_raw(&mut self, ptr: Ptr) -> TypeId {
        self.intern(TypeKind::RawPtr(RawPtr { ptr, bits: 0 }))
    }

    pub(crate) fn make_object(
        &mut self,
        ptr: Ptr,
        offset: Offset,
        instance: InstanceId,
        spec: Speculation,
    ) -> TypeId {
        self.intern(TypeKind::ObjectPtr(ObjectPtr {
            info: PtrInfo { ptr, offset, spec },
            instance,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn make_inst(
        &mut self,
        ptr: Ptr,
        class: ClassId,
        exact: bool,
        constant: Option<ObjectId>,
        offset: Offset,
        instance: InstanceId,
        spec: Speculation,
    ) -> TypeId {
        self.intern(TypeKind::InstPtr(InstPtr {
            info: PtrInfo { ptr, offset, spec },
            instance,
            class,
            exact,
            constant,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn make_ary(
        &mut self,
        ptr: Ptr,
        constant: Option<ObjectId>,
        body: TypeId,
        class: Option<ClassId>,
        exact: bool,
        offset: Offset,
        instance: InstanceId,
        spec: Speculation,
    ) -> TypeId {
        self.intern(TypeKind::ArrayPtr(ArrayPtr {
            info: PtrInfo { ptr, offset, spec },
            instance,
            body,
            class,
            exact,
            constant,
        }))
    }

    pub(crate) fn make_class(&mut self, ptr: Ptr, class: ClassId, offset: Offset) -> TypeId {
        self.intern(TypeKind::ClassPtr(ClassPtr { ptr, offset, class }))
    }

    pub(crate) fn make_metadata(
        &mut self,
        ptr: Ptr,
        metadata: Option<MetadataId>,
        offset: Offset,
    ) -> TypeId {
        self.intern(TypeKind::MetadataPtr(MetadataPtr {
            ptr,
            offset,
            metadata,
        }))
    }
}
