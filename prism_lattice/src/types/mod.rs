//! Lattice value payloads.
//!
//! [`TypeKind`] is the closed set of value variants. Each variant carries
//! only the payload it needs; nested values (tuple fields, array
//! elements, speculative guesses) are interned [`TypeId`]s, so a
//! `TypeKind` is small, hashable and compared structurally by the store.
//!
//! ```text
//!                        Top
//!       /      |        |         |        \
//!   control  int/long  float/double  pointers  tuples ...
//!       \      |        |         |        /
//!                       Bottom
//! ```
//!
//! Numeric and pointer families are "data": two data values from
//! different families meet to Bottom. Non-data values (control, memory,
//! I/O, return address, function signatures) meet only with themselves,
//! Top and Bottom.

pub mod int;
pub mod ptr;

use smallvec::SmallVec;

use crate::class_model::{ClassId, MetadataId, ObjectId};
use crate::intern::TypeId;

pub use int::{IntRange, IntegerWidth};
pub use ptr::{InlineDepth, InstanceId, Offset, Ptr, Speculation};

/// Inline storage for tuple fields; most signatures have a handful.
pub type TypeList = SmallVec<[TypeId; 4]>;

// =============================================================================
// Call Signature Slots
// =============================================================================

/// Fixed leading fields of a call tuple.
pub mod call_slot {
    pub const CONTROL: usize = 0;
    pub const IO: usize = 1;
    pub const MEMORY: usize = 2;
    pub const FRAME_PTR: usize = 3;
    pub const RETURN_ADDRESS: usize = 4;
    /// First argument slot.
    pub const PARMS: usize = 5;
}

// =============================================================================
// Scalar Payloads
// =============================================================================

/// A float constant, compared by bit pattern.
///
/// `+0.0` and `-0.0` are distinct constants; a NaN equals itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatBits(u32);

impl FloatBits {
    #[inline]
    pub fn new(v: f32) -> Self {
        Self(v.to_bits())
    }

    #[inline]
    pub fn value(self) -> f32 {
        f32::from_bits(self.0)
    }
}

/// A double constant, compared by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoubleBits(u64);

impl DoubleBits {
    #[inline]
    pub fn new(v: f64) -> Self {
        Self(v.to_bits())
    }

    #[inline]
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

// =============================================================================
// Aggregate Payloads
// =============================================================================

/// Body of an array: element value, length range, stable-contents flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayBody {
    pub elem: TypeId,
    /// An int range.
    pub size: TypeId,
    /// Elements never change once non-default.
    pub stable: bool,
}

/// Vector register class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorKind {
    /// Scalable length.
    A,
    /// 32-bit.
    S,
    /// 64-bit.
    D,
    /// 128-bit.
    X,
    /// 256-bit.
    Y,
    /// 512-bit.
    Z,
    /// Predicate mask.
    Mask,
}

impl VectorKind {
    pub fn name(self) -> &'static str {
        match self {
            VectorKind::A => "vectora",
            VectorKind::S => "vectors",
            VectorKind::D => "vectord",
            VectorKind::X => "vectorx",
            VectorKind::Y => "vectory",
            VectorKind::Z => "vectorz",
            VectorKind::Mask => "vectormask",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorType {
    pub kind: VectorKind,
    pub elem: TypeId,
    pub length: u32,
}

/// A method signature: argument tuple and result tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub domain: TypeId,
    pub range: TypeId,
}

// =============================================================================
// Pointer Payloads
// =============================================================================

/// Niceness, offset and speculative overlay shared by the object-pointer
/// variants and the generic pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PtrInfo {
    pub ptr: Ptr,
    pub offset: Offset,
    pub spec: Speculation,
}

impl PtrInfo {
    pub fn new(ptr: Ptr, offset: Offset) -> Self {
        Self {
            ptr,
            offset,
            spec: Speculation::NONE,
        }
    }
}

/// Untyped machine pointer. Only constants carry an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawPtr {
    pub ptr: Ptr,
    pub bits: u64,
}

/// Reference to an object of unknown shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectPtr {
    pub info: PtrInfo,
    pub instance: InstanceId,
}

/// Reference to an instance of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstPtr {
    pub info: PtrInfo,
    pub instance: InstanceId,
    pub class: ClassId,
    /// The object is exactly `class`, not a subclass.
    pub exact: bool,
    /// Present iff `info.ptr` is `Constant`.
    pub constant: Option<ObjectId>,
}

/// Reference to an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayPtr {
    pub info: PtrInfo,
    pub instance: InstanceId,
    /// An `Array` value.
    pub body: TypeId,
    /// Array class when known; otherwise derived from the element.
    pub class: Option<ClassId>,
    pub exact: bool,
    pub constant: Option<ObjectId>,
}

/// Pointer to a class descriptor. Exact iff `ptr` is `Constant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassPtr {
    pub ptr: Ptr,
    pub offset: Offset,
    pub class: ClassId,
}

/// Pointer to VM metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataPtr {
    pub ptr: Ptr,
    pub offset: Offset,
    pub metadata: Option<MetadataId>,
}

// =============================================================================
// Lattice Value
// =============================================================================

/// Structural payload of one lattice value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Top,
    Bottom,
    Control,
    Int(IntRange<i32>),
    Long(IntRange<i64>),
    /// Upper half of a two-slot value.
    Half,
    /// Compressed object reference wrapping a pointer value.
    NarrowOop(TypeId),
    /// Compressed class reference wrapping a class pointer.
    NarrowClass(TypeId),
    Tuple(TypeList),
    Array(ArrayBody),
    Vector(VectorType),
    AnyPtr(PtrInfo),
    RawPtr(RawPtr),
    ObjectPtr(ObjectPtr),
    InstPtr(InstPtr),
    ArrayPtr(ArrayPtr),
    ClassPtr(ClassPtr),
    MetadataPtr(MetadataPtr),
    Function(FunctionType),
    AbstractIo,
    ReturnAddress,
    Memory,
    FloatTop,
    FloatCon(FloatBits),
    FloatBottom,
    DoubleTop,
    DoubleCon(DoubleBits),
    DoubleBottom,
}

/// Coarse classification of a value, used by graph verifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Data,
    Memory,
    Control,
    /// Abstract I/O, return addresses, signatures.
    Other,
    /// A tuple mixing categories.
    Mixed,
    /// Top or Bottom.
    Undefined,
}

/// A folded constant read back out of a singleton value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
    RawAddress(u64),
    Object(ObjectId),
    Class(ClassId),
    Metadata(MetadataId),
}

impl TypeKind {
    /// Pointer variants, excluding the narrow wrappers.
    #[inline]
    pub fn is_ptr(&self) -> bool {
        matches!(
            self,
            TypeKind::AnyPtr(_)
                | TypeKind::RawPtr(_)
                | TypeKind::ObjectPtr(_)
                | TypeKind::InstPtr(_)
                | TypeKind::ArrayPtr(_)
                | TypeKind::ClassPtr(_)
                | TypeKind::MetadataPtr(_)
        )
    }

    /// Pointers to heap objects.
    #[inline]
    pub fn is_oop_ptr(&self) -> bool {
        matches!(
            self,
            TypeKind::ObjectPtr(_) | TypeKind::InstPtr(_) | TypeKind::ArrayPtr(_)
        )
    }

    #[inline]
    pub fn is_narrow(&self) -> bool {
        matches!(self, TypeKind::NarrowOop(_) | TypeKind::NarrowClass(_))
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            TypeKind::FloatTop | TypeKind::FloatCon(_) | TypeKind::FloatBottom
        )
    }

    #[inline]
    pub fn is_double(&self) -> bool {
        matches!(
            self,
            TypeKind::DoubleTop | TypeKind::DoubleCon(_) | TypeKind::DoubleBottom
        )
    }

    /// Values that live in registers and mix to Bottom across families.
    pub fn is_data(&self) -> bool {
        matches!(self, TypeKind::Int(_) | TypeKind::Long(_))
            || self.is_float()
            || self.is_double()
            || self.is_ptr()
            || self.is_narrow()
    }

    /// Niceness of any pointer variant.
    pub fn ptr(&self) -> Option<Ptr> {
        match self {
            TypeKind::AnyPtr(info) => Some(info.ptr),
            TypeKind::RawPtr(raw) => Some(raw.ptr),
            TypeKind::ObjectPtr(o) => Some(o.info.ptr),
            TypeKind::InstPtr(i) => Some(i.info.ptr),
            TypeKind::ArrayPtr(a) => Some(a.info.ptr),
            TypeKind::ClassPtr(k) => Some(k.ptr),
            TypeKind::MetadataPtr(m) => Some(m.ptr),
            _ => None,
        }
    }

    /// Byte offset of any pointer variant. Raw pointers sit at offset 0.
    pub fn offset(&self) -> Option<Offset> {
        match self {
            TypeKind::AnyPtr(info) => Some(info.offset),
            TypeKind::RawPtr(_) => Some(Offset::ZERO),
            TypeKind::ObjectPtr(o) => Some(o.info.offset),
            TypeKind::InstPtr(i) => Some(i.info.offset),
            TypeKind::ArrayPtr(a) => Some(a.info.offset),
            TypeKind::ClassPtr(k) => Some(k.offset),
            TypeKind::MetadataPtr(m) => Some(m.offset),
            _ => None,
        }
    }

    /// Shared pointer fields of the variants that carry a speculative overlay.
    pub fn ptr_info(&self) -> Option<&PtrInfo> {
        match self {
            TypeKind::AnyPtr(info) => Some(info),
            TypeKind::ObjectPtr(o) => Some(&o.info),
            TypeKind::InstPtr(i) => Some(&i.info),
            TypeKind::ArrayPtr(a) => Some(&a.info),
            _ => None,
        }
    }

    /// Allocation site of an object pointer.
    pub fn instance(&self) -> Option<InstanceId> {
        match self {
            TypeKind::ObjectPtr(o) => Some(o.instance),
            TypeKind::InstPtr(i) => Some(i.instance),
            TypeKind::ArrayPtr(a) => Some(a.instance),
            _ => None,
        }
    }

    #[inline]
    pub fn speculation(&self) -> Option<Speculation> {
        self.ptr_info().map(|info| info.spec)
    }

    /// Copy of `self` carrying `spec`; variants without an overlay are
    /// returned unchanged.
    pub fn with_speculation(&self, spec: Speculation) -> TypeKind {
        let mut kind = self.clone();
        match &mut kind {
            TypeKind::AnyPtr(info) => info.spec = spec,
            TypeKind::ObjectPtr(o) => o.info.spec = spec,
            TypeKind::InstPtr(i) => i.info.spec = spec,
            TypeKind::ArrayPtr(a) => a.info.spec = spec,
            _ => {}
        }
        kind
    }

    /// Whether the class is known exactly (object pointers only).
    pub fn is_exact(&self) -> bool {
        match self {
            TypeKind::InstPtr(i) => i.exact,
            TypeKind::ArrayPtr(a) => a.exact,
            TypeKind::ClassPtr(k) => k.ptr == Ptr::Constant,
            _ => false,
        }
    }

    /// Short variant name for diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            TypeKind::Top => "top",
            TypeKind::Bottom => "bottom",
            TypeKind::Control => "control",
            TypeKind::Int(_) => "int",
            TypeKind::Long(_) => "long",
            TypeKind::Half => "half",
            TypeKind::NarrowOop(_) => "narrowoop",
            TypeKind::NarrowClass(_) => "narrowklass",
            TypeKind::Tuple(_) => "tuple",
            TypeKind::Array(_) => "array",
            TypeKind::Vector(v) => v.kind.name(),
            TypeKind::AnyPtr(_) => "anyptr",
            TypeKind::RawPtr(_) => "rawptr",
            TypeKind::ObjectPtr(_) => "oopptr",
            TypeKind::InstPtr(_) => "instptr",
            TypeKind::ArrayPtr(_) => "aryptr",
            TypeKind::ClassPtr(_) => "klassptr",
            TypeKind::MetadataPtr(_) => "metadataptr",
            TypeKind::Function(_) => "func",
            TypeKind::AbstractIo => "abIO",
            TypeKind::ReturnAddress => "return_address",
            TypeKind::Memory => "memory",
            TypeKind::FloatTop => "float_top",
            TypeKind::FloatCon(_) => "ftcon",
            TypeKind::FloatBottom => "float",
            TypeKind::DoubleTop => "double_top",
            TypeKind::DoubleCon(_) => "dblcon",
            TypeKind::DoubleBottom => "double",
        }
    }
}
