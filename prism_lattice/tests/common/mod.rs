//! Value pools shared by the integration tests.

#![allow(dead_code)]

use prism_lattice::{
    ClassHierarchy, ClassId, ClassModel, InlineDepth, MetadataId, ObjectId, Offset, Ptr, TypeId,
    TypeStore,
};

/// A small class tree:
///
/// ```text
///              Object
///          /     |     \
///      Shape   int[]   Drawable (interface)
///     /     \
/// Circle   Square (final, implements Drawable)
/// ```
///
/// plus `Lazy`, a class that is not loaded yet.
pub struct Classes {
    pub hierarchy: ClassHierarchy,
    pub shape: ClassId,
    pub circle: ClassId,
    pub square: ClassId,
    pub drawable: ClassId,
    pub lazy: ClassId,
    pub int_array: ClassId,
}

pub fn classes() -> Classes {
    let mut hierarchy = ClassHierarchy::new();
    let object = hierarchy.object_class();
    let shape = hierarchy.define_class("Shape", object);
    let circle = hierarchy.define_class("Circle", shape);
    let square = hierarchy.define_final_class("Square", shape);
    let drawable = hierarchy.define_interface("Drawable", &[]);
    hierarchy.implement(square, drawable);
    let lazy = hierarchy.define_unloaded("Lazy");
    let int_array = hierarchy.define_final_class("int[]", object);
    Classes {
        hierarchy,
        shape,
        circle,
        square,
        drawable,
        lazy,
        int_array,
    }
}

/// Integers, longs and floats, without their duals.
pub fn scalar_pool(store: &mut TypeStore<'_>) -> Vec<TypeId> {
    vec![
        TypeId::INT,
        store.int_con(0),
        store.int_con(-7),
        store.int(0, 10),
        store.int(-5, 3),
        store.int(100, 1000),
        store.int_with_widen(0, 1000, 2),
        store.bool_type(),
        store.byte_type(),
        TypeId::LONG,
        store.long_con(7),
        store.long(-10, 10),
        store.long(0, i64::MAX),
        TypeId::FLOAT,
        TypeId::FLOAT_TOP,
        store.float_con(1.0),
        store.float_con(0.0),
        store.float_con(-0.0),
        store.float_con(f32::NAN),
        TypeId::DOUBLE,
        TypeId::DOUBLE_TOP,
        store.double_con(2.5),
    ]
}

/// Generic pointers covering every niceness a generic pointer may take.
pub fn generic_ptr_pool(store: &mut TypeStore<'_>) -> Vec<TypeId> {
    let mut pool = vec![TypeId::PTR_BOTTOM, TypeId::NULL_PTR];
    for ptr in [Ptr::Top, Ptr::AnyNull, Ptr::NotNull, Ptr::Bottom] {
        pool.push(store.any_ptr(ptr, Offset::ZERO));
        pool.push(store.any_ptr(ptr, Offset::At(8)));
    }
    pool.push(store.any_ptr(Ptr::NotNull, Offset::Bottom));
    pool
}

/// Values whose meets are associative: scalars, generic pointers and the
/// lattice extremes.
pub fn class_free_pool(store: &mut TypeStore<'_>) -> Vec<TypeId> {
    let mut pool = vec![TypeId::TOP, TypeId::BOTTOM];
    pool.extend(scalar_pool(store));
    pool.extend(generic_ptr_pool(store));
    pool
}

/// Raw and heap pointers over [`Classes`].
pub fn reference_pool(store: &mut TypeStore<'_>, c: &Classes) -> Vec<TypeId> {
    vec![
        TypeId::RAW_BOTTOM,
        TypeId::RAW_TOP,
        store.raw_const(0x40),
        store.object(Ptr::NotNull),
        store.inst_bottom(),
        store.inst_not_null(),
        store.instance(Ptr::NotNull, c.shape, false),
        store.instance(Ptr::Bottom, c.shape, false),
        store.instance(Ptr::NotNull, c.circle, true),
        store.instance(Ptr::Bottom, c.square, false),
        store.instance(Ptr::NotNull, c.drawable, false),
        store.instance(Ptr::Bottom, c.drawable, false),
        store.instance(Ptr::NotNull, c.lazy, false),
        store.known_instance(c.circle, 1),
        store.instance_const(c.circle, ObjectId(1)),
    ]
}

/// Array, class and metadata pointers, and compressed references.
pub fn structured_pool(store: &mut TypeStore<'_>, c: &Classes) -> Vec<TypeId> {
    let size = store.non_negative_int();
    let ints = store.array(TypeId::INT, size, false);
    let shape_elem = store.instance(Ptr::Bottom, c.shape, false);
    let shapes = store.array(shape_elem, size, false);
    let drawable_elem = store.instance(Ptr::Bottom, c.drawable, false);
    let drawables = store.array(drawable_elem, size, false);

    let circle = store.instance(Ptr::NotNull, c.circle, false);
    let nullable_shape = store.instance(Ptr::Bottom, c.shape, false);
    let shape_class = store.class_ptr(Ptr::NotNull, c.shape);

    vec![
        store.array_ptr(Ptr::NotNull, ints, Some(c.int_array), true),
        store.array_ptr(Ptr::Bottom, ints, Some(c.int_array), true),
        store.array_ptr(Ptr::NotNull, shapes, None, false),
        store.array_ptr(Ptr::Bottom, shapes, None, false),
        store.array_ptr(Ptr::NotNull, drawables, None, false),
        shape_class,
        store.class_ptr(Ptr::Constant, c.circle),
        store.class_ptr(Ptr::Constant, c.square),
        store.class_ptr(Ptr::Constant, c.drawable),
        store.metadata_ptr(Ptr::Constant, Some(MetadataId(1))),
        store.metadata_ptr(Ptr::Constant, Some(MetadataId(2))),
        store.metadata_ptr(Ptr::NotNull, None),
        store.narrow_oop(circle),
        store.narrow_oop(nullable_shape),
        store.narrow_class(shape_class),
    ]
}

/// Everything above plus the dual of every value.
pub fn full_pool(store: &mut TypeStore<'_>, c: &Classes) -> Vec<TypeId> {
    let mut pool = class_free_pool(store);
    pool.extend(reference_pool(store, c));
    pool.extend(structured_pool(store, c));
    with_duals(store, pool)
}

/// Two-field tuples over scalars and generic pointers, with duals.
pub fn tuple_pool(store: &mut TypeStore<'_>) -> Vec<TypeId> {
    let small = store.int(0, 10);
    let seven = store.int_con(7);
    let half = store.float_con(0.5);
    let fields = [
        [small, TypeId::FLOAT],
        [seven, half],
        [TypeId::INT, TypeId::NULL_PTR],
        [seven, TypeId::PTR_BOTTOM],
        [TypeId::TOP, TypeId::BOTTOM],
    ];
    let pool = fields.iter().map(|f| store.tuple(f)).collect();
    with_duals(store, pool)
}

/// Heap references carrying a profiled guess.
pub fn speculative_pool(store: &mut TypeStore<'_>, c: &Classes) -> Vec<TypeId> {
    let bottom = store.inst_bottom();
    let shape = store.instance(Ptr::Bottom, c.shape, false);
    let not_null = store.inst_not_null();
    vec![
        store.speculate(bottom, c.circle, InlineDepth::at(1)),
        store.speculate(bottom, c.square, InlineDepth::at(2)),
        store.speculate(shape, c.circle, InlineDepth::at(3)),
        store.speculate(not_null, c.square, InlineDepth::at(1)),
    ]
}

fn with_duals(store: &mut TypeStore<'_>, mut pool: Vec<TypeId>) -> Vec<TypeId> {
    let duals: Vec<TypeId> = pool.iter().map(|id| store.dual(*id)).collect();
    pool.extend(duals);
    pool.sort();
    pool.dedup();
    pool
}
