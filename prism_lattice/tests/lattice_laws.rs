//! Algebraic laws of the lattice, checked exhaustively over value pools.

mod common;

use common::{
    class_free_pool, classes, full_pool, generic_ptr_pool, reference_pool, speculative_pool,
    tuple_pool,
};
use prism_lattice::{
    ClassModel, InlineDepth, LatticeConfig, Offset, Ptr, SharedTypeStore, TypeId, TypeKind,
    TypeStore, FIRST_DYNAMIC_ID,
};

fn fast_store(c: &common::Classes) -> TypeStore<'_> {
    TypeStore::with_config(&c.hierarchy, LatticeConfig::fast())
}

// =============================================================================
// Meet Laws
// =============================================================================

#[test]
fn test_meet_is_commutative() {
    let c = classes();
    let mut store = fast_store(&c);
    let pool = full_pool(&mut store, &c);

    for &a in &pool {
        for &b in &pool {
            let ab = store.meet(a, b);
            let ba = store.meet(b, a);
            assert_eq!(ab, ba, "{} ^ {}", store.dump(a), store.dump(b));
        }
    }
}

#[test]
fn test_meet_is_idempotent() {
    let c = classes();
    let mut store = fast_store(&c);
    let pool = full_pool(&mut store, &c);

    for &a in &pool {
        assert_eq!(store.meet(a, a), a);
    }
}

#[test]
fn test_meet_is_associative_over_class_free_values() {
    let c = classes();
    let mut store = fast_store(&c);
    let pool = class_free_pool(&mut store);

    for &a in &pool {
        for &b in &pool {
            for &x in &pool {
                let ab = store.meet(a, b);
                let left = store.meet(ab, x);
                let bx = store.meet(b, x);
                let right = store.meet(a, bx);
                assert_eq!(
                    left,
                    right,
                    "({} ^ {}) ^ {}",
                    store.dump(a),
                    store.dump(b),
                    store.dump(x)
                );
            }
        }
    }
}

#[test]
fn test_checked_store_accepts_every_pair() {
    let c = classes();
    let mut store = TypeStore::with_config(&c.hierarchy, LatticeConfig::checked());
    let pool = full_pool(&mut store, &c);

    for &a in &pool {
        for &b in &pool {
            if let Err(err) = store.try_meet(a, b) {
                panic!("{}", err);
            }
        }
    }
}

#[test]
fn test_tuple_meets_follow_the_laws() {
    let c = classes();
    let mut store = TypeStore::with_config(&c.hierarchy, LatticeConfig::checked());
    let pool = tuple_pool(&mut store);

    for &a in &pool {
        assert_eq!(store.dual(store.dual(a)), a);
        for &b in &pool {
            let ab = match store.try_meet(a, b) {
                Ok(mt) => mt,
                Err(err) => panic!("{}", err),
            };
            assert_eq!(ab, store.meet(b, a), "{} ^ {}", store.dump(a), store.dump(b));
        }
    }
}

#[test]
fn test_array_instance_join_under_default_config() {
    let c = classes();
    let mut store = TypeStore::new(&c.hierarchy);
    let size = store.non_negative_int();
    let ints = store.array(TypeId::INT, size, false);
    let int_array = store.array_ptr(Ptr::NotNull, ints, Some(c.int_array), true);
    let shape = store.instance(Ptr::NotNull, c.shape, false);
    let root = store.inst_not_null();

    let joined = store.join(shape, int_array);
    assert_eq!(joined, store.dual(root));
    assert_eq!(store.join(int_array, shape), joined);
    assert!(store.is_empty_value(joined));
}

#[test]
fn test_meet_all() {
    let c = classes();
    let mut store = fast_store(&c);
    let a = store.int(0, 3);
    let b = store.int(10, 20);
    let x = store.int_con(-4);
    let expected = store.int(-4, 20);
    assert_eq!(store.meet_all(&[a, b, x]), expected);
    assert_eq!(store.meet_all(&[]), TypeId::TOP);
}

// =============================================================================
// Dual and Join
// =============================================================================

#[test]
fn test_dual_is_an_involution() {
    let c = classes();
    let mut store = fast_store(&c);
    let pool = full_pool(&mut store, &c);

    for &a in &pool {
        assert_eq!(store.dual(store.dual(a)), a, "{}", store.dump(a));
    }
    assert_eq!(store.dual(TypeId::TOP), TypeId::BOTTOM);
    assert_eq!(store.dual(TypeId::CONTROL), TypeId::CONTROL);
}

#[test]
fn test_join_is_dual_of_meet_of_duals() {
    let c = classes();
    let mut store = fast_store(&c);
    let pool = full_pool(&mut store, &c);

    for &a in &pool {
        for &b in &pool {
            let joined = store.join(a, b);
            let (da, db) = (store.dual(a), store.dual(b));
            let mt = store.meet(da, db);
            assert_eq!(joined, store.dual(mt));
        }
    }
}

#[test]
fn test_join_of_ranges_intersects() {
    let c = classes();
    let mut store = fast_store(&c);
    let a = store.int(0, 10);
    let b = store.int(5, 20);
    let expected = store.int(5, 10);
    assert_eq!(store.join(a, b), expected);

    let disjoint = store.int(50, 60);
    let empty = store.join(a, disjoint);
    assert!(store.is_empty_value(empty));
}

// =============================================================================
// Order
// =============================================================================

#[test]
fn test_higher_equal_matches_meet() {
    let c = classes();
    let mut store = fast_store(&c);
    let pool = full_pool(&mut store, &c);

    for &a in &pool {
        for &b in &pool {
            let mt = store.meet(a, b);
            assert_eq!(store.higher_equal(a, b), mt == b);
        }
    }
}

#[test]
fn test_higher_equal_extremes() {
    let c = classes();
    let mut store = fast_store(&c);
    let pool = full_pool(&mut store, &c);

    for &a in &pool {
        assert!(store.higher_equal(TypeId::TOP, a));
        assert!(store.higher_equal(a, TypeId::BOTTOM));
    }
    let small = store.int(0, 10);
    let four = store.int_con(4);
    assert!(store.higher_equal(small, four));
    assert!(!store.higher_equal(small, TypeId::INT));
    assert!(!store.higher_equal(TypeId::CONTROL, TypeId::INT));
}

// =============================================================================
// Pointer Niceness
// =============================================================================

#[test]
fn test_niceness_table_round_trip() {
    for p in Ptr::ALL {
        assert_eq!(p.dual().dual(), p);
        assert_eq!(p.meet(p), p);
        assert_eq!(p.meet(Ptr::Top), p);
        assert_eq!(p.meet(Ptr::Bottom), Ptr::Bottom);
        for q in Ptr::ALL {
            assert_eq!(p.meet(q), q.meet(p));
            assert_eq!(p.join(q), p.dual().meet(q.dual()).dual());
            for r in Ptr::ALL {
                assert_eq!(p.meet(q).meet(r), p.meet(q.meet(r)));
            }
        }
    }
}

#[test]
fn test_generic_pointer_meets_follow_niceness_table() {
    let c = classes();
    let mut store = fast_store(&c);
    let nice: Vec<Ptr> = Ptr::ALL.into_iter().filter(|p| *p != Ptr::Constant).collect();

    for &p in &nice {
        for &q in &nice {
            let a = store.any_ptr(p, Offset::ZERO);
            let b = store.any_ptr(q, Offset::ZERO);
            let mt = store.meet(a, b);
            assert_eq!(store.kind(mt).ptr(), Some(p.meet(q)));
            let joined = store.join(a, b);
            assert_eq!(store.kind(joined).ptr(), Some(p.join(q)));
        }
        let a = store.any_ptr(p, Offset::ZERO);
        assert_eq!(store.kind(store.dual(a)).ptr(), Some(p.dual()));
    }
}

#[test]
fn test_generic_pointer_offsets() {
    let c = classes();
    let mut store = fast_store(&c);
    let pool = generic_ptr_pool(&mut store);

    for &a in &pool {
        for &b in &pool {
            let (oa, ob) = (store.kind(a).offset(), store.kind(b).offset());
            let mt = store.meet(a, b);
            assert_eq!(store.kind(mt).offset(), oa.zip(ob).map(|(x, y)| x.meet(y)));
        }
    }
}

// =============================================================================
// Classes
// =============================================================================

#[test]
fn test_unrelated_classes_cannot_be_one_object() {
    let c = classes();
    let mut store = TypeStore::with_config(&c.hierarchy, LatticeConfig::checked());
    let circle = store.instance(Ptr::NotNull, c.circle, true);
    let square = store.instance(Ptr::NotNull, c.square, true);

    // Either one or the other: the common ancestor, no longer exact.
    let mt = store.meet(circle, square);
    match store.kind(mt) {
        TypeKind::InstPtr(inst) => {
            assert_eq!(inst.class, c.shape);
            assert_eq!(inst.info.ptr, Ptr::NotNull);
            assert!(!inst.exact);
            assert!(inst.constant.is_none());
        }
        other => panic!("expected an instance pointer, got {:?}", other),
    }

    // Both at once: nothing.
    let both = store.join(circle, square);
    assert!(store.is_empty_value(both));
}

#[test]
fn test_subclass_meets_to_superclass() {
    let c = classes();
    let mut store = TypeStore::with_config(&c.hierarchy, LatticeConfig::checked());
    let shape = store.instance(Ptr::NotNull, c.shape, false);
    let circle = store.instance(Ptr::NotNull, c.circle, false);
    assert_eq!(store.meet(shape, circle), shape);
    assert!(store.higher_equal(shape, circle));
    assert_eq!(store.join(shape, circle), circle);
}

// =============================================================================
// Widening
// =============================================================================

/// Widen a loop-carried range that grows by `step(i)` on iteration `i`
/// until it stops changing; returns the number of changing steps.
fn widen_until_stable(store: &mut TypeStore<'_>, step: impl Fn(i32) -> i32) -> (usize, TypeId) {
    let mut current = store.int_con(0);
    for i in 1..100 {
        let incoming = store.int_con(step(i));
        let grown = store.meet(current, incoming);
        let widened = store.widen(grown, current, None);
        if widened == current {
            return (i as usize - 1, current);
        }
        current = widened;
    }
    panic!("widening did not converge: {}", store.dump(current));
}

#[test]
fn test_widening_terminates_upward() {
    let c = classes();
    let mut store = fast_store(&c);
    let limit = store.config().widen_limit as usize;

    let (steps, fixed) = widen_until_stable(&mut store, |i| i * 1000);
    assert!(steps <= limit + 3, "took {} steps", steps);
    assert_eq!(fixed, store.int_with_widen(0, i32::MAX, 3));
}

#[test]
fn test_widening_terminates_downward() {
    let c = classes();
    let mut store = fast_store(&c);
    let limit = store.config().widen_limit as usize;

    let (steps, fixed) = widen_until_stable(&mut store, |i| -i * 1000);
    assert!(steps <= limit + 3, "took {} steps", steps);
    assert_eq!(fixed, store.int_with_widen(i32::MIN, 0, 3));
}

#[test]
fn test_widening_terminates_on_both_sides() {
    let c = classes();
    let mut store = fast_store(&c);
    let limit = store.config().widen_limit as usize;

    let (steps, fixed) =
        widen_until_stable(&mut store, |i| if i % 2 == 0 { -i * 1000 } else { i * 1000 });
    assert!(steps <= limit + 3, "took {} steps", steps);
    assert_eq!(fixed, TypeId::INT);
}

#[test]
fn test_smaller_widen_limit_converges_sooner() {
    let c = classes();
    let config = LatticeConfig {
        widen_limit: 1,
        ..LatticeConfig::fast()
    };
    let mut store = TypeStore::with_config(&c.hierarchy, config);

    let (steps, _) = widen_until_stable(&mut store, |i| i * 1000);
    assert!(steps <= 1 + 3, "took {} steps", steps);
}

// =============================================================================
// Speculation
// =============================================================================

#[test]
fn test_stripping_speculation_is_lossless() {
    let c = classes();
    let mut store = fast_store(&c);
    let pool = full_pool(&mut store, &c);

    for &a in &pool {
        let guessed = store.speculate(a, c.circle, InlineDepth::at(1));
        assert_eq!(store.remove_speculative(guessed), a, "{}", store.dump(guessed));
        for &b in &pool {
            let with_guess = store.meet(guessed, b);
            let without = store.meet(a, b);
            assert_eq!(with_guess, without);
        }
    }
}

#[test]
fn test_meet_of_speculative_values_ignores_guesses() {
    let c = classes();
    let mut store = TypeStore::with_config(&c.hierarchy, LatticeConfig::checked());
    let guesses = speculative_pool(&mut store, &c);
    let pool = full_pool(&mut store, &c);

    for &a in &guesses {
        let stripped = store.remove_speculative(a);
        for &b in &pool {
            let with_guess = match store.try_meet(a, b) {
                Ok(mt) => mt,
                Err(err) => panic!("{}", err),
            };
            assert_eq!(with_guess, store.meet(stripped, b));
        }
    }
}

#[test]
fn test_speculative_meet_is_commutative() {
    let c = classes();
    let mut store = fast_store(&c);
    let guesses = speculative_pool(&mut store, &c);

    for &a in &guesses {
        assert_eq!(store.meet_speculative(a, a), a, "{}", store.dump(a));
        for &b in &guesses {
            let ab = store.meet_speculative(a, b);
            let ba = store.meet_speculative(b, a);
            assert_eq!(ab, ba, "{} ^ {}", store.dump(a), store.dump(b));
        }
    }
}

#[test]
fn test_speculation_attaches_to_references() {
    let c = classes();
    let mut store = fast_store(&c);
    let bottom = store.inst_bottom();
    let guessed = store.speculate(bottom, c.circle, InlineDepth::at(1));
    assert_ne!(guessed, bottom);
    assert_eq!(store.speculative_type(guessed), Some(c.circle));
    assert!(store.higher_equal(guessed, bottom));
    assert!(store.higher_equal(bottom, guessed));

    let int = store.int(0, 10);
    assert_eq!(store.speculate(int, c.circle, InlineDepth::at(1)), int);
}

// =============================================================================
// Interning
// =============================================================================

#[test]
fn test_structurally_equal_values_intern_once() {
    let c = classes();
    let mut store = fast_store(&c);

    let a = store.int(3, 9);
    let len = store.len();
    let b = store.int(3, 9);
    assert_eq!(a, b);
    assert_eq!(store.len(), len);
    assert!(a.index() >= FIRST_DYNAMIC_ID);

    let x = store.instance(Ptr::NotNull, c.circle, false);
    let y = store.instance(Ptr::NotNull, c.circle, false);
    assert_eq!(x, y);
    assert_ne!(x, store.instance(Ptr::NotNull, c.shape, false));
}

#[test]
fn test_reserved_values_agree_across_stores() {
    let c = classes();
    let mut first = fast_store(&c);
    let mut second = TypeStore::with_config(&c.hierarchy, LatticeConfig::checked());

    assert_eq!(first.int(i32::MIN, i32::MAX), TypeId::INT);
    assert_eq!(second.int(i32::MIN, i32::MAX), TypeId::INT);
    assert_eq!(first.long(i64::MIN, i64::MAX), TypeId::LONG);
    assert_eq!(second.raw_const(0), TypeId::NULL_PTR);
    assert_eq!(first.dump(TypeId::RAW_BOTTOM), second.dump(TypeId::RAW_BOTTOM));
}

#[test]
fn test_shared_store_across_threads() {
    let c = classes();
    let shared = SharedTypeStore::new(&c.hierarchy);
    let object = c.hierarchy.object_class();

    let results: Vec<(TypeId, TypeId)> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    shared.with(|store| {
                        let refs = reference_pool(store, &c);
                        let range = (0..16).fold(TypeId::TOP, |acc, i| {
                            let v = store.int_con(i);
                            store.meet(acc, v)
                        });
                        let any = refs.iter().fold(TypeId::TOP, |acc, r| store.meet(acc, *r));
                        (range, any)
                    })
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut store = shared.into_inner();
    let expected_range = store.int(0, 15);
    for (range, any) in &results {
        assert_eq!(*range, expected_range);
        assert_eq!(*any, results[0].1);
    }
    // Raw and heap pointers only share the generic bottom.
    assert_eq!(results[0].1, TypeId::PTR_BOTTOM);
    let bottom = store.inst_bottom();
    let not_null = store.instance(Ptr::NotNull, object, false);
    assert!(store.higher_equal(bottom, not_null));
}
