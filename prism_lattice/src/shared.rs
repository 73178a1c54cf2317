//! A type store shared by several passes of one compilation.
//!
//! Interned values are immutable, so reading a [`TypeKind`] needs no
//! coordination. Interning does: the dictionary and the dual table are
//! the only mutable state in the lattice. [`SharedTypeStore`] serializes
//! every operation behind one lock, which also covers operations that
//! intern their results (`meet`, `join`, `filter`, ...).

use parking_lot::Mutex;

use crate::class_model::ClassModel;
use crate::config::LatticeConfig;
use crate::intern::{TypeId, TypeStore};
use crate::types::TypeKind;

/// A [`TypeStore`] behind a mutex.
#[derive(Debug)]
pub struct SharedTypeStore<'cm> {
    inner: Mutex<TypeStore<'cm>>,
}

impl<'cm> SharedTypeStore<'cm> {
    pub fn new(classes: &'cm dyn ClassModel) -> Self {
        Self::from_store(TypeStore::new(classes))
    }

    pub fn with_config(classes: &'cm dyn ClassModel, config: LatticeConfig) -> Self {
        Self::from_store(TypeStore::with_config(classes, config))
    }

    pub fn from_store(store: TypeStore<'cm>) -> Self {
        Self {
            inner: Mutex::new(store),
        }
    }

    /// Run `f` with exclusive access to the store.
    ///
    /// Prefer one call per batch of operations over many small ones: the
    /// lock is held for the whole closure.
    pub fn with<R>(&self, f: impl FnOnce(&mut TypeStore<'cm>) -> R) -> R {
        let mut store = self.inner.lock();
        f(&mut store)
    }

    pub fn intern(&self, kind: TypeKind) -> TypeId {
        self.inner.lock().intern(kind)
    }

    pub fn meet(&self, a: TypeId, b: TypeId) -> TypeId {
        self.inner.lock().meet(a, b)
    }

    pub fn join(&self, a: TypeId, b: TypeId) -> TypeId {
        self.inner.lock().join(a, b)
    }

    pub fn dump(&self, id: TypeId) -> String {
        self.inner.lock().dump(id)
    }

    /// Number of interned values.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Give the store back once the parallel phase is over.
    pub fn into_inner(self) -> TypeStore<'cm> {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_model::ClassHierarchy;
    use crate::types::IntRange;

    #[test]
    fn test_concurrent_interning_is_canonical() {
        let classes = ClassHierarchy::new();
        let shared = SharedTypeStore::new(&classes);
        let limit = LatticeConfig::default().widen_limit;

        let ids: Vec<Vec<TypeId>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        (0..32)
                            .map(|i| shared.intern(TypeKind::Int(IntRange::new(i, i + 100, 0, limit))))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for other in &ids[1..] {
            assert_eq!(&ids[0], other);
        }
        let store = shared.into_inner();
        for (i, id) in ids[0].iter().enumerate() {
            let lo = i as i32;
            assert_eq!(store.kind(*id), &TypeKind::Int(IntRange::new(lo, lo + 100, 0, limit)));
        }
    }

    #[test]
    fn test_with_batches_operations() {
        let classes = ClassHierarchy::new();
        let shared = SharedTypeStore::new(&classes);
        let (a, b) = shared.with(|store| (store.int(0, 5), store.int(10, 20)));
        let mt = shared.meet(a, b);
        assert_eq!(shared.dump(mt), "int:0..20");
        assert_eq!(shared.join(mt, a), a);
    }
}
