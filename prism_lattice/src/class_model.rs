//! Class-model collaborator.
//!
//! Reference types name classes through opaque handles. Everything the
//! lattice needs to know about a class (loaded state, interface bit,
//! finality, subtyping) is answered by a [`ClassModel`] borrowed by the
//! store. [`ClassHierarchy`] is a small in-memory model for drivers that
//! do not bring their own.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

// =============================================================================
// Handles
// =============================================================================

/// Handle to a class descriptor owned by the class model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

/// Handle to a constant heap object (a string literal, a mirror, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Handle to a VM metadata object (method, method data, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetadataId(pub u32);

// =============================================================================
// Class Model
// =============================================================================

/// Queries the lattice asks about classes.
///
/// Answers must be stable for the lifetime of a store: the lattice interns
/// results derived from them.
pub trait ClassModel: Send + Sync {
    /// The root class every reference is an instance of.
    fn object_class(&self) -> ClassId;

    /// Whether the class is resolved. Unloaded classes only relate to
    /// themselves and the root.
    fn is_loaded(&self, class: ClassId) -> bool;

    fn is_interface(&self, class: ClassId) -> bool;

    /// Final classes have no subclasses, so their instances are exact.
    fn is_final(&self, class: ClassId) -> bool;

    /// Reflexive subtype test.
    fn is_subtype_of(&self, sub: ClassId, sup: ClassId) -> bool;

    /// Closest class on both superclass chains. Interfaces are never an
    /// answer unless both arguments are the same interface, and unloaded
    /// classes collapse to the root.
    fn least_common_ancestor(&self, a: ClassId, b: ClassId) -> ClassId;

    fn class_name(&self, class: ClassId) -> &str;
}

// =============================================================================
// In-memory hierarchy
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct ClassFlags {
    interface: bool,
    is_final: bool,
    loaded: bool,
}

#[derive(Debug, Clone)]
struct ClassInfo {
    name: String,
    superclass: Option<ClassId>,
    interfaces: SmallVec<[ClassId; 2]>,
    flags: ClassFlags,
}

/// Single-inheritance class tree with interfaces.
///
/// The root class `Object` is created by [`ClassHierarchy::new`].
#[derive(Debug, Clone)]
pub struct ClassHierarchy {
    classes: Vec<ClassInfo>,
    by_name: FxHashMap<String, ClassId>,
}

impl ClassHierarchy {
    /// Name of the root class.
    pub const OBJECT: &'static str = "Object";

    pub fn new() -> Self {
        let mut hierarchy = Self {
            classes: Vec::new(),
            by_name: FxHashMap::default(),
        };
        hierarchy.push(ClassInfo {
            name: Self::OBJECT.to_string(),
            superclass: None,
            interfaces: SmallVec::new(),
            flags: ClassFlags {
                loaded: true,
                ..ClassFlags::default()
            },
        });
        hierarchy
    }

    fn push(&mut self, info: ClassInfo) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(info.name.clone(), id);
        self.classes.push(info);
        id
    }

    fn info(&self, class: ClassId) -> &ClassInfo {
        &self.classes[class.0 as usize]
    }

    /// Define a loaded, extensible class.
    pub fn define_class(&mut self, name: &str, superclass: ClassId) -> ClassId {
        self.push(ClassInfo {
            name: name.to_string(),
            superclass: Some(superclass),
            interfaces: SmallVec::new(),
            flags: ClassFlags {
                loaded: true,
                ..ClassFlags::default()
            },
        })
    }

    /// Define a loaded class that cannot be subclassed.
    pub fn define_final_class(&mut self, name: &str, superclass: ClassId) -> ClassId {
        self.push(ClassInfo {
            name: name.to_string(),
            superclass: Some(superclass),
            interfaces: SmallVec::new(),
            flags: ClassFlags {
                loaded: true,
                is_final: true,
                ..ClassFlags::default()
            },
        })
    }

    /// Define a loaded interface extending `supers`.
    pub fn define_interface(&mut self, name: &str, supers: &[ClassId]) -> ClassId {
        let object = self.object_class();
        self.push(ClassInfo {
            name: name.to_string(),
            superclass: Some(object),
            interfaces: supers.iter().copied().collect(),
            flags: ClassFlags {
                loaded: true,
                interface: true,
                ..ClassFlags::default()
            },
        })
    }

    /// Define a class whose definition has not been resolved yet.
    pub fn define_unloaded(&mut self, name: &str) -> ClassId {
        self.push(ClassInfo {
            name: name.to_string(),
            superclass: None,
            interfaces: SmallVec::new(),
            flags: ClassFlags::default(),
        })
    }

    /// Record that `class` implements `interface`.
    pub fn implement(&mut self, class: ClassId, interface: ClassId) {
        self.classes[class.0 as usize].interfaces.push(interface);
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Superclass chain starting at `class` itself.
    fn superclass_chain(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(Some(class), move |c| self.info(*c).superclass)
    }
}

impl Default for ClassHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassModel for ClassHierarchy {
    fn object_class(&self) -> ClassId {
        ClassId(0)
    }

    fn is_loaded(&self, class: ClassId) -> bool {
        self.info(class).flags.loaded
    }

    fn is_interface(&self, class: ClassId) -> bool {
        self.info(class).flags.interface
    }

    fn is_final(&self, class: ClassId) -> bool {
        self.info(class).flags.is_final
    }

    fn is_subtype_of(&self, sub: ClassId, sup: ClassId) -> bool {
        if sub == sup {
            return true;
        }
        if !self.is_loaded(sub) || !self.is_loaded(sup) {
            return false;
        }
        if sup == self.object_class() {
            return true;
        }

        let mut worklist: SmallVec<[ClassId; 8]> = SmallVec::new();
        worklist.push(sub);
        while let Some(class) = worklist.pop() {
            if class == sup {
                return true;
            }
            let info = self.info(class);
            worklist.extend(info.superclass);
            worklist.extend(info.interfaces.iter().copied());
        }
        false
    }

    fn least_common_ancestor(&self, a: ClassId, b: ClassId) -> ClassId {
        if a == b {
            return a;
        }
        let object = self.object_class();
        if !self.is_loaded(a) || !self.is_loaded(b) {
            return object;
        }
        // Implemented interfaces are not on either chain.
        self.superclass_chain(a)
            .find(|ancestor| self.superclass_chain(b).any(|c| c == *ancestor))
            .unwrap_or(object)
    }

    fn class_name(&self, class: ClassId) -> &str {
        &self.info(class).name
    }
}
