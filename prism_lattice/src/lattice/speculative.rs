//! Speculative overlays.
//!
//! A pointer value may carry a guess: another pointer value that profiling
//! suggests is true but that has not been proven. The guess rides along
//! with the primary value and is combined separately from it:
//!
//! - `meet`, `join` and `filter` ignore guesses entirely
//! - the `*_speculative` variants combine guesses with their own meet
//!   and then drop the ones that no longer help
//! - `remove_speculative` recovers the primary value
//!
//! Each guess records the inlining depth it was profiled at. A profile
//! taken closer to the compilation root replaces one taken deeper in the
//! inlining tree.

use crate::class_model::ClassId;
use crate::intern::{TypeId, TypeStore};
use crate::types::{ArrayBody, InlineDepth, Ptr, Speculation, TypeKind};

/// What a profile says about a reference's nullness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfilePtrKind {
    /// Null and non-null values were both seen.
    MaybeNull,
    AlwaysNull,
    NeverNull,
}

impl<'cm> TypeStore<'cm> {
    // =========================================================================
    // Stripping
    // =========================================================================

    /// Same value without its guess. The inline depth is kept.
    pub fn remove_speculative(&mut self, id: TypeId) -> TypeId {
        match self.kind(id).clone() {
            TypeKind::Array(body) => {
                let elem = self.remove_speculative(body.elem);
                if elem == body.elem {
                    return id;
                }
                self.intern(TypeKind::Array(ArrayBody { elem, ..body }))
            }
            TypeKind::NarrowOop(ptr) => {
                let stripped = self.remove_speculative(ptr);
                if stripped == ptr {
                    return id;
                }
                self.intern(TypeKind::NarrowOop(stripped))
            }
            TypeKind::ArrayPtr(mut ary) => {
                if ary.info.spec.guess.is_none() {
                    return id;
                }
                ary.info.spec = ary.info.spec.without_guess();
                ary.body = self.remove_speculative(ary.body);
                self.intern(TypeKind::ArrayPtr(ary))
            }
            kind => match kind.speculation() {
                Some(spec) if spec.guess.is_some() => {
                    self.intern(kind.with_speculation(spec.without_guess()))
                }
                _ => id,
            },
        }
    }

    /// Drop a guess that cannot sharpen anything.
    ///
    /// A guess is useless when the primary value is exact and non-null,
    /// when the guess is itself above the centerline, or when it may be
    /// null without naming an exact class.
    pub fn cleanup_speculative(&mut self, id: TypeId) -> TypeId {
        let kind = self.kind(id).clone();
        match kind {
            TypeKind::Array(body) => {
                let elem = self.cleanup_speculative(body.elem);
                if elem == body.elem {
                    return id;
                }
                self.intern(TypeKind::Array(ArrayBody { elem, ..body }))
            }
            TypeKind::NarrowOop(ptr) => {
                let cleaned = self.cleanup_speculative(ptr);
                if cleaned == ptr {
                    return id;
                }
                self.intern(TypeKind::NarrowOop(cleaned))
            }
            _ => {
                let Some(spec) = kind.speculation() else {
                    return id;
                };
                if kind.is_oop_ptr() && kind.is_exact() && !self.maybe_null(id) {
                    return self.remove_speculative(id);
                }
                let Some(guess) = spec.guess else {
                    return id;
                };

                let no_spec = self.remove_speculative(id);
                let null_at_depth = self.with_inline_depth(TypeId::NULL_PTR, spec.inline_depth);
                if no_spec == null_at_depth {
                    return no_spec;
                }
                let guess_kind = self.kind(guess);
                if guess_kind.ptr().is_some_and(Ptr::above_centerline) {
                    return no_spec;
                }
                let exact_oop = guess_kind.is_oop_ptr() && guess_kind.is_exact();
                if guess != TypeId::NULL_PTR && self.maybe_null(guess) && !exact_oop {
                    return no_spec;
                }
                id
            }
        }
    }

    /// Same value profiled at `depth`.
    ///
    /// Has no effect when inline depths are disabled in the configuration
    /// or on values that carry no overlay.
    pub fn with_inline_depth(&mut self, id: TypeId, depth: InlineDepth) -> TypeId {
        if !self.config.speculative_inline_depth {
            return id;
        }
        let kind = self.kind(id).clone();
        let Some(spec) = kind.speculation() else {
            return id;
        };
        let mut kind = kind.with_speculation(Speculation {
            inline_depth: depth,
            ..spec
        });
        if let TypeKind::ArrayPtr(ary) = &mut kind {
            ary.body = self.remove_speculative(ary.body);
        }
        self.intern(kind)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The guess of `id`, if any.
    pub fn speculative(&self, id: TypeId) -> Option<TypeId> {
        self.kind(id).speculation().and_then(|s| s.guess)
    }

    /// Guess refined by the primary value.
    fn refined_guess(&mut self, id: TypeId) -> Option<TypeId> {
        let guess = self.speculative(id)?;
        Some(self.join(guess, id))
    }

    /// Exact class the guess names, if it names one.
    pub fn speculative_type(&mut self, id: TypeId) -> Option<ClassId> {
        let guess = self.speculative(id)?;
        if !self.kind(guess).is_oop_ptr() {
            return None;
        }
        let refined = self.join(guess, id);
        match self.kind(refined) {
            TypeKind::InstPtr(inst) if inst.exact => Some(inst.class),
            TypeKind::ArrayPtr(ary) if ary.exact => ary.class,
            _ => None,
        }
    }

    /// Like [`speculative_type`](Self::speculative_type), but only when the
    /// guess also says the value is never null.
    pub fn speculative_type_not_null(&mut self, id: TypeId) -> Option<ClassId> {
        if self.speculative_maybe_null(id) {
            return None;
        }
        self.speculative_type(id)
    }

    /// Whether the guess allows null. Without a guess nothing is known.
    pub fn speculative_maybe_null(&mut self, id: TypeId) -> bool {
        match self.refined_guess(id) {
            Some(refined) => self.kind(refined).ptr().is_some_and(Ptr::maybe_null),
            None => true,
        }
    }

    /// Whether the guess says the value is always null.
    pub fn speculative_always_null(&mut self, id: TypeId) -> bool {
        match self.refined_guess(id) {
            Some(refined) => self.kind(refined).ptr() == Some(Ptr::Null),
            None => false,
        }
    }

    /// Whether a profile naming `exact_class` at `depth` would tell more
    /// than the current guess.
    ///
    /// An existing exact guess is only replaced by a profile from a
    /// shallower inline depth.
    pub fn would_improve_type(
        &mut self,
        id: TypeId,
        exact_class: Option<ClassId>,
        depth: InlineDepth,
    ) -> bool {
        let kind = self.kind(id);
        if kind.is_oop_ptr() && kind.is_exact() {
            return false;
        }
        if exact_class.is_none() {
            return false;
        }
        let Some(guess) = self.speculative(id) else {
            return true;
        };
        if self.kind(guess).ptr() == Some(Ptr::Null) {
            return false;
        }
        if self.speculative_type(id).is_none() {
            return true;
        }
        let guess_depth = self
            .kind(guess)
            .speculation()
            .map_or(InlineDepth::BOTTOM, |s| s.inline_depth);
        if guess_depth == InlineDepth::BOTTOM {
            return false;
        }
        depth < guess_depth
    }

    /// Whether a nullness profile would tell more than what is known.
    pub fn would_improve_ptr(&mut self, id: TypeId, profile: ProfilePtrKind) -> bool {
        if profile == ProfilePtrKind::MaybeNull {
            return false;
        }
        if !self.maybe_null(id) {
            return false;
        }
        if !self.speculative_maybe_null(id) {
            return false;
        }
        if self.kind(id).ptr() == Some(Ptr::Null) {
            return false;
        }
        if self.speculative_always_null(id) {
            return false;
        }
        if profile == ProfilePtrKind::AlwaysNull
            && self.speculative(id).is_some_and(|g| self.kind(g).is_oop_ptr())
        {
            return false;
        }
        true
    }

    /// Attach a profile saying `id` is probably exactly `class`, seen at
    /// inline depth `depth`.
    ///
    /// Returns `id` unchanged when the profile would not improve on what
    /// the value already carries.
    pub fn speculate(&mut self, id: TypeId, class: ClassId, depth: InlineDepth) -> TypeId {
        if self.kind(id).speculation().is_none() {
            return id;
        }
        if !self.would_improve_type(id, Some(class), depth) {
            return id;
        }
        let profiled = self.instance(Ptr::Bottom, class, true);
        let guess = self.with_inline_depth(profiled, depth);
        let kind = self.kind(id).clone();
        let spec = kind.speculation().unwrap_or(Speculation::NONE);
        let speculated = self.intern(kind.with_speculation(Speculation {
            guess: Some(guess),
            ..spec
        }));
        self.cleanup_speculative(speculated)
    }
}
