//! Reflection across the centerline.
//!
//! `xdual` computes the payload of a value's dual. It runs once per value,
//! when the value is interned; afterwards [`TypeStore::dual`] is a lookup.

use crate::error::LatticeResult;
use crate::intern::{TypeId, TypeStore};
use crate::types::{ArrayBody, PtrInfo, Speculation, TypeKind, VectorType};

impl<'cm> TypeStore<'cm> {
    pub(crate) fn xdual(&mut self, kind: &TypeKind) -> LatticeResult<TypeKind> {
        let widen_limit = self.config.widen_limit;
        let dual = match kind {
            TypeKind::Top => TypeKind::Bottom,
            TypeKind::Bottom => TypeKind::Top,
            TypeKind::Control
            | TypeKind::AbstractIo
            | TypeKind::Memory
            | TypeKind::ReturnAddress
            | TypeKind::Half
            | TypeKind::Function(_)
            | TypeKind::FloatCon(_)
            | TypeKind::DoubleCon(_) => kind.clone(),

            TypeKind::FloatTop => TypeKind::FloatBottom,
            TypeKind::FloatBottom => TypeKind::FloatTop,
            TypeKind::DoubleTop => TypeKind::DoubleBottom,
            TypeKind::DoubleBottom => TypeKind::DoubleTop,

            TypeKind::Int(r) => TypeKind::Int(r.dual(widen_limit)),
            TypeKind::Long(r) => TypeKind::Long(r.dual(widen_limit)),

            TypeKind::NarrowOop(ptr) => TypeKind::NarrowOop(self.dual(*ptr)),
            TypeKind::NarrowClass(ptr) => TypeKind::NarrowClass(self.dual(*ptr)),

            TypeKind::Tuple(fields) => {
                TypeKind::Tuple(fields.iter().map(|f| self.dual(*f)).collect())
            }
            TypeKind::Array(body) => {
                let size = self.dual(body.size);
                let size = self.normalize_array_size(size);
                TypeKind::Array(ArrayBody {
                    elem: self.dual(body.elem),
                    size,
                    stable: !body.stable,
                })
            }
            TypeKind::Vector(v) => TypeKind::Vector(VectorType {
                elem: self.dual(v.elem),
                ..*v
            }),

            TypeKind::AnyPtr(info) => TypeKind::AnyPtr(self.dual_info(info)),
            TypeKind::RawPtr(raw) => {
                let mut raw = *raw;
                raw.ptr = raw.ptr.dual();
                TypeKind::RawPtr(raw)
            }
            TypeKind::ObjectPtr(obj) => {
                let mut obj = *obj;
                obj.info = self.dual_info(&obj.info);
                obj.instance = obj.instance.dual();
                TypeKind::ObjectPtr(obj)
            }
            TypeKind::InstPtr(inst) => {
                let mut inst = *inst;
                inst.info = self.dual_info(&inst.info);
                inst.instance = inst.instance.dual();
                TypeKind::InstPtr(inst)
            }
            TypeKind::ArrayPtr(ary) => {
                let mut ary = *ary;
                ary.info = self.dual_info(&ary.info);
                ary.instance = ary.instance.dual();
                ary.body = self.dual(ary.body);
                TypeKind::ArrayPtr(ary)
            }
            TypeKind::ClassPtr(k) => {
                let mut k = *k;
                k.ptr = k.ptr.dual();
                k.offset = k.offset.dual();
                TypeKind::ClassPtr(k)
            }
            TypeKind::MetadataPtr(m) => {
                let mut m = *m;
                m.ptr = m.ptr.dual();
                m.offset = m.offset.dual();
                TypeKind::MetadataPtr(m)
            }
        };
        Ok(dual)
    }

    fn dual_info(&self, info: &PtrInfo) -> PtrInfo {
        PtrInfo {
            ptr: info.ptr.dual(),
            offset: info.offset.dual(),
            spec: self.dual_speculation(info.spec),
        }
    }

    /// The overlay reflects independently of the primary value.
    pub(crate) fn dual_speculation(&self, spec: Speculation) -> Speculation {
        Speculation {
            guess: spec.guess.map(|g| self.dual(g)),
            inline_depth: spec.inline_depth.dual(),
        }
    }

    /// Dual of every field, in order.
    pub fn dual_all(&self, ids: &[TypeId]) -> Vec<TypeId> {
        ids.iter().map(|id| self.dual(*id)).collect()
    }
}
