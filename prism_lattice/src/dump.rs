//! Textual dumps of lattice values for compiler tracing.
//!
//! The format is for humans reading logs and test failures. It is
//! deterministic for a given store but is not meant to be parsed back.
//!
//! ```text
//! int:0..10            {0:control, 1:abIO, 2:memory}
//! Shape:NotNull *      int[int:>=0]:NotNull:exact *
//! rawptr:BotPTR        BotPTR *+bot (speculative=Shape:NotNull *)
//! ```

use std::fmt;

use crate::intern::{TypeId, TypeStore};
use crate::types::{call_slot, InlineDepth, InstanceId, Offset, Ptr, PtrInfo, TypeKind};

/// Display adapter for one value of a store.
#[derive(Clone, Copy)]
pub struct TypeDisplay<'a, 'cm> {
    store: &'a TypeStore<'cm>,
    id: TypeId,
}

impl<'cm> TypeStore<'cm> {
    /// Lazily formatted view of `id`.
    #[inline]
    pub fn display(&self, id: TypeId) -> TypeDisplay<'_, 'cm> {
        TypeDisplay { store: self, id }
    }

    /// Dump `id` to a string.
    pub fn dump(&self, id: TypeId) -> String {
        self.display(id).to_string()
    }
}

impl fmt::Debug for TypeDisplay<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id.index(), self)
    }
}

impl fmt::Display for TypeDisplay<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store;
        let nested = move |id| store.display(id);

        match store.kind(self.id) {
            TypeKind::Top => f.write_str("top"),
            TypeKind::Bottom => f.write_str("bottom"),
            TypeKind::Control => f.write_str("control"),
            TypeKind::AbstractIo => f.write_str("abIO"),
            TypeKind::ReturnAddress => f.write_str("return_address"),
            TypeKind::Memory => f.write_str("memory"),
            TypeKind::Half => f.write_str("half"),
            TypeKind::Int(r) => write!(f, "{}", r),
            TypeKind::Long(r) => write!(f, "{}", r),
            TypeKind::FloatTop => f.write_str("float_top"),
            TypeKind::FloatBottom => f.write_str("float"),
            TypeKind::FloatCon(v) => write!(f, "ftcon:{}", v.value()),
            TypeKind::DoubleTop => f.write_str("double_top"),
            TypeKind::DoubleBottom => f.write_str("double"),
            TypeKind::DoubleCon(v) => write!(f, "dblcon:{}", v.value()),
            TypeKind::NarrowOop(ptr) => write!(f, "narrowoop: {}", nested(*ptr)),
            TypeKind::NarrowClass(ptr) => write!(f, "narrowklass: {}", nested(*ptr)),

            TypeKind::Tuple(fields) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}:{}", i, nested(*field))?;
                }
                f.write_str("}")
            }
            TypeKind::Array(body) => {
                if body.stable {
                    f.write_str("stable:")?;
                }
                write!(f, "{}[{}]", nested(body.elem), nested(body.size))
            }
            TypeKind::Vector(v) => write!(f, "{}[{}]:{{{}}}", v.kind.name(), v.length, nested(v.elem)),
            TypeKind::Function(func) => {
                write_call_fields(f, store, func.range, " / ", "void")?;
                f.write_str(" ( ")?;
                write_call_fields(f, store, func.domain, ", ", "")?;
                f.write_str(" )")
            }

            TypeKind::AnyPtr(info) => {
                if info.ptr == Ptr::Null {
                    f.write_str("NULL")?;
                } else {
                    write!(f, "{} *", info.ptr)?;
                }
                write!(f, "{}", info.offset)?;
                write_overlay(f, store, info)
            }
            TypeKind::RawPtr(raw) => {
                if raw.ptr == Ptr::Constant {
                    write!(f, "{:#x}", raw.bits)
                } else {
                    write!(f, "rawptr:{}", raw.ptr)
                }
            }
            TypeKind::ObjectPtr(obj) => {
                write!(f, "oopptr:{}", obj.info.ptr)?;
                write_object_offset(f, obj.info.offset)?;
                write_instance(f, obj.instance)?;
                write_overlay(f, store, &obj.info)
            }
            TypeKind::InstPtr(inst) => {
                f.write_str(store.classes.class_name(inst.class))?;
                write_niceness(f, inst.info.ptr, inst.exact)?;
                if let Some(obj) = inst.constant {
                    write!(f, "(obj#{})", obj.0)?;
                }
                write_object_offset(f, inst.info.offset)?;
                f.write_str(" *")?;
                write_instance(f, inst.instance)?;
                write_overlay(f, store, &inst.info)
            }
            TypeKind::ArrayPtr(ary) => {
                write!(f, "{}", nested(ary.body))?;
                write_niceness(f, ary.info.ptr, ary.exact)?;
                if let Some(obj) = ary.constant {
                    write!(f, "(obj#{})", obj.0)?;
                }
                write_object_offset(f, ary.info.offset)?;
                f.write_str(" *")?;
                write_instance(f, ary.instance)?;
                write_overlay(f, store, &ary.info)
            }
            TypeKind::ClassPtr(klass) => {
                f.write_str("klass ")?;
                if klass.ptr == Ptr::Constant {
                    f.write_str("precise ")?;
                }
                write!(f, "{}:{}{} *", store.classes.class_name(klass.class), klass.ptr, klass.offset)
            }
            TypeKind::MetadataPtr(meta) => {
                write!(f, "metadataptr:{}", meta.ptr)?;
                if let Some(m) = meta.metadata {
                    write!(f, "#{}", m.0)?;
                }
                write!(f, "{}", meta.offset)
            }
        }
    }
}

// =============================================================================
// Pieces
// =============================================================================

/// Niceness suffix of a class or array pointer. The common bottom case
/// prints only exactness.
fn write_niceness(f: &mut fmt::Formatter<'_>, ptr: Ptr, exact: bool) -> fmt::Result {
    if ptr != Ptr::Bottom {
        write!(f, ":{}", ptr)?;
    }
    if exact {
        f.write_str(":exact")?;
    }
    Ok(())
}

fn write_object_offset(f: &mut fmt::Formatter<'_>, offset: Offset) -> fmt::Result {
    match offset {
        Offset::Top => f.write_str("+undefined"),
        Offset::Bottom => f.write_str("+any"),
        at => write!(f, "{}", at),
    }
}

fn write_instance(f: &mut fmt::Formatter<'_>, instance: InstanceId) -> fmt::Result {
    match instance {
        InstanceId::Top => f.write_str(",iid=top"),
        InstanceId::Bottom => Ok(()),
        InstanceId::Known(iid) => write!(f, ",iid={}", iid),
    }
}

fn write_overlay(f: &mut fmt::Formatter<'_>, store: &TypeStore<'_>, info: &PtrInfo) -> fmt::Result {
    let depth = info.spec.inline_depth;
    if depth == InlineDepth::TOP {
        f.write_str(" (inline_depth=top)")?;
    } else if depth != InlineDepth::BOTTOM {
        write!(f, " (inline_depth={})", depth.value())?;
    }
    if let Some(guess) = info.spec.guess {
        write!(f, " (speculative={})", store.display(guess))?;
    }
    Ok(())
}

/// Argument or result slots of a call tuple, skipping the frame slots.
fn write_call_fields(
    f: &mut fmt::Formatter<'_>,
    store: &TypeStore<'_>,
    tuple: TypeId,
    sep: &str,
    empty: &str,
) -> fmt::Result {
    let TypeKind::Tuple(fields) = store.kind(tuple) else {
        return write!(f, "{}", store.display(tuple));
    };
    let params = fields.get(call_slot::PARMS..).unwrap_or(&[]);
    if params.is_empty() {
        return f.write_str(empty);
    }
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", store.display(*param))?;
    }
    Ok(())
}
