//! Field interpreter registration and lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use horizon_inspect_core::logging::targets;
use horizon_inspect_core::{
    Data, FieldAccess, FieldEntry, FieldFlags, Formatter, Instance, MetaField, ValueType,
};

use crate::control::ControlId;
use crate::interpreter::Interpreter;

/// Everything a field interpreter sees of the field it builds.
pub struct FieldContext<'c, 'a> {
    /// The builder; controls go to its top container.
    pub interp: &'c mut Interpreter<'a>,
    /// The `N` instances being inspected.
    pub instances: &'c [Instance],
    /// The field, reachable from every instance.
    pub entry: &'c FieldEntry,
}

impl FieldContext<'_, '_> {
    pub fn field(&self) -> &'static MetaField {
        self.entry.field
    }

    pub fn flags(&self) -> FieldFlags {
        self.entry.field.flags
    }

    /// Label shown next to the field's controls.
    pub fn label(&self) -> &'static str {
        self.entry.field.ui_name
    }

    /// Whether edits must be refused.
    pub fn is_read_only(&self) -> bool {
        self.flags().has(FieldFlags::READ_ONLY)
            || matches!(self.entry.field.access, FieldAccess::Value { set: None, .. })
    }

    /// A text binding over the field of every instance.
    ///
    /// Logs and returns `None` if an instance does not carry the field.
    pub fn text_binding(&self) -> Option<Arc<dyn Data<String>>> {
        match Formatter::text_from_fields(self.instances, self.entry) {
            Ok(formatter) => Some(Arc::new(formatter)),
            Err(err) => {
                tracing::warn!(target: targets::REFLECT, field = ?self.entry, %err, "cannot bind field");
                None
            }
        }
    }

    /// Apply the field's read-only state and default to a bound control.
    pub fn decorate(&mut self, control: ControlId) {
        let read_only = self.is_read_only();
        let default = self.entry.field.default_text();
        let at_default = !self.instances.is_empty()
            && self
                .instances
                .iter()
                .all(|instance| self.entry.holds_default(&*instance.read()) == Some(true));
        let help = self.entry.field.property("Help").map(str::to_string);
        let canvas = self.interp.canvas();
        if read_only {
            canvas.set_read_only(control, true);
        }
        if default.is_some() {
            canvas.set_default_value(control, default);
            canvas.set_default_appearance(control, at_default);
        }
        if help.is_some() {
            canvas.set_help(control, help);
        }
    }
}

/// Strategy turning one reflected field into controls.
pub trait FieldInterpreter: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &'static str;

    /// Build the field's controls under `ctx.interp.top()`.
    ///
    /// Returns `false` to let the caller fall back to generic handling.
    fn interpret(&self, ctx: &mut FieldContext<'_, '_>) -> bool;
}

impl fmt::Debug for dyn FieldInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct Registration {
    mask: FieldFlags,
    interpreter: Arc<dyn FieldInterpreter>,
}

/// How well a registration fits a field's flags. Larger is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    /// Zero mask, used only when nothing shares a bit.
    Fallback,
    /// Number of flag bits shared.
    Shared(u32),
    Exact,
}

impl Rank {
    fn of(mask: FieldFlags, flags: FieldFlags) -> Option<Self> {
        if mask == flags {
            Some(Self::Exact)
        } else if mask.is_empty() {
            Some(Self::Fallback)
        } else {
            match mask.shared_bits(flags) {
                0 => None,
                shared => Some(Self::Shared(shared)),
            }
        }
    }
}

/// Field interpreters keyed by value type and flag mask.
#[derive(Default)]
pub struct FieldInterpreterFactory {
    registrations: HashMap<&'static str, Vec<Registration>>,
}

impl FieldInterpreterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `interpreter` for fields of `value_type` (or a type derived
    /// from it) whose flags match `mask`.
    ///
    /// A registration with the same type and mask is replaced.
    pub fn register(&mut self, value_type: &'static ValueType, mask: FieldFlags, interpreter: Arc<dyn FieldInterpreter>) {
        let list = self.registrations.entry(value_type.name).or_default();
        match list.iter_mut().find(|registration| registration.mask == mask) {
            Some(existing) => existing.interpreter = interpreter,
            None => list.push(Registration { mask, interpreter }),
        }
    }

    pub fn unregister(&mut self, value_type: &'static ValueType, mask: FieldFlags) -> bool {
        let Some(list) = self.registrations.get_mut(value_type.name) else {
            return false;
        };
        let before = list.len();
        list.retain(|registration| registration.mask != mask);
        before != list.len()
    }

    /// The best interpreter for a field of `value_type` with `flags`.
    ///
    /// The type and then each of its bases is tried in turn; the first type
    /// with an eligible registration decides. Among one type's
    /// registrations an exact mask match wins, then the mask sharing the
    /// most bits with `flags`, then a zero mask. A mask sharing no bit is
    /// not eligible. Ties go to the earliest registration.
    pub fn resolve(&self, value_type: &'static ValueType, flags: FieldFlags) -> Option<Arc<dyn FieldInterpreter>> {
        value_type.ancestry().find_map(|ty| {
            let list = self.registrations.get(ty.name)?;
            let mut best: Option<(Rank, &Registration)> = None;
            for registration in list {
                let Some(rank) = Rank::of(registration.mask, flags) else {
                    continue;
                };
                if best.is_none_or(|(best_rank, _)| rank > best_rank) {
                    best = Some((rank, registration));
                }
            }
            best.map(|(_, registration)| Arc::clone(&registration.interpreter))
        })
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.registrations.clear();
    }
}

impl fmt::Debug for FieldInterpreterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (ty, list) in &self.registrations {
            for registration in list {
                map.entry(&(ty, registration.mask), &registration.interpreter.name());
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_inspect_core::value::{ARRAY, CONTAINER, F32, FLOAT, I32};

    struct Named(&'static str);

    impl FieldInterpreter for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn interpret(&self, _ctx: &mut FieldContext<'_, '_>) -> bool {
            true
        }
    }

    fn named(name: &'static str) -> Arc<dyn FieldInterpreter> {
        Arc::new(Named(name))
    }

    fn resolved(factory: &FieldInterpreterFactory, ty: &'static ValueType, flags: FieldFlags) -> Option<&'static str> {
        factory.resolve(ty, flags).map(|interpreter| interpreter.name())
    }

    #[test]
    fn test_exact_mask_wins() {
        let mut factory = FieldInterpreterFactory::new();
        factory.register(&F32, FieldFlags::NONE, named("a"));
        factory.register(&F32, FieldFlags::READ_ONLY, named("b"));

        assert_eq!(resolved(&factory, &F32, FieldFlags::READ_ONLY), Some("b"));
        assert_eq!(resolved(&factory, &F32, FieldFlags::NONE), Some("a"));
        assert_eq!(resolved(&factory, &F32, FieldFlags::DISCARD), Some("a"));
    }

    #[test]
    fn test_most_shared_bits_wins() {
        let mut factory = FieldInterpreterFactory::new();
        factory.register(&F32, FieldFlags::NONE, named("fallback"));
        factory.register(&F32, FieldFlags::READ_ONLY, named("one"));
        factory.register(&F32, FieldFlags::READ_ONLY | FieldFlags::FILE_PATH, named("two"));

        let flags = FieldFlags::READ_ONLY | FieldFlags::FILE_PATH | FieldFlags::DISCARD;
        assert_eq!(resolved(&factory, &F32, flags), Some("two"));
    }

    #[test]
    fn test_ties_keep_first_registration() {
        let mut factory = FieldInterpreterFactory::new();
        factory.register(&F32, FieldFlags::READ_ONLY, named("first"));
        factory.register(&F32, FieldFlags::FILE_PATH, named("second"));

        let flags = FieldFlags::READ_ONLY | FieldFlags::FILE_PATH | FieldFlags::DISCARD;
        assert_eq!(resolved(&factory, &F32, flags), Some("first"));
    }

    #[test]
    fn test_unrelated_mask_is_ineligible() {
        let mut factory = FieldInterpreterFactory::new();
        factory.register(&F32, FieldFlags::FILE_PATH, named("files"));
        assert_eq!(resolved(&factory, &F32, FieldFlags::READ_ONLY), None);
    }

    #[test]
    fn test_walks_base_types() {
        let mut factory = FieldInterpreterFactory::new();
        factory.register(&FLOAT, FieldFlags::NONE, named("float"));
        factory.register(&CONTAINER, FieldFlags::NONE, named("container"));

        assert_eq!(resolved(&factory, &F32, FieldFlags::NONE), Some("float"));
        assert_eq!(resolved(&factory, &ARRAY, FieldFlags::NONE), Some("container"));
        assert_eq!(resolved(&factory, &I32, FieldFlags::NONE), None);
    }

    #[test]
    fn test_register_replaces_and_unregister() {
        let mut factory = FieldInterpreterFactory::new();
        factory.register(&F32, FieldFlags::NONE, named("old"));
        factory.register(&F32, FieldFlags::NONE, named("new"));
        assert_eq!(factory.len(), 1);
        assert_eq!(resolved(&factory, &F32, FieldFlags::NONE), Some("new"));

        assert!(factory.unregister(&F32, FieldFlags::NONE));
        assert!(!factory.unregister(&F32, FieldFlags::NONE));
        assert!(factory.is_empty());
    }
}
