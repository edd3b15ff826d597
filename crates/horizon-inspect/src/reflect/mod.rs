//! Reflective UI synthesis.
//!
//! [`ReflectInterpreter`] walks the metadata of N instances of one reflected
//! class and builds a panel of bound controls for them. Per field it tries,
//! in order: the field's `UIScript`, a [`FieldInterpreter`] registered for
//! the field's value type, and finally the generic [`ValueInterpreter`].
//! Reference fields recurse into the referenced objects and record arrays
//! build one sub-panel per record.
//!
//! ```
//! use horizon_inspect::{Canvas, InspectRegistry, Interpreter, ReflectInterpreter};
//! use horizon_inspect_core::{as_instance, share};
//! use horizon_inspect_macros::Reflect;
//!
//! #[derive(Default, Reflect)]
//! #[reflect(ui_name = "Light")]
//! struct Light {
//!     intensity: f32,
//! }
//!
//! let registry = InspectRegistry::with_defaults();
//! let (mut canvas, _log) = Canvas::headless();
//! let lights = [as_instance(share(Light::default()))];
//! let panel = {
//!     let mut interp = Interpreter::new(&mut canvas, &registry);
//!     ReflectInterpreter::default().interpret(&mut interp, &lights)
//! };
//! let panel = panel.unwrap();
//! assert_eq!(canvas.title(panel), Some("Light"));
//! assert!(canvas.find_child(panel, "intensity").is_some());
//! ```

mod container;
mod factory;
mod value;

use std::collections::HashMap;
use std::sync::Arc;

use horizon_inspect_core::logging::{span_names, targets};
use horizon_inspect_core::{FieldAccess, FieldEntry, FieldFlags, FieldValue, Instance, MetaClass, PerfSpan};

use crate::control::{Binding, ControlId, ControlKind, KindTag};
use crate::interpreter::Interpreter;
use crate::script::ScriptEngine;

pub use container::{ContainerInterpreter, FileContainerInterpreter, FileFilter};
pub use factory::{FieldContext, FieldInterpreter, FieldInterpreterFactory};
pub use value::ValueInterpreter;

/// Which fields a reflective build includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflectOptions {
    /// Fields carrying any of these flags are built. With [`FieldFlags::ALL`]
    /// fields without flags are built too.
    pub include: FieldFlags,
    /// Fields carrying any of these flags are left out.
    pub exclude: FieldFlags,
}

impl Default for ReflectOptions {
    fn default() -> Self {
        Self {
            include: FieldFlags::ALL,
            exclude: FieldFlags::NONE,
        }
    }
}

impl ReflectOptions {
    /// Whether a field with `flags` passes the include and exclude masks.
    pub fn admits(&self, flags: FieldFlags) -> bool {
        let included =
            (flags.is_empty() && self.include == FieldFlags::ALL) || self.include.intersects(flags);
        let excluded = !self.exclude.is_empty() && self.exclude.intersects(flags);
        included && !excluded
    }
}

/// Builds panels of controls from reflected metadata.
#[derive(Debug, Default)]
pub struct ReflectInterpreter {
    options: ReflectOptions,
    /// Addresses of the instances currently being built, for cycle checks.
    visiting: Vec<usize>,
}

impl ReflectInterpreter {
    pub fn new(options: ReflectOptions) -> Self {
        Self {
            options,
            visiting: Vec::new(),
        }
    }

    pub fn options(&self) -> ReflectOptions {
        self.options
    }

    /// Build a panel for `instances` under `interp.top()`.
    ///
    /// Every instance must be of the same class. Returns the panel, or
    /// `None` (logged) for an empty or mixed selection, for instances
    /// already being built further up, which would recurse forever, and when
    /// no field of the class produced a control.
    #[tracing::instrument(skip_all, target = "horizon_inspect::reflect", level = "trace")]
    pub fn interpret(&mut self, interp: &mut Interpreter<'_>, instances: &[Instance]) -> Option<ControlId> {
        let _span = PerfSpan::new(span_names::BUILD);
        let Some(first) = instances.first() else {
            tracing::warn!(target: targets::REFLECT, "nothing to inspect");
            return None;
        };
        let class = first.read().meta_class();
        if let Some(other) = instances
            .iter()
            .map(|instance| instance.read().meta_class())
            .find(|other| other.name != class.name)
        {
            tracing::warn!(
                target: targets::REFLECT,
                first = class.name,
                other = other.name,
                "cannot inspect instances of different classes together"
            );
            return None;
        }

        let keys: Vec<usize> = instances.iter().map(instance_key).collect();
        if keys.iter().any(|key| self.visiting.contains(key)) {
            tracing::warn!(target: targets::REFLECT, class = class.name, "reference cycle skipped");
            return None;
        }

        let depth = self.visiting.len();
        self.visiting.extend(keys);
        let panel = self.build_class(interp, class, instances);
        self.visiting.truncate(depth);
        panel
    }

    fn build_class(&mut self, interp: &mut Interpreter<'_>, class: &'static MetaClass, instances: &[Instance]) -> Option<ControlId> {
        let panel = interp.push_panel(class.ui_name);
        let scripted = class
            .property("UIScript")
            .and_then(|script| ScriptEngine::build(interp, script, None).ok())
            .and_then(|controls| take_script_label(interp, &controls));
        let label = scripted
            .or_else(|| common_title(instances))
            .unwrap_or_else(|| class.ui_name.to_string());
        let canvas = interp.canvas();
        canvas.set_title(panel, label.clone());
        canvas.set_name(panel, label);

        let mut groups: HashMap<String, ControlId> = HashMap::new();
        let common_base = interp.registry().common_base();
        for entry in class.fields_until(common_base) {
            let field = entry.field;
            if field.name.is_empty() {
                tracing::warn!(target: targets::REFLECT, class = class.name, "field without a name skipped");
                continue;
            }
            if field.flags.has(FieldFlags::HIDE) || !self.options.admits(field.flags) {
                continue;
            }

            let target = match field.property("UIGroup") {
                Some(path) => group_panel(interp, panel, &mut groups, path, entry.field.property("UIGroupExpanded")),
                None => panel,
            };
            interp.push(target);
            self.build_field(interp, instances, &entry);
            interp.pop(false);
        }

        if !attach_if_filled(interp, panel) {
            tracing::debug!(target: targets::REFLECT, class = class.name, "nothing to show, panel dropped");
            return None;
        }
        tracing::debug!(target: targets::REFLECT, class = class.name, instances = instances.len(), "class built");
        Some(panel)
    }

    fn build_field(&mut self, interp: &mut Interpreter<'_>, instances: &[Instance], entry: &FieldEntry) {
        let field = entry.field;
        match field.access {
            FieldAccess::Reference(_) => self.build_reference(interp, instances, entry),
            FieldAccess::Records(_) => self.build_records(interp, instances, entry),
            FieldAccess::Value { .. } => {
                let mut ctx = FieldContext {
                    interp,
                    instances,
                    entry,
                };
                if let Some(script) = field.property("UIScript")
                    && build_field_script(&mut ctx, script)
                {
                    return;
                }

                let registry = ctx.interp.registry();
                if let Some(handler) = registry.resolve_field_interpreter(field.value_type, field.flags) {
                    if handler.interpret(&mut ctx) {
                        return;
                    }
                    tracing::debug!(target: targets::REFLECT, field = field.name, handler = handler.name(), "field interpreter declined");
                }
                if field.value_type.is_container() {
                    tracing::debug!(target: targets::REFLECT, field = field.name, "no interpreter for container field");
                    return;
                }
                ValueInterpreter.interpret(&mut ctx);
            }
        }
    }

    fn build_reference(&mut self, interp: &mut Interpreter<'_>, instances: &[Instance], entry: &FieldEntry) {
        let referenced: Option<Vec<Instance>> = instances
            .iter()
            .map(|instance| entry.referenced(&*instance.read()))
            .collect();
        match referenced {
            Some(targets) => {
                self.interpret(interp, &targets);
            }
            None => {
                tracing::debug!(target: targets::REFLECT, field = entry.field.name, "reference unset, skipped");
            }
        }
    }

    fn build_records(&mut self, interp: &mut Interpreter<'_>, instances: &[Instance], entry: &FieldEntry) {
        let [instance] = instances else {
            tracing::debug!(
                target: targets::REFLECT,
                field = entry.field.name,
                "record arrays are built for a single instance only"
            );
            return;
        };
        let records = entry.records(&*instance.read());
        if records.is_empty() {
            tracing::debug!(target: targets::REFLECT, field = entry.field.name, "no records, skipped");
            return;
        }
        let container = interp.push_container(entry.field.name);
        for record in &records {
            self.interpret(interp, std::slice::from_ref(record));
        }
        attach_if_filled(interp, container);
    }
}

/// Pop `container` and attach it to the new top if anything was built into
/// it; destroy it otherwise. Returns whether it was attached.
fn attach_if_filled(interp: &mut Interpreter<'_>, container: ControlId) -> bool {
    let filled = !interp.canvas().children(container).is_empty();
    interp.pop(filled);
    if !filled {
        interp.canvas().destroy(container);
    }
    filled
}

/// Identity of an instance for cycle detection.
fn instance_key(instance: &Instance) -> usize {
    Arc::as_ptr(instance) as *const () as usize
}

/// The title shared by every instance, if they agree on one.
fn common_title(instances: &[Instance]) -> Option<String> {
    let mut titles = instances.iter().map(|instance| instance.read().title());
    let first = titles.next()??;
    titles.all(|title| title.as_deref() == Some(first.as_str())).then_some(first)
}

/// Remove the first label a class script produced and return its text.
fn take_script_label(interp: &mut Interpreter<'_>, controls: &[ControlId]) -> Option<String> {
    let canvas = interp.canvas();
    let label = controls
        .iter()
        .copied()
        .find(|&control| canvas.kind(control) == Some(KindTag::Label))?;
    let text = canvas.text(label).map(str::to_string);
    canvas.destroy(label);
    text.filter(|text| !text.is_empty())
}

/// Find or create the chain of sub-panels for a `UIGroup` path.
fn group_panel(
    interp: &mut Interpreter<'_>,
    root: ControlId,
    groups: &mut HashMap<String, ControlId>,
    path: &str,
    expanded: Option<&str>,
) -> ControlId {
    let expanded = expanded.and_then(bool::from_text);
    let canvas = interp.canvas();
    let mut parent = root;
    let mut key = String::new();
    for segment in path.split('/').map(str::trim).filter(|segment| !segment.is_empty()) {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(segment);
        parent = *groups.entry(key.clone()).or_insert_with(|| {
            let group = canvas.create(ControlKind::panel(segment), segment);
            if let Some(expanded) = expanded {
                canvas.set_default_expanded(group, expanded);
            }
            canvas.add_child(parent, group);
            group
        });
    }
    parent
}

/// Build a value field from its `UIScript`. `false` to fall back.
fn build_field_script(ctx: &mut FieldContext<'_, '_>, script: &str) -> bool {
    let Some(data) = ctx.text_binding() else {
        return false;
    };
    let binding = Binding::text(data);
    let Ok(controls) = ScriptEngine::build(ctx.interp, script, Some(&binding)) else {
        return false;
    };
    if ctx.is_read_only() {
        let canvas = ctx.interp.canvas();
        for control in controls {
            canvas.set_read_only(control, true);
        }
    }
    true
}
