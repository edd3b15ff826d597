//! Generic value fields.

use horizon_inspect_core::ValueKind;

use crate::control::{Binding, ControlKind};
use crate::reflect::factory::{FieldContext, FieldInterpreter};

/// Builds a label and one editor for a plain value field.
///
/// Booleans get a check box, enumerations a drop-down choice over their
/// variants, everything else a text box.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueInterpreter;

impl FieldInterpreter for ValueInterpreter {
    fn name(&self) -> &'static str {
        "value"
    }

    fn interpret(&self, ctx: &mut FieldContext<'_, '_>) -> bool {
        let Some(data) = ctx.text_binding() else {
            return false;
        };
        let field = ctx.field();
        let value_type = field.value_type;
        let kind = match value_type.kind {
            ValueKind::Bool => ControlKind::CheckBox,
            ValueKind::Enum => ControlKind::choice(),
            _ => ControlKind::Value,
        };

        let interp = &mut *ctx.interp;
        interp.push_container("row");
        interp.add_label(field.ui_name);
        let editor = interp.canvas().create(kind, field.name);
        if value_type.kind == ValueKind::Enum {
            let canvas = interp.canvas();
            canvas.process(editor, "dropdown", "true");
            for variant in value_type.variants {
                canvas.add_choice_item(editor, *variant, *variant);
            }
        }
        interp.canvas().bind(editor, Binding::text(data));
        interp.add(editor);
        interp.pop(true);

        ctx.decorate(editor);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::control::KindTag;
    use crate::interpreter::Interpreter;
    use crate::registry::InspectRegistry;
    use horizon_inspect_core::{FieldFlags, Instance, MetaClass, Reflect, as_instance, share};
    use horizon_inspect_macros::{Reflect, ReflectEnum};

    #[derive(Debug, Clone, Copy, PartialEq, Default, ReflectEnum)]
    enum Falloff {
        #[default]
        Linear,
        Quadratic,
    }

    #[derive(Default, Reflect)]
    struct Lamp {
        #[field(default = "1.000000")]
        intensity: f32,
        on: bool,
        falloff: Falloff,
        #[field(read_only)]
        serial: u32,
    }

    fn build(field: &str, lamps: Vec<Lamp>) -> (Canvas, Vec<Instance>) {
        let registry = InspectRegistry::new();
        let (mut canvas, _log) = Canvas::headless();
        let instances: Vec<Instance> = lamps.into_iter().map(|lamp| as_instance(share(lamp))).collect();
        let class: &'static MetaClass = Lamp::META;
        let entry = class.find_field(field).unwrap();
        {
            let mut interp = Interpreter::new(&mut canvas, &registry);
            let mut ctx = FieldContext {
                interp: &mut interp,
                instances: &instances,
                entry: &entry,
            };
            assert!(ValueInterpreter.interpret(&mut ctx));
        }
        canvas.realize(canvas.root());
        (canvas, instances)
    }

    #[test]
    fn test_float_gets_text_box_with_default() {
        let (canvas, _instances) = build("intensity", vec![Lamp::default()]);
        let editor = canvas.find_child(canvas.root(), "intensity").unwrap();
        assert_eq!(canvas.kind(editor), Some(KindTag::Value));
        assert_eq!(canvas.text(editor), Some("0.000000"));
        assert_eq!(canvas.node(editor).unwrap().default_value(), Some("1.000000"));
    }

    #[test]
    fn test_bool_gets_check_box() {
        let lamps = vec![
            Lamp {
                on: true,
                ..Lamp::default()
            },
            Lamp::default(),
        ];
        let (canvas, _instances) = build("on", lamps);
        let editor = canvas.find_child(canvas.root(), "on").unwrap();
        assert_eq!(canvas.kind(editor), Some(KindTag::CheckBox));
        assert_eq!(canvas.text(editor), Some("Multi"));
    }

    #[test]
    fn test_enum_gets_choice() {
        let (mut canvas, instances) = build("falloff", vec![Lamp::default()]);
        let editor = canvas.find_child(canvas.root(), "falloff").unwrap();
        assert_eq!(canvas.kind(editor), Some(KindTag::Choice));
        assert_eq!(canvas.selection(editor), Some(0));

        assert!(canvas.choose(editor, 1));
        let guard = instances[0].read();
        let lamp = guard.as_any().downcast_ref::<Lamp>().unwrap();
        assert_eq!(lamp.falloff, Falloff::Quadratic);
    }

    #[test]
    fn test_read_only_field() {
        let (mut canvas, instances) = build("serial", vec![Lamp::default()]);
        let editor = canvas.find_child(canvas.root(), "serial").unwrap();
        assert!(canvas.node(editor).unwrap().attributes().read_only);
        assert!(!canvas.edit(editor, "7"));
        assert_eq!(instances[0].read().meta_class().name, "Lamp");
        assert!(Lamp::META.find_field("serial").unwrap().field.flags.has(FieldFlags::READ_ONLY));
    }
}
