//! List editors for container fields.

use std::path::Path;
use std::sync::Arc;

use horizon_inspect_core::logging::targets;
use horizon_inspect_core::{ITEM_DELIMITER, MULTI_VALUE};

use crate::canvas::Canvas;
use crate::control::{Binding, ButtonAction, ControlId, ControlKind, ListState};
use crate::reflect::factory::{FieldContext, FieldInterpreter};

/// File name patterns of the form `*.ext;*.ext2`.
///
/// An empty filter, `*` or `*.*` accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Lowercase extensions without the dot.
    extensions: Vec<String>,
}

impl FileFilter {
    pub fn parse(text: &str) -> Self {
        let mut extensions = Vec::new();
        for pattern in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            if pattern == "*" || pattern == "*.*" {
                return Self::default();
            }
            match pattern.strip_prefix("*.") {
                Some(extension) => extensions.push(extension.to_ascii_lowercase()),
                None => {
                    tracing::warn!(target: targets::REFLECT, pattern, "unsupported file filter pattern");
                }
            }
        }
        Self { extensions }
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        Path::new(path)
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                let extension = extension.to_ascii_lowercase();
                self.extensions.iter().any(|accepted| *accepted == extension)
            })
    }
}

/// Edits array and set fields as a list with an entry box and
/// Add/Remove/Up/Down buttons.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerInterpreter;

impl FieldInterpreter for ContainerInterpreter {
    fn name(&self) -> &'static str {
        "container"
    }

    fn interpret(&self, ctx: &mut FieldContext<'_, '_>) -> bool {
        build_list_editor(ctx, None)
    }
}

/// Like [`ContainerInterpreter`], for lists of file paths. Paths not
/// matching the field's `FileFilter` property are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileContainerInterpreter;

impl FieldInterpreter for FileContainerInterpreter {
    fn name(&self) -> &'static str {
        "file container"
    }

    fn interpret(&self, ctx: &mut FieldContext<'_, '_>) -> bool {
        let filter = FileFilter::parse(ctx.field().property("FileFilter").unwrap_or_default());
        build_list_editor(ctx, Some(filter))
    }
}

fn build_list_editor(ctx: &mut FieldContext<'_, '_>, filter: Option<FileFilter>) -> bool {
    let Some(data) = ctx.text_binding() else {
        return false;
    };
    let field = ctx.field();
    let unique = field.value_type.is_a("Set");
    let read_only = ctx.is_read_only();

    let interp = &mut *ctx.interp;
    interp.push_container("row");
    interp.add_label(field.ui_name);

    let state = ListState {
        delimiter: Some(ITEM_DELIMITER),
        sorted: unique,
        ..ListState::default()
    };
    let list = interp.canvas().create(ControlKind::List(state), field.name);
    interp.canvas().bind(list, Binding::text(data));
    interp.add(list);
    let entry = interp.add_value(format!("{}_entry", field.name), None);

    let add: ButtonAction = Arc::new(move |canvas: &mut Canvas, _: ControlId| {
        add_entry(canvas, list, entry, unique, filter.as_ref());
    });
    let remove: ButtonAction = Arc::new(move |canvas: &mut Canvas, _: ControlId| {
        remove_selected(canvas, list);
    });
    let up: ButtonAction = Arc::new(move |canvas: &mut Canvas, _: ControlId| {
        canvas.move_selected(list, true);
    });
    let down: ButtonAction = Arc::new(move |canvas: &mut Canvas, _: ControlId| {
        canvas.move_selected(list, false);
    });
    let mut buttons = vec![
        interp.add_button("Add", Some(add)),
        interp.add_button("Remove", Some(remove)),
    ];
    if !unique {
        buttons.push(interp.add_button("Up", Some(up)));
        buttons.push(interp.add_button("Down", Some(down)));
    }
    interp.pop(true);

    ctx.decorate(list);
    if read_only {
        let canvas = ctx.interp.canvas();
        canvas.set_read_only(entry, true);
        for button in buttons {
            canvas.set_enabled(button, false);
        }
    }
    true
}

fn add_entry(canvas: &mut Canvas, list: ControlId, entry: ControlId, unique: bool, filter: Option<&FileFilter>) -> bool {
    let text = canvas.text(entry).unwrap_or_default().trim().to_string();
    if text.is_empty() || canvas.text(list) == Some(MULTI_VALUE) {
        return false;
    }
    if text.contains(ITEM_DELIMITER) {
        tracing::warn!(target: targets::REFLECT, item = %text, "list item contains the item delimiter");
        return false;
    }
    if let Some(filter) = filter
        && !filter.matches(&text)
    {
        tracing::warn!(target: targets::REFLECT, path = %text, "path rejected by file filter");
        return false;
    }

    let mut items = canvas.list_items(list);
    if unique && items.contains(&text) {
        return false;
    }
    items.push(text);
    canvas.set_list_items(list, items);
    if !canvas.write(list) {
        return false;
    }
    canvas.set_visual_text(entry, "");
    true
}

fn remove_selected(canvas: &mut Canvas, list: ControlId) -> bool {
    let mut items = canvas.list_items(list);
    let Some(index) = canvas.selection(list).filter(|&index| index < items.len()) else {
        return false;
    };
    items.remove(index);
    let remaining = items.len();
    canvas.set_list_items(list, items);
    canvas.select(list, index.checked_sub(usize::from(index == remaining)));
    canvas.write(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use crate::interpreter::Interpreter;
    use crate::registry::InspectRegistry;
    use horizon_inspect_core::{Instance, Reflect, as_instance, share};
    use horizon_inspect_macros::Reflect;

    #[derive(Default, Reflect)]
    struct Material {
        passes: Vec<String>,
        tags: BTreeSet<String>,
        #[field(file_path, filter = "*.png;*.JPG")]
        textures: Vec<PathBuf>,
    }

    fn build(field: &str, material: Material, interpreter: &dyn FieldInterpreter) -> (Canvas, Instance) {
        let registry = InspectRegistry::new();
        let (mut canvas, _log) = Canvas::headless();
        let instance = as_instance(share(material));
        let entry = Material::META.find_field(field).unwrap();
        {
            let mut interp = Interpreter::new(&mut canvas, &registry);
            let instances = [instance.clone()];
            let mut ctx = FieldContext {
                interp: &mut interp,
                instances: &instances,
                entry: &entry,
            };
            assert!(interpreter.interpret(&mut ctx));
        }
        canvas.realize(canvas.root());
        (canvas, instance)
    }

    fn material(instance: &Instance) -> parking_lot::MappedRwLockReadGuard<'_, Material> {
        parking_lot::RwLockReadGuard::map(instance.read(), |object| {
            object.as_any().downcast_ref::<Material>().unwrap()
        })
    }

    #[test]
    fn test_file_filter() {
        let filter = FileFilter::parse("*.png; *.JPG");
        assert!(filter.matches("a/b.png"));
        assert!(filter.matches("photo.jpg"));
        assert!(!filter.matches("notes.txt"));
        assert!(!filter.matches("png"));
        assert!(FileFilter::parse("").matches("anything"));
        assert!(FileFilter::parse("*.*").matches("anything"));
    }

    #[test]
    fn test_add_remove_and_reorder() {
        let material_value = Material {
            passes: vec!["depth".into(), "color".into()],
            ..Material::default()
        };
        let (mut canvas, instance) = build("passes", material_value, &ContainerInterpreter);
        let root = canvas.root();
        let list = canvas.find_child(root, "passes").unwrap();
        assert_eq!(canvas.list_items(list), vec!["depth", "color"]);

        let entry = canvas.find_child(root, "passes_entry").unwrap();
        canvas.set_visual_text(entry, "shadow");
        assert!(canvas.click(canvas.find_child(root, "Add").unwrap()));
        assert_eq!(material(&instance).passes, vec!["depth", "color", "shadow"]);
        assert_eq!(canvas.text(entry), Some(""));

        canvas.select(list, Some(2));
        canvas.click(canvas.find_child(root, "Up").unwrap());
        assert_eq!(material(&instance).passes, vec!["depth", "shadow", "color"]);

        canvas.select(list, Some(0));
        canvas.click(canvas.find_child(root, "Remove").unwrap());
        assert_eq!(material(&instance).passes, vec!["shadow", "color"]);
        assert_eq!(canvas.selection(list), Some(0));
    }

    #[test]
    fn test_set_refuses_duplicates() {
        let (mut canvas, instance) = build("tags", Material::default(), &ContainerInterpreter);
        let root = canvas.root();
        let entry = canvas.find_child(root, "tags_entry").unwrap();
        let add = canvas.find_child(root, "Add").unwrap();
        assert!(canvas.find_child(root, "Up").is_none());

        for tag in ["metal", "rough", "metal"] {
            canvas.set_visual_text(entry, tag);
            canvas.click(add);
        }
        let tags: Vec<String> = material(&instance).tags.iter().cloned().collect();
        assert_eq!(tags, vec!["metal", "rough"]);
    }

    #[test]
    fn test_file_paths_are_filtered() {
        let (mut canvas, instance) = build("textures", Material::default(), &FileContainerInterpreter);
        let root = canvas.root();
        let entry = canvas.find_child(root, "textures_entry").unwrap();
        let add = canvas.find_child(root, "Add").unwrap();

        canvas.set_visual_text(entry, "readme.txt");
        canvas.click(add);
        assert!(material(&instance).textures.is_empty());
        assert_eq!(canvas.text(entry), Some("readme.txt"));

        canvas.set_visual_text(entry, "albedo.png");
        canvas.click(add);
        assert_eq!(material(&instance).textures, vec![PathBuf::from("albedo.png")]);
    }
}
