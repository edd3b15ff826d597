//! Integration tests for the #[derive(Reflect)] and #[derive(ReflectEnum)] macros.

use std::path::PathBuf;

use horizon_inspect_core::meta::FieldAccess;
use horizon_inspect_core::value::{ARRAY, PATH};
use horizon_inspect_core::{
    FieldFlags, FieldValue, MetaError, Reflect, Shared, TypeRegistry, ValueKind, as_instance,
    share,
};
use horizon_inspect_macros::{Reflect, ReflectEnum};

#[derive(Debug, Clone, Copy, PartialEq, Default, ReflectEnum)]
enum Shape {
    #[default]
    Point,
    Spot,
    #[reflect(name = "Area Light")]
    Area,
}

#[derive(Default, Reflect)]
#[reflect(ui_name = "Scene Node", title = "name")]
struct SceneNode {
    name: String,
    #[field(hide)]
    guid: u64,
}

#[derive(Default, Reflect)]
#[reflect(script = "UI[.[label{text=Light;}].]", property(Category = "Lighting"))]
struct LightSource {
    #[field(base)]
    node: SceneNode,
    #[field(default = "1.000000", group = "Emission/Color", group_expanded)]
    intensity: f32,
    shape: Shape,
    #[field(read_only)]
    revision: u32,
    #[field(file_path, filter = "*.ies", ui_name = "IES Profile")]
    profile: PathBuf,
    #[field(flags = 8)]
    cache: Vec<u32>,
    #[field(property(Help = "Light this one follows"), reference)]
    follow: Option<Shared<LightSource>>,
    #[field(records)]
    children: Vec<Shared<SceneNode>>,
    #[field(skip)]
    #[allow(dead_code)]
    scratch: usize,
}

#[test]
fn test_class_metadata() {
    let class = LightSource::META;
    assert_eq!(class.name, "LightSource");
    assert_eq!(class.ui_name, "Light Source");
    assert_eq!(class.property("UIScript"), Some("UI[.[label{text=Light;}].]"));
    assert_eq!(class.property("Category"), Some("Lighting"));
    assert_eq!(class.base.as_ref().map(|link| link.class.name), Some("SceneNode"));
    assert!(LightSource::META.is_a(SceneNode::META));
    assert!(!SceneNode::META.is_a(LightSource::META));

    let names: Vec<&str> = class.fields.iter().map(|field| field.name).collect();
    assert_eq!(
        names,
        vec!["intensity", "shape", "revision", "profile", "cache", "follow", "children"]
    );
    assert_eq!(SceneNode::META.ui_name, "Scene Node");
}

#[test]
fn test_field_metadata() {
    let class = LightSource::META;

    let intensity = class.find_field("intensity").unwrap().field;
    assert_eq!(intensity.ui_name, "Intensity");
    assert_eq!(intensity.default, Some("1.000000"));
    assert_eq!(intensity.property("UIGroup"), Some("Emission/Color"));
    assert_eq!(intensity.property("UIGroupExpanded"), Some("true"));
    assert_eq!(intensity.value_type.kind, ValueKind::Float);

    let profile = class.find_field("profile").unwrap().field;
    assert_eq!(profile.ui_name, "IES Profile");
    assert!(profile.flags.has(FieldFlags::FILE_PATH));
    assert_eq!(profile.property("FileFilter"), Some("*.ies"));
    assert!(std::ptr::eq(profile.value_type, &PATH));

    let cache = class.find_field("cache").unwrap().field;
    assert_eq!(cache.flags, FieldFlags::DISCARD);
    assert!(std::ptr::eq(cache.value_type, &ARRAY));

    let revision = class.find_field("revision").unwrap().field;
    assert!(revision.flags.has(FieldFlags::READ_ONLY));
    assert!(matches!(revision.access, FieldAccess::Value { set: None, .. }));

    let follow = class.find_field("follow").unwrap().field;
    assert!(follow.is_reference());
    assert_eq!(follow.property("Help"), Some("Light this one follows"));
    assert!(matches!(class.find_field("children").unwrap().field.access, FieldAccess::Records(_)));

    assert!(class.find_field("scratch").is_none());
    assert!(SceneNode::META.find_field("guid").unwrap().field.flags.has(FieldFlags::HIDE));
}

#[test]
fn test_enum_value_type() {
    let value_type = Shape::VALUE_TYPE;
    assert_eq!(value_type.name, "Shape");
    assert_eq!(value_type.kind, ValueKind::Enum);
    assert_eq!(value_type.variants, &["Point", "Spot", "Area Light"]);
    assert!(value_type.is_a("Enumeration"));

    assert_eq!(Shape::Area.to_text(), "Area Light");
    assert_eq!(Shape::from_text(" Spot "), Some(Shape::Spot));
    assert_eq!(Shape::from_text("Area"), None);
}

#[test]
fn test_text_access_through_metadata() {
    let light = share(LightSource::default());
    let instance = as_instance(light.clone());
    let class = LightSource::META;

    let shape = class.find_field("shape").unwrap();
    shape.set_text(&mut *instance.write(), "Area Light").unwrap();
    assert_eq!(light.read().shape, Shape::Area);
    assert_eq!(shape.get_text(&*instance.read()), Some("Area Light".to_string()));

    let err = shape.set_text(&mut *instance.write(), "Tube").unwrap_err();
    assert_eq!(
        err,
        MetaError::Parse {
            value_type: "Shape",
            text: "Tube".to_string()
        }
    );

    let revision = class.find_field("revision").unwrap();
    assert_eq!(
        revision.set_text(&mut *instance.write(), "3"),
        Err(MetaError::ReadOnlyField("revision"))
    );
}

#[test]
fn test_inherited_fields_and_title() {
    let light = share(LightSource::default());
    light.write().node.name = "Key".to_string();
    let instance = as_instance(light.clone());

    assert_eq!(light.read().node.title(), Some("Key".to_string()));
    assert_eq!(instance.read().title(), None);

    let entries = LightSource::META.all_fields();
    assert_eq!(entries[0].field.name, "name");
    assert_eq!(entries[0].owner.name, "SceneNode");

    entries[0].set_text(&mut *instance.write(), "Fill").unwrap();
    assert_eq!(light.read().node.name, "Fill");

    let own = LightSource::META.fields_until(Some(SceneNode::META));
    assert!(own.iter().all(|entry| entry.owner.name == "LightSource"));
}

#[test]
fn test_references_and_records() {
    let leader = share(LightSource::default());
    let light = share(LightSource {
        follow: Some(leader.clone()),
        children: vec![share(SceneNode::default()), share(SceneNode::default())],
        ..LightSource::default()
    });
    let instance = as_instance(light);

    let follow = LightSource::META.find_field("follow").unwrap();
    let target = follow.referenced(&*instance.read()).unwrap();
    assert_eq!(target.read().meta_class().name, "LightSource");

    let children = LightSource::META.find_field("children").unwrap();
    let records = children.records(&*instance.read());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].read().meta_class().name, "SceneNode");
}

#[test]
fn test_registry_creates_instances() {
    let mut registry = TypeRegistry::new();
    LightSource::register_type(&mut registry);
    assert_eq!(registry.len(), 2);
    assert!(registry.get("SceneNode").is_some());

    let created = registry.create("LightSource").unwrap();
    assert!(created.read().as_any().is::<LightSource>());
    assert!(matches!(registry.create("Camera"), Err(MetaError::UnknownClass(_))));
}
