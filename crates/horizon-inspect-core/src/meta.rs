//! Reflected type metadata.
//!
//! A reflected type exposes a static [`MetaClass`] listing its fields in
//! declaration order. Each [`MetaField`] carries the UI name, flag bits, a
//! [`ValueType`] descriptor, an optional default, arbitrary string
//! properties (`UIScript`, `UIGroup`, `FileFilter`, ...) and type-erased
//! accessors. The metadata is normally generated by `#[derive(Reflect)]`.
//!
//! Live objects are shared as [`Instance`]s (`Arc<RwLock<dyn Reflect>>`) so
//! that controls, bindings and undo commands can all refer to them.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{MetaError, MetaResult};
use crate::logging::targets;
use crate::value::ValueType;

/// Field flag bits.
///
/// These flags can be combined using bitwise OR operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldFlags(u32);

impl FieldFlags {
    /// No flags.
    pub const NONE: FieldFlags = FieldFlags(0);
    /// Never shown in generated UI.
    pub const HIDE: FieldFlags = FieldFlags(1 << 0);
    /// Shown but not editable.
    pub const READ_ONLY: FieldFlags = FieldFlags(1 << 1);
    /// Holds filesystem paths.
    pub const FILE_PATH: FieldFlags = FieldFlags(1 << 2);
    /// Not persisted; still inspectable.
    pub const DISCARD: FieldFlags = FieldFlags(1 << 3);
    /// Every bit set; the default include mask.
    pub const ALL: FieldFlags = FieldFlags(u32::MAX);

    /// Build flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if every bit of `flag` is set.
    pub const fn has(self, flag: FieldFlags) -> bool {
        (self.0 & flag.0) == flag.0
    }

    /// Check if any bit of `other` is set.
    pub const fn intersects(self, other: FieldFlags) -> bool {
        (self.0 & other.0) != 0
    }

    /// Whether no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of bits shared with `other`.
    pub const fn shared_bits(self, other: FieldFlags) -> u32 {
        (self.0 & other.0).count_ones()
    }
}

impl BitOr for FieldFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FieldFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FieldFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for FieldFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(FieldFlags, &str); 4] = [
            (FieldFlags::HIDE, "HIDE"),
            (FieldFlags::READ_ONLY, "READ_ONLY"),
            (FieldFlags::FILE_PATH, "FILE_PATH"),
            (FieldFlags::DISCARD, "DISCARD"),
        ];
        if self.is_empty() {
            return write!(f, "FieldFlags(NONE)");
        }
        let mut names: Vec<String> = NAMES
            .iter()
            .filter(|(flag, _)| self.has(*flag))
            .map(|(_, name)| name.to_string())
            .collect();
        let known = NAMES.iter().fold(0, |acc, (flag, _)| acc | flag.0);
        if self.0 & !known != 0 {
            names.push(format!("{:#x}", self.0 & !known));
        }
        write!(f, "FieldFlags({})", names.join(" | "))
    }
}

/// Trait implemented by every reflected type.
pub trait Reflect: Any + Send + Sync {
    /// The static metadata of the concrete type.
    fn meta_class(&self) -> &'static MetaClass;

    /// Display title of this instance, if it has one.
    fn title(&self) -> Option<String> {
        None
    }

    /// Get this as Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Get this as mutable Any for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A live reflected object shared between controls, bindings and undo.
pub type Instance = Arc<RwLock<dyn Reflect>>;

/// A shared reflected object of a known type.
pub type Shared<T> = Arc<RwLock<T>>;

/// Wrap a value for sharing.
pub fn share<T: Reflect>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Erase the concrete type of a shared object.
pub fn as_instance<T: Reflect>(shared: Shared<T>) -> Instance {
    shared
}

/// Type-erased getter generated for a value field.
pub type FieldGetter = fn(&dyn Reflect) -> Option<Box<dyn Any + Send>>;

/// Type-erased setter generated for a value field.
pub type FieldSetter = fn(&mut dyn Reflect, Box<dyn Any + Send>) -> MetaResult<()>;

/// How a field's storage is reached.
#[derive(Clone, Copy)]
pub enum FieldAccess {
    /// A plain value of a [`crate::FieldValue`] type.
    Value {
        /// Read a clone of the value.
        get: FieldGetter,
        /// Replace the value; `None` for read-only fields.
        set: Option<FieldSetter>,
        /// Render a value of this field's type as text.
        format: fn(&dyn Any) -> Option<String>,
        /// Parse text into a value of this field's type.
        parse: fn(&str) -> Option<Box<dyn Any + Send>>,
        /// Compare two values of this field's type.
        eq: fn(&dyn Any, &dyn Any) -> bool,
    },
    /// An optional reference to another reflected object.
    Reference(fn(&dyn Reflect) -> Option<Instance>),
    /// An array of nested reflected records.
    Records(fn(&dyn Reflect) -> Vec<Instance>),
}

/// Metadata for a single reflected field.
pub struct MetaField {
    /// The field's identifier.
    pub name: &'static str,
    /// Human-readable name shown in generated UI.
    pub ui_name: &'static str,
    /// Flag bits.
    pub flags: FieldFlags,
    /// The value type used for handler lookup.
    pub value_type: &'static ValueType,
    /// The Rust type name, for diagnostics.
    pub type_name: &'static str,
    /// `TypeId::of` the Rust type; the unit type for reference and record fields.
    pub type_id: fn() -> TypeId,
    /// Default value in text form.
    pub default: Option<&'static str>,
    /// String-keyed properties queried during UI synthesis.
    pub properties: &'static [(&'static str, &'static str)],
    /// Storage access.
    pub access: FieldAccess,
}

impl MetaField {
    /// Look up a string property.
    pub fn property(&self, key: &str) -> Option<&'static str> {
        lookup(self.properties, key)
    }

    /// Whether the field is a reference to another reflected object.
    pub fn is_reference(&self) -> bool {
        matches!(self.access, FieldAccess::Reference(_))
    }

    /// Read the field of `owner` as a type-erased value.
    pub fn get(&self, owner: &dyn Reflect) -> Option<Box<dyn Any + Send>> {
        match self.access {
            FieldAccess::Value { get, .. } => get(owner),
            _ => None,
        }
    }

    /// Replace the field of `owner` with a type-erased value.
    pub fn set(&self, owner: &mut dyn Reflect, value: Box<dyn Any + Send>) -> MetaResult<()> {
        match self.access {
            FieldAccess::Value { set: Some(set), .. } => set(owner, value),
            _ => Err(MetaError::ReadOnlyField(self.name)),
        }
    }

    /// Read the field of `owner` as text.
    pub fn get_text(&self, owner: &dyn Reflect) -> Option<String> {
        match self.access {
            FieldAccess::Value { get, format, .. } => get(owner).and_then(|v| format(v.as_ref())),
            _ => None,
        }
    }

    /// The declared default rendered the way the field renders its values,
    /// so `"1"` on an `f32` field reads `"1.000000"`. Falls back to the
    /// declared text when it does not parse.
    pub fn default_text(&self) -> Option<String> {
        let declared = self.default?;
        let FieldAccess::Value { parse, format, .. } = self.access else {
            return Some(declared.to_string());
        };
        parse(declared)
            .and_then(|value| format(value.as_ref()))
            .or_else(|| Some(declared.to_string()))
    }

    /// Whether the field of `owner` equals its declared default. `None` when
    /// the field has no usable default.
    pub fn holds_default(&self, owner: &dyn Reflect) -> Option<bool> {
        let FieldAccess::Value { get, parse, eq, .. } = self.access else {
            return None;
        };
        let default = parse(self.default?)?;
        let current = get(owner)?;
        Some(eq(current.as_ref(), default.as_ref()))
    }

    /// Parse `text` and store it in the field of `owner`.
    pub fn set_text(&self, owner: &mut dyn Reflect, text: &str) -> MetaResult<()> {
        let FieldAccess::Value { parse, .. } = self.access else {
            return Err(MetaError::ReadOnlyField(self.name));
        };
        let value = parse(text).ok_or_else(|| MetaError::Parse {
            value_type: self.value_type.name,
            text: text.to_string(),
        })?;
        self.set(owner, value)
    }

    /// Follow a reference field.
    pub fn referenced(&self, owner: &dyn Reflect) -> Option<Instance> {
        match self.access {
            FieldAccess::Reference(get) => get(owner),
            _ => None,
        }
    }

    /// Collect the records of an element-array field.
    pub fn records(&self, owner: &dyn Reflect) -> Vec<Instance> {
        match self.access {
            FieldAccess::Records(get) => get(owner),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for MetaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaField")
            .field("name", &self.name)
            .field("ui_name", &self.ui_name)
            .field("flags", &self.flags)
            .field("value_type", &self.value_type.name)
            .finish()
    }
}

/// Link from a derived class to the embedded base it extends.
pub struct BaseLink {
    /// The base class.
    pub class: &'static MetaClass,
    /// Project a derived instance onto its embedded base.
    pub project: fn(&dyn Reflect) -> Option<&dyn Reflect>,
    /// Project a derived instance onto its embedded base, mutably.
    pub project_mut: fn(&mut dyn Reflect) -> Option<&mut dyn Reflect>,
}

/// Static metadata describing a reflected type.
pub struct MetaClass {
    /// The type's identifier.
    pub name: &'static str,
    /// Human-readable name, used as a fallback panel label.
    pub ui_name: &'static str,
    /// `TypeId::of` the concrete type.
    pub type_id: fn() -> TypeId,
    /// The embedded base class, if any.
    pub base: Option<BaseLink>,
    /// Fields declared directly on this type, in declaration order.
    pub fields: &'static [MetaField],
    /// String-keyed class properties (`UIScript`, ...).
    pub properties: &'static [(&'static str, &'static str)],
    /// Factory for a default instance.
    pub create: Option<fn() -> Instance>,
}

impl MetaClass {
    /// Look up a string property.
    pub fn property(&self, key: &str) -> Option<&'static str> {
        lookup(self.properties, key)
    }

    /// This class followed by each base, most derived first.
    pub fn ancestry(&'static self) -> impl Iterator<Item = &'static MetaClass> {
        std::iter::successors(Some(self), |class| class.base.as_ref().map(|link| link.class))
    }

    /// Whether this class is `other` or extends it.
    pub fn is_a(&'static self, other: &MetaClass) -> bool {
        self.ancestry().any(|class| class.name == other.name)
    }

    /// Every field including inherited ones, base fields first.
    ///
    /// Fields declared on `stop` and its bases are left out.
    pub fn fields_until(&'static self, stop: Option<&MetaClass>) -> Vec<FieldEntry> {
        let chain: Vec<&'static MetaClass> = self
            .ancestry()
            .take_while(|class| stop.is_none_or(|stop| class.name != stop.name))
            .collect();

        let mut entries = Vec::new();
        // chain[i] is reached from the instance through the links of chain[0..i]
        for depth in (0..chain.len()).rev() {
            let path: Vec<&'static BaseLink> = chain[..depth]
                .iter()
                .filter_map(|class| class.base.as_ref())
                .collect();
            for field in chain[depth].fields {
                entries.push(FieldEntry {
                    field,
                    owner: chain[depth],
                    path: path.clone(),
                });
            }
        }
        entries
    }

    /// Every field including inherited ones, base fields first.
    pub fn all_fields(&'static self) -> Vec<FieldEntry> {
        self.fields_until(None)
    }

    /// Find a field by name, searching bases too.
    pub fn find_field(&'static self, name: &str) -> Option<FieldEntry> {
        self.all_fields().into_iter().find(|entry| entry.field.name == name)
    }
}

impl fmt::Debug for MetaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaClass")
            .field("name", &self.name)
            .field("ui_name", &self.ui_name)
            .field("base", &self.base.as_ref().map(|link| link.class.name))
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// A field together with the path from an instance to the struct declaring it.
#[derive(Clone)]
pub struct FieldEntry {
    /// The field metadata.
    pub field: &'static MetaField,
    /// The class that declares the field.
    pub owner: &'static MetaClass,
    path: Vec<&'static BaseLink>,
}

impl FieldEntry {
    /// An entry for a field declared directly on the instance's class.
    pub fn direct(owner: &'static MetaClass, field: &'static MetaField) -> Self {
        Self {
            field,
            owner,
            path: Vec::new(),
        }
    }

    /// Walk from `instance` to the struct that declares the field.
    pub fn resolve<'a>(&self, instance: &'a dyn Reflect) -> Option<&'a dyn Reflect> {
        self.path
            .iter()
            .try_fold(instance, |current, link| (link.project)(current))
    }

    /// Mutable counterpart of [`resolve`](Self::resolve).
    pub fn resolve_mut<'a>(&self, instance: &'a mut dyn Reflect) -> Option<&'a mut dyn Reflect> {
        self.path
            .iter()
            .try_fold(instance, |current, link| (link.project_mut)(current))
    }

    fn wrong_owner(&self) -> MetaError {
        MetaError::WrongOwner {
            class: self.owner.name,
            field: self.field.name,
        }
    }

    /// Read the field from `instance` as a type-erased value.
    pub fn get(&self, instance: &dyn Reflect) -> Option<Box<dyn Any + Send>> {
        self.resolve(instance).and_then(|owner| self.field.get(owner))
    }

    /// Write a type-erased value into the field of `instance`.
    pub fn set(&self, instance: &mut dyn Reflect, value: Box<dyn Any + Send>) -> MetaResult<()> {
        let err = self.wrong_owner();
        let owner = self.resolve_mut(instance).ok_or(err)?;
        self.field.set(owner, value)
    }

    /// Read the field from `instance` as text.
    pub fn get_text(&self, instance: &dyn Reflect) -> Option<String> {
        self.resolve(instance).and_then(|owner| self.field.get_text(owner))
    }

    /// Whether the field of `instance` equals its declared default.
    pub fn holds_default(&self, instance: &dyn Reflect) -> Option<bool> {
        self.resolve(instance).and_then(|owner| self.field.holds_default(owner))
    }

    /// Parse and write text into the field of `instance`.
    pub fn set_text(&self, instance: &mut dyn Reflect, text: &str) -> MetaResult<()> {
        let err = self.wrong_owner();
        let owner = self.resolve_mut(instance).ok_or(err)?;
        self.field.set_text(owner, text)
    }

    /// Follow a reference field of `instance`.
    pub fn referenced(&self, instance: &dyn Reflect) -> Option<Instance> {
        self.resolve(instance).and_then(|owner| self.field.referenced(owner))
    }

    /// Collect the records of an element-array field of `instance`.
    pub fn records(&self, instance: &dyn Reflect) -> Vec<Instance> {
        self.resolve(instance)
            .map(|owner| self.field.records(owner))
            .unwrap_or_default()
    }
}

impl fmt::Debug for FieldEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner.name, self.field.name)
    }
}

fn lookup(properties: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    properties
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, value)| *value)
}

/// Registry of reflected classes by name.
///
/// Owned by whoever needs name-based lookup (normally the inspector's
/// registry context); there is no global instance.
#[derive(Default)]
pub struct TypeRegistry {
    classes: HashMap<&'static str, &'static MetaClass>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class and, recursively, its bases.
    pub fn register(&mut self, class: &'static MetaClass) {
        for class in class.ancestry() {
            if self.classes.insert(class.name, class).is_none() {
                tracing::trace!(target: targets::META, class = class.name, "registered class");
            }
        }
    }

    /// Remove a class by name.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.classes.remove(name).is_some()
    }

    /// Look up a class by name.
    pub fn get(&self, name: &str) -> Option<&'static MetaClass> {
        self.classes.get(name).copied()
    }

    /// Create a default instance of a registered class.
    pub fn create(&self, name: &str) -> MetaResult<Instance> {
        let class = self
            .get(name)
            .ok_or_else(|| MetaError::UnknownClass(name.to_string()))?;
        match class.create {
            Some(create) => Ok(create()),
            None => {
                crate::inspect_warn!(class = name, "class has no factory");
                Err(MetaError::UnknownClass(name.to_string()))
            }
        }
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.classes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FieldValue, STRING, eq_erased, format_erased, parse_erased};

    struct Base {
        id: String,
    }

    struct Node {
        base: Base,
        label: String,
    }

    fn base_get_id(obj: &dyn Reflect) -> Option<Box<dyn Any + Send>> {
        obj.as_any()
            .downcast_ref::<Base>()
            .map(|b| Box::new(b.id.clone()) as Box<dyn Any + Send>)
    }

    fn base_set_id(obj: &mut dyn Reflect, value: Box<dyn Any + Send>) -> MetaResult<()> {
        let base = obj
            .as_any_mut()
            .downcast_mut::<Base>()
            .ok_or(MetaError::WrongOwner { class: "Base", field: "id" })?;
        let value = value.downcast::<String>().map_err(|_| MetaError::TypeMismatch {
            expected: "String",
            field: "id",
        })?;
        base.id = *value;
        Ok(())
    }

    fn node_get_label(obj: &dyn Reflect) -> Option<Box<dyn Any + Send>> {
        obj.as_any()
            .downcast_ref::<Node>()
            .map(|n| Box::new(n.label.clone()) as Box<dyn Any + Send>)
    }

    fn project(obj: &dyn Reflect) -> Option<&dyn Reflect> {
        obj.as_any().downcast_ref::<Node>().map(|n| &n.base as &dyn Reflect)
    }

    fn project_mut(obj: &mut dyn Reflect) -> Option<&mut dyn Reflect> {
        obj.as_any_mut()
            .downcast_mut::<Node>()
            .map(|n| &mut n.base as &mut dyn Reflect)
    }

    static BASE_FIELDS: [MetaField; 1] = [MetaField {
        name: "id",
        ui_name: "Id",
        flags: FieldFlags::NONE,
        value_type: &STRING,
        type_name: "String",
        type_id: TypeId::of::<String>,
        default: None,
        properties: &[],
        access: FieldAccess::Value {
            get: base_get_id,
            set: Some(base_set_id),
            format: format_erased::<String>,
            parse: parse_erased::<String>,
            eq: eq_erased::<String>,
        },
    }];

    static BASE_META: MetaClass = MetaClass {
        name: "Base",
        ui_name: "Base",
        type_id: TypeId::of::<Base>,
        base: None,
        fields: &BASE_FIELDS,
        properties: &[],
        create: None,
    };

    static NODE_FIELDS: [MetaField; 1] = [MetaField {
        name: "label",
        ui_name: "Label",
        flags: FieldFlags::READ_ONLY,
        value_type: <String as FieldValue>::VALUE_TYPE,
        type_name: "String",
        type_id: TypeId::of::<String>,
        default: Some("untitled"),
        properties: &[("UIGroup", "General")],
        access: FieldAccess::Value {
            get: node_get_label,
            set: None,
            format: format_erased::<String>,
            parse: parse_erased::<String>,
            eq: eq_erased::<String>,
        },
    }];

    static NODE_META: MetaClass = MetaClass {
        name: "Node",
        ui_name: "Scene Node",
        type_id: TypeId::of::<Node>,
        base: Some(BaseLink {
            class: &BASE_META,
            project,
            project_mut,
        }),
        fields: &NODE_FIELDS,
        properties: &[("UIScript", "UI[.[label{text=Node;}].]")],
        create: None,
    };

    impl Reflect for Base {
        fn meta_class(&self) -> &'static MetaClass {
            &BASE_META
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl Reflect for Node {
        fn meta_class(&self) -> &'static MetaClass {
            &NODE_META
        }
        fn title(&self) -> Option<String> {
            Some(self.label.clone())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn node() -> Node {
        Node {
            base: Base { id: "n1".into() },
            label: "first".into(),
        }
    }

    #[test]
    fn test_flags_ops() {
        let flags = FieldFlags::READ_ONLY | FieldFlags::FILE_PATH;
        assert!(flags.has(FieldFlags::READ_ONLY));
        assert!(!flags.has(FieldFlags::HIDE));
        assert!(flags.intersects(FieldFlags::FILE_PATH | FieldFlags::HIDE));
        assert_eq!(flags.shared_bits(FieldFlags::ALL), 2);
        assert_eq!(format!("{flags:?}"), "FieldFlags(READ_ONLY | FILE_PATH)");
        assert_eq!(format!("{:?}", FieldFlags::NONE), "FieldFlags(NONE)");
    }

    #[test]
    fn test_fields_base_first() {
        let names: Vec<&str> = NODE_META.all_fields().iter().map(|e| e.field.name).collect();
        assert_eq!(names, vec!["id", "label"]);

        let own: Vec<&str> = NODE_META
            .fields_until(Some(&BASE_META))
            .iter()
            .map(|e| e.field.name)
            .collect();
        assert_eq!(own, vec!["label"]);
    }

    #[test]
    fn test_inherited_field_access_goes_through_base() {
        let mut node = node();
        let id = NODE_META.find_field("id").unwrap();
        assert_eq!(id.get_text(&node), Some("n1".to_string()));

        id.set_text(&mut node, "n2").unwrap();
        assert_eq!(node.base.id, "n2");
    }

    #[test]
    fn test_read_only_field_rejects_set() {
        let mut node = node();
        let label = NODE_META.find_field("label").unwrap();
        assert_eq!(label.get_text(&node), Some("first".to_string()));
        assert_eq!(
            label.set_text(&mut node, "other"),
            Err(MetaError::ReadOnlyField("label"))
        );
        assert_eq!(label.field.default, Some("untitled"));
        assert_eq!(label.field.property("UIGroup"), Some("General"));
    }

    #[test]
    fn test_holds_default_compares_values() {
        let mut node = node();
        let label = NODE_META.find_field("label").unwrap();
        let id = NODE_META.find_field("id").unwrap();
        assert_eq!(label.holds_default(&node), Some(false));
        node.label = "untitled".into();
        assert_eq!(label.holds_default(&node), Some(true));
        assert_eq!(label.field.default_text().as_deref(), Some("untitled"));
        // No declared default.
        assert_eq!(id.holds_default(&node), None);
        assert_eq!(id.field.default_text(), None);
    }

    #[test]
    fn test_wrong_owner() {
        let mut base = Base { id: "x".into() };
        let id = NODE_META.find_field("id").unwrap();
        assert_eq!(id.get(&base).map(|_| ()), None);
        assert!(matches!(
            id.set_text(&mut base, "y"),
            Err(MetaError::WrongOwner { class: "Base", field: "id" })
        ));
    }

    #[test]
    fn test_registry_registers_bases() {
        let mut registry = TypeRegistry::new();
        registry.register(&NODE_META);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("Base").is_some());
        assert!(NODE_META.is_a(&BASE_META));
        assert!(matches!(registry.create("Node"), Err(MetaError::UnknownClass(_))));
        assert!(matches!(registry.create("Missing"), Err(MetaError::UnknownClass(_))));
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_instance_sharing() {
        let shared = share(node());
        let instance = as_instance(shared.clone());
        assert_eq!(instance.read().meta_class().name, "Node");
        assert_eq!(instance.read().title(), Some("first".to_string()));
        shared.write().label = "renamed".into();
        assert_eq!(instance.read().title(), Some("renamed".to_string()));
    }
}
