//! Value-type descriptors and text conversion.
//!
//! Every reflected field names a [`ValueType`]. Value types form a
//! single-inheritance hierarchy (`u8` → `Integer` → `Value`) which field
//! interpreter lookup walks upward until it finds a registered handler.
//!
//! [`FieldValue`] ties a concrete Rust type to its descriptor and to the
//! text form used by text controls.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Text shown when bound instances disagree.
pub const MULTI_VALUE: &str = "Multi";

/// Text shown when nothing is bound.
pub const UNDEF_VALUE: &str = "Undef";

/// Separator between the items of a container value in text form.
pub const ITEM_DELIMITER: char = '|';

/// The primitive category of a value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Abstract root or an opaque value.
    Other,
    /// `true`/`false`.
    Bool,
    /// Any integer width.
    Integer,
    /// Any floating-point width.
    Float,
    /// Strings and paths.
    Text,
    /// One of a fixed set of named variants.
    Enum,
    /// A multi-element container.
    Container,
    /// A reference to another reflected object.
    Reference,
}

/// Describes one value type and its place in the hierarchy.
pub struct ValueType {
    /// Unique name used as the factory registration key.
    pub name: &'static str,
    /// The more general type this one refines.
    pub base: Option<&'static ValueType>,
    /// The primitive kind.
    pub kind: ValueKind,
    /// Variant names for enumerations, empty otherwise.
    pub variants: &'static [&'static str],
}

impl ValueType {
    /// Describe a root type.
    pub const fn root(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            base: None,
            kind,
            variants: &[],
        }
    }

    /// Describe a type refining `base`.
    pub const fn derived(name: &'static str, base: &'static ValueType, kind: ValueKind) -> Self {
        Self {
            name,
            base: Some(base),
            kind,
            variants: &[],
        }
    }

    /// Describe an enumeration with the given variant names.
    pub const fn enumeration(name: &'static str, variants: &'static [&'static str]) -> Self {
        Self {
            name,
            base: Some(&ENUMERATION),
            kind: ValueKind::Enum,
            variants,
        }
    }

    /// This type followed by each of its bases, most specific first.
    pub fn ancestry(&'static self) -> impl Iterator<Item = &'static ValueType> {
        std::iter::successors(Some(self), |ty| ty.base)
    }

    /// Whether this type is `name` or refines it.
    pub fn is_a(&'static self, name: &str) -> bool {
        self.ancestry().any(|ty| ty.name == name)
    }

    /// Whether values of this type hold multiple elements.
    pub fn is_container(&self) -> bool {
        self.kind == ValueKind::Container
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueType")
            .field("name", &self.name)
            .field("base", &self.base.map(|b| b.name))
            .field("kind", &self.kind)
            .finish()
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ValueType {}

/// Root of every value type.
pub static VALUE: ValueType = ValueType::root("Value", ValueKind::Other);
/// Booleans.
pub static BOOL: ValueType = ValueType::derived("bool", &VALUE, ValueKind::Bool);
/// Abstract integers.
pub static INTEGER: ValueType = ValueType::derived("Integer", &VALUE, ValueKind::Integer);
/// Abstract floating-point numbers.
pub static FLOAT: ValueType = ValueType::derived("Float", &VALUE, ValueKind::Float);
/// Abstract text.
pub static TEXT: ValueType = ValueType::derived("Text", &VALUE, ValueKind::Text);
/// Owned strings.
pub static STRING: ValueType = ValueType::derived("String", &TEXT, ValueKind::Text);
/// Filesystem paths.
pub static PATH: ValueType = ValueType::derived("Path", &TEXT, ValueKind::Text);
/// Abstract enumerations.
pub static ENUMERATION: ValueType = ValueType::derived("Enumeration", &VALUE, ValueKind::Enum);
/// Abstract multi-element containers.
pub static CONTAINER: ValueType = ValueType::derived("Container", &VALUE, ValueKind::Container);
/// Ordered sequences.
pub static ARRAY: ValueType = ValueType::derived("Array", &CONTAINER, ValueKind::Container);
/// Ordered sets.
pub static SET: ValueType = ValueType::derived("Set", &CONTAINER, ValueKind::Container);
/// Arrays of nested reflected records.
pub static ELEMENT_ARRAY: ValueType =
    ValueType::derived("ElementArray", &CONTAINER, ValueKind::Container);
/// References to another reflected object.
pub static REFERENCE: ValueType = ValueType::derived("Reference", &VALUE, ValueKind::Reference);

macro_rules! integer_types {
    ($($ty:ty => $stat:ident),* $(,)?) => {
        $(
            #[doc = concat!("`", stringify!($ty), "` values.")]
            pub static $stat: ValueType =
                ValueType::derived(stringify!($ty), &INTEGER, ValueKind::Integer);
        )*
    };
}

integer_types! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => USIZE,
}

/// `f32` values.
pub static F32: ValueType = ValueType::derived("f32", &FLOAT, ValueKind::Float);
/// `f64` values.
pub static F64: ValueType = ValueType::derived("f64", &FLOAT, ValueKind::Float);

/// A type that can be stored in a reflected field and edited as text.
pub trait FieldValue: Any + Clone + PartialEq + Send + Sync {
    /// The descriptor for this type.
    const VALUE_TYPE: &'static ValueType;

    /// Render the value for a text control.
    fn to_text(&self) -> String;

    /// Parse text produced by a text control.
    fn from_text(text: &str) -> Option<Self>;
}

/// Render a type-erased value of type `T` as text.
pub fn format_erased<T: FieldValue>(value: &dyn Any) -> Option<String> {
    value.downcast_ref::<T>().map(T::to_text)
}

/// Parse text into a type-erased value of type `T`.
pub fn parse_erased<T: FieldValue>(text: &str) -> Option<Box<dyn Any + Send>> {
    T::from_text(text).map(|value| Box::new(value) as Box<dyn Any + Send>)
}

/// Compare two type-erased values of type `T`.
pub fn eq_erased<T: FieldValue>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl FieldValue for bool {
    const VALUE_TYPE: &'static ValueType = &BOOL;

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: &str) -> Option<Self> {
        match text.trim() {
            t if t.eq_ignore_ascii_case("true") || t == "1" => Some(true),
            t if t.eq_ignore_ascii_case("false") || t == "0" => Some(false),
            _ => None,
        }
    }
}

macro_rules! impl_integer_value {
    ($($ty:ty => $stat:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const VALUE_TYPE: &'static ValueType = &$stat;

                fn to_text(&self) -> String {
                    self.to_string()
                }

                fn from_text(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }
        )*
    };
}

impl_integer_value! {
    i16 => I16, i32 => I32, i64 => I64,
    u16 => U16, u32 => U32, u64 => U64, usize => USIZE,
}

// 8-bit integers go through their 16-bit counterparts so text is never
// read as a character code; out-of-range input wraps.
impl FieldValue for i8 {
    const VALUE_TYPE: &'static ValueType = &I8;

    fn to_text(&self) -> String {
        i16::from(*self).to_string()
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse::<i16>().ok().map(|wide| wide as i8)
    }
}

impl FieldValue for u8 {
    const VALUE_TYPE: &'static ValueType = &U8;

    fn to_text(&self) -> String {
        u16::from(*self).to_string()
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse::<u16>().ok().map(|wide| wide as u8)
    }
}

impl FieldValue for f32 {
    const VALUE_TYPE: &'static ValueType = &F32;

    fn to_text(&self) -> String {
        format!("{self:.6}")
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl FieldValue for f64 {
    const VALUE_TYPE: &'static ValueType = &F64;

    fn to_text(&self) -> String {
        format!("{self:.6}")
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl FieldValue for String {
    const VALUE_TYPE: &'static ValueType = &STRING;

    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

impl FieldValue for PathBuf {
    const VALUE_TYPE: &'static ValueType = &PATH;

    fn to_text(&self) -> String {
        self.to_string_lossy().into_owned()
    }

    fn from_text(text: &str) -> Option<Self> {
        Some(PathBuf::from(text))
    }
}

/// Split delimited container text into item texts. Empty text has no items.
pub fn split_items(text: &str) -> impl Iterator<Item = &str> {
    text.split(ITEM_DELIMITER).filter(|item| !item.is_empty())
}

/// Join item texts with the container delimiter.
pub fn join_items<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            text.push(ITEM_DELIMITER);
        }
        text.push_str(item.as_ref());
    }
    text
}

impl<T: FieldValue> FieldValue for Vec<T> {
    const VALUE_TYPE: &'static ValueType = &ARRAY;

    fn to_text(&self) -> String {
        join_items(self.iter().map(T::to_text))
    }

    fn from_text(text: &str) -> Option<Self> {
        split_items(text).map(T::from_text).collect()
    }
}

impl<T: FieldValue + Ord> FieldValue for BTreeSet<T> {
    const VALUE_TYPE: &'static ValueType = &SET;

    fn to_text(&self) -> String {
        join_items(self.iter().map(T::to_text))
    }

    fn from_text(text: &str) -> Option<Self> {
        split_items(text).map(T::from_text).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_text_has_six_decimals() {
        assert_eq!(1.5f32.to_text(), "1.500000");
        assert_eq!(0.1f64.to_text(), "0.100000");
        assert_eq!(f32::from_text(" 2.25 "), Some(2.25));
    }

    #[test]
    fn test_byte_integers_are_numeric_text() {
        assert_eq!(65u8.to_text(), "65");
        assert_eq!(u8::from_text("65"), Some(65));
        assert_eq!(i8::from_text("-12"), Some(-12));
        assert_eq!(u8::from_text("A"), None);
        // Parsed through u16 and truncated.
        assert_eq!(u8::from_text("300"), Some(44));
    }

    #[test]
    fn test_bool_text() {
        assert_eq!(true.to_text(), "true");
        assert_eq!(bool::from_text("TRUE"), Some(true));
        assert_eq!(bool::from_text("0"), Some(false));
        assert_eq!(bool::from_text("maybe"), None);
    }

    #[test]
    fn test_container_text() {
        let values = vec![1u32, 2, 3];
        assert_eq!(values.to_text(), "1|2|3");
        assert_eq!(Vec::<u32>::from_text("4|5"), Some(vec![4, 5]));
        assert_eq!(Vec::<u32>::from_text(""), Some(Vec::new()));
        assert_eq!(Vec::<u32>::from_text("4|x"), None);

        let set: BTreeSet<String> = ["b".to_string(), "a".to_string()].into();
        assert_eq!(set.to_text(), "a|b");
    }

    #[test]
    fn test_ancestry_walks_to_root() {
        let names: Vec<&str> = U8.ancestry().map(|ty| ty.name).collect();
        assert_eq!(names, vec!["u8", "Integer", "Value"]);
        assert!(ARRAY.is_a("Container"));
        assert!(ARRAY.is_container());
        assert!(!STRING.is_a("Integer"));
    }

    #[test]
    fn test_erased_helpers() {
        let value: Box<dyn Any> = Box::new(3.0f32);
        assert_eq!(format_erased::<f32>(value.as_ref()), Some("3.000000".to_string()));
        assert_eq!(format_erased::<u32>(value.as_ref()), None);

        let parsed = parse_erased::<u32>("17");
        assert!(parsed.is_some_and(|v| v.downcast_ref::<u32>() == Some(&17)));
        assert!(eq_erased::<u32>(&5u32, &5u32));
        assert!(!eq_erased::<u32>(&5u32, &5i32));
    }
}
