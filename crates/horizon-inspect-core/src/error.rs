//! Error types for Horizon Inspect core.

use std::fmt;

/// Errors raised while accessing reflected metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    /// The value passed to a field setter has the wrong type.
    TypeMismatch {
        /// The field's declared type name.
        expected: &'static str,
        /// The name of the field being written.
        field: &'static str,
    },
    /// The field has no setter.
    ReadOnlyField(&'static str),
    /// The instance is not of the class that declares the field.
    WrongOwner {
        /// The class that declares the field.
        class: &'static str,
        /// The name of the field being accessed.
        field: &'static str,
    },
    /// No class with this name is registered.
    UnknownClass(String),
    /// Text could not be converted to the field's value type.
    Parse {
        /// The value type name.
        value_type: &'static str,
        /// The rejected text.
        text: String,
    },
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, field } => {
                write!(f, "Type mismatch writing field '{field}': expected {expected}")
            }
            Self::ReadOnlyField(field) => write!(f, "Field '{field}' is read-only"),
            Self::WrongOwner { class, field } => {
                write!(f, "Field '{field}' belongs to class {class}, not to this instance")
            }
            Self::UnknownClass(name) => write!(f, "No reflected class named '{name}'"),
            Self::Parse { value_type, text } => {
                write!(f, "Cannot convert '{text}' to {value_type}")
            }
        }
    }
}

impl std::error::Error for MetaError {}

/// Result type for metadata operations.
pub type MetaResult<T> = std::result::Result<T, MetaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = MetaError::TypeMismatch {
            expected: "f32",
            field: "scale",
        };
        assert_eq!(err.to_string(), "Type mismatch writing field 'scale': expected f32");

        let err = MetaError::Parse {
            value_type: "u8",
            text: "abc".into(),
        };
        assert_eq!(err.to_string(), "Cannot convert 'abc' to u8");
    }
}
