//! Error types for the inspector.

use std::path::PathBuf;

use horizon_inspect_core::MetaError;

/// Result type alias for inspector operations.
pub type Result<T> = std::result::Result<T, InspectError>;

/// Structural failures of an attribute script.
///
/// None of these abort a build: the caller logs the error and falls back to
/// automatic field interpretation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// The source holds no `UI[.[` ... `].]` fragment.
    #[error("script is not enclosed in 'UI[.[' ... '].]'")]
    MissingDelimiters,

    /// The fragment holds no statement.
    #[error("script contains no statement")]
    Empty,

    /// A statement has no keyword before its body.
    #[error("expected a control keyword at offset {offset}")]
    EmptySymbol { offset: usize },

    /// The keyword names no registered control kind.
    #[error("unknown control keyword '{0}'")]
    UnknownKeyword(String),

    /// The keyword is not followed by `{`.
    #[error("expected '{{' after '{symbol}'")]
    MissingOpenBrace { symbol: String },

    /// The body is not closed by `}`.
    #[error("missing '}}' closing '{symbol}'")]
    MissingCloseBrace { symbol: String },

    /// A clause has no `=` or an empty key.
    #[error("malformed clause '{clause}' in '{symbol}'")]
    MalformedClause { symbol: String, clause: String },
}

/// Errors surfaced by the inspector's fallible entry points.
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    /// File I/O error.
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed persisted panel states.
    #[error("Invalid panel state JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed configuration file.
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration could not be rendered.
    #[error("Failed to serialize configuration: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Attribute script failure.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Reflection metadata failure.
    #[error(transparent)]
    Meta(#[from] MetaError),
}

impl InspectError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
