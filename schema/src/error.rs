//! Schema definition errors.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur when defining flags or schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A flag name was referenced that was never registered.
    #[error("unknown flag `{name}`")]
    UnknownFlag { name: String },

    /// Flag names must be non-empty and free of whitespace and braces.
    #[error("invalid flag name `{name}`")]
    InvalidFlagName { name: String },

    /// Every flag id is already taken.
    #[error("flag table full: at most {max} flags")]
    FlagTableFull { max: usize },

    /// Two fields of one target share a name.
    #[error("duplicate field `{field}` in target `{target}`")]
    DuplicateField { target: String, field: String },

    /// Two targets share a name.
    #[error("duplicate target `{name}`")]
    DuplicateTarget { name: String },
}
