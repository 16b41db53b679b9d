use thiserror::Error;

/// Errors raised while resolving names against the reference model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RmError {
    #[error("Unknown reference model type: {0}")]
    UnknownType(String),

    #[error("Type {type_name} has no attribute '{field}'")]
    UnknownField { type_name: String, field: String },
}

impl RmError {
    /// Create a new UnknownType error
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType(name.into())
    }

    /// Create a new UnknownField error
    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }
}

/// Convenience result type for catalog lookups
pub type Result<T> = std::result::Result<T, RmError>;
