//! Compilation errors and their stable codes.

use openehr_rm::RmError;
use thiserror::Error;

/// User-facing compilation errors.
///
/// Every variant maps to one stable machine-readable code (see
/// [`BuildError::code`]). Compilation is fail-fast: the first error aborts the
/// build and is returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Unknown path: {0}")]
    UnknownPath(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown active table: {0}")]
    UnknownActiveTable(String),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Unknown parameter: ${0}")]
    UnknownParameter(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Type mismatch: {left} is not compatible with {right}")]
    TypeMismatch { left: String, right: String },

    #[error("Type {0} cannot be queried in a FROM clause")]
    FromClauseTypeMismatch(String),

    #[error("Union column mismatch: {0}")]
    UnionColumnMismatch(String),

    #[error("Subquery column mismatch: {0}")]
    SubqueryColumnMismatch(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Query too complex: {0}")]
    QueryTooComplex(String),
}

impl BuildError {
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType(name.into())
    }

    pub fn unknown_path(path: impl Into<String>) -> Self {
        Self::UnknownPath(path.into())
    }

    pub fn unknown_table(name: impl Into<String>) -> Self {
        Self::UnknownTable(name.into())
    }

    pub fn unknown_active_table(name: impl Into<String>) -> Self {
        Self::UnknownActiveTable(name.into())
    }

    pub fn unknown_identifier(name: impl Into<String>) -> Self {
        Self::UnknownIdentifier(name.into())
    }

    pub fn unknown_parameter(name: impl Into<String>) -> Self {
        Self::UnknownParameter(name.into())
    }

    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::InvalidType(message.into())
    }

    /// Create a TypeMismatch error from the two offending types.
    pub fn type_mismatch(left: impl ToString, right: impl ToString) -> Self {
        Self::TypeMismatch {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    pub fn from_clause_type_mismatch(name: impl Into<String>) -> Self {
        Self::FromClauseTypeMismatch(name.into())
    }

    pub fn union_column_mismatch(message: impl Into<String>) -> Self {
        Self::UnionColumnMismatch(message.into())
    }

    pub fn subquery_column_mismatch(message: impl Into<String>) -> Self {
        Self::SubqueryColumnMismatch(message.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    pub fn query_too_complex(message: impl Into<String>) -> Self {
        Self::QueryTooComplex(message.into())
    }

    /// Stable code reported to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownType(_) => "UNKNOWN_TYPE",
            Self::UnknownPath(_) => "UNKNOWN_PATH",
            Self::UnknownTable(_) => "UNKNOWN_TABLE",
            Self::UnknownActiveTable(_) => "UNKNOWN_ACTIVE_TABLE",
            Self::UnknownIdentifier(_) => "UNKNOWN_IDENTIFIER",
            Self::UnknownParameter(_) => "UNKNOWN_PARAMETER",
            Self::InvalidType(_) => "INVALID_TYPE",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::FromClauseTypeMismatch(_) => "FROM_CLAUSE_TYPE_MISMATCH",
            Self::UnionColumnMismatch(_) => "UNION_COLUMN_MISMATCH",
            Self::SubqueryColumnMismatch(_) => "SUBQUERY_COLUMN_MISMATCH",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::QueryTooComplex(_) => "QUERY_TOO_COMPLEX",
        }
    }
}

impl From<RmError> for BuildError {
    fn from(err: RmError) -> Self {
        match err {
            RmError::UnknownType(name) => Self::UnknownType(name),
            RmError::UnknownField { type_name, field } => {
                Self::UnknownPath(format!("{type_name}/{field}"))
            }
        }
    }
}

/// Convenience result type for compilation
pub type Result<T> = std::result::Result<T, BuildError>;
