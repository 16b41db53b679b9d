//! Semantic types shared by the catalog and the AQL compiler.

use serde::{Serialize, Serializer};
use std::fmt;

/// The five scalar kinds a path can yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Integer,
    Float,
    Boolean,
    Null,
}

impl PrimitiveType {
    /// Parse a primitive type name as written in AQL (`String`, `Integer`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(Self::String),
            "Integer" => Some(Self::Integer),
            "Float" => Some(Self::Float),
            "Boolean" => Some(Self::Boolean),
            "Null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::Null => "Null",
        }
    }

    /// Whether SUM/AVG/MIN/MAX accept this kind.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved semantic type: either a scalar or a structured RM class.
///
/// Two operands are compatible only when their `Type`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveType),
    /// A structured reference-model class, identified by its RM name.
    Class(String),
}

impl Type {
    pub fn string() -> Self {
        Self::Primitive(PrimitiveType::String)
    }

    pub fn integer() -> Self {
        Self::Primitive(PrimitiveType::Integer)
    }

    pub fn float() -> Self {
        Self::Primitive(PrimitiveType::Float)
    }

    pub fn boolean() -> Self {
        Self::Primitive(PrimitiveType::Boolean)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    /// Returns true for the five primitive kinds.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(p) => Some(*p),
            Self::Class(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<&str> {
        match self {
            Self::Class(name) => Some(name),
            Self::Primitive(_) => None,
        }
    }
}

impl From<PrimitiveType> for Type {
    fn from(p: PrimitiveType) -> Self {
        Self::Primitive(p)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Class(name) => f.write_str(name),
        }
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Declared shape of a class attribute.
///
/// Optional and list wrappers are transparent for type resolution; they only
/// document the document layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    Primitive(PrimitiveType),
    Class(String),
    Optional(Box<FieldShape>),
    List(Box<FieldShape>),
}

impl FieldShape {
    pub fn string() -> Self {
        Self::Primitive(PrimitiveType::String)
    }

    pub fn integer() -> Self {
        Self::Primitive(PrimitiveType::Integer)
    }

    pub fn float() -> Self {
        Self::Primitive(PrimitiveType::Float)
    }

    pub fn boolean() -> Self {
        Self::Primitive(PrimitiveType::Boolean)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    /// Wrap this shape as optional.
    pub fn optional(self) -> Self {
        Self::Optional(Box::new(self))
    }

    /// Wrap this shape as a collection.
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    /// Strip every optional/list wrapper and return the element type.
    pub fn element_type(&self) -> Type {
        match self {
            Self::Primitive(p) => Type::Primitive(*p),
            Self::Class(name) => Type::Class(name.clone()),
            Self::Optional(inner) | Self::List(inner) => inner.element_type(),
        }
    }
}
