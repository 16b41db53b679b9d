//! Reference-model type catalog.
//!
//! The catalog maps RM class names and primitive names to semantic [`Type`]s
//! and resolves attribute names inside a class. It is an ordinary immutable
//! value: build it once (usually with [`Catalog::openehr`]) and share it by
//! reference between any number of concurrent compilations.

use std::collections::HashMap;

use crate::error::{Result, RmError};
use crate::types::{FieldShape, PrimitiveType, Type};

/// A declared attribute of a class.
///
/// The tag follows the document encoding: the attribute name optionally
/// followed by `,`-separated options (`uid,omitempty`). Only the part before
/// the first separator takes part in lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub tag: String,
    pub shape: FieldShape,
}

impl FieldDef {
    /// Attribute name with any trailing options stripped.
    pub fn name(&self) -> &str {
        tag_name(&self.tag)
    }
}

/// Definition of one RM class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    /// Concrete descendants searched, in order, when a field is not declared
    /// on the class itself. Empty for concrete classes.
    pub subtypes: Vec<String>,
}

impl ClassDef {
    /// Start a concrete class definition.
    pub fn concrete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            subtypes: Vec::new(),
        }
    }

    /// Start an abstract class definition resolved through its subtypes.
    pub fn abstract_class(name: impl Into<String>, subtypes: &[&str]) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            subtypes: subtypes.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add an attribute.
    pub fn field(mut self, tag: impl Into<String>, shape: FieldShape) -> Self {
        self.fields.push(FieldDef {
            tag: tag.into(),
            shape,
        });
        self
    }

    fn own_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

/// Registry of RM classes.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    classes: HashMap<String, ClassDef>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// Register a class definition, replacing any previous one with that name.
    pub fn register(&mut self, class: ClassDef) {
        self.classes.insert(class.name.clone(), class);
    }

    /// Builder-style variant of [`Catalog::register`].
    pub fn with_class(mut self, class: ClassDef) -> Self {
        self.register(class);
        self
    }

    /// Look up a class definition by RM name.
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    /// Names of every registered class, sorted.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Resolve a type name: primitive names first, then RM classes.
    pub fn resolve_type(&self, name: &str) -> Result<Type> {
        if let Some(primitive) = PrimitiveType::from_name(name) {
            return Ok(Type::Primitive(primitive));
        }
        if self.classes.contains_key(name) {
            return Ok(Type::Class(name.to_string()));
        }
        Err(RmError::unknown_type(name))
    }

    /// Resolve the type of attribute `field` inside `container`.
    ///
    /// Optional and collection wrappers on the declared attribute are
    /// unwrapped, so the result is always the element type. Primitive
    /// containers have no attributes.
    ///
    /// On an abstract class the first subtype (in declaration order) that
    /// declares `field` wins, so `DATA_VALUE/value` is the `DV_TEXT` String
    /// even though `DV_BOOLEAN/value` is Boolean.
    pub fn field_type(&self, container: &Type, field: &str) -> Option<Type> {
        let class = container.as_class()?;
        let mut visited = Vec::new();
        self.lookup_field(class, tag_name(field), &mut visited)
    }

    /// Like [`Catalog::field_type`] but reports which lookup failed.
    pub fn require_field(&self, container: &Type, field: &str) -> Result<Type> {
        self.field_type(container, field)
            .ok_or_else(|| RmError::unknown_field(container.to_string(), field))
    }

    fn lookup_field<'a>(
        &'a self,
        class: &'a str,
        field: &str,
        visited: &mut Vec<&'a str>,
    ) -> Option<Type> {
        if visited.contains(&class) {
            return None;
        }
        visited.push(class);

        let def = self.classes.get(class)?;
        if let Some(found) = def.own_field(field) {
            return Some(found.shape.element_type());
        }
        def.subtypes
            .iter()
            .find_map(|sub| self.lookup_field(sub, field, visited))
    }
}

/// Strip trailing tag options: `uid,omitempty` -> `uid`.
pub fn tag_name(tag: &str) -> &str {
    match tag.split_once(',') {
        Some((name, _)) => name,
        None => tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_catalog() -> Catalog {
        Catalog::new()
            .with_class(
                ClassDef::concrete("BOX")
                    .field("label", FieldShape::string())
                    .field("items,omitempty", FieldShape::class("ITEM").list().optional()),
            )
            .with_class(ClassDef::abstract_class("ITEM", &["LEAF", "NODE"]))
            .with_class(ClassDef::concrete("LEAF").field("value", FieldShape::integer()))
            .with_class(
                ClassDef::concrete("NODE")
                    .field("value", FieldShape::string())
                    .field("children", FieldShape::class("ITEM").list()),
            )
    }

    #[test]
    fn test_tag_name_strips_options() {
        assert_eq!(tag_name("uid,omitempty"), "uid");
        assert_eq!(tag_name("uid"), "uid");
        assert_eq!(tag_name(",x"), "");
    }

    #[test]
    fn test_resolve_type() {
        let catalog = small_catalog();
        assert_eq!(catalog.resolve_type("Integer").unwrap(), Type::integer());
        assert_eq!(catalog.resolve_type("BOX").unwrap(), Type::class("BOX"));
        assert_eq!(
            catalog.resolve_type("CRATE"),
            Err(RmError::unknown_type("CRATE"))
        );
    }

    #[test]
    fn test_field_type_unwraps_optional_list() {
        let catalog = small_catalog();
        let items = catalog.field_type(&Type::class("BOX"), "items");
        assert_eq!(items, Some(Type::class("ITEM")));
    }

    #[test]
    fn test_field_type_ignores_requested_options() {
        let catalog = small_catalog();
        assert_eq!(
            catalog.field_type(&Type::class("BOX"), "label,omitempty"),
            Some(Type::string())
        );
    }

    #[test]
    fn test_abstract_lookup_first_subtype_wins() {
        let catalog = small_catalog();
        assert_eq!(
            catalog.field_type(&Type::class("ITEM"), "value"),
            Some(Type::integer())
        );
        assert_eq!(
            catalog.field_type(&Type::class("ITEM"), "children"),
            Some(Type::class("ITEM"))
        );
    }

    #[test]
    fn test_unknown_field_and_primitive_container() {
        let catalog = small_catalog();
        assert_eq!(catalog.field_type(&Type::class("BOX"), "nope"), None);
        assert_eq!(catalog.field_type(&Type::string(), "label"), None);
        assert!(matches!(
            catalog.require_field(&Type::class("BOX"), "nope"),
            Err(RmError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_self_referential_abstract_terminates() {
        let catalog = Catalog::new()
            .with_class(ClassDef::abstract_class("A", &["B"]))
            .with_class(ClassDef::abstract_class("B", &["A"]));
        assert_eq!(catalog.field_type(&Type::class("A"), "x"), None);
    }
}
