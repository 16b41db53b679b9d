//! openEHR reference-model type catalog.
//!
//! Provides the semantic [`Type`]s AQL paths resolve to and the [`Catalog`]
//! that maps RM class names and attribute names onto them.

pub mod catalog;
pub mod error;
pub mod openehr;
pub mod types;

pub use catalog::{Catalog, ClassDef, FieldDef, tag_name};
pub use error::{Result, RmError};
pub use openehr::{PARTY_CLASSES, TABLE_CLASSES, TYPE_DISCRIMINATOR};
pub use types::{FieldShape, PrimitiveType, Type};
