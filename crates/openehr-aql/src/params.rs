//! Query parameters (`$name`) and their binding.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{BuildError, Result};
use crate::syntax::Primitive;

/// Caller-supplied bind values, read-only for the whole build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: IndexMap<String, Primitive>,
}

impl Parameters {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }

    /// Add a value, builder style.
    pub fn with(mut self, name: impl Into<String>, value: Primitive) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Primitive) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Primitive> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve `$name` to its bound value.
    pub fn bind(&self, name: &str) -> Result<&Primitive> {
        self.values
            .get(name)
            .ok_or_else(|| BuildError::unknown_parameter(name))
    }

    /// Build a parameter set from a JSON object such as `{"ehr_id": "abc", "n": 5}`.
    ///
    /// Only scalar JSON values are accepted.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(BuildError::invalid_type(
                "query parameters must be a JSON object",
            ));
        };

        let mut params = Self::new();
        for (name, value) in map {
            params.insert(name.clone(), primitive_from_json(name, value)?);
        }
        Ok(params)
    }
}

fn primitive_from_json(name: &str, value: &Value) -> Result<Primitive> {
    match value {
        Value::Null => Ok(Primitive::Null),
        Value::Bool(b) => Ok(Primitive::Boolean(*b)),
        Value::String(s) => Ok(Primitive::String(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Primitive::Integer(i)),
            None => n.as_f64().map(Primitive::Float).ok_or_else(|| {
                BuildError::invalid_type(format!("parameter ${name} is out of range"))
            }),
        },
        Value::Array(_) | Value::Object(_) => Err(BuildError::invalid_type(format!(
            "parameter ${name} must be a string, number, boolean or null"
        ))),
    }
}
