//! SQL text helpers for the PostgreSQL `jsonb` document store.
//!
//! All document access goes through the SQL/JSON path function family:
//!
//! | Operation      | SQL                                  |
//! |----------------|--------------------------------------|
//! | explode        | `jsonb_path_query(doc, path)`        |
//! | extract-first  | `jsonb_path_query_first(doc, path)`  |
//! | extract-array  | `jsonb_path_query_array(doc, path)`  |
//! | existence      | `jsonb_path_exists(doc, path)`       |
//! | array contains | `lhs @> rhs`                         |

use openehr_rm::{PrimitiveType, TYPE_DISCRIMINATOR};

use crate::error::Result;
use crate::syntax::Primitive;

/// Name of the JSON payload column of every document table.
pub const PAYLOAD_COLUMN: &str = "data";

/// Quote a string as a SQL text literal, doubling embedded quotes.
pub fn quote_text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A primitive as a `jsonb` literal, comparable with extracted document values.
pub fn jsonb_literal(value: &Primitive) -> Result<String> {
    Ok(format!("{}::jsonb", quote_text(&value.to_json()?)))
}

/// Render a path fragment (`.a.b?(...)`) as a rooted SQL/JSON path literal.
pub fn json_path(fragment: &str) -> String {
    quote_text(&format!("${fragment}"))
}

/// `jsonb_path_query_first(doc, '$fragment')`, or the document itself for an
/// empty fragment.
pub fn extract_first(document: &str, fragment: &str) -> String {
    if fragment.is_empty() {
        return document.to_string();
    }
    format!("jsonb_path_query_first({document}, {})", json_path(fragment))
}

/// `jsonb_path_query(doc, '$fragment')`, one row per match.
pub fn extract_all(document: &str, fragment: &str) -> String {
    format!("jsonb_path_query({document}, {})", json_path(fragment))
}

/// `jsonb_path_query_array(doc, '$fragment')`
pub fn extract_array(document: &str, fragment: &str) -> String {
    format!("jsonb_path_query_array({document}, {})", json_path(fragment))
}

/// `jsonb_path_exists(doc, '$fragment')`
pub fn path_exists(document: &str, fragment: &str) -> String {
    if fragment.is_empty() {
        return format!("{document} IS NOT NULL");
    }
    format!("jsonb_path_exists({document}, {})", json_path(fragment))
}

/// Scalar `jsonb` value as SQL text.
pub fn as_text(expression: &str) -> String {
    format!("({expression} #>> '{{}}')")
}

/// Cast a `jsonb` number to the SQL type of the given primitive kind.
pub fn as_number(expression: &str, kind: PrimitiveType) -> String {
    match kind {
        PrimitiveType::Integer => format!("({expression})::bigint"),
        _ => format!("({expression})::float8"),
    }
}

/// Wrap a SQL value so that every projected column is `jsonb`.
pub fn to_jsonb(expression: &str) -> String {
    format!("to_jsonb({expression})")
}

/// Accessor for one object key in a path fragment: `.key` or `."odd key"`.
pub fn key_accessor(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        format!(".{name}")
    } else {
        format!(".{}", serde_json::Value::String(name.to_string()))
    }
}

/// Filter fragment selecting every descendant node of the given RM class:
/// `.**?(@._type == "CLASS")`.
pub fn descendants_of_type(class: &str) -> String {
    format!(
        ".**?(@{} == {})",
        key_accessor(TYPE_DISCRIMINATOR),
        serde_json::Value::String(class.to_string())
    )
}

/// Boolean check that a node of `class` exists below `scope` in `document`:
/// the array of all discriminators contains the class name.
pub fn contains_type(document: &str, scope: &str, class: &str) -> String {
    let discriminators = extract_array(
        document,
        &format!("{scope}.**{}", key_accessor(TYPE_DISCRIMINATOR)),
    );
    let needle = serde_json::Value::Array(vec![serde_json::Value::String(class.to_string())]);
    format!("{discriminators} @> {}::jsonb", quote_text(&needle.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_text_escapes_quotes() {
        assert_eq!(quote_text("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_jsonb_literal() {
        assert_eq!(jsonb_literal(&Primitive::string("x")).unwrap(), "'\"x\"'::jsonb");
        assert_eq!(jsonb_literal(&Primitive::Integer(5)).unwrap(), "'5'::jsonb");
        assert_eq!(jsonb_literal(&Primitive::Null).unwrap(), "'null'::jsonb");
        assert_eq!(
            jsonb_literal(&Primitive::Float(f64::NAN)).unwrap_err().code(),
            "INVALID_TYPE"
        );
    }

    #[test]
    fn test_extract_first() {
        assert_eq!(
            extract_first("source_0.data", ".ehr_id.value"),
            "jsonb_path_query_first(source_0.data, '$.ehr_id.value')"
        );
        assert_eq!(extract_first("source_0.data", ""), "source_0.data");
    }

    #[test]
    fn test_key_accessor() {
        assert_eq!(key_accessor("value"), ".value");
        assert_eq!(key_accessor("_type"), "._type");
        assert_eq!(key_accessor("odd key"), ".\"odd key\"");
    }

    #[test]
    fn test_descendants_of_type() {
        assert_eq!(
            descendants_of_type("OBSERVATION"),
            ".**?(@._type == \"OBSERVATION\")"
        );
    }

    #[test]
    fn test_contains_type() {
        assert_eq!(
            contains_type("source_0.data", "", "OBSERVATION"),
            "jsonb_path_query_array(source_0.data, '$.**._type') @> '[\"OBSERVATION\"]'::jsonb"
        );
        assert_eq!(
            contains_type("source_0.data", ".content", "SECTION"),
            "jsonb_path_query_array(source_0.data, '$.content.**._type') @> '[\"SECTION\"]'::jsonb"
        );
    }

    #[test]
    fn test_path_exists_and_text() {
        assert_eq!(
            path_exists("source_1.data", ".name"),
            "jsonb_path_exists(source_1.data, '$.name')"
        );
        assert_eq!(as_text("x"), "(x #>> '{}')");
        assert_eq!(as_number("x", PrimitiveType::Integer), "(x)::bigint");
        assert_eq!(as_number("x", PrimitiveType::Float), "(x)::float8");
    }
}
