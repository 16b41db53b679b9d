//! Bound tables, output columns and the physical storage layout.

use serde::Serialize;

use openehr_rm::{PARTY_CLASSES, TABLE_CLASSES, Type};

use crate::syntax::SelectQuery;

/// Join table linking two party rows.
pub const PARTY_RELATIONSHIP_TABLE: &str = "tbl_party_relationship";

/// How a table entered the symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrigin {
    /// A row of a physical document table (`FROM`, `JOIN ... ON`).
    Document,
    /// A node found by containment search (`JOIN ... IN`, `AT`).
    Containment,
    /// One output column of an expanded prepared table.
    Prepared,
}

/// A queryable source in scope for one SELECT build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    #[serde(rename = "type")]
    pub ty: Type,
    /// Alias (or class name) the query uses to refer to the table.
    pub name: String,
    /// Physical source alias (`source_N`, or a prepared table's alias).
    pub source: String,
    /// Column holding the JSON payload.
    pub column: String,
    pub origin: TableOrigin,
}

impl Table {
    /// Qualified payload reference, e.g. `source_0.data`.
    pub fn document(&self) -> String {
        format!("{}.{}", self.source, self.column)
    }
}

/// One projected output value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    #[serde(rename = "type")]
    pub ty: Type,
    /// Explicit `AS` name, or the table alias for whole-table projections.
    pub name: Option<String>,
    /// Physical output alias (`col_N`).
    pub source: String,
}

/// Successful compilation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub columns: Vec<Column>,
}

/// A named, stored query usable as a FROM source.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct PreparedTable {
    pub name: String,
    /// Physical alias the caller binds the materialized rows to.
    pub source: String,
    pub query: SelectQuery,
}

impl PreparedTable {
    pub fn new(name: impl Into<String>, source: impl Into<String>, query: SelectQuery) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            query,
        }
    }
}

/// Physical table holding documents of `class`, if it is table-backed.
pub fn physical_table(class: &str, all_versions: bool) -> Option<String> {
    if !TABLE_CLASSES.contains(&class) {
        return None;
    }
    let base = format!("tbl_{}", class.to_lowercase());
    Some(if all_versions {
        base
    } else {
        format!("{base}_current")
    })
}

/// Physical join between two table-backed classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRule {
    /// `target.<target_column> = source.<source_column>`
    Key {
        target_column: &'static str,
        source_column: &'static str,
    },
    /// Through `tbl_party_relationship(source_id, target_id)`.
    PartyRelationship,
}

const EHR_CHILDREN: &[&str] = &[
    "COMPOSITION",
    "EHR_STATUS",
    "EHR_ACCESS",
    "FOLDER",
    "CONTRIBUTION",
];

/// Fixed join rule for the ordered pair (source class, target class).
pub fn join_rule(source: &str, target: &str) -> Option<JoinRule> {
    match (source, target) {
        ("EHR", child) if EHR_CHILDREN.contains(&child) => Some(JoinRule::Key {
            target_column: "ehr_id",
            source_column: "id",
        }),
        (child, "EHR") if EHR_CHILDREN.contains(&child) => Some(JoinRule::Key {
            target_column: "id",
            source_column: "ehr_id",
        }),
        ("EHR", "PERSON") => Some(JoinRule::Key {
            target_column: "id",
            source_column: "party_id",
        }),
        ("PERSON", "EHR") => Some(JoinRule::Key {
            target_column: "party_id",
            source_column: "id",
        }),
        (a, b) if PARTY_CLASSES.contains(&a) && PARTY_CLASSES.contains(&b) => {
            Some(JoinRule::PartyRelationship)
        }
        _ => None,
    }
}

impl JoinRule {
    /// Render the join fragment binding `target_table` as `alias`.
    pub fn render(&self, source_alias: &str, target_table: &str, alias: &str) -> String {
        match self {
            Self::Key {
                target_column,
                source_column,
            } => format!(
                "JOIN {target_table} {alias} ON {alias}.{target_column} = {source_alias}.{source_column}"
            ),
            Self::PartyRelationship => {
                let link = format!("{alias}_rel");
                format!(
                    "JOIN {PARTY_RELATIONSHIP_TABLE} {link} ON {link}.source_id = {source_alias}.id \
                     JOIN {target_table} {alias} ON {alias}.id = {link}.target_id"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_table_names() {
        assert_eq!(physical_table("EHR", false).as_deref(), Some("tbl_ehr_current"));
        assert_eq!(physical_table("EHR", true).as_deref(), Some("tbl_ehr"));
        assert_eq!(
            physical_table("EHR_STATUS", false).as_deref(),
            Some("tbl_ehr_status_current")
        );
        assert_eq!(physical_table("OBSERVATION", false), None);
        assert_eq!(physical_table("String", false), None);
    }

    #[test]
    fn test_every_table_class_maps() {
        for class in TABLE_CLASSES {
            let table = physical_table(class, false).unwrap();
            assert!(table.starts_with("tbl_"));
            assert!(table.ends_with("_current"));
        }
    }

    #[test]
    fn test_join_rules() {
        assert_eq!(
            join_rule("EHR", "COMPOSITION")
                .unwrap()
                .render("source_0", "tbl_composition_current", "source_1"),
            "JOIN tbl_composition_current source_1 ON source_1.ehr_id = source_0.id"
        );
        assert_eq!(
            join_rule("COMPOSITION", "EHR")
                .unwrap()
                .render("source_0", "tbl_ehr_current", "source_1"),
            "JOIN tbl_ehr_current source_1 ON source_1.id = source_0.ehr_id"
        );
        assert_eq!(
            join_rule("EHR", "PERSON")
                .unwrap()
                .render("source_0", "tbl_person_current", "source_1"),
            "JOIN tbl_person_current source_1 ON source_1.id = source_0.party_id"
        );
        assert_eq!(join_rule("GROUP", "PERSON"), Some(JoinRule::PartyRelationship));
        assert_eq!(join_rule("COMPOSITION", "FOLDER"), None);
        assert_eq!(join_rule("EHR", "EHR"), None);
    }

    #[test]
    fn test_party_relationship_render() {
        let sql = JoinRule::PartyRelationship.render("source_0", "tbl_person_current", "source_1");
        assert_eq!(
            sql,
            "JOIN tbl_party_relationship source_1_rel ON source_1_rel.source_id = source_0.id \
             JOIN tbl_person_current source_1 ON source_1.id = source_1_rel.target_id"
        );
    }

    #[test]
    fn test_columns_serialize_with_type_names() {
        let column = Column {
            ty: Type::class("EHR"),
            name: Some("e".to_string()),
            source: "col_0".to_string(),
        };
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "EHR", "name": "e", "source": "col_0"})
        );
    }
}
