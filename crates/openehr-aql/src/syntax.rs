//! AQL syntax tree.
//!
//! This is the input contract of the compiler: the parser (an external
//! collaborator) produces one of these trees after validating the query text
//! against the AQL grammar. Every grammar rule with several alternatives is
//! an enum with one variant per alternative, so every lowering function
//! matches exhaustively.
//!
//! The tree derives `serde` so a parser running in another process can hand
//! it over as JSON (see [`SelectQuery::from_json`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use openehr_rm::{PrimitiveType, Type};

use crate::error::BuildError;

/// A complete `SELECT` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    pub select: SelectClause,

    pub from: FromClause,

    #[serde(default)]
    pub joins: Vec<JoinClause>,

    /// Note: Named `where_` because `where` is a Rust reserved keyword.
    #[serde(default, rename = "where")]
    pub where_: Option<Condition>,

    #[serde(default)]
    pub group_by: Vec<ObjectPath>,

    #[serde(default)]
    pub union: Option<Box<UnionClause>>,

    #[serde(default)]
    pub order_by: Vec<OrderItem>,

    #[serde(default)]
    pub limit: Option<LimitClause>,
}

impl SelectQuery {
    /// Create a query with the given projection and FROM clause.
    pub fn new(items: Vec<SelectItem>, from: FromClause) -> Self {
        Self {
            select: SelectClause {
                distinct: false,
                items,
            },
            from,
            joins: Vec::new(),
            where_: None,
            group_by: Vec::new(),
            union: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn with_join(mut self, join: JoinClause) -> Self {
        self.joins.push(join);
        self
    }

    pub fn with_where(mut self, condition: Condition) -> Self {
        self.where_ = Some(condition);
        self
    }

    pub fn with_group_by(mut self, path: ObjectPath) -> Self {
        self.group_by.push(path);
        self
    }

    pub fn with_union(mut self, all: bool, query: SelectQuery) -> Self {
        self.union = Some(Box::new(UnionClause { all, query }));
        self
    }

    pub fn with_order_by(mut self, path: ObjectPath, direction: SortDirection) -> Self {
        self.order_by.push(OrderItem { path, direction });
        self
    }

    pub fn with_limit(mut self, limit: Option<RowBound>, offset: Option<RowBound>) -> Self {
        self.limit = Some(LimitClause { limit, offset });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.select.distinct = true;
        self
    }

    /// Parse a syntax tree from its JSON form.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Parse a syntax tree from a JSON string.
    pub fn parse(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectClause {
    #[serde(default)]
    pub distinct: bool,
    pub items: Vec<SelectItem>,
}

/// One entry of the SELECT list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// A scalar expression, optionally named with `AS`.
    Expression {
        expr: SelectExpr,
        #[serde(default)]
        name: Option<String>,
    },
    /// An aggregate call, optionally named with `AS`.
    Aggregate {
        call: AggregateCall,
        #[serde(default)]
        name: Option<String>,
    },
}

impl SelectItem {
    pub fn path(path: ObjectPath) -> Self {
        Self::Expression {
            expr: SelectExpr::Path(path),
            name: None,
        }
    }

    pub fn named(expr: SelectExpr, name: impl Into<String>) -> Self {
        Self::Expression {
            expr,
            name: Some(name.into()),
        }
    }

    pub fn aggregate(call: AggregateCall, name: Option<&str>) -> Self {
        Self::Aggregate {
            call,
            name: name.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectExpr {
    Primitive(Primitive),
    Parameter(String),
    Path(ObjectPath),
    Function(FunctionCall),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Vec<SelectExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateCall {
    /// `COUNT(*)`
    CountAll,
    /// `COUNT([DISTINCT] path)`
    Count {
        #[serde(default)]
        distinct: bool,
        path: ObjectPath,
    },
    Sum(ObjectPath),
    Avg(ObjectPath),
    Min(ObjectPath),
    Max(ObjectPath),
}

/// `FROM [ALL_VERSIONS] CLASS [alias]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromClause {
    pub class: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub all_versions: bool,
}

impl FromClause {
    pub fn new(class: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            alias: Some(alias.into()),
            all_versions: false,
        }
    }

    pub fn all_versions(mut self) -> Self {
        self.all_versions = true;
        self
    }
}

/// `JOIN [ALL_VERSIONS] CLASS [alias] (ON src | IN src | IN src AT path)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    pub class: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub all_versions: bool,
    pub kind: JoinKind,
}

impl JoinClause {
    pub fn new(class: impl Into<String>, alias: impl Into<String>, kind: JoinKind) -> Self {
        Self {
            class: class.into(),
            alias: Some(alias.into()),
            all_versions: false,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Structural join fixed by the pair of RM types.
    On { source: String },
    /// Containment search anywhere inside the source document.
    In { source: String },
    /// Containment search below a path of the source document.
    At { path: ObjectPath },
}

/// `root[condition]/segment[predicate]/...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPath {
    pub root: String,
    #[serde(default)]
    pub condition: Option<PathCondition>,
    #[serde(default)]
    pub segments: Vec<PathSegment>,
}

impl ObjectPath {
    /// A bare identifier with no segments.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            condition: None,
            segments: Vec::new(),
        }
    }

    /// Build a path from an identifier and plain segment names.
    pub fn from_segments(root: impl Into<String>, segments: &[&str]) -> Self {
        segments
            .iter()
            .fold(Self::new(root), |path, name| path.segment(*name))
    }

    pub fn segment(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::new(name));
        self
    }

    pub fn segment_where(mut self, name: impl Into<String>, predicate: PathCondition) -> Self {
        self.segments.push(PathSegment {
            name: name.into(),
            predicate: Some(predicate),
        });
        self
    }

    pub fn with_condition(mut self, condition: PathCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// True for a plain identifier without segments or conditions.
    pub fn is_bare(&self) -> bool {
        self.segments.is_empty() && self.condition.is_none()
    }

    /// Render the path as AQL-like text for error messages.
    pub fn display(&self) -> String {
        let mut out = self.root.clone();
        if self.condition.is_some() {
            out.push_str("[...]");
        }
        for segment in &self.segments {
            out.push('/');
            out.push_str(&segment.name);
            if segment.predicate.is_some() {
                out.push_str("[...]");
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub name: String,
    #[serde(default)]
    pub predicate: Option<PathCondition>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            predicate: None,
        }
    }
}

/// Bracket predicate attached to a path or a path segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCondition {
    Comparison {
        op: ComparisonOp,
        left: PathOperand,
        right: PathOperand,
    },
    And(Box<PathCondition>, Box<PathCondition>),
    Or(Box<PathCondition>, Box<PathCondition>),
    Paren(Box<PathCondition>),
}

impl PathCondition {
    pub fn compare(op: ComparisonOp, left: PathOperand, right: PathOperand) -> Self {
        Self::Comparison { op, left, right }
    }

    /// `field = 'value'`, the most common predicate form.
    pub fn field_eq(field: &str, value: Primitive) -> Self {
        Self::compare(
            ComparisonOp::Eq,
            PathOperand::Path(vec![PathSegment::new(field)]),
            PathOperand::Primitive(value),
        )
    }

    pub fn and(left: PathCondition, right: PathCondition) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: PathCondition, right: PathCondition) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOperand {
    Primitive(Primitive),
    /// Sub-path relative to the node the predicate is attached to.
    Path(Vec<PathSegment>),
    Parameter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// WHERE clause algebra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Leaf(LeafCondition),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Paren(Box<Condition>),
}

impl Condition {
    pub fn compare(op: ComparisonOp, left: Operand, right: Operand) -> Self {
        Self::Leaf(LeafCondition::Comparison { op, left, right })
    }

    pub fn exists(path: ObjectPath) -> Self {
        Self::Leaf(LeafCondition::Exists(path))
    }

    pub fn like(path: ObjectPath, pattern: LikeOperand) -> Self {
        Self::Leaf(LeafCondition::Like { path, pattern })
    }

    pub fn in_list(operand: Operand, items: Vec<Operand>) -> Self {
        Self::Leaf(LeafCondition::In {
            operand,
            target: InTarget::List(items),
        })
    }

    pub fn in_subquery(operand: Operand, query: SelectQuery) -> Self {
        Self::Leaf(LeafCondition::In {
            operand,
            target: InTarget::Subquery(Box::new(query)),
        })
    }

    pub fn contains(source: impl Into<String>, class: impl Into<String>) -> Self {
        Self::Leaf(LeafCondition::Contains {
            source: source.into(),
            class: class.into(),
        })
    }

    pub fn not(inner: Condition) -> Self {
        Self::Not(Box::new(inner))
    }

    pub fn and(left: Condition, right: Condition) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Condition, right: Condition) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    pub fn paren(inner: Condition) -> Self {
        Self::Paren(Box::new(inner))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafCondition {
    Exists(ObjectPath),
    Comparison {
        op: ComparisonOp,
        left: Operand,
        right: Operand,
    },
    Like {
        path: ObjectPath,
        pattern: LikeOperand,
    },
    In {
        operand: Operand,
        target: InTarget,
    },
    /// `source CONTAINS CLASS`
    Contains { source: String, class: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Primitive(Primitive),
    Parameter(String),
    Path(ObjectPath),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeOperand {
    Literal(String),
    Parameter(String),
    /// A String column of a bound table.
    Column(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InTarget {
    List(Vec<Operand>),
    Subquery(Box<SelectQuery>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub path: ObjectPath,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// `LIMIT n` and/or `OFFSET m`; each bound is independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitClause {
    #[serde(default)]
    pub limit: Option<RowBound>,
    #[serde(default)]
    pub offset: Option<RowBound>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowBound {
    Literal(i64),
    Parameter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionClause {
    /// `UNION ALL` when true.
    #[serde(default)]
    pub all: bool,
    pub query: SelectQuery,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl Primitive {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn kind(&self) -> PrimitiveType {
        match self {
            Self::String(_) => PrimitiveType::String,
            Self::Integer(_) => PrimitiveType::Integer,
            Self::Float(_) => PrimitiveType::Float,
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::Null => PrimitiveType::Null,
        }
    }

    pub fn ty(&self) -> Type {
        Type::Primitive(self.kind())
    }

    /// JSON text of the value (`"abc"`, `42`, `true`, `null`).
    ///
    /// NaN and infinities have no JSON form and are rejected.
    pub fn to_json(&self) -> Result<String, BuildError> {
        Ok(match self {
            Self::String(s) => Value::String(s.clone()).to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) if !f.is_finite() => {
                return Err(BuildError::invalid_type(format!(
                    "float literal {f} has no JSON representation"
                )));
            }
            Self::Float(f) => {
                let rendered = f.to_string();
                if rendered.contains(['.', 'e', 'E']) {
                    rendered
                } else {
                    format!("{rendered}.0")
                }
            }
            Self::Boolean(b) => b.to_string(),
            Self::Null => "null".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_query() {
        let query = SelectQuery::from_json(&json!({
            "select": {"items": ["wildcard"]},
            "from": {"class": "EHR", "alias": "e"}
        }))
        .unwrap();

        assert_eq!(query.select.items, vec![SelectItem::Wildcard]);
        assert_eq!(query.from, FromClause::new("EHR", "e"));
        assert!(query.joins.is_empty());
        assert!(query.where_.is_none());
    }

    #[test]
    fn test_parse_join_and_where() {
        let query = SelectQuery::from_json(&json!({
            "select": {"items": [{"expression": {"expr": {"path": {"root": "c"}}}}]},
            "from": {"class": "EHR", "alias": "e", "all_versions": true},
            "joins": [{"class": "COMPOSITION", "alias": "c", "kind": {"on": {"source": "e"}}}],
            "where": {"leaf": {"comparison": {
                "op": "eq",
                "left": {"path": {"root": "e", "segments": [{"name": "ehr_id"}, {"name": "value"}]}},
                "right": {"parameter": "ehr_id"}
            }}}
        }))
        .unwrap();

        assert!(query.from.all_versions);
        assert_eq!(
            query.joins[0].kind,
            JoinKind::On {
                source: "e".to_string()
            }
        );
        assert_eq!(
            query.where_,
            Some(Condition::compare(
                ComparisonOp::Eq,
                Operand::Path(ObjectPath::from_segments("e", &["ehr_id", "value"])),
                Operand::Parameter("ehr_id".to_string()),
            ))
        );
    }

    #[test]
    fn test_malformed_tree_is_rejected() {
        let err = SelectQuery::from_json(&json!({"select": {"items": ["everything"]}}));
        assert!(err.is_err());
    }

    #[test]
    fn test_primitive_json_rendering() {
        assert_eq!(Primitive::string("a\"b").to_json().unwrap(), "\"a\\\"b\"");
        assert_eq!(Primitive::Integer(-3).to_json().unwrap(), "-3");
        assert_eq!(Primitive::Float(2.0).to_json().unwrap(), "2.0");
        assert_eq!(Primitive::Float(2.5).to_json().unwrap(), "2.5");
        assert_eq!(Primitive::Boolean(true).to_json().unwrap(), "true");
        assert_eq!(Primitive::Null.to_json().unwrap(), "null");
    }

    #[test]
    fn test_path_display() {
        let path = ObjectPath::from_segments("o", &["data", "events"])
            .segment_where("items", PathCondition::field_eq("archetype_node_id", Primitive::string("at0004")));
        assert_eq!(path.display(), "o/data/events/items[...]");
    }
}
