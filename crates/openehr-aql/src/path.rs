//! Object path translation: AQL paths to SQL/JSON path fragments.
//!
//! `o/data/events[time/value = $t]/data` against `OBSERVATION` becomes
//! `.data.events?(@.time.value == "2024-01-01").data`, typed by the catalog.

use openehr_rm::Type;

use crate::builder::Context;
use crate::error::{BuildError, Result};
use crate::sql::key_accessor;
use crate::syntax::{ComparisonOp, PathCondition, PathOperand, PathSegment};

/// A translated path: fragment relative to the start node plus yielded type.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedPath {
    pub fragment: String,
    pub ty: Type,
}

impl Context<'_> {
    /// Translate `[condition]/segment[predicate]/...` starting at `start`.
    pub(crate) fn translate_path(
        &self,
        start: &Type,
        condition: Option<&PathCondition>,
        segments: &[PathSegment],
        depth: usize,
    ) -> Result<TranslatedPath> {
        self.check_depth(depth)?;

        let mut fragment = String::new();
        if let Some(condition) = condition {
            let filter = self.lower_path_condition(start, condition, depth + 1)?;
            fragment.push_str(&format!("?({filter})"));
        }

        let mut current = start.clone();
        for segment in segments {
            current = self.catalog.require_field(&current, &segment.name)?;
            fragment.push_str(&key_accessor(&segment.name));
            if let Some(predicate) = &segment.predicate {
                let filter = self.lower_path_condition(&current, predicate, depth + 1)?;
                fragment.push_str(&format!("?({filter})"));
            }
        }

        Ok(TranslatedPath {
            fragment,
            ty: current,
        })
    }

    /// Lower a bracket predicate evaluated against a node of type `node`.
    fn lower_path_condition(
        &self,
        node: &Type,
        condition: &PathCondition,
        depth: usize,
    ) -> Result<String> {
        self.check_depth(depth)?;

        match condition {
            PathCondition::Comparison { op, left, right } => {
                let (left_sql, left_ty) = self.lower_path_operand(node, left, depth + 1)?;
                let (right_sql, right_ty) = self.lower_path_operand(node, right, depth + 1)?;
                if left_ty != right_ty {
                    return Err(BuildError::type_mismatch(left_ty, right_ty));
                }
                Ok(format!("{left_sql} {} {right_sql}", json_path_operator(*op)))
            }
            PathCondition::And(left, right) => Ok(format!(
                "{} && {}",
                self.lower_path_condition(node, left, depth + 1)?,
                self.lower_path_condition(node, right, depth + 1)?
            )),
            PathCondition::Or(left, right) => Ok(format!(
                "{} || {}",
                self.lower_path_condition(node, left, depth + 1)?,
                self.lower_path_condition(node, right, depth + 1)?
            )),
            PathCondition::Paren(inner) => Ok(format!(
                "({})",
                self.lower_path_condition(node, inner, depth + 1)?
            )),
        }
    }

    fn lower_path_operand(
        &self,
        node: &Type,
        operand: &PathOperand,
        depth: usize,
    ) -> Result<(String, Type)> {
        match operand {
            PathOperand::Primitive(value) => Ok((value.to_json()?, value.ty())),
            PathOperand::Parameter(name) => {
                let value = self.params.bind(name)?;
                Ok((value.to_json()?, value.ty()))
            }
            PathOperand::Path(segments) => {
                let path = self.translate_path(node, None, segments, depth)?;
                if !path.ty.is_scalar() {
                    return Err(BuildError::invalid_type(format!(
                        "path predicate operand yields structured type {}",
                        path.ty
                    )));
                }
                Ok((format!("@{}", path.fragment), path.ty))
            }
        }
    }
}

fn json_path_operator(op: ComparisonOp) -> &'static str {
    match op {
        ComparisonOp::Eq => "==",
        ComparisonOp::Ne => "!=",
        ComparisonOp::Lt => "<",
        ComparisonOp::Le => "<=",
        ComparisonOp::Gt => ">",
        ComparisonOp::Ge => ">=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::params::Parameters;
    use crate::syntax::{ObjectPath, Primitive};
    use openehr_rm::Catalog;

    fn translate(
        catalog: &Catalog,
        params: &Parameters,
        start: &str,
        path: &ObjectPath,
    ) -> Result<TranslatedPath> {
        let config = CompilerConfig::default();
        let ctx = Context {
            catalog,
            config: &config,
            params,
            prepared: &[],
        };
        ctx.translate_path(&Type::class(start), path.condition.as_ref(), &path.segments, 0)
    }

    #[test]
    fn test_plain_segments() {
        let catalog = Catalog::openehr();
        let path = ObjectPath::from_segments("e", &["ehr_id", "value"]);
        let result = translate(&catalog, &Parameters::new(), "EHR", &path).unwrap();
        assert_eq!(result.fragment, ".ehr_id.value");
        assert_eq!(result.ty, Type::string());
    }

    #[test]
    fn test_segment_predicate_with_parameter() {
        let catalog = Catalog::openehr();
        let params = Parameters::new().with("node", Primitive::string("at0001"));
        let path = ObjectPath::new("o")
            .segment("data")
            .segment_where(
                "events",
                PathCondition::compare(
                    ComparisonOp::Eq,
                    PathOperand::Path(vec![PathSegment::new("archetype_node_id")]),
                    PathOperand::Parameter("node".to_string()),
                ),
            )
            .segment("time");
        let result = translate(&catalog, &params, "OBSERVATION", &path).unwrap();
        assert_eq!(
            result.fragment,
            ".data.events?(@.archetype_node_id == \"at0001\").time"
        );
        assert_eq!(result.ty, Type::class("DV_DATE_TIME"));
    }

    #[test]
    fn test_root_condition_with_and_or() {
        let catalog = Catalog::openehr();
        let condition = PathCondition::or(
            PathCondition::and(
                PathCondition::field_eq("archetype_node_id", Primitive::string("a")),
                PathCondition::field_eq("archetype_node_id", Primitive::string("b")),
            ),
            PathCondition::Paren(Box::new(PathCondition::compare(
                ComparisonOp::Ne,
                PathOperand::Path(vec![PathSegment::new("archetype_node_id")]),
                PathOperand::Primitive(Primitive::string("c")),
            ))),
        );
        let path = ObjectPath::new("c")
            .with_condition(condition)
            .segment("uid");
        let result = translate(&catalog, &Parameters::new(), "COMPOSITION", &path).unwrap();
        assert_eq!(
            result.fragment,
            "?(@.archetype_node_id == \"a\" && @.archetype_node_id == \"b\" || (@.archetype_node_id != \"c\")).uid"
        );
    }

    #[test]
    fn test_unknown_segment() {
        let catalog = Catalog::openehr();
        let path = ObjectPath::from_segments("e", &["nope"]);
        let err = translate(&catalog, &Parameters::new(), "EHR", &path).unwrap_err();
        assert_eq!(err, BuildError::unknown_path("EHR/nope"));
    }

    #[test]
    fn test_predicate_type_mismatch() {
        let catalog = Catalog::openehr();
        let path = ObjectPath::new("e").segment_where(
            "ehr_id",
            PathCondition::field_eq("value", Primitive::Integer(1)),
        );
        let err = translate(&catalog, &Parameters::new(), "EHR", &path).unwrap_err();
        assert_eq!(err.code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_predicate_unknown_parameter() {
        let catalog = Catalog::openehr();
        let path = ObjectPath::new("e").segment_where(
            "ehr_id",
            PathCondition::compare(
                ComparisonOp::Eq,
                PathOperand::Path(vec![PathSegment::new("value")]),
                PathOperand::Parameter("missing".to_string()),
            ),
        );
        let err = translate(&catalog, &Parameters::new(), "EHR", &path).unwrap_err();
        assert_eq!(err, BuildError::unknown_parameter("missing"));
    }

    #[test]
    fn test_predicate_non_finite_float() {
        let catalog = Catalog::openehr();
        let path = ObjectPath::new("q")
            .with_condition(PathCondition::field_eq("magnitude", Primitive::Float(f64::NAN)));
        let err = translate(&catalog, &Parameters::new(), "DV_QUANTITY", &path).unwrap_err();
        assert_eq!(err.code(), "INVALID_TYPE");
    }
}
