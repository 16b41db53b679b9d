//! WHERE clause lowering.

use openehr_rm::Type;

use crate::builder::SelectBuilder;
use crate::error::{BuildError, Result};
use crate::sql;
use crate::syntax::{ComparisonOp, Condition, InTarget, LeafCondition, LikeOperand, Operand, Primitive};

impl SelectBuilder<'_> {
    pub(crate) fn lower_condition(&mut self, condition: &Condition, depth: usize) -> Result<String> {
        self.ctx.check_depth(depth)?;

        match condition {
            Condition::Leaf(leaf) => self.lower_leaf(leaf, depth + 1),
            Condition::Not(inner) => Ok(format!("NOT ({})", self.lower_condition(inner, depth + 1)?)),
            Condition::And(left, right) => {
                let left = self.lower_condition(left, depth + 1)?;
                let right = self.lower_condition(right, depth + 1)?;
                Ok(format!("({left}) AND ({right})"))
            }
            Condition::Or(left, right) => {
                let left = self.lower_condition(left, depth + 1)?;
                let right = self.lower_condition(right, depth + 1)?;
                Ok(format!("({left}) OR ({right})"))
            }
            Condition::Paren(inner) => Ok(format!("({})", self.lower_condition(inner, depth + 1)?)),
        }
    }

    fn lower_leaf(&mut self, leaf: &LeafCondition, depth: usize) -> Result<String> {
        match leaf {
            LeafCondition::Exists(path) => {
                let resolved = self.resolve_path(path, depth)?;
                Ok(sql::path_exists(&resolved.document, &resolved.fragment))
            }
            LeafCondition::Comparison { op, left, right } => {
                let (left_sql, left_ty) = self.lower_operand(left, depth)?;
                let (right_sql, right_ty) = self.lower_operand(right, depth)?;
                if left_ty != right_ty {
                    return Err(BuildError::type_mismatch(left_ty, right_ty));
                }
                Ok(format!("{left_sql} {} {right_sql}", sql_operator(*op)))
            }
            LeafCondition::Like { path, pattern } => {
                let resolved = self.resolve_scalar_path(path, depth)?;
                if resolved.ty != Type::string() {
                    return Err(BuildError::type_mismatch(&resolved.ty, Type::string()));
                }
                let pattern = self.lower_like_pattern(pattern)?;
                Ok(format!("{} LIKE {pattern}", sql::as_text(&resolved.extract())))
            }
            LeafCondition::In { operand, target } => {
                let (operand_sql, operand_ty) = self.lower_operand(operand, depth)?;
                match target {
                    InTarget::List(items) => {
                        if items.len() > self.ctx.config.max_in_list_items {
                            return Err(BuildError::query_too_complex(format!(
                                "IN list has {} items, limit is {}",
                                items.len(),
                                self.ctx.config.max_in_list_items
                            )));
                        }
                        if items.is_empty() {
                            return Ok("FALSE".to_string());
                        }
                        let mut rendered = Vec::with_capacity(items.len());
                        for item in items {
                            let (item_sql, item_ty) = self.lower_operand(item, depth)?;
                            if item_ty != operand_ty {
                                return Err(BuildError::type_mismatch(&operand_ty, item_ty));
                            }
                            rendered.push(item_sql);
                        }
                        Ok(format!("{operand_sql} IN ({})", rendered.join(", ")))
                    }
                    InTarget::Subquery(query) => {
                        let subquery = self.build_nested(query, depth + 1)?;
                        match subquery.columns.as_slice() {
                            [column] if column.ty == operand_ty => {
                                Ok(format!("{operand_sql} IN ({})", subquery.sql))
                            }
                            [column] => Err(BuildError::subquery_column_mismatch(format!(
                                "subquery yields {}, expected {operand_ty}",
                                column.ty
                            ))),
                            columns => Err(BuildError::subquery_column_mismatch(format!(
                                "subquery yields {} columns, expected 1",
                                columns.len()
                            ))),
                        }
                    }
                }
            }
            LeafCondition::Contains { source, class } => {
                let table = self
                    .table(source)
                    .ok_or_else(|| BuildError::unknown_table(source))?;
                if table.ty.as_class().is_none() {
                    return Err(BuildError::invalid_type(format!(
                        "cannot search inside {source} of type {}",
                        table.ty
                    )));
                }
                let target = self.ctx.catalog.resolve_type(class)?;
                if target.as_class().is_none() {
                    return Err(BuildError::invalid_type(format!(
                        "CONTAINS requires a structured type, got {target}"
                    )));
                }
                Ok(sql::contains_type(&table.document(), "", class))
            }
        }
    }

    /// Lower a comparison operand to a `jsonb` expression and its type.
    pub(crate) fn lower_operand(&self, operand: &Operand, depth: usize) -> Result<(String, Type)> {
        match operand {
            Operand::Primitive(value) => Ok((sql::jsonb_literal(value)?, value.ty())),
            Operand::Parameter(name) => {
                let value = self.ctx.params.bind(name)?;
                Ok((sql::jsonb_literal(value)?, value.ty()))
            }
            Operand::Path(path) => {
                let resolved = self.resolve_scalar_path(path, depth)?;
                Ok((resolved.extract(), resolved.ty))
            }
        }
    }

    /// LIKE patterns are SQL text.
    fn lower_like_pattern(&self, pattern: &LikeOperand) -> Result<String> {
        match pattern {
            LikeOperand::Literal(text) => Ok(sql::quote_text(text)),
            LikeOperand::Parameter(name) => match self.ctx.params.bind(name)? {
                Primitive::String(text) => Ok(sql::quote_text(text)),
                other => Err(BuildError::type_mismatch(Type::string(), other.ty())),
            },
            LikeOperand::Column(name) => {
                let table = self
                    .table(name)
                    .ok_or_else(|| BuildError::unknown_identifier(name))?;
                if table.ty != Type::string() {
                    return Err(BuildError::type_mismatch(Type::string(), &table.ty));
                }
                Ok(sql::as_text(&table.document()))
            }
        }
    }
}

fn sql_operator(op: ComparisonOp) -> &'static str {
    match op {
        ComparisonOp::Eq => "=",
        ComparisonOp::Ne => "<>",
        ComparisonOp::Lt => "<",
        ComparisonOp::Le => "<=",
        ComparisonOp::Gt => ">",
        ComparisonOp::Ge => ">=",
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::{
        ComparisonOp, Condition, FromClause, LikeOperand, ObjectPath, Operand, Primitive,
        SelectExpr, SelectItem, SelectQuery,
    };
    use crate::tables::PreparedTable;
    use crate::{BuildError, CompilerConfig, Parameters, QueryCompiler};
    use openehr_rm::Catalog;

    fn ehr_query(condition: Condition) -> SelectQuery {
        SelectQuery::new(vec![SelectItem::Wildcard], FromClause::new("EHR", "e")).with_where(condition)
    }

    fn ehr_id() -> Operand {
        Operand::Path(ObjectPath::from_segments("e", &["ehr_id", "value"]))
    }

    fn where_sql(condition: Condition, params: &Parameters) -> crate::Result<String> {
        let catalog = Catalog::openehr();
        let compiled = QueryCompiler::new(&catalog).compile(&ehr_query(condition), params, &[])?;
        let (_, condition) = compiled
            .sql
            .split_once(" WHERE ")
            .expect("query should have a WHERE clause");
        Ok(condition.to_string())
    }

    #[test]
    fn test_comparison_with_parameter() {
        let params = Parameters::new().with("id", Primitive::string("7d44"));
        let sql = where_sql(
            Condition::compare(ComparisonOp::Eq, ehr_id(), Operand::Parameter("id".to_string())),
            &params,
        )
        .unwrap();
        assert_eq!(
            sql,
            "jsonb_path_query_first(source_0.data, '$.ehr_id.value') = '\"7d44\"'::jsonb"
        );
    }

    #[test]
    fn test_boolean_algebra() {
        let condition = Condition::not(Condition::or(
            Condition::exists(ObjectPath::from_segments("e", &["directory"])),
            Condition::paren(Condition::and(
                Condition::compare(ComparisonOp::Ne, ehr_id(), Operand::Primitive(Primitive::string("a"))),
                Condition::compare(ComparisonOp::Ne, ehr_id(), Operand::Primitive(Primitive::string("b"))),
            )),
        ));
        let sql = where_sql(condition, &Parameters::new()).unwrap();
        assert_eq!(
            sql,
            "NOT ((jsonb_path_exists(source_0.data, '$.directory')) OR \
             (((jsonb_path_query_first(source_0.data, '$.ehr_id.value') <> '\"a\"'::jsonb) AND \
             (jsonb_path_query_first(source_0.data, '$.ehr_id.value') <> '\"b\"'::jsonb))))"
        );
    }

    #[test]
    fn test_like_literal_escapes_quotes() {
        let condition = Condition::like(
            ObjectPath::from_segments("e", &["ehr_id", "value"]),
            LikeOperand::Literal("O'%".to_string()),
        );
        let sql = where_sql(condition, &Parameters::new()).unwrap();
        assert_eq!(
            sql,
            "(jsonb_path_query_first(source_0.data, '$.ehr_id.value') #>> '{}') LIKE 'O''%'"
        );
    }

    #[test]
    fn test_like_requires_string() {
        let condition = Condition::like(
            ObjectPath::from_segments("e", &["ehr_id", "value"]),
            LikeOperand::Parameter("n".to_string()),
        );
        let params = Parameters::new().with("n", Primitive::Integer(3));
        let err = where_sql(condition, &params).unwrap_err();
        assert_eq!(err.code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_in_list() {
        let sql = where_sql(
            Condition::in_list(
                ehr_id(),
                vec![
                    Operand::Primitive(Primitive::string("a")),
                    Operand::Primitive(Primitive::string("b")),
                ],
            ),
            &Parameters::new(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "jsonb_path_query_first(source_0.data, '$.ehr_id.value') IN ('\"a\"'::jsonb, '\"b\"'::jsonb)"
        );

        let sql = where_sql(Condition::in_list(ehr_id(), vec![]), &Parameters::new()).unwrap();
        assert_eq!(sql, "FALSE");

        let err = where_sql(
            Condition::in_list(ehr_id(), vec![Operand::Primitive(Primitive::Integer(1))]),
            &Parameters::new(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_in_list_limit() {
        let catalog = Catalog::openehr();
        let config = CompilerConfig {
            max_in_list_items: 2,
            ..Default::default()
        };
        let items = (0..3)
            .map(|i| Operand::Primitive(Primitive::string(i.to_string())))
            .collect();
        let query = ehr_query(Condition::in_list(ehr_id(), items));
        let err = QueryCompiler::with_config(&catalog, config)
            .compile(&query, &Parameters::new(), &[])
            .unwrap_err();
        assert_eq!(err.code(), "QUERY_TOO_COMPLEX");
    }

    #[test]
    fn test_in_subquery() {
        let subquery = SelectQuery::new(
            vec![SelectItem::path(ObjectPath::from_segments("s", &["uid", "value"]))],
            FromClause::new("EHR_STATUS", "s"),
        );
        let sql = where_sql(Condition::in_subquery(ehr_id(), subquery), &Parameters::new()).unwrap();
        assert_eq!(
            sql,
            "jsonb_path_query_first(source_0.data, '$.ehr_id.value') IN \
             (SELECT jsonb_path_query_first(source_1.data, '$.uid.value') AS col_0 FROM tbl_ehr_status_current source_1)"
        );
    }

    #[test]
    fn test_in_subquery_column_mismatch() {
        let two_columns = SelectQuery::new(vec![SelectItem::Wildcard], FromClause::new("EHR", "x"))
            .with_join(crate::syntax::JoinClause::new(
                "COMPOSITION",
                "c",
                crate::syntax::JoinKind::On {
                    source: "x".to_string(),
                },
            ));
        let err = where_sql(Condition::in_subquery(ehr_id(), two_columns), &Parameters::new())
            .unwrap_err();
        assert_eq!(err.code(), "SUBQUERY_COLUMN_MISMATCH");

        let wrong_type = SelectQuery::new(
            vec![SelectItem::path(ObjectPath::from_segments("s", &["is_queryable"]))],
            FromClause::new("EHR_STATUS", "s"),
        );
        let err = where_sql(Condition::in_subquery(ehr_id(), wrong_type), &Parameters::new())
            .unwrap_err();
        assert_eq!(err.code(), "SUBQUERY_COLUMN_MISMATCH");
    }

    #[test]
    fn test_contains() {
        let sql = where_sql(Condition::contains("e", "COMPOSITION"), &Parameters::new()).unwrap();
        assert_eq!(
            sql,
            "jsonb_path_query_array(source_0.data, '$.**._type') @> '[\"COMPOSITION\"]'::jsonb"
        );

        let err = where_sql(Condition::contains("x", "COMPOSITION"), &Parameters::new()).unwrap_err();
        assert_eq!(err, BuildError::unknown_table("x"));
    }

    #[test]
    fn test_structured_operand_is_rejected() {
        let err = where_sql(
            Condition::compare(
                ComparisonOp::Eq,
                Operand::Path(ObjectPath::from_segments("e", &["ehr_id"])),
                Operand::Primitive(Primitive::string("a")),
            ),
            &Parameters::new(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_TYPE");
    }

    #[test]
    fn test_unknown_root_identifier() {
        let err = where_sql(
            Condition::exists(ObjectPath::from_segments("c", &["uid"])),
            &Parameters::new(),
        )
        .unwrap_err();
        assert_eq!(err, BuildError::unknown_identifier("c"));
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let params = Parameters::new().with("x", Primitive::Float(f64::INFINITY));
        let err = where_sql(
            Condition::compare(
                ComparisonOp::Lt,
                Operand::Primitive(Primitive::Float(1.5)),
                Operand::Parameter("x".to_string()),
            ),
            &params,
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_TYPE");

        let err = where_sql(
            Condition::compare(
                ComparisonOp::Lt,
                Operand::Primitive(Primitive::Float(f64::NAN)),
                Operand::Primitive(Primitive::Float(1.5)),
            ),
            &Parameters::new(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_TYPE");
    }

    #[test]
    fn test_like_parameter_pattern() {
        let condition = Condition::like(
            ObjectPath::from_segments("e", &["ehr_id", "value"]),
            LikeOperand::Parameter("prefix".to_string()),
        );
        let params = Parameters::new().with("prefix", Primitive::string("7d%"));
        let sql = where_sql(condition, &params).unwrap();
        assert_eq!(
            sql,
            "(jsonb_path_query_first(source_0.data, '$.ehr_id.value') #>> '{}') LIKE '7d%'"
        );
    }

    #[test]
    fn test_like_column_pattern() {
        let catalog = Catalog::openehr();
        let ehr_id = || SelectExpr::Path(ObjectPath::from_segments("e", &["ehr_id", "value"]));
        let names = PreparedTable::new(
            "Names",
            "names",
            SelectQuery::new(
                vec![
                    SelectItem::named(ehr_id(), "name"),
                    SelectItem::named(ehr_id(), "pattern"),
                ],
                FromClause::new("EHR", "e"),
            ),
        );
        let query = |pattern: &str| {
            SelectQuery::new(
                vec![SelectItem::path(ObjectPath::new("name"))],
                FromClause {
                    class: "Names".to_string(),
                    alias: None,
                    all_versions: false,
                },
            )
            .with_where(Condition::like(
                ObjectPath::new("name"),
                LikeOperand::Column(pattern.to_string()),
            ))
        };
        let compiler = QueryCompiler::new(&catalog);
        let prepared = [names];

        let compiled = compiler
            .compile(&query("pattern"), &Parameters::new(), &prepared)
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT names.col_0 AS col_0 FROM names \
             WHERE (names.col_0 #>> '{}') LIKE (names.col_1 #>> '{}')"
        );

        let err = compiler
            .compile(&query("unbound"), &Parameters::new(), &prepared)
            .unwrap_err();
        assert_eq!(err, BuildError::unknown_identifier("unbound"));
    }

    #[test]
    fn test_like_column_pattern_requires_string() {
        let condition = Condition::like(
            ObjectPath::from_segments("e", &["ehr_id", "value"]),
            LikeOperand::Column("e".to_string()),
        );
        let err = where_sql(condition, &Parameters::new()).unwrap_err();
        assert_eq!(err.code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_in_subquery_continues_source_aliases() {
        let subquery = SelectQuery::new(
            vec![SelectItem::path(ObjectPath::from_segments("c", &["uid", "value"]))],
            FromClause::new("COMPOSITION", "c"),
        );
        let query = SelectQuery::new(vec![SelectItem::Wildcard], FromClause::new("EHR", "e"))
            .with_join(crate::syntax::JoinClause::new(
                "EHR_STATUS",
                "s",
                crate::syntax::JoinKind::On {
                    source: "e".to_string(),
                },
            ))
            .with_where(Condition::in_subquery(ehr_id(), subquery));
        let catalog = Catalog::openehr();
        let compiled = QueryCompiler::new(&catalog)
            .compile(&query, &Parameters::new(), &[])
            .unwrap();
        let (outer, inner) = compiled.sql.split_once(" IN (").unwrap();
        assert!(outer.contains("JOIN tbl_ehr_status_current source_1"));
        assert_eq!(
            inner,
            "SELECT jsonb_path_query_first(source_2.data, '$.uid.value') AS col_0 \
             FROM tbl_composition_current source_2)"
        );
    }
}
