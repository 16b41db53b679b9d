//! SELECT list lowering: wildcard, expressions and aggregates.
//!
//! Every projected value is `jsonb` so that UNION sides and IN-subqueries
//! compare uniformly with extracted document values.

use openehr_rm::Type;

use crate::builder::SelectBuilder;
use crate::error::{BuildError, Result};
use crate::sql;
use crate::syntax::{AggregateCall, ObjectPath, SelectClause, SelectExpr, SelectItem};
use crate::tables::{Column, Table};

impl SelectBuilder<'_> {
    /// Lower the SELECT list, recording one output column per item.
    pub(crate) fn project(&mut self, select: &SelectClause, depth: usize) -> Result<Vec<String>> {
        let mut items = Vec::with_capacity(select.items.len());
        for item in &select.items {
            match item {
                SelectItem::Wildcard => {
                    for table in self.tables.clone() {
                        let name = Some(table.name.clone());
                        items.push(self.push_table(&table, name));
                    }
                }
                SelectItem::Expression { expr, name } => match self.bare_table(expr) {
                    Some(table) => {
                        let name = name.clone().or_else(|| Some(table.name.clone()));
                        items.push(self.push_table(&table, name));
                    }
                    None => {
                        let (expression, ty) = self.lower_select_expr(expr, depth)?;
                        items.push(self.push_column(expression, ty, name.clone()));
                    }
                },
                SelectItem::Aggregate { call, name } => {
                    let (expression, ty) = self.lower_aggregate(call, depth)?;
                    items.push(self.push_column(expression, ty, name.clone()));
                }
            }
        }
        Ok(items)
    }

    /// Lower a scalar expression (also used for function arguments).
    pub(crate) fn lower_select_expr(&self, expr: &SelectExpr, depth: usize) -> Result<(String, Type)> {
        match expr {
            SelectExpr::Primitive(value) => Ok((sql::jsonb_literal(value)?, value.ty())),
            SelectExpr::Parameter(name) => {
                let value = self.ctx.params.bind(name)?;
                Ok((sql::jsonb_literal(value)?, value.ty()))
            }
            SelectExpr::Path(path) => {
                let resolved = self.resolve_scalar_path(path, depth)?;
                Ok((resolved.extract(), resolved.ty))
            }
            SelectExpr::Function(call) => self.lower_function(call, depth + 1),
        }
    }

    fn lower_aggregate(&self, call: &AggregateCall, depth: usize) -> Result<(String, Type)> {
        match call {
            AggregateCall::CountAll => Ok((sql::to_jsonb("COUNT(*)"), Type::integer())),
            AggregateCall::Count { distinct, path } => {
                let resolved = self.resolve_path(path, depth)?;
                let modifier = if *distinct { "DISTINCT " } else { "" };
                Ok((
                    sql::to_jsonb(&format!("COUNT({modifier}{})", resolved.extract())),
                    Type::integer(),
                ))
            }
            AggregateCall::Sum(path) => self.numeric_aggregate("SUM", path, depth),
            AggregateCall::Avg(path) => self.numeric_aggregate("AVG", path, depth),
            AggregateCall::Min(path) => self.numeric_aggregate("MIN", path, depth),
            AggregateCall::Max(path) => self.numeric_aggregate("MAX", path, depth),
        }
    }

    /// SUM/AVG/MIN/MAX accept Integer or Float and keep the input type.
    fn numeric_aggregate(
        &self,
        function: &str,
        path: &ObjectPath,
        depth: usize,
    ) -> Result<(String, Type)> {
        let resolved = self.resolve_path(path, depth)?;
        let Some(kind) = resolved.ty.as_primitive().filter(|kind| kind.is_numeric()) else {
            return Err(BuildError::invalid_type(format!(
                "{function} requires a numeric path, {} yields {}",
                path.display(),
                resolved.ty
            )));
        };
        let value = sql::as_number(&resolved.extract(), kind);
        let aggregate = sql::as_number(&format!("{function}({value})"), kind);
        Ok((sql::to_jsonb(&aggregate), resolved.ty))
    }

    /// `SELECT e`: a bare name that refers to a bound table.
    fn bare_table(&self, expr: &SelectExpr) -> Option<Table> {
        match expr {
            SelectExpr::Path(path) if path.is_bare() => self.table(&path.root).cloned(),
            _ => None,
        }
    }

    fn push_table(&mut self, table: &Table, name: Option<String>) -> String {
        self.push_column(table.document(), table.ty.clone(), name)
    }

    fn push_column(&mut self, expression: String, ty: Type, name: Option<String>) -> String {
        let alias = self.next_column_alias();
        self.columns.push(Column {
            ty,
            name,
            source: alias.clone(),
        });
        format!("{expression} AS {alias}")
    }
}
