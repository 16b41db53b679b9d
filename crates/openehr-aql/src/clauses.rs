//! GROUP BY, ORDER BY, LIMIT/OFFSET and UNION.

use openehr_rm::Type;

use crate::builder::{SelectBuilder, build_select};
use crate::error::{BuildError, Result};
use crate::syntax::{LimitClause, ObjectPath, OrderItem, Primitive, RowBound, SortDirection, UnionClause};

impl SelectBuilder<'_> {
    pub(crate) fn group_by(&self, items: &[ObjectPath], depth: usize) -> Result<Vec<String>> {
        items
            .iter()
            .map(|path| self.sort_key(path, depth))
            .collect()
    }

    /// ORDER BY items; after a UNION only output column names are valid.
    pub(crate) fn order_by(
        &self,
        items: &[OrderItem],
        after_union: bool,
        depth: usize,
    ) -> Result<Vec<String>> {
        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            let key = if after_union {
                self.output_column(&item.path).ok_or_else(|| {
                    BuildError::unknown_identifier(format!(
                        "{} is not an output column of the UNION",
                        item.path.display()
                    ))
                })?
            } else {
                self.sort_key(&item.path, depth)?
            };
            let direction = match item.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            rendered.push(format!("{key} {direction}"));
        }
        Ok(rendered)
    }

    /// `LIMIT n` and `OFFSET m` fragments, each present only when bound.
    pub(crate) fn limit(&self, clause: &LimitClause) -> Result<Vec<String>> {
        let mut fragments = Vec::with_capacity(2);
        if let Some(bound) = &clause.limit {
            fragments.push(format!("LIMIT {}", self.row_bound(bound)?));
        }
        if let Some(bound) = &clause.offset {
            fragments.push(format!("OFFSET {}", self.row_bound(bound)?));
        }
        Ok(fragments)
    }

    /// Build the right-hand side and check it against this SELECT's columns.
    pub(crate) fn union(&self, clause: &UnionClause, depth: usize) -> Result<String> {
        let rhs = build_select(self.ctx, &clause.query, depth + 1)?;

        if rhs.columns.len() != self.columns.len() {
            return Err(BuildError::union_column_mismatch(format!(
                "left side has {} columns, right side has {}",
                self.columns.len(),
                rhs.columns.len()
            )));
        }
        for (left, right) in self.columns.iter().zip(&rhs.columns) {
            if left.ty != right.ty {
                return Err(BuildError::union_column_mismatch(format!(
                    "{} is {} on the left and {} on the right",
                    left.source, left.ty, right.ty
                )));
            }
        }

        let keyword = if clause.all { "UNION ALL" } else { "UNION" };
        let nested = !clause.query.order_by.is_empty() || clause.query.limit.is_some();
        Ok(if nested {
            format!("{keyword} ({})", rhs.sql)
        } else {
            format!("{keyword} {}", rhs.sql)
        })
    }

    /// A bare name matching an explicit output column name, else a path.
    fn sort_key(&self, path: &ObjectPath, depth: usize) -> Result<String> {
        if let Some(column) = self.output_column(path) {
            return Ok(column);
        }
        Ok(self.resolve_path(path, depth)?.extract())
    }

    fn output_column(&self, path: &ObjectPath) -> Option<String> {
        if !path.is_bare() {
            return None;
        }
        self.columns
            .iter()
            .find(|column| column.name.as_deref() == Some(path.root.as_str()))
            .map(|column| column.source.clone())
    }

    fn row_bound(&self, bound: &RowBound) -> Result<i64> {
        let value = match bound {
            RowBound::Literal(value) => *value,
            RowBound::Parameter(name) => match self.ctx.params.bind(name)? {
                Primitive::Integer(value) => *value,
                other => return Err(BuildError::type_mismatch(other.ty(), Type::integer())),
            },
        };
        if value < 0 {
            return Err(BuildError::invalid_type(format!(
                "row bound must not be negative, got {value}"
            )));
        }
        Ok(value)
    }
}
