//! SELECT build pipeline.
//!
//! One [`SelectBuilder`] owns the symbol table of a single SELECT: tables are
//! bound in declaration order (FROM, then each JOIN), after which WHERE,
//! projection, GROUP BY, UNION, ORDER BY and LIMIT are lowered against them.
//! UNION right-hand sides and prepared tables get a fresh builder through
//! [`build_select`]. IN-subqueries continue the enclosing statement's source
//! aliases so no `source_N` is reused inside one statement.

use openehr_rm::Catalog;

use crate::config::CompilerConfig;
use crate::error::{BuildError, Result};
use crate::params::Parameters;
use crate::sql;
use crate::syntax::{ObjectPath, SelectQuery};
use crate::tables::{Column, CompiledQuery, PreparedTable, Table};

/// Read-only inputs shared by every builder of one compilation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context<'a> {
    pub catalog: &'a Catalog,
    pub config: &'a CompilerConfig,
    pub params: &'a Parameters,
    pub prepared: &'a [PreparedTable],
}

impl Context<'_> {
    pub(crate) fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.config.max_depth {
            return Err(BuildError::query_too_complex(format!(
                "nesting depth exceeds {}",
                self.config.max_depth
            )));
        }
        Ok(())
    }
}

/// A path resolved against a bound table.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedPath {
    pub document: String,
    pub fragment: String,
    pub ty: openehr_rm::Type,
}

impl ResolvedPath {
    /// Extract-first expression yielding the value at the path.
    pub fn extract(&self) -> String {
        sql::extract_first(&self.document, &self.fragment)
    }
}

pub(crate) struct SelectBuilder<'a> {
    pub(crate) ctx: Context<'a>,
    pub(crate) depth: usize,
    pub(crate) tables: Vec<Table>,
    pub(crate) columns: Vec<Column>,
    pub(crate) from: String,
    pub(crate) joins: Vec<String>,
    /// Predicates contributed by containment joins, ANDed into WHERE.
    pub(crate) implicit_conditions: Vec<String>,
    next_source: usize,
}

/// Build one SELECT statement (the recursive entry point).
pub(crate) fn build_select(
    ctx: Context<'_>,
    query: &SelectQuery,
    depth: usize,
) -> Result<CompiledQuery> {
    ctx.check_depth(depth)?;
    SelectBuilder::new(ctx, depth).build(query)
}

impl SelectBuilder<'_> {
    /// Build a statement nested inside this one (an IN-subquery).
    pub(crate) fn build_nested(&mut self, query: &SelectQuery, depth: usize) -> Result<CompiledQuery> {
        self.ctx.check_depth(depth)?;
        let mut nested = SelectBuilder::new(self.ctx, depth);
        nested.next_source = self.next_source;
        let compiled = nested.build(query)?;
        self.next_source = nested.next_source;
        Ok(compiled)
    }
}

impl<'a> SelectBuilder<'a> {
    fn new(ctx: Context<'a>, depth: usize) -> Self {
        Self {
            ctx,
            depth,
            tables: Vec::new(),
            columns: Vec::new(),
            from: String::new(),
            joins: Vec::new(),
            implicit_conditions: Vec::new(),
            next_source: 0,
        }
    }

    fn build(&mut self, query: &SelectQuery) -> Result<CompiledQuery> {
        let depth = self.depth + 1;

        self.bind_from(&query.from)?;
        for join in &query.joins {
            self.bind_join(join)?;
        }

        let condition = match &query.where_ {
            Some(condition) => Some(self.lower_condition(condition, depth)?),
            None => None,
        };
        let projection = self.project(&query.select, depth)?;
        let group_by = self.group_by(&query.group_by, depth)?;
        let union = match &query.union {
            Some(union) => Some(self.union(union, depth)?),
            None => None,
        };
        let order_by = self.order_by(&query.order_by, union.is_some(), depth)?;
        let bounds = match &query.limit {
            Some(limit) => self.limit(limit)?,
            None => Vec::new(),
        };

        let mut sql = String::from("SELECT ");
        if query.select.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&projection.join(", "));
        sql.push_str(" FROM ");
        sql.push_str(&self.from);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        let mut conjuncts = self.implicit_conditions.clone();
        if let Some(condition) = condition {
            if conjuncts.is_empty() {
                conjuncts.push(condition);
            } else {
                conjuncts.push(format!("({condition})"));
            }
        }
        if !conjuncts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conjuncts.join(" AND "));
        }
        if !group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_by.join(", "));
        }
        if let Some(union) = union {
            sql.push(' ');
            sql.push_str(&union);
        }
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by.join(", "));
        }
        for bound in bounds {
            sql.push(' ');
            sql.push_str(&bound);
        }

        tracing::trace!(
            depth = self.depth,
            tables = self.tables.len(),
            columns = self.columns.len(),
            "Built SELECT"
        );

        Ok(CompiledQuery {
            sql,
            columns: std::mem::take(&mut self.columns),
        })
    }

    /// Next physical source alias (`source_N`).
    pub(crate) fn next_source_alias(&mut self) -> String {
        let alias = format!("source_{}", self.next_source);
        self.next_source += 1;
        alias
    }

    /// Next physical output alias (`col_N`).
    pub(crate) fn next_column_alias(&self) -> String {
        format!("col_{}", self.columns.len())
    }

    /// First bound table with the given name.
    pub(crate) fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Resolve an object path rooted at a bound table.
    pub(crate) fn resolve_path(&self, path: &ObjectPath, depth: usize) -> Result<ResolvedPath> {
        let table = self
            .table(&path.root)
            .ok_or_else(|| BuildError::unknown_identifier(&path.root))?;
        let translated = self.ctx.translate_path(
            &table.ty,
            path.condition.as_ref(),
            &path.segments,
            depth,
        )?;
        Ok(ResolvedPath {
            document: table.document(),
            fragment: translated.fragment,
            ty: translated.ty,
        })
    }

    /// Resolve a path that must yield one of the primitive kinds.
    pub(crate) fn resolve_scalar_path(
        &self,
        path: &ObjectPath,
        depth: usize,
    ) -> Result<ResolvedPath> {
        let resolved = self.resolve_path(path, depth)?;
        if !resolved.ty.is_scalar() {
            return Err(BuildError::invalid_type(format!(
                "path {} yields structured type {}",
                path.display(),
                resolved.ty
            )));
        }
        Ok(resolved)
    }
}

/// Compiles AQL syntax trees into PostgreSQL.
///
/// # Example
///
/// ```
/// use openehr_aql::{Parameters, QueryCompiler};
/// use openehr_aql::syntax::{FromClause, SelectItem, SelectQuery};
/// use openehr_rm::Catalog;
///
/// let catalog = Catalog::openehr();
/// let compiler = QueryCompiler::new(&catalog);
/// let query = SelectQuery::new(vec![SelectItem::Wildcard], FromClause::new("EHR", "e"));
/// let compiled = compiler.compile(&query, &Parameters::new(), &[]).unwrap();
/// assert_eq!(compiled.sql, "SELECT source_0.data AS col_0 FROM tbl_ehr_current source_0");
/// ```
#[derive(Debug, Clone)]
pub struct QueryCompiler<'a> {
    catalog: &'a Catalog,
    config: CompilerConfig,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self::with_config(catalog, CompilerConfig::default())
    }

    pub fn with_config(catalog: &'a Catalog, config: CompilerConfig) -> Self {
        Self { catalog, config }
    }

    /// Compile one query. `prepared` lists the named queries usable as FROM
    /// sources; it may be empty.
    pub fn compile(
        &self,
        query: &SelectQuery,
        params: &Parameters,
        prepared: &[PreparedTable],
    ) -> Result<CompiledQuery> {
        let ctx = Context {
            catalog: self.catalog,
            config: &self.config,
            params,
            prepared,
        };
        match build_select(ctx, query, 0) {
            Ok(compiled) => {
                tracing::debug!(
                    sql = %compiled.sql,
                    columns = compiled.columns.len(),
                    "Compiled AQL query"
                );
                Ok(compiled)
            }
            Err(err) => {
                tracing::debug!(code = err.code(), error = %err, "AQL compilation failed");
                Err(err)
            }
        }
    }
}
