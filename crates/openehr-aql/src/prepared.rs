//! Prepared (active) tables: named stored queries used as FROM sources.

use crate::builder::{Context, SelectBuilder, build_select};
use crate::error::{BuildError, Result};
use crate::params::Parameters;
use crate::syntax::FromClause;
use crate::tables::{Table, TableOrigin};

impl SelectBuilder<'_> {
    /// Expand a prepared table and expose its output columns as tables.
    ///
    /// The stored query is rebuilt without parameters or other prepared
    /// tables; only its column schema is kept, the caller binds the
    /// materialized rows to the prepared table's alias.
    pub(crate) fn bind_prepared(&mut self, from: &FromClause) -> Result<()> {
        let prepared = self
            .ctx
            .prepared
            .iter()
            .find(|prepared| prepared.name == from.class)
            .ok_or_else(|| BuildError::unknown_active_table(&from.class))?;

        let empty = Parameters::new();
        let ctx = Context {
            catalog: self.ctx.catalog,
            config: self.ctx.config,
            params: &empty,
            prepared: &[],
        };
        let compiled = build_select(ctx, &prepared.query, self.depth + 1)?;

        tracing::trace!(
            name = %prepared.name,
            source = %prepared.source,
            columns = compiled.columns.len(),
            "Expanded prepared table"
        );

        self.from = prepared.source.clone();
        for column in compiled.columns {
            self.tables.push(Table {
                ty: column.ty,
                name: column.name.unwrap_or_else(|| column.source.clone()),
                source: prepared.source.clone(),
                column: column.source,
                origin: TableOrigin::Prepared,
            });
        }
        Ok(())
    }
}
