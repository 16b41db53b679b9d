//! FROM and JOIN binding.

use crate::builder::SelectBuilder;
use crate::error::{BuildError, Result};
use crate::sql::{self, PAYLOAD_COLUMN};
use crate::syntax::{FromClause, JoinClause, JoinKind};
use crate::tables::{Table, TableOrigin, join_rule, physical_table};

impl SelectBuilder<'_> {
    /// Bind the FROM source: a table-backed RM class or a prepared table.
    pub(crate) fn bind_from(&mut self, from: &FromClause) -> Result<()> {
        let ty = match self.ctx.catalog.resolve_type(&from.class) {
            Ok(ty) => ty,
            Err(_) => return self.bind_prepared(from),
        };
        let table_name = physical_table(&from.class, from.all_versions)
            .ok_or_else(|| BuildError::from_clause_type_mismatch(&from.class))?;

        let source = self.next_source_alias();
        self.from = format!("{table_name} {source}");
        tracing::trace!(class = %from.class, %source, "Bound FROM source");
        self.tables.push(Table {
            ty,
            name: from.alias.clone().unwrap_or_else(|| from.class.clone()),
            source,
            column: PAYLOAD_COLUMN.to_string(),
            origin: TableOrigin::Document,
        });
        Ok(())
    }

    pub(crate) fn bind_join(&mut self, join: &JoinClause) -> Result<()> {
        let ty = self.ctx.catalog.resolve_type(&join.class)?;
        let Some(class) = ty.as_class().map(str::to_string) else {
            return Err(BuildError::invalid_type(format!(
                "cannot join primitive type {}",
                join.class
            )));
        };
        let name = join.alias.clone().unwrap_or_else(|| join.class.clone());

        let table = match &join.kind {
            JoinKind::On { source } => self.join_on(source, &class, join.all_versions)?,
            JoinKind::In { source } => {
                let anchor = self
                    .table(source)
                    .ok_or_else(|| BuildError::unknown_table(source))?;
                if anchor.ty.as_class().is_none() {
                    return Err(BuildError::invalid_type(format!(
                        "cannot search inside {source} of type {}",
                        anchor.ty
                    )));
                }
                let document = anchor.document();
                self.join_containment(&document, "", &class)
            }
            JoinKind::At { path } => {
                if self.table(&path.root).is_none() {
                    return Err(BuildError::unknown_table(&path.root));
                }
                let anchor = self.resolve_path(path, self.depth + 1)?;
                if anchor.ty.is_scalar() {
                    return Err(BuildError::invalid_type(format!(
                        "containment anchor {} yields primitive type {}",
                        path.display(),
                        anchor.ty
                    )));
                }
                self.join_containment(&anchor.document, &anchor.fragment, &class)
            }
        };

        tracing::trace!(class = %class, source = %table.source, "Bound JOIN target");
        self.tables.push(Table { ty, name, ..table });
        Ok(())
    }

    /// Structural join between two document tables.
    fn join_on(&mut self, source: &str, class: &str, all_versions: bool) -> Result<Table> {
        let anchor = self
            .table(source)
            .ok_or_else(|| BuildError::unknown_table(source))?;
        let anchor_class = match (anchor.origin, anchor.ty.as_class()) {
            (TableOrigin::Document, Some(anchor_class)) => anchor_class.to_string(),
            _ => {
                return Err(BuildError::unknown_table(format!(
                    "{source} cannot be joined structurally"
                )));
            }
        };
        let anchor_source = anchor.source.clone();

        let rule = join_rule(&anchor_class, class).ok_or_else(|| {
            BuildError::unknown_table(format!("no join from {anchor_class} to {class}"))
        })?;
        let table_name = physical_table(class, all_versions)
            .ok_or_else(|| BuildError::unknown_table(class))?;

        let alias = self.next_source_alias();
        self.joins
            .push(rule.render(&anchor_source, &table_name, &alias));
        Ok(Table {
            ty: openehr_rm::Type::class(class),
            name: String::new(),
            source: alias,
            column: PAYLOAD_COLUMN.to_string(),
            origin: TableOrigin::Document,
        })
    }

    /// Lateral search for nodes of `class` below `scope` in `document`.
    fn join_containment(&mut self, document: &str, scope: &str, class: &str) -> Table {
        let alias = self.next_source_alias();
        let search = sql::extract_all(
            document,
            &format!("{scope}{}", sql::descendants_of_type(class)),
        );
        self.joins.push(format!(
            "CROSS JOIN LATERAL {search} AS {alias}({PAYLOAD_COLUMN})"
        ));
        self.implicit_conditions
            .push(sql::contains_type(document, scope, class));
        Table {
            ty: openehr_rm::Type::class(class),
            name: String::new(),
            source: alias,
            column: PAYLOAD_COLUMN.to_string(),
            origin: TableOrigin::Containment,
        }
    }
}
