//! openEHR Archetype Query Language (AQL) to PostgreSQL compiler.
//!
//! Takes an already-parsed AQL syntax tree ([`syntax::SelectQuery`]), bind
//! [`Parameters`] and optional [`PreparedTable`]s, validates every path and
//! operand against the openEHR reference model [`Catalog`], and produces one
//! SQL statement over `jsonb` document tables plus the typed schema of its
//! output columns.
//!
//! ```
//! use openehr_aql::syntax::{ComparisonOp, Condition, FromClause, ObjectPath, Operand, SelectItem, SelectQuery};
//! use openehr_aql::{Parameters, Primitive, QueryCompiler};
//! use openehr_rm::Catalog;
//!
//! let catalog = Catalog::openehr();
//! let query = SelectQuery::new(vec![SelectItem::Wildcard], FromClause::new("EHR", "e"))
//!     .with_where(Condition::compare(
//!         ComparisonOp::Eq,
//!         Operand::Path(ObjectPath::from_segments("e", &["ehr_id", "value"])),
//!         Operand::Parameter("ehr_id".into()),
//!     ));
//! let params = Parameters::new().with("ehr_id", Primitive::string("7d44b88c"));
//!
//! let compiled = QueryCompiler::new(&catalog).compile(&query, &params, &[]).unwrap();
//! assert_eq!(compiled.columns.len(), 1);
//! ```
//!
//! [`Catalog`]: openehr_rm::Catalog

mod builder;
mod clauses;
mod condition;
pub mod config;
pub mod error;
mod functions;
mod join;
pub mod params;
mod path;
mod prepared;
mod projection;
pub mod sql;
pub mod syntax;
pub mod tables;

pub use builder::QueryCompiler;
pub use config::{CompilerConfig, ConfigError};
pub use error::{BuildError, Result};
pub use params::Parameters;
pub use syntax::{Primitive, SelectQuery};
pub use tables::{Column, CompiledQuery, PreparedTable, Table, TableOrigin};

/// Compile `query` with the default limits.
pub fn compile(
    catalog: &openehr_rm::Catalog,
    query: &SelectQuery,
    params: &Parameters,
    prepared: &[PreparedTable],
) -> Result<CompiledQuery> {
    QueryCompiler::new(catalog).compile(query, params, prepared)
}
