//! Per-statement dispatch.

use super::expression::{CteScope, Environment};
use super::{ddl, delete, infer_types, insert, select, update, ExecutionResult};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::parsing::ast::{DmlStatement, Statement};
use crate::types::context::ExecutionContext;

/// Executes a single parsed statement against the catalog. Any failure
/// leaves the catalog exactly as it was before the statement started.
pub fn execute_statement(
    statement: &Statement,
    catalog: &mut Catalog,
    context: &ExecutionContext,
) -> Result<ExecutionResult> {
    match statement {
        Statement::Use { database } => {
            catalog.set_current(database)?;
            Ok(ExecutionResult::modified("USE", 0))
        }

        Statement::Ddl(ddl) => ddl::execute_ddl(ddl, catalog, context),

        Statement::Dml(DmlStatement::Select(query)) => {
            // Constant selects run without a current database; anything
            // touching a table fails resolution inside the pipeline.
            let db = catalog.current().ok();
            let ctes = CteScope::root();
            let env = Environment::new(db, &ctes, context);
            let relation = select::execute_select(query, &env)?;
            let types = infer_types(relation.columns.len(), &relation.rows);
            Ok(ExecutionResult::Select {
                columns: relation.columns,
                types,
                rows: relation.rows,
            })
        }

        Statement::Dml(DmlStatement::Insert {
            table,
            columns,
            source,
            on_conflict,
            returning,
        }) => insert::execute_insert(
            table,
            columns,
            source,
            on_conflict,
            returning,
            catalog.current_mut()?,
            context,
        ),

        Statement::Dml(DmlStatement::Update {
            table,
            set,
            r#where,
            returning,
        }) => update::execute_update(
            table,
            set,
            r#where,
            returning,
            catalog.current_mut()?,
            context,
        ),

        Statement::Dml(DmlStatement::Delete {
            table,
            r#where,
            returning,
        }) => delete::execute_delete(table, r#where, returning, catalog.current_mut()?, context),
    }
}
