//! DELETE execution.

use super::expression::{evaluate, CteScope, Environment, Scope};
use super::helpers::{project_returning, require_table};
use super::ExecutionResult;
use crate::catalog::Database;
use crate::error::Result;
use crate::parsing::ast::Expression;
use crate::types::context::ExecutionContext;
use crate::types::evaluator::truth;
use crate::types::Row;

pub fn execute_delete(
    table: &str,
    predicate: &Option<Expression>,
    returning: &Option<Vec<(Expression, Option<String>)>>,
    db: &mut Database,
    context: &ExecutionContext,
) -> Result<ExecutionResult> {
    require_table(db, table)?;
    let schema = db.get_table(table)?.schema.clone();
    let columns = schema.column_names();

    // Phase 1: find the rows where the predicate is TRUE.
    let ctes = CteScope::root();
    let env = Environment::new(Some(db), &ctes, context);
    let mut doomed = Vec::new();
    for (row_index, row) in db.get_table(table)?.rows.iter().enumerate() {
        let matches = match predicate {
            Some(predicate) => {
                let scoped = env.with_scope(Scope {
                    label: Some(&schema.name),
                    columns: &columns,
                    row,
                });
                truth(&evaluate(predicate, &scoped)?)?.is_true()
            }
            None => true,
        };
        if matches {
            doomed.push(row_index);
        }
    }

    // Phase 2: remove them. Serial counters are never reset.
    let data = db.get_table_mut(table)?;
    let mut deleted: Vec<Row> = Vec::with_capacity(doomed.len());
    let mut kept = Vec::with_capacity(data.rows.len() - doomed.len());
    for (row_index, row) in std::mem::take(&mut data.rows).into_iter().enumerate() {
        if doomed.contains(&row_index) {
            deleted.push(row);
        } else {
            kept.push(row);
        }
    }
    data.rows = kept;
    db.mark_stale(table);

    match returning {
        Some(items) => project_returning(items, &schema, &deleted, db, context),
        None => Ok(ExecutionResult::modified("DELETE", deleted.len())),
    }
}
