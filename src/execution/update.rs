//! UPDATE execution.
//!
//! SET expressions are evaluated against the pre-update row snapshot, not
//! left-to-right over a mutating row. All updates land on a working copy
//! of the table; constraints are re-checked on every resulting row and
//! any violation aborts the whole statement.

use super::expression::{evaluate, CteScope, Environment, Scope};
use super::helpers::{
    check_row_constraints, project_returning, require_table, scan_conflict, unique_rules,
};
use super::ExecutionResult;
use crate::catalog::Database;
use crate::error::{Error, Result};
use crate::parsing::ast::Expression;
use crate::types::coercion::coerce_row;
use crate::types::context::ExecutionContext;
use crate::types::evaluator::truth;
use crate::types::{DataType, Row, Value};
use std::collections::BTreeMap;

enum Pending {
    Row(Row),
    /// The row still needs a SERIAL value at the given column.
    NeedsSerial(Row, Vec<usize>),
}

pub fn execute_update(
    table: &str,
    set: &BTreeMap<String, Option<Expression>>,
    predicate: &Option<Expression>,
    returning: &Option<Vec<(Expression, Option<String>)>>,
    db: &mut Database,
    context: &ExecutionContext,
) -> Result<ExecutionResult> {
    require_table(db, table)?;
    let schema = db.get_table(table)?.schema.clone();
    let columns = schema.column_names();

    // Resolve assignment targets up front.
    let mut assignments = Vec::new();
    for (column, expr) in set {
        let index = schema
            .column_index(column)
            .ok_or_else(|| Error::ColumnNotFound(column.clone()))?;
        assignments.push((index, expr));
    }

    // Phase 1: find matching rows and compute their replacements against
    // the pre-update snapshot.
    let ctes = CteScope::root();
    let env = Environment::new(Some(db), &ctes, context);
    let mut updates: Vec<(usize, Pending)> = Vec::new();
    for (row_index, row) in db.get_table(table)?.rows.iter().enumerate() {
        let scoped = env.with_scope(Scope {
            label: Some(&schema.name),
            columns: &columns,
            row,
        });
        if let Some(predicate) = predicate {
            if !truth(&evaluate(predicate, &scoped)?)?.is_true() {
                continue;
            }
        }

        let mut updated = row.clone();
        let mut serial_slots = Vec::new();
        for (index, expr) in &assignments {
            updated[*index] = match expr {
                Some(expr) => evaluate(expr, &scoped)?,
                None => match &schema.columns[*index].default {
                    Some(default) => evaluate(default, &scoped)?,
                    None if schema.columns[*index].data_type == DataType::Serial => {
                        serial_slots.push(*index);
                        Value::Null
                    }
                    None => Value::Null,
                },
            };
        }
        let pending = if serial_slots.is_empty() {
            Pending::Row(updated)
        } else {
            Pending::NeedsSerial(updated, serial_slots)
        };
        updates.push((row_index, pending));
    }

    // Phase 2: apply on a working copy, validate, then commit by swap.
    let mut data = db.get_table(table)?.clone();
    let mut touched = Vec::new();
    for (row_index, pending) in updates {
        let row = match pending {
            Pending::Row(row) => row,
            Pending::NeedsSerial(mut row, slots) => {
                for index in slots {
                    row[index] = Value::Serial(data.next_serial(&schema.columns[index].name));
                }
                row
            }
        };
        let row = coerce_row(row, &schema)?;
        schema.validate_row(&row)?;
        check_row_constraints(&schema, &row, db, context)?;
        data.rows[row_index] = row;
        touched.push(row_index);
    }

    // Uniqueness is checked against the fully updated table so that
    // updates which permute key values within the statement still pass.
    for &row_index in &touched {
        for rule in &unique_rules(&schema) {
            if scan_conflict(&data.rows, &data.rows[row_index], rule, Some(row_index)).is_some() {
                return Err(rule.violation());
            }
        }
    }

    let affected: Vec<Row> = touched.iter().map(|&i| data.rows[i].clone()).collect();
    let count = affected.len();
    *db.get_table_mut(table)? = data;
    db.mark_stale(table);

    match returning {
        Some(items) => project_returning(items, &schema, &affected, db, context),
        None => Ok(ExecutionResult::modified("UPDATE", count)),
    }
}
