//! INSERT execution with constraint enforcement and ON CONFLICT handling.
//!
//! Follows a phased read-then-write shape: source rows are evaluated
//! against an immutable catalog borrow first, then applied to a working
//! copy of the table that is committed by swap only if every row passes
//! its checks; a failed statement leaves the table untouched.

use super::expression::{evaluate, CteScope, Environment, Scope};
use super::helpers::{
    check_row_constraints, project_returning, require_table, scan_conflict, unique_rules,
};
use super::select::execute_select;
use super::ExecutionResult;
use crate::catalog::{Database, TableData};
use crate::error::{Error, Result};
use crate::parsing::ast::dml::{InsertSource, OnConflict};
use crate::parsing::ast::Expression;
use crate::types::coercion::coerce_row;
use crate::types::context::ExecutionContext;
use crate::types::schema::Table;
use crate::types::{DataType, Row, Value};
use std::collections::BTreeMap;

/// A cell value awaiting the write phase: either evaluated, or a SERIAL
/// slot to fill from the table's counter.
enum Pending {
    Value(Value),
    Serial,
}

type PendingRow = Vec<Pending>;

pub fn execute_insert(
    table: &str,
    columns: &Option<Vec<String>>,
    source: &InsertSource,
    on_conflict: &Option<OnConflict>,
    returning: &Option<Vec<(Expression, Option<String>)>>,
    db: &mut Database,
    context: &ExecutionContext,
) -> Result<ExecutionResult> {
    require_table(db, table)?;
    let schema = db.get_table(table)?.schema.clone();

    // Phase 1: resolve target columns and evaluate every source row.
    let targets = target_columns(&schema, columns)?;
    let pending = evaluate_source(&schema, &targets, source, db, context)?;

    // Phase 2: apply to a working copy, committed only on full success.
    let mut data = db.get_table(table)?.clone();
    let mut affected = Vec::new();
    let mut count = 0;

    for row in pending {
        let row = fill_serials(row, &schema, &mut data);
        let row = coerce_row(row, &schema)?;
        schema.validate_row(&row)?;
        check_row_constraints(&schema, &row, db, context)?;

        match find_conflict(&schema, &data.rows, &row) {
            None => {
                data.rows.push(row.clone());
                count += 1;
                affected.push(row);
            }
            Some((rule_index, existing)) => {
                let rules = unique_rules(&schema);
                let rule = &rules[rule_index];
                match on_conflict {
                    None => return Err(rule.violation()),
                    Some(OnConflict::DoNothing { target }) => {
                        if !target.is_empty() && !target_matches(target, &rule.column_names(&schema))
                        {
                            return Err(rule.violation());
                        }
                        // Skipped silently; not part of RETURNING either.
                    }
                    Some(OnConflict::DoUpdate { target, set }) => {
                        if target.is_empty()
                            || !target_matches(target, &rule.column_names(&schema))
                        {
                            return Err(rule.violation());
                        }
                        let updated =
                            apply_conflict_update(&schema, set, &data, existing, db, context)?;
                        let updated = coerce_row(updated, &schema)?;
                        schema.validate_row(&updated)?;
                        check_row_constraints(&schema, &updated, db, context)?;
                        for rule in &unique_rules(&schema) {
                            if scan_conflict(&data.rows, &updated, rule, Some(existing)).is_some() {
                                return Err(rule.violation());
                            }
                        }
                        data.rows[existing] = updated.clone();
                        count += 1;
                        affected.push(updated);
                    }
                }
            }
        }
    }

    // Commit.
    *db.get_table_mut(table)? = data;
    db.mark_stale(table);

    match returning {
        Some(items) => project_returning(items, &schema, &affected, db, context),
        None => Ok(ExecutionResult::modified("INSERT", count)),
    }
}

/// Maps the INSERT column list to schema indexes; None means all columns
/// in declaration order.
fn target_columns(schema: &Table, columns: &Option<Vec<String>>) -> Result<Vec<usize>> {
    match columns {
        None => Ok((0..schema.columns.len()).collect()),
        Some(names) => {
            let mut indexes = Vec::with_capacity(names.len());
            for name in names {
                let index = schema
                    .column_index(name)
                    .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
                if indexes.contains(&index) {
                    return Err(Error::DuplicateColumn(name.clone()));
                }
                indexes.push(index);
            }
            Ok(indexes)
        }
    }
}

/// Evaluates the INSERT source into full-width pending rows, applying
/// column defaults for omitted columns and DEFAULT cells.
fn evaluate_source(
    schema: &Table,
    targets: &[usize],
    source: &InsertSource,
    db: &Database,
    context: &ExecutionContext,
) -> Result<Vec<PendingRow>> {
    let ctes = CteScope::root();
    let env = Environment::new(Some(db), &ctes, context);

    let mut pending = Vec::new();
    match source {
        InsertSource::Values(rows) => {
            for row in rows {
                if row.len() != targets.len() {
                    return Err(Error::InvalidValue(format!(
                        "INSERT row has {} values for {} columns",
                        row.len(),
                        targets.len()
                    )));
                }
                let mut provided: BTreeMap<usize, Option<Value>> = BTreeMap::new();
                for (cell, &target) in row.iter().zip(targets) {
                    let value = cell
                        .as_ref()
                        .map(|expr| evaluate(expr, &env))
                        .transpose()?;
                    provided.insert(target, value);
                }
                pending.push(build_row(schema, &provided, &env)?);
            }
        }
        InsertSource::Select(query) => {
            let relation = execute_select(query, &env)?;
            if relation.columns.len() != targets.len() {
                return Err(Error::InvalidValue(format!(
                    "INSERT query has {} columns for {} target columns",
                    relation.columns.len(),
                    targets.len()
                )));
            }
            for row in relation.rows {
                let mut provided: BTreeMap<usize, Option<Value>> = BTreeMap::new();
                for (value, &target) in row.into_iter().zip(targets) {
                    provided.insert(target, Some(value));
                }
                pending.push(build_row(schema, &provided, &env)?);
            }
        }
        InsertSource::DefaultValues => {
            pending.push(build_row(schema, &BTreeMap::new(), &env)?);
        }
    }
    Ok(pending)
}

/// Builds one full-width pending row: provided values win, then column
/// defaults, then SERIAL slots, then NULL. NOT NULL violations surface in
/// the validation step of the write phase.
fn build_row(
    schema: &Table,
    provided: &BTreeMap<usize, Option<Value>>,
    env: &Environment,
) -> Result<PendingRow> {
    let mut row = Vec::with_capacity(schema.columns.len());
    for (index, column) in schema.columns.iter().enumerate() {
        let cell = match provided.get(&index) {
            Some(Some(value)) => Pending::Value(value.clone()),
            // Omitted column or an explicit DEFAULT cell.
            Some(None) | None => match &column.default {
                Some(default) => Pending::Value(evaluate(default, env)?),
                None if column.data_type == DataType::Serial => Pending::Serial,
                None => Pending::Value(Value::Null),
            },
        };
        row.push(cell);
    }
    Ok(row)
}

/// Resolves SERIAL slots from the table's counters.
fn fill_serials(row: PendingRow, schema: &Table, data: &mut TableData) -> Row {
    row.into_iter()
        .zip(schema.columns.iter())
        .map(|(cell, column)| match cell {
            Pending::Value(value) => value,
            Pending::Serial => Value::Serial(data.next_serial(&column.name)),
        })
        .collect()
}

/// Scans all uniqueness rules in order (UNIQUE before PRIMARY KEY) for a
/// conflicting row. Returns the rule index and the conflicting row index.
fn find_conflict(schema: &Table, rows: &[Row], candidate: &Row) -> Option<(usize, usize)> {
    for (rule_index, rule) in unique_rules(schema).iter().enumerate() {
        if let Some(existing) = scan_conflict(rows, candidate, rule, None) {
            return Some((rule_index, existing));
        }
    }
    None
}

/// Whether the ON CONFLICT target names exactly the rule's column set.
fn target_matches(target: &[String], rule_columns: &[String]) -> bool {
    target.len() == rule_columns.len() && target.iter().all(|c| rule_columns.contains(c))
}

/// Applies the DO UPDATE SET assignments to the conflicting row. The old
/// row is in scope, so SET expressions see the conflicting row's values.
fn apply_conflict_update(
    schema: &Table,
    set: &BTreeMap<String, Option<Expression>>,
    data: &TableData,
    existing: usize,
    db: &Database,
    context: &ExecutionContext,
) -> Result<Row> {
    let ctes = CteScope::root();
    let env = Environment::new(Some(db), &ctes, context);
    let columns = schema.column_names();
    let old_row = &data.rows[existing];
    let scoped = env.with_scope(Scope {
        label: Some(&schema.name),
        columns: &columns,
        row: old_row,
    });

    let mut updated = old_row.clone();
    for (column, expr) in set {
        let index = schema
            .column_index(column)
            .ok_or_else(|| Error::ColumnNotFound(column.clone()))?;
        updated[index] = match expr {
            Some(expr) => evaluate(expr, &scoped)?,
            None => match &schema.columns[index].default {
                Some(default) => evaluate(default, &scoped)?,
                None => Value::Null,
            },
        };
    }
    Ok(updated)
}
