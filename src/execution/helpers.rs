//! Shared DML helpers: constraint enforcement and RETURNING projection.

use super::expression::{evaluate, CteScope, Environment, Scope};
use super::select::output_columns;
use super::{infer_types, ExecutionResult};
use crate::catalog::Database;
use crate::error::{Error, Result};
use crate::parsing::ast::Expression;
use crate::types::context::ExecutionContext;
use crate::types::evaluator::{truth, Truth};
use crate::types::schema::Table;
use crate::types::Row;

/// A uniqueness rule over a column set: column-level or table-level
/// UNIQUE, or the primary key.
pub struct UniqueRule {
    pub name: String,
    pub columns: Vec<usize>,
    pub primary: bool,
}

impl UniqueRule {
    /// The column names this rule spans, for ON CONFLICT target matching.
    pub fn column_names(&self, schema: &Table) -> Vec<String> {
        self.columns
            .iter()
            .map(|&i| schema.columns[i].name.clone())
            .collect()
    }

    pub fn violation(&self) -> Error {
        if self.primary {
            Error::PrimaryKeyViolation(self.name.clone())
        } else {
            Error::UniqueConstraintViolation(self.name.clone())
        }
    }
}

/// The table's uniqueness rules, UNIQUE constraints before the primary
/// key (checks apply in that order).
pub fn unique_rules(schema: &Table) -> Vec<UniqueRule> {
    let mut rules: Vec<UniqueRule> = schema
        .unique_sets()
        .into_iter()
        .map(|(name, columns)| UniqueRule {
            name,
            columns,
            primary: false,
        })
        .collect();
    if let Some(columns) = schema.primary_key() {
        rules.push(UniqueRule {
            name: format!("{}_pkey", schema.name),
            columns,
            primary: true,
        });
    }
    rules
}

/// Finds a row violating the rule against the candidate. NULLs are
/// distinct, so a candidate with any NULL in the column set never
/// conflicts (PostgreSQL semantics).
pub fn scan_conflict(
    rows: &[Row],
    candidate: &Row,
    rule: &UniqueRule,
    exclude: Option<usize>,
) -> Option<usize> {
    if rule.columns.iter().any(|&i| candidate[i].is_null()) {
        return None;
    }
    rows.iter().enumerate().position(|(index, row)| {
        Some(index) != exclude
            && rule
                .columns
                .iter()
                .all(|&i| !row[i].is_null() && row[i] == candidate[i])
    })
}

/// Evaluates every CHECK constraint against the row. A CHECK admits the
/// row when it is TRUE or NULL; only FALSE rejects.
pub fn check_row_constraints(
    schema: &Table,
    row: &Row,
    db: &Database,
    context: &ExecutionContext,
) -> Result<()> {
    let ctes = CteScope::root();
    let columns = schema.column_names();
    let base = Environment::new(Some(db), &ctes, context);
    let env = base.with_scope(Scope {
        label: Some(&schema.name),
        columns: &columns,
        row,
    });
    for (name, expr) in schema.check_constraints() {
        if truth(&evaluate(expr, &env)?)? == Truth::False {
            return Err(Error::CheckConstraintViolation(name));
        }
    }
    Ok(())
}

/// Projects RETURNING items over the affected rows.
pub fn project_returning(
    items: &[(Expression, Option<String>)],
    schema: &Table,
    rows: &[Row],
    db: &Database,
    context: &ExecutionContext,
) -> Result<ExecutionResult> {
    let ctes = CteScope::root();
    let env = Environment::new(Some(db), &ctes, context);
    let schema_columns = schema.column_names();
    let columns = output_columns(items, &schema_columns);

    let mut out_rows = Vec::with_capacity(rows.len());
    for row in rows {
        let scoped = env.with_scope(Scope {
            label: Some(&schema.name),
            columns: &schema_columns,
            row,
        });
        let mut out = Vec::with_capacity(items.len());
        for (expr, _) in items {
            match expr {
                Expression::All => out.extend(row.iter().cloned()),
                expr => out.push(evaluate(expr, &scoped)?),
            }
        }
        out_rows.push(out);
    }

    let types = infer_types(columns.len(), &out_rows);
    Ok(ExecutionResult::Select {
        columns,
        types,
        rows: out_rows,
    })
}

/// Requires the name to resolve to a base table, not a view.
pub fn require_table(db: &Database, name: &str) -> Result<()> {
    if db.tables.contains_key(name) {
        return Ok(());
    }
    if db.views.contains_key(name) || db.materialized.contains_key(name) {
        return Err(Error::NotATable(name.to_string()));
    }
    Err(Error::TableNotFound(name.to_string()))
}
