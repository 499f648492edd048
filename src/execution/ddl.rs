//! DDL execution: databases, tables, ALTER TABLE, views and materialized
//! views. Every mutation is prepared on copies and committed only after
//! all validation passes.

use super::expression::{evaluate, CteScope, Environment};
use super::helpers::{scan_conflict, UniqueRule};
use super::select::execute_select;
use super::ExecutionResult;
use crate::catalog::{Catalog, MaterializedView, View};
use crate::error::{Error, Result};
use crate::parsing::ast::ddl::{
    AlterTableOperation, Column as AstColumn, DdlStatement, TableConstraint, TableConstraintKind,
};
use crate::types::coercion::coerce_value;
use crate::types::context::ExecutionContext;
use crate::types::evaluator::{truth, Truth};
use crate::types::schema::{Column, Table};
use crate::types::{DataType, Value};

pub fn execute_ddl(
    ddl: &DdlStatement,
    catalog: &mut Catalog,
    context: &ExecutionContext,
) -> Result<ExecutionResult> {
    match ddl {
        DdlStatement::CreateDatabase {
            name,
            if_not_exists,
        } => {
            match catalog.create_database(name) {
                Err(Error::DuplicateDatabase(_)) if *if_not_exists => {}
                result => result?,
            }
            Ok(ExecutionResult::modified("CREATE DATABASE", 0))
        }

        DdlStatement::DropDatabase { name, if_exists } => {
            match catalog.drop_database(name) {
                Err(Error::DatabaseNotFound(_)) if *if_exists => {}
                result => result?,
            }
            Ok(ExecutionResult::modified("DROP DATABASE", 0))
        }

        DdlStatement::CreateTable {
            name,
            columns,
            constraints,
            if_not_exists,
        } => {
            let db = catalog.current_mut()?;
            if *if_not_exists && db.name_in_use(name) {
                return Ok(ExecutionResult::modified("CREATE TABLE", 0));
            }
            let columns = columns.iter().map(column_from_ast).collect();
            let schema = Table::new(name.clone(), columns, constraints.clone())?;
            db.create_table(schema)?;
            Ok(ExecutionResult::modified("CREATE TABLE", 0))
        }

        DdlStatement::AlterTable { name, operation } => {
            alter_table(name, operation, catalog, context)?;
            Ok(ExecutionResult::modified("ALTER TABLE", 0))
        }

        DdlStatement::DropTable { names, if_exists } => {
            let db = catalog.current_mut()?;
            for name in names {
                match db.drop_table(name) {
                    Err(Error::TableNotFound(_)) if *if_exists => {}
                    result => result?,
                }
            }
            Ok(ExecutionResult::modified("DROP TABLE", 0))
        }

        DdlStatement::CreateView {
            name,
            query,
            materialized,
        } => {
            // Execute the defining query up front: this validates it and,
            // for a materialized view, populates the cache.
            let db = catalog.current()?;
            let ctes = CteScope::root();
            let env = Environment::new(Some(db), &ctes, context);
            let relation = execute_select(query, &env)?;

            let db = catalog.current_mut()?;
            if *materialized {
                db.create_materialized_view(MaterializedView {
                    name: name.clone(),
                    query: (**query).clone(),
                    columns: relation.columns,
                    rows: relation.rows,
                    stale: false,
                })?;
                Ok(ExecutionResult::modified("CREATE MATERIALIZED VIEW", 0))
            } else {
                db.create_view(View {
                    name: name.clone(),
                    query: (**query).clone(),
                })?;
                Ok(ExecutionResult::modified("CREATE VIEW", 0))
            }
        }

        DdlStatement::RefreshMaterializedView { name } => {
            let db = catalog.current()?;
            let query = match db.materialized.get(name) {
                Some(view) => view.query.clone(),
                None if db.views.contains_key(name) => {
                    return Err(Error::NotMaterialized(name.clone()));
                }
                None => return Err(Error::ViewNotFound(name.clone())),
            };
            let ctes = CteScope::root();
            let env = Environment::new(Some(db), &ctes, context);
            let relation = execute_select(&query, &env)?;

            let db = catalog.current_mut()?;
            let view = db
                .materialized
                .get_mut(name)
                .ok_or_else(|| Error::ViewNotFound(name.clone()))?;
            view.columns = relation.columns;
            view.rows = relation.rows;
            view.stale = false;
            Ok(ExecutionResult::modified("REFRESH MATERIALIZED VIEW", 0))
        }

        DdlStatement::DropView {
            names,
            if_exists,
            materialized,
        } => {
            let db = catalog.current_mut()?;
            for name in names {
                match db.drop_view(name, *materialized) {
                    Err(Error::ViewNotFound(_)) if *if_exists => {}
                    result => result?,
                }
            }
            Ok(ExecutionResult::modified("DROP VIEW", 0))
        }
    }
}

/// Converts a parsed column definition into a schema column. PRIMARY KEY
/// implies NOT NULL and UNIQUE; SERIAL implies NOT NULL.
fn column_from_ast(column: &AstColumn) -> Column {
    let nullable = match column.nullable {
        Some(nullable) => nullable && !column.primary_key,
        None => !column.primary_key && column.data_type != DataType::Serial,
    };
    Column {
        name: column.name.clone(),
        data_type: column.data_type.clone(),
        primary_key: column.primary_key,
        nullable,
        default: column.default.clone(),
        unique: column.unique || column.primary_key,
        check: column.check.clone(),
    }
}

fn alter_table(
    name: &str,
    operation: &AlterTableOperation,
    catalog: &mut Catalog,
    context: &ExecutionContext,
) -> Result<()> {
    // Work on a copy; the commit at the end swaps it in atomically.
    let db = catalog.current()?;
    let mut data = db.get_table(name)?.clone();
    let mut new_name: Option<String> = None;

    match operation {
        AlterTableOperation::AddColumn(column) => {
            if data.schema.column_index(&column.name).is_some() {
                return Err(Error::DuplicateColumn(column.name.clone()));
            }
            let column = {
                let mut column = column_from_ast(column);
                if column.primary_key && data.schema.primary_key().is_some() {
                    return Err(Error::InvalidValue(format!(
                        "table {} already has a primary key",
                        name
                    )));
                }
                if column.data_type == DataType::Serial {
                    column.nullable = false;
                }
                column
            };

            // Backfill existing rows: the default if any, fresh serial
            // numbers for a SERIAL column, NULL otherwise.
            let ctes = CteScope::root();
            let env = Environment::new(Some(db), &ctes, context);
            let fill = match &column.default {
                Some(default) => {
                    Some(coerce_value(evaluate(default, &env)?, &column.data_type)?)
                }
                None if column.data_type == DataType::Serial => None,
                None if !column.nullable && !data.rows.is_empty() => {
                    return Err(Error::NullConstraintViolation(column.name.clone()));
                }
                None => Some(Value::Null),
            };
            for index in 0..data.rows.len() {
                let value = match &fill {
                    Some(value) => value.clone(),
                    None => Value::Serial(data.next_serial(&column.name)),
                };
                data.rows[index].push(value);
            }
            data.schema.columns.push(column.clone());

            if let Some(check) = &column.check {
                let check_name = format!("{}_{}_check", name, column.name);
                validate_check_on_rows(&data.schema, check, &check_name, &data.rows, db, context)?;
            }
        }

        AlterTableOperation::DropColumn(column) => {
            let index = data
                .schema
                .column_index(column)
                .ok_or_else(|| Error::ColumnNotFound(column.clone()))?;

            // Any CHECK expression elsewhere that mentions the column
            // blocks the drop.
            for other in &data.schema.columns {
                if other.name == *column {
                    continue;
                }
                if let Some(check) = &other.check {
                    if check.references_column(column) {
                        return Err(Error::ExecutionError(format!(
                            "cannot drop column {}: referenced by a CHECK constraint on {}",
                            column, other.name
                        )));
                    }
                }
            }
            for constraint in &data.schema.constraints {
                let referenced = match &constraint.kind {
                    TableConstraintKind::Check(expr) => expr.references_column(column),
                    TableConstraintKind::PrimaryKey(cols) | TableConstraintKind::Unique(cols) => {
                        cols.contains(column)
                    }
                };
                if referenced {
                    return Err(Error::ExecutionError(format!(
                        "cannot drop column {}: referenced by a table constraint",
                        column
                    )));
                }
            }

            if data.schema.columns.len() == 1 {
                return Err(Error::InvalidValue(format!(
                    "cannot drop the last column of table {}",
                    name
                )));
            }
            data.schema.columns.remove(index);
            for row in &mut data.rows {
                row.remove(index);
            }
            data.serials.remove(column);
        }

        AlterTableOperation::AddConstraint(constraint) => {
            add_constraint(&mut data, constraint, catalog.current()?, context)?;
        }

        AlterTableOperation::DropConstraint(constraint_name) => {
            let index = data
                .schema
                .constraints
                .iter()
                .position(|c| c.name.as_deref() == Some(constraint_name))
                .ok_or_else(|| Error::ConstraintNotFound(constraint_name.clone()))?;
            data.schema.constraints.remove(index);
        }

        AlterTableOperation::RenameTo(renamed) => {
            if db.name_in_use(renamed) {
                return Err(Error::DuplicateTable(renamed.clone()));
            }
            data.schema.name = renamed.clone();
            new_name = Some(renamed.clone());
        }

        AlterTableOperation::RenameColumn { from, to } => {
            let index = data
                .schema
                .column_index(from)
                .ok_or_else(|| Error::ColumnNotFound(from.clone()))?;
            if data.schema.column_index(to).is_some() {
                return Err(Error::DuplicateColumn(to.clone()));
            }
            data.schema.columns[index].name = to.clone();

            // Rewrite references in defaults, checks and table constraints.
            let rename = |expr: &mut crate::parsing::ast::Expression| {
                expr.transform(&mut |node| {
                    if let crate::parsing::ast::Expression::Column(_, column) = node {
                        if column == from {
                            *column = to.clone();
                        }
                    }
                });
            };
            for column in &mut data.schema.columns {
                if let Some(default) = &mut column.default {
                    rename(default);
                }
                if let Some(check) = &mut column.check {
                    rename(check);
                }
            }
            for constraint in &mut data.schema.constraints {
                match &mut constraint.kind {
                    TableConstraintKind::Check(expr) => rename(expr),
                    TableConstraintKind::PrimaryKey(cols) | TableConstraintKind::Unique(cols) => {
                        for col in cols {
                            if col == from {
                                *col = to.clone();
                            }
                        }
                    }
                }
            }
            if let Some(counter) = data.serials.remove(from) {
                data.serials.insert(to.clone(), counter);
            }
        }
    }

    // Commit.
    let db = catalog.current_mut()?;
    match new_name {
        Some(renamed) => {
            db.tables.remove(name);
            db.tables.insert(renamed, data);
        }
        None => {
            *db.get_table_mut(name)? = data;
        }
    }
    Ok(())
}

/// Validates and attaches a new table constraint; existing rows must
/// already satisfy it.
fn add_constraint(
    data: &mut crate::catalog::TableData,
    constraint: &TableConstraint,
    db: &crate::catalog::Database,
    context: &ExecutionContext,
) -> Result<()> {
    if let Some(constraint_name) = &constraint.name {
        let exists = data
            .schema
            .constraints
            .iter()
            .any(|c| c.name.as_deref() == Some(constraint_name));
        if exists {
            return Err(Error::DuplicateConstraint(constraint_name.clone()));
        }
    }

    match &constraint.kind {
        TableConstraintKind::PrimaryKey(columns) => {
            if data.schema.primary_key().is_some() {
                return Err(Error::InvalidValue(format!(
                    "table {} already has a primary key",
                    data.schema.name
                )));
            }
            for column in columns {
                let col = data.schema.get_column(column)?;
                if col.nullable {
                    return Err(Error::InvalidValue(format!(
                        "primary key column {} must be NOT NULL",
                        column
                    )));
                }
            }
            validate_unique_on_rows(data, columns, true)?;
        }
        TableConstraintKind::Unique(columns) => {
            for column in columns {
                data.schema.get_column(column)?;
            }
            validate_unique_on_rows(data, columns, false)?;
        }
        TableConstraintKind::Check(expr) => {
            let check_name = constraint
                .name
                .clone()
                .unwrap_or_else(|| format!("{}_check", data.schema.name));
            validate_check_on_rows(&data.schema, expr, &check_name, &data.rows, db, context)?;
        }
    }

    data.schema.constraints.push(constraint.clone());
    Ok(())
}

fn validate_unique_on_rows(
    data: &crate::catalog::TableData,
    columns: &[String],
    primary: bool,
) -> Result<()> {
    let indexes: Vec<usize> = columns
        .iter()
        .filter_map(|c| data.schema.column_index(c))
        .collect();
    let rule = UniqueRule {
        name: format!("{}_{}_key", data.schema.name, columns.join("_")),
        columns: indexes,
        primary,
    };
    for (index, row) in data.rows.iter().enumerate() {
        if scan_conflict(&data.rows, row, &rule, Some(index)).is_some() {
            return Err(rule.violation());
        }
    }
    Ok(())
}

fn validate_check_on_rows(
    schema: &Table,
    check: &crate::parsing::ast::Expression,
    check_name: &str,
    rows: &[crate::types::Row],
    db: &crate::catalog::Database,
    context: &ExecutionContext,
) -> Result<()> {
    let ctes = CteScope::root();
    let columns = schema.column_names();
    let base = Environment::new(Some(db), &ctes, context);
    for row in rows {
        let env = base.with_scope(super::expression::Scope {
            label: Some(&schema.name),
            columns: &columns,
            row,
        });
        if truth(&evaluate(check, &env)?)? == Truth::False {
            return Err(Error::CheckConstraintViolation(check_name.to_string()));
        }
    }
    Ok(())
}
