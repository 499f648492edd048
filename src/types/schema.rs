//! Table schemas: columns, types and constraints.

use super::data_type::DataType;
use super::value::Row;
use crate::error::{Error, Result};
use crate::parsing::ast::ddl::{TableConstraint, TableConstraintKind};
use crate::parsing::ast::Expression;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A table schema: its ordered columns and table-level constraints.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Table {
    /// The table name. Unique within a database. Can't be empty.
    pub name: String,
    /// The table's columns, in declaration order.
    pub columns: Vec<Column>,
    /// Table-level constraints (multi-column PRIMARY KEY / UNIQUE, CHECK).
    pub constraints: Vec<TableConstraint>,
}

/// A table column.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Column {
    /// Column name. Can't be empty.
    pub name: String,
    /// Column data type. SERIAL implies NOT NULL and auto-increment.
    pub data_type: DataType,
    /// Whether this is a primary key column.
    pub primary_key: bool,
    /// Whether the column allows NULL values. Not legal for primary keys.
    pub nullable: bool,
    /// Default expression evaluated when a row omits this column.
    pub default: Option<Expression>,
    /// Whether the column only allows unique values (NULLs are distinct).
    pub unique: bool,
    /// Column-level CHECK constraint.
    pub check: Option<Expression>,
}

impl Column {
    /// Creates a new nullable column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
            primary_key: false,
            nullable: true,
            default: None,
            unique: false,
            check: None,
        }
    }

    /// Sets this column as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self.unique = true;
        self
    }

    /// Sets whether this column is nullable.
    pub fn nullable(mut self, nullable: bool) -> Self {
        if self.primary_key && nullable {
            return self;
        }
        self.nullable = nullable;
        self
    }

    /// Sets the default expression.
    pub fn default(mut self, expr: Expression) -> Self {
        self.default = Some(expr);
        self
    }

    /// Sets this column as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets a CHECK constraint.
    pub fn check(mut self, expr: Expression) -> Self {
        self.check = Some(expr);
        self
    }
}

impl Table {
    /// Creates a new table schema, validating its shape.
    pub fn new(
        name: String,
        mut columns: Vec<Column>,
        constraints: Vec<TableConstraint>,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidValue("table name cannot be empty".into()));
        }
        if columns.is_empty() {
            return Err(Error::InvalidValue(format!(
                "table {} must have at least one column",
                name
            )));
        }

        // Reject duplicate column names.
        for (i, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(Error::InvalidValue("column name cannot be empty".into()));
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::DuplicateColumn(column.name.clone()));
            }
        }

        // SERIAL implies NOT NULL.
        for column in &mut columns {
            if column.data_type == DataType::Serial {
                column.nullable = false;
            }
        }

        let table = Table {
            name,
            columns,
            constraints,
        };

        // At most one primary key, counting column-level and table-level.
        let column_pks = table.columns.iter().filter(|c| c.primary_key).count();
        let table_pks = table
            .constraints
            .iter()
            .filter(|c| matches!(c.kind, TableConstraintKind::PrimaryKey(_)))
            .count();
        if column_pks + table_pks > 1 && !(column_pks == 1 && table_pks == 0) {
            return Err(Error::InvalidValue(format!(
                "table {} can only have one primary key",
                table.name
            )));
        }

        // Constraint columns must exist.
        for constraint in &table.constraints {
            match &constraint.kind {
                TableConstraintKind::PrimaryKey(cols) | TableConstraintKind::Unique(cols) => {
                    for col in cols {
                        if table.column_index(col).is_none() {
                            return Err(Error::ColumnNotFound(col.clone()));
                        }
                    }
                }
                TableConstraintKind::Check(_) => {}
            }
        }

        Ok(table)
    }

    /// Get the index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the column with the given name, if it exists.
    pub fn get_column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::ColumnNotFound(name.into()))
    }

    /// The column names, in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// The primary key column indexes, from either the column-level flag or
    /// a table-level PRIMARY KEY constraint.
    pub fn primary_key(&self) -> Option<Vec<usize>> {
        let flagged: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect();
        if !flagged.is_empty() {
            return Some(flagged);
        }
        self.constraints.iter().find_map(|c| match &c.kind {
            TableConstraintKind::PrimaryKey(cols) => Some(
                cols.iter()
                    .filter_map(|name| self.column_index(name))
                    .collect(),
            ),
            _ => None,
        })
    }

    /// All UNIQUE column sets that are not the primary key, with a
    /// human-readable constraint name for error messages.
    pub fn unique_sets(&self) -> Vec<(String, Vec<usize>)> {
        let mut sets = Vec::new();
        for (i, column) in self.columns.iter().enumerate() {
            if column.unique && !column.primary_key {
                sets.push((format!("{}_{}_key", self.name, column.name), vec![i]));
            }
        }
        for constraint in &self.constraints {
            if let TableConstraintKind::Unique(cols) = &constraint.kind {
                let indexes: Vec<usize> = cols
                    .iter()
                    .filter_map(|name| self.column_index(name))
                    .collect();
                let name = constraint
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{}_{}_key", self.name, cols.join("_")));
                sets.push((name, indexes));
            }
        }
        sets
    }

    /// All CHECK expressions with their constraint names: column-level
    /// checks first, then table-level ones.
    pub fn check_constraints(&self) -> Vec<(String, &Expression)> {
        let mut checks = Vec::new();
        for column in &self.columns {
            if let Some(check) = &column.check {
                checks.push((format!("{}_{}_check", self.name, column.name), check));
            }
        }
        for constraint in &self.constraints {
            if let TableConstraintKind::Check(expr) = &constraint.kind {
                let name = constraint
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{}_check", self.name));
                checks.push((name, expr));
            }
        }
        checks
    }

    /// Validates a row's shape against this schema: arity, nullability and
    /// value types. Constraint checks (UNIQUE, CHECK) live in the executor.
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidValue(format!(
                "row has {} values, table {} has {} columns",
                row.len(),
                self.name,
                self.columns.len()
            )));
        }
        for (column, value) in self.columns.iter().zip(row.iter()) {
            if value.is_null() && !column.nullable {
                return Err(Error::NullConstraintViolation(column.name.clone()));
            }
            if !value.is_null() {
                value.check_type(&column.data_type)?;
            }
        }
        Ok(())
    }
}

// Formats the table as a SQL CREATE TABLE statement.
impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "CREATE TABLE {} (", self.name)?;
        for (i, column) in self.columns.iter().enumerate() {
            write!(f, "  {} {}", column.name, column.data_type)?;
            if column.primary_key {
                write!(f, " PRIMARY KEY")?;
            } else if !column.nullable {
                write!(f, " NOT NULL")?;
            }
            if column.unique && !column.primary_key {
                write!(f, " UNIQUE")?;
            }
            if let Some(default) = &column.default {
                write!(f, " DEFAULT {}", default)?;
            }
            if let Some(check) = &column.check {
                write!(f, " CHECK ({})", check)?;
            }
            if i < self.columns.len() - 1 || !self.constraints.is_empty() {
                writeln!(f, ",")?;
            }
        }
        for (i, constraint) in self.constraints.iter().enumerate() {
            write!(f, "  {}", constraint)?;
            if i < self.constraints.len() - 1 {
                writeln!(f, ",")?;
            }
        }
        write!(f, "\n)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn test_table_creation() {
        let columns = vec![
            Column::new("id", DataType::Serial).primary_key(),
            Column::new("name", DataType::Text).nullable(false),
            Column::new("email", DataType::Text).unique(),
        ];
        let table = Table::new("users".into(), columns, Vec::new()).unwrap();
        assert_eq!(table.primary_key(), Some(vec![0]));
        assert_eq!(table.unique_sets().len(), 1);
        assert!(!table.columns[0].nullable);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let columns = vec![
            Column::new("x", DataType::Int),
            Column::new("x", DataType::Int),
        ];
        assert_eq!(
            Table::new("t".into(), columns, Vec::new()),
            Err(Error::DuplicateColumn("x".into()))
        );
    }

    #[test]
    fn test_multiple_primary_keys_rejected() {
        let columns = vec![
            Column::new("a", DataType::Int).primary_key(),
            Column::new("b", DataType::Int).primary_key(),
        ];
        assert!(Table::new("t".into(), columns, Vec::new()).is_err());
    }

    #[test]
    fn test_row_validation() {
        let columns = vec![
            Column::new("id", DataType::Int).primary_key(),
            Column::new("name", DataType::Text).nullable(false),
            Column::new("age", DataType::Int),
        ];
        let table = Table::new("users".into(), columns, Vec::new()).unwrap();

        let row = vec![Value::integer(1), Value::string("Alice"), Value::Null];
        assert!(table.validate_row(&row).is_ok());

        // Wrong arity
        assert!(table.validate_row(&vec![Value::integer(1)]).is_err());

        // NULL in a NOT NULL column
        let row = vec![Value::integer(2), Value::Null, Value::integer(25)];
        assert_eq!(
            table.validate_row(&row),
            Err(Error::NullConstraintViolation("name".into()))
        );

        // Wrong type
        let row = vec![
            Value::string("nope"),
            Value::string("Bob"),
            Value::integer(3),
        ];
        assert!(table.validate_row(&row).is_err());
    }
}
