//! Data Definition Language (DDL) statements: CREATE, DROP, ALTER, REFRESH

use super::dml::SelectStatement;
use super::expressions::Expression;
use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// CREATE TABLE column definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub primary_key: bool,
    /// Explicit NULL / NOT NULL, if written.
    pub nullable: Option<bool>,
    pub default: Option<Expression>,
    pub unique: bool,
    pub check: Option<Expression>,
}

impl Column {
    /// A bare column with only a name and type.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            primary_key: false,
            nullable: None,
            default: None,
            unique: false,
            check: None,
        }
    }
}

/// A table-level constraint, optionally named via CONSTRAINT name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableConstraint {
    pub name: Option<String>,
    pub kind: TableConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableConstraintKind {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    Check(Expression),
}

/// ALTER TABLE operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlterTableOperation {
    AddColumn(Column),
    DropColumn(String),
    AddConstraint(TableConstraint),
    DropConstraint(String),
    RenameTo(String),
    RenameColumn { from: String, to: String },
}

/// DDL statements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DdlStatement {
    /// CREATE DATABASE: creates a new, empty database.
    CreateDatabase { name: String, if_not_exists: bool },

    /// DROP DATABASE: removes a database and everything in it.
    DropDatabase { name: String, if_exists: bool },

    /// CREATE TABLE: creates a new table in the current database.
    CreateTable {
        name: String,
        columns: Vec<Column>,
        constraints: Vec<TableConstraint>,
        if_not_exists: bool,
    },

    /// ALTER TABLE: modifies an existing table.
    AlterTable {
        name: String,
        operation: AlterTableOperation,
    },

    /// DROP TABLE: drops one or more tables.
    DropTable { names: Vec<String>, if_exists: bool },

    /// CREATE [MATERIALIZED] VIEW: stores a SELECT under a name. A plain
    /// view re-executes on every reference; a materialized view caches its
    /// result until REFRESH.
    CreateView {
        name: String,
        query: Box<SelectStatement>,
        materialized: bool,
    },

    /// REFRESH MATERIALIZED VIEW: re-executes and re-caches the stored query.
    RefreshMaterializedView { name: String },

    /// DROP [MATERIALIZED] VIEW: removes a view or materialized view.
    DropView {
        names: Vec<String>,
        if_exists: bool,
        materialized: bool,
    },
}
