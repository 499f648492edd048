//! Abstract Syntax Tree (AST) for SQL statements
//!
//! The statement is the root node of this tree, describing the syntactic
//! structure of a SQL statement. Built from raw SQL by the parser, passed
//! to the executor which resolves names and runs it against the catalog.
//! All nodes serialize, since views and column defaults store expression
//! and query trees in the catalog.

pub mod common;
pub mod ddl;
mod display;
pub mod dml;
pub mod expressions;

pub use common::{Direction, FromClause, SetOperator};
pub use ddl::{AlterTableOperation, Column, DdlStatement, TableConstraint};
pub use dml::{
    CommonTableExpression, DmlStatement, InsertSource, OnConflict, SelectStatement,
};
pub use expressions::{Expression, Literal, Operator};

use serde::{Deserialize, Serialize};

/// SQL statements represented as an Abstract Syntax Tree (AST).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    /// DDL statements (CREATE, DROP, ALTER, REFRESH)
    Ddl(DdlStatement),

    /// DML statements (SELECT, INSERT, UPDATE, DELETE)
    Dml(DmlStatement),

    /// USE: switches the session's current database.
    Use { database: String },
}
