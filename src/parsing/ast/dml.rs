//! Data Manipulation Language (DML) statements: SELECT, INSERT, UPDATE, DELETE

use super::common::{Direction, FromClause, SetOperator};
use super::expressions::Expression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A WITH-list entry: a statement-scoped named subquery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommonTableExpression {
    pub name: String,
    pub query: SelectStatement,
}

/// SELECT statement structure. Trailing set-operation branches are chained
/// left-associatively in `compounds`; ORDER BY / LIMIT / OFFSET apply to the
/// combined result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectStatement {
    /// WITH: CTE bindings scoped to this statement.
    pub with: Vec<CommonTableExpression>,
    /// SELECT DISTINCT: deduplicate output rows.
    pub distinct: bool,
    /// Expressions to select, with an optional column alias.
    pub select: Vec<(Expression, Option<String>)>,
    /// FROM: the row source. None for constant selects.
    pub from: Option<FromClause>,
    /// WHERE: optional condition to filter rows.
    pub r#where: Option<Expression>,
    /// GROUP BY: expressions to group and aggregate by.
    pub group_by: Vec<Expression>,
    /// HAVING: expression to filter groups by.
    pub having: Option<Expression>,
    /// UNION / INTERSECT / EXCEPT branches, applied left to right.
    pub compounds: Vec<(SetOperator, SelectStatement)>,
    /// ORDER BY: expressions to sort by, with direction.
    pub order_by: Vec<(Expression, Direction)>,
    /// LIMIT: maximum number of rows to return.
    pub limit: Option<Expression>,
    /// OFFSET: row offset to start from.
    pub offset: Option<Expression>,
}

impl SelectStatement {
    /// An empty SELECT, used as a building block by the parser.
    pub fn new() -> Self {
        Self {
            with: Vec::new(),
            distinct: false,
            select: Vec::new(),
            from: None,
            r#where: None,
            group_by: Vec::new(),
            having: None,
            compounds: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

impl Default for SelectStatement {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of data for INSERT statements. A `None` cell in a VALUES row
/// stands for the DEFAULT keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsertSource {
    /// VALUES: explicit rows to insert.
    Values(Vec<Vec<Option<Expression>>>),
    /// SELECT: rows produced by a query.
    Select(Box<SelectStatement>),
    /// DEFAULT VALUES: a single row of all-default values.
    DefaultValues,
}

/// ON CONFLICT clause of an INSERT. The target columns identify which
/// unique or primary key constraint arbitrates the conflict; an empty
/// target matches any of them (DO NOTHING only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnConflict {
    DoNothing {
        target: Vec<String>,
    },
    DoUpdate {
        target: Vec<String>,
        /// column → value, None for DEFAULT
        set: BTreeMap<String, Option<Expression>>,
    },
}

/// DML statements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DmlStatement {
    /// INSERT INTO: inserts new rows into a table.
    Insert {
        table: String,
        /// Columns to insert values into. If None, all columns are used.
        columns: Option<Vec<String>>,
        source: InsertSource,
        on_conflict: Option<OnConflict>,
        returning: Option<Vec<(Expression, Option<String>)>>,
    },
    /// UPDATE: updates rows in a table.
    Update {
        table: String,
        /// column → value, None for DEFAULT
        set: BTreeMap<String, Option<Expression>>,
        r#where: Option<Expression>,
        returning: Option<Vec<(Expression, Option<String>)>>,
    },
    /// DELETE: deletes rows from a table.
    Delete {
        table: String,
        r#where: Option<Expression>,
        returning: Option<Vec<(Expression, Option<String>)>>,
    },
    /// SELECT: reads rows.
    Select(Box<SelectStatement>),
}
