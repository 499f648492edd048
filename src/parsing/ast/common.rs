//! Common structures used across AST modules

use super::dml::SelectStatement;
use serde::{Deserialize, Serialize};

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// Set operations combining SELECT branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOperator {
    /// UNION deduplicates; UNION ALL concatenates.
    Union { all: bool },
    Intersect,
    Except,
}

/// A FROM item: a single table, view, materialized view or CTE reference,
/// or a parenthesized subquery with a mandatory alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FromClause {
    Table {
        name: String,
        alias: Option<String>,
    },
    Subquery {
        query: Box<SelectStatement>,
        alias: String,
    },
}

impl FromClause {
    /// The name other parts of the query may qualify columns with.
    pub fn label(&self) -> &str {
        match self {
            FromClause::Table { alias: Some(a), .. } => a,
            FromClause::Table { name, .. } => name,
            FromClause::Subquery { alias, .. } => alias,
        }
    }
}
