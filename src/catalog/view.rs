//! Views and materialized views.

use crate::parsing::ast::dml::SelectStatement;
use crate::parsing::ast::{Expression, FromClause, Operator};
use crate::types::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A view: a parameterless stored SELECT, re-evaluated on each reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub query: SelectStatement,
}

/// A materialized view: a stored SELECT whose result set is cached at
/// CREATE and at each REFRESH. Reads serve the cache even when stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedView {
    pub name: String,
    pub query: SelectStatement,
    /// Output schema captured at the last refresh.
    pub columns: Vec<String>,
    /// Cached result rows from the last refresh.
    pub rows: Vec<Row>,
    /// Set when a table referenced by the query is mutated after the last
    /// refresh. Informational: reads still serve the cache.
    pub stale: bool,
}

/// Collects the table names a SELECT reads from, descending into CTEs,
/// FROM subqueries, set-operation branches and expression subqueries.
/// Used to mark materialized views stale after DML.
pub fn referenced_tables(query: &SelectStatement, out: &mut BTreeSet<String>) {
    for cte in &query.with {
        referenced_tables(&cte.query, out);
    }
    match &query.from {
        Some(FromClause::Table { name, .. }) => {
            out.insert(name.clone());
        }
        Some(FromClause::Subquery { query, .. }) => referenced_tables(query, out),
        None => {}
    }
    for (_, branch) in &query.compounds {
        referenced_tables(branch, out);
    }

    let mut exprs: Vec<&Expression> = Vec::new();
    exprs.extend(query.select.iter().map(|(e, _)| e));
    exprs.extend(query.r#where.iter());
    exprs.extend(query.group_by.iter());
    exprs.extend(query.having.iter());
    exprs.extend(query.order_by.iter().map(|(e, _)| e));
    for expr in exprs {
        expr.walk(&mut |node| {
            match node {
                Expression::Subquery(subquery) => referenced_tables(subquery, out),
                Expression::Operator(Operator::InSubquery { subquery, .. })
                | Expression::Operator(Operator::Exists { subquery, .. }) => {
                    referenced_tables(subquery, out)
                }
                _ => {}
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Parser;
    use crate::parsing::ast::{DmlStatement, Statement};

    fn tables_of(sql: &str) -> Vec<String> {
        let query = match Parser::parse(sql).unwrap() {
            Statement::Dml(DmlStatement::Select(select)) => *select,
            other => panic!("expected SELECT, got {:?}", other),
        };
        let mut out = BTreeSet::new();
        referenced_tables(&query, &mut out);
        out.into_iter().collect()
    }

    #[test]
    fn test_referenced_tables() {
        assert_eq!(tables_of("SELECT * FROM t"), vec!["t"]);
        assert_eq!(
            tables_of("SELECT * FROM t WHERE x IN (SELECT y FROM u)"),
            vec!["t", "u"]
        );
        assert_eq!(
            tables_of("WITH c AS (SELECT * FROM a) SELECT * FROM c UNION SELECT * FROM b"),
            vec!["a", "b", "c"]
        );
        assert_eq!(
            tables_of("SELECT (SELECT MAX(v) FROM m) FROM t"),
            vec!["m", "t"]
        );
    }
}
