//! The SELECT pipeline: source resolution, filtering, grouping and
//! aggregation, HAVING, projection, DISTINCT, set operations, ordering
//! and LIMIT/OFFSET, applied in that order.

use super::aggregator::{collect_aggregates, has_aggregates, Aggregator};
use super::expression::{evaluate, CteScope, Environment, Scope};
use super::Relation;
use crate::error::{Error, Result};
use crate::parsing::ast::{
    Direction, Expression, FromClause, Literal, SelectStatement, SetOperator,
};
use crate::types::evaluator::truth;
use crate::types::{DataType, Row, Value};
use std::collections::{HashMap, HashSet};

/// Executes a SELECT statement to a materialized relation. The
/// environment supplies the database, any enclosing CTE bindings, the
/// statement clock, and outer row scopes for correlated subqueries.
pub fn execute_select(statement: &SelectStatement, env: &Environment) -> Result<Relation> {
    // Bind this statement's CTEs. Within one statement the names must be
    // unique; they shadow tables (and outer CTEs) for its duration.
    let mut local = CteScope::child(env.ctes);
    for cte in &statement.with {
        if local.bindings.contains_key(&cte.name) {
            return Err(Error::DuplicateTable(cte.name.clone()));
        }
        let relation = execute_select(&cte.query, &env.with_ctes(&local))?;
        local.bindings.insert(cte.name.clone(), relation);
    }
    let env = env.with_ctes(&local);

    if statement.compounds.is_empty() {
        let (mut relation, keys) = execute_select_body(statement, &statement.order_by, &env)?;
        sort_rows(&mut relation, keys, &statement.order_by);
        apply_limit_offset(&mut relation, statement, &env)?;
        return Ok(relation);
    }

    // Set operations: evaluate every branch to a completed row list, then
    // combine left to right. ORDER BY afterwards only sees output columns.
    let (mut relation, _) = execute_select_body(statement, &[], &env)?;
    for (operator, branch) in &statement.compounds {
        let (right, _) = execute_select_body(branch, &[], &env)?;
        relation = combine(*operator, relation, right)?;
    }

    if !statement.order_by.is_empty() {
        let keys = relation
            .rows
            .iter()
            .map(|row| {
                statement
                    .order_by
                    .iter()
                    .map(|(expr, _)| output_column_value(expr, row, &relation.columns))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        sort_rows(&mut relation, keys, &statement.order_by);
    }
    apply_limit_offset(&mut relation, statement, &env)?;
    Ok(relation)
}

/// Executes one SELECT branch (no set operations, no LIMIT) and computes
/// the requested ORDER BY key values alongside each output row.
fn execute_select_body(
    statement: &SelectStatement,
    order_by: &[(Expression, Direction)],
    env: &Environment,
) -> Result<(Relation, Vec<Vec<Value>>)> {
    let (label, source) = resolve_source(&statement.from, env)?;
    let label = label.as_deref();

    // WHERE: retain rows where the predicate is TRUE; NULL is discarded.
    let mut rows = Vec::new();
    for row in source.rows {
        let keep = match &statement.r#where {
            Some(predicate) => {
                let scoped = env.with_scope(Scope {
                    label,
                    columns: &source.columns,
                    row: &row,
                });
                truth(&evaluate(predicate, &scoped)?)?.is_true()
            }
            None => true,
        };
        if keep {
            rows.push(row);
        }
    }

    let grouped = !statement.group_by.is_empty()
        || statement.select.iter().any(|(expr, _)| has_aggregates(expr))
        || statement.having.as_ref().is_some_and(has_aggregates);

    let (columns, projected) = if grouped {
        execute_grouped(statement, order_by, &source.columns, label, &rows, env)?
    } else {
        execute_ungrouped(statement, order_by, &source.columns, label, &rows, env)?
    };

    let (mut out_rows, mut keys): (Vec<Row>, Vec<Vec<Value>>) = projected.into_iter().unzip();

    // DISTINCT: deduplicate by full output tuple; NULLs compare equal here.
    if statement.distinct {
        let mut seen = HashSet::new();
        let mut rows_deduped = Vec::new();
        let mut keys_deduped = Vec::new();
        for (row, key) in out_rows.into_iter().zip(keys) {
            if seen.insert(row.clone()) {
                rows_deduped.push(row);
                keys_deduped.push(key);
            }
        }
        out_rows = rows_deduped;
        keys = keys_deduped;
    }

    Ok((
        Relation {
            columns,
            rows: out_rows,
        },
        keys,
    ))
}

/// Resolves the FROM source to a materialized relation and its label.
/// Resolution order: CTE binding, table, view, materialized view.
fn resolve_source(
    from: &Option<FromClause>,
    env: &Environment,
) -> Result<(Option<String>, Relation)> {
    match from {
        // A FROM-less SELECT projects a single empty row.
        None => Ok((
            None,
            Relation {
                columns: Vec::new(),
                rows: vec![Vec::new()],
            },
        )),
        Some(FromClause::Table { name, alias }) => {
            let label = alias.clone().unwrap_or_else(|| name.clone());
            if let Some(relation) = env.ctes.get(name) {
                return Ok((Some(label), relation.clone()));
            }
            let db = env.database.ok_or(Error::NoDatabaseSelected)?;
            if let Some(data) = db.tables.get(name) {
                return Ok((
                    Some(label),
                    Relation {
                        columns: data.schema.column_names(),
                        rows: data.rows.clone(),
                    },
                ));
            }
            if let Some(view) = db.views.get(name) {
                // Views re-execute on each reference, in a fresh scope:
                // the referencing statement's CTEs are not visible inside.
                let view_ctes = CteScope::root();
                let view_env = Environment::new(Some(db), &view_ctes, env.context);
                return Ok((Some(label), execute_select(&view.query, &view_env)?));
            }
            if let Some(view) = db.materialized.get(name) {
                // Materialized views serve their cache, stale or not.
                return Ok((
                    Some(label),
                    Relation {
                        columns: view.columns.clone(),
                        rows: view.rows.clone(),
                    },
                ));
            }
            Err(Error::TableNotFound(name.clone()))
        }
        Some(FromClause::Subquery { query, alias }) => {
            let relation = execute_select(query, env)?;
            Ok((Some(alias.clone()), relation))
        }
    }
}

/// Output column names for the select items: the alias if given, the
/// column name for plain references, the canonical expression text
/// otherwise. A `*` expands to the source's column names.
pub(crate) fn output_columns(
    select: &[(Expression, Option<String>)],
    source_columns: &[String],
) -> Vec<String> {
    let mut names = Vec::new();
    for (expr, alias) in select {
        match (expr, alias) {
            (Expression::All, _) => names.extend(source_columns.iter().cloned()),
            (_, Some(alias)) => names.push(alias.clone()),
            (Expression::Column(_, name), None) => names.push(name.clone()),
            (expr, None) => names.push(expr.to_string()),
        }
    }
    names
}

type ProjectedRows = Vec<(Row, Vec<Value>)>;

/// Projection without grouping: evaluate the select list per source row.
fn execute_ungrouped(
    statement: &SelectStatement,
    order_by: &[(Expression, Direction)],
    source_columns: &[String],
    label: Option<&str>,
    rows: &[Row],
    env: &Environment,
) -> Result<(Vec<String>, ProjectedRows)> {
    let columns = output_columns(&statement.select, source_columns);
    let mut projected = Vec::with_capacity(rows.len());
    for row in rows {
        let scoped = env.with_scope(Scope {
            label,
            columns: source_columns,
            row,
        });
        let mut out = Vec::with_capacity(statement.select.len());
        for (expr, _) in &statement.select {
            match expr {
                Expression::All => out.extend(row.iter().cloned()),
                expr => out.push(evaluate(expr, &scoped)?),
            }
        }
        let keys = order_by
            .iter()
            .map(|(expr, _)| order_key(expr, &out, &columns, &statement.select, &scoped))
            .collect::<Result<Vec<_>>>()?;
        projected.push((out, keys));
    }
    Ok((columns, projected))
}

/// Projection with grouping: bucket rows by the GROUP BY keys, finalize
/// aggregates per group, apply HAVING, then evaluate the select list once
/// per surviving group.
fn execute_grouped(
    statement: &SelectStatement,
    order_by: &[(Expression, Direction)],
    source_columns: &[String],
    label: Option<&str>,
    rows: &[Row],
    env: &Environment,
) -> Result<(Vec<String>, ProjectedRows)> {
    // Every non-aggregate expression must be derived from the grouping keys.
    for (expr, _) in &statement.select {
        validate_grouped(expr, &statement.group_by)?;
    }
    if let Some(having) = &statement.having {
        validate_grouped(having, &statement.group_by)?;
    }
    for (expr, _) in order_by {
        if !order_key_resolves_to_output(expr, &statement.select) {
            validate_grouped(expr, &statement.group_by)?;
        }
    }

    // Collect every aggregate call reachable from the output clauses.
    let mut calls = Vec::new();
    for (expr, _) in &statement.select {
        collect_aggregates(expr, &mut calls);
    }
    if let Some(having) = &statement.having {
        collect_aggregates(having, &mut calls);
    }
    for (expr, _) in order_by {
        collect_aggregates(expr, &mut calls);
    }

    let mut aggregator = Aggregator::new(statement.group_by.clone(), calls)?;
    for (index, row) in rows.iter().enumerate() {
        let scoped = env.with_scope(Scope {
            label,
            columns: source_columns,
            row,
        });
        aggregator.add(&scoped, index)?;
    }

    let columns = output_columns(&statement.select, source_columns);
    let mut projected = Vec::new();
    for group in aggregator.finalize()? {
        let group_keys: HashMap<Expression, Value> = statement
            .group_by
            .iter()
            .cloned()
            .zip(group.key.iter().cloned())
            .collect();

        let mut scoped = Environment {
            database: env.database,
            ctes: env.ctes,
            context: env.context,
            scopes: env.scopes.clone(),
            aggregates: Some(&group.aggregates),
            group_keys: Some(&group_keys),
        };
        // Grouping-key expressions evaluate via the key map; a
        // representative row backs any nested references inside them.
        if let Some(row) = group.representative.map(|i| &rows[i]) {
            scoped.scopes.push(Scope {
                label,
                columns: source_columns,
                row,
            });
        }

        // HAVING drops groups where the predicate is not TRUE.
        if let Some(having) = &statement.having {
            if !truth(&evaluate(having, &scoped)?)?.is_true() {
                continue;
            }
        }

        let mut out = Vec::with_capacity(statement.select.len());
        for (expr, _) in &statement.select {
            out.push(evaluate(expr, &scoped)?);
        }
        let keys = order_by
            .iter()
            .map(|(expr, _)| order_key(expr, &out, &columns, &statement.select, &scoped))
            .collect::<Result<Vec<_>>>()?;
        projected.push((out, keys));
    }
    Ok((columns, projected))
}

/// Checks that an expression only reaches row data through the grouping
/// keys or inside aggregate arguments. Subqueries have their own scope
/// and are left alone.
fn validate_grouped(expr: &Expression, group_by: &[Expression]) -> Result<()> {
    if group_by.contains(expr) {
        return Ok(());
    }
    match expr {
        Expression::All => Err(Error::ExecutionError(
            "* is not allowed in an aggregated query".into(),
        )),
        Expression::Column(_, name) => Err(Error::ExecutionError(format!(
            "column {} must appear in the GROUP BY clause or be used in an aggregate function",
            name
        ))),
        Expression::Function(name, args) => {
            if crate::functions::is_aggregate(name) {
                return Ok(());
            }
            for arg in args {
                validate_grouped(arg, group_by)?;
            }
            Ok(())
        }
        Expression::Operator(op) => {
            use crate::parsing::ast::Operator::*;
            match op {
                Add(a, b) | And(a, b) | Divide(a, b) | Equal(a, b) | GreaterThan(a, b)
                | GreaterThanOrEqual(a, b) | LessThan(a, b) | LessThanOrEqual(a, b)
                | Multiply(a, b) | NotEqual(a, b) | Or(a, b) | Remainder(a, b)
                | Subtract(a, b) => {
                    validate_grouped(a, group_by)?;
                    validate_grouped(b, group_by)
                }
                Identity(e) | Negate(e) | Not(e) => validate_grouped(e, group_by),
                Is { expr, .. } => validate_grouped(expr, group_by),
                Like { expr, pattern, .. } => {
                    validate_grouped(expr, group_by)?;
                    validate_grouped(pattern, group_by)
                }
                Between {
                    expr, low, high, ..
                } => {
                    validate_grouped(expr, group_by)?;
                    validate_grouped(low, group_by)?;
                    validate_grouped(high, group_by)
                }
                InList { expr, list, .. } => {
                    validate_grouped(expr, group_by)?;
                    for item in list {
                        validate_grouped(item, group_by)?;
                    }
                    Ok(())
                }
                InSubquery { expr, .. } => validate_grouped(expr, group_by),
                Exists { .. } => Ok(()),
            }
        }
        Expression::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            if let Some(operand) = operand {
                validate_grouped(operand, group_by)?;
            }
            for (when, then) in when_clauses {
                validate_grouped(when, group_by)?;
                validate_grouped(then, group_by)?;
            }
            if let Some(else_expr) = else_clause {
                validate_grouped(else_expr, group_by)?;
            }
            Ok(())
        }
        Expression::Cast { expr, .. } => validate_grouped(expr, group_by),
        Expression::Literal(_) | Expression::Subquery(_) => Ok(()),
    }
}

/// Whether an ORDER BY expression resolves to an output column (by alias,
/// name or 1-based position) rather than being evaluated per group/row.
fn order_key_resolves_to_output(
    expr: &Expression,
    select: &[(Expression, Option<String>)],
) -> bool {
    match expr {
        Expression::Literal(Literal::Integer(_)) => true,
        Expression::Column(None, name) => select.iter().any(|(item, alias)| match alias {
            Some(alias) => alias == name,
            None => matches!(item, Expression::Column(_, n) if n == name),
        }),
        expr => select.iter().any(|(item, _)| item == expr),
    }
}

/// Computes one ORDER BY key for one output row. Output aliases, 1-based
/// positions and select-list expressions resolve to the projected values;
/// anything else is evaluated in the row or group environment.
fn order_key(
    expr: &Expression,
    projected: &Row,
    columns: &[String],
    select: &[(Expression, Option<String>)],
    env: &Environment,
) -> Result<Value> {
    if let Expression::Literal(Literal::Integer(position)) = expr {
        let index = *position;
        if index < 1 || index as usize > projected.len() {
            return Err(Error::InvalidValue(format!(
                "ORDER BY position {} is out of range",
                index
            )));
        }
        return Ok(projected[index as usize - 1].clone());
    }
    if let Expression::Column(None, name) = expr {
        if let Some(index) = columns.iter().position(|c| c == name) {
            return Ok(projected[index].clone());
        }
    }
    // Structural match against a select item; `*` never contributes here.
    if let Some(index) = select_item_offset(expr, select, columns.len()) {
        return Ok(projected[index].clone());
    }
    evaluate(expr, env)
}

/// Finds the output offset of a select item structurally equal to the
/// expression, accounting for `*` expansions.
fn select_item_offset(
    expr: &Expression,
    select: &[(Expression, Option<String>)],
    total_columns: usize,
) -> Option<usize> {
    let mut offset = 0;
    for (item, _) in select {
        if item == &Expression::All {
            // A `*` item's width is whatever the projection produced for
            // it; derive it from the total output width.
            let star_width = total_columns - (select.len() - 1);
            offset += star_width;
            continue;
        }
        if item == expr {
            return Some(offset);
        }
        offset += 1;
    }
    None
}

/// Resolves an ORDER BY expression after a set operation, where only
/// output columns and positions are available.
fn output_column_value(expr: &Expression, row: &Row, columns: &[String]) -> Result<Value> {
    match expr {
        Expression::Literal(Literal::Integer(position)) => {
            if *position < 1 || *position as usize > row.len() {
                return Err(Error::InvalidValue(format!(
                    "ORDER BY position {} is out of range",
                    position
                )));
            }
            Ok(row[*position as usize - 1].clone())
        }
        Expression::Column(None, name) => columns
            .iter()
            .position(|c| c == name)
            .map(|i| row[i].clone())
            .ok_or_else(|| Error::ColumnNotFound(name.clone())),
        expr => Err(Error::ExecutionError(format!(
            "ORDER BY over a set operation must name an output column: {}",
            expr
        ))),
    }
}

/// Stable sort by the precomputed key vectors. NULLs order last for ASC
/// and first for DESC.
fn sort_rows(
    relation: &mut Relation,
    keys: Vec<Vec<Value>>,
    order_by: &[(Expression, Direction)],
) {
    if order_by.is_empty() || relation.rows.is_empty() {
        return;
    }
    let mut zipped: Vec<(Row, Vec<Value>)> =
        std::mem::take(&mut relation.rows).into_iter().zip(keys).collect();
    zipped.sort_by(|(_, a), (_, b)| {
        for (i, (_, direction)) in order_by.iter().enumerate() {
            let ordering = match (a[i].is_null(), b[i].is_null()) {
                (true, true) => std::cmp::Ordering::Equal,
                // NULL sorts as if greater than every value.
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) => a[i].cmp(&b[i]),
            };
            let ordering = match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
    relation.rows = zipped.into_iter().map(|(row, _)| row).collect();
}

/// Applies OFFSET then LIMIT. Both must evaluate to non-negative integers.
fn apply_limit_offset(
    relation: &mut Relation,
    statement: &SelectStatement,
    env: &Environment,
) -> Result<()> {
    let bound = |expr: &Option<Expression>, clause: &str| -> Result<Option<usize>> {
        match expr {
            None => Ok(None),
            Some(expr) => {
                let value = evaluate(expr, env)?;
                match value.as_integer() {
                    Some(n) if n >= 0 => Ok(Some(n as usize)),
                    _ => Err(Error::InvalidValue(format!(
                        "{} must be a non-negative integer, got {}",
                        clause, value
                    ))),
                }
            }
        }
    };
    let limit = bound(&statement.limit, "LIMIT")?;
    let offset = bound(&statement.offset, "OFFSET")?;

    if let Some(offset) = offset {
        relation.rows = relation.rows.split_off(offset.min(relation.rows.len()));
    }
    if let Some(limit) = limit {
        relation.rows.truncate(limit);
    }
    Ok(())
}

/// Column types of a relation, inferred from its rows; None when a column
/// is entirely NULL (compatible with everything).
fn column_types(relation: &Relation) -> Vec<Option<DataType>> {
    (0..relation.columns.len())
        .map(|i| {
            relation
                .rows
                .iter()
                .filter_map(|row| row.get(i).and_then(Value::data_type))
                .next()
        })
        .collect()
}

/// Combines two completed branches with a set operator. Branch schemas
/// must agree in column count and pairwise type compatibility.
fn combine(operator: SetOperator, left: Relation, right: Relation) -> Result<Relation> {
    if left.columns.len() != right.columns.len() {
        return Err(Error::SetOperationMismatch(format!(
            "{} columns vs {} columns",
            left.columns.len(),
            right.columns.len()
        )));
    }
    for (i, (lt, rt)) in column_types(&left)
        .into_iter()
        .zip(column_types(&right))
        .enumerate()
    {
        if let (Some(lt), Some(rt)) = (lt, rt) {
            if !lt.is_compatible_with(&rt) {
                return Err(Error::SetOperationMismatch(format!(
                    "column {} is {} on one side and {} on the other",
                    left.columns.get(i).cloned().unwrap_or_default(),
                    lt,
                    rt
                )));
            }
        }
    }

    let columns = left.columns;
    let rows = match operator {
        SetOperator::Union { all: true } => {
            let mut rows = left.rows;
            rows.extend(right.rows);
            rows
        }
        SetOperator::Union { all: false } => {
            let mut seen = HashSet::new();
            let mut rows = Vec::new();
            for row in left.rows.into_iter().chain(right.rows) {
                if seen.insert(row.clone()) {
                    rows.push(row);
                }
            }
            rows
        }
        SetOperator::Intersect => {
            let right_rows: HashSet<Row> = right.rows.into_iter().collect();
            let mut seen = HashSet::new();
            let mut rows = Vec::new();
            for row in left.rows {
                if right_rows.contains(&row) && seen.insert(row.clone()) {
                    rows.push(row);
                }
            }
            rows
        }
        SetOperator::Except => {
            let right_rows: HashSet<Row> = right.rows.into_iter().collect();
            let mut seen = HashSet::new();
            let mut rows = Vec::new();
            for row in left.rows {
                if !right_rows.contains(&row) && seen.insert(row.clone()) {
                    rows.push(row);
                }
            }
            rows
        }
    };
    Ok(Relation { columns, rows })
}
