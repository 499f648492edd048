//! Expression evaluation against a row environment.
//!
//! The environment carries a scope stack (inner scopes first in lookup
//! order, so correlated subqueries can reach outer rows), the statement's
//! CTE bindings, the current database for subquery execution, the
//! per-statement clock capture, and (during grouped projection) maps of
//! pre-computed group-key and aggregate values keyed by structural
//! expression equality.

use super::select::execute_select;
use super::Relation;
use crate::catalog::Database;
use crate::error::{Error, Result};
use crate::functions;
use crate::parsing::ast::{Expression, Literal, Operator};
use crate::types::coercion::cast_value;
use crate::types::context::ExecutionContext;
use crate::types::evaluator::{self, Truth};
use crate::types::{Row, Value};
use std::collections::{BTreeMap, HashMap};

/// Statement-scoped CTE bindings, chained towards enclosing statements.
/// CTE names shadow table names, and inner bindings shadow outer ones.
pub struct CteScope<'a> {
    pub bindings: BTreeMap<String, Relation>,
    pub parent: Option<&'a CteScope<'a>>,
}

impl<'a> CteScope<'a> {
    /// The root scope with no bindings.
    pub fn root() -> Self {
        Self {
            bindings: BTreeMap::new(),
            parent: None,
        }
    }

    /// An empty scope chained onto a parent.
    pub fn child(parent: &'a CteScope<'a>) -> Self {
        Self {
            bindings: BTreeMap::new(),
            parent: Some(parent),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Relation> {
        match self.bindings.get(name) {
            Some(relation) => Some(relation),
            None => self.parent.and_then(|parent| parent.get(name)),
        }
    }
}

/// One row in scope: its source label (table name or alias), column names
/// and values.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub label: Option<&'a str>,
    pub columns: &'a [String],
    pub row: &'a Row,
}

/// The evaluation environment for one expression.
#[derive(Clone)]
pub struct Environment<'a> {
    pub database: Option<&'a Database>,
    pub ctes: &'a CteScope<'a>,
    pub context: &'a ExecutionContext,
    /// Scopes from outermost to innermost; lookup walks them in reverse.
    pub scopes: Vec<Scope<'a>>,
    /// Finalized aggregate values for the current group.
    pub aggregates: Option<&'a HashMap<Expression, Value>>,
    /// Grouping key values for the current group.
    pub group_keys: Option<&'a HashMap<Expression, Value>>,
}

impl<'a> Environment<'a> {
    pub fn new(
        database: Option<&'a Database>,
        ctes: &'a CteScope<'a>,
        context: &'a ExecutionContext,
    ) -> Self {
        Self {
            database,
            ctes,
            context,
            scopes: Vec::new(),
            aggregates: None,
            group_keys: None,
        }
    }

    /// A copy of this environment with an extra innermost scope. The
    /// scope may borrow from shorter-lived locals than the environment.
    pub fn with_scope<'b>(&'b self, scope: Scope<'b>) -> Environment<'b>
    where
        'a: 'b,
    {
        let mut env = Environment {
            database: self.database,
            ctes: self.ctes,
            context: self.context,
            scopes: self.scopes.clone(),
            aggregates: self.aggregates,
            group_keys: self.group_keys,
        };
        env.scopes.push(scope);
        env
    }

    /// A copy of this environment with different CTE bindings.
    pub fn with_ctes<'b>(&'b self, ctes: &'b CteScope<'b>) -> Environment<'b>
    where
        'a: 'b,
    {
        Environment {
            database: self.database,
            ctes,
            context: self.context,
            scopes: self.scopes.clone(),
            aggregates: self.aggregates,
            group_keys: self.group_keys,
        }
    }

    /// Resolves a column reference against the scope stack, innermost
    /// scope first.
    fn lookup_column(&self, qualifier: Option<&str>, name: &str) -> Result<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(qualifier) = qualifier {
                if scope.label != Some(qualifier) {
                    continue;
                }
            }
            if let Some(index) = scope.columns.iter().position(|c| c == name) {
                return Ok(scope.row[index].clone());
            }
        }
        match qualifier {
            Some(qualifier) => Err(Error::ColumnNotFound(format!("{}.{}", qualifier, name))),
            None => Err(Error::ColumnNotFound(name.to_string())),
        }
    }
}

/// Converts a literal AST node into a runtime value.
pub fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::Str(s.clone()),
        Literal::Date(d) => Value::Date(*d),
        Literal::Time(t) => Value::Time(*t),
        Literal::Timestamp(ts) => Value::Timestamp(*ts),
    }
}

/// Evaluates an expression to a value.
pub fn evaluate(expr: &Expression, env: &Environment) -> Result<Value> {
    // In grouped projection the aggregate and group-key values are already
    // computed; matching subtrees resolve to them directly.
    if let Some(aggregates) = env.aggregates {
        if let Some(value) = aggregates.get(expr) {
            return Ok(value.clone());
        }
    }
    if let Some(group_keys) = env.group_keys {
        if let Some(value) = group_keys.get(expr) {
            return Ok(value.clone());
        }
    }

    match expr {
        Expression::All => Err(Error::ExecutionError(
            "* is not valid in this position".into(),
        )),
        Expression::Column(qualifier, name) => {
            env.lookup_column(qualifier.as_deref(), name)
        }
        Expression::Literal(literal) => Ok(literal_value(literal)),
        Expression::Function(name, args) => {
            if functions::is_aggregate(name) {
                return Err(Error::ExecutionError(format!(
                    "aggregate function {} is not allowed here",
                    name
                )));
            }
            let args = args
                .iter()
                .map(|arg| evaluate(arg, env))
                .collect::<Result<Vec<_>>>()?;
            functions::execute_function(name, &args, env.context)
        }
        Expression::Operator(op) => evaluate_operator(op, env),
        Expression::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            let operand = operand
                .as_ref()
                .map(|operand| evaluate(operand, env))
                .transpose()?;
            for (when, then) in when_clauses {
                let matched = match &operand {
                    // Simple CASE compares the operand against each WHEN.
                    Some(operand) => {
                        evaluator::equal(operand, &evaluate(when, env)?)? == Value::Boolean(true)
                    }
                    // Searched CASE takes the first TRUE condition.
                    None => evaluator::truth(&evaluate(when, env)?)?.is_true(),
                };
                if matched {
                    return evaluate(then, env);
                }
            }
            match else_clause {
                Some(else_expr) => evaluate(else_expr, env),
                None => Ok(Value::Null),
            }
        }
        Expression::Cast { expr, data_type } => {
            let value = evaluate(expr, env)?;
            cast_value(&value, data_type)
        }
        Expression::Subquery(subquery) => {
            let relation = execute_select(subquery, env)?;
            if relation.columns.len() != 1 {
                return Err(Error::ScalarSubqueryTooManyColumns(relation.columns.len()));
            }
            match relation.rows.len() {
                0 => Ok(Value::Null),
                1 => Ok(relation.rows[0][0].clone()),
                _ => Err(Error::ScalarSubqueryTooManyRows),
            }
        }
    }
}

fn evaluate_operator(op: &Operator, env: &Environment) -> Result<Value> {
    use Operator::*;
    match op {
        And(lhs, rhs) => evaluator::and(&evaluate(lhs, env)?, &evaluate(rhs, env)?),
        Or(lhs, rhs) => evaluator::or(&evaluate(lhs, env)?, &evaluate(rhs, env)?),
        Not(expr) => evaluator::not(&evaluate(expr, env)?),

        Equal(lhs, rhs) => evaluator::equal(&evaluate(lhs, env)?, &evaluate(rhs, env)?),
        NotEqual(lhs, rhs) => {
            evaluator::not(&evaluator::equal(&evaluate(lhs, env)?, &evaluate(rhs, env)?)?)
        }
        GreaterThan(lhs, rhs) => evaluator::compare_op(
            &evaluate(lhs, env)?,
            &evaluate(rhs, env)?,
            std::cmp::Ordering::is_gt,
        ),
        GreaterThanOrEqual(lhs, rhs) => evaluator::compare_op(
            &evaluate(lhs, env)?,
            &evaluate(rhs, env)?,
            std::cmp::Ordering::is_ge,
        ),
        LessThan(lhs, rhs) => evaluator::compare_op(
            &evaluate(lhs, env)?,
            &evaluate(rhs, env)?,
            std::cmp::Ordering::is_lt,
        ),
        LessThanOrEqual(lhs, rhs) => evaluator::compare_op(
            &evaluate(lhs, env)?,
            &evaluate(rhs, env)?,
            std::cmp::Ordering::is_le,
        ),

        // IS [NOT] NULL is always two-valued.
        Is { expr, negated } => {
            let value = evaluate(expr, env)?;
            Ok(Value::Boolean(value.is_null() != *negated))
        }

        Like {
            expr,
            pattern,
            case_insensitive,
            negated,
        } => {
            let value = evaluate(expr, env)?;
            let pattern = evaluate(pattern, env)?;
            let truth = match (&value, &pattern) {
                (Value::Null, _) | (_, Value::Null) => Truth::Unknown,
                (Value::Str(s), Value::Str(p)) => {
                    let matched = if *case_insensitive {
                        like_match(&s.to_lowercase(), &p.to_lowercase())
                    } else {
                        like_match(s, p)
                    };
                    if matched {
                        Truth::True
                    } else {
                        Truth::False
                    }
                }
                (value, pattern) => {
                    return Err(Error::TypeMismatch {
                        expected: "string operands for LIKE".into(),
                        found: format!("{} LIKE {}", value, pattern),
                    });
                }
            };
            Ok(apply_negation(truth, *negated))
        }

        // BETWEEN is inclusive: low <= expr AND expr <= high under
        // three-valued logic.
        Between {
            expr,
            low,
            high,
            negated,
        } => {
            let value = evaluate(expr, env)?;
            let low = evaluate(low, env)?;
            let high = evaluate(high, env)?;
            let ge = evaluator::compare_op(&value, &low, std::cmp::Ordering::is_ge)?;
            let le = evaluator::compare_op(&value, &high, std::cmp::Ordering::is_le)?;
            let truth = evaluator::truth(&evaluator::and(&ge, &le)?)?;
            Ok(apply_negation(truth, *negated))
        }

        InList {
            expr,
            list,
            negated,
        } => {
            let value = evaluate(expr, env)?;
            let mut candidates = Vec::with_capacity(list.len());
            for item in list {
                candidates.push(evaluate(item, env)?);
            }
            Ok(apply_negation(membership(&value, &candidates)?, *negated))
        }

        InSubquery {
            expr,
            subquery,
            negated,
        } => {
            let value = evaluate(expr, env)?;
            let relation = execute_select(subquery, env)?;
            if relation.columns.len() != 1 {
                return Err(Error::ScalarSubqueryTooManyColumns(relation.columns.len()));
            }
            let candidates: Vec<Value> =
                relation.rows.into_iter().map(|mut row| row.remove(0)).collect();
            Ok(apply_negation(membership(&value, &candidates)?, *negated))
        }

        Exists { subquery, negated } => {
            let relation = execute_select(subquery, env)?;
            Ok(Value::Boolean(relation.rows.is_empty() == *negated))
        }

        Add(lhs, rhs) => evaluator::add(&evaluate(lhs, env)?, &evaluate(rhs, env)?),
        Subtract(lhs, rhs) => evaluator::subtract(&evaluate(lhs, env)?, &evaluate(rhs, env)?),
        Multiply(lhs, rhs) => evaluator::multiply(&evaluate(lhs, env)?, &evaluate(rhs, env)?),
        Divide(lhs, rhs) => evaluator::divide(&evaluate(lhs, env)?, &evaluate(rhs, env)?),
        Remainder(lhs, rhs) => evaluator::remainder(&evaluate(lhs, env)?, &evaluate(rhs, env)?),
        Negate(expr) => evaluator::negate(&evaluate(expr, env)?),
        Identity(expr) => {
            let value = evaluate(expr, env)?;
            if !value.is_null() && !value.is_numeric() {
                return Err(Error::TypeMismatch {
                    expected: "numeric".into(),
                    found: value.to_string(),
                });
            }
            Ok(value)
        }
    }
}

/// IN membership under three-valued logic: TRUE on a match, NULL if no
/// match but a NULL was involved, FALSE otherwise.
fn membership(value: &Value, candidates: &[Value]) -> Result<Truth> {
    let mut saw_null = value.is_null();
    for candidate in candidates {
        match evaluator::equal(value, candidate)? {
            Value::Boolean(true) => return Ok(Truth::True),
            Value::Null => saw_null = true,
            _ => {}
        }
    }
    if saw_null {
        Ok(Truth::Unknown)
    } else {
        Ok(Truth::False)
    }
}

fn apply_negation(truth: Truth, negated: bool) -> Value {
    if negated {
        truth.not().into()
    } else {
        truth.into()
    }
}

/// SQL LIKE matching: `%` matches any sequence (including empty), `_`
/// matches exactly one character.
fn like_match(s: &str, pattern: &str) -> bool {
    fn matches(s: &[char], p: &[char]) -> bool {
        match (p.first(), s.first()) {
            (None, None) => true,
            (None, Some(_)) => false,
            (Some('%'), _) => {
                // Match zero characters, or consume one and retry.
                matches(s, &p[1..]) || (!s.is_empty() && matches(&s[1..], p))
            }
            (Some('_'), Some(_)) => matches(&s[1..], &p[1..]),
            (Some('_'), None) => false,
            (Some(c), Some(d)) => c == d && matches(&s[1..], &p[1..]),
            (Some(_), None) => false,
        }
    }
    let s: Vec<char> = s.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    matches(&s, &p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_match() {
        assert!(like_match("hello", "hello"));
        assert!(like_match("hello", "h%"));
        assert!(like_match("hello", "%llo"));
        assert!(like_match("hello", "h_llo"));
        assert!(like_match("hello", "%"));
        assert!(like_match("", "%"));
        assert!(!like_match("hello", "h_lo"));
        assert!(!like_match("hello", "hell"));
        assert!(like_match("a%b", "a%b"));
    }

    #[test]
    fn test_membership_three_valued() {
        let values = vec![Value::Integer(1), Value::Null, Value::Integer(2)];
        assert_eq!(
            membership(&Value::Integer(1), &values).unwrap(),
            Truth::True
        );
        // No match, but a NULL candidate makes the result unknown.
        assert_eq!(
            membership(&Value::Integer(9), &values).unwrap(),
            Truth::Unknown
        );
        let no_nulls = vec![Value::Integer(1)];
        assert_eq!(
            membership(&Value::Integer(9), &no_nulls).unwrap(),
            Truth::False
        );
        assert_eq!(
            membership(&Value::Null, &no_nulls).unwrap(),
            Truth::Unknown
        );
    }
}
