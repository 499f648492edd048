//! Aggregation for GROUP BY queries.
//!
//! The aggregator buckets rows by their grouping key and feeds each
//! aggregate call's argument values into an accumulator per bucket.
//! Buckets keep first-seen order so grouped output is deterministic.

use super::expression::{evaluate, Environment};
use crate::error::{Error, Result};
use crate::functions;
use crate::parsing::ast::Expression;
use crate::types::{evaluator, Value};
use std::collections::{HashMap, HashSet};

/// A parsed aggregate call: which function, whether DISTINCT, and its
/// argument expression (None for COUNT(*)).
struct AggregateSpec {
    kind: AggregateKind,
    distinct: bool,
    arg: Option<Expression>,
}

#[derive(Clone, Copy, PartialEq)]
enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// Parses an aggregate function call node.
fn parse_aggregate(expr: &Expression) -> Result<AggregateSpec> {
    let (name, args) = match expr {
        Expression::Function(name, args) if functions::is_aggregate(name) => (name, args),
        other => {
            return Err(Error::ExecutionError(format!(
                "not an aggregate call: {}",
                other
            )));
        }
    };

    let upper = name.to_uppercase();
    let (base, distinct) = match upper.strip_suffix("_DISTINCT") {
        Some(base) => (base.to_string(), true),
        None => (upper, false),
    };
    let kind = match base.as_str() {
        "COUNT" => AggregateKind::Count,
        "SUM" => AggregateKind::Sum,
        "AVG" => AggregateKind::Avg,
        "MIN" => AggregateKind::Min,
        "MAX" => AggregateKind::Max,
        other => return Err(Error::UnknownFunction(other.to_string())),
    };

    if args.len() != 1 {
        return Err(Error::ExecutionError(format!(
            "{} takes exactly one argument",
            base
        )));
    }
    let arg = match &args[0] {
        // COUNT(*) counts rows, NULLs included.
        Expression::All if kind == AggregateKind::Count && !distinct => None,
        Expression::All => {
            return Err(Error::ExecutionError(format!(
                "{} does not accept *",
                base
            )));
        }
        arg => {
            let mut nested = false;
            arg.walk(&mut |node| {
                if matches!(node, Expression::Function(name, _) if functions::is_aggregate(name)) {
                    nested = true;
                }
                !nested
            });
            if nested {
                return Err(Error::ExecutionError(
                    "aggregate functions cannot be nested".into(),
                ));
            }
            Some(arg.clone())
        }
    };

    Ok(AggregateSpec {
        kind,
        distinct,
        arg,
    })
}

/// Accumulates one aggregate over the rows of one group.
trait Accumulator {
    fn add(&mut self, value: Value) -> Result<()>;
    fn finalize(self: Box<Self>) -> Result<Value>;
}

/// COUNT: rows for COUNT(*), non-NULL values otherwise.
struct CountAccumulator {
    count: i64,
    count_nulls: bool,
}

impl Accumulator for CountAccumulator {
    fn add(&mut self, value: Value) -> Result<()> {
        if self.count_nulls || !value.is_null() {
            self.count += 1;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(Value::Integer(self.count))
    }
}

/// SUM: NULLs ignored; the sum of nothing is NULL.
struct SumAccumulator {
    sum: Value,
}

impl Accumulator for SumAccumulator {
    fn add(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        self.sum = if self.sum.is_null() {
            value
        } else {
            evaluator::add(&self.sum, &value)?
        };
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(self.sum)
    }
}

/// AVG: NULLs ignored; empty is NULL. Integer inputs average as FLOAT.
struct AvgAccumulator {
    sum: Value,
    count: i64,
}

impl Accumulator for AvgAccumulator {
    fn add(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        self.sum = if self.sum.is_null() {
            value
        } else {
            evaluator::add(&self.sum, &value)?
        };
        self.count += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        if self.count == 0 {
            return Ok(Value::Null);
        }
        let sum = match self.sum {
            Value::Integer(i) | Value::Serial(i) => Value::Float(i as f64),
            sum => sum,
        };
        evaluator::divide(&sum, &Value::Float(self.count as f64))
    }
}

/// MIN: NULLs ignored; empty is NULL.
struct MinAccumulator {
    min: Value,
}

impl Accumulator for MinAccumulator {
    fn add(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        if self.min.is_null() || evaluator::compare(&value, &self.min)?.is_lt() {
            self.min = value;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(self.min)
    }
}

/// MAX: NULLs ignored; empty is NULL.
struct MaxAccumulator {
    max: Value,
}

impl Accumulator for MaxAccumulator {
    fn add(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        if self.max.is_null() || evaluator::compare(&value, &self.max)?.is_gt() {
            self.max = value;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(self.max)
    }
}

/// Deduplicates the value stream in front of an inner accumulator.
struct DistinctAccumulator {
    seen: HashSet<Value>,
    inner: Box<dyn Accumulator>,
}

impl Accumulator for DistinctAccumulator {
    fn add(&mut self, value: Value) -> Result<()> {
        if value.is_null() || self.seen.insert(value.clone()) {
            self.inner.add(value)?;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        self.inner.finalize()
    }
}

fn new_accumulator(spec: &AggregateSpec) -> Box<dyn Accumulator> {
    let inner: Box<dyn Accumulator> = match spec.kind {
        AggregateKind::Count => Box::new(CountAccumulator {
            count: 0,
            count_nulls: spec.arg.is_none(),
        }),
        AggregateKind::Sum => Box::new(SumAccumulator { sum: Value::Null }),
        AggregateKind::Avg => Box::new(AvgAccumulator {
            sum: Value::Null,
            count: 0,
        }),
        AggregateKind::Min => Box::new(MinAccumulator { min: Value::Null }),
        AggregateKind::Max => Box::new(MaxAccumulator { max: Value::Null }),
    };
    if spec.distinct {
        Box::new(DistinctAccumulator {
            seen: HashSet::new(),
            inner,
        })
    } else {
        inner
    }
}

/// One finalized group: its key values, the computed aggregate values
/// keyed by their call expression, and a representative source row index
/// for evaluating grouping-key expressions.
pub struct Group {
    pub key: Vec<Value>,
    pub aggregates: HashMap<Expression, Value>,
    pub representative: Option<usize>,
}

/// Buckets rows by grouping key and accumulates aggregate calls.
pub struct Aggregator {
    group_by: Vec<Expression>,
    calls: Vec<(Expression, AggregateSpec)>,
    /// Buckets in first-seen order.
    buckets: Vec<(Vec<Value>, Vec<Box<dyn Accumulator>>, usize)>,
    index: HashMap<Vec<Value>, usize>,
}

impl Aggregator {
    /// Creates an aggregator for the given grouping keys and the aggregate
    /// call expressions collected from the select, having and order-by
    /// clauses.
    pub fn new(group_by: Vec<Expression>, aggregate_calls: Vec<Expression>) -> Result<Self> {
        let calls = aggregate_calls
            .into_iter()
            .map(|expr| {
                let spec = parse_aggregate(&expr)?;
                Ok((expr, spec))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            group_by,
            calls,
            buckets: Vec::new(),
            index: HashMap::new(),
        })
    }

    /// Adds one source row, evaluated through the given environment.
    pub fn add(&mut self, env: &Environment, row_index: usize) -> Result<()> {
        let key = self
            .group_by
            .iter()
            .map(|expr| evaluate(expr, env))
            .collect::<Result<Vec<_>>>()?;

        let bucket = match self.index.get(&key) {
            Some(&at) => at,
            None => {
                let accumulators = self.calls.iter().map(|(_, spec)| new_accumulator(spec)).collect();
                self.buckets.push((key.clone(), accumulators, row_index));
                self.index.insert(key, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };

        let accumulators = &mut self.buckets[bucket].1;
        for ((_, spec), accumulator) in self.calls.iter().zip(accumulators.iter_mut()) {
            let value = match &spec.arg {
                Some(arg) => evaluate(arg, env)?,
                // COUNT(*): every row counts.
                None => Value::Integer(1),
            };
            accumulator.add(value)?;
        }
        Ok(())
    }

    /// Finalizes all groups. With no GROUP BY keys an empty input still
    /// produces a single group over zero rows.
    pub fn finalize(mut self) -> Result<Vec<Group>> {
        if self.buckets.is_empty() && self.group_by.is_empty() {
            let accumulators: Vec<_> =
                self.calls.iter().map(|(_, spec)| new_accumulator(spec)).collect();
            self.buckets.push((Vec::new(), accumulators, usize::MAX));
        }
        self.buckets
            .into_iter()
            .map(|(key, accumulators, representative)| {
                let mut aggregates = HashMap::new();
                for ((expr, _), accumulator) in self.calls.iter().zip(accumulators) {
                    aggregates.insert(expr.clone(), accumulator.finalize()?);
                }
                Ok(Group {
                    key,
                    aggregates,
                    representative: (representative != usize::MAX).then_some(representative),
                })
            })
            .collect()
    }
}

/// Collects the aggregate call nodes in an expression, without descending
/// into their arguments or into subqueries.
pub fn collect_aggregates(expr: &Expression, out: &mut Vec<Expression>) {
    match expr {
        Expression::Function(name, _) if functions::is_aggregate(name) => {
            if !out.contains(expr) {
                out.push(expr.clone());
            }
        }
        Expression::Function(_, args) => {
            for arg in args {
                collect_aggregates(arg, out);
            }
        }
        Expression::Operator(op) => {
            use crate::parsing::ast::Operator::*;
            match op {
                Add(a, b) | And(a, b) | Divide(a, b) | Equal(a, b) | GreaterThan(a, b)
                | GreaterThanOrEqual(a, b) | LessThan(a, b) | LessThanOrEqual(a, b)
                | Multiply(a, b) | NotEqual(a, b) | Or(a, b) | Remainder(a, b)
                | Subtract(a, b) => {
                    collect_aggregates(a, out);
                    collect_aggregates(b, out);
                }
                Identity(e) | Negate(e) | Not(e) => collect_aggregates(e, out),
                Is { expr, .. } => collect_aggregates(expr, out),
                Like { expr, pattern, .. } => {
                    collect_aggregates(expr, out);
                    collect_aggregates(pattern, out);
                }
                Between {
                    expr, low, high, ..
                } => {
                    collect_aggregates(expr, out);
                    collect_aggregates(low, out);
                    collect_aggregates(high, out);
                }
                InList { expr, list, .. } => {
                    collect_aggregates(expr, out);
                    for item in list {
                        collect_aggregates(item, out);
                    }
                }
                InSubquery { expr, .. } => collect_aggregates(expr, out),
                Exists { .. } => {}
            }
        }
        Expression::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            if let Some(operand) = operand {
                collect_aggregates(operand, out);
            }
            for (when, then) in when_clauses {
                collect_aggregates(when, out);
                collect_aggregates(then, out);
            }
            if let Some(else_expr) = else_clause {
                collect_aggregates(else_expr, out);
            }
        }
        Expression::Cast { expr, .. } => collect_aggregates(expr, out),
        _ => {}
    }
}

/// Whether the expression contains any aggregate call.
pub fn has_aggregates(expr: &Expression) -> bool {
    let mut calls = Vec::new();
    collect_aggregates(expr, &mut calls);
    !calls.is_empty()
}
