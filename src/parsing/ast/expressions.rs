//! SQL expressions and operators

use super::dml::SelectStatement;
use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// SQL expressions, e.g. `a + 7 > b`. Can be nested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    /// All columns, i.e. *.
    All,
    /// A column reference, optionally qualified with a table name or alias.
    Column(Option<String>, String),
    /// A literal value.
    Literal(Literal),
    /// A function call (name and arguments). Aggregate DISTINCT forms are
    /// lowered to a `<NAME>_DISTINCT` function name by the parser.
    Function(String, Vec<Expression>),
    /// An operator.
    Operator(Operator),
    /// CASE expression, searched (no operand) or simple (with operand).
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<(Expression, Expression)>,
        else_clause: Option<Box<Expression>>,
    },
    /// CAST(expr AS type).
    Cast {
        expr: Box<Expression>,
        data_type: DataType,
    },
    /// A scalar subquery: (SELECT ...) in expression position.
    Subquery(Box<SelectStatement>),
}

/// Expression literal values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    Timestamp(chrono::NaiveDateTime),
}

/// Expression operators.
///
/// Since this is a recursive data structure, each child expression is boxed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    And(Box<Expression>, Box<Expression>), // a AND b
    Or(Box<Expression>, Box<Expression>),  // a OR b
    Not(Box<Expression>),                  // NOT a

    Equal(Box<Expression>, Box<Expression>),              // a = b
    NotEqual(Box<Expression>, Box<Expression>),           // a != b, a <> b
    GreaterThan(Box<Expression>, Box<Expression>),        // a > b
    GreaterThanOrEqual(Box<Expression>, Box<Expression>), // a >= b
    LessThan(Box<Expression>, Box<Expression>),           // a < b
    LessThanOrEqual(Box<Expression>, Box<Expression>),    // a <= b

    /// a IS NULL or a IS NOT NULL; always two-valued.
    Is {
        expr: Box<Expression>,
        negated: bool,
    },
    /// a [NOT] LIKE b, a [NOT] ILIKE b
    Like {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        case_insensitive: bool,
        negated: bool,
    },
    /// a [NOT] BETWEEN low AND high (inclusive)
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    /// a [NOT] IN (x, y, z)
    InList {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    /// a [NOT] IN (SELECT ...)
    InSubquery {
        expr: Box<Expression>,
        subquery: Box<SelectStatement>,
        negated: bool,
    },
    /// [NOT] EXISTS (SELECT ...)
    Exists {
        subquery: Box<SelectStatement>,
        negated: bool,
    },

    Add(Box<Expression>, Box<Expression>),       // a + b
    Subtract(Box<Expression>, Box<Expression>),  // a - b
    Multiply(Box<Expression>, Box<Expression>),  // a * b
    Divide(Box<Expression>, Box<Expression>),    // a / b
    Remainder(Box<Expression>, Box<Expression>), // a % b
    Negate(Box<Expression>),                     // -a
    Identity(Box<Expression>),                   // +a
}

/// To allow using literals in hashmaps and structural comparisons, equality
/// is by value for all variants, including Null and float bit patterns. SQL
/// semantics for NULL are handled by expression evaluation, not here.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Integer(l), Self::Integer(r)) => l == r,
            (Self::Float(l), Self::Float(r)) => l.to_bits() == r.to_bits(),
            (Self::String(l), Self::String(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (_, _) => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(v) => v.hash(state),
            Self::Integer(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
            Self::Time(v) => v.hash(state),
            Self::Timestamp(v) => v.hash(state),
        }
    }
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Literal(literal)
    }
}

impl From<Operator> for Expression {
    fn from(operator: Operator) -> Self {
        Expression::Operator(operator)
    }
}

impl Expression {
    /// Walks the expression tree depth-first, calling a closure for every
    /// node. Halts and returns false if the closure returns false.
    /// Subquery bodies are not descended into; they have their own scope.
    pub fn walk(&self, visitor: &mut impl FnMut(&Expression) -> bool) -> bool {
        use Operator::*;

        if !visitor(self) {
            return false;
        }

        match self {
            Self::Operator(op) => match op {
                Add(lhs, rhs)
                | And(lhs, rhs)
                | Divide(lhs, rhs)
                | Equal(lhs, rhs)
                | GreaterThan(lhs, rhs)
                | GreaterThanOrEqual(lhs, rhs)
                | LessThan(lhs, rhs)
                | LessThanOrEqual(lhs, rhs)
                | Multiply(lhs, rhs)
                | NotEqual(lhs, rhs)
                | Or(lhs, rhs)
                | Remainder(lhs, rhs)
                | Subtract(lhs, rhs) => lhs.walk(visitor) && rhs.walk(visitor),

                Identity(expr) | Negate(expr) | Not(expr) => expr.walk(visitor),

                Is { expr, .. } => expr.walk(visitor),

                Like { expr, pattern, .. } => expr.walk(visitor) && pattern.walk(visitor),

                InList { expr, list, .. } => {
                    expr.walk(visitor) && list.iter().all(|e| e.walk(visitor))
                }

                InSubquery { expr, .. } => expr.walk(visitor),

                Exists { .. } => true,

                Between {
                    expr, low, high, ..
                } => expr.walk(visitor) && low.walk(visitor) && high.walk(visitor),
            },

            Self::Function(_, exprs) => exprs.iter().all(|expr| expr.walk(visitor)),

            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(op) = operand {
                    if !op.walk(visitor) {
                        return false;
                    }
                }
                for (cond, result) in when_clauses {
                    if !cond.walk(visitor) || !result.walk(visitor) {
                        return false;
                    }
                }
                if let Some(else_expr) = else_clause {
                    if !else_expr.walk(visitor) {
                        return false;
                    }
                }
                true
            }

            Self::Cast { expr, .. } => expr.walk(visitor),

            _ => true,
        }
    }

    /// Transforms the expression tree depth-first, applying a closure to
    /// every node. Subquery bodies are left untouched.
    pub fn transform(&mut self, transformer: &mut impl FnMut(&mut Expression)) {
        use Operator::*;

        match self {
            Self::Operator(op) => match op {
                Add(lhs, rhs)
                | And(lhs, rhs)
                | Divide(lhs, rhs)
                | Equal(lhs, rhs)
                | GreaterThan(lhs, rhs)
                | GreaterThanOrEqual(lhs, rhs)
                | LessThan(lhs, rhs)
                | LessThanOrEqual(lhs, rhs)
                | Multiply(lhs, rhs)
                | NotEqual(lhs, rhs)
                | Or(lhs, rhs)
                | Remainder(lhs, rhs)
                | Subtract(lhs, rhs) => {
                    lhs.transform(transformer);
                    rhs.transform(transformer);
                }
                Identity(expr) | Negate(expr) | Not(expr) => expr.transform(transformer),
                Is { expr, .. } => expr.transform(transformer),
                Like { expr, pattern, .. } => {
                    expr.transform(transformer);
                    pattern.transform(transformer);
                }
                InList { expr, list, .. } => {
                    expr.transform(transformer);
                    for item in list {
                        item.transform(transformer);
                    }
                }
                InSubquery { expr, .. } => expr.transform(transformer),
                Exists { .. } => {}
                Between {
                    expr, low, high, ..
                } => {
                    expr.transform(transformer);
                    low.transform(transformer);
                    high.transform(transformer);
                }
            },
            Self::Function(_, exprs) => {
                for expr in exprs {
                    expr.transform(transformer);
                }
            }
            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(op) = operand {
                    op.transform(transformer);
                }
                for (cond, result) in when_clauses {
                    cond.transform(transformer);
                    result.transform(transformer);
                }
                if let Some(else_expr) = else_clause {
                    else_expr.transform(transformer);
                }
            }
            Self::Cast { expr, .. } => expr.transform(transformer),
            _ => {}
        }

        transformer(self);
    }

    /// Returns whether the expression references the given column name
    /// anywhere, ignoring qualification.
    pub fn references_column(&self, name: &str) -> bool {
        !self.walk(&mut |expr| !matches!(expr, Expression::Column(_, n) if n == name))
    }

    /// Returns whether the expression is a constant, without any column
    /// references.
    pub fn is_constant(&self) -> bool {
        self.walk(&mut |expr| !matches!(expr, Self::Column(_, _)))
    }
}
