//! Value evaluation primitives
//!
//! Arithmetic, comparison and three-valued logic over SQL values, keeping
//! the `Value` type itself as pure data representation.

use super::value::Value;
use crate::error::{Error, Result};
use std::cmp::Ordering;

/// Result of a boolean-valued SQL expression under three-valued logic.
/// Unknown represents a NULL-derived truth value. Predicates collapse to
/// two-valued logic only at admission points (WHERE, HAVING, CHECK).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    pub fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }

    /// WHERE/HAVING admission: only TRUE admits a row.
    pub fn is_true(self) -> bool {
        self == Truth::True
    }
}

impl From<Truth> for Value {
    fn from(truth: Truth) -> Value {
        match truth {
            Truth::True => Value::Boolean(true),
            Truth::False => Value::Boolean(false),
            Truth::Unknown => Value::Null,
        }
    }
}

/// Interpret a value as a three-valued truth. Errors on non-boolean values.
pub fn truth(value: &Value) -> Result<Truth> {
    match value {
        Value::Null => Ok(Truth::Unknown),
        Value::Boolean(true) => Ok(Truth::True),
        Value::Boolean(false) => Ok(Truth::False),
        other => Err(Error::TypeMismatch {
            expected: "BOOLEAN".into(),
            found: type_name(other),
        }),
    }
}

pub fn and(left: &Value, right: &Value) -> Result<Value> {
    Ok(truth(left)?.and(truth(right)?).into())
}

pub fn or(left: &Value, right: &Value) -> Result<Value> {
    Ok(truth(left)?.or(truth(right)?).into())
}

pub fn not(value: &Value) -> Result<Value> {
    Ok(truth(value)?.not().into())
}

/// Performs addition. NULL propagates; INT + INT stays INT with overflow
/// checking; any FLOAT operand promotes the result to FLOAT.
pub fn add(left: &Value, right: &Value) -> Result<Value> {
    numeric_binop(
        left,
        right,
        "+",
        |a, b| {
            a.checked_add(b)
                .ok_or_else(|| Error::ArithmeticOverflow(format!("{} + {}", a, b)))
        },
        |a, b| Ok(a + b),
    )
}

pub fn subtract(left: &Value, right: &Value) -> Result<Value> {
    numeric_binop(
        left,
        right,
        "-",
        |a, b| {
            a.checked_sub(b)
                .ok_or_else(|| Error::ArithmeticOverflow(format!("{} - {}", a, b)))
        },
        |a, b| Ok(a - b),
    )
}

pub fn multiply(left: &Value, right: &Value) -> Result<Value> {
    numeric_binop(
        left,
        right,
        "*",
        |a, b| {
            a.checked_mul(b)
                .ok_or_else(|| Error::ArithmeticOverflow(format!("{} * {}", a, b)))
        },
        |a, b| Ok(a * b),
    )
}

/// Division. Integer division truncates toward zero; dividing by zero is an
/// arithmetic error for both integers and floats.
pub fn divide(left: &Value, right: &Value) -> Result<Value> {
    numeric_binop(
        left,
        right,
        "/",
        |a, b| {
            if b == 0 {
                return Err(Error::DivisionByZero);
            }
            a.checked_div(b)
                .ok_or_else(|| Error::ArithmeticOverflow(format!("{} / {}", a, b)))
        },
        |a, b| {
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            Ok(a / b)
        },
    )
}

/// Modulo. The result takes the sign of the divisor, so equal inputs give
/// the same answer regardless of the host language's native remainder.
pub fn remainder(left: &Value, right: &Value) -> Result<Value> {
    numeric_binop(
        left,
        right,
        "%",
        |a, b| {
            if b == 0 {
                return Err(Error::DivisionByZero);
            }
            let rem = a
                .checked_rem(b)
                .ok_or_else(|| Error::ArithmeticOverflow(format!("{} % {}", a, b)))?;
            Ok(if rem != 0 && (rem < 0) != (b < 0) {
                rem + b
            } else {
                rem
            })
        },
        |a, b| {
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            let rem = a % b;
            Ok(if rem != 0.0 && (rem < 0.0) != (b < 0.0) {
                rem + b
            } else {
                rem
            })
        },
    )
}

pub fn negate(value: &Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Integer(i) | Value::Serial(i) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| Error::ArithmeticOverflow(format!("-{}", i))),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(Error::TypeMismatch {
            expected: "numeric".into(),
            found: type_name(other),
        }),
    }
}

/// Compares two non-NULL values of compatible types.
pub fn compare(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Integer(a) | Value::Serial(a), Value::Integer(b) | Value::Serial(b)) => {
            Ok(a.cmp(b))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let (a, b) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
            Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
        }
        (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Ok(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Ok(a.cmp(b)),
        (a, b) => Err(Error::TypeMismatch {
            expected: type_name(a),
            found: type_name(b),
        }),
    }
}

/// SQL `=`: NULL operands yield NULL, otherwise a boolean.
pub fn equal(left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Boolean(compare(left, right)? == Ordering::Equal))
}

/// A comparison operator under three-valued logic: NULL operands yield NULL.
pub fn compare_op(left: &Value, right: &Value, admit: impl Fn(Ordering) -> bool) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Boolean(admit(compare(left, right)?)))
}

fn numeric_binop(
    left: &Value,
    right: &Value,
    op: &str,
    int_op: impl Fn(i64, i64) -> Result<i64>,
    float_op: impl Fn(f64, f64) -> Result<f64>,
) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Integer(a) | Value::Serial(a), Value::Integer(b) | Value::Serial(b)) => {
            int_op(*a, *b).map(Value::Integer)
        }
        (a, b) if a.is_numeric() && b.is_numeric() => {
            float_op(a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0)).map(Value::Float)
        }
        (a, b) => Err(Error::TypeMismatch {
            expected: "numeric".into(),
            found: format!("{} {} {}", type_name(a), op, type_name(b)),
        }),
    }
}

fn type_name(value: &Value) -> String {
    value
        .data_type()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "NULL".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_valued_truth_tables() {
        use Truth::*;
        // AND
        assert_eq!(Unknown.and(False), False);
        assert_eq!(Unknown.and(True), Unknown);
        assert_eq!(Unknown.and(Unknown), Unknown);
        assert_eq!(True.and(True), True);
        assert_eq!(True.and(False), False);
        // OR
        assert_eq!(Unknown.or(True), True);
        assert_eq!(Unknown.or(False), Unknown);
        assert_eq!(Unknown.or(Unknown), Unknown);
        assert_eq!(False.or(False), False);
        // NOT
        assert_eq!(Unknown.not(), Unknown);
        assert_eq!(True.not(), False);
        assert_eq!(False.not(), True);
    }

    #[test]
    fn test_arithmetic_promotion() {
        assert_eq!(
            add(&Value::Integer(1), &Value::Integer(2)).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            add(&Value::Integer(1), &Value::Float(2.5)).unwrap(),
            Value::Float(3.5)
        );
        assert_eq!(add(&Value::Null, &Value::Integer(1)).unwrap(), Value::Null);
    }

    #[test]
    fn test_integer_overflow_detected() {
        assert!(add(&Value::Integer(i64::MAX), &Value::Integer(1)).is_err());
        assert!(negate(&Value::Integer(i64::MIN)).is_err());
    }

    #[test]
    fn test_integer_division_truncates_toward_zero() {
        assert_eq!(
            divide(&Value::Integer(-7), &Value::Integer(2)).unwrap(),
            Value::Integer(-3)
        );
        assert_eq!(
            divide(&Value::Integer(7), &Value::Integer(2)).unwrap(),
            Value::Integer(3)
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            divide(&Value::Integer(1), &Value::Integer(0)),
            Err(Error::DivisionByZero)
        );
        assert_eq!(
            divide(&Value::Float(1.0), &Value::Float(0.0)),
            Err(Error::DivisionByZero)
        );
    }

    #[test]
    fn test_remainder_takes_divisor_sign() {
        assert_eq!(
            remainder(&Value::Integer(7), &Value::Integer(3)).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            remainder(&Value::Integer(-7), &Value::Integer(3)).unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            remainder(&Value::Integer(7), &Value::Integer(-3)).unwrap(),
            Value::Integer(-2)
        );
    }

    #[test]
    fn test_null_comparison_is_unknown() {
        assert_eq!(
            equal(&Value::Null, &Value::Integer(1)).unwrap(),
            Value::Null
        );
        assert_eq!(
            equal(&Value::Integer(1), &Value::Integer(1)).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_serial_compares_as_integer() {
        assert_eq!(
            equal(&Value::Serial(3), &Value::Integer(3)).unwrap(),
            Value::Boolean(true)
        );
    }
}
