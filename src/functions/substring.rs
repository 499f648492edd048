//! SUBSTRING function - extracts a 1-indexed substring

use super::{integer_arg, string_arg, Function, FunctionRegistry, FunctionSignature};
use crate::error::{Error, Result};
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct SubstringFunction;

impl Function for SubstringFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "SUBSTRING" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        if args.len() < 2 || args.len() > 3 {
            return Err(Error::ExecutionError(format!(
                "SUBSTRING takes 2 or 3 arguments, got {}",
                args.len()
            )));
        }
        if args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }

        let s = string_arg("SUBSTRING", &args[0])?;
        let start = integer_arg("SUBSTRING", &args[1])?;
        let length = args.get(2).map(|v| integer_arg("SUBSTRING", v)).transpose()?;

        if let Some(length) = length {
            if length < 0 {
                return Err(Error::ExecutionError(
                    "SUBSTRING length must be non-negative".into(),
                ));
            }
        }

        let chars: Vec<char> = s.chars().collect();
        // SQL positions are 1-based; a start outside the string yields an
        // empty result rather than an error.
        if start < 1 || start as usize > chars.len() {
            return Ok(Value::string(""));
        }
        let begin = (start - 1) as usize;
        let end = match length {
            Some(length) => (begin + length as usize).min(chars.len()),
            None => chars.len(),
        };
        Ok(Value::Str(chars[begin..end].iter().collect()))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(SubstringFunction));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(NaiveDateTime::default())
    }

    #[test]
    fn test_substring() {
        let f = SubstringFunction;
        assert_eq!(
            f.execute(&[Value::string("hello world"), Value::Integer(7)], &ctx())
                .unwrap(),
            Value::string("world")
        );
        assert_eq!(
            f.execute(
                &[
                    Value::string("hello"),
                    Value::Integer(2),
                    Value::Integer(3)
                ],
                &ctx()
            )
            .unwrap(),
            Value::string("ell")
        );
        // Out-of-range start yields an empty string.
        assert_eq!(
            f.execute(&[Value::string("hi"), Value::Integer(10)], &ctx())
                .unwrap(),
            Value::string("")
        );
        assert_eq!(
            f.execute(&[Value::string("hi"), Value::Integer(0)], &ctx())
                .unwrap(),
            Value::string("")
        );
        // Negative length fails.
        assert!(f
            .execute(
                &[
                    Value::string("hi"),
                    Value::Integer(1),
                    Value::Integer(-1)
                ],
                &ctx()
            )
            .is_err());
        // NULL propagates.
        assert_eq!(
            f.execute(&[Value::Null, Value::Integer(1)], &ctx()).unwrap(),
            Value::Null
        );
    }
}
