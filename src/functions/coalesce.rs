//! COALESCE function - first non-NULL argument

use super::{Function, FunctionRegistry, FunctionSignature};
use crate::error::{Error, Result};
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct CoalesceFunction;

impl Function for CoalesceFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "COALESCE" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], _context: &ExecutionContext) -> Result<Value> {
        if args.is_empty() {
            return Err(Error::ExecutionError(
                "COALESCE takes at least 1 argument".into(),
            ));
        }
        Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(CoalesceFunction));
}
