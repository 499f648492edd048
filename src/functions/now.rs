//! NOW function - the statement's captured timestamp

use super::{check_arity, Function, FunctionRegistry, FunctionSignature};
use crate::error::Result;
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct NowFunction;

impl Function for NowFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature { name: "NOW" };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], context: &ExecutionContext) -> Result<Value> {
        check_arity("NOW", args, 0)?;
        Ok(Value::Timestamp(context.now()))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(NowFunction));
}
