//! CURRENT_DATE function - the statement's captured date

use super::{check_arity, Function, FunctionRegistry, FunctionSignature};
use crate::error::Result;
use crate::types::context::ExecutionContext;
use crate::types::Value;

pub struct CurrentDateFunction;

impl Function for CurrentDateFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature {
            name: "CURRENT_DATE",
        };
        &SIGNATURE
    }

    fn execute(&self, args: &[Value], context: &ExecutionContext) -> Result<Value> {
        check_arity("CURRENT_DATE", args, 0)?;
        Ok(Value::Date(context.today()))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Box::new(CurrentDateFunction));
}
