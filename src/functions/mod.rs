//! Scalar SQL function definitions and registry.
//!
//! Each function lives in its own module and registers itself into a
//! global registry. Aggregates (COUNT, SUM, AVG, MIN, MAX) are not scalar
//! functions: the executor collects their argument values per group and
//! finalizes them through the accumulators in `execution::aggregator`.

use crate::error::{Error, Result};
use crate::types::context::ExecutionContext;
use crate::types::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

// String functions
mod concat;
mod length;
mod lower;
mod replace;
mod substring;
mod trim;
mod upper;

// Math functions
mod abs;
mod ceil;
mod floor;
mod round;

// Conditional functions
mod coalesce;
mod nullif;

// Date/time functions
mod current_date;
mod datediff;
mod extract;
mod now;

/// Metadata about a function.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Function name (uppercase).
    pub name: &'static str,
}

/// Trait for scalar SQL functions. Arity and argument types are checked at
/// execution time; there is no separate analysis phase in this pipeline.
pub trait Function: Send + Sync {
    fn signature(&self) -> &FunctionSignature;

    fn execute(&self, args: &[Value], context: &ExecutionContext) -> Result<Value>;
}

/// Registry of all scalar functions.
pub struct FunctionRegistry {
    functions: HashMap<String, Box<dyn Function>>,
}

impl FunctionRegistry {
    fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        upper::register(&mut registry);
        lower::register(&mut registry);
        length::register(&mut registry);
        substring::register(&mut registry);
        concat::register(&mut registry);
        replace::register(&mut registry);
        trim::register(&mut registry);

        abs::register(&mut registry);
        ceil::register(&mut registry);
        floor::register(&mut registry);
        round::register(&mut registry);

        coalesce::register(&mut registry);
        nullif::register(&mut registry);

        current_date::register(&mut registry);
        now::register(&mut registry);
        extract::register(&mut registry);
        datediff::register(&mut registry);

        registry
    }

    fn register(&mut self, function: Box<dyn Function>) {
        let name = function.signature().name.to_string();
        self.functions.insert(name, function);
    }
}

static REGISTRY: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::new);

/// Looks up a scalar function by name, case-insensitively.
pub fn get_function(name: &str) -> Option<&'static dyn Function> {
    REGISTRY
        .functions
        .get(&name.to_uppercase())
        .map(|f| f.as_ref())
}

/// The aggregate function names, including the DISTINCT forms the parser
/// lowers to `<NAME>_DISTINCT`.
pub fn is_aggregate(name: &str) -> bool {
    matches!(
        name.to_uppercase().as_str(),
        "COUNT"
            | "SUM"
            | "AVG"
            | "MIN"
            | "MAX"
            | "COUNT_DISTINCT"
            | "SUM_DISTINCT"
            | "AVG_DISTINCT"
            | "MIN_DISTINCT"
            | "MAX_DISTINCT"
    )
}

/// Executes a scalar function.
pub fn execute_function(name: &str, args: &[Value], context: &ExecutionContext) -> Result<Value> {
    match get_function(name) {
        Some(function) => function.execute(args, context),
        None => Err(Error::UnknownFunction(name.to_string())),
    }
}

/// Checks an exact argument count.
pub(crate) fn check_arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::ExecutionError(format!(
            "{} takes {} argument{}, got {}",
            name,
            expected,
            if expected == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

/// Extracts a string argument.
pub(crate) fn string_arg(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(Error::TypeMismatch {
            expected: format!("string argument for {}", name),
            found: other.to_string(),
        }),
    }
}

/// Extracts an integer argument.
pub(crate) fn integer_arg(name: &str, value: &Value) -> Result<i64> {
    value.as_integer().ok_or_else(|| Error::TypeMismatch {
        expected: format!("integer argument for {}", name),
        found: value.to_string(),
    })
}
