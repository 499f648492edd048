//! Per-statement execution context.

use chrono::{NaiveDate, NaiveDateTime};

/// Context for executing a single statement. The wall clock is read once
/// when the statement starts, so CURRENT_DATE and NOW() are consistent
/// within the statement.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    now: NaiveDateTime,
}

impl ExecutionContext {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// The statement's captured timestamp.
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// The statement's captured date.
    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }
}
