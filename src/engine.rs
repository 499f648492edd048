//! The session engine: parses and executes statements against a catalog,
//! owns the snapshot and clock ports, and captures the wall clock once
//! per statement.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::execution::{self, ExecutionResult};
use crate::parsing::{Lexer, Parser, Token};
use crate::storage::{decode_database, encode_database, MemoryStore, SnapshotStore};
use crate::types::context::ExecutionContext;
use chrono::NaiveDateTime;
use tracing::debug;

/// The clock port: read at most once per statement.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A frozen clock, mainly for tests.
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// A database engine session: one catalog, executing one statement at a
/// time to completion.
pub struct Engine {
    catalog: Catalog,
    store: Box<dyn SnapshotStore>,
    clock: Box<dyn Clock>,
}

impl Engine {
    /// Creates an engine with an in-memory snapshot store and the system
    /// clock.
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            store: Box::new(MemoryStore::new()),
            clock: Box::new(SystemClock),
        }
    }

    /// Creates an engine persisting snapshots through the given store.
    pub fn with_store(store: Box<dyn SnapshotStore>) -> Self {
        Self {
            catalog: Catalog::new(),
            store,
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the clock port.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Read access to the catalog, for inspection and tests.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parses and executes a single statement.
    pub fn execute(&mut self, sql: &str) -> Result<ExecutionResult> {
        let statement = Parser::parse(sql)?;
        self.run(&statement)
    }

    /// Executes a batch of semicolon-separated statements in order. The
    /// first failure stops the batch: earlier statements stay committed,
    /// later ones never run. Each statement is lexed and parsed only when
    /// its turn comes.
    pub fn execute_batch(&mut self, sql: &str) -> Result<Vec<ExecutionResult>> {
        let end = sql.chars().count();
        let mut lexer = Lexer::new(sql);
        let mut results = Vec::new();
        loop {
            // Pull tokens up to the next statement separator.
            let mut tokens = Vec::new();
            loop {
                match lexer.next() {
                    Some(Ok((_, Token::Semicolon))) if tokens.is_empty() => continue,
                    Some(Ok((_, Token::Semicolon))) => break,
                    Some(Ok(token)) => tokens.push(token),
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
            if tokens.is_empty() {
                break;
            }
            let mut parser = Parser::from_tokens(tokens, end);
            let statement = parser.parse_statement()?;
            parser.expect_statement_end()?;
            results.push(self.run(&statement)?);
        }
        Ok(results)
    }

    fn run(&mut self, statement: &crate::parsing::ast::Statement) -> Result<ExecutionResult> {
        let context = ExecutionContext::new(self.clock.now());
        debug!(statement = %statement, "executing statement");
        execution::execute_statement(statement, &mut self.catalog, &context)
    }

    /// Persists a complete snapshot of one database through the snapshot
    /// port. In-memory state is untouched by I/O failures.
    pub fn save_database(&self, name: &str) -> Result<()> {
        let database = self
            .catalog
            .databases
            .get(name)
            .ok_or_else(|| Error::DatabaseNotFound(name.to_string()))?;
        let bytes = encode_database(database)?;
        self.store.save(name, &bytes)
    }

    /// Restores a database from its snapshot, inserting (or replacing) it
    /// in the catalog.
    pub fn load_database(&mut self, name: &str) -> Result<()> {
        let bytes = self.store.load(name)?;
        let database = decode_database(&bytes)?;
        self.catalog.databases.insert(database.name.clone(), database);
        Ok(())
    }

    /// Lists the snapshot names available through the port.
    pub fn list_snapshots(&self) -> Result<Vec<String>> {
        self.store.list()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
