//! An educational in-memory relational database engine.
//!
//! terndb implements a PostgreSQL-flavored SQL subset end to end: a
//! hand-written lexer and recursive-descent parser, an AST-walking
//! executor with three-valued logic, typed columns with constraints,
//! views and materialized views, common table expressions, set
//! operations and subqueries. Databases live in memory; persistence goes
//! through an opaque snapshot port that round-trips whole databases.
//!
//! ```
//! use terndb::Engine;
//!
//! let mut engine = Engine::new();
//! engine.execute_batch(
//!     "CREATE DATABASE shop; USE shop;
//!      CREATE TABLE items (id SERIAL PRIMARY KEY, name TEXT NOT NULL);
//!      INSERT INTO items (name) VALUES ('anchor'), ('bell');",
//! ).unwrap();
//! let result = engine.execute("SELECT name FROM items ORDER BY id").unwrap();
//! ```

pub mod catalog;
mod engine;
pub mod error;
pub mod execution;
mod functions;
pub mod parsing;
pub mod storage;
pub mod types;

pub use engine::{Clock, Engine, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use execution::ExecutionResult;
pub use types::{DataType, Row, Value};
