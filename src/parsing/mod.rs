//! SQL parsing: lexer, AST and recursive-descent parser.

pub mod ast;
mod lexer;
mod parser;

pub use lexer::{Keyword, Lexer, Token};
pub use parser::Parser;

use crate::error::Result;
use ast::Statement;

/// Parse a SQL string into a single statement AST.
pub fn parse_sql(sql: &str) -> Result<Statement> {
    Parser::parse(sql)
}
