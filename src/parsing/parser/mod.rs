//! Recursive-descent SQL parser
//!
//! The parser is split into focused modules:
//! - expr_parser: expression parsing with operator precedence climbing
//! - type_parser: data type parsing
//! - ddl_parser: CREATE / DROP / ALTER / REFRESH / USE statements
//! - dml_parser: SELECT / INSERT / UPDATE / DELETE statements
//! - literal_parser: literal values, including typed date/time literals
//! - token_helper: token navigation shared by all of the above
//!
//! The input is lexed eagerly into (position, token) pairs so every syntax
//! error can report the character offset of the offending token.

pub mod ddl_parser;
pub mod dml_parser;
pub mod expr_parser;
pub mod literal_parser;
pub mod token_helper;
pub mod type_parser;

use self::ddl_parser::DdlParser;
use self::dml_parser::DmlParser;
use self::expr_parser::ExpressionParser;
use self::literal_parser::LiteralParser;
use self::token_helper::TokenHelper;
use self::type_parser::TypeParser;
use super::ast::{Expression, SelectStatement, Statement};
use super::lexer::{Keyword, Lexer, Token};
use crate::error::{Error, Result};

/// The SQL parser: takes lexed tokens and builds statement ASTs. Only
/// syntax is checked here; whether tables or columns exist is the
/// executor's concern.
pub struct Parser {
    tokens: Vec<(usize, Token)>,
    index: usize,
    /// Position just past the input, reported for end-of-input errors.
    end: usize,
}

impl Parser {
    /// Parses the input as a single SQL statement, with an optional
    /// trailing semicolon.
    pub fn parse(statement: &str) -> Result<Statement> {
        let mut parser = Self::new(statement)?;
        let statement = parser.parse_statement()?;
        parser.skip(Token::Semicolon);
        if let Some(token) = parser.peek() {
            let message = format!("unexpected token {}", token);
            let position = parser.pos();
            return Err(Error::Syntax { message, position });
        }
        Ok(statement)
    }

    /// Creates a new parser over the given input, lexing it eagerly.
    pub fn new(input: &str) -> Result<Parser> {
        let tokens = Lexer::new(input).collect::<Result<Vec<_>>>()?;
        Ok(Parser {
            tokens,
            index: 0,
            end: input.chars().count(),
        })
    }

    /// Creates a parser over an already-lexed token slice. Batches lex one
    /// statement at a time with this, so a lexical error in statement k
    /// cannot prevent statements 1..k-1 from running.
    pub fn from_tokens(tokens: Vec<(usize, Token)>, end: usize) -> Parser {
        Parser {
            tokens,
            index: 0,
            end,
        }
    }

    /// Consumes the statement separator after a batch statement: either a
    /// semicolon or end of input.
    pub fn expect_statement_end(&mut self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(Token::Semicolon) => {
                self.skip(Token::Semicolon);
                Ok(())
            }
            Some(token) => {
                let message = format!("expected ; found {}", token);
                let position = self.pos();
                Err(Error::Syntax { message, position })
            }
        }
    }

    /// Parses a single SQL statement, dispatching on the leading keyword.
    pub fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek() {
            Some(Token::Keyword(Keyword::Create)) => self.parse_create(),
            Some(Token::Keyword(Keyword::Drop)) => self.parse_drop(),
            Some(Token::Keyword(Keyword::Alter)) => self.parse_alter_table(),
            Some(Token::Keyword(Keyword::Refresh)) => self.parse_refresh(),
            Some(Token::Keyword(Keyword::Use)) => self.parse_use(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(Token::Keyword(Keyword::Select | Keyword::With)) => self.parse_select(),
            Some(token) => {
                let message = format!("expected statement, found {}", token);
                let position = self.pos();
                Err(Error::Syntax { message, position })
            }
            None => Err(Error::Syntax {
                message: "unexpected end of input".into(),
                position: self.end,
            }),
        }
    }
}

impl TokenHelper for Parser {
    fn next(&mut self) -> Result<Token> {
        let item = self.tokens.get(self.index).cloned();
        match item {
            Some((_, token)) => {
                self.index += 1;
                Ok(token)
            }
            None => Err(Error::Syntax {
                message: "unexpected end of input".into(),
                position: self.end,
            }),
        }
    }

    fn next_ident(&mut self) -> Result<String> {
        let position = self.pos();
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(Error::Syntax {
                message: format!("expected identifier, found {}", token),
                position,
            }),
        }
    }

    fn next_ident_or_keyword(&mut self) -> Result<String> {
        let position = self.pos();
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            Token::Keyword(keyword) => Ok(keyword.to_string().to_lowercase()),
            token => Err(Error::Syntax {
                message: format!("expected identifier, found {}", token),
                position,
            }),
        }
    }

    fn next_if(&mut self, predicate: impl Fn(&Token) -> bool) -> Option<Token> {
        self.peek().filter(|token| predicate(token))?;
        TokenHelper::next(self).ok()
    }

    fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        let value = f(self.peek()?)?;
        TokenHelper::next(self).ok()?;
        Some(value)
    }

    fn next_if_keyword(&mut self) -> Option<Keyword> {
        self.next_if_map(|token| match token {
            Token::Keyword(keyword) => Some(*keyword),
            _ => None,
        })
    }

    fn next_is(&mut self, token: Token) -> bool {
        self.next_if(|t| t == &token).is_some()
    }

    fn expect(&mut self, expect: Token) -> Result<()> {
        let position = self.pos();
        let token = TokenHelper::next(self)?;
        if token != expect {
            return Err(Error::Syntax {
                message: format!("expected {}, found {}", expect, token),
                position,
            });
        }
        Ok(())
    }

    fn peek(&mut self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(_, token)| token)
    }

    fn peek_second(&mut self) -> Option<&Token> {
        self.tokens.get(self.index + 1).map(|(_, token)| token)
    }

    fn pos(&mut self) -> usize {
        self.tokens
            .get(self.index)
            .map(|(pos, _)| *pos)
            .unwrap_or(self.end)
    }
}

impl LiteralParser for Parser {}
impl TypeParser for Parser {}
impl ExpressionParser for Parser {}

impl DmlParser for Parser {
    fn parse_expression(&mut self) -> Result<Expression> {
        ExpressionParser::parse_expression(self)
    }
}

impl DdlParser for Parser {
    fn parse_expression(&mut self) -> Result<Expression> {
        ExpressionParser::parse_expression(self)
    }

    fn parse_select_statement(&mut self) -> Result<SelectStatement> {
        DmlParser::parse_select_statement(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ast::{DdlStatement, DmlStatement, Literal, Operator};
    use crate::types::DataType;

    #[test]
    fn test_parse_create_table() {
        let sql = "CREATE TABLE users (id SERIAL PRIMARY KEY, name VARCHAR(50) UNIQUE, age INT CHECK (age >= 0))";
        match Parser::parse(sql).unwrap() {
            Statement::Ddl(DdlStatement::CreateTable { name, columns, .. }) => {
                assert_eq!(name, "users");
                assert_eq!(columns.len(), 3);
                assert!(columns[0].primary_key);
                assert_eq!(columns[1].data_type, DataType::Varchar(Some(50)));
                assert!(columns[1].unique);
                assert!(columns[2].check.is_some());
            }
            other => panic!("expected CREATE TABLE, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_insert_on_conflict() {
        let sql = "INSERT INTO t (a, b) VALUES (1, DEFAULT) \
                   ON CONFLICT (a) DO UPDATE SET b = 2 RETURNING *";
        match Parser::parse(sql).unwrap() {
            Statement::Dml(DmlStatement::Insert {
                columns,
                source,
                on_conflict,
                returning,
                ..
            }) => {
                assert_eq!(columns, Some(vec!["a".to_string(), "b".to_string()]));
                match source {
                    crate::parsing::ast::InsertSource::Values(rows) => {
                        assert_eq!(rows.len(), 1);
                        assert!(rows[0][1].is_none()); // DEFAULT cell
                    }
                    other => panic!("expected VALUES, got {:?}", other),
                }
                assert!(on_conflict.is_some());
                assert_eq!(returning, Some(vec![(Expression::All, None)]));
            }
            other => panic!("expected INSERT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_select_pipeline() {
        let sql = "SELECT g, SUM(v) AS tot FROM s WHERE v > 1 GROUP BY g \
                   HAVING SUM(v) > 2 ORDER BY tot DESC LIMIT 10 OFFSET 2";
        match Parser::parse(sql).unwrap() {
            Statement::Dml(DmlStatement::Select(select)) => {
                assert_eq!(select.select.len(), 2);
                assert_eq!(select.group_by.len(), 1);
                assert!(select.having.is_some());
                assert_eq!(select.order_by.len(), 1);
                assert!(select.limit.is_some());
                assert!(select.offset.is_some());
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_with_union() {
        let sql = "WITH hi AS (SELECT v FROM s) SELECT v FROM hi UNION SELECT v FROM s";
        match Parser::parse(sql).unwrap() {
            Statement::Dml(DmlStatement::Select(select)) => {
                assert_eq!(select.with.len(), 1);
                assert_eq!(select.with[0].name, "hi");
                assert_eq!(select.compounds.len(), 1);
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let sql = "SELECT 1 + 2 * 3";
        match Parser::parse(sql).unwrap() {
            Statement::Dml(DmlStatement::Select(select)) => match &select.select[0].0 {
                Expression::Operator(Operator::Add(lhs, rhs)) => {
                    assert_eq!(**lhs, Expression::Literal(Literal::Integer(1)));
                    assert!(matches!(
                        **rhs,
                        Expression::Operator(Operator::Multiply(_, _))
                    ));
                }
                other => panic!("expected +, got {:?}", other),
            },
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        // NOT a = b parses as NOT (a = b)
        let sql = "SELECT NOT a = b";
        match Parser::parse(sql).unwrap() {
            Statement::Dml(DmlStatement::Select(select)) => match &select.select[0].0 {
                Expression::Operator(Operator::Not(inner)) => {
                    assert!(matches!(**inner, Expression::Operator(Operator::Equal(_, _))));
                }
                other => panic!("expected NOT, got {:?}", other),
            },
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_between_is_inclusive_sugar() {
        let sql = "SELECT a BETWEEN 1 AND 2 + 3";
        match Parser::parse(sql).unwrap() {
            Statement::Dml(DmlStatement::Select(select)) => {
                assert!(matches!(
                    &select.select[0].0,
                    Expression::Operator(Operator::Between { .. })
                ));
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_carries_position() {
        let err = Parser::parse("SELECT FROM t").unwrap_err();
        match err {
            Error::Syntax { position, .. } => assert_eq!(position, 7),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_alter_table_operations() {
        for (sql, check) in [
            (
                "ALTER TABLE t ADD COLUMN c INT",
                "add column" as &str,
            ),
            ("ALTER TABLE t DROP COLUMN c", "drop column"),
            ("ALTER TABLE t RENAME TO u", "rename"),
            ("ALTER TABLE t RENAME COLUMN a TO b", "rename column"),
            ("ALTER TABLE t DROP CONSTRAINT x", "drop constraint"),
            (
                "ALTER TABLE t ADD CONSTRAINT u UNIQUE (a, b)",
                "add constraint",
            ),
        ] {
            match Parser::parse(sql) {
                Ok(Statement::Ddl(DdlStatement::AlterTable { .. })) => {}
                other => panic!("{} failed: {:?} ({})", sql, other, check),
            }
        }
    }

    #[test]
    fn test_parse_view_statements() {
        assert!(matches!(
            Parser::parse("CREATE MATERIALIZED VIEW mv AS SELECT 1").unwrap(),
            Statement::Ddl(DdlStatement::CreateView {
                materialized: true,
                ..
            })
        ));
        assert!(matches!(
            Parser::parse("REFRESH MATERIALIZED VIEW mv").unwrap(),
            Statement::Ddl(DdlStatement::RefreshMaterializedView { .. })
        ));
        assert!(matches!(
            Parser::parse("DROP VIEW IF EXISTS v").unwrap(),
            Statement::Ddl(DdlStatement::DropView {
                if_exists: true,
                materialized: false,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_distinct_aggregate() {
        match Parser::parse("SELECT COUNT(DISTINCT x) FROM t").unwrap() {
            Statement::Dml(DmlStatement::Select(select)) => {
                assert!(matches!(
                    &select.select[0].0,
                    Expression::Function(name, _) if name == "COUNT_DISTINCT"
                ));
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_scalar_subquery_and_in() {
        let sql = "SELECT v FROM s WHERE v = (SELECT MIN(v) FROM s) AND g IN ('a', 'b')";
        assert!(Parser::parse(sql).is_ok());
    }
}
