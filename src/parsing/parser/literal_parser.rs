//! Literal value parsing: numbers, strings, booleans, NULL, and typed
//! DATE / TIME / TIMESTAMP literals.

use super::super::lexer::{Keyword, Token};
use super::token_helper::TokenHelper;
use crate::error::{Error, Result};
use crate::parsing::ast::{Expression, Literal};

pub trait LiteralParser: TokenHelper {
    /// Tries to interpret an already-consumed token as a literal.
    fn parse_literal(&mut self, token: &Token) -> Result<Option<Expression>> {
        Ok(match token {
            Token::Number(n) if n.chars().all(|c| c.is_ascii_digit()) => {
                let pos = self.pos();
                let value = n.parse::<i64>().map_err(|e| Error::Syntax {
                    message: format!("invalid integer literal: {}", e),
                    position: pos,
                })?;
                Some(Literal::Integer(value).into())
            }
            Token::Number(n) => {
                let pos = self.pos();
                let value = n.parse::<f64>().map_err(|e| Error::Syntax {
                    message: format!("invalid float literal: {}", e),
                    position: pos,
                })?;
                Some(Literal::Float(value).into())
            }
            Token::String(s) => Some(Literal::String(s.clone()).into()),
            Token::Keyword(Keyword::True) => Some(Literal::Boolean(true).into()),
            Token::Keyword(Keyword::False) => Some(Literal::Boolean(false).into()),
            Token::Keyword(Keyword::Null) => Some(Literal::Null.into()),
            _ => None,
        })
    }

    /// Parses a DATE literal body: DATE 'YYYY-MM-DD'.
    fn parse_date_literal(&mut self) -> Result<Expression> {
        let pos = self.pos();
        match self.next()? {
            Token::String(s) => match crate::types::coercion::parse_date(&s) {
                Some(date) => Ok(Literal::Date(date).into()),
                None => Err(Error::Syntax {
                    message: format!("invalid date literal '{}', expected 'YYYY-MM-DD'", s),
                    position: pos,
                }),
            },
            token => Err(Error::Syntax {
                message: format!("expected string after DATE, found {}", token),
                position: pos,
            }),
        }
    }

    /// Parses a TIME literal body: TIME 'HH:MM:SS'.
    fn parse_time_literal(&mut self) -> Result<Expression> {
        let pos = self.pos();
        match self.next()? {
            Token::String(s) => match crate::types::coercion::parse_time(&s) {
                Some(time) => Ok(Literal::Time(time).into()),
                None => Err(Error::Syntax {
                    message: format!("invalid time literal '{}', expected 'HH:MM:SS'", s),
                    position: pos,
                }),
            },
            token => Err(Error::Syntax {
                message: format!("expected string after TIME, found {}", token),
                position: pos,
            }),
        }
    }

    /// Parses a TIMESTAMP literal body: TIMESTAMP 'YYYY-MM-DD HH:MM:SS'.
    fn parse_timestamp_literal(&mut self) -> Result<Expression> {
        let pos = self.pos();
        match self.next()? {
            Token::String(s) => match crate::types::coercion::parse_timestamp(&s) {
                Some(ts) => Ok(Literal::Timestamp(ts).into()),
                None => Err(Error::Syntax {
                    message: format!(
                        "invalid timestamp literal '{}', expected 'YYYY-MM-DD HH:MM:SS'",
                        s
                    ),
                    position: pos,
                }),
            },
            token => Err(Error::Syntax {
                message: format!("expected string after TIMESTAMP, found {}", token),
                position: pos,
            }),
        }
    }
}
