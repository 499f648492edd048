//! Data type parsing.

use super::super::lexer::{Keyword, Token};
use super::token_helper::TokenHelper;
use crate::error::{Error, Result};
use crate::types::DataType;

pub trait TypeParser: TokenHelper {
    /// Parses a SQL data type.
    fn parse_type(&mut self) -> Result<DataType> {
        let pos = self.pos();
        let data_type = match self.next()? {
            Token::Keyword(Keyword::Int | Keyword::Integer) => DataType::Int,
            Token::Keyword(Keyword::Float) => DataType::Float,
            Token::Keyword(Keyword::Bool | Keyword::Boolean) => DataType::Boolean,
            Token::Keyword(Keyword::Varchar) => DataType::Varchar(self.parse_type_length()?),
            Token::Keyword(Keyword::Char) => DataType::Char(self.parse_type_length()?),
            Token::Keyword(Keyword::Text) => DataType::Text,
            Token::Keyword(Keyword::Date) => DataType::Date,
            Token::Keyword(Keyword::Time) => DataType::Time,
            Token::Keyword(Keyword::Timestamp) => DataType::Timestamp,
            Token::Keyword(Keyword::Serial) => DataType::Serial,
            token => {
                return Err(Error::Syntax {
                    message: format!("expected data type, found {}", token),
                    position: pos,
                });
            }
        };
        Ok(data_type)
    }

    /// Parses an optional (length) suffix for VARCHAR and CHAR.
    fn parse_type_length(&mut self) -> Result<Option<usize>> {
        if !self.next_is(Token::OpenParen) {
            return Ok(None);
        }
        let pos = self.pos();
        let length = match self.next()? {
            Token::Number(n) => n.parse::<usize>().map_err(|_| Error::Syntax {
                message: format!("invalid length {}", n),
                position: pos,
            })?,
            token => {
                return Err(Error::Syntax {
                    message: format!("expected length, found {}", token),
                    position: pos,
                });
            }
        };
        self.expect(Token::CloseParen)?;
        Ok(Some(length))
    }
}
