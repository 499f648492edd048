//! Expression parsing with operator precedence climbing.

use super::super::lexer::{Keyword, Token};
use super::dml_parser::DmlParser;
use super::literal_parser::LiteralParser;
use super::token_helper::TokenHelper;
use super::type_parser::TypeParser;
use crate::error::{Error, Result};
use crate::parsing::ast::{Expression, Literal, Operator, SelectStatement};
use std::ops::Add;

/// Operator precedence. Lowest binds loosest: OR, AND, NOT, comparisons,
/// BETWEEN/IN/LIKE/IS, additive, multiplicative, unary sign.
pub type Precedence = u8;

const PRECEDENCE_OR: Precedence = 1;
const PRECEDENCE_AND: Precedence = 2;
const PRECEDENCE_NOT: Precedence = 3;
const PRECEDENCE_COMPARISON: Precedence = 4;
const PRECEDENCE_PREDICATE: Precedence = 5;
const PRECEDENCE_ADDITIVE: Precedence = 6;
const PRECEDENCE_MULTIPLICATIVE: Precedence = 7;
const PRECEDENCE_SIGN: Precedence = 9;

/// Operator associativity.
pub enum Associativity {
    Left,
    Right,
}

impl Add<Associativity> for Precedence {
    type Output = Self;

    fn add(self, rhs: Associativity) -> Self {
        // Left-associative operators have increased precedence, so they
        // bind tighter to their left-hand side.
        self + match rhs {
            Associativity::Left => 1,
            Associativity::Right => 0,
        }
    }
}

/// Prefix operators.
pub enum PrefixOperator {
    Minus, // -a
    Not,   // NOT a
    Plus,  // +a
}

impl PrefixOperator {
    pub fn precedence(&self) -> Precedence {
        match self {
            Self::Not => PRECEDENCE_NOT,
            Self::Minus | Self::Plus => PRECEDENCE_SIGN,
        }
    }

    // Prefix operators are right-associative by definition.
    pub fn associativity(&self) -> Associativity {
        Associativity::Right
    }

    pub fn into_expression(self, rhs: Expression) -> Expression {
        let rhs = Box::new(rhs);
        match self {
            Self::Plus => Operator::Identity(rhs).into(),
            Self::Minus => Operator::Negate(rhs).into(),
            Self::Not => Operator::Not(rhs).into(),
        }
    }
}

/// Infix operators.
pub enum InfixOperator {
    Add,                // a + b
    And,                // a AND b
    Divide,             // a / b
    Equal,              // a = b
    GreaterThan,        // a > b
    GreaterThanOrEqual, // a >= b
    LessThan,           // a < b
    LessThanOrEqual,    // a <= b
    Multiply,           // a * b
    NotEqual,           // a != b
    Or,                 // a OR b
    Remainder,          // a % b
    Subtract,           // a - b
}

impl InfixOperator {
    pub fn precedence(&self) -> Precedence {
        match self {
            Self::Or => PRECEDENCE_OR,
            Self::And => PRECEDENCE_AND,
            Self::Equal
            | Self::NotEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual
            | Self::LessThan
            | Self::LessThanOrEqual => PRECEDENCE_COMPARISON,
            Self::Add | Self::Subtract => PRECEDENCE_ADDITIVE,
            Self::Multiply | Self::Divide | Self::Remainder => PRECEDENCE_MULTIPLICATIVE,
        }
    }

    pub fn associativity(&self) -> Associativity {
        Associativity::Left
    }

    pub fn into_expression(self, lhs: Expression, rhs: Expression) -> Expression {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        match self {
            Self::Add => Operator::Add(lhs, rhs).into(),
            Self::And => Operator::And(lhs, rhs).into(),
            Self::Divide => Operator::Divide(lhs, rhs).into(),
            Self::Equal => Operator::Equal(lhs, rhs).into(),
            Self::GreaterThan => Operator::GreaterThan(lhs, rhs).into(),
            Self::GreaterThanOrEqual => Operator::GreaterThanOrEqual(lhs, rhs).into(),
            Self::LessThan => Operator::LessThan(lhs, rhs).into(),
            Self::LessThanOrEqual => Operator::LessThanOrEqual(lhs, rhs).into(),
            Self::Multiply => Operator::Multiply(lhs, rhs).into(),
            Self::NotEqual => Operator::NotEqual(lhs, rhs).into(),
            Self::Or => Operator::Or(lhs, rhs).into(),
            Self::Remainder => Operator::Remainder(lhs, rhs).into(),
            Self::Subtract => Operator::Subtract(lhs, rhs).into(),
        }
    }
}

/// Postfix predicate operators: IS [NOT] NULL, [NOT] LIKE / ILIKE,
/// [NOT] BETWEEN, [NOT] IN. All share one precedence tier, directly above
/// the comparison operators.
pub enum PostfixOperator {
    Is(bool),                               // a IS [NOT] NULL
    Like(Expression, bool, bool),           // a [NOT] [I]LIKE pattern
    Between(Expression, Expression, bool),  // a [NOT] BETWEEN low AND high
    InList(Vec<Expression>, bool),          // a [NOT] IN (list)
    InSubquery(Box<SelectStatement>, bool), // a [NOT] IN (SELECT ...)
}

impl PostfixOperator {
    pub fn precedence(&self) -> Precedence {
        PRECEDENCE_PREDICATE
    }

    pub fn into_expression(self, lhs: Expression) -> Expression {
        let lhs = Box::new(lhs);
        match self {
            Self::Is(negated) => Operator::Is {
                expr: lhs,
                negated,
            }
            .into(),
            Self::Like(pattern, case_insensitive, negated) => Operator::Like {
                expr: lhs,
                pattern: Box::new(pattern),
                case_insensitive,
                negated,
            }
            .into(),
            Self::Between(low, high, negated) => Operator::Between {
                expr: lhs,
                low: Box::new(low),
                high: Box::new(high),
                negated,
            }
            .into(),
            Self::InList(list, negated) => Operator::InList {
                expr: lhs,
                list,
                negated,
            }
            .into(),
            Self::InSubquery(subquery, negated) => Operator::InSubquery {
                expr: lhs,
                subquery,
                negated,
            }
            .into(),
        }
    }
}

/// Names of the aggregate functions that accept a DISTINCT qualifier.
const DISTINCT_AGGREGATES: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// Expression parser, using the precedence climbing algorithm.
pub trait ExpressionParser: TokenHelper + LiteralParser + TypeParser + DmlParser {
    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_expression_at(0)
    }

    /// Parses an expression at the given minimum precedence.
    fn parse_expression_at(&mut self, min_precedence: Precedence) -> Result<Expression> {
        // If the left-hand side is a prefix operator, recursively parse it
        // and its operand. Otherwise, parse the left-hand side as an atom.
        let mut lhs = if let Some(prefix) = self.parse_prefix_operator_at(min_precedence) {
            let next_precedence = prefix.precedence() + prefix.associativity();
            let rhs = self.parse_expression_at(next_precedence)?;
            prefix.into_expression(rhs)
        } else {
            self.parse_expression_atom()?
        };

        // Apply any postfix operators to the left-hand side.
        while let Some(postfix) = self.parse_postfix_operator_at(min_precedence)? {
            lhs = postfix.into_expression(lhs);
        }

        // Repeatedly apply infix operators as long as their precedence is at
        // least the current minimum. The right-hand side parse recursively
        // applies operators above this operator's precedence.
        while let Some(infix) = self.parse_infix_operator_at(min_precedence) {
            let next_precedence = infix.precedence() + infix.associativity();
            let rhs = self.parse_expression_at(next_precedence)?;
            lhs = infix.into_expression(lhs, rhs);
        }

        // Apply postfix operators following a binary operator, e.g.
        // 1 + NULL IS NULL.
        while let Some(postfix) = self.parse_postfix_operator_at(min_precedence)? {
            lhs = postfix.into_expression(lhs);
        }

        Ok(lhs)
    }

    /// Parses an expression atom.
    fn parse_expression_atom(&mut self) -> Result<Expression> {
        let pos = self.pos();
        let token = self.next()?;

        if let Some(expr) = self.parse_literal(&token)? {
            return Ok(expr);
        }

        Ok(match token {
            // All columns, i.e. *.
            Token::Asterisk => Expression::All,

            // Typed literals, or a column that happens to share the keyword.
            Token::Keyword(Keyword::Date) => match self.peek() {
                Some(Token::String(_)) => self.parse_date_literal()?,
                _ => Expression::Column(None, "date".to_string()),
            },
            Token::Keyword(Keyword::Time) => match self.peek() {
                Some(Token::String(_)) => self.parse_time_literal()?,
                _ => Expression::Column(None, "time".to_string()),
            },
            Token::Keyword(Keyword::Timestamp) => match self.peek() {
                Some(Token::String(_)) => self.parse_timestamp_literal()?,
                _ => Expression::Column(None, "timestamp".to_string()),
            },

            // CURRENT_DATE, with optional empty parentheses.
            Token::Keyword(Keyword::CurrentDate) => {
                if self.next_is(Token::OpenParen) {
                    self.expect(Token::CloseParen)?;
                }
                Expression::Function("CURRENT_DATE".to_string(), vec![])
            }

            // EXISTS (SELECT ...)
            Token::Keyword(Keyword::Exists) => {
                let subquery = self.parse_parenthesized_subquery()?;
                Operator::Exists {
                    subquery: Box::new(subquery),
                    negated: false,
                }
                .into()
            }

            // NOT EXISTS (SELECT ...); bare NOT is handled as a prefix
            // operator before atoms are reached.
            Token::Keyword(Keyword::Not)
                if matches!(self.peek(), Some(Token::Keyword(Keyword::Exists))) =>
            {
                self.expect(Keyword::Exists.into())?;
                let subquery = self.parse_parenthesized_subquery()?;
                Operator::Exists {
                    subquery: Box::new(subquery),
                    negated: true,
                }
                .into()
            }

            // CASE [operand] WHEN ... THEN ... [ELSE ...] END
            Token::Keyword(Keyword::Case) => self.parse_case_expression()?,

            // CAST(expr AS type)
            Token::Keyword(Keyword::Cast) => {
                self.expect(Token::OpenParen)?;
                let expr = self.parse_expression_at(0)?;
                self.expect(Keyword::As.into())?;
                let data_type = self.parse_type()?;
                self.expect(Token::CloseParen)?;
                Expression::Cast {
                    expr: Box::new(expr),
                    data_type,
                }
            }

            // Function call.
            Token::Ident(name) if matches!(self.peek(), Some(Token::OpenParen)) => {
                self.expect(Token::OpenParen)?;
                self.parse_function_call(name)?
            }

            // Column name, qualified as table.column or unqualified.
            Token::Ident(table) if matches!(self.peek(), Some(Token::Period)) => {
                self.expect(Token::Period)?;
                Expression::Column(Some(table), self.next_ident()?)
            }
            Token::Ident(column) => Expression::Column(None, column),

            // Parenthesized expression or scalar subquery.
            Token::OpenParen => {
                if matches!(
                    self.peek(),
                    Some(Token::Keyword(Keyword::Select | Keyword::With))
                ) {
                    let select = self.parse_select_statement()?;
                    self.expect(Token::CloseParen)?;
                    Expression::Subquery(Box::new(select))
                } else {
                    let expr = self.parse_expression_at(0)?;
                    self.expect(Token::CloseParen)?;
                    expr
                }
            }

            token => {
                return Err(Error::Syntax {
                    message: format!("expected expression, found {}", token),
                    position: pos,
                });
            }
        })
    }

    /// Parses a function call after the opening parenthesis was consumed.
    /// Aggregate DISTINCT forms become `<NAME>_DISTINCT` function names.
    fn parse_function_call(&mut self, name: String) -> Result<Expression> {
        let upper = name.to_uppercase();

        // EXTRACT(field FROM source) has its own argument syntax; the field
        // travels as a string literal in the first argument slot.
        if upper == "EXTRACT" {
            let field = self.next_ident_or_keyword()?.to_uppercase();
            let pos = self.pos();
            if !matches!(
                field.as_str(),
                "YEAR" | "MONTH" | "DAY" | "HOUR" | "MINUTE" | "SECOND"
            ) {
                return Err(Error::Syntax {
                    message: format!(
                        "expected datetime field (YEAR, MONTH, DAY, HOUR, MINUTE, SECOND), found {}",
                        field
                    ),
                    position: pos,
                });
            }
            self.expect(Keyword::From.into())?;
            let source = self.parse_expression_at(0)?;
            self.expect(Token::CloseParen)?;
            return Ok(Expression::Function(
                "EXTRACT".to_string(),
                vec![Literal::String(field).into(), source],
            ));
        }
        let is_distinct = DISTINCT_AGGREGATES.contains(&upper.as_str())
            && self.next_is(Keyword::Distinct.into());

        let mut args = Vec::new();
        while !self.next_is(Token::CloseParen) {
            if !args.is_empty() {
                self.expect(Token::Comma)?;
            }
            args.push(self.parse_expression_at(0)?);
        }

        if is_distinct {
            Ok(Expression::Function(format!("{}_DISTINCT", upper), args))
        } else {
            Ok(Expression::Function(name, args))
        }
    }

    /// Parses a CASE expression after the CASE keyword was consumed.
    fn parse_case_expression(&mut self) -> Result<Expression> {
        let operand = if matches!(self.peek(), Some(Token::Keyword(Keyword::When))) {
            None
        } else {
            Some(Box::new(self.parse_expression_at(0)?))
        };

        let mut when_clauses = Vec::new();
        while self.next_is(Keyword::When.into()) {
            let when = self.parse_expression_at(0)?;
            self.expect(Keyword::Then.into())?;
            let then = self.parse_expression_at(0)?;
            when_clauses.push((when, then));
        }
        if when_clauses.is_empty() {
            let pos = self.pos();
            return Err(Error::Syntax {
                message: "CASE expression must have at least one WHEN clause".into(),
                position: pos,
            });
        }

        let else_clause = if self.next_is(Keyword::Else.into()) {
            Some(Box::new(self.parse_expression_at(0)?))
        } else {
            None
        };
        self.expect(Keyword::End.into())?;

        Ok(Expression::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    /// Parses a parenthesized SELECT, including the parentheses.
    fn parse_parenthesized_subquery(&mut self) -> Result<SelectStatement> {
        self.expect(Token::OpenParen)?;
        if !matches!(
            self.peek(),
            Some(Token::Keyword(Keyword::Select | Keyword::With))
        ) {
            let pos = self.pos();
            return Err(Error::Syntax {
                message: "expected a subquery (SELECT)".into(),
                position: pos,
            });
        }
        let select = self.parse_select_statement()?;
        self.expect(Token::CloseParen)?;
        Ok(select)
    }

    /// Parses a prefix operator at or above the minimum precedence.
    fn parse_prefix_operator_at(&mut self, min_precedence: Precedence) -> Option<PrefixOperator> {
        // Leave NOT to the atom parser when EXISTS follows: NOT EXISTS is a
        // predicate atom, not a logical negation.
        if matches!(self.peek(), Some(Token::Keyword(Keyword::Not)))
            && matches!(self.peek_second(), Some(Token::Keyword(Keyword::Exists)))
        {
            return None;
        }
        self.next_if_map(|token| {
            let operator = match token {
                Token::Keyword(Keyword::Not) => PrefixOperator::Not,
                Token::Minus => PrefixOperator::Minus,
                Token::Plus => PrefixOperator::Plus,
                _ => return None,
            };
            Some(operator).filter(|op| op.precedence() >= min_precedence)
        })
    }

    /// Parses an infix operator at or above the minimum precedence.
    fn parse_infix_operator_at(&mut self, min_precedence: Precedence) -> Option<InfixOperator> {
        self.next_if_map(|token| {
            let operator = match token {
                Token::Asterisk => InfixOperator::Multiply,
                Token::Equal => InfixOperator::Equal,
                Token::GreaterThan => InfixOperator::GreaterThan,
                Token::GreaterThanOrEqual => InfixOperator::GreaterThanOrEqual,
                Token::Keyword(Keyword::And) => InfixOperator::And,
                Token::Keyword(Keyword::Or) => InfixOperator::Or,
                Token::LessThan => InfixOperator::LessThan,
                Token::LessThanOrEqual => InfixOperator::LessThanOrEqual,
                Token::Minus => InfixOperator::Subtract,
                Token::NotEqual => InfixOperator::NotEqual,
                Token::Percent => InfixOperator::Remainder,
                Token::Plus => InfixOperator::Add,
                Token::Slash => InfixOperator::Divide,
                _ => return None,
            };
            Some(operator).filter(|op| op.precedence() >= min_precedence)
        })
    }

    /// Parses a postfix predicate operator at or above the minimum
    /// precedence.
    fn parse_postfix_operator_at(
        &mut self,
        min_precedence: Precedence,
    ) -> Result<Option<PostfixOperator>> {
        if PRECEDENCE_PREDICATE < min_precedence {
            return Ok(None);
        }

        // IS [NOT] NULL spans multiple tokens.
        if matches!(self.peek(), Some(Token::Keyword(Keyword::Is))) {
            self.expect(Keyword::Is.into())?;
            let negated = self.next_is(Keyword::Not.into());
            self.expect(Keyword::Null.into())?;
            return Ok(Some(PostfixOperator::Is(negated)));
        }

        // NOT directly after an expression must introduce a negated
        // predicate: NOT IN, NOT BETWEEN, NOT LIKE, NOT ILIKE.
        let negated = if matches!(self.peek(), Some(Token::Keyword(Keyword::Not))) {
            self.expect(Keyword::Not.into())?;
            match self.peek() {
                Some(Token::Keyword(
                    Keyword::In | Keyword::Between | Keyword::Like | Keyword::ILike,
                )) => true,
                _ => {
                    let pos = self.pos();
                    return Err(Error::Syntax {
                        message: "expected IN, BETWEEN, LIKE or ILIKE after NOT".into(),
                        position: pos,
                    });
                }
            }
        } else {
            false
        };

        if self.next_is(Keyword::In.into()) {
            self.expect(Token::OpenParen)?;
            if matches!(
                self.peek(),
                Some(Token::Keyword(Keyword::Select | Keyword::With))
            ) {
                let select = self.parse_select_statement()?;
                self.expect(Token::CloseParen)?;
                return Ok(Some(PostfixOperator::InSubquery(
                    Box::new(select),
                    negated,
                )));
            }
            let mut list = Vec::new();
            while !self.next_is(Token::CloseParen) {
                if !list.is_empty() {
                    self.expect(Token::Comma)?;
                }
                list.push(self.parse_expression_at(0)?);
            }
            return Ok(Some(PostfixOperator::InList(list, negated)));
        }

        if self.next_is(Keyword::Between.into()) {
            // Bind the bounds above AND so the separator is not consumed.
            let low = self.parse_expression_at(PRECEDENCE_ADDITIVE)?;
            self.expect(Keyword::And.into())?;
            let high = self.parse_expression_at(PRECEDENCE_ADDITIVE)?;
            return Ok(Some(PostfixOperator::Between(low, high, negated)));
        }

        if self.next_is(Keyword::Like.into()) {
            let pattern = self.parse_expression_at(PRECEDENCE_ADDITIVE)?;
            return Ok(Some(PostfixOperator::Like(pattern, false, negated)));
        }
        if self.next_is(Keyword::ILike.into()) {
            let pattern = self.parse_expression_at(PRECEDENCE_ADDITIVE)?;
            return Ok(Some(PostfixOperator::Like(pattern, true, negated)));
        }

        if negated {
            let pos = self.pos();
            return Err(Error::Syntax {
                message: "expected IN, BETWEEN, LIKE or ILIKE after NOT".into(),
                position: pos,
            });
        }
        Ok(None)
    }
}
