//! DML statement parsing: SELECT (with CTEs and set operations), INSERT,
//! UPDATE and DELETE.

use super::super::lexer::{Keyword, Token};
use super::token_helper::TokenHelper;
use crate::error::{Error, Result};
use crate::parsing::ast::common::{Direction, FromClause, SetOperator};
use crate::parsing::ast::dml::{
    CommonTableExpression, DmlStatement, InsertSource, OnConflict, SelectStatement,
};
use crate::parsing::ast::{Expression, Statement};
use std::collections::BTreeMap;

/// Select items with optional aliases.
type SelectItems = Vec<(Expression, Option<String>)>;

pub trait DmlParser: TokenHelper {
    /// Parses an expression (provided by the expression parser).
    fn parse_expression(&mut self) -> Result<Expression>;

    /// Parses a SELECT or WITH ... SELECT statement.
    fn parse_select(&mut self) -> Result<Statement> {
        Ok(Statement::Dml(DmlStatement::Select(Box::new(
            self.parse_select_statement()?,
        ))))
    }

    /// Parses a full SELECT statement: optional WITH list, the first
    /// branch, any number of set-operation branches, and the compound-level
    /// ORDER BY / LIMIT / OFFSET.
    fn parse_select_statement(&mut self) -> Result<SelectStatement> {
        let with = self.parse_with_clause()?;
        let mut statement = self.parse_select_body()?;
        statement.with = with;
        while let Some(operator) = self.parse_set_operator() {
            statement.compounds.push((operator, self.parse_select_body()?));
        }
        statement.order_by = self.parse_order_by_clause()?;
        let (limit, offset) = self.parse_limit_offset_clause()?;
        statement.limit = limit;
        statement.offset = offset;
        Ok(statement)
    }

    /// Parses one SELECT branch: SELECT ... FROM ... WHERE ... GROUP BY ...
    /// HAVING ...
    fn parse_select_body(&mut self) -> Result<SelectStatement> {
        self.expect(Keyword::Select.into())?;
        let mut statement = SelectStatement::new();
        statement.distinct = self.next_is(Keyword::Distinct.into());
        statement.select = self.parse_select_items(false)?;
        statement.from = self.parse_from_clause()?;
        statement.r#where = self.parse_where_clause()?;
        statement.group_by = self.parse_group_by_clause()?;
        statement.having = self.parse_having_clause()?;
        Ok(statement)
    }

    /// Parses a WITH clause, if present.
    fn parse_with_clause(&mut self) -> Result<Vec<CommonTableExpression>> {
        if !self.next_is(Keyword::With.into()) {
            return Ok(Vec::new());
        }
        let mut ctes = Vec::new();
        loop {
            let name = self.next_ident()?;
            self.expect(Keyword::As.into())?;
            self.expect(Token::OpenParen)?;
            let query = self.parse_select_statement()?;
            self.expect(Token::CloseParen)?;
            ctes.push(CommonTableExpression { name, query });
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(ctes)
    }

    /// Parses a comma-separated expression list with optional aliases. Used
    /// for the select list and RETURNING. `allow_star_only` restricts the
    /// list to a single `*` (RETURNING does not mix `*` with expressions).
    fn parse_select_items(&mut self, allow_star_only: bool) -> Result<SelectItems> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let mut alias = None;
            if self.next_is(Keyword::As.into()) {
                if expr == Expression::All {
                    let pos = self.pos();
                    return Err(Error::Syntax {
                        message: "can't alias *".into(),
                        position: pos,
                    });
                }
                alias = Some(self.next_ident_or_keyword()?);
            } else if matches!(self.peek(), Some(Token::Ident(_))) && expr != Expression::All {
                alias = Some(self.next_ident()?);
            }
            if allow_star_only && expr == Expression::All && !items.is_empty() {
                let pos = self.pos();
                return Err(Error::Syntax {
                    message: "* must be the only RETURNING item".into(),
                    position: pos,
                });
            }
            items.push((expr, alias));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(items)
    }

    /// Parses a FROM clause, if present. The source is a single table,
    /// view, materialized view or CTE name, or a subquery with an alias.
    fn parse_from_clause(&mut self) -> Result<Option<FromClause>> {
        if !self.next_is(Keyword::From.into()) {
            return Ok(None);
        }

        if self.next_is(Token::OpenParen) {
            let query = self.parse_select_statement()?;
            self.expect(Token::CloseParen)?;
            self.skip(Keyword::As.into());
            let pos = self.pos();
            let alias = self.next_ident().map_err(|_| Error::Syntax {
                message: "subquery in FROM requires an alias".into(),
                position: pos,
            })?;
            return Ok(Some(FromClause::Subquery {
                query: Box::new(query),
                alias,
            }));
        }

        let name = self.next_ident()?;
        let mut alias = None;
        if self.next_is(Keyword::As.into()) {
            alias = Some(self.next_ident_or_keyword()?);
        } else if matches!(self.peek(), Some(Token::Ident(_))) {
            alias = Some(self.next_ident()?);
        }
        Ok(Some(FromClause::Table { name, alias }))
    }

    /// Parses a WHERE clause, if present.
    fn parse_where_clause(&mut self) -> Result<Option<Expression>> {
        if !self.next_is(Keyword::Where.into()) {
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    /// Parses a GROUP BY clause, if present.
    fn parse_group_by_clause(&mut self) -> Result<Vec<Expression>> {
        if !self.next_is(Keyword::Group.into()) {
            return Ok(Vec::new());
        }
        self.expect(Keyword::By.into())?;
        let mut group_by = Vec::new();
        loop {
            group_by.push(self.parse_expression()?);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(group_by)
    }

    /// Parses a HAVING clause, if present.
    fn parse_having_clause(&mut self) -> Result<Option<Expression>> {
        if !self.next_is(Keyword::Having.into()) {
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    /// Parses a trailing set operator, if present.
    fn parse_set_operator(&mut self) -> Option<SetOperator> {
        if self.next_is(Keyword::Union.into()) {
            let all = self.next_is(Keyword::All.into());
            return Some(SetOperator::Union { all });
        }
        if self.next_is(Keyword::Intersect.into()) {
            return Some(SetOperator::Intersect);
        }
        if self.next_is(Keyword::Except.into()) {
            return Some(SetOperator::Except);
        }
        None
    }

    /// Parses an ORDER BY clause, if present. The direction defaults to
    /// ascending.
    fn parse_order_by_clause(&mut self) -> Result<Vec<(Expression, Direction)>> {
        if !self.next_is(Keyword::Order.into()) {
            return Ok(Vec::new());
        }
        self.expect(Keyword::By.into())?;
        let mut order_by = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let direction = self
                .next_if_map(|token| match token {
                    Token::Keyword(Keyword::Asc) => Some(Direction::Asc),
                    Token::Keyword(Keyword::Desc) => Some(Direction::Desc),
                    _ => None,
                })
                .unwrap_or(Direction::Asc);
            order_by.push((expr, direction));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(order_by)
    }

    /// Parses LIMIT and OFFSET clauses in either order, if present.
    /// Returns (limit, offset).
    fn parse_limit_offset_clause(&mut self) -> Result<(Option<Expression>, Option<Expression>)> {
        let mut limit = None;
        let mut offset = None;
        loop {
            if limit.is_none() && self.next_is(Keyword::Limit.into()) {
                limit = Some(self.parse_expression()?);
            } else if offset.is_none() && self.next_is(Keyword::Offset.into()) {
                offset = Some(self.parse_expression()?);
            } else {
                break;
            }
        }
        Ok((limit, offset))
    }

    /// Parses an INSERT statement.
    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect(Keyword::Insert.into())?;
        self.expect(Keyword::Into.into())?;
        let table = self.next_ident()?;

        let mut columns = None;
        if self.next_is(Token::OpenParen) {
            let columns = columns.insert(Vec::new());
            loop {
                columns.push(self.next_ident_or_keyword()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
        }

        let source = if self.next_is(Keyword::Default.into()) {
            self.expect(Keyword::Values.into())?;
            InsertSource::DefaultValues
        } else if self.next_is(Keyword::Values.into()) {
            InsertSource::Values(self.parse_values_rows()?)
        } else if matches!(
            self.peek(),
            Some(Token::Keyword(Keyword::Select | Keyword::With))
        ) {
            InsertSource::Select(Box::new(self.parse_select_statement()?))
        } else {
            let pos = self.pos();
            return Err(Error::Syntax {
                message: "expected VALUES, SELECT or DEFAULT VALUES after INSERT INTO".into(),
                position: pos,
            });
        };

        let on_conflict = self.parse_on_conflict()?;
        let returning = self.parse_returning_clause()?;

        Ok(Statement::Dml(DmlStatement::Insert {
            table,
            columns,
            source,
            on_conflict,
            returning,
        }))
    }

    /// Parses VALUES rows. A DEFAULT cell parses to None.
    fn parse_values_rows(&mut self) -> Result<Vec<Vec<Option<Expression>>>> {
        let mut rows = Vec::new();
        loop {
            let mut row = Vec::new();
            self.expect(Token::OpenParen)?;
            loop {
                if self.next_is(Keyword::Default.into()) {
                    row.push(None);
                } else {
                    row.push(Some(self.parse_expression()?));
                }
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
            rows.push(row);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(rows)
    }

    /// Parses an ON CONFLICT clause, if present.
    fn parse_on_conflict(&mut self) -> Result<Option<OnConflict>> {
        if !self.next_is(Keyword::On.into()) {
            return Ok(None);
        }
        self.expect(Keyword::Conflict.into())?;

        let mut target = Vec::new();
        if self.next_is(Token::OpenParen) {
            loop {
                target.push(self.next_ident_or_keyword()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
        }

        self.expect(Keyword::Do.into())?;
        if self.next_is(Keyword::Nothing.into()) {
            return Ok(Some(OnConflict::DoNothing { target }));
        }
        self.expect(Keyword::Update.into())?;
        self.expect(Keyword::Set.into())?;
        let set = self.parse_assignments()?;
        Ok(Some(OnConflict::DoUpdate { target, set }))
    }

    /// Parses a RETURNING clause, if present.
    fn parse_returning_clause(&mut self) -> Result<Option<SelectItems>> {
        if !self.next_is(Keyword::Returning.into()) {
            return Ok(None);
        }
        Ok(Some(self.parse_select_items(true)?))
    }

    /// Parses a SET assignment list: column = expr | DEFAULT, ...
    fn parse_assignments(&mut self) -> Result<BTreeMap<String, Option<Expression>>> {
        let mut set = BTreeMap::new();
        loop {
            let pos = self.pos();
            let column = self.next_ident()?;
            self.expect(Token::Equal)?;
            let expr = if self.next_is(Keyword::Default.into()) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            if set.contains_key(&column) {
                return Err(Error::Syntax {
                    message: format!("column {} set multiple times", column),
                    position: pos,
                });
            }
            set.insert(column, expr);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(set)
    }

    /// Parses an UPDATE statement.
    fn parse_update(&mut self) -> Result<Statement> {
        self.expect(Keyword::Update.into())?;
        let table = self.next_ident()?;
        self.expect(Keyword::Set.into())?;
        let set = self.parse_assignments()?;
        let r#where = self.parse_where_clause()?;
        let returning = self.parse_returning_clause()?;
        Ok(Statement::Dml(DmlStatement::Update {
            table,
            set,
            r#where,
            returning,
        }))
    }

    /// Parses a DELETE statement.
    fn parse_delete(&mut self) -> Result<Statement> {
        self.expect(Keyword::Delete.into())?;
        self.expect(Keyword::From.into())?;
        let table = self.next_ident()?;
        let r#where = self.parse_where_clause()?;
        let returning = self.parse_returning_clause()?;
        Ok(Statement::Dml(DmlStatement::Delete {
            table,
            r#where,
            returning,
        }))
    }
}
