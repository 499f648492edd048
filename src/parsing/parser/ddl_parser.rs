//! DDL statement parsing: databases, tables, views and materialized views.

use super::super::lexer::{Keyword, Token};
use super::token_helper::TokenHelper;
use super::type_parser::TypeParser;
use crate::error::{Error, Result};
use crate::parsing::ast::ddl::{
    AlterTableOperation, Column, DdlStatement, TableConstraint, TableConstraintKind,
};
use crate::parsing::ast::dml::SelectStatement;
use crate::parsing::ast::{Expression, Statement};

pub trait DdlParser: TypeParser {
    /// Parses an expression (provided by the expression parser).
    fn parse_expression(&mut self) -> Result<Expression>;

    /// Parses a SELECT statement (provided by the DML parser).
    fn parse_select_statement(&mut self) -> Result<SelectStatement>;

    /// Parses a CREATE statement: DATABASE, TABLE or [MATERIALIZED] VIEW.
    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(Keyword::Create.into())?;
        let pos = self.pos();
        match self.peek() {
            Some(Token::Keyword(Keyword::Database)) => self.parse_create_database(),
            Some(Token::Keyword(Keyword::Table)) => self.parse_create_table(),
            Some(Token::Keyword(Keyword::View)) => self.parse_create_view(false),
            Some(Token::Keyword(Keyword::Materialized)) => {
                self.expect(Keyword::Materialized.into())?;
                self.parse_create_view(true)
            }
            Some(token) => Err(Error::Syntax {
                message: format!(
                    "expected DATABASE, TABLE or VIEW after CREATE, found {}",
                    token
                ),
                position: pos,
            }),
            None => Err(Error::Syntax {
                message: "unexpected end of input after CREATE".into(),
                position: pos,
            }),
        }
    }

    /// Parses a DROP statement: DATABASE, TABLE or [MATERIALIZED] VIEW.
    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(Keyword::Drop.into())?;
        let pos = self.pos();
        match self.peek() {
            Some(Token::Keyword(Keyword::Database)) => self.parse_drop_database(),
            Some(Token::Keyword(Keyword::Table)) => self.parse_drop_table(),
            Some(Token::Keyword(Keyword::View)) => self.parse_drop_view(false),
            Some(Token::Keyword(Keyword::Materialized)) => {
                self.expect(Keyword::Materialized.into())?;
                self.parse_drop_view(true)
            }
            Some(token) => Err(Error::Syntax {
                message: format!(
                    "expected DATABASE, TABLE or VIEW after DROP, found {}",
                    token
                ),
                position: pos,
            }),
            None => Err(Error::Syntax {
                message: "unexpected end of input after DROP".into(),
                position: pos,
            }),
        }
    }

    /// Parses IF NOT EXISTS, if present.
    fn parse_if_not_exists(&mut self) -> Result<bool> {
        if !self.next_is(Keyword::If.into()) {
            return Ok(false);
        }
        self.expect(Keyword::Not.into())?;
        self.expect(Keyword::Exists.into())?;
        Ok(true)
    }

    /// Parses IF EXISTS, if present.
    fn parse_if_exists(&mut self) -> Result<bool> {
        if !self.next_is(Keyword::If.into()) {
            return Ok(false);
        }
        self.expect(Keyword::Exists.into())?;
        Ok(true)
    }

    fn parse_create_database(&mut self) -> Result<Statement> {
        self.expect(Keyword::Database.into())?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.next_ident()?;
        Ok(Statement::Ddl(DdlStatement::CreateDatabase {
            name,
            if_not_exists,
        }))
    }

    fn parse_drop_database(&mut self) -> Result<Statement> {
        self.expect(Keyword::Database.into())?;
        let if_exists = self.parse_if_exists()?;
        let name = self.next_ident()?;
        Ok(Statement::Ddl(DdlStatement::DropDatabase {
            name,
            if_exists,
        }))
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.expect(Keyword::Table.into())?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.next_ident()?;
        self.expect(Token::OpenParen)?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            if matches!(
                self.peek(),
                Some(Token::Keyword(
                    Keyword::Constraint | Keyword::Primary | Keyword::Unique | Keyword::Check
                ))
            ) {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_definition()?);
            }
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        self.expect(Token::CloseParen)?;

        Ok(Statement::Ddl(DdlStatement::CreateTable {
            name,
            columns,
            constraints,
            if_not_exists,
        }))
    }

    /// Parses a column definition with its constraint options.
    fn parse_column_definition(&mut self) -> Result<Column> {
        let name = self.next_ident()?;
        let data_type = self.parse_type()?;
        let mut column = Column::new(name, data_type);

        while let Some(keyword) = self.next_if_keyword() {
            match keyword {
                Keyword::Primary => {
                    self.expect(Keyword::Key.into())?;
                    column.primary_key = true;
                }
                Keyword::Null => {
                    if column.nullable.is_some() {
                        let pos = self.pos();
                        return Err(Error::Syntax {
                            message: format!("nullability already set for column {}", column.name),
                            position: pos,
                        });
                    }
                    column.nullable = Some(true);
                }
                Keyword::Not => {
                    self.expect(Keyword::Null.into())?;
                    if column.nullable.is_some() {
                        let pos = self.pos();
                        return Err(Error::Syntax {
                            message: format!("nullability already set for column {}", column.name),
                            position: pos,
                        });
                    }
                    column.nullable = Some(false);
                }
                Keyword::Unique => column.unique = true,
                Keyword::Default => column.default = Some(self.parse_expression()?),
                Keyword::Check => {
                    self.expect(Token::OpenParen)?;
                    column.check = Some(self.parse_expression()?);
                    self.expect(Token::CloseParen)?;
                }
                keyword => {
                    let pos = self.pos();
                    return Err(Error::Syntax {
                        message: format!("unexpected keyword {}", keyword),
                        position: pos,
                    });
                }
            }
        }
        Ok(column)
    }

    /// Parses a table-level constraint: [CONSTRAINT name] PRIMARY KEY (cols)
    /// | UNIQUE (cols) | CHECK (expr).
    fn parse_table_constraint(&mut self) -> Result<TableConstraint> {
        let name = if self.next_is(Keyword::Constraint.into()) {
            Some(self.next_ident()?)
        } else {
            None
        };

        let pos = self.pos();
        let kind = match self.next()? {
            Token::Keyword(Keyword::Primary) => {
                self.expect(Keyword::Key.into())?;
                TableConstraintKind::PrimaryKey(self.parse_column_name_list()?)
            }
            Token::Keyword(Keyword::Unique) => {
                TableConstraintKind::Unique(self.parse_column_name_list()?)
            }
            Token::Keyword(Keyword::Check) => {
                self.expect(Token::OpenParen)?;
                let expr = self.parse_expression()?;
                self.expect(Token::CloseParen)?;
                TableConstraintKind::Check(expr)
            }
            token => {
                return Err(Error::Syntax {
                    message: format!("expected PRIMARY KEY, UNIQUE or CHECK, found {}", token),
                    position: pos,
                });
            }
        };

        Ok(TableConstraint { name, kind })
    }

    /// Parses a parenthesized column name list.
    fn parse_column_name_list(&mut self) -> Result<Vec<String>> {
        self.expect(Token::OpenParen)?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.next_ident()?);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        self.expect(Token::CloseParen)?;
        Ok(columns)
    }

    fn parse_drop_table(&mut self) -> Result<Statement> {
        self.expect(Keyword::Table.into())?;
        let if_exists = self.parse_if_exists()?;
        let mut names = vec![self.next_ident()?];
        while self.next_is(Token::Comma) {
            names.push(self.next_ident()?);
        }
        Ok(Statement::Ddl(DdlStatement::DropTable { names, if_exists }))
    }

    fn parse_create_view(&mut self, materialized: bool) -> Result<Statement> {
        self.expect(Keyword::View.into())?;
        let name = self.next_ident()?;
        self.expect(Keyword::As.into())?;
        let query = Box::new(self.parse_select_statement()?);
        Ok(Statement::Ddl(DdlStatement::CreateView {
            name,
            query,
            materialized,
        }))
    }

    fn parse_drop_view(&mut self, materialized: bool) -> Result<Statement> {
        self.expect(Keyword::View.into())?;
        let if_exists = self.parse_if_exists()?;
        let mut names = vec![self.next_ident()?];
        while self.next_is(Token::Comma) {
            names.push(self.next_ident()?);
        }
        Ok(Statement::Ddl(DdlStatement::DropView {
            names,
            if_exists,
            materialized,
        }))
    }

    /// Parses a REFRESH MATERIALIZED VIEW statement.
    fn parse_refresh(&mut self) -> Result<Statement> {
        self.expect(Keyword::Refresh.into())?;
        self.expect(Keyword::Materialized.into())?;
        self.expect(Keyword::View.into())?;
        let name = self.next_ident()?;
        Ok(Statement::Ddl(DdlStatement::RefreshMaterializedView {
            name,
        }))
    }

    /// Parses an ALTER TABLE statement.
    fn parse_alter_table(&mut self) -> Result<Statement> {
        self.expect(Keyword::Alter.into())?;
        self.expect(Keyword::Table.into())?;
        let name = self.next_ident()?;

        let pos = self.pos();
        let operation = match self.next()? {
            Token::Keyword(Keyword::Add) => match self.peek() {
                Some(Token::Keyword(Keyword::Column)) => {
                    self.expect(Keyword::Column.into())?;
                    AlterTableOperation::AddColumn(self.parse_column_definition()?)
                }
                _ => AlterTableOperation::AddConstraint(self.parse_table_constraint()?),
            },
            Token::Keyword(Keyword::Drop) => match self.next()? {
                Token::Keyword(Keyword::Column) => {
                    AlterTableOperation::DropColumn(self.next_ident()?)
                }
                Token::Keyword(Keyword::Constraint) => {
                    AlterTableOperation::DropConstraint(self.next_ident()?)
                }
                token => {
                    return Err(Error::Syntax {
                        message: format!("expected COLUMN or CONSTRAINT, found {}", token),
                        position: pos,
                    });
                }
            },
            Token::Keyword(Keyword::Rename) => {
                if self.next_is(Keyword::Column.into()) {
                    let from = self.next_ident()?;
                    self.expect(Keyword::To.into())?;
                    let to = self.next_ident()?;
                    AlterTableOperation::RenameColumn { from, to }
                } else {
                    self.expect(Keyword::To.into())?;
                    AlterTableOperation::RenameTo(self.next_ident()?)
                }
            }
            token => {
                return Err(Error::Syntax {
                    message: format!("expected ADD, DROP or RENAME, found {}", token),
                    position: pos,
                });
            }
        };

        Ok(Statement::Ddl(DdlStatement::AlterTable { name, operation }))
    }

    /// Parses a USE statement, switching the current database.
    fn parse_use(&mut self) -> Result<Statement> {
        self.expect(Keyword::Use.into())?;
        let database = self.next_ident()?;
        Ok(Statement::Use { database })
    }
}
