//! Canonical SQL rendering of the AST.
//!
//! Printing an AST and re-parsing the output yields an identical AST:
//! operator operands are parenthesized explicitly, keywords are upper-case,
//! and optional syntax is always rendered in its canonical long form.

use super::common::{Direction, FromClause, SetOperator};
use super::ddl::{AlterTableOperation, Column, DdlStatement, TableConstraint, TableConstraintKind};
use super::dml::{DmlStatement, InsertSource, OnConflict, SelectStatement};
use super::expressions::{Expression, Literal, Operator};
use super::Statement;
use std::fmt;

/// Writes an operand, parenthesizing nested operators so that precedence
/// never has to be reconstructed by the reader (or the re-parser).
struct Operand<'a>(&'a Expression);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expression::Operator(_) => write!(f, "({})", self.0),
            expr => write!(f, "{}", expr),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_select_items(
    f: &mut fmt::Formatter<'_>,
    items: &[(Expression, Option<String>)],
) -> fmt::Result {
    for (i, (expr, alias)) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match alias {
            Some(alias) => write!(f, "{} AS {}", expr, alias)?,
            None => write!(f, "{}", expr)?,
        }
    }
    Ok(())
}

fn write_assignments(
    f: &mut fmt::Formatter<'_>,
    set: &std::collections::BTreeMap<String, Option<Expression>>,
) -> fmt::Result {
    for (i, (column, expr)) in set.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match expr {
            Some(expr) => write!(f, "{} = {}", column, expr)?,
            None => write!(f, "{} = DEFAULT", column)?,
        }
    }
    Ok(())
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Ddl(ddl) => write!(f, "{}", ddl),
            Statement::Dml(dml) => write!(f, "{}", dml),
            Statement::Use { database } => write!(f, "USE {}", database),
        }
    }
}

impl fmt::Display for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdlStatement::CreateDatabase {
                name,
                if_not_exists,
            } => {
                write!(f, "CREATE DATABASE ")?;
                if *if_not_exists {
                    write!(f, "IF NOT EXISTS ")?;
                }
                write!(f, "{}", name)
            }
            DdlStatement::DropDatabase { name, if_exists } => {
                write!(f, "DROP DATABASE ")?;
                if *if_exists {
                    write!(f, "IF EXISTS ")?;
                }
                write!(f, "{}", name)
            }
            DdlStatement::CreateTable {
                name,
                columns,
                constraints,
                if_not_exists,
            } => {
                write!(f, "CREATE TABLE ")?;
                if *if_not_exists {
                    write!(f, "IF NOT EXISTS ")?;
                }
                write!(f, "{} (", name)?;
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", column)?;
                }
                for constraint in constraints {
                    if !columns.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", constraint)?;
                }
                write!(f, ")")
            }
            DdlStatement::AlterTable { name, operation } => {
                write!(f, "ALTER TABLE {} {}", name, operation)
            }
            DdlStatement::DropTable { names, if_exists } => {
                write!(f, "DROP TABLE ")?;
                if *if_exists {
                    write!(f, "IF EXISTS ")?;
                }
                write_list(f, names)
            }
            DdlStatement::CreateView {
                name,
                query,
                materialized,
            } => {
                write!(f, "CREATE ")?;
                if *materialized {
                    write!(f, "MATERIALIZED ")?;
                }
                write!(f, "VIEW {} AS {}", name, query)
            }
            DdlStatement::RefreshMaterializedView { name } => {
                write!(f, "REFRESH MATERIALIZED VIEW {}", name)
            }
            DdlStatement::DropView {
                names,
                if_exists,
                materialized,
            } => {
                write!(f, "DROP ")?;
                if *materialized {
                    write!(f, "MATERIALIZED ")?;
                }
                write!(f, "VIEW ")?;
                if *if_exists {
                    write!(f, "IF EXISTS ")?;
                }
                write_list(f, names)
            }
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if self.primary_key {
            write!(f, " PRIMARY KEY")?;
        }
        match self.nullable {
            Some(false) => write!(f, " NOT NULL")?,
            Some(true) => write!(f, " NULL")?,
            None => {}
        }
        if self.unique {
            write!(f, " UNIQUE")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", Operand(default))?;
        }
        if let Some(check) = &self.check {
            write!(f, " CHECK ({})", check)?;
        }
        Ok(())
    }
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {} ", name)?;
        }
        match &self.kind {
            TableConstraintKind::PrimaryKey(columns) => {
                write!(f, "PRIMARY KEY (")?;
                write_list(f, columns)?;
                write!(f, ")")
            }
            TableConstraintKind::Unique(columns) => {
                write!(f, "UNIQUE (")?;
                write_list(f, columns)?;
                write!(f, ")")
            }
            TableConstraintKind::Check(expr) => write!(f, "CHECK ({})", expr),
        }
    }
}

impl fmt::Display for AlterTableOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterTableOperation::AddColumn(column) => write!(f, "ADD COLUMN {}", column),
            AlterTableOperation::DropColumn(name) => write!(f, "DROP COLUMN {}", name),
            AlterTableOperation::AddConstraint(constraint) => {
                write!(f, "ADD {}", constraint)
            }
            AlterTableOperation::DropConstraint(name) => write!(f, "DROP CONSTRAINT {}", name),
            AlterTableOperation::RenameTo(name) => write!(f, "RENAME TO {}", name),
            AlterTableOperation::RenameColumn { from, to } => {
                write!(f, "RENAME COLUMN {} TO {}", from, to)
            }
        }
    }
}

impl fmt::Display for DmlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmlStatement::Insert {
                table,
                columns,
                source,
                on_conflict,
                returning,
            } => {
                write!(f, "INSERT INTO {}", table)?;
                if let Some(columns) = columns {
                    write!(f, " (")?;
                    write_list(f, columns)?;
                    write!(f, ")")?;
                }
                match source {
                    InsertSource::Values(rows) => {
                        write!(f, " VALUES ")?;
                        for (i, row) in rows.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "(")?;
                            for (j, cell) in row.iter().enumerate() {
                                if j > 0 {
                                    write!(f, ", ")?;
                                }
                                match cell {
                                    Some(expr) => write!(f, "{}", expr)?,
                                    None => write!(f, "DEFAULT")?,
                                }
                            }
                            write!(f, ")")?;
                        }
                    }
                    InsertSource::Select(query) => write!(f, " {}", query)?,
                    InsertSource::DefaultValues => write!(f, " DEFAULT VALUES")?,
                }
                if let Some(on_conflict) = on_conflict {
                    write!(f, " {}", on_conflict)?;
                }
                if let Some(returning) = returning {
                    write!(f, " RETURNING ")?;
                    write_select_items(f, returning)?;
                }
                Ok(())
            }
            DmlStatement::Update {
                table,
                set,
                r#where,
                returning,
            } => {
                write!(f, "UPDATE {} SET ", table)?;
                write_assignments(f, set)?;
                if let Some(predicate) = r#where {
                    write!(f, " WHERE {}", predicate)?;
                }
                if let Some(returning) = returning {
                    write!(f, " RETURNING ")?;
                    write_select_items(f, returning)?;
                }
                Ok(())
            }
            DmlStatement::Delete {
                table,
                r#where,
                returning,
            } => {
                write!(f, "DELETE FROM {}", table)?;
                if let Some(predicate) = r#where {
                    write!(f, " WHERE {}", predicate)?;
                }
                if let Some(returning) = returning {
                    write!(f, " RETURNING ")?;
                    write_select_items(f, returning)?;
                }
                Ok(())
            }
            DmlStatement::Select(select) => write!(f, "{}", select),
        }
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.with.is_empty() {
            write!(f, "WITH ")?;
            for (i, cte) in self.with.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} AS ({})", cte.name, cte.query)?;
            }
            write!(f, " ")?;
        }
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write_select_items(f, &self.select)?;
        if let Some(from) = &self.from {
            write!(f, " FROM {}", from)?;
        }
        if let Some(predicate) = &self.r#where {
            write!(f, " WHERE {}", predicate)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY ")?;
            write_list(f, &self.group_by)?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        for (op, branch) in &self.compounds {
            write!(f, " {} {}", op, branch)?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            for (i, (expr, direction)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} {}", expr, direction)?;
            }
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FromClause::Table { name, alias: None } => write!(f, "{}", name),
            FromClause::Table {
                name,
                alias: Some(alias),
            } => write!(f, "{} AS {}", name, alias),
            FromClause::Subquery { query, alias } => write!(f, "({}) AS {}", query, alias),
        }
    }
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOperator::Union { all: false } => write!(f, "UNION"),
            SetOperator::Union { all: true } => write!(f, "UNION ALL"),
            SetOperator::Intersect => write!(f, "INTERSECT"),
            SetOperator::Except => write!(f, "EXCEPT"),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

impl fmt::Display for OnConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ON CONFLICT")?;
        match self {
            OnConflict::DoNothing { target } => {
                if !target.is_empty() {
                    write!(f, " (")?;
                    write_list(f, target)?;
                    write!(f, ")")?;
                }
                write!(f, " DO NOTHING")
            }
            OnConflict::DoUpdate { target, set } => {
                if !target.is_empty() {
                    write!(f, " (")?;
                    write_list(f, target)?;
                    write!(f, ")")?;
                }
                write!(f, " DO UPDATE SET ")?;
                write_assignments(f, set)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::All => write!(f, "*"),
            Expression::Column(None, name) => write!(f, "{}", name),
            Expression::Column(Some(table), name) => write!(f, "{}.{}", table, name),
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Function(name, args) => {
                // Aggregate DISTINCT forms are stored as NAME_DISTINCT and
                // rendered back to their surface syntax.
                if let Some(base) = name.strip_suffix("_DISTINCT") {
                    write!(f, "{}(DISTINCT ", base)?;
                    write_list(f, args)?;
                    return write!(f, ")");
                }
                if args.is_empty() && name == "CURRENT_DATE" {
                    return write!(f, "CURRENT_DATE");
                }
                if name == "EXTRACT" && args.len() == 2 {
                    if let Expression::Literal(Literal::String(field)) = &args[0] {
                        return write!(f, "EXTRACT({} FROM {})", field, args[1]);
                    }
                }
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expression::Operator(op) => write!(f, "{}", op),
            Expression::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", Operand(operand))?;
                }
                for (when, then) in when_clauses {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(else_expr) = else_clause {
                    write!(f, " ELSE {}", else_expr)?;
                }
                write!(f, " END")
            }
            Expression::Cast { expr, data_type } => {
                write!(f, "CAST({} AS {})", expr, data_type)
            }
            Expression::Subquery(select) => write!(f, "({})", select),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(true) => write!(f, "TRUE"),
            Literal::Boolean(false) => write!(f, "FALSE"),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => {
                // Keep a decimal point so the literal re-lexes as a float.
                let s = v.to_string();
                if s.chars().all(|c| c.is_ascii_digit()) {
                    write!(f, "{}.0", s)
                } else {
                    write!(f, "{}", s)
                }
            }
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Date(d) => write!(f, "DATE '{}'", d.format("%Y-%m-%d")),
            Literal::Time(t) => write!(f, "TIME '{}'", t.format("%H:%M:%S")),
            Literal::Timestamp(ts) => {
                write!(f, "TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S"))
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Operator::*;
        match self {
            And(lhs, rhs) => write!(f, "{} AND {}", Operand(lhs), Operand(rhs)),
            Or(lhs, rhs) => write!(f, "{} OR {}", Operand(lhs), Operand(rhs)),
            Not(expr) => write!(f, "NOT {}", Operand(expr)),

            Equal(lhs, rhs) => write!(f, "{} = {}", Operand(lhs), Operand(rhs)),
            NotEqual(lhs, rhs) => write!(f, "{} != {}", Operand(lhs), Operand(rhs)),
            GreaterThan(lhs, rhs) => write!(f, "{} > {}", Operand(lhs), Operand(rhs)),
            GreaterThanOrEqual(lhs, rhs) => {
                write!(f, "{} >= {}", Operand(lhs), Operand(rhs))
            }
            LessThan(lhs, rhs) => write!(f, "{} < {}", Operand(lhs), Operand(rhs)),
            LessThanOrEqual(lhs, rhs) => write!(f, "{} <= {}", Operand(lhs), Operand(rhs)),

            Is { expr, negated } => {
                if *negated {
                    write!(f, "{} IS NOT NULL", Operand(expr))
                } else {
                    write!(f, "{} IS NULL", Operand(expr))
                }
            }
            Like {
                expr,
                pattern,
                case_insensitive,
                negated,
            } => {
                write!(f, "{} ", Operand(expr))?;
                if *negated {
                    write!(f, "NOT ")?;
                }
                let keyword = if *case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, "{} {}", keyword, Operand(pattern))
            }
            Between {
                expr,
                low,
                high,
                negated,
            } => {
                write!(f, "{} ", Operand(expr))?;
                if *negated {
                    write!(f, "NOT ")?;
                }
                write!(f, "BETWEEN {} AND {}", Operand(low), Operand(high))
            }
            InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{} ", Operand(expr))?;
                if *negated {
                    write!(f, "NOT ")?;
                }
                write!(f, "IN (")?;
                write_list(f, list)?;
                write!(f, ")")
            }
            InSubquery {
                expr,
                subquery,
                negated,
            } => {
                write!(f, "{} ", Operand(expr))?;
                if *negated {
                    write!(f, "NOT ")?;
                }
                write!(f, "IN ({})", subquery)
            }
            Exists { subquery, negated } => {
                if *negated {
                    write!(f, "NOT ")?;
                }
                write!(f, "EXISTS ({})", subquery)
            }

            Add(lhs, rhs) => write!(f, "{} + {}", Operand(lhs), Operand(rhs)),
            Subtract(lhs, rhs) => write!(f, "{} - {}", Operand(lhs), Operand(rhs)),
            Multiply(lhs, rhs) => write!(f, "{} * {}", Operand(lhs), Operand(rhs)),
            Divide(lhs, rhs) => write!(f, "{} / {}", Operand(lhs), Operand(rhs)),
            Remainder(lhs, rhs) => write!(f, "{} % {}", Operand(lhs), Operand(rhs)),
            Negate(expr) => write!(f, "-{}", Operand(expr)),
            Identity(expr) => write!(f, "+{}", Operand(expr)),
        }
    }
}
