//! Error types for the SQL engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Lexical and syntax errors
    #[error("lexical error at position {position}: {message}")]
    Lexical { message: String, position: usize },

    #[error("syntax error at position {position}: {message}")]
    Syntax { message: String, position: usize },

    // Name errors
    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("database already exists: {0}")]
    DuplicateDatabase(String),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    DuplicateTable(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("column already exists: {0}")]
    DuplicateColumn(String),

    #[error("view not found: {0}")]
    ViewNotFound(String),

    #[error("view already exists: {0}")]
    DuplicateView(String),

    #[error("constraint not found: {0}")]
    ConstraintNotFound(String),

    #[error("constraint already exists: {0}")]
    DuplicateConstraint(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    // Type errors
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("cannot cast {value} to {to}")]
    InvalidCast { value: String, to: String },

    #[error("value too long for type {type_name} (length {length})")]
    ValueTooLong { type_name: String, length: usize },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    // Constraint errors
    #[error("NULL constraint violation on column: {0}")]
    NullConstraintViolation(String),

    #[error("primary key violation: {0}")]
    PrimaryKeyViolation(String),

    #[error("unique constraint violation: {0}")]
    UniqueConstraintViolation(String),

    #[error("check constraint violation: {0}")]
    CheckConstraintViolation(String),

    // Arithmetic errors
    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    // Cardinality errors
    #[error("scalar subquery returned more than one row")]
    ScalarSubqueryTooManyRows,

    #[error("scalar subquery must return a single column, got {0}")]
    ScalarSubqueryTooManyColumns(usize),

    #[error("set operation branches have different schemas: {0}")]
    SetOperationMismatch(String),

    // I/O errors
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("io error: {0}")]
    Io(String),

    // State errors
    #[error("no database selected")]
    NoDatabaseSelected,

    #[error("{0} is not a table")]
    NotATable(String),

    #[error("{0} is not a materialized view")]
    NotMaterialized(String),

    #[error("execution error: {0}")]
    ExecutionError(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
