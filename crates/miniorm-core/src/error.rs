//! Error types for miniorm operations.
//!
//! Every fallible operation in the ORM reports one of the variants of
//! [`Error`]. Variants carry structured payloads so callers can match on the
//! failure category without parsing message strings.

use std::fmt;

/// A convenient `Result` alias for miniorm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The unified error type for all miniorm operations.
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration (missing credentials, bad pool sizing).
    Config(ConfigError),
    /// Schema registration failed (primary-key or column problems).
    Schema(SchemaError),
    /// A caller supplied an argument the operation cannot use.
    Argument(ArgumentError),
    /// Establishing or using a connection failed.
    Connection(ConnectionError),
    /// A statement was rejected or failed while executing.
    Query(QueryError),
    /// A transaction could not complete.
    Transaction(TransactionError),
    /// The connection pool could not satisfy a request.
    Pool(PoolError),
    /// A value could not be converted to the requested Rust type.
    Type(TypeError),
    /// An underlying I/O failure.
    Io(std::io::Error),
}

/// Invalid configuration detected before any connection is attempted.
#[derive(Debug)]
pub struct ConfigError {
    /// Explanation of what is wrong with the configuration.
    pub message: String,
}

/// Schema registration failure.
#[derive(Debug)]
pub struct SchemaError {
    /// What kind of schema problem occurred.
    pub kind: SchemaErrorKind,
    /// Details, including the table and column involved.
    pub message: String,
}

/// The kinds of schema registration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// More than one field was flagged as the primary key.
    DuplicatePrimaryKey,
    /// No field was flagged as the primary key.
    PrimaryKeyNotFound,
    /// Two fields mapped to the same column name.
    DuplicateColumn,
    /// A column name was used that the table does not declare.
    UnknownColumn,
}

/// A caller-supplied argument was rejected before any SQL ran.
#[derive(Debug)]
pub struct ArgumentError {
    /// Explanation of what was wrong with the argument.
    pub message: String,
}

/// Connection-level failure.
#[derive(Debug)]
pub struct ConnectionError {
    /// What kind of connection problem occurred.
    pub kind: ConnectionErrorKind,
    /// Human-readable details.
    pub message: String,
    /// Underlying driver error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// The kinds of connection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Could not reach or handshake with the server.
    Connect,
    /// The server rejected the supplied credentials.
    Authentication,
    /// The connection dropped mid-operation.
    Disconnected,
    /// The connection was already closed.
    Closed,
}

/// A statement failed while being prepared or executed.
#[derive(Debug)]
pub struct QueryError {
    /// The statement that failed, when available.
    pub sql: Option<String>,
    /// Human-readable details.
    pub message: String,
    /// Underlying driver error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// A transaction could not run to completion.
#[derive(Debug)]
pub struct TransactionError {
    /// Which phase of the transaction failed.
    pub kind: TransactionErrorKind,
    /// Human-readable details.
    pub message: String,
    /// The error that caused the transaction to unwind, if any.
    ///
    /// For [`TransactionErrorKind::RollbackFailed`] this is the original
    /// statement error; the rollback failure itself is described by
    /// `message`.
    pub source: Option<Box<Error>>,
}

/// The kinds of transaction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// `BEGIN` failed.
    Begin,
    /// `COMMIT` failed.
    Commit,
    /// A statement failed and the subsequent `ROLLBACK` failed too.
    RollbackFailed,
}

/// The pool could not hand out a connection.
#[derive(Debug)]
pub struct PoolError {
    /// Why the pool refused the request.
    pub kind: PoolErrorKind,
    /// Human-readable details.
    pub message: String,
}

/// The kinds of pool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolErrorKind {
    /// Every connection is checked out and the pool is at capacity.
    Exhausted,
    /// The pool has been shut down.
    Closed,
}

/// A value could not be converted to the requested Rust type.
#[derive(Debug)]
pub struct TypeError {
    /// The SQL-side type that was expected.
    pub expected: String,
    /// The value (or its type) that was actually present.
    pub actual: String,
    /// The column involved, when known.
    pub column: Option<String>,
}

impl Error {
    /// Build a [`ConfigError`] wrapped in [`Error::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError { message: message.into() })
    }

    /// Build a [`SchemaError`] wrapped in [`Error::Schema`].
    pub fn schema(kind: SchemaErrorKind, message: impl Into<String>) -> Self {
        Error::Schema(SchemaError { kind, message: message.into() })
    }

    /// Build an [`ArgumentError`] wrapped in [`Error::Argument`].
    pub fn argument(message: impl Into<String>) -> Self {
        Error::Argument(ArgumentError { message: message.into() })
    }

    /// Build a [`QueryError`] for a failed statement.
    pub fn query(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            sql: Some(sql.into()),
            message: message.into(),
            source: None,
        })
    }

    /// Build the chained error for a rollback that itself failed.
    ///
    /// The statement error that triggered the rollback is preserved as the
    /// source so callers can still see what went wrong first.
    pub fn rollback_failed(original: Error, rollback: Error) -> Self {
        Error::Transaction(TransactionError {
            kind: TransactionErrorKind::RollbackFailed,
            message: format!("rollback failed: {rollback}"),
            source: Some(Box::new(original)),
        })
    }

    /// The SQL statement associated with this error, if any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(e) => e.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema error: {}", self.message)
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid argument: {}", self.message)
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ConnectionErrorKind::Connect => "connect",
            ConnectionErrorKind::Authentication => "authentication",
            ConnectionErrorKind::Disconnected => "disconnected",
            ConnectionErrorKind::Closed => "closed",
        };
        write!(f, "connection error ({kind}): {}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql {
            Some(sql) => write!(f, "query error: {} (sql: {sql})", self.message),
            None => write!(f, "query error: {}", self.message),
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TransactionErrorKind::Begin => "begin",
            TransactionErrorKind::Commit => "commit",
            TransactionErrorKind::RollbackFailed => "rollback failed",
        };
        write!(f, "transaction error ({kind}): {}", self.message)
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PoolErrorKind::Exhausted => "exhausted",
            PoolErrorKind::Closed => "closed",
        };
        write!(f, "pool error ({kind}): {}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "type error for column '{column}': expected {}, got {}",
                self.expected, self.actual
            ),
            None => write!(f, "type error: expected {}, got {}", self.expected, self.actual),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => e.fmt(f),
            Error::Schema(e) => e.fmt(f),
            Error::Argument(e) => e.fmt(f),
            Error::Connection(e) => e.fmt(f),
            Error::Query(e) => e.fmt(f),
            Error::Transaction(e) => e.fmt(f),
            Error::Pool(e) => e.fmt(f),
            Error::Type(e) => e.fmt(f),
            Error::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e.source.as_deref().map(|s| s as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e.source.as_deref().map(|s| s as &(dyn std::error::Error + 'static)),
            Error::Transaction(e) => e.source.as_deref().map(|s| s as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<SchemaError> for Error {
    fn from(e: SchemaError) -> Self {
        Error::Schema(e)
    }
}

impl From<ArgumentError> for Error {
    fn from(e: ArgumentError) -> Self {
        Error::Argument(e)
    }
}

impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Self {
        Error::Connection(e)
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        Error::Query(e)
    }
}

impl From<TransactionError> for Error {
    fn from(e: TransactionError) -> Self {
        Error::Transaction(e)
    }
}

impl From<PoolError> for Error {
    fn from(e: PoolError) -> Self {
        Error::Pool(e)
    }
}

impl From<TypeError> for Error {
    fn from(e: TypeError) -> Self {
        Error::Type(e)
    }
}
