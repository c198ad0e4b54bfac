//! Core types and traits for miniorm.
//!
//! This crate holds everything drivers and the ORM layer share: the dynamic
//! [`Value`] type, result [`Row`]s, field descriptors, the error taxonomy,
//! and the [`Connection`] / [`TransactionOps`] contracts.

pub mod connection;
pub mod error;
pub mod field;
pub mod row;
pub mod value;

// Async runtime primitives.
pub use asupersync::{Budget, Cx, Outcome, RegionId, TaskId};

// Connection contracts.
pub use connection::{Connection, ParamStyle, TransactionOps};

// Errors.
pub use error::{
    ArgumentError, ConfigError, ConnectionError, ConnectionErrorKind, Error, PoolError,
    PoolErrorKind, QueryError, Result, SchemaError, SchemaErrorKind, TransactionError,
    TransactionErrorKind, TypeError,
};

// Fields.
pub use field::{FieldDef, FieldDefault};

// Rows.
pub use row::{ColumnInfo, FromValue, Row};

// Values.
pub use value::Value;
