//! miniorm - a minimal async ORM over a pooled connection.
//!
//! miniorm maps registered tables to dynamically typed records:
//!
//! - Explicit schema registration compiled into the four SQL statement
//!   templates (select, insert, update, delete) at startup
//! - Sparse records whose missing values come from declared defaults
//! - Pooled select/execute primitives with per-call transaction control
//! - Driver-agnostic connections, so tests run against in-memory fakes
//!
//! # Quick Start
//!
//! ```ignore
//! use miniorm::prelude::*;
//!
//! async fn example(cx: &Cx, connector: impl Connector) -> Result<()> {
//!     // Register the table once at startup.
//!     let users = TableDef::builder("User")
//!         .table("users")
//!         .field("id", FieldDef::string().primary_key(true))
//!         .field("email", FieldDef::string())
//!         .field("admin", FieldDef::boolean().default_value(false))
//!         .build()?;
//!
//!     let config = PoolConfig::new()
//!         .user("webapp")
//!         .password("secret")
//!         .database("awesome");
//!     let db = match Database::connect(cx, config, connector).await {
//!         Outcome::Ok(db) => db,
//!         outcome => panic!("connect failed: {outcome:?}"),
//!     };
//!
//!     // Insert a record, defaults filling the gaps.
//!     let mut user = Record::new(users.clone());
//!     user.set("id", "u-1")?;
//!     user.set("email", "alice@example.com")?;
//!     user.save(cx, &db).await;
//!
//!     // Query it back.
//!     let admins = db
//!         .find_all(
//!             cx,
//!             &users,
//!             FindOptions::new().filter("`admin`=?").bind(true).limit(10),
//!         )
//!         .await;
//!
//!     Ok(())
//! }
//! ```

mod db;
mod query;
mod record;
mod schema;

// Re-export the core vocabulary so `miniorm` works standalone.
pub use miniorm_core::{
    // asupersync re-exports
    Budget,
    // Connection contracts
    Connection,
    Cx,
    Error,
    FieldDef,
    FieldDefault,
    FromValue,
    Outcome,
    ParamStyle,
    RegionId,
    Result,
    Row,
    TaskId,
    TransactionOps,
    Value,
};

pub use miniorm_pool::{Connector, Pool, PoolConfig, PoolStats, PooledConnection};

pub use db::Database;
pub use query::{FindOptions, Limit};
pub use record::Record;
pub use schema::{TableBuilder, TableDef, quote_ident};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use miniorm::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // asupersync
        Budget,
        // Connection contracts
        Connection,
        Connector,
        Cx,
        // Database handle
        Database,
        Error,
        // Schema registration
        FieldDef,
        FieldDefault,
        // Queries
        FindOptions,
        Limit,
        Outcome,
        // Pool
        Pool,
        PoolConfig,
        // Records
        Record,
        RegionId,
        Result,
        Row,
        TableDef,
        TaskId,
        Value,
    };
}
