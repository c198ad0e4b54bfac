//! The database handle: pooled select/execute primitives.
//!
//! [`Database`] is the object applications pass around (typically inside
//! request state). It owns a [`Pool`] and exposes the two statement
//! primitives everything else is built on: [`Database::select`] for reads
//! and [`Database::execute`] for writes. Statements are written with
//! portable `?` markers and translated to the driver's native style after a
//! connection is acquired.

use asupersync::{Cx, Outcome};
use miniorm_core::{Connection, Error, Row, TransactionOps, Value};
use miniorm_pool::{Connector, Pool, PoolConfig};

/// A pooled database handle.
///
/// Cloning is cheap; clones share the same pool.
pub struct Database<C: Connector> {
    pool: Pool<C>,
    autocommit: bool,
}

impl<C: Connector> Clone for Database<C> {
    fn clone(&self) -> Self {
        Self { pool: self.pool.clone(), autocommit: self.autocommit }
    }
}

impl<C: Connector> Database<C> {
    /// Validate `config`, create the pool, and warm it to `min_size`
    /// connections.
    ///
    /// Bad credentials or an unreachable host surface here, not on the
    /// first query.
    pub async fn connect(cx: &Cx, config: PoolConfig, connector: C) -> Outcome<Self, Error> {
        let autocommit = config.autocommit;
        let pool = match Pool::new(config, connector) {
            Ok(pool) => pool,
            Err(e) => return Outcome::Err(e),
        };
        match pool.warm(cx).await {
            Outcome::Ok(()) => Outcome::Ok(Self { pool, autocommit }),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(reason) => Outcome::Cancelled(reason),
            Outcome::Panicked(panic) => Outcome::Panicked(panic),
        }
    }

    /// Wrap an existing pool without warming it.
    pub fn from_pool(pool: Pool<C>) -> Self {
        let autocommit = pool.config().autocommit;
        Self { pool, autocommit }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &Pool<C> {
        &self.pool
    }

    /// The default autocommit behavior for [`Database::execute`].
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Run a read statement and collect every result row.
    pub async fn select(&self, cx: &Cx, sql: &str, args: &[Value]) -> Outcome<Vec<Row>, Error> {
        self.run_select(cx, sql, args, None).await
    }

    /// Run a read statement and collect at most `size` rows.
    pub async fn select_many(
        &self,
        cx: &Cx,
        sql: &str,
        args: &[Value],
        size: usize,
    ) -> Outcome<Vec<Row>, Error> {
        self.run_select(cx, sql, args, Some(size)).await
    }

    /// Run a read statement and return its first row, if any.
    pub async fn select_one(
        &self,
        cx: &Cx,
        sql: &str,
        args: &[Value],
    ) -> Outcome<Option<Row>, Error> {
        self.run_select(cx, sql, args, Some(1))
            .await
            .map(|mut rows| rows.pop())
    }

    /// Run a write statement and return the number of rows it affected.
    ///
    /// Uses the pool's configured autocommit behavior; see
    /// [`Database::execute_with`] to override it per call.
    pub async fn execute(&self, cx: &Cx, sql: &str, args: &[Value]) -> Outcome<u64, Error> {
        self.execute_with(cx, sql, args, self.autocommit).await
    }

    /// Run a write statement with explicit autocommit behavior.
    ///
    /// With `autocommit` false the statement runs inside a transaction:
    /// commit on success, rollback on failure. A rollback that itself
    /// fails is reported as a transaction error with the original
    /// statement error as its source.
    pub async fn execute_with(
        &self,
        cx: &Cx,
        sql: &str,
        args: &[Value],
        autocommit: bool,
    ) -> Outcome<u64, Error> {
        let conn = match self.pool.acquire(cx).await {
            Outcome::Ok(conn) => conn,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
            Outcome::Panicked(panic) => return Outcome::Panicked(panic),
        };
        let native = conn.param_style().translate(sql);
        tracing::debug!(sql = %native, params = args.len(), autocommit, "execute");

        if autocommit {
            return conn.execute(cx, &native, args).await;
        }

        let tx = match conn.begin(cx).await {
            Outcome::Ok(tx) => tx,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
            Outcome::Panicked(panic) => return Outcome::Panicked(panic),
        };
        match tx.execute(cx, &native, args).await {
            Outcome::Ok(affected) => match tx.commit(cx).await {
                Outcome::Ok(()) => Outcome::Ok(affected),
                Outcome::Err(e) => Outcome::Err(e),
                Outcome::Cancelled(reason) => Outcome::Cancelled(reason),
                Outcome::Panicked(panic) => Outcome::Panicked(panic),
            },
            Outcome::Err(statement_error) => match tx.rollback(cx).await {
                Outcome::Ok(()) => Outcome::Err(statement_error),
                Outcome::Err(rollback_error) => {
                    Outcome::Err(Error::rollback_failed(statement_error, rollback_error))
                }
                Outcome::Cancelled(reason) => Outcome::Cancelled(reason),
                Outcome::Panicked(panic) => Outcome::Panicked(panic),
            },
            // A dropped handle rolls back driver-side.
            Outcome::Cancelled(reason) => Outcome::Cancelled(reason),
            Outcome::Panicked(panic) => Outcome::Panicked(panic),
        }
    }

    /// Shut down the pool and close idle connections.
    pub async fn close(&self, cx: &Cx) {
        self.pool.close(cx).await;
    }

    async fn run_select(
        &self,
        cx: &Cx,
        sql: &str,
        args: &[Value],
        size: Option<usize>,
    ) -> Outcome<Vec<Row>, Error> {
        let conn = match self.pool.acquire(cx).await {
            Outcome::Ok(conn) => conn,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
            Outcome::Panicked(panic) => return Outcome::Panicked(panic),
        };
        let native = conn.param_style().translate(sql);
        tracing::debug!(sql = %native, params = args.len(), "select");
        let outcome = match size {
            Some(limit) => conn.query_many(cx, &native, args, limit).await,
            None => conn.query(cx, &native, args).await,
        };
        if let Outcome::Ok(rows) = &outcome {
            tracing::debug!(rows = rows.len(), "rows returned");
        }
        outcome
    }
}
