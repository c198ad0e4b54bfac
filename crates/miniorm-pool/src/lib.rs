//! Connection pooling for miniorm.
//!
//! A [`Pool`] owns every connection the application uses. Callers borrow a
//! connection with [`Pool::acquire`], use it, and return it by dropping the
//! [`PooledConnection`] guard. The pool dials new connections lazily up to
//! [`PoolConfig::max_size`] and keeps released ones idle for reuse.
//!
//! The pool is driver-agnostic: anything implementing [`Connector`] can
//! populate it, which is also how tests substitute in-memory fakes for a
//! real server.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use asupersync::{Cx, Outcome};
use miniorm_core::{Connection, Error, PoolError, PoolErrorKind, Result};

/// Settings for a [`Pool`] and the connections it opens.
///
/// `user`, `password`, and `database` are required; everything else has a
/// serviceable default.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user. Required.
    pub user: String,
    /// Login password. Required.
    pub password: String,
    /// Database (schema) to use. Required.
    pub database: String,
    /// Connection character set.
    pub charset: String,
    /// Whether statements outside an explicit transaction commit
    /// immediately.
    pub autocommit: bool,
    /// Connections opened up front when the pool is warmed.
    pub min_size: usize,
    /// Hard cap on concurrently open connections.
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            charset: "utf8".to_string(),
            autocommit: true,
            min_size: 1,
            max_size: 10,
        }
    }
}

impl PoolConfig {
    /// A configuration with every default in place.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server hostname.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the login password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the database to use.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the connection character set.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the default autocommit behavior.
    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Set how many connections a warm pool holds.
    pub fn min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the cap on concurrently open connections.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// The `host:port` string for this configuration.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the configuration before any connection is attempted.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("user", &self.user),
            ("password", &self.password),
            ("database", &self.database),
        ] {
            if value.is_empty() {
                return Err(Error::config(format!(
                    "missing required connection parameter '{name}'"
                )));
            }
        }
        if self.max_size == 0 {
            return Err(Error::config("max_size must be at least 1"));
        }
        if self.min_size > self.max_size {
            return Err(Error::config(format!(
                "min_size ({}) cannot exceed max_size ({})",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}

/// Opens connections for a [`Pool`].
pub trait Connector: Send + Sync {
    /// The connection type this connector produces.
    type Conn: Connection;

    /// Open one connection using the pool's configuration.
    fn connect(
        &self,
        cx: &Cx,
        config: &PoolConfig,
    ) -> impl Future<Output = Outcome<Self::Conn, Error>> + Send;
}

/// A snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections currently open (idle plus checked out).
    pub total: usize,
    /// Connections sitting idle in the pool.
    pub idle: usize,
    /// Connections currently checked out.
    pub in_use: usize,
}

struct PoolState<T> {
    idle: VecDeque<T>,
    total: usize,
    closed: bool,
}

struct PoolInner<C: Connector> {
    config: PoolConfig,
    connector: C,
    state: Mutex<PoolState<C::Conn>>,
}

impl<C: Connector> PoolInner<C> {
    fn lock_state(&self) -> MutexGuard<'_, PoolState<C::Conn>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self, conn: C::Conn) {
        let mut state = self.lock_state();
        if state.closed {
            // conn drops here, severing the connection
            state.total -= 1;
            return;
        }
        state.idle.push_back(conn);
    }

    fn release_slot(&self) {
        let mut state = self.lock_state();
        state.total -= 1;
    }
}

/// A pool of database connections.
///
/// Cloning is cheap; every clone hands out connections from the same
/// underlying pool.
pub struct Pool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: Connector> Pool<C> {
    /// Create an empty pool after validating `config`.
    ///
    /// No connection is opened here; use [`Pool::warm`] to pre-open
    /// `min_size` connections, or let [`Pool::acquire`] dial on demand.
    pub fn new(config: PoolConfig, connector: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                connector,
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    total: 0,
                    closed: false,
                }),
            }),
        })
    }

    /// The configuration this pool was created with.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Open connections until `min_size` are held.
    pub async fn warm(&self, cx: &Cx) -> Outcome<(), Error> {
        loop {
            {
                let mut state = self.inner.lock_state();
                if state.closed {
                    return Outcome::Err(closed_error());
                }
                if state.total >= self.inner.config.min_size {
                    return Outcome::Ok(());
                }
                state.total += 1;
            }
            match self.dial(cx).await {
                Outcome::Ok(conn) => {
                    let mut state = self.inner.lock_state();
                    state.idle.push_back(conn);
                }
                Outcome::Err(e) => {
                    self.inner.release_slot();
                    return Outcome::Err(e);
                }
                Outcome::Cancelled(reason) => {
                    self.inner.release_slot();
                    return Outcome::Cancelled(reason);
                }
                Outcome::Panicked(panic) => {
                    self.inner.release_slot();
                    return Outcome::Panicked(panic);
                }
            }
        }
    }

    /// Borrow a connection, reusing an idle one when possible.
    ///
    /// When every connection is checked out and the pool is at
    /// `max_size`, this fails fast with a [`PoolErrorKind::Exhausted`]
    /// error rather than queueing.
    pub async fn acquire(&self, cx: &Cx) -> Outcome<PooledConnection<C>, Error> {
        let reused = {
            let mut state = self.inner.lock_state();
            if state.closed {
                return Outcome::Err(closed_error());
            }
            match state.idle.pop_front() {
                Some(conn) => Some(conn),
                None if state.total < self.inner.config.max_size => {
                    // Reserve the slot before dialing so concurrent
                    // acquires cannot overshoot max_size.
                    state.total += 1;
                    None
                }
                None => {
                    let in_use = state.total;
                    return Outcome::Err(Error::Pool(PoolError {
                        kind: PoolErrorKind::Exhausted,
                        message: format!("all {in_use} connections are in use"),
                    }));
                }
            }
        };

        if let Some(conn) = reused {
            return Outcome::Ok(PooledConnection::new(Arc::clone(&self.inner), conn));
        }

        match self.dial(cx).await {
            Outcome::Ok(conn) => {
                Outcome::Ok(PooledConnection::new(Arc::clone(&self.inner), conn))
            }
            Outcome::Err(e) => {
                self.inner.release_slot();
                Outcome::Err(e)
            }
            Outcome::Cancelled(reason) => {
                self.inner.release_slot();
                Outcome::Cancelled(reason)
            }
            Outcome::Panicked(panic) => {
                self.inner.release_slot();
                Outcome::Panicked(panic)
            }
        }
    }

    /// Shut the pool down and close every idle connection.
    ///
    /// Connections still checked out are severed when their guard drops.
    /// Close failures are logged and do not interrupt the drain.
    pub async fn close(&self, cx: &Cx) {
        let drained: Vec<C::Conn> = {
            let mut state = self.inner.lock_state();
            state.closed = true;
            state.total -= state.idle.len();
            state.idle.drain(..).collect()
        };
        let count = drained.len();
        for conn in drained {
            if let Err(e) = conn.close(cx).await {
                tracing::warn!(error = %e, "error closing pooled connection");
            }
        }
        tracing::debug!(closed = count, "pool closed");
    }

    /// Whether [`Pool::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lock_state().closed
    }

    /// A snapshot of current occupancy.
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.lock_state();
        PoolStats {
            total: state.total,
            idle: state.idle.len(),
            in_use: state.total - state.idle.len(),
        }
    }

    async fn dial(&self, cx: &Cx) -> Outcome<C::Conn, Error> {
        let config = &self.inner.config;
        tracing::debug!(
            addr = %config.socket_addr(),
            database = %config.database,
            "opening new connection"
        );
        self.inner.connector.connect(cx, config).await
    }
}

/// A connection borrowed from a [`Pool`].
///
/// Dereferences to the driver connection. Dropping the guard returns the
/// connection to the pool; [`PooledConnection::into_inner`] removes it from
/// the pool permanently.
pub struct PooledConnection<C: Connector> {
    inner: Arc<PoolInner<C>>,
    conn: Option<C::Conn>,
}

impl<C: Connector> PooledConnection<C> {
    fn new(inner: Arc<PoolInner<C>>, conn: C::Conn) -> Self {
        Self { inner, conn: Some(conn) }
    }

    /// Detach the connection from the pool.
    ///
    /// The pool forgets the connection entirely; the caller becomes
    /// responsible for closing it.
    pub fn into_inner(mut self) -> C::Conn {
        let conn = self.conn.take().expect("connection already returned to the pool");
        self.inner.release_slot();
        conn
    }
}

impl<C: Connector> fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection").finish_non_exhaustive()
    }
}

impl<C: Connector> Deref for PooledConnection<C> {
    type Target = C::Conn;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection already returned to the pool")
    }
}

impl<C: Connector> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection already returned to the pool")
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.inner.release(conn);
        }
    }
}

fn closed_error() -> Error {
    Error::Pool(PoolError {
        kind: PoolErrorKind::Closed,
        message: "pool is closed".to_string(),
    })
}
