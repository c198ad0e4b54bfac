//! Options for record queries.

use miniorm_core::{Error, Result, Value};

/// Options for [`Database::find_all`](crate::Database::find_all): an
/// optional filter with bound arguments, ordering, and a result window.
///
/// Filter and order-by clauses are raw SQL bodies (without the `where` /
/// `order by` keywords) using portable `?` markers.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub(crate) filter: Option<String>,
    pub(crate) args: Vec<Value>,
    pub(crate) order_by: Option<String>,
    pub(crate) limit: Option<Limit>,
}

impl FindOptions {
    /// Empty options: no filter, no ordering, no limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict results with a `where` clause body, e.g. `` "`admin`=?" ``.
    pub fn filter(mut self, clause: impl Into<String>) -> Self {
        self.filter = Some(clause.into());
        self
    }

    /// Bind one argument for the filter's markers. Call once per marker,
    /// in order.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Order results with an `order by` clause body, e.g.
    /// `` "`created_at` desc" ``.
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    /// Cap the result window.
    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Set the limit from a dynamic value: an integer, or a two-integer
    /// array meaning `(offset, count)`. Any other shape is rejected here,
    /// before any SQL runs.
    pub fn limit_value(mut self, value: &Value) -> Result<Self> {
        self.limit = Some(Limit::try_from(value)?);
        Ok(self)
    }
}

/// A result window for [`FindOptions::limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// At most this many rows.
    Count(i64),
    /// Skip `offset` rows, then take at most `count`.
    Offset {
        /// Rows to skip.
        offset: i64,
        /// Rows to take after the skip.
        count: i64,
    },
}

impl From<i64> for Limit {
    fn from(count: i64) -> Self {
        Limit::Count(count)
    }
}

impl From<(i64, i64)> for Limit {
    fn from((offset, count): (i64, i64)) -> Self {
        Limit::Offset { offset, count }
    }
}

impl TryFrom<&Value> for Limit {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Int(count) => Ok(Limit::Count(*count)),
            Value::Array(items) => match items.as_slice() {
                [Value::Int(offset), Value::Int(count)] => {
                    Ok(Limit::Offset { offset: *offset, count: *count })
                }
                _ => Err(Error::argument(
                    "limit array must hold exactly two integers: (offset, count)",
                )),
            },
            other => Err(Error::argument(format!(
                "limit must be an integer or an (offset, count) pair, got {}",
                other.type_name()
            ))),
        }
    }
}
