//! Connection and transaction contracts implemented by database drivers.
//!
//! The ORM is written against these traits. Statement templates are compiled
//! with portable `?` parameter markers; [`ParamStyle::translate`] rewrites
//! them to whatever the driver's wire protocol expects, so one template
//! works across backends.

use std::future::Future;

use asupersync::{Cx, Outcome};

use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;

/// Positional-parameter marker style understood by a driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParamStyle {
    /// Bare `?` markers (MySQL style). Matches the portable template form,
    /// so translation is the identity.
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL style).
    Dollar,
    /// `?1`, `?2`, ... (SQLite style).
    QuestionNumber,
}

impl ParamStyle {
    /// The marker for the 1-based parameter `index` in this style.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            ParamStyle::Question => "?".to_string(),
            ParamStyle::Dollar => format!("${index}"),
            ParamStyle::QuestionNumber => format!("?{index}"),
        }
    }

    /// Rewrite portable `?` markers in `sql` to this style.
    ///
    /// Markers inside single-quoted string literals and backtick-quoted
    /// identifiers are left untouched.
    pub fn translate(self, sql: &str) -> String {
        if self == ParamStyle::Question {
            return sql.to_string();
        }
        let mut out = String::with_capacity(sql.len() + 8);
        let mut index = 0usize;
        let mut in_string = false;
        let mut in_ident = false;
        for ch in sql.chars() {
            match ch {
                '\'' if !in_ident => {
                    in_string = !in_string;
                    out.push(ch);
                }
                '`' if !in_string => {
                    in_ident = !in_ident;
                    out.push(ch);
                }
                '?' if !in_string && !in_ident => {
                    index += 1;
                    out.push_str(&self.placeholder(index));
                }
                _ => out.push(ch),
            }
        }
        out
    }
}

/// An open database connection.
///
/// All operations take a [`Cx`] and return [`Outcome`] so cancellation and
/// panics propagate alongside ordinary errors. Implementations must be safe
/// to share behind a pool: `&self` methods may be called from the task that
/// currently holds the connection.
pub trait Connection: Send + Sync {
    /// The transaction handle type for this connection.
    type Tx<'conn>: TransactionOps
    where
        Self: 'conn;

    /// The positional-parameter marker style this driver expects.
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Question
    }

    /// Run a statement and collect every result row.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Run a statement and collect at most `limit` result rows.
    fn query_many(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
        limit: usize,
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Run a statement and return the number of rows it affected.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Open an explicit transaction.
    fn begin(&self, cx: &Cx) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send;

    /// Close the connection, flushing any protocol goodbye.
    fn close(self, cx: &Cx) -> impl Future<Output = Result<()>> + Send;
}

/// Operations available inside an open transaction.
///
/// `commit` and `rollback` consume the handle; a dropped handle must roll
/// back on the driver side.
pub trait TransactionOps: Send {
    /// Run a statement inside the transaction and return its affected-row
    /// count.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Commit the transaction.
    fn commit(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Roll the transaction back.
    fn rollback(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_style_is_identity() {
        let sql = "select `id` from `users` where `email`=?";
        assert_eq!(ParamStyle::Question.translate(sql), sql);
    }

    #[test]
    fn dollar_style_numbers_markers() {
        let sql = "insert into `t` (`a`, `b`, `c`) values (?, ?, ?)";
        assert_eq!(
            ParamStyle::Dollar.translate(sql),
            "insert into `t` (`a`, `b`, `c`) values ($1, $2, $3)"
        );
    }

    #[test]
    fn question_number_style_numbers_markers() {
        assert_eq!(
            ParamStyle::QuestionNumber.translate("update `t` set `a`=? where `id`=?"),
            "update `t` set `a`=?1 where `id`=?2"
        );
    }

    #[test]
    fn markers_in_string_literals_survive() {
        assert_eq!(
            ParamStyle::Dollar.translate("select * from t where a='?' and b=?"),
            "select * from t where a='?' and b=$1"
        );
    }

    #[test]
    fn markers_in_quoted_identifiers_survive() {
        assert_eq!(
            ParamStyle::Dollar.translate("select `odd?name` from t where b=?"),
            "select `odd?name` from t where b=$1"
        );
    }

    #[test]
    fn doubled_quote_escape_stays_inside_the_literal() {
        assert_eq!(
            ParamStyle::Dollar.translate("select * from t where a='it''s ?' and b=?"),
            "select * from t where a='it''s ?' and b=$1"
        );
    }

    #[test]
    fn placeholder_forms() {
        assert_eq!(ParamStyle::Question.placeholder(3), "?");
        assert_eq!(ParamStyle::Dollar.placeholder(3), "$3");
        assert_eq!(ParamStyle::QuestionNumber.placeholder(3), "?3");
    }
}
