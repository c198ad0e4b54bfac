//! Records: sparse typed rows bound to a registered table.
//!
//! A [`Record`] stores values only for the columns that were set or loaded.
//! Reading distinguishes "set", "unset, use the default", and "unset, that
//! is an error" via three accessors ([`Record::value`],
//! [`Record::value_or_default`], [`Record::try_value`]); the declared
//! default materializes a missing value exactly once, matching what
//! [`Record::save`] will insert.
//!
//! The finder operations live on [`Database`] and return records bound to
//! the table they were loaded from.

use std::collections::HashMap;
use std::sync::Arc;

use asupersync::{Cx, Outcome};
use miniorm_core::{Error, FieldDefault, Result, Row, SchemaErrorKind, Value};
use miniorm_pool::Connector;

use crate::db::Database;
use crate::query::{FindOptions, Limit};
use crate::schema::{TableDef, quote_ident};

/// One row of a registered table, with sparse column values.
#[derive(Debug, Clone)]
pub struct Record {
    table: Arc<TableDef>,
    values: HashMap<String, Value>,
}

impl Record {
    /// An empty record of `table` with no values set.
    pub fn new(table: Arc<TableDef>) -> Self {
        Self { table, values: HashMap::new() }
    }

    /// Build a record from a result row.
    ///
    /// Columns the table does not declare are ignored, so a driver may
    /// return extra columns without breaking record construction.
    pub fn from_row(table: Arc<TableDef>, row: &Row) -> Self {
        let mut values = HashMap::new();
        for (name, value) in row.iter() {
            if table.field(name).is_some() {
                values.insert(name.to_string(), value.clone());
            }
        }
        Self { table, values }
    }

    /// The table this record belongs to.
    pub fn table(&self) -> &Arc<TableDef> {
        &self.table
    }

    /// Set a column's value. Columns the table does not declare are
    /// rejected.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<()> {
        if self.table.field(column).is_none() {
            return Err(unknown_column(&self.table, column));
        }
        self.values.insert(column.to_string(), value.into());
        Ok(())
    }

    /// The stored value, if set.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// The stored value, or NULL when unset.
    pub fn value(&self, column: &str) -> Value {
        self.values.get(column).cloned().unwrap_or(Value::Null)
    }

    /// The stored value; unset (or undeclared) columns are an error.
    pub fn try_value(&self, column: &str) -> Result<&Value> {
        if self.table.field(column).is_none() {
            return Err(unknown_column(&self.table, column));
        }
        self.values
            .get(column)
            .ok_or_else(|| Error::argument(format!("no value set for column `{column}`")))
    }

    /// The stored value, falling back to the field's declared default.
    ///
    /// A fixed default is copied into the record; a computed default's
    /// factory runs at most once and the produced value sticks as the
    /// column's value from then on. A column with no declared default
    /// reads as NULL without sticking.
    pub fn value_or_default(&mut self, column: &str) -> Result<Value> {
        if let Some(value) = self.values.get(column) {
            return Ok(value.clone());
        }
        let Some(default) = self.table.field(column).map(|f| f.default.clone()) else {
            return Err(unknown_column(&self.table, column));
        };
        let value = match default {
            FieldDefault::None => return Ok(Value::Null),
            FieldDefault::Value(value) => value,
            FieldDefault::Factory(factory) => factory(),
        };
        tracing::debug!(column = %column, value = ?value, "using default value");
        self.values.insert(column.to_string(), value.clone());
        Ok(value)
    }

    /// Insert this record, filling unset columns from their defaults.
    ///
    /// Binds the non-key columns in registration order, then the primary
    /// key, matching the compiled insert template. Returns the
    /// affected-row count; anything other than 1 is logged as a warning.
    pub async fn save<C: Connector>(&mut self, cx: &Cx, db: &Database<C>) -> Outcome<u64, Error> {
        let table = Arc::clone(&self.table);
        let mut args = Vec::with_capacity(table.column_count());
        for column in table.other_fields() {
            match self.value_or_default(column) {
                Ok(value) => args.push(value),
                Err(e) => return Outcome::Err(e),
            }
        }
        match self.value_or_default(table.primary_key()) {
            Ok(value) => args.push(value),
            Err(e) => return Outcome::Err(e),
        }
        let outcome = db.execute(cx, table.insert_sql(), &args).await;
        warn_unless_single(&outcome, "insert", &table);
        outcome
    }

    /// Rewrite this record's row, keyed by primary key.
    ///
    /// Every non-key column is written; unset columns write NULL. Returns
    /// the affected-row count; anything other than 1 is logged as a
    /// warning.
    pub async fn update<C: Connector>(&self, cx: &Cx, db: &Database<C>) -> Outcome<u64, Error> {
        let mut args: Vec<Value> = self
            .table
            .other_fields()
            .iter()
            .map(|column| self.value(column))
            .collect();
        args.push(self.value(self.table.primary_key()));
        let outcome = db.execute(cx, self.table.update_sql(), &args).await;
        warn_unless_single(&outcome, "update", &self.table);
        outcome
    }

    /// Delete this record's row, keyed by primary key.
    ///
    /// Returns the affected-row count; anything other than 1 is logged as
    /// a warning.
    pub async fn remove<C: Connector>(&self, cx: &Cx, db: &Database<C>) -> Outcome<u64, Error> {
        let args = [self.value(self.table.primary_key())];
        let outcome = db.execute(cx, self.table.delete_sql(), &args).await;
        warn_unless_single(&outcome, "delete", &self.table);
        outcome
    }
}

fn unknown_column(table: &TableDef, column: &str) -> Error {
    Error::schema(
        SchemaErrorKind::UnknownColumn,
        format!("unknown column `{column}` in table `{}`", table.table_name()),
    )
}

fn warn_unless_single(outcome: &Outcome<u64, Error>, op: &str, table: &TableDef) {
    if let Outcome::Ok(affected) = outcome {
        if *affected != 1 {
            tracing::warn!(
                table = table.table_name(),
                op,
                affected,
                "statement affected an unexpected number of rows"
            );
        }
    }
}

impl<C: Connector> Database<C> {
    /// Load every record of `table` matching `opts`.
    ///
    /// Builds on the compiled select template: the filter becomes a
    /// `where` clause, ordering an `order by` clause, and the limit is
    /// bound through `?` markers rather than spliced into the statement.
    pub async fn find_all(
        &self,
        cx: &Cx,
        table: &Arc<TableDef>,
        opts: FindOptions,
    ) -> Outcome<Vec<Record>, Error> {
        let FindOptions { filter, mut args, order_by, limit } = opts;
        let mut sql = table.select_sql().to_string();
        if let Some(clause) = filter {
            sql.push_str(" where ");
            sql.push_str(&clause);
        }
        if let Some(clause) = order_by {
            sql.push_str(" order by ");
            sql.push_str(&clause);
        }
        match limit {
            Some(Limit::Count(count)) => {
                sql.push_str(" limit ?");
                args.push(Value::Int(count));
            }
            Some(Limit::Offset { offset, count }) => {
                sql.push_str(" limit ?, ?");
                args.push(Value::Int(offset));
                args.push(Value::Int(count));
            }
            None => {}
        }
        self.select(cx, &sql, &args).await.map(|rows| {
            rows.iter()
                .map(|row| Record::from_row(Arc::clone(table), row))
                .collect()
        })
    }

    /// Load the record of `table` with the given primary key.
    pub async fn find(
        &self,
        cx: &Cx,
        table: &Arc<TableDef>,
        pk: impl Into<Value>,
    ) -> Outcome<Option<Record>, Error> {
        let sql = format!(
            "{} where {}=?",
            table.select_sql(),
            quote_ident(table.primary_key())
        );
        self.select_one(cx, &sql, &[pk.into()])
            .await
            .map(|row| row.map(|row| Record::from_row(Arc::clone(table), &row)))
    }

    /// Evaluate a scalar expression over `table`, e.g. ``count(`id`)``.
    ///
    /// The expression is aliased to `_num_` and read back from the first
    /// result row; `None` means the statement produced no row.
    pub async fn find_number(
        &self,
        cx: &Cx,
        table: &Arc<TableDef>,
        select_expr: &str,
        filter: Option<&str>,
        args: &[Value],
    ) -> Outcome<Option<Value>, Error> {
        let mut sql = format!(
            "select {} as _num_ from {}",
            select_expr,
            quote_ident(table.table_name())
        );
        if let Some(clause) = filter {
            sql.push_str(" where ");
            sql.push_str(clause);
        }
        self.select_one(cx, &sql, args)
            .await
            .and_then(|row| match row {
                Some(row) => match row.get_named::<Value>("_num_") {
                    Ok(value) => Outcome::Ok(Some(value)),
                    Err(e) => Outcome::Err(e),
                },
                None => Outcome::Ok(None),
            })
    }
}
