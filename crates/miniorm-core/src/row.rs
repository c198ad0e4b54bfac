//! Result rows and typed cell extraction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result, TypeError};
use crate::value::Value;

/// Column metadata shared by every row of one result set.
#[derive(Debug, Clone, Default)]
pub struct ColumnInfo {
    names: Vec<String>,
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Build column metadata from an ordered list of names.
    pub fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, name_to_index }
    }

    /// The column names, in result order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the result set has no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// The name of the column at `index`.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }
}

/// A single result row.
///
/// Values are stored positionally; the shared [`ColumnInfo`] maps names to
/// positions so one metadata allocation serves the whole result set.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<ColumnInfo>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row over shared column metadata.
    pub fn new(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Build a standalone row from `(name, value)` pairs.
    ///
    /// Convenient for drivers that assemble rows ad hoc rather than from a
    /// prepared result description.
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        let mut names = Vec::with_capacity(pairs.len());
        let mut values = Vec::with_capacity(pairs.len());
        for (name, value) in pairs {
            names.push(name);
            values.push(value);
        }
        Self {
            columns: Arc::new(ColumnInfo::new(names)),
            values,
        }
    }

    /// The column metadata for this row.
    pub fn columns(&self) -> &ColumnInfo {
        &self.columns
    }

    /// The raw values, in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of cells in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// The value of the named column, if present.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Iterate over `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Extract the value at `index`, converted to `T`.
    pub fn get_as<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.values.get(index).ok_or_else(|| {
            Error::argument(format!(
                "column index {index} out of range ({} columns)",
                self.values.len()
            ))
        })?;
        T::from_value(value.clone()).map_err(|e| tag_column(e, self.columns.name(index)))
    }

    /// Extract the value of the named column, converted to `T`.
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let index = self
            .columns
            .index_of(name)
            .ok_or_else(|| Error::argument(format!("no such column '{name}'")))?;
        self.get_as(index)
    }
}

fn tag_column(err: Error, column: Option<&str>) -> Error {
    match (err, column) {
        (Error::Type(TypeError { expected, actual, column: None }), Some(name)) => {
            Error::Type(TypeError {
                expected,
                actual,
                column: Some(name.to_string()),
            })
        }
        (err, _) => err,
    }
}

/// Conversion from a dynamic [`Value`] into a concrete Rust type.
pub trait FromValue: Sized {
    /// Convert, reporting a type error when the value does not fit.
    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        bool::try_from(value)
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        i32::try_from(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        i64::try_from(value)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        f64::try_from(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        String::try_from(value)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        Vec::<u8>::try_from(value)
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self> {
        serde_json::Value::try_from(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
