//! Field descriptors for table registration.
//!
//! A [`FieldDef`] describes one column: its SQL column type, whether it is
//! the primary key, an optional column-name override, and its default value
//! policy. Descriptors are plain const-buildable data so tables can be
//! declared in statics or registered at startup.

use std::fmt;

use crate::value::Value;

/// Default value policy for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// No declared default; an unset value resolves to NULL.
    None,
    /// A fixed default, materialized into the record on first use.
    Value(Value),
    /// A nullary factory, invoked once per record and cached.
    Factory(fn() -> Value),
}

/// Descriptor for a single column of a registered table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Column name override. When unset, the name the field was registered
    /// under is used as the column name.
    pub column: Option<&'static str>,
    /// The SQL column type used in DDL and diagnostics.
    pub sql_type: &'static str,
    /// Whether this field is the table's primary key.
    pub primary_key: bool,
    /// How a missing value is filled in on insert.
    pub default: FieldDefault,
}

impl FieldDef {
    /// A descriptor with an explicit SQL column type and no other flags.
    pub const fn new(sql_type: &'static str) -> Self {
        Self {
            column: None,
            sql_type,
            primary_key: false,
            default: FieldDefault::None,
        }
    }

    /// A short string field, `varchar(100)`.
    pub const fn string() -> Self {
        Self::new("varchar(100)")
    }

    /// A boolean field.
    pub const fn boolean() -> Self {
        Self::new("boolean")
    }

    /// An integer field, `bigint`.
    pub const fn integer() -> Self {
        Self::new("bigint")
    }

    /// A floating-point field, `real`.
    pub const fn float() -> Self {
        Self::new("real")
    }

    /// An unbounded text field.
    pub const fn text() -> Self {
        Self::new("text")
    }

    /// Override the column name this field maps to.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column = Some(name);
        self
    }

    /// Override the SQL column type.
    pub const fn sql_type(mut self, sql_type: &'static str) -> Self {
        self.sql_type = sql_type;
        self
    }

    /// Mark (or unmark) this field as the primary key.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Declare a fixed default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Declare a computed default. The factory runs at most once per record.
    pub fn default_fn(mut self, factory: fn() -> Value) -> Self {
        self.default = FieldDefault::Factory(factory);
        self
    }

    /// The column name this field maps to, given the name it was
    /// registered under.
    pub fn effective_column<'a>(&self, registered: &'a str) -> &'a str {
        match self.column {
            Some(name) => name,
            None => registered,
        }
    }
}

impl fmt::Display for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.sql_type)?;
        if self.primary_key {
            write!(f, ", primary key")?;
        }
        match &self.default {
            FieldDefault::None => {}
            FieldDefault::Value(v) => write!(f, ", default {v:?}")?,
            FieldDefault::Factory(_) => write!(f, ", computed default")?,
        }
        write!(f, ">")
    }
}
