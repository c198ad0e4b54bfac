//! Table registration and SQL template compilation.
//!
//! A [`TableDef`] is built once at startup from a name and a set of
//! [`FieldDef`]s. Registration validates the shape (exactly one primary
//! key, no column collisions) and compiles the four statement templates
//! every record operation runs: select, insert, update by primary key, and
//! delete by primary key. Templates use portable `?` markers; the database
//! handle translates them per driver.

use std::collections::HashMap;
use std::sync::Arc;

use miniorm_core::{Error, FieldDef, Result, SchemaErrorKind};

/// Quote an identifier with backticks, escaping embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn marker_list(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// A registered table: validated field layout plus compiled statement
/// templates.
#[derive(Debug)]
pub struct TableDef {
    model: String,
    table: String,
    primary_key: String,
    other_fields: Vec<String>,
    fields: Vec<(String, FieldDef)>,
    index: HashMap<String, usize>,
    select_sql: String,
    insert_sql: String,
    update_sql: String,
    delete_sql: String,
}

impl TableDef {
    /// Start registering a table for the model called `model`.
    ///
    /// The model name doubles as the table name unless
    /// [`TableBuilder::table`] overrides it.
    pub fn builder(model: impl Into<String>) -> TableBuilder {
        TableBuilder {
            model: model.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// The model name this table was registered for.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The table name used in SQL.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// The primary key column name.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Every column except the primary key, in registration order.
    pub fn other_fields(&self) -> &[String] {
        &self.other_fields
    }

    /// Look up a field descriptor by column name.
    pub fn field(&self, column: &str) -> Option<&FieldDef> {
        self.index.get(column).map(|&i| &self.fields[i].1)
    }

    /// Iterate `(column, descriptor)` pairs in registration order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.fields.len()
    }

    /// The compiled select template: primary key first, then the other
    /// columns.
    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    /// The compiled insert template. Binds the non-key columns in order,
    /// then the primary key.
    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    /// The compiled update-by-primary-key template.
    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    /// The compiled delete-by-primary-key template.
    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }
}

/// Collects fields for a [`TableDef`] and compiles it.
pub struct TableBuilder {
    model: String,
    table: Option<String>,
    fields: Vec<(String, FieldDef)>,
}

impl TableBuilder {
    /// Override the table name.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// Register a field under `name`. The column name is `name` unless the
    /// descriptor carries an override.
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.push((name.into(), def));
        self
    }

    /// Validate the layout and compile the statement templates.
    pub fn build(self) -> Result<Arc<TableDef>> {
        let table = self.table.unwrap_or_else(|| self.model.clone());

        let mut primary_key: Option<String> = None;
        let mut other_fields = Vec::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut index = HashMap::with_capacity(self.fields.len());

        for (registered, def) in self.fields {
            let column = def.effective_column(&registered).to_string();
            if index.contains_key(&column) {
                return Err(Error::schema(
                    SchemaErrorKind::DuplicateColumn,
                    format!("duplicate column `{column}` in table `{table}`"),
                ));
            }
            tracing::debug!(column = %column, field = %def, "mapped column");
            if def.primary_key {
                if primary_key.is_some() {
                    return Err(Error::schema(
                        SchemaErrorKind::DuplicatePrimaryKey,
                        format!("duplicate primary key `{column}` in table `{table}`"),
                    ));
                }
                primary_key = Some(column.clone());
            } else {
                other_fields.push(column.clone());
            }
            index.insert(column.clone(), fields.len());
            fields.push((column, def));
        }

        let Some(primary_key) = primary_key else {
            return Err(Error::schema(
                SchemaErrorKind::PrimaryKeyNotFound,
                format!("primary key not found in table `{table}`"),
            ));
        };

        let quoted_table = quote_ident(&table);
        let quoted_pk = quote_ident(&primary_key);
        let quoted_others: Vec<String> =
            other_fields.iter().map(|name| quote_ident(name)).collect();

        let mut select_cols = Vec::with_capacity(1 + quoted_others.len());
        select_cols.push(quoted_pk.clone());
        select_cols.extend(quoted_others.iter().cloned());
        let select_sql = format!("select {} from {}", select_cols.join(", "), quoted_table);

        let mut insert_cols = quoted_others.clone();
        insert_cols.push(quoted_pk.clone());
        let insert_sql = format!(
            "insert into {} ({}) values ({})",
            quoted_table,
            insert_cols.join(", "),
            marker_list(insert_cols.len()),
        );

        let assignments: Vec<String> =
            quoted_others.iter().map(|col| format!("{col}=?")).collect();
        let update_sql = format!(
            "update {} set {} where {}=?",
            quoted_table,
            assignments.join(", "),
            quoted_pk,
        );

        let delete_sql = format!("delete from {} where {}=?", quoted_table, quoted_pk);

        tracing::debug!(
            model = %self.model,
            table = %table,
            columns = fields.len(),
            "registered table"
        );

        Ok(Arc::new(TableDef {
            model: self.model,
            table,
            primary_key,
            other_fields,
            fields,
            index,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        }))
    }
}
