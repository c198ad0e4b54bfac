//! Round-trip persistence against an in-memory table driver.
//!
//! The driver recognizes the statement templates compiled for one
//! registered table and applies them to a shared map, which is enough to
//! exercise save/find/update/remove end to end without a server.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use asupersync::runtime::RuntimeBuilder;
use miniorm::prelude::*;
use miniorm::TransactionOps;

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

fn fixed_time() -> Value {
    Value::Float(1000.5)
}

fn users_table() -> Arc<TableDef> {
    TableDef::builder("User")
        .table("users")
        .field("id", FieldDef::string().primary_key(true))
        .field("email", FieldDef::string())
        .field("admin", FieldDef::boolean().default_value(false))
        .field("created_at", FieldDef::float().default_fn(fixed_time))
        .build()
        .unwrap()
}

type StoredRow = BTreeMap<String, Value>;

#[derive(Default)]
struct MemoryStore {
    rows: BTreeMap<String, StoredRow>,
}

fn key_of(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        other => format!("{other:?}"),
    }
}

enum Reply {
    Rows(Vec<Row>),
    Affected(u64),
}

struct MemoryConn {
    table: Arc<TableDef>,
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryConn {
    fn row_of(&self, stored: &StoredRow) -> Row {
        // Column order mirrors the compiled select: key first, then the rest.
        let mut pairs = Vec::with_capacity(self.table.column_count());
        let pk = self.table.primary_key();
        pairs.push((pk.to_string(), stored.get(pk).cloned().unwrap_or(Value::Null)));
        for column in self.table.other_fields() {
            pairs.push((column.clone(), stored.get(column).cloned().unwrap_or(Value::Null)));
        }
        Row::from_pairs(pairs)
    }

    fn dispatch(&self, sql: &str, params: &[Value]) -> Result<Reply> {
        let table = &self.table;
        let mut store = self.store.lock().unwrap();

        let select_base = table.select_sql();
        let point_select = format!(
            "{} where {}=?",
            select_base,
            miniorm::quote_ident(table.primary_key())
        );
        let count_all = format!(
            "select count({}) as _num_ from {}",
            miniorm::quote_ident(table.primary_key()),
            miniorm::quote_ident(table.table_name())
        );

        if sql == select_base {
            let rows = store.rows.values().map(|stored| self.row_of(stored)).collect();
            return Ok(Reply::Rows(rows));
        }
        if sql == point_select {
            let key = key_of(&params[0]);
            let rows = store
                .rows
                .get(&key)
                .map(|stored| self.row_of(stored))
                .into_iter()
                .collect();
            return Ok(Reply::Rows(rows));
        }
        if sql == count_all {
            let count = store.rows.len() as i64;
            return Ok(Reply::Rows(vec![Row::from_pairs(vec![(
                "_num_".to_string(),
                Value::Int(count),
            )])]));
        }
        if sql == table.insert_sql() {
            let pk = params[table.other_fields().len()].clone();
            let key = key_of(&pk);
            if store.rows.contains_key(&key) {
                return Err(Error::query(sql, "duplicate primary key"));
            }
            let mut stored = StoredRow::new();
            for (i, column) in table.other_fields().iter().enumerate() {
                stored.insert(column.clone(), params[i].clone());
            }
            stored.insert(table.primary_key().to_string(), pk);
            store.rows.insert(key, stored);
            return Ok(Reply::Affected(1));
        }
        if sql == table.update_sql() {
            let key = key_of(params.last().unwrap());
            return match store.rows.get_mut(&key) {
                Some(stored) => {
                    for (i, column) in table.other_fields().iter().enumerate() {
                        stored.insert(column.clone(), params[i].clone());
                    }
                    Ok(Reply::Affected(1))
                }
                None => Ok(Reply::Affected(0)),
            };
        }
        if sql == table.delete_sql() {
            let key = key_of(&params[0]);
            return Ok(Reply::Affected(u64::from(store.rows.remove(&key).is_some())));
        }
        Err(Error::query(sql, "statement not supported by the memory driver"))
    }
}

struct MemoryTx;

impl TransactionOps for MemoryTx {
    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        _params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let result = Err(Error::query(sql, "transactions not supported by this driver"));
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    async fn commit(self, _cx: &Cx) -> Outcome<(), Error> {
        Outcome::Ok(())
    }

    async fn rollback(self, _cx: &Cx) -> Outcome<(), Error> {
        Outcome::Ok(())
    }
}

impl Connection for MemoryConn {
    type Tx<'conn>
        = MemoryTx
    where
        Self: 'conn;

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let result = match self.dispatch(sql, params) {
            Ok(Reply::Rows(rows)) => Ok(rows),
            Ok(Reply::Affected(_)) => Err(Error::query(sql, "statement returns no rows")),
            Err(e) => Err(e),
        };
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn query_many(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
        limit: usize,
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let query = self.query(cx, sql, params);
        async move {
            query.await.map(|mut rows| {
                rows.truncate(limit);
                rows
            })
        }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let result = match self.dispatch(sql, params) {
            Ok(Reply::Affected(n)) => Ok(n),
            Ok(Reply::Rows(_)) => Err(Error::query(sql, "statement returns rows")),
            Err(e) => Err(e),
        };
        async move { result.map_or_else(Outcome::Err, Outcome::Ok) }
    }

    fn begin(&self, _cx: &Cx) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send {
        async move { Outcome::Ok(MemoryTx) }
    }

    async fn close(self, _cx: &Cx) -> Result<()> {
        Ok(())
    }
}

struct MemoryConnector {
    table: Arc<TableDef>,
    store: Arc<Mutex<MemoryStore>>,
}

impl Connector for MemoryConnector {
    type Conn = MemoryConn;

    fn connect(
        &self,
        _cx: &Cx,
        _config: &PoolConfig,
    ) -> impl Future<Output = Outcome<MemoryConn, Error>> + Send {
        let conn = MemoryConn {
            table: Arc::clone(&self.table),
            store: Arc::clone(&self.store),
        };
        async move { Outcome::Ok(conn) }
    }
}

fn connector_for(table: &Arc<TableDef>) -> MemoryConnector {
    MemoryConnector {
        table: Arc::clone(table),
        store: Arc::default(),
    }
}

fn test_config() -> PoolConfig {
    PoolConfig::new()
        .user("webapp")
        .password("secret")
        .database("awesome")
}

#[test]
fn saved_records_come_back_by_key() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let table = users_table();
        let db = unwrap_outcome(
            Database::connect(&cx, test_config(), connector_for(&table)).await,
        );

        let mut user = Record::new(Arc::clone(&table));
        user.set("id", "u-1").unwrap();
        user.set("email", "alice@example.com").unwrap();
        let affected = unwrap_outcome(user.save(&cx, &db).await);
        assert_eq!(affected, 1);

        let found = unwrap_outcome(db.find(&cx, &table, "u-1").await);
        let found = found.expect("record saved above");
        assert_eq!(found.value("email"), Value::Text("alice@example.com".into()));
        // Defaults materialized at save time come back from storage.
        assert_eq!(found.value("admin"), Value::Bool(false));
        assert_eq!(found.value("created_at"), Value::Float(1000.5));

        let missing = unwrap_outcome(db.find(&cx, &table, "u-404").await);
        assert!(missing.is_none());
    });
}

#[test]
fn find_all_scans_every_saved_record() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let table = users_table();
        let db = unwrap_outcome(
            Database::connect(&cx, test_config(), connector_for(&table)).await,
        );

        for (id, email) in [("u-1", "a@x"), ("u-2", "b@x"), ("u-3", "c@x")] {
            let mut user = Record::new(Arc::clone(&table));
            user.set("id", id).unwrap();
            user.set("email", email).unwrap();
            unwrap_outcome(user.save(&cx, &db).await);
        }

        let everyone = unwrap_outcome(db.find_all(&cx, &table, FindOptions::new()).await);
        assert_eq!(everyone.len(), 3);
        let ids: Vec<Value> = everyone.iter().map(|r| r.value("id")).collect();
        assert_eq!(
            ids,
            vec![
                Value::Text("u-1".into()),
                Value::Text("u-2".into()),
                Value::Text("u-3".into()),
            ]
        );
    });
}

#[test]
fn find_number_counts_saved_records() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let table = users_table();
        let db = unwrap_outcome(
            Database::connect(&cx, test_config(), connector_for(&table)).await,
        );
        for id in ["u-1", "u-2"] {
            let mut user = Record::new(Arc::clone(&table));
            user.set("id", id).unwrap();
            user.set("email", "x@x").unwrap();
            unwrap_outcome(user.save(&cx, &db).await);
        }

        let count = unwrap_outcome(db.find_number(&cx, &table, "count(`id`)", None, &[]).await);
        assert_eq!(count, Some(Value::Int(2)));
    });
}

#[test]
fn update_rewrites_and_remove_deletes() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let table = users_table();
        let db = unwrap_outcome(
            Database::connect(&cx, test_config(), connector_for(&table)).await,
        );

        let mut user = Record::new(Arc::clone(&table));
        user.set("id", "u-1").unwrap();
        user.set("email", "old@x").unwrap();
        unwrap_outcome(user.save(&cx, &db).await);

        user.set("email", "new@x").unwrap();
        assert_eq!(unwrap_outcome(user.update(&cx, &db).await), 1);

        let reloaded = unwrap_outcome(db.find(&cx, &table, "u-1").await).expect("still there");
        assert_eq!(reloaded.value("email"), Value::Text("new@x".into()));

        assert_eq!(unwrap_outcome(user.remove(&cx, &db).await), 1);
        assert!(unwrap_outcome(db.find(&cx, &table, "u-1").await).is_none());

        // Removing an absent row reports zero affected rows, not an error.
        assert_eq!(unwrap_outcome(user.remove(&cx, &db).await), 0);
    });
}

#[test]
fn duplicate_insert_surfaces_the_driver_error() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let table = users_table();
        let db = unwrap_outcome(
            Database::connect(&cx, test_config(), connector_for(&table)).await,
        );

        let mut user = Record::new(Arc::clone(&table));
        user.set("id", "u-1").unwrap();
        user.set("email", "a@x").unwrap();
        unwrap_outcome(user.save(&cx, &db).await);

        match user.save(&cx, &db).await {
            Outcome::Err(Error::Query(e)) => assert_eq!(e.message, "duplicate primary key"),
            other => panic!("expected a query error, got {other:?}"),
        }
    });
}
