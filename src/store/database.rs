//! DuckDB-backed record store.
//!
//! One table, `catalog_records`, keyed by catalog id. The type list is stored
//! as a `", "`-joined VARCHAR and split back into an array on read.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use duckdb::types::{Value, ValueRef};
use duckdb::Connection as DuckDbConnection;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{RecordFilter, Store};
use crate::error::StoreError;
use crate::models::PersistedRecord;
use crate::sql_builder::SqlBuilder;

const TABLE: &str = "catalog_records";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS catalog_records (
    id INTEGER PRIMARY KEY,
    name VARCHAR NOT NULL,
    types VARCHAR NOT NULL,
    hp INTEGER NOT NULL DEFAULT 0,
    attack INTEGER NOT NULL DEFAULT 0,
    defense INTEGER NOT NULL DEFAULT 0,
    special_attack INTEGER NOT NULL DEFAULT 0,
    special_defense INTEGER NOT NULL DEFAULT 0,
    speed INTEGER NOT NULL DEFAULT 0,
    sprite_url VARCHAR NOT NULL,
    shiny_sprite_url VARCHAR NOT NULL,
    favorite BOOLEAN NOT NULL DEFAULT FALSE
)";

const TYPE_SEPARATOR: &str = ", ";

/// A local record store on top of a single DuckDB connection.
///
/// The connection sits behind a mutex, so writes from the sync worker and
/// favorite toggles from readers are applied one at a time.
pub struct DuckDbStore {
    conn: Mutex<DuckDbConnection>,
}

impl DuckDbStore {
    /// Open (or create) a database file. Parent directories are created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::init(DuckDbConnection::open(path)?)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(DuckDbConnection::open_in_memory()?)
    }

    fn init(conn: DuckDbConnection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, DuckDbConnection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Store for DuckDbStore {
    fn exists(&self, ids: &[u32]) -> Result<bool, StoreError> {
        let mut wanted: Vec<u32> = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(true);
        }

        let (sql, params) = SqlBuilder::new(TABLE)
            .select(&["COUNT(*)"])
            .where_in("id", &wanted)
            .build();

        let conn = self.lock()?;
        let found = execute_scalar(&conn, &sql, &params)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(found == wanted.len() as u64)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let (sql, params) = SqlBuilder::new(TABLE).select(&["COUNT(*)"]).build();
        let conn = self.lock()?;
        Ok(execute_scalar(&conn, &sql, &params)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    fn create(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        let (sql, params) = SqlBuilder::new(TABLE)
            .select(&["COUNT(*)"])
            .where_eq("id", record.id)
            .build();

        // Existence check and insert happen under one lock.
        let conn = self.lock()?;
        let present = execute_scalar(&conn, &sql, &params)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if present > 0 {
            return Err(StoreError::DuplicateId(record.id));
        }

        conn.execute(
            "INSERT INTO catalog_records \
             (id, name, types, hp, attack, defense, special_attack, special_defense, \
              speed, sprite_url, shiny_sprite_url, favorite) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                i64::from(record.id),
                record.name,
                record.types.join(TYPE_SEPARATOR),
                i64::from(record.hp),
                i64::from(record.attack),
                i64::from(record.defense),
                i64::from(record.special_attack),
                i64::from(record.special_defense),
                i64::from(record.speed),
                record.sprite_url.as_str(),
                record.shiny_sprite_url.as_str(),
                record.favorite,
            ],
        )?;
        Ok(())
    }

    fn find(&self, id: u32) -> Result<Option<PersistedRecord>, StoreError> {
        let (sql, params) = SqlBuilder::new(TABLE).where_eq("id", id).limit(1).build();
        let conn = self.lock()?;
        let rows: Vec<StoredRow> = execute_into(&conn, &sql, &params)?;
        rows.into_iter().next().map(StoredRow::into_record).transpose()
    }

    fn query_all(&self, filter: RecordFilter) -> Result<Vec<PersistedRecord>, StoreError> {
        let mut qb = SqlBuilder::new(TABLE);
        if filter == RecordFilter::FavoritesOnly {
            qb.where_eq("favorite", true);
        }
        qb.order_by(&["id ASC"]);

        let (sql, params) = qb.build();
        let conn = self.lock()?;
        let rows: Vec<StoredRow> = execute_into(&conn, &sql, &params)?;
        rows.into_iter().map(StoredRow::into_record).collect()
    }

    fn update(&self, id: u32, favorite: bool) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE catalog_records SET favorite = ? WHERE id = ?",
            duckdb::params![favorite, i64::from(id)],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StoredRow {
    id: u32,
    name: String,
    types: String,
    hp: u32,
    attack: u32,
    defense: u32,
    special_attack: u32,
    special_defense: u32,
    speed: u32,
    sprite_url: String,
    shiny_sprite_url: String,
    favorite: bool,
}

impl StoredRow {
    fn into_record(self) -> Result<PersistedRecord, StoreError> {
        let id = self.id;
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| StoreError::Corrupt(format!("record {}: {}", id, e)))
        };
        let types = if self.types.trim().is_empty() {
            Vec::new()
        } else {
            self.types
                .split(TYPE_SEPARATOR)
                .map(str::to_string)
                .collect()
        };
        Ok(PersistedRecord {
            id,
            sprite_url: parse(&self.sprite_url)?,
            shiny_sprite_url: parse(&self.shiny_sprite_url)?,
            name: self.name,
            types,
            hp: self.hp,
            attack: self.attack,
            defense: self.defense,
            special_attack: self.special_attack,
            special_defense: self.special_defense,
            speed: self.speed,
            favorite: self.favorite,
        })
    }
}

// ---------------------------------------------------------------------------
// Query execution
// ---------------------------------------------------------------------------

/// Execute SQL and return each row as a column-name map.
fn execute(
    conn: &DuckDbConnection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<HashMap<String, serde_json::Value>>, StoreError> {
    let mut stmt = conn.prepare(sql)?;

    let param_values: Vec<&dyn duckdb::ToSql> =
        params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

    let mut rows = stmt.query(param_values.as_slice())?;

    // Column metadata is only available once the query has run.
    let (column_names, column_count) = match rows.as_ref() {
        Some(stmt) => (
            stmt.column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect::<Vec<String>>(),
            stmt.column_count(),
        ),
        None => return Ok(Vec::new()),
    };

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = HashMap::with_capacity(column_count);
        for (i, name) in column_names.iter().enumerate().take(column_count) {
            map.insert(name.clone(), convert_value_ref(row.get_ref(i)?));
        }
        out.push(map);
    }
    Ok(out)
}

/// Execute SQL and deserialize each row into `T`.
fn execute_into<T: DeserializeOwned>(
    conn: &DuckDbConnection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<T>, StoreError> {
    let rows = execute(conn, sql, params)?;
    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        let value = serde_json::Value::Object(row.into_iter().collect());
        results.push(serde_json::from_value(value)?);
    }
    Ok(results)
}

/// Execute SQL and return the first column of the first row.
fn execute_scalar(
    conn: &DuckDbConnection,
    sql: &str,
    params: &[Value],
) -> Result<Option<serde_json::Value>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let param_values: Vec<&dyn duckdb::ToSql> =
        params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

    let mut rows = stmt.query(param_values.as_slice())?;
    match rows.next()? {
        Some(row) => Ok(Some(convert_value_ref(row.get_ref(0)?))),
        None => Ok(None),
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => match i64::try_from(n) {
            Ok(i) => serde_json::Value::Number(i.into()),
            Err(_) => serde_json::Value::String(n.to_string()),
        },
        ValueRef::UTinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::USmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UBigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        _ => serde_json::Value::Null,
    }
}
