//! SQLite dataset store.
//!
//! Holds the analyzed table in a single SQLite database. The pool is pinned
//! to one long-lived connection so that `:memory:` databases survive between
//! queries. Outside of [`SqliteStore::load_csv`] the connection is kept in
//! `query_only` mode, and every query runs in a transaction that is rolled
//! back, so nothing a query does reaches the stored data.

use crate::csv_loader::{self, Cell};
use quarry_core::error::StoreError;
use quarry_core::Table;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Connection, Row, SqlitePool, TypeInfo, ValueRef};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Column headers of a `describe` result.
pub const DESCRIBE_COLUMNS: [&str; 4] = ["Column Name", "Data Type", "Not Null", "Primary Key"];

/// A SQLite-backed store for one or more loaded datasets.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `":memory:"` for an ephemeral database.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        debug!("SQLite store opened at {path}");
        Ok(Self { pool })
    }

    /// Load a CSV file into `table`, replacing any previous contents.
    ///
    /// Returns the number of rows inserted.
    pub async fn load_csv(
        &self,
        path: &Path,
        table: &str,
        datetime_columns: &[String],
    ) -> Result<usize, StoreError> {
        let data = csv_loader::read_csv(path, datetime_columns)?;
        let table_ident = quote_ident(table);

        let column_defs: Vec<String> = data
            .headers
            .iter()
            .zip(&data.column_types)
            .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql_name()))
            .collect();
        let placeholders = vec!["?"; data.headers.len()].join(", ");
        let insert_sql = format!("INSERT INTO {table_ident} VALUES ({placeholders})");

        let mut conn = self.pool.acquire().await.map_err(acquire_error)?;
        set_query_only(&mut conn, false).await?;

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin: {e}")))?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {table_ident}"))
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("drop {table}: {e}")))?;

        sqlx::query(&format!(
            "CREATE TABLE {table_ident} ({})",
            column_defs.join(", ")
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Storage(format!("create {table}: {e}")))?;

        for row in &data.rows {
            let mut query = sqlx::query(&insert_sql);
            for cell in row {
                query = match cell {
                    Cell::Null => query.bind(None::<String>),
                    Cell::Integer(v) => query.bind(*v),
                    Cell::Real(v) => query.bind(*v),
                    Cell::Text(v) => query.bind(v.clone()),
                };
            }
            query
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Storage(format!("insert into {table}: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("commit: {e}")))?;
        set_query_only(&mut conn, true).await?;

        info!(
            table,
            rows = data.rows.len(),
            columns = data.headers.len(),
            "Loaded {}",
            path.display()
        );
        Ok(data.rows.len())
    }

    /// Run SQL against the dataset and collect the result set.
    ///
    /// Statements that write are rejected with [`StoreError::QueryFailed`];
    /// anything that slips past `query_only` is rolled back.
    pub async fn query(&self, sql: &str) -> Result<Table, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(acquire_error)?;
        set_query_only(&mut conn, true).await?;

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin: {e}")))?;
        let fetched = sqlx::query(sql).fetch_all(&mut *tx).await;
        if let Err(e) = tx.rollback().await {
            warn!("rollback after query: {e}");
        }
        let rows = fetched.map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let Some(first) = rows.first() else {
            return Ok(Table::default());
        };
        let columns = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut table = Table::new(columns, Vec::with_capacity(rows.len()));
        for row in &rows {
            table.rows.push(row_values(row)?);
        }
        debug!(rows = table.row_count(), "Query returned");
        Ok(table)
    }

    /// Column layout of `table` as a four-column table.
    ///
    /// An unknown table yields an empty result, not an error.
    pub async fn describe(&self, table: &str) -> Result<Table, StoreError> {
        let rows = sqlx::query(r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?1)"#)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let mut result = Table::new(
            DESCRIBE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            Vec::with_capacity(rows.len()),
        );
        for row in &rows {
            let name: String = row.try_get(0).map_err(decode_error)?;
            let data_type: String = row.try_get(1).map_err(decode_error)?;
            let not_null: i64 = row.try_get(2).map_err(decode_error)?;
            let pk: i64 = row.try_get(3).map_err(decode_error)?;
            result.rows.push(vec![
                Value::String(name),
                Value::String(data_type),
                Value::Bool(not_null != 0),
                Value::Bool(pk != 0),
            ]);
        }
        Ok(result)
    }

    /// Number of rows in `table`.
    pub async fn row_count(&self, table: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }

    /// Names of all user tables, sorted.
    pub async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }
}

fn row_values(row: &SqliteRow) -> Result<Vec<Value>, StoreError> {
    let mut values = Vec::with_capacity(row.len());
    for i in 0..row.len() {
        let raw = row.try_get_raw(i).map_err(decode_error)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let type_name = raw.type_info().name().to_string();
        let value = match type_name.as_str() {
            "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(i).map_err(decode_error)?),
            "REAL" | "NUMERIC" => {
                let v: f64 = row.try_get(i).map_err(decode_error)?;
                serde_json::Number::from_f64(v)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            "BLOB" => {
                let bytes: Vec<u8> = row.try_get(i).map_err(decode_error)?;
                Value::String(format!("<{} bytes>", bytes.len()))
            }
            _ => Value::String(row.try_get::<String, _>(i).map_err(decode_error)?),
        };
        values.push(value);
    }
    Ok(values)
}

async fn set_query_only(conn: &mut SqliteConnection, on: bool) -> Result<(), StoreError> {
    let pragma = if on {
        "PRAGMA query_only = ON"
    } else {
        "PRAGMA query_only = OFF"
    };
    sqlx::query(pragma)
        .execute(&mut *conn)
        .await
        .map(|_| ())
        .map_err(|e| StoreError::Storage(format!("{pragma}: {e}")))
}

fn acquire_error(e: sqlx::Error) -> StoreError {
    StoreError::Storage(format!("Failed to acquire SQLite connection: {e}"))
}

fn decode_error(e: sqlx::Error) -> StoreError {
    StoreError::QueryFailed(format!("decode: {e}"))
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
