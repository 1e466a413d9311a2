//! MySQL backend
//!
//! Schema introspection via `SHOW TABLES` / `SHOW COLUMNS`, and execution of
//! the model's raw SQL text over the text protocol so that any statement the
//! server accepts can run.

use crate::database::connection::{DatabaseBackend, QueryBackend};
use crate::database::query::{Record, ResultSet, StructuredQuery};
use crate::database::schema::SchemaMap;
use crate::error::{QueryForgeError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;

/// MySQL backend over a bounded connection pool
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Create a backend whose pool connects on first use
    ///
    /// Connection problems surface as `Connectivity` errors on the request
    /// that first needs the database, not at startup.
    pub fn connect_lazy(options: MySqlConnectOptions, max_connections: u32) -> Self {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy_with(options);
        Self { pool }
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::raw_sql("SHOW TABLES")
            .fetch_all(&self.pool)
            .await
            .map_err(connectivity)?;

        rows.iter().map(|row| text_column(row, 0)).collect()
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let sql = format!("SHOW COLUMNS FROM {}", quote_identifier(table));
        let rows = sqlx::raw_sql(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(connectivity)?;

        rows.iter()
            .map(|row| {
                let idx = row
                    .columns()
                    .iter()
                    .position(|c| c.name().eq_ignore_ascii_case("Field"))
                    .unwrap_or(0);
                text_column(row, idx)
            })
            .collect()
    }
}

#[async_trait]
impl QueryBackend for MySqlBackend {
    fn kind(&self) -> DatabaseBackend {
        DatabaseBackend::MySQL
    }

    async fn introspect(&self) -> Result<SchemaMap> {
        let mut schema = SchemaMap::new();
        for table in self.list_tables().await? {
            let columns = self.list_columns(&table).await?;
            schema.insert(table, columns);
        }
        debug!(tables = schema.len(), "introspected MySQL schema");
        Ok(schema)
    }

    async fn execute(&self, query: &StructuredQuery) -> Result<ResultSet> {
        let StructuredQuery::Sql(sql) = query else {
            return Err(QueryForgeError::Execution(
                "MySQL backend can only run SQL text".to_string(),
            ));
        };

        let rows = sqlx::raw_sql(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::raw_sql("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(connectivity)?;
        Ok(())
    }
}

/// Quote a table name with backticks, doubling embedded backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn connectivity(err: sqlx::Error) -> QueryForgeError {
    QueryForgeError::connectivity("MySQL", err)
}

/// Split driver errors into "could not reach the server" and "server said no"
fn classify(err: sqlx::Error) -> QueryForgeError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => connectivity(err),
        other => QueryForgeError::Execution(other.to_string()),
    }
}

/// Metadata columns can come back as VARBINARY depending on server version
fn text_column(row: &MySqlRow, idx: usize) -> Result<String> {
    let bytes: Vec<u8> = row
        .try_get_unchecked(idx)
        .map_err(|e| QueryForgeError::connectivity("MySQL", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Convert a row to a record keyed by column name, in column order
pub fn row_to_record(row: &MySqlRow) -> Record {
    row.columns()
        .iter()
        .map(|column| {
            let idx = column.ordinal();
            let value = decode_column(row, idx, column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Value {
    let decoded = match type_name {
        "NULL" => Ok(Value::Null),
        "BOOLEAN" => row.try_get_unchecked::<Option<bool>, _>(idx).map(to_json),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get_unchecked::<Option<i64>, _>(idx).map(to_json)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get_unchecked::<Option<u64>, _>(idx).map(to_json),
        "FLOAT" => row.try_get_unchecked::<Option<f32>, _>(idx).map(to_json),
        "DOUBLE" => row.try_get_unchecked::<Option<f64>, _>(idx).map(to_json),
        "DATE" => row
            .try_get_unchecked::<Option<chrono::NaiveDate>, _>(idx)
            .map(|v| to_json(v.map(|d| d.to_string()))),
        "DATETIME" | "TIMESTAMP" => row
            .try_get_unchecked::<Option<chrono::NaiveDateTime>, _>(idx)
            .map(|v| to_json(v.map(|d| d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))),
        "TIME" => row
            .try_get_unchecked::<Option<chrono::NaiveTime>, _>(idx)
            .map(|v| to_json(v.map(|t| t.to_string()))),
        "JSON" => row
            .try_get_unchecked::<Option<Value>, _>(idx)
            .map(|v| v.unwrap_or(Value::Null)),
        _ => Err(sqlx::Error::ColumnNotFound(String::new())),
    };

    // DECIMAL, text, enums, binary and anything the typed decode above could not handle
    decoded.unwrap_or_else(|_| raw_column(row, idx))
}

fn raw_column(row: &MySqlRow, idx: usize) -> Value {
    match row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => Value::String(text),
            Err(e) => Value::String(
                base64::engine::general_purpose::STANDARD.encode(e.into_bytes()),
            ),
        },
        Ok(None) | Err(_) => Value::Null,
    }
}

fn to_json<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}
