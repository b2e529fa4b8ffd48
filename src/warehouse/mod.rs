use crate::config::WarehouseConfig;
use crate::errors::{ReportError, ReportResult};
use crate::models::{coerce_crawl_date, crawl_date_from_unix};
use chrono::NaiveDate;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Params, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// DDL of the reporting tables this layer reads. The warehouse itself is
/// populated by the ETL; the DDL is shipped for fixtures and local setups.
pub const REPORT_SCHEMA_SQL: &str = include_str!("schema.sql");

/// SQL name of the marker normalizer registered on every session. It maps a
/// marker value to `YYYY-MM-DD` text through [`crawl_date_from_value`], or
/// NULL when the value is not a recognisable date.
pub const CRAWL_DAY_FN: &str = "crawl_day";

/// One read-only warehouse session, scoped to a single dashboard render.
#[derive(Debug)]
pub struct Warehouse {
    conn: Option<Connection>,
    db_path: PathBuf,
    session_id: String,
}

impl Warehouse {
    pub fn open(config: &WarehouseConfig) -> ReportResult<Self> {
        let db_path = config.path.clone();
        if !db_path.exists() {
            return Err(ReportError::Connection(format!(
                "warehouse not found at {}",
                db_path.display()
            )));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)
            .map_err(|err| ReportError::Connection(err.to_string()))?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|err| ReportError::Connection(err.to_string()))?;
        // A non-database file opens fine and only fails on first read.
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|err| ReportError::Connection(err.to_string()))?;
        register_crawl_day(&conn).map_err(|err| ReportError::Connection(err.to_string()))?;

        let warehouse = Self {
            conn: Some(conn),
            db_path,
            session_id: Uuid::new_v4().to_string(),
        };
        tracing::info!(
            session_id = %warehouse.session_id,
            path = %warehouse.db_path.display(),
            "connected to the warehouse"
        );
        Ok(warehouse)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Releases the connection. Later calls are no-ops.
    pub fn close(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match conn.close() {
            Ok(()) => tracing::info!(session_id = %self.session_id, "warehouse connection closed"),
            Err((_, error)) => tracing::warn!(
                session_id = %self.session_id,
                error = %error,
                "warehouse connection closed with error"
            ),
        }
    }

    fn connection(&self) -> ReportResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| ReportError::Connection("warehouse session already closed".to_string()))
    }

    pub fn query_rows<T, P, F>(&self, sql: &str, params: P, mut map: F) -> ReportResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| map(row))?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    /// Newest crawl date recorded in the openings metrics table, or `None`
    /// when no crawl has completed. Never fails; errors are logged.
    pub fn latest_crawl_date(&self) -> Option<NaiveDate> {
        match self.try_latest_crawl_date() {
            Ok(Some(date)) => Some(date),
            Ok(None) => {
                tracing::info!(session_id = %self.session_id, "no crawl dates found");
                None
            }
            Err(error) => {
                tracing::error!(
                    session_id = %self.session_id,
                    error = %error,
                    "failed to fetch the newest crawl date"
                );
                None
            }
        }
    }

    fn try_latest_crawl_date(&self) -> ReportResult<Option<NaiveDate>> {
        let conn = self.connection()?;
        let newest: Option<Option<String>> = conn
            .query_row(
                "SELECT MAX(crawl_day(crawl_date)) FROM rpt_job_openings_metrics",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match newest.flatten() {
            None => Ok(None),
            Some(day) => coerce_crawl_date(&day).map(Some).ok_or_else(|| {
                ReportError::Internal(format!("crawl_day produced an unreadable date '{}'", day))
            }),
        }
    }

    /// Names of the reporting tables present in the warehouse.
    pub fn list_report_tables(&self) -> Vec<String> {
        let result = self.query_rows(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name LIKE 'rpt\\_%' ESCAPE '\\' \
             ORDER BY name",
            [],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(tables) => {
                tracing::info!(count = tables.len(), "fetched report table names");
                tables
            }
            Err(error) => {
                tracing::error!(error = %error, "failed to list report tables");
                Vec::new()
            }
        }
    }
}

impl Drop for Warehouse {
    fn drop(&mut self) {
        self.close();
    }
}

/// Calendar date of a raw marker value: ISO text, timestamps, RFC 3339
/// (local date of the offset), or unix seconds as integer, real, or digit text.
pub fn crawl_date_from_value(value: ValueRef<'_>) -> Option<NaiveDate> {
    match value {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(coerce_crawl_date),
        ValueRef::Integer(seconds) => crawl_date_from_unix(seconds),
        ValueRef::Real(seconds) => crawl_date_from_unix(seconds as i64),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

/// Reads a marker column, accepting every form [`crawl_date_from_value`] does.
pub fn crawl_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let value = row.get_ref(idx)?;
    crawl_date_from_value(value).ok_or_else(|| {
        let raw = match value {
            ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            ValueRef::Integer(seconds) => seconds.to_string(),
            ValueRef::Real(seconds) => seconds.to_string(),
            ValueRef::Null => "NULL".to_string(),
            ValueRef::Blob(_) => "<blob>".to_string(),
        };
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            value.data_type(),
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unrecognised crawl date '{}'", raw),
            )),
        )
    })
}

fn register_crawl_day(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        CRAWL_DAY_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let day = crawl_date_from_value(ctx.get_raw(0));
            Ok(day.map(|date| date.format("%Y-%m-%d").to_string()))
        },
    )
}
