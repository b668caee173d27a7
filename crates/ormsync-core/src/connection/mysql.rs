//! MySQL connection backed by sqlx.
//!
//! sqlx is async; this connection owns a current-thread runtime and blocks on
//! every call so the migration engine stays synchronous.

use super::{Connection, Driver, Row, Value};
use crate::error::Error;
use parking_lot::Mutex;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection as _, MySql, Row as _, TypeInfo, ValueRef as _};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Runtime;

/// A MySQL / MariaDB database connection.
pub struct MySqlConnection {
    conn: Mutex<sqlx::MySqlConnection>,
    rt: Runtime,
    in_transaction: AtomicBool,
}

impl MySqlConnection {
    /// Connect to a `mysql://` URL.
    pub fn connect(url: &str) -> Result<Self, Error> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let conn = rt.block_on(sqlx::MySqlConnection::connect(url))?;

        Ok(Self {
            conn: Mutex::new(conn),
            rt,
            in_transaction: AtomicBool::new(false),
        })
    }

    fn run_raw(&self, sql: &str) -> Result<u64, Error> {
        let mut conn = self.conn.lock();
        let result = self
            .rt
            .block_on(sqlx::raw_sql(sql).execute(&mut *conn))?;
        Ok(result.rows_affected())
    }
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Value],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Integer(v) => query.bind(*v),
            Value::Real(v) => query.bind(*v),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Blob(b) => query.bind(b.as_slice()),
        };
    }
    query
}

fn decode_row(row: &MySqlRow) -> Result<Row, Error> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());

        if row.try_get_raw(idx)?.is_null() {
            values.push(Value::Null);
            continue;
        }

        let type_name = column.type_info().name().to_ascii_uppercase();
        let value = if type_name.contains("UNSIGNED") {
            Value::Integer(row.try_get::<u64, _>(idx)? as i64)
        } else if matches!(
            type_name.as_str(),
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT"
        ) {
            Value::Integer(row.try_get::<i64, _>(idx)?)
        } else if matches!(type_name.as_str(), "FLOAT" | "DOUBLE") {
            Value::Real(row.try_get::<f64, _>(idx)?)
        } else if let Ok(text) = row.try_get::<String, _>(idx) {
            Value::Text(text)
        } else {
            let bytes: Vec<u8> = row.try_get(idx)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        };
        values.push(value);
    }

    Ok(Row::new(columns, values))
}

impl Connection for MySqlConnection {
    fn driver(&self) -> Driver {
        Driver::MySql
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        if params.is_empty() {
            return self.run_raw(sql);
        }
        let mut conn = self.conn.lock();
        let query = bind_all(sqlx::query(sql), params);
        let result = self.rt.block_on(query.execute(&mut *conn))?;
        Ok(result.rows_affected())
    }

    fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        let mut conn = self.conn.lock();
        let query = bind_all(sqlx::query(sql), params);
        let rows = self.rt.block_on(query.fetch_all(&mut *conn))?;
        rows.iter().map(decode_row).collect()
    }

    fn begin_transaction(&self) -> Result<(), Error> {
        self.run_raw("START TRANSACTION")?;
        self.in_transaction.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self) -> Result<(), Error> {
        if !self.in_transaction() {
            return Err(Error::NoTransaction);
        }
        self.run_raw("COMMIT")?;
        self.in_transaction.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self) -> Result<(), Error> {
        if !self.in_transaction() {
            return Err(Error::NoTransaction);
        }
        self.in_transaction.store(false, Ordering::SeqCst);
        self.run_raw("ROLLBACK")?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }

    fn quote_literal(&self, value: &str) -> Option<String> {
        self.fetch_one("SELECT QUOTE(?) AS quoted", &[Value::from(value)])
            .ok()
            .flatten()
            .and_then(|row| row.text("quoted"))
    }
}
