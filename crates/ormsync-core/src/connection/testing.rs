//! Scripted connection for unit tests.

use super::{Connection, Driver, Row, Value};
use crate::error::Error;
use parking_lot::Mutex;

type Responder = Box<dyn Fn(&[Value]) -> Result<Vec<Row>, Error> + Send>;

/// A connection answering queries from registered responders.
///
/// Each responder is keyed by a SQL fragment; the first registered fragment
/// contained in the query text answers it. Unmatched queries return no rows.
/// Executed statements are recorded in order.
pub(crate) struct ScriptedConnection {
    driver: Driver,
    responders: Vec<(String, Responder)>,
    executed: Mutex<Vec<String>>,
    fail_on: Option<String>,
    in_tx: Mutex<bool>,
}

impl ScriptedConnection {
    pub(crate) fn new(driver: Driver) -> Self {
        Self {
            driver,
            responders: Vec::new(),
            executed: Mutex::new(Vec::new()),
            fail_on: None,
            in_tx: Mutex::new(false),
        }
    }

    pub(crate) fn respond<F>(mut self, fragment: &str, responder: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Row>, Error> + Send + 'static,
    {
        self.responders
            .push((fragment.to_string(), Box::new(responder)));
        self
    }

    /// Fail any executed statement containing the fragment.
    pub(crate) fn fail_on(mut self, fragment: &str) -> Self {
        self.fail_on = Some(fragment.to_string());
        self
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl Connection for ScriptedConnection {
    fn driver(&self) -> Driver {
        self.driver
    }

    fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64, Error> {
        if let Some(fragment) = &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(Error::Database(format!("syntax error near '{}'", fragment)));
            }
        }
        self.executed.lock().push(sql.to_string());
        Ok(0)
    }

    fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        for (fragment, responder) in &self.responders {
            if sql.contains(fragment.as_str()) {
                return responder(params);
            }
        }
        Ok(Vec::new())
    }

    fn begin_transaction(&self) -> Result<(), Error> {
        self.executed.lock().push("BEGIN".to_string());
        *self.in_tx.lock() = true;
        Ok(())
    }

    fn commit(&self) -> Result<(), Error> {
        let mut in_tx = self.in_tx.lock();
        if !*in_tx {
            return Err(Error::NoTransaction);
        }
        *in_tx = false;
        self.executed.lock().push("COMMIT".to_string());
        Ok(())
    }

    fn rollback(&self) -> Result<(), Error> {
        let mut in_tx = self.in_tx.lock();
        if !*in_tx {
            return Err(Error::NoTransaction);
        }
        *in_tx = false;
        self.executed.lock().push("ROLLBACK".to_string());
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        *self.in_tx.lock()
    }
}
