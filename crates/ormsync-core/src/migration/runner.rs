//! Migration script execution.

use super::error::MigrationError;
use crate::connection::Connection;

/// Longest statement prefix carried in an execution error.
const STATEMENT_PREVIEW: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    LineComment,
    BlockComment,
}

/// Split a script into statements on unquoted semicolons.
///
/// Quoted strings (single or double, with backslash escapes), backtick
/// identifiers and comments are scanned over, so semicolons inside them do
/// not terminate a statement. Statements that are empty or contain only
/// comments are dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    let mut state = ScanState::Normal;
    let mut escaped = false;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            ScanState::Normal => match c {
                ';' => {
                    if has_code {
                        statements.push(current.trim().to_string());
                    }
                    current.clear();
                    has_code = false;
                    continue;
                }
                '-' if chars.peek() == Some(&'-') => state = ScanState::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    current.push(c);
                    if let Some(star) = chars.next() {
                        current.push(star);
                    }
                    state = ScanState::BlockComment;
                    continue;
                }
                '\'' => state = ScanState::SingleQuoted,
                '"' => state = ScanState::DoubleQuoted,
                '`' => state = ScanState::Backticked,
                _ => {}
            },
            ScanState::SingleQuoted | ScanState::DoubleQuoted => {
                let quote = if state == ScanState::SingleQuoted { '\'' } else { '"' };
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == quote {
                    state = ScanState::Normal;
                }
            }
            ScanState::Backticked => {
                if c == '`' {
                    state = ScanState::Normal;
                }
            }
            ScanState::LineComment => {
                if c == '\n' {
                    state = ScanState::Normal;
                }
            }
            ScanState::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    current.push(c);
                    if let Some(slash) = chars.next() {
                        current.push(slash);
                    }
                    state = ScanState::Normal;
                    continue;
                }
            }
        }

        if !c.is_whitespace()
            && !matches!(state, ScanState::LineComment | ScanState::BlockComment)
        {
            has_code = true;
        }
        current.push(c);
    }

    if has_code {
        statements.push(current.trim().to_string());
    }
    statements
}

fn preview(statement: &str) -> String {
    let flat = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= STATEMENT_PREVIEW {
        return flat;
    }
    let mut cut: String = flat.chars().take(STATEMENT_PREVIEW).collect();
    cut.push_str("...");
    cut
}

/// Executes migration scripts statement by statement.
pub struct MigrationRunner<'c> {
    conn: &'c dyn Connection,
}

impl<'c> MigrationRunner<'c> {
    /// Create a runner over a connection.
    pub fn new(conn: &'c dyn Connection) -> Self {
        Self { conn }
    }

    /// Run a script, returning the number of statements executed.
    ///
    /// With `use_transaction`, the script is all-or-nothing: any failure
    /// rolls back every statement before the error is returned. Statements
    /// run in script order.
    pub fn run(&self, script: &str, use_transaction: bool) -> Result<usize, MigrationError> {
        let statements = split_statements(script);
        if statements.is_empty() {
            return Ok(0);
        }

        if use_transaction {
            self.conn
                .begin_transaction()
                .map_err(MigrationError::Transaction)?;
        }

        match self.execute_all(&statements) {
            Ok(()) => {
                if use_transaction {
                    if let Err(e) = self.conn.commit() {
                        self.rollback_quietly();
                        return Err(MigrationError::Transaction(e));
                    }
                }
                tracing::debug!(statements = statements.len(), "script applied");
                Ok(statements.len())
            }
            Err(e) => {
                if use_transaction {
                    self.rollback_quietly();
                }
                Err(e)
            }
        }
    }

    fn execute_all(&self, statements: &[String]) -> Result<(), MigrationError> {
        for (i, statement) in statements.iter().enumerate() {
            tracing::debug!(index = i + 1, statement = %preview(statement), "executing");
            self.conn
                .execute(statement, &[])
                .map_err(|source| MigrationError::Execution {
                    index: i + 1,
                    statement: preview(statement),
                    source,
                })?;
        }
        Ok(())
    }

    /// Roll back if a transaction is still open, keeping the original error.
    fn rollback_quietly(&self) {
        if !self.conn.in_transaction() {
            return;
        }
        if let Err(e) = self.conn.rollback() {
            tracing::error!(error = %e, "rollback failed");
        }
    }
}
