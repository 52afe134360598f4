use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{Connection, params_from_iter};
use tracing::{debug, error, info, warn};

use crate::db::value::{Row, SqlValue};
use crate::{BlogError, Result};

static TABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_]+\.)?[A-Za-z0-9_]+$").unwrap());
static FIELD_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Result of one executed statement.
#[derive(Debug)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub rows_affected: usize,
}

/// The sole component permitted to issue statements against the store.
///
/// Identifiers supplied by callers are validated against a strict
/// allow-pattern before they reach generated SQL; values are always bound
/// parameters. Driver errors are logged with the statement text on the
/// operator channel and surface as `BlogError::Query`.
#[derive(Debug)]
pub struct DatabaseGateway {
    conn: Mutex<Connection>,
    counter: AtomicU64,
    notify_address: Option<String>,
}

impl DatabaseGateway {
    /// Open the underlying connection. On failure the raw driver error is
    /// logged but never handed to the caller.
    pub fn open(path: &str, notify_address: Option<String>) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| {
            error!(error = %e, database = %path, "failed to open database");
            BlogError::Connection("could not open the database".to_string())
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )
        .map_err(|e| {
            error!(error = %e, "failed to set pragmas");
            BlogError::Connection("could not configure the database".to_string())
        })?;

        info!(database = %path, "database connection opened");

        Ok(DatabaseGateway {
            conn: Mutex::new(conn),
            counter: AtomicU64::new(0),
            notify_address,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:", None)
    }

    /// Execute a statement without bound parameters
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        self.execute(sql, &[])
    }

    /// Execute a statement with bound parameters
    pub fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
        self.execute_with_limit(sql, params, None)
    }

    /// Fetch the first row of a query, if any. Fetching stops after that
    /// row, so callers need not append their own LIMIT.
    pub fn get_row(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>> {
        Ok(self
            .execute_with_limit(sql, params, Some(1))?
            .rows
            .into_iter()
            .next())
    }

    /// Fetch all rows of a query
    pub fn get_rows(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        Ok(self.execute(sql, params)?.rows)
    }

    /// Insert one record. At least one field is required.
    pub fn insert(&self, table: &str, fields: &[(&str, SqlValue)]) -> Result<()> {
        if fields.is_empty() {
            return Err(self.reject(table, "no fields to insert"));
        }
        self.check_table(table)?;

        let mut names = Vec::with_capacity(fields.len());
        let mut placeholders = Vec::with_capacity(fields.len());
        let mut values = Vec::with_capacity(fields.len());
        for (field, value) in fields {
            self.check_field(field)?;
            names.push(quote_field(field));
            placeholders.push("?".to_string());
            values.push(value.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_table(table),
            names.join(", "),
            placeholders.join(", ")
        );
        self.execute(&sql, &values)?;
        Ok(())
    }

    /// Insert several records in one statement. Every record must match the
    /// column list exactly; a mismatched record rejects the whole call.
    pub fn insert_many(
        &self,
        table: &str,
        columns: &[&str],
        records: &[Vec<SqlValue>],
    ) -> Result<usize> {
        if columns.is_empty() || records.is_empty() {
            return Err(self.reject(table, "no columns or records to insert"));
        }
        self.check_table(table)?;

        let mut names = Vec::with_capacity(columns.len());
        for column in columns {
            self.check_field(column)?;
            names.push(quote_field(column));
        }

        let row_placeholder = format!("({})", vec!["?"; columns.len()].join(", "));
        let mut values = Vec::with_capacity(columns.len() * records.len());
        for record in records {
            if record.len() != columns.len() {
                return Err(self.reject(
                    table,
                    &format!(
                        "record has {} values, expected {}",
                        record.len(),
                        columns.len()
                    ),
                ));
            }
            values.extend(record.iter().cloned());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_table(table),
            names.join(", "),
            vec![row_placeholder; records.len()].join(", ")
        );
        self.execute(&sql, &values)?;
        Ok(records.len())
    }

    /// Update matching records, returning the affected row count. At least
    /// one field is required; an empty condition list updates every row.
    pub fn update(
        &self,
        table: &str,
        fields: &[(&str, SqlValue)],
        conditions: &[(&str, SqlValue)],
    ) -> Result<usize> {
        if fields.is_empty() {
            return Err(self.reject(table, "no fields to update"));
        }
        self.check_table(table)?;

        let mut assignments = Vec::with_capacity(fields.len());
        let mut values = Vec::with_capacity(fields.len() + conditions.len());
        for (field, value) in fields {
            self.check_field(field)?;
            assignments.push(format!("{} = ?", quote_field(field)));
            values.push(value.clone());
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_table(table),
            assignments.join(", ")
        );
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.build_where(conditions, &mut values)?);
        }

        Ok(self.execute(&sql, &values)?.rows_affected)
    }

    /// Delete matching records. An explicit condition list is mandatory:
    /// there is no implicit delete-all.
    pub fn delete(&self, table: &str, conditions: &[(&str, SqlValue)]) -> Result<usize> {
        if conditions.is_empty() {
            return Err(self.reject(table, "no conditions given for delete"));
        }
        self.check_table(table)?;

        let mut values = Vec::with_capacity(conditions.len());
        let where_clause = self.build_where(conditions, &mut values)?;
        let sql = format!("DELETE FROM {} WHERE {}", quote_table(table), where_clause);

        Ok(self.execute(&sql, &values)?.rows_affected)
    }

    /// Check whether a table exists. Failures count as absent.
    pub fn table_exists(&self, table: &str) -> bool {
        if !valid_table_name(table) {
            return false;
        }
        // The schema prefix is not part of the stored name
        let bare = table.rsplit('.').next().unwrap_or(table);
        self.get_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[SqlValue::from(bare)],
        )
        .map(|row| row.is_some())
        .unwrap_or(false)
    }

    /// Check whether any record matches the conditions. Failures count as
    /// no match.
    pub fn exists(&self, table: &str, conditions: &[(&str, SqlValue)]) -> bool {
        if conditions.is_empty() || !valid_table_name(table) {
            return false;
        }

        let mut values = Vec::with_capacity(conditions.len());
        let where_clause = match self.build_where(conditions, &mut values) {
            Ok(clause) => clause,
            Err(_) => return false,
        };
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} LIMIT 1",
            quote_table(table),
            where_clause
        );

        self.get_row(&sql, &values)
            .map(|row| row.is_some())
            .unwrap_or(false)
    }

    /// Rowid of the most recent successful insert on this connection
    pub fn last_insert_id(&self) -> i64 {
        self.conn.lock().last_insert_rowid()
    }

    /// Rows changed by the most recent statement
    pub fn affected_row_count(&self) -> usize {
        self.conn.lock().changes() as usize
    }

    /// Clear the given tables, returning how many were cleared.
    /// SQLite has no TRUNCATE; DELETE without conditions is the equivalent.
    pub fn truncate(&self, tables: &[&str]) -> Result<usize> {
        let mut cleared = 0;
        for table in tables {
            self.check_table(table)?;
            self.execute(&format!("DELETE FROM {}", quote_table(table)), &[])?;
            cleared += 1;
        }
        Ok(cleared)
    }

    /// Total statements executed, diagnostics only
    pub fn total_queries(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    fn execute_with_limit(
        &self,
        sql: &str,
        params: &[SqlValue],
        limit: Option<usize>,
    ) -> Result<QueryResult> {
        self.counter.fetch_add(1, Ordering::Relaxed);
        let conn = self.conn.lock();
        run_statement(&conn, sql, params, limit).map_err(|e| self.fail(sql, e))
    }

    fn build_where(
        &self,
        conditions: &[(&str, SqlValue)],
        values: &mut Vec<SqlValue>,
    ) -> Result<String> {
        let mut clauses = Vec::with_capacity(conditions.len());
        for (field, value) in conditions {
            self.check_field(field)?;
            clauses.push(format!("{} = ?", quote_field(field)));
            values.push(value.clone());
        }
        Ok(clauses.join(" AND "))
    }

    fn check_table(&self, table: &str) -> Result<()> {
        if valid_table_name(table) {
            Ok(())
        } else {
            Err(self.reject(table, "invalid table name"))
        }
    }

    fn check_field(&self, field: &str) -> Result<()> {
        if valid_field_name(field) {
            Ok(())
        } else {
            Err(self.reject(field, "invalid field name"))
        }
    }

    fn reject(&self, subject: &str, message: &str) -> BlogError {
        debug!(subject = %subject, "{message}");
        BlogError::Query {
            statement: subject.to_string(),
            message: message.to_string(),
        }
    }

    /// Operator-channel logging for driver errors. The statement text never
    /// reaches the end-user response from here.
    fn fail(&self, statement: &str, err: rusqlite::Error) -> BlogError {
        error!(statement = %statement, error = %err, "database query failed");
        if let Some(address) = &self.notify_address {
            warn!(notify = %address, "database failure flagged for operator");
        }
        BlogError::Query {
            statement: statement.to_string(),
            message: err.to_string(),
        }
    }
}

fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
    limit: Option<usize>,
) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let column_count = stmt.column_count();

    if column_count == 0 {
        let rows_affected = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected,
        });
    }

    let mut columns = Vec::with_capacity(column_count);
    for i in 0..column_count {
        columns.push(stmt.column_name(i)?.to_string());
    }

    let mut raw_rows = stmt.query(params_from_iter(params.iter()))?;
    let mut rows = Vec::new();
    while let Some(raw) = raw_rows.next()? {
        let mut values = std::collections::HashMap::with_capacity(column_count);
        for (i, name) in columns.iter().enumerate() {
            values.insert(name.clone(), SqlValue::from_value_ref(raw.get_ref(i)?));
        }
        rows.push(Row::new(values));
        if limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
    }

    let rows_affected = rows.len();
    Ok(QueryResult {
        columns,
        rows,
        rows_affected,
    })
}

fn valid_table_name(table: &str) -> bool {
    TABLE_NAME_RE.is_match(table)
}

fn valid_field_name(field: &str) -> bool {
    FIELD_NAME_RE.is_match(field)
}

fn quote_table(table: &str) -> String {
    match table.split_once('.') {
        Some((schema, name)) => format!("\"{schema}\".\"{name}\""),
        None => format!("\"{table}\""),
    }
}

fn quote_field(field: &str) -> String {
    format!("\"{field}\"")
}
