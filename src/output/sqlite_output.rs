//! SQLite keyed-store export
//!
//! Records accumulate in one database per calendar day
//! (`<dir>/<base>_<YYYYMMDD>.db`) and one table per base name. Every column is
//! `TEXT`. The table is created from the union of keys in the first batch and
//! grows a new column whenever a later batch brings a new key; existing
//! columns are never dropped or renamed. Rows are insert-or-replace keyed by
//! the record's full serialized field set, so only exact duplicates collapse.

use crate::output::record::value_to_text;
use crate::output::traits::{ExportTarget, OutputResult, RecordWriter};
use crate::output::ExportRecord;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Hidden primary key column holding [`ExportRecord::row_key`]
pub const ROW_KEY_COLUMN: &str = "_row_key";

/// Writes batches into the day-grouped SQLite store
#[derive(Debug, Clone)]
pub struct SqliteStoreWriter {
    dir: PathBuf,
}

impl SqliteStoreWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the store for `base_name` on `day`
    pub fn store_path(&self, base_name: &str, day: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.db", base_name, day))
    }
}

impl RecordWriter for SqliteStoreWriter {
    fn format(&self) -> &'static str {
        "sqlite"
    }

    fn write(&self, records: &[ExportRecord], target: &ExportTarget) -> OutputResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.store_path(&target.base_name, &target.day);

        let mut conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;

        if records.is_empty() {
            tracing::warn!("No results to export in SQLite, {} left unchanged", path.display());
            return Ok(path);
        }

        let table = table_name(&target.base_name);
        let rows = write_table(&mut conn, &table, records)?;

        tracing::info!(
            "SQLite export -> {} (table: {}, rows: {})",
            path.display(),
            table,
            rows
        );
        Ok(path)
    }
}

/// Makes an arbitrary base name usable as a table name
fn table_name(base_name: &str) -> String {
    let cleaned: String = base_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() || cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("t_{}", cleaned)
    } else {
        cleaned
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Union of record keys in first-seen order
///
/// SQLite column names are case-insensitive, so keys differing only by case
/// share a column.
fn union_columns(records: &[ExportRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for record in records {
        for key in record.keys() {
            if key.eq_ignore_ascii_case(ROW_KEY_COLUMN) {
                continue;
            }
            if seen.insert(key.to_lowercase()) {
                columns.push(key.clone());
            }
        }
    }

    columns
}

fn existing_columns(conn: &Connection, table: &str) -> rusqlite::Result<Option<HashSet<String>>> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND lower(name) = lower(?1)",
            [table],
            |row| row.get(0),
        )
        .optional()?;

    if exists.is_none() {
        return Ok(None);
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(names.into_iter().map(|n| n.to_lowercase()).collect()))
}

/// Creates the table or adds missing columns so it covers `columns`
fn ensure_table(conn: &Connection, table: &str, columns: &[String]) -> rusqlite::Result<()> {
    match existing_columns(conn, table)? {
        None => {
            let mut defs = vec![format!("{} TEXT PRIMARY KEY", quote_ident(ROW_KEY_COLUMN))];
            defs.extend(
                columns
                    .iter()
                    .map(|c| format!("{} TEXT DEFAULT ''", quote_ident(c))),
            );
            conn.execute(
                &format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", ")),
                [],
            )?;
            tracing::debug!("Created table {} with {} columns", table, columns.len());
        }
        Some(existing) => {
            for column in columns {
                if existing.contains(&column.to_lowercase()) {
                    continue;
                }
                conn.execute(
                    &format!(
                        "ALTER TABLE {} ADD COLUMN {} TEXT DEFAULT ''",
                        quote_ident(table),
                        quote_ident(column)
                    ),
                    [],
                )?;
                tracing::info!("Added column {} to table {}", column, table);
            }
        }
    }

    Ok(())
}

/// Writes a batch into `table`, evolving the schema as needed
///
/// Returns the number of rows written.
pub fn write_table(
    conn: &mut Connection,
    table: &str,
    records: &[ExportRecord],
) -> rusqlite::Result<usize> {
    let columns = union_columns(records);
    ensure_table(conn, table, &columns)?;

    let mut names = vec![quote_ident(ROW_KEY_COLUMN)];
    names.extend(columns.iter().map(|c| quote_ident(c)));
    let placeholders = vec!["?"; names.len()].join(", ");
    let sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders
    );

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&sql)?;
        for record in records {
            let mut values = Vec::with_capacity(columns.len() + 1);
            values.push(record.row_key());
            for column in &columns {
                let value = record
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(column))
                    .map(|(_, value)| value_to_text(value))
                    .unwrap_or_default();
                values.push(value);
            }
            stmt.execute(params_from_iter(values.iter()))?;
        }
    }
    tx.commit()?;

    Ok(records.len())
}

/// Reads every row of `table` as `(column, value)` pairs, hidden key excluded
///
/// Columns are in table order and rows in insertion order.
pub fn read_table(path: &Path, table: &str) -> OutputResult<Vec<Vec<(String, String)>>> {
    let conn = Connection::open(path)?;
    let table = table_name(table);

    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM {} ORDER BY rowid",
        quote_ident(&table)
    ))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let rows = stmt
        .query_map([], |row| {
            let mut pairs = Vec::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                if column == ROW_KEY_COLUMN {
                    continue;
                }
                let value: Option<String> = row.get(index)?;
                pairs.push((column.clone(), value.unwrap_or_default()));
            }
            Ok(pairs)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}
