//! Table export: JSON rows to CSV, and CSV files to a zip archive.

use std::io::{Cursor, Write};

use serde_json::Value;
use sqlx::PgPool;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::BackupError;

/// Tables dumped by the database backup, in dependency order. Session
/// tokens are never exported.
pub const BACKUP_TABLES: &[&str] = &[
    "roles",
    "users",
    "affiliate_profiles",
    "customer_groups",
    "cruise_products",
    "landing_pages",
    "affiliate_leads",
    "orders",
    "payments",
    "affiliate_sales",
    "funnel_messages",
    "funnel_message_stages",
    "scheduled_messages",
    "scheduled_message_stages",
    "message_logs",
    "passport_submissions",
    "passport_guests",
    "backup_runs",
];

/// Header plus string cells, ready for CSV or a spreadsheet append.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub records: Vec<Vec<String>>,
}

/// Fetch every row of an allow-listed table as JSON objects.
pub async fn fetch_table(pool: &PgPool, table: &str) -> Result<Vec<Value>, BackupError> {
    if !BACKUP_TABLES.contains(&table) {
        return Err(BackupError::InvalidName(table.to_string()));
    }
    let query = format!(
        "SELECT COALESCE(json_agg(t ORDER BY t.id), '[]'::json) FROM (SELECT * FROM {table}) t"
    );
    let rows: Value = sqlx::query_scalar(&query).fetch_one(pool).await?;
    Ok(match rows {
        Value::Array(rows) => rows,
        other => vec![other],
    })
}

/// Render one JSON value as a cell: `null` is empty, strings are unquoted,
/// nested values are compact JSON.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Flatten JSON rows into a table. The header is the union of object keys
/// in first-seen order; rows that are not objects land in a `value` column.
pub fn tabulate(rows: &[Value]) -> Table {
    let mut header: Vec<String> = Vec::new();
    for row in rows {
        match row {
            Value::Object(map) => {
                for key in map.keys() {
                    if !header.iter().any(|h| h == key) {
                        header.push(key.clone());
                    }
                }
            }
            _ => {
                if !header.iter().any(|h| h == "value") {
                    header.push("value".to_string());
                }
            }
        }
    }

    let records = rows
        .iter()
        .map(|row| {
            header
                .iter()
                .map(|key| match row {
                    Value::Object(map) => map.get(key).map(cell).unwrap_or_default(),
                    other if key == "value" => cell(other),
                    _ => String::new(),
                })
                .collect()
        })
        .collect();

    Table { header, records }
}

/// Write a table as CSV bytes. `with_header = false` writes only records,
/// for appending to an existing file.
pub fn table_to_csv(table: &Table, with_header: bool) -> Result<Vec<u8>, BackupError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if with_header {
        writer.write_record(&table.header)?;
    }
    for record in &table.records {
        writer.write_record(record)?;
    }
    writer.into_inner().map_err(|e| BackupError::Io(e.into_error()))
}

/// CSV bytes for a set of JSON rows, header included.
pub fn rows_to_csv(rows: &[Value]) -> Result<Vec<u8>, BackupError> {
    table_to_csv(&tabulate(rows), true)
}

/// Bundle named files into an in-memory zip archive.
pub fn zip_files(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, BackupError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file(name.as_str(), SimpleFileOptions::default())?;
        zip.write_all(data)?;
    }
    Ok(zip.finish()?.into_inner())
}
