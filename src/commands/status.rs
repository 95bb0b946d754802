use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.resolved_db_path();

    info!(source_dir = %args.source_dir.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let schema_version = query_metadata(&conn, "db_schema_version").unwrap_or_default();
    let updated_at = query_metadata(&conn, "db_updated_at").unwrap_or_default();
    let total = query_count(&conn, "SELECT COUNT(*) FROM audits").unwrap_or(0);
    let with_details =
        query_count(&conn, "SELECT COUNT(*) FROM audits WHERE details IS NOT NULL").unwrap_or(0);

    info!(
        path = %db_path.display(),
        schema_version = %schema_version,
        updated_at = %updated_at,
        records = total,
        records_with_details = with_details,
        "database status"
    );

    for (file_name, count) in per_file_counts(&conn)? {
        info!(file_name = %file_name, records = count, "stored records");
    }

    Ok(())
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

fn query_metadata(conn: &Connection, key: &str) -> Result<String> {
    let value = conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
        row.get(0)
    })?;
    Ok(value)
}

fn per_file_counts(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut statement = conn
        .prepare("SELECT file_name, COUNT(*) FROM audits GROUP BY file_name ORDER BY file_name")
        .context("failed to prepare per-file count query")?;

    let rows = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;

    Ok(rows)
}
