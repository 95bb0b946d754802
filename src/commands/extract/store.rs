use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::model::AuditRecord;
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

pub trait AuditStore {
    fn insert_batch(&mut self, records: &[AuditRecord]) -> Result<usize>;
}

pub struct SqliteAuditStore {
    connection: Connection,
    run_id: String,
}

impl SqliteAuditStore {
    pub fn open(db_path: &Path, run_id: &str) -> Result<Self> {
        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        configure_connection(&connection)?;
        Self::from_connection(connection, run_id)
    }

    pub fn from_connection(connection: Connection, run_id: &str) -> Result<Self> {
        ensure_schema(&connection)?;
        Ok(Self {
            connection,
            run_id: run_id.to_string(),
        })
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl AuditStore for SqliteAuditStore {
    fn insert_batch(&mut self, records: &[AuditRecord]) -> Result<usize> {
        let inserted_at = now_utc_string();
        let tx = self.connection.transaction()?;

        {
            let mut statement = tx.prepare(
                r#"
                INSERT INTO audits(
                  file_name, "type", "date", "user", full_name, client,
                  category, "action", details, archive, run_id, inserted_at
                )
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;

            for record in records {
                statement
                    .execute(params![
                        &record.file_name,
                        &record.record_type,
                        &record.date,
                        &record.user,
                        &record.full_name,
                        &record.client,
                        &record.category,
                        &record.action,
                        &record.details,
                        &record.archive,
                        &self.run_id,
                        &inserted_at,
                    ])
                    .with_context(|| format!("failed to insert audit row for {}", record.file_name))?;
            }
        }

        tx.commit().context("failed to commit audit batch")?;
        Ok(records.len())
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS audits (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              file_name TEXT NOT NULL,
              "type" TEXT,
              "date" TEXT,
              "user" TEXT,
              full_name TEXT,
              client TEXT,
              category TEXT,
              "action" TEXT,
              details TEXT,
              archive TEXT,
              run_id TEXT NOT NULL,
              inserted_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audits_file_name ON audits(file_name);
            CREATE INDEX IF NOT EXISTS idx_audits_run_id ON audits(run_id);
            "#,
        )
        .context("failed to initialize audit schema")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now_utc_string()],
    )?;

    Ok(())
}
