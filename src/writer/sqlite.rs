use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::Writer;
use crate::keygen::{KeyGenerator, KeyValue};
use crate::row::RowGenerator;
use crate::schema::{SchemaBuilder, SqlDialect, TableSchema, TABLE_NAME};

/// Storage page size applied during `init_db`: one page = 16 KiB.
const PAGE_SIZE: u32 = 16384;

/// Page cache budget. A negative `cache_size` is interpreted as KiB,
/// so this is a 10 MiB cache.
const CACHE_SIZE_KIB: i64 = 10240;

/// Writer for the embedded single-file engine.
///
/// The backing file is exclusively owned by this writer and deleted on
/// `close`, so no two runs may target the same path concurrently.
pub struct SqliteWriter {
    path: PathBuf,
    rows: RowGenerator,
    schema: TableSchema,
    conn: Option<Connection>,
}

impl SqliteWriter {
    pub fn new(key_gen: Box<dyn KeyGenerator>, path: impl Into<PathBuf>, clustered: bool) -> Self {
        let rows = RowGenerator::new(key_gen);
        let schema = SchemaBuilder::new(SqlDialect::Sqlite)
            .clustered(clustered)
            .build(rows.key_type());
        Self {
            path: path.into(),
            rows,
            schema,
            conn: None,
        }
    }

    fn conn(&mut self) -> Result<&Connection> {
        if self.conn.is_none() {
            let conn = Connection::open(&self.path)
                .with_context(|| format!("failed to open {}", self.path.display()))?;
            conn.execute_batch(&format!("PRAGMA cache_size = -{CACHE_SIZE_KIB};"))?;
            self.conn = Some(conn);
        }
        Ok(self.conn.as_ref().unwrap())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, err)| err)
                .context("failed to close sqlite connection")?;
        }
        Ok(())
    }
}

impl Writer for SqliteWriter {
    fn init_db(&mut self) -> Result<()> {
        let schema = self.schema.clone();
        let conn = self.conn()?;
        conn.execute(schema.drop_sql(), [])
            .context("failed to drop benchmark table")?;
        conn.execute(schema.create_sql(), [])
            .context("failed to create benchmark table")?;

        // The page size cannot change while a journal is active, and the
        // file only adopts it after a full rebuild. Reconnect, rebuild,
        // then restore WAL for the batch writes.
        self.disconnect()?;
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA journal_mode = OFF;")?;
        conn.execute_batch(&format!("PRAGMA page_size = {PAGE_SIZE};"))?;
        conn.execute_batch("VACUUM;")?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Ok(())
    }

    fn write_batch(&mut self, batch_size: usize) -> Result<()> {
        let batch = self.rows.generate_batch(batch_size)?;
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO signals (id, time_created, data) VALUES (?1, ?2, ?3)",
            )?;
            for row in &batch {
                match &row.id {
                    KeyValue::Int(id) => {
                        stmt.execute(rusqlite::params![id, row.time_created, row.data])?
                    }
                    KeyValue::Bytes(id) => {
                        stmt.execute(rusqlite::params![id, row.time_created, row.data])?
                    }
                };
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn db_size(&mut self) -> Result<u64> {
        // Aggregate dbstat sums the sizes of pages owned by the table,
        // which excludes free pages that raw file size would count.
        let size: i64 = self.conn()?.query_row(
            "SELECT pgsize FROM dbstat WHERE name = ?1 AND aggregate = TRUE",
            [TABLE_NAME],
            |row| row.get(0),
        )?;
        Ok(size as u64)
    }

    fn close(&mut self) -> Result<()> {
        self.disconnect()?;
        fs::remove_file(&self.path)
            .with_context(|| format!("failed to remove {}", self.path.display()))?;
        Ok(())
    }
}
