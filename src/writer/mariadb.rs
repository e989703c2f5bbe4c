use anyhow::{Context, Result};
use mysql::prelude::Queryable;
use mysql::{Conn, Opts, TxOpts, Value};

use super::Writer;
use crate::keygen::{KeyGenerator, KeyValue};
use crate::row::RowGenerator;
use crate::schema::{SchemaBuilder, SqlDialect, TableSchema, TABLE_NAME};

/// InnoDB buffer pool applied during `init_db`: 10 MiB, so every run
/// starts from a cold, bounded cache.
const BUFFER_POOL_SIZE: u64 = 10 * 1024 * 1024;

/// Writer for the server engine that reports table size through the
/// `information_schema` catalog.
pub struct MariaDbWriter {
    url: String,
    rows: RowGenerator,
    schema: TableSchema,
    conn: Option<Conn>,
}

impl MariaDbWriter {
    pub fn new(key_gen: Box<dyn KeyGenerator>, url: impl Into<String>) -> Self {
        let rows = RowGenerator::new(key_gen);
        let schema = SchemaBuilder::new(SqlDialect::MariaDb).build(rows.key_type());
        Self {
            url: url.into(),
            rows,
            schema,
            conn: None,
        }
    }

    fn conn(&mut self) -> Result<&mut Conn> {
        if self.conn.is_none() {
            let opts = Opts::from_url(&self.url).context("invalid mariadb connection url")?;
            let conn = Conn::new(opts).context("failed to connect to mariadb")?;
            self.conn = Some(conn);
        }
        Ok(self.conn.as_mut().unwrap())
    }

    fn database(&self) -> Result<String> {
        let opts = Opts::from_url(&self.url).context("invalid mariadb connection url")?;
        let name = opts
            .get_db_name()
            .context("mariadb connection url names no database")?;
        Ok(name.to_string())
    }
}

impl Writer for MariaDbWriter {
    fn init_db(&mut self) -> Result<()> {
        let schema = self.schema.clone();
        let conn = self.conn()?;
        conn.query_drop(schema.drop_sql())
            .context("failed to drop benchmark table")?;
        conn.query_drop(schema.create_sql())
            .context("failed to create benchmark table")?;

        // Setting this through the server config does not stick on the
        // benchmark image; apply it from the client, before the first
        // batch, and read it back for the record.
        conn.query_drop(format!(
            "SET GLOBAL innodb_buffer_pool_size={BUFFER_POOL_SIZE}"
        ))
        .context("failed to bound the buffer pool")?;
        let pool: Option<(String, String)> =
            conn.query_first("SHOW VARIABLES LIKE 'innodb_buffer_pool_size'")?;
        if let Some((_, value)) = pool {
            tracing::info!(innodb_buffer_pool_size = %value, "buffer pool configured");
        }
        Ok(())
    }

    fn write_batch(&mut self, batch_size: usize) -> Result<()> {
        let batch = self.rows.generate_batch(batch_size)?;
        let conn = self.conn()?;
        let mut tx = conn.start_transaction(TxOpts::default())?;
        tx.exec_batch(
            "INSERT INTO signals (id, time_created, data) VALUES (?, ?, ?)",
            batch.iter().map(|row| {
                let id = match &row.id {
                    KeyValue::Int(id) => Value::Int(*id),
                    KeyValue::Bytes(id) => Value::Bytes(id.clone()),
                };
                (id, row.time_created.clone(), row.data.clone())
            }),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn db_size(&mut self) -> Result<u64> {
        let database = self.database()?;
        // SQL_NO_CACHE so repeated catalog reads are not served stale;
        // the engine treats it as a hint, so this is best-effort.
        let size: Option<u64> = self.conn()?.exec_first(
            "SELECT SQL_NO_CACHE (data_length + index_length) FROM information_schema.TABLES \
             WHERE table_schema = ? AND table_name = ?",
            (database, TABLE_NAME),
        )?;
        size.with_context(|| format!("table {TABLE_NAME} missing from the catalog"))
    }

    fn close(&mut self) -> Result<()> {
        // The table stays in place for inspection; just drop the connection.
        self.conn = None;
        Ok(())
    }
}
