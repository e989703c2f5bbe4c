use anyhow::{Context, Result};
use postgres::{Client, NoTls};

use super::Writer;
use crate::keygen::{KeyGenerator, KeyValue};
use crate::row::RowGenerator;
use crate::schema::{SchemaBuilder, SqlDialect, TableSchema, TABLE_NAME};

/// Writer for the server engine that reports table size through
/// `pg_total_relation_size` (heap plus indexes).
///
/// No tuning is applied here; the relevant page and buffer settings are
/// read back and logged once per connection for the record.
pub struct PostgresWriter {
    url: String,
    rows: RowGenerator,
    schema: TableSchema,
    client: Option<Client>,
}

impl PostgresWriter {
    pub fn new(key_gen: Box<dyn KeyGenerator>, url: impl Into<String>) -> Self {
        let rows = RowGenerator::new(key_gen);
        let schema = SchemaBuilder::new(SqlDialect::Postgres).build(rows.key_type());
        Self {
            url: url.into(),
            rows,
            schema,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&mut Client> {
        if self.client.is_none() {
            let mut client =
                Client::connect(&self.url, NoTls).context("failed to connect to postgres")?;

            let block_size: String = client
                .query_one("SELECT current_setting('block_size')", &[])?
                .get(0);
            let shared_buffers: String = client
                .query_one("SELECT current_setting('shared_buffers')", &[])?
                .get(0);
            tracing::info!(%block_size, %shared_buffers, "connected to postgres");

            self.client = Some(client);
        }
        Ok(self.client.as_mut().unwrap())
    }
}

impl Writer for PostgresWriter {
    fn init_db(&mut self) -> Result<()> {
        let schema = self.schema.clone();
        let client = self.client()?;
        client
            .batch_execute(schema.drop_sql())
            .context("failed to drop benchmark table")?;
        client
            .batch_execute(schema.create_sql())
            .context("failed to create benchmark table")?;
        Ok(())
    }

    fn write_batch(&mut self, batch_size: usize) -> Result<()> {
        let batch = self.rows.generate_batch(batch_size)?;
        let mut tx = self.client()?.transaction()?;
        let stmt = tx.prepare("INSERT INTO signals (id, time_created, data) VALUES ($1, $2, $3)")?;
        for row in &batch {
            match &row.id {
                KeyValue::Int(id) => tx.execute(&stmt, &[id, &row.time_created, &row.data])?,
                KeyValue::Bytes(id) => tx.execute(&stmt, &[id, &row.time_created, &row.data])?,
            };
        }
        tx.commit()?;
        Ok(())
    }

    fn db_size(&mut self) -> Result<u64> {
        let query = format!("SELECT pg_total_relation_size('{TABLE_NAME}')");
        let size: i64 = self.client()?.query_one(query.as_str(), &[])?.get(0);
        Ok(size as u64)
    }

    fn close(&mut self) -> Result<()> {
        // The table stays in place for inspection; just drop the connection.
        self.client = None;
        Ok(())
    }
}
