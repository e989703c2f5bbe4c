//! Storage engine writers.
//!
//! One implementation per engine behind a single contract; the driver
//! holds writers as boxed trait objects and never learns which engine it
//! is talking to. Each writer owns exactly one connection, opened lazily
//! and held for the lifetime of a single run.

mod mariadb;
mod postgres;
mod sqlite;

pub use self::mariadb::MariaDbWriter;
pub use self::postgres::PostgresWriter;
pub use self::sqlite::SqliteWriter;

use anyhow::Result;

/// The capability set every storage backend implements.
pub trait Writer {
    /// Drops and recreates the benchmark table per the configured schema
    /// and applies the engine's tuning directives. Destructive: erases
    /// any prior table contents. The writer accepts batches afterwards.
    fn init_db(&mut self) -> Result<()>;

    /// Generates `batch_size` rows and inserts them in one transaction.
    /// Never partially commits: a failure aborts the whole batch.
    fn write_batch(&mut self, batch_size: usize) -> Result<()>;

    /// Current storage footprint of the benchmark table, in bytes.
    fn db_size(&mut self) -> Result<u64>;

    /// Releases the connection. The embedded engine also deletes its
    /// backing file; server engines leave the table in place for
    /// inspection.
    fn close(&mut self) -> Result<()>;
}
