//! Per-run orchestration: drives a writer through its batches and
//! records the measurement series.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::blkio;
use crate::writer::Writer;

/// One entry of the benchmark matrix: a named writer configuration plus
/// the container whose block-IO counters attribute this run's I/O.
pub struct RunConfig {
    pub name: String,
    pub writer: Box<dyn Writer>,
    pub io_container: String,
}

/// Batch shape shared by every run of a matrix execution.
#[derive(Debug, Clone, Copy)]
pub struct BatchParams {
    /// Rows inserted per transaction.
    pub batch_size: usize,
    /// Transactions per run.
    pub batch_count: usize,
}

/// Measurement series of one completed run, one element per batch.
///
/// All five series always have equal length; a run that fails mid-loop
/// produces no `RunResult` at all.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub name: String,
    pub rows_written: Vec<u64>,
    pub db_size: Vec<u64>,
    pub io_read: Vec<u64>,
    pub io_write: Vec<u64>,
    pub time_elapsed: Vec<f64>,
}

impl RunResult {
    fn new(name: String) -> Self {
        Self {
            name,
            rows_written: Vec::new(),
            db_size: Vec::new(),
            io_read: Vec::new(),
            io_write: Vec::new(),
            time_elapsed: Vec::new(),
        }
    }

    /// Writes the series as a JSON artifact under `dir`, named after the
    /// run. Written once, at run end; never amended.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(format!("{}.json", self.name));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "results saved");
        Ok(path)
    }
}

/// Executes one full run: init, all batches with a sample after each,
/// close. Any failure aborts the run and discards the partial series.
pub fn execute_run(config: RunConfig, params: BatchParams) -> Result<RunResult> {
    let RunConfig {
        name,
        mut writer,
        io_container,
    } = config;

    tracing::info!(run = %name, "initializing writer");
    writer
        .init_db()
        .with_context(|| format!("failed to initialize run {name}"))?;

    let mut result = RunResult::new(name.clone());
    let (base_read, base_write) = blkio::container_io(&io_container);
    let start = Instant::now();
    let mut rows_written = 0u64;

    for batch in 0..params.batch_count {
        writer
            .write_batch(params.batch_size)
            .with_context(|| format!("write failed in run {name}, batch {batch}"))?;
        rows_written += params.batch_size as u64;

        let db_size = writer
            .db_size()
            .with_context(|| format!("size probe failed in run {name}, batch {batch}"))?;
        let (io_read, io_write) = blkio::container_io(&io_container);
        // The counter sources are monotonic; saturate anyway so a counter
        // reset surfaces as a zero sample instead of a panic.
        let io_read = io_read.saturating_sub(base_read);
        let io_write = io_write.saturating_sub(base_write);

        result.rows_written.push(rows_written);
        result.db_size.push(db_size);
        result.io_read.push(io_read);
        result.io_write.push(io_write);
        result.time_elapsed.push(start.elapsed().as_secs_f64());

        tracing::info!(
            run = %name,
            rows = rows_written,
            db_size = %format_bytes(db_size),
            io_read = %format_bytes(io_read),
            io_write = %format_bytes(io_write),
            "batch {} of {} committed",
            batch + 1,
            params.batch_count,
        );
    }

    writer
        .close()
        .with_context(|| format!("failed to close run {name}"))?;
    Ok(result)
}

/// Formats a byte count with binary-unit suffixes, e.g. `1.5MiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
    let mut value = bytes as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if value < 1024.0 {
            return format!("{value:.1}{unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1}{}", UNITS[UNITS.len() - 1])
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::keygen::SequentialInt64Generator;
    use crate::writer::SqliteWriter;

    /// In-memory writer: size grows by a fixed amount per row, and an
    /// optional batch index triggers a write failure.
    struct FakeWriter {
        rows: u64,
        batches: usize,
        fail_at_batch: Option<usize>,
        closed: bool,
    }

    impl FakeWriter {
        fn new(fail_at_batch: Option<usize>) -> Self {
            Self {
                rows: 0,
                batches: 0,
                fail_at_batch,
                closed: false,
            }
        }
    }

    impl Writer for FakeWriter {
        fn init_db(&mut self) -> Result<()> {
            self.rows = 0;
            self.batches = 0;
            Ok(())
        }

        fn write_batch(&mut self, batch_size: usize) -> Result<()> {
            if self.fail_at_batch == Some(self.batches) {
                anyhow::bail!("injected write failure");
            }
            self.batches += 1;
            self.rows += batch_size as u64;
            Ok(())
        }

        fn db_size(&mut self) -> Result<u64> {
            Ok(self.rows * 100)
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn config(writer: impl Writer + 'static) -> RunConfig {
        RunConfig {
            name: "fake_run".to_string(),
            writer: Box::new(writer),
            io_container: "no-such-container-for-sure".to_string(),
        }
    }

    #[test]
    fn series_grow_in_lockstep() {
        let params = BatchParams {
            batch_size: 1000,
            batch_count: 3,
        };
        let result = execute_run(config(FakeWriter::new(None)), params).unwrap();

        assert_eq!(vec![1000, 2000, 3000], result.rows_written);
        assert_eq!(3, result.db_size.len());
        assert_eq!(3, result.io_read.len());
        assert_eq!(3, result.io_write.len());
        assert_eq!(3, result.time_elapsed.len());

        assert!(result.time_elapsed[0] > 0.0);
        assert!(result
            .time_elapsed
            .windows(2)
            .all(|pair| pair[0] <= pair[1]));
        // The probe degrades to zero for an unknown container, and deltas
        // never go negative.
        assert!(result.io_read.iter().all(|&bytes| bytes == 0));
        assert!(result.io_write.iter().all(|&bytes| bytes == 0));
    }

    #[test]
    fn a_failing_batch_aborts_the_run() {
        let params = BatchParams {
            batch_size: 10,
            batch_count: 5,
        };
        let err = execute_run(config(FakeWriter::new(Some(2))), params).unwrap_err();
        assert!(err.to_string().contains("batch 2"), "{err}");
    }

    #[test]
    fn artifact_round_trips_through_json() {
        let dir = tempdir().unwrap();
        let result = RunResult {
            name: "roundtrip".to_string(),
            rows_written: vec![10, 20],
            db_size: vec![4096, 8192],
            io_read: vec![0, 512],
            io_write: vec![1024, 2048],
            time_elapsed: vec![0.5, 1.0],
        };

        let path = result.save(dir.path()).unwrap();
        assert_eq!(dir.path().join("roundtrip.json"), path);

        let parsed: RunResult =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(result, parsed);
    }

    #[test]
    fn sqlite_run_end_to_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.sqlite");
        let config = RunConfig {
            name: "sqlite_e2e".to_string(),
            writer: Box::new(SqliteWriter::new(
                Box::new(SequentialInt64Generator::new()),
                &path,
                true,
            )),
            io_container: "no-such-container-for-sure".to_string(),
        };
        let params = BatchParams {
            batch_size: 10,
            batch_count: 3,
        };

        let result = execute_run(config, params).unwrap();

        assert_eq!(vec![10, 20, 30], result.rows_written);
        assert!(result.db_size[0] > 0);
        assert!(result.db_size.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(!path.exists(), "backing file survived close");
    }

    #[test]
    fn byte_counts_format_with_binary_units() {
        assert_eq!("0.0B", format_bytes(0));
        assert_eq!("512.0B", format_bytes(512));
        assert_eq!("1.0KiB", format_bytes(1024));
        assert_eq!("1.5MiB", format_bytes(3 * 512 * 1024));
        assert_eq!("2.0GiB", format_bytes(2 * 1024 * 1024 * 1024));
    }
}
