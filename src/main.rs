use std::path::Path;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use primary_key_perf::registry::{self, Targets};
use primary_key_perf::runner::{self, BatchParams};

/// Rows per transaction, shared by every configured run.
const BATCH_SIZE: usize = 1000;

/// Transactions per run.
const BATCH_COUNT: usize = 1000;

/// Master seed for the random key strategies; fixed so the whole matrix
/// is repeatable.
const RNG_SEED: u64 = 42;

/// Directory the per-run JSON artifacts land in.
const RESULTS_DIR: &str = "results";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let targets = Targets::from_env();
    let params = BatchParams {
        batch_size: BATCH_SIZE,
        batch_count: BATCH_COUNT,
    };
    let mut rng = StdRng::seed_from_u64(RNG_SEED);
    let results_dir = Path::new(RESULTS_DIR);

    for run in registry::build_runs(&targets, &mut rng) {
        let name = run.name.clone();
        tracing::info!(run = %name, "starting run");

        // A failed run is abandoned without an artifact; the rest of the
        // matrix still executes.
        let outcome = runner::execute_run(run, params).and_then(|result| result.save(results_dir));
        if let Err(err) = outcome {
            tracing::error!(run = %name, error = ?err, "run failed");
        }
    }

    Ok(())
}
