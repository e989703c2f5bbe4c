//! Cumulative block-device I/O counters for a named container.
//!
//! Each run attributes storage I/O to the engine by reading the cgroup
//! block-IO accounting of the container the engine runs in; the embedded
//! engine runs in-process, so its runs name the harness's own container.
//! When the container or the accounting files cannot be found the probe
//! reports zero instead of failing, so runs on hosts without docker still
//! produce size series.

use std::fs;
use std::process::Command;

use anyhow::{Context, Result};

/// Cumulative `(read_bytes, write_bytes)` for the named container.
///
/// Counters are monotonic over a container's lifetime; callers measure
/// growth by subtracting a baseline sample. Returns `(0, 0)` whenever
/// the accounting is unavailable.
pub fn container_io(container: &str) -> (u64, u64) {
    match try_container_io(container) {
        Ok(counters) => counters,
        Err(err) => {
            tracing::debug!(container, error = %err, "block-io counters unavailable");
            (0, 0)
        }
    }
}

fn try_container_io(container: &str) -> Result<(u64, u64)> {
    let id = resolve_container_id(container)?;

    // Unified-hierarchy layout first, then the legacy blkio controller.
    let io_stat = format!("/sys/fs/cgroup/system.slice/docker-{id}.scope/io.stat");
    if let Ok(contents) = fs::read_to_string(&io_stat) {
        return Ok(parse_io_stat(&contents));
    }

    let service_bytes =
        format!("/sys/fs/cgroup/blkio/docker/{id}/blkio.throttle.io_service_bytes_recursive");
    let contents = fs::read_to_string(&service_bytes)
        .with_context(|| format!("no block-io accounting for container {id}"))?;
    Ok(parse_service_bytes(&contents))
}

fn resolve_container_id(container: &str) -> Result<String> {
    let output = Command::new("docker")
        .args(["inspect", "--format", "{{.Id}}", container])
        .output()
        .context("failed to invoke docker")?;
    anyhow::ensure!(output.status.success(), "no such container: {container}");
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Parses cgroup v2 `io.stat`: one line per device, of the form
/// `MAJ:MIN rbytes=... wbytes=... rios=... wios=... ...`.
fn parse_io_stat(contents: &str) -> (u64, u64) {
    let mut read = 0u64;
    let mut write = 0u64;
    for line in contents.lines() {
        for field in line.split_whitespace() {
            if let Some(value) = field.strip_prefix("rbytes=") {
                read += value.parse::<u64>().unwrap_or(0);
            } else if let Some(value) = field.strip_prefix("wbytes=") {
                write += value.parse::<u64>().unwrap_or(0);
            }
        }
    }
    (read, write)
}

/// Parses cgroup v1 `blkio.throttle.io_service_bytes_recursive`:
/// `MAJ:MIN Read <bytes>` and `MAJ:MIN Write <bytes>` lines, one set per
/// device, followed by a `Total` line that is ignored here.
fn parse_service_bytes(contents: &str) -> (u64, u64) {
    let mut read = 0u64;
    let mut write = 0u64;
    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let (Some(_device), Some(op), Some(value)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        match op {
            "Read" => read += value.parse::<u64>().unwrap_or(0),
            "Write" => write += value.parse::<u64>().unwrap_or(0),
            _ => {}
        }
    }
    (read, write)
}
