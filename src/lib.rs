//! Measures how primary-key generation strategies affect on-disk write
//! amplification across storage engines.
//!
//! A run pairs one key strategy with one engine writer, inserts rows in
//! fixed-size batches, and samples table size and container block-I/O
//! after every batch; the resulting series are written as JSON artifacts
//! for the charting layer to consume.

pub mod blkio;
pub mod keygen;
pub mod registry;
pub mod row;
pub mod runner;
pub mod schema;
pub mod writer;
