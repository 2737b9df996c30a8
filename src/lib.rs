//! Time-bounded concurrent throughput benchmarks with normalized scores.
//!
//! A [`Suite`] runs each [`Workload`] of a [`Catalogue`] in turn through the
//! [`Runner`], which fans the workload out across worker threads until a
//! deadline or cancellation, merges the per-worker counters and records a
//! [`BenchResult`]. The [`scoring`] module normalizes results against a
//! [`ReferenceTable`] and combines them with a geometric mean.

pub mod benches;
pub mod dataset;
pub mod error;
pub mod harness;
pub mod schema;
pub mod scoring;
pub mod suite;
pub mod workload;

pub use error::BenchError;
pub use harness::{BenchConfig, CancelToken, RunRequest, Runner};
pub use schema::{BenchResult, Category, Report, SystemInfo, Unit};
pub use scoring::ReferenceTable;
pub use suite::{Pass, Progress, Suite, SuiteRun};
pub use workload::{Catalogue, Workload};
