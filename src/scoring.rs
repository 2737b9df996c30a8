//! Normalized scores and geometric-mean aggregates.
//!
//! A result scores `(throughput / baseline) * BASELINE_SCORE`, so a machine that
//! matches the reference table on a workload scores exactly 2500 on it.
//! Aggregates use the geometric mean over strictly positive scores, which keeps
//! one unusually fast workload from hiding an unusually slow one.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::benches::compress::Codec;
use crate::benches::{blur, decode, disk, hash, matmul, memcopy};
use crate::error::BenchError;
use crate::schema::{BenchResult, Category, Unit};

/// Score of a result that exactly matches its reference baseline.
pub const BASELINE_SCORE: f64 = 2500.0;

const MIB: f64 = 1024.0 * 1024.0;

/// Per-workload reference throughput, in the unit each result is recorded in.
///
/// Built once and passed explicitly; a missing or non-positive entry makes the
/// workload unscoreable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    baselines: BTreeMap<String, f64>,
}

impl Default for ReferenceTable {
    fn default() -> Self {
        let mut t = ReferenceTable::empty();
        t.insert(hash::NAME, 200_000.0);
        t.insert(Codec::Zstd.workload_name(), 400.0 * MIB);
        t.insert(Codec::Gzip.workload_name(), 250.0 * MIB);
        t.insert(decode::NAME, 300.0 * MIB);
        t.insert(matmul::NAME, 50.0);
        t.insert(memcopy::NAME, 20_000.0 * MIB);
        t.insert(blur::NAME, 30e6);
        t.insert(disk::NAME, 800.0 * MIB);
        t
    }
}

impl ReferenceTable {
    pub fn empty() -> Self {
        ReferenceTable {
            baselines: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: &str, baseline: f64) {
        self.baselines.insert(name.to_string(), baseline);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.baselines.get(name).copied()
    }

    /// Default table overlaid with a JSON object of `{"name": baseline}` entries.
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let wrap = |source: Box<dyn std::error::Error + Send + Sync>| BenchError::Reference {
            path: path.to_path_buf(),
            source,
        };
        let text = fs::read_to_string(path).map_err(|e| wrap(Box::new(e)))?;
        let overrides: BTreeMap<String, f64> = serde_json::from_str(&text).map_err(|e| wrap(Box::new(e)))?;

        let mut table = ReferenceTable::default();
        table.baselines.extend(overrides);
        Ok(table)
    }
}

/// Throughput in the reference table's unit for `result`.
pub fn throughput(result: &BenchResult) -> f64 {
    match result.unit {
        Unit::BytesPerSec => {
            let secs = result.duration.as_secs_f64();
            if secs > 0.0 {
                result.bytes as f64 / secs
            } else {
                0.0
            }
        }
        Unit::GflopsPerSec => result.ops as f64 / Unit::FLOP_SCALE,
        Unit::HashesPerSec | Unit::PixelsPerSec => result.ops as f64,
    }
}

/// Normalized score; `0.0` for failed, empty or unscoreable results.
pub fn score(table: &ReferenceTable, result: &BenchResult) -> f64 {
    if !result.is_ok() {
        return 0.0;
    }
    let baseline = match table.get(&result.name) {
        Some(b) if b > 0.0 => b,
        _ => return 0.0,
    };
    let tp = throughput(result);
    if tp <= 0.0 || !tp.is_finite() {
        return 0.0;
    }
    tp / baseline * BASELINE_SCORE
}

/// Geometric mean of the strictly positive entries; `0.0` if there are none.
pub fn aggregate_scores(scores: &[f64]) -> f64 {
    let (sum_ln, n) = scores
        .iter()
        .filter(|s| **s > 0.0 && s.is_finite())
        .fold((0.0f64, 0usize), |(acc, n), s| (acc + s.ln(), n + 1));
    if n == 0 {
        0.0
    } else {
        (sum_ln / n as f64).exp()
    }
}

pub fn aggregate(table: &ReferenceTable, results: &[BenchResult]) -> f64 {
    let scores: Vec<f64> = results.iter().map(|r| score(table, r)).collect();
    aggregate_scores(&scores)
}

/// Aggregate per category, keyed by section name. Every category is present;
/// results whose category is unknown are skipped.
pub fn sections<F>(table: &ReferenceTable, results: &[BenchResult], category_of: F) -> BTreeMap<String, f64>
where
    F: Fn(&str) -> Option<Category>,
{
    Category::ALL
        .iter()
        .map(|cat| {
            let scores: Vec<f64> = results
                .iter()
                .filter(|r| category_of(r.name.as_str()) == Some(*cat))
                .map(|r| score(table, r))
                .collect();
            (cat.as_str().to_string(), aggregate_scores(&scores))
        })
        .collect()
}
