//! The polymorphic workload interface and the ordered catalogue of variants.

use std::time::Duration;

use crate::benches::{
    blur::GaussianBlur, compress::Codec, compress::Compress, decode::JsonDecode, disk::DiskSeq,
    hash::Sha256Hash, matmul::MatMul, memcopy::MemCopy,
};
use crate::error::BenchError;
use crate::harness::{BenchConfig, Outcome, StopSignal};
use crate::schema::{Category, Unit};

/// A repeatable, parameterized unit of synthetic work with a declared unit.
///
/// `run` receives an already-resolved thread count (at least 1) and must
/// observe `signal` after every discrete unit of work, so shutdown latency is
/// bounded by one unit per worker.
pub trait Workload: Send + Sync {
    fn name(&self) -> &str;
    fn unit(&self) -> Unit;
    fn category(&self) -> Category;

    /// Worker count actually used for a resolved request.
    fn threads(&self, requested: usize) -> usize {
        requested
    }

    fn run(&self, signal: &StopSignal, duration: Duration, threads: usize) -> Result<Outcome, BenchError>;
}

/// Ordered registry of workloads; names are unique.
pub struct Catalogue {
    workloads: Vec<Box<dyn Workload>>,
}

impl Catalogue {
    pub fn new() -> Self {
        Catalogue {
            workloads: Vec::new(),
        }
    }

    /// The standard suite, in run order.
    pub fn standard(cfg: &BenchConfig) -> Self {
        let mut c = Catalogue::new();
        c.push(Box::new(Sha256Hash::new()));
        c.push(Box::new(Compress::new(Codec::Zstd, cfg.zstd_level, cfg.seed)));
        c.push(Box::new(Compress::new(Codec::Gzip, cfg.gzip_level, cfg.seed)));
        c.push(Box::new(JsonDecode::new(cfg.seed)));
        c.push(Box::new(MatMul::new(cfg.matrix_n)));
        c.push(Box::new(MemCopy::new()));
        c.push(Box::new(GaussianBlur::full_hd()));
        c.push(Box::new(DiskSeq::new(cfg.scratch_dir(), cfg.seed)));
        c
    }

    /// Appends `workload`, replacing any earlier entry with the same name.
    pub fn push(&mut self, workload: Box<dyn Workload>) {
        self.workloads.retain(|w| w.name() != workload.name());
        self.workloads.push(workload);
    }

    pub fn len(&self) -> usize {
        self.workloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workloads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Workload> {
        self.workloads.iter().map(|w| w.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Workload> {
        self.iter().find(|w| w.name() == name)
    }

    /// Workloads named in `only`, kept in catalogue order. Empty selects all.
    pub fn select(&self, only: &[String]) -> Result<Vec<&dyn Workload>, BenchError> {
        if let Some(missing) = only.iter().find(|n| self.get(n).is_none()) {
            return Err(BenchError::UnknownWorkload(missing.clone()));
        }
        Ok(self
            .iter()
            .filter(|w| only.is_empty() || only.iter().any(|n| n == w.name()))
            .collect())
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Catalogue::standard(&BenchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalogue_order() {
        let c = Catalogue::default();
        let names: Vec<_> = c.iter().map(|w| w.name().to_string()).collect();
        assert_eq!(
            names,
            [
                "CPU SHA-256",
                "Zstd Compress",
                "Gzip Compress",
                "JSON Parse",
                "MatMul",
                "Memory copy",
                "Gaussian Blur 1080p",
                "Disk seq R/W",
            ]
        );
    }

    #[test]
    fn every_category_is_represented() {
        let c = Catalogue::default();
        for cat in Category::ALL {
            assert!(c.iter().any(|w| w.category() == cat), "{cat} missing");
        }
    }

    #[test]
    fn select_keeps_catalogue_order() {
        let c = Catalogue::default();
        let picked = c
            .select(&["Memory copy".to_string(), "CPU SHA-256".to_string()])
            .unwrap();
        let names: Vec<_> = picked.iter().map(|w| w.name()).collect();
        assert_eq!(names, ["CPU SHA-256", "Memory copy"]);
    }

    #[test]
    fn select_rejects_unknown_names() {
        let c = Catalogue::default();
        let err = c.select(&["AES-CTR".to_string()]).err().unwrap();
        assert!(matches!(err, BenchError::UnknownWorkload(n) if n == "AES-CTR"));
    }

    #[test]
    fn push_replaces_duplicate_names() {
        let mut c = Catalogue::new();
        c.push(Box::new(MemCopy::new()));
        c.push(Box::new(MemCopy::with_size(1024)));
        assert_eq!(c.len(), 1);
    }
}
