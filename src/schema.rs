use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Throughput unit a workload reports in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "B/s")]
    BytesPerSec,
    #[serde(rename = "hash/s")]
    HashesPerSec,
    /// Recorded as micro-GFLOP/s in [`BenchResult::ops`].
    #[serde(rename = "GFLOP/s")]
    GflopsPerSec,
    #[serde(rename = "px/s")]
    PixelsPerSec,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::BytesPerSec => "B/s",
            Unit::HashesPerSec => "hash/s",
            Unit::GflopsPerSec => "GFLOP/s",
            Unit::PixelsPerSec => "px/s",
        }
    }

    /// Fixed-point scale of a stored GFLOP/s value: `ops` holds GFLOP/s times this.
    pub const FLOP_SCALE: f64 = 1e6;
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Section a workload contributes to in the aggregate scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "CPU")]
    Cpu,
    Memory,
    Storage,
    Image,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Cpu,
        Category::Memory,
        Category::Storage,
        Category::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cpu => "CPU",
            Category::Memory => "Memory",
            Category::Storage => "Storage",
            Category::Image => "Image",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of one workload execution.
///
/// `duration` is always the requested budget. A failed result carries `err` and
/// zero throughput.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchResult {
    pub name: String,
    pub threads: usize,
    #[serde(with = "duration_nanos")]
    pub duration: Duration,
    pub ops: u64,
    pub bytes: u64,
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BenchResult {
    pub fn failed(name: &str, unit: Unit, threads: usize, duration: Duration, err: String) -> Self {
        BenchResult {
            name: name.to_string(),
            threads,
            duration,
            ops: 0,
            bytes: 0,
            unit,
            err: Some(err),
            notes: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// Human-readable throughput, e.g. `"1.25 GB/s"` or `"48.10 GFLOP/s"`.
    pub fn throughput_display(&self) -> String {
        if !self.is_ok() {
            return "—".to_string();
        }
        match self.unit {
            Unit::BytesPerSec => {
                let secs = self.duration.as_secs_f64();
                let bps = if secs > 0.0 {
                    (self.bytes as f64 / secs) as u64
                } else {
                    0
                };
                format!("{}/s", human_bytes(bps))
            }
            Unit::GflopsPerSec => {
                format!("{:.2} {}", self.ops as f64 / Unit::FLOP_SCALE, self.unit)
            }
            Unit::HashesPerSec | Unit::PixelsPerSec if self.ops > 0 => {
                format!("{} {}", self.ops, self.unit)
            }
            _ => "—".to_string(),
        }
    }
}

/// Formats a byte count with binary multiples: `1536` -> `"1.50 KB"`.
pub fn human_bytes(bytes: u64) -> String {
    const SUFFIX: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut f = bytes as f64;
    let mut i = 0;
    while f >= 1024.0 && i < SUFFIX.len() - 1 {
        f /= 1024.0;
        i += 1;
    }
    format!("{:.2} {}", f, SUFFIX[i])
}

/// Host identification included verbatim in exports; never used for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub logical_cpus: usize,
    pub bench_version: String,
}

impl SystemInfo {
    pub fn collect() -> Self {
        SystemInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            logical_cpus: crate::harness::logical_cpus(),
            bench_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Export record for one suite pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub system: SystemInfo,
    pub results: Vec<BenchResult>,
    pub overall: f64,
    pub sections: BTreeMap<String, f64>,
}

/// Export for a single-core pass followed by a multi-core pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualReport {
    pub single_core: Report,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_core: Option<Report>,
}

/// Serializes a [`Duration`] as integer nanoseconds.
pub mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        s.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(d)?;
        Ok(Duration::from_nanos(nanos))
    }
}
