//! Error types for workload execution and suite configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures a workload or the surrounding configuration can report.
///
/// Workload errors never escape the [`Runner`](crate::harness::Runner): they are
/// folded into [`BenchResult::err`](crate::schema::BenchResult::err) so the rest of
/// a suite keeps going.
#[derive(Debug, Error)]
pub enum BenchError {
    /// A required resource could not be acquired before any work started.
    #[error("{workload}: setup failed: {message}")]
    Setup {
        workload: String,
        message: String,
    },

    /// An I/O operation failed mid-run.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// An encoder rejected an input buffer.
    #[error("{workload}: codec error: {message}")]
    Codec {
        workload: String,
        message: String,
    },

    /// A structured payload failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A selection named a workload the catalogue does not contain.
    #[error("unknown workload: {0}")]
    UnknownWorkload(String),

    /// A reference table file could not be read or parsed.
    #[error("reference table {}: {source}", path.display())]
    Reference {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BenchError {
    pub fn setup(workload: &str, message: impl Into<String>) -> Self {
        BenchError::Setup {
            workload: workload.to_string(),
            message: message.into(),
        }
    }

    pub fn codec(workload: &str, message: impl Into<String>) -> Self {
        BenchError::Codec {
            workload: workload.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_names_the_workload() {
        let err = BenchError::setup("Disk seq R/W", "permission denied");
        assert_eq!(err.to_string(), "Disk seq R/W: setup failed: permission denied");
    }

    #[test]
    fn io_error_converts() {
        let err: BenchError = io::Error::other("disk full").into();
        assert!(err.to_string().contains("disk full"));
    }
}
