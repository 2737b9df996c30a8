use std::hint::black_box;
use std::time::Duration;

use crate::error::BenchError;
use crate::harness::{fan_out, Outcome, StopSignal, Tally, Worker};
use crate::schema::{Category, Unit};
use crate::workload::Workload;

pub const NAME: &str = "Memory copy";

/// Copies one buffer into another of equal size, per worker.
#[derive(Clone, Debug)]
pub struct MemCopy {
    size: usize,
}

impl MemCopy {
    pub fn new() -> Self {
        Self::with_size(8 * 1024 * 1024)
    }

    pub fn with_size(size: usize) -> Self {
        MemCopy { size: size.max(1) }
    }
}

impl Default for MemCopy {
    fn default() -> Self {
        Self::new()
    }
}

struct CopyWorker {
    src: Vec<u8>,
    dst: Vec<u8>,
}

impl Worker for CopyWorker {
    fn step(&mut self) -> Result<Tally, BenchError> {
        self.dst.copy_from_slice(black_box(&self.src));
        Ok(Tally::unit_of(self.src.len() as u64))
    }
}

impl Workload for MemCopy {
    fn name(&self) -> &str {
        NAME
    }

    fn unit(&self) -> Unit {
        Unit::BytesPerSec
    }

    fn category(&self) -> Category {
        Category::Memory
    }

    fn run(&self, signal: &StopSignal, _duration: Duration, threads: usize) -> Result<Outcome, BenchError> {
        fan_out(NAME, signal, threads, |index| {
            Ok(CopyWorker {
                src: vec![index as u8; self.size],
                dst: vec![0u8; self.size],
            })
        })
        .map(Outcome::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{CancelToken, Runner};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn bytes_are_a_multiple_of_the_buffer() {
        let size = 64 * 1024;
        let r = Runner::default().execute(&MemCopy::with_size(size), Duration::from_millis(80), 3);
        assert!(r.is_ok());
        assert!(r.bytes > 0);
        assert_eq!(r.bytes % size as u64, 0);
        assert_eq!(r.bytes, r.ops * size as u64);
        assert_eq!(r.threads, 3);
    }

    #[test]
    fn cancelled_run_returns_partial_result_promptly() {
        let cancel = CancelToken::new();
        let runner = Runner::new(cancel.clone());
        let trigger = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            cancel.cancel();
            Instant::now()
        });

        let requested = Duration::from_secs(10);
        let r = runner.execute(&MemCopy::with_size(1024 * 1024), requested, 2);
        let returned = Instant::now();
        let cancelled_at = trigger.join().unwrap();

        assert!(r.err.is_none());
        assert!(r.bytes > 0);
        assert_eq!(r.duration, requested);
        let latency = returned.duration_since(cancelled_at);
        assert!(latency < Duration::from_millis(250), "took {latency:?}");
    }
}
