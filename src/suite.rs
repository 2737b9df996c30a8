//! Sequential orchestration of a catalogue through the [`Runner`].
//!
//! Workloads never overlap: parallelism lives inside a single workload so that
//! workloads do not compete for the same cores, memory bandwidth or disk.

use tracing::info;

use crate::error::BenchError;
use crate::harness::{logical_cpus, resolve_threads, CancelToken, RunRequest, Runner};
use crate::schema::{BenchResult, DualReport, Report, SystemInfo};
use crate::scoring::{self, ReferenceTable};
use crate::workload::Catalogue;

/// Progress event emitted around each workload.
#[derive(Debug)]
pub enum Progress<'a> {
    Started {
        index: usize,
        total: usize,
        name: &'a str,
    },
    Finished {
        index: usize,
        total: usize,
        result: &'a BenchResult,
    },
}

/// Which half of a dual run a progress event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    SingleCore,
    MultiCore,
}

/// Results of one pass. Results obtained before a cancellation are kept.
#[derive(Clone, Debug)]
pub struct SuiteRun {
    pub threads: usize,
    pub results: Vec<BenchResult>,
    pub canceled: bool,
}

pub struct Suite {
    catalogue: Catalogue,
    table: ReferenceTable,
}

impl Suite {
    pub fn new(catalogue: Catalogue, table: ReferenceTable) -> Self {
        Suite { catalogue, table }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    /// Runs the selected workloads in catalogue order.
    ///
    /// Cancellation stops the in-flight workload at its next unit boundary; its
    /// partial result is kept and no further workloads start. Only an unknown
    /// selection is an error; workload failures are recorded in the results.
    pub fn run<F>(&self, request: &RunRequest, cancel: &CancelToken, mut on_progress: F) -> Result<SuiteRun, BenchError>
    where
        F: FnMut(Progress<'_>),
    {
        let selected = self.catalogue.select(&request.only)?;
        let total = selected.len();
        let runner = Runner::new(cancel.clone());
        let mut results = Vec::with_capacity(total);

        for (index, workload) in selected.into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            on_progress(Progress::Started {
                index,
                total,
                name: workload.name(),
            });
            let result = runner.execute(workload, request.duration, request.threads);
            on_progress(Progress::Finished {
                index,
                total,
                result: &result,
            });
            results.push(result);
        }

        let canceled = cancel.is_cancelled();
        info!(completed = results.len(), total, canceled, "suite pass finished");
        Ok(SuiteRun {
            threads: resolve_threads(request.threads),
            results,
            canceled,
        })
    }

    /// A single-core pass followed by a pass on every logical CPU. The second
    /// pass is skipped once the first is canceled.
    pub fn run_dual<F>(
        &self,
        request: &RunRequest,
        cancel: &CancelToken,
        mut on_progress: F,
    ) -> Result<(SuiteRun, Option<SuiteRun>), BenchError>
    where
        F: FnMut(Pass, Progress<'_>),
    {
        let single = RunRequest {
            threads: 1,
            ..request.clone()
        };
        let first = self.run(&single, cancel, |p| on_progress(Pass::SingleCore, p))?;
        if first.canceled {
            return Ok((first, None));
        }

        let multi = RunRequest {
            threads: logical_cpus(),
            ..request.clone()
        };
        let second = self.run(&multi, cancel, |p| on_progress(Pass::MultiCore, p))?;
        Ok((first, Some(second)))
    }

    pub fn report(&self, run: &SuiteRun, system: SystemInfo) -> Report {
        let category_of = |name: &str| self.catalogue.get(name).map(|w| w.category());
        Report {
            system,
            overall: scoring::aggregate(&self.table, &run.results),
            sections: scoring::sections(&self.table, &run.results, category_of),
            results: run.results.clone(),
        }
    }

    pub fn dual_report(&self, single: &SuiteRun, multi: Option<&SuiteRun>, system: SystemInfo) -> DualReport {
        DualReport {
            single_core: self.report(single, system.clone()),
            multi_core: multi.map(|m| self.report(m, system)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benches::disk::DiskSeq;
    use crate::benches::hash::Sha256Hash;
    use crate::benches::memcopy::MemCopy;
    use crate::scoring::BASELINE_SCORE;
    use std::thread;
    use std::time::{Duration, Instant};

    fn small_suite() -> Suite {
        let mut c = Catalogue::new();
        c.push(Box::new(Sha256Hash::new()));
        c.push(Box::new(MemCopy::with_size(256 * 1024)));
        Suite::new(c, ReferenceTable::default())
    }

    #[test]
    fn runs_workloads_in_order_with_progress() {
        let suite = small_suite();
        let request = RunRequest::new(Duration::from_millis(50), 2);
        let mut events = Vec::new();
        let run = suite
            .run(&request, &CancelToken::new(), |p| match p {
                Progress::Started { index, name, .. } => events.push(format!("start {index} {name}")),
                Progress::Finished { index, result, .. } => {
                    events.push(format!("done {index} {}", result.name))
                }
            })
            .unwrap();

        assert!(!run.canceled);
        assert_eq!(run.threads, 2);
        assert_eq!(
            events,
            [
                "start 0 CPU SHA-256",
                "done 0 CPU SHA-256",
                "start 1 Memory copy",
                "done 1 Memory copy",
            ]
        );
        assert!(run.results.iter().all(|r| r.is_ok() && r.duration == request.duration));
    }

    #[test]
    fn cancellation_keeps_results_and_stops_advancing() {
        let suite = small_suite();
        let request = RunRequest::new(Duration::from_secs(10), 1);
        let cancel = CancelToken::new();
        let trigger = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                cancel.cancel();
                Instant::now()
            })
        };

        let run = suite.run(&request, &cancel, |_| {}).unwrap();
        let returned = Instant::now();
        let cancelled_at = trigger.join().unwrap();

        let latency = returned.duration_since(cancelled_at);
        assert!(latency < Duration::from_millis(250), "took {latency:?}");
        assert!(run.canceled);
        assert_eq!(run.results.len(), 1);
        assert!(run.results[0].err.is_none());
        assert!(run.results[0].ops > 0);
    }

    #[test]
    fn failed_workload_does_not_stop_the_suite() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing").join("deeper");
        let mut c = Catalogue::new();
        c.push(Box::new(DiskSeq::new(missing, 0).with_chunk_size(1024)));
        c.push(Box::new(MemCopy::with_size(64 * 1024)));
        let suite = Suite::new(c, ReferenceTable::default());

        let run = suite
            .run(&RunRequest::new(Duration::from_millis(50), 1), &CancelToken::new(), |_| {})
            .unwrap();
        assert_eq!(run.results.len(), 2);
        assert!(run.results[0].err.is_some());
        assert!(run.results[1].is_ok());

        let report = suite.report(&run, SystemInfo::collect());
        assert_eq!(report.sections["Storage"], 0.0);
        assert!(report.sections["Memory"] > 0.0);
        assert!(report.overall > 0.0 && report.overall.is_finite());
    }

    #[test]
    fn unknown_selection_is_rejected_before_running() {
        let suite = small_suite();
        let mut request = RunRequest::new(Duration::from_millis(10), 1);
        request.only = vec!["Nope".to_string()];
        assert!(matches!(
            suite.run(&request, &CancelToken::new(), |_| {}),
            Err(BenchError::UnknownWorkload(_))
        ));
    }

    #[test]
    fn dual_run_uses_one_then_all_cores() {
        let suite = small_suite();
        let mut request = RunRequest::new(Duration::from_millis(30), 0);
        request.only = vec!["Memory copy".to_string()];
        let mut passes = Vec::new();
        let (single, multi) = suite
            .run_dual(&request, &CancelToken::new(), |pass, p| {
                if let Progress::Finished { .. } = p {
                    passes.push(pass);
                }
            })
            .unwrap();

        let multi = multi.unwrap();
        assert_eq!(single.results[0].threads, 1);
        assert_eq!(multi.results[0].threads, logical_cpus());
        assert_eq!(passes, [Pass::SingleCore, Pass::MultiCore]);

        let report = suite.dual_report(&single, Some(&multi), SystemInfo::collect());
        let v = serde_json::to_value(&report).unwrap();
        assert!(v["single_core"]["sections"]["CPU"].is_number());
        assert_eq!(v["multi_core"]["results"][0]["name"], "Memory copy");
    }

    #[test]
    fn report_matches_export_shape() {
        let suite = small_suite();
        let run = SuiteRun {
            threads: 1,
            results: vec![BenchResult {
                name: "CPU SHA-256".to_string(),
                threads: 1,
                duration: Duration::from_secs(5),
                ops: 200_000,
                bytes: 0,
                unit: crate::schema::Unit::HashesPerSec,
                err: None,
                notes: None,
            }],
            canceled: false,
        };
        let report = suite.report(&run, SystemInfo::collect());
        assert!((report.overall - BASELINE_SCORE).abs() < 1e-6);
        assert!((report.sections["CPU"] - BASELINE_SCORE).abs() < 1e-6);

        let v = serde_json::to_value(&report).unwrap();
        let keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["overall", "results", "sections", "system"]);
    }
}
