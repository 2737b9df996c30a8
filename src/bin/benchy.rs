use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use benchy::harness::resolve_threads;
use benchy::schema::BenchResult;
use benchy::scoring;
use benchy::{BenchConfig, CancelToken, Catalogue, Progress, ReferenceTable, RunRequest, Suite, SuiteRun, SystemInfo};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "benchy=info";

/// Upper bound for `--duration`: one day per workload.
const MAX_DURATION_SECS: u64 = 86_400;

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the catalogue once with `--threads` workers per workload.
    Run,

    /// Run a single-core pass, then a pass on every logical CPU.
    Dual,

    /// List the catalogue with units and score sections.
    List,
}

#[derive(Parser, Debug)]
#[command(name = "benchy")]
#[command(about = "Time-bounded throughput benchmarks with normalized scores (JSON output)")]
struct Args {
    /// Wall-clock budget per workload, in seconds.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=MAX_DURATION_SECS), global = true)]
    duration: u64,

    /// Worker threads per workload; 0 uses every logical CPU.
    #[arg(long, default_value_t = 0, global = true)]
    threads: usize,

    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Run only these workloads (repeatable), in catalogue order.
    #[arg(long, value_name = "NAME", action = clap::ArgAction::Append, global = true)]
    only: Vec<String>,

    #[arg(long, default_value_t = 3, global = true)]
    zstd_level: i32,

    #[arg(long, default_value_t = 6, global = true)]
    gzip_level: i32,

    /// Matrix dimension for the dense-arithmetic workload.
    #[arg(long, default_value_t = 256, global = true)]
    matrix_n: usize,

    /// Directory for the sequential I/O scratch file (default: OS temp dir).
    #[arg(long, value_name = "DIR", global = true)]
    scratch_dir: Option<PathBuf>,

    /// JSON object of `{"workload name": baseline}` overriding the built-in references.
    #[arg(long, value_name = "FILE", global = true)]
    reference: Option<PathBuf>,

    /// Where to write the JSON report. If omitted, prints to stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

/// First Ctrl-C stops the in-flight workload and keeps the results so far;
/// a second one exits immediately.
fn install_interrupt_handler(cancel: &CancelToken) -> anyhow::Result<()> {
    let cancel = cancel.clone();
    ctrlc::set_handler(move || {
        if cancel.interrupt() {
            std::process::exit(130);
        }
        warn!("interrupted, finishing the current workload (press Ctrl-C again to abort)");
    })
    .context("installing Ctrl-C handler")
}

fn log_progress(label: &str, p: Progress<'_>) {
    match p {
        Progress::Started { index, total, name } => {
            info!("{label} [{}/{}] {name}", index + 1, total);
        }
        Progress::Finished { result, .. } => match &result.err {
            Some(err) => info!("{label} {} failed: {err}", result.name),
            None => info!("{label} {}: {}", result.name, result.throughput_display()),
        },
    }
}

fn print_summary(label: &str, suite: &Suite, run: &SuiteRun) {
    eprintln!("\n{label} ({} threads){}", run.threads, if run.canceled { " (canceled)" } else { "" });
    for r in &run.results {
        eprintln!(
            "  {:<22} {:>16} {:>8.0}  {}",
            r.name,
            throughput_cell(r),
            scoring::score(suite.table(), r),
            r.notes.as_deref().unwrap_or_default()
        );
    }
    let report = suite.report(run, SystemInfo::collect());
    for (section, value) in &report.sections {
        eprintln!("  {section:<22} {value:>25.0}");
    }
    eprintln!("  {:<22} {:>25.0}", "Overall", report.overall);
}

fn throughput_cell(r: &BenchResult) -> String {
    match &r.err {
        Some(err) => format!("error: {err}"),
        None => r.throughput_display(),
    }
}

fn write_json<T: serde::Serialize>(value: &T, out: Option<&PathBuf>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let cfg = BenchConfig {
        seed: args.seed,
        zstd_level: args.zstd_level,
        gzip_level: args.gzip_level,
        matrix_n: args.matrix_n,
        scratch_dir: args.scratch_dir.clone(),
    };
    let table = match &args.reference {
        Some(path) => ReferenceTable::load(path)?,
        None => ReferenceTable::default(),
    };
    let suite = Suite::new(Catalogue::standard(&cfg), table);

    let request = RunRequest {
        duration: Duration::from_secs(args.duration),
        threads: args.threads,
        only: args.only.clone(),
    };
    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel)?;

    match args.cmd {
        Command::List => {
            for w in suite.catalogue().iter() {
                println!("{:<22} {:<8} {}", w.name(), w.unit(), w.category());
            }
        }
        Command::Run => {
            info!(
                threads = resolve_threads(request.threads),
                duration_s = args.duration,
                "starting benchmark pass"
            );
            let run = suite.run(&request, &cancel, |p| log_progress("run", p))?;
            print_summary("Run", &suite, &run);
            write_json(&suite.report(&run, SystemInfo::collect()), args.out.as_ref())?;
        }
        Command::Dual => {
            let (single, multi) = suite.run_dual(&request, &cancel, |pass, p| {
                let label = match pass {
                    benchy::Pass::SingleCore => "single-core",
                    benchy::Pass::MultiCore => "multi-core",
                };
                log_progress(label, p)
            })?;
            print_summary("Single-Core", &suite, &single);
            if let Some(multi) = &multi {
                print_summary("Multi-Core", &suite, multi);
            }
            let report = suite.dual_report(&single, multi.as_ref(), SystemInfo::collect());
            write_json(&report, args.out.as_ref())?;
        }
    }

    Ok(())
}
