use anyhow::Context;
use clap::{Parser, Subcommand};
use deidcheck::aggregate::exit_code;
use deidcheck::config::HarnessConfig;
use deidcheck::harness::{controller_from_settings, Runner};
use deidcheck::matcher::{LogMatcher, LogScan, Pattern};
use deidcheck::report::{read_results, write_html_report, write_results, ResultsFile};
use deidcheck::types::ScanWindow;
use deidcheck::waiter::JobWaiter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "deidcheck", about = "DeIdentification service end-to-end verification harness")]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    debug: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every test in a plan, then write the JSON results and HTML report.
    Run {
        #[arg(long)]
        plan: PathBuf,
        /// Overrides `harness.results_json`.
        #[arg(long)]
        results: Option<PathBuf>,
        /// Overrides `harness.report_html`.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Count directories, files and bytes under a path.
    Snapshot { path: PathBuf },
    /// Search a log once.
    CheckLog {
        #[arg(long)]
        log: PathBuf,
        #[arg(long)]
        pattern: String,
        /// Treat the pattern as a regular expression instead of a substring.
        #[arg(long)]
        regex: bool,
        /// Only look at the last N lines.
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Poll a log until a pattern appears or the timeout elapses.
    Wait {
        #[arg(long)]
        log: PathBuf,
        #[arg(long)]
        pattern: String,
        #[arg(long)]
        regex: bool,
        #[arg(long, default_value_t = 300)]
        timeout: u64,
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
    /// Rebuild the HTML report from a saved results file.
    Report {
        #[arg(long)]
        results: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.log_file.as_deref())?;

    match cli.command {
        Command::Run {
            plan,
            results,
            report,
        } => run(&plan, results, report),
        Command::Snapshot { path } => {
            let stats = deidcheck::snapshot::snapshot(&path)?;
            println!(
                "{}: {} directories, {} files, {} bytes",
                path.display(),
                stats.directory_count,
                stats.file_count,
                stats.total_bytes
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckLog {
            log,
            pattern,
            regex,
            tail,
        } => {
            let pattern = build_pattern(&pattern, regex)?;
            let window = tail.map_or(ScanWindow::FullFile, ScanWindow::TailN);
            let scan = LogMatcher::new(window).scan_file(&log, &pattern)?;
            Ok(report_scan(&log, &pattern, &scan))
        }
        Command::Wait {
            log,
            pattern,
            regex,
            timeout,
            interval,
        } => {
            let pattern = build_pattern(&pattern, regex)?;
            let outcome = JobWaiter::new(Duration::from_secs(timeout), Duration::from_secs(interval))
                .wait_for(&log, &pattern)?;
            if outcome.matched {
                println!("{pattern} appeared in {} after {} poll(s)", log.display(), outcome.polls);
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{pattern} did not appear in {} within {timeout}s", log.display());
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Report { results, out } => {
            let saved = read_results(&results)?;
            write_html_report(&out, &saved)?;
            let summary = saved.summary();
            println!(
                "{} ({}% success), report written to {}",
                summary.overall_outcome,
                summary.success_rate_percent,
                out.display()
            );
            Ok(to_exit_code(exit_code(&summary)))
        }
    }
}

fn run(plan: &Path, results: Option<PathBuf>, report: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let cfg = HarnessConfig::load(plan)?;
    let controller = controller_from_settings(&cfg.service);
    let run = Runner::new(&cfg, controller.as_ref())
        .run()
        .context("test run aborted")?;

    let saved = ResultsFile::new(run.service_health, run.service_details, run.results);
    let results_path = results.unwrap_or_else(|| cfg.harness.results_json.clone());
    let report_path = report.unwrap_or_else(|| cfg.harness.report_html.clone());
    write_results(&results_path, &saved)?;
    write_html_report(&report_path, &saved)?;

    let summary = saved.summary();
    for test in &summary.per_test {
        println!("{:<12} {}: {}", test.outcome.to_string(), test.name, test.details);
    }
    println!(
        "{} ({}% success, {} of {} checks)",
        summary.overall_outcome,
        summary.success_rate_percent,
        summary.counts.success,
        summary.counts.total
    );
    Ok(to_exit_code(exit_code(&summary)))
}

fn build_pattern(pattern: &str, regex: bool) -> anyhow::Result<Pattern> {
    if regex {
        Ok(Pattern::regex(pattern)?)
    } else {
        Ok(Pattern::contains(pattern))
    }
}

fn report_scan(log: &Path, pattern: &Pattern, scan: &LogScan) -> ExitCode {
    match scan {
        LogScan::Missing => {
            println!("{} does not exist", log.display());
            ExitCode::FAILURE
        }
        LogScan::Incomplete {
            lines_seen,
            required,
        } => {
            println!("{} has {lines_seen} line(s), {required} needed", log.display());
            ExitCode::FAILURE
        }
        LogScan::Searched(result) if result.found => {
            println!(
                "{pattern} matched line {}: {}",
                result.line_number.unwrap_or_default(),
                result.matched_line.as_deref().unwrap_or_default()
            );
            ExitCode::SUCCESS
        }
        LogScan::Searched(result) => {
            println!(
                "{pattern} not found in {} ({} line(s) searched)",
                result.scan_window, result.searched_line_count
            );
            ExitCode::FAILURE
        }
    }
}

fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_tracing(debug: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if debug { "debug" } else { "info" })
    });

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
    }
    Ok(())
}
