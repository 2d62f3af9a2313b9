//! MacroLab CLI: fetch jobs and table summaries.
//!
//! Commands:
//! - `fetch <job>`: run `etf`, `commodities`, `macro`, `pmi`, or `all` and write CSVs
//! - `summarize <file>`: reload a written CSV and print per-series statistics

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use macrolab_core::data::{CompiledSource, FredSource, LogProgress, YahooChartSource};
use macrolab_core::read_table;
use macrolab_runner::{
    format_summary_table, numeric_series, run_jobs, series_by_key, summarize_all, JobContext,
    JobKind, JobReport, PipelineConfig, Sources,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "macrolab",
    about = "MacroLab CLI: market and macro data pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, merge, and persist one job (or all of them).
    Fetch {
        /// Which job to run.
        #[arg(value_enum)]
        job: Job,

        /// Path to a TOML config file. Built-in catalogs are used without one.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory. Overrides the config file.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Start date (YYYY-MM-DD), inclusive. Defaults to 2020-01-01.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), exclusive. Defaults to tomorrow.
        #[arg(long)]
        end: Option<String>,

        /// Delay after each request, in milliseconds.
        #[arg(long)]
        pace_ms: Option<u64>,

        /// Number of series fetched at once.
        #[arg(long)]
        jobs: Option<usize>,

        /// Retries per request (0 or 1).
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Summarize a CSV written by `fetch`.
    Summarize {
        /// CSV file with a leading Date column.
        file: PathBuf,

        /// Group rows by this column (e.g. Symbol) instead of summarizing every numeric column.
        #[arg(long)]
        key_column: Option<String>,

        /// Column summarized per key when --key-column is given.
        #[arg(long, default_value = "Close")]
        value_column: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Job {
    Etf,
    Commodities,
    Macro,
    Pmi,
    All,
}

impl Job {
    fn kinds(self) -> Vec<JobKind> {
        match self {
            Job::Etf => vec![JobKind::Etf],
            Job::Commodities => vec![JobKind::Commodities],
            Job::Macro => vec![JobKind::Macro],
            Job::Pmi => vec![JobKind::Pmi],
            Job::All => JobKind::ALL.to_vec(),
        }
    }
}

struct FetchOverrides {
    output_dir: Option<PathBuf>,
    start: Option<String>,
    end: Option<String>,
    pace_ms: Option<u64>,
    jobs: Option<usize>,
    max_retries: Option<u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            job,
            config,
            output_dir,
            start,
            end,
            pace_ms,
            jobs,
            max_retries,
        } => run_fetch(
            job,
            config,
            FetchOverrides {
                output_dir,
                start,
                end,
                pace_ms,
                jobs,
                max_retries,
            },
        ),
        Commands::Summarize {
            file,
            key_column,
            value_column,
        } => run_summarize(file, key_column, value_column),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_fetch(job: Job, config: Option<PathBuf>, overrides: FetchOverrides) -> Result<()> {
    let mut config = match config {
        Some(path) => PipelineConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = overrides.output_dir {
        config.output_dir = dir;
    }
    if let Some(start) = overrides.start.as_deref().map(parse_date).transpose()? {
        config.start = start;
    }
    if let Some(end) = overrides.end.as_deref().map(parse_date).transpose()? {
        config.end = Some(end);
    }
    if let Some(pace_ms) = overrides.pace_ms {
        config.pace_ms = pace_ms;
    }
    if let Some(jobs) = overrides.jobs {
        config.max_concurrent = jobs;
    }
    if let Some(max_retries) = overrides.max_retries {
        config.max_retries = max_retries;
    }

    let today = chrono::Local::now().date_naive();
    let progress = LogProgress;
    let ctx = JobContext::from_config(&config, today, &progress).context("invalid configuration")?;

    let settings = config.http_settings();
    let chart = YahooChartSource::new(&settings).context("building Yahoo chart client")?;
    let fred = FredSource::new(&settings).context("building FRED client")?;
    let compiled = CompiledSource::new();
    let sources = Sources {
        chart: &chart,
        fred: &fred,
        compiled: &compiled,
    };

    let reports = match run_jobs(&job.kinds(), &ctx, sources) {
        Ok(reports) => reports,
        Err(e) if e.is_write_error() => {
            eprintln!("Write failed: {e}");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    for report in &reports {
        print_report(report);
    }
    Ok(())
}

fn print_report(report: &JobReport) {
    println!();
    println!("=== {} ===", report.job);
    println!(
        "Fetched {} series ({} failed, {} warnings)",
        report.fetched,
        report.failed.len(),
        report.warnings
    );
    for failure in &report.failed {
        println!("  failed {failure}");
    }
    if report.files.is_empty() {
        println!("No files written.");
    }
    for file in &report.files {
        println!("  {} ({} rows)", file.path.display(), file.rows);
    }
    if let Some(pmi) = report.pmi {
        println!(
            "PMI months: {} expansion, {} contraction",
            pmi.expansion, pmi.contraction
        );
    }
    if !report.summaries.is_empty() {
        println!();
        print!("{}", format_summary_table(&report.summaries));
    }
}

fn run_summarize(file: PathBuf, key_column: Option<String>, value_column: String) -> Result<()> {
    let table = read_table(&file).with_context(|| format!("reading {}", file.display()))?;
    let series = match key_column.as_deref() {
        Some(key) => series_by_key(&table, key, &value_column)?,
        None => numeric_series(&table)?,
    };
    if series.is_empty() {
        println!("No numeric series in {}", file.display());
        return Ok(());
    }

    let records = summarize_all(&series)?;
    println!("{} ({} rows)", file.display(), table.len());
    print!("{}", format_summary_table(&records));
    Ok(())
}
