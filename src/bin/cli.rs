//! Binary entry point for the radiograph bulk loader.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;
use neo4rs::{ConfigBuilder, Graph};
use tracing_subscriber::EnvFilter;

use radiograph::loader::{
    LoadReport, Loader, LoaderOptions, RecordFailure, DEFAULT_CHUNK_SIZE, DEFAULT_ERROR_SAMPLES,
};
use radiograph::mapper::map_record;
use radiograph::schema::ensure_constraints;
use radiograph::source::CsvSource;
use radiograph::LoadError;

#[derive(Parser, Debug)]
#[command(
    name = "radiograph",
    version,
    about = "Bulk-load radio airplay CSV exports into a Neo4j property graph",
    disable_help_subcommand = true
)]
struct Cli {
    /// CSV file to ingest.
    #[arg(value_name = "CSV")]
    input: PathBuf,

    /// Bolt URI of the target store.
    #[arg(long, env = "NEO4J_URI", default_value = "neo4j://localhost:7687")]
    uri: String,

    /// Store user.
    #[arg(long, env = "NEO4J_USER", default_value = "neo4j")]
    user: String,

    /// Store password.
    #[arg(long, env = "NEO4J_PASSWORD", hide_env_values = true, default_value = "")]
    password: String,

    /// Target database name.
    #[arg(long, env = "NEO4J_DB", default_value = "neo4j")]
    database: String,

    /// Records committed per transaction.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Run chunks on concurrent workers, each with its own transaction.
    #[arg(long)]
    parallel: bool,

    /// Maximum per-record failure samples shown in the summary.
    #[arg(long, default_value_t = DEFAULT_ERROR_SAMPLES)]
    error_samples: usize,

    /// CSV field delimiter.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Map and validate every record without touching the store.
    #[arg(long)]
    dry_run: bool,

    /// Output format for the run summary.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("radiograph=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let source = CsvSource::new(&cli.input).with_delimiter(parse_delimiter(cli.delimiter)?);

    if cli.dry_run {
        let report = dry_run(&source, cli.error_samples)?;
        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => {
                println!(
                    "Dry run: {} of {} records mappable ({} errors)",
                    report.records_seen - report.mapping_errors,
                    report.records_seen,
                    report.mapping_errors
                );
                print_samples(&report);
            }
        }
        return Ok(());
    }

    let config = ConfigBuilder::default()
        .uri(&cli.uri)
        .user(&cli.user)
        .password(&cli.password)
        .db(cli.database.as_str())
        .build()?;
    let graph = Graph::connect(config).await?;

    let schema = ensure_constraints(&graph).await?;
    if schema.preexisting > 0 {
        println!(
            "{} of {} constraints already existed",
            schema.preexisting,
            schema.ensured + schema.preexisting
        );
    }

    let loader = Loader::new(
        graph,
        LoaderOptions {
            chunk_size: cli.chunk_size,
            parallel: cli.parallel,
            error_samples: cli.error_samples,
        },
    );

    let stop = loader.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received, stopping after the current chunk");
            stop.store(true, Ordering::Relaxed);
        }
    });

    let progress = ProgressBar::new_spinner();
    progress.enable_steady_tick(Duration::from_millis(120));
    let counter = progress.clone();
    let records = source.records()?.inspect(move |_| counter.inc(1));

    let report = loader.run(records).await?;
    progress.finish_and_clear();

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!(
                "Loaded {} of {} records in {} chunks ({} mapping errors, {} upsert errors)",
                report.records_loaded,
                report.records_seen,
                report.chunks_committed,
                report.mapping_errors,
                report.upsert_errors
            );
            print_samples(&report);
        }
    }
    Ok(())
}

fn print_samples(report: &LoadReport) {
    for failure in &report.samples {
        println!("  record {}: {}", failure.record, failure.reason);
    }
}

fn parse_delimiter(delimiter: char) -> Result<u8, LoadError> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(LoadError::InvalidArgument(format!(
            "delimiter must be a single ASCII character, got {delimiter:?}"
        )))
    }
}

/// Maps every record without opening a store connection. The report
/// carries the would-be mapping errors; nothing is loaded.
fn dry_run(source: &CsvSource, sample_cap: usize) -> Result<LoadReport, Box<dyn Error>> {
    let mut report = LoadReport::default();

    for item in source.records()? {
        report.records_seen += 1;
        let outcome = match item {
            Ok(record) => map_record(&record).map(|_| ()).map_err(|e| e.to_string()),
            Err(err) => Err(format!("unreadable row: {err}")),
        };
        if let Err(reason) = outcome {
            report.mapping_errors += 1;
            if report.samples.len() < sample_cap {
                report.samples.push(RecordFailure {
                    record: report.records_seen,
                    reason,
                });
            }
        }
    }
    Ok(report)
}
