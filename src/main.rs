//! dupscan - concurrent duplicate file scanner.
//!
//! Usage:
//!   dupscan [DIR]...                    Scan directories, serve status on :8080
//!   dupscan -w 8 --max-size 1GB DIR     Tune workers and the size limit
//!   dupscan --no-server --format json   Scan and print full metrics as JSON
//!
//! While a scan runs, `GET /status`, `GET /metrics` and `POST /cancel` are
//! served on the listen address. Ctrl-C cancels the scan.

mod logging;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use dupscan_core::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, ScanError};
use dupscan_scan::{Pipeline, ScanConfig, ScanControl, ScanSummary};

#[derive(Parser)]
#[command(
    name = "dupscan",
    version,
    about = "Find duplicate files by content hash",
    long_about = "dupscan walks one or more directories, hashes every regular file under \
                  the size limit with SHA-256, and reports duplicate groups, per-type \
                  counts and per-file errors.\n\n\
                  A small HTTP server exposes live progress while the scan runs."
)]
struct Cli {
    /// Directories to scan
    #[arg(default_value = ".")]
    dirs: Vec<PathBuf>,

    /// Number of concurrent hashing workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Skip files larger than this (e.g., "512KB", "100MB", "1GB")
    #[arg(short, long, default_value = "100MB")]
    max_size: String,

    /// Capacity of the work and result queues
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Threads for directory traversal (0 = walk serially)
    #[arg(long, default_value_t = 0)]
    walk_threads: usize,

    /// Address for the HTTP control server
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Do not start the HTTP control server
    #[arg(long)]
    no_server: bool,

    /// Output format for the final report
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Enable debug logging (overridden by DUPSCAN_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let max_file_size = parse_size(&cli.max_size)?;
    if max_file_size == 0 {
        bail!("Maximum file size must be greater than zero");
    }

    let config = ScanConfig::builder()
        .directories(cli.dirs)
        .workers(cli.workers)
        .max_file_size(max_file_size)
        .queue_capacity(cli.queue_capacity)
        .walk_threads(cli.walk_threads)
        .build()
        .map_err(ScanError::from)
        .context("Invalid configuration")?;

    let handle = Pipeline::new(config)?.start();
    let control = handle.control();

    let shutdown = CancellationToken::new();
    let server = if cli.no_server {
        None
    } else {
        let (_, server) = server::spawn(cli.listen, control.clone(), shutdown.clone())
            .await
            .with_context(|| format!("Failed to bind control server on {}", cli.listen))?;
        Some(server)
    };

    let interrupt = tokio::spawn(cancel_on_interrupt(control.clone()));

    let summary = handle.wait().await?;

    interrupt.abort();
    shutdown.cancel();
    if let Some(server) = server {
        server.await?.context("Control server failed")?;
    }

    match cli.format {
        OutputFormat::Text => print_text(&summary, &control),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&control.metrics())?);
            eprintln!("{summary}");
        }
    }

    Ok(())
}

async fn cancel_on_interrupt(control: ScanControl) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("interrupt received, cancelling scan");
        control.cancel();
    }
}

/// Print the duplicate groups and the one-line summary.
fn print_text(summary: &ScanSummary, control: &ScanControl) {
    let metrics = control.metrics();

    println!();
    println!("{}", "─".repeat(70));
    println!(" Duplicate File Report");
    println!("{}", "─".repeat(70));
    println!();

    if metrics.duplicates.is_empty() {
        println!(" No duplicate files found.");
    } else {
        println!(
            " Found {} duplicate groups ({} extra copies)",
            summary.duplicate_groups, summary.duplicate_files
        );
        println!();
        for (i, (hash, paths)) in metrics.duplicates.iter().enumerate() {
            println!(" Group {} ({} files, sha256 {})", i + 1, paths.len(), &hash[..12]);
            for path in paths {
                println!("   {path}");
            }
            println!();
        }
    }

    for error in &metrics.errors {
        warn!(path = %error.path, "{}", error.error);
    }
    if !summary.discovery.warnings.is_empty() {
        println!(
            " {} warning(s) during discovery",
            summary.discovery.warnings.len()
        );
    }

    println!(
        " Scanned {} in {:.2}s",
        format_size(summary.total_bytes),
        summary.elapsed.as_secs_f64()
    );
    if summary.cancelled {
        println!(" Scan cancelled by user");
    } else {
        println!(" Scan completed successfully");
    }
    println!("{summary}");
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();

    let (num, multiplier) = if s.ends_with("GB") || s.ends_with('G') {
        let num: f64 = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.').parse()?;
        (num, 1024 * 1024 * 1024)
    } else if s.ends_with("MB") || s.ends_with('M') {
        let num: f64 = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.').parse()?;
        (num, 1024 * 1024)
    } else if s.ends_with("KB") || s.ends_with('K') {
        let num: f64 = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.').parse()?;
        (num, 1024)
    } else if s.ends_with('B') {
        let num: f64 = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.').parse()?;
        (num, 1)
    } else {
        let num: f64 = s.parse()?;
        (num, 1)
    };

    Ok((num * multiplier as f64) as u64)
}
