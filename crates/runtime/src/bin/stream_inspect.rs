//! Decodes a recorded action stream and prints what every record did.
//!
//! The stream is replayed in a session built from a RON config, so unit ids
//! resolve against the same starting world the recording was made on.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lockstep_core::Frame;
use lockstep_runtime::inspect::{self, Report};
use lockstep_runtime::{RuntimeConfig, Session, logging};

/// Inspect a frame-gated action stream
#[derive(Parser)]
#[command(name = "stream-inspect")]
#[command(about = "Replay and print a recorded lockstep action stream", long_about = None)]
#[command(version)]
struct Cli {
    /// Recorded stream file
    #[arg(value_name = "STREAM")]
    stream: PathBuf,

    /// Session config (RON); built-in defaults when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop before this frame (defaults to one past the last block)
    #[arg(short, long, value_name = "FRAME")]
    until: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Limit number of records listed (0 = unlimited)
    #[arg(short, long, default_value = "100")]
    limit: usize,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Counts per player and per command kind
    Summary,
    /// One line per record
    List,
    /// Full JSON report
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    // A subscriber may already be installed when embedded; that is fine.
    let _ = logging::init(&config.log_filter);

    let stream = std::fs::read(&cli.stream)
        .with_context(|| format!("reading stream {}", cli.stream.display()))?;
    let session = Session::from_config(config).context("building session")?;
    let report = inspect::inspect(session, &stream, cli.until.map(Frame))
        .with_context(|| format!("replaying {}", cli.stream.display()))?;

    match cli.format {
        OutputFormat::Summary => print_summary(&report),
        OutputFormat::List => print_list(&report, cli.limit),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn print_summary(report: &Report) {
    println!("Frames:     {}", report.frames);
    println!("Blocks:     {}", report.blocks);
    println!("Records:    {}", report.records.len());
    println!("State hash: {}", report.state_hash);
    println!();

    println!("Players:");
    for (owner, counts) in &report.players {
        println!(
            "  P{owner:<3} total {:>6}  succeeded {:>6}",
            counts.total, counts.succeeded
        );
    }
    println!();

    println!("Commands:");
    let mut kinds: Vec<_> = report.kinds.iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (kind, count) in kinds {
        println!("  {:<24} {count:>6}", kind.to_string());
    }
}

fn print_list(report: &Report, limit: usize) {
    let limit = if limit == 0 { usize::MAX } else { limit };
    for record in report.records.iter().take(limit) {
        println!(
            "{:>8}  {:<4} {:<24} {}",
            record.frame.0,
            record.owner.to_string(),
            record.kind.to_string(),
            if record.success { "ok" } else { "rejected" }
        );
    }
    if report.records.len() > limit {
        println!("... {} more", report.records.len() - limit);
    }
}
