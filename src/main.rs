//! Command-line front end: count, extract from, or split a MARC file.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use marc_resync::config::DEFAULT_PROGRESS_INTERVAL;
use marc_resync::{
    extract_file, read_span, split_file, ByteSpan, ReadOutcome, ReadSummary, RecordRange,
    ResyncStrategy, RunConfig, StreamReader, TextPolicy,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Bytes of a malformed span shown in debug output.
const SEGMENT_PREVIEW: u64 = 200;

#[derive(Debug, Parser)]
#[command(name = "marc-resync", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read the whole file and report good records and malformed spans.
    Count(CommonArgs),
    /// Write title, bib id and item id of each record as CSV.
    Extract(CommonArgs),
    /// Copy a range of records into a new file.
    Split(CommonArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// MARC file to read.
    #[arg(long, env = "MARC_RESYNC_INPUT")]
    input: PathBuf,

    /// Output file. Extract writes to stdout without it.
    #[arg(long, env = "MARC_RESYNC_OUTPUT")]
    output: Option<PathBuf>,

    /// First record number to act on (1-based).
    #[arg(long, default_value_t = 1)]
    start: u64,

    /// Last record number to act on, inclusive.
    #[arg(long)]
    end: Option<u64>,

    /// Text decoding policy: strict, lossy or raw.
    #[arg(long, default_value_t = TextPolicy::Lossy)]
    policy: TextPolicy,

    /// How to find the next record after a malformed one.
    #[arg(long, default_value_t = ResyncStrategy::DeclaredLengthFirst)]
    resync: ResyncStrategy,

    /// Byte offset to start reading at.
    #[arg(long, default_value_t = 0)]
    start_offset: u64,

    /// Records between progress messages; 0 turns them off.
    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    progress: u64,

    /// Log filter, e.g. `debug` or `marc_resync=trace`.
    #[arg(long, env = "MARC_RESYNC_LOG", default_value = "info")]
    log_level: String,
}

impl CommonArgs {
    fn into_config(self) -> anyhow::Result<RunConfig> {
        let range = RecordRange::new(self.start, self.end).map_err(anyhow::Error::msg)?;
        Ok(RunConfig {
            input: self.input,
            output: self.output,
            range,
            text_policy: self.policy,
            resync: self.resync,
            start_offset: self.start_offset,
            progress_interval: self.progress,
        })
    }
}

fn init_logging(filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .with_context(|| format!("invalid log filter {filter:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn print_summary(summary: &ReadSummary) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, summary)?;
    writeln!(out)?;
    Ok(())
}

/// Log the first bytes of a malformed span for manual review.
fn log_segment(source: &mut File, span: ByteSpan) -> anyhow::Result<()> {
    let preview = span.truncated(SEGMENT_PREVIEW);
    let bytes = read_span(source, preview)?;
    tracing::debug!(
        %span,
        truncated = preview.end < span.end,
        segment = %String::from_utf8_lossy(&bytes),
        "segment to review"
    );
    Ok(())
}

fn count(config: &RunConfig) -> anyhow::Result<()> {
    let mut reader = StreamReader::open(&config.input, config.reader_options())
        .with_context(|| format!("opening {}", config.input.display()))?;
    tracing::debug!(options = ?reader.options(), "counting records");

    let mut review = if tracing::enabled!(Level::DEBUG) {
        Some(File::open(&config.input)?)
    } else {
        None
    };
    let mut records = 0u64;
    while let Some(outcome) = reader.read_outcome()? {
        match outcome {
            ReadOutcome::Record { .. } => {
                records += 1;
                config.report_progress(records);
            },
            ReadOutcome::Malformed { span, .. } => {
                if let Some(source) = review.as_mut() {
                    log_segment(source, span)?;
                }
            },
        }
    }
    print_summary(reader.summary())
}

fn extract(config: &RunConfig) -> anyhow::Result<()> {
    let summary = match &config.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            extract_file(config, BufWriter::new(file))?
        },
        None => extract_file(config, io::stdout().lock())?,
    };
    tracing::info!(
        records = summary.records,
        malformed = summary.malformed,
        "extract finished"
    );
    if config.output.is_some() {
        print_summary(&summary)?;
    }
    Ok(())
}

fn split(config: &RunConfig) -> anyhow::Result<()> {
    let Some(output) = &config.output else {
        bail!("split needs --output");
    };
    let report = split_file(config, output)
        .with_context(|| format!("splitting {}", config.input.display()))?;
    print_summary(&report.summary)
}

fn run(args: CommonArgs, command: fn(&RunConfig) -> anyhow::Result<()>) -> anyhow::Result<()> {
    init_logging(&args.log_level)?;
    let config = args.into_config()?;
    tracing::debug!(?config, "resolved configuration");
    command(&config)
}

fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Command::Count(args) => run(args, count),
        Command::Extract(args) => run(args, extract),
        Command::Split(args) => run(args, split),
    }
}
