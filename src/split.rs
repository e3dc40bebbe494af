//! Copying a range of records into a smaller file.
//!
//! Only well-formed records are numbered and copied; malformed spans in
//! between are skipped and counted in the summary. Records are re-serialized
//! through [`MarcWriter`], so the output is always clean ISO 2709 even when the
//! input was not.

use crate::config::RunConfig;
use crate::error::Result;
use crate::reader::{ReadOutcome, ReadSummary, StreamReader};
use crate::writer::MarcWriter;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// What a split produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitReport {
    /// Reader totals up to where the split stopped.
    pub summary: ReadSummary,
    /// Records written to the output.
    pub records_written: usize,
}

/// Copy the records selected by `config.range` from `config.input` to
/// `output`, stopping as soon as the last wanted record is written.
///
/// # Errors
///
/// Returns an error if either file cannot be opened, reading fails, or a
/// record cannot be written.
pub fn split_file(config: &RunConfig, output: impl AsRef<Path>) -> Result<SplitReport> {
    let sink = BufWriter::new(File::create(output.as_ref())?);
    split_into(config, sink)
}

/// Like [`split_file`], writing to any destination.
///
/// # Errors
///
/// Same as [`split_file`].
pub fn split_into<W: Write>(config: &RunConfig, sink: W) -> Result<SplitReport> {
    let mut reader = StreamReader::open(&config.input, config.reader_options())?;
    let mut writer = MarcWriter::new(sink);

    let mut seen = 0u64;
    while let Some(outcome) = reader.read_outcome()? {
        let ReadOutcome::Record { record, .. } = outcome else {
            continue;
        };
        seen += 1;
        config.report_progress(seen);
        if !config.range.contains(seen) {
            continue;
        }
        writer.write_record(&record)?;
        if config.range.is_last(seen) {
            break;
        }
    }
    writer.finish()?;

    let report = SplitReport {
        summary: reader.summary().clone(),
        records_written: writer.records_written(),
    };
    info!(
        read = seen,
        written = report.records_written,
        malformed = report.summary.malformed,
        "split finished"
    );
    Ok(report)
}
