//! Resolved run configuration.
//!
//! Nothing here reads the environment or the command line; the binary does
//! that and hands over finished values.

use crate::encoding::TextPolicy;
use crate::reader::{ReaderOptions, ResyncStrategy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of records between progress events.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

/// A 1-based, inclusive range of well-formed record numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRange {
    /// First record to include.
    pub start: u64,
    /// Last record to include; `None` runs to the end of the stream.
    pub end: Option<u64>,
}

impl Default for RecordRange {
    fn default() -> Self {
        RecordRange {
            start: 1,
            end: None,
        }
    }
}

impl RecordRange {
    /// Build a range, rejecting a zero start or an end before the start.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem.
    pub fn new(start: u64, end: Option<u64>) -> Result<Self, String> {
        if start == 0 {
            return Err("record numbers start at 1".to_string());
        }
        if let Some(end) = end.filter(|&end| end < start) {
            return Err(format!("range end {end} is before start {start}"));
        }
        Ok(RecordRange { start, end })
    }

    /// True if record number `n` falls inside the range.
    #[must_use]
    pub fn contains(&self, n: u64) -> bool {
        n >= self.start && self.end.map_or(true, |end| n <= end)
    }

    /// True once record number `n` is the last one the range wants.
    #[must_use]
    pub fn is_last(&self, n: u64) -> bool {
        self.end.is_some_and(|end| n >= end)
    }
}

/// Everything one command needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// MARC file to read.
    pub input: PathBuf,
    /// Destination file, where the command writes one.
    pub output: Option<PathBuf>,
    /// Records to act on.
    pub range: RecordRange,
    /// Text decoding policy.
    pub text_policy: TextPolicy,
    /// Resynchronization strategy.
    pub resync: ResyncStrategy,
    /// Byte offset to start reading at.
    pub start_offset: u64,
    /// Records between progress events; 0 disables them.
    pub progress_interval: u64,
}

impl RunConfig {
    /// Defaults for reading `input`.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        RunConfig {
            input: input.into(),
            output: None,
            range: RecordRange::default(),
            text_policy: TextPolicy::default(),
            resync: ResyncStrategy::default(),
            start_offset: 0,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Reader options implied by this configuration.
    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions::default()
            .with_text_policy(self.text_policy)
            .with_resync(self.resync)
            .with_start_offset(self.start_offset)
    }

    /// Emit a progress event when `records` lands on the interval.
    pub fn report_progress(&self, records: u64) {
        if self.progress_interval > 0 && records % self.progress_interval == 0 {
            tracing::info!(records, "records processed");
        }
    }
}
