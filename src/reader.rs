//! Reading MARC records from binary streams, resynchronizing past damage.
//!
//! [`StreamReader`] walks a seekable source from start to end and yields one
//! [`ReadOutcome`] per attempt: either a well-formed [`Record`] or a
//! [`Malformed`](ReadOutcome::Malformed) descriptor naming the byte span that
//! could not be read and why. A bad record never stops the pass; only an I/O
//! failure of the source does.
//!
//! The spans of all outcomes tile `[start_offset, stream_length)` exactly, so a
//! caller can always tell which bytes became records and which did not.
//!
//! # Examples
//!
//! ```
//! use marc_resync::{ReadOutcome, StreamReader};
//! use std::io::Cursor;
//!
//! let mut reader = StreamReader::new(Cursor::new(b"not a marc file".to_vec()))?;
//! for outcome in reader.by_ref() {
//!     match outcome? {
//!         ReadOutcome::Record { record, span } => println!("{span}: {} fields", record.len()),
//!         ReadOutcome::Malformed { span, cause, .. } => println!("{span}: {cause}"),
//!     }
//! }
//! assert_eq!(reader.summary().malformed, 1);
//! # Ok::<(), marc_resync::MarcError>(())
//! ```

use crate::assembler::assemble_record;
use crate::cursor::{ByteCursor, ByteSpan};
use crate::directory::parse_directory;
use crate::encoding::TextPolicy;
use crate::error::{ParseError, ParseFailure, Result};
use crate::leader::{has_leader_digits, Leader, LEADER_LEN};
use crate::record::{Record, RECORD_TERMINATOR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, trace, warn};

/// Bytes examined per window while scanning forward for a record start.
const SCAN_WINDOW: usize = 64 * 1024;

/// How the reader looks for the next record after a malformed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResyncStrategy {
    /// Test every byte after the failed start.
    ByteScan,
    /// Try the offset the damaged leader declared first, then fall back to a
    /// byte scan (default).
    #[default]
    DeclaredLengthFirst,
}

impl fmt::Display for ResyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResyncStrategy::ByteScan => "byte-scan",
            ResyncStrategy::DeclaredLengthFirst => "declared-length-first",
        })
    }
}

impl FromStr for ResyncStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "byte-scan" => Ok(ResyncStrategy::ByteScan),
            "declared-length-first" => Ok(ResyncStrategy::DeclaredLengthFirst),
            other => Err(format!(
                "unknown resync strategy {other:?}, expected byte-scan or declared-length-first"
            )),
        }
    }
}

/// Options for [`StreamReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReaderOptions {
    /// How field bytes are turned into text.
    pub text_policy: TextPolicy,
    /// How to find the next record after a malformed one.
    pub resync: ResyncStrategy,
    /// Absolute offset to start reading from, for resumed processing.
    pub start_offset: u64,
}

impl ReaderOptions {
    /// Set the text decoding policy.
    #[must_use]
    pub fn with_text_policy(mut self, policy: TextPolicy) -> Self {
        self.text_policy = policy;
        self
    }

    /// Set the resynchronization strategy.
    #[must_use]
    pub fn with_resync(mut self, resync: ResyncStrategy) -> Self {
        self.resync = resync;
        self
    }

    /// Start reading at `offset` instead of the beginning of the stream.
    /// The offset is trusted to be a record start.
    #[must_use]
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }
}

/// One unit of reader output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A well-formed record and the bytes it occupied.
    Record {
        /// The assembled record.
        record: Record,
        /// Bytes the record was read from.
        span: ByteSpan,
    },
    /// Bytes that could not be read as a record.
    Malformed {
        /// From the failed attempt's start up to where reading resumed.
        span: ByteSpan,
        /// Absolute offset where the attempt failed. When the next record was
        /// found inside the bytes already read this can lie past `span.end`.
        failed_at: u64,
        /// Why the attempt failed.
        cause: ParseError,
    },
}

impl ReadOutcome {
    /// The byte span this outcome accounts for.
    #[must_use]
    pub fn span(&self) -> ByteSpan {
        match self {
            ReadOutcome::Record { span, .. } | ReadOutcome::Malformed { span, .. } => *span,
        }
    }

    /// The record, if this outcome holds one.
    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        match self {
            ReadOutcome::Record { record, .. } => Some(record),
            ReadOutcome::Malformed { .. } => None,
        }
    }

    /// Take the record out, if this outcome holds one.
    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            ReadOutcome::Record { record, .. } => Some(record),
            ReadOutcome::Malformed { .. } => None,
        }
    }

    /// True for [`ReadOutcome::Malformed`].
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, ReadOutcome::Malformed { .. })
    }
}

/// Running totals for one pass over a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSummary {
    /// Well-formed records read.
    pub records: usize,
    /// Malformed spans reported.
    pub malformed: usize,
    /// Bytes covered by malformed spans.
    pub malformed_bytes: u64,
    /// Every malformed span, in stream order.
    pub spans: Vec<ByteSpan>,
}

impl ReadSummary {
    fn count(&mut self, outcome: &ReadOutcome) {
        match outcome {
            ReadOutcome::Record { .. } => self.records += 1,
            ReadOutcome::Malformed { span, .. } => {
                self.malformed += 1;
                self.malformed_bytes += span.len();
                self.spans.push(*span);
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Positioned at a presumed record start.
    Scanning,
    /// An attempt is in progress at this offset.
    Reading(u64),
    /// End of stream, or a fatal I/O error.
    Done,
}

/// Pull-based reader producing one [`ReadOutcome`] per call.
#[derive(Debug)]
pub struct StreamReader<R> {
    cursor: ByteCursor<R>,
    options: ReaderOptions,
    state: State,
    buf: Vec<u8>,
    window: Vec<u8>,
    probe: Vec<u8>,
    summary: ReadSummary,
}

impl StreamReader<File> {
    /// Open a file for reading. The handle is closed when the reader drops.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or seeked.
    pub fn open(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        StreamReader::with_options(file, options)
    }
}

impl<R: Read + Seek> StreamReader<R> {
    /// Create a reader with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be seeked.
    pub fn new(source: R) -> Result<Self> {
        StreamReader::with_options(source, ReaderOptions::default())
    }

    /// Create a reader with the given options.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be seeked.
    pub fn with_options(source: R, options: ReaderOptions) -> Result<Self> {
        let mut cursor = ByteCursor::new(source)?;
        let start = options.start_offset.min(cursor.len());
        cursor.seek_to(start)?;
        Ok(StreamReader {
            cursor,
            options,
            state: State::Scanning,
            buf: Vec::new(),
            window: Vec::new(),
            probe: Vec::new(),
            summary: ReadSummary::default(),
        })
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> &ReadSummary {
        &self.summary
    }

    /// Current absolute offset in the stream.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Give back the wrapped source.
    pub fn into_inner(self) -> R {
        self.cursor.into_inner()
    }

    /// Produce the next outcome, or `None` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Only I/O failures of the source are returned as errors. After one, the
    /// reader is finished and keeps returning `Ok(None)`.
    pub fn read_outcome(&mut self) -> Result<Option<ReadOutcome>> {
        let next = self.advance();
        match &next {
            Ok(Some(outcome)) => self.summary.count(outcome),
            Ok(None) => {},
            Err(err) => {
                warn!(offset = self.cursor.position(), error = %err, "read aborted");
                self.state = State::Done;
            },
        }
        next.map_err(Into::into)
    }

    fn advance(&mut self) -> std::io::Result<Option<ReadOutcome>> {
        loop {
            match self.state {
                State::Done => return Ok(None),
                State::Scanning => {
                    if self.cursor.remaining() == 0 {
                        self.state = State::Done;
                        info!(
                            records = self.summary.records,
                            malformed = self.summary.malformed,
                            malformed_bytes = self.summary.malformed_bytes,
                            "end of stream"
                        );
                        return Ok(None);
                    }
                    self.state = State::Reading(self.cursor.position());
                },
                State::Reading(start) => {
                    let outcome = self.attempt(start)?;
                    self.state = State::Scanning;
                    return Ok(Some(outcome));
                },
            }
        }
    }

    /// Read one record at `start`, resynchronizing on failure. Leaves the
    /// cursor at the end of the returned span.
    fn attempt(&mut self, start: u64) -> std::io::Result<ReadOutcome> {
        self.buf.clear();
        self.cursor.read_up_to(&mut self.buf, LEADER_LEN)?;
        let declared = match Leader::from_bytes(&self.buf) {
            Ok(leader) => {
                let rest = (leader.record_length as usize).saturating_sub(LEADER_LEN);
                self.cursor.read_up_to(&mut self.buf, rest)?;
                Some(u64::from(leader.record_length))
            },
            Err(_) => None,
        };

        let failure = match assemble_record(&self.buf, self.options.text_policy) {
            Ok(record) => {
                let span = ByteSpan::new(start, self.cursor.position());
                return Ok(ReadOutcome::Record { record, span });
            },
            Err(failure) => failure,
        };

        let ParseFailure { cause, offset } = failure;
        let failed_at = start + offset as u64;
        // Jump by the declared length only when it ends on a record
        // terminator and the failure did not involve the length itself.
        let confirmed = declared.filter(|&d| {
            self.buf.len() as u64 == d
                && self.buf.last() == Some(&RECORD_TERMINATOR)
                && !cause.doubts_record_length()
        });
        let resume = self.resync(start, confirmed)?;
        self.cursor.seek_to(resume)?;
        let span = ByteSpan::new(start, resume);
        debug!(
            start = span.start,
            end = span.end,
            failed_at,
            cause = %cause,
            "malformed record"
        );
        Ok(ReadOutcome::Malformed {
            span,
            failed_at,
            cause,
        })
    }

    /// Find where reading should resume after a failure at `start`. Returns
    /// the stream length when no plausible record start remains.
    ///
    /// `confirmed` is the record length, if the failed record still ended on a
    /// terminator where its leader said it would.
    fn resync(&mut self, start: u64, confirmed: Option<u64>) -> std::io::Result<u64> {
        if self.options.resync == ResyncStrategy::DeclaredLengthFirst {
            if let Some(jump) = confirmed.filter(|&d| d > 0).map(|d| start + d) {
                if jump == self.cursor.len() {
                    return Ok(jump);
                }
                if jump < self.cursor.len() && self.is_plausible_start(jump)? {
                    trace!(offset = jump, "resynchronized at declared length");
                    return Ok(jump);
                }
            }
        }
        if let Some(found) = self.scan_forward(start + 1)? {
            return Ok(found);
        }
        let end = self.cursor.len();
        warn!(start, end, "no record start found before end of stream");
        Ok(end)
    }

    /// Byte-by-byte search for the first plausible record start at or after
    /// `from`, one window at a time.
    fn scan_forward(&mut self, from: u64) -> std::io::Result<Option<u64>> {
        let len = self.cursor.len();
        let mut window_start = from;
        while window_start + LEADER_LEN as u64 <= len {
            let mut window = std::mem::take(&mut self.window);
            self.cursor.read_at(window_start, SCAN_WINDOW, &mut window)?;

            let mut found = None;
            let candidates = window.len().saturating_sub(LEADER_LEN - 1);
            for i in 0..candidates {
                if !has_leader_digits(&window[i..]) {
                    continue;
                }
                let offset = window_start + i as u64;
                if self.is_plausible_start(offset)? {
                    found = Some(offset);
                    break;
                }
            }
            self.window = window;

            if found.is_some() {
                return Ok(found);
            }
            if candidates == 0 {
                break;
            }
            window_start += candidates as u64;
        }
        Ok(None)
    }

    /// A plausible record start has a leader with digits where the lengths
    /// belong and a directory that parses up to the declared base address.
    fn is_plausible_start(&mut self, offset: u64) -> std::io::Result<bool> {
        let mut probe = std::mem::take(&mut self.probe);
        self.cursor.read_at(offset, LEADER_LEN, &mut probe)?;

        let plausible = match Leader::from_bytes(&probe) {
            Ok(leader) => {
                let base = leader.data_base_address as usize;
                let want = (leader.record_length as usize)
                    .min(base + 1)
                    .saturating_sub(LEADER_LEN);
                self.cursor.read_up_to(&mut probe, want)?;
                match parse_directory(&probe, &leader) {
                    Ok(_) => true,
                    Err(failure) => {
                        trace!(offset, cause = %failure.cause, "resync candidate rejected");
                        false
                    },
                }
            },
            Err(_) => false,
        };

        self.probe = probe;
        Ok(plausible)
    }
}

impl<R: Read + Seek> Iterator for StreamReader<R> {
    type Item = Result<ReadOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_outcome().transpose()
    }
}

impl<R: Read + Seek> std::iter::FusedIterator for StreamReader<R> {}
