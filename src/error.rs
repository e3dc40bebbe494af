//! Error types for MARC operations.
//!
//! Two families live here:
//!
//! - [`ParseError`] describes why one record could not be read. These are
//!   per-record and recoverable: the stream reader reports them as the cause of
//!   a [`Malformed`](crate::reader::ReadOutcome::Malformed) outcome and moves on.
//! - [`MarcError`] is what public operations return. [`MarcError::Io`] is the
//!   fatal class; the writer's variants are caller errors raised when a record
//!   cannot be serialized.

use thiserror::Error;

/// Why a single record could not be read.
///
/// Offsets carried by the variants are relative to the start of the record
/// being read, so they stay meaningful when printed next to the record's span.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than 24 bytes were left for the leader.
    #[error("truncated leader: only {available} of 24 bytes available")]
    TruncatedLeader {
        /// Bytes that could be read.
        available: usize,
    },

    /// The record length or base address field holds something other than ASCII digits.
    #[error("invalid digits in leader {field}: {found:?}")]
    InvalidLeaderDigits {
        /// Which leader field failed (`record length` or `base address`).
        field: &'static str,
        /// The raw bytes, lossily rendered.
        found: String,
    },

    /// The directory terminator does not sit right before the declared base address.
    #[error("directory ends at {directory_end} but leader declares base address {base_address}")]
    DirectoryBaseMismatch {
        /// Offset of the first byte after the directory terminator.
        directory_end: usize,
        /// Base address declared in the leader.
        base_address: usize,
    },

    /// No field terminator was found inside the declared record length.
    #[error("truncated directory: no field terminator within {searched} bytes")]
    TruncatedDirectory {
        /// Number of directory bytes examined.
        searched: usize,
    },

    /// A directory entry has a non-numeric length or start position.
    #[error("invalid directory entry {index} for tag {tag}: {found:?}")]
    InvalidDirectoryEntry {
        /// Zero-based index of the entry.
        index: usize,
        /// Tag of the entry, lossily rendered.
        tag: String,
        /// The raw 12 bytes, lossily rendered.
        found: String,
    },

    /// A field's slice reaches past the end of the record body.
    #[error("field {tag} slice [{start}, {end}) exceeds record body of {body_len} bytes")]
    FieldSliceOutOfRange {
        /// Tag of the offending field.
        tag: String,
        /// Absolute start of the slice within the record.
        start: usize,
        /// Absolute end of the slice within the record.
        end: usize,
        /// Length of the record as read.
        body_len: usize,
    },

    /// A field slice does not end with a field terminator.
    #[error("field {tag} is not terminated by a field terminator")]
    MissingFieldTerminator {
        /// Tag of the offending field.
        tag: String,
    },

    /// Field content is not valid text under the strict decoding policy.
    #[error("field {tag} holds invalid UTF-8 at byte {offset}")]
    TextDecodingError {
        /// Tag of the offending field.
        tag: String,
        /// Offset of the first invalid byte, relative to the record start.
        offset: usize,
    },

    /// The record's byte count does not agree with the leader.
    #[error("record length mismatch: leader declares {declared}, found {actual}")]
    RecordLengthMismatch {
        /// Length declared in the leader.
        declared: usize,
        /// Length actually available or implied by the field data.
        actual: usize,
    },

    /// The last byte of the record is not the record terminator.
    #[error("missing record terminator: found byte {found:#04x}")]
    MissingRecordTerminator {
        /// The byte found where the terminator belongs.
        found: u8,
    },
}

impl ParseError {
    /// True if the failure suggests the declared record length is wrong, so
    /// the byte at `start + record_length` is no better a guess than any other.
    #[must_use]
    pub fn doubts_record_length(&self) -> bool {
        matches!(
            self,
            ParseError::TruncatedDirectory { .. }
                | ParseError::FieldSliceOutOfRange { .. }
                | ParseError::MissingFieldTerminator { .. }
                | ParseError::RecordLengthMismatch { .. }
                | ParseError::MissingRecordTerminator { .. }
        )
    }
}

/// A [`ParseError`] together with the offset, relative to the record start,
/// where reading stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// What went wrong.
    pub cause: ParseError,
    /// Offset within the record at which the problem was detected.
    pub offset: usize,
}

impl ParseFailure {
    /// Attach an offset to a cause.
    #[must_use]
    pub fn new(cause: ParseError, offset: usize) -> Self {
        ParseFailure { cause, offset }
    }
}

impl From<ParseError> for ParseFailure {
    /// Failures detected before anything was consumed sit at offset 0.
    fn from(cause: ParseError) -> Self {
        ParseFailure { cause, offset: 0 }
    }
}

/// Error type for all MARC library operations.
#[derive(Error, Debug)]
pub enum MarcError {
    /// The directory would push the base address past five digits.
    #[error("too many fields: {fields} fields need base address {base_address}, limit is 99999")]
    FieldCountOverflow {
        /// Number of fields in the record.
        fields: usize,
        /// Base address the directory would require.
        base_address: usize,
    },

    /// The serialized record would exceed the five-digit record length.
    #[error("record too large: {length} bytes, limit is 99999")]
    RecordTooLarge {
        /// Length the record would have.
        length: usize,
    },

    /// A single field would exceed the four-digit directory length.
    #[error("field {tag} too long: {length} bytes, limit is 9999")]
    FieldTooLong {
        /// Tag of the field.
        tag: String,
        /// Serialized length including its terminator.
        length: usize,
    },

    /// A subfield code does not fit in a single byte.
    #[error("field {tag}: subfield code {code:?} does not fit in one byte")]
    InvalidSubfieldCode {
        /// Tag of the field.
        tag: String,
        /// The offending code.
        code: char,
    },

    /// An indicator does not fit in a single byte.
    #[error("field {tag}: indicator {indicator:?} does not fit in one byte")]
    InvalidIndicator {
        /// Tag of the field.
        tag: String,
        /// The offending indicator.
        indicator: char,
    },

    /// Write attempted after [`finish`](crate::writer::MarcWriter::finish).
    #[error("cannot write to a finished writer")]
    WriterFinished,

    /// IO error from the underlying source or destination.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing extracted rows failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Rendering a record as JSON failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_messages_name_the_problem() {
        let err = ParseError::FieldSliceOutOfRange {
            tag: "245".to_string(),
            start: 37,
            end: 120,
            body_len: 90,
        };
        assert_eq!(
            err.to_string(),
            "field 245 slice [37, 120) exceeds record body of 90 bytes"
        );

        let err = ParseError::MissingRecordTerminator { found: 0x41 };
        assert_eq!(err.to_string(), "missing record terminator: found byte 0x41");
    }

    #[test]
    fn test_length_doubt() {
        let mismatch = ParseError::RecordLengthMismatch {
            declared: 120,
            actual: 90,
        };
        assert!(mismatch.doubts_record_length());
        assert!(ParseError::MissingRecordTerminator { found: b'x' }.doubts_record_length());
        let decoding = ParseError::TextDecodingError {
            tag: "245".to_string(),
            offset: 40,
        };
        assert!(!decoding.doubts_record_length());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: MarcError = io.into();
        assert!(matches!(err, MarcError::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }
}
