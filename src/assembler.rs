//! Field decoding and record assembly.
//!
//! [`assemble_record`] takes the bytes of one whole record (leader through
//! record terminator) and either returns a complete [`Record`] or a
//! [`ParseFailure`] saying what was wrong and where. Partial state never
//! escapes: a record is handed out only after every check has passed.

use crate::directory::{parse_directory, DirectoryEntry};
use crate::encoding::TextPolicy;
use crate::error::{ParseError, ParseFailure};
use crate::leader::{Leader, LEADER_LEN};
use crate::record::{
    DataField, Field, FieldKind, Record, Subfield, Tag, FIELD_TERMINATOR, RECORD_TERMINATOR,
    SUBFIELD_DELIMITER,
};
use smallvec::SmallVec;

/// Smallest legal record: leader, directory terminator, record terminator.
pub const MIN_RECORD_LENGTH: usize = LEADER_LEN + 2;

/// Decode one field described by `entry`.
///
/// `body_end` is the first offset that cannot hold field data: the record
/// terminator position, or the end of the bytes actually read if the record
/// was cut short.
///
/// # Errors
///
/// - [`ParseError::FieldSliceOutOfRange`] if the slice runs past `body_end`
/// - [`ParseError::MissingFieldTerminator`] if the slice does not end with one
/// - [`ParseError::TextDecodingError`] under [`TextPolicy::Strict`]
pub fn decode_field(
    record: &[u8],
    base_address: usize,
    body_end: usize,
    entry: &DirectoryEntry,
    policy: TextPolicy,
) -> Result<Field, ParseFailure> {
    let (start, end) = entry.slice_bounds(base_address);
    if end > body_end {
        return Err(ParseFailure::new(
            ParseError::FieldSliceOutOfRange {
                tag: entry.tag.to_string(),
                start,
                end,
                body_len: body_end,
            },
            start.min(body_end),
        ));
    }

    let Some((&FIELD_TERMINATOR, content)) = record[start..end].split_last() else {
        return Err(ParseFailure::new(
            ParseError::MissingFieldTerminator {
                tag: entry.tag.to_string(),
            },
            end.saturating_sub(1).max(start),
        ));
    };

    let kind = if entry.tag.is_control() {
        let value = policy
            .decode(content)
            .map_err(|at| text_error(entry.tag, start + at))?;
        FieldKind::Control(value)
    } else {
        FieldKind::Data(decode_data_field(content, start, entry.tag, policy)?)
    };

    Ok(Field {
        tag: entry.tag,
        kind,
    })
}

/// Split data-field content into indicators and subfields. `offset` is where
/// `content` starts within the record, for error reporting.
fn decode_data_field(
    content: &[u8],
    offset: usize,
    tag: Tag,
    policy: TextPolicy,
) -> Result<DataField, ParseFailure> {
    let indicator1 = content.first().map_or(' ', |&b| char::from(b));
    let indicator2 = content.get(1).map_or(' ', |&b| char::from(b));
    let rest = content.get(2..).unwrap_or_default();
    let rest_offset = offset + 2;

    let mut delimiters = memchr::memchr_iter(SUBFIELD_DELIMITER, rest).peekable();
    match delimiters.peek() {
        Some(&0) => {},
        Some(&first) => {
            tracing::debug!(%tag, skipped = first, "bytes before first subfield delimiter dropped");
        },
        None if !rest.is_empty() => {
            tracing::debug!(%tag, skipped = rest.len(), "data field without subfield delimiter");
        },
        None => {},
    }

    let mut subfields = SmallVec::new();
    while let Some(at) = delimiters.next() {
        let next = delimiters.peek().copied().unwrap_or(rest.len());
        // A delimiter with nothing after it carries no code.
        let Some((&code, value)) = rest[at + 1..next].split_first() else {
            continue;
        };
        let value_offset = rest_offset + at + 2;
        let value = policy
            .decode(value)
            .map_err(|bad| text_error(tag, value_offset + bad))?;
        subfields.push(Subfield {
            code: char::from(code),
            value,
        });
    }

    Ok(DataField {
        indicator1,
        indicator2,
        subfields,
    })
}

fn text_error(tag: Tag, offset: usize) -> ParseFailure {
    ParseFailure::new(
        ParseError::TextDecodingError {
            tag: tag.to_string(),
            offset,
        },
        offset,
    )
}

/// Assemble one record from its raw bytes.
///
/// `record` should hold exactly the declared record length. If the stream
/// ended early it may be shorter, which is reported rather than papered over.
///
/// Checks run in reading order: leader, directory, fields, then overall
/// length and the record terminator.
///
/// # Errors
///
/// Returns the first [`ParseFailure`] encountered.
pub fn assemble_record(record: &[u8], policy: TextPolicy) -> Result<Record, ParseFailure> {
    let leader = Leader::from_bytes(record)
        .map_err(|cause| ParseFailure::new(cause, record.len().min(LEADER_LEN)))?;
    let entries = parse_directory(record, &leader)?;

    let declared = leader.record_length as usize;
    let base_address = leader.data_base_address as usize;
    let body_end = declared.saturating_sub(1).min(record.len());

    let fields = entries
        .iter()
        .map(|entry| decode_field(record, base_address, body_end, entry, policy))
        .collect::<Result<Vec<_>, _>>()?;

    if record.len() < declared {
        return Err(ParseFailure::new(
            ParseError::RecordLengthMismatch {
                declared,
                actual: record.len(),
            },
            record.len(),
        ));
    }

    let data_end = entries
        .iter()
        .map(|entry| entry.slice_bounds(base_address).1)
        .max()
        .unwrap_or(base_address);
    if data_end + 1 != declared {
        return Err(ParseFailure::new(
            ParseError::RecordLengthMismatch {
                declared,
                actual: data_end + 1,
            },
            data_end,
        ));
    }

    let last = record[declared - 1];
    if last != RECORD_TERMINATOR {
        return Err(ParseFailure::new(
            ParseError::MissingRecordTerminator { found: last },
            declared - 1,
        ));
    }

    Ok(Record { leader, fields })
}
