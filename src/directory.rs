//! Record directory parsing.
//!
//! The directory follows the leader as a run of 12-byte entries
//! (3-byte tag, 4-digit length, 5-digit start offset) closed by a field
//! terminator. Its end must line up with the base address declared in the
//! leader.

use crate::error::{ParseError, ParseFailure};
use crate::leader::{Leader, LEADER_LEN};
use crate::record::{Tag, FIELD_TERMINATOR};
use serde::Serialize;

/// Size of one directory entry in bytes.
pub const DIRECTORY_ENTRY_LEN: usize = 12;

/// One directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Field tag
    pub tag: Tag,
    /// Field length, including its trailing field terminator
    pub length: usize,
    /// Start of the field relative to the base address
    pub start_offset: usize,
}

impl DirectoryEntry {
    /// Absolute `[start, end)` of the field within the record.
    #[must_use]
    pub fn slice_bounds(&self, base_address: usize) -> (usize, usize) {
        let start = base_address + self.start_offset;
        (start, start + self.length)
    }
}

/// Parse the directory of a record.
///
/// `record` holds the record bytes from the start of the leader onward. It may
/// be shorter than the declared record length if the stream ended early. The
/// search never looks at the last declared byte, which belongs to the record
/// terminator.
///
/// # Errors
///
/// - [`ParseError::TruncatedDirectory`] if no field terminator is found in time
/// - [`ParseError::InvalidDirectoryEntry`] if an entry has non-digit numbers
/// - [`ParseError::DirectoryBaseMismatch`] if the directory does not end at the
///   base address
pub fn parse_directory(
    record: &[u8],
    leader: &Leader,
) -> Result<Vec<DirectoryEntry>, ParseFailure> {
    let declared = leader.record_length as usize;
    let limit = declared.saturating_sub(1).min(record.len());
    let truncated = |at: usize| {
        ParseFailure::new(
            ParseError::TruncatedDirectory {
                searched: at.saturating_sub(LEADER_LEN),
            },
            at.max(LEADER_LEN),
        )
    };

    let mut entries = Vec::new();
    let mut pos = LEADER_LEN;
    loop {
        if pos >= limit {
            return Err(truncated(limit));
        }
        if record[pos] == FIELD_TERMINATOR {
            break;
        }
        if pos + DIRECTORY_ENTRY_LEN > limit {
            return Err(truncated(limit));
        }

        let chunk = &record[pos..pos + DIRECTORY_ENTRY_LEN];
        let tag = Tag::from_bytes([chunk[0], chunk[1], chunk[2]]);
        let (Some(length), Some(start_offset)) =
            (parse_number(&chunk[3..7]), parse_number(&chunk[7..12]))
        else {
            return Err(ParseFailure::new(
                ParseError::InvalidDirectoryEntry {
                    index: entries.len(),
                    tag: tag.to_string(),
                    found: String::from_utf8_lossy(chunk).into_owned(),
                },
                pos,
            ));
        };

        entries.push(DirectoryEntry {
            tag,
            length,
            start_offset,
        });
        pos += DIRECTORY_ENTRY_LEN;
    }

    let directory_end = pos + 1;
    let base_address = leader.data_base_address as usize;
    if directory_end != base_address {
        return Err(ParseFailure::new(
            ParseError::DirectoryBaseMismatch {
                directory_end,
                base_address,
            },
            pos,
        ));
    }

    Ok(entries)
}

/// Parse fixed-width ASCII digits without allocating.
fn parse_number(bytes: &[u8]) -> Option<usize> {
    bytes.iter().try_fold(0usize, |acc, &byte| {
        byte.is_ascii_digit()
            .then(|| acc * 10 + usize::from(byte - b'0'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader_for(record: &[u8]) -> Leader {
        Leader::from_bytes(record).unwrap()
    }

    #[test]
    fn test_parse_two_entries() {
        let mut record = b"00074nam a2200049 i 4500".to_vec();
        record.extend_from_slice(b"001000600000245001200006");
        record.push(FIELD_TERMINATOR);
        record.resize(74, b'x');

        let entries = parse_directory(&record, &leader_for(&record)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].tag, "001");
        assert_eq!(entries[0].length, 6);
        assert_eq!(entries[1].tag, "245");
        assert_eq!(entries[1].start_offset, 6);
        assert_eq!(entries[1].slice_bounds(49), (55, 67));
    }

    #[test]
    fn test_empty_directory() {
        let mut record = b"00026nam a2200025 i 4500".to_vec();
        record.push(FIELD_TERMINATOR);
        record.push(0x1D);
        let entries = parse_directory(&record, &leader_for(&record)).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_terminator_outside_declared_length() {
        // Declared length 25 leaves no room for a directory before the
        // record terminator.
        let mut record = b"00025nam a2200025 i 4500".to_vec();
        record.push(FIELD_TERMINATOR);
        let err = parse_directory(&record, &leader_for(&record)).unwrap_err();
        assert_eq!(err.cause, ParseError::TruncatedDirectory { searched: 0 });
    }

    #[test]
    fn test_missing_terminator() {
        let mut record = b"00050nam a2200049 i 4500".to_vec();
        record.extend_from_slice(b"2450012000002450012000");
        let err = parse_directory(&record, &leader_for(&record)).unwrap_err();
        assert!(matches!(err.cause, ParseError::TruncatedDirectory { .. }));
    }

    #[test]
    fn test_invalid_entry_digits() {
        let mut record = b"00062nam a2200037 i 4500".to_vec();
        record.extend_from_slice(b"24500x200000");
        record.push(FIELD_TERMINATOR);
        record.resize(62, b' ');
        let err = parse_directory(&record, &leader_for(&record)).unwrap_err();
        assert!(matches!(
            err.cause,
            ParseError::InvalidDirectoryEntry { index: 0, .. }
        ));
        assert_eq!(err.offset, 24);
    }

    #[test]
    fn test_base_address_mismatch() {
        let mut record = b"00062nam a2200040 i 4500".to_vec();
        record.extend_from_slice(b"245002000000");
        record.push(FIELD_TERMINATOR);
        record.resize(62, b' ');
        let err = parse_directory(&record, &leader_for(&record)).unwrap_err();
        assert_eq!(
            err.cause,
            ParseError::DirectoryBaseMismatch {
                directory_end: 37,
                base_address: 40
            }
        );
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(b"0042"), Some(42));
        assert_eq!(parse_number(b"00 42"), None);
    }
}
