//! MARC record leader parsing and serialization.
//!
//! The leader is the fixed 24-byte header at the start of every record.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Type of record
//! - Position 7: Bibliographic level
//! - Position 8: Type of control
//! - Position 9: Character coding scheme (space = MARC-8, a = UCS/Unicode)
//! - Position 10: Indicator count
//! - Position 11: Subfield code count
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-19: Encoding level, cataloging form, multipart level
//! - Positions 20-23: Entry map (usually "4500")
//!
//! Only the two numeric fields are interpreted. Everything else is carried
//! byte for byte so that a record can be written back unchanged.

use crate::error::{MarcError, ParseError, Result};
use serde::{Deserialize, Serialize};

/// Length of the leader in bytes.
pub const LEADER_LEN: usize = 24;

/// Largest value a five-digit leader field can hold.
pub const MAX_FIVE_DIGITS: usize = 99_999;

/// MARC Leader - 24 bytes at the start of every MARC record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leader {
    /// Record length (5 digits) - positions 0-4
    pub record_length: u32,
    /// Record status - position 5
    pub record_status: u8,
    /// Type of record - position 6
    pub record_type: u8,
    /// Bibliographic level - position 7
    pub bibliographic_level: u8,
    /// Type of control - position 8
    pub control_record_type: u8,
    /// Character coding scheme - position 9
    pub character_coding: u8,
    /// Indicator count - position 10, kept as the raw byte
    pub indicator_count: u8,
    /// Subfield code count - position 11, kept as the raw byte
    pub subfield_code_count: u8,
    /// Base address of data (5 digits) - positions 12-16
    pub data_base_address: u32,
    /// Encoding level - position 17
    pub encoding_level: u8,
    /// Descriptive cataloging form - position 18
    pub cataloging_form: u8,
    /// Multipart resource record level - position 19
    pub multipart_level: u8,
    /// Entry map - positions 20-23
    pub entry_map: [u8; 4],
}

impl Default for Leader {
    /// A new language-material monograph in UTF-8, lengths left at zero for
    /// the writer to fill in.
    fn default() -> Self {
        Leader {
            record_length: 0,
            record_status: b'n',
            record_type: b'a',
            bibliographic_level: b'm',
            control_record_type: b' ',
            character_coding: b'a',
            indicator_count: b'2',
            subfield_code_count: b'2',
            data_base_address: 0,
            encoding_level: b' ',
            cataloging_form: b' ',
            multipart_level: b' ',
            entry_map: *b"4500",
        }
    }
}

impl Leader {
    /// Parse a leader from the first 24 bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::TruncatedLeader`] if fewer than 24 bytes are given,
    /// or [`ParseError::InvalidLeaderDigits`] if the record length or base
    /// address is not all ASCII digits.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ParseError> {
        if bytes.len() < LEADER_LEN {
            return Err(ParseError::TruncatedLeader {
                available: bytes.len(),
            });
        }

        let record_length = parse_digits(&bytes[0..5], "record length")?;
        let data_base_address = parse_digits(&bytes[12..17], "base address")?;

        Ok(Leader {
            record_length,
            record_status: bytes[5],
            record_type: bytes[6],
            bibliographic_level: bytes[7],
            control_record_type: bytes[8],
            character_coding: bytes[9],
            indicator_count: bytes[10],
            subfield_code_count: bytes[11],
            data_base_address,
            encoding_level: bytes[17],
            cataloging_form: bytes[18],
            multipart_level: bytes[19],
            entry_map: [bytes[20], bytes[21], bytes[22], bytes[23]],
        })
    }

    /// Serialize the leader to its 24-byte form.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::RecordTooLarge`] if the record length or base
    /// address does not fit in five digits.
    pub fn as_bytes(&self) -> Result<[u8; LEADER_LEN]> {
        let record_length = self.record_length as usize;
        let base_address = self.data_base_address as usize;
        if record_length > MAX_FIVE_DIGITS || base_address > MAX_FIVE_DIGITS {
            return Err(MarcError::RecordTooLarge {
                length: record_length.max(base_address),
            });
        }

        let mut bytes = [b' '; LEADER_LEN];
        bytes[0..5].copy_from_slice(format!("{record_length:05}").as_bytes());
        bytes[5] = self.record_status;
        bytes[6] = self.record_type;
        bytes[7] = self.bibliographic_level;
        bytes[8] = self.control_record_type;
        bytes[9] = self.character_coding;
        bytes[10] = self.indicator_count;
        bytes[11] = self.subfield_code_count;
        bytes[12..17].copy_from_slice(format!("{base_address:05}").as_bytes());
        bytes[17] = self.encoding_level;
        bytes[18] = self.cataloging_form;
        bytes[19] = self.multipart_level;
        bytes[20..24].copy_from_slice(&self.entry_map);
        Ok(bytes)
    }
}

/// True if the five-digit fields of a would-be leader are all digits. Cheap
/// pre-filter for resynchronization.
#[must_use]
pub fn has_leader_digits(bytes: &[u8]) -> bool {
    bytes.len() >= LEADER_LEN
        && bytes[0..5].iter().all(u8::is_ascii_digit)
        && bytes[12..17].iter().all(u8::is_ascii_digit)
}

/// Parse a 5-digit ASCII number from bytes
fn parse_digits(bytes: &[u8], field: &'static str) -> std::result::Result<u32, ParseError> {
    let mut result = 0u32;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(ParseError::InvalidLeaderDigits {
                field,
                found: String::from_utf8_lossy(bytes).into_owned(),
            });
        }
        result = result * 10 + u32::from(byte - b'0');
    }
    Ok(result)
}
