//! Writing MARC records to binary format.
//!
//! [`MarcWriter`] serializes [`Record`] values to ISO 2709 and writes them to
//! any [`std::io::Write`] destination. The directory is rebuilt from the
//! record's field list on every write, and the leader's record length and base
//! address are recomputed to match; whatever the leader held before is ignored.
//!
//! A record is serialized in full before anything reaches the destination, so a
//! record that cannot be written (too large, too many fields) leaves earlier
//! output untouched.
//!
//! # Examples
//!
//! ```
//! use marc_resync::{Field, Leader, MarcWriter, Record};
//!
//! let record = Record::builder(Leader::default())
//!     .field(Field::control(*b"001", "ocm0001"))
//!     .field(Field::builder(*b"245", '1', '0').subfield('a', "Title").build())
//!     .build();
//!
//! let mut buffer = Vec::new();
//! let mut writer = MarcWriter::new(&mut buffer);
//! writer.write_record(&record)?;
//! writer.finish()?;
//! assert_eq!(&buffer[0..5], b"00068");
//! # Ok::<(), marc_resync::MarcError>(())
//! ```

use crate::directory::DIRECTORY_ENTRY_LEN;
use crate::error::{MarcError, Result};
use crate::leader::{LEADER_LEN, MAX_FIVE_DIGITS};
use crate::record::{
    Field, FieldKind, Record, FIELD_TERMINATOR, RECORD_TERMINATOR, SUBFIELD_DELIMITER,
};
use std::io::Write;

/// Largest field length a four-digit directory entry can hold.
const MAX_FIELD_LENGTH: usize = 9_999;

/// Writer for ISO 2709 binary MARC format.
#[derive(Debug)]
pub struct MarcWriter<W: Write> {
    writer: W,
    records_written: usize,
    finished: bool,
}

impl<W: Write> MarcWriter<W> {
    /// Create a new MARC writer.
    pub fn new(writer: W) -> Self {
        MarcWriter {
            writer,
            records_written: 0,
            finished: false,
        }
    }

    /// Write a single MARC record.
    ///
    /// # Errors
    ///
    /// Returns a caller error ([`MarcError::FieldTooLong`],
    /// [`MarcError::FieldCountOverflow`], [`MarcError::RecordTooLarge`],
    /// [`MarcError::InvalidIndicator`], [`MarcError::InvalidSubfieldCode`])
    /// if the record cannot be represented, [`MarcError::WriterFinished`]
    /// after [`finish`](Self::finish), or [`MarcError::Io`] if writing fails.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MarcError::WriterFinished);
        }

        let bytes = serialize_record(record)?;
        self.writer.write_all(&bytes)?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush the writer and mark it as finished.
    ///
    /// After calling `finish`, no more records can be written.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the underlying writer fails.
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Returns the number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Give back the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialize one record to ISO 2709 bytes.
///
/// # Errors
///
/// Same caller errors as [`MarcWriter::write_record`].
pub fn serialize_record(record: &Record) -> Result<Vec<u8>> {
    let mut directory = Vec::with_capacity(record.fields.len() * DIRECTORY_ENTRY_LEN + 1);
    let mut data_area = Vec::new();

    for field in &record.fields {
        let start = data_area.len();
        encode_field(field, &mut data_area)?;
        let length = data_area.len() - start;
        if length > MAX_FIELD_LENGTH {
            return Err(MarcError::FieldTooLong {
                tag: field.tag.to_string(),
                length,
            });
        }

        directory.extend_from_slice(field.tag.as_bytes());
        directory.extend_from_slice(format!("{length:04}{start:05}").as_bytes());
    }
    directory.push(FIELD_TERMINATOR);

    let base_address = LEADER_LEN + directory.len();
    if base_address > MAX_FIVE_DIGITS {
        return Err(MarcError::FieldCountOverflow {
            fields: record.fields.len(),
            base_address,
        });
    }
    let record_length = base_address + data_area.len() + 1;
    if record_length > MAX_FIVE_DIGITS {
        return Err(MarcError::RecordTooLarge {
            length: record_length,
        });
    }

    let mut leader = record.leader.clone();
    leader.record_length = five_digits(record_length)?;
    leader.data_base_address = five_digits(base_address)?;

    let mut out = Vec::with_capacity(record_length);
    out.extend_from_slice(&leader.as_bytes()?);
    out.extend_from_slice(&directory);
    out.extend_from_slice(&data_area);
    out.push(RECORD_TERMINATOR);
    Ok(out)
}

/// Append one field's bytes, trailing field terminator included.
fn encode_field(field: &Field, out: &mut Vec<u8>) -> Result<()> {
    match &field.kind {
        FieldKind::Control(value) => out.extend_from_slice(value.as_bytes()),
        FieldKind::Data(data) => {
            for indicator in [data.indicator1, data.indicator2] {
                let byte = u8::try_from(indicator).map_err(|_| MarcError::InvalidIndicator {
                    tag: field.tag.to_string(),
                    indicator,
                })?;
                out.push(byte);
            }
            for subfield in &data.subfields {
                let code =
                    u8::try_from(subfield.code).map_err(|_| MarcError::InvalidSubfieldCode {
                        tag: field.tag.to_string(),
                        code: subfield.code,
                    })?;
                out.push(SUBFIELD_DELIMITER);
                out.push(code);
                out.extend_from_slice(subfield.value.as_bytes());
            }
        },
    }
    out.push(FIELD_TERMINATOR);
    Ok(())
}

fn five_digits(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| MarcError::RecordTooLarge { length: value })
}
