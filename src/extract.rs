//! Pulling a few identifying values out of bibliographic records.
//!
//! Each lookup stands alone: a record without a 907 still yields its title
//! and item id. Missing values are `None` and print as [`NOT_AVAILABLE`].

use crate::config::RunConfig;
use crate::error::Result;
use crate::reader::{ReadOutcome, ReadSummary, StreamReader};
use crate::record::{Field, Record};
use serde::{Serialize, Serializer};
use std::io::Write;
use tracing::{debug, Level};

/// Placeholder written for a value the record does not have.
pub const NOT_AVAILABLE: &str = "not_available";

/// CSV header row, in [`RecordInfo`] field order.
pub const COLUMNS: [&str; 3] = ["title", "bib_id", "item_id"];

/// Characters of the 907 `$a` kept as the bib id.
const BIB_ID_LEN: usize = 9;

/// Title and identifiers of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordInfo {
    /// 245 `$a`, followed by `$b` when present.
    #[serde(serialize_with = "or_not_available")]
    pub title: Option<String>,
    /// Leading characters of the 907 `$a`.
    #[serde(serialize_with = "or_not_available")]
    pub bib_id: Option<String>,
    /// Last 945 `$y` in the record.
    #[serde(serialize_with = "or_not_available")]
    pub item_id: Option<String>,
}

impl RecordInfo {
    /// Gather all three values from `record`.
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        RecordInfo {
            title: title(record),
            bib_id: bib_id(record),
            item_id: item_id(record),
        }
    }
}

#[allow(clippy::ref_option)]
fn or_not_available<S: Serializer>(
    value: &Option<String>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(value.as_deref().unwrap_or(NOT_AVAILABLE))
}

/// Title from the first 245: `$a`, then a space and `$b` if there is one.
#[must_use]
pub fn title(record: &Record) -> Option<String> {
    let field = record.get_field("245")?;
    let main = field.get_subfield('a')?.to_string_lossy();
    Some(match field.get_subfield('b') {
        Some(rest) => format!("{} {}", main, rest.to_string_lossy()),
        None => main.into_owned(),
    })
}

/// Bib id from the last 907 that leads with `$a`. A 907 that does not is
/// skipped without discarding an earlier match.
#[must_use]
pub fn bib_id(record: &Record) -> Option<String> {
    record
        .fields_by_tag("907")
        .filter_map(|field| field.subfields().next())
        .filter(|first| first.code == 'a')
        .last()
        .map(|first| {
            first
                .value
                .to_string_lossy()
                .chars()
                .take(BIB_ID_LEN)
                .collect()
        })
}

/// Item id: the last `$y` across all 945 fields.
#[must_use]
pub fn item_id(record: &Record) -> Option<String> {
    record
        .fields_by_tag("945")
        .flat_map(Field::subfields)
        .filter(|sub| sub.code == 'y')
        .last()
        .map(|sub| sub.value.to_string_lossy().into_owned())
}

/// Stream `config.input` and write one CSV row per well-formed record to
/// `sink`. Malformed spans are skipped; the returned summary counts them.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the CSV cannot be written.
pub fn extract_file<W: Write>(config: &RunConfig, sink: W) -> Result<ReadSummary> {
    let mut reader = StreamReader::open(&config.input, config.reader_options())?;
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(sink);
    csv.write_record(COLUMNS)?;

    let mut seen = 0u64;
    while let Some(outcome) = reader.read_outcome()? {
        let ReadOutcome::Record { record, span } = outcome else {
            continue;
        };
        seen += 1;
        config.report_progress(seen);
        if !config.range.contains(seen) {
            continue;
        }

        let info = RecordInfo::from_record(&record);
        if info.bib_id.is_none() && tracing::enabled!(Level::DEBUG) {
            let json = serde_json::to_string(&record)?;
            debug!(start = span.start, record = %json, "no bib id in record");
        }
        csv.serialize(&info)?;
        if config.range.is_last(seen) {
            break;
        }
    }

    csv.flush()?;
    Ok(reader.summary().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::Leader;

    fn sample() -> Record {
        Record::builder(Leader::default())
            .field(
                Field::builder(*b"245", '1', '4')
                    .subfield('a', "The great gatsby :")
                    .subfield('b', "a novel /")
                    .subfield('c', "F. Scott Fitzgerald.")
                    .build(),
            )
            .field(
                Field::builder(*b"907", ' ', ' ')
                    .subfield('a', ".b12345678x")
                    .build(),
            )
            .field(
                Field::builder(*b"945", ' ', ' ')
                    .subfield('y', ".i1111")
                    .subfield('y', ".i2222")
                    .build(),
            )
            .field(Field::builder(*b"945", ' ', ' ').subfield('y', ".i3333").build())
            .build()
    }

    #[test]
    fn test_extracts_all_three() {
        let info = RecordInfo::from_record(&sample());
        assert_eq!(info.title.as_deref(), Some("The great gatsby : a novel /"));
        assert_eq!(info.bib_id.as_deref(), Some(".b1234567"));
        assert_eq!(info.item_id.as_deref(), Some(".i3333"));
    }

    #[test]
    fn test_title_without_subtitle() {
        let record = Record::builder(Leader::default())
            .field(Field::builder(*b"245", '0', '0').subfield('a', "Poems").build())
            .build();
        assert_eq!(title(&record).as_deref(), Some("Poems"));
    }

    #[test]
    fn test_bib_id_requires_leading_a() {
        let record = Record::builder(Leader::default())
            .field(
                Field::builder(*b"907", ' ', ' ')
                    .subfield('b', "x")
                    .subfield('a', ".b1")
                    .build(),
            )
            .field(Field::builder(*b"945", ' ', ' ').subfield('y', ".i9").build())
            .build();
        let info = RecordInfo::from_record(&record);
        assert_eq!(info.bib_id, None);
        assert_eq!(info.item_id.as_deref(), Some(".i9"));
        assert_eq!(info.title, None);
    }

    #[test]
    fn test_bib_id_from_last_907_leading_with_a() {
        let record = Record::builder(Leader::default())
            .field(Field::builder(*b"907", ' ', ' ').subfield('a', ".b11111111").build())
            .field(Field::builder(*b"907", ' ', ' ').subfield('a', ".b22222222").build())
            .field(
                Field::builder(*b"907", ' ', ' ')
                    .subfield('c', "no bib here")
                    .build(),
            )
            .build();
        assert_eq!(bib_id(&record).as_deref(), Some(".b2222222"));

        let record = Record::builder(Leader::default())
            .field(Field::builder(*b"907", ' ', ' ').subfield('b', "x").build())
            .field(Field::builder(*b"907", ' ', ' ').subfield('a', ".b33333333").build())
            .build();
        assert_eq!(bib_id(&record).as_deref(), Some(".b3333333"));
    }

    #[test]
    fn test_missing_values_serialize_as_sentinel() {
        let mut out = Vec::new();
        {
            let mut csv = csv::Writer::from_writer(&mut out);
            csv.serialize(RecordInfo::default()).unwrap();
            csv.flush().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "title,bib_id,item_id\nnot_available,not_available,not_available\n"
        );
    }
}
