//! Common test helpers shared across the test suite.

#![allow(dead_code)]

use marc_resync::writer::serialize_record;
use marc_resync::{
    ByteSpan, Field, Leader, ReadOutcome, ReaderOptions, Record, StreamReader,
};
use std::io::Cursor;

/// A small bibliographic record: 001, 245 and a 945 item.
pub fn book(n: usize) -> Record {
    Record::builder(Leader::default())
        .field(Field::control(*b"001", format!("ocm{n:08}")))
        .field(
            Field::builder(*b"245", '1', '0')
                .subfield('a', format!("Title number {n} /"))
                .subfield('c', "Anonymous.")
                .build(),
        )
        .field(
            Field::builder(*b"945", ' ', ' ')
                .subfield('y', format!(".i{n}"))
                .build(),
        )
        .build()
}

/// Serialized form of `record`.
pub fn to_bytes(record: &Record) -> Vec<u8> {
    serialize_record(record).expect("record should serialize")
}

/// `count` serialized books back to back, with the start offset of each.
pub fn corpus(count: usize) -> (Vec<u8>, Vec<usize>) {
    let mut bytes = Vec::new();
    let mut starts = Vec::with_capacity(count);
    for n in 1..=count {
        starts.push(bytes.len());
        bytes.extend(to_bytes(&book(n)));
    }
    (bytes, starts)
}

/// Read every outcome from an in-memory stream.
pub fn read_all(bytes: &[u8], options: ReaderOptions) -> Vec<ReadOutcome> {
    StreamReader::with_options(Cursor::new(bytes.to_vec()), options)
        .expect("in-memory source is seekable")
        .collect::<Result<Vec<_>, _>>()
        .expect("in-memory reads do not fail")
}

/// Records among the outcomes, in order.
pub fn records(outcomes: &[ReadOutcome]) -> Vec<&Record> {
    outcomes.iter().filter_map(ReadOutcome::record).collect()
}

/// Malformed spans among the outcomes, in order.
pub fn malformed_spans(outcomes: &[ReadOutcome]) -> Vec<ByteSpan> {
    outcomes
        .iter()
        .filter(|o| o.is_malformed())
        .map(ReadOutcome::span)
        .collect()
}

/// Assert that the outcome spans cover `[start, end)` with no gap or overlap.
pub fn assert_tiles(outcomes: &[ReadOutcome], start: u64, end: u64) {
    let mut at = start;
    for outcome in outcomes {
        let span = outcome.span();
        assert_eq!(span.start, at, "gap or overlap at {at}: {span}");
        assert!(!span.is_empty(), "empty span at {at}");
        at = span.end;
    }
    assert_eq!(at, end, "spans stop short of the stream end");
}

/// Overwrite the five-digit record length of the record starting at `start`.
pub fn set_record_length(bytes: &mut [u8], start: usize, length: usize) {
    bytes[start..start + 5].copy_from_slice(format!("{length:05}").as_bytes());
}
