//! Property tests: write/read round trip and span coverage.

mod common;

use common::{assert_tiles, read_all, records, to_bytes};
use marc_resync::assembler::assemble_record;
use marc_resync::{Field, Leader, ReaderOptions, Record, ResyncStrategy, Tag, TextPolicy};
use proptest::collection::vec;
use proptest::prelude::*;

fn first_char(s: String) -> char {
    s.chars().next().unwrap_or(' ')
}

fn control_field() -> impl Strategy<Value = Field> {
    ("00[1-9]", "[a-zA-Z0-9 .-]{0,24}").prop_map(|(tag, value)| {
        Field::control(tag.parse::<Tag>().unwrap(), value)
    })
}

fn data_field() -> impl Strategy<Value = Field> {
    (
        "[1-9][0-9]{2}",
        "[0-9 ]",
        "[0-9 ]",
        vec(("[a-z0-9]", "\\PC{0,30}"), 0..5),
    )
        .prop_map(|(tag, ind1, ind2, subfields)| {
            let mut field = Field::data(
                tag.parse::<Tag>().unwrap(),
                first_char(ind1),
                first_char(ind2),
            );
            for (code, value) in subfields {
                field.add_subfield(first_char(code), value);
            }
            field
        })
}

fn record() -> impl Strategy<Value = Record> {
    vec(prop_oneof![control_field(), data_field()], 0..12).prop_map(|fields| {
        let mut record = Record::new(Leader::default());
        for field in fields {
            record.add_field(field);
        }
        record
    })
}

proptest! {
    #[test]
    fn prop_written_record_reads_back(record in record()) {
        let bytes = to_bytes(&record);
        let read = assemble_record(&bytes, TextPolicy::Strict).unwrap();
        prop_assert_eq!(&read.fields, &record.fields);
        prop_assert_eq!(read.leader.record_length as usize, bytes.len());
        prop_assert_eq!(to_bytes(&read), bytes);
    }

    #[test]
    fn prop_spans_cover_arbitrary_bytes(bytes in vec(any::<u8>(), 0..2048)) {
        for resync in [ResyncStrategy::ByteScan, ResyncStrategy::DeclaredLengthFirst] {
            let outcomes = read_all(&bytes, ReaderOptions::default().with_resync(resync));
            assert_tiles(&outcomes, 0, bytes.len() as u64);
        }
    }

    #[test]
    fn prop_garbage_between_records_is_skipped(
        recs in vec(record(), 1..6),
        junk in vec(vec(any::<u8>(), 0..64), 6),
    ) {
        let mut bytes = Vec::new();
        for (record, junk) in recs.iter().zip(&junk) {
            bytes.extend_from_slice(junk);
            bytes.extend(to_bytes(record));
        }

        let options = ReaderOptions::default().with_resync(ResyncStrategy::ByteScan);
        let outcomes = read_all(&bytes, options);
        assert_tiles(&outcomes, 0, bytes.len() as u64);

        let got: Vec<_> = records(&outcomes).into_iter().map(|r| &r.fields).collect();
        let want: Vec<_> = recs.iter().map(|r| &r.fields).collect();
        prop_assert_eq!(got, want);
    }
}
