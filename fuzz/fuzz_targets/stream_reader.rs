#![no_main]

use libfuzzer_sys::fuzz_target;
use marc_resync::assembler::assemble_record;
use marc_resync::writer::serialize_record;
use marc_resync::{ReaderOptions, ResyncStrategy, StreamReader, TextPolicy};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    for resync in [ResyncStrategy::ByteScan, ResyncStrategy::DeclaredLengthFirst] {
        let options = ReaderOptions::default()
            .with_resync(resync)
            .with_text_policy(TextPolicy::Raw);
        let Ok(reader) = StreamReader::with_options(Cursor::new(data.to_vec()), options) else {
            return;
        };

        let mut at = 0u64;
        for outcome in reader {
            let outcome = outcome.expect("in-memory reads do not fail");
            let span = outcome.span();
            assert_eq!(span.start, at);
            assert!(span.end > span.start);
            at = span.end;

            // Anything the reader accepts reads back the same once rewritten.
            if let Some(record) = outcome.record() {
                if let Ok(bytes) = serialize_record(record) {
                    let reread = assemble_record(&bytes, TextPolicy::Raw).expect("rewritten record");
                    assert_eq!(reread.fields, record.fields);
                }
            }
        }
        assert_eq!(at, data.len() as u64);
    }
});
