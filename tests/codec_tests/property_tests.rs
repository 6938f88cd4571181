//! Record Codec Property Tests
//!
//! These tests verify:
//! - Any non-empty key and value survive encode/decode unchanged
//! - Decoding consumes exactly the encoded length
//! - Records written back to back are read back in order

use std::io::Cursor;

use emberkv::codec::{
    decode, encode, encoded_len, write_record, RecordReader, ESCAPE, FIELD_SEP, RECORD_END,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Bytes biased toward the reserved markers so escaping is exercised often
fn field_byte() -> impl Strategy<Value = u8> {
    prop_oneof![
        3 => any::<u8>(),
        1 => Just(ESCAPE),
        1 => Just(FIELD_SEP),
        1 => Just(RECORD_END),
    ]
}

fn field() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(field_byte(), 1..64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_record_survives_encode_decode(key in field(), value in field()) {
        let bytes = encode(&key, &value);
        prop_assert_eq!(bytes.len(), encoded_len(&key, &value));

        let (record, consumed) = decode(&bytes).unwrap().unwrap();
        prop_assert_eq!(record.key, key);
        prop_assert_eq!(record.value, value);
        prop_assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn prop_stream_reads_back_in_order(
        records in prop::collection::vec((field(), field()), 1..16)
    ) {
        let mut buf = Vec::new();
        for (key, value) in &records {
            write_record(&mut buf, key, value).unwrap();
        }

        let decoded: Vec<_> = RecordReader::new(Cursor::new(buf))
            .map(|r| r.map(|r| (r.key, r.value)))
            .collect::<emberkv::Result<_>>()
            .unwrap();
        prop_assert_eq!(decoded, records);
    }
}
