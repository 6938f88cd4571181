//! Record Codec Tests
//!
//! These tests verify:
//! - Framing of plain and reserved bytes
//! - Stream decoding of several records
//! - Rejection of truncated or malformed input

use std::io::Cursor;

use emberkv::codec::{
    decode, encode, encoded_len, write_record, Record, RecordReader, ESCAPE, FIELD_SEP,
    RECORD_END,
};
use emberkv::EmberError;

// =============================================================================
// Helper Functions
// =============================================================================

fn read_all(bytes: &[u8]) -> Vec<emberkv::Result<Record>> {
    RecordReader::new(Cursor::new(bytes.to_vec())).collect()
}

fn assert_malformed(bytes: &[u8]) {
    let results = read_all(bytes);
    let last = results.last().expect("expected at least one item");
    assert!(
        matches!(last, Err(EmberError::MalformedRecord(_))),
        "expected MalformedRecord, got {:?}",
        last
    );
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_plain_record() {
    let bytes = encode(b"name", b"ember");

    let mut expected = b"name".to_vec();
    expected.push(FIELD_SEP);
    expected.extend_from_slice(b"ember");
    expected.push(RECORD_END);

    assert_eq!(&bytes[..], &expected[..]);
}

#[test]
fn test_encode_escapes_every_reserved_byte() {
    let bytes = encode(&[ESCAPE, b'k'], &[FIELD_SEP, RECORD_END]);

    assert_eq!(
        &bytes[..],
        &[
            ESCAPE, ESCAPE, b'k', FIELD_SEP, ESCAPE, FIELD_SEP, ESCAPE, RECORD_END, RECORD_END
        ]
    );
}

#[test]
fn test_encoded_len_matches_encode() {
    let key = [b'a', ESCAPE, b'b'];
    let value = [FIELD_SEP, FIELD_SEP, b'c', RECORD_END];

    assert_eq!(encoded_len(&key, &value), encode(&key, &value).len());
}

#[test]
fn test_write_record_matches_encode() {
    let mut out = Vec::new();
    write_record(&mut out, b"k\x1dey", b"va\x1elue").unwrap();

    assert_eq!(out, encode(b"k\x1dey", b"va\x1elue").to_vec());
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_roundtrip_with_reserved_bytes() {
    let key = vec![0x1B, 0x1D, 0x1E, b'x', 0x00, 0xFF];
    let value = vec![0x1E, 0x1E, 0x1B, 0x1D];

    let bytes = encode(&key, &value);
    let (record, consumed) = decode(&bytes).unwrap().unwrap();

    assert_eq!(record, Record::new(key, value));
    assert_eq!(consumed, bytes.len());
}

#[test]
fn test_decode_empty_input() {
    assert!(decode(&[]).unwrap().is_none());
}

#[test]
fn test_reader_yields_records_in_order() {
    let mut bytes = Vec::new();
    for i in 0..10 {
        write_record(&mut bytes, format!("key{i}").as_bytes(), &[i as u8, RECORD_END]).unwrap();
    }

    let records: Vec<Record> = read_all(&bytes).into_iter().map(Result::unwrap).collect();

    assert_eq!(records.len(), 10);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.key, format!("key{i}").into_bytes());
        assert_eq!(record.value, vec![i as u8, RECORD_END]);
    }
}

#[test]
fn test_reader_tracks_offset_and_count() {
    let first = encode(b"a", b"1");
    let second = encode(b"bb", b"22");
    let mut bytes = first.to_vec();
    bytes.extend_from_slice(&second);

    let mut reader = RecordReader::new(Cursor::new(bytes.clone()));
    reader.next_record().unwrap().unwrap();
    assert_eq!(reader.offset(), first.len() as u64);

    reader.next_record().unwrap().unwrap();
    assert_eq!(reader.offset(), bytes.len() as u64);
    assert_eq!(reader.records_read(), 2);

    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn test_empty_key_and_value_decode() {
    let bytes = [FIELD_SEP, RECORD_END];
    let (record, consumed) = decode(&bytes).unwrap().unwrap();

    assert!(record.key.is_empty());
    assert!(record.value.is_empty());
    assert_eq!(consumed, 2);
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_truncated_inside_key() {
    assert_malformed(b"abc");
}

#[test]
fn test_truncated_inside_value() {
    let mut bytes = b"key".to_vec();
    bytes.push(FIELD_SEP);
    bytes.extend_from_slice(b"val");
    assert_malformed(&bytes);
}

#[test]
fn test_dangling_escape() {
    let mut bytes = b"key".to_vec();
    bytes.push(FIELD_SEP);
    bytes.push(ESCAPE);
    assert_malformed(&bytes);
}

#[test]
fn test_record_end_before_separator() {
    let mut bytes = b"key".to_vec();
    bytes.push(RECORD_END);
    assert_malformed(&bytes);
}

#[test]
fn test_unescaped_separator_in_value() {
    let bytes = [b'k', FIELD_SEP, b'v', FIELD_SEP, b'w', RECORD_END];
    assert_malformed(&bytes);
}

#[test]
fn test_reader_stops_after_error() {
    let mut bytes = encode(b"good", b"record").to_vec();
    bytes.extend_from_slice(&[b'x', RECORD_END]);
    bytes.extend_from_slice(&encode(b"never", b"reached"));

    let results = read_all(&bytes);

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    match &results[1] {
        Err(EmberError::MalformedRecord(msg)) => assert!(msg.contains("record #2")),
        other => panic!("Expected MalformedRecord, got {:?}", other),
    }
}

#[test]
fn test_is_reserved() {
    assert!(Record::is_reserved(ESCAPE));
    assert!(Record::is_reserved(FIELD_SEP));
    assert!(Record::is_reserved(RECORD_END));
    assert!(!Record::is_reserved(b'a'));
    assert!(!Record::is_reserved(0x1C));
}
