//! Protocol Codec Tests
//!
//! Tests for command and response framing, and for mapping engine results
//! onto response statuses.

use std::io::Cursor;

use emberkv::cache::{CacheStats, CacheStatus};
use emberkv::codec::Record;
use emberkv::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, Reply, Response, Status,
    MAX_PAYLOAD_SIZE,
};
use emberkv::EmberError;

fn roundtrip(cmd: Command) -> Command {
    decode_command(&encode_command(&cmd)).unwrap()
}

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_key_commands() {
    let get = Command::Get { key: b"hello".to_vec() };
    let remove = Command::Remove { key: b"bye".to_vec() };

    assert_eq!(roundtrip(get.clone()), get);
    assert_eq!(roundtrip(remove.clone()), remove);
}

#[test]
fn test_encode_decode_set_with_binary_data() {
    let cmd = Command::Set {
        key: vec![0x00, 0x1B, 0xFF, 0x1D],
        value: (0..=255).collect(),
    };

    assert_eq!(roundtrip(cmd.clone()), cmd);
}

#[test]
fn test_encode_decode_payloadless_commands() {
    for cmd in [
        Command::List,
        Command::CacheStatus,
        Command::Ping,
        Command::Cleanup,
    ] {
        let encoded = encode_command(&cmd);
        assert_eq!(encoded.len(), 5);
        assert_eq!(decode_command(&encoded).unwrap(), cmd);
    }
}

#[test]
fn test_empty_key_survives_framing() {
    // Rejected by the engine, not by the codec
    let cmd = Command::Get { key: vec![] };
    assert_eq!(roundtrip(cmd.clone()), cmd);
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_responses() {
    let cases = [
        Response::ok(Some(b"value".to_vec())),
        Response::ok(None),
        Response::not_found(),
        Response::error("something went wrong"),
        Response::bad_request("key must not be empty"),
    ];

    for resp in cases {
        let decoded = decode_response(&encode_response(&resp)).unwrap();
        assert_eq!(decoded.status, resp.status);
        assert_eq!(decoded.payload, resp.payload);
    }
}

// =============================================================================
// Result Mapping Tests
// =============================================================================

#[test]
fn test_from_result_status_mapping() {
    assert_eq!(Response::from_result(Ok(Reply::Done)).status, Status::Ok);
    assert_eq!(
        Response::from_result(Err(EmberError::KeyNotFound)).status,
        Status::NotFound
    );
    assert_eq!(
        Response::from_result(Err(EmberError::EmptyInput("key"))).status,
        Status::BadRequest
    );

    let rejected = Response::from_result(Err(EmberError::BadRequest("no such key".into())));
    assert_eq!(rejected.status, Status::BadRequest);
    assert_eq!(rejected.message(), "no such key");

    let io_error = Response::from_result(Err(EmberError::Io(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "denied",
    ))));
    assert_eq!(io_error.status, Status::Error);
    assert!(io_error.message().contains("denied"));
}

#[test]
fn test_reply_payloads() {
    let value = Response::from_result(Ok(Reply::Value(b"v".to_vec())));
    assert_eq!(value.payload, Some(b"v".to_vec()));

    let pong = Response::from_result(Ok(Reply::Pong));
    assert_eq!(pong.payload, Some(b"PONG".to_vec()));

    let records = vec![Record::new("a", "1"), Record::new("b", "2")];
    let listed = Response::from_result(Ok(Reply::Records(records.clone())));
    let decoded: Vec<Record> = bincode::deserialize(listed.payload_bytes()).unwrap();
    assert_eq!(decoded, records);

    let count = Response::from_result(Ok(Reply::Count(7)));
    let decoded: u64 = bincode::deserialize(count.payload_bytes()).unwrap();
    assert_eq!(decoded, 7);
}

#[test]
fn test_cache_status_payload() {
    let status = CacheStatus {
        capacity: 10,
        bucket_count: 4,
        ttl_ms: 60_000,
        entries: Vec::new(),
        stats: CacheStats::default(),
    };

    let response = Response::from_result(Ok(Reply::CacheStatus(status)));
    let decoded: CacheStatus = bincode::deserialize(response.payload_bytes()).unwrap();

    assert_eq!(decoded.capacity, 10);
    assert_eq!(decoded.bucket_count, 4);
    assert_eq!(decoded.ttl_ms, 60_000);
    assert!(decoded.is_empty());
}

// =============================================================================
// Error Handling Tests
// =============================================================================

fn protocol_error(result: emberkv::Result<Command>) -> String {
    match result {
        Err(EmberError::Protocol(msg)) => msg,
        other => panic!("Expected protocol error, got {:?}", other),
    }
}

#[test]
fn test_incomplete_header() {
    let bytes = [0x01, 0x00, 0x00];
    assert!(protocol_error(decode_command(&bytes)).contains("Incomplete command header"));
}

#[test]
fn test_incomplete_payload() {
    // Header says 10 bytes payload, but only 5 provided
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x05, 0x68];
    assert!(protocol_error(decode_command(&bytes)).contains("Incomplete command payload"));
}

#[test]
fn test_unknown_command_type() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    assert!(protocol_error(decode_command(&bytes)).contains("Unknown command type"));
}

#[test]
fn test_unknown_response_status() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let err = decode_response(&bytes).unwrap_err();
    assert!(err.to_string().contains("Unknown response status"));
}

#[test]
fn test_get_missing_key_length() {
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00];
    assert!(protocol_error(decode_command(&bytes)).contains("missing key length"));
}

#[test]
fn test_get_with_trailing_bytes() {
    let mut bytes = encode_command(&Command::Set {
        key: b"k".to_vec(),
        value: b"extra".to_vec(),
    });
    bytes[0] = 0x01; // Relabel SET as GET

    assert!(protocol_error(decode_command(&bytes)).contains("unexpected trailing bytes"));
}

#[test]
fn test_list_with_unexpected_payload() {
    let bytes = [0x04, 0x00, 0x00, 0x00, 0x05, 0x68, 0x65, 0x6C, 0x6C, 0x6F];
    assert!(protocol_error(decode_command(&bytes)).contains("unexpected payload"));
}

#[test]
fn test_oversized_payload_rejected_before_reading() {
    let mut bytes = vec![0x02];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());

    let result = read_command(&mut Cursor::new(bytes));
    assert!(protocol_error(result).contains("Payload too large"));
}

#[test]
fn test_truncated_stream_is_io_error() {
    let encoded = encode_command(&Command::Get { key: b"key".to_vec() });
    let mut cursor = Cursor::new(encoded[..encoded.len() - 1].to_vec());

    match read_command(&mut cursor) {
        Err(EmberError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF, got {:?}", other),
    }
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_multiple_commands() {
    let commands = vec![
        Command::Ping,
        Command::Set {
            key: b"k1".to_vec(),
            value: b"v1".to_vec(),
        },
        Command::Get { key: b"k1".to_vec() },
        Command::Remove { key: b"k1".to_vec() },
        Command::List,
    ];

    let mut buffer = Vec::new();
    for cmd in &commands {
        write_command(&mut buffer, cmd).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &commands {
        assert_eq!(&read_command(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_multiple_responses() {
    let responses = vec![
        Response::ok(Some(b"data".to_vec())),
        Response::not_found(),
        Response::error("oops"),
        Response::ok(None),
    ];

    let mut buffer = Vec::new();
    for resp in &responses {
        write_response(&mut buffer, resp).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &responses {
        let decoded = read_response(&mut cursor).unwrap();
        assert_eq!(decoded.status, expected.status);
        assert_eq!(decoded.payload, expected.payload);
    }
}

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_set() {
    let cmd = Command::Set {
        key: b"ab".to_vec(),
        value: b"xyz".to_vec(),
    };
    let encoded = encode_command(&cmd);

    // [0x02][0 0 0 9][0 0 0 2][a b][x y z]
    assert_eq!(encoded[0], 0x02);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x09]);
    assert_eq!(&encoded[5..9], &[0x00, 0x00, 0x00, 0x02]);
    assert_eq!(&encoded[9..11], b"ab");
    assert_eq!(&encoded[11..14], b"xyz");
}

#[test]
fn test_wire_format_bad_request() {
    let encoded = encode_response(&Response::bad_request("no"));

    assert_eq!(encoded[0], 0x03);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x02]);
    assert_eq!(&encoded[5..7], b"no");
}
