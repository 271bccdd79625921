// HTTP/2 frame (de)serialization with full RFC 7540 validation. Reads frames off a
// `ByteReader` and performs per-frame-type structural checks; validation failures are
// returned as typed errors so the caller (the HttpReader/connection driver) can decide
// between a stream-level RST_STREAM and a connection-level GOAWAY.

use corehttp_common::error::{Error, Http2ErrorCode};
use std::io::Read;

use super::frame::{
    FrameFlags, FrameHeader, FrameType, MAX_INITIAL_WINDOW_SIZE, MAX_MAX_FRAME_SIZE, MIN_MAX_FRAME_SIZE,
    FRAME_HEADER_LENGTH,
};
use crate::bytereader::ByteReader;

/// Strips RFC 7540 §6.1/§6.2 padding framing: an optional 1-byte PAD_LENGTH prefix
/// followed by that many zero pad bytes at the end of the payload.
pub fn strip_padding(payload: &[u8], padded: bool) -> Result<&[u8], Error> {
    if !padded {
        return Ok(payload);
    }
    if payload.is_empty() {
        return Err(Error::Http2(Http2ErrorCode::ProtocolError));
    }
    let pad_len = payload[0] as usize;
    let rest = &payload[1..];
    if rest.len() < pad_len {
        return Err(Error::Http2(Http2ErrorCode::ProtocolError));
    }
    Ok(&rest[..rest.len() - pad_len])
}

/// Priority fields from a HEADERS frame's optional PRIORITY block (RFC 7540 §6.2).
pub struct Priority {
    pub exclusive: bool,
    pub stream_dependency: u32,
    pub weight: u8,
}

pub fn parse_priority(bytes: &[u8]) -> Result<(Priority, &[u8]), Error> {
    if bytes.len() < 5 {
        return Err(Error::Http2(Http2ErrorCode::FrameSizeError));
    }
    let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let priority = Priority {
        exclusive: raw & 0x8000_0000 != 0,
        stream_dependency: raw & 0x7fff_ffff,
        weight: bytes[4],
    };
    Ok((priority, &bytes[5..]))
}

/// Reads and structurally validates the next frame off the transport. `max_frame_size`
/// is the receiver's currently advertised SETTINGS_MAX_FRAME_SIZE.
pub fn read_frame<S: Read>(reader: &mut ByteReader<S>, max_frame_size: u32) -> Result<(FrameHeader, Vec<u8>), Error> {
    let header_bytes = reader.read_exact(FRAME_HEADER_LENGTH)?;
    let header = FrameHeader::parse(&header_bytes)?;

    if header.length > max_frame_size {
        return Err(Error::Http2(Http2ErrorCode::FrameSizeError));
    }

    let expected_stream_requirement = header.frame_type.map(stream_id_requirement);
    if let Some(requirement) = expected_stream_requirement {
        validate_stream_id(requirement, header.stream_id)?;
    }

    let payload = reader.read_exact(header.length as usize)?;
    Ok((header, payload))
}

enum StreamIdRequirement {
    MustBeZero,
    MustBeNonZero,
    Any,
}

fn stream_id_requirement(frame_type: FrameType) -> StreamIdRequirement {
    match frame_type {
        FrameType::Data
        | FrameType::Headers
        | FrameType::Priority
        | FrameType::RstStream
        | FrameType::PushPromise
        | FrameType::Continuation => StreamIdRequirement::MustBeNonZero,
        FrameType::Settings | FrameType::Ping | FrameType::GoAway => StreamIdRequirement::MustBeZero,
        FrameType::WindowUpdate => StreamIdRequirement::Any,
    }
}

fn validate_stream_id(requirement: StreamIdRequirement, stream_id: u32) -> Result<(), Error> {
    match requirement {
        StreamIdRequirement::MustBeZero if stream_id != 0 => Err(Error::Http2(Http2ErrorCode::ProtocolError)),
        StreamIdRequirement::MustBeNonZero if stream_id == 0 => Err(Error::Http2(Http2ErrorCode::ProtocolError)),
        _ => Ok(()),
    }
}

/// Parses a SETTINGS frame payload into `(id, value)` pairs and validates it structurally
/// (ACK frames must be empty; otherwise length must be a multiple of 6). Per-value range
/// checks (ENABLE_PUSH, INITIAL_WINDOW_SIZE, MAX_FRAME_SIZE) happen when the pairs are
/// applied to a `ConnectionContext`, not here, since this layer has no settings state.
pub fn parse_settings(payload: &[u8], flags: FrameFlags) -> Result<Vec<(u16, u32)>, Error> {
    if flags.has(FrameFlags::ACK) {
        if !payload.is_empty() {
            return Err(Error::Http2(Http2ErrorCode::FrameSizeError));
        }
        return Ok(Vec::new());
    }
    if payload.len() % 6 != 0 {
        return Err(Error::Http2(Http2ErrorCode::FrameSizeError));
    }
    let mut out = Vec::with_capacity(payload.len() / 6);
    for chunk in payload.chunks_exact(6) {
        let id = u16::from_be_bytes([chunk[0], chunk[1]]);
        let value = u32::from_be_bytes([chunk[2], chunk[3], chunk[4], chunk[5]]);
        out.push((id, value));
    }
    Ok(out)
}

pub fn validate_settings_value(id: u16, value: u32) -> Result<(), Error> {
    match id {
        0x2 if value > 1 => Err(Error::Http2(Http2ErrorCode::ProtocolError)),
        0x4 if value > MAX_INITIAL_WINDOW_SIZE => Err(Error::Http2(Http2ErrorCode::FlowControlError)),
        0x5 if !(MIN_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&value) => {
            Err(Error::Http2(Http2ErrorCode::ProtocolError))
        }
        _ => Ok(()),
    }
}

/// Parses a WINDOW_UPDATE frame payload (exactly 4 bytes, 31-bit increment). A zero
/// increment on a stream-level frame is a protocol error; the caller supplies
/// `stream_id` so it can apply the right granularity of error.
pub fn parse_window_update(payload: &[u8]) -> Result<u32, Error> {
    if payload.len() != 4 {
        return Err(Error::Http2(Http2ErrorCode::FrameSizeError));
    }
    let raw = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    Ok(raw & 0x7fff_ffff)
}

/// Parses a GOAWAY frame payload: `last_stream_id`, `error_code`, and any trailing debug
/// data (RFC 7540 §6.8).
pub fn parse_goaway(payload: &[u8]) -> Result<(u32, Http2ErrorCode, &[u8]), Error> {
    if payload.len() < 8 {
        return Err(Error::Http2(Http2ErrorCode::FrameSizeError));
    }
    let last_stream_id = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & 0x7fff_ffff;
    let code = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
    Ok((last_stream_id, Http2ErrorCode::from_u32(code), &payload[8..]))
}

/// Serializes a full frame (header + payload) ready for transmission.
pub fn build_frame(frame_type: FrameType, flags: u8, stream_id: u32, payload: &[u8]) -> Vec<u8> {
    let header = FrameHeader {
        length: payload.len() as u32,
        frame_type: Some(frame_type),
        raw_type: frame_type as u8,
        flags: FrameFlags(flags),
        stream_id,
    };
    let mut out = Vec::with_capacity(FRAME_HEADER_LENGTH + payload.len());
    header.serialize(&mut out);
    out.extend_from_slice(payload);
    out
}

pub fn build_settings_frame(entries: &[(u16, u32)], ack: bool) -> Vec<u8> {
    if ack {
        return build_frame(FrameType::Settings, FrameFlags::ACK, 0, &[]);
    }
    let mut payload = Vec::with_capacity(entries.len() * 6);
    for &(id, value) in entries {
        payload.extend_from_slice(&id.to_be_bytes());
        payload.extend_from_slice(&value.to_be_bytes());
    }
    build_frame(FrameType::Settings, 0, 0, &payload)
}

pub fn build_ping_frame(opaque: [u8; 8], ack: bool) -> Vec<u8> {
    let flags = if ack { FrameFlags::ACK } else { 0 };
    build_frame(FrameType::Ping, flags, 0, &opaque)
}

pub fn build_goaway_frame(last_stream_id: u32, error_code: Http2ErrorCode) -> Vec<u8> {
    build_frame(FrameType::GoAway, 0, 0, &super::frame::goaway_payload(last_stream_id, error_code, &[]))
}

pub fn build_rst_stream_frame(stream_id: u32, error_code: Http2ErrorCode) -> Vec<u8> {
    build_frame(FrameType::RstStream, 0, stream_id, &super::frame::rst_stream_payload(error_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_frame_roundtrip() {
        let built = build_frame(FrameType::Data, FrameFlags::END_STREAM, 1, b"hello");
        let mut reader = ByteReader::new(Cursor::new(built));
        let (header, payload) = read_frame(&mut reader, 16384).unwrap();
        assert_eq!(header.stream_id, 1);
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn oversized_frame_is_frame_size_error() {
        let built = build_frame(FrameType::Data, 0, 1, &vec![0u8; 100]);
        let mut reader = ByteReader::new(Cursor::new(built));
        assert!(matches!(
            read_frame(&mut reader, 50),
            Err(Error::Http2(Http2ErrorCode::FrameSizeError))
        ));
    }

    #[test]
    fn settings_frame_on_nonzero_stream_is_protocol_error() {
        let built = build_frame(FrameType::Settings, 0, 1, &[]);
        let mut reader = ByteReader::new(Cursor::new(built));
        assert!(matches!(
            read_frame(&mut reader, 16384),
            Err(Error::Http2(Http2ErrorCode::ProtocolError))
        ));
    }

    #[test]
    fn data_frame_on_stream_zero_is_protocol_error() {
        let built = build_frame(FrameType::Data, 0, 0, b"x");
        let mut reader = ByteReader::new(Cursor::new(built));
        assert!(matches!(
            read_frame(&mut reader, 16384),
            Err(Error::Http2(Http2ErrorCode::ProtocolError))
        ));
    }

    #[test]
    fn settings_ack_with_nonempty_payload_errors() {
        let result = parse_settings(b"xxxxxx", FrameFlags(FrameFlags::ACK));
        assert!(result.is_err());
    }

    #[test]
    fn settings_payload_not_multiple_of_six_errors() {
        let result = parse_settings(b"xxx", FrameFlags(0));
        assert!(result.is_err());
    }

    #[test]
    fn validate_settings_rejects_bad_enable_push() {
        assert!(validate_settings_value(0x2, 2).is_err());
        assert!(validate_settings_value(0x2, 0).is_ok());
        assert!(validate_settings_value(0x2, 1).is_ok());
    }

    #[test]
    fn validate_settings_rejects_oversized_initial_window() {
        assert!(validate_settings_value(0x4, 1u32 << 31).is_err());
    }

    #[test]
    fn validate_settings_rejects_max_frame_size_out_of_bounds() {
        assert!(validate_settings_value(0x5, 100).is_err());
        assert!(validate_settings_value(0x5, 20_000_000).is_err());
        assert!(validate_settings_value(0x5, 16384).is_ok());
    }

    #[test]
    fn window_update_zero_increment_parses_but_is_checked_by_caller() {
        let payload = [0, 0, 0, 0];
        assert_eq!(parse_window_update(&payload).unwrap(), 0);
    }

    #[test]
    fn strip_padding_rejects_pad_longer_than_remaining() {
        let payload = [5u8, 1, 2];
        assert!(strip_padding(&payload, true).is_err());
    }

    #[test]
    fn strip_padding_removes_prefix_and_suffix() {
        let payload = [2u8, b'h', b'i', 0, 0];
        let data = strip_padding(&payload, true).unwrap();
        assert_eq!(data, b"hi");
    }

    #[test]
    fn goaway_roundtrip() {
        let built = build_goaway_frame(7, Http2ErrorCode::ProtocolError);
        let mut reader = ByteReader::new(Cursor::new(built));
        let (header, payload) = read_frame(&mut reader, 16384).unwrap();
        assert_eq!(header.frame_type, Some(FrameType::GoAway));
        let (last_id, code, debug) = parse_goaway(&payload).unwrap();
        assert_eq!(last_id, 7);
        assert_eq!(code, Http2ErrorCode::ProtocolError);
        assert!(debug.is_empty());
    }
}
