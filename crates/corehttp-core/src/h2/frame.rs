// HTTP/2 frame types, flags, and settings identifiers (RFC 7540 §4, §6, §11.3).

use corehttp_common::error::{Error, Http2ErrorCode};
use std::convert::TryFrom;

pub const FRAME_HEADER_LENGTH: usize = 9;
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16384;
pub const MIN_MAX_FRAME_SIZE: u32 = 16384;
pub const MAX_MAX_FRAME_SIZE: u32 = 16_777_215;
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;
pub const MAX_INITIAL_WINDOW_SIZE: u32 = (1u32 << 31) - 1;

/// Frame type identifiers (RFC 7540 §11.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    RstStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    GoAway = 0x7,
    WindowUpdate = 0x8,
    Continuation = 0x9,
}

impl FrameType {
    pub fn try_from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Data),
            0x1 => Some(Self::Headers),
            0x2 => Some(Self::Priority),
            0x3 => Some(Self::RstStream),
            0x4 => Some(Self::Settings),
            0x5 => Some(Self::PushPromise),
            0x6 => Some(Self::Ping),
            0x7 => Some(Self::GoAway),
            0x8 => Some(Self::WindowUpdate),
            0x9 => Some(Self::Continuation),
            // Unknown frame types are passed through by the caller, never rejected here.
            _ => None,
        }
    }
}

impl TryFrom<u8> for FrameType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        Self::try_from_u8(value).ok_or(value)
    }
}

/// Frame flags (RFC 7540 §4.1); meaning depends on the carrying frame type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(pub u8);

impl FrameFlags {
    pub const ACK: u8 = 0x1;
    pub const END_STREAM: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;

    #[inline]
    pub fn has(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }
}

/// SETTINGS parameter identifiers (RFC 7540 §6.5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SettingId {
    HeaderTableSize = 0x1,
    EnablePush = 0x2,
    MaxConcurrentStreams = 0x3,
    InitialWindowSize = 0x4,
    MaxFrameSize = 0x5,
    MaxHeaderListSize = 0x6,
}

impl SettingId {
    pub fn try_from_u16(value: u16) -> Option<Self> {
        match value {
            0x1 => Some(Self::HeaderTableSize),
            0x2 => Some(Self::EnablePush),
            0x3 => Some(Self::MaxConcurrentStreams),
            0x4 => Some(Self::InitialWindowSize),
            0x5 => Some(Self::MaxFrameSize),
            0x6 => Some(Self::MaxHeaderListSize),
            _ => None,
        }
    }
}

/// A parsed 9-byte frame header (RFC 7540 §4.1). `stream_id` already has the reserved
/// top bit masked off.
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: Option<FrameType>,
    pub raw_type: u8,
    pub flags: FrameFlags,
    pub stream_id: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < FRAME_HEADER_LENGTH {
            return Err(Error::Eof);
        }
        let length = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);
        let raw_type = bytes[3];
        let flags = FrameFlags(bytes[4]);
        let stream_id = u32::from_be_bytes([bytes[5] & 0x7f, bytes[6], bytes[7], bytes[8]]);
        Ok(Self {
            length,
            frame_type: FrameType::try_from_u8(raw_type),
            raw_type,
            flags,
            stream_id,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.push((self.length >> 16) as u8);
        out.push((self.length >> 8) as u8);
        out.push(self.length as u8);
        out.push(self.raw_type);
        out.push(self.flags.0);
        out.extend_from_slice(&(self.stream_id & 0x7fff_ffff).to_be_bytes());
    }
}

/// A complete frame: header plus payload bytes, already stripped of padding framing at
/// this layer (padding is interpreted by the per-frame-type parser in `codec.rs`).
#[derive(Debug)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
}

pub fn goaway_payload(last_stream_id: u32, error_code: Http2ErrorCode, debug_data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + debug_data.len());
    out.extend_from_slice(&(last_stream_id & 0x7fff_ffff).to_be_bytes());
    out.extend_from_slice(&(error_code as u32).to_be_bytes());
    out.extend_from_slice(debug_data);
    out
}

pub fn rst_stream_payload(error_code: Http2ErrorCode) -> Vec<u8> {
    (error_code as u32).to_be_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_frame_header_roundtrip() {
        let header = FrameHeader {
            length: 8,
            frame_type: Some(FrameType::Data),
            raw_type: FrameType::Data as u8,
            flags: FrameFlags(FrameFlags::END_STREAM),
            stream_id: 1,
        };
        let mut bytes = Vec::new();
        header.serialize(&mut bytes);
        let parsed = FrameHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.length, 8);
        assert_eq!(parsed.frame_type, Some(FrameType::Data));
        assert!(parsed.flags.has(FrameFlags::END_STREAM));
        assert_eq!(parsed.stream_id, 1);
    }

    #[test]
    fn unknown_frame_type_is_none_not_error() {
        let bytes = [0, 0, 0, 0xef, 0, 0, 0, 0, 1];
        let parsed = FrameHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.frame_type, None);
        assert_eq!(parsed.raw_type, 0xef);
    }

    #[test]
    fn reserved_bit_is_masked_from_stream_id() {
        let bytes = [0, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff];
        let parsed = FrameHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.stream_id, 0x7fff_ffff);
    }
}
