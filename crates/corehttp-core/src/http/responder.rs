// Response construction and serialization: header synthesis, compression negotiation,
// and emission over either HTTP/1 line-based framing or HTTP/2 HEADERS/DATA frames.

use std::io::Write;

use corehttp_common::error::Result;

use crate::h2::{codec, ConnectionContext, FrameFlags, FrameType};
use crate::hpack::encode_headers;

use super::request::{Method, ProtocolVersion};
use super::response::{Response, StatusCode};

pub const SERVER_IDENTIFIER: &str = "corehttp/1.0";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Negotiated content-encoding behavior the responder applies when emitting a body.
/// Compression codecs themselves are external collaborators reached through
/// `BodyEncoder`; this enum only records the outcome of negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Identity,
    Gzip,
    Deflate,
    Br,
}

impl ContentCoding {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Br => "br",
        }
    }
}

/// Negotiated behavior for a single response: which coding to apply (if any) and
/// whether the request was HEAD (body suppressed on the wire but headers unchanged).
///
/// There is no keep-alive field: every HTTP/1 response closes the connection after one
/// request/response cycle (persistent connections beyond that are out of scope here).
#[derive(Debug, Clone, Copy)]
pub struct SendSettings {
    pub coding: ContentCoding,
    pub is_head: bool,
}

impl SendSettings {
    pub fn for_request(method: Method, _protocol_version: ProtocolVersion, accept_encoding: Option<&str>) -> Self {
        Self { coding: negotiate_coding(accept_encoding), is_head: method == Method::Head }
    }
}

fn negotiate_coding(accept_encoding: Option<&str>) -> ContentCoding {
    let Some(header) = accept_encoding else {
        return ContentCoding::Identity;
    };
    for token in header.split(',').map(|t| t.trim()) {
        match token.split(';').next().unwrap_or(token).trim() {
            "br" => return ContentCoding::Br,
            "gzip" => return ContentCoding::Gzip,
            "deflate" => return ContentCoding::Deflate,
            _ => continue,
        }
    }
    ContentCoding::Identity
}

/// External collaborator that performs the actual byte-level compression; the responder
/// only decides *whether* and *which* coding to apply (§4.5.1) and falls back to identity
/// on failure.
pub trait BodyEncoder {
    fn encode(&self, coding: ContentCoding, body: &[u8]) -> std::result::Result<Vec<u8>, String>;
}

/// Identity-only encoder used when no real compressor is wired in; always "succeeds" by
/// returning the body unchanged, so callers that haven't plugged in gzip/br/deflate still
/// get correct (uncompressed) responses rather than a hard failure.
pub struct NoopBodyEncoder;

impl BodyEncoder for NoopBodyEncoder {
    fn encode(&self, _coding: ContentCoding, body: &[u8]) -> std::result::Result<Vec<u8>, String> {
        Ok(body.to_vec())
    }
}

/// Serializes responses onto the wire, HTTP/1 via a line-based builder, HTTP/2 via
/// HEADERS/DATA frames written through the shared `ConnectionContext`'s HPACK encoder.
pub struct HttpResponder<'a> {
    encoder: &'a dyn BodyEncoder,
}

impl<'a> HttpResponder<'a> {
    pub fn new(encoder: &'a dyn BodyEncoder) -> Self {
        Self { encoder }
    }

    /// Applies compression (§4.5.1) and the standard header set (§4.5), then writes an
    /// HTTP/1 response.
    pub fn send_http1<W: Write>(&self, writer: &mut W, mut response: Response, settings: SendSettings) -> Result<()> {
        self.apply_compression(&mut response, settings.coding);
        self.synthesize_common_headers(&mut response, settings);

        let mut buf = Vec::with_capacity(256 + response.body.len());
        write_status_line(&mut buf, response.status);
        for (name, value) in response.headers.as_pairs() {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(b"\r\n");
        if !settings.is_head && !response.status.forbids_body() {
            buf.extend_from_slice(&response.body);
        }
        writer.write_all(&buf).map_err(corehttp_common::error::Error::Io)?;
        Ok(())
    }

    /// Emits one HEADERS frame followed by zero or more DATA frames (§4.5.3).
    pub fn send_http2<W: Write>(&self, writer: &mut W, ctx: &mut ConnectionContext, stream_id: u32, mut response: Response, settings: SendSettings) -> Result<()> {
        self.apply_compression(&mut response, settings.coding);
        self.synthesize_common_headers(&mut response, settings);

        let mut pseudo_and_headers: Vec<(&str, &str)> = Vec::with_capacity(response.headers.as_pairs().len() + 1);
        let status_str = response.status.0.to_string();
        pseudo_and_headers.push((":status", &status_str));
        for (name, value) in response.headers.as_pairs() {
            pseudo_and_headers.push((name.as_str(), value.as_str()));
        }

        let mut header_block = Vec::new();
        encode_headers(&pseudo_and_headers, &mut header_block);

        let body_len = if settings.is_head || response.status.forbids_body() { 0 } else { response.body.len() };
        let end_stream_on_headers = body_len == 0;
        let headers_flags = FrameFlags::END_HEADERS | if end_stream_on_headers { FrameFlags::END_STREAM } else { 0 };
        let headers_frame = codec::build_frame(FrameType::Headers, headers_flags, stream_id, &header_block);
        writer.write_all(&headers_frame).map_err(corehttp_common::error::Error::Io)?;

        if body_len > 0 {
            let max_frame_size = ctx.peer_settings.max_frame_size as usize;
            let body = &response.body[..body_len];
            let mut offset = 0;
            while offset < body.len() {
                let chunk_end = (offset + max_frame_size).min(body.len());
                let is_last = chunk_end == body.len();
                let flags = if is_last { FrameFlags::END_STREAM } else { 0 };
                let frame = codec::build_frame(FrameType::Data, flags, stream_id, &body[offset..chunk_end]);
                writer.write_all(&frame).map_err(corehttp_common::error::Error::Io)?;
                offset = chunk_end;
            }
        }
        Ok(())
    }

    fn apply_compression(&self, response: &mut Response, coding: ContentCoding) {
        if coding == ContentCoding::Identity {
            return;
        }
        match self.encoder.encode(coding, &response.body) {
            Ok(compressed) => {
                response.body = compressed;
                response.headers.push("Content-Encoding", coding.token());
            }
            Err(_) => {
                // Downgrade to identity; the caller's logging layer is responsible for
                // surfacing the compression-failure warning (§4.5.1).
            }
        }
    }

    /// Content-Type, Content-Length (HTTP/1 only), Server, and Connection (§4.5).
    fn synthesize_common_headers(&self, response: &mut Response, settings: SendSettings) {
        if !response.headers.contains("content-type") {
            response.headers.push("Content-Type", DEFAULT_CONTENT_TYPE);
        }
        if !response.headers.contains("server") {
            response.headers.push("Server", SERVER_IDENTIFIER);
        }
        // HEAD carries the Content-Length that the matching GET body would have had
        // (§4.5.2), even though the body bytes themselves are suppressed on the wire.
        if !response.status.forbids_body() {
            response.headers.push("Content-Length", response.body.len().to_string());
        }
        if response.status.0 != 101 {
            response.headers.push("Connection", "close");
        }
    }
}

fn write_status_line(buf: &mut Vec<u8>, status: StatusCode) {
    buf.extend_from_slice(b"HTTP/1.1 ");
    buf.extend_from_slice(status.0.to_string().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(status.reason_phrase().as_bytes());
    buf.extend_from_slice(b"\r\n");
}
