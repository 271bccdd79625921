// Protocol selection and request assembly: HTTP/1 request-line/header/body parsing, the
// HTTP/2 preface handshake, and HTTP/2 stream-to-request assembly, all driven off a
// single ByteReader so partial reads are handled in one place.

use std::io::Read;

use corehttp_common::error::{Error, Http2ErrorCode, Result};

use crate::bytereader::ByteReader;
use crate::h2::{self, ConnectionContext, FrameFlags, FrameType, CONNECTION_PREFACE};
use crate::hpack::HeaderList;
use crate::utils::simd::{SimdDelimiterFinder, SimdTokenValidator, SimdWhitespaceSkipper};

use super::request::{Headers, Method, ProtocolVersion, Request, RequestUri};

const MAX_REQUEST_LINE_LEN: usize = 8192;
const MAX_HEADER_LINE_LEN: usize = 8192;
const MAX_HEADERS: usize = 128;
const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

/// Which framing the connection has settled into. `Undecided` is only observed before
/// the first request-line is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http1,
    Http2,
}

/// Reads one complete request at a time off a connection, switching between HTTP/1
/// line-based framing and HTTP/2 binary framing as the first request-line dictates.
pub struct HttpReader<S> {
    bytes: ByteReader<S>,
    transport: Option<Transport>,
    h2_ctx: Option<ConnectionContext>,
    /// Decoded request head (method/uri/headers) waiting on a stream's DATA frames to
    /// complete the body, keyed by stream id.
    pending_h2_requests: std::collections::HashMap<u32, (Method, RequestUri, Headers)>,
    space_finder: SimdDelimiterFinder,
    colon_finder: SimdDelimiterFinder,
}

impl<S: Read> HttpReader<S> {
    pub fn new(conn: S) -> Self {
        Self {
            bytes: ByteReader::new(conn),
            transport: None,
            h2_ctx: None,
            pending_h2_requests: std::collections::HashMap::new(),
            space_finder: SimdDelimiterFinder::new(b' '),
            colon_finder: SimdDelimiterFinder::new(b':'),
        }
    }

    pub fn transport(&self) -> Option<Transport> {
        self.transport
    }

    /// Frame headers read during the HTTP/2 preface handshake, to be written back to the
    /// peer by the caller (the server preface SETTINGS and its follow-on ACK live above
    /// this layer since they require write access to the connection).
    pub fn take_h2_context(&mut self) -> Option<&mut ConnectionContext> {
        self.h2_ctx.as_mut()
    }

    /// Direct access to the underlying connection for writing responses between reads.
    pub fn writer_mut(&mut self) -> &mut S {
        self.bytes.conn_mut()
    }

    /// Splits the borrow so a caller can write an HTTP/2 response through the
    /// connection while also holding the HPACK encoder state, without needing two
    /// separate `&mut self` borrows of the whole reader.
    pub fn writer_and_h2_context(&mut self) -> (&mut S, Option<&mut ConnectionContext>) {
        (self.bytes.conn_mut(), self.h2_ctx.as_mut())
    }

    /// Reads and decides the framing of the very first request on the connection
    /// (§4.4.1). Returns the parsed request-line plus, for HTTP/2, confirmation that the
    /// remainder of the preface matched.
    pub fn next_request(&mut self) -> Result<Request> {
        match self.transport {
            None => self.read_first_request(),
            Some(Transport::Http1) => self.read_http1_request(),
            Some(Transport::Http2) => self.read_http2_request(),
        }
    }

    fn read_first_request(&mut self) -> Result<Request> {
        let preface_candidate = self.bytes.peek(CONNECTION_PREFACE.len())?;
        if preface_candidate == CONNECTION_PREFACE {
            self.bytes.read_exact(CONNECTION_PREFACE.len())?;
            self.transport = Some(Transport::Http2);
            self.h2_ctx = Some(ConnectionContext::new());
            return self.read_http2_request();
        }
        // Not the full preface; if it merely starts the same way as the request-line
        // prefix "PRI * HTTP/2.0" without the rest matching, that is a protocol error
        // rather than falling back to HTTP/1 (§4.4.1: "On mismatch, respond with a
        // connection-level error and close").
        if preface_candidate.starts_with(b"PRI * HTTP/2.0") {
            return Err(Error::InvalidHttp2Preface);
        }
        self.transport = Some(Transport::Http1);
        self.read_http1_request()
    }

    // ---- HTTP/1 -----------------------------------------------------------------

    fn read_http1_request(&mut self) -> Result<Request> {
        let line = self.bytes.read_until(b"\r\n")?;
        if line.len() > MAX_REQUEST_LINE_LEN {
            return Err(Error::RequestTooLarge);
        }
        let (method, uri, version) = self.parse_request_line(&line)?;

        let headers = self.read_http1_headers()?;
        let body = self.read_http1_body(&method, &version, &headers)?;

        let request = Request { method, uri, protocol_version: version, stream_id: None, headers, body };
        request.validate()?;
        Ok(request)
    }

    fn parse_request_line(&self, line: &[u8]) -> Result<(Method, RequestUri, ProtocolVersion)> {
        let method_end = self.space_finder.find_in(line).ok_or_else(|| Error::ProtocolError("malformed request line".into()))?;
        let method_token = std::str::from_utf8(&line[..method_end]).map_err(|_| Error::ProtocolError("non-UTF8 method".into()))?;
        let method = Method::parse(method_token)?;

        let target_start = method_end + 1;
        let target_end_rel = self
            .space_finder
            .find_in(&line[target_start..])
            .ok_or_else(|| Error::ProtocolError("malformed request line".into()))?;
        let target_end = target_start + target_end_rel;
        let target = std::str::from_utf8(&line[target_start..target_end]).map_err(|_| Error::ProtocolError("non-UTF8 request-target".into()))?;
        let uri = RequestUri::parse(target, method)?;

        let version_start = target_end + 1;
        let version_token = std::str::from_utf8(&line[version_start..]).map_err(|_| Error::ProtocolError("non-UTF8 version".into()))?;
        let version = ProtocolVersion::parse(version_token)?;

        Ok((method, uri, version))
    }

    fn read_http1_headers(&mut self) -> Result<Headers> {
        let mut headers = Headers::new();
        loop {
            let line = self.bytes.read_until(b"\r\n")?;
            if line.is_empty() {
                return Ok(headers);
            }
            if line.len() > MAX_HEADER_LINE_LEN {
                return Err(Error::RequestTooLarge);
            }
            if headers.0.len() >= MAX_HEADERS {
                return Err(Error::RequestTooLarge);
            }
            let colon = self.colon_finder.find_in(&line).ok_or_else(|| Error::InvalidHeader("missing colon".into()))?;
            let name_bytes = &line[..colon];
            if !SimdTokenValidator::is_valid_token(name_bytes) {
                return Err(Error::InvalidHeader("invalid header name".into()));
            }
            let name = std::str::from_utf8(name_bytes).map_err(|_| Error::InvalidHeader("non-UTF8 header name".into()))?;
            let value_bytes = SimdWhitespaceSkipper::skip_whitespace(&line[colon + 1..]);
            let trimmed_end = value_bytes.iter().rposition(|&b| b != b' ' && b != b'\t').map(|p| p + 1).unwrap_or(0);
            let value = std::str::from_utf8(&value_bytes[..trimmed_end]).map_err(|_| Error::InvalidHeader("non-UTF8 header value".into()))?;
            headers.push(name, value);
        }
    }

    /// RFC 9112 §6.3 priority order.
    fn read_http1_body(&mut self, method: &Method, version: &ProtocolVersion, headers: &Headers) -> Result<Vec<u8>> {
        let has_te = headers.contains("transfer-encoding");
        let has_cl = headers.contains("content-length");
        if has_te && has_cl {
            return Err(Error::ProtocolError("both Transfer-Encoding and Content-Length present".into()));
        }

        if has_te {
            let encoding = headers.get("transfer-encoding").unwrap_or_default();
            if !encoding.split(',').any(|tok| tok.trim().eq_ignore_ascii_case("chunked")) {
                return Err(Error::NotSupported(format!("transfer-encoding: {encoding}")));
            }
            return self.read_chunked_body();
        }

        if has_cl {
            let raw = headers.get("content-length").unwrap_or_default();
            let len: usize = raw.parse().map_err(|_| Error::ProtocolError("invalid Content-Length".into()))?;
            if len > MAX_BODY_LEN {
                return Err(Error::RequestTooLarge);
            }
            let _ = method;
            return self.bytes.read_exact(len);
        }

        if *version == ProtocolVersion::Http10 && headers.has_token("connection", "close") {
            return self.bytes.read_to_end();
        }

        Ok(Vec::new())
    }

    fn read_chunked_body(&mut self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        loop {
            let size_line = self.bytes.read_until(b"\r\n")?;
            let size_str = std::str::from_utf8(&size_line).map_err(|_| Error::ProtocolError("invalid chunk size".into()))?;
            let size_token = size_str.split(';').next().unwrap_or(size_str).trim();
            let chunk_size = usize::from_str_radix(size_token, 16).map_err(|_| Error::ProtocolError("invalid chunk size".into()))?;
            if chunk_size == 0 {
                self.skip_trailers()?;
                return Ok(body);
            }
            if body.len() + chunk_size > MAX_BODY_LEN {
                return Err(Error::RequestTooLarge);
            }
            let chunk = self.bytes.read_exact(chunk_size)?;
            body.extend_from_slice(&chunk);
            let crlf = self.bytes.read_exact(2)?;
            if crlf != b"\r\n" {
                return Err(Error::ProtocolError("missing chunk terminator".into()));
            }
        }
    }

    fn skip_trailers(&mut self) -> Result<()> {
        loop {
            let line = self.bytes.read_until(b"\r\n")?;
            if line.is_empty() {
                return Ok(());
            }
        }
    }

    // ---- HTTP/2 -------------------------------------------------------------------

    fn read_http2_request(&mut self) -> Result<Request> {
        loop {
            let max_frame_size = self.h2_ctx.as_ref().expect("http2 transport requires a connection context").local_settings.max_frame_size;
            let (header, payload) = h2::read_frame(&mut self.bytes, max_frame_size)?;
            if let Some(request) = self.handle_frame(header.into(), payload)? {
                return Ok(request);
            }
        }
    }

    fn handle_frame(&mut self, header: FrameMeta, payload: Vec<u8>) -> Result<Option<Request>> {
        match header.frame_type {
            Some(FrameType::Settings) => {
                if !header.flags.has(FrameFlags::ACK) {
                    let entries = crate::h2::codec::parse_settings(&payload, header.flags)?;
                    let ctx = self.h2_ctx.as_mut().expect("http2 transport requires a connection context");
                    ctx.apply_peer_settings(&entries).map_err(|e| Error::ProtocolError(e.to_string()))?;
                }
                Ok(None)
            }
            Some(FrameType::WindowUpdate) => {
                let _ = crate::h2::codec::parse_window_update(&payload)?;
                Ok(None)
            }
            Some(FrameType::Ping) => Ok(None),
            Some(FrameType::GoAway) => Err(Error::Http2(Http2ErrorCode::NoError)),
            Some(FrameType::Priority) => Ok(None),
            Some(FrameType::RstStream) => {
                let ctx = self.h2_ctx.as_mut().expect("http2 transport requires a connection context");
                ctx.streams.remove(&header.stream_id);
                self.pending_h2_requests.remove(&header.stream_id);
                Ok(None)
            }
            Some(FrameType::Headers) => self.handle_headers_frame(&header, payload),
            Some(FrameType::Continuation) => self.handle_continuation_frame(&header, payload),
            Some(FrameType::Data) => self.handle_data_frame(&header, payload),
            Some(FrameType::PushPromise) => Err(Error::Http2(Http2ErrorCode::ProtocolError)),
            None => Ok(None), // unknown frame types are ignored per RFC 7540 §4.1
        }
    }

    fn handle_headers_frame(&mut self, header: &FrameMeta, payload: Vec<u8>) -> Result<Option<Request>> {
        let ctx = self.h2_ctx.as_mut().expect("http2 transport requires a connection context");
        let padded = header.flags.has(FrameFlags::PADDED);
        let has_priority = header.flags.has(FrameFlags::PRIORITY);
        let mut body = crate::h2::codec::strip_padding(&payload, padded)?;
        if has_priority {
            let (_, rest) = crate::h2::codec::parse_priority(body)?;
            body = rest;
        }
        let stream = ctx.get_or_create_stream(header.stream_id);
        if !stream.pending_header_block.is_empty() {
            return Err(Error::ProtocolError("HEADERS interleaved mid-continuation".into()));
        }
        stream.state = h2::StreamState::Open;
        stream.pending_header_block.extend_from_slice(body);
        let end_headers = header.flags.has(FrameFlags::END_HEADERS);
        let end_stream = header.flags.has(FrameFlags::END_STREAM);
        stream.end_stream_pending = end_stream;
        if !end_headers {
            return Ok(None);
        }
        self.finish_header_block(header.stream_id, end_stream)
    }

    fn handle_continuation_frame(&mut self, header: &FrameMeta, payload: Vec<u8>) -> Result<Option<Request>> {
        let ctx = self.h2_ctx.as_mut().expect("http2 transport requires a connection context");
        let stream = ctx.get_or_create_stream(header.stream_id);
        if stream.pending_header_block.is_empty() && stream.headers_complete {
            return Err(Error::ProtocolError("unexpected CONTINUATION".into()));
        }
        stream.pending_header_block.extend_from_slice(&payload);
        if !header.flags.has(FrameFlags::END_HEADERS) {
            return Ok(None);
        }
        let end_stream = stream.end_stream_pending;
        self.finish_header_block(header.stream_id, end_stream)
    }

    /// Decodes the now-complete header block for `stream_id`. If the request's body also
    /// ended (END_STREAM on HEADERS, or no body expected), yields the request directly;
    /// otherwise stashes the decoded head and waits for DATA frames to supply the body.
    fn finish_header_block(&mut self, stream_id: u32, end_stream: bool) -> Result<Option<Request>> {
        let ctx = self.h2_ctx.as_mut().expect("http2 transport requires a connection context");
        let block = std::mem::take(&mut ctx.get_or_create_stream(stream_id).pending_header_block);
        let mut list = HeaderList::default();
        let mut cursor = bytes::Bytes::from(block);
        ctx.hpack_decoder.decode(&mut cursor, &mut list)?;
        ctx.get_or_create_stream(stream_id).headers_complete = true;
        if end_stream {
            ctx.get_or_create_stream(stream_id).state = h2::StreamState::HalfClosedRemote;
        }

        let (method, uri, headers) = Self::head_from_header_list(list.0)?;
        if end_stream {
            let request = Request { method, uri, protocol_version: ProtocolVersion::Http2, stream_id: Some(stream_id), headers, body: Vec::new() };
            request.validate()?;
            Ok(Some(request))
        } else {
            self.pending_h2_requests.insert(stream_id, (method, uri, headers));
            Ok(None)
        }
    }

    fn handle_data_frame(&mut self, header: &FrameMeta, payload: Vec<u8>) -> Result<Option<Request>> {
        let ctx = self.h2_ctx.as_mut().expect("http2 transport requires a connection context");
        let padded = header.flags.has(FrameFlags::PADDED);
        let body = crate::h2::codec::strip_padding(&payload, padded)?.to_vec();
        let end_stream = header.flags.has(FrameFlags::END_STREAM);
        let stream = ctx.get_or_create_stream(header.stream_id);
        stream.body.extend_from_slice(&body);
        if !end_stream || !stream.headers_complete {
            return Ok(None);
        }
        let body = std::mem::take(&mut stream.body);
        stream.state = h2::StreamState::HalfClosedRemote;
        let Some((method, uri, headers)) = self.pending_h2_requests.remove(&header.stream_id) else {
            return Ok(None);
        };
        let request = Request { method, uri, protocol_version: ProtocolVersion::Http2, stream_id: Some(header.stream_id), headers, body };
        request.validate()?;
        Ok(Some(request))
    }

    fn head_from_header_list(pairs: Vec<(String, String)>) -> Result<(Method, RequestUri, Headers)> {
        let mut method = None;
        let mut path = None;
        let mut authority = None;
        let mut scheme = None;
        let mut seen_regular_header = false;
        let mut headers = Headers::new();

        for (name, value) in pairs {
            if name.starts_with(':') {
                if seen_regular_header {
                    return Err(Error::ProtocolError("pseudo-header after regular header".into()));
                }
                match name.as_str() {
                    ":method" => method = Some(value),
                    ":path" => path = Some(value),
                    ":authority" => authority = Some(value),
                    ":scheme" => scheme = Some(value),
                    _ => return Err(Error::ProtocolError(format!("unknown pseudo-header {name}"))),
                }
            } else {
                seen_regular_header = true;
                headers.push(name, value);
            }
        }

        let method_token = method.ok_or_else(|| Error::ProtocolError("missing :method".into()))?;
        let method = Method::parse(&method_token)?;
        let path_token = path.ok_or_else(|| Error::ProtocolError("missing :path".into()))?;
        let uri = RequestUri::parse(&path_token, method)?;
        let _ = (authority, scheme);

        Ok((method, uri, headers))
    }
}

/// Borrowed view of the fields of `h2::FrameHeader` this module actually needs, so the
/// frame-handling helpers above don't need to thread the raw header type's lifetime.
struct FrameMeta {
    frame_type: Option<FrameType>,
    flags: FrameFlags,
    stream_id: u32,
}

impl From<h2::FrameHeader> for FrameMeta {
    fn from(h: h2::FrameHeader) -> Self {
        Self { frame_type: h.frame_type, flags: h.flags, stream_id: h.stream_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_simple_get_request() {
        let raw = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n".to_vec();
        let mut reader = HttpReader::new(Cursor::new(raw));
        let req = reader.next_request().unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.headers.get("host"), Some("example.com"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn reads_request_with_content_length_body() {
        let raw = b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello".to_vec();
        let mut reader = HttpReader::new(Cursor::new(raw));
        let req = reader.next_request().unwrap();
        assert_eq!(req.body, b"hello");
    }

    #[test]
    fn rejects_both_transfer_encoding_and_content_length() {
        let raw = b"POST /api HTTP/1.1\r\nContent-Length: 5\r\nTransfer-Encoding: chunked\r\n\r\nhello".to_vec();
        let mut reader = HttpReader::new(Cursor::new(raw));
        assert!(matches!(reader.next_request(), Err(Error::ProtocolError(_))));
    }

    #[test]
    fn reads_chunked_body() {
        let raw = b"POST /api HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n".to_vec();
        let mut reader = HttpReader::new(Cursor::new(raw));
        let req = reader.next_request().unwrap();
        assert_eq!(req.body, b"Wikipedia");
    }

    #[test]
    fn get_with_nonempty_body_is_rejected() {
        let raw = b"GET / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc".to_vec();
        let mut reader = HttpReader::new(Cursor::new(raw));
        assert!(matches!(reader.next_request(), Err(Error::InvalidNonEmptyBody)));
    }

    #[test]
    fn http10_close_delimited_body_reads_to_eof() {
        let raw = b"POST / HTTP/1.0\r\nConnection: close\r\n\r\nrest-of-stream".to_vec();
        let mut reader = HttpReader::new(Cursor::new(raw));
        let req = reader.next_request().unwrap();
        assert_eq!(req.body, b"rest-of-stream");
    }

    #[test]
    fn malformed_preface_prefix_is_rejected_outright() {
        let raw = b"PRI * HTTP/2.0\r\nnotthepreface".to_vec();
        let mut reader = HttpReader::new(Cursor::new(raw));
        assert!(matches!(reader.next_request(), Err(Error::InvalidHttp2Preface)));
    }

    #[test]
    fn full_h2_preface_switches_transport() {
        let mut raw = CONNECTION_PREFACE.to_vec();
        // A minimal empty SETTINGS frame follows the preface.
        raw.extend_from_slice(&crate::h2::build_settings_frame(&[], false));
        let mut reader = HttpReader::new(Cursor::new(raw));
        let result = reader.next_request();
        assert_eq!(reader.transport(), Some(Transport::Http2));
        // An empty SETTINGS frame carries no request; the reader keeps looping until it
        // either yields a request or runs out of bytes (Eof here, which is expected).
        assert!(matches!(result, Err(Error::Eof)));
    }
}
