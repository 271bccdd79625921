// Drives a single accepted connection end to end: detect/confirm framing, read requests
// off the shared HttpReader, dispatch them to the route manager, and write responses back
// with HttpResponder. One worker thread owns exactly one Connection for its entire life.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use corehttp_common::error::{Error, Http2ErrorCode, Result};
use tracing::{debug, info_span, warn};

use crate::h2::codec as h2_codec;
use crate::http::{HttpReader, HttpResponder, NoopBodyEncoder, Request, Response, SendSettings, StatusCode, Transport};

use super::alpn::AlpnProtocol;
use super::config::ServerConfig;

/// External collaborator the connection hands parsed requests to. Implementations decide
/// routing, auth, and response bodies; the core only enforces method/URI-form consistency
/// before calling in (§6 "Route dispatcher interface").
pub trait RouteDispatcher: Send + Sync {
    fn dispatch(&self, request: &Request) -> DispatchOutcome;
}

/// What the dispatcher wants done with a request.
pub enum DispatchOutcome {
    Respond(Response),
    /// The connection should close after the in-flight response is written.
    Shutdown(Response),
    /// Ownership of the connection is being transferred to an external long-lived
    /// WebSocket handler; the core must not touch it again after this response is sent.
    UpgradeWebSocket(Response),
}

/// A connection handed off to an external collaborator (e.g. a WebSocket handler) no
/// longer participates in the worker pool's request/response loop.
pub enum ConnectionOutcome {
    Closed { requests_served: u64 },
    HandedOff { requests_served: u64 },
}

pub struct Connection<S: Read + Write> {
    reader: HttpReader<S>,
    peer_addr: SocketAddr,
    config: ServerConfig,
    alpn: AlpnProtocol,
    dispatcher: Arc<dyn RouteDispatcher>,
    requests_served: u64,
    created_at: Instant,
}

impl<S: Read + Write> Connection<S> {
    pub fn new(stream: S, peer_addr: SocketAddr, config: ServerConfig, alpn: AlpnProtocol, dispatcher: Arc<dyn RouteDispatcher>) -> Self {
        Self {
            reader: HttpReader::new(stream),
            peer_addr,
            config,
            alpn,
            dispatcher,
            requests_served: 0,
            created_at: Instant::now(),
        }
    }

    /// Services requests on this connection until it closes, a dispatcher asks to shut
    /// down, or a WebSocket upgrade hands ownership elsewhere. Never returns an `Err` for
    /// expected client misbehavior — protocol violations are answered on the wire and the
    /// loop ends cleanly.
    pub fn run(mut self) -> ConnectionOutcome {
        let span = info_span!("connection", peer = %self.peer_addr, alpn = ?self.alpn);
        let _guard = span.enter();

        loop {
            match self.serve_one_request() {
                Ok(Loop::Continue) => continue,
                Ok(Loop::Close) => break,
                Ok(Loop::HandOff) => {
                    return ConnectionOutcome::HandedOff { requests_served: self.requests_served };
                }
                Err(err) => {
                    warn!(error = %err, "closing connection after unrecoverable error");
                    self.write_best_effort_error(&err);
                    break;
                }
            }
        }

        debug!(
            requests_served = self.requests_served,
            duration_ms = self.created_at.elapsed().as_millis() as u64,
            "connection closed"
        );
        ConnectionOutcome::Closed { requests_served: self.requests_served }
    }

    fn serve_one_request(&mut self) -> Result<Loop> {
        let was_undecided = self.reader.transport().is_none();
        let request = self.reader.next_request()?;

        if was_undecided && self.reader.transport() == Some(Transport::Http2) {
            self.send_http2_handshake_settings()?;
        }

        self.requests_served += 1;
        let transport = self.reader.transport().expect("transport decided once a request parses");

        let accept_encoding = request.headers.get("accept-encoding").map(str::to_owned);
        let settings = SendSettings::for_request(request.method, request.protocol_version, accept_encoding.as_deref());

        let outcome = self.dispatcher.dispatch(&request);
        let encoder = NoopBodyEncoder;
        let responder = HttpResponder::new(&encoder);

        match outcome {
            DispatchOutcome::Respond(response) => {
                self.send_response(&responder, &request, response, settings, transport)?;
                // HTTP/1 always closes after one response (persistent connections are out
                // of scope here); HTTP/2 keeps the connection open to multiplex further
                // streams, which is core protocol behavior rather than HTTP/1 keep-alive.
                let next = match transport {
                    Transport::Http1 => Loop::Close,
                    Transport::Http2 => Loop::Continue,
                };
                Ok(next)
            }
            DispatchOutcome::Shutdown(response) => {
                self.send_response(&responder, &request, response, settings, transport)?;
                Ok(Loop::Close)
            }
            DispatchOutcome::UpgradeWebSocket(response) => {
                self.send_response(&responder, &request, response, settings, transport)?;
                Ok(Loop::HandOff)
            }
        }
    }

    fn send_response(
        &mut self,
        responder: &HttpResponder<'_>,
        request: &Request,
        response: Response,
        settings: SendSettings,
        transport: Transport,
    ) -> Result<()> {
        match transport {
            Transport::Http1 => responder.send_http1(self.reader.writer_mut(), response, settings),
            Transport::Http2 => {
                let stream_id = request.stream_id.ok_or_else(|| Error::ProtocolError("HTTP/2 response missing stream id".into()))?;
                let (writer, ctx) = self.reader.writer_and_h2_context();
                let ctx = ctx.expect("HTTP/2 context present once transport is decided");
                responder.send_http2(writer, ctx, stream_id, response, settings)
            }
        }
    }

    fn send_http2_handshake_settings(&mut self) -> Result<()> {
        let settings = &self.config.http2_initial_settings;
        let entries = [
            (0x1u16, settings.header_table_size),
            (0x3, settings.max_concurrent_streams.unwrap_or(100)),
            (0x4, settings.initial_window_size),
            (0x5, settings.max_frame_size),
        ];
        let frame = h2_codec::build_settings_frame(&entries, false);
        self.reader.writer_mut().write_all(&frame).map_err(Error::Io)?;
        // The client's own preface SETTINGS frame was already consumed and applied while
        // assembling the first request; acknowledge it now that we can write.
        let ack = h2_codec::build_settings_frame(&[], true);
        self.reader.writer_mut().write_all(&ack).map_err(Error::Io)
    }

    fn write_best_effort_error(&mut self, err: &Error) {
        match self.reader.transport() {
            Some(Transport::Http1) | None => {
                let encoder = NoopBodyEncoder;
                let responder = HttpResponder::new(&encoder);
                let response = Response::text(StatusCode::BAD_REQUEST, err.to_string());
                let settings = SendSettings { coding: crate::http::ContentCoding::Identity, is_head: false };
                let _ = responder.send_http1(self.reader.writer_mut(), response, settings);
            }
            Some(Transport::Http2) => {
                let code = match err {
                    Error::Http2(code) => *code,
                    _ => Http2ErrorCode::InternalError,
                };
                let frame = h2_codec::build_goaway_frame(0, code);
                let _ = self.reader.writer_mut().write_all(&frame);
            }
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

enum Loop {
    Continue,
    Close,
    HandOff,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct EchoDispatcher;
    impl RouteDispatcher for EchoDispatcher {
        fn dispatch(&self, request: &Request) -> DispatchOutcome {
            DispatchOutcome::Respond(Response::text(StatusCode::OK, request.uri_path_for_test()))
        }
    }

    impl Request {
        fn uri_path_for_test(&self) -> String {
            format!("{:?}", self.uri)
        }
    }

    struct DuplexStream {
        read: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }
    impl Read for DuplexStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.read.read(buf)
        }
    }
    impl Write for DuplexStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn serves_single_http1_request_then_closes() {
        let request = b"GET /hi HTTP/1.0\r\n\r\n".to_vec();
        let stream = DuplexStream { read: Cursor::new(request), written: Vec::new() };
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let conn = Connection::new(stream, addr, ServerConfig::default(), AlpnProtocol::None, Arc::new(EchoDispatcher));

        match conn.run() {
            ConnectionOutcome::Closed { requests_served } => assert_eq!(requests_served, 1),
            ConnectionOutcome::HandedOff { .. } => panic!("expected closed outcome"),
        }
    }
}
