//! HTTP/1 and HTTP/2 protocol core: byte reader, HPACK codec, H2 frame codec, the
//! request/response pipeline built on top of them, and the worker-pool driven server
//! loop that schedules connections onto it.

pub mod bytereader;
pub mod h2;
pub mod hpack;
pub mod http;
pub mod server;
pub mod utils;

pub use bytereader::ByteReader;
pub use http::{HttpReader, HttpResponder, Request, Response, Transport};
pub use server::{AlpnProtocol, Connection, ConnectionOutcome, RouteDispatcher, ServerConfig, WorkerPool};
