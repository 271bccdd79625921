//! Request/response data model, wire parsing (HTTP/1 and HTTP/2), and response
//! serialization built on top of `bytereader`, `hpack`, and `h2`.

pub mod reader;
pub mod request;
pub mod responder;
pub mod response;

pub use reader::{HttpReader, Transport};
pub use request::{Authority, Headers, Method, Path, ProtocolVersion, QueryMap, Request, RequestUri};
pub use responder::{BodyEncoder, ContentCoding, HttpResponder, NoopBodyEncoder, SendSettings, SERVER_IDENTIFIER};
pub use response::{Response, StatusCode};
