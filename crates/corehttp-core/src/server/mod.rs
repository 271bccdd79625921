// Server-side connection lifecycle: ALPN protocol selection, per-connection configuration,
// the worker pool that schedules accepted connections onto threads, and the `Connection`
// type that drives one connection's request/response loop to completion.
//
// The old per-protocol `http1.rs`/`http2.rs`/`tls.rs`/`http3.rs` modules were removed once
// their logic was fully superseded by `crate::http` and `crate::h2`; see DESIGN.md for what
// each one was replaced by.

pub mod alpn;
pub mod config;
pub mod connection;
pub mod pool;

pub use alpn::AlpnProtocol;
pub use config::ServerConfig;
pub use connection::{Connection, ConnectionOutcome, DispatchOutcome, RouteDispatcher};
pub use pool::WorkerPool;
