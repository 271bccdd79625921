// Server-wide configuration: transport timeouts, request size limits, worker pool shape,
// and the HTTP/2 SETTINGS values advertised on every new connection.

use std::time::Duration;

#[cfg(feature = "config")]
use serde::Deserialize;

use crate::h2::Settings as Http2Settings;

/// Configuration shared by every connection a `WorkerPool` services. Immutable after
/// construction and cheaply `Clone`-able so each worker gets its own copy.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ServerConfig {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub keep_alive_timeout: Duration,
    pub max_request_size: usize,
    pub max_header_size: usize,
    pub tcp_nodelay: bool,
    /// Fixed thread count for the connection-servicing `WorkerPool` (§5.1).
    pub worker_threads: usize,
    /// SETTINGS values advertised to peers on every new HTTP/2 connection.
    pub http2_initial_settings: Http2Settings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            keep_alive_timeout: Duration::from_secs(120),
            max_request_size: 10 * 1024 * 1024,
            max_header_size: 8192,
            tcp_nodelay: true,
            worker_threads: default_worker_threads(),
            http2_initial_settings: Http2Settings::default(),
        }
    }
}

/// Mirrors the original's `get_nprocs() + 1` sizing: one thread compensates for the idle
/// time any single core accumulates while others block on I/O.
fn default_worker_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get() + 1).unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_worker_threads_is_at_least_two() {
        let config = ServerConfig::default();
        assert!(config.worker_threads >= 2);
    }

    #[test]
    fn default_http2_settings_match_rfc_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http2_initial_settings.max_frame_size, 16384);
    }
}
