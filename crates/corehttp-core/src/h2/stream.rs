// HTTP/2 stream state machine and connection-wide context (RFC 7540 §5, §6.5, §6.9).

use std::collections::HashMap;

use super::frame::{DEFAULT_HEADER_TABLE_SIZE, DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_MAX_FRAME_SIZE};
use crate::hpack::{Decoder, STATIC_TABLE_SIZE};

#[cfg(feature = "config")]
use serde::Deserialize;

/// Stream lifecycle state (RFC 7540 §5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

/// A single HTTP/2 stream. `id` is a positive 31-bit integer; client-initiated streams
/// use odd ids assigned monotonically increasing.
#[derive(Debug)]
pub struct Stream {
    pub id: u32,
    pub state: StreamState,
    pub pending_header_block: Vec<u8>,
    pub headers_complete: bool,
    /// Set when END_STREAM arrived on the HEADERS frame while the header block itself
    /// was still being continued across CONTINUATION frames.
    pub end_stream_pending: bool,
    pub body: Vec<u8>,
    pub flow_window_recv: i64,
    pub flow_window_send: i64,
}

impl Stream {
    pub fn new(id: u32, initial_window_size: u32) -> Self {
        Self {
            id,
            state: StreamState::Idle,
            pending_header_block: Vec::new(),
            headers_complete: false,
            end_stream_pending: false,
            body: Vec::new(),
            flow_window_recv: initial_window_size as i64,
            flow_window_send: initial_window_size as i64,
        }
    }
}

/// Peer-negotiable connection settings (RFC 7540 §6.5.2), with RFC-mandated defaults.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_table_size: DEFAULT_HEADER_TABLE_SIZE,
            enable_push: true,
            max_concurrent_streams: None,
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_header_list_size: None,
        }
    }
}

/// Per-connection HTTP/2 state: negotiated settings, the live stream table, and both
/// HPACK directions. One instance per accepted connection, owned by the worker thread
/// driving that connection for its whole lifetime.
pub struct ConnectionContext {
    pub local_settings: Settings,
    pub peer_settings: Settings,
    pub streams: HashMap<u32, Stream>,
    pub hpack_decoder: Decoder,
    pub last_peer_stream_id: u32,
}

impl ConnectionContext {
    pub fn new() -> Self {
        let local_settings = Settings::default();
        Self {
            hpack_decoder: Decoder::new(local_settings.header_table_size as usize),
            local_settings,
            peer_settings: Settings::default(),
            streams: HashMap::new(),
            last_peer_stream_id: 0,
        }
    }

    /// Applies a peer SETTINGS frame field-by-field; unknown identifiers were already
    /// filtered out by the codec. Returns an error string if a value is out of range.
    pub fn apply_peer_settings(&mut self, entries: &[(u16, u32)]) -> Result<(), &'static str> {
        use super::frame::{SettingId, MAX_INITIAL_WINDOW_SIZE, MAX_MAX_FRAME_SIZE, MIN_MAX_FRAME_SIZE};
        for &(id, value) in entries {
            let Some(setting) = SettingId::try_from_u16(id) else {
                continue;
            };
            match setting {
                SettingId::HeaderTableSize => {
                    self.peer_settings.header_table_size = value;
                }
                SettingId::EnablePush => {
                    if value > 1 {
                        return Err("ENABLE_PUSH must be 0 or 1");
                    }
                    self.peer_settings.enable_push = value != 0;
                }
                SettingId::MaxConcurrentStreams => {
                    self.peer_settings.max_concurrent_streams = Some(value);
                }
                SettingId::InitialWindowSize => {
                    if value > MAX_INITIAL_WINDOW_SIZE {
                        return Err("INITIAL_WINDOW_SIZE exceeds 2^31-1");
                    }
                    self.peer_settings.initial_window_size = value;
                }
                SettingId::MaxFrameSize => {
                    if !(MIN_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&value) {
                        return Err("MAX_FRAME_SIZE out of [16384, 2^24-1]");
                    }
                    self.peer_settings.max_frame_size = value;
                }
                SettingId::MaxHeaderListSize => {
                    self.peer_settings.max_header_list_size = Some(value);
                }
            }
        }
        Ok(())
    }

    /// Applies our own local-settings change (e.g. after sending SETTINGS) affecting the
    /// decoder's table cap immediately, as RFC 7541 §4.2 requires for the sender's side.
    pub fn set_local_header_table_size(&mut self, size: u32) {
        self.local_settings.header_table_size = size;
        self.hpack_decoder.set_header_table_size(size as usize);
    }

    pub fn get_or_create_stream(&mut self, id: u32) -> &mut Stream {
        let initial_window = self.local_settings.initial_window_size;
        self.streams.entry(id).or_insert_with(|| Stream::new(id, initial_window))
    }

    pub fn is_client_initiated(id: u32) -> bool {
        id % 2 == 1 && id != 0
    }
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Combined static+dynamic index space offset, exposed for callers translating HPACK
/// indices without reaching into the codec internals.
pub const fn dynamic_index_base() -> usize {
    STATIC_TABLE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_initiated_ids_are_odd() {
        assert!(ConnectionContext::is_client_initiated(1));
        assert!(!ConnectionContext::is_client_initiated(2));
        assert!(!ConnectionContext::is_client_initiated(0));
    }

    #[test]
    fn apply_peer_settings_rejects_bad_enable_push() {
        let mut ctx = ConnectionContext::new();
        let result = ctx.apply_peer_settings(&[(2, 5)]);
        assert!(result.is_err());
    }

    #[test]
    fn apply_peer_settings_rejects_oversized_initial_window() {
        let mut ctx = ConnectionContext::new();
        let result = ctx.apply_peer_settings(&[(4, 1u32 << 31)]);
        assert!(result.is_err());
    }

    #[test]
    fn apply_peer_settings_rejects_undersized_max_frame_size() {
        let mut ctx = ConnectionContext::new();
        let result = ctx.apply_peer_settings(&[(5, 100)]);
        assert!(result.is_err());
    }

    #[test]
    fn apply_peer_settings_ignores_unknown_identifiers() {
        let mut ctx = ConnectionContext::new();
        assert!(ctx.apply_peer_settings(&[(99, 42)]).is_ok());
    }

    #[test]
    fn get_or_create_stream_uses_local_initial_window() {
        let mut ctx = ConnectionContext::new();
        let stream = ctx.get_or_create_stream(1);
        assert_eq!(stream.flow_window_recv, DEFAULT_INITIAL_WINDOW_SIZE as i64);
    }
}
