//! HTTP/2 binary framing (RFC 7540): frame types and the 9-byte frame header, the
//! per-frame-type validating codec, and the stream/connection state machine.

pub mod codec;
pub mod frame;
pub mod stream;

pub use codec::{build_frame, build_goaway_frame, build_ping_frame, build_rst_stream_frame, build_settings_frame, read_frame};
pub use frame::{Frame, FrameFlags, FrameHeader, FrameType, CONNECTION_PREFACE};
pub use stream::{ConnectionContext, Settings, Stream, StreamState};
