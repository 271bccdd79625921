// This module defines the core error types used throughout the corehttp workspace.
// It provides a unified error handling approach with detailed error information while maintaining zero-cost abstractions for the common path.

use std::fmt;
use std::error::Error as StdError;
use std::io;

/// Core error type for the corehttp workspace
#[derive(Debug)]
pub enum Error {
    /// I/O errors
    Io(io::Error),

    /// The peer closed the connection before the expected data arrived
    Eof,

    /// Parse errors with details
    ParseError(String),

    /// Invalid protocol
    InvalidProtocol,

    /// Connection closed
    ConnectionClosed,

    /// Too many streams
    TooManyStreams,

    /// Flow control error
    FlowControlError,

    /// Request timeout
    Timeout,

    /// Request too large
    RequestTooLarge,

    /// Invalid header
    InvalidHeader(String),

    /// Invalid state
    InvalidState(String),

    /// Not implemented
    NotImplemented(&'static str),

    /// TLS error
    TlsError(String),

    /// Configuration error
    ConfigError(String),

    /// Resource exhausted
    ResourceExhausted(String),

    /// Internal error
    Internal(String),

    /// HTTP version token not recognized (e.g. neither 1.0, 1.1 nor 2.0)
    InvalidHttpVersion(String),

    /// Request method not in the recognized set
    MethodNotSupported(String),

    /// GET/HEAD/OPTIONS carried a non-empty body
    InvalidNonEmptyBody,

    /// The HTTP/2 connection preface was missing or malformed
    InvalidHttp2Preface,

    /// HTTP/1 request had no valid body-length indicator where one was required
    LengthRequired,

    /// General framing, URI, or header violation
    ProtocolError(String),

    /// Recognized but unimplemented feature (e.g. a transfer-coding other than chunked)
    NotSupported(String),

    /// HPACK-level decode/encode failure
    Hpack(String),

    /// HTTP/2 frame-level validation failure, carrying the GOAWAY/RST_STREAM error code
    Http2(Http2ErrorCode),

    /// Custom error with error code
    Custom {
        code: ErrorCode,
        message: String,
    },
}

/// HTTP/2 error codes (RFC 7540 §7), used on GOAWAY and RST_STREAM frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Http2ErrorCode {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

impl Http2ErrorCode {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x0 => Self::NoError,
            0x1 => Self::ProtocolError,
            0x2 => Self::InternalError,
            0x3 => Self::FlowControlError,
            0x4 => Self::SettingsTimeout,
            0x5 => Self::StreamClosed,
            0x6 => Self::FrameSizeError,
            0x7 => Self::RefusedStream,
            0x8 => Self::Cancel,
            0x9 => Self::CompressionError,
            0xa => Self::ConnectError,
            0xb => Self::EnhanceYourCalm,
            0xc => Self::InadequateSecurity,
            0xd => Self::Http11Required,
            // Unknown codes surface as INTERNAL_ERROR rather than being rejected outright.
            _ => Self::InternalError,
        }
    }
}

impl fmt::Display for Http2ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "NO_ERROR",
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::FlowControlError => "FLOW_CONTROL_ERROR",
            Self::SettingsTimeout => "SETTINGS_TIMEOUT",
            Self::StreamClosed => "STREAM_CLOSED",
            Self::FrameSizeError => "FRAME_SIZE_ERROR",
            Self::RefusedStream => "REFUSED_STREAM",
            Self::Cancel => "CANCEL",
            Self::CompressionError => "COMPRESSION_ERROR",
            Self::ConnectError => "CONNECT_ERROR",
            Self::EnhanceYourCalm => "ENHANCE_YOUR_CALM",
            Self::InadequateSecurity => "INADEQUATE_SECURITY",
            Self::Http11Required => "HTTP_1_1_REQUIRED",
        };
        write!(f, "{name}")
    }
}

/// Error codes for structured error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Client errors (4xx equivalent)
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    PayloadTooLarge = 413,
    UriTooLong = 414,
    UnsupportedMediaType = 415,
    TooManyRequests = 429,
    
    // Server errors (5xx equivalent)
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
    HttpVersionNotSupported = 505,
    
    // Custom corehttp error codes (6xx)
    ParseError = 600,
    ProtocolError = 601,
    TlsError = 602,
    FlowControlError = 603,
    StreamError = 604,
    ConnectionError = 605,
    ConfigurationError = 606,
    ResourceExhausted = 607,
}

impl Error {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ParseError(_) => ErrorCode::ParseError,
            Error::InvalidProtocol => ErrorCode::ProtocolError,
            Error::ConnectionClosed => ErrorCode::ConnectionError,
            Error::TooManyStreams => ErrorCode::ResourceExhausted,
            Error::FlowControlError => ErrorCode::FlowControlError,
            Error::Timeout => ErrorCode::RequestTimeout,
            Error::RequestTooLarge => ErrorCode::PayloadTooLarge,
            Error::InvalidHeader(_) => ErrorCode::BadRequest,
            Error::InvalidState(_) => ErrorCode::InternalServerError,
            Error::NotImplemented(_) => ErrorCode::NotImplemented,
            Error::TlsError(_) => ErrorCode::TlsError,
            Error::ConfigError(_) => ErrorCode::ConfigurationError,
            Error::ResourceExhausted(_) => ErrorCode::ResourceExhausted,
            Error::Internal(_) => ErrorCode::InternalServerError,
            Error::Custom { code, .. } => *code,
            Error::Io(_) => ErrorCode::InternalServerError,
            Error::Eof => ErrorCode::ConnectionError,
            Error::InvalidHttpVersion(_) => ErrorCode::BadRequest,
            Error::MethodNotSupported(_) => ErrorCode::MethodNotAllowed,
            Error::InvalidNonEmptyBody => ErrorCode::BadRequest,
            Error::InvalidHttp2Preface => ErrorCode::ProtocolError,
            Error::LengthRequired => ErrorCode::BadRequest,
            Error::ProtocolError(_) => ErrorCode::ProtocolError,
            Error::NotSupported(_) => ErrorCode::NotImplemented,
            Error::Hpack(_) => ErrorCode::ProtocolError,
            Error::Http2(_) => ErrorCode::ProtocolError,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::ServiceUnavailable
                | ErrorCode::GatewayTimeout
                | ErrorCode::TooManyRequests
                | ErrorCode::ResourceExhausted
        )
    }

    /// Check if error is client error
    pub fn is_client_error(&self) -> bool {
        let code = self.code() as u16;
        code >= 400 && code < 500
    }

    /// Check if error is server error
    pub fn is_server_error(&self) -> bool {
        let code = self.code() as u16;
        code >= 500 && code < 600
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Error::InvalidProtocol => write!(f, "Invalid protocol"),
            Error::ConnectionClosed => write!(f, "Connection closed"),
            Error::TooManyStreams => write!(f, "Too many concurrent streams"),
            Error::FlowControlError => write!(f, "Flow control error"),
            Error::Timeout => write!(f, "Request timeout"),
            Error::RequestTooLarge => write!(f, "Request too large"),
            Error::InvalidHeader(msg) => write!(f, "Invalid header: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::NotImplemented(feature) => write!(f, "Not implemented: {}", feature),
            Error::TlsError(msg) => write!(f, "TLS error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Error::ResourceExhausted(msg) => write!(f, "Resource exhausted: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
            Error::Custom { code, message } => write!(f, "Error {}: {}", *code as u16, message),
            Error::Eof => write!(f, "unexpected end of stream"),
            Error::InvalidHttpVersion(token) => write!(f, "invalid HTTP version: {}", token),
            Error::MethodNotSupported(method) => write!(f, "method not supported: {}", method),
            Error::InvalidNonEmptyBody => write!(f, "GET/HEAD/OPTIONS request carried a non-empty body"),
            Error::InvalidHttp2Preface => write!(f, "invalid or missing HTTP/2 connection preface"),
            Error::LengthRequired => write!(f, "request requires a valid body-length indicator"),
            Error::ProtocolError(msg) => write!(f, "protocol error: {}", msg),
            Error::NotSupported(feature) => write!(f, "not supported: {}", feature),
            Error::Hpack(msg) => write!(f, "HPACK error: {}", msg),
            Error::Http2(code) => write!(f, "HTTP/2 connection error: {}", code),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Eof
        } else {
            Error::Io(err)
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::Eof => io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of stream"),
            _ => io::Error::new(io::ErrorKind::Other, err.to_string()),
        }
    }
}

/// Result type alias for corehttp operations
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;
    
    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Internal(format!("{}: {}", msg, base_error))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Internal(format!("{}: {}", f(), base_error))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Timeout.code(), ErrorCode::RequestTimeout);
        assert_eq!(Error::RequestTooLarge.code(), ErrorCode::PayloadTooLarge);
        assert_eq!(Error::NotImplemented("test").code(), ErrorCode::NotImplemented);
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::InvalidHeader("test".to_string()).is_client_error());
        assert!(Error::Internal("test".to_string()).is_server_error());
        assert!(!Error::InvalidHeader("test".to_string()).is_server_error());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(Error::Custom {
            code: ErrorCode::ServiceUnavailable,
            message: "Service down".to_string(),
        }
        .is_retryable());
        
        assert!(!Error::InvalidHeader("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_error_context() {
        let result: std::result::Result<(), io::Error> = Err(io::Error::new(
            io::ErrorKind::NotFound,
            "File not found",
        ));
        
        let with_context = result.context("Failed to open config file");
        assert!(with_context.is_err());
        
        let err = with_context.unwrap_err();
        assert!(err.to_string().contains("Failed to open config file"));
    }

    #[test]
    fn test_error_display() {
        let err = Error::ParseError("Invalid JSON".to_string());
        assert_eq!(err.to_string(), "Parse error: Invalid JSON");
        
        let err = Error::Custom {
            code: ErrorCode::BadRequest,
            message: "Missing header".to_string(),
        };
        assert_eq!(err.to_string(), "Error 400: Missing header");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "Pipe broken");
        let err: Error = io_err.into();
        
        match err {
            Error::Io(_) => {},
            _ => panic!("Expected Io variant"),
        }
        
        // Convert back
        let _io_err: io::Error = err.into();
    }
}
