// HTTP response data model and status line/reason phrase table.

use super::request::Headers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: Self = Self(200);
    pub const NO_CONTENT: Self = Self(204);
    pub const NOT_MODIFIED: Self = Self(304);
    pub const BAD_REQUEST: Self = Self(400);
    pub const NOT_FOUND: Self = Self(404);
    pub const METHOD_NOT_ALLOWED: Self = Self(405);
    pub const LENGTH_REQUIRED: Self = Self(411);
    pub const PAYLOAD_TOO_LARGE: Self = Self(413);
    pub const URI_TOO_LONG: Self = Self(414);
    pub const REQUEST_TIMEOUT: Self = Self(408);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);
    pub const HTTP_VERSION_NOT_SUPPORTED: Self = Self(505);

    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            411 => "Length Required",
            413 => "Payload Too Large",
            414 => "URI Too Long",
            431 => "Request Header Fields Too Large",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            505 => "HTTP Version Not Supported",
            _ => "Unknown",
        }
    }

    /// Responses to these statuses (and any 1xx) must not carry a body, regardless of
    /// Content-Length (RFC 9110 §6.4.1).
    pub fn forbids_body(&self) -> bool {
        matches!(self.0, 100..=199 | 204 | 304)
    }

    pub fn is_error(&self) -> bool {
        self.0 >= 400
    }
}

/// A response awaiting serialization onto the wire (by `HttpResponder` for HTTP/1, or
/// by the HEADERS/DATA frame writer for HTTP/2).
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: Headers::new(), body: Vec::new() }
    }

    pub fn with_body(status: StatusCode, content_type: &str, body: Vec<u8>) -> Self {
        let mut response = Self::new(status);
        response.headers.push("Content-Type", content_type);
        response.body = body;
        response
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_body(status, "text/plain; charset=utf-8", body.into().into_bytes())
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_phrase_known_and_unknown() {
        assert_eq!(StatusCode::OK.reason_phrase(), "OK");
        assert_eq!(StatusCode(299).reason_phrase(), "Unknown");
    }

    #[test]
    fn forbids_body_covers_204_and_304_and_1xx() {
        assert!(StatusCode::NO_CONTENT.forbids_body());
        assert!(StatusCode::NOT_MODIFIED.forbids_body());
        assert!(StatusCode(101).forbids_body());
        assert!(!StatusCode::OK.forbids_body());
    }

    #[test]
    fn text_response_sets_content_type_and_body() {
        let resp = Response::text(StatusCode::OK, "hello");
        assert_eq!(resp.headers.get("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(resp.body, b"hello");
    }
}
