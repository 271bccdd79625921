// The protocol a TLS handshake negotiated via ALPN, handed to the connection driver so it
// can skip HTTP/1-vs-HTTP/2 sniffing when the transport already told it which one to speak.

/// Negotiated protocol from TLS ALPN. `None` means no TLS (or no ALPN extension), in which
/// case the connection driver falls back to sniffing the HTTP/2 preface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlpnProtocol {
    None,
    Http1_1,
    Http2,
}

impl AlpnProtocol {
    /// Maps an ALPN wire identifier (RFC 7301) to a protocol, if recognized.
    pub fn from_wire_id(id: &[u8]) -> Option<Self> {
        match id {
            b"http/1.1" => Some(Self::Http1_1),
            b"h2" => Some(Self::Http2),
            _ => None,
        }
    }

    pub fn wire_id(&self) -> Option<&'static [u8]> {
        match self {
            Self::Http1_1 => Some(b"http/1.1"),
            Self::Http2 => Some(b"h2"),
            Self::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_h2_and_http11() {
        assert_eq!(AlpnProtocol::from_wire_id(b"h2"), Some(AlpnProtocol::Http2));
        assert_eq!(AlpnProtocol::from_wire_id(b"http/1.1"), Some(AlpnProtocol::Http1_1));
        assert_eq!(AlpnProtocol::from_wire_id(b"spdy/3"), None);
    }

    #[test]
    fn wire_id_roundtrips() {
        assert_eq!(AlpnProtocol::Http2.wire_id(), Some(&b"h2"[..]));
        assert_eq!(AlpnProtocol::None.wire_id(), None);
    }
}
