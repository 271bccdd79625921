// HPACK static table, RFC 7541 Appendix A. Index 0 is an unused placeholder so the
// 1-indexed wire representation can address this slice directly.

/// (name, value); value is `None` for header names that have no default value.
pub const STATIC_TABLE: &[(&str, Option<&str>)] = &[
    ("", None),
    (":authority", None),
    (":method", Some("GET")),
    (":method", Some("POST")),
    (":path", Some("/")),
    (":path", Some("/index.html")),
    (":scheme", Some("http")),
    (":scheme", Some("https")),
    (":status", Some("200")),
    (":status", Some("204")),
    (":status", Some("206")),
    (":status", Some("304")),
    (":status", Some("400")),
    (":status", Some("404")),
    (":status", Some("500")),
    ("accept-charset", None),
    ("accept-encoding", Some("gzip, deflate")),
    ("accept-language", None),
    ("accept-ranges", None),
    ("accept", None),
    ("access-control-allow-origin", None),
    ("age", None),
    ("allow", None),
    ("authorization", None),
    ("cache-control", None),
    ("content-disposition", None),
    ("content-encoding", None),
    ("content-language", None),
    ("content-length", None),
    ("content-location", None),
    ("content-range", None),
    ("content-type", None),
    ("cookie", None),
    ("date", None),
    ("etag", None),
    ("expect", None),
    ("expires", None),
    ("from", None),
    ("host", None),
    ("if-match", None),
    ("if-modified-since", None),
    ("if-none-match", None),
    ("if-range", None),
    ("if-unmodified-since", None),
    ("last-modified", None),
    ("link", None),
    ("location", None),
    ("max-forwards", None),
    ("proxy-authenticate", None),
    ("proxy-authorization", None),
    ("range", None),
    ("referer", None),
    ("refresh", None),
    ("retry-after", None),
    ("server", None),
    ("set-cookie", None),
    ("strict-transport-security", None),
    ("transfer-encoding", None),
    ("user-agent", None),
    ("vary", None),
    ("via", None),
    ("www-authenticate", None),
];

/// Number of addressable entries, including the unused index-0 placeholder.
pub const STATIC_TABLE_SIZE: usize = STATIC_TABLE.len();

/// Highest valid 1-indexed static table index (61 per RFC 7541 Appendix A).
pub const STATIC_TABLE_MAX_INDEX: usize = STATIC_TABLE_SIZE - 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_sixty_one_real_entries() {
        assert_eq!(STATIC_TABLE_MAX_INDEX, 61);
    }

    #[test]
    fn first_and_last_entries_match_rfc() {
        assert_eq!(STATIC_TABLE[1], (":authority", None));
        assert_eq!(STATIC_TABLE[61], ("www-authenticate", None));
    }

    #[test]
    fn method_get_is_index_two() {
        assert_eq!(STATIC_TABLE[2], (":method", Some("GET")));
    }
}
