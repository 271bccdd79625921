// HTTP request data model: method, request-target URI, protocol version, and the
// decoded request itself (shared shape between HTTP/1 and HTTP/2).

use corehttp_common::error::{Error, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
    Options,
    Connect,
    Pri,
}

impl Method {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "CONNECT" => Ok(Self::Connect),
            "PRI" => Ok(Self::Pri),
            other => Err(Error::MethodNotSupported(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Connect => "CONNECT",
            Self::Pri => "PRI",
        }
    }

    /// GET/HEAD/OPTIONS requests must carry an empty body (§ invariant InvalidNonEmptyBody).
    pub fn forbids_body(&self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options)
    }
}

/// A request-target path: raw path, query parameters in insertion order, and an
/// optional fragment (fragments are not sent on the wire by well-behaved clients but
/// are accepted and preserved if present).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    pub raw_path: String,
    pub search: Vec<(String, String)>,
    pub fragment: Option<String>,
}

impl Path {
    pub fn parse(target: &str) -> Self {
        let (target, fragment) = match target.split_once('#') {
            Some((t, f)) => (t, Some(f.to_string())),
            None => (target, None),
        };
        let (raw_path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q)),
            None => (target.to_string(), None),
        };
        let search = query.map(parse_query).unwrap_or_default();
        Self { raw_path, search, fragment }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.search.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authority {
    pub userinfo: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

/// Request-target, RFC 9112 §3.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestUri {
    Asterisk,
    AbsolutePath(Path),
    AbsoluteUri { scheme: String, authority: Authority, path: Path },
    Authority(Authority),
}

impl RequestUri {
    pub fn parse(target: &str, method: Method) -> Result<Self> {
        if target == "*" {
            if method != Method::Options {
                return Err(Error::ProtocolError("asterisk-form request-target is only valid with OPTIONS".into()));
            }
            return Ok(Self::Asterisk);
        }
        if method == Method::Connect {
            return Ok(Self::Authority(parse_authority(target)));
        }
        if let Some(rest) = target.strip_prefix("http://").or_else(|| target.strip_prefix("https://")) {
            let scheme = if target.starts_with("https") { "https" } else { "http" };
            let (authority_part, path_part) = rest.split_once('/').map(|(a, p)| (a, format!("/{p}"))).unwrap_or((rest, "/".to_string()));
            return Ok(Self::AbsoluteUri {
                scheme: scheme.to_string(),
                authority: parse_authority(authority_part),
                path: Path::parse(&path_part),
            });
        }
        if !target.starts_with('/') {
            return Err(Error::ProtocolError(format!("unrecognized request-target form: {target}")));
        }
        Ok(Self::AbsolutePath(Path::parse(target)))
    }
}

fn parse_authority(raw: &str) -> Authority {
    let (userinfo, rest) = match raw.split_once('@') {
        Some((u, r)) => (Some(u.to_string()), r),
        None => (None, raw),
    };
    let (host, port) = match rest.rsplit_once(':') {
        Some((h, p)) => (h.to_string(), p.parse().ok()),
        None => (rest.to_string(), None),
    };
    Authority { userinfo, host, port }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    Http10,
    Http11,
    Http2,
}

impl ProtocolVersion {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "HTTP/1.0" => Ok(Self::Http10),
            "HTTP/1.1" => Ok(Self::Http11),
            "HTTP/2.0" | "HTTP/2" => Ok(Self::Http2),
            other => Err(Error::InvalidHttpVersion(other.to_string())),
        }
    }
}

/// Case-insensitive header name equality, ordered list (order matters for HTTP/1
/// serialization and for HPACK's pseudo-header-first rule).
#[derive(Debug, Clone, Default)]
pub struct Headers(pub Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> impl Iterator<Item = &str> {
        self.0.iter().filter(move |(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Token membership within a comma-separated header value (e.g. `Connection: close`),
    /// case-insensitive per-token.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get_all(name).any(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

/// A fully decoded request, the common shape HTTP/1 and HTTP/2 both produce.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: RequestUri,
    pub protocol_version: ProtocolVersion,
    pub stream_id: Option<u32>,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    /// Enforces the GET/HEAD/OPTIONS-forbid-body invariant; callers build the rest of
    /// the fields before calling this as a final validation step.
    pub fn validate(&self) -> Result<()> {
        if self.method.forbids_body() && !self.body.is_empty() {
            return Err(Error::InvalidNonEmptyBody);
        }
        if self.protocol_version != ProtocolVersion::Http2 && self.stream_id.is_some() {
            return Err(Error::ProtocolError("stream_id is only meaningful for HTTP/2 requests".into()));
        }
        Ok(())
    }
}

pub type QueryMap = BTreeMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_method_rejects_unknown() {
        assert!(Method::parse("TRACE").is_err());
        assert_eq!(Method::parse("GET").unwrap(), Method::Get);
    }

    #[test]
    fn path_parse_splits_query_and_fragment() {
        let path = Path::parse("/search?q=rust&lang=en#top");
        assert_eq!(path.raw_path, "/search");
        assert_eq!(path.get("q"), Some("rust"));
        assert_eq!(path.get("lang"), Some("en"));
        assert_eq!(path.fragment.as_deref(), Some("top"));
    }

    #[test]
    fn asterisk_form_requires_options() {
        assert!(RequestUri::parse("*", Method::Options).is_ok());
        assert!(RequestUri::parse("*", Method::Get).is_err());
    }

    #[test]
    fn connect_uses_authority_form() {
        let uri = RequestUri::parse("example.com:443", Method::Connect).unwrap();
        match uri {
            RequestUri::Authority(a) => {
                assert_eq!(a.host, "example.com");
                assert_eq!(a.port, Some(443));
            }
            _ => panic!("expected Authority form"),
        }
    }

    #[test]
    fn absolute_uri_form_parses_scheme_and_path() {
        let uri = RequestUri::parse("http://example.com/a/b", Method::Get).unwrap();
        match uri {
            RequestUri::AbsoluteUri { scheme, authority, path } => {
                assert_eq!(scheme, "http");
                assert_eq!(authority.host, "example.com");
                assert_eq!(path.raw_path, "/a/b");
            }
            _ => panic!("expected AbsoluteUri form"),
        }
    }

    #[test]
    fn headers_lookup_is_case_insensitive() {
        let mut h = Headers::new();
        h.push("Content-Type", "text/plain");
        assert_eq!(h.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn has_token_matches_within_comma_separated_value() {
        let mut h = Headers::new();
        h.push("Connection", "keep-alive, Upgrade");
        assert!(h.has_token("connection", "upgrade"));
        assert!(!h.has_token("connection", "close"));
    }

    #[test]
    fn validate_rejects_nonempty_body_on_get() {
        let req = Request {
            method: Method::Get,
            uri: RequestUri::AbsolutePath(Path::parse("/")),
            protocol_version: ProtocolVersion::Http11,
            stream_id: None,
            headers: Headers::new(),
            body: vec![1, 2, 3],
        };
        assert!(matches!(req.validate(), Err(Error::InvalidNonEmptyBody)));
    }
}
