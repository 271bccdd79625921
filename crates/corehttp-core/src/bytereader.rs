// Incremental, delimiter- and length-addressable reading over a connection that may
// suspend. Every parser above this module (HTTP/1 line/header/body, the HTTP/2 preface,
// frame headers) reads through here so that partial reads, buffer growth, and EOF/I/O
// failure are handled in exactly one place.

use corehttp_common::error::{Error, Result};
use std::io::Read;

/// Minimum number of bytes requested from the transport on each underlying read.
const MIN_READ_CHUNK: usize = 512;

/// Lifecycle state of a buffered byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteState {
    Open,
    Closed,
    Errored,
}

/// A read-only, cursor-advancing view over an incoming byte stream.
///
/// `cursor <= buf.len()` is maintained as an invariant across every method; `Closed` and
/// `Errored` are terminal once reached.
pub struct ByteReader<S> {
    conn: S,
    buf: Vec<u8>,
    cursor: usize,
    state: ByteState,
}

impl<S: Read> ByteReader<S> {
    pub fn new(conn: S) -> Self {
        Self {
            conn,
            buf: Vec::with_capacity(MIN_READ_CHUNK),
            cursor: 0,
            state: ByteState::Open,
        }
    }

    pub fn with_capacity(conn: S, capacity: usize) -> Self {
        Self {
            conn,
            buf: Vec::with_capacity(capacity.max(MIN_READ_CHUNK)),
            cursor: 0,
            state: ByteState::Open,
        }
    }

    pub fn state(&self) -> ByteState {
        self.state
    }

    /// Whether at least one more byte is immediately available without blocking the
    /// caller beyond what has already been buffered.
    pub fn has_buffered(&self) -> bool {
        self.cursor < self.buf.len()
    }

    fn fill_more(&mut self) -> Result<usize> {
        if self.state != ByteState::Open {
            return Ok(0);
        }
        let start = self.buf.len();
        self.buf.resize(start + MIN_READ_CHUNK, 0);
        let n = match self.conn.read(&mut self.buf[start..]) {
            Ok(n) => n,
            Err(e) => {
                self.buf.truncate(start);
                self.state = ByteState::Errored;
                return Err(Error::Io(e));
            }
        };
        self.buf.truncate(start + n);
        if n == 0 {
            self.state = ByteState::Closed;
        }
        Ok(n)
    }

    /// Returns the bytes preceding the first occurrence of `delimiter` after the cursor,
    /// advancing the cursor past the delimiter. The delimiter itself is not included.
    pub fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        debug_assert!(!delimiter.is_empty());
        loop {
            if let Some(rel) = memchr_seq(&self.buf[self.cursor..], delimiter) {
                let start = self.cursor;
                let end = self.cursor + rel;
                let out = self.buf[start..end].to_vec();
                self.cursor = end + delimiter.len();
                return Ok(out);
            }
            if self.state != ByteState::Open {
                return Err(Error::Eof);
            }
            if self.fill_more()? == 0 && self.state != ByteState::Open {
                // one more pass to check the freshly appended tail for the delimiter
                if let Some(rel) = memchr_seq(&self.buf[self.cursor..], delimiter) {
                    let start = self.cursor;
                    let end = self.cursor + rel;
                    let out = self.buf[start..end].to_vec();
                    self.cursor = end + delimiter.len();
                    return Ok(out);
                }
                return Err(Error::Eof);
            }
        }
    }

    /// Returns exactly `n` bytes or fails with `Eof`/`Io`. A request for zero bytes
    /// always succeeds with an empty slice.
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        while self.buf.len() - self.cursor < n {
            if self.state != ByteState::Open {
                return Err(Error::Eof);
            }
            self.fill_more()?;
        }
        let out = self.buf[self.cursor..self.cursor + n].to_vec();
        self.cursor += n;
        Ok(out)
    }

    /// Returns up to `n` bytes starting at the cursor without advancing it, for
    /// protocol-sniffing a fixed-length prefix (the HTTP/2 connection preface) before
    /// committing to a parse path. Short reads are possible only once the stream closes.
    pub fn peek(&mut self, n: usize) -> Result<&[u8]> {
        while self.buf.len() - self.cursor < n && self.state == ByteState::Open {
            self.fill_more()?;
        }
        let end = (self.cursor + n).min(self.buf.len());
        Ok(&self.buf[self.cursor..end])
    }

    /// Drains the stream until EOF. Returns an empty buffer if the stream was already
    /// closed when called.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        while self.state == ByteState::Open {
            self.fill_more()?;
        }
        let out = self.buf[self.cursor..].to_vec();
        self.cursor = self.buf.len();
        Ok(out)
    }

    /// Guarantees any slice previously returned is no longer backed by live memory:
    /// bytes before the cursor are dropped and the backing buffer is compacted.
    pub fn invalidate_prefix(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.buf.drain(0..self.cursor);
        self.cursor = 0;
    }

    /// Releases the underlying connection, consuming the reader.
    pub fn release(mut self) -> S {
        self.state = ByteState::Closed;
        self.conn
    }

    /// Direct access to the underlying connection for writing. Safe to use alongside the
    /// buffered reads above since HTTP request/response traffic never interleaves reads
    /// and writes on the same bytes.
    pub fn conn_mut(&mut self) -> &mut S {
        &mut self.conn
    }
}

/// A small Boyer-Moore-Horspool-free substring search; delimiters in this codec are
/// always short (CRLF, "\r\n\r\n", single bytes) so a naive scan built on `memchr` for
/// the first byte is both simple and fast in practice.
fn memchr_seq(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() == 1 {
        return memchr::memchr(needle[0], haystack);
    }
    let first = needle[0];
    let mut start = 0;
    while let Some(rel) = memchr::memchr(first, &haystack[start..]) {
        let idx = start + rel;
        if haystack[idx..].len() >= needle.len() && &haystack[idx..idx + needle.len()] == needle {
            return Some(idx);
        }
        start = idx + 1;
    }
    None
}
