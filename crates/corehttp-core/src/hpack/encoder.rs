// HPACK encoder (RFC 7541). Prefers an indexed representation when a header matches the
// static table exactly, falls back to literal-with-name-index for a name-only match, and
// otherwise emits a literal with a new name — Huffman-coding each string whenever doing
// so is shorter than sending it plain.

use bytes::BufMut;

use super::huffman;
use super::static_table::STATIC_TABLE;

/// Encode a header list (already in the order they should appear on the wire) as an
/// HPACK header block. Does not use incremental indexing: each call is self-contained
/// and does not require tracking the dynamic table on the write side.
pub fn encode_headers(headers: &[(&str, &str)], out: &mut impl BufMut) {
    for &(name, value) in headers {
        if let Some(idx) = find_static_exact(name, value) {
            encode_indexed(idx, out);
        } else if let Some(idx) = find_static_name(name) {
            encode_literal_with_name_index(idx, value.as_bytes(), out);
        } else {
            encode_literal_new_name(name.as_bytes(), value.as_bytes(), out);
        }
    }
}

fn find_static_exact(name: &str, value: &str) -> Option<usize> {
    STATIC_TABLE.iter().position(|&(n, v)| n == name && v == Some(value))
}

fn find_static_name(name: &str) -> Option<usize> {
    STATIC_TABLE.iter().position(|&(n, _)| n == name)
}

/// Indexed header field (RFC 7541 §6.1): 1-bit prefix + 7-bit index.
fn encode_indexed(index: usize, out: &mut impl BufMut) {
    encode_integer(index as u64, 7, 0x80, out);
}

/// Literal without indexing, name from static table index (RFC 7541 §6.2.2).
fn encode_literal_with_name_index(name_index: usize, value: &[u8], out: &mut impl BufMut) {
    encode_integer(name_index as u64, 4, 0x00, out);
    encode_string(value, out);
}

/// Literal without indexing, new name (RFC 7541 §6.2.2).
fn encode_literal_new_name(name: &[u8], value: &[u8], out: &mut impl BufMut) {
    out.put_u8(0x00);
    encode_string(name, out);
    encode_string(value, out);
}

/// Huffman-encodes a string when that's shorter than sending it plain; otherwise plain.
fn encode_string(s: &[u8], out: &mut impl BufMut) {
    let huff_len = huffman::encoded_length(s);
    if huff_len < s.len() {
        let encoded = huffman::encode(s);
        encode_integer(encoded.len() as u64, 7, 0x80, out);
        out.put_slice(&encoded);
    } else {
        encode_integer(s.len() as u64, 7, 0x00, out);
        out.put_slice(s);
    }
}

/// RFC 7541 §5.1 integer encoding.
pub(super) fn encode_integer(mut value: u64, nbits: u8, prefix: u8, out: &mut impl BufMut) {
    let max_prefix = (1u64 << nbits) - 1;
    if value < max_prefix {
        out.put_u8(prefix | value as u8);
        return;
    }
    out.put_u8(prefix | max_prefix as u8);
    value -= max_prefix;
    while value >= 128 {
        out.put_u8(0x80 | (value % 128) as u8);
        value /= 128;
    }
    out.put_u8(value as u8);
}
