// HPACK decoder (RFC 7541). Decodes a header block into (name, value) pairs, supporting
// all four representation types: indexed, literal with incremental indexing, literal
// without indexing / never indexed, and dynamic table size update.

use bytes::Buf;
use corehttp_common::error::{Error, Result};

use super::dynamic_table::DynamicTable;
use super::huffman;
use super::static_table::{STATIC_TABLE, STATIC_TABLE_SIZE};

/// Callback invoked once per decoded header field, in wire order.
pub trait HeaderSink {
    fn header(&mut self, name: &str, value: &str);
}

/// Collects decoded headers into a `Vec`; convenient for tests and small requests.
#[derive(Debug, Default)]
pub struct HeaderList(pub Vec<(String, String)>);

impl HeaderSink for HeaderList {
    fn header(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }
}

/// Per-connection HPACK decoding context. `header_table_size` is the cap negotiated via
/// SETTINGS_HEADER_TABLE_SIZE; dynamic-table-size-update opcodes may only shrink below it.
pub struct Decoder {
    header_table_size: usize,
    dynamic_table: DynamicTable,
}

impl Decoder {
    pub fn new(header_table_size: usize) -> Self {
        Self {
            header_table_size,
            dynamic_table: DynamicTable::new(header_table_size),
        }
    }

    pub fn set_header_table_size(&mut self, size: usize) {
        self.header_table_size = size;
        if self.dynamic_table.max_size() > size {
            self.dynamic_table.resize(size);
        }
    }

    pub fn dynamic_table_len(&self) -> usize {
        self.dynamic_table.len()
    }

    pub fn decode<B: Buf, H: HeaderSink>(&mut self, buf: &mut B, sink: &mut H) -> Result<()> {
        while buf.has_remaining() {
            let b = buf.get_u8();
            if (b & 0x80) != 0 {
                let index = decode_integer(buf, b, 7)?;
                if index == 0 {
                    return Err(Error::Hpack("indexed header field index 0".into()));
                }
                let (name, value) = self.get_indexed(index)?;
                sink.header(&name, &value);
            } else if (b & 0x40) != 0 {
                let (name, value) = self.get_literal(buf, b, 6)?;
                self.dynamic_table.insert(name.clone(), value.clone());
                sink.header(&name, &value);
            } else if (b & 0x20) != 0 {
                let max_size = decode_integer(buf, b, 5)? as usize;
                if max_size > self.header_table_size {
                    return Err(Error::Hpack(
                        "dynamic table size update exceeds negotiated SETTINGS_HEADER_TABLE_SIZE".into(),
                    ));
                }
                self.dynamic_table.resize(max_size);
            } else {
                // Literal without indexing (0x00 prefix) and never-indexed (0x10 prefix)
                // share representation on the wire; neither mutates the dynamic table.
                let (name, value) = self.get_literal(buf, b, 4)?;
                sink.header(&name, &value);
            }
        }
        Ok(())
    }

    fn get_indexed(&self, index: u64) -> Result<(String, String)> {
        if index <= STATIC_TABLE_SIZE as u64 - 1 && index != 0 {
            let (name, value) = STATIC_TABLE[index as usize];
            Ok((name.to_string(), value.unwrap_or("").to_string()))
        } else {
            let dyn_index = index - STATIC_TABLE_SIZE as u64;
            match self.dynamic_table.get(dyn_index as usize) {
                Some(h) => Ok((h.name.clone(), h.value.clone())),
                None => Err(Error::Hpack(format!("header index {index} out of range"))),
            }
        }
    }

    fn get_literal<B: Buf>(&self, buf: &mut B, opcode: u8, nbits: u8) -> Result<(String, String)> {
        let index = decode_integer(buf, opcode, nbits)?;
        let name = if index == 0 {
            decode_string(buf)?
        } else {
            self.get_indexed(index)?.0
        };
        let value = decode_string(buf)?;
        Ok((name, value))
    }
}

/// RFC 7541 §5.1 integer decoding: `opcode` already carries the low `nbits` prefix bits.
fn decode_integer<B: Buf>(buf: &mut B, opcode: u8, nbits: u8) -> Result<u64> {
    let nmask = (1u64 << nbits) - 1;
    let mut value = (opcode & (nmask as u8)) as u64;
    if value < nmask {
        return Ok(value);
    }
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(Error::Eof);
        }
        let b = buf.get_u8();
        value += ((b & 0x7f) as u64) << shift;
        if (b & 0x80) == 0 {
            break;
        }
        shift += 7;
        if shift > 63 {
            return Err(Error::Hpack("integer representation exceeds 64 bits".into()));
        }
    }
    Ok(value)
}

/// RFC 7541 §5.2 string decoding: a one-bit Huffman flag, a 7-bit-prefixed length, then
/// that many octets of either plain UTF-8 or Huffman-coded bytes.
fn decode_string<B: Buf>(buf: &mut B) -> Result<String> {
    if !buf.has_remaining() {
        return Err(Error::Eof);
    }
    let b = buf.get_u8();
    let huffman_encoded = (b & 0x80) != 0;
    let len = decode_integer(buf, b, 7)? as usize;
    if buf.remaining() < len {
        return Err(Error::Eof);
    }
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    if huffman_encoded {
        let decoded = huffman::decode(&bytes).map_err(|e| Error::Hpack(e.to_string()))?;
        String::from_utf8(decoded).map_err(|_| Error::Hpack("Huffman string is not valid UTF-8".into()))
    } else {
        String::from_utf8(bytes).map_err(|_| Error::Hpack("string literal is not valid UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_indexed_static() {
        let data: &[u8] = &[0x82];
        let mut decoder = Decoder::new(4096);
        let mut headers = HeaderList::default();
        decoder.decode(&mut &data[..], &mut headers).unwrap();
        assert_eq!(headers.0, vec![(":method".to_string(), "GET".to_string())]);
    }

    #[test]
    fn decode_multiple_indexed() {
        let data: &[u8] = &[0x82, 0x87, 0x84];
        let mut decoder = Decoder::new(4096);
        let mut headers = HeaderList::default();
        decoder.decode(&mut &data[..], &mut headers).unwrap();
        assert_eq!(headers.0.len(), 3);
        assert_eq!(headers.0[0].1, "GET");
        assert_eq!(headers.0[1].1, "https");
        assert_eq!(headers.0[2].1, "/");
    }

    #[test]
    fn decode_literal_without_indexing_plain() {
        let data: &[u8] = &[0x00, 0x03, b'f', b'o', b'o', 0x03, b'b', b'a', b'r'];
        let mut decoder = Decoder::new(4096);
        let mut headers = HeaderList::default();
        decoder.decode(&mut &data[..], &mut headers).unwrap();
        assert_eq!(headers.0, vec![("foo".to_string(), "bar".to_string())]);
        assert_eq!(decoder.dynamic_table_len(), 0);
    }

    #[test]
    fn decode_literal_with_incremental_indexing_grows_dynamic_table() {
        let data: &[u8] = &[0x40, 0x04, b't', b'e', b's', b't', 0x05, b'v', b'a', b'l', b'u', b'e'];
        let mut decoder = Decoder::new(4096);
        let mut headers = HeaderList::default();
        decoder.decode(&mut &data[..], &mut headers).unwrap();
        assert_eq!(headers.0[0], ("test".to_string(), "value".to_string()));
        assert_eq!(decoder.dynamic_table_len(), 1);
    }

    #[test]
    fn decode_huffman_string_literal() {
        let data: &[u8] = &[0x00, 0x01, b'x', 0x82, 0x1c, 0x64];
        let mut decoder = Decoder::new(4096);
        let mut headers = HeaderList::default();
        decoder.decode(&mut &data[..], &mut headers).unwrap();
        assert_eq!(headers.0[0], ("x".to_string(), "abc".to_string()));
    }

    #[test]
    fn decode_dynamic_table_size_update() {
        let data: &[u8] = &[0x20, 0x82];
        let mut decoder = Decoder::new(4096);
        let mut headers = HeaderList::default();
        decoder.decode(&mut &data[..], &mut headers).unwrap();
        assert_eq!(headers.0.len(), 1);
    }

    #[test]
    fn dynamic_table_size_update_above_settings_cap_is_rejected() {
        // 0x3f 0x61 encodes value 32 + 97 = 129 against a 5-bit prefix with a 64-cap table.
        let data: &[u8] = &[0x3f, 0x61];
        let mut decoder = Decoder::new(64);
        let mut headers = HeaderList::default();
        assert!(decoder.decode(&mut &data[..], &mut headers).is_err());
    }

    #[test]
    fn decode_index_zero_errors() {
        let data: &[u8] = &[0x80];
        let mut decoder = Decoder::new(4096);
        let mut headers = HeaderList::default();
        assert!(decoder.decode(&mut &data[..], &mut headers).is_err());
    }

    #[test]
    fn decode_out_of_range_dynamic_index_errors() {
        let data: &[u8] = &[0xbe]; // index 62: first dynamic slot, but table is empty
        let mut decoder = Decoder::new(4096);
        let mut headers = HeaderList::default();
        assert!(decoder.decode(&mut &data[..], &mut headers).is_err());
    }
}
