//! HPACK header compression (RFC 7541): static table, dynamic table, Huffman coding,
//! and the header-block encoder/decoder built on top of them.

mod decoder;
mod dynamic_table;
mod encoder;
mod huffman;
mod static_table;

pub use decoder::{Decoder, HeaderList, HeaderSink};
pub use dynamic_table::{DynamicEntry, DynamicTable};
pub use encoder::encode_headers;
pub use static_table::{STATIC_TABLE, STATIC_TABLE_MAX_INDEX, STATIC_TABLE_SIZE};

pub mod huffman_codec {
    pub use super::huffman::{decode, encode, encoded_length};
}
