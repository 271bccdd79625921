// HPACK Huffman codec (RFC 7541 Appendix B). The decode trie is built once into a flat
// arena of u16-indexed nodes rather than a boxed-pointer tree: every node's two children
// are indices into the same backing `Vec`, so decoding a stream walks array slots instead
// of chasing pointers, and the whole tree lives in one contiguous allocation shared
// read-only across every connection via `OnceLock`.

use std::sync::OnceLock;

/// (code_bits, num_bits) for symbols 0..=256. Index 256 is the EOS symbol.
const HUFFMAN_TABLE: [(u32, u8); 257] = [
    (0x1ff8, 13),
    (0x7fffd8, 23),
    (0xfffffe2, 28),
    (0xfffffe3, 28),
    (0xfffffe4, 28),
    (0xfffffe5, 28),
    (0xfffffe6, 28),
    (0xfffffe7, 28),
    (0xfffffe8, 28),
    (0xffffea, 24),
    (0x3ffffffc, 30),
    (0xfffffe9, 28),
    (0xfffffea, 28),
    (0x3ffffffd, 30),
    (0xfffffeb, 28),
    (0xfffffec, 28),
    (0xfffffed, 28),
    (0xfffffee, 28),
    (0xfffffef, 28),
    (0xffffff0, 28),
    (0xffffff1, 28),
    (0xffffff2, 28),
    (0x3ffffffe, 30),
    (0xffffff3, 28),
    (0xffffff4, 28),
    (0xffffff5, 28),
    (0xffffff6, 28),
    (0xffffff7, 28),
    (0xffffff8, 28),
    (0xffffff9, 28),
    (0xffffffa, 28),
    (0xffffffb, 28),
    (0x14, 6),
    (0x3f8, 10),
    (0x3f9, 10),
    (0xffa, 12),
    (0x1ff9, 13),
    (0x15, 6),
    (0xf8, 8),
    (0x7fa, 11),
    (0x3fa, 10),
    (0x3fb, 10),
    (0xf9, 8),
    (0x7fb, 11),
    (0xfa, 8),
    (0x16, 6),
    (0x17, 6),
    (0x18, 6),
    (0x0, 5),
    (0x1, 5),
    (0x2, 5),
    (0x19, 6),
    (0x1a, 6),
    (0x1b, 6),
    (0x1c, 6),
    (0x1d, 6),
    (0x1e, 6),
    (0x1f, 6),
    (0x5c, 7),
    (0xfb, 8),
    (0x7ffc, 15),
    (0x20, 6),
    (0xffb, 12),
    (0x3fc, 10),
    (0x1ffa, 13),
    (0x21, 6),
    (0x5d, 7),
    (0x5e, 7),
    (0x5f, 7),
    (0x60, 7),
    (0x61, 7),
    (0x62, 7),
    (0x63, 7),
    (0x64, 7),
    (0x65, 7),
    (0x66, 7),
    (0x67, 7),
    (0x68, 7),
    (0x69, 7),
    (0x6a, 7),
    (0x6b, 7),
    (0x6c, 7),
    (0x6d, 7),
    (0x6e, 7),
    (0x6f, 7),
    (0x70, 7),
    (0x71, 7),
    (0x72, 7),
    (0xfc, 8),
    (0x73, 7),
    (0xfd, 8),
    (0x1ffb, 13),
    (0x7fff0, 19),
    (0x1ffc, 13),
    (0x3ffc, 14),
    (0x22, 6),
    (0x7ffd, 15),
    (0x3, 5),
    (0x23, 6),
    (0x4, 5),
    (0x24, 6),
    (0x5, 5),
    (0x25, 6),
    (0x26, 6),
    (0x27, 6),
    (0x6, 5),
    (0x74, 7),
    (0x75, 7),
    (0x28, 6),
    (0x29, 6),
    (0x2a, 6),
    (0x7, 5),
    (0x2b, 6),
    (0x76, 7),
    (0x2c, 6),
    (0x8, 5),
    (0x9, 5),
    (0x2d, 6),
    (0x77, 7),
    (0x78, 7),
    (0x79, 7),
    (0x7a, 7),
    (0x7b, 7),
    (0x7ffe, 15),
    (0x7fc, 11),
    (0x3ffd, 14),
    (0x1ffd, 13),
    (0xffffffc, 28),
    (0xfffe6, 20),
    (0x3fffd2, 22),
    (0xfffe7, 20),
    (0xfffe8, 20),
    (0x3fffd3, 22),
    (0x3fffd4, 22),
    (0x3fffd5, 22),
    (0x7fffd9, 23),
    (0x3fffd6, 22),
    (0x7fffda, 23),
    (0x7fffdb, 23),
    (0x7fffdc, 23),
    (0x7fffdd, 23),
    (0x7fffde, 23),
    (0xffffeb, 24),
    (0x7fffdf, 23),
    (0xffffec, 24),
    (0xffffed, 24),
    (0x3fffd7, 22),
    (0x7fffe0, 23),
    (0xffffee, 24),
    (0x7fffe1, 23),
    (0x7fffe2, 23),
    (0x7fffe3, 23),
    (0x7fffe4, 23),
    (0x1fffdc, 21),
    (0x3fffd8, 22),
    (0x7fffe5, 23),
    (0x3fffd9, 22),
    (0x7fffe6, 23),
    (0x7fffe7, 23),
    (0xffffef, 24),
    (0x3fffda, 22),
    (0x1fffdd, 21),
    (0xfffe9, 20),
    (0x3fffdb, 22),
    (0x3fffdc, 22),
    (0x7fffe8, 23),
    (0x7fffe9, 23),
    (0x1fffde, 21),
    (0x7fffea, 23),
    (0x3fffdd, 22),
    (0x3fffde, 22),
    (0xfffff0, 24),
    (0x1fffdf, 21),
    (0x3fffdf, 22),
    (0x7fffeb, 23),
    (0x7fffec, 23),
    (0x1fffe0, 21),
    (0x1fffe1, 21),
    (0x3fffe0, 22),
    (0x1fffe2, 21),
    (0x7fffed, 23),
    (0x3fffe1, 22),
    (0x7fffee, 23),
    (0x7fffef, 23),
    (0xfffea, 20),
    (0x3fffe2, 22),
    (0x3fffe3, 22),
    (0x3fffe4, 22),
    (0x7ffff0, 23),
    (0x3fffe5, 22),
    (0x3fffe6, 22),
    (0x7ffff1, 23),
    (0x3ffffe0, 26),
    (0x3ffffe1, 26),
    (0xfffeb, 20),
    (0x7fff1, 19),
    (0x3fffe7, 22),
    (0x7ffff2, 23),
    (0x3fffe8, 22),
    (0x1ffffec, 25),
    (0x3ffffe2, 26),
    (0x3ffffe3, 26),
    (0x3ffffe4, 26),
    (0x7ffffde, 27),
    (0x7ffffdf, 27),
    (0x3ffffe5, 26),
    (0xfffff1, 24),
    (0x1ffffed, 25),
    (0x7fff2, 19),
    (0x1fffe3, 21),
    (0x3ffffe6, 26),
    (0x7ffffe0, 27),
    (0x7ffffe1, 27),
    (0x3ffffe7, 26),
    (0x7ffffe2, 27),
    (0xfffff2, 24),
    (0x1fffe4, 21),
    (0x1fffe5, 21),
    (0x3ffffe8, 26),
    (0x3ffffe9, 26),
    (0xffffffd, 28),
    (0x7ffffe3, 27),
    (0x7ffffe4, 27),
    (0x7ffffe5, 27),
    (0xfffec, 20),
    (0xfffff3, 24),
    (0xfffed, 20),
    (0x1fffe6, 21),
    (0x3fffe9, 22),
    (0x1fffe7, 21),
    (0x1fffe8, 21),
    (0x7ffff3, 23),
    (0x3fffea, 22),
    (0x3fffeb, 22),
    (0x1ffffee, 25),
    (0x1ffffef, 25),
    (0xfffff4, 24),
    (0xfffff5, 24),
    (0x3ffffea, 26),
    (0x7ffff4, 23),
    (0x3ffffeb, 26),
    (0x7ffffe6, 27),
    (0x3ffffec, 26),
    (0x3ffffed, 26),
    (0x7ffffe7, 27),
    (0x7ffffe8, 27),
    (0x7ffffe9, 27),
    (0x7ffffea, 27),
    (0x7ffffeb, 27),
    (0xffffffe, 28),
    (0x7ffffec, 27),
    (0x7ffffed, 27),
    (0x7ffffee, 27),
    (0x7ffffef, 27),
    (0x7fffff0, 27),
    (0x3ffffee, 26),
    (0x3fffffff, 30),
];

const EOS_SYMBOL: u16 = 256;
const NIL: u16 = u16::MAX;

/// A single trie node: `children[bit]` is an index into the owning `HuffmanTree::nodes`
/// arena, or `NIL` if that branch hasn't been built. `symbol < 0` means "not a leaf".
#[derive(Clone, Copy)]
struct Node {
    symbol: i16,
    children: [u16; 2],
}

impl Node {
    const EMPTY: Node = Node {
        symbol: -1,
        children: [NIL, NIL],
    };
}

struct HuffmanTree {
    nodes: Vec<Node>,
}

impl HuffmanTree {
    fn build() -> Self {
        let mut nodes = vec![Node::EMPTY];
        for (symbol, &(code, num_bits)) in HUFFMAN_TABLE.iter().enumerate() {
            let mut cur = 0u16;
            for i in 0..num_bits {
                let bit = ((code >> (num_bits - 1 - i)) & 1) as usize;
                let next = nodes[cur as usize].children[bit];
                let next = if next == NIL {
                    nodes.push(Node::EMPTY);
                    let idx = (nodes.len() - 1) as u16;
                    nodes[cur as usize].children[bit] = idx;
                    idx
                } else {
                    next
                };
                cur = next;
            }
            nodes[cur as usize].symbol = symbol as i16;
        }
        Self { nodes }
    }

    #[inline]
    fn root(&self) -> u16 {
        0
    }

    #[inline]
    fn step(&self, node: u16, bit: usize) -> u16 {
        self.nodes[node as usize].children[bit]
    }

    #[inline]
    fn symbol_at(&self, node: u16) -> i16 {
        self.nodes[node as usize].symbol
    }
}

static TREE: OnceLock<HuffmanTree> = OnceLock::new();

fn tree() -> &'static HuffmanTree {
    TREE.get_or_init(HuffmanTree::build)
}

/// Decode HPACK Huffman-encoded bytes into plaintext.
pub fn decode(encoded: &[u8]) -> Result<Vec<u8>, &'static str> {
    let t = tree();
    let mut out = Vec::with_capacity(encoded.len() * 2);
    let mut node = t.root();
    let mut last_decoded_bit = 0usize;

    for (byte_idx, &byte) in encoded.iter().enumerate() {
        for bit_idx in (0..8).rev() {
            let bit = ((byte >> bit_idx) & 1) as usize;
            let next = t.step(node, bit);
            if next == NIL {
                return Err("HPACK Huffman: invalid bit sequence");
            }
            node = next;

            let sym = t.symbol_at(node);
            if sym >= 0 {
                let sym = sym as u16;
                if sym == EOS_SYMBOL {
                    return Err("HPACK Huffman: EOS symbol in string literal");
                }
                out.push(sym as u8);
                node = t.root();
                last_decoded_bit = byte_idx * 8 + (7 - bit_idx) + 1;
            }
        }
    }

    let total_bits = encoded.len() * 8;
    let padding_bits = total_bits - last_decoded_bit;
    if padding_bits > 7 {
        return Err("HPACK Huffman: padding longer than 7 bits");
    }
    if padding_bits > 0 {
        let last_byte = encoded[encoded.len() - 1];
        let mask = (1u8 << padding_bits) - 1;
        if (last_byte & mask) != mask {
            return Err("HPACK Huffman: padding not all 1-bits");
        }
    }

    Ok(out)
}

/// Encode plaintext bytes using HPACK Huffman coding.
pub fn encode(plaintext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(plaintext.len());
    let mut current_byte: u32 = 0;
    let mut bits_in_byte: u8 = 0;

    for &b in plaintext {
        let (code, num_bits) = HUFFMAN_TABLE[b as usize];
        for i in (0..num_bits).rev() {
            let bit = (code >> i) & 1;
            current_byte = (current_byte << 1) | bit;
            bits_in_byte += 1;
            if bits_in_byte == 8 {
                out.push(current_byte as u8);
                current_byte = 0;
                bits_in_byte = 0;
            }
        }
    }

    if bits_in_byte > 0 {
        current_byte = (current_byte << (8 - bits_in_byte)) | ((1u32 << (8 - bits_in_byte)) - 1);
        out.push(current_byte as u8);
    }

    out
}

/// Huffman-encoded length in bytes for the given plaintext, without allocating.
pub fn encoded_length(plaintext: &[u8]) -> usize {
    let total_bits: usize = plaintext
        .iter()
        .map(|&b| HUFFMAN_TABLE[b as usize].1 as usize)
        .sum();
    (total_bits + 7) / 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_abc() {
        let plain = b"abc";
        let encoded = encode(plain);
        assert_eq!(&encoded, &[0x1c, 0x64]);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, plain);
    }

    #[test]
    fn roundtrip_hello_world() {
        let plain = b"Hello, world!";
        let encoded = encode(plain);
        let expected: &[u8] = &[0xc6, 0x5a, 0x28, 0x3f, 0xd2, 0x9e, 0x0f, 0x65, 0x12, 0x7f, 0x1f];
        assert_eq!(&encoded, expected);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, plain);
    }

    #[test]
    fn decode_empty() {
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn encode_empty() {
        assert!(encode(&[]).is_empty());
    }

    #[test]
    fn encoded_length_matches_actual_output() {
        let plain = b"Hello, world!";
        assert_eq!(encoded_length(plain), encode(plain).len());
    }

    #[test]
    fn roundtrip_url() {
        let plain = b"https://oauth2.googleapis.com/token";
        let encoded = encode(plain);
        assert_eq!(decode(&encoded).unwrap(), plain);
    }

    #[test]
    fn roundtrip_all_printable_ascii() {
        let plain: Vec<u8> = (32u8..=126).collect();
        let encoded = encode(&plain);
        assert_eq!(decode(&encoded).unwrap(), plain);
    }

    #[test]
    fn eos_in_stream_is_rejected() {
        // 30 one-bits is the EOS code; pad to a whole number of bytes with more 1s.
        let bytes = [0xff, 0xff, 0xff, 0xff];
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn bad_padding_is_rejected() {
        // 'a' (5 bits, code 0x3) followed by a zero padding bit is invalid padding.
        let encoded = [0x18]; // 0b00011000: 'a' = 00011, then a 0 pad bit, not all-1s
        assert!(decode(&encoded).is_err());
    }
}
