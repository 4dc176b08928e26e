//! # Modbus Codec
//!
//! Bit- and word-level packing for Modbus PDU payloads.
//!
//! Coil and discrete-input reads return their bits packed eight to a
//! byte: bit `i` of the requested range lands in byte `i / 8` at bit
//! position `i % 8` (first requested bit = least-significant bit of the
//! first byte). Write Multiple Coils carries its bits in the same order.
//! Register payloads are plain big-endian 16-bit words.

/// Pack bits into bytes, LSB-first, `ceil(len / 8)` bytes.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(bits.len().div_ceil(8));
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            if bit {
                byte |= 1 << i;
            }
        }
        bytes.push(byte);
    }
    bytes
}

/// Unpack `count` bits from packed bytes, inverse of [`pack_bits`].
///
/// Callers must supply at least `ceil(count / 8)` bytes.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| bytes[i / 8] & (1 << (i % 8)) != 0)
        .collect()
}

/// Encode words as big-endian bytes, two per word.
pub fn encode_words(words: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 2);
    for &word in words {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    bytes
}

/// Decode big-endian bytes into words. Ignores a trailing odd byte.
pub fn decode_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}
