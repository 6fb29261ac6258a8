//! Checksum and "UTF-8" number primitives used inside frame headers.
//!
//! A frame header stores its frame number (fixed block size) or first sample
//! number (variable block size) in the generalized UTF-8 scheme: the count of
//! leading one bits in the first byte gives the total field length, and each
//! continuation byte is `10xxxxxx`. Unlike real UTF-8 the scheme extends to 7
//! bytes, enough for a 36-bit value.

use crate::error::{Error, Result};

/// x^8 + x^2 + x^1 + x^0
pub const CRC8_POLY: u8 = 0x07;

/// CRC-8 over `bytes`: polynomial 0x07, initial value 0, MSB first, no
/// reflection.
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Total length in bytes of a number field, from its first byte.
///
/// A clear top bit means a single byte. Otherwise the run of leading ones
/// is the length. `0xFF` has no terminating zero and is rejected.
pub fn number_field_length(first_byte: u8) -> Result<usize> {
    match first_byte.leading_ones() {
        0 => Ok(1),
        8 => Err(Error::InvalidNumberField { byte: first_byte }),
        n => Ok(n as usize),
    }
}

/// Payload mask for the leading byte of a `len`-byte field.
fn leading_mask(len: usize) -> u8 {
    (0xFFu32 >> (len + 1)) as u8
}

/// Number of value bits a `len`-byte field can carry.
pub fn number_capacity_bits(len: usize) -> u32 {
    if len <= 1 {
        return 7;
    }
    leading_mask(len).count_ones() + 6 * (len as u32 - 1)
}

/// Decode a number field occupying all of `bytes`.
pub fn decode_number(bytes: &[u8]) -> u64 {
    let len = bytes.len();
    if len == 1 {
        return bytes[0] as u64;
    }

    let mut number = 0u64;
    for (idx, &byte) in bytes.iter().enumerate() {
        if idx == 0 {
            number = (leading_mask(len) & byte) as u64;
        } else {
            number = (number << 6) | (byte & 0x3F) as u64;
        }
    }
    number
}

/// Overwrite the payload bits of the number field in `bytes` with `value`.
///
/// The length prefix of the first byte and the `10` marker of each
/// continuation byte are left as they are, so the field keeps its length.
/// A single-byte field is read raw, so it is written whole.
pub fn encode_number(value: u64, bytes: &mut [u8]) {
    let len = bytes.len();
    if len == 1 {
        bytes[0] = value as u8;
        return;
    }

    let mask = leading_mask(len);
    for (idx, byte) in bytes.iter_mut().enumerate() {
        let payload = (value >> (6 * (len - 1 - idx))) as u8;
        if idx == 0 {
            *byte = (*byte & !mask) | (payload & mask);
        } else {
            *byte = (*byte & 0xC0) | (payload & 0x3F);
        }
    }
}

/// Write a fresh, shortest-form number field for `value` into `out`,
/// returning the number of bytes used.
pub fn write_number(value: u64, out: &mut [u8; 7]) -> usize {
    let len = (1..=7)
        .find(|&len| value < 1u64 << number_capacity_bits(len))
        .unwrap_or(7);
    if len == 1 {
        out[0] = value as u8;
        return 1;
    }
    out[0] = !leading_mask(len) & !(0x80u8 >> len);
    for byte in out.iter_mut().take(len).skip(1) {
        *byte = 0x80;
    }
    encode_number(value, &mut out[..len]);
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_known_vectors() {
        assert_eq!(crc8(&[]), 0);
        // CRC-8/SMBUS check value
        assert_eq!(crc8(b"123456789"), 0xF4);
    }

    #[test]
    fn test_crc8_detects_every_single_bit_flip() {
        let data = *b"\xFF\xF8\xC9\x18\xC2\x9A";
        let reference = crc8(&data);
        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data;
                flipped[byte] ^= 1 << bit;
                assert_ne!(crc8(&flipped), reference, "flip of byte {byte} bit {bit} collided");
            }
        }
    }

    #[test]
    fn test_number_field_length() {
        assert_eq!(number_field_length(0x00).unwrap(), 1);
        assert_eq!(number_field_length(0x7F).unwrap(), 1);
        assert_eq!(number_field_length(0b1000_0000).unwrap(), 1);
        assert_eq!(number_field_length(0b1100_0000).unwrap(), 2);
        assert_eq!(number_field_length(0b1110_1111).unwrap(), 3);
        assert_eq!(number_field_length(0b1111_0000).unwrap(), 4);
        assert_eq!(number_field_length(0b1111_1000).unwrap(), 5);
        assert_eq!(number_field_length(0b1111_1100).unwrap(), 6);
        assert_eq!(number_field_length(0b1111_1110).unwrap(), 7);
        assert!(matches!(
            number_field_length(0xFF),
            Err(Error::InvalidNumberField { byte: 0xFF })
        ));
    }

    #[test]
    fn test_capacity_bits() {
        let caps: Vec<u32> = (1..=7).map(number_capacity_bits).collect();
        assert_eq!(caps, vec![7, 11, 16, 21, 26, 31, 36]);
    }

    #[test]
    fn test_decode_known_encodings() {
        assert_eq!(decode_number(&[0x45]), 0x45);
        // U+00E9 in UTF-8
        assert_eq!(decode_number(&[0xC3, 0xA9]), 0xE9);
        // U+20AC in UTF-8
        assert_eq!(decode_number(&[0xE2, 0x82, 0xAC]), 0x20AC);
        // 36-bit maximum
        assert_eq!(
            decode_number(&[0xFE, 0xBF, 0xBF, 0xBF, 0xBF, 0xBF, 0xBF]),
            (1u64 << 36) - 1
        );
    }

    #[test]
    fn test_encode_inverts_decode_at_field_edges() {
        for len in 1..=7 {
            let cap = number_capacity_bits(len);
            let samples = [0u64, 1, (1u64 << cap) / 3, (1u64 << cap) - 1];
            for &value in &samples {
                let mut field = [0u8; 7];
                assert!(write_number((1u64 << cap) - 1, &mut field) == len);
                encode_number(value, &mut field[..len]);
                assert_eq!(decode_number(&field[..len]), value, "len {len} value {value}");
                assert_eq!(number_field_length(field[0]).unwrap(), len);
            }
        }
    }

    #[test]
    fn test_encode_preserves_marker_bits() {
        let mut field = [0xE2, 0x82, 0xAC];
        encode_number(0, &mut field);
        assert_eq!(field, [0xE0, 0x80, 0x80]);
        encode_number(0xFFFF, &mut field);
        assert_eq!(field, [0xEF, 0xBF, 0xBF]);
    }

    #[test]
    fn test_single_byte_field_ignores_previous_top_bit() {
        let mut field = [0x85];
        assert_eq!(number_field_length(field[0]).unwrap(), 1);
        encode_number(5, &mut field);
        assert_eq!(field, [0x05]);
        assert_eq!(decode_number(&field), 5);
    }

    #[test]
    fn test_write_number_is_shortest_form() {
        let mut out = [0u8; 7];
        assert_eq!(write_number(0, &mut out), 1);
        assert_eq!(out[0], 0);
        assert_eq!(write_number(0x7F, &mut out), 1);
        assert_eq!(write_number(0x80, &mut out), 2);
        assert_eq!(&out[..2], &[0xC2, 0x80]);
        assert_eq!(write_number(999, &mut out), 2);
        assert_eq!(decode_number(&out[..2]), 999);
    }
}
