//! Byte fixtures shared by the unit tests.

use crate::codec::{crc8, write_number};

/// Header for frame `number`, 4096-sample blocks, 44.1 kHz stereo 16-bit.
pub fn header(number: u64) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xF8, 0xC9, 0x18];
    let mut field = [0u8; 7];
    let len = write_number(number, &mut field);
    bytes.extend_from_slice(&field[..len]);
    bytes.push(crc8(&bytes));
    bytes
}

/// LCG noise restricted to 0x00..=0x7F so it can never contain a sync code.
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 57) as u8
        })
        .collect()
}

/// Overwrite `data` at `at` with `bytes`.
pub fn put(data: &mut [u8], at: usize, bytes: &[u8]) {
    data[at..at + bytes.len()].copy_from_slice(bytes);
}
