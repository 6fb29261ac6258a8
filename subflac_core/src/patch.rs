use std::io::{Read, Seek};
use std::ops::Range;

use tracing::debug;

use crate::error::{Error, Result};
use crate::format::{MD5_BIT_OFFSET, TOTAL_SAMPLES_BITS, TOTAL_SAMPLES_BIT_OFFSET};
use crate::reader::Subflac;

/// The STREAMINFO total-samples field, counted from byte 0 of the file.
pub const TOTAL_SAMPLES_FIELD: BitField = BitField::new(TOTAL_SAMPLES_BIT_OFFSET, TOTAL_SAMPLES_BITS);

/// A big-endian unsigned field of `bits` bits starting `bit_offset` bits
/// into a byte buffer, with no alignment requirement.
///
/// Reads and writes touch only the field's bits: the leading bits of its
/// first byte and the trailing bits of its last byte are preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub bit_offset: usize,
    /// At most 57, so a field plus its alignment fits in a u64.
    pub bits: u32,
}

impl BitField {
    pub const fn new(bit_offset: usize, bits: u32) -> Self {
        Self { bit_offset, bits }
    }

    /// Bits of the first byte that precede the field.
    fn lead(&self) -> u32 {
        (self.bit_offset % 8) as u32
    }

    /// Number of bytes the field touches.
    pub fn byte_span(&self) -> usize {
        (self.lead() + self.bits).div_ceil(8) as usize
    }

    /// Bits of the last byte that follow the field.
    fn trail(&self) -> u32 {
        self.byte_span() as u32 * 8 - self.lead() - self.bits
    }

    pub fn byte_range(&self) -> Range<usize> {
        let first = self.bit_offset / 8;
        first..first + self.byte_span()
    }

    /// Mask of the field's bits within the `idx`-th spanned byte.
    fn byte_mask(&self, idx: usize) -> u8 {
        let first = 0xFFu8 >> self.lead();
        let last = 0xFFu8 << self.trail();
        match (idx == 0, idx + 1 == self.byte_span()) {
            (true, true) => first & last,
            (true, false) => first,
            (false, true) => last,
            (false, false) => 0xFF,
        }
    }

    fn check_len(&self, buf: &[u8]) -> Result<()> {
        if buf.len() < self.byte_range().end {
            return Err(Error::TruncatedHeader { length: buf.len() });
        }
        Ok(())
    }

    pub fn read(&self, buf: &[u8]) -> Result<u64> {
        self.check_len(buf)?;
        let value = buf[self.byte_range()]
            .iter()
            .enumerate()
            .fold(0u64, |acc, (idx, &byte)| (acc << 8) | (byte & self.byte_mask(idx)) as u64);
        Ok(value >> self.trail())
    }

    pub fn write(&self, buf: &mut [u8], value: u64) -> Result<()> {
        if self.bits < 64 && value >> self.bits != 0 {
            return Err(Error::FieldOverflow {
                value,
                bits: self.bits,
            });
        }
        self.check_len(buf)?;
        let span = self.byte_span();
        let shifted = value << self.trail();
        let range = self.byte_range();
        for (idx, byte) in buf[range].iter_mut().enumerate() {
            let payload = (shifted >> (8 * (span - 1 - idx))) as u8;
            let mask = self.byte_mask(idx);
            *byte = (*byte & !mask) | (payload & mask);
        }
        Ok(())
    }
}

/// Zero the STREAMINFO MD5 signature ("not computed").
pub fn clear_md5(header: &mut [u8]) -> Result<()> {
    let start = MD5_BIT_OFFSET / 8;
    let end = start + 16;
    if header.len() < end {
        return Err(Error::TruncatedHeader {
            length: header.len(),
        });
    }
    header[start..end].fill(0);
    Ok(())
}

impl<R: Read + Seek> Subflac<R> {
    /// Copy of every byte before the first frame, with the STREAMINFO
    /// total-samples field set to `new_count`.
    ///
    /// The field is read back with the same masks after writing; any
    /// disagreement is reported as [`Error::PatchMismatch`].
    pub fn patch_sample_count(&mut self, new_count: u64) -> Result<Vec<u8>> {
        let first_frame = self.first_frame_address()?;
        let mut header = self.read_range(0, first_frame)?;

        let previous = TOTAL_SAMPLES_FIELD.read(&header)?;
        TOTAL_SAMPLES_FIELD.write(&mut header, new_count)?;
        let found = TOTAL_SAMPLES_FIELD.read(&header)?;
        if found != new_count {
            return Err(Error::PatchMismatch {
                expected: new_count,
                found,
            });
        }

        debug!(previous, new_count, header_len = header.len(), "patched sample count");
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_samples_field_geometry() {
        assert_eq!(TOTAL_SAMPLES_FIELD.byte_range(), 21..26);
        assert_eq!(TOTAL_SAMPLES_FIELD.byte_span(), 5);
        assert_eq!(TOTAL_SAMPLES_FIELD.byte_mask(0), 0x0F);
        assert_eq!(TOTAL_SAMPLES_FIELD.byte_mask(4), 0xFF);
    }

    #[test]
    fn test_write_then_read_every_alignment() {
        for bit_offset in 0..16 {
            for bits in [1u32, 7, 8, 9, 36, 57] {
                let field = BitField::new(bit_offset, bits);
                let max = (1u64 << bits) - 1;
                for value in [0, 1, max / 3, max] {
                    let mut buf = [0xA5u8; 12];
                    let before = buf;
                    field.write(&mut buf, value).unwrap();
                    assert_eq!(field.read(&buf).unwrap(), value, "offset {bit_offset} bits {bits}");

                    // every bit outside the field is untouched
                    for bit in 0..buf.len() * 8 {
                        let inside = bit >= bit_offset && bit < bit_offset + bits as usize;
                        let mask = 0x80u8 >> (bit % 8);
                        if !inside {
                            assert_eq!(
                                buf[bit / 8] & mask,
                                before[bit / 8] & mask,
                                "bit {bit} changed (offset {bit_offset} bits {bits})"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_write_reports_overflow() {
        let mut buf = [0u8; 32];
        let err = TOTAL_SAMPLES_FIELD.write(&mut buf, 1 << 36).unwrap_err();
        assert!(matches!(err, Error::FieldOverflow { bits: 36, .. }));
        assert_eq!(buf, [0u8; 32], "nothing written on overflow");
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let mut buf = [0u8; 25];
        assert!(matches!(
            TOTAL_SAMPLES_FIELD.read(&buf),
            Err(Error::TruncatedHeader { length: 25 })
        ));
        assert!(TOTAL_SAMPLES_FIELD.write(&mut buf, 5).is_err());
    }

    #[test]
    fn test_clear_md5_zeroes_only_signature() {
        let mut header = vec![0xEEu8; 50];
        clear_md5(&mut header).unwrap();
        assert!(header[..26].iter().all(|&b| b == 0xEE));
        assert!(header[26..42].iter().all(|&b| b == 0));
        assert!(header[42..].iter().all(|&b| b == 0xEE));
    }
}
