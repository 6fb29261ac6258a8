use crate::codec::{crc8, decode_number, encode_number, number_field_length};
use crate::error::{Error, Result};
use crate::format::HEADER_PREFIX_LEN;

/// A checksum-verified frame header found by the locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLocation {
    /// Absolute byte offset of the sync code in the source.
    pub address: u64,
    /// Offset of the sync code within the scanned window.
    pub relative_offset: usize,
    /// Length of the "UTF-8" number field (1–7).
    pub number_field_length: usize,
    /// Frame number (fixed block size) or first sample number (variable).
    pub number: u64,
    /// Whole header length including the trailing CRC-8 byte.
    pub header_length: usize,
    pub checksum: u8,
}

/// Byte layout of one frame header, as read from its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    pub number_field_length: usize,
    /// Bytes between the number field and the checksum (uncommon block
    /// size / sample rate stored at the end of the header).
    pub trailer_length: usize,
}

impl HeaderLayout {
    /// Offset of the CRC-8 byte from the sync code.
    pub fn checksum_offset(&self) -> usize {
        HEADER_PREFIX_LEN + self.number_field_length + self.trailer_length
    }

    pub fn header_length(&self) -> usize {
        self.checksum_offset() + 1
    }

    fn number_range(&self) -> std::ops::Range<usize> {
        HEADER_PREFIX_LEN..HEADER_PREFIX_LEN + self.number_field_length
    }
}

pub fn starts_with_sync(bytes: &[u8], sync: u16) -> bool {
    bytes.len() >= 2 && u16::from_be_bytes([bytes[0], bytes[1]]) == sync
}

/// Work out the header layout from the descriptor bytes and number field.
///
/// `bytes` starts at the sync code. Reserved descriptor codes (block size
/// `0000`, sample rate `1111`) are rejected as no header at all.
pub fn header_layout(bytes: &[u8]) -> Result<HeaderLayout> {
    if bytes.len() <= HEADER_PREFIX_LEN {
        return Err(Error::TruncatedHeader { length: bytes.len() });
    }
    let block_size_code = bytes[2] >> 4;
    let sample_rate_code = bytes[2] & 0x0F;
    if block_size_code == 0 || sample_rate_code == 0x0F {
        return Err(Error::ReservedDescriptor { byte: bytes[2] });
    }

    let number_field_length = number_field_length(bytes[HEADER_PREFIX_LEN])?;
    let trailer_length = match block_size_code {
        0b0110 => 1,
        0b0111 => 2,
        _ => 0,
    } + match sample_rate_code {
        0b1100 => 1,
        0b1101 | 0b1110 => 2,
        _ => 0,
    };

    Ok(HeaderLayout {
        number_field_length,
        trailer_length,
    })
}

/// Validate a candidate header at the start of `bytes`.
///
/// Returns `None` when the sync code is absent, the layout is invalid, the
/// header runs past the end of `bytes`, or the stored CRC-8 disagrees with
/// one computed over every preceding header byte.
pub fn validate_header(bytes: &[u8], sync: u16) -> Option<HeaderLayout> {
    if !starts_with_sync(bytes, sync) {
        return None;
    }
    let layout = header_layout(bytes).ok()?;
    let checksum_at = layout.checksum_offset();
    if checksum_at >= bytes.len() {
        return None;
    }
    (crc8(&bytes[..checksum_at]) == bytes[checksum_at]).then_some(layout)
}

/// Number stored in a header already validated with `layout`.
pub fn read_number(bytes: &[u8], layout: &HeaderLayout) -> u64 {
    decode_number(&bytes[layout.number_range()])
}

/// Replace the number in a validated header and refresh its checksum.
///
/// Returns the new checksum byte.
pub fn rewrite_number(bytes: &mut [u8], layout: &HeaderLayout, number: u64) -> u8 {
    encode_number(number, &mut bytes[layout.number_range()]);
    let checksum_at = layout.checksum_offset();
    let checksum = crc8(&bytes[..checksum_at]);
    bytes[checksum_at] = checksum;
    checksum
}
