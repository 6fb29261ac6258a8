use std::fmt;

use subflac_core::format::BLOCK_HEADER_SIZE;

/// Metadata block type, from the low 7 bits of the block header's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    /// Codes 7..=126.
    Reserved(u8),
    /// Code 127, never valid in a stream.
    Invalid,
}

impl BlockType {
    pub fn from_code(code: u8) -> Self {
        match code & 0x7F {
            0 => BlockType::StreamInfo,
            1 => BlockType::Padding,
            2 => BlockType::Application,
            3 => BlockType::SeekTable,
            4 => BlockType::VorbisComment,
            5 => BlockType::CueSheet,
            6 => BlockType::Picture,
            127 => BlockType::Invalid,
            other => BlockType::Reserved(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            BlockType::StreamInfo => 0,
            BlockType::Padding => 1,
            BlockType::Application => 2,
            BlockType::SeekTable => 3,
            BlockType::VorbisComment => 4,
            BlockType::CueSheet => 5,
            BlockType::Picture => 6,
            BlockType::Reserved(code) => code,
            BlockType::Invalid => 127,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::StreamInfo => f.write_str("STREAMINFO"),
            BlockType::Padding => f.write_str("PADDING"),
            BlockType::Application => f.write_str("APPLICATION"),
            BlockType::SeekTable => f.write_str("SEEKTABLE"),
            BlockType::VorbisComment => f.write_str("VORBIS_COMMENT"),
            BlockType::CueSheet => f.write_str("CUESHEET"),
            BlockType::Picture => f.write_str("PICTURE"),
            BlockType::Reserved(code) => write!(f, "RESERVED({code})"),
            BlockType::Invalid => f.write_str("INVALID"),
        }
    }
}

/// Decoded 4-byte metadata block header.
///   last-block:1 + type:7 + length:24
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub is_last: bool,
    pub block_type: BlockType,
    /// Body length in bytes, excluding this header.
    pub length: u32,
}

impl BlockHeader {
    pub fn from_bytes(buf: &[u8; BLOCK_HEADER_SIZE as usize]) -> Self {
        Self {
            is_last: buf[0] & 0x80 != 0,
            block_type: BlockType::from_code(buf[0]),
            length: u32::from_be_bytes([0, buf[1], buf[2], buf[3]]),
        }
    }

    /// Serialize; `length` is truncated to its 24-bit field.
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE as usize] {
        let flag = if self.is_last { 0x80 } else { 0 };
        let len = self.length.to_be_bytes();
        [flag | self.block_type.code(), len[1], len[2], len[3]]
    }
}

/// One entry of the block directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Byte offset of the block header from the start of the file.
    pub offset: u64,
    pub header: BlockHeader,
}

impl BlockEntry {
    /// Offset just past the block body.
    pub fn end(&self) -> u64 {
        self.offset + BLOCK_HEADER_SIZE + self.header.length as u64
    }
}
