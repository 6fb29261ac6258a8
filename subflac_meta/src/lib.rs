//! FLAC metadata-block parser.
//!
//! Walks the block directory after the `fLaC` signature, decodes STREAMINFO
//! and SEEKTABLE, and reports where the first audio frame begins. The result
//! feeds a [`subflac_core::Subflac`] session.

pub mod blocks;
pub mod seektable;
pub mod streaminfo;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use subflac_core::format::{BLOCK_HEADER_SIZE, FLAC_SIGNATURE};
use subflac_core::StreamInfo;

pub use blocks::{BlockEntry, BlockHeader, BlockType};
pub use seektable::SeekPoint;
pub use streaminfo::StreamInfoBlock;

/// Everything read from the metadata section of one file.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub stream_info: StreamInfoBlock,
    pub blocks: Vec<BlockEntry>,
    /// Points of every SEEKTABLE block, in file order.
    pub seek_points: Vec<SeekPoint>,
    /// Offset just past the last metadata block.
    pub audio_offset: u64,
    pub file_size: u64,
}

impl Metadata {
    /// The fields a subclip session needs.
    pub fn core_info(&self) -> StreamInfo {
        StreamInfo::from(&self.stream_info)
    }
}

/// Parse the metadata section from the start of `reader`.
pub fn parse<R: Read + Seek>(reader: &mut R) -> anyhow::Result<Metadata> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut signature = [0u8; 4];
    reader
        .read_exact(&mut signature)
        .context("reading stream signature")?;
    if &signature != FLAC_SIGNATURE {
        anyhow::bail!("invalid signature {:02x?}: not a FLAC stream", signature);
    }

    let mut offset = FLAC_SIGNATURE.len() as u64;
    let mut stream_info = None;
    let mut blocks = Vec::new();
    let mut seek_points = Vec::new();

    loop {
        let mut raw = [0u8; BLOCK_HEADER_SIZE as usize];
        reader
            .read_exact(&mut raw)
            .with_context(|| format!("reading metadata block header at offset {offset}"))?;
        let entry = BlockEntry {
            offset,
            header: BlockHeader::from_bytes(&raw),
        };
        let kind = entry.header.block_type;

        if entry.end() > file_size {
            anyhow::bail!(
                "{} block at offset {} runs past end of file ({} > {})",
                kind,
                offset,
                entry.end(),
                file_size
            );
        }
        if blocks.is_empty() && kind != BlockType::StreamInfo {
            anyhow::bail!("first metadata block is {kind}, expected STREAMINFO");
        }

        match kind {
            BlockType::StreamInfo | BlockType::SeekTable => {
                let mut body = vec![0u8; entry.header.length as usize];
                reader
                    .read_exact(&mut body)
                    .with_context(|| format!("reading {kind} body at offset {offset}"))?;
                if kind == BlockType::StreamInfo {
                    let info = StreamInfoBlock::from_body(&body)
                        .with_context(|| format!("decoding STREAMINFO at offset {offset}"))?;
                    stream_info = Some(info);
                } else {
                    let points = seektable::parse(&body)
                        .with_context(|| format!("decoding SEEKTABLE at offset {offset}"))?;
                    seek_points.extend(points);
                }
            }
            _ => {
                reader.seek(SeekFrom::Start(entry.end()))?;
            }
        }

        debug!(offset, kind = %kind, length = entry.header.length, "metadata block");
        offset = entry.end();
        blocks.push(entry);
        if entry.header.is_last {
            break;
        }
    }

    let stream_info = stream_info.context("stream has no STREAMINFO block")?;
    debug!(
        blocks = blocks.len(),
        audio_offset = offset,
        total_samples = stream_info.total_samples,
        "parsed metadata"
    );
    Ok(Metadata {
        stream_info,
        blocks,
        seek_points,
        audio_offset: offset,
        file_size,
    })
}

/// Open `path` and parse its metadata section.
pub fn parse_file(path: impl AsRef<Path>) -> anyhow::Result<Metadata> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse(&mut BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn block(kind: BlockType, is_last: bool, body: &[u8]) -> Vec<u8> {
        let header = BlockHeader {
            is_last,
            block_type: kind,
            length: body.len() as u32,
        };
        let mut b = header.to_bytes().to_vec();
        b.extend_from_slice(body);
        b
    }

    fn streaminfo_body() -> Vec<u8> {
        let mut b = vec![0x10, 0x00, 0x10, 0x00, 0x00, 0x00, 0x0E, 0x00, 0x3F, 0xFF];
        let packed: u64 = (44_100u64 << 44) | (1 << 41) | (15 << 36) | 4_096_000;
        b.extend_from_slice(&packed.to_be_bytes());
        b.extend_from_slice(&[0u8; 16]);
        b
    }

    fn stream(tail: &[&[u8]]) -> Vec<u8> {
        let mut file = FLAC_SIGNATURE.to_vec();
        for part in tail {
            file.extend_from_slice(part);
        }
        file
    }

    #[test]
    fn test_parse_directory_and_audio_offset() {
        let mut seek = 0u64.to_be_bytes().to_vec();
        seek.extend_from_slice(&0u64.to_be_bytes());
        seek.extend_from_slice(&4096u16.to_be_bytes());

        let file = stream(&[
            &block(BlockType::StreamInfo, false, &streaminfo_body()),
            &block(BlockType::SeekTable, false, &seek),
            &block(BlockType::Padding, true, &[0u8; 100]),
            &[0xFF, 0xF8, 0xC9, 0x18],
        ]);
        let meta = parse(&mut Cursor::new(file)).unwrap();

        assert_eq!(meta.blocks.len(), 3);
        assert_eq!(meta.blocks[0].offset, 4);
        assert_eq!(meta.blocks[1].offset, 42);
        assert_eq!(meta.blocks[2].header.block_type, BlockType::Padding);
        assert_eq!(meta.audio_offset, 42 + 4 + 18 + 4 + 100);
        assert_eq!(meta.seek_points.len(), 1);
        assert_eq!(meta.stream_info.sample_rate, 44_100);
        assert!(!meta.stream_info.md5_is_set());
        assert_eq!(meta.core_info().total_samples, 4_096_000);
    }

    #[test]
    fn test_bad_signature() {
        let err = parse(&mut Cursor::new(b"OggS\0\0\0\0".to_vec())).unwrap_err();
        assert!(err.to_string().contains("not a FLAC stream"));
    }

    #[test]
    fn test_block_past_end_of_file() {
        let mut file = stream(&[&block(BlockType::StreamInfo, true, &streaminfo_body())]);
        file.truncate(30);
        let err = parse(&mut Cursor::new(file)).unwrap_err();
        assert!(err.to_string().contains("runs past end of file"));
    }

    #[test]
    fn test_first_block_must_be_streaminfo() {
        let file = stream(&[&block(BlockType::Padding, true, &[0u8; 8])]);
        let err = parse(&mut Cursor::new(file)).unwrap_err();
        assert!(err.to_string().contains("expected STREAMINFO"));
    }

    #[test]
    fn test_short_streaminfo_has_context() {
        let file = stream(&[&block(BlockType::StreamInfo, true, &[0u8; 20])]);
        let err = parse(&mut Cursor::new(file)).unwrap_err();
        assert!(format!("{err:#}").contains("20 bytes"));
    }
}
