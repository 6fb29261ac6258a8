#![allow(dead_code)]

use std::io::Cursor;

use subflac_core::codec::{crc8, write_number};
use subflac_core::{StreamInfo, Subflac, FLAC_SIGNATURE};
use subflac_meta::{BlockHeader, BlockType};

/// Shape of a synthetic fixed-block-size stream.
#[derive(Debug, Clone)]
pub struct Synth {
    pub sample_rate: u32,
    pub block_size: u16,
    pub frames: u64,
    /// Frame sizes are drawn from `frame_size_min..=frame_size_max`.
    pub frame_size_min: u32,
    pub frame_size_max: u32,
    /// Write 0 for both frame sizes in STREAMINFO.
    pub unknown_frame_sizes: bool,
    /// Samples in one extra, shorter final frame (0 for none).
    pub tail_samples: u64,
    /// Bytes of PADDING after STREAMINFO (0 for no block).
    pub padding: u32,
    pub seed: u64,
}

impl Default for Synth {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 4096,
            frames: 1000,
            frame_size_min: 80,
            frame_size_max: 400,
            unknown_frame_sizes: false,
            tail_samples: 0,
            padding: 64,
            seed: 7,
        }
    }
}

pub struct Fixture {
    pub bytes: Vec<u8>,
    pub info: StreamInfo,
    pub audio_offset: u64,
    /// Start of every frame, including the tail frame.
    pub frame_offsets: Vec<u64>,
}

impl Fixture {
    pub fn session(&self) -> Subflac<Cursor<Vec<u8>>> {
        Subflac::new(Cursor::new(self.bytes.clone()), self.info.clone())
            .expect("session over in-memory fixture")
            .with_audio_offset(self.audio_offset)
    }
}

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    /// Payload byte that can never start a sync code.
    fn payload(&mut self) -> u8 {
        (self.next() & 0x7F) as u8
    }
}

/// Frame header: 4096-sample blocks, 44.1 kHz, stereo, 16-bit.
pub fn frame_header(number: u64) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xF8, 0xC9, 0x18];
    let mut field = [0u8; 7];
    let len = write_number(number, &mut field);
    bytes.extend_from_slice(&field[..len]);
    bytes.push(crc8(&bytes));
    bytes
}

pub fn streaminfo_body(info: &StreamInfo, md5: [u8; 16]) -> Vec<u8> {
    let mut b = Vec::with_capacity(34);
    b.extend_from_slice(&info.block_size_min.to_be_bytes());
    b.extend_from_slice(&info.block_size_max.to_be_bytes());
    b.extend_from_slice(&info.frame_size_min.to_be_bytes()[1..]);
    b.extend_from_slice(&info.frame_size_max.to_be_bytes()[1..]);
    // sample rate:20, channels-1:3 (stereo), bits-1:5 (16-bit), total samples:36
    let packed = ((info.sample_rate as u64) << 44) | (1 << 41) | (15 << 36) | info.total_samples;
    b.extend_from_slice(&packed.to_be_bytes());
    b.extend_from_slice(&md5);
    b
}

fn metadata_block(kind: BlockType, is_last: bool, body: &[u8]) -> Vec<u8> {
    let header = BlockHeader {
        is_last,
        block_type: kind,
        length: body.len() as u32,
    };
    let mut b = header.to_bytes().to_vec();
    b.extend_from_slice(body);
    b
}

impl Synth {
    pub fn build(&self) -> Fixture {
        let mut rng = Lcg(self.seed);
        let frame_count = self.frames + u64::from(self.tail_samples > 0);
        let info = StreamInfo {
            sample_rate: self.sample_rate,
            total_samples: self.frames * self.block_size as u64 + self.tail_samples,
            block_size_min: self.block_size,
            block_size_max: self.block_size,
            frame_size_min: if self.unknown_frame_sizes { 0 } else { self.frame_size_min },
            frame_size_max: if self.unknown_frame_sizes { 0 } else { self.frame_size_max },
        };

        let mut bytes = FLAC_SIGNATURE.to_vec();
        bytes.extend(metadata_block(
            BlockType::StreamInfo,
            self.padding == 0,
            &streaminfo_body(&info, [0x5A; 16]),
        ));
        if self.padding > 0 {
            bytes.extend(metadata_block(BlockType::Padding, true, &vec![0u8; self.padding as usize]));
        }
        let audio_offset = bytes.len() as u64;

        let span = (self.frame_size_max - self.frame_size_min + 1) as u64;
        let mut frame_offsets = Vec::with_capacity(frame_count as usize);
        for number in 0..frame_count {
            frame_offsets.push(bytes.len() as u64);
            let size = self.frame_size_min as usize + (rng.next() % span) as usize;
            let header = frame_header(number);
            bytes.extend_from_slice(&header);
            bytes.extend((header.len()..size).map(|_| rng.payload()));
        }

        Fixture {
            bytes,
            info,
            audio_offset,
            frame_offsets,
        }
    }
}

/// Frame numbers of every valid header at `offsets` in `bytes`.
pub fn numbers_at(bytes: &[u8], offsets: &[u64]) -> Vec<u64> {
    use subflac_core::format::SYNC_FIXED;
    use subflac_core::frame::{read_number, validate_header};
    use subflac_core::MAX_HEADER_LEN;

    offsets
        .iter()
        .map(|&at| {
            let at = at as usize;
            let end = (at + MAX_HEADER_LEN).min(bytes.len());
            let header = &bytes[at..end];
            let layout = validate_header(header, SYNC_FIXED)
                .unwrap_or_else(|| panic!("no valid frame header at {at}"));
            read_number(header, &layout)
        })
        .collect()
}
