use bitstream_io::{BigEndian, BitRead, BitReader};

use subflac_core::format::STREAMINFO_SIZE;
use subflac_core::StreamInfo;

/// Every field of the STREAMINFO block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfoBlock {
    pub block_size_min: u16,
    pub block_size_max: u16,
    pub frame_size_min: u32,
    pub frame_size_max: u32,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub total_samples: u64,
    /// All zero when the encoder did not compute it.
    pub md5: [u8; 16],
}

impl StreamInfoBlock {
    /// Decode the 34-byte block body.
    ///   min block:16 + max block:16 + min frame:24 + max frame:24
    ///   + sample rate:20 + channels-1:3 + bits per sample-1:5
    ///   + total samples:36 + md5:128
    pub fn from_body(body: &[u8]) -> anyhow::Result<Self> {
        if body.len() < STREAMINFO_SIZE as usize {
            anyhow::bail!(
                "STREAMINFO body is {} bytes, expected {}",
                body.len(),
                STREAMINFO_SIZE
            );
        }
        let mut r = BitReader::endian(body, BigEndian);
        let block_size_min = r.read::<u16>(16)?;
        let block_size_max = r.read::<u16>(16)?;
        let frame_size_min = r.read::<u32>(24)?;
        let frame_size_max = r.read::<u32>(24)?;
        let sample_rate = r.read::<u32>(20)?;
        let channels = r.read::<u8>(3)? + 1;
        let bits_per_sample = r.read::<u8>(5)? + 1;
        let total_samples = r.read::<u64>(36)?;
        let mut md5 = [0u8; 16];
        r.read_bytes(&mut md5)?;

        Ok(Self {
            block_size_min,
            block_size_max,
            frame_size_min,
            frame_size_max,
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
            md5,
        })
    }

    pub fn md5_is_set(&self) -> bool {
        self.md5.iter().any(|&b| b != 0)
    }

    pub fn md5_hex(&self) -> String {
        self.md5.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl From<&StreamInfoBlock> for StreamInfo {
    fn from(block: &StreamInfoBlock) -> Self {
        StreamInfo {
            sample_rate: block.sample_rate,
            total_samples: block.total_samples,
            block_size_min: block.block_size_min,
            block_size_max: block.block_size_max,
            frame_size_min: block.frame_size_min,
            frame_size_max: block.frame_size_max,
        }
    }
}
