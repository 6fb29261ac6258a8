use bitstream_io::{BigEndian, BitRead, BitReader};

/// Size of one seek point: sample:u64 + offset:u64 + frame samples:u16.
pub const SEEK_POINT_SIZE: usize = 18;

/// Sample number marking an unused seek point.
pub const PLACEHOLDER_SAMPLE: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekPoint {
    /// First sample of the target frame.
    pub sample_number: u64,
    /// Byte offset of the target frame from the first frame header.
    pub stream_offset: u64,
    pub frame_samples: u16,
}

impl SeekPoint {
    pub fn is_placeholder(&self) -> bool {
        self.sample_number == PLACEHOLDER_SAMPLE
    }
}

/// Decode a SEEKTABLE body.
pub fn parse(body: &[u8]) -> anyhow::Result<Vec<SeekPoint>> {
    if body.len() % SEEK_POINT_SIZE != 0 {
        anyhow::bail!(
            "SEEKTABLE length {} is not a multiple of {}",
            body.len(),
            SEEK_POINT_SIZE
        );
    }
    let mut r = BitReader::endian(body, BigEndian);
    (0..body.len() / SEEK_POINT_SIZE)
        .map(|_| -> anyhow::Result<SeekPoint> {
            Ok(SeekPoint {
                sample_number: r.read::<u64>(64)?,
                stream_offset: r.read::<u64>(64)?,
                frame_samples: r.read::<u16>(16)?,
            })
        })
        .collect()
}
