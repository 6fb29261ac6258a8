/// Stream signature at byte 0 of every FLAC file.
pub const FLAC_SIGNATURE: &[u8; 4] = b"fLaC";

/// Length of a metadata block header: last-block flag + type:u7 + length:u24.
pub const BLOCK_HEADER_SIZE: u64 = 4;

/// Length of the STREAMINFO block body.
pub const STREAMINFO_SIZE: u64 = 34;

/// Byte offset just past the STREAMINFO block, where the second metadata
/// block (or the first frame, if STREAMINFO is the only block) begins.
///   signature[4] + block header[4] + STREAMINFO[34] = 42
pub const STREAMINFO_END: u64 = FLAC_SIGNATURE.len() as u64 + BLOCK_HEADER_SIZE + STREAMINFO_SIZE;

/// Bit offset of the total-samples field from the start of the file.
///   signature:32 + block header:32
///   + min block:16 + max block:16 + min frame:24 + max frame:24
///   + sample rate:20 + channels-1:3 + bits per sample-1:5
///   = 172
pub const TOTAL_SAMPLES_BIT_OFFSET: usize = 172;

/// Width of the total-samples field.
pub const TOTAL_SAMPLES_BITS: u32 = 36;

/// Bit offset of the 128-bit MD5 signature (follows total samples).
pub const MD5_BIT_OFFSET: usize = TOTAL_SAMPLES_BIT_OFFSET + TOTAL_SAMPLES_BITS as usize;

// ── Frame header ───────────────────────────────────────────────────────────

/// 14-bit sync code `11111111111110`, reserved bit 0, blocking-strategy bit 0.
pub const SYNC_FIXED: u16 = 0xFFF8;

/// Same as [`SYNC_FIXED`] with the blocking-strategy bit set.
pub const SYNC_VARIABLE: u16 = SYNC_FIXED + 1;

/// sync:16 + block size/sample rate:8 + channels/bits/reserved:8
pub const HEADER_PREFIX_LEN: usize = 4;

/// Longest "UTF-8" coded frame/sample number (36-bit sample numbers).
pub const MAX_NUMBER_FIELD_LEN: usize = 7;

/// Longest possible frame header:
///   prefix[4] + number[7] + block size[2] + sample rate[2] + crc8[1] = 16
pub const MAX_HEADER_LEN: usize = HEADER_PREFIX_LEN + MAX_NUMBER_FIELD_LEN + 2 + 2 + 1;

/// Search window used when STREAMINFO leaves the maximum frame size unknown.
pub const FALLBACK_FRAME_SIZE_MAX: u32 = 64 * 1024;

// ── StreamInfo ─────────────────────────────────────────────────────────────

/// Blocking strategy, as signalled by the low bit of the sync field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingStrategy {
    /// Every frame holds `block_size_max` samples; headers carry frame numbers.
    Fixed,
    /// Frames vary in length; headers carry the first sample number.
    Variable,
}

impl BlockingStrategy {
    /// 16-bit sync value that starts every frame header of this strategy.
    pub fn sync_code(self) -> u16 {
        match self {
            BlockingStrategy::Fixed => SYNC_FIXED,
            BlockingStrategy::Variable => SYNC_VARIABLE,
        }
    }
}

/// The STREAMINFO fields the engine needs.
///
/// Produced by a container parser (see the `subflac_meta` crate); the core
/// never parses metadata blocks itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    /// Inter-channel samples in the whole stream (36-bit field).
    pub total_samples: u64,
    pub block_size_min: u16,
    pub block_size_max: u16,
    /// Smallest frame in bytes; 0 when the encoder did not record it.
    pub frame_size_min: u32,
    /// Largest frame in bytes; 0 when the encoder did not record it.
    pub frame_size_max: u32,
}

impl StreamInfo {
    pub fn is_fixed_block_size(&self) -> bool {
        self.block_size_min == self.block_size_max
    }

    pub fn blocking_strategy(&self) -> BlockingStrategy {
        if self.is_fixed_block_size() {
            BlockingStrategy::Fixed
        } else {
            BlockingStrategy::Variable
        }
    }

    /// Stream duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_samples as f64 / self.sample_rate as f64
    }

    /// Number of complete blocks; a trailing partial block is not counted.
    pub fn total_blocks(&self) -> u64 {
        if self.block_size_max == 0 {
            return 0;
        }
        self.total_samples / self.block_size_max as u64
    }

    /// Minimum frame size with the "unknown" value replaced by 1.
    pub fn effective_frame_size_min(&self) -> u64 {
        self.frame_size_min.max(1) as u64
    }

    /// Maximum frame size with the "unknown" value replaced by a 64 KiB window.
    pub fn effective_frame_size_max(&self) -> u64 {
        if self.frame_size_max == 0 {
            FALLBACK_FRAME_SIZE_MAX as u64
        } else {
            self.frame_size_max as u64
        }
    }
}
