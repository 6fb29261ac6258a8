use std::io::{Read, Seek};

use tracing::debug;

use crate::error::{Error, Result};
use crate::frame::FrameLocation;
use crate::reader::Subflac;

/// A time range resolved to frame-aligned byte addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start_address: u64,
    pub start_frame: u64,
    pub end_address: u64,
    pub end_frame: u64,
}

impl Interval {
    pub fn frame_count(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame)
    }

    pub fn byte_len(&self) -> u64 {
        self.end_address.saturating_sub(self.start_address)
    }
}

/// Which correction the seeker is applying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Jump proportionally to the frame distance.
    Coarse,
    /// Step one frame at a time.
    Walk,
}

impl<R: Read + Seek> Subflac<R> {
    /// Find the byte address of frame `target` in a fixed block size stream.
    ///
    /// In such a stream frame `n` starts at sample `n * block_size`, so the
    /// target is a sample block index. The first estimate assumes uniform
    /// bytes per sample; it is then corrected by jumps of `diff` frames
    /// (minimum frame size forward, maximum frame size backward, so a jump
    /// never passes the target) until the found frame is within
    /// `coarse_tolerance`, and finally walked forward one frame at a time.
    pub fn find_frame_for_sample(&mut self, target: u64) -> Result<FrameLocation> {
        if !self.info.is_fixed_block_size() {
            return Err(Error::VariableBlockSize);
        }
        let total = self.info.total_samples;
        let sample = target.saturating_mul(self.info.block_size_max as u64);
        if sample >= total {
            return Err(Error::OutOfRange {
                target: sample,
                total,
            });
        }

        let frame_min = self.info.effective_frame_size_min();
        let frame_max = self.info.effective_frame_size_max();
        let lower = self.search_floor();
        let upper = self.file_size.saturating_sub(frame_min).max(lower);
        let tolerance = self.options.coarse_tolerance as i128;
        let mut iterations = 0usize;

        let estimate = (self.file_size as u128 * sample as u128 / total as u128) as u64;
        let mut found = self.probe(estimate.clamp(lower, upper), target, &mut iterations)?;
        let mut diff = target as i128 - found.number as i128;
        let mut phase = Phase::Coarse;

        while diff != 0 {
            if phase == Phase::Coarse && (0..=tolerance).contains(&diff) {
                debug!(target, at = found.address, diff = diff as i64, "walking to frame");
                phase = Phase::Walk;
            }

            match phase {
                Phase::Coarse => {
                    let step = if diff < 0 {
                        diff * frame_max as i128
                    } else {
                        diff * frame_min as i128
                    };
                    let address =
                        (found.address as i128 + step).clamp(lower as i128, upper as i128) as u64;
                    found = self.probe(address, target, &mut iterations)?;
                }
                Phase::Walk => {
                    iterations += 1;
                    if iterations > self.options.max_seek_iterations {
                        return Err(Error::SeekDiverged { target, iterations });
                    }
                    let next = self.locate(found.address + frame_min)?;
                    if next.number != found.number + 1 {
                        return Err(Error::NonMonotonic {
                            address: next.address,
                            expected: found.number + 1,
                            found: next.number,
                        });
                    }
                    found = next;
                }
            }
            diff = target as i128 - found.number as i128;
        }

        debug!(target, at = found.address, iterations, "found frame");
        Ok(found)
    }

    /// Locate from `address`, backing off one max frame size at a time when
    /// the estimate landed past the last frame header.
    fn probe(&mut self, mut address: u64, target: u64, iterations: &mut usize) -> Result<FrameLocation> {
        let lower = self.search_floor();
        let frame_max = self.info.effective_frame_size_max();
        loop {
            *iterations += 1;
            if *iterations > self.options.max_seek_iterations {
                return Err(Error::SeekDiverged {
                    target,
                    iterations: *iterations,
                });
            }
            match self.locate(address) {
                Err(Error::FrameNotFound { .. }) if address > lower => {
                    address = address.saturating_sub(frame_max).max(lower);
                }
                other => return other,
            }
        }
    }

    /// Byte address of frame `index`, or the end of the source when the
    /// frame would start at or past the last sample.
    fn frame_address(&mut self, index: u64) -> Result<u64> {
        let sample = index.saturating_mul(self.info.block_size_max as u64);
        if sample >= self.info.total_samples {
            return Ok(self.file_size);
        }
        Ok(self.find_frame_for_sample(index)?.address)
    }

    /// Resolve `[start_seconds, end_seconds)` to frame-aligned addresses.
    ///
    /// Both times are clamped into `[0, duration]`. Each becomes the frame
    /// index `floor(total_blocks * time / duration)`. Callers supply
    /// `start_seconds <= end_seconds`; the endpoints are not reordered.
    pub fn resolve_interval(&mut self, start_seconds: f64, end_seconds: f64) -> Result<Interval> {
        let start_frame = self.frame_index_at(start_seconds);
        let end_frame = self.frame_index_at(end_seconds);
        let start_address = self.frame_address(start_frame)?;
        let end_address = self.frame_address(end_frame)?;

        let interval = Interval {
            start_address,
            start_frame,
            end_address,
            end_frame,
        };
        debug!(?interval, start_seconds, end_seconds, "resolved interval");
        Ok(interval)
    }

    fn frame_index_at(&self, seconds: f64) -> u64 {
        let duration = self.info.duration();
        if duration <= 0.0 || seconds.is_nan() {
            return 0;
        }
        let t = seconds.clamp(0.0, duration);
        (self.info.total_blocks() as f64 * (t / duration)).floor() as u64
    }
}
