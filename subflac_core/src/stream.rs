use std::io::{self, Chain, Cursor, Read, Seek, SeekFrom, Take};

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::format::MAX_HEADER_LEN;
use crate::frame::{read_number, rewrite_number, starts_with_sync, validate_header};
use crate::patch::clear_md5;
use crate::reader::{read_up_to, Subflac};
use crate::seek::Interval;

/// Bytes held back at the end of each chunk so a header starting near the
/// boundary is scanned with its full length available.
const CARRY_OVER: usize = MAX_HEADER_LEN - 1;

/// A subclip to cut, in seconds from the start of the stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractRequest {
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Zero the STREAMINFO MD5, which no longer matches the cut audio.
    pub clear_md5: bool,
}

impl ExtractRequest {
    pub fn new(start_seconds: f64, end_seconds: f64) -> Self {
        Self {
            start_seconds,
            end_seconds,
            clear_md5: false,
        }
    }

    pub fn with_clear_md5(mut self, clear: bool) -> Self {
        self.clear_md5 = clear;
        self
    }
}

/// Forward-only frame renumbering filter.
///
/// Every checksum-valid header passing through gets `first_frame`
/// subtracted from its number and its CRC-8 recomputed; all other bytes are
/// copied unchanged. Reads pull `chunk_size` bytes at a time from the inner
/// reader.
pub struct Renumber<T> {
    inner: T,
    first_frame: u64,
    sync: u16,
    chunk_size: usize,
    buf: Vec<u8>,
    /// Absolute offset of `buf[0]` in the filtered sequence.
    base: u64,
    /// Bytes of `buf` already handed to the caller.
    emitted: usize,
    /// Bytes of `buf` that can no longer change.
    settled: usize,
    /// Next index of `buf` to test for a sync code.
    scan_from: usize,
    eof: bool,
    renumbered: u64,
    skipped: u64,
}

impl<T: Read> Renumber<T> {
    /// `base` is the absolute offset of the first byte `inner` yields; it
    /// only feeds diagnostics.
    pub fn new(inner: T, first_frame: u64, sync: u16, chunk_size: usize, base: u64) -> Self {
        Self {
            inner,
            first_frame,
            sync,
            chunk_size: chunk_size.max(MAX_HEADER_LEN),
            buf: Vec::new(),
            base,
            emitted: 0,
            settled: 0,
            scan_from: 0,
            eof: false,
            renumbered: 0,
            skipped: 0,
        }
    }

    /// Headers rewritten so far.
    pub fn renumbered(&self) -> u64 {
        self.renumbered
    }

    /// Valid headers left untouched because they precede `first_frame`.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Drop emitted bytes, pull the next chunk and scan what it settles.
    fn fill(&mut self) -> io::Result<()> {
        self.buf.drain(..self.emitted);
        self.base += self.emitted as u64;
        self.scan_from -= self.emitted;
        self.settled -= self.emitted;
        self.emitted = 0;

        let held = self.buf.len();
        self.buf.resize(held + self.chunk_size, 0);
        let n = read_up_to(&mut self.inner, &mut self.buf[held..])?;
        self.buf.truncate(held + n);
        self.eof = n < self.chunk_size;

        let limit = if self.eof {
            self.buf.len()
        } else {
            self.buf.len().saturating_sub(CARRY_OVER)
        };
        self.scan(limit);
        self.settled = limit.max(self.settled);
        Ok(())
    }

    /// Rewrite every valid header starting in `scan_from..limit`.
    fn scan(&mut self, limit: usize) {
        let mut i = self.scan_from;
        while i < limit {
            let end = (i + MAX_HEADER_LEN).min(self.buf.len());
            let candidate = &mut self.buf[i..end];
            if !starts_with_sync(candidate, self.sync) {
                i += 1;
                continue;
            }
            let Some(layout) = validate_header(candidate, self.sync) else {
                i += 1;
                continue;
            };

            let address = self.base + i as u64;
            let number = read_number(candidate, &layout);
            let old_checksum = candidate[layout.checksum_offset()];
            if number < self.first_frame {
                warn!(address, number, first_frame = self.first_frame, "frame precedes extraction start, left as is");
                self.skipped += 1;
            } else {
                let renumbered = number - self.first_frame;
                let checksum = rewrite_number(candidate, &layout, renumbered);
                trace!(address, number, renumbered, old_checksum, checksum, "renumbered frame");
                self.renumbered += 1;
            }
            i += layout.header_length();
        }
        self.scan_from = i.max(self.scan_from);
    }
}

impl<T: Read> Read for Renumber<T> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            if self.emitted < self.settled {
                let ready = &self.buf[self.emitted..self.settled];
                let n = ready.len().min(out.len());
                out[..n].copy_from_slice(&ready[..n]);
                self.emitted += n;
                return Ok(n);
            }
            if self.eof {
                return Ok(0);
            }
            self.fill()?;
        }
    }
}

/// The subclip as a single-pass byte sequence: the patched metadata
/// followed by the renumbered audio frames of the interval.
pub struct Extraction<'a, R> {
    interval: Interval,
    sample_count: u64,
    header_len: usize,
    inner: Chain<Cursor<Vec<u8>>, Renumber<Take<&'a mut R>>>,
}

impl<R: Read> Extraction<'_, R> {
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    /// Sample count written into the output STREAMINFO.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Length of the patched metadata prefix.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Total output length.
    pub fn len(&self) -> u64 {
        self.header_len as u64 + self.interval.byte_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frames_renumbered(&self) -> u64 {
        self.inner.get_ref().1.renumbered()
    }
}

impl<R: Read> Read for Extraction<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Seek> Subflac<R> {
    /// Cut `request` out of the source.
    ///
    /// The returned reader yields a standalone stream whose sample count is
    /// `frame_count * block_size` and whose first frame is numbered 0.
    pub fn extract(&mut self, request: &ExtractRequest) -> Result<Extraction<'_, R>> {
        if !self.info.is_fixed_block_size() {
            return Err(Error::VariableBlockSize);
        }
        let interval = self.resolve_interval(request.start_seconds, request.end_seconds)?;
        let sample_count = interval.frame_count() * self.info.block_size_max as u64;

        let mut header = self.patch_sample_count(sample_count)?;
        if request.clear_md5 {
            clear_md5(&mut header)?;
        }
        let header_len = header.len();

        debug!(
            start = interval.start_address,
            end = interval.end_address,
            frames = interval.frame_count(),
            sample_count,
            "extracting"
        );

        let sync = self.info.blocking_strategy().sync_code();
        let chunk_size = self.options.chunk_size;
        self.source.seek(SeekFrom::Start(interval.start_address))?;
        let section = (&mut self.source).take(interval.byte_len());
        let audio = Renumber::new(section, interval.start_frame, sync, chunk_size, interval.start_address);

        Ok(Extraction {
            interval,
            sample_count,
            header_len,
            inner: Cursor::new(header).chain(audio),
        })
    }
}
