use std::io::{self, Read, Seek, SeekFrom};

use tracing::debug;

use crate::error::{Error, Result};
use crate::format::{BlockingStrategy, StreamInfo, MAX_HEADER_LEN, STREAMINFO_END};
use crate::frame::{read_number, starts_with_sync, validate_header, FrameLocation};
use crate::options::Options;

/// A subclip session bound to one FLAC source.
///
/// # Access pattern
/// Every operation addresses the source by absolute byte offset and seeks
/// the one owned cursor itself before reading. Nothing assumes the cursor
/// is where the previous call left it, so locator calls can interleave
/// freely with seek corrections and header reads.
///
/// The search window (sized to the stream's maximum frame size) and the
/// header scratch buffer are allocated once and reused by every scan.
/// The source is only ever read.
pub struct Subflac<R> {
    pub(crate) source: R,
    pub(crate) info: StreamInfo,
    pub(crate) options: Options,
    pub(crate) file_size: u64,
    audio_offset: Option<u64>,
    window: Vec<u8>,
    header: [u8; MAX_HEADER_LEN],
}

impl<R: Read + Seek> Subflac<R> {
    /// Bind a session to `source`, described by `info`.
    pub fn new(mut source: R, info: StreamInfo) -> Result<Self> {
        let file_size = source.seek(SeekFrom::End(0))?;
        let window = vec![0u8; info.effective_frame_size_max() as usize];
        debug!(
            file_size,
            total_samples = info.total_samples,
            block_size = info.block_size_max,
            fixed = info.is_fixed_block_size(),
            "opened subflac session"
        );
        Ok(Self {
            source,
            info,
            options: Options::default(),
            file_size,
            audio_offset: None,
            window,
            header: [0u8; MAX_HEADER_LEN],
        })
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Byte offset of the first frame as reported by the container parser.
    ///
    /// Without it the first frame is searched for right after STREAMINFO,
    /// which fails when the remaining metadata is larger than one window.
    pub fn with_audio_offset(mut self, offset: u64) -> Self {
        self.audio_offset = Some(offset);
        self
    }

    #[inline]
    pub fn stream_info(&self) -> &StreamInfo {
        &self.info
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[inline]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    #[inline]
    pub fn is_fixed_block_size(&self) -> bool {
        self.info.is_fixed_block_size()
    }

    pub fn blocking_strategy(&self) -> BlockingStrategy {
        self.info.blocking_strategy()
    }

    pub fn audio_offset(&self) -> Option<u64> {
        self.audio_offset
    }

    /// Lowest address a frame can start at.
    pub(crate) fn search_floor(&self) -> u64 {
        self.audio_offset.unwrap_or(STREAMINFO_END)
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Find the first checksum-valid frame header at or after `address`.
    ///
    /// Reads up to one max-frame-size window; a short read near the end of
    /// the source only shrinks it. Sync matches whose CRC-8 disagrees are
    /// skipped. A match too close to the end of the window for a whole
    /// header gets a second, targeted read.
    pub fn locate(&mut self, address: u64) -> Result<FrameLocation> {
        self.source.seek(SeekFrom::Start(address))?;
        let window_len = read_up_to(&mut self.source, &mut self.window)?;
        let sync = self.info.blocking_strategy().sync_code();

        let [sync_high, _] = sync.to_be_bytes();
        for i in 0..window_len {
            // a sync whose second byte lies past the window is settled by the targeted read
            if self.window[i] != sync_high
                || (i + 1 < window_len && !starts_with_sync(&self.window[i..window_len], sync))
            {
                continue;
            }

            let available = if i + MAX_HEADER_LEN <= window_len {
                self.header.copy_from_slice(&self.window[i..i + MAX_HEADER_LEN]);
                MAX_HEADER_LEN
            } else {
                self.source.seek(SeekFrom::Start(address + i as u64))?;
                read_up_to(&mut self.source, &mut self.header)?
            };

            let header = &self.header[..available];
            let Some(layout) = validate_header(header, sync) else {
                continue;
            };

            let location = FrameLocation {
                address: address + i as u64,
                relative_offset: i,
                number_field_length: layout.number_field_length,
                number: read_number(header, &layout),
                header_length: layout.header_length(),
                checksum: header[layout.checksum_offset()],
            };
            debug!(
                from = address,
                at = location.address,
                number = location.number,
                "located frame"
            );
            return Ok(location);
        }

        Err(Error::FrameNotFound { address })
    }

    /// Address of the first audio frame: the end of the metadata blocks.
    pub fn first_frame_address(&mut self) -> Result<u64> {
        let from = self.audio_offset.unwrap_or(STREAMINFO_END);
        Ok(self.locate(from)?.address)
    }

    /// Read exactly the bytes `[start, end)` of the source.
    pub(crate) fn read_range(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; end.saturating_sub(start) as usize];
        self.source.seek(SeekFrom::Start(start))?;
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Fill `buf` from `reader` until it is full or the reader is exhausted.
pub(crate) fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
