pub mod codec;
pub mod error;
pub mod format;
pub mod frame;
pub mod options;
pub mod patch;
pub mod reader;
pub mod seek;
pub mod stream;

#[cfg(test)]
mod test_util;

pub use error::{Error, ErrorKind, Result};
pub use format::{BlockingStrategy, StreamInfo, FLAC_SIGNATURE, MAX_HEADER_LEN, STREAMINFO_END};
pub use frame::FrameLocation;
pub use options::Options;
pub use patch::{BitField, TOTAL_SAMPLES_FIELD};
pub use reader::Subflac;
pub use seek::Interval;
pub use stream::{ExtractRequest, Extraction, Renumber};
