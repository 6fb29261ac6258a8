use thiserror::Error;

/// Broad failure classes. Every [`Error`] variant belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Seek or read failure on the source.
    Io,
    /// The byte stream does not hold what the frame format requires.
    Format,
    /// A requested index or value lies outside what the stream can address.
    Range,
    /// A self-check failed: corrupted source or a bit-arithmetic bug.
    Invariant,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame not found at address {address}")]
    FrameNotFound { address: u64 },

    #[error("invalid frame number field: leading byte {byte:#04x} has no terminating zero bit")]
    InvalidNumberField { byte: u8 },

    #[error("reserved block size or sample rate code in frame descriptor {byte:#04x}")]
    ReservedDescriptor { byte: u8 },

    #[error("header truncated: {length} bytes available")]
    TruncatedHeader { length: usize },

    #[error("seek for frame {target} did not converge after {iterations} iterations")]
    SeekDiverged { target: u64, iterations: usize },

    #[error("stream uses variable block sizes; only fixed block size streams can be seeked")]
    VariableBlockSize,

    #[error("sample {target} out of range (stream has {total} samples)")]
    OutOfRange { target: u64, total: u64 },

    #[error("value {value} does not fit in a {bits}-bit field")]
    FieldOverflow { value: u64, bits: u32 },

    #[error("sample count patch self-check failed: wrote {expected}, read back {found}")]
    PatchMismatch { expected: u64, found: u64 },

    #[error("frame numbers not sequential at address {address}: expected {expected}, found {found}")]
    NonMonotonic { address: u64, expected: u64, found: u64 },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::FrameNotFound { .. }
            | Error::InvalidNumberField { .. }
            | Error::ReservedDescriptor { .. }
            | Error::TruncatedHeader { .. }
            | Error::SeekDiverged { .. }
            | Error::VariableBlockSize => ErrorKind::Format,
            Error::OutOfRange { .. } | Error::FieldOverflow { .. } => ErrorKind::Range,
            Error::PatchMismatch { .. } | Error::NonMonotonic { .. } => ErrorKind::Invariant,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
