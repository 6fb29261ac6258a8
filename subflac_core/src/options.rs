/// Default read granularity of the extraction stream: 64 KB.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Frame distance at which the seeker stops jumping and walks frame by frame.
pub const DEFAULT_COARSE_TOLERANCE: u64 = 50;

/// Upper bound on locator calls spent on a single seek.
pub const DEFAULT_MAX_SEEK_ITERATIONS: usize = 10_000;

/// Tuning knobs for a [`Subflac`](crate::Subflac) session.
#[derive(Debug, Clone)]
pub struct Options {
    /// Bytes pulled from the source per read by the extraction stream.
    pub chunk_size: usize,
    pub coarse_tolerance: u64,
    pub max_seek_iterations: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            coarse_tolerance: DEFAULT_COARSE_TOLERANCE,
            max_seek_iterations: DEFAULT_MAX_SEEK_ITERATIONS,
        }
    }
}
