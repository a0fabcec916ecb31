//! Tunable constants and the frozen per-run configuration derived from them.

use std::time::Duration;

/// Files at or below this size skip the multipart path entirely.
pub const MULTI_THRESHOLD: u64 = 8 * 1024 * 1024;

/// Default byte range handed to each part before `find_chunksize` adjusts it.
pub const CHUNKSIZE: u64 = 8 * 1024 * 1024;

/// Worker threads for a normal (file destination) run.
pub const NUM_THREADS: usize = 10;

/// Worker threads when the destination is a stream; kept small so buffered
/// stream parts can't pile up in memory ahead of their turn.
pub const STREAM_NUM_THREADS: usize = 6;

/// Bound on the task queue for a normal run.
pub const MAX_QUEUE_SIZE: usize = 1000;

/// Bound on the task queue for a stream run.
pub const STREAM_MAX_QUEUE_SIZE: usize = 2;

/// Bound on in-flight write requests; the main backpressure knob.
pub const MAX_IO_QUEUE_SIZE: usize = 20;

/// Upper bound on the number of parts a single download may be split into.
pub const MAX_PARTS: u64 = 10_000;

/// Upper bound on the chunk size `find_chunksize` will return.
pub const MAX_SINGLE_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Amount read from a part's response body per write request (file destinations).
pub const ITERATE_CHUNK_SIZE: usize = 1024 * 1024;

pub const PART_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const PART_READ_TIMEOUT: Duration = Duration::from_secs(60);

pub const BASIC_TASK_ATTEMPTS: u32 = 3;
pub const PART_TASK_ATTEMPTS: u32 = 5;

pub const CREATE_COMPLETE_WAIT: Duration = Duration::from_secs(1);
pub const STREAM_TURN_WAIT: Duration = Duration::from_millis(200);

/// Settings that are fixed for the lifetime of one invocation, derived once
/// from [`crate::cli::Cli`] and the constants above.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub num_threads: usize,
    pub max_queue_size: usize,
    pub max_io_queue_size: usize,
    pub multi_threshold: u64,
    pub chunksize: u64,
    pub is_stream: bool,
    pub quiet: bool,
    /// Where `is_stream` writes ultimately land: `None` means standard
    /// output; `Some(path)` opens that path as the stream sink.
    pub stream_sink: Option<std::path::PathBuf>,
}

impl RunConfig {
    pub fn for_files() -> Self {
        RunConfig {
            num_threads: NUM_THREADS,
            max_queue_size: MAX_QUEUE_SIZE,
            max_io_queue_size: MAX_IO_QUEUE_SIZE,
            multi_threshold: MULTI_THRESHOLD,
            chunksize: CHUNKSIZE,
            is_stream: false,
            quiet: false,
            stream_sink: None,
        }
    }

    pub fn for_stream(stream_sink: Option<std::path::PathBuf>) -> Self {
        RunConfig {
            num_threads: STREAM_NUM_THREADS,
            max_queue_size: STREAM_MAX_QUEUE_SIZE,
            max_io_queue_size: MAX_IO_QUEUE_SIZE,
            multi_threshold: MULTI_THRESHOLD,
            chunksize: CHUNKSIZE,
            is_stream: true,
            quiet: true,
            stream_sink,
        }
    }
}

/// Picks a chunk size so that `size / chunksize` never exceeds [`MAX_PARTS`],
/// doubling the starting chunk size until it fits, then capping at
/// [`MAX_SINGLE_PART_SIZE`].
pub fn find_chunksize(size: u64, starting_chunksize: u64) -> u64 {
    let mut chunksize = starting_chunksize.max(1);
    let mut num_parts = size.div_ceil(chunksize);
    while num_parts > MAX_PARTS {
        chunksize *= 2;
        num_parts = size.div_ceil(chunksize);
    }
    chunksize.min(MAX_SINGLE_PART_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_file_keeps_default_chunksize() {
        assert_eq!(find_chunksize(20 * 1024 * 1024, CHUNKSIZE), CHUNKSIZE);
    }

    #[test]
    fn doubles_until_under_max_parts() {
        let size = MAX_PARTS * CHUNKSIZE + 1;
        let chunksize = find_chunksize(size, CHUNKSIZE);
        assert!(size.div_ceil(chunksize) <= MAX_PARTS);
        assert_eq!(chunksize, CHUNKSIZE * 2);
    }

    #[test]
    fn caps_at_max_single_part_size() {
        let huge = MAX_SINGLE_PART_SIZE * MAX_PARTS * 4;
        assert_eq!(find_chunksize(huge, CHUNKSIZE), MAX_SINGLE_PART_SIZE);
    }
}
