//! Error taxonomy.
//!
//! Configuration problems are caught before any worker starts. Everything
//! that breaks the coordination protocol is an [`IslandError`] carrying the
//! index of the worker whose channel failed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid command-line arguments, job files or numeric settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid cooling variant {0:?}, expected one of B, L, C")]
    InvalidCooling(String),

    #[error("cannot read job file {path}: {source}")]
    JobFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("job file line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("job file contains no jobs")]
    EmptyJobSet,

    #[error("{0}")]
    Invalid(String),
}

/// A schedule whose assignment is not a partition of its job ids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("a schedule needs at least one processor")]
    NoProcessors,

    #[error("job {job} has non-positive duration {duration}")]
    InvalidDuration { job: usize, duration: i64 },

    #[error("job id {job} out of range for {job_count} jobs")]
    JobOutOfRange { job: usize, job_count: usize },

    #[error("job {0} is assigned more than once")]
    DuplicateJob(usize),

    #[error("{missing} of {job_count} jobs are unassigned")]
    MissingJobs { missing: usize, job_count: usize },
}

/// Failures while encoding or decoding a schedule frame.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("channel closed in the middle of a message")]
    Closed,

    #[error("channel timed out")]
    TimedOut,

    #[error("negative {field} {value} in frame")]
    NegativeCount { field: &'static str, value: i32 },

    #[error("{field} {value} exceeds the frame limit of {limit}")]
    TooLarge {
        field: &'static str,
        value: usize,
        limit: usize,
    },

    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),

    #[error("schedule belongs to a different job set")]
    ForeignJobSet,

    #[error("invalid schedule: {0}")]
    Invalid(#[from] ScheduleError),

    #[error("channel I/O: {0}")]
    Io(io::Error),
}

impl From<io::Error> for WireError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => WireError::Closed,
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => WireError::TimedOut,
            _ => WireError::Io(e),
        }
    }
}

/// Fatal errors of an island run.
#[derive(Debug, Error)]
pub enum IslandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to launch worker {worker}: {reason}")]
    Spawn { worker: usize, reason: String },

    #[error("protocol failure on worker {worker}: {source}")]
    Protocol {
        worker: usize,
        #[source]
        source: WireError,
    },

    #[error("every worker has failed")]
    NoWorkersLeft,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
