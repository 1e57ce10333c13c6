//! Job set loading and generation.
//!
//! Job files are plain CSV: two header lines, then one `jobId,duration`
//! row per job. The row position, not the `jobId` field, becomes the id.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use rand::Rng;

use super::types::Job;
use crate::error::ConfigError;

/// Header lines skipped by the loader.
pub const HEADER_LINES: usize = 2;

/// An ordered, immutable list of jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSet {
    jobs: Vec<Job>,
}

impl JobSet {
    /// Builds a job set from durations; ids follow the slice order.
    pub fn from_durations(durations: &[u32]) -> Result<Self, ConfigError> {
        if durations.is_empty() {
            return Err(ConfigError::EmptyJobSet);
        }
        if let Some(id) = durations.iter().position(|&d| d == 0) {
            return Err(ConfigError::Invalid(format!("job {id} has zero duration")));
        }
        if let Some(id) = durations.iter().position(|&d| d > i32::MAX as u32) {
            return Err(ConfigError::Invalid(format!(
                "job {id} has a duration above {}",
                i32::MAX
            )));
        }
        let jobs = durations
            .iter()
            .enumerate()
            .map(|(id, &duration)| Job { id, duration })
            .collect();
        Ok(Self { jobs })
    }

    /// Reads a job file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::JobFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(BufReader::new(file)).map_err(|e| match e {
            ConfigError::JobFile { source, .. } => ConfigError::JobFile {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses job rows from any buffered reader.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, ConfigError> {
        let mut durations = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ConfigError::JobFile {
                path: PathBuf::from("<input>"),
                source,
            })?;
            if index < HEADER_LINES {
                continue;
            }
            let row = line.trim();
            if row.is_empty() {
                continue;
            }
            durations.push(parse_row(row, index + 1)?);
        }
        Self::from_durations(&durations)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Durations indexed by job id, the form a [`Schedule`](super::Schedule) stores.
    pub fn durations(&self) -> Vec<u32> {
        self.jobs.iter().map(|j| j.duration).collect()
    }

    /// Sum of all durations.
    pub fn total_duration(&self) -> u64 {
        self.jobs.iter().map(|j| u64::from(j.duration)).sum()
    }
}

fn parse_row(row: &str, line: usize) -> Result<u32, ConfigError> {
    let (_, duration) = row.split_once(',').ok_or_else(|| ConfigError::MalformedRow {
        line,
        reason: format!("expected `jobId,duration`, got {row:?}"),
    })?;
    let duration = duration.trim();
    match duration.parse::<u32>() {
        Ok(0) => Err(ConfigError::MalformedRow {
            line,
            reason: "duration must be positive".into(),
        }),
        Ok(d) if d > i32::MAX as u32 => Err(ConfigError::MalformedRow {
            line,
            reason: format!("duration {d} does not fit the wire format"),
        }),
        Ok(d) => Ok(d),
        Err(e) => Err(ConfigError::MalformedRow {
            line,
            reason: format!("bad duration {duration:?}: {e}"),
        }),
    }
}

/// Draws `count` durations uniformly from `min..=max`.
pub fn generate_durations<R: Rng>(
    count: usize,
    min: u32,
    max: u32,
    rng: &mut R,
) -> Result<Vec<u32>, ConfigError> {
    if min == 0 || min > max || max > i32::MAX as u32 {
        return Err(ConfigError::Invalid(format!(
            "duration range must satisfy 0 < min <= max <= {}, got {min}..={max}",
            i32::MAX
        )));
    }
    Ok((0..count).map(|_| rng.random_range(min..=max)).collect())
}

/// Writes a job file that [`JobSet::load`] reads back unchanged.
pub fn write_job_file<W: Write>(out: &mut W, durations: &[u32]) -> io::Result<()> {
    writeln!(out, "# {} jobs", durations.len())?;
    writeln!(out, "JobID,Duration")?;
    for (id, duration) in durations.iter().enumerate() {
        writeln!(out, "{id},{duration}")?;
    }
    out.flush()
}
