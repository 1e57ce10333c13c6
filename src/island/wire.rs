//! Binary schedule frames exchanged between coordinator and workers.
//!
//! # Wire format
//!
//! ```text
//! i32 M                      processor count
//! i32 N                      job count
//! i32[N] durations           indexed by job id
//! M times:
//!   i32 count
//!   i32[count] job ids       processing order
//! ```
//!
//! Integers use the host's native byte order. Both ends run on the same
//! machine, so the frame is not portable across architectures.

use std::io::{Read, Write};

use crate::error::{ScheduleError, WireError};
use crate::schedule::Schedule;

/// Upper bound on `M`, `N` and per-processor counts accepted from the wire.
pub const MAX_WIRE_COUNT: usize = 1 << 24;

const WORD: usize = std::mem::size_of::<i32>();

/// Largest preallocation made from a count read off the wire. Larger frames
/// grow as their payload actually arrives.
const PREALLOC_LIMIT: usize = 4096;

/// Encodes a schedule into one frame.
pub fn encode_schedule(schedule: &Schedule) -> Result<Vec<u8>, WireError> {
    let m = schedule.processor_count();
    let n = schedule.job_count();
    let mut buf = Vec::with_capacity(WORD * (2 + 2 * n + m));

    put(&mut buf, "processor count", m)?;
    put(&mut buf, "job count", n)?;
    for &duration in schedule.durations() {
        put(&mut buf, "duration", duration as usize)?;
    }
    for jobs in schedule.processors() {
        put(&mut buf, "processor length", jobs.len())?;
        for &job in jobs {
            put(&mut buf, "job id", job)?;
        }
    }
    Ok(buf)
}

/// Decodes exactly one frame occupying all of `bytes`.
pub fn decode_schedule(bytes: &[u8]) -> Result<Schedule, WireError> {
    let mut cursor = bytes;
    let schedule = read_schedule(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(WireError::TrailingBytes(cursor.len()));
    }
    Ok(schedule)
}

/// Writes one frame and flushes the writer.
pub fn write_schedule<W: Write + ?Sized>(out: &mut W, schedule: &Schedule) -> Result<(), WireError> {
    let frame = encode_schedule(schedule)?;
    out.write_all(&frame)?;
    out.flush()?;
    Ok(())
}

/// Reads one frame, blocking until it is complete.
///
/// Short reads are accumulated by `read_exact`; end of stream inside the
/// frame is [`WireError::Closed`].
pub fn read_schedule<R: Read + ?Sized>(input: &mut R) -> Result<Schedule, WireError> {
    let m = take_count(input, "processor count")?;
    let n = take_count(input, "job count")?;

    let mut durations = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for job in 0..n {
        let value = take_i32(input)?;
        if value <= 0 {
            return Err(ScheduleError::InvalidDuration {
                job,
                duration: i64::from(value),
            }
            .into());
        }
        durations.push(value as u32);
    }

    let mut processors = Vec::with_capacity(m.min(PREALLOC_LIMIT));
    let mut assigned = 0usize;
    for _ in 0..m {
        let count = take_count(input, "processor length")?;
        assigned += count;
        if assigned > n {
            return Err(WireError::TooLarge {
                field: "assigned jobs",
                value: assigned,
                limit: n,
            });
        }
        let mut jobs = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            let job = take_i32(input)?;
            if job < 0 {
                return Err(WireError::NegativeCount {
                    field: "job id",
                    value: job,
                });
            }
            jobs.push(job as usize);
        }
        processors.push(jobs);
    }

    Ok(Schedule::from_parts(durations, processors)?)
}

fn put(buf: &mut Vec<u8>, field: &'static str, value: usize) -> Result<(), WireError> {
    let value = i32::try_from(value).map_err(|_| WireError::TooLarge {
        field,
        value,
        limit: i32::MAX as usize,
    })?;
    buf.extend_from_slice(&value.to_ne_bytes());
    Ok(())
}

fn take_i32<R: Read + ?Sized>(input: &mut R) -> Result<i32, WireError> {
    let mut word = [0u8; WORD];
    input.read_exact(&mut word)?;
    Ok(i32::from_ne_bytes(word))
}

fn take_count<R: Read + ?Sized>(input: &mut R, field: &'static str) -> Result<usize, WireError> {
    let value = take_i32(input)?;
    if value < 0 {
        return Err(WireError::NegativeCount { field, value });
    }
    let value = value as usize;
    if value > MAX_WIRE_COUNT {
        return Err(WireError::TooLarge {
            field,
            value,
            limit: MAX_WIRE_COUNT,
        });
    }
    Ok(value)
}
