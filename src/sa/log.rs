//! Per-run iteration logs.
//!
//! A sink is handed to each annealer run and only observes it. Sinks that
//! fail are reported by the runner and then ignored.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One annealer iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub iteration: usize,
    pub temperature: f64,
    pub current_cost: f64,
    pub best_cost: f64,
}

/// Destination for [`LogRecord`]s of a single run.
pub trait AnnealLog {
    /// Appends one record.
    fn record(&mut self, record: &LogRecord) -> io::Result<()>;

    /// Flushes buffered output. Called once when the run ends.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLog;

impl AnnealLog for NoopLog {
    fn record(&mut self, _record: &LogRecord) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    pub records: Vec<LogRecord>,
}

impl AnnealLog for MemoryLog {
    fn record(&mut self, record: &LogRecord) -> io::Result<()> {
        self.records.push(*record);
        Ok(())
    }
}

/// CSV sink with the header `Iteration,Temperature,CurrentCost,BestCost`.
///
/// Output is buffered and flushed by [`AnnealLog::finish`] or on drop.
pub struct CsvLog<W: Write> {
    out: BufWriter<W>,
}

impl CsvLog<File> {
    /// Creates (truncating) a CSV log file.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> CsvLog<W> {
    /// Wraps a writer and emits the header line.
    pub fn new(writer: W) -> io::Result<Self> {
        let mut out = BufWriter::new(writer);
        writeln!(out, "Iteration,Temperature,CurrentCost,BestCost")?;
        Ok(Self { out })
    }

    /// Flushes and returns the inner writer.
    pub fn into_inner(self) -> io::Result<W> {
        self.out.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> AnnealLog for CsvLog<W> {
    fn record(&mut self, r: &LogRecord) -> io::Result<()> {
        writeln!(
            self.out,
            "{},{},{},{}",
            r.iteration, r.temperature, r.current_cost, r.best_cost
        )
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
