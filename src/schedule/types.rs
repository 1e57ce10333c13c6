//! Schedule representation and the total-completion-time cost model.

use std::fmt;

use rand::Rng;

use crate::error::ScheduleError;

/// A job with a fixed processing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Job {
    /// Position of the job in its job set.
    pub id: usize,
    /// Processing time, always positive.
    pub duration: u32,
}

/// An assignment of every job to exactly one of `M` identical processors,
/// with a processing order per processor.
///
/// The concatenation of all processor lists is always a permutation of
/// `0..job_count()`. Cost is recomputed from the assignment on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    durations: Vec<u32>,
    processors: Vec<Vec<usize>>,
}

impl Schedule {
    /// Builds a schedule from raw parts, checking the job partition.
    pub fn from_parts(
        durations: Vec<u32>,
        processors: Vec<Vec<usize>>,
    ) -> Result<Self, ScheduleError> {
        if processors.is_empty() {
            return Err(ScheduleError::NoProcessors);
        }
        if let Some(job) = durations.iter().position(|&d| d == 0) {
            return Err(ScheduleError::InvalidDuration { job, duration: 0 });
        }

        let job_count = durations.len();
        let mut seen = vec![false; job_count];
        let mut assigned = 0usize;
        for &job in processors.iter().flatten() {
            if job >= job_count {
                return Err(ScheduleError::JobOutOfRange { job, job_count });
            }
            if seen[job] {
                return Err(ScheduleError::DuplicateJob(job));
            }
            seen[job] = true;
            assigned += 1;
        }
        if assigned != job_count {
            return Err(ScheduleError::MissingJobs {
                missing: job_count - assigned,
                job_count,
            });
        }

        Ok(Self {
            durations,
            processors,
        })
    }

    /// Shuffles the job ids and deals them round-robin over
    /// `processor_count` processors.
    pub fn random<R: Rng>(
        durations: Vec<u32>,
        processor_count: usize,
        rng: &mut R,
    ) -> Result<Self, ScheduleError> {
        if processor_count == 0 {
            return Err(ScheduleError::NoProcessors);
        }
        let mut order: Vec<usize> = (0..durations.len()).collect();
        u_numflow::random::shuffle(&mut order, rng);

        let mut processors = vec![Vec::new(); processor_count];
        for (slot, job) in order.into_iter().enumerate() {
            processors[slot % processor_count].push(job);
        }
        Self::from_parts(durations, processors)
    }

    /// Number of processors `M`.
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Number of jobs `N`.
    pub fn job_count(&self) -> usize {
        self.durations.len()
    }

    /// Job durations indexed by job id.
    pub fn durations(&self) -> &[u32] {
        &self.durations
    }

    /// Per-processor job ids in processing order.
    pub fn processors(&self) -> &[Vec<usize>] {
        &self.processors
    }

    /// Total completion time: for every processor, the sum of the finish
    /// times of its jobs; summed over processors. Empty processors add 0.
    pub fn cost(&self) -> f64 {
        // Per-processor clocks fit u64; their sum over N jobs may not.
        let mut total = 0u128;
        for jobs in &self.processors {
            let mut clock = 0u64;
            for &job in jobs {
                clock += u64::from(self.durations[job]);
                total += u128::from(clock);
            }
        }
        total as f64
    }

    /// Finish time of each job on `processor`, in processing order.
    pub fn completion_times(&self, processor: usize) -> Vec<u64> {
        let mut clock = 0u64;
        self.processors[processor]
            .iter()
            .map(|&job| {
                clock += u64::from(self.durations[job]);
                clock
            })
            .collect()
    }

    /// Latest processor finish time. Reported only; never optimized.
    pub fn makespan(&self) -> u64 {
        self.processors
            .iter()
            .map(|jobs| jobs.iter().map(|&j| u64::from(self.durations[j])).sum())
            .max()
            .unwrap_or(0)
    }

    /// Exchanges the job at `index_a` on `proc_a` with the job at `index_b`
    /// on `proc_b`.
    ///
    /// Returns `false` without touching the schedule when either processor
    /// is empty, an index is out of range, or the same processor was named
    /// twice while a second processor exists.
    pub fn swap_jobs(
        &mut self,
        proc_a: usize,
        index_a: usize,
        proc_b: usize,
        index_b: usize,
    ) -> bool {
        let m = self.processors.len();
        if proc_a >= m || proc_b >= m {
            return false;
        }
        if proc_a == proc_b && m >= 2 {
            return false;
        }
        if index_a >= self.processors[proc_a].len() || index_b >= self.processors[proc_b].len() {
            return false;
        }

        if proc_a == proc_b {
            self.processors[proc_a].swap(index_a, index_b);
        } else {
            let job_a = self.processors[proc_a][index_a];
            self.processors[proc_a][index_a] = self.processors[proc_b][index_b];
            self.processors[proc_b][index_b] = job_a;
        }
        true
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (p, jobs) in self.processors.iter().enumerate() {
            write!(f, "Processor {p}:")?;
            for (job, finish) in jobs.iter().zip(self.completion_times(p)) {
                write!(f, " (job={job} time={finish})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
