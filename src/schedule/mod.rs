//! Scheduling model: jobs, schedules and the swap mutation.
//!
//! A [`Schedule`] assigns `N` jobs to `M` identical processors. Its cost is
//! the total completion time, the sum over all jobs of the moment the job
//! finishes on its processor. Shorter jobs early lower the cost, so the
//! optimum per processor is shortest-processing-time order; the hard part
//! is the split across processors, which the annealer explores with
//! [`swap_random_jobs`].

mod jobs;
mod mutation;
mod types;

pub use jobs::{generate_durations, write_job_file, JobSet, HEADER_LINES};
pub use mutation::swap_random_jobs;
pub use types::{Job, Schedule};
