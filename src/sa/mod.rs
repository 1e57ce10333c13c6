//! Simulated Annealing (SA) over [`Schedule`](crate::schedule::Schedule)s.
//!
//! Each run starts from a seed schedule, perturbs it with random
//! cross-processor swaps, and accepts worsening moves with a probability
//! that shrinks as the temperature cools. A run ends after a fixed number
//! of consecutive iterations without a new best.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Metropolis et al. (1953), "Equation of State Calculations by Fast
//!   Computing Machines"

mod config;
mod log;
mod runner;

pub use config::{Acceptance, CoolingSchedule, SaConfig};
pub use log::{AnnealLog, CsvLog, LogRecord, MemoryLog, NoopLog};
pub use runner::{SaResult, SaRunner};
