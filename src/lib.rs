//! Island-model simulated annealing for parallel-machine scheduling.
//!
//! Assigns independent jobs to identical processors so that the **total
//! completion time** (the sum of every job's finish time) is small:
//!
//! - **Schedule model**: job sets, schedules, the cost function and the
//!   swap mutation ([`schedule`]).
//! - **Simulated Annealing (SA)**: a local search from a seed schedule with
//!   Boltzmann, Cauchy or linear cooling ([`sa`]).
//! - **Island coordination**: a coordinator process and `W` worker
//!   processes that anneal independently and synchronize on the global
//!   best after every round ([`island`]).
//!
//! # Example
//!
//! ```
//! use island_anneal::sa::{SaConfig, SaRunner};
//! use island_anneal::schedule::Schedule;
//!
//! let seed = Schedule::from_parts(vec![5, 3, 2], vec![vec![0, 1], vec![2]]).unwrap();
//! assert_eq!(seed.cost(), 15.0);
//!
//! let result = SaRunner::run(&seed, &SaConfig::default().with_seed(1));
//! assert!(result.best_cost <= 15.0);
//! ```

pub mod error;
pub mod island;
pub mod sa;
pub mod schedule;

pub use error::{ConfigError, IslandError, ScheduleError, WireError};
