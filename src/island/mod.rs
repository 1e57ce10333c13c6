//! Island-model coordination over worker processes.
//!
//! The coordinator owns one private Unix-domain channel per worker. Workers
//! anneal independently and only exchange schedules with the coordinator at
//! round boundaries, so every round is a full barrier: round `r + 1` seeds
//! are sent only after all round `r` reports have arrived.
//!
//! Schedules travel as fixed binary frames (see [`wire`]).

mod config;
mod coordinator;
mod launch;
pub mod wire;
mod worker;

pub use config::{IslandConfig, DEFAULT_SOCKET_PATH};
pub use coordinator::{Coordinator, IslandResult, RoundSummary};
pub use launch::{
    configure_channel, connect_worker, Launcher, ProcessLauncher, Rendezvous, ThreadLauncher,
    WorkerHandle, WorkerLink, WORKER_FLAG,
};
pub use worker::{run_worker, run_worker_process, WorkerSummary};
