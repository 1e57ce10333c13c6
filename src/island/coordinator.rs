//! Coordinator side of the synchronization protocol.
//!
//! # Algorithm
//!
//! 1. Build one random initial schedule and launch `W` workers
//! 2. Send the initial schedule to every worker
//! 3. For each of `R` rounds:
//!    a. Receive one schedule from every worker (full barrier)
//!    b. Keep the cheapest as the global best
//!    c. Broadcast the global best, except after the last round
//! 4. Close every channel, reap every worker, release the rendezvous

use u_numflow::random::create_rng;

use super::config::IslandConfig;
use super::launch::{Launcher, WorkerLink};
use crate::error::{ConfigError, IslandError, WireError};
use crate::schedule::{JobSet, Schedule};

/// Outcome of one synchronization round.
#[derive(Debug, Clone)]
pub struct RoundSummary {
    /// Zero-based round index.
    pub round: usize,
    /// `(worker id, reported cost)` for every worker that reported.
    pub reports: Vec<(usize, f64)>,
    /// Worker whose report was cheapest this round.
    pub best_worker: usize,
    /// Global best cost after this round.
    pub best_cost: f64,
    /// Workers dropped during this round.
    pub excluded: Vec<usize>,
}

/// Result of a complete island run.
#[derive(Debug, Clone)]
pub struct IslandResult {
    /// The best schedule found.
    pub best: Schedule,
    /// Cost of the best schedule.
    pub best_cost: f64,
    /// Cost of the shared initial schedule.
    pub initial_cost: f64,
    /// One entry per completed round.
    pub rounds: Vec<RoundSummary>,
    /// Workers still participating after the last round.
    pub surviving_workers: usize,
}

/// Drives workers through synchronization rounds.
pub struct Coordinator {
    config: IslandConfig,
}

impl Coordinator {
    /// Creates a coordinator after validating `config`.
    pub fn new(config: IslandConfig) -> Result<Self, IslandError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IslandConfig {
        &self.config
    }

    /// Runs all rounds on `jobs` with workers started by `launcher`.
    ///
    /// On success every worker has been closed and reaped. On failure every
    /// launched worker is aborted before the error is returned. The launcher
    /// is dropped last, which releases any rendezvous endpoint it owns.
    pub fn run<L: Launcher>(
        &self,
        jobs: &JobSet,
        mut launcher: L,
    ) -> Result<IslandResult, IslandError> {
        let mut rng = match self.config.coordinator_seed() {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };
        let initial = Schedule::random(jobs.durations(), self.config.processors, &mut rng)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        tracing::info!(
            workers = self.config.workers,
            processors = self.config.processors,
            jobs = jobs.len(),
            rounds = self.config.rounds,
            initial_cost = initial.cost(),
            "starting island run"
        );

        let mut links = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            match launcher.launch(id) {
                Ok(link) => links.push(link),
                Err(e) => {
                    abort_all(links);
                    return Err(e);
                }
            }
        }

        let outcome = self.synchronize(&initial, &mut links);
        match &outcome {
            Ok(_) => links.into_iter().for_each(WorkerLink::close),
            Err(_) => abort_all(links),
        }
        drop(launcher);
        outcome
    }

    fn synchronize(
        &self,
        initial: &Schedule,
        links: &mut Vec<WorkerLink>,
    ) -> Result<IslandResult, IslandError> {
        let mut excluded = Vec::new();
        self.broadcast(initial, links, &mut excluded)?;

        let initial_cost = initial.cost();
        let mut global_best = initial.clone();
        let mut global_cost = initial_cost;
        let mut rounds = Vec::with_capacity(self.config.rounds);

        for round in 0..self.config.rounds {
            let mut reports = Vec::with_capacity(links.len());
            let mut index = 0;
            while index < links.len() {
                match receive_report(&mut links[index], initial) {
                    Ok(schedule) => {
                        let cost = schedule.cost();
                        tracing::debug!(worker = links[index].id(), round, cost, "report received");
                        reports.push((links[index].id(), schedule, cost));
                        index += 1;
                    }
                    Err(e) => self.exclude(links, index, e, &mut excluded)?,
                }
            }

            let (best_worker, round_best, round_cost) = reports
                .iter()
                .min_by(|a, b| a.2.total_cmp(&b.2))
                .map(|(id, s, c)| (*id, s, *c))
                .ok_or(IslandError::NoWorkersLeft)?;
            if round_cost <= global_cost {
                global_best = round_best.clone();
                global_cost = round_cost;
            }

            tracing::info!(
                round,
                best_cost = global_cost,
                best_worker,
                reports = reports.len(),
                "synchronization round complete"
            );

            rounds.push(RoundSummary {
                round,
                reports: reports.iter().map(|(id, _, c)| (*id, *c)).collect(),
                best_worker,
                best_cost: global_cost,
                excluded: std::mem::take(&mut excluded),
            });

            if round + 1 < self.config.rounds {
                self.broadcast(&global_best, links, &mut excluded)?;
            }
        }

        Ok(IslandResult {
            best: global_best,
            best_cost: global_cost,
            initial_cost,
            rounds,
            surviving_workers: links.len(),
        })
    }

    fn broadcast(
        &self,
        schedule: &Schedule,
        links: &mut Vec<WorkerLink>,
        excluded: &mut Vec<usize>,
    ) -> Result<(), IslandError> {
        let mut index = 0;
        while index < links.len() {
            match links[index].send(schedule) {
                Ok(()) => index += 1,
                Err(e) => self.exclude(links, index, e, excluded)?,
            }
        }
        Ok(())
    }

    /// Drops a failed worker, or fails the run when failures are not
    /// tolerated.
    fn exclude(
        &self,
        links: &mut Vec<WorkerLink>,
        index: usize,
        error: IslandError,
        excluded: &mut Vec<usize>,
    ) -> Result<(), IslandError> {
        if !self.config.tolerate_worker_failures {
            return Err(error);
        }
        let link = links.remove(index);
        tracing::warn!(worker = link.id(), error = %error, "excluding failed worker");
        excluded.push(link.id());
        link.abort();
        if links.is_empty() {
            return Err(IslandError::NoWorkersLeft);
        }
        Ok(())
    }
}

/// Receives a report and checks it is a schedule of the same job set.
fn receive_report(link: &mut WorkerLink, initial: &Schedule) -> Result<Schedule, IslandError> {
    let schedule = link.receive()?;
    if schedule.durations() != initial.durations()
        || schedule.processor_count() != initial.processor_count()
    {
        return Err(IslandError::Protocol {
            worker: link.id(),
            source: WireError::ForeignJobSet,
        });
    }
    Ok(schedule)
}

fn abort_all(links: Vec<WorkerLink>) {
    for link in links {
        link.abort();
    }
}
