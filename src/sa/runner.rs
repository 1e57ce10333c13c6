//! SA execution loop.
//!
//! # Algorithm
//!
//! 1. `current = best = seed`, `T = T_0`
//! 2. Clone `current`, apply one random swap, compute `delta`
//! 3. Accept if `delta <= 0`, otherwise by the configured [`Acceptance`]
//! 4. A strictly better `current` becomes `best` and resets the stagnation
//!    counter; anything else increments it
//! 5. Log, cool, repeat until the counter reaches `max_no_improve`

use rand::Rng;
use u_numflow::random::create_rng;

use super::config::{Acceptance, SaConfig};
use super::log::{AnnealLog, LogRecord, NoopLog};
use crate::schedule::{swap_random_jobs, Schedule};

/// Result of one annealing run.
#[derive(Debug, Clone)]
pub struct SaResult {
    /// The best schedule found.
    pub best: Schedule,

    /// Cost of the best schedule.
    pub best_cost: f64,

    /// Cost of the seed schedule.
    pub initial_cost: f64,

    /// Number of iterations (candidate evaluations).
    pub iterations: usize,

    /// Temperature when the run stopped.
    pub final_temperature: f64,

    /// Number of accepted candidates (including improvements).
    pub accepted_moves: usize,

    /// Number of candidates strictly better than `current`.
    pub improving_moves: usize,
}

/// Executes local simulated annealing on a [`Schedule`].
pub struct SaRunner;

impl SaRunner {
    /// Runs SA from `seed` without logging.
    pub fn run(seed: &Schedule, config: &SaConfig) -> SaResult {
        Self::run_with_log(seed, config, &mut NoopLog)
    }

    /// Runs SA from `seed`, sending one [`LogRecord`] per iteration to `log`.
    ///
    /// A log that returns an error is reported once and skipped for the
    /// rest of the run. `log.finish()` is called before returning.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`SaConfig::validate`].
    pub fn run_with_log<L: AnnealLog + ?Sized>(
        seed: &Schedule,
        config: &SaConfig,
        log: &mut L,
    ) -> SaResult {
        config.validate().expect("invalid SaConfig");

        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };
        anneal(seed, config, log, &mut rng)
    }
}

fn anneal<L: AnnealLog + ?Sized, R: Rng>(
    seed: &Schedule,
    config: &SaConfig,
    log: &mut L,
    rng: &mut R,
) -> SaResult {
    let mut current = seed.clone();
    let mut current_cost = current.cost();
    let initial_cost = current_cost;
    let mut best = current.clone();
    let mut best_cost = current_cost;

    let mut temperature = config.initial_temperature;
    let mut iteration = 0usize;
    let mut no_improve = 0usize;
    let mut accepted_moves = 0usize;
    let mut improving_moves = 0usize;
    let mut log_ok = true;

    while no_improve < config.max_no_improve {
        if config.max_iterations > 0 && iteration >= config.max_iterations {
            break;
        }

        let mut candidate = current.clone();
        swap_random_jobs(&mut candidate, rng);
        let candidate_cost = candidate.cost();
        let delta = candidate_cost - current_cost;

        if delta < 0.0 {
            improving_moves += 1;
        }
        let accept = delta <= 0.0
            || match config.acceptance {
                Acceptance::Metropolis => rng.random::<f64>() < (-delta / temperature).exp(),
                Acceptance::AlwaysAccept => true,
            };

        if accept {
            current = candidate;
            current_cost = candidate_cost;
            accepted_moves += 1;

            if current_cost < best_cost {
                best = current.clone();
                best_cost = current_cost;
                no_improve = 0;
            } else {
                no_improve += 1;
            }
        } else {
            no_improve += 1;
        }

        if log_ok {
            let record = LogRecord {
                iteration,
                temperature,
                current_cost,
                best_cost,
            };
            if let Err(e) = log.record(&record) {
                tracing::warn!(error = %e, iteration, "annealing log write failed, disabling log");
                log_ok = false;
            }
        }

        temperature = config.cooling.next(temperature, iteration);
        iteration += 1;
    }

    if log_ok {
        if let Err(e) = log.finish() {
            tracing::warn!(error = %e, "annealing log flush failed");
        }
    }

    tracing::debug!(
        iterations = iteration,
        initial_cost,
        best_cost,
        accepted_moves,
        "annealing run finished"
    );

    SaResult {
        best,
        best_cost,
        initial_cost,
        iterations: iteration,
        final_temperature: temperature,
        accepted_moves,
        improving_moves,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sa::log::MemoryLog;
    use crate::sa::CoolingSchedule;
    use std::io;

    #[test]
    fn test_unit_jobs_reach_optimum() {
        // Swaps keep processor sizes, and a round-robin start puts two unit
        // jobs on each processor: 1 + 2 per processor, 6 in total.
        for s in 0..20u64 {
            let mut rng = create_rng(s);
            let seed = Schedule::random(vec![1, 1, 1, 1], 2, &mut rng).unwrap();
            let config = SaConfig::default().with_seed(s);
            let result = SaRunner::run(&seed, &config);
            assert!((result.best_cost - 6.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_mixed_durations_stay_within_bounds() {
        let durations = vec![9, 1, 5, 2, 7, 3];
        let seed = Schedule::from_parts(durations, vec![vec![0, 4, 2], vec![5, 1, 3]]).unwrap();
        let config = SaConfig::default()
            .with_cooling(CoolingSchedule::linear())
            .with_max_no_improve(500)
            .with_seed(42);
        let result = SaRunner::run(&seed, &config);
        // Optimum for a 3 + 3 split: [1, 3, 7] / [2, 5, 9] -> 16 + 25 = 41.
        assert!(result.best_cost < seed.cost());
        assert!(result.best_cost >= 41.0);
    }

    #[test]
    fn test_best_never_worse_than_seed() {
        let mut rng = create_rng(5);
        let durations: Vec<u32> = (0..30).map(|_| rng.random_range(1..20)).collect();
        let seed = Schedule::random(durations, 4, &mut rng).unwrap();
        for cooling in [
            CoolingSchedule::Boltzmann,
            CoolingSchedule::Cauchy,
            CoolingSchedule::linear(),
        ] {
            for acceptance in [Acceptance::Metropolis, Acceptance::AlwaysAccept] {
                let config = SaConfig::default()
                    .with_cooling(cooling)
                    .with_acceptance(acceptance)
                    .with_seed(9);
                let result = SaRunner::run(&seed, &config);
                assert!(result.best_cost <= result.initial_cost);
                assert!((result.best.cost() - result.best_cost).abs() < 1e-10);
                assert!((result.initial_cost - seed.cost()).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_terminates_on_stagnation() {
        // One processor: every mutation is a no-op, so no iteration can improve.
        let seed = Schedule::from_parts(vec![3, 1], vec![vec![0, 1]]).unwrap();
        let config = SaConfig::default().with_max_no_improve(25).with_seed(1);
        let result = SaRunner::run(&seed, &config);
        assert_eq!(result.iterations, 25);
        assert_eq!(result.improving_moves, 0);
        assert_eq!(result.best, seed);
    }

    #[test]
    #[should_panic(expected = "invalid SaConfig")]
    fn test_invalid_config_panics() {
        let seed = Schedule::from_parts(vec![2, 1], vec![vec![0], vec![1]]).unwrap();
        let config = SaConfig::default().with_initial_temperature(-1.0);
        SaRunner::run(&seed, &config);
    }

    #[test]
    fn test_max_iterations_limit() {
        let mut rng = create_rng(8);
        let durations: Vec<u32> = (0..50).map(|_| rng.random_range(1..100)).collect();
        let seed = Schedule::random(durations, 5, &mut rng).unwrap();
        let config = SaConfig::default()
            .with_max_no_improve(1_000_000)
            .with_max_iterations(40)
            .with_seed(3);
        let result = SaRunner::run(&seed, &config);
        assert!(result.iterations <= 40);
    }

    #[test]
    fn test_always_accept_takes_every_candidate() {
        let mut rng = create_rng(4);
        let durations: Vec<u32> = (0..12).map(|_| rng.random_range(1..50)).collect();
        let seed = Schedule::random(durations, 3, &mut rng).unwrap();
        let config = SaConfig::default()
            .with_acceptance(Acceptance::AlwaysAccept)
            .with_seed(4);
        let result = SaRunner::run(&seed, &config);
        assert_eq!(result.accepted_moves, result.iterations);
    }

    #[test]
    fn test_log_gets_one_record_per_iteration() {
        let mut rng = create_rng(6);
        let durations: Vec<u32> = (0..10).map(|_| rng.random_range(1..10)).collect();
        let seed = Schedule::random(durations, 2, &mut rng).unwrap();
        let config = SaConfig::default().with_seed(6);
        let mut log = MemoryLog::default();
        let result = SaRunner::run_with_log(&seed, &config, &mut log);

        assert_eq!(log.records.len(), result.iterations);
        assert!((log.records[0].temperature - 100.0).abs() < 1e-10);
        for (i, pair) in log.records.windows(2).enumerate() {
            assert_eq!(pair[0].iteration, i);
            assert!(pair[1].best_cost <= pair[0].best_cost);
        }
        let last = log.records.last().unwrap();
        assert!((last.best_cost - result.best_cost).abs() < 1e-10);
    }

    struct FailingLog {
        attempts: usize,
    }

    impl AnnealLog for FailingLog {
        fn record(&mut self, _record: &LogRecord) -> io::Result<()> {
            self.attempts += 1;
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_failing_log_does_not_change_run() {
        let mut rng = create_rng(12);
        let durations: Vec<u32> = (0..15).map(|_| rng.random_range(1..30)).collect();
        let seed = Schedule::random(durations, 3, &mut rng).unwrap();
        let config = SaConfig::default().with_seed(12);

        let quiet = SaRunner::run(&seed, &config);
        let mut failing = FailingLog { attempts: 0 };
        let logged = SaRunner::run_with_log(&seed, &config, &mut failing);

        assert_eq!(failing.attempts, 1);
        assert_eq!(quiet.iterations, logged.iterations);
        assert_eq!(quiet.best, logged.best);
    }
}
