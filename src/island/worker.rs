//! Worker side of the synchronization protocol.

use std::io::{Read, Write};

use super::config::IslandConfig;
use super::launch::connect_worker;
use super::wire::{read_schedule, write_schedule};
use crate::error::{IslandError, WireError};
use crate::sa::{AnnealLog, CsvLog, NoopLog, SaRunner};

/// What a worker did over its lifetime.
#[derive(Debug, Clone)]
pub struct WorkerSummary {
    pub id: usize,
    /// Rounds whose result reached the coordinator.
    pub rounds: usize,
    /// Best cost reported in each round.
    pub reported_costs: Vec<f64>,
}

/// Runs the worker loop over an already connected channel.
///
/// Receives the seed, then for every round anneals it, reports the best
/// schedule, and (except after the last round) waits for the next seed.
pub fn run_worker<C: Read + Write>(
    id: usize,
    mut channel: C,
    config: &IslandConfig,
) -> Result<WorkerSummary, IslandError> {
    let protocol = |source: WireError| IslandError::Protocol { worker: id, source };

    let mut seed = read_schedule(&mut channel).map_err(protocol)?;
    let mut reported_costs = Vec::with_capacity(config.rounds);

    for round in 0..config.rounds {
        let sa = match config.worker_seed(id, round) {
            Some(s) => config.sa.clone().with_seed(s),
            None => config.sa.clone(),
        };

        let mut log = open_log(config, id, round);
        let result = SaRunner::run_with_log(&seed, &sa, log.as_mut());
        drop(log);

        tracing::debug!(
            worker = id,
            round,
            seed_cost = result.initial_cost,
            best_cost = result.best_cost,
            iterations = result.iterations,
            "local search finished"
        );

        write_schedule(&mut channel, &result.best).map_err(protocol)?;
        reported_costs.push(result.best_cost);

        if round + 1 < config.rounds {
            seed = read_schedule(&mut channel).map_err(protocol)?;
        }
    }

    Ok(WorkerSummary {
        id,
        rounds: reported_costs.len(),
        reported_costs,
    })
}

/// Entry point of a worker process: connects to the rendezvous endpoint
/// and runs [`run_worker`]. The channel is closed on every exit path.
pub fn run_worker_process(id: usize, config: &IslandConfig) -> Result<WorkerSummary, IslandError> {
    let channel = connect_worker(id, config)?;
    tracing::debug!(worker = id, "connected to coordinator");
    run_worker(id, channel, config)
}

/// Per-round CSV log, or a no-op sink when logging is off or the file
/// cannot be created.
fn open_log(config: &IslandConfig, id: usize, round: usize) -> Box<dyn AnnealLog> {
    let Some(path) = config.log_path(id, round) else {
        return Box::new(NoopLog);
    };
    match CsvLog::create(&path) {
        Ok(log) => Box::new(log),
        Err(e) => {
            tracing::warn!(worker = id, path = %path.display(), error = %e, "cannot create annealing log");
            Box::new(NoopLog)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Schedule;
    use std::os::unix::net::UnixStream;
    use std::thread;
    use std::time::Duration;

    fn seed() -> Schedule {
        Schedule::from_parts(
            vec![8, 1, 6, 2, 9, 3, 4],
            vec![vec![0, 2, 4, 6], vec![1, 3, 5]],
        )
        .unwrap()
    }

    fn config(rounds: usize) -> IslandConfig {
        IslandConfig::new(1, 2)
            .with_rounds(rounds)
            .with_io_timeout(Some(Duration::from_secs(10)))
            .with_seed(17)
    }

    #[test]
    fn test_worker_reports_every_round_and_stops() {
        let (mut coordinator, worker_end) = UnixStream::pair().unwrap();
        let cfg = config(3);
        let worker = thread::spawn(move || run_worker(0, worker_end, &cfg));

        write_schedule(&mut coordinator, &seed()).unwrap();
        let mut last = seed().cost();
        for round in 0..3 {
            let report = read_schedule(&mut coordinator).unwrap();
            assert!(report.cost() <= last);
            last = report.cost();
            if round < 2 {
                write_schedule(&mut coordinator, &report).unwrap();
            }
        }

        let summary = worker.join().unwrap().unwrap();
        assert_eq!(summary.rounds, 3);
        assert_eq!(summary.reported_costs.len(), 3);
        // No fourth read: the worker closed its end.
        assert!(matches!(
            read_schedule(&mut coordinator),
            Err(WireError::Closed)
        ));
    }

    #[test]
    fn test_worker_fails_on_garbage_seed() {
        let (mut coordinator, worker_end) = UnixStream::pair().unwrap();
        let cfg = config(2);
        let worker = thread::spawn(move || run_worker(4, worker_end, &cfg));

        coordinator.write_all(&(-5i32).to_ne_bytes()).unwrap();
        match worker.join().unwrap() {
            Err(IslandError::Protocol { worker, source }) => {
                assert_eq!(worker, 4);
                assert!(matches!(source, WireError::NegativeCount { .. }));
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_worker_fails_when_coordinator_disappears() {
        let (mut coordinator, worker_end) = UnixStream::pair().unwrap();
        let cfg = config(2);
        let worker = thread::spawn(move || run_worker(1, worker_end, &cfg));

        write_schedule(&mut coordinator, &seed()).unwrap();
        let _ = read_schedule(&mut coordinator).unwrap();
        drop(coordinator);

        assert!(matches!(
            worker.join().unwrap(),
            Err(IslandError::Protocol {
                worker: 1,
                source: WireError::Closed
            })
        ));
    }

    #[test]
    fn test_worker_writes_csv_logs() {
        let dir = tempfile::tempdir().unwrap();
        let (mut coordinator, worker_end) = UnixStream::pair().unwrap();
        let cfg = config(2).with_log_dir(dir.path());
        let worker = thread::spawn(move || run_worker(2, worker_end, &cfg));

        write_schedule(&mut coordinator, &seed()).unwrap();
        let report = read_schedule(&mut coordinator).unwrap();
        write_schedule(&mut coordinator, &report).unwrap();
        let _ = read_schedule(&mut coordinator).unwrap();
        worker.join().unwrap().unwrap();

        for round in 0..2 {
            let path = dir.path().join(format!("worker-2-round-{round}.csv"));
            let text = std::fs::read_to_string(&path).unwrap();
            let mut lines = text.lines();
            assert_eq!(lines.next(), Some("Iteration,Temperature,CurrentCost,BestCost"));
            assert!(lines.next().is_some());
        }
    }
}
