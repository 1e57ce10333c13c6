use std::ffi::OsString;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use island_anneal::island::{
    run_worker_process, Coordinator, IslandConfig, ProcessLauncher, DEFAULT_SOCKET_PATH,
};
use island_anneal::sa::{Acceptance, CoolingSchedule, SaConfig};
use island_anneal::schedule::JobSet;

#[derive(Parser)]
#[command(
    name = "island-anneal",
    about = "Island-model simulated annealing for total completion time on parallel processors",
    version
)]
struct Cli {
    /// Number of worker processes
    workers: usize,
    /// Number of identical processors
    processors: usize,
    /// Cooling schedule: B (Boltzmann), L (linear), C (Cauchy)
    #[arg(value_name = "B|L|C")]
    cooling: CoolingSchedule,
    /// Job file: two header lines, then `jobId,duration` rows
    #[arg(long, default_value = "jobs.csv")]
    jobs: PathBuf,
    /// Synchronization rounds
    #[arg(long, default_value_t = 10)]
    rounds: usize,
    /// Starting temperature of every local search
    #[arg(long, default_value_t = 100.0)]
    start_temp: f64,
    /// Iterations without a new best before a local search stops
    #[arg(long, default_value_t = 100)]
    max_no_improve: usize,
    /// Hard iteration budget per local search (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_iterations: usize,
    /// Accept every candidate instead of the Metropolis rule
    #[arg(long)]
    accept_all: bool,
    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Rendezvous socket path
    #[arg(long, default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,
    /// Channel read/write timeout in seconds (0 = wait forever)
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
    /// Write per-worker, per-round CSV logs into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Drop failed workers instead of aborting the run
    #[arg(long)]
    tolerate_failures: bool,
    /// Omit the final assignment from the report
    #[arg(long)]
    no_schedule: bool,
    #[arg(long, hide = true)]
    worker: Option<usize>,
}

impl Cli {
    fn island_config(&self) -> IslandConfig {
        let acceptance = if self.accept_all {
            Acceptance::AlwaysAccept
        } else {
            Acceptance::Metropolis
        };
        let sa = SaConfig::default()
            .with_initial_temperature(self.start_temp)
            .with_cooling(self.cooling)
            .with_acceptance(acceptance)
            .with_max_no_improve(self.max_no_improve)
            .with_max_iterations(self.max_iterations);
        let timeout = (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs));

        let mut config = IslandConfig::new(self.workers, self.processors)
            .with_rounds(self.rounds)
            .with_sa(sa)
            .with_io_timeout(timeout)
            .with_socket_path(&self.socket)
            .with_tolerate_worker_failures(self.tolerate_failures);
        if let Some(dir) = &self.log_dir {
            config = config.with_log_dir(dir);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("island_anneal=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.island_config();

    if let Some(id) = cli.worker {
        config.validate()?;
        run_worker_process(id, &config).with_context(|| format!("worker {id} failed"))?;
        return Ok(());
    }

    let coordinator = Coordinator::new(config)?;
    let jobs = JobSet::load(&cli.jobs)?;
    tracing::info!(cooling = %cli.cooling, jobs = jobs.len(), path = %cli.jobs.display(), "loaded job set");

    let program = std::env::current_exe().context("cannot locate the current executable")?;
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let launcher = ProcessLauncher::bind(coordinator.config(), program, args)?;

    let started = Instant::now();
    let result = coordinator.run(&jobs, launcher)?;

    println!("Initial cost: {}", result.initial_cost);
    println!("Best total completion time: {}", result.best_cost);
    println!("Makespan: {}", result.best.makespan());
    println!("Elapsed: {:.3}s", started.elapsed().as_secs_f64());
    if !cli.no_schedule {
        print!("{}", result.best);
    }
    Ok(())
}
