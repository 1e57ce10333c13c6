use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use island_anneal::schedule::{generate_durations, write_job_file};
use u_numflow::random::create_rng;

/// Writes a random job file for island-anneal.
#[derive(Parser)]
#[command(name = "jobgen", version)]
struct Cli {
    /// Number of jobs
    jobs: usize,
    /// Shortest duration (inclusive)
    min: u32,
    /// Longest duration (inclusive)
    max: u32,
    /// Output path
    #[arg(long, short, default_value = "jobs.csv")]
    out: PathBuf,
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
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
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jobgen=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut rng = create_rng(cli.seed.unwrap_or_else(rand::random));
    let durations = generate_durations(cli.jobs, cli.min, cli.max, &mut rng)?;

    let file = File::create(&cli.out)
        .with_context(|| format!("cannot create {}", cli.out.display()))?;
    write_job_file(&mut BufWriter::new(file), &durations)
        .with_context(|| format!("cannot write {}", cli.out.display()))?;

    tracing::info!(jobs = cli.jobs, path = %cli.out.display(), "job file written");
    Ok(())
}
