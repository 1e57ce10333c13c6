//! Island run configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::sa::SaConfig;

/// Default rendezvous socket path.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/island-anneal.sock";

/// Configuration shared by the coordinator and every worker.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use island_anneal::island::IslandConfig;
///
/// let config = IslandConfig::new(4, 3)
///     .with_rounds(5)
///     .with_io_timeout(Some(Duration::from_secs(30)))
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.worker_seed(0, 1), config.worker_seed(0, 1));
/// ```
#[derive(Debug, Clone)]
pub struct IslandConfig {
    /// Number of worker processes `W`.
    pub workers: usize,

    /// Number of identical processors `M` in every schedule.
    pub processors: usize,

    /// Synchronization rounds `R`.
    pub rounds: usize,

    /// Local annealer settings used by every worker.
    pub sa: SaConfig,

    /// Read/write timeout on every channel. `None` blocks forever.
    pub io_timeout: Option<Duration>,

    /// How long the coordinator waits for a launched worker to connect.
    pub connect_timeout: Duration,

    /// Rendezvous endpoint used for the initial connect.
    pub socket_path: PathBuf,

    /// Directory for per-worker, per-round CSV logs.
    pub log_dir: Option<PathBuf>,

    /// Exclude failed workers instead of aborting the run.
    pub tolerate_worker_failures: bool,

    /// Base random seed. Workers and rounds derive their own seeds from it.
    pub seed: Option<u64>,
}

impl IslandConfig {
    pub fn new(workers: usize, processors: usize) -> Self {
        Self {
            workers,
            processors,
            rounds: 10,
            sa: SaConfig::default(),
            io_timeout: Some(Duration::from_secs(300)),
            connect_timeout: Duration::from_secs(10),
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            log_dir: None,
            tolerate_worker_failures: false,
            seed: None,
        }
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_sa(mut self, sa: SaConfig) -> Self {
        self.sa = sa;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_tolerate_worker_failures(mut self, tolerate: bool) -> Self {
        self.tolerate_worker_failures = tolerate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("worker count must be at least 1".into()));
        }
        if self.processors == 0 {
            return Err(ConfigError::Invalid(
                "processor count must be at least 1".into(),
            ));
        }
        if self.rounds == 0 {
            return Err(ConfigError::Invalid("rounds must be at least 1".into()));
        }
        if self.io_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid(
                "io timeout must be positive; use None to disable it".into(),
            ));
        }
        self.sa.validate()
    }

    /// Seed for the coordinator's initial schedule.
    pub fn coordinator_seed(&self) -> Option<u64> {
        self.seed.map(|s| mix(s, u64::MAX, 0))
    }

    /// Seed for worker `worker`'s annealer in `round`.
    pub fn worker_seed(&self, worker: usize, round: usize) -> Option<u64> {
        self.seed.map(|s| mix(s, worker as u64, round as u64))
    }

    /// CSV log path for one worker round, when logging is enabled.
    pub fn log_path(&self, worker: usize, round: usize) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(format!("worker-{worker}-round-{round}.csv")))
    }
}

/// SplitMix64 finalizer over the combined inputs.
fn mix(seed: u64, a: u64, b: u64) -> u64 {
    let mut z = seed
        .wrapping_add(a.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(b.wrapping_mul(0xD1B5_4A32_D192_ED03));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
