//! SA configuration, cooling schedules and acceptance rules.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Cooling schedule mapping `(temperature, iteration)` to the next
/// temperature.
///
/// # References
///
/// - Boltzmann: Geman & Geman (1984), logarithmic cooling
/// - Cauchy: Szu & Hartley (1987), fast annealing
/// - Linear: geometric decay with a fixed factor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoolingSchedule {
    /// `T_{k+1} = T_k / ln(1 + k)`.
    ///
    /// The logarithm is clamped to at least 1, so iterations 0 and 1 keep
    /// the temperature instead of dividing by zero or heating up.
    Boltzmann,

    /// `T_{k+1} = T_k / (1 + k)`.
    Cauchy,

    /// `T_{k+1} = factor * T_k`, independent of the iteration.
    Linear {
        /// Decay factor in (0, 1). Default 0.99.
        factor: f64,
    },
}

impl CoolingSchedule {
    /// Decay factor of the `L` variant.
    pub const LINEAR_FACTOR: f64 = 0.99;

    /// The `L` variant with its default factor.
    pub fn linear() -> Self {
        CoolingSchedule::Linear {
            factor: Self::LINEAR_FACTOR,
        }
    }

    /// Next temperature after `iteration`.
    pub fn next(&self, temperature: f64, iteration: usize) -> f64 {
        match *self {
            CoolingSchedule::Boltzmann => {
                let denom = (1.0 + iteration as f64).ln().max(1.0);
                temperature / denom
            }
            CoolingSchedule::Cauchy => temperature / (1.0 + iteration as f64),
            CoolingSchedule::Linear { factor } => temperature * factor,
        }
    }

    /// The single-letter CLI name (`B`, `C` or `L`).
    pub fn letter(&self) -> char {
        match self {
            CoolingSchedule::Boltzmann => 'B',
            CoolingSchedule::Cauchy => 'C',
            CoolingSchedule::Linear { .. } => 'L',
        }
    }
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::linear()
    }
}

impl FromStr for CoolingSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "B" | "b" => Ok(CoolingSchedule::Boltzmann),
            "C" | "c" => Ok(CoolingSchedule::Cauchy),
            "L" | "l" => Ok(CoolingSchedule::linear()),
            other => Err(ConfigError::InvalidCooling(other.to_string())),
        }
    }
}

impl fmt::Display for CoolingSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoolingSchedule::Boltzmann => write!(f, "Boltzmann cooling"),
            CoolingSchedule::Cauchy => write!(f, "Cauchy cooling"),
            CoolingSchedule::Linear { factor } => write!(f, "Linear cooling (x{factor})"),
        }
    }
}

/// Rule for accepting a candidate that is worse than the current schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Acceptance {
    /// Accept with probability `exp(-delta / T)`.
    #[default]
    Metropolis,

    /// Accept every candidate. The search then degenerates into a random
    /// walk that only remembers its best point.
    AlwaysAccept,
}

/// Configuration of one local annealing run.
///
/// # Examples
///
/// ```
/// use island_anneal::sa::{Acceptance, CoolingSchedule, SaConfig};
///
/// let config = SaConfig::default()
///     .with_initial_temperature(50.0)
///     .with_cooling(CoolingSchedule::Cauchy)
///     .with_acceptance(Acceptance::Metropolis)
///     .with_max_no_improve(200);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SaConfig {
    /// Starting temperature of every run.
    pub initial_temperature: f64,

    /// Cooling schedule.
    pub cooling: CoolingSchedule,

    /// Acceptance rule for worsening moves.
    pub acceptance: Acceptance,

    /// Consecutive iterations without a new best before the run stops.
    pub max_no_improve: usize,

    /// Maximum total iterations (hard budget). 0 = no limit.
    pub max_iterations: usize,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 100.0,
            cooling: CoolingSchedule::default(),
            acceptance: Acceptance::default(),
            max_no_improve: 100,
            max_iterations: 0,
            seed: None,
        }
    }
}

impl SaConfig {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    pub fn with_acceptance(mut self, acceptance: Acceptance) -> Self {
        self.acceptance = acceptance;
        self
    }

    pub fn with_max_no_improve(mut self, n: usize) -> Self {
        self.max_no_improve = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_temperature > 0.0 && self.initial_temperature.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "initial_temperature must be positive and finite, got {}",
                self.initial_temperature
            )));
        }
        if self.max_no_improve == 0 {
            return Err(ConfigError::Invalid("max_no_improve must be at least 1".into()));
        }
        if let CoolingSchedule::Linear { factor } = self.cooling {
            if factor <= 0.0 || factor >= 1.0 {
                return Err(ConfigError::Invalid(format!(
                    "linear factor must be in (0, 1), got {factor}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SaConfig::default();
        assert!((config.initial_temperature - 100.0).abs() < 1e-10);
        assert_eq!(config.max_no_improve, 100);
        assert_eq!(config.acceptance, Acceptance::Metropolis);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_temperature() {
        assert!(SaConfig::default()
            .with_initial_temperature(-1.0)
            .validate()
            .is_err());
        assert!(SaConfig::default()
            .with_initial_temperature(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_bad_factor() {
        let config = SaConfig::default().with_cooling(CoolingSchedule::Linear { factor: 1.5 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_stagnation_limit() {
        assert!(SaConfig::default().with_max_no_improve(0).validate().is_err());
    }

    #[test]
    fn test_parse_letters() {
        assert_eq!("B".parse::<CoolingSchedule>().unwrap(), CoolingSchedule::Boltzmann);
        assert_eq!("c".parse::<CoolingSchedule>().unwrap(), CoolingSchedule::Cauchy);
        assert_eq!("L".parse::<CoolingSchedule>().unwrap(), CoolingSchedule::linear());
        assert!(matches!(
            "X".parse::<CoolingSchedule>(),
            Err(ConfigError::InvalidCooling(s)) if s == "X"
        ));
        assert_eq!(CoolingSchedule::Cauchy.letter(), 'C');
    }

    #[test]
    fn test_linear_decays_by_factor() {
        let cooling = CoolingSchedule::linear();
        let mut t = 100.0;
        for k in 0..50 {
            let next = cooling.next(t, k);
            assert!((next - t * 0.99).abs() < 1e-12);
            assert!(next < t);
            t = next;
        }
    }

    #[test]
    fn test_boltzmann_guards_first_iterations() {
        let cooling = CoolingSchedule::Boltzmann;
        assert!((cooling.next(100.0, 0) - 100.0).abs() < 1e-12);
        assert!((cooling.next(100.0, 1) - 100.0).abs() < 1e-12);
        assert!((cooling.next(100.0, 9) - 100.0 / 10f64.ln()).abs() < 1e-12);
        assert!(cooling.next(100.0, 0).is_finite());
    }

    #[test]
    fn test_boltzmann_and_cauchy_non_increasing() {
        for cooling in [CoolingSchedule::Boltzmann, CoolingSchedule::Cauchy] {
            let mut t = 100.0;
            for k in 1..500 {
                let next = cooling.next(t, k);
                assert!(next <= t, "{cooling} heated up at iteration {k}: {t} -> {next}");
                assert!(next >= 0.0);
                t = next;
            }
        }
    }

    #[test]
    fn test_cauchy_formula() {
        assert!((CoolingSchedule::Cauchy.next(100.0, 4) - 20.0).abs() < 1e-12);
        assert!((CoolingSchedule::Cauchy.next(100.0, 0) - 100.0).abs() < 1e-12);
    }
}
