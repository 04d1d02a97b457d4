//! Integration settings, as parsed from the command line or read from a YAML file.

use crate::constants::{bounds, DEFAULT_PRECISION};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Integration algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    Euler,
    AdamsMoulton,
    RungeKuttaFehlberg,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::RungeKuttaFehlberg
    }
}

/// Two-sided error bound: a step is rejected above `max` and grown below `min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub max: f64,
    pub min: f64,
}

impl Bound {
    /// Bound with the default lower threshold.
    pub fn new(max: f64) -> Self {
        Bound {
            max,
            min: max * bounds::FLOOR_RATIO,
        }
    }

    pub fn with_min(max: f64, min: f64) -> Self {
        Bound { max, min }
    }

    pub(crate) fn unbounded() -> Self {
        Bound {
            max: bounds::UNBOUNDED,
            min: bounds::UNBOUNDED,
        }
    }
}

/// Limits on the magnitude of the adaptive step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub algorithm: Algorithm,
    /// Step size given explicitly as fixed.
    pub fixed_step: bool,
    pub relative_error: Option<Bound>,
    pub absolute_error: Option<Bound>,
    pub accumulated_error: Option<f64>,
    pub step_bounds: Option<StepBounds>,
    /// Keep going at the minimum step even when the error bounds are exceeded.
    pub suppress_error_bound: bool,
    pub report_errors: bool,
    /// Significant digits of printed values.
    pub precision: usize,
    /// Print values in exponential notation.
    pub exponential: bool,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        IntegrationConfig {
            algorithm: Algorithm::default(),
            fixed_step: false,
            relative_error: None,
            absolute_error: None,
            accumulated_error: None,
            step_bounds: None,
            suppress_error_bound: false,
            report_errors: false,
            precision: DEFAULT_PRECISION,
            exponential: false,
        }
    }
}

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl IntegrationConfig {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn error_bound_specified(&self) -> bool {
        self.relative_error.is_some()
            || self.absolute_error.is_some()
            || self.accumulated_error.is_some()
    }

    /// Whether the run uses error control. Any explicit bound turns it on, even with a fixed
    /// step size.
    pub fn is_adaptive(&self) -> bool {
        self.error_bound_specified() || self.step_bounds.is_some() || !self.fixed_step
    }

    pub fn relative_bound(&self) -> Bound {
        self.relative_error
            .unwrap_or_else(|| Bound::new(bounds::RELATIVE_MAX))
    }

    pub fn absolute_bound(&self) -> Bound {
        self.absolute_error.unwrap_or_else(Bound::unbounded)
    }

    pub fn accumulated_bound(&self) -> f64 {
        self.accumulated_error.unwrap_or(bounds::UNBOUNDED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_combination() {
        let mut config = IntegrationConfig::default();
        assert!(config.is_adaptive());
        config.fixed_step = true;
        assert!(!config.is_adaptive());
        config.step_bounds = Some(StepBounds { min: 1.0E-6, max: 0.1 });
        assert!(config.is_adaptive());
        config.step_bounds = None;
        config.accumulated_error = Some(1.0E-3);
        assert!(config.is_adaptive());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = "
algorithm: AdamsMoulton
relative_error:
  max: 1.0e-6
  min: 1.0e-9
step_bounds:
  min: 1.0e-8
  max: 0.5
precision: 10
";
        let config = IntegrationConfig::from_reader(yaml.as_bytes()).unwrap();
        assert_eq!(config.algorithm, Algorithm::AdamsMoulton);
        assert_eq!(config.relative_bound(), Bound::with_min(1.0E-6, 1.0E-9));
        assert_eq!(config.step_bounds, Some(StepBounds { min: 1.0E-8, max: 0.5 }));
        assert_eq!(config.precision, 10);
        assert!(!config.fixed_step);
        assert_eq!(config.absolute_bound().max, f64::MAX);
    }

    #[test]
    fn test_invalid_yaml() {
        let result = IntegrationConfig::from_reader("algorithm: Simpson".as_bytes());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
