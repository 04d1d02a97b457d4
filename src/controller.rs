//! Adaptive step size control.

use crate::config::{Bound, IntegrationConfig};
use crate::ode_shared::{sign, IntegrationError};
use crate::variable::VariableTable;

/// Worst trial error estimates over all dependent variables.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorstCase {
    pub relative: f64,
    pub absolute: f64,
    pub accumulated: f64,
}

impl WorstCase {
    pub fn of(table: &VariableTable) -> Self {
        table.dependents().fold(WorstCase::default(), |w, var| WorstCase {
            relative: w.relative.max(var.trial.relative),
            absolute: w.absolute.max(var.trial.absolute),
            accumulated: w.accumulated.max(var.trial.accumulated),
        })
    }
}

/// Decision on a candidate step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Too inaccurate: retry with a smaller step.
    Shrink,
    /// More accurate than needed: a larger step may be tried.
    Grow,
}

/// Used for adaptive step size control
pub struct Controller {
    relative: Bound,
    absolute: Bound,
    accumulated: f64,
    h_min: f64,
    h_max: f64,
    suppress: bool,
}

impl Controller {
    /// Creates a controller responsible for adaptive step size control.
    ///
    /// # Arguments
    ///
    /// * `relative`    - Bounds on the relative single-step error
    /// * `absolute`    - Bounds on the absolute single-step error
    /// * `accumulated` - Maximum accumulated error
    /// * `h_min`       - Minimum step size
    /// * `h_max`       - Maximum step size
    /// * `suppress`    - Accept steps exceeding the bounds once the step is at its minimum
    ///
    pub fn new(
        relative: Bound,
        absolute: Bound,
        accumulated: f64,
        h_min: f64,
        h_max: f64,
        suppress: bool,
    ) -> Controller {
        Controller {
            relative,
            absolute,
            accumulated,
            h_min: h_min.abs(),
            h_max: h_max.abs(),
            suppress,
        }
    }

    /// Controller with the configured bounds. `span` is the length of the integration
    /// interval and serves as the default maximum step.
    pub fn from_config(config: &IntegrationConfig, span: f64) -> Controller {
        let (h_min, h_max) = match config.step_bounds {
            Some(b) => (b.min, b.max),
            None => (0.0, span),
        };
        Controller::new(
            config.relative_bound(),
            config.absolute_bound(),
            config.accumulated_bound(),
            h_min,
            h_max,
            config.suppress_error_bound,
        )
    }

    /// True when a step `h` taken from `x` is not accurate enough and can still be shrunk.
    ///
    /// Fails when `x + h` is indistinguishable from `x`, and when the bounds are exceeded at
    /// the minimum step size (unless enforcement is suppressed).
    pub fn too_large(&self, worst: &WorstCase, x: f64, h: f64) -> Result<bool, IntegrationError> {
        if x + h == x {
            return Err(IntegrationError::DegenerateStep { x });
        }
        let exceeded = worst.relative > self.relative.max
            || worst.absolute > self.absolute.max
            || worst.accumulated > self.accumulated;
        if !exceeded {
            return Ok(false);
        }
        if h.abs() > self.h_min {
            return Ok(true);
        }
        if self.suppress {
            log::warn!("error bound exceeded at minimum step size at x = {}", x);
            return Ok(false);
        }
        Err(IntegrationError::StepSizeUnderflow { x })
    }

    /// True when both single-step errors are below their lower thresholds and the step can
    /// still grow.
    pub fn too_accurate(&self, worst: &WorstCase, h: f64) -> bool {
        worst.relative < self.relative.min
            && worst.absolute < self.absolute.min
            && h.abs() < self.h_max
    }

    /// Determines if the step must be accepted, shrunk or grown. A step that is both too
    /// large and too accurate is shrunk.
    pub fn verdict(&self, worst: &WorstCase, x: f64, h: f64) -> Result<Verdict, IntegrationError> {
        if self.too_large(worst, x, h)? {
            Ok(Verdict::Shrink)
        } else if self.too_accurate(worst, h) {
            Ok(Verdict::Grow)
        } else {
            Ok(Verdict::Accept)
        }
    }

    /// Half the step, but not below the minimum.
    pub fn shrink(&self, h: f64) -> f64 {
        sign((0.5 * h.abs()).max(self.h_min), h)
    }

    /// Twice the step, but not above the maximum.
    pub fn grow(&self, h: f64) -> f64 {
        sign((2.0 * h.abs()).min(self.h_max), h)
    }

    /// Brings a step within the step bounds.
    pub fn clamp(&self, h: f64) -> f64 {
        sign(h.abs().max(self.h_min).min(self.h_max), h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> Controller {
        Controller::new(
            Bound::with_min(1.0E-6, 1.0E-9),
            Bound::with_min(1.0E-4, 1.0E-7),
            1.0E-3,
            1.0E-5,
            0.5,
            false,
        )
    }

    #[test]
    fn test_accept() {
        let worst = WorstCase {
            relative: 1.0E-7,
            absolute: 1.0E-5,
            accumulated: 1.0E-4,
        };
        assert_eq!(controller().verdict(&worst, 0.0, 0.1).unwrap(), Verdict::Accept);
    }

    #[test]
    fn test_shrink_and_grow() {
        let ctl = controller();
        let large = WorstCase {
            relative: 1.0E-5,
            ..WorstCase::default()
        };
        assert_eq!(ctl.verdict(&large, 0.0, 0.1).unwrap(), Verdict::Shrink);
        let small = WorstCase {
            relative: 1.0E-10,
            absolute: 1.0E-8,
            accumulated: 0.0,
        };
        assert_eq!(ctl.verdict(&small, 0.0, 0.1).unwrap(), Verdict::Grow);
        // At the maximum step there is no room to grow.
        assert_eq!(ctl.verdict(&small, 0.0, 0.5).unwrap(), Verdict::Accept);
        // Only one of the single-step errors below its threshold is not enough.
        let mixed = WorstCase {
            relative: 1.0E-10,
            absolute: 1.0E-6,
            accumulated: 0.0,
        };
        assert_eq!(ctl.verdict(&mixed, 0.0, 0.1).unwrap(), Verdict::Accept);
    }

    #[test]
    fn test_too_large_wins_over_too_accurate() {
        let ctl = controller();
        // Single-step errors below the floor, accumulated error above its bound.
        let both = WorstCase {
            relative: 1.0E-12,
            absolute: 1.0E-12,
            accumulated: 1.0E-2,
        };
        assert!(ctl.too_accurate(&both, 0.1));
        assert!(ctl.too_large(&both, 0.0, 0.1).unwrap());
        assert_eq!(ctl.verdict(&both, 0.0, 0.1).unwrap(), Verdict::Shrink);
    }

    #[test]
    fn test_underflow_at_minimum_step() {
        let worst = WorstCase {
            relative: 1.0,
            ..WorstCase::default()
        };
        assert!(matches!(
            controller().verdict(&worst, 2.0, 1.0E-5),
            Err(IntegrationError::StepSizeUnderflow { .. })
        ));

        let suppressed = Controller::new(
            Bound::new(1.0E-6),
            Bound::unbounded(),
            f64::MAX,
            1.0E-5,
            0.5,
            true,
        );
        assert_eq!(suppressed.verdict(&worst, 2.0, 1.0E-5).unwrap(), Verdict::Accept);
    }

    #[test]
    fn test_degenerate_step_is_fatal_even_when_accurate() {
        let worst = WorstCase::default();
        assert!(matches!(
            controller().too_large(&worst, 1.0E10, 1.0E-10),
            Err(IntegrationError::DegenerateStep { .. })
        ));
    }

    #[test]
    fn test_resizing_respects_bounds() {
        let ctl = controller();
        assert_eq!(ctl.shrink(0.1), 0.05);
        assert_eq!(ctl.shrink(-1.5E-5), -1.0E-5);
        assert_eq!(ctl.grow(0.1), 0.2);
        assert_eq!(ctl.grow(-0.4), -0.5);
        assert_eq!(ctl.clamp(2.0), 0.5);
    }
}
