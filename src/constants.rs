/// Depth of the evaluator's value stack.
pub const STACK_DEPTH: usize = 128;

/// Capacity of the per-variable history and stage arrays.
pub const HISTORY_LEN: usize = 7;

/// Default error bounds used by the adaptive methods.
pub mod bounds {
    /// Maximum relative single-step error when none is configured.
    pub const RELATIVE_MAX: f64 = 1.0E-9;

    /// Lower threshold of a bound, as a fraction of its maximum.
    pub const FLOOR_RATIO: f64 = 1.0E-3;

    /// Absolute and accumulated errors are unbounded unless configured.
    pub const UNBOUNDED: f64 = f64::MAX;
}

/// Step size constants
pub mod step {
    /// The default step divides the integration span into this many steps.
    pub const DEFAULT_DIVISIONS: f64 = 100.0;

    /// Look-ahead factor used to clamp the final adaptive step onto the end point.
    pub const END_LOOKAHEAD: f64 = 1.01;
}

/// Multistep method constants
pub mod adams {
    /// Steps of a one-step method needed before the 4-point formulas have enough history.
    pub const STARTUP_STEPS: usize = 3;

    /// Weight of the corrector when blending it with the predictor (Milne's device).
    pub const RELAXATION: f64 = 251.0 / 270.0;

    /// Local error of the corrector as a fraction of the corrector-predictor difference.
    pub const ERROR_FACTOR: f64 = 19.0 / 270.0;
}

/// Default number of significant digits in printed output.
pub const DEFAULT_PRECISION: usize = 6;
