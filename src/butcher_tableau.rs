//! Coefficients of the one-step and multistep formulas.
//!
//! Weight vectors are returned as [`History`] vectors so that a formula is a dot product with a
//! variable's stage workspace or derivative history. Unused trailing entries are zero.

use crate::variable::History;

fn weights(w: &[f64]) -> History {
    let mut v = History::zeros();
    for (i, x) in w.iter().enumerate() {
        v[i] = *x;
    }
    v
}

/// Forward Euler: one stage.
pub mod euler {
    use super::*;

    pub fn b() -> History {
        weights(&[1.0])
    }
}

/// Classical Runge-Kutta method of order 4.
pub mod rk4 {
    use super::*;

    pub const STAGES: usize = 4;

    pub fn c(i: usize) -> f64 {
        [0.0, 0.5, 0.5, 1.0][i]
    }

    /// Row `i` of the Runge-Kutta matrix.
    pub fn a(i: usize) -> History {
        match i {
            1 => weights(&[0.5]),
            2 => weights(&[0.0, 0.5]),
            3 => weights(&[0.0, 0.0, 1.0]),
            _ => History::zeros(),
        }
    }

    pub fn b() -> History {
        weights(&[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0])
    }
}

/// Runge-Kutta-Fehlberg embedded pair of orders 4 and 5.
pub mod rkf45 {
    use super::*;

    pub const STAGES: usize = 6;

    pub fn c(i: usize) -> f64 {
        [0.0, 0.25, 3.0 / 8.0, 12.0 / 13.0, 1.0, 0.5][i]
    }

    /// Row `i` of the Runge-Kutta matrix.
    pub fn a(i: usize) -> History {
        match i {
            1 => weights(&[0.25]),
            2 => weights(&[3.0 / 32.0, 9.0 / 32.0]),
            3 => weights(&[1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0]),
            4 => weights(&[439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0]),
            5 => weights(&[
                -8.0 / 27.0,
                2.0,
                -3544.0 / 2565.0,
                1859.0 / 4104.0,
                -11.0 / 40.0,
            ]),
            _ => History::zeros(),
        }
    }

    /// Fifth-order weights, giving the accepted value.
    pub fn b() -> History {
        weights(&[
            16.0 / 135.0,
            0.0,
            6656.0 / 12825.0,
            28561.0 / 56430.0,
            -9.0 / 50.0,
            2.0 / 55.0,
        ])
    }

    /// Fourth-order weights, giving the predictor.
    pub fn b_hat() -> History {
        weights(&[
            25.0 / 216.0,
            0.0,
            1408.0 / 2565.0,
            2197.0 / 4104.0,
            -1.0 / 5.0,
            0.0,
        ])
    }
}

/// Four-point Adams formulas on an equally spaced derivative history, newest first.
pub mod adams {
    use super::*;

    /// Explicit Adams-Bashforth predictor weights on `pri[0..4]`.
    pub fn bashforth() -> History {
        weights(&[55.0 / 24.0, -59.0 / 24.0, 37.0 / 24.0, -9.0 / 24.0])
    }

    /// Adams-Moulton corrector weight on the derivative at the predicted point.
    pub const MOULTON_NEW: f64 = 9.0 / 24.0;

    /// Adams-Moulton corrector weights on `pri[0..3]`.
    pub fn moulton() -> History {
        weights(&[19.0 / 24.0, -5.0 / 24.0, 1.0 / 24.0])
    }
}
