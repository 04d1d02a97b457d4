//! Adams-Bashforth-Moulton predictor-corrector of order 4 with fixed step size.
//!
//! The first three steps are taken with the Runge-Kutta 4 method to build the derivative
//! history the 4-point formulas need.

use crate::butcher_tableau::adams;
use crate::constants::adams::{ERROR_FACTOR, STARTUP_STEPS};
use crate::context::IntegrationContext;
use crate::ode_shared::{IntegrationError, Observer, Run, Span, Stats};
use crate::rk4;

/// Structure containing the parameters for the numerical integration.
pub struct AdamsMoulton<'a, O: Observer> {
    run: Run<'a, O>,
}

impl<'a, O: Observer> AdamsMoulton<'a, O> {
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `ctx`         - Variable table and print settings of the run
    /// * `observer`    - Receives every emitted row
    /// * `span`        - Interval of the independent variable and step size
    ///
    pub fn new(ctx: &'a mut IntegrationContext, observer: &'a mut O, span: Span) -> Self {
        AdamsMoulton {
            run: Run::new(ctx, observer, span),
        }
    }

    /// Core integration method.
    pub fn integrate(&mut self) -> Result<Stats, IntegrationError> {
        self.run.begin()?;
        let result = self.solve();
        self.run.finish(result)
    }

    fn solve(&mut self) -> Result<(), IntegrationError> {
        self.run.start()?;
        self.run.emit(self.run.span.reached(self.run.t))?;
        let h = self.run.span.step;
        let mut steps = 0;
        while !self.run.span.reached(self.run.t) {
            if steps < STARTUP_STEPS {
                rk4::step(&mut self.run, h)?;
                self.run.stats.startup_steps += 1;
            } else {
                let t = self.run.t;
                predict(&mut self.run, h)?;
                correct(self.run.ctx, h, None);
                self.run.accept(t + h)?;
            }
            steps += 1;
            self.run.emit(self.run.span.reached(self.run.t))?;
        }
        Ok(())
    }
}

/// Adams-Bashforth predictor: leaves the predicted values in the working and predictor slots
/// and evaluates the field there.
pub(crate) fn predict<O: Observer>(run: &mut Run<'_, O>, h: f64) -> Result<(), IntegrationError> {
    run.ctx.advance_by_history(h, &adams::bashforth());
    run.ctx.store_predictor();
    run.field(run.t + h)
}

/// Adams-Moulton corrector, using the derivatives at the predicted point.
///
/// Without `relaxation` the corrected value is taken as is and its error is estimated from
/// the corrector-predictor difference. With it, the value is moved from the predictor towards
/// the corrector by that fraction and the error is its distance to the corrector.
pub(crate) fn correct(ctx: &mut IntegrationContext, h: f64, relaxation: Option<f64>) {
    let moulton = adams::moulton();
    for var in ctx.table.dependents_mut() {
        let corrected = var.val[0] + h * (adams::MOULTON_NEW * var.prime + var.pri.dot(&moulton));
        match relaxation {
            None => {
                var.value = corrected;
                var.record_error(ERROR_FACTOR * (corrected - var.pred).abs());
            }
            Some(w) => {
                var.value = var.pred + w * (corrected - var.pred);
                var.estimate(corrected);
            }
        }
    }
}
