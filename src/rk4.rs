//! Explicit Runge-Kutta method of order 4 with fixed step size.

use crate::butcher_tableau::rk4;
use crate::context::IntegrationContext;
use crate::ode_shared::{IntegrationError, Observer, Run, Span, Stats};

/// Structure containing the parameters for the numerical integration.
pub struct Rk4<'a, O: Observer> {
    run: Run<'a, O>,
}

impl<'a, O: Observer> Rk4<'a, O> {
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `ctx`         - Variable table and print settings of the run
    /// * `observer`    - Receives every emitted row
    /// * `span`        - Interval of the independent variable and step size
    ///
    pub fn new(ctx: &'a mut IntegrationContext, observer: &'a mut O, span: Span) -> Self {
        Rk4 {
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
        while !self.run.span.reached(self.run.t) {
            let h = self.run.span.step;
            step(&mut self.run, h)?;
            self.run.emit(self.run.span.reached(self.run.t))?;
        }
        Ok(())
    }
}

/// Performs one step of the Runge-Kutta 4 method from the last accepted state and accepts it.
pub(crate) fn step<O: Observer>(run: &mut Run<'_, O>, h: f64) -> Result<(), IntegrationError> {
    let t = run.t;
    run.ctx.start_stages();
    for s in 1..rk4::STAGES {
        run.ctx.advance_by_stages(h, &rk4::a(s));
        run.field(t + rk4::c(s) * h)?;
        run.ctx.record_stage(s);
    }
    run.ctx.advance_by_stages(h, &rk4::b());
    run.accept(t + h)
}
