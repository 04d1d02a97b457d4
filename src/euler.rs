//! Explicit Euler method with fixed step size.

use crate::butcher_tableau::euler;
use crate::context::IntegrationContext;
use crate::ode_shared::{IntegrationError, Observer, Run, Span, Stats};

/// Structure containing the parameters for the numerical integration.
pub struct Euler<'a, O: Observer> {
    run: Run<'a, O>,
}

impl<'a, O: Observer> Euler<'a, O> {
    /// Default initializer for the structure
    ///
    /// # Arguments
    ///
    /// * `ctx`         - Variable table and print settings of the run
    /// * `observer`    - Receives every emitted row
    /// * `span`        - Interval of the independent variable and step size
    ///
    pub fn new(ctx: &'a mut IntegrationContext, observer: &'a mut O, span: Span) -> Self {
        Euler {
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
            self.step()?;
            self.run.emit(self.run.span.reached(self.run.t))?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), IntegrationError> {
        let h = self.run.span.step;
        self.run.ctx.advance_by_history(h, &euler::b());
        self.run.accept(self.run.t + h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Code, Op};
    use crate::output::Recorder;

    #[test]
    fn test_exponential_growth() {
        let mut ctx = IntegrationContext::new();
        let y = ctx.table.intern("y");
        ctx.table[y].set_equation(Code::new(vec![Op::Load(y)]));
        ctx.table[y].set_value(1.0);
        let mut recorder = Recorder::new();

        let stats = Euler::new(&mut ctx, &mut recorder, Span::new(0.0, 1.0, 0.01))
            .integrate()
            .unwrap();

        assert_eq!(stats.accepted_steps, 100);
        assert_eq!(recorder.rows.len(), 101);
        assert!((ctx.table[y].value - 1.01f64.powi(100)).abs() < 1.0E-9);
    }

    #[test]
    fn test_backward_linear() {
        let mut ctx = IntegrationContext::new();
        let t = ctx.table.intern("t");
        let x = ctx.table.intern("x");
        ctx.table[x].set_equation(Code::constant(2.0));
        ctx.table[x].set_value(0.0);
        let mut recorder = Recorder::new();

        Euler::new(&mut ctx, &mut recorder, Span::new(1.0, 0.0, 0.25))
            .integrate()
            .unwrap();

        assert!((ctx.table[t].value - 0.0).abs() < 1.0E-12);
        assert!((ctx.table[x].value + 2.0).abs() < 1.0E-12);
    }
}
