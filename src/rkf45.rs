//! Runge-Kutta-Fehlberg method of orders 4 and 5 with optional adaptive step size control.

use crate::butcher_tableau::rkf45;
use crate::constants::step::END_LOOKAHEAD;
use crate::context::IntegrationContext;
use crate::controller::{Controller, Verdict, WorstCase};
use crate::ode_shared::{IntegrationError, Observer, Run, Span, Stats};

/// Structure containing the parameters for the numerical integration.
pub struct Rkf45<'a, O: Observer> {
    run: Run<'a, O>,
    controller: Controller,
    h: f64,
    controlled: bool,
}

impl<'a, O: Observer> Rkf45<'a, O> {
    /// Default initializer for the structure. The step size of `span` is the initial step.
    ///
    /// # Arguments
    ///
    /// * `ctx`         - Variable table and print settings of the run
    /// * `observer`    - Receives every emitted row
    /// * `span`        - Interval of the independent variable and initial step size
    /// * `controller`  - Error bounds and step size limits
    ///
    pub fn new(
        ctx: &'a mut IntegrationContext,
        observer: &'a mut O,
        span: Span,
        controller: Controller,
    ) -> Self {
        Rkf45 {
            run: Run::new(ctx, observer, span),
            controller,
            h: span.step,
            controlled: true,
        }
    }

    /// Fixed steps of the fifth-order formula, still computing the error estimates.
    pub fn uncontrolled(
        ctx: &'a mut IntegrationContext,
        observer: &'a mut O,
        span: Span,
        controller: Controller,
    ) -> Self {
        Rkf45 {
            controlled: false,
            ..Rkf45::new(ctx, observer, span, controller)
        }
    }

    /// Core integration method.
    pub fn integrate(&mut self) -> Result<Stats, IntegrationError> {
        self.run.begin()?;
        let result = if self.controlled {
            self.solve_controlled()
        } else {
            self.solve_fixed()
        };
        self.run.finish(result)
    }

    fn solve_fixed(&mut self) -> Result<(), IntegrationError> {
        self.run.start()?;
        self.run.emit(self.run.span.reached(self.run.t))?;
        while !self.run.span.reached(self.run.t) {
            let t = self.run.t;
            trial(&mut self.run, self.h)?;
            self.run.accept(t + self.h)?;
            self.run.emit(self.run.span.reached(self.run.t))?;
        }
        Ok(())
    }

    fn solve_controlled(&mut self) -> Result<(), IntegrationError> {
        self.run.start()?;
        if self.run.span.is_empty() {
            return self.run.emit(true);
        }
        self.run.emit(false)?;

        loop {
            let remaining = self.run.span.end - self.run.t;
            if self.run.t + remaining == self.run.t {
                return self.run.snap_to_end();
            }
            let attempt = controlled_trial(&mut self.run, &self.controller, &mut self.h, true)?;
            let t_new = if attempt.last {
                self.run.span.end
            } else {
                self.run.t + attempt.h
            };
            self.run.accept(t_new)?;
            self.run.emit(attempt.last)?;
            if attempt.last {
                return Ok(());
            }
        }
    }
}

/// Outcome of [`controlled_trial`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Attempt {
    /// Step size that produced the candidate.
    pub(crate) h: f64,
    /// The step was clamped onto the end point.
    pub(crate) last: bool,
}

/// Computes a fifth-order candidate of size `h` from the last accepted state, together with
/// the error estimates against the embedded fourth-order solution. Nothing is accepted.
pub(crate) fn trial<O: Observer>(run: &mut Run<'_, O>, h: f64) -> Result<(), IntegrationError> {
    let t = run.t;
    run.ctx.start_stages();
    for s in 1..rkf45::STAGES {
        run.ctx.advance_by_stages(h, &rkf45::a(s));
        run.field(t + rkf45::c(s) * h)?;
        run.ctx.record_stage(s);
    }
    run.ctx.advance_by_stages(h, &rkf45::b_hat());
    run.ctx.store_predictor();
    run.ctx.advance_by_stages(h, &rkf45::b());
    run.ctx.estimate_errors();
    Ok(())
}

/// Tries candidate steps until one satisfies `controller`, leaving it in the working values.
///
/// Steps that would land within the look-ahead margin of the end point are clamped onto it.
/// A too-large step is halved and retried. A too-accurate step is doubled and retried when
/// `allow_grow` is set, unless it was clamped or the previous attempt already resized. `h` is
/// updated to the step size to continue with.
pub(crate) fn controlled_trial<O: Observer>(
    run: &mut Run<'_, O>,
    controller: &Controller,
    h: &mut f64,
    allow_grow: bool,
) -> Result<Attempt, IntegrationError> {
    let direction = run.span.direction();
    let mut resized = false;
    loop {
        let mut step = *h;
        let mut last = false;
        if (run.t + END_LOOKAHEAD * step - run.span.end) * direction >= 0.0 {
            step = run.span.end - run.t;
            last = true;
        }
        trial(run, step)?;

        let worst = WorstCase::of(&run.ctx.table);
        match controller.verdict(&worst, run.t, step)? {
            Verdict::Shrink => {
                *h = controller.shrink(step);
                run.stats.rejected_steps += 1;
                log::trace!("step {} rejected at x = {}, retrying with {}", step, run.t, *h);
            }
            Verdict::Grow if allow_grow && !resized && !last => {
                *h = controller.grow(step);
                log::trace!("step {} too accurate at x = {}, retrying with {}", step, run.t, *h);
            }
            _ => {
                return Ok(Attempt { h: step, last });
            }
        }
        resized = true;
    }
}
