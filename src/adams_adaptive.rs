//! Adams-Bashforth-Moulton predictor-corrector of order 4 with adaptive step size control.
//!
//! The multistep formulas need an equally spaced history, so every change of step size
//! restarts the method: the Runge-Kutta-Fehlberg method (with shrink-only control) takes
//! steps until enough consecutive ones share the same size, after which the predictor and
//! corrector take over. The corrected value is blended with the predicted one, which makes
//! the error estimate the distance between the accepted value and the corrector.

use crate::adams::{correct, predict};
use crate::constants::adams::{RELAXATION, STARTUP_STEPS};
use crate::constants::step::END_LOOKAHEAD;
use crate::context::IntegrationContext;
use crate::controller::{Controller, Verdict, WorstCase};
use crate::ode_shared::{IntegrationError, Observer, Run, Span, Stats};
use crate::rkf45::controlled_trial;

/// State of the predictor-corrector cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// One-step method building an equally spaced history.
    Startup,
    Predict,
    Correct,
    Accept,
    ShrinkAndRestart,
    GrowAndRestart,
}

impl Phase {
    /// Phase following the controller's verdict on a corrected step. After a resize, a
    /// too-accurate step is accepted rather than grown again until a step has been accepted.
    pub fn after(verdict: Verdict, resized: bool) -> Phase {
        match verdict {
            Verdict::Shrink => Phase::ShrinkAndRestart,
            Verdict::Grow if !resized => Phase::GrowAndRestart,
            _ => Phase::Accept,
        }
    }
}

/// Structure containing the parameters for the numerical integration.
pub struct AdaptiveAdamsMoulton<'a, O: Observer> {
    run: Run<'a, O>,
    controller: Controller,
    h: f64,
    phase: Phase,
    /// Consecutive startup steps accepted with the current step size.
    equal_steps: usize,
    resized: bool,
}

impl<'a, O: Observer> AdaptiveAdamsMoulton<'a, O> {
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
        AdaptiveAdamsMoulton {
            run: Run::new(ctx, observer, span),
            controller,
            h: span.step,
            phase: Phase::Startup,
            equal_steps: 0,
            resized: false,
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
        if self.run.span.is_empty() {
            return self.run.emit(true);
        }
        self.run.emit(false)?;

        self.phase = Phase::Startup;
        self.equal_steps = 0;
        self.resized = false;
        loop {
            let next = match self.phase {
                Phase::Startup => {
                    let remaining = self.run.span.end - self.run.t;
                    if self.run.t + remaining == self.run.t {
                        return self.run.snap_to_end();
                    }
                    if self.startup_step()? {
                        return Ok(());
                    }
                    if self.equal_steps >= STARTUP_STEPS {
                        Phase::Predict
                    } else {
                        Phase::Startup
                    }
                }
                Phase::Predict => {
                    let direction = self.run.span.direction();
                    let overshoot = self.run.t + END_LOOKAHEAD * self.h - self.run.span.end;
                    if overshoot * direction >= 0.0 {
                        // The one-step method lands the final step on the end point.
                        self.equal_steps = 0;
                        Phase::Startup
                    } else {
                        predict(&mut self.run, self.h)?;
                        Phase::Correct
                    }
                }
                Phase::Correct => {
                    correct(self.run.ctx, self.h, Some(RELAXATION));
                    let worst = WorstCase::of(&self.run.ctx.table);
                    let verdict = self.controller.verdict(&worst, self.run.t, self.h)?;
                    Phase::after(verdict, self.resized)
                }
                Phase::Accept => {
                    self.run.accept(self.run.t + self.h)?;
                    self.run.emit(false)?;
                    self.resized = false;
                    Phase::Predict
                }
                Phase::ShrinkAndRestart => {
                    self.run.stats.rejected_steps += 1;
                    self.restart(self.controller.shrink(self.h))
                }
                Phase::GrowAndRestart => self.restart(self.controller.grow(self.h)),
            };
            if next != self.phase {
                log::trace!("{:?} -> {:?} at x = {}", self.phase, next, self.run.t);
            }
            self.phase = next;
        }
    }

    /// Takes one step with the one-step method. Returns true once the end point is reached.
    fn startup_step(&mut self) -> Result<bool, IntegrationError> {
        let previous = self.h;
        let attempt = controlled_trial(&mut self.run, &self.controller, &mut self.h, false)?;
        let t_new = if attempt.last {
            self.run.span.end
        } else {
            self.run.t + attempt.h
        };
        self.run.accept(t_new)?;
        self.run.stats.startup_steps += 1;
        self.run.emit(attempt.last)?;

        if self.h == previous {
            self.equal_steps += 1;
        } else {
            self.equal_steps = 1;
        }
        Ok(attempt.last)
    }

    /// Discards the candidate and starts building a new history with step `h` from the last
    /// accepted point.
    fn restart(&mut self, h: f64) -> Phase {
        self.run.ctx.rollback();
        self.h = h;
        self.resized = true;
        self.equal_steps = 0;
        self.run.stats.restarts += 1;
        Phase::Startup
    }
}
