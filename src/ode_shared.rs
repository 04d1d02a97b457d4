//! Shared traits and structures for the integrators.

use crate::constants::step::DEFAULT_DIVISIONS;
use crate::context::IntegrationContext;
use crate::evaluator::{ConsistencyError, EvalError};
use crate::functions::DomainError;
use num_traits::Float;
use std::fmt;
use thiserror::Error;

/// Output callback, invoked once for every emitted point of a run.
pub trait Observer {
    /// Called with the variable table holding the newly accepted state.
    fn observe(&mut self, ctx: &IntegrationContext) -> Result<(), IntegrationError>;
}

impl<F> Observer for F
where
    F: FnMut(&IntegrationContext) -> Result<(), IntegrationError>,
{
    fn observe(&mut self, ctx: &IntegrationContext) -> Result<(), IntegrationError> {
        self(ctx)
    }
}

/// Enumeration of the errors that may arise during integration.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("{variable}: {source}")]
    ArithmeticDomain {
        variable: String,
        #[source]
        source: DomainError,
    },
    #[error("Stopped at x = {x}. Error exceeds bounds at minimum step size.")]
    StepSizeUnderflow { x: f64 },
    #[error("Stopped at x = {x}. Step size below floating-point resolution.")]
    DegenerateStep { x: f64 },
    #[error("internal error: {0}")]
    Consistency(#[from] ConsistencyError),
    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

impl IntegrationError {
    /// Fatal errors end the whole process; the others only end the current run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IntegrationError::Consistency(_) | IntegrationError::Output(_)
        )
    }

    pub(crate) fn from_eval(variable: &str, err: EvalError) -> Self {
        match err {
            EvalError::Domain(source) => IntegrationError::ArithmeticDomain {
                variable: variable.to_string(),
                source,
            },
            EvalError::Consistency(err) => IntegrationError::Consistency(err),
        }
    }
}

/// Contains some statistics of the integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub num_eval: u32,
    pub accepted_steps: u32,
    pub rejected_steps: u32,
    /// Steps taken by a one-step method to build up multistep history.
    pub startup_steps: u32,
    /// Restarts of the adaptive Adams-Moulton method after a step size change.
    pub restarts: u32,
}

impl Stats {
    pub(crate) fn new() -> Stats {
        Stats::default()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of function evaluations: {}", self.num_eval)?;
        writeln!(f, "Number of accepted steps: {}", self.accepted_steps)?;
        writeln!(f, "Number of rejected steps: {}", self.rejected_steps)?;
        writeln!(f, "Number of startup steps: {}", self.startup_steps)?;
        write!(f, "Number of restarts: {}", self.restarts)
    }
}

/// Interval of the independent variable covered by one run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub start: f64,
    pub end: f64,
    /// Signed step, consistent with the direction from `start` to `end`.
    pub step: f64,
}

impl Span {
    /// Span from `start` to `end`. A zero `step` divides the span into the default number of
    /// steps.
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        let step = if start == end {
            0.0
        } else if step == 0.0 {
            (end - start) / DEFAULT_DIVISIONS
        } else {
            sign(step, end - start)
        };
        Span { start, end, step }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn direction(&self) -> f64 {
        sign(1.0, self.end - self.start)
    }

    /// Fixed-step termination: true once `t` is within half a step of the end.
    pub fn reached(&self, t: f64) -> bool {
        (self.end - t) * self.direction() <= 0.5 * self.step.abs()
    }
}

/// State shared by every integrator during one run: the context, the observer, the abscissa
/// of the last accepted step and the statistics.
pub(crate) struct Run<'a, O: Observer> {
    pub(crate) ctx: &'a mut IntegrationContext,
    observer: &'a mut O,
    pub(crate) span: Span,
    pub(crate) t: f64,
    pub(crate) stats: Stats,
}

impl<'a, O: Observer> Run<'a, O> {
    pub(crate) fn new(ctx: &'a mut IntegrationContext, observer: &'a mut O, span: Span) -> Self {
        Run {
            ctx,
            observer,
            t: span.start,
            span,
            stats: Stats::new(),
        }
    }

    /// Validates the table and seeds every history at the start of the span. Nothing needs
    /// rolling back when this fails.
    pub(crate) fn begin(&mut self) -> Result<(), IntegrationError> {
        self.ctx.begin(self.span.start)?;
        self.t = self.span.start;
        log::debug!(
            "integrating from {} to {} with step {}",
            self.span.start,
            self.span.end,
            self.span.step
        );
        Ok(())
    }

    /// Ends the run: on failure every variable goes back to the last accepted state.
    pub(crate) fn finish(
        &mut self,
        result: Result<(), IntegrationError>,
    ) -> Result<Stats, IntegrationError> {
        match result {
            Ok(()) => Ok(self.stats),
            Err(err) => {
                self.ctx.rollback();
                Err(err)
            }
        }
    }

    /// Evaluates the field at the start point and records it as the current derivative.
    pub(crate) fn start(&mut self) -> Result<(), IntegrationError> {
        self.field(self.t)?;
        for var in self.ctx.table.variables_mut() {
            var.pri[0] = var.prime;
        }
        Ok(())
    }

    pub(crate) fn field(&mut self, t: f64) -> Result<(), IntegrationError> {
        self.stats.num_eval += 1;
        self.ctx.field(t)
    }

    /// Accepts the working values as the state at `t`: evaluates the field there and shifts
    /// the history.
    pub(crate) fn accept(&mut self, t: f64) -> Result<(), IntegrationError> {
        self.field(t)?;
        for var in self.ctx.table.variables_mut() {
            var.shift();
        }
        self.t = t;
        self.stats.accepted_steps += 1;
        Ok(())
    }

    /// Moves the accepted abscissa onto the end point when the remaining distance is below
    /// floating-point resolution, and emits the final row.
    pub(crate) fn snap_to_end(&mut self) -> Result<(), IntegrationError> {
        let end = self.span.end;
        if let Some(id) = self.ctx.independent() {
            let var = &mut self.ctx.table[id];
            var.value = end;
            var.val[0] = end;
        }
        self.t = end;
        self.emit(true)
    }

    /// Hands the current state to the observer, subject to the print stride and offset.
    pub(crate) fn emit(&mut self, last: bool) -> Result<(), IntegrationError> {
        let selected = last
            || self
                .ctx
                .print
                .selects(self.stats.accepted_steps, self.t, self.span.direction());
        if selected {
            self.observer.observe(&*self.ctx)?;
        }
        Ok(())
    }
}

/// `|a|` with the sign of `b`.
pub(crate) fn sign<F: Float>(a: F, b: F) -> F {
    if b > F::zero() {
        a.abs()
    } else {
        -a.abs()
    }
}
