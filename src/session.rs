//! One `step` request: picks the integrator and runs it over the span.

use crate::adams::AdamsMoulton;
use crate::adams_adaptive::AdaptiveAdamsMoulton;
use crate::config::{Algorithm, IntegrationConfig};
use crate::context::IntegrationContext;
use crate::controller::Controller;
use crate::euler::Euler;
use crate::ode_shared::{IntegrationError, Observer, Span, Stats};
use crate::output::PrintSpec;
use crate::rk4::Rk4;
use crate::rkf45::Rkf45;

/// Integrator selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Euler,
    Rk4,
    /// Runge-Kutta-Fehlberg, with or without step size control.
    Rkf45 { controlled: bool },
    AdamsMoulton,
    AdaptiveAdamsMoulton,
}

impl Method {
    /// Picks the integrator for `config`. Without error control the Runge-Kutta-Fehlberg
    /// family falls back to the cheaper RK4 unless error estimates are wanted.
    pub fn select(config: &IntegrationConfig, report_errors: bool) -> Method {
        let adaptive = config.is_adaptive();
        match config.algorithm {
            Algorithm::Euler => Method::Euler,
            Algorithm::RungeKuttaFehlberg if adaptive => Method::Rkf45 { controlled: true },
            Algorithm::RungeKuttaFehlberg if report_errors => Method::Rkf45 { controlled: false },
            Algorithm::RungeKuttaFehlberg => Method::Rk4,
            Algorithm::AdamsMoulton if adaptive => Method::AdaptiveAdamsMoulton,
            Algorithm::AdamsMoulton => Method::AdamsMoulton,
        }
    }

    pub fn is_adaptive(self) -> bool {
        matches!(
            self,
            Method::Rkf45 { controlled: true } | Method::AdaptiveAdamsMoulton
        )
    }
}

/// Settings of one integration over `[start, stop]`.
pub struct IntegrationSession {
    pub span: Span,
    pub method: Method,
    controller: Controller,
}

impl IntegrationSession {
    /// Prepares a run. Without an explicit `size` the span is divided into a default number
    /// of steps; adaptive methods start from that step brought within the step bounds.
    pub fn new(
        config: &IntegrationConfig,
        print: &PrintSpec,
        start: f64,
        stop: f64,
        size: Option<f64>,
    ) -> Self {
        let controller = Controller::from_config(config, (stop - start).abs());
        let method = Method::select(config, config.report_errors || print.reports_errors());
        let mut span = Span::new(start, stop, size.unwrap_or(0.0));
        if method.is_adaptive() && !span.is_empty() {
            span.step = controller.clamp(span.step);
        }
        IntegrationSession {
            span,
            method,
            controller,
        }
    }

    /// Runs the selected integrator. On failure the variable table holds the last accepted
    /// state.
    pub fn run<O: Observer>(
        self,
        ctx: &mut IntegrationContext,
        observer: &mut O,
    ) -> Result<Stats, IntegrationError> {
        log::debug!("{:?} from {} to {}", self.method, self.span.start, self.span.end);
        let stats = match self.method {
            Method::Euler => Euler::new(ctx, observer, self.span).integrate(),
            Method::Rk4 => Rk4::new(ctx, observer, self.span).integrate(),
            Method::Rkf45 { controlled: true } => {
                Rkf45::new(ctx, observer, self.span, self.controller).integrate()
            }
            Method::Rkf45 { controlled: false } => {
                Rkf45::uncontrolled(ctx, observer, self.span, self.controller).integrate()
            }
            Method::AdamsMoulton => AdamsMoulton::new(ctx, observer, self.span).integrate(),
            Method::AdaptiveAdamsMoulton => {
                AdaptiveAdamsMoulton::new(ctx, observer, self.span, self.controller).integrate()
            }
        }?;
        log::debug!("{:?} finished\n{}", self.method, stats);
        Ok(stats)
    }
}
