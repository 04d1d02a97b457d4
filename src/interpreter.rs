//! Executes the directives produced by the front end against one integration context.

use crate::code::Code;
use crate::config::IntegrationConfig;
use crate::context::IntegrationContext;
use crate::ode_shared::{IntegrationError, Observer, Stats};
use crate::output::PrintSpec;
use crate::session::IntegrationSession;
use crate::variable::VarId;

/// One statement of an input program.
#[derive(Debug, Clone)]
pub enum Directive {
    /// Evaluates `code` and stores it as the initial value of `var`.
    Assign { var: VarId, code: Code },
    /// Makes `code` the right-hand side of `var`'s differential equation.
    Equation { var: VarId, code: Code },
    /// Replaces the print queue.
    Print(PrintSpec),
    /// Integrates from `start` to `stop`. Without a size the default step is used.
    Step {
        start: f64,
        stop: f64,
        size: Option<f64>,
    },
}

pub struct Interpreter<O: Observer> {
    pub ctx: IntegrationContext,
    pub config: IntegrationConfig,
    observer: O,
}

impl<O: Observer> Interpreter<O> {
    pub fn new(config: IntegrationConfig, observer: O) -> Self {
        Interpreter {
            ctx: IntegrationContext::new(),
            config,
            observer,
        }
    }

    /// Handle of the variable called `name`, declaring it on first use.
    pub fn var(&mut self, name: &str) -> VarId {
        self.ctx.table.intern(name)
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Executes one directive. Returns the statistics when it was an integration.
    pub fn execute(&mut self, directive: Directive) -> Result<Option<Stats>, IntegrationError> {
        match directive {
            Directive::Assign { var, code } => {
                let value = self.ctx.evaluate(var, &code)?;
                self.ctx.table[var].set_value(value);
                Ok(None)
            }
            Directive::Equation { var, code } => {
                self.ctx.table[var].set_equation(code);
                Ok(None)
            }
            Directive::Print(spec) => {
                self.ctx.print = spec;
                Ok(None)
            }
            Directive::Step { start, stop, size } => {
                let session =
                    IntegrationSession::new(&self.config, &self.ctx.print, start, stop, size);
                session.run(&mut self.ctx, &mut self.observer).map(Some)
            }
        }
    }

    /// Executes every directive in turn.
    ///
    /// A failed directive is reported and skipped; the recoverable failures are returned.
    /// A fatal error stops the program and is returned as the error.
    pub fn run<I>(&mut self, directives: I) -> Result<Vec<IntegrationError>, IntegrationError>
    where
        I: IntoIterator<Item = Directive>,
    {
        let mut failures = Vec::new();
        for directive in directives {
            match self.execute(directive) {
                Ok(_) => {}
                Err(err) if err.is_fatal() => {
                    log::error!("{}", err);
                    return Err(err);
                }
                Err(err) => {
                    log::error!("{}", err);
                    failures.push(err);
                }
            }
        }
        Ok(failures)
    }
}
