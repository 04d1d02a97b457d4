//! # ODE engine
//! `ode_engine` integrates systems of ordinary differential equations given as compiled
//! expressions over a table of named variables, with fixed-step (Euler, Runge-Kutta 4,
//! Adams-Moulton 4) and adaptive (Runge-Kutta-Fehlberg 4(5), Adams-Moulton) methods.

// Declare modules
pub mod adams;
pub mod adams_adaptive;
pub mod butcher_tableau;
pub mod code;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod euler;
pub mod evaluator;
pub mod functions;
pub mod interpreter;
pub mod ode_shared;
pub mod output;
pub mod rk4;
pub mod rkf45;
pub mod session;
pub mod variable;

pub use adams::AdamsMoulton;
pub use adams_adaptive::AdaptiveAdamsMoulton;
pub use euler::Euler;
pub use rk4::Rk4;
pub use rkf45::Rkf45;

pub use code::{Code, Op};
pub use config::{Algorithm, Bound, IntegrationConfig, StepBounds};
pub use context::IntegrationContext;
pub use controller::Controller;
pub use interpreter::{Directive, Interpreter};
pub use ode_shared::{IntegrationError, Observer, Span, Stats};
pub use output::{PrintRequest, PrintSpec, Recorder, RowPrinter, Selector};
pub use session::{IntegrationSession, Method};
pub use variable::{VarId, Variable, VariableTable};
