//! Print requests and the observers that turn accepted steps into rows.

use crate::config::IntegrationConfig;
use crate::context::IntegrationContext;
use crate::ode_shared::{IntegrationError, Observer};
use crate::variable::{VarId, Variable};
use std::io::Write;

/// Quantity of a variable shown in one output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// `y`
    Value,
    /// `y'`
    Derivative,
    /// `y?`
    RelativeError,
    /// `y!`
    AbsoluteError,
    /// `y~`
    AccumulatedError,
}

impl Selector {
    /// Selector written as `suffix` after a variable name; `None` for a bare name.
    pub fn from_suffix(suffix: Option<char>) -> Option<Selector> {
        match suffix {
            None => Some(Selector::Value),
            Some('\'') => Some(Selector::Derivative),
            Some('?') => Some(Selector::RelativeError),
            Some('!') => Some(Selector::AbsoluteError),
            Some('~') => Some(Selector::AccumulatedError),
            Some(_) => None,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Selector::Value => "",
            Selector::Derivative => "'",
            Selector::RelativeError => "?",
            Selector::AbsoluteError => "!",
            Selector::AccumulatedError => "~",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            Selector::RelativeError | Selector::AbsoluteError | Selector::AccumulatedError
        )
    }

    pub fn read(self, var: &Variable) -> f64 {
        match self {
            Selector::Value => var.value,
            Selector::Derivative => var.prime,
            Selector::RelativeError => var.error.relative,
            Selector::AbsoluteError => var.error.absolute,
            Selector::AccumulatedError => var.error.accumulated,
        }
    }
}

/// One output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintRequest {
    pub var: VarId,
    pub selector: Selector,
}

/// Columns of an output row and the rules deciding which accepted steps produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintSpec {
    pub columns: Vec<PrintRequest>,
    /// Print every `every`-th accepted step.
    pub every: u32,
    /// Print nothing before the independent variable reaches this value.
    pub from: Option<f64>,
    /// False while the columns are synthesized rather than requested.
    pub explicit: bool,
}

impl Default for PrintSpec {
    fn default() -> Self {
        PrintSpec {
            columns: Vec::new(),
            every: 1,
            from: None,
            explicit: false,
        }
    }
}

impl PrintSpec {
    pub fn new(columns: Vec<PrintRequest>) -> Self {
        PrintSpec {
            columns,
            explicit: true,
            ..PrintSpec::default()
        }
    }

    pub fn every(mut self, every: u32) -> Self {
        self.every = every.max(1);
        self
    }

    pub fn starting_at(mut self, from: f64) -> Self {
        self.from = Some(from);
        self
    }

    /// Whether the state after `step` accepted steps, at abscissa `t`, is printed.
    pub fn selects(&self, step: u32, t: f64, direction: f64) -> bool {
        let reached = self.from.map_or(true, |from| (t - from) * direction >= 0.0);
        reached && step % self.every.max(1) == 0
    }

    pub fn reports_errors(&self) -> bool {
        self.columns.iter().any(|c| c.selector.is_error())
    }

    /// Values of the columns for the current state of the table.
    pub fn row(&self, ctx: &IntegrationContext) -> Vec<f64> {
        self.columns
            .iter()
            .map(|c| c.selector.read(&ctx.table[c.var]))
            .collect()
    }
}

/// Formats `value` with `precision` significant digits, like C's `%g`, or like `% .*e` when
/// `exponential` is set so that every column has the same width.
pub fn format_value(value: f64, precision: usize, exponential: bool) -> String {
    let precision = precision.max(1);
    if !value.is_finite() {
        return format!("{}", value);
    }
    // The exponent is taken after rounding: 999999.5 at six digits is 1e+06.
    let (mantissa, exponent) = scientific(value, precision);
    if exponential {
        let sign = if mantissa.starts_with('-') { "" } else { " " };
        return format!("{}{}e{}", sign, mantissa, exponent_suffix(exponent));
    }
    if exponent < -4 || exponent >= precision as i32 {
        format!("{}e{}", trim_fraction(&mantissa), exponent_suffix(exponent))
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// Rounded mantissa with `precision` significant digits, and its decimal exponent.
fn scientific(value: f64, precision: usize) -> (String, i32) {
    let s = format!("{:.*e}", precision - 1, value);
    match s.split_once('e') {
        Some((mantissa, exponent)) => (mantissa.to_string(), exponent.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

/// Signed exponent with at least two digits.
fn exponent_suffix(exponent: i32) -> String {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}{:02}", sign, exponent.abs())
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Writes one whitespace-separated line per emitted point.
pub struct RowPrinter<W: Write> {
    out: W,
    precision: usize,
    exponential: bool,
}

impl<W: Write> RowPrinter<W> {
    pub fn new(out: W, precision: usize, exponential: bool) -> Self {
        RowPrinter {
            out,
            precision,
            exponential,
        }
    }

    /// Printer using the number format of `config`.
    pub fn from_config(out: W, config: &IntegrationConfig) -> Self {
        RowPrinter::new(out, config.precision, config.exponential)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Observer for RowPrinter<W> {
    fn observe(&mut self, ctx: &IntegrationContext) -> Result<(), IntegrationError> {
        let line = ctx
            .print
            .row(ctx)
            .iter()
            .map(|v| format_value(*v, self.precision, self.exponential))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.out, "{}", line)?;
        Ok(())
    }
}

/// Keeps every emitted row in memory.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub rows: Vec<Vec<f64>>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder::default()
    }

    pub fn last(&self) -> Option<&Vec<f64>> {
        self.rows.last()
    }
}

impl Observer for Recorder {
    fn observe(&mut self, ctx: &IntegrationContext) -> Result<(), IntegrationError> {
        self.rows.push(ctx.print.row(ctx));
        Ok(())
    }
}
