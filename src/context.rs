//! Everything one run operates on: the variable table, the print queue and the evaluator.

use crate::code::Code;
use crate::evaluator::{ConsistencyError, Evaluator};
use crate::ode_shared::IntegrationError;
use crate::output::{PrintRequest, PrintSpec, Selector};
use crate::variable::{History, VarId, VariableTable};

/// State shared by the directive loop and the integrators.
pub struct IntegrationContext {
    pub table: VariableTable,
    pub print: PrintSpec,
    evaluator: Evaluator,
    independent: Option<VarId>,
    /// Variable whose expression is being evaluated, for diagnostics.
    cursor: Option<VarId>,
}

impl Default for IntegrationContext {
    fn default() -> Self {
        IntegrationContext::new()
    }
}

impl IntegrationContext {
    pub fn new() -> Self {
        IntegrationContext {
            table: VariableTable::new(),
            print: PrintSpec::default(),
            evaluator: Evaluator::new(),
            independent: None,
            cursor: None,
        }
    }

    /// Variable being evaluated when the last evaluation started.
    pub fn cursor(&self) -> Option<VarId> {
        self.cursor
    }

    /// The independent variable, once the table has been validated.
    pub fn independent(&self) -> Option<VarId> {
        self.independent
    }

    /// Current value of the independent variable.
    pub fn time(&self) -> f64 {
        self.independent.map_or(0.0, |id| self.table[id].value)
    }

    /// Evaluates `code` on behalf of `var`, e.g. for an assignment.
    pub fn evaluate(&mut self, var: VarId, code: &Code) -> Result<f64, IntegrationError> {
        self.cursor = Some(var);
        self.evaluator
            .evaluate(code, &self.table)
            .map_err(|err| IntegrationError::from_eval(self.table[var].name(), err))
    }

    /// Prepares a run starting at `t`: validates the table, seeds every history from the
    /// current values and synthesizes the print columns if none were requested.
    pub fn begin(&mut self, t: f64) -> Result<VarId, IntegrationError> {
        let independent = self.table.validate()?;
        self.independent = Some(independent);
        self.table[independent].value = t;
        for var in self.table.variables_mut() {
            var.seed();
        }
        if !self.print.explicit {
            self.print.columns = self
                .table
                .ids()
                .iter()
                .map(|&var| PrintRequest {
                    var,
                    selector: Selector::Value,
                })
                .collect();
        }
        Ok(independent)
    }

    /// Evaluates every dependent variable's equation at abscissa `t` and the current working
    /// values, storing the results as derivatives. Only the derivative slots change.
    pub fn field(&mut self, t: f64) -> Result<(), IntegrationError> {
        let independent = self
            .independent
            .ok_or(ConsistencyError::NoIndependentVariable)?;
        self.table[independent].value = t;

        for i in 0..self.table.len() {
            let id = VarId(i);
            if self.table[id].is_independent() {
                continue;
            }
            self.cursor = Some(id);
            let result = match &self.table[id].code {
                Some(code) => self.evaluator.evaluate(code, &self.table),
                None => Ok(0.0),
            };
            match result {
                Ok(prime) => self.table[id].prime = prime,
                Err(err) => {
                    return Err(IntegrationError::from_eval(self.table[id].name(), err));
                }
            }
        }
        Ok(())
    }

    /// Restores every variable to the last accepted state.
    pub fn rollback(&mut self) {
        for var in self.table.variables_mut() {
            var.rollback();
        }
    }

    /// Clears the stage workspace and stores the derivative at the accepted state as stage 0.
    pub(crate) fn start_stages(&mut self) {
        for var in self.table.dependents_mut() {
            var.stage = History::zeros();
            var.stage[0] = var.pri[0];
        }
    }

    /// Stores the latest derivatives as stage `s`.
    pub(crate) fn record_stage(&mut self, s: usize) {
        for var in self.table.dependents_mut() {
            var.stage[s] = var.prime;
        }
    }

    /// Sets every working value to `val[0] + h * (stage . weights)`.
    pub(crate) fn advance_by_stages(&mut self, h: f64, weights: &History) {
        for var in self.table.dependents_mut() {
            var.value = var.val[0] + h * var.stage.dot(weights);
        }
    }

    /// Keeps the working values as the lower-order predictor.
    pub(crate) fn store_predictor(&mut self) {
        for var in self.table.dependents_mut() {
            var.pred = var.value;
        }
    }

    /// Estimates the trial errors from the working values and the stored predictor.
    pub(crate) fn estimate_errors(&mut self) {
        for var in self.table.dependents_mut() {
            let pred = var.pred;
            var.estimate(pred);
        }
    }

    /// Sets every working value to `val[0] + h * (pri . weights)`, i.e. a multistep formula
    /// over the accepted derivative history.
    pub(crate) fn advance_by_history(&mut self, h: f64, weights: &History) {
        for var in self.table.dependents_mut() {
            var.value = var.val[0] + h * var.pri.dot(weights);
        }
    }
}
