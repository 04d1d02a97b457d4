//! The variable table: one entry per declared quantity.

use crate::code::{Code, ONE, ZERO};
use crate::constants::HISTORY_LEN;
use crate::evaluator::ConsistencyError;
use nalgebra::SVector;
use std::ops::{Index, IndexMut};

/// Bounded window of past states, index 0 being the current accepted one. Also used as the
/// stage-derivative workspace of the Runge-Kutta methods.
pub type History = SVector<f64, HISTORY_LEN>;

/// Stable handle of a variable. Handles are never invalidated: variables are only ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

/// Error estimates of one variable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErrorEstimates {
    /// Relative single-step error
    pub relative: f64,
    /// Absolute single-step error
    pub absolute: f64,
    /// Sum of the absolute errors of the accepted steps of the run
    pub accumulated: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub has_value: bool,
    pub has_equation: bool,
    pub independent: bool,
}

#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    /// Working value; equal to `val[0]` between steps, a stage value during one.
    pub value: f64,
    /// Derivative from the latest field evaluation.
    pub prime: f64,
    pub val: History,
    pub pri: History,
    /// Lower-order estimate of the candidate value.
    pub pred: f64,
    /// Estimates of the last accepted step.
    pub error: ErrorEstimates,
    /// Estimates of the step being attempted.
    pub trial: ErrorEstimates,
    pub stage: History,
    pub flags: Flags,
    pub code: Option<Code>,
}

impl Variable {
    fn new(name: &str) -> Self {
        Variable {
            name: name.to_string(),
            value: 0.0,
            prime: 0.0,
            val: History::zeros(),
            pri: History::zeros(),
            pred: 0.0,
            error: ErrorEstimates::default(),
            trial: ErrorEstimates::default(),
            stage: History::zeros(),
            flags: Flags::default(),
            code: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_independent(&self) -> bool {
        self.flags.independent
    }

    /// Sets the initial value.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
        self.flags.has_value = true;
    }

    /// Sets the governing equation.
    pub fn set_equation(&mut self, code: Code) {
        self.code = Some(code);
        self.flags.has_equation = true;
    }

    /// Starts a fresh history from the current value.
    pub(crate) fn seed(&mut self) {
        self.val = History::zeros();
        self.pri = History::zeros();
        self.stage = History::zeros();
        self.val[0] = self.value;
        self.pred = self.value;
        self.error = ErrorEstimates::default();
        self.trial = ErrorEstimates::default();
    }

    /// Pushes the working state onto the history and commits the trial estimates.
    pub(crate) fn shift(&mut self) {
        for i in (1..HISTORY_LEN).rev() {
            self.val[i] = self.val[i - 1];
            self.pri[i] = self.pri[i - 1];
        }
        self.val[0] = self.value;
        self.pri[0] = self.prime;
        self.error = self.trial;
    }

    /// Restores the last accepted state.
    pub(crate) fn rollback(&mut self) {
        self.value = self.val[0];
        self.prime = self.pri[0];
        self.pred = self.val[0];
        self.stage = History::zeros();
        self.trial = self.error;
    }

    /// Sets the trial estimates from the difference between the working value and a
    /// lower-order `reference`.
    pub(crate) fn estimate(&mut self, reference: f64) {
        self.record_error((self.value - reference).abs());
    }

    /// Sets the trial estimates from an absolute single-step error.
    pub(crate) fn record_error(&mut self, absolute: f64) {
        let relative = if self.value != 0.0 {
            absolute / self.value.abs()
        } else {
            absolute
        };
        self.trial = ErrorEstimates {
            relative,
            absolute,
            accumulated: self.error.accumulated + absolute,
        };
    }
}

/// Ordered collection of variables.
///
/// Variables are stored in creation order so that [`VarId`]s baked into compiled code stay
/// valid; the iteration order is kept separately and puts the independent variable first once
/// the table has been validated.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    vars: Vec<Variable>,
    order: Vec<VarId>,
}

impl VariableTable {
    pub fn new() -> Self {
        VariableTable {
            vars: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Returns the variable called `name`, creating it on first reference.
    pub fn intern(&mut self, name: &str) -> VarId {
        if let Some(id) = self.lookup(name) {
            return id;
        }
        let id = VarId(self.vars.len());
        self.vars.push(Variable::new(name));
        self.order.push(id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.vars.iter().position(|v| v.name == name).map(VarId)
    }

    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.vars.get(id.0)
    }

    pub fn get_mut(&mut self, id: VarId) -> Option<&mut Variable> {
        self.vars.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variable handles in table order.
    pub fn ids(&self) -> &[VarId] {
        &self.order
    }

    /// Variables in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.order.iter().map(move |id| &self.vars[id.0])
    }

    pub fn independent(&self) -> Option<VarId> {
        self.vars
            .iter()
            .position(|v| v.flags.independent)
            .map(VarId)
    }

    pub fn dependents(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.vars.iter().filter(|v| !v.flags.independent)
    }

    pub fn dependents_mut(&mut self) -> impl Iterator<Item = &mut Variable> + '_ {
        self.vars.iter_mut().filter(|v| !v.flags.independent)
    }

    pub(crate) fn variables_mut(&mut self) -> impl Iterator<Item = &mut Variable> + '_ {
        self.vars.iter_mut()
    }

    /// Prepares the table for a run.
    ///
    /// Finds the independent variable, moves it to the front and gives it the equation 1, then
    /// gives every dependent variable missing an equation the equation 0 and every one missing
    /// an initial value the value 0. Fails if an equation could not run on the evaluator.
    pub fn validate(&mut self) -> Result<VarId, ConsistencyError> {
        let candidates: Vec<VarId> = self
            .vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.flags.independent || !(v.flags.has_value || v.flags.has_equation))
            .map(|(i, _)| VarId(i))
            .collect();

        let independent = match candidates.len() {
            0 => {
                if self.lookup("t").is_some() {
                    return Err(ConsistencyError::NoIndependentVariable);
                }
                self.intern("t")
            }
            1 => candidates[0],
            _ => {
                return Err(ConsistencyError::MultipleIndependent {
                    names: candidates
                        .iter()
                        .map(|id| self.vars[id.0].name.clone())
                        .collect(),
                })
            }
        };

        for (i, var) in self.vars.iter_mut().enumerate() {
            if i == independent.0 {
                var.flags = Flags {
                    has_value: true,
                    has_equation: true,
                    independent: true,
                };
                var.code = Some(ONE.clone());
                var.prime = 1.0;
                continue;
            }
            if !var.flags.has_equation {
                var.set_equation(ZERO.clone());
            }
            if !var.flags.has_value {
                var.set_value(0.0);
            }
        }

        for code in self.vars.iter().filter_map(|var| var.code.as_ref()) {
            code.check(self.vars.len())?;
        }

        self.order.retain(|id| *id != independent);
        self.order.insert(0, independent);
        Ok(independent)
    }
}

impl Index<VarId> for VariableTable {
    type Output = Variable;

    fn index(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }
}

impl IndexMut<VarId> for VariableTable {
    fn index_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0]
    }
}
