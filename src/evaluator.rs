//! Stack machine reducing compiled [`Code`] to a value.

use crate::code::{Code, Op};
use crate::constants::STACK_DEPTH;
use crate::functions::{power, DomainError};
use crate::variable::VariableTable;
use thiserror::Error;

/// Internal-consistency faults. These indicate malformed code or a corrupted variable table
/// rather than a problem with the user's equations, and abort the whole process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyError {
    #[error("evaluator stack overflow")]
    StackOverflow,
    #[error("evaluator stack underflow")]
    StackUnderflow,
    #[error("expression left {depth} values on the stack")]
    UnbalancedStack { depth: usize },
    #[error("expression refers to unknown variable #{index}")]
    UnknownVariable { index: usize },
    #[error("more than one independent variable: {}", .names.join(", "))]
    MultipleIndependent { names: Vec<String> },
    #[error("no independent variable")]
    NoIndependentVariable,
}

/// Anything that can go wrong while evaluating one expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

/// Fixed-depth value stack.
///
/// The evaluator holds no state between calls besides its scratch stack, so one instance is
/// reused for every expression of a run.
pub struct Evaluator {
    stack: [f64; STACK_DEPTH],
    depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            stack: [0.0; STACK_DEPTH],
            depth: 0,
        }
    }

    fn push(&mut self, value: f64) -> Result<(), ConsistencyError> {
        if self.depth == STACK_DEPTH {
            return Err(ConsistencyError::StackOverflow);
        }
        self.stack[self.depth] = value;
        self.depth += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<f64, ConsistencyError> {
        if self.depth == 0 {
            return Err(ConsistencyError::StackUnderflow);
        }
        self.depth -= 1;
        Ok(self.stack[self.depth])
    }

    /// Evaluates `code` against the current values of `table`.
    pub fn evaluate(&mut self, code: &Code, table: &VariableTable) -> Result<f64, EvalError> {
        self.depth = 0;

        for op in code.ops() {
            let value = match *op {
                Op::Const(c) => c,
                Op::Load(id) => match table.get(id) {
                    Some(var) => var.value,
                    None => return Err(ConsistencyError::UnknownVariable { index: id.0 }.into()),
                },
                Op::Add => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    finite(a + b, "addition")?
                }
                Op::Sub => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    finite(a - b, "subtraction")?
                }
                Op::Mul => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    finite(a * b, "multiplication")?
                }
                Op::Div => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    if b == 0.0 {
                        return Err(DomainError::DivisionByZero.into());
                    }
                    finite(a / b, "division")?
                }
                Op::Pow => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    finite(power(a, b)?, "power")?
                }
                Op::Neg => -self.pop()?,
                Op::Call(f) => {
                    let a = self.pop()?;
                    f.apply(a)?
                }
                Op::Special1(s) => {
                    let a = self.pop()?;
                    finite((s.f)(a)?, s.name)?
                }
                Op::Special2(s) => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    finite((s.f)(a, b)?, s.name)?
                }
                Op::Special3(s) => {
                    let c = self.pop()?;
                    let b = self.pop()?;
                    let a = self.pop()?;
                    finite((s.f)(a, b, c)?, s.name)?
                }
            };
            self.push(value)?;
        }

        let result = self.pop()?;
        if self.depth != 0 {
            return Err(ConsistencyError::UnbalancedStack {
                depth: self.depth + 1,
            }
            .into());
        }
        // Loaded values are not checked on the way in.
        Ok(finite(result, "evaluation")?)
    }
}

fn finite(value: f64, operation: &'static str) -> Result<f64, DomainError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::NotFinite { operation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{Special1, Special2, Transcendental};
    use crate::variable::{VarId, VariableTable};

    fn table_with(value: f64) -> (VariableTable, VarId) {
        let mut table = VariableTable::new();
        let y = table.intern("y");
        table[y].value = value;
        (table, y)
    }

    fn halve(x: f64) -> Result<f64, DomainError> {
        Ok(x / 2.0)
    }

    fn hypot(x: f64, y: f64) -> Result<f64, DomainError> {
        Ok(x.hypot(y))
    }

    fn diverges(_: f64) -> Result<f64, DomainError> {
        Err(DomainError::NoConvergence { function: "diverges" })
    }

    #[test]
    fn test_arithmetic() {
        let (table, y) = table_with(3.0);
        // 2 * y ^ 2 - y / 4
        let code = Code::new(vec![
            Op::Const(2.0),
            Op::Load(y),
            Op::Const(2.0),
            Op::Pow,
            Op::Mul,
            Op::Load(y),
            Op::Const(4.0),
            Op::Div,
            Op::Sub,
        ]);
        let value = Evaluator::new().evaluate(&code, &table).unwrap();
        assert!((value - 17.25).abs() < 1.0E-12);
    }

    #[test]
    fn test_constant_code_ignores_table() {
        let code = Code::new(vec![
            Op::Const(0.5),
            Op::Call(Transcendental::Sin),
            Op::Const(3.0),
            Op::Mul,
            Op::Neg,
        ]);
        let mut evaluator = Evaluator::new();
        let (first, _) = table_with(1.0);
        let (second, _) = table_with(-1.0E6);
        let a = evaluator.evaluate(&code, &first).unwrap();
        let b = evaluator.evaluate(&code, &second).unwrap();
        let c = evaluator.evaluate(&code, &VariableTable::new()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_special_functions() {
        let (table, y) = table_with(4.0);
        let code = Code::new(vec![
            Op::Load(y),
            Op::Special1(Special1 { name: "halve", f: halve }),
            Op::Const(1.5),
            Op::Special2(Special2 { name: "hypot", f: hypot }),
        ]);
        let value = Evaluator::new().evaluate(&code, &table).unwrap();
        assert!((value - 2.5).abs() < 1.0E-12);

        let failing = Code::new(vec![
            Op::Load(y),
            Op::Special1(Special1 {
                name: "diverges",
                f: diverges,
            }),
        ]);
        assert_eq!(
            Evaluator::new().evaluate(&failing, &table),
            Err(EvalError::Domain(DomainError::NoConvergence {
                function: "diverges"
            }))
        );
    }

    #[test]
    fn test_domain_failures() {
        let (table, y) = table_with(-2.0);
        let mut evaluator = Evaluator::new();
        let ln = Code::new(vec![Op::Load(y), Op::Call(Transcendental::Ln)]);
        assert!(matches!(
            evaluator.evaluate(&ln, &table),
            Err(EvalError::Domain(DomainError::OutOfDomain { function: "ln" }))
        ));
        let root = Code::new(vec![Op::Load(y), Op::Const(0.5), Op::Pow]);
        assert!(matches!(
            evaluator.evaluate(&root, &table),
            Err(EvalError::Domain(DomainError::IllegalPower { .. }))
        ));
        let div = Code::new(vec![Op::Const(1.0), Op::Const(0.0), Op::Div]);
        assert_eq!(
            evaluator.evaluate(&div, &table),
            Err(EvalError::Domain(DomainError::DivisionByZero))
        );
    }

    #[test]
    fn test_nan_value_is_rejected() {
        let (table, y) = table_with(f64::NAN);
        let code = Code::new(vec![Op::Load(y)]);
        assert!(matches!(
            Evaluator::new().evaluate(&code, &table),
            Err(EvalError::Domain(DomainError::NotFinite { .. }))
        ));
    }

    #[test]
    fn test_stack_faults() {
        let table = VariableTable::new();
        let mut evaluator = Evaluator::new();
        let underflow = Code::new(vec![Op::Const(1.0), Op::Mul]);
        assert_eq!(
            evaluator.evaluate(&underflow, &table),
            Err(EvalError::Consistency(ConsistencyError::StackUnderflow))
        );

        let overflow = Code::new(vec![Op::Const(1.0); STACK_DEPTH + 1]);
        assert_eq!(
            evaluator.evaluate(&overflow, &table),
            Err(EvalError::Consistency(ConsistencyError::StackOverflow))
        );

        let unbalanced = Code::new(vec![Op::Const(1.0), Op::Const(2.0)]);
        assert_eq!(
            evaluator.evaluate(&unbalanced, &table),
            Err(EvalError::Consistency(ConsistencyError::UnbalancedStack {
                depth: 2
            }))
        );

        let unknown = Code::new(vec![Op::Load(VarId(7))]);
        assert_eq!(
            evaluator.evaluate(&unknown, &table),
            Err(EvalError::Consistency(ConsistencyError::UnknownVariable {
                index: 7
            }))
        );
    }
}
