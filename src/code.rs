//! Compiled expression code.
//!
//! The parser of the declarative language lowers every expression to a postfix list of [`Op`]s.
//! A [`Code`] list is immutable once built and is owned by the variable whose equation it is,
//! except for the two shared constants [`ZERO`] and [`ONE`] used as default equations.

use crate::constants::STACK_DEPTH;
use crate::evaluator::ConsistencyError;
use crate::functions::{Special1, Special2, Special3, Transcendental};
use crate::variable::VarId;
use std::borrow::Cow;

/// One instruction of the evaluator's stack machine.
#[derive(Debug, Clone, Copy)]
pub enum Op {
    /// Pushes a constant.
    Const(f64),
    /// Pushes the current value of a variable.
    Load(VarId),
    /// Pops `b`, `a`, pushes `a + b`.
    Add,
    /// Pops `b`, `a`, pushes `a - b`.
    Sub,
    /// Pops `b`, `a`, pushes `a * b`.
    Mul,
    /// Pops `b`, `a`, pushes `a / b`.
    Div,
    /// Pops `b`, `a`, pushes `a ^ b`.
    Pow,
    /// Pops `a`, pushes `-a`.
    Neg,
    /// Pops `a`, pushes `f(a)`.
    Call(Transcendental),
    Special1(Special1),
    Special2(Special2),
    Special3(Special3),
}

impl Op {
    /// Net change of the stack depth caused by the instruction.
    pub(crate) fn stack_effect(&self) -> isize {
        match self {
            Op::Const(_) | Op::Load(_) => 1,
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow | Op::Special2(_) => -1,
            Op::Neg | Op::Call(_) | Op::Special1(_) => 0,
            Op::Special3(_) => -2,
        }
    }
}

/// An immutable postfix instruction list.
#[derive(Debug, Clone)]
pub struct Code {
    ops: Cow<'static, [Op]>,
}

/// Default equation of a dependent variable without one.
pub static ZERO: Code = Code {
    ops: Cow::Borrowed(&[Op::Const(0.0)]),
};

/// Equation of the independent variable.
pub static ONE: Code = Code {
    ops: Cow::Borrowed(&[Op::Const(1.0)]),
};

impl Code {
    pub fn new(ops: Vec<Op>) -> Self {
        Code {
            ops: Cow::Owned(ops),
        }
    }

    pub fn constant(value: f64) -> Self {
        Code::new(vec![Op::Const(value)])
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// True when the code reads no variable.
    pub fn is_constant(&self) -> bool {
        !self.ops.iter().any(|op| matches!(op, Op::Load(_)))
    }

    /// Variables the code reads, in instruction order (with repetitions).
    fn loads(&self) -> impl Iterator<Item = VarId> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Op::Load(id) => Some(*id),
            _ => None,
        })
    }

    /// Deepest stack reached while running the code.
    pub fn max_depth(&self) -> Result<usize, ConsistencyError> {
        let mut depth: isize = 0;
        let mut max = 0;
        for op in self.ops.iter() {
            let needed = match op {
                Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow | Op::Special2(_) => 2,
                Op::Neg | Op::Call(_) | Op::Special1(_) => 1,
                Op::Special3(_) => 3,
                Op::Const(_) | Op::Load(_) => 0,
            };
            if depth < needed {
                return Err(ConsistencyError::StackUnderflow);
            }
            depth += op.stack_effect();
            max = max.max(depth);
        }
        match depth {
            1 => Ok(max as usize),
            _ => Err(ConsistencyError::UnbalancedStack {
                depth: depth as usize,
            }),
        }
    }

    /// Checks that the code runs within the evaluator's stack and reads only variables of a
    /// table holding `variables` entries.
    pub fn check(&self, variables: usize) -> Result<(), ConsistencyError> {
        if let Some(id) = self.loads().find(|id| id.0 >= variables) {
            return Err(ConsistencyError::UnknownVariable { index: id.0 });
        }
        if self.max_depth()? > STACK_DEPTH {
            return Err(ConsistencyError::StackOverflow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons_are_constant() {
        assert!(ZERO.is_constant());
        assert!(ONE.is_constant());
        assert_eq!(ONE.max_depth(), Ok(1));
    }

    #[test]
    fn test_max_depth() {
        let y = VarId(1);
        // (y + 2) * (y - 3)
        let code = Code::new(vec![
            Op::Load(y),
            Op::Const(2.0),
            Op::Add,
            Op::Load(y),
            Op::Const(3.0),
            Op::Sub,
            Op::Mul,
        ]);
        assert_eq!(code.max_depth(), Ok(3));
        assert!(!code.is_constant());
        assert_eq!(code.loads().count(), 2);

        let broken = Code::new(vec![Op::Const(1.0), Op::Add]);
        assert_eq!(broken.max_depth(), Err(ConsistencyError::StackUnderflow));
        let unbalanced = Code::new(vec![Op::Const(1.0), Op::Const(2.0)]);
        assert_eq!(
            unbalanced.max_depth(),
            Err(ConsistencyError::UnbalancedStack { depth: 2 })
        );
    }

    #[test]
    fn test_check() {
        let code = Code::new(vec![Op::Load(VarId(0)), Op::Load(VarId(1)), Op::Add]);
        assert_eq!(code.check(2), Ok(()));
        assert_eq!(
            code.check(1),
            Err(ConsistencyError::UnknownVariable { index: 1 })
        );

        let mut deep = vec![Op::Const(1.0); STACK_DEPTH + 1];
        deep.extend(vec![Op::Add; STACK_DEPTH]);
        let deep = Code::new(deep);
        assert_eq!(deep.max_depth(), Ok(STACK_DEPTH + 1));
        assert_eq!(deep.check(0), Err(ConsistencyError::StackOverflow));
    }
}
