//! Functions callable from compiled expressions.
//!
//! The elementary transcendentals are evaluated here with explicit domain checks. The special
//! functions (Bessel, log-gamma, incomplete gamma/beta, error function and its inverse) are
//! supplied by the caller as plain function pointers; the engine only relies on their contract:
//! a pure function of one to three doubles returning a double or a [`DomainError`].

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Failures raised while evaluating an operation on a value outside its domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("argument of {function} out of domain")]
    OutOfDomain { function: &'static str },
    #[error("negative base {base} raised to non-integer power {exponent}")]
    IllegalPower { base: f64, exponent: f64 },
    #[error("division by zero")]
    DivisionByZero,
    #[error("{operation} produced a non-finite value")]
    NotFinite { operation: &'static str },
    #[error("{function} failed to converge")]
    NoConvergence { function: &'static str },
}

/// Unary transcendental functions built into the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transcendental {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Exp,
    Ln,
    Log10,
    Sqrt,
    Abs,
    Floor,
    Ceil,
}

impl Transcendental {
    /// Name as written in the declarative language.
    pub fn name(self) -> &'static str {
        match self {
            Transcendental::Sin => "sin",
            Transcendental::Cos => "cos",
            Transcendental::Tan => "tan",
            Transcendental::Asin => "asin",
            Transcendental::Acos => "acos",
            Transcendental::Atan => "atan",
            Transcendental::Sinh => "sinh",
            Transcendental::Cosh => "cosh",
            Transcendental::Tanh => "tanh",
            Transcendental::Asinh => "asinh",
            Transcendental::Acosh => "acosh",
            Transcendental::Atanh => "atanh",
            Transcendental::Exp => "exp",
            Transcendental::Ln => "ln",
            Transcendental::Log10 => "log",
            Transcendental::Sqrt => "sqrt",
            Transcendental::Abs => "abs",
            Transcendental::Floor => "floor",
            Transcendental::Ceil => "ceil",
        }
    }

    /// Applies the function, rejecting arguments outside its real domain.
    pub fn apply(self, x: f64) -> Result<f64, DomainError> {
        let out_of_domain = match self {
            Transcendental::Asin | Transcendental::Acos => x.abs() > 1.0,
            Transcendental::Acosh => x < 1.0,
            Transcendental::Atanh => x.abs() >= 1.0,
            Transcendental::Ln | Transcendental::Log10 => x <= 0.0,
            Transcendental::Sqrt => x < 0.0,
            _ => false,
        };
        if out_of_domain || x.is_nan() {
            return Err(DomainError::OutOfDomain {
                function: self.name(),
            });
        }

        let y = match self {
            Transcendental::Sin => x.sin(),
            Transcendental::Cos => x.cos(),
            Transcendental::Tan => x.tan(),
            Transcendental::Asin => x.asin(),
            Transcendental::Acos => x.acos(),
            Transcendental::Atan => x.atan(),
            Transcendental::Sinh => x.sinh(),
            Transcendental::Cosh => x.cosh(),
            Transcendental::Tanh => x.tanh(),
            Transcendental::Asinh => x.asinh(),
            Transcendental::Acosh => x.acosh(),
            Transcendental::Atanh => x.atanh(),
            Transcendental::Exp => x.exp(),
            Transcendental::Ln => x.ln(),
            Transcendental::Log10 => x.log10(),
            Transcendental::Sqrt => x.sqrt(),
            Transcendental::Abs => x.abs(),
            Transcendental::Floor => x.floor(),
            Transcendental::Ceil => x.ceil(),
        };
        if y.is_finite() {
            Ok(y)
        } else {
            Err(DomainError::NotFinite {
                operation: self.name(),
            })
        }
    }
}

impl fmt::Display for Transcendental {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transcendental {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let function = match s {
            "sin" => Transcendental::Sin,
            "cos" => Transcendental::Cos,
            "tan" => Transcendental::Tan,
            "asin" => Transcendental::Asin,
            "acos" => Transcendental::Acos,
            "atan" => Transcendental::Atan,
            "sinh" => Transcendental::Sinh,
            "cosh" => Transcendental::Cosh,
            "tanh" => Transcendental::Tanh,
            "asinh" => Transcendental::Asinh,
            "acosh" => Transcendental::Acosh,
            "atanh" => Transcendental::Atanh,
            "exp" => Transcendental::Exp,
            "ln" => Transcendental::Ln,
            "log" => Transcendental::Log10,
            "sqrt" => Transcendental::Sqrt,
            "abs" => Transcendental::Abs,
            "floor" => Transcendental::Floor,
            "ceil" => Transcendental::Ceil,
            _ => return Err(format!("Unknown function: {}", s)),
        };
        Ok(function)
    }
}

/// A special function of one argument, e.g. `j0` or `lgamma`.
#[derive(Debug, Clone, Copy)]
pub struct Special1 {
    pub name: &'static str,
    pub f: fn(f64) -> Result<f64, DomainError>,
}

/// A special function of two arguments, e.g. the incomplete gamma function.
#[derive(Debug, Clone, Copy)]
pub struct Special2 {
    pub name: &'static str,
    pub f: fn(f64, f64) -> Result<f64, DomainError>,
}

/// A special function of three arguments, e.g. the incomplete beta function.
#[derive(Debug, Clone, Copy)]
pub struct Special3 {
    pub name: &'static str,
    pub f: fn(f64, f64, f64) -> Result<f64, DomainError>,
}

/// `base ^ exponent` with the language's restrictions on negative bases.
pub fn power(base: f64, exponent: f64) -> Result<f64, DomainError> {
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(DomainError::IllegalPower { base, exponent });
    }
    if base == 0.0 && exponent < 0.0 {
        return Err(DomainError::DivisionByZero);
    }
    Ok(base.powf(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_checks() {
        assert!(Transcendental::Ln.apply(0.0).is_err());
        assert!(Transcendental::Sqrt.apply(-1.0).is_err());
        assert!(Transcendental::Asin.apply(1.5).is_err());
        assert!(Transcendental::Atanh.apply(1.0).is_err());
        assert!((Transcendental::Ln.apply(1.0).unwrap()).abs() < 1.0E-15);
        assert!((Transcendental::Acosh.apply(1.0).unwrap()).abs() < 1.0E-15);
    }

    #[test]
    fn test_exp_overflow_is_not_finite() {
        assert_eq!(
            Transcendental::Exp.apply(1000.0),
            Err(DomainError::NotFinite { operation: "exp" })
        );
    }

    #[test]
    fn test_power() {
        assert_eq!(power(-8.0, 2.0), Ok(64.0));
        assert!(matches!(
            power(-8.0, 1.0 / 3.0),
            Err(DomainError::IllegalPower { .. })
        ));
        assert_eq!(power(0.0, -1.0), Err(DomainError::DivisionByZero));
    }

    #[test]
    fn test_names_round_trip() {
        for f in [Transcendental::Sin, Transcendental::Log10, Transcendental::Ceil] {
            assert_eq!(f.name().parse::<Transcendental>(), Ok(f));
        }
        assert!("gamma".parse::<Transcendental>().is_err());
    }
}
