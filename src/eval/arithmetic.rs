//! Primitive arithmetic on [`Val`], with the evaluator's standard
//! `IntVal`/`RealVal` numeric promotion: two integers stay integers
//! under `+`, `-`, and `*`; any other numeric combination (and
//! division, always) promotes to a real.

use crate::value::Val;
use super::EvalError;

fn as_numeric_pair(a: &Val, b: &Val) -> Result<(f64, f64), EvalError> {
  let x = a.as_f64().ok_or_else(|| EvalError::TypeMismatch { expected: "numeric", actual: a.type_name() })?;
  let y = b.as_f64().ok_or_else(|| EvalError::TypeMismatch { expected: "numeric", actual: b.type_name() })?;
  Ok((x, y))
}

pub fn add(a: Val, b: Val) -> Result<Val, EvalError> {
  match (a, b) {
    (Val::Int(x), Val::Int(y)) => Ok(Val::Int(x + y)),
    (a, b) => {
      let (x, y) = as_numeric_pair(&a, &b)?;
      Ok(Val::Real(x + y))
    }
  }
}

pub fn sub(a: Val, b: Val) -> Result<Val, EvalError> {
  match (a, b) {
    (Val::Int(x), Val::Int(y)) => Ok(Val::Int(x - y)),
    (a, b) => {
      let (x, y) = as_numeric_pair(&a, &b)?;
      Ok(Val::Real(x - y))
    }
  }
}

pub fn mul(a: Val, b: Val) -> Result<Val, EvalError> {
  match (a, b) {
    (Val::Int(x), Val::Int(y)) => Ok(Val::Int(x * y)),
    (a, b) => {
      let (x, y) = as_numeric_pair(&a, &b)?;
      Ok(Val::Real(x * y))
    }
  }
}

/// Division always produces a real, matching the evaluator's native
/// handling of `/` (see spec §6): there is no attempt to detect
/// "evenly divides" and fall back to an integer result.
pub fn div(a: Val, b: Val) -> Result<Val, EvalError> {
  let (x, y) = as_numeric_pair(&a, &b)?;
  if y == 0.0 {
    return Err(EvalError::DivisionByZero);
  }
  Ok(Val::Real(x / y))
}

pub fn compare_pair(a: &Val, b: &Val) -> Result<(f64, f64), EvalError> {
  as_numeric_pair(a, b)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_int_add_stays_int() {
    assert_eq!(add(Val::Int(2), Val::Int(3)).unwrap(), Val::Int(5));
  }

  #[test]
  fn test_mixed_add_promotes_to_real() {
    assert_eq!(add(Val::Int(2), Val::Real(0.5)).unwrap(), Val::Real(2.5));
  }

  #[test]
  fn test_div_is_always_real() {
    assert_eq!(div(Val::Int(-2), Val::Int(4)).unwrap(), Val::Real(-0.5));
  }

  #[test]
  fn test_div_by_zero_fails() {
    assert!(matches!(div(Val::Int(1), Val::Int(0)), Err(EvalError::DivisionByZero)));
  }

  #[test]
  fn test_non_numeric_operand_fails() {
    assert!(add(Val::Bool(true), Val::Int(1)).is_err());
  }
}
