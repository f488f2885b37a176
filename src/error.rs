//! The crate-level error type and the [`Diagnostic`] view over it used
//! by callers that want a flat, serializable description of a failure
//! rather than a `Result` to match on.

use crate::eval::EvalError;
use crate::expr::calculus::DifferentiationError;
use crate::expr::Expr;
use crate::scope::ScopeError;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
  #[error("{0}")]
  Eval(#[from] EvalError),
  #[error("{0}")]
  Differentiation(#[from] DifferentiationError),
  #[error("{0}")]
  Scope(#[from] ScopeError),
}

/// A flattened, serializable description of an [`Error`], per the
/// three-way classification the engine uses: a `"scope"` failure
/// happens before evaluation ever begins, a `"type"` failure means an
/// operand had the wrong shape, and everything else is `"runtime"`.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
  pub kind: &'static str,
  pub message: String,
  pub offending: Option<String>,
}

impl From<&Error> for Diagnostic {
  fn from(err: &Error) -> Self {
    match err {
      Error::Eval(e) => Diagnostic { kind: eval_kind(e), message: e.to_string(), offending: None },
      Error::Differentiation(e) => Diagnostic { kind: e.kind(), message: e.to_string(), offending: offending_of(e) },
      Error::Scope(e) => Diagnostic { kind: "scope", message: e.to_string(), offending: None },
    }
  }
}

fn eval_kind(e: &EvalError) -> &'static str {
  match e {
    EvalError::TypeMismatch { .. } => "type",
    EvalError::Differentiation(inner) => inner.kind(),
    _ => "runtime",
  }
}

fn offending_of(e: &DifferentiationError) -> Option<String> {
  match e {
    DifferentiationError::NonDifferentiable(expr)
    | DifferentiationError::TypeMismatch { offending: expr, .. }
    | DifferentiationError::ShapeError(expr) => Some(expr_to_string(expr)),
    _ => None,
  }
}

fn expr_to_string(expr: &Expr) -> String {
  expr.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::expr::var::Var;

  #[test]
  fn test_scope_error_diagnostic_kind() {
    let err: Error = ScopeError::Redefinition(Var::new("x").unwrap()).into();
    let diag = Diagnostic::from(&err);
    assert_eq!(diag.kind, "scope");
  }

  #[test]
  fn test_differentiation_error_diagnostic_carries_offending_expr() {
    let err: Error = DifferentiationError::NonDifferentiable(Expr::TrueLit).into();
    let diag = Diagnostic::from(&err);
    assert_eq!(diag.kind, "runtime");
    assert_eq!(diag.offending.as_deref(), Some("true"));
  }
}
