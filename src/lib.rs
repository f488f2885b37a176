
// The #[non_exhaustive] attribute applies at the crate-level, and I
// want module-level restrictions, which are far stricter.
#![allow(clippy::manual_non_exhaustive)]

#![warn(clippy::derive_partial_eq_without_eq)]

pub mod env;
pub mod error;
pub mod eval;
pub mod expr;
pub mod matrix;
pub mod scope;
pub mod value;

use env::Env;
use error::Error;
use expr::var::Var;
use expr::Expr;
use value::Val;

/// Validates `expr`'s scoping, then computes `d(expr)/d(var)` under
/// `env`.
///
/// `env` must already carry both a value and a derivative for every
/// free name `expr` refers to; [`Env::seed_identity`] builds exactly
/// such an environment for the common case of differentiating with
/// respect to a single variable.
pub fn derivative(expr: &Expr, var: &Var, env: &Env) -> Result<Val, Error> {
  scope::validate_scope(expr, &mut scope::NameTrie::new())?;
  Ok(expr::calculus::differentiate(expr, var, env)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn var(s: &str) -> Var {
    Var::new(s).unwrap()
  }

  #[test]
  fn test_derivative_entry_point_rejects_bad_scope() {
    let x = var("x");
    let bad = Expr::Let(
      vec![
        expr::LetBinding::new(x.clone(), false, Expr::from(1)),
        expr::LetBinding::new(x.clone(), false, Expr::from(2)),
      ],
      Box::new(Expr::Var(x.clone())),
    );
    let env = Env::seed_identity(&x, std::iter::empty());
    assert!(derivative(&bad, &x, &env).is_err());
  }

  #[test]
  fn test_derivative_entry_point_product_rule() {
    let x = var("x");
    let e = Expr::mult(Expr::Var(x.clone()), Expr::Var(x.clone()));
    let env = Env::seed_identity(&x, [(x.clone(), Val::Int(3))]);
    assert_eq!(derivative(&e, &x, &env).unwrap(), Val::Int(6));
  }
}
