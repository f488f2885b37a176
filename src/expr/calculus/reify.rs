//! Lifting a runtime [`Val`] back into an [`Expr`].
//!
//! The product, quotient, and chain rules all work by synthesizing a
//! new expression tree out of the values and derivatives they've
//! already computed, then handing that tree to [`eval::eval`] to get
//! the final answer. `reify` is the half of that bridge that goes
//! value-to-expression; `eval` is the other half.

use crate::expr::Expr;
use crate::value::Val;

use super::DifferentiationError;

pub fn reify(v: Val) -> Result<Expr, DifferentiationError> {
  match v {
    Val::Int(n) => Ok(Expr::IntLit(n)),
    Val::Real(r) => Ok(Expr::RealLit(r)),
    Val::Bool(true) => Ok(Expr::TrueLit),
    Val::Bool(false) => Ok(Expr::FalseLit),
    Val::List(vs) => {
      let es = vs.into_iter().map(reify).collect::<Result<Vec<_>, _>>()?;
      Ok(Expr::ListLit(es))
    }
    // A lambda reifies by discarding its captured environment and
    // keeping only its syntax; whatever evaluates the resulting
    // expression will close back over its own `Γ`.
    Val::Lambda(l) => Ok(Expr::Lambda(l.params.clone(), Box::new(l.body.clone()))),
    Val::Matrix(_) => Err(DifferentiationError::UnreifiableValue("matrix")),
    Val::Void => Err(DifferentiationError::UnreifiableValue("void")),
  }
}
