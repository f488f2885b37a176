//! The differentiation engine: `differentiate(e, x, Γ) → Result<Val, _>`.
//!
//! `differentiate` is a *partial* function over [`Expr`] — not every
//! node kind has a derivative, and the ones that don't (comparisons,
//! boolean connectives, `has`/`isa`, `norm`, `fold`) report
//! [`DifferentiationError::NonDifferentiable`] rather than panicking.
//! Where a rule needs the *value* of a subexpression (the product
//! rule needs both operands' values, not just their derivatives), it
//! calls into [`eval::eval`] directly; this is the "opaque trusted
//! dependency" the specification describes. Several rules go the
//! other direction too, synthesizing a new expression out of reified
//! values and derivatives and handing it back to `eval` — this is how
//! `eval`'s handling of [`Expr::Derivative`] and `differentiate`'s use
//! of `eval` end up mutually recursive without either module needing
//! to know the other's internals beyond this bridge.

use crate::env::Env;
use crate::eval::{self, EvalError};
use crate::expr::Expr;
use crate::expr::var::Var;
use crate::value::{LambdaVal, Val};

use super::reify::reify;

use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum DifferentiationError {
  #[error("expression '{0}' is not differentiable")]
  NonDifferentiable(Expr),
  #[error("expected {expected} in '{offending}'")]
  TypeMismatch { offending: Expr, expected: &'static str },
  #[error("derivative of variable '{0}' is not known within this context")]
  UnboundDerivative(Var),
  #[error("shape mismatch differentiating '{0}'")]
  ShapeError(Expr),
  #[error("cannot reify a {0} value into an expression")]
  UnreifiableValue(&'static str),
  #[error("{0}")]
  EvalFailure(Box<EvalError>),
}

impl DifferentiationError {
  /// The coarse-grained classification used by [`crate::error::Diagnostic`].
  pub fn kind(&self) -> &'static str {
    match self {
      DifferentiationError::TypeMismatch { .. } => "type",
      _ => "runtime",
    }
  }
}

impl From<EvalError> for DifferentiationError {
  fn from(e: EvalError) -> Self {
    DifferentiationError::EvalFailure(Box::new(e))
  }
}

fn as_lambda(v: Val, offending: &Expr) -> Result<Rc<LambdaVal>, DifferentiationError> {
  match v {
    Val::Lambda(l) => Ok(l),
    _ => Err(DifferentiationError::TypeMismatch { offending: offending.clone(), expected: "lambda" }),
  }
}

fn as_list(v: Val, offending: &Expr) -> Result<Vec<Val>, DifferentiationError> {
  match v {
    Val::List(xs) => Ok(xs),
    _ => Err(DifferentiationError::TypeMismatch { offending: offending.clone(), expected: "list" }),
  }
}

fn as_bool(v: Val, offending: &Expr) -> Result<bool, DifferentiationError> {
  match v {
    Val::Bool(b) => Ok(b),
    _ => Err(DifferentiationError::TypeMismatch { offending: offending.clone(), expected: "bool" }),
  }
}

/// `differentiate(e, x, Γ) → dv`, where `Γ` carries both the value and
/// derivative slots for every name in scope (see [`crate::env::Env`]).
pub fn differentiate(e: &Expr, x: &Var, env: &Env) -> Result<Val, DifferentiationError> {
  match e {
    // A literal's derivative is the constant zero, regardless of
    // whether the literal itself is an int or a real.
    Expr::IntLit(_) | Expr::RealLit(_) => Ok(Val::Int(0)),
    Expr::TrueLit | Expr::FalseLit | Expr::VoidLit => Err(DifferentiationError::NonDifferentiable(e.clone())),

    Expr::Var(v) => env.lookup_deriv(v).ok_or_else(|| DifferentiationError::UnboundDerivative(v.clone())),

    Expr::Sum(l, r) => {
      let (a, b) = (differentiate(l, x, env)?, differentiate(r, x, env)?);
      Ok(eval::arithmetic::add(a, b)?)
    }
    Expr::Diff(l, r) => {
      let (a, b) = (differentiate(l, x, env)?, differentiate(r, x, env)?);
      Ok(eval::arithmetic::sub(a, b)?)
    }
    // Product rule: d(l*r) = l*r' + r*l'. `l` and `r` themselves carry
    // no derivative information, so the synthesized expression reuses
    // the original subexpressions verbatim and substitutes in the
    // reified derivatives.
    Expr::Mult(l, r) => {
      let da = differentiate(l, x, env)?;
      let db = differentiate(r, x, env)?;
      let synthesized = Expr::sum(
        Expr::mult((**l).clone(), reify(db)?),
        Expr::mult((**r).clone(), reify(da)?),
      );
      Ok(eval::eval(&synthesized, env)?)
    }
    // Quotient rule: d(l/r) = (r*l' - l*r') / (r*r).
    Expr::Div(l, r) => {
      let da = differentiate(l, x, env)?;
      let db = differentiate(r, x, env)?;
      let synthesized = Expr::div(
        Expr::diff(
          Expr::mult((**r).clone(), reify(da)?),
          Expr::mult((**l).clone(), reify(db)?),
        ),
        Expr::mult((**r).clone(), (**r).clone()),
      );
      Ok(eval::eval(&synthesized, env)?)
    }

    Expr::Compare(..) | Expr::And(..) | Expr::Or(..) | Expr::Not(..) | Expr::Has(..) | Expr::Isa(..) | Expr::Norm(..) => {
      Err(DifferentiationError::NonDifferentiable(e.clone()))
    }

    Expr::ListLit(es) => {
      let vs = es.iter().map(|item| differentiate(item, x, env)).collect::<Result<Vec<_>, _>>()?;
      Ok(Val::List(vs))
    }
    Expr::MatrixLit(list_expr) => {
      let rows = as_list(differentiate(list_expr, x, env)?, e)?;
      let mut float_rows = Vec::with_capacity(rows.len());
      for row in rows {
        // Any irregular or non-numeric shape is a `ShapeError`
        // uniformly, including a row that isn't itself a list.
        let items = match row {
          Val::List(items) => items,
          _ => return Err(DifferentiationError::ShapeError(e.clone())),
        };
        let mut fr = Vec::with_capacity(items.len());
        for item in items {
          fr.push(item.as_f64().ok_or_else(|| DifferentiationError::ShapeError(e.clone()))?);
        }
        float_rows.push(fr);
      }
      let m = crate::matrix::Matrix::from_rows(float_rows).map_err(|_| DifferentiationError::ShapeError(e.clone()))?;
      Ok(Val::Matrix(m))
    }
    // The derivative of an indexing operation is the derivative of the
    // whole container, not of the selected element. This matches the
    // original engine's behavior rather than the more obviously
    // correct elementwise rule; see the design notes.
    Expr::ListAccess(list, _idx) => differentiate(list, x, env),
    Expr::Magnitude(inner) => {
      let v = eval::eval(inner, env)?;
      let sign = match &v {
        Val::Int(n) => if *n >= 0 { 1.0 } else { -1.0 },
        Val::Real(r) => if *r >= 0.0 { 1.0 } else { -1.0 },
        _ => return Err(DifferentiationError::TypeMismatch { offending: e.clone(), expected: "numeric" }),
      };
      let dv = differentiate(inner, x, env)?;
      let f = dv.as_f64().ok_or_else(|| DifferentiationError::TypeMismatch { offending: e.clone(), expected: "numeric" })?;
      Ok(Val::Real(sign * f))
    }

    Expr::If(c, t, f) => {
      if as_bool(eval::eval(c, env)?, e)? {
        differentiate(t, x, env)
      } else {
        differentiate(f, x, env)
      }
    }
    Expr::While(cond, body, always_enter) => {
      let mut result = Val::Void;
      if *always_enter {
        result = differentiate(body, x, env)?;
      }
      while as_bool(eval::eval(cond, env)?, e)? {
        result = differentiate(body, x, env)?;
      }
      Ok(result)
    }
    Expr::For(id, set, body) => {
      let list = as_list(eval::eval(set, env)?, e)?;
      let dlist = as_list(differentiate(set, x, env)?, e)?;
      if list.len() != dlist.len() {
        return Err(DifferentiationError::ShapeError(e.clone()));
      }
      let mut result = Val::Void;
      for (v, dv) in list.into_iter().zip(dlist) {
        let inner_env = env.extend(id.clone(), v, dv);
        result = differentiate(body, x, &inner_env)?;
      }
      Ok(result)
    }
    Expr::Sequence(es) => {
      let mut result = Val::Void;
      for item in es {
        result = differentiate(item, x, env)?;
      }
      Ok(result)
    }
    Expr::Thunk(inner) => differentiate(inner, x, env),

    // Extends Γ one binding at a time, computing both the value and
    // the derivative of each definition against the environment built
    // so far. Any lambda bound along the way has its closure rebound
    // to the final, fully-extended environment once every binding has
    // succeeded, which is what lets two such lambdas call each other.
    Expr::Let(bindings, body) => {
      let mut cur = env.clone();
      let mut lambdas = Vec::new();
      for b in bindings {
        let v = eval::eval(&b.defn, &cur)?;
        let dv = differentiate(&b.defn, x, &cur)?;
        if let Val::Lambda(l) = &v {
          lambdas.push(Rc::clone(l));
        }
        cur = cur.extend(b.id.clone(), v, dv);
      }
      for l in &lambdas {
        *l.env.borrow_mut() = cur.clone();
      }
      differentiate(body, x, &cur)
    }
    // Both the value and the derivative of each target are computed
    // before either is written, so a failure partway through never
    // leaves a frame with an updated value but a stale derivative.
    Expr::Set(targets, values) => {
      let mut last = Val::Void;
      for (t, v_expr) in targets.iter().zip(values) {
        let v = eval::eval(v_expr, env)?;
        let dv = differentiate(v_expr, x, env)?;
        env.set(t, v.clone(), dv).map_err(|err| DifferentiationError::UnboundDerivative(err.name))?;
        last = v;
      }
      Ok(last)
    }

    // The derivative of a lambda, with respect to `x`, is a lambda of
    // the same parameters whose body differentiates the original body
    // with respect to `x` — deferred, since the parameters aren't
    // bound yet. It closes over a snapshot of the current environment.
    Expr::Lambda(params, body) => {
      Ok(Val::Lambda(Rc::new(LambdaVal {
        params: params.clone(),
        body: Expr::derivative_of((**body).clone(), x.clone()),
        env: std::cell::RefCell::new(env.clone()),
      })))
    }
    // Multivariate chain rule: d/dx f(a_0, ..., a_n) = sum_i (d f/d p_i)(a_0,...,a_n) * d(a_i)/dx.
    // Each term is synthesized as an `Apply` of the partially
    // differentiated function to the *original* arguments, multiplied
    // by that argument's derivative, and the accumulator is simply the
    // first term rather than a sum seeded with zero.
    Expr::Apply(op, args) => {
      let f_val = eval::eval(op, env)?;
      let lambda = as_lambda(f_val, e)?;
      if lambda.params.len() != args.len() {
        return Err(DifferentiationError::TypeMismatch { offending: e.clone(), expected: "matching arity" });
      }
      let mut acc: Option<Expr> = None;
      for (param, arg) in lambda.params.iter().zip(args) {
        let partial_fn = Expr::derivative_of((**op).clone(), param.clone());
        let partial_applied = Expr::apply(partial_fn, args.clone());
        let term = Expr::mult(partial_applied, Expr::derivative_of(arg.clone(), x.clone()));
        acc = Some(match acc {
          None => term,
          Some(prev) => Expr::sum(prev, term),
        });
      }
      match acc {
        Some(synthesized) => Ok(eval::eval(&synthesized, env)?),
        None => Ok(Val::Int(0)),
      }
    }
    // `list` is evaluated (and, for the list case, differentiated)
    // fully before `func` is ever touched, so that an expression where
    // both fail to differentiate reports the error in `list` first.
    Expr::Map(func, list) => {
      match eval::eval(list, env)? {
        Val::List(vals) => {
          let dvals = as_list(differentiate(list, x, env)?, e)?;
          if vals.len() != dvals.len() {
            return Err(DifferentiationError::ShapeError(e.clone()));
          }
          let lambda = as_lambda(differentiate(func, x, env)?, e)?;
          if lambda.params.len() != 1 {
            return Err(DifferentiationError::TypeMismatch { offending: e.clone(), expected: "unary lambda" });
          }
          let mut out = Vec::with_capacity(vals.len());
          for (v, dv) in vals.into_iter().zip(dvals) {
            let y = eval::apply_lambda(&lambda, vec![v])?;
            let term = Expr::mult(reify(y)?, reify(dv)?);
            out.push(eval::eval(&term, env)?);
          }
          Ok(Val::List(out))
        }
        Val::Matrix(m) => {
          let lambda = as_lambda(differentiate(func, x, env)?, e)?;
          if lambda.params.len() != 1 {
            return Err(DifferentiationError::TypeMismatch { offending: e.clone(), expected: "unary lambda" });
          }
          let mut data = Vec::with_capacity(m.rows() * m.cols());
          for r in 0..m.rows() {
            for c in 0..m.cols() {
              let y = eval::apply_lambda(&lambda, vec![Val::Real(m.get(r, c))])?;
              data.push(eval::as_numeric(y)?);
            }
          }
          let rows = eval::reshape(data, m.rows(), m.cols());
          let out = crate::matrix::Matrix::from_rows(rows).map_err(|_| DifferentiationError::ShapeError(e.clone()))?;
          Ok(Val::Matrix(out))
        }
        _ => Err(DifferentiationError::TypeMismatch { offending: e.clone(), expected: "list or matrix" }),
      }
    }
    // `fold` has no differentiation rule in the specification; like
    // the boolean connectives, a node that lacks one is non-differentiable.
    Expr::Fold(..) => Err(DifferentiationError::NonDifferentiable(e.clone())),

    Expr::Derivative(inner, var) => differentiate(inner, var, env),
  }
}
