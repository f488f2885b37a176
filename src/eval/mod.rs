//! The evaluator, `eval(e, Γ) → v`.
//!
//! This is the engine the specification calls an "opaque trusted
//! dependency" of the differentiation rules, but it has to actually
//! exist for those rules to be testable, and it is the thing that
//! re-enters the differentiation engine when it meets an
//! [`Expr::Derivative`] node (see the `Expr::Derivative` arm below and
//! `expr::calculus::derivative`). Total over well-scoped input, and
//! deterministic; does not mutate `Γ` except through
//! [`Expr::Set`](crate::expr::Expr::Set).

pub mod arithmetic;

use crate::env::Env;
use crate::expr::{CompareOp, Expr};
use crate::expr::var::Var;
use crate::matrix::{IrregularShape, Matrix};
use crate::value::{LambdaVal, Val};

use thiserror::Error;

use std::rc::Rc;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum EvalError {
  #[error("unbound variable '{0}'")]
  UnboundVariable(Var),
  #[error("expected a value of type {expected} but found {actual}")]
  TypeMismatch { expected: &'static str, actual: &'static str },
  #[error("division by zero")]
  DivisionByZero,
  #[error("list index {index} out of range (length {length})")]
  IndexOutOfRange { index: i64, length: usize },
  #[error("lambda expects {expected} argument(s) but received {actual}")]
  ArityMismatch { expected: usize, actual: usize },
  #[error("irregular matrix shape")]
  Shape(#[from] IrregularShape),
  #[error("{0}")]
  Differentiation(Box<crate::expr::calculus::derivative::DifferentiationError>),
}

pub fn eval(expr: &Expr, env: &Env) -> Result<Val, EvalError> {
  match expr {
    Expr::IntLit(n) => Ok(Val::Int(*n)),
    Expr::RealLit(r) => Ok(Val::Real(*r)),
    Expr::TrueLit => Ok(Val::Bool(true)),
    Expr::FalseLit => Ok(Val::Bool(false)),
    Expr::VoidLit => Ok(Val::Void),

    Expr::Var(v) => env.lookup(v).ok_or_else(|| EvalError::UnboundVariable(v.clone())),

    Expr::Sum(l, r) => arithmetic::add(eval(l, env)?, eval(r, env)?),
    Expr::Diff(l, r) => arithmetic::sub(eval(l, env)?, eval(r, env)?),
    Expr::Mult(l, r) => arithmetic::mul(eval(l, env)?, eval(r, env)?),
    Expr::Div(l, r) => arithmetic::div(eval(l, env)?, eval(r, env)?),

    Expr::Compare(op, l, r) => {
      let (a, b) = (eval(l, env)?, eval(r, env)?);
      let (x, y) = arithmetic::compare_pair(&a, &b)?;
      let result = match op {
        CompareOp::Lt => x < y,
        CompareOp::Le => x <= y,
        CompareOp::Gt => x > y,
        CompareOp::Ge => x >= y,
        CompareOp::Eq => x == y,
        CompareOp::Ne => x != y,
      };
      Ok(Val::Bool(result))
    }
    Expr::And(l, r) => {
      if !as_bool(eval(l, env)?)? {
        return Ok(Val::Bool(false));
      }
      Ok(Val::Bool(as_bool(eval(r, env)?)?))
    }
    Expr::Or(l, r) => {
      if as_bool(eval(l, env)?)? {
        return Ok(Val::Bool(true));
      }
      Ok(Val::Bool(as_bool(eval(r, env)?)?))
    }
    Expr::Not(e) => Ok(Val::Bool(!as_bool(eval(e, env)?)?)),
    Expr::Has(item, set) => {
      let v = eval(item, env)?;
      let xs = as_list(eval(set, env)?)?;
      Ok(Val::Bool(xs.contains(&v)))
    }
    Expr::Isa(e, ty) => {
      let v = eval(e, env)?;
      Ok(Val::Bool(v.type_name() == ty))
    }

    Expr::ListLit(es) => {
      let vs = es.iter().map(|e| eval(e, env)).collect::<Result<Vec<_>, _>>()?;
      Ok(Val::List(vs))
    }
    Expr::MatrixLit(list_expr) => {
      let rows = as_list(eval(list_expr, env)?)?;
      let mut float_rows = Vec::with_capacity(rows.len());
      for row in rows {
        let items = as_list(row)?;
        let mut fr = Vec::with_capacity(items.len());
        for item in items {
          fr.push(as_numeric(item)?);
        }
        float_rows.push(fr);
      }
      Ok(Val::Matrix(Matrix::from_rows(float_rows)?))
    }
    Expr::ListAccess(list, idx) => {
      let xs = as_list(eval(list, env)?)?;
      let i = as_int(eval(idx, env)?)?;
      if i < 0 || (i as usize) >= xs.len() {
        return Err(EvalError::IndexOutOfRange { index: i, length: xs.len() });
      }
      Ok(xs[i as usize].clone())
    }
    Expr::Magnitude(e) => {
      match eval(e, env)? {
        Val::Int(n) => Ok(Val::Int(n.abs())),
        Val::Real(r) => Ok(Val::Real(r.abs())),
        other => Err(EvalError::TypeMismatch { expected: "numeric", actual: other.type_name() }),
      }
    }
    Expr::Norm(e) => {
      let xs = as_list(eval(e, env)?)?;
      let mut sum = 0.0;
      for x in xs {
        let v = as_numeric(x)?;
        sum += v * v;
      }
      Ok(Val::Real(sum.sqrt()))
    }

    Expr::If(c, t, f) => {
      if as_bool(eval(c, env)?)? {
        eval(t, env)
      } else {
        eval(f, env)
      }
    }
    Expr::While(cond, body, always_enter) => {
      let mut result = Val::Void;
      if *always_enter {
        result = eval(body, env)?;
      }
      while as_bool(eval(cond, env)?)? {
        result = eval(body, env)?;
      }
      Ok(result)
    }
    Expr::For(id, set, body) => {
      let xs = as_list(eval(set, env)?)?;
      let mut result = Val::Void;
      for item in xs {
        let inner = env.extend(id.clone(), item, Val::Void);
        result = eval(body, &inner)?;
      }
      Ok(result)
    }
    Expr::Sequence(es) => {
      let mut result = Val::Void;
      for e in es {
        result = eval(e, env)?;
      }
      Ok(result)
    }
    Expr::Thunk(e) => eval(e, env),

    Expr::Let(bindings, body) => {
      let mut env = env.clone();
      let mut lambdas = Vec::new();
      for b in bindings {
        let v = eval(&b.defn, &env)?;
        if let Val::Lambda(l) = &v {
          lambdas.push(Rc::clone(l));
        }
        env = env.extend(b.id.clone(), v, Val::Void);
      }
      for l in &lambdas {
        *l.env.borrow_mut() = env.clone();
      }
      eval(body, &env)
    }
    Expr::Set(targets, values) => {
      let mut result = Val::Void;
      for (t, v_expr) in targets.iter().zip(values) {
        let v = eval(v_expr, env)?;
        env.set_value(t, v.clone()).map_err(|e| EvalError::UnboundVariable(e.name))?;
        result = v;
      }
      Ok(result)
    }

    Expr::Lambda(params, body) => {
      Ok(Val::Lambda(Rc::new(LambdaVal {
        params: params.clone(),
        body: (**body).clone(),
        env: std::cell::RefCell::new(env.clone()),
      })))
    }
    Expr::Apply(op, args) => {
      let lambda = as_lambda(eval(op, env)?)?;
      let arg_vals = args.iter().map(|a| eval(a, env)).collect::<Result<Vec<_>, _>>()?;
      apply_lambda(&lambda, arg_vals)
    }
    Expr::Map(func, list) => {
      let lambda = as_lambda(eval(func, env)?)?;
      if lambda.params.len() != 1 {
        return Err(EvalError::ArityMismatch { expected: 1, actual: lambda.params.len() });
      }
      match eval(list, env)? {
        Val::List(xs) => {
          let mut out = Vec::with_capacity(xs.len());
          for x in xs {
            out.push(apply_lambda(&lambda, vec![x])?);
          }
          Ok(Val::List(out))
        }
        Val::Matrix(m) => {
          let mut data = Vec::with_capacity(m.rows() * m.cols());
          for r in 0..m.rows() {
            for c in 0..m.cols() {
              let y = apply_lambda(&lambda, vec![Val::Real(m.get(r, c))])?;
              data.push(as_numeric(y)?);
            }
          }
          let rows = reshape(data, m.rows(), m.cols());
          Ok(Val::Matrix(Matrix::from_rows(rows)?))
        }
        other => Err(EvalError::TypeMismatch { expected: "list or matrix", actual: other.type_name() }),
      }
    }
    Expr::Fold(list, func, base) => {
      let xs = as_list(eval(list, env)?)?;
      let lambda = as_lambda(eval(func, env)?)?;
      if lambda.params.len() != 2 {
        return Err(EvalError::ArityMismatch { expected: 2, actual: lambda.params.len() });
      }
      let mut acc = eval(base, env)?;
      for x in xs {
        acc = apply_lambda(&lambda, vec![acc, x])?;
      }
      Ok(acc)
    }

    Expr::Derivative(inner, var) => {
      crate::expr::calculus::differentiate(inner, var, env)
        .map_err(|e| EvalError::Differentiation(Box::new(e)))
    }
  }
}

fn as_bool(v: Val) -> Result<bool, EvalError> {
  match v {
    Val::Bool(b) => Ok(b),
    other => Err(EvalError::TypeMismatch { expected: "bool", actual: other.type_name() }),
  }
}

fn as_int(v: Val) -> Result<i64, EvalError> {
  match v {
    Val::Int(n) => Ok(n),
    other => Err(EvalError::TypeMismatch { expected: "int", actual: other.type_name() }),
  }
}

pub(crate) fn as_numeric(v: Val) -> Result<f64, EvalError> {
  v.as_f64().ok_or_else(|| EvalError::TypeMismatch { expected: "numeric", actual: v.type_name() })
}

pub(crate) fn as_list(v: Val) -> Result<Vec<Val>, EvalError> {
  match v {
    Val::List(xs) => Ok(xs),
    other => Err(EvalError::TypeMismatch { expected: "list", actual: other.type_name() }),
  }
}

pub(crate) fn as_lambda(v: Val) -> Result<Rc<LambdaVal>, EvalError> {
  match v {
    Val::Lambda(l) => Ok(l),
    other => Err(EvalError::TypeMismatch { expected: "lambda", actual: other.type_name() }),
  }
}

pub(crate) fn apply_lambda(lambda: &LambdaVal, args: Vec<Val>) -> Result<Val, EvalError> {
  if lambda.params.len() != args.len() {
    return Err(EvalError::ArityMismatch { expected: lambda.params.len(), actual: args.len() });
  }
  let mut call_env = lambda.env.borrow().clone();
  for (p, v) in lambda.params.iter().zip(args) {
    call_env = call_env.extend(p.clone(), v, Val::Void);
  }
  eval(&lambda.body, &call_env)
}

pub(crate) fn reshape(data: Vec<f64>, rows: usize, cols: usize) -> Vec<Vec<f64>> {
  data.chunks(cols).take(rows).map(|chunk| chunk.to_vec()).collect()
}
