//! Runtime values produced by the evaluator and consumed/produced by
//! the differentiation engine.

use crate::env::Env;
use crate::expr::Expr;
use crate::expr::var::Var;
use crate::matrix::Matrix;

use std::cell::RefCell;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

/// A closure: a lambda's parameter list and body, together with the
/// environment captured at definition time.
///
/// The environment is held behind a [`RefCell`] rather than captured
/// by value so that mutually recursive `let` bindings can be patched
/// in after the fact, once every binding in the same `let` has been
/// evaluated (see the `Expr::Let` arms of `eval` and `differentiate`);
/// ordinary, non-recursive lambdas simply never have their cell
/// rewritten after construction.
#[derive(Debug)]
pub struct LambdaVal {
  pub params: Vec<Var>,
  pub body: Expr,
  pub env: RefCell<Env>,
}

#[derive(Debug, Clone)]
pub enum Val {
  Int(i64),
  Real(f64),
  Bool(bool),
  List(Vec<Val>),
  Matrix(Matrix),
  Lambda(Rc<LambdaVal>),
  Void,
}

impl Val {
  pub fn type_name(&self) -> &'static str {
    match self {
      Val::Int(_) => "int",
      Val::Real(_) => "real",
      Val::Bool(_) => "bool",
      Val::List(_) => "list",
      Val::Matrix(_) => "matrix",
      Val::Lambda(_) => "lambda",
      Val::Void => "void",
    }
  }

  /// Widens an [`Val::Int`] or [`Val::Real`] to an `f64`. Returns
  /// `None` for any other variant.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Val::Int(n) => Some(*n as f64),
      Val::Real(r) => Some(*r),
      _ => None,
    }
  }

  pub fn is_numeric(&self) -> bool {
    matches!(self, Val::Int(_) | Val::Real(_))
  }
}

impl PartialEq for Val {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Val::Int(a), Val::Int(b)) => a == b,
      (Val::Real(a), Val::Real(b)) => a == b,
      (Val::Int(a), Val::Real(b)) | (Val::Real(b), Val::Int(a)) => *a as f64 == *b,
      (Val::Bool(a), Val::Bool(b)) => a == b,
      (Val::List(a), Val::List(b)) => a == b,
      (Val::Matrix(a), Val::Matrix(b)) => a == b,
      (Val::Lambda(a), Val::Lambda(b)) => Rc::ptr_eq(a, b),
      (Val::Void, Val::Void) => true,
      _ => false,
    }
  }
}

impl Display for Val {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Val::Int(n) => write!(f, "{n}"),
      Val::Real(r) => write!(f, "{r}"),
      Val::Bool(b) => write!(f, "{b}"),
      Val::List(vs) => {
        write!(f, "[")?;
        for (i, v) in vs.iter().enumerate() {
          if i > 0 { write!(f, ", ")?; }
          write!(f, "{v}")?;
        }
        write!(f, "]")
      }
      Val::Matrix(m) => write!(f, "{m}"),
      Val::Lambda(l) => write!(f, "<lambda/{}>", l.params.len()),
      Val::Void => write!(f, "void"),
    }
  }
}

impl From<i64> for Val {
  fn from(n: i64) -> Val {
    Val::Int(n)
  }
}

impl From<f64> for Val {
  fn from(r: f64) -> Val {
    Val::Real(r)
  }
}

impl From<bool> for Val {
  fn from(b: bool) -> Val {
    Val::Bool(b)
  }
}
