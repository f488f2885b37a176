//! The expression AST shared by the evaluator and the differentiation
//! engine.

pub mod calculus;
pub mod var;

use var::Var;

use std::fmt::{self, Display, Formatter};

/// A comparison operator, as used by [`Expr::Compare`]. Comparisons
/// are evaluable but never differentiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
  Lt,
  Le,
  Gt,
  Ge,
  Eq,
  Ne,
}

/// A single binding introduced by a [`Expr::Let`]. `recursive` mirrors
/// the source language's `let rec` distinction; the differentiation
/// engine does not consult it (mutual recursion is established by the
/// environment fixup in [`calculus::derivative`] instead), but the
/// scope validator still checks non-recursive definitions against the
/// pre-`let` scope only.
#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
  pub id: Var,
  pub recursive: bool,
  pub defn: Expr,
}

impl LetBinding {
  pub fn new(id: Var, recursive: bool, defn: Expr) -> Self {
    Self { id, recursive, defn }
  }
}

/// The expression tree. Roughly twenty node kinds, grouped below by
/// the categories in which the specification introduces them.
///
/// Not every node kind is differentiable; see
/// [`calculus::differentiate`] for the partial `differentiate`
/// capability and [`scope`](crate::scope) for the total `eval`-facing
/// scope check.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  // Literals
  IntLit(i64),
  RealLit(f64),
  TrueLit,
  FalseLit,
  VoidLit,

  // Reference
  Var(Var),

  // Arithmetic
  Sum(Box<Expr>, Box<Expr>),
  Diff(Box<Expr>, Box<Expr>),
  Mult(Box<Expr>, Box<Expr>),
  Div(Box<Expr>, Box<Expr>),

  // Comparison / boolean (non-differentiable)
  Compare(CompareOp, Box<Expr>, Box<Expr>),
  And(Box<Expr>, Box<Expr>),
  Or(Box<Expr>, Box<Expr>),
  Not(Box<Expr>),
  Has(Box<Expr>, Box<Expr>),
  Isa(Box<Expr>, String),

  // Aggregates
  ListLit(Vec<Expr>),
  MatrixLit(Box<Expr>),
  ListAccess(Box<Expr>, Box<Expr>),
  Magnitude(Box<Expr>),
  Norm(Box<Expr>),

  // Control
  If(Box<Expr>, Box<Expr>, Box<Expr>),
  While(Box<Expr>, Box<Expr>, bool),
  For(Var, Box<Expr>, Box<Expr>),
  Sequence(Vec<Expr>),
  Thunk(Box<Expr>),

  // Binding
  Let(Vec<LetBinding>, Box<Expr>),
  Set(Vec<Var>, Vec<Expr>),

  // Functional
  Lambda(Vec<Var>, Box<Expr>),
  Apply(Box<Expr>, Vec<Expr>),
  Map(Box<Expr>, Box<Expr>),
  Fold(Box<Expr>, Box<Expr>, Box<Expr>),

  // Meta
  Derivative(Box<Expr>, Var),
}

impl Expr {
  pub fn var(name: &str) -> Option<Expr> {
    Var::new(name).map(Expr::Var)
  }

  pub fn sum(l: Expr, r: Expr) -> Expr {
    Expr::Sum(Box::new(l), Box::new(r))
  }

  pub fn diff(l: Expr, r: Expr) -> Expr {
    Expr::Diff(Box::new(l), Box::new(r))
  }

  pub fn mult(l: Expr, r: Expr) -> Expr {
    Expr::Mult(Box::new(l), Box::new(r))
  }

  pub fn div(l: Expr, r: Expr) -> Expr {
    Expr::Div(Box::new(l), Box::new(r))
  }

  pub fn apply(op: Expr, args: Vec<Expr>) -> Expr {
    Expr::Apply(Box::new(op), args)
  }

  pub fn derivative_of(inner: Expr, var: Var) -> Expr {
    Expr::Derivative(Box::new(inner), var)
  }

  /// A short, non-exhaustive rendering used only for diagnostics. This
  /// is not a pretty-printer and makes no attempt at infix notation
  /// for operators that read better that way; it exists so error
  /// messages can name the offending subexpression.
  pub fn describe(&self) -> String {
    self.to_string()
  }
}

impl Display for Expr {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Expr::IntLit(n) => write!(f, "{n}"),
      Expr::RealLit(r) => write!(f, "{r}"),
      Expr::TrueLit => write!(f, "true"),
      Expr::FalseLit => write!(f, "false"),
      Expr::VoidLit => write!(f, "void"),
      Expr::Var(v) => write!(f, "{v}"),
      Expr::Sum(l, r) => write!(f, "({l} + {r})"),
      Expr::Diff(l, r) => write!(f, "({l} - {r})"),
      Expr::Mult(l, r) => write!(f, "({l} * {r})"),
      Expr::Div(l, r) => write!(f, "({l} / {r})"),
      Expr::Compare(op, l, r) => write!(f, "({l} {op} {r})"),
      Expr::And(l, r) => write!(f, "({l} and {r})"),
      Expr::Or(l, r) => write!(f, "({l} or {r})"),
      Expr::Not(e) => write!(f, "(not {e})"),
      Expr::Has(item, set) => write!(f, "({item} has {set})"),
      Expr::Isa(e, ty) => write!(f, "({e} isa {ty})"),
      Expr::ListLit(es) => {
        write!(f, "[")?;
        for (i, e) in es.iter().enumerate() {
          if i > 0 { write!(f, ", ")?; }
          write!(f, "{e}")?;
        }
        write!(f, "]")
      }
      Expr::MatrixLit(rows) => write!(f, "matrix({rows})"),
      Expr::ListAccess(l, idx) => write!(f, "{l}[{idx}]"),
      Expr::Magnitude(e) => write!(f, "|{e}|"),
      Expr::Norm(e) => write!(f, "norm({e})"),
      Expr::If(c, t, e) => write!(f, "(if {c} then {t} else {e})"),
      Expr::While(c, body, always) => write!(f, "(while[{always}] {c} do {body})"),
      Expr::For(id, set, body) => write!(f, "(for {id} in {set} do {body})"),
      Expr::Sequence(es) => {
        write!(f, "{{ ")?;
        for (i, e) in es.iter().enumerate() {
          if i > 0 { write!(f, "; ")?; }
          write!(f, "{e}")?;
        }
        write!(f, " }}")
      }
      Expr::Thunk(e) => write!(f, "thunk({e})"),
      Expr::Let(bindings, body) => {
        write!(f, "(let ")?;
        for b in bindings {
          write!(f, "{}{} = {}, ", if b.recursive { "rec " } else { "" }, b.id, b.defn)?;
        }
        write!(f, "in {body})")
      }
      Expr::Set(targets, values) => {
        write!(f, "(set! ")?;
        for (t, v) in targets.iter().zip(values) {
          write!(f, "{t} := {v}, ")?;
        }
        write!(f, ")")
      }
      Expr::Lambda(params, body) => {
        write!(f, "(\\")?;
        for p in params {
          write!(f, "{p} ")?;
        }
        write!(f, ". {body})")
      }
      Expr::Apply(op, args) => {
        write!(f, "{op}(")?;
        for (i, a) in args.iter().enumerate() {
          if i > 0 { write!(f, ", ")?; }
          write!(f, "{a}")?;
        }
        write!(f, ")")
      }
      Expr::Map(func, list) => write!(f, "map({func}, {list})"),
      Expr::Fold(list, func, base) => write!(f, "fold({list}, {func}, {base})"),
      Expr::Derivative(inner, var) => write!(f, "d/d{var}({inner})"),
    }
  }
}

impl Display for CompareOp {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    let s = match self {
      CompareOp::Lt => "<",
      CompareOp::Le => "<=",
      CompareOp::Gt => ">",
      CompareOp::Ge => ">=",
      CompareOp::Eq => "==",
      CompareOp::Ne => "!=",
    };
    write!(f, "{s}")
  }
}

impl From<i64> for Expr {
  fn from(n: i64) -> Expr {
    Expr::IntLit(n)
  }
}

impl From<f64> for Expr {
  fn from(r: f64) -> Expr {
    Expr::RealLit(r)
  }
}

impl From<bool> for Expr {
  fn from(b: bool) -> Expr {
    if b { Expr::TrueLit } else { Expr::FalseLit }
  }
}

impl From<Var> for Expr {
  fn from(v: Var) -> Expr {
    Expr::Var(v)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_var_helper_rejects_invalid_names() {
    assert!(Expr::var("0bad").is_none());
    assert!(Expr::var("x").is_some());
  }

  #[test]
  fn test_display_of_arithmetic() {
    let e = Expr::sum(Expr::from(1), Expr::mult(Expr::from(2), Expr::from(3)));
    assert_eq!(e.to_string(), "(1 + (2 * 3))");
  }

  #[test]
  fn test_display_of_let_and_lambda() {
    let x = Var::new("x").unwrap();
    let e = Expr::Let(
      vec![LetBinding::new(x.clone(), false, Expr::from(1))],
      Box::new(Expr::Var(x)),
    );
    assert_eq!(e.to_string(), "(let x = 1, in x)");
  }
}
