//! A pre-flight scope check, run before an expression is ever handed
//! to [`eval::eval`] or [`calculus::differentiate`].
//!
//! Redefining a name — binding an identifier that is already in scope
//! — is rejected outright rather than silently shadowed. This mirrors
//! the original implementation's name-tracking pass, which walked the
//! tree once with a prefix tree of in-scope identifiers and rejected
//! any `let`/`for` that tried to add a name already present in it.

use crate::expr::var::Var;
use crate::expr::{Expr, LetBinding};

use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ScopeError {
  #[error("name '{0}' is already bound in this scope")]
  Redefinition(Var),
}

/// The set of names currently in scope during one top-down scope
/// check. Named after the prefix tree the original implementation
/// used for the same bookkeeping; variable names here are short
/// enough that a flat set gives the same answer with less machinery.
#[derive(Debug, Clone, Default)]
pub struct NameTrie(HashSet<Var>);

impl NameTrie {
  pub fn new() -> Self {
    Self(HashSet::new())
  }

  pub fn contains(&self, name: &Var) -> bool {
    self.0.contains(name)
  }

  /// Adds `name` to the scope, failing if it is already bound.
  pub fn insert(&mut self, name: Var) -> Result<(), ScopeError> {
    if !self.0.insert(name.clone()) {
      return Err(ScopeError::Redefinition(name));
    }
    Ok(())
  }

  pub fn remove(&mut self, name: &Var) {
    self.0.remove(name);
  }
}

/// Walks `expr` checking that no binding form introduces a name
/// already present in `names`. `names` is mutated in place as the walk
/// enters and leaves binding scopes, but is always restored to its
/// original contents before `validate_scope` returns — including on
/// the error path, so a failed call leaves the caller's trie usable.
pub fn validate_scope(expr: &Expr, names: &mut NameTrie) -> Result<(), ScopeError> {
  match expr {
    Expr::IntLit(_) | Expr::RealLit(_) | Expr::TrueLit | Expr::FalseLit | Expr::VoidLit | Expr::Var(_) => Ok(()),

    Expr::Sum(l, r) | Expr::Diff(l, r) | Expr::Mult(l, r) | Expr::Div(l, r)
    | Expr::And(l, r) | Expr::Or(l, r) | Expr::Has(l, r) | Expr::ListAccess(l, r) => {
      validate_scope(l, names)?;
      validate_scope(r, names)
    }
    Expr::Compare(_, l, r) => {
      validate_scope(l, names)?;
      validate_scope(r, names)
    }
    Expr::Not(e) | Expr::Magnitude(e) | Expr::Norm(e) | Expr::Thunk(e) | Expr::MatrixLit(e) => validate_scope(e, names),
    Expr::Isa(e, _) => validate_scope(e, names),

    Expr::ListLit(es) | Expr::Sequence(es) => {
      for e in es {
        validate_scope(e, names)?;
      }
      Ok(())
    }

    Expr::If(c, t, f) => {
      validate_scope(c, names)?;
      validate_scope(t, names)?;
      validate_scope(f, names)
    }
    Expr::While(c, body, _) => {
      validate_scope(c, names)?;
      validate_scope(body, names)
    }
    Expr::For(id, set, body) => {
      validate_scope(set, names)?;
      names.insert(id.clone())?;
      let result = validate_scope(body, names);
      names.remove(id);
      result
    }

    Expr::Let(bindings, body) => validate_let(bindings, body, names),

    Expr::Set(_, values) => {
      for v in values {
        validate_scope(v, names)?;
      }
      Ok(())
    }

    // A lambda's body is checked in a fresh scope seeded with both its
    // own parameters and every name already in scope where the lambda
    // is written: captured names stay visible, so a parameter may not
    // reuse one of them any more than a nested `let` could.
    Expr::Lambda(params, body) => {
      let mut inner = names.clone();
      for p in params {
        inner.insert(p.clone())?;
      }
      validate_scope(body, &mut inner)
    }
    Expr::Apply(op, args) => {
      validate_scope(op, names)?;
      for a in args {
        validate_scope(a, names)?;
      }
      Ok(())
    }
    Expr::Map(func, list) => {
      validate_scope(func, names)?;
      validate_scope(list, names)
    }
    Expr::Fold(list, func, base) => {
      validate_scope(list, names)?;
      validate_scope(func, names)?;
      validate_scope(base, names)
    }

    Expr::Derivative(inner, _) => validate_scope(inner, names),
  }
}

/// `let` validates its non-recursive definitions against the
/// surrounding scope first (before any of this `let`'s own names
/// exist), then adds every binding's name — recursive or not — while
/// checking for redefinition, then validates the recursive
/// definitions and the body against the fully extended scope. Every
/// name this `let` added is removed again before returning, success or
/// failure.
fn validate_let(bindings: &[LetBinding], body: &Expr, names: &mut NameTrie) -> Result<(), ScopeError> {
  for b in bindings.iter().filter(|b| !b.recursive) {
    validate_scope(&b.defn, names)?;
  }

  let mut added = Vec::with_capacity(bindings.len());
  for b in bindings {
    if let Err(err) = names.insert(b.id.clone()) {
      for id in &added {
        names.remove(id);
      }
      return Err(err);
    }
    added.push(b.id.clone());
  }

  let result = bindings
    .iter()
    .filter(|b| b.recursive)
    .try_for_each(|b| validate_scope(&b.defn, names))
    .and_then(|()| validate_scope(body, names));

  for id in &added {
    names.remove(id);
  }
  result
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::expr::Expr;

  fn var(s: &str) -> Var {
    Var::new(s).unwrap()
  }

  #[test]
  fn test_plain_expression_has_no_redefinitions() {
    let e = Expr::sum(Expr::from(1), Expr::from(2));
    assert!(validate_scope(&e, &mut NameTrie::new()).is_ok());
  }

  #[test]
  fn test_nested_let_rebinding_same_name_fails() {
    // let x = 1 in let x = 2 in x
    let inner = Expr::Let(vec![LetBinding::new(var("x"), false, Expr::from(2))], Box::new(Expr::Var(var("x"))));
    let outer = Expr::Let(vec![LetBinding::new(var("x"), false, Expr::from(1))], Box::new(inner));
    let err = validate_scope(&outer, &mut NameTrie::new()).unwrap_err();
    assert!(matches!(err, ScopeError::Redefinition(ref name) if name == &var("x")));
  }

  #[test]
  fn test_let_restores_scope_on_failure() {
    let mut names = NameTrie::new();
    names.insert(var("x")).unwrap();
    let e = Expr::Let(vec![LetBinding::new(var("x"), false, Expr::from(1))], Box::new(Expr::Var(var("x"))));
    assert!(validate_scope(&e, &mut names).is_err());
    assert!(names.contains(&var("x")));
  }

  #[test]
  fn test_for_rejects_shadowing_already_bound_name() {
    let mut names = NameTrie::new();
    names.insert(var("x")).unwrap();
    let e = Expr::For(var("x"), Box::new(Expr::ListLit(vec![Expr::from(1)])), Box::new(Expr::Var(var("x"))));
    assert!(validate_scope(&e, &mut names).is_err());
  }

  #[test]
  fn test_lambda_param_shadowing_a_captured_name_is_rejected() {
    // (\x. x) where x is already bound in the outer scope redefines it.
    let mut names = NameTrie::new();
    names.insert(var("x")).unwrap();
    let lambda = Expr::Lambda(vec![var("x")], Box::new(Expr::Var(var("x"))));
    assert!(validate_scope(&lambda, &mut names).is_err());
  }

  #[test]
  fn test_lambda_body_sees_captured_names_for_redefinition_checks() {
    // let x = 1 in (\y. let x = 2 in x)
    let inner_let = Expr::Let(vec![LetBinding::new(var("x"), false, Expr::from(2))], Box::new(Expr::Var(var("x"))));
    let lambda = Expr::Lambda(vec![var("y")], Box::new(inner_let));
    let outer = Expr::Let(vec![LetBinding::new(var("x"), false, Expr::from(1))], Box::new(lambda));
    let err = validate_scope(&outer, &mut NameTrie::new()).unwrap_err();
    assert!(matches!(err, ScopeError::Redefinition(ref name) if name == &var("x")));
  }

  #[test]
  fn test_lambda_param_not_colliding_with_outer_scope_is_fine() {
    let mut names = NameTrie::new();
    names.insert(var("x")).unwrap();
    let lambda = Expr::Lambda(vec![var("y")], Box::new(Expr::Var(var("y"))));
    assert!(validate_scope(&lambda, &mut names).is_ok());
  }

  #[test]
  fn test_mutually_recursive_let_bindings_are_allowed() {
    let e = Expr::Let(
      vec![
        LetBinding::new(var("even"), true, Expr::Var(var("odd"))),
        LetBinding::new(var("odd"), true, Expr::Var(var("even"))),
      ],
      Box::new(Expr::Var(var("even"))),
    );
    assert!(validate_scope(&e, &mut NameTrie::new()).is_ok());
  }
}
