//! The paired value/derivative environment.
//!
//! Design note (see `DESIGN.md`): rather than keep two independent
//! chains for `Γ` and `Γ′`, each frame of a single chain carries both
//! a value slot and a derivative slot. This makes the specification's
//! "`Γ` and `Γ′` bind exactly the same names, in the same order"
//! invariant structural — there is no way to extend one without the
//! other — and it makes [`Expr::Set`](crate::expr::Expr::Set) a
//! single frame mutation instead of two chains that must be kept in
//! lockstep by convention.

use crate::expr::var::Var;
use crate::value::Val;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct Frame {
  name: Var,
  value: RefCell<Val>,
  deriv: RefCell<Val>,
}

struct Node {
  frame: Frame,
  parent: Env,
}

/// A persistent chain of named `(value, derivative)` pairs.
///
/// Cloning an `Env` is a cheap `Rc` bump; extending an `Env` never
/// mutates the environment it was extended from, so a caller that
/// holds on to an outer `Env` after a failed operation on an inner one
/// automatically observes the outer environment unchanged. This is
/// what lets [`Expr::Let`](crate::expr::Expr::Let)'s "unwind on
/// failure" requirement fall out for free: failure simply means the
/// extended chain is dropped without ever being threaded further.
#[derive(Clone)]
pub struct Env(Option<Rc<Node>>);

impl Env {
  pub fn empty() -> Self {
    Env(None)
  }

  /// Extends the environment with one new name, bound to `value` in
  /// the value slot and `deriv` in the derivative slot.
  pub fn extend(&self, name: Var, value: Val, deriv: Val) -> Self {
    Env(Some(Rc::new(Node {
      frame: Frame { name, value: RefCell::new(value), deriv: RefCell::new(deriv) },
      parent: self.clone(),
    })))
  }

  fn find(&self, name: &Var) -> Option<&Frame> {
    let mut cur = self.0.as_deref();
    while let Some(node) = cur {
      if &node.frame.name == name {
        return Some(&node.frame);
      }
      cur = node.parent.0.as_deref();
    }
    None
  }

  pub fn lookup(&self, name: &Var) -> Option<Val> {
    self.find(name).map(|frame| frame.value.borrow().clone())
  }

  pub fn lookup_deriv(&self, name: &Var) -> Option<Val> {
    self.find(name).map(|frame| frame.deriv.borrow().clone())
  }

  /// Updates both the value and derivative slots for an existing
  /// binding. Both slots are written, or (if `name` is unbound)
  /// neither is — there is no way to observe a half-updated frame.
  pub fn set(&self, name: &Var, value: Val, deriv: Val) -> Result<(), UnboundVariable> {
    let frame = self.find(name).ok_or_else(|| UnboundVariable { name: name.clone() })?;
    *frame.value.borrow_mut() = value;
    *frame.deriv.borrow_mut() = deriv;
    Ok(())
  }

  /// Updates only the value slot, leaving the derivative slot
  /// untouched. Used by the plain evaluator, which has no derivative
  /// to propagate.
  pub fn set_value(&self, name: &Var, value: Val) -> Result<(), UnboundVariable> {
    let frame = self.find(name).ok_or_else(|| UnboundVariable { name: name.clone() })?;
    *frame.value.borrow_mut() = value;
    Ok(())
  }

  pub fn contains(&self, name: &Var) -> bool {
    self.find(name).is_some()
  }

  pub fn depth(&self) -> usize {
    let mut cur = self.0.as_deref();
    let mut n = 0;
    while let Some(node) = cur {
      n += 1;
      cur = node.parent.0.as_deref();
    }
    n
  }

  /// Names bound in this environment, innermost frame first. Used by
  /// tests to check the environment-length invariant (spec §8.6).
  pub fn names(&self) -> Vec<Var> {
    let mut cur = self.0.as_deref();
    let mut out = Vec::new();
    while let Some(node) = cur {
      out.push(node.frame.name.clone());
      cur = node.parent.0.as_deref();
    }
    out
  }

  /// Builds the seed environment for differentiating with respect to
  /// `var`: every supplied binding gets derivative `1` if its name is
  /// `var` and `0` otherwise.
  pub fn seed_identity(var: &Var, bindings: impl IntoIterator<Item = (Var, Val)>) -> Env {
    let mut env = Env::empty();
    for (name, value) in bindings {
      let deriv = if &name == var { Val::Int(1) } else { Val::Int(0) };
      env = env.extend(name, value, deriv);
    }
    env
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("variable '{name}' is not bound in this environment")]
pub struct UnboundVariable {
  pub name: Var,
}

impl fmt::Debug for Env {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "Env{:?}", self.names())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn var(s: &str) -> Var {
    Var::new(s).unwrap()
  }

  #[test]
  fn test_lookup_missing_returns_none() {
    let env = Env::empty();
    assert_eq!(env.lookup(&var("x")), None);
  }

  #[test]
  fn test_extend_and_lookup() {
    let env = Env::empty().extend(var("x"), Val::Int(3), Val::Int(1));
    assert_eq!(env.lookup(&var("x")), Some(Val::Int(3)));
    assert_eq!(env.lookup_deriv(&var("x")), Some(Val::Int(1)));
  }

  #[test]
  fn test_extending_does_not_mutate_parent() {
    let base = Env::empty().extend(var("x"), Val::Int(1), Val::Int(0));
    let extended = base.extend(var("y"), Val::Int(2), Val::Int(0));
    assert!(extended.contains(&var("x")));
    assert!(!base.contains(&var("y")));
  }

  #[test]
  fn test_shadowing_finds_innermost() {
    let env = Env::empty()
      .extend(var("x"), Val::Int(1), Val::Int(0))
      .extend(var("x"), Val::Int(2), Val::Int(0));
    assert_eq!(env.lookup(&var("x")), Some(Val::Int(2)));
  }

  #[test]
  fn test_set_mutates_existing_frame_and_is_visible_through_clones() {
    let env = Env::empty().extend(var("x"), Val::Int(1), Val::Int(0));
    let alias = env.clone();
    env.set(&var("x"), Val::Int(99), Val::Int(5)).unwrap();
    assert_eq!(alias.lookup(&var("x")), Some(Val::Int(99)));
    assert_eq!(alias.lookup_deriv(&var("x")), Some(Val::Int(5)));
  }

  #[test]
  fn test_set_unbound_fails() {
    let env = Env::empty();
    assert!(env.set(&var("x"), Val::Int(1), Val::Int(1)).is_err());
  }

  #[test]
  fn test_depth_and_names() {
    let env = Env::empty()
      .extend(var("x"), Val::Int(1), Val::Int(0))
      .extend(var("y"), Val::Int(2), Val::Int(0));
    assert_eq!(env.depth(), 2);
    assert_eq!(env.names(), vec![var("y"), var("x")]);
  }
}
