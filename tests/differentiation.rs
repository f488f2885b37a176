//! End-to-end scenarios exercising the public `derivative` entry point
//! against a shared `Γ0 = {x ↦ 3}`, `Γ0' = {x ↦ 1}` environment.

use symcalc::env::Env;
use symcalc::expr::var::Var;
use symcalc::expr::{CompareOp, Expr, LetBinding};
use symcalc::value::Val;

fn x() -> Var {
  Var::new("x").unwrap()
}

fn seeded_env() -> Env {
  Env::seed_identity(&x(), [(x(), Val::Int(3))])
}

#[test]
fn scenario_square_is_twice_x() {
  let e = Expr::mult(Expr::Var(x()), Expr::Var(x()));
  assert_eq!(symcalc::derivative(&e, &x(), &seeded_env()).unwrap(), Val::Int(6));
}

#[test]
fn scenario_cube_uses_product_rule_twice() {
  let e = Expr::mult(Expr::mult(Expr::Var(x()), Expr::Var(x())), Expr::Var(x()));
  assert_eq!(symcalc::derivative(&e, &x(), &seeded_env()).unwrap(), Val::Int(27));
}

#[test]
fn scenario_quotient_rule_promotes_to_real() {
  let e = Expr::div(
    Expr::sum(Expr::Var(x()), Expr::from(1)),
    Expr::diff(Expr::Var(x()), Expr::from(1)),
  );
  assert_eq!(symcalc::derivative(&e, &x(), &seeded_env()).unwrap(), Val::Real(-0.5));
}

#[test]
fn scenario_if_follows_the_evaluated_branch() {
  let e = Expr::If(
    Box::new(Expr::Compare(CompareOp::Gt, Box::new(Expr::Var(x())), Box::new(Expr::from(0)))),
    Box::new(Expr::mult(Expr::Var(x()), Expr::Var(x()))),
    Box::new(Expr::diff(Expr::from(0), Expr::mult(Expr::Var(x()), Expr::Var(x())))),
  );
  assert_eq!(symcalc::derivative(&e, &x(), &seeded_env()).unwrap(), Val::Int(6));
}

#[test]
fn scenario_let_bound_lambda_applied_to_x() {
  let f = Var::new("f").unwrap();
  let y = Var::new("y").unwrap();
  let e = Expr::Let(
    vec![LetBinding::new(f.clone(), false, Expr::Lambda(vec![y.clone()], Box::new(Expr::mult(Expr::Var(y.clone()), Expr::Var(y)))))],
    Box::new(Expr::apply(Expr::Var(f), vec![Expr::Var(x())])),
  );
  assert_eq!(symcalc::derivative(&e, &x(), &seeded_env()).unwrap(), Val::Int(6));
}

#[test]
fn scenario_list_literal_differentiates_elementwise() {
  let e = Expr::ListLit(vec![
    Expr::Var(x()),
    Expr::mult(Expr::Var(x()), Expr::Var(x())),
    Expr::mult(Expr::mult(Expr::Var(x()), Expr::Var(x())), Expr::Var(x())),
  ]);
  assert_eq!(
    symcalc::derivative(&e, &x(), &seeded_env()).unwrap(),
    Val::List(vec![Val::Int(1), Val::Int(6), Val::Int(27)]),
  );
}

#[test]
fn invariant_linearity_of_sum() {
  // d/dx (x + x*x) == d/dx(x) + d/dx(x*x)
  let lhs = Expr::sum(Expr::Var(x()), Expr::mult(Expr::Var(x()), Expr::Var(x())));
  let a = symcalc::derivative(&Expr::Var(x()), &x(), &seeded_env()).unwrap();
  let b = symcalc::derivative(&Expr::mult(Expr::Var(x()), Expr::Var(x())), &x(), &seeded_env()).unwrap();
  let combined = symcalc::derivative(&lhs, &x(), &seeded_env()).unwrap();
  assert_eq!(combined, Val::Int(a.as_f64().unwrap() as i64 + b.as_f64().unwrap() as i64));
}

#[test]
fn invariant_constant_derivative_is_zero() {
  assert_eq!(symcalc::derivative(&Expr::from(42), &x(), &seeded_env()).unwrap(), Val::Int(0));
}

#[test]
fn invariant_non_differentiable_node_is_rejected() {
  let e = Expr::Compare(CompareOp::Lt, Box::new(Expr::Var(x())), Box::new(Expr::from(0)));
  assert!(symcalc::derivative(&e, &x(), &seeded_env()).is_err());
}

#[test]
fn invariant_environment_length_matches_after_let() {
  let f = Var::new("f").unwrap();
  let e = Expr::Let(
    vec![LetBinding::new(f.clone(), false, Expr::from(1))],
    Box::new(Expr::Var(f)),
  );
  let env = seeded_env();
  let before = env.depth();
  let _ = symcalc::derivative(&e, &x(), &env).unwrap();
  // `derivative` never mutates the environment it was given; the
  // `Let` extension is local to the call.
  assert_eq!(env.depth(), before);
}

#[test]
fn scope_rejects_redefinition_in_nested_let() {
  let inner = Expr::Let(vec![LetBinding::new(x(), false, Expr::from(2))], Box::new(Expr::Var(x())));
  let outer = Expr::Let(vec![LetBinding::new(x(), false, Expr::from(1))], Box::new(inner));
  assert!(symcalc::derivative(&outer, &x(), &Env::empty()).is_err());
}

#[test]
fn scope_rejects_for_loop_shadowing_bound_name() {
  let e = Expr::For(x(), Box::new(Expr::ListLit(vec![Expr::from(1), Expr::from(2)])), Box::new(Expr::Var(x())));
  assert!(symcalc::derivative(&e, &x(), &seeded_env()).is_err());
}
