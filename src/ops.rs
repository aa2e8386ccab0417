//! Elementary operations and higher-level functions composed from them.

use crate::{
  scalar::{ Real, real },
  tape::Tape,
  variable::Var,
  error::{ Result, TapeError },
};

pub use crate::variable::{ UnaryOp, BinaryOp, Leaf, UnaryNode, BinaryNode };
pub use crate::variable::mops::{
  Add, Sub, Mul, Div, Pow,
  AddScalar, SubScalar, ScalarSub, MulScalar, DivScalar, ScalarDiv,
  Neg, Exp, Ln, Sin, Cos, Tanh, Sqrt, Abs, Powf,
};


/// High-level operations, implemented exclusively on top of
/// elementary operations. As a result, these are all differentiable.

pub trait Hops<T: Real>: Sized {
  fn sqr(self) -> Self;
  fn logistic(self) -> Self;
  fn softplus(self) -> Self;
  fn hypot(self, rhs: Self) -> Self;
}

impl<'t, T: Real> Hops<T> for Var<'t, T> {
  fn sqr(self) -> Self {
    self * self
  }

  fn logistic(self) -> Self {
    ((-self).exp() + T::one()).unary(ScalarDiv(T::one()))
  }

  fn softplus(self) -> Self {
    (self.exp() + T::one()).ln()
  }

  fn hypot(self, rhs: Self) -> Self {
    (self.sqr() + rhs.sqr()).sqrt()
  }
}


impl<T: Real> Tape<T> {
  /// Inner product of two equally long lists, recorded as a single node.

  pub fn dot<'t>(&'t self, lhs: &[Var<'t, T>], rhs: &[Var<'t, T>]) -> Result<Var<'t, T>> {
    if lhs.len() != rhs.len() {
      return Err(TapeError::ArityMismatch { expected: lhs.len(), actual: rhs.len() })
    }
    let value = lhs.iter().zip(rhs).fold(T::zero(), |acc, (a, b)| acc + a.value() * b.value() );
    let operands = [lhs, rhs].concat();
    let partials: Vec<T> = rhs.iter().chain(lhs).map(|var| var.value() ).collect();
    self.precomputed(value, &operands, &partials)
  }

  pub fn mean<'t>(&'t self, terms: &[Var<'t, T>]) -> Result<Var<'t, T>> {
    if terms.is_empty() { return Err(TapeError::EmptyInput { operation: "average" }) }
    let n = real::<T>(terms.len() as f64);
    let value = terms.iter().fold(T::zero(), |acc, term| acc + term.value() ) / n;
    self.precomputed(value, terms, &vec![n.recip(); terms.len()])
  }

  /// `ln(sum(exp(x)))` without overflow. The partials are the softmax of `terms`.

  pub fn log_sum_exp<'t>(&'t self, terms: &[Var<'t, T>]) -> Result<Var<'t, T>> {
    let max = terms.iter()
      .map(|term| term.value() )
      .fold(None, |max: Option<T>, x| Some(max.map_or(x, |max| max.max(x) )) )
      .ok_or(TapeError::EmptyInput { operation: "log-sum-exp" })?;
    if max.is_infinite() {
      // Terms tied at the maximum share the gradient
      let ties = terms.iter().filter(|term| term.value() == max ).count();
      let share = real::<T>(ties as f64).recip();
      let partials: Vec<T> = terms.iter()
        .map(|term| if term.value() == max { share } else { T::zero() } )
        .collect();
      return self.precomputed(max, terms, &partials)
    }
    let exps: Vec<T> = terms.iter().map(|term| (term.value() - max).exp() ).collect();
    let total = exps.iter().fold(T::zero(), |acc, &e| acc + e );
    let partials: Vec<T> = exps.iter().map(|&e| e / total ).collect();
    self.precomputed(max + total.ln(), terms, &partials)
  }
}


#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn logistic() {
    let tape = Tape::new();
    let x = tape.var(0.0).unwrap();
    let y = x.logistic();
    assert_relative_eq!(y.value(), 0.5);
    assert_relative_eq!(tape.grad(y, &[x]).unwrap()[0], 0.25);
  }

  #[test]
  fn softplus() {
    let tape = Tape::new();
    let x = tape.var(1.0).unwrap();
    let y = x.softplus();
    assert_relative_eq!(y.value(), (1.0f64.exp() + 1.0).ln());
    assert_relative_eq!(tape.grad(y, &[x]).unwrap()[0], 1.0 / (1.0 + (-1.0f64).exp()));
  }

  #[test]
  fn hypot() {
    let tape = Tape::new();
    let x = tape.var(3.0).unwrap();
    let y = tape.var(4.0).unwrap();
    let h = x.hypot(y);
    assert_relative_eq!(h.value(), 5.0);
    let grad = tape.grad(h, &[x, y]).unwrap();
    assert_relative_eq!(grad[0], 0.6);
    assert_relative_eq!(grad[1], 0.8);
  }

  #[test]
  fn dot() {
    let tape = Tape::new();
    let a = tape.vars(&[1.0, 2.0, 3.0]).unwrap();
    let b = tape.vars(&[4.0, 5.0, 6.0]).unwrap();
    let d = tape.dot(&a, &b).unwrap();
    assert_eq!(d.value(), 32.0);
    let inputs = [a.as_slice(), b.as_slice()].concat();
    assert_eq!(tape.grad(d, &inputs).unwrap(), vec![4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
    assert!(matches!(tape.dot(&a, &b[..2]), Err(TapeError::ArityMismatch { expected: 3, actual: 2 })));
  }

  #[test]
  fn dot_with_itself() {
    let tape = Tape::new();
    let a = tape.vars(&[1.0, 2.0]).unwrap();
    let d = tape.dot(&a, &a).unwrap();
    assert_eq!(tape.grad(d, &a).unwrap(), vec![2.0, 4.0]);
  }

  #[test]
  fn mean() {
    let tape = Tape::new();
    let xs = tape.vars(&[1.0, 2.0, 3.0, 6.0]).unwrap();
    let m = tape.mean(&xs).unwrap();
    assert_eq!(m.value(), 3.0);
    assert_eq!(tape.grad(m, &xs).unwrap(), vec![0.25; 4]);
    assert!(matches!(Tape::<f64>::new().mean(&[]), Err(TapeError::EmptyInput { .. })));
  }

  #[test]
  fn log_sum_exp() {
    let tape = Tape::new();
    let xs = tape.vars(&[1000.0, 1000.0]).unwrap();
    let l = tape.log_sum_exp(&xs).unwrap();
    assert_relative_eq!(l.value(), 1000.0 + 2.0f64.ln());
    let grad = tape.grad(l, &xs).unwrap();
    assert_relative_eq!(grad[0], 0.5);
    assert_relative_eq!(grad[1], 0.5);
  }

  #[test]
  fn log_sum_exp_infinite_ties() {
    let tape = Tape::new();
    let xs = tape.vars(&[f64::INFINITY, 1.0, f64::INFINITY]).unwrap();
    let l = tape.log_sum_exp(&xs).unwrap();
    assert_eq!(l.value(), f64::INFINITY);
    assert_eq!(tape.grad(l, &xs).unwrap(), vec![0.5, 0.0, 0.5]);

    let tape = Tape::new();
    let xs = tape.vars(&[f64::NEG_INFINITY; 4]).unwrap();
    let l = tape.log_sum_exp(&xs).unwrap();
    assert_eq!(l.value(), f64::NEG_INFINITY);
    assert_eq!(tape.grad(l, &xs).unwrap(), vec![0.25; 4]);
  }
}
