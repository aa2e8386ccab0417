//! Gradient functionals running a closure on a fresh recording.
//!
//! Each call records `f` on a tape, sweeps, reads the adjoints out
//! and recovers, so no tape state leaks between calls.

use itertools::Itertools;
use log::debug;

use crate::{
  internal::randn,
  scalar::{ Real, real },
  tape::Tape,
  variable::Var,
  error::Result,
};


/// Value and gradient of `f` at `x`.

pub fn gradient<T, F>(f: F, x: &[T]) -> Result<(T, Vec<T>)>
where
  T: Real,
  F: for<'t> FnOnce(&[Var<'t, T>]) -> Result<Var<'t, T>>
{
  Tape::new().gradient_at(x, f)
}


/// Values and Jacobian of a vector-valued `f` at `x`.
///
/// The forward pass runs once. Rows are computed by resetting
/// adjoints and seeding one output after the other.

pub fn jacobian<T, F>(f: F, x: &[T]) -> Result<(Vec<T>, Vec<Vec<T>>)>
where
  T: Real,
  F: for<'t> FnOnce(&[Var<'t, T>]) -> Result<Vec<Var<'t, T>>>
{
  Tape::new().jacobian_at(x, f)
}


/// Gradients of `f` at a number of points, reusing a single tape.

pub fn gradients<T, F>(f: F, points: &[Vec<T>]) -> Result<Vec<(T, Vec<T>)>>
where
  T: Real,
  F: for<'t> Fn(&[Var<'t, T>]) -> Result<Var<'t, T>>
{
  let mut tape = Tape::new();
  points.iter()
    .map(|x| tape.gradient_at(x, &f) )
    .collect()
}


/// Gradients of `f` at a number of points in parallel.
///
/// Every worker records on its own tape.

#[cfg(feature = "rayon")]
pub fn par_gradients<T, F>(f: F, points: &[Vec<T>]) -> Result<Vec<(T, Vec<T>)>>
where
  T: Real,
  F: for<'t> Fn(&[Var<'t, T>]) -> Result<Var<'t, T>> + Sync
{
  use rayon::prelude::*;

  points.par_iter()
    .map_init(Tape::new, |tape, x| tape.gradient_at(x, &f) )
    .collect()
}


/// Compare the automatically derived gradient of `f` at `x`
/// with central finite differences of step `eps`.
///
/// Returns the largest absolute difference.

pub fn check_gradient<T, F>(f: F, x: &[T], eps: T) -> Result<T>
where
  T: Real,
  F: for<'t> Fn(&[Var<'t, T>]) -> Result<Var<'t, T>>
{
  let mut tape = Tape::new();
  let (_, grad) = tape.gradient_at(x, &f)?;
  let two = real::<T>(2.0);
  let mut error = T::zero();
  for (i, auto) in grad.into_iter().enumerate() {
    let mut point = x.to_vec();
    point[i] = x[i] + eps;
    let next = value_at(&mut tape, &point, &f)?;
    point[i] = x[i] - eps;
    let prev = value_at(&mut tape, &point, &f)?;
    let numeric = (next - prev) / (two * eps);
    error = error.max((auto - numeric).abs());
  }
  debug!("max gradient error {error:?} over {} inputs", x.len());
  Ok(error)
}


/// Like [check_gradient], at a point drawn from a standard normal distribution.

pub fn check_gradient_random<T, F>(f: F, dims: usize) -> Result<T>
where
  T: Real,
  F: for<'t> Fn(&[Var<'t, T>]) -> Result<Var<'t, T>>
{
  let x = (0..dims.div_ceil(2))
    .flat_map(|_| { let (a, b) = randn::<T>(); [a, b] })
    .take(dims)
    .collect_vec();
  check_gradient(f, &x, real(1e-3))
}


fn value_at<T, F>(tape: &mut Tape<T>, x: &[T], f: &F) -> Result<T>
where
  T: Real,
  F: for<'t> Fn(&[Var<'t, T>]) -> Result<Var<'t, T>>
{
  let value = tape.vars(x).and_then(|inputs| f(&inputs).map(|output| output.value() ));
  tape.recover();
  value
}
