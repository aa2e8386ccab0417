use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::scalar::{ Real, real };


pub fn make_id() -> usize {
  static LAST_ID: AtomicUsize = AtomicUsize::new(0);
  LAST_ID.fetch_add(1, Ordering::Relaxed)
}


struct NoDrop<N>(PhantomData<N>);

impl<N> NoDrop<N> {
  const CHECK: () = assert!(!std::mem::needs_drop::<N>(),
    "arena-allocated types must not have drop glue");
}

/// Fails to compile for any `N` that would need its destructor run.

#[inline(always)]
#[allow(clippy::let_unit_value)]
pub fn assert_no_drop<N>() {
  let () = NoDrop::<N>::CHECK;
}


// Polar Box-Muller transformation

pub fn randn<T: Real>() -> (T, T) {
  let mut rng = rand::thread_rng();
  let u = rng.gen_range(-T::one(), T::one());
  let v = rng.gen_range(-T::one(), T::one());
  let r = u * u + v * v;
  // Try again if outside interval
  if r == T::zero() || r >= T::one() { return randn() }
  let c = (real::<T>(-2.0) * r.ln() / r).sqrt();
  (u * c, v * c)
}
