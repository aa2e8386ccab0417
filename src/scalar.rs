use std::fmt::Debug;

use rand::distributions::uniform::SampleUniform;
use num_traits::{ Float, NumAssignOps };


/// All types that may be used as values and adjoints on a [Tape](crate::Tape).
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Real: Float + NumAssignOps + Debug + Send + Sync + SampleUniform + 'static {}
impl<T: Float + NumAssignOps + Debug + Send + Sync + SampleUniform + 'static> Real for T {}


/// Convert a literal into any [Real] type.

#[inline]
pub fn real<T: Real>(x: f64) -> T {
  T::from(x).unwrap_or_else(T::nan)
}
