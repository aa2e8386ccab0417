//! Reverse-mode automatic differentiation on an arena-backed tape.
//!
//! Every elementary operation performed on a [Var] appends one node to a
//! [Tape]. Once the output is known, seeding it and sweeping the tape in
//! reverse applies the chain rule and leaves the partial derivative of the
//! output with respect to every recorded value in that value's adjoint.
//!
//! # Features
//!
//! - **Arena allocation**: Nodes are placed into a segmented [Arena] and
//! reclaimed all at once when the tape is [recovered](Tape::recover).
//! No per-node destructor ever runs. Node types with drop glue are
//! rejected at compile time.
//!
//! - **Checked lifecycle**: A tape moves from recording to seeded to swept.
//! Out-of-order calls return [TapeError::InvalidSequencing] instead of
//! silently producing meaningless adjoints.
//!
//! - **Ordering by construction**: Nodes may only reference operands
//! that are already on the tape, so the reverse sweep always sees a
//! topologically ordered graph.
//!
//! - **Jacobians without re-recording**: Adjoints can be reset and
//! another output seeded against the same recording.
//!
//! - **Pluggable operations**: Implement [UnaryOp](ops::UnaryOp),
//! [BinaryOp](ops::BinaryOp) or [Chainable] directly to record your own
//! elementary operations.
//!
//! # Examples
//!
//! Differentiating `c = (x + y) * x`:
//! ```
//! use chaintape::Tape;
//!
//! let tape = Tape::new();
//! let x = tape.var(3.0).unwrap();
//! let y = tape.var(4.0).unwrap();
//!
//! let c = (x + y) * x;
//! assert_eq!(c.value(), 21.0);
//!
//! // Seed the output and sweep in reverse
//! tape.seed(c).unwrap();
//! tape.sweep().unwrap();
//!
//! assert_eq!(x.adjoint().unwrap(), 10.0);
//! assert_eq!(y.adjoint().unwrap(), 3.0);
//! ```
//!
//! Reusing a tape across independent computations:
//! ```
//! use chaintape::{ ops::*, Tape };
//!
//! let mut tape = Tape::new();
//! for i in 0..3 {
//!   let (value, grad) = tape.gradient_at(&[i as f64], |x| Ok(x[0].sqr().sin()) ).unwrap();
//!   assert_eq!(value, (i as f64).powi(2).sin());
//!   assert_eq!(grad.len(), 1);
//!   // Every call recovers the arena, positions restart at zero
//!   assert!(tape.is_empty());
//! }
//! ```
//!
//! # Optional features
//!
//! - `rayon`: `functional::par_gradients` evaluates many points in
//! parallel with one tape per worker.

mod internal;
mod arena;
mod chainable;
mod config;
mod error;
mod tape;
mod variable;

pub mod ops;
pub mod scalar;
pub mod functional;

pub use arena::{ Arena, MAX_ALIGN };
pub use chainable::{ Chainable, NodeId, Vari, Sweep };
pub use config::TapeConfig;
pub use error::{ TapeError, Result };
pub use tape::{ Tape, Phase, TapeStats, Snapshot, NodeRecord };
pub use variable::Var;
