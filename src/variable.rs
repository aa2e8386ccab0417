use std::fmt::Debug;
use std::ptr::NonNull;

pub(crate) mod mops;

use crate::{
  scalar::Real,
  tape::Tape,
  chainable::{ Chainable, NodeId, Vari, Sweep },
  error::Result,
};


/// Unary elementary operation that can also compute its derivative.
///
/// Operations get moved into the arena along with their node,
/// hence the `Copy` bound.

pub trait UnaryOp<T: Real>: Debug + Copy + 'static {
  fn run(&self, x: T) -> T;

  /// Partial derivative of the result with respect to `x`,
  /// given the forward `value`.
  fn derive(&self, x: T, value: T) -> T;
}


/// Binary elementary operation that can also compute its derivatives.

pub trait BinaryOp<T: Real>: Debug + Copy + 'static {
  fn run(&self, lhs: T, rhs: T) -> T;
  fn derive(&self, lhs: T, rhs: T, value: T) -> (T, T);
}


/// Independent variable without operands.

#[derive(Debug)]
pub struct Leaf<T: Real> {
  vari: Vari<T>,
}

impl<T: Real> Leaf<T> {
  pub fn new(value: T) -> Self {
    Self { vari: Vari::new(value) }
  }
}

impl<T: Real> Chainable<T> for Leaf<T> {
  fn seed_as_output(&self) {
    self.vari.seed()
  }

  fn reset_adjoint(&self) {
    self.vari.reset()
  }

  fn vari(&self) -> Option<&Vari<T>> {
    Some(&self.vari)
  }
}


/// Node recording the application of a [UnaryOp].

#[derive(Debug)]
pub struct UnaryNode<T: Real, O: UnaryOp<T>> {
  vari: Vari<T>,
  operand: [NodeId; 1],
  op: O,
}

impl<T: Real, O: UnaryOp<T>> Chainable<T> for UnaryNode<T, O> {
  fn propagate_adjoint(&self, sweep: &Sweep<'_, T>) -> Result<()> {
    let [x] = self.operand;
    let partial = self.op.derive(sweep.value(x)?, self.vari.value());
    sweep.accumulate(x, self.vari.adjoint() * partial)
  }

  fn seed_as_output(&self) {
    self.vari.seed()
  }

  fn reset_adjoint(&self) {
    self.vari.reset()
  }

  fn operands(&self) -> &[NodeId] {
    &self.operand
  }

  fn vari(&self) -> Option<&Vari<T>> {
    Some(&self.vari)
  }
}


/// Node recording the application of a [BinaryOp].

#[derive(Debug)]
pub struct BinaryNode<T: Real, O: BinaryOp<T>> {
  vari: Vari<T>,
  operands: [NodeId; 2],
  op: O,
}

impl<T: Real, O: BinaryOp<T>> Chainable<T> for BinaryNode<T, O> {
  fn propagate_adjoint(&self, sweep: &Sweep<'_, T>) -> Result<()> {
    let [lhs, rhs] = self.operands;
    let (dl, dr) = self.op.derive(sweep.value(lhs)?, sweep.value(rhs)?, self.vari.value());
    let adjoint = self.vari.adjoint();
    sweep.accumulate(lhs, adjoint * dl)?;
    sweep.accumulate(rhs, adjoint * dr)
  }

  fn seed_as_output(&self) {
    self.vari.seed()
  }

  fn reset_adjoint(&self) {
    self.vari.reset()
  }

  fn operands(&self) -> &[NodeId] {
    &self.operands
  }

  fn vari(&self) -> Option<&Vari<T>> {
    Some(&self.vari)
  }
}


/// Node with an arbitrary number of operands and partials fixed at recording time.
/// Both lists live in the tape's arena.

pub(crate) struct Precomputed<T: Real> {
  vari: Vari<T>,
  operands: NonNull<[NodeId]>,
  partials: NonNull<[T]>,
}

impl<T: Real> Precomputed<T> {
  /// # Safety
  /// Both slices must come from the arena this node is recorded into.

  pub(crate) unsafe fn new(value: T, operands: NonNull<[NodeId]>, partials: NonNull<[T]>) -> Self {
    Self { vari: Vari::new(value), operands, partials }
  }

  fn partials(&self) -> &[T] {
    unsafe { self.partials.as_ref() }
  }
}

impl<T: Real> Chainable<T> for Precomputed<T> {
  fn propagate_adjoint(&self, sweep: &Sweep<'_, T>) -> Result<()> {
    let adjoint = self.vari.adjoint();
    for (index, &partial) in self.partials().iter().enumerate() {
      sweep.accumulate_operand(index, adjoint * partial)?;
    }
    Ok(())
  }

  fn seed_as_output(&self) {
    self.vari.seed()
  }

  fn reset_adjoint(&self) {
    self.vari.reset()
  }

  fn operands(&self) -> &[NodeId] {
    unsafe { self.operands.as_ref() }
  }

  fn vari(&self) -> Option<&Vari<T>> {
    Some(&self.vari)
  }
}


/// Gradient-tracked value recorded on a [Tape].
///
/// Vars are cheap to copy and borrow their tape, so the tape
/// cannot be recovered while any of them is still in use.
/// Arithmetic on Vars records new nodes.

#[derive(Clone, Copy)]
pub struct Var<'t, T: Real> {
  tape: &'t Tape<T>,
  id: NodeId,
  value: T,
}

impl<'t, T: Real> Var<'t, T> {
  pub(crate) fn new(tape: &'t Tape<T>, id: NodeId, value: T) -> Self {
    Self { tape, id, value }
  }

  pub fn id(&self) -> NodeId {
    self.id
  }

  pub fn value(&self) -> T {
    self.value
  }

  pub fn tape(&self) -> &'t Tape<T> {
    self.tape
  }

  /// Adjoint after a sweep.

  pub fn adjoint(&self) -> Result<T> {
    self.tape.adjoint(*self)
  }

  pub fn try_unary(self, op: impl UnaryOp<T>) -> Result<Self> {
    let value = op.run(self.value);
    self.tape.record(UnaryNode {
      vari: Vari::new(value),
      operand: [self.id],
      op,
    })
  }

  pub fn try_binary(self, op: impl BinaryOp<T>, rhs: Self) -> Result<Self> {
    let value = op.run(self.value, rhs.value);
    self.tape.record(BinaryNode {
      vari: Vari::new(value),
      operands: [self.id, rhs.id],
      op,
    })
  }

  pub fn unary(self, op: impl UnaryOp<T>) -> Self {
    self.try_unary(op).unwrap_or_else(|err| panic!("Could not record {op:?}: {err}") )
  }

  pub fn binary(self, op: impl BinaryOp<T>, rhs: Self) -> Self {
    self.try_binary(op, rhs).unwrap_or_else(|err| panic!("Could not record {op:?}: {err}") )
  }
}

impl<T: Real> Debug for Var<'_, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.debug_struct("Var")
      .field("position", &self.id.position())
      .field("value", &self.value)
      .finish()
  }
}

impl<T: Real + std::fmt::Display> std::fmt::Display for Var<'_, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Var#{} {}", self.id.position(), self.value)
  }
}

impl<T: Real> PartialEq for Var<'_, T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.id == rhs.id
  }
}
