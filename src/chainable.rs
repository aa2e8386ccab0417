use std::cell::Cell;
use std::ptr::NonNull;

use serde::{ Serialize, Deserialize };

use crate::{
  scalar::Real,
  error::{ Result, TapeError },
};


/// Identity of a node on a [Tape](crate::Tape).
///
/// Ids stay valid until the tape is recovered. Using one afterwards
/// yields [TapeError::DanglingReference].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
  pub(crate) tape: usize,
  pub(crate) generation: u32,
  pub(crate) position: usize,
}

impl NodeId {
  /// Insertion index on the tape.

  pub fn position(&self) -> usize {
    self.position
  }

  pub fn generation(&self) -> u32 {
    self.generation
  }
}


/// Forward value and adjoint accumulator of a recorded variable.

#[derive(Debug)]
pub struct Vari<T: Real> {
  value: T,
  adjoint: Cell<T>,
}

impl<T: Real> Vari<T> {
  pub fn new(value: T) -> Self {
    Self { value, adjoint: Cell::new(T::zero()) }
  }

  pub fn value(&self) -> T {
    self.value
  }

  pub fn adjoint(&self) -> T {
    self.adjoint.get()
  }

  pub fn accumulate(&self, delta: T) {
    self.adjoint.set(self.adjoint.get() + delta);
  }

  /// Make this the dependent variable of a gradient computation.

  pub fn seed(&self) {
    self.adjoint.set(T::one());
  }

  pub fn reset(&self) {
    self.adjoint.set(T::zero());
  }
}


/// One elementary operation recorded on a [Tape](crate::Tape).
///
/// Nodes are moved into the tape's arena and never dropped,
/// so implementors must not have drop glue. Owning a `Vec`, `Box`
/// or `Rc` fails to compile when the node gets recorded.
///
/// Every method has a no-op default, which is what leaves and
/// value-less nodes need.

pub trait Chainable<T: Real>: 'static {
  /// Push this node's adjoint into the adjoints of its operands,
  /// scaled by the local partial derivatives.
  ///
  /// Runs once per sweep, after every later node has propagated.

  fn propagate_adjoint(&self, _sweep: &Sweep<'_, T>) -> Result<()> {
    Ok(())
  }

  /// Set the adjoint to one.

  fn seed_as_output(&self) {}

  /// Set the adjoint to zero.

  fn reset_adjoint(&self) {}

  /// Nodes referenced by this one. All of them must already be on the tape.

  fn operands(&self) -> &[NodeId] {
    &[]
  }

  fn vari(&self) -> Option<&Vari<T>> {
    None
  }
}


/// View of the tape handed to [Chainable::propagate_adjoint]
/// for reading operand values and adding into their adjoints.
///
/// During a sweep, only operands the current node declared in
/// [Chainable::operands] are reachable. They all precede the node,
/// so no adjoint lands in a node that has already propagated.

pub struct Sweep<'a, T: Real> {
  tape: usize,
  generation: u32,
  nodes: &'a [NonNull<dyn Chainable<T>>],
  position: usize,
  operands: Option<&'a [NodeId]>,
}

impl<'a, T: Real> Sweep<'a, T> {
  pub(crate) fn new(tape: usize, generation: u32, nodes: &'a [NonNull<dyn Chainable<T>>]) -> Self {
    Self { tape, generation, nodes, position: nodes.len(), operands: None }
  }

  /// Restrict access to the declared `operands` of the node at `position`.

  pub(crate) fn at(&self, position: usize, operands: &'a [NodeId]) -> Self {
    Self { position, operands: Some(operands), ..*self }
  }

  fn vari(&self, id: NodeId) -> Result<&'a Vari<T>> {
    let vari = self.live(id)?;
    if let Some(operands) = self.operands {
      if !operands.contains(&id) {
        return Err(TapeError::UndeclaredOperand { position: self.position, operand: id.position })
      }
    }
    Ok(vari)
  }

  fn live(&self, id: NodeId) -> Result<&'a Vari<T>> {
    if id.tape != self.tape { return Err(TapeError::ForeignOperand { id }) }
    if id.generation != self.generation {
      return Err(TapeError::DanglingReference { id, generation: self.generation })
    }
    let node = self.nodes.get(id.position)
      .ok_or(TapeError::DanglingReference { id, generation: self.generation })?;
    if id.position >= self.position {
      return Err(TapeError::OutOfOrder { position: self.position, operand: id.position })
    }
    // Nodes live in the arena until the tape recovers, which cannot overlap a sweep
    unsafe { node.as_ref() }
      .vari()
      .ok_or(TapeError::Valueless { position: id.position })
  }

  /// The `index`th declared operand of the node being swept.

  pub fn operand(&self, index: usize) -> Result<NodeId> {
    let operands = self.operands.unwrap_or(&[]);
    operands.get(index)
      .copied()
      .ok_or(TapeError::ArityMismatch { expected: index + 1, actual: operands.len() })
  }

  /// Add `delta` into the adjoint of the `index`th declared operand.
  /// Avoids searching the operand list, which matters for nodes with many of them.

  pub fn accumulate_operand(&self, index: usize, delta: T) -> Result<()> {
    self.live(self.operand(index)?)?.accumulate(delta);
    Ok(())
  }

  /// Forward value of an operand.

  pub fn value(&self, id: NodeId) -> Result<T> {
    Ok(self.vari(id)?.value())
  }

  pub fn adjoint(&self, id: NodeId) -> Result<T> {
    Ok(self.vari(id)?.adjoint())
  }

  /// Add `delta` into an operand's adjoint.

  pub fn accumulate(&self, id: NodeId, delta: T) -> Result<()> {
    self.vari(id)?.accumulate(delta);
    Ok(())
  }
}
