//! Error types for chaintape.

use thiserror::Error;

use crate::{ chainable::NodeId, tape::Phase };


/// Errors raised while recording, sweeping or recovering a [Tape](crate::Tape).

#[derive(Debug, Error)]
pub enum TapeError {
  /// The arena could not provide the requested block.
  /// The current computation has to be abandoned.
  #[error("arena out of memory: requested {requested} bytes with {capacity} bytes reserved")]
  OutOfMemory { requested: usize, capacity: usize },

  #[error("unsupported layout: {size} bytes aligned to {align}")]
  UnsupportedLayout { size: usize, align: usize },

  /// A lifecycle operation was invoked in the wrong phase.
  #[error("cannot {operation} while tape is {phase:?}")]
  InvalidSequencing { operation: &'static str, phase: Phase },

  /// A node id from an earlier generation or past the end of the tape.
  ///
  /// Generations never repeat for a given tape id. When the counter
  /// runs out, the tape takes a fresh id and old ids turn foreign.
  #[error("node {} of generation {} is not live (tape is at generation {generation})", id.position(), id.generation())]
  DanglingReference { id: NodeId, generation: u32 },

  #[error("node {} was recorded on a different tape", id.position())]
  ForeignOperand { id: NodeId },

  /// A node reached for a node recorded at or after its own position.
  #[error("node {position} cannot reach node {operand}, which does not precede it")]
  OutOfOrder { position: usize, operand: usize },

  #[error("node {position} reached node {operand} without declaring it as an operand")]
  UndeclaredOperand { position: usize, operand: usize },

  #[error("expected {expected} operands, got {actual}")]
  ArityMismatch { expected: usize, actual: usize },

  #[error("cannot {operation} zero terms")]
  EmptyInput { operation: &'static str },

  /// The node carries no value or adjoint.
  #[error("node at position {position} carries no value")]
  Valueless { position: usize },

  #[error("invalid configuration value {value:?} for {key}")]
  Config { key: &'static str, value: String },

  #[error("snapshot encoding failed: {0}")]
  Snapshot(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TapeError>;
