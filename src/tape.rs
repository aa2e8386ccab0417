use std::cell::{ Cell, RefCell };
use std::ptr::NonNull;

use itertools::Itertools;
use log::debug;
use serde::{ Serialize, Deserialize };

mod snapshot;

pub use snapshot::{ Snapshot, NodeRecord };

use crate::{
  internal::*,
  arena::Arena,
  config::TapeConfig,
  scalar::Real,
  chainable::{ Chainable, NodeId, Sweep },
  error::{ Result, TapeError },
  variable::{ Var, Leaf, Precomputed },
};


/// Lifecycle phase of a [Tape].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
  /// Nodes may be appended. Initial phase and the phase after recovery.
  Recording,
  /// One output has been seeded. The tape is immutable from here on.
  Seeded,
  /// Every node has propagated its adjoint. Adjoints can be read.
  Swept,
  /// All adjoints were zeroed and another output may be seeded.
  Reset,
  /// An allocation failed. Only recovery is allowed.
  Aborted,
}


/// Memory and size figures of a [Tape].

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeStats {
  pub nodes: usize,
  pub generation: u32,
  pub phase: Phase,
  pub bytes_allocated: usize,
  pub capacity: usize,
  pub segments: usize,
}


/// Ordered record of the elementary operations of one computation,
/// together with the arena their nodes live in.
///
/// A tape moves through [Phase::Recording], [Phase::Seeded] and
/// [Phase::Swept] before [recover](Tape::recover) brings it back to
/// recording. Calling an operation in the wrong phase yields
/// [TapeError::InvalidSequencing].
///
/// Tapes are independent of each other. Use one per thread for
/// concurrent computations.

pub struct Tape<T: Real> {
  id: usize,
  generation: u32,
  phase: Cell<Phase>,
  seeded: Cell<Option<NodeId>>,
  arena: RefCell<Arena>,
  nodes: RefCell<Vec<NonNull<dyn Chainable<T>>>>,
  config: TapeConfig,
}

impl<T: Real> Default for Tape<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Real> std::fmt::Debug for Tape<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.debug_struct("Tape")
      .field("id", &self.id)
      .field("generation", &self.generation)
      .field("phase", &self.phase.get())
      .field("nodes", &self.len())
      .finish()
  }
}

impl<T: Real> Tape<T> {
  pub fn new() -> Self {
    Self::with_config(TapeConfig::default())
  }

  pub fn with_config(config: TapeConfig) -> Self {
    Self {
      id: make_id(),
      generation: 0,
      phase: Cell::new(Phase::Recording),
      seeded: Cell::new(None),
      arena: RefCell::new(Arena::new(&config)),
      nodes: RefCell::new(vec![]),
      config,
    }
  }

  pub fn config(&self) -> &TapeConfig {
    &self.config
  }

  pub fn phase(&self) -> Phase {
    self.phase.get()
  }

  /// Number of recoveries this tape went through.

  pub fn generation(&self) -> u32 {
    self.generation
  }

  pub fn len(&self) -> usize {
    self.nodes.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The node that was seeded last, if any.

  pub fn seeded(&self) -> Option<NodeId> {
    self.seeded.get()
  }

  /// Record an independent variable.

  pub fn var(&self, value: T) -> Result<Var<'_, T>> {
    self.record(Leaf::new(value))
  }

  /// Record a batch of independent variables.

  pub fn vars(&self, values: &[T]) -> Result<Vec<Var<'_, T>>> {
    values.iter().map(|&value| self.var(value) ).collect()
  }

  /// Record a value-carrying node and return a handle to it.

  pub fn record<N: Chainable<T>>(&self, node: N) -> Result<Var<'_, T>> {
    let value = node.vari()
      .map(|vari| vari.value() )
      .ok_or(TapeError::Valueless { position: self.len() })?;
    let id = self.push(node)?;
    Ok(Var::new(self, id, value))
  }

  /// Append any node to the tape.
  ///
  /// Every operand must have been recorded earlier on this tape
  /// during the current generation.

  pub fn push<N: Chainable<T>>(&self, node: N) -> Result<NodeId> {
    self.expect(&[Phase::Recording], "record")?;
    for &operand in node.operands() {
      self.check(operand)?;
    }
    let ptr = self.arena.borrow_mut().alloc(node).map_err(|err| self.abort_on_exhaustion(err) )?;
    let ptr: NonNull<dyn Chainable<T>> = ptr;
    let mut nodes = self.nodes.borrow_mut();
    nodes.push(ptr);
    Ok(self.node_id(nodes.len() - 1))
  }

  /// Record a node whose partial derivatives with respect to
  /// `operands` are known up front.

  pub fn precomputed(&self, value: T, operands: &[Var<'_, T>], partials: &[T]) -> Result<Var<'_, T>> {
    if operands.len() != partials.len() {
      return Err(TapeError::ArityMismatch { expected: operands.len(), actual: partials.len() })
    }
    self.expect(&[Phase::Recording], "record")?;
    let ids: Vec<NodeId> = operands.iter().map(|operand| operand.id() ).collect();
    let node = {
      let mut arena = self.arena.borrow_mut();
      let ids = arena.alloc_slice_copy(&ids);
      let partials = arena.alloc_slice_copy(partials);
      match (ids, partials) {
        (Ok(ids), Ok(partials)) => Ok(unsafe { Precomputed::new(value, ids, partials) }),
        (Err(err), _) | (_, Err(err)) => Err(err),
      }
    };
    let node = node.map_err(|err| self.abort_on_exhaustion(err) )?;
    self.record(node)
  }

  /// Record the sum of `terms`.

  pub fn sum(&self, terms: &[Var<'_, T>]) -> Result<Var<'_, T>> {
    let value = terms.iter().fold(T::zero(), |acc, term| acc + term.value() );
    let ones = vec![T::one(); terms.len()];
    self.precomputed(value, terms, &ones)
  }

  /// Mark `output` as the dependent variable.

  pub fn seed(&self, output: Var<'_, T>) -> Result<()> {
    self.seed_node(output.id())
  }

  pub fn seed_node(&self, id: NodeId) -> Result<()> {
    self.expect(&[Phase::Recording, Phase::Reset], "seed")?;
    let node = self.node(id)?;
    if node.vari().is_none() {
      return Err(TapeError::Valueless { position: id.position })
    }
    node.seed_as_output();
    self.seeded.set(Some(id));
    self.phase.set(Phase::Seeded);
    debug!("tape {} seeded node {} of {}", self.id, id.position, self.len());
    Ok(())
  }

  /// Propagate adjoints through every node in reverse insertion order.

  pub fn sweep(&self) -> Result<()> {
    self.expect(&[Phase::Seeded], "sweep")?;
    let nodes = self.nodes.borrow();
    let sweep = Sweep::new(self.id, self.generation, &nodes);
    for (position, node) in nodes.iter().enumerate().rev() {
      let node = unsafe { node.as_ref() };
      if let Err(err) = node.propagate_adjoint(&sweep.at(position, node.operands())) {
        self.phase.set(Phase::Aborted);
        debug!("tape {} aborted during sweep: {err}", self.id);
        return Err(err)
      }
    }
    self.phase.set(Phase::Swept);
    debug!("tape {} swept {} nodes", self.id, nodes.len());
    Ok(())
  }

  /// Zero every adjoint so that another output can be seeded
  /// without recording the computation again.

  pub fn reset_adjoints(&self) -> Result<()> {
    self.expect(&[Phase::Seeded, Phase::Swept, Phase::Reset], "reset adjoints")?;
    for node in self.nodes.borrow().iter() {
      unsafe { node.as_ref() }.reset_adjoint();
    }
    self.seeded.set(None);
    self.phase.set(Phase::Reset);
    Ok(())
  }

  /// Adjoint of a variable after a sweep.

  pub fn adjoint(&self, var: Var<'_, T>) -> Result<T> {
    self.adjoint_of(var.id())
  }

  pub fn adjoint_of(&self, id: NodeId) -> Result<T> {
    self.expect(&[Phase::Swept], "read adjoints")?;
    self.node(id)?
      .vari()
      .map(|vari| vari.adjoint() )
      .ok_or(TapeError::Valueless { position: id.position })
  }

  /// Forward value of any live node.

  pub fn value_of(&self, id: NodeId) -> Result<T> {
    self.node(id)?
      .vari()
      .map(|vari| vari.value() )
      .ok_or(TapeError::Valueless { position: id.position })
  }

  pub fn operands_of(&self, id: NodeId) -> Result<Vec<NodeId>> {
    Ok(self.node(id)?.operands().to_vec())
  }

  /// Gradient of `output` with respect to `inputs`.
  ///
  /// Resets adjoints first if the tape has been seeded before.

  pub fn grad(&self, output: Var<'_, T>, inputs: &[Var<'_, T>]) -> Result<Vec<T>> {
    if matches!(self.phase(), Phase::Seeded | Phase::Swept) {
      self.reset_adjoints()?;
    }
    self.seed(output)?;
    self.sweep()?;
    inputs.iter().map(|&input| self.adjoint(input) ).collect()
  }

  /// One gradient row per output, all from the same recording.

  pub fn jacobian(&self, outputs: &[Var<'_, T>], inputs: &[Var<'_, T>]) -> Result<Vec<Vec<T>>> {
    outputs.iter().map(|&output| self.grad(output, inputs) ).collect()
  }

  /// Record `f` at `x`, return its value and gradient and recover.

  pub fn gradient_at<F>(&mut self, x: &[T], f: F) -> Result<(T, Vec<T>)>
  where
    F: for<'t> FnOnce(&[Var<'t, T>]) -> Result<Var<'t, T>>
  {
    let result = self.evaluate(x, f);
    self.recover();
    result
  }

  fn evaluate<F>(&self, x: &[T], f: F) -> Result<(T, Vec<T>)>
  where
    F: for<'t> FnOnce(&[Var<'t, T>]) -> Result<Var<'t, T>>
  {
    let inputs = self.vars(x)?;
    let output = f(&inputs)?;
    let grad = self.grad(output, &inputs)?;
    Ok((output.value(), grad))
  }

  /// Record `f` at `x`, return its values and Jacobian and recover.

  pub fn jacobian_at<F>(&mut self, x: &[T], f: F) -> Result<(Vec<T>, Vec<Vec<T>>)>
  where
    F: for<'t> FnOnce(&[Var<'t, T>]) -> Result<Vec<Var<'t, T>>>
  {
    let result = self.evaluate_all(x, f);
    self.recover();
    result
  }

  fn evaluate_all<F>(&self, x: &[T], f: F) -> Result<(Vec<T>, Vec<Vec<T>>)>
  where
    F: for<'t> FnOnce(&[Var<'t, T>]) -> Result<Vec<Var<'t, T>>>
  {
    let inputs = self.vars(x)?;
    let outputs = f(&inputs)?;
    let jacobian = self.jacobian(&outputs, &inputs)?;
    Ok((outputs.iter().map(|output| output.value() ).collect(), jacobian))
  }

  /// Discard every node and recover the arena.
  ///
  /// Previously issued [NodeId]s become dangling. Once the generation
  /// counter is exhausted the tape switches to a fresh id instead of
  /// wrapping around, so old ids never come back to life. [Var]s borrow the
  /// tape, so none can outlive this call.

  pub fn recover(&mut self) {
    let nodes = self.nodes.get_mut();
    debug!("tape {} recovering {} nodes of generation {}", self.id, nodes.len(), self.generation);
    nodes.clear();
    self.arena.get_mut().recover();
    match self.generation.checked_add(1) {
      Some(generation) => self.generation = generation,
      None => {
        self.id = make_id();
        self.generation = 0;
      }
    }
    self.seeded.set(None);
    self.phase.set(Phase::Recording);
  }

  /// Recover and return all arena memory beyond the first segment.

  pub fn free_memory(&mut self) {
    self.recover();
    self.arena.get_mut().free_all();
  }

  pub fn stats(&self) -> TapeStats {
    let arena = self.arena.borrow();
    TapeStats {
      nodes: self.len(),
      generation: self.generation,
      phase: self.phase(),
      bytes_allocated: arena.bytes_allocated(),
      capacity: arena.capacity(),
      segments: arena.segments(),
    }
  }

  /// Values, adjoints and operands of every node.

  pub fn snapshot(&self) -> Snapshot<T> {
    let nodes = self.nodes.borrow();
    let nodes = nodes.iter()
      .enumerate()
      .map(|(position, node)| {
        let node = unsafe { node.as_ref() };
        let vari = node.vari();
        NodeRecord {
          position,
          value: vari.map(|vari| vari.value() ),
          adjoint: vari.map(|vari| vari.adjoint() ),
          operands: node.operands().iter().map(|id| id.position ).collect(),
        }
      })
      .collect();
    Snapshot {
      generation: self.generation,
      phase: self.phase(),
      nodes,
    }
  }

  /// Only exhaustion ends the computation. Other arena errors reject a single node.

  fn abort_on_exhaustion(&self, err: TapeError) -> TapeError {
    if let TapeError::OutOfMemory { .. } = err {
      self.phase.set(Phase::Aborted);
      debug!("tape {} aborted: {err}", self.id);
    }
    err
  }

  fn node_id(&self, position: usize) -> NodeId {
    NodeId { tape: self.id, generation: self.generation, position }
  }

  fn expect(&self, allowed: &[Phase], operation: &'static str) -> Result<()> {
    let phase = self.phase();
    if allowed.contains(&phase) {
      Ok(())
    } else {
      Err(TapeError::InvalidSequencing { operation, phase })
    }
  }

  fn check(&self, id: NodeId) -> Result<()> {
    if id.tape != self.id { return Err(TapeError::ForeignOperand { id }) }
    if id.generation != self.generation || id.position >= self.len() {
      return Err(TapeError::DanglingReference { id, generation: self.generation })
    }
    Ok(())
  }

  fn node(&self, id: NodeId) -> Result<&dyn Chainable<T>> {
    self.check(id)?;
    let ptr = self.nodes.borrow()[id.position];
    // Arena memory only gets reused through `&mut self`
    Ok(unsafe { ptr.as_ref() })
  }

  /// Positions of every operand, grouped by the node referencing them.

  pub fn dependencies(&self) -> Vec<(usize, Vec<usize>)> {
    self.nodes.borrow().iter()
      .map(|node| unsafe { node.as_ref() }.operands().iter().map(|id| id.position ).collect_vec() )
      .enumerate()
      .collect()
  }
}


#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use approx::assert_relative_eq;

  use super::*;
  use crate::chainable::Vari;

  thread_local! {
    static ORDER: RefCell<Vec<usize>> = const { RefCell::new(vec![]) };
  }

  /// Records the order in which the sweep visits it.
  struct Probe(usize);

  impl Chainable<f64> for Probe {
    fn propagate_adjoint(&self, _sweep: &Sweep<'_, f64>) -> Result<()> {
      ORDER.with(|order| order.borrow_mut().push(self.0) );
      Ok(())
    }
  }

  /// References an operand it does not declare.
  struct Sneaky { vari: Vari<f64>, target: NodeId }

  impl Chainable<f64> for Sneaky {
    fn propagate_adjoint(&self, sweep: &Sweep<'_, f64>) -> Result<()> {
      sweep.accumulate(self.target, self.vari.adjoint())
    }

    fn seed_as_output(&self) {
      self.vari.seed()
    }

    fn vari(&self) -> Option<&Vari<f64>> {
      Some(&self.vari)
    }
  }

  #[test]
  fn product_plus_operand() {
    let tape = Tape::new();
    let a = tape.var(3.0).unwrap();
    let b = tape.var(5.0).unwrap();
    let out = a * b + a;
    assert_eq!(out.value(), 18.0);
    let grad = tape.grad(out, &[a, b]).unwrap();
    assert_relative_eq!(grad[0], 6.0);
    assert_relative_eq!(grad[1], 3.0);
  }

  #[test]
  fn sweep_runs_in_reverse() {
    ORDER.with(|order| order.borrow_mut().clear() );
    let tape = Tape::<f64>::new();
    let x = tape.var(1.0).unwrap();
    for i in 0..5 {
      tape.push(Probe(i)).unwrap();
    }
    tape.seed(x).unwrap();
    tape.sweep().unwrap();
    ORDER.with(|order| assert_eq!(*order.borrow(), vec![4, 3, 2, 1, 0]) );
  }

  #[test]
  fn phases() {
    let tape = Tape::new();
    assert_eq!(tape.phase(), Phase::Recording);
    let x = tape.var(2.0).unwrap();
    let y = x.sin();

    assert!(matches!(tape.sweep(), Err(TapeError::InvalidSequencing { operation: "sweep", phase: Phase::Recording })));
    assert!(matches!(tape.adjoint(x), Err(TapeError::InvalidSequencing { .. })));
    assert!(matches!(tape.reset_adjoints(), Err(TapeError::InvalidSequencing { .. })));

    tape.seed(y).unwrap();
    assert_eq!(tape.phase(), Phase::Seeded);
    assert_eq!(tape.seeded(), Some(y.id()));
    assert!(matches!(tape.var(1.0), Err(TapeError::InvalidSequencing { operation: "record", phase: Phase::Seeded })));
    assert!(matches!(tape.seed(x), Err(TapeError::InvalidSequencing { operation: "seed", .. })));

    tape.sweep().unwrap();
    assert_eq!(tape.phase(), Phase::Swept);
    assert!(matches!(tape.sweep(), Err(TapeError::InvalidSequencing { .. })));
    assert!(matches!(tape.seed(x), Err(TapeError::InvalidSequencing { .. })));
    assert_relative_eq!(tape.adjoint(x).unwrap(), 2.0f64.cos());
  }

  #[test]
  fn reseeding() {
    let tape = Tape::new();
    let x = tape.var(2.0).unwrap();
    let y = tape.var(3.0).unwrap();
    let f = x * y;
    let g = x + y * y;
    assert_eq!(tape.grad(f, &[x, y]).unwrap(), vec![3.0, 2.0]);

    tape.reset_adjoints().unwrap();
    assert_eq!(tape.phase(), Phase::Reset);
    assert!(matches!(tape.adjoint(x), Err(TapeError::InvalidSequencing { .. })));
    tape.seed(g).unwrap();
    tape.sweep().unwrap();
    assert_eq!(tape.adjoint(x).unwrap(), 1.0);
    assert_eq!(tape.adjoint(y).unwrap(), 6.0);
    assert_eq!(tape.adjoint(f).unwrap(), 0.0);
  }

  #[test]
  fn jacobian_rows() {
    let tape = Tape::new();
    let x = tape.var(1.0).unwrap();
    let y = tape.var(2.0).unwrap();
    let rows = tape.jacobian(&[x * y, x - y, x.exp()], &[x, y]).unwrap();
    assert_eq!(rows[0], vec![2.0, 1.0]);
    assert_eq!(rows[1], vec![1.0, -1.0]);
    assert_relative_eq!(rows[2][0], 1.0f64.exp());
    assert_eq!(rows[2][1], 0.0);
  }

  #[test]
  fn recovery_invalidates_ids() {
    let mut tape = Tape::new();
    let id = tape.var(1.0).unwrap().id();
    assert_eq!(tape.value_of(id).unwrap(), 1.0);
    tape.recover();
    assert!(tape.is_empty());
    assert_eq!(tape.generation(), 1);
    assert!(matches!(tape.value_of(id), Err(TapeError::DanglingReference { generation: 1, .. })));
    let fresh = tape.var(4.0).unwrap();
    assert_eq!(fresh.id().position(), 0);
    assert_eq!(tape.value_of(fresh.id()).unwrap(), 4.0);
  }

  #[test]
  fn rejects_foreign_operands() {
    let one = Tape::new();
    let other = Tape::new();
    let x = one.var(1.0).unwrap();
    let y = other.var(2.0).unwrap();
    assert!(matches!(x.try_add(y), Err(TapeError::ForeignOperand { .. })));
    assert!(matches!(one.precomputed(3.0, &[x, y], &[1.0, 1.0]), Err(TapeError::ForeignOperand { .. })));
  }

  #[test]
  fn sweep_surfaces_node_errors() {
    let tape = Tape::new();
    let x = tape.var(1.0).unwrap();
    let target = NodeId { position: 5, ..x.id() };
    let out = tape.record(Sneaky { vari: Vari::new(2.0), target }).unwrap();
    tape.seed(out).unwrap();
    assert!(matches!(tape.sweep(), Err(TapeError::DanglingReference { .. })));
    assert_eq!(tape.phase(), Phase::Aborted);
  }

  #[test]
  fn sweep_rejects_later_nodes() {
    let tape = Tape::new();
    let x = tape.var(1.0).unwrap();
    // Points at the node recorded right after it
    let target = NodeId { position: 2, ..x.id() };
    let late = tape.record(Sneaky { vari: Vari::new(2.0), target }).unwrap();
    let y = x * 3.0;
    assert_eq!(y.id(), target);
    tape.seed(late).unwrap();
    assert!(matches!(tape.sweep(), Err(TapeError::OutOfOrder { position: 1, operand: 2 })));
    assert_eq!(tape.phase(), Phase::Aborted);
  }

  #[test]
  fn sweep_rejects_undeclared_operands() {
    let tape = Tape::new();
    let x = tape.var(1.0).unwrap();
    let out = tape.record(Sneaky { vari: Vari::new(2.0), target: x.id() }).unwrap();
    tape.seed(out).unwrap();
    assert!(matches!(tape.sweep(), Err(TapeError::UndeclaredOperand { position: 1, operand: 0 })));
  }

  #[test]
  fn seeding_requires_a_value() {
    let tape = Tape::<f64>::new();
    let id = tape.push(Probe(0)).unwrap();
    assert!(matches!(tape.seed_node(id), Err(TapeError::Valueless { position: 0 })));
    assert_eq!(tape.phase(), Phase::Recording);
    assert_eq!(tape.seeded(), None);
  }

  #[repr(align(128))]
  struct Wide(Vari<f64>);

  impl Chainable<f64> for Wide {
    fn vari(&self) -> Option<&Vari<f64>> {
      Some(&self.0)
    }
  }

  #[test]
  fn overaligned_nodes_leave_tape_usable() {
    let tape = Tape::new();
    let x = tape.var(2.0).unwrap();
    assert!(matches!(tape.record(Wide(Vari::new(1.0))), Err(TapeError::UnsupportedLayout { align: 128, .. })));
    assert_eq!(tape.phase(), Phase::Recording);
    let y = x * x;
    assert_eq!(tape.grad(y, &[x]).unwrap(), vec![4.0]);
  }

  #[test]
  fn exhausted_generations_retire_ids() {
    let mut tape = Tape::new();
    tape.generation = u32::MAX;
    let stale = tape.var(1.0).unwrap().id();
    tape.recover();
    assert_eq!(tape.generation(), 0);
    assert!(matches!(tape.value_of(stale), Err(TapeError::ForeignOperand { .. })));
    let fresh = tape.var(2.0).unwrap();
    assert_eq!(tape.value_of(fresh.id()).unwrap(), 2.0);
  }

  #[test]
  fn valueless_nodes() {
    let tape = Tape::<f64>::new();
    assert!(matches!(tape.record(Probe(0)), Err(TapeError::Valueless { position: 0 })));
    let id = tape.push(Probe(0)).unwrap();
    assert!(matches!(tape.value_of(id), Err(TapeError::Valueless { position: 0 })));
    assert!(tape.operands_of(id).unwrap().is_empty());
  }

  #[test]
  fn out_of_memory_aborts() {
    let config = TapeConfig::default().with_initial_capacity(256).with_max_capacity(256);
    let mut tape = Tape::with_config(config);
    let mut err = None;
    {
      let x = tape.var(1.0).unwrap();
      let mut acc = x;
      for _ in 0..100 {
        match acc.try_mul(x) {
          Ok(next) => acc = next,
          Err(e) => { err = Some(e); break }
        }
      }
    }
    assert!(matches!(err, Some(TapeError::OutOfMemory { .. })));
    assert_eq!(tape.phase(), Phase::Aborted);
    assert!(matches!(tape.var(1.0), Err(TapeError::InvalidSequencing { phase: Phase::Aborted, .. })));
    tape.recover();
    assert_eq!(tape.phase(), Phase::Recording);
    assert!(tape.var(1.0).is_ok());
  }

  #[test]
  fn precomputed_partials() {
    let tape = Tape::new();
    let x = tape.var(2.0).unwrap();
    let y = tape.var(3.0).unwrap();
    // f = x^2 y with hand-written partials
    let f = tape.precomputed(12.0, &[x, y], &[12.0, 4.0]).unwrap();
    assert_eq!(tape.operands_of(f.id()).unwrap(), vec![x.id(), y.id()]);
    assert_eq!(tape.grad(f, &[x, y]).unwrap(), vec![12.0, 4.0]);
    assert!(matches!(tape.precomputed(1.0, &[x], &[]), Err(TapeError::ArityMismatch { expected: 1, actual: 0 })));
  }

  #[test]
  fn sums() {
    let tape = Tape::new();
    let xs = tape.vars(&[1.0, 2.0, 3.0]).unwrap();
    let total = tape.sum(&xs).unwrap();
    assert_eq!(total.value(), 6.0);
    assert_eq!(tape.grad(total, &xs).unwrap(), vec![1.0; 3]);
  }

  #[test]
  fn statistics() {
    let mut tape = Tape::new();
    let x = tape.var(1.0).unwrap();
    let _ = x * x;
    let stats = tape.stats();
    assert_eq!(stats.nodes, 2);
    assert_eq!(stats.segments, 1);
    assert!(stats.bytes_allocated > 0);
    tape.free_memory();
    assert_eq!(tape.stats().bytes_allocated, 0);
    assert_eq!(tape.stats().nodes, 0);
  }

  #[test]
  fn gradient_at_recovers() {
    let mut tape = Tape::new();
    let (value, grad) = tape.gradient_at(&[3.0, 4.0], |x| Ok((x[0] + x[1]) * x[0]) ).unwrap();
    assert_eq!(value, 21.0);
    assert_eq!(grad, vec![10.0, 3.0]);
    assert!(tape.is_empty());
    assert_eq!(tape.generation(), 1);
  }

  #[test]
  fn dependency_order() {
    let tape = Tape::new();
    let x = tape.var(1.0).unwrap();
    let y = (x * x).ln() + x;
    let _ = y;
    for (position, operands) in tape.dependencies() {
      assert!(operands.iter().all(|&operand| operand < position ));
    }
  }
}
