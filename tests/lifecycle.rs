use approx::assert_relative_eq;

use chaintape::{ ops::*, Phase, Tape, TapeConfig, TapeError };


#[test]
fn product_plus_operand() {
  let tape = Tape::new();
  let a = tape.var(3.0).unwrap();
  let b = tape.var(5.0).unwrap();
  let out = a * b + a;
  tape.seed(out).unwrap();
  tape.sweep().unwrap();
  assert_eq!(out.value(), 18.0);
  assert_eq!(a.adjoint().unwrap(), 6.0);
  assert_eq!(b.adjoint().unwrap(), 3.0);
}

#[test]
fn sum_times_operand() {
  let tape = Tape::new();
  let x = tape.var(3.0).unwrap();
  let y = tape.var(4.0).unwrap();
  let c = (x + y) * x;
  assert_eq!(tape.len(), 4);
  tape.seed(c).unwrap();
  tape.sweep().unwrap();
  assert_eq!(c.value(), 21.0);
  assert_eq!(x.adjoint().unwrap(), 10.0);
  assert_eq!(y.adjoint().unwrap(), 3.0);
}

#[test]
fn single_seed_per_sweep() {
  let tape = Tape::new();
  let x = tape.var(1.0).unwrap();
  let y = x.exp();
  tape.seed(y).unwrap();
  let err = tape.seed(x).unwrap_err();
  assert!(matches!(err, TapeError::InvalidSequencing { operation: "seed", phase: Phase::Seeded }));
  assert!(err.to_string().contains("seed"));

  // The first seed is still in effect
  tape.sweep().unwrap();
  assert_relative_eq!(x.adjoint().unwrap(), 1.0f64.exp());
}

#[test]
fn recovery_restarts_positions() {
  let mut tape = Tape::with_config(TapeConfig::default().with_initial_capacity(1024));
  let mut capacity = None;
  for round in 0..5 {
    let stale = {
      let x = tape.var(round as f64).unwrap();
      assert_eq!(x.id().position(), 0);
      let mut acc = x;
      for _ in 0..200 { acc = acc * 0.5 + x; }
      assert_eq!(acc.id().position(), 400);
      tape.grad(acc, &[x]).unwrap();
      x.id()
    };
    // Memory reserved in the first round suffices for all others
    let stats = tape.stats();
    assert_eq!(*capacity.get_or_insert(stats.capacity), stats.capacity);
    tape.recover();
    assert_eq!(tape.phase(), Phase::Recording);
    assert!(matches!(tape.seed_node(stale), Err(TapeError::DanglingReference { .. })));
  }
}

#[test]
fn million_nodes() {
  let tape = Tape::new();
  let x = tape.var(1.0).unwrap();
  let mut acc = x;
  for _ in 1..1_000_000 {
    acc = acc + x;
  }
  assert_eq!(tape.len(), 1_000_000);
  assert_eq!(acc.value(), 1_000_000.0);
  tape.seed(acc).unwrap();
  tape.sweep().unwrap();
  assert_eq!(x.adjoint().unwrap(), 1_000_000.0);
  assert!(tape.stats().segments > 1);
}

#[test]
fn out_of_memory_is_recoverable() {
  let mut tape = Tape::with_config(TapeConfig::default()
    .with_initial_capacity(4096)
    .with_max_capacity(4096));
  let err = {
    let x = tape.var(2.0).unwrap();
    let mut acc = x;
    loop {
      match acc.try_add(x) {
        Ok(next) => acc = next,
        Err(err) => break err,
      }
    }
  };
  assert!(matches!(err, TapeError::OutOfMemory { capacity: 4096, .. }));
  assert_eq!(tape.phase(), Phase::Aborted);
  tape.recover();
  let (value, grad) = tape.gradient_at(&[2.0], |x| Ok(x[0].sqr()) ).unwrap();
  assert_eq!(value, 4.0);
  assert_eq!(grad, vec![4.0]);
}

#[test]
fn jacobian_by_reseeding() {
  let tape = Tape::new();
  let x = tape.vars(&[1.0, 2.0, 3.0]).unwrap();
  let outputs = [x[0] * x[1], x[1] * x[2], x[2] * x[0]];
  let before = tape.len();
  let rows = tape.jacobian(&outputs, &x).unwrap();
  assert_eq!(tape.len(), before);
  assert_eq!(rows, vec![
    vec![2.0, 1.0, 0.0],
    vec![0.0, 3.0, 2.0],
    vec![3.0, 0.0, 1.0],
  ]);
}

#[test]
fn sequencing_errors() {
  let tape = Tape::<f64>::new();
  assert!(matches!(tape.sweep(), Err(TapeError::InvalidSequencing { operation: "sweep", phase: Phase::Recording })));
  let x = tape.var(1.0).unwrap();
  assert!(matches!(x.adjoint(), Err(TapeError::InvalidSequencing { .. })));
  tape.seed(x).unwrap();
  assert!(matches!(x.try_mul(x), Err(TapeError::InvalidSequencing { operation: "record", .. })));
  tape.sweep().unwrap();
  assert!(matches!(tape.sweep(), Err(TapeError::InvalidSequencing { phase: Phase::Swept, .. })));
  assert_eq!(x.adjoint().unwrap(), 1.0);
}
