use chaintape::{ ops::*, Snapshot, Tape };

fn main() {
  let mut tape = Tape::new();
  let a = tape.var(3.0).unwrap();
  let b = tape.var(5.0).unwrap();
  let out = (a * b + a).logistic();
  tape.grad(out, &[a, b]).unwrap();

  // Keep the adjoints around after the tape is gone
  let snapshot = tape.snapshot();
  tape.recover();

  let filename = std::env::temp_dir().join("chaintape-demo.bin");
  snapshot.save(&filename).unwrap();
  let loaded = Snapshot::<f64>::load(&filename).unwrap();

  for node in &loaded.nodes {
    println!("#{} = {:?}, adjoint {:?}, operands {:?}", node.position, node.value, node.adjoint, node.operands);
  }
}
