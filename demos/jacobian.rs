use chaintape::Tape;

fn main() {
  let tape = Tape::new();

  // Polar to cartesian coordinates
  let r = tape.var(2.0).unwrap();
  let theta = tape.var(0.5).unwrap();
  let x = r * theta.cos();
  let y = r * theta.sin();

  // One recording, one reset and reseed per output
  for (name, output) in [("x", x), ("y", y)] {
    let row = tape.grad(output, &[r, theta]).unwrap();
    println!("d{name}/dr = {:.4}, d{name}/dtheta = {:.4}", row[0], row[1]);
  }

  // The same in a single call
  let (values, rows) = chaintape::functional::jacobian(|p| {
    Ok(vec![p[0] * p[1].cos(), p[0] * p[1].sin()])
  }, &[2.0, 0.5]).unwrap();
  println!("values {values:?}, jacobian {rows:?}");
}
