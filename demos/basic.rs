use chaintape::{ ops::*, Tape };

fn main() {
  let mut tape = Tape::new();
  let mut params = [2.0, -1.5];

  let learning_rate = 0.1;

  // Minimize the Rosenbrock-like bowl with plain gradient descent
  for step in 0..100 {
    let (loss, grad) = tape.gradient_at(&params, |x| {
      Ok((x[0] - 1.0).sqr() + (x[1] - x[0].sqr()).sqr() * 2.0)
    }).unwrap();

    // The tape has been recovered, so its memory is reused next round
    for (param, grad) in params.iter_mut().zip(&grad) {
      *param -= grad * learning_rate;
    }

    if step % 10 == 0 {
      println!("step {step}: loss {loss:.6} at {params:?}");
    }
  }

  let stats = tape.stats();
  println!("arena holds {} bytes in {} segments", stats.capacity, stats.segments);
}
