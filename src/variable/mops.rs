use serde::{ Serialize, Deserialize };

use crate::{
  scalar::{ Real, real },
  variable::{ Var, UnaryOp, BinaryOp },
  error::Result,
};


impl<'t, T: Real> Var<'t, T> {
  pub fn exp(self) -> Self {
    self.unary(Exp)
  }

  pub fn ln(self) -> Self {
    self.unary(Ln)
  }

  pub fn sin(self) -> Self {
    self.unary(Sin)
  }

  pub fn cos(self) -> Self {
    self.unary(Cos)
  }

  pub fn tanh(self) -> Self {
    self.unary(Tanh)
  }

  pub fn sqrt(self) -> Self {
    self.unary(Sqrt)
  }

  pub fn abs(self) -> Self {
    self.unary(Abs)
  }

  pub fn powf(self, exp: T) -> Self {
    self.unary(Powf(exp))
  }

  pub fn pow(self, exp: Self) -> Self {
    self.binary(Pow, exp)
  }
}

impl<'t, T: Real> std::ops::Neg for Var<'t, T> {
  type Output = Var<'t, T>;

  fn neg(self) -> Self::Output {
    self.unary(Neg)
  }
}

macro_rules! add_operator {
  ($op:ident, $meth:ident, $try_meth:ident, $assign:ident, $assign_meth:ident, $rhs_op:ident, $lhs_op:ident) => {
    impl<'t, T: Real> std::ops::$op for Var<'t, T> { // var * other
      type Output = Var<'t, T>;

      fn $meth(self, rhs: Self) -> Self::Output {
        self.binary($op, rhs)
      }
    }

    impl<'t, T: Real> std::ops::$op<T> for Var<'t, T> { // var * T
      type Output = Var<'t, T>;

      fn $meth(self, rhs: T) -> Self::Output {
        self.unary($rhs_op(rhs))
      }
    }

    impl<'t> std::ops::$op<Var<'t, f32>> for f32 { // T * var
      type Output = Var<'t, f32>;

      fn $meth(self, rhs: Var<'t, f32>) -> Self::Output {
        rhs.unary($lhs_op(self))
      }
    }

    impl<'t> std::ops::$op<Var<'t, f64>> for f64 { // T * var
      type Output = Var<'t, f64>;

      fn $meth(self, rhs: Var<'t, f64>) -> Self::Output {
        rhs.unary($lhs_op(self))
      }
    }

    impl<'t, T: Real> std::ops::$assign for Var<'t, T> {
      fn $assign_meth(&mut self, rhs: Self) {
        *self = self.binary($op, rhs);
      }
    }

    impl<'t, T: Real> Var<'t, T> {
      pub fn $try_meth(self, rhs: Self) -> Result<Self> {
        self.try_binary($op, rhs)
      }
    }
  };
}

add_operator!(Add, add, try_add, AddAssign, add_assign, AddScalar, AddScalar);
add_operator!(Sub, sub, try_sub, SubAssign, sub_assign, SubScalar, ScalarSub);
add_operator!(Mul, mul, try_mul, MulAssign, mul_assign, MulScalar, MulScalar);
add_operator!(Div, div, try_div, DivAssign, div_assign, DivScalar, ScalarDiv);


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Add;

impl<T: Real> BinaryOp<T> for Add {
  fn run(&self, lhs: T, rhs: T) -> T {
    lhs + rhs
  }

  fn derive(&self, _lhs: T, _rhs: T, _value: T) -> (T, T) {
    (T::one(), T::one())
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sub;

impl<T: Real> BinaryOp<T> for Sub {
  fn run(&self, lhs: T, rhs: T) -> T {
    lhs - rhs
  }

  fn derive(&self, _lhs: T, _rhs: T, _value: T) -> (T, T) {
    (T::one(), -T::one())
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Mul;

impl<T: Real> BinaryOp<T> for Mul {
  fn run(&self, lhs: T, rhs: T) -> T {
    lhs * rhs
  }

  fn derive(&self, lhs: T, rhs: T, _value: T) -> (T, T) {
    (rhs, lhs)
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Div;

impl<T: Real> BinaryOp<T> for Div {
  fn run(&self, lhs: T, rhs: T) -> T {
    lhs / rhs
  }

  fn derive(&self, _lhs: T, rhs: T, value: T) -> (T, T) {
    (rhs.recip(), -value / rhs)
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pow;

impl<T: Real> BinaryOp<T> for Pow {
  fn run(&self, lhs: T, rhs: T) -> T {
    lhs.powf(rhs)
  }

  fn derive(&self, lhs: T, rhs: T, value: T) -> (T, T) {
    (rhs * lhs.powf(rhs - T::one()), value * lhs.ln())
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddScalar<T>(pub T);

impl<T: Real> UnaryOp<T> for AddScalar<T> {
  fn run(&self, x: T) -> T {
    x + self.0
  }

  fn derive(&self, _x: T, _value: T) -> T {
    T::one()
  }
}


/// `x - c`

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubScalar<T>(pub T);

impl<T: Real> UnaryOp<T> for SubScalar<T> {
  fn run(&self, x: T) -> T {
    x - self.0
  }

  fn derive(&self, _x: T, _value: T) -> T {
    T::one()
  }
}


/// `c - x`

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalarSub<T>(pub T);

impl<T: Real> UnaryOp<T> for ScalarSub<T> {
  fn run(&self, x: T) -> T {
    self.0 - x
  }

  fn derive(&self, _x: T, _value: T) -> T {
    -T::one()
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MulScalar<T>(pub T);

impl<T: Real> UnaryOp<T> for MulScalar<T> {
  fn run(&self, x: T) -> T {
    x * self.0
  }

  fn derive(&self, _x: T, _value: T) -> T {
    self.0
  }
}


/// `x / c`

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DivScalar<T>(pub T);

impl<T: Real> UnaryOp<T> for DivScalar<T> {
  fn run(&self, x: T) -> T {
    x / self.0
  }

  fn derive(&self, _x: T, _value: T) -> T {
    self.0.recip()
  }
}


/// `c / x`

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalarDiv<T>(pub T);

impl<T: Real> UnaryOp<T> for ScalarDiv<T> {
  fn run(&self, x: T) -> T {
    self.0 / x
  }

  fn derive(&self, x: T, value: T) -> T {
    -value / x
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Neg;

impl<T: Real> UnaryOp<T> for Neg {
  fn run(&self, x: T) -> T {
    -x
  }

  fn derive(&self, _x: T, _value: T) -> T {
    -T::one()
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Exp;

impl<T: Real> UnaryOp<T> for Exp {
  fn run(&self, x: T) -> T {
    x.exp()
  }

  fn derive(&self, _x: T, value: T) -> T {
    value
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ln;

impl<T: Real> UnaryOp<T> for Ln {
  fn run(&self, x: T) -> T {
    x.ln()
  }

  fn derive(&self, x: T, _value: T) -> T {
    x.recip()
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sin;

impl<T: Real> UnaryOp<T> for Sin {
  fn run(&self, x: T) -> T {
    x.sin()
  }

  fn derive(&self, x: T, _value: T) -> T {
    x.cos()
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cos;

impl<T: Real> UnaryOp<T> for Cos {
  fn run(&self, x: T) -> T {
    x.cos()
  }

  fn derive(&self, x: T, _value: T) -> T {
    -x.sin()
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tanh;

impl<T: Real> UnaryOp<T> for Tanh {
  fn run(&self, x: T) -> T {
    x.tanh()
  }

  fn derive(&self, _x: T, value: T) -> T {
    T::one() - value * value
  }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sqrt;

impl<T: Real> UnaryOp<T> for Sqrt {
  fn run(&self, x: T) -> T {
    x.sqrt()
  }

  fn derive(&self, _x: T, value: T) -> T {
    real::<T>(0.5) / value
  }
}


/// Absolute value. The derivative at zero is taken to be zero.

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Abs;

impl<T: Real> UnaryOp<T> for Abs {
  fn run(&self, x: T) -> T {
    x.abs()
  }

  fn derive(&self, x: T, _value: T) -> T {
    if x > T::zero() {
      T::one()
    } else if x < T::zero() {
      -T::one()
    } else {
      // Propagates NaN
      x
    }
  }
}


/// Power with a constant exponent.

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Powf<T>(pub T);

impl<T: Real> UnaryOp<T> for Powf<T> {
  fn run(&self, x: T) -> T {
    x.powf(self.0)
  }

  fn derive(&self, x: T, _value: T) -> T {
    self.0 * x.powf(self.0 - T::one())
  }
}
