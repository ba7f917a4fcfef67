//! Forward-mode dual numbers.
//!
//! Models are written once, generic over [`Scalar`](crate::traits::Scalar).
//! Evaluating them on `Dual` with a unit seed in one coordinate yields one
//! column of the Jacobian, which is all the linearization and the stiff
//! integrator need.

use num_traits::{Float, FromPrimitive, Num, NumCast, One, ToPrimitive, Zero};
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

/// `val + eps·ε` with `ε² = 0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Dual {
    pub val: f64,
    pub eps: f64,
}

impl Dual {
    pub fn new(val: f64, eps: f64) -> Self {
        Self { val, eps }
    }

    /// A quantity that does not depend on the seeded direction.
    pub fn constant(val: f64) -> Self {
        Self::new(val, 0.0)
    }

    /// The independent variable being differentiated against.
    pub fn variable(val: f64) -> Self {
        Self::new(val, 1.0)
    }

    /// Result of a scalar function whose value and slope at `val` are known.
    #[inline]
    fn chain(self, value: f64, derivative: f64) -> Self {
        Self::new(value, derivative * self.eps)
    }
}

impl Zero for Dual {
    fn zero() -> Self {
        Self::constant(0.0)
    }
    fn is_zero(&self) -> bool {
        self.val == 0.0 && self.eps == 0.0
    }
}

impl One for Dual {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl Add for Dual {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.val + rhs.val, self.eps + rhs.eps)
    }
}

impl Sub for Dual {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.val - rhs.val, self.eps - rhs.eps)
    }
}

impl Mul for Dual {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.val * rhs.val, self.val * rhs.eps + self.eps * rhs.val)
    }
}

impl Div for Dual {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Self::new(
            self.val / rhs.val,
            (self.eps * rhs.val - self.val * rhs.eps) / (rhs.val * rhs.val),
        )
    }
}

impl Neg for Dual {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.val, -self.eps)
    }
}

impl Rem for Dual {
    type Output = Self;
    fn rem(self, rhs: Self) -> Self {
        // x mod y = x - y·trunc(x/y); trunc is locally constant.
        let q = (self.val / rhs.val).trunc();
        Self::new(self.val % rhs.val, self.eps - q * rhs.eps)
    }
}

macro_rules! compound_assign {
    ($($trait:ident::$method:ident => $op:tt),* $(,)?) => {
        $(impl $trait for Dual {
            fn $method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        })*
    };
}

compound_assign! {
    AddAssign::add_assign => +,
    SubAssign::sub_assign => -,
    MulAssign::mul_assign => *,
    DivAssign::div_assign => /,
    RemAssign::rem_assign => %,
}

impl Num for Dual {
    type FromStrRadixErr = <f64 as Num>::FromStrRadixErr;
    fn from_str_radix(str: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        f64::from_str_radix(str, radix).map(Self::constant)
    }
}

impl ToPrimitive for Dual {
    fn to_i64(&self) -> Option<i64> {
        self.val.to_i64()
    }
    fn to_u64(&self) -> Option<u64> {
        self.val.to_u64()
    }
    fn to_f64(&self) -> Option<f64> {
        Some(self.val)
    }
}

impl FromPrimitive for Dual {
    fn from_i64(n: i64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_u64(n: u64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_f64(n: f64) -> Option<Self> {
        Some(Self::constant(n))
    }
}

impl NumCast for Dual {
    fn from<N: ToPrimitive>(n: N) -> Option<Self> {
        n.to_f64().map(Self::constant)
    }
}

/// Float methods returning a fixed `f64` constant.
macro_rules! constants {
    ($($method:ident => $value:expr),* $(,)?) => {
        $(fn $method() -> Self {
            Self::constant($value)
        })*
    };
}

/// Float methods with zero derivative.
macro_rules! flat {
    ($($method:ident),* $(,)?) => {
        $(fn $method(self) -> Self {
            Self::constant(self.val.$method())
        })*
    };
}

impl Float for Dual {
    constants! {
        nan => f64::NAN,
        infinity => f64::INFINITY,
        neg_infinity => f64::NEG_INFINITY,
        min_value => f64::MIN,
        min_positive_value => f64::MIN_POSITIVE,
        max_value => f64::MAX,
    }
    fn neg_zero() -> Self {
        Self::new(-0.0, -0.0)
    }
    fn is_nan(self) -> bool {
        self.val.is_nan() || self.eps.is_nan()
    }
    fn is_infinite(self) -> bool {
        self.val.is_infinite()
    }
    fn is_finite(self) -> bool {
        self.val.is_finite() && self.eps.is_finite()
    }
    fn is_normal(self) -> bool {
        self.val.is_normal()
    }
    fn classify(self) -> std::num::FpCategory {
        self.val.classify()
    }
    // Piecewise constant, so the derivative vanishes almost everywhere.
    flat! { floor, ceil, round, trunc }
    fn fract(self) -> Self {
        Self::new(self.val.fract(), self.eps)
    }
    fn abs(self) -> Self {
        if self.val >= 0.0 {
            self
        } else {
            -self
        }
    }
    flat! { signum }
    fn is_sign_positive(self) -> bool {
        self.val.is_sign_positive()
    }
    fn is_sign_negative(self) -> bool {
        self.val.is_sign_negative()
    }
    fn mul_add(self, a: Self, b: Self) -> Self {
        self * a + b
    }
    fn recip(self) -> Self {
        Self::one() / self
    }
    fn powi(self, n: i32) -> Self {
        if n == 0 {
            return Self::one();
        }
        self.chain(self.val.powi(n), <f64 as From<i32>>::from(n) * self.val.powi(n - 1))
    }
    fn powf(self, n: Self) -> Self {
        let value = self.val.powf(n.val);
        let mut eps = n.val * self.val.powf(n.val - 1.0) * self.eps;
        if n.eps != 0.0 {
            eps += value * self.val.ln() * n.eps;
        }
        Self::new(value, eps)
    }
    fn sqrt(self) -> Self {
        let s = self.val.sqrt();
        self.chain(s, 0.5 / s)
    }
    fn exp(self) -> Self {
        let e = self.val.exp();
        self.chain(e, e)
    }
    fn exp2(self) -> Self {
        let e = self.val.exp2();
        self.chain(e, e * std::f64::consts::LN_2)
    }
    fn ln(self) -> Self {
        self.chain(self.val.ln(), 1.0 / self.val)
    }
    fn log(self, base: Self) -> Self {
        self.ln() / base.ln()
    }
    fn log2(self) -> Self {
        self.chain(self.val.log2(), 1.0 / (self.val * std::f64::consts::LN_2))
    }
    fn log10(self) -> Self {
        self.chain(self.val.log10(), 1.0 / (self.val * std::f64::consts::LN_10))
    }
    fn max(self, other: Self) -> Self {
        if self.val >= other.val {
            self
        } else {
            other
        }
    }
    fn min(self, other: Self) -> Self {
        if self.val <= other.val {
            self
        } else {
            other
        }
    }
    fn abs_sub(self, other: Self) -> Self {
        if self.val <= other.val {
            Self::zero()
        } else {
            self - other
        }
    }
    fn cbrt(self) -> Self {
        let c = self.val.cbrt();
        self.chain(c, 1.0 / (3.0 * c * c))
    }
    fn hypot(self, other: Self) -> Self {
        (self * self + other * other).sqrt()
    }
    fn sin(self) -> Self {
        self.chain(self.val.sin(), self.val.cos())
    }
    fn cos(self) -> Self {
        self.chain(self.val.cos(), -self.val.sin())
    }
    fn tan(self) -> Self {
        let t = self.val.tan();
        self.chain(t, 1.0 + t * t)
    }
    fn asin(self) -> Self {
        self.chain(self.val.asin(), 1.0 / (1.0 - self.val * self.val).sqrt())
    }
    fn acos(self) -> Self {
        self.chain(self.val.acos(), -1.0 / (1.0 - self.val * self.val).sqrt())
    }
    fn atan(self) -> Self {
        self.chain(self.val.atan(), 1.0 / (1.0 + self.val * self.val))
    }
    fn atan2(self, other: Self) -> Self {
        let denom = self.val * self.val + other.val * other.val;
        Self::new(
            self.val.atan2(other.val),
            (other.val * self.eps - self.val * other.eps) / denom,
        )
    }
    fn sin_cos(self) -> (Self, Self) {
        (self.sin(), self.cos())
    }
    fn exp_m1(self) -> Self {
        self.chain(self.val.exp_m1(), self.val.exp())
    }
    fn ln_1p(self) -> Self {
        self.chain(self.val.ln_1p(), 1.0 / (1.0 + self.val))
    }
    fn sinh(self) -> Self {
        self.chain(self.val.sinh(), self.val.cosh())
    }
    fn cosh(self) -> Self {
        self.chain(self.val.cosh(), self.val.sinh())
    }
    fn tanh(self) -> Self {
        let t = self.val.tanh();
        self.chain(t, 1.0 - t * t)
    }
    fn asinh(self) -> Self {
        self.chain(self.val.asinh(), 1.0 / (self.val * self.val + 1.0).sqrt())
    }
    fn acosh(self) -> Self {
        self.chain(self.val.acosh(), 1.0 / (self.val * self.val - 1.0).sqrt())
    }
    fn atanh(self) -> Self {
        self.chain(self.val.atanh(), 1.0 / (1.0 - self.val * self.val))
    }
    fn integer_decode(self) -> (u64, i16, i8) {
        self.val.integer_decode()
    }
}

#[cfg(test)]
mod tests {
    use super::Dual;
    use num_traits::Float;

    fn derivative(f: impl Fn(Dual) -> Dual, x: f64) -> f64 {
        f(Dual::variable(x)).eps
    }

    #[test]
    fn product_and_quotient_rules() {
        let d = derivative(|x| x * x / (x + Dual::constant(1.0)), 2.0);
        // d/dx x²/(x+1) = (x² + 2x)/(x+1)²
        assert!((d - 8.0 / 9.0).abs() < 1e-14);
    }

    #[test]
    fn escape_response_derivative() {
        let c = 0.1;
        let d = derivative(|p| (Dual::constant(-c) * p).exp(), 8.0);
        assert!((d + c * (-c * 8.0_f64).exp()).abs() < 1e-14);
    }

    #[test]
    fn log_and_powers() {
        assert!((derivative(|x| x.ln(), 4.0) - 0.25).abs() < 1e-14);
        assert!((derivative(|x| x.powi(3), 2.0) - 12.0).abs() < 1e-12);
        assert!((derivative(|x| x.powf(Dual::constant(0.5)), 4.0) - 0.25).abs() < 1e-12);
        assert!((derivative(|x| x.log10(), 10.0) - 1.0 / 10.0_f64.ln() / 10.0).abs() < 1e-14);
    }

    #[test]
    fn integer_powers_including_negative() {
        assert!((derivative(|x| x.powi(-2), 2.0) + 0.25).abs() < 1e-14);
        assert!((derivative(|x| x.powi(1), 7.0) - 1.0).abs() < 1e-14);
        assert_eq!(derivative(|x| x.powi(0), 3.0), 0.0);
    }

    #[test]
    fn rounding_is_flat_and_compound_assignment_differentiates() {
        assert_eq!(derivative(|x| x.floor() + x.signum(), 2.5), 0.0);
        let d = derivative(
            |x| {
                let mut y = x;
                y *= x;
                y -= x;
                y /= Dual::constant(2.0);
                y
            },
            3.0,
        );
        // d/dx (x² - x)/2 = x - 1/2
        assert!((d - 2.5).abs() < 1e-14);
    }

    #[test]
    fn constants_carry_no_sensitivity() {
        let x = Dual::constant(3.0);
        assert_eq!((x * x).exp().eps, 0.0);
    }
}
