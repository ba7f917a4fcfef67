use num_traits::{Float, FromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Numeric type a model can be evaluated on.
/// Implemented by `f64` and by the forward-mode [`Dual`](crate::autodiff::Dual) number,
/// which lets the linearization differentiate any model without a hand-written Jacobian.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Lifts an `f64` parameter into the scalar type a model is being evaluated on.
#[inline]
pub fn lift<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// Whether a system advances by iteration or by continuous flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemKind {
    /// `x_{t+1} = f(x_t)`
    Map,
    /// `dx/dτ = f(τ, x)`
    Flow,
}

/// A population model: either a difference equation or the right-hand side of an ODE.
pub trait DynamicalSystem<T: Scalar> {
    /// Number of state variables.
    fn dimension(&self) -> usize;

    /// Evaluates the model at `(t, x)`.
    /// For a map `out` receives the next state, for a flow it receives `dx/dt`.
    /// `t` is ignored by autonomous models.
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// One discrete period of a population model.
///
/// Closed-form maps never fail; semi-discrete models solve an ODE over the
/// vulnerable period and surface the integrator's failure.
pub trait Transition {
    type Error;

    fn dimension(&self) -> usize;

    /// Writes the state of the next period into `next`.
    fn advance(&mut self, state: &[f64], next: &mut [f64]) -> Result<(), Self::Error>;
}
