//! Parameter sets for the host-parasitoid models.
//!
//! Every model is a plain `Copy` struct whose fields are the named constants of
//! one run; the defaults are the values used throughout the textbook figures.
//! Discrete maps and vulnerable-period flows both implement
//! [`DynamicalSystem`], generic over [`Scalar`] so they can be differentiated.

use crate::traits::{lift, DynamicalSystem, Scalar};
use serde::{Deserialize, Serialize};

/// `x_{t+1} = r x_t (1 - x_t)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticMap {
    pub r: f64,
}

impl Default for LogisticMap {
    fn default() -> Self {
        Self { r: 2.0 }
    }
}

impl LogisticMap {
    /// Nontrivial fixed point `1 - 1/r`.
    pub fn fixed_point(&self) -> f64 {
        1.0 - 1.0 / self.r
    }
}

impl<T: Scalar> DynamicalSystem<T> for LogisticMap {
    fn dimension(&self) -> usize {
        1
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        out[0] = lift::<T>(self.r) * x[0] * (T::one() - x[0]);
    }
}

/// Two-variable worked example with fixed points `(3, 11)` (stable) and `(8, -4)`.
///
/// `x' = 5 + (x - y)/4`, `y' = 2 + x(1 + y)/4`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanarExample;

impl PlanarExample {
    pub const STABLE_FIXED_POINT: [f64; 2] = [3.0, 11.0];
    pub const UNSTABLE_FIXED_POINT: [f64; 2] = [8.0, -4.0];
}

impl<T: Scalar> DynamicalSystem<T> for PlanarExample {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let quarter = lift::<T>(0.25);
        out[0] = lift::<T>(5.0) + quarter * (x[0] - x[1]);
        out[1] = lift::<T>(2.0) + quarter * x[0] * (T::one() + x[1]);
    }
}

/// Nicholson-Bailey model with Poisson escape `f(P) = exp(-cP)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NicholsonBailey {
    /// Searching efficiency.
    pub c: f64,
    /// Viable eggs per adult host.
    pub r: f64,
    /// Parasitoids emerging per parasitized host.
    pub k: f64,
}

impl Default for NicholsonBailey {
    fn default() -> Self {
        Self {
            c: 0.1,
            r: 2.0,
            k: 1.0,
        }
    }
}

impl NicholsonBailey {
    pub fn escape<T: Scalar>(&self, p: T) -> T {
        (-lift::<T>(self.c) * p).exp()
    }

    /// Coexistence equilibrium `(H*, P*)` with `P* = ln R / c` and
    /// `H* = P* / (k (R - 1))`.
    pub fn equilibrium(&self) -> [f64; 2] {
        let p = self.r.ln() / self.c;
        let h = p / (self.k * (self.r - 1.0));
        [h, p]
    }
}

impl<T: Scalar> DynamicalSystem<T> for NicholsonBailey {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (h, p) = (x[0], x[1]);
        let rh = lift::<T>(self.r) * h;
        let f = self.escape(p);
        out[0] = rh * f;
        out[1] = lift::<T>(self.k) * rh * (T::one() - f);
    }
}

/// Nicholson-Bailey dynamics with a fraction `alpha` of hosts out of reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostRefuge {
    pub alpha: f64,
    pub c: f64,
    pub r: f64,
    pub k: f64,
}

impl Default for HostRefuge {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            c: 0.1,
            r: 2.0,
            k: 1.0,
        }
    }
}

impl HostRefuge {
    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            alpha,
            ..Self::default()
        }
    }

    pub fn escape<T: Scalar>(&self, p: T) -> T {
        (-lift::<T>(self.c) * p).exp()
    }
}

impl<T: Scalar> DynamicalSystem<T> for HostRefuge {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (h, p) = (x[0], x[1]);
        let alpha = lift::<T>(self.alpha);
        let rh = lift::<T>(self.r) * h;
        let exposed = (T::one() - alpha) * rh;
        let f = self.escape(p);
        out[0] = alpha * rh + exposed * f;
        out[1] = lift::<T>(self.k) * exposed * (T::one() - f);
    }
}

/// Type II functional response: `f(H, P) = 1 / (1 + cRHPT)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FunctionalResponse {
    pub c: f64,
    pub r: f64,
    pub k: f64,
    /// Length of the vulnerable period.
    pub t: f64,
}

impl Default for FunctionalResponse {
    fn default() -> Self {
        Self {
            c: 0.1,
            r: 2.0,
            k: 1.0,
            t: 1.0,
        }
    }
}

impl FunctionalResponse {
    pub fn escape<T: Scalar>(&self, h: T, p: T) -> T {
        let crt = lift::<T>(self.c * self.r * self.t);
        T::one() / (T::one() + crt * h * p)
    }
}

impl<T: Scalar> DynamicalSystem<T> for FunctionalResponse {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (h, p) = (x[0], x[1]);
        let rh = lift::<T>(self.r) * h;
        let f = self.escape(h, p);
        out[0] = rh * f;
        out[1] = lift::<T>(self.k) * rh * (T::one() - f);
    }
}

/// Semi-discrete model with density-dependent host mortality during the
/// vulnerable period, in closed form.
///
/// `z = cd / (k c)` is the strength of host mortality relative to parasitism.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostMortality {
    pub c: f64,
    pub z: f64,
    pub k: f64,
    pub r: f64,
    pub t: f64,
}

impl Default for HostMortality {
    fn default() -> Self {
        Self {
            c: 0.1,
            z: 0.5,
            k: 1.0,
            r: 2.0,
            t: 1.0,
        }
    }
}

impl HostMortality {
    pub fn with_z(z: f64) -> Self {
        Self {
            z,
            ..Self::default()
        }
    }

    /// Host mortality rate `cd = z c k`.
    pub fn mortality_rate(&self) -> f64 {
        self.z * self.c * self.k
    }

    /// Extra density-dependent loss term `cd R H (1 - e^{-cPT}) / (cP)`.
    fn crowding<T: Scalar>(&self, h: T, p: T) -> T {
        let c = lift::<T>(self.c);
        let survive = (-c * p * lift::<T>(self.t)).exp();
        lift::<T>(self.mortality_rate() * self.r) * h * (T::one() - survive) / (c * p)
    }

    /// Fraction of larvae that survive both parasitism and mortality.
    pub fn escape<T: Scalar>(&self, h: T, p: T) -> T {
        let survive = (-lift::<T>(self.c) * p * lift::<T>(self.t)).exp();
        survive / (T::one() + self.crowding(h, p))
    }

    /// Parasitoids emerging next year.
    pub fn parasitized<T: Scalar>(&self, h: T, p: T) -> T {
        p / lift::<T>(self.z) * (T::one() + self.crowding(h, p)).ln()
    }
}

impl<T: Scalar> DynamicalSystem<T> for HostMortality {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (h, p) = (x[0], x[1]);
        out[0] = lift::<T>(self.r) * h * self.escape(h, p);
        out[1] = self.parasitized(h, p);
    }
}

/// Vulnerable-period state `(L, I, P)`: healthy larvae, parasitized larvae,
/// searching parasitoids.
pub type LarvalState = [f64; 3];

/// Constant-rate parasitism during the vulnerable period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantAttack {
    pub c: f64,
}

impl ConstantAttack {
    pub fn explicit(&self, initial: LarvalState, tau: f64) -> LarvalState {
        let [l0, i0, p] = initial;
        let escaped = (-self.c * p * tau).exp();
        [l0 * escaped, i0 + l0 * (1.0 - escaped), p]
    }
}

impl<T: Scalar> DynamicalSystem<T> for ConstantAttack {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let attack = lift::<T>(self.c) * x[0] * x[2];
        out[0] = -attack;
        out[1] = attack;
        out[2] = T::zero();
    }
}

/// Parasitism at rate `c L² P`; integrating it over the vulnerable period gives
/// the type II escape `1 / (1 + c L P τ)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FunctionalAttack {
    pub c: f64,
}

impl FunctionalAttack {
    pub fn explicit(&self, initial: LarvalState, tau: f64) -> LarvalState {
        let [l0, i0, p] = initial;
        let remaining = l0 / (1.0 + self.c * l0 * p * tau);
        [remaining, i0 + l0 - remaining, p]
    }
}

impl<T: Scalar> DynamicalSystem<T> for FunctionalAttack {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let attack = lift::<T>(self.c) * x[0] * x[0] * x[2];
        out[0] = -attack;
        out[1] = attack;
        out[2] = T::zero();
    }
}

/// Constant-rate parasitism with density-dependent larval mortality `cd L²`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MortalityAttack {
    pub c: f64,
    pub cd: f64,
}

impl MortalityAttack {
    pub fn explicit(&self, initial: LarvalState, tau: f64) -> LarvalState {
        let [l0, i0, p] = initial;
        let cp = self.c * p;
        let growth = (cp * tau).exp();
        let larvae = l0 / (growth + self.cd * l0 * (growth - 1.0) / cp);
        let parasitized = cp / self.cd * (1.0 + self.cd * l0 * (1.0 - (-cp * tau).exp()) / cp).ln();
        [larvae, i0 + parasitized, p]
    }
}

impl<T: Scalar> DynamicalSystem<T> for MortalityAttack {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (l, p) = (x[0], x[2]);
        let attack = lift::<T>(self.c) * l * p;
        out[0] = -attack - lift::<T>(self.cd) * l * l;
        out[1] = attack;
        out[2] = T::zero();
    }
}

/// Egg-maturation delay: parasitoids alternate between searching (`P1`) and
/// maturing eggs (`P0`) after each attack.
///
/// State `(L, I, P0, P1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EggMaturation {
    pub c: f64,
    /// Rate at which egg-limited parasitoids return to searching.
    pub cr: f64,
}

impl<T: Scalar> DynamicalSystem<T> for EggMaturation {
    fn dimension(&self) -> usize {
        4
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (l, p0, p1) = (x[0], x[2], x[3]);
        let attack = lift::<T>(self.c) * l * p1;
        let recovery = lift::<T>(self.cr) * p0;
        out[0] = -attack;
        out[1] = attack;
        out[2] = attack - recovery;
        out[3] = recovery - attack;
    }
}
