//! Adaptive integration of the vulnerable-period ODEs.
//!
//! Two embedded pairs are available: Dormand–Prince 5(4) for smooth, non-stiff
//! systems and the linearly implicit Rosenbrock 2(3) pair for stiff ones (fast
//! recovery rates in the egg-maturation model). Steps are shortened to land on
//! every requested sample time exactly, so no interpolation is involved.

use crate::autodiff::Dual;
use crate::error::{DynamicsError, Result};
use crate::linearization::{jacobian, time_derivative};
use crate::trajectory::Trajectory;
use crate::traits::DynamicalSystem;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMethod {
    /// Explicit Runge–Kutta 5(4).
    DormandPrince45,
    /// Linearly implicit 2(3) pair, Jacobian by forward-mode differentiation.
    Rosenbrock23,
}

impl IntegrationMethod {
    /// Order of the embedded error estimate, used by the step-size controller.
    fn error_order(self) -> f64 {
        match self {
            IntegrationMethod::DormandPrince45 => 4.0,
            IntegrationMethod::Rosenbrock23 => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub relative: f64,
    pub absolute: f64,
    /// Budget of attempted steps (accepted and rejected) per integration.
    pub max_steps: usize,
    pub initial_step: Option<f64>,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            relative: 1e-6,
            absolute: 1e-9,
            max_steps: 100_000,
            initial_step: None,
        }
    }
}

impl Tolerances {
    pub fn validate(&self) -> Result<()> {
        if !(self.relative >= 0.0 && self.absolute >= 0.0) {
            return Err(DynamicsError::invalid("tolerances must be non-negative"));
        }
        if self.relative == 0.0 && self.absolute == 0.0 {
            return Err(DynamicsError::invalid(
                "relative and absolute tolerance cannot both be zero",
            ));
        }
        if self.max_steps == 0 {
            return Err(DynamicsError::invalid("max_steps must be at least 1"));
        }
        if let Some(h) = self.initial_step {
            if !(h > 0.0 && h.is_finite()) {
                return Err(DynamicsError::invalid("initial_step must be positive"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub evaluations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub method: IntegrationMethod,
    pub times: Vec<f64>,
    /// One state per entry of `times`.
    pub states: Trajectory,
    pub stats: IntegrationStats,
}

impl Solution {
    pub fn final_state(&self) -> &[f64] {
        self.states.state(self.states.len() - 1)
    }

    /// `(τ, x_i(τ))` pairs for one state variable.
    pub fn series(&self, index: usize) -> Vec<[f64; 2]> {
        self.times
            .iter()
            .zip(self.states.states())
            .map(|(&t, s)| [t, s[index]])
            .collect()
    }
}

/// `count` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            let mut points: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
            points[count - 1] = end;
            points
        }
    }
}

/// Integrates `system` over `interval`, sampling the state at each of `eval_points`.
///
/// Fails with [`DynamicsError::InvalidArgument`] before any work when the
/// interval, sample times, tolerances or initial state are malformed, and with
/// [`DynamicsError::IntegrationFailure`] when the step budget runs out, the step
/// size underflows, or (for Rosenbrock) the iteration matrix is singular.
pub fn integrate<S>(
    system: &S,
    initial: &[f64],
    interval: [f64; 2],
    eval_points: &[f64],
    method: IntegrationMethod,
    tolerances: &Tolerances,
) -> Result<Solution>
where
    S: DynamicalSystem<f64> + DynamicalSystem<Dual>,
{
    validate_problem(system, initial, interval, eval_points)?;
    tolerances.validate()?;

    let dim = initial.len();
    let [t0, t_end] = interval;
    let mut stepper = Stepper::new(method, dim);
    let mut stats = IntegrationStats::default();

    let mut t = t0;
    let mut y = initial.to_vec();
    let mut f = vec![0.0; dim];
    DynamicalSystem::<f64>::apply(system, t, &y, &mut f);
    stats.evaluations += 1;
    if f.iter().any(|v| !v.is_finite()) {
        return Err(failure(method, t, "non-finite derivative at the initial state"));
    }

    let mut times = Vec::with_capacity(eval_points.len());
    let mut states = Trajectory::with_capacity(dim, eval_points.len());
    let mut next_sample = 0usize;
    while next_sample < eval_points.len() && eval_points[next_sample] <= t {
        times.push(eval_points[next_sample]);
        states.push(&y);
        next_sample += 1;
    }

    let span = t_end - t0;
    let mut h = match tolerances.initial_step {
        Some(h) => h.min(span),
        None => initial_step(&y, &f, span, method, tolerances),
    };

    let mut y_new = vec![0.0; dim];
    let mut f_new = vec![0.0; dim];
    let mut err = vec![0.0; dim];
    let exponent = 1.0 / (method.error_order() + 1.0);
    let mut attempts = 0usize;

    while next_sample < eval_points.len() {
        if attempts >= tolerances.max_steps {
            return Err(failure(
                method,
                t,
                format!("step budget of {} exhausted", tolerances.max_steps),
            ));
        }
        attempts += 1;

        let target = eval_points[next_sample];
        let remaining = target - t;
        let truncated = h >= remaining;
        let step = if truncated { remaining } else { h };
        if step <= 16.0 * f64::EPSILON * t.abs() {
            return Err(failure(method, t, format!("step size underflow (h = {step:e})")));
        }

        stats.evaluations += stepper.attempt(system, t, &y, &f, step, &mut y_new, &mut f_new, &mut err)?;
        let error = error_norm(&err, &y, &y_new, tolerances);

        if !error.is_finite() {
            stats.rejected_steps += 1;
            h = step * 0.2;
            continue;
        }

        let factor = if error == 0.0 {
            5.0
        } else {
            (0.9 * error.powf(-exponent)).clamp(0.2, 5.0)
        };

        if error <= 1.0 {
            stats.accepted_steps += 1;
            t = if truncated { target } else { t + step };
            std::mem::swap(&mut y, &mut y_new);
            std::mem::swap(&mut f, &mut f_new);
            h = if truncated { h.max(step * factor) } else { step * factor };
            while next_sample < eval_points.len() && eval_points[next_sample] <= t {
                times.push(eval_points[next_sample]);
                states.push(&y);
                next_sample += 1;
            }
        } else {
            stats.rejected_steps += 1;
            h = step * factor.min(1.0);
        }
    }

    log::debug!(
        "{:?} integration over [{}, {}]: {} accepted, {} rejected, {} evaluations",
        method,
        t0,
        t_end,
        stats.accepted_steps,
        stats.rejected_steps,
        stats.evaluations
    );

    Ok(Solution {
        method,
        times,
        states,
        stats,
    })
}

/// [`integrate`] with [`IntegrationMethod::DormandPrince45`], retried once with
/// [`IntegrationMethod::Rosenbrock23`] when the explicit scheme gives up.
pub fn integrate_with_fallback<S>(
    system: &S,
    initial: &[f64],
    interval: [f64; 2],
    eval_points: &[f64],
    tolerances: &Tolerances,
) -> Result<Solution>
where
    S: DynamicalSystem<f64> + DynamicalSystem<Dual>,
{
    match integrate(
        system,
        initial,
        interval,
        eval_points,
        IntegrationMethod::DormandPrince45,
        tolerances,
    ) {
        Err(DynamicsError::IntegrationFailure { time, reason, .. }) => {
            log::warn!("explicit integration failed at t = {time} ({reason}); retrying as stiff");
            integrate(
                system,
                initial,
                interval,
                eval_points,
                IntegrationMethod::Rosenbrock23,
                tolerances,
            )
        }
        other => other,
    }
}

fn validate_problem<S: DynamicalSystem<f64>>(
    system: &S,
    initial: &[f64],
    interval: [f64; 2],
    eval_points: &[f64],
) -> Result<()> {
    let dim = system.dimension();
    if dim == 0 {
        return Err(DynamicsError::invalid("system has zero dimension"));
    }
    if initial.len() != dim {
        return Err(DynamicsError::invalid(format!(
            "initial state dimension mismatch: expected {}, got {}",
            dim,
            initial.len()
        )));
    }
    let [t0, t_end] = interval;
    if !(t0.is_finite() && t_end.is_finite() && t_end > t0) {
        return Err(DynamicsError::invalid(format!(
            "interval must be finite with end > start, got [{t0}, {t_end}]"
        )));
    }
    if eval_points.is_empty() {
        return Err(DynamicsError::invalid("eval_points is empty"));
    }
    if eval_points.iter().any(|&p| !(p >= t0 && p <= t_end)) {
        return Err(DynamicsError::invalid(format!(
            "eval_points must lie within [{t0}, {t_end}]"
        )));
    }
    if eval_points.windows(2).any(|w| w[1] < w[0]) {
        return Err(DynamicsError::invalid("eval_points must be ascending"));
    }
    Ok(())
}

fn failure(method: IntegrationMethod, time: f64, reason: impl Into<String>) -> DynamicsError {
    DynamicsError::IntegrationFailure {
        method,
        time,
        reason: reason.into(),
    }
}

/// Weighted RMS norm with per-component scale `atol + rtol·max(|y|, |y_new|)`.
fn error_norm(err: &[f64], y: &[f64], y_new: &[f64], tol: &Tolerances) -> f64 {
    let sum: f64 = err
        .iter()
        .zip(y.iter().zip(y_new))
        .map(|(e, (a, b))| {
            let scale = tol.absolute + tol.relative * a.abs().max(b.abs());
            (e / scale).powi(2)
        })
        .sum();
    (sum / err.len() as f64).sqrt()
}

/// Starting step from the size of the state relative to its rate of change.
fn initial_step(
    y: &[f64],
    f: &[f64],
    span: f64,
    method: IntegrationMethod,
    tol: &Tolerances,
) -> f64 {
    let scaled = |v: &[f64]| {
        let sum: f64 = v
            .iter()
            .zip(y)
            .map(|(x, yi)| (x / (tol.absolute + tol.relative * yi.abs())).powi(2))
            .sum();
        (sum / v.len() as f64).sqrt()
    };
    let d0 = scaled(y);
    let d1 = scaled(f);
    let h = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    // Low-order pairs start smaller so the first estimate is meaningful.
    let h = match method {
        IntegrationMethod::DormandPrince45 => h,
        IntegrationMethod::Rosenbrock23 => h * 0.1,
    };
    h.min(span)
}

enum Stepper {
    DormandPrince(DormandPrince45),
    Rosenbrock(Rosenbrock23),
}

impl Stepper {
    fn new(method: IntegrationMethod, dim: usize) -> Self {
        match method {
            IntegrationMethod::DormandPrince45 => Stepper::DormandPrince(DormandPrince45::new(dim)),
            IntegrationMethod::Rosenbrock23 => Stepper::Rosenbrock(Rosenbrock23::new(dim)),
        }
    }

    /// Computes a candidate step and its error estimate; returns the number of
    /// right-hand-side evaluations spent.
    #[allow(clippy::too_many_arguments)]
    fn attempt<S>(
        &mut self,
        system: &S,
        t: f64,
        y: &[f64],
        f: &[f64],
        h: f64,
        y_new: &mut [f64],
        f_new: &mut [f64],
        err: &mut [f64],
    ) -> Result<usize>
    where
        S: DynamicalSystem<f64> + DynamicalSystem<Dual>,
    {
        match self {
            Stepper::DormandPrince(s) => Ok(s.attempt(system, t, y, f, h, y_new, f_new, err)),
            Stepper::Rosenbrock(s) => s.attempt(system, t, y, f, h, y_new, f_new, err),
        }
    }
}

/// Dormand–Prince 5(4) with first-same-as-last reuse of the end derivative.
struct DormandPrince45 {
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    tmp: Vec<f64>,
}

impl DormandPrince45 {
    const C2: f64 = 1.0 / 5.0;
    const C3: f64 = 3.0 / 10.0;
    const C4: f64 = 4.0 / 5.0;
    const C5: f64 = 8.0 / 9.0;

    const A21: f64 = 1.0 / 5.0;
    const A31: f64 = 3.0 / 40.0;
    const A32: f64 = 9.0 / 40.0;
    const A41: f64 = 44.0 / 45.0;
    const A42: f64 = -56.0 / 15.0;
    const A43: f64 = 32.0 / 9.0;
    const A51: f64 = 19372.0 / 6561.0;
    const A52: f64 = -25360.0 / 2187.0;
    const A53: f64 = 64448.0 / 6561.0;
    const A54: f64 = -212.0 / 729.0;
    const A61: f64 = 9017.0 / 3168.0;
    const A62: f64 = -355.0 / 33.0;
    const A63: f64 = 46732.0 / 5247.0;
    const A64: f64 = 49.0 / 176.0;
    const A65: f64 = -5103.0 / 18656.0;

    // 5th-order weights.
    const B1: f64 = 35.0 / 384.0;
    const B3: f64 = 500.0 / 1113.0;
    const B4: f64 = 125.0 / 192.0;
    const B5: f64 = -2187.0 / 6784.0;
    const B6: f64 = 11.0 / 84.0;

    // Difference between the 5th- and embedded 4th-order weights.
    const E1: f64 = 71.0 / 57600.0;
    const E3: f64 = -71.0 / 16695.0;
    const E4: f64 = 71.0 / 1920.0;
    const E5: f64 = -17253.0 / 339200.0;
    const E6: f64 = 22.0 / 525.0;
    const E7: f64 = -1.0 / 40.0;

    fn new(dim: usize) -> Self {
        Self {
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            k5: vec![0.0; dim],
            k6: vec![0.0; dim],
            tmp: vec![0.0; dim],
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt<S: DynamicalSystem<f64>>(
        &mut self,
        system: &S,
        t: f64,
        y: &[f64],
        k1: &[f64],
        h: f64,
        y_new: &mut [f64],
        k7: &mut [f64],
        err: &mut [f64],
    ) -> usize {
        let n = y.len();

        for i in 0..n {
            self.tmp[i] = y[i] + h * Self::A21 * k1[i];
        }
        system.apply(t + Self::C2 * h, &self.tmp, &mut self.k2);

        for i in 0..n {
            self.tmp[i] = y[i] + h * (Self::A31 * k1[i] + Self::A32 * self.k2[i]);
        }
        system.apply(t + Self::C3 * h, &self.tmp, &mut self.k3);

        for i in 0..n {
            self.tmp[i] =
                y[i] + h * (Self::A41 * k1[i] + Self::A42 * self.k2[i] + Self::A43 * self.k3[i]);
        }
        system.apply(t + Self::C4 * h, &self.tmp, &mut self.k4);

        for i in 0..n {
            self.tmp[i] = y[i]
                + h * (Self::A51 * k1[i]
                    + Self::A52 * self.k2[i]
                    + Self::A53 * self.k3[i]
                    + Self::A54 * self.k4[i]);
        }
        system.apply(t + Self::C5 * h, &self.tmp, &mut self.k5);

        for i in 0..n {
            self.tmp[i] = y[i]
                + h * (Self::A61 * k1[i]
                    + Self::A62 * self.k2[i]
                    + Self::A63 * self.k3[i]
                    + Self::A64 * self.k4[i]
                    + Self::A65 * self.k5[i]);
        }
        system.apply(t + h, &self.tmp, &mut self.k6);

        for i in 0..n {
            y_new[i] = y[i]
                + h * (Self::B1 * k1[i]
                    + Self::B3 * self.k3[i]
                    + Self::B4 * self.k4[i]
                    + Self::B5 * self.k5[i]
                    + Self::B6 * self.k6[i]);
        }
        system.apply(t + h, y_new, k7);

        for i in 0..n {
            err[i] = h
                * (Self::E1 * k1[i]
                    + Self::E3 * self.k3[i]
                    + Self::E4 * self.k4[i]
                    + Self::E5 * self.k5[i]
                    + Self::E6 * self.k6[i]
                    + Self::E7 * k7[i]);
        }

        6
    }
}

/// Shampine–Reichelt Rosenbrock 2(3) pair with `W = I - h·d·J`.
struct Rosenbrock23 {
    k1: DVector<f64>,
    k2: DVector<f64>,
    f1: Vec<f64>,
    tmp: Vec<f64>,
}

impl Rosenbrock23 {
    fn new(dim: usize) -> Self {
        Self {
            k1: DVector::zeros(dim),
            k2: DVector::zeros(dim),
            f1: vec![0.0; dim],
            tmp: vec![0.0; dim],
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt<S>(
        &mut self,
        system: &S,
        t: f64,
        y: &[f64],
        f0: &[f64],
        h: f64,
        y_new: &mut [f64],
        f2: &mut [f64],
        err: &mut [f64],
    ) -> Result<usize>
    where
        S: DynamicalSystem<f64> + DynamicalSystem<Dual>,
    {
        let n = y.len();
        let d = 1.0 / (2.0 + std::f64::consts::SQRT_2);
        let e32 = 6.0 + std::f64::consts::SQRT_2;

        let jac = jacobian(system, t, y);
        let dfdt = time_derivative(system, t, y);
        let w: DMatrix<f64> = DMatrix::identity(n, n) - jac * (h * d);
        let lu = w.lu();
        let singular = || failure(IntegrationMethod::Rosenbrock23, t, "singular iteration matrix");

        let f0v = DVector::from_column_slice(f0);
        let rhs1 = &f0v + &dfdt * (h * d);
        self.k1 = lu.solve(&rhs1).ok_or_else(singular)?;

        for i in 0..n {
            self.tmp[i] = y[i] + 0.5 * h * self.k1[i];
        }
        DynamicalSystem::<f64>::apply(system, t + 0.5 * h, &self.tmp, &mut self.f1);
        let f1v = DVector::from_column_slice(&self.f1);

        let rhs2 = &f1v - &self.k1;
        self.k2 = lu.solve(&rhs2).ok_or_else(singular)? + &self.k1;

        for i in 0..n {
            y_new[i] = y[i] + h * self.k2[i];
        }
        DynamicalSystem::<f64>::apply(system, t + h, y_new, f2);
        let f2v = DVector::from_column_slice(f2);

        let rhs3 = &f2v - (&self.k2 - &f1v) * e32 - (&self.k1 - &f0v) * 2.0 + &dfdt * (h * d);
        let k3 = lu.solve(&rhs3).ok_or_else(singular)?;

        for i in 0..n {
            err[i] = h / 6.0 * (self.k1[i] - 2.0 * self.k2[i] + k3[i]);
        }

        // Two right-hand sides, n Jacobian columns and one time derivative.
        Ok(2 + n + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EggMaturation, MortalityAttack};

    struct Decay {
        rate: f64,
    }

    impl<T: crate::traits::Scalar> DynamicalSystem<T> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
            out[0] = -crate::traits::lift::<T>(self.rate) * x[0];
        }
    }

    struct Blowup;

    impl<T: crate::traits::Scalar> DynamicalSystem<T> for Blowup {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
            out[0] = x[0] * x[0];
        }
    }

    fn assert_invalid(result: Result<Solution>, needle: &str) {
        match result {
            Err(DynamicsError::InvalidArgument(message)) => assert!(
                message.contains(needle),
                "expected \"{needle}\" in \"{message}\""
            ),
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn linspace_includes_both_ends() {
        let points = linspace(0.0, 1.0, 1000);
        assert_eq!(points.len(), 1000);
        assert_eq!(points[0], 0.0);
        assert_eq!(points[999], 1.0);
        assert!(points.windows(2).all(|w| w[1] > w[0]));
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn both_methods_match_exponential_decay() {
        let system = Decay { rate: 2.0 };
        let grid = linspace(0.0, 1.0, 11);
        for (method, tol) in [
            (IntegrationMethod::DormandPrince45, 1e-5),
            (IntegrationMethod::Rosenbrock23, 1e-4),
        ] {
            let sol = integrate(&system, &[1.0], [0.0, 1.0], &grid, method, &Tolerances::default())
                .expect("integration");
            assert_eq!(sol.times, grid);
            assert_eq!(sol.states.len(), grid.len());
            assert_eq!(sol.states.state(0), &[1.0]);
            for (t, state) in sol.times.iter().zip(sol.states.states()) {
                let exact = (-2.0 * t).exp();
                assert!(
                    (state[0] - exact).abs() <= tol * exact,
                    "{method:?} at t = {t}: {} vs {exact}",
                    state[0]
                );
            }
        }
    }

    #[test]
    fn mortality_ode_matches_explicit_solution() {
        let model = MortalityAttack { c: 0.1, cd: 0.1 };
        let seed = [2.0 * 5.0, 0.0, 8.0];
        let grid = linspace(0.0, 1.0, 1000);
        let sol = integrate(
            &model,
            &seed,
            [0.0, 1.0],
            &grid,
            IntegrationMethod::DormandPrince45,
            &Tolerances::default(),
        )
        .expect("integration");

        let exact = model.explicit(seed, 1.0);
        let end = sol.final_state();
        assert!((end[0] - exact[0]).abs() <= 1e-6 * exact[0]);
        assert!((end[1] - exact[1]).abs() <= 1e-6 * exact[1]);
        assert_eq!(end[2], 8.0);

        let midway = model.explicit(seed, grid[500]);
        let state = sol.states.state(500);
        assert!((state[0] - midway[0]).abs() <= 1e-6 * midway[0]);
    }

    #[test]
    fn stiff_egg_maturation_conserves_totals() {
        let model = EggMaturation { c: 0.1, cr: 1e3 };
        let seed = [10.0, 0.0, 4.0, 4.0];
        let sol = integrate(
            &model,
            &seed,
            [0.0, 1.0],
            &[1.0],
            IntegrationMethod::Rosenbrock23,
            &Tolerances::default(),
        )
        .expect("integration");
        let end = sol.final_state();
        assert!((end[0] + end[1] - 10.0).abs() < 1e-6);
        assert!((end[2] + end[3] - 8.0).abs() < 1e-6);
        assert!(sol.stats.accepted_steps > 0);
    }

    #[test]
    fn step_budget_exhaustion_is_an_integration_failure() {
        let tolerances = Tolerances {
            max_steps: 3,
            ..Tolerances::default()
        };
        let err = integrate(
            &Decay { rate: 50.0 },
            &[1.0],
            [0.0, 10.0],
            &[10.0],
            IntegrationMethod::DormandPrince45,
            &tolerances,
        )
        .expect_err("budget");
        match err {
            DynamicsError::IntegrationFailure { method, reason, .. } => {
                assert_eq!(method, IntegrationMethod::DormandPrince45);
                assert!(reason.contains("step budget"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn finite_time_blowup_fails() {
        // y' = y², y(0) = 1 escapes to infinity at t = 1.
        let err = integrate(
            &Blowup,
            &[1.0],
            [0.0, 2.0],
            &[2.0],
            IntegrationMethod::DormandPrince45,
            &Tolerances::default(),
        )
        .expect_err("blow-up");
        assert!(matches!(err, DynamicsError::IntegrationFailure { .. }));
    }

    #[test]
    fn fallback_switches_to_stiff_method() {
        let tolerances = Tolerances {
            max_steps: 2_000,
            ..Tolerances::default()
        };
        let model = EggMaturation { c: 0.1, cr: 1e5 };
        let sol = integrate_with_fallback(&model, &[10.0, 0.0, 4.0, 4.0], [0.0, 1.0], &[1.0], &tolerances)
            .expect("fallback succeeds");
        assert_eq!(sol.method, IntegrationMethod::Rosenbrock23);
    }

    #[test]
    fn rejects_malformed_problems() {
        let tol = Tolerances::default();
        let system = Decay { rate: 1.0 };
        let m = IntegrationMethod::DormandPrince45;
        assert_invalid(integrate(&system, &[1.0, 2.0], [0.0, 1.0], &[1.0], m, &tol), "dimension");
        assert_invalid(integrate(&system, &[1.0], [1.0, 1.0], &[1.0], m, &tol), "interval");
        assert_invalid(integrate(&system, &[1.0], [0.0, 1.0], &[], m, &tol), "empty");
        assert_invalid(integrate(&system, &[1.0], [0.0, 1.0], &[0.5, 0.2], m, &tol), "ascending");
        assert_invalid(integrate(&system, &[1.0], [0.0, 1.0], &[1.5], m, &tol), "within");
        let bad = Tolerances {
            relative: 0.0,
            absolute: 0.0,
            ..Tolerances::default()
        };
        assert_invalid(integrate(&system, &[1.0], [0.0, 1.0], &[1.0], m, &bad), "both be zero");
    }
}
