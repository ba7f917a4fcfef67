//! Stability boundaries traced by solving one implicit equation per control value.

use crate::error::{DynamicsError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What to do with a search that exhausts its budget or stalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonConvergence {
    /// Keep the last iterate, flagged as unconverged.
    #[default]
    Accept,
    /// Abort the sweep with [`DynamicsError::RootNotFound`].
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootSettings {
    /// Bound on the final secant step.
    pub step_tolerance: f64,
    /// Bound on `|f(root)|`.
    pub residual_tolerance: f64,
    pub max_evaluations: usize,
    pub policy: NonConvergence,
}

impl Default for RootSettings {
    fn default() -> Self {
        Self {
            step_tolerance: 1e-6,
            residual_tolerance: 1e-6,
            max_evaluations: 1_000_000,
            policy: NonConvergence::Accept,
        }
    }
}

impl RootSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.step_tolerance > 0.0 && self.residual_tolerance > 0.0) {
            return Err(DynamicsError::invalid("root tolerances must be positive"));
        }
        if self.max_evaluations < 2 {
            return Err(DynamicsError::invalid(
                "max_evaluations must allow at least two evaluations",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootEstimate {
    pub root: f64,
    /// `|f(root)|`.
    pub residual: f64,
    pub evaluations: usize,
    pub converged: bool,
}

/// Counts calls against the evaluation budget.
struct Budgeted<F> {
    f: F,
    used: usize,
    limit: usize,
}

impl<F: Fn(f64) -> f64> Budgeted<F> {
    fn call(&mut self, x: f64) -> f64 {
        self.used += 1;
        (self.f)(x)
    }

    fn exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Evaluates `from + step`, halving `step` while the result is not finite.
    fn finite_trial(&mut self, from: f64, mut step: f64) -> Option<(f64, f64, f64)> {
        let mut x = from + step;
        let mut fx = self.call(x);
        let mut halvings = 0;
        while !fx.is_finite() && halvings < 60 && !self.exhausted() {
            step *= 0.5;
            x = from + step;
            fx = self.call(x);
            halvings += 1;
        }
        fx.is_finite().then_some((x, fx, step))
    }
}

/// Secant search for a root of `f` starting at `guess`.
///
/// Trial points where `f` is not finite (outside the equation's domain) are
/// pulled back toward the last iterate by halving. Converged means both the
/// last step and the residual are within tolerance.
pub fn find_root<F: Fn(f64) -> f64>(f: F, guess: f64, settings: &RootSettings) -> RootEstimate {
    let mut f = Budgeted {
        f,
        used: 0,
        limit: settings.max_evaluations,
    };
    let estimate = |root: f64, value: f64, used: usize, converged: bool| RootEstimate {
        root,
        residual: value.abs(),
        evaluations: used,
        converged,
    };

    let mut x0 = guess;
    let mut f0 = f.call(x0);
    if !f0.is_finite() {
        return estimate(x0, f0, f.used, false);
    }
    if f0 == 0.0 {
        return estimate(x0, f0, f.used, true);
    }

    let offset = if x0 != 0.0 { x0 * 1e-4 } else { 1e-4 };
    let Some((mut x1, mut f1, _)) = f.finite_trial(x0, offset) else {
        return estimate(x0, f0, f.used, false);
    };

    while !f.exhausted() {
        if f1 == f0 {
            let converged = f1.abs() <= settings.residual_tolerance;
            return estimate(x1, f1, f.used, converged);
        }
        let step = -f1 * (x1 - x0) / (f1 - f0);
        let Some((x2, f2, taken)) = f.finite_trial(x1, step) else {
            break;
        };
        x0 = x1;
        f0 = f1;
        x1 = x2;
        f1 = f2;
        if taken.abs() <= settings.step_tolerance && f1.abs() <= settings.residual_tolerance {
            return estimate(x1, f1, f.used, true);
        }
    }

    estimate(x1, f1, f.used, false)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalPoint {
    pub control: f64,
    pub critical: f64,
    pub residual: f64,
    pub evaluations: usize,
    pub converged: bool,
}

/// Critical values in the order of the control values they were traced for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepCurve {
    pub points: Vec<CriticalPoint>,
}

impl SweepCurve {
    pub fn all_converged(&self) -> bool {
        self.points.iter().all(|p| p.converged)
    }

    /// `(control, critical)` pairs.
    pub fn pairs(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.control, p.critical]).collect()
    }
}

/// Solves `family(control, x) = 0` for `x` at every control value.
///
/// Searches run in parallel; the output has one point per control value in
/// input order, with the control copied exactly.
pub fn trace<F, G>(
    family: F,
    controls: &[f64],
    guess: G,
    settings: &RootSettings,
) -> Result<SweepCurve>
where
    F: Fn(f64, f64) -> f64 + Sync,
    G: Fn(f64) -> f64 + Sync,
{
    if controls.is_empty() {
        return Err(DynamicsError::invalid("control values are empty"));
    }
    if controls.iter().any(|c| !c.is_finite()) {
        return Err(DynamicsError::invalid("control values must be finite"));
    }
    if controls.windows(2).any(|w| w[1] <= w[0]) {
        return Err(DynamicsError::invalid(
            "control values must be strictly ascending",
        ));
    }
    settings.validate()?;

    let points: Vec<CriticalPoint> = controls
        .par_iter()
        .map(|&control| {
            let estimate = find_root(|x| family(control, x), guess(control), settings);
            CriticalPoint {
                control,
                critical: estimate.root,
                residual: estimate.residual,
                evaluations: estimate.evaluations,
                converged: estimate.converged,
            }
        })
        .collect();

    for point in points.iter().filter(|p| !p.converged) {
        match settings.policy {
            NonConvergence::Fail => {
                return Err(DynamicsError::RootNotFound {
                    control: point.control,
                    last_iterate: point.critical,
                    residual: point.residual,
                    evaluations: point.evaluations,
                })
            }
            NonConvergence::Accept => log::warn!(
                "root search at control {} did not converge (x = {}, |f| = {:e})",
                point.control,
                point.critical,
                point.residual
            ),
        }
    }

    log::debug!(
        "traced {} control values, {} evaluations in total",
        points.len(),
        points.iter().map(|p| p.evaluations).sum::<usize>()
    );

    Ok(SweepCurve { points })
}

/// The two textbook stability boundaries, as functions of `R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    /// Refuge fraction `α*` separating stable coexistence from oscillation.
    HostRefuge,
    /// Relative host mortality `z*` separating stable coexistence from oscillation.
    HostMortality,
}

impl Boundary {
    /// `g(R, x)` whose root in `x` is the critical value.
    pub fn residual(self, r: f64, x: f64) -> f64 {
        match self {
            Boundary::HostRefuge => {
                let alpha = x;
                (1.0 - alpha * r) * r / (r - 1.0)
                    * ((1.0 - alpha) * r / (1.0 - alpha * r)).ln()
                    - 1.0
            }
            Boundary::HostMortality => {
                let z = x;
                r * (r.ln() - z) / (r - z.exp()) - z - 1.0
            }
        }
    }

    pub fn guess(self, r: f64) -> f64 {
        match self {
            Boundary::HostRefuge => 0.9 / r,
            Boundary::HostMortality => 0.5 * r.ln(),
        }
    }

    /// Companion closed-form curve: `α = 1/R` (refuge), `z = ln R` (mortality),
    /// beyond which the parasitoid cannot persist.
    pub fn persistence_limit(self, r: f64) -> f64 {
        match self {
            Boundary::HostRefuge => 1.0 / r,
            Boundary::HostMortality => r.ln(),
        }
    }

    pub fn trace(self, controls: &[f64], settings: &RootSettings) -> Result<SweepCurve> {
        trace(
            |r, x| self.residual(r, x),
            controls,
            |r| self.guess(r),
            settings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::linspace;
    use crate::linearization::fixed_point;
    use crate::models::{HostMortality, HostRefuge};
    use crate::traits::SystemKind;

    fn assert_err_contains(err: DynamicsError, needle: &str) {
        let message = err.to_string();
        assert!(
            message.contains(needle),
            "expected error containing \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn secant_finds_square_root() {
        let estimate = find_root(|x| x * x - 2.0, 1.0, &RootSettings::default());
        assert!(estimate.converged);
        assert!((estimate.root - 2f64.sqrt()).abs() < 1e-8);
        assert!(estimate.residual < 1e-6);
    }

    #[test]
    fn secant_backs_off_outside_domain() {
        // ln is undefined below zero; the first secant step from 3 overshoots.
        let estimate = find_root(|x| x.ln() + 3.0, 3.0, &RootSettings::default());
        assert!(estimate.converged, "{estimate:?}");
        assert!((estimate.root - (-3f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn non_finite_guess_is_unconverged() {
        let estimate = find_root(|x| x.ln(), -1.0, &RootSettings::default());
        assert!(!estimate.converged);
        assert_eq!(estimate.evaluations, 1);
    }

    #[test]
    fn host_refuge_boundary_is_finite_over_sweep() {
        let controls = linspace(1.01, 5.0, 100);
        let curve = Boundary::HostRefuge
            .trace(&controls, &RootSettings::default())
            .expect("sweep");
        assert_eq!(curve.points.len(), controls.len());
        assert!(curve.all_converged());
        for (point, &r) in curve.points.iter().zip(&controls) {
            assert_eq!(point.control.to_bits(), r.to_bits());
            assert!(point.critical.is_finite());
            assert!(point.residual < 1e-6, "R = {r}: {point:?}");
            assert!(point.critical > 0.0 && point.critical < 1.0 / r);
        }
    }

    #[test]
    fn host_refuge_root_at_r_two() {
        let curve = Boundary::HostRefuge
            .trace(&[2.0], &RootSettings::default())
            .expect("sweep");
        assert!((curve.points[0].critical - 0.30102).abs() < 1e-4);
    }

    #[test]
    fn refuge_boundary_separates_stable_and_oscillating_equilibria() {
        let critical = 0.30102;
        let above = fixed_point(
            &HostRefuge::with_alpha(critical + 0.05),
            SystemKind::Map,
            &[15.0, 15.0],
            Default::default(),
        )
        .expect("fixed point");
        assert!(above.stable);
        let below = fixed_point(
            &HostRefuge::with_alpha(critical - 0.05),
            SystemKind::Map,
            &[15.0, 15.0],
            Default::default(),
        )
        .expect("fixed point");
        assert!(!below.stable);
    }

    #[test]
    fn host_mortality_boundary_over_sweep() {
        let controls = linspace(1.01, 5.0, 100);
        let curve = Boundary::HostMortality
            .trace(&controls, &RootSettings::default())
            .expect("sweep");
        assert!(curve.all_converged());
        for point in &curve.points {
            assert!(point.critical > 0.0);
            assert!(point.critical < Boundary::HostMortality.persistence_limit(point.control));
        }
        let at_two = Boundary::HostMortality
            .trace(&[2.0], &RootSettings::default())
            .expect("sweep");
        assert!((at_two.points[0].critical - 0.24230).abs() < 1e-4);
    }

    #[test]
    fn mortality_boundary_matches_linear_stability() {
        let z = 0.24230;
        let stable = fixed_point(
            &HostMortality::with_z(z + 0.1),
            SystemKind::Map,
            &[10.0, 5.0],
            Default::default(),
        )
        .expect("fixed point");
        assert!(stable.stable, "{stable:?}");
    }

    #[test]
    fn rejects_bad_control_sequences() {
        let settings = RootSettings::default();
        let family = |_: f64, x: f64| x;
        assert_err_contains(trace(family, &[], |_| 0.0, &settings).unwrap_err(), "empty");
        assert_err_contains(
            trace(family, &[2.0, 1.0], |_| 0.0, &settings).unwrap_err(),
            "ascending",
        );
        assert_err_contains(
            trace(family, &[1.0, f64::NAN], |_| 0.0, &settings).unwrap_err(),
            "finite",
        );
    }

    #[test]
    fn fail_policy_reports_root_not_found() {
        let settings = RootSettings {
            max_evaluations: 3,
            policy: NonConvergence::Fail,
            ..RootSettings::default()
        };
        let err = Boundary::HostRefuge.trace(&[2.0], &settings).unwrap_err();
        match err {
            DynamicsError::RootNotFound {
                control,
                evaluations,
                ..
            } => {
                assert_eq!(control, 2.0);
                assert!(evaluations <= 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn accept_policy_flags_unconverged_points() {
        let settings = RootSettings {
            max_evaluations: 3,
            ..RootSettings::default()
        };
        let curve = Boundary::HostRefuge.trace(&[2.0, 3.0], &settings).expect("sweep");
        assert!(!curve.all_converged());
        assert!(curve.points.iter().all(|p| p.residual > 1e-6));
    }
}
