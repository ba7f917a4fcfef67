//! Semi-discrete models: a yearly map whose parasitism step is an ODE solved
//! over the vulnerable period `[0, T]`.

use crate::autodiff::Dual;
use crate::error::{DynamicsError, Result};
use crate::integrator::{integrate, linspace, IntegrationMethod, Solution, Tolerances};
use crate::models::{EggMaturation, HostMortality, MortalityAttack};
use crate::traits::{DynamicalSystem, Transition};
use serde::{Deserialize, Serialize};

/// Couples a vulnerable-period flow to the yearly host/parasitoid census.
pub trait VulnerablePeriod {
    type Flow: DynamicalSystem<f64> + DynamicalSystem<Dual>;

    fn flow(&self) -> Self::Flow;

    /// Continuous state at `τ = 0` for the census `(H, P)`.
    fn seed(&self, hosts: f64, parasitoids: f64) -> Vec<f64>;

    /// Next census from the continuous state at `τ = T`.
    fn project(&self, end: &[f64]) -> [f64; 2];
}

/// Egg-maturation delay: a fraction `beta` of the parasitoids start the
/// season egg-limited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EggDelay {
    pub beta: f64,
    pub c: f64,
    pub cr: f64,
    pub r: f64,
    pub k: f64,
}

impl Default for EggDelay {
    fn default() -> Self {
        Self {
            beta: 0.5,
            c: 0.1,
            cr: 1.0,
            r: 2.0,
            k: 1.0,
        }
    }
}

impl VulnerablePeriod for EggDelay {
    type Flow = EggMaturation;

    fn flow(&self) -> EggMaturation {
        EggMaturation {
            c: self.c,
            cr: self.cr,
        }
    }

    fn seed(&self, hosts: f64, parasitoids: f64) -> Vec<f64> {
        vec![
            self.r * hosts,
            0.0,
            self.beta * parasitoids,
            (1.0 - self.beta) * parasitoids,
        ]
    }

    fn project(&self, end: &[f64]) -> [f64; 2] {
        [end[0], self.k * end[1]]
    }
}

/// Host mortality solved numerically instead of through the closed form of
/// [`HostMortality`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericalHostMortality {
    pub c: f64,
    pub cd: f64,
    pub r: f64,
    pub k: f64,
}

impl Default for NumericalHostMortality {
    fn default() -> Self {
        Self::from(HostMortality::default())
    }
}

impl From<HostMortality> for NumericalHostMortality {
    fn from(model: HostMortality) -> Self {
        Self {
            c: model.c,
            cd: model.mortality_rate(),
            r: model.r,
            k: model.k,
        }
    }
}

impl VulnerablePeriod for NumericalHostMortality {
    type Flow = MortalityAttack;

    fn flow(&self) -> MortalityAttack {
        MortalityAttack {
            c: self.c,
            cd: self.cd,
        }
    }

    fn seed(&self, hosts: f64, parasitoids: f64) -> Vec<f64> {
        vec![self.r * hosts, 0.0, parasitoids]
    }

    fn project(&self, end: &[f64]) -> [f64; 2] {
        [end[0], self.k * end[1]]
    }
}

/// Yearly transition that integrates `period` over `[0, horizon]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SemiDiscrete<V> {
    pub period: V,
    pub horizon: f64,
    pub method: IntegrationMethod,
    pub tolerances: Tolerances,
}

impl<V: VulnerablePeriod> SemiDiscrete<V> {
    pub fn new(period: V, method: IntegrationMethod) -> Self {
        Self {
            period,
            horizon: 1.0,
            method,
            tolerances: Tolerances::default(),
        }
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// The continuous sub-trajectory for one census, sampled at `samples`
    /// evenly spaced times (at least two).
    pub fn vulnerable_period(&self, census: [f64; 2], samples: usize) -> Result<Solution> {
        if samples < 2 {
            return Err(DynamicsError::invalid("need at least two samples"));
        }
        self.solve(census, &linspace(0.0, self.horizon, samples))
    }

    fn solve(&self, census: [f64; 2], eval_points: &[f64]) -> Result<Solution> {
        let initial = self.period.seed(census[0], census[1]);
        integrate(
            &self.period.flow(),
            &initial,
            [0.0, self.horizon],
            eval_points,
            self.method,
            &self.tolerances,
        )
    }
}

impl<V: VulnerablePeriod> Transition for SemiDiscrete<V> {
    type Error = DynamicsError;

    fn dimension(&self) -> usize {
        2
    }

    fn advance(&mut self, state: &[f64], next: &mut [f64]) -> Result<()> {
        // A diverged census has no vulnerable period to integrate.
        if state.iter().any(|v| !v.is_finite()) {
            next.copy_from_slice(state);
            return Ok(());
        }
        let solution = self.solve([state[0], state[1]], &[self.horizon])?;
        next.copy_from_slice(&self.period.project(solution.final_state()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{generate, iterate_map};

    #[test]
    fn numerical_mortality_reproduces_closed_form_map() {
        let closed = HostMortality::with_z(0.5);
        let mut numerical = SemiDiscrete::new(
            NumericalHostMortality::from(closed),
            IntegrationMethod::DormandPrince45,
        );
        let steps = 10;
        let expected = iterate_map(closed, &[5.0, 8.0], steps).expect("closed form");
        let actual = generate(&mut numerical, &[5.0, 8.0], steps).expect("numerical");
        assert_eq!(actual.len(), steps + 1);
        for (a, e) in actual.states().zip(expected.states()) {
            for i in 0..2 {
                assert!(
                    (a[i] - e[i]).abs() <= 1e-5 * e[i].abs().max(1.0),
                    "{a:?} vs {e:?}"
                );
            }
        }
    }

    #[test]
    fn diverged_census_propagates_without_integrating() {
        let mut model = SemiDiscrete::new(EggDelay::default(), IntegrationMethod::Rosenbrock23);
        let mut next = [0.0; 2];
        model
            .advance(&[f64::INFINITY, 8.0], &mut next)
            .expect("diverged state");
        assert_eq!(next[0], f64::INFINITY);
        assert_eq!(next[1], 8.0);

        let trajectory = generate(&mut model, &[f64::NAN, 8.0], 3).expect("trajectory");
        assert_eq!(trajectory.len(), 4);
        assert!(trajectory.states().all(|s| s[0].is_nan()));
    }

    #[test]
    fn egg_delay_runs_fifty_years() {
        let mut model = SemiDiscrete::new(EggDelay::default(), IntegrationMethod::Rosenbrock23);
        let trajectory = generate(&mut model, &[5.0, 8.0], 50).expect("trajectory");
        assert_eq!(trajectory.len(), 51);
        assert!(trajectory
            .states()
            .all(|s| s.iter().all(|v| v.is_finite() && *v >= -1e-9)));
    }

    #[test]
    fn egg_delay_without_egg_limitation_loses_only_attacked_larvae() {
        let model = SemiDiscrete::new(
            EggDelay {
                beta: 0.0,
                ..EggDelay::default()
            },
            IntegrationMethod::DormandPrince45,
        );
        let solution = model.vulnerable_period([5.0, 8.0], 100).expect("solution");
        assert_eq!(solution.times.len(), 100);
        let seed = solution.states.state(0);
        assert_eq!(seed, &[10.0, 0.0, 0.0, 8.0]);
        let end = solution.final_state();
        assert!((end[0] + end[1] - 10.0).abs() < 1e-6);
        assert!((end[2] + end[3] - 8.0).abs() < 1e-6);
    }

    #[test]
    fn integration_failure_aborts_trajectory() {
        let tolerances = Tolerances {
            max_steps: 1,
            initial_step: Some(1e-3),
            ..Tolerances::default()
        };
        let mut model = SemiDiscrete::new(
            NumericalHostMortality::default(),
            IntegrationMethod::DormandPrince45,
        )
        .with_tolerances(tolerances);
        let err = generate(&mut model, &[5.0, 8.0], 3).expect_err("budget");
        assert!(matches!(err, DynamicsError::IntegrationFailure { .. }));
    }

    #[test]
    fn vulnerable_period_needs_two_samples() {
        let model = SemiDiscrete::new(EggDelay::default(), IntegrationMethod::Rosenbrock23);
        assert!(matches!(
            model.vulnerable_period([5.0, 8.0], 1),
            Err(DynamicsError::InvalidArgument(_))
        ));
    }
}
