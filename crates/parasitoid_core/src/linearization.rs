//! Local stability of fixed points: Jacobians, eigenvalues and Jury conditions.

use crate::autodiff::Dual;
use crate::traits::{DynamicalSystem, SystemKind};
use anyhow::{anyhow, bail, Context, Result};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_steps: usize,
    pub damping: f64,
    pub tolerance: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: 50,
            damping: 1.0,
            tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl ComplexNumber {
    pub fn modulus(&self) -> f64 {
        self.re.hypot(self.im)
    }
}

impl From<Complex<f64>> for ComplexNumber {
    fn from(value: Complex<f64>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedPoint {
    pub state: Vec<f64>,
    pub residual_norm: f64,
    pub iterations: usize,
    /// Row-major Jacobian of the system itself (not of the residual).
    pub jacobian: Vec<f64>,
    pub eigenvalues: Vec<ComplexNumber>,
    pub stable: bool,
}

/// Jacobian `∂f/∂x` at `(t, x)` by forward-mode differentiation, one column per pass.
pub fn jacobian<S>(system: &S, t: f64, state: &[f64]) -> DMatrix<f64>
where
    S: DynamicalSystem<Dual>,
{
    let dim = state.len();
    let mut matrix = DMatrix::zeros(dim, dim);
    let mut dual_state: Vec<Dual> = state.iter().map(|&v| Dual::constant(v)).collect();
    let mut dual_out = vec![Dual::constant(0.0); dim];
    let t_dual = Dual::constant(t);

    for j in 0..dim {
        dual_state[j].eps = 1.0;
        system.apply(t_dual, &dual_state, &mut dual_out);
        for i in 0..dim {
            matrix[(i, j)] = dual_out[i].eps;
        }
        dual_state[j].eps = 0.0;
    }
    matrix
}

/// Explicit time dependence `∂f/∂t`; zero for autonomous models.
pub fn time_derivative<S>(system: &S, t: f64, state: &[f64]) -> DVector<f64>
where
    S: DynamicalSystem<Dual>,
{
    let dual_state: Vec<Dual> = state.iter().map(|&v| Dual::constant(v)).collect();
    let mut dual_out = vec![Dual::constant(0.0); state.len()];
    system.apply(Dual::variable(t), &dual_state, &mut dual_out);
    DVector::from_iterator(state.len(), dual_out.iter().map(|d| d.eps))
}

pub fn eigenvalues(matrix: &DMatrix<f64>) -> Result<Vec<ComplexNumber>> {
    if !matrix.is_square() {
        bail!(
            "Eigenvalues require a square matrix, got {}x{}.",
            matrix.nrows(),
            matrix.ncols()
        );
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        bail!("Matrix has non-finite entries.");
    }
    Ok(matrix
        .complex_eigenvalues()
        .iter()
        .map(|&lambda| ComplexNumber::from(lambda))
        .collect())
}

/// Largest eigenvalue magnitude. A map's fixed point is linearly stable when this is below one.
pub fn spectral_radius(matrix: &DMatrix<f64>) -> Result<f64> {
    let values = eigenvalues(matrix)?;
    Ok(values.iter().map(ComplexNumber::modulus).fold(0.0, f64::max))
}

/// The three Jury quantities of a 2×2 map linearization, `λ² - tr·λ + det`:
/// `(1 - tr + det, 1 + tr + det, 1 - det)`. All three positive means stable.
pub fn jury_conditions(matrix: &DMatrix<f64>) -> Result<[f64; 3]> {
    if matrix.nrows() != 2 || matrix.ncols() != 2 {
        bail!(
            "Jury conditions are implemented for 2x2 systems, got {}x{}.",
            matrix.nrows(),
            matrix.ncols()
        );
    }
    let tr = matrix.trace();
    let det = matrix[(0, 0)] * matrix[(1, 1)] - matrix[(0, 1)] * matrix[(1, 0)];
    Ok([1.0 - tr + det, 1.0 + tr + det, 1.0 - det])
}

/// Textbook Jury functions of the Nicholson-Bailey coexistence equilibrium:
/// `J1 = ln R`, `J2 = 2 + ln R (R+1)/(R-1)`, `J3 = 1 - R ln R/(R-1)`.
///
/// `J3 < 0` for every `R > 1`, so the equilibrium is never stable.
pub fn nicholson_bailey_jury(r: f64) -> [f64; 3] {
    let ln_r = r.ln();
    [
        ln_r,
        2.0 + ln_r * (r + 1.0) / (r - 1.0),
        1.0 - ln_r * r / (r - 1.0),
    ]
}

/// Damped Newton iteration on the fixed-point residual (`f(x) - x` for maps,
/// `f(x)` for flows), followed by the eigenvalues of the system Jacobian.
pub fn fixed_point<S>(
    system: &S,
    kind: SystemKind,
    initial_guess: &[f64],
    settings: NewtonSettings,
) -> Result<FixedPoint>
where
    S: DynamicalSystem<f64> + DynamicalSystem<Dual>,
{
    let dim = DynamicalSystem::<f64>::dimension(system);
    if dim == 0 {
        bail!("System has zero dimension.");
    }
    if initial_guess.len() != dim {
        bail!(
            "Initial guess dimension mismatch. Expected {}, got {}.",
            dim,
            initial_guess.len()
        );
    }
    if settings.max_steps == 0 {
        bail!("max_steps must be greater than zero.");
    }
    if settings.damping <= 0.0 {
        bail!("damping must be positive.");
    }
    if settings.tolerance <= 0.0 {
        bail!("tolerance must be positive.");
    }

    let mut state = initial_guess.to_vec();
    let mut residual = DVector::zeros(dim);
    evaluate_residual(system, kind, &state, &mut residual);
    let mut iterations = 0usize;

    while residual.norm() > settings.tolerance {
        if iterations >= settings.max_steps {
            bail!(
                "Newton solver failed to converge in {} steps (‖r(x)‖ = {}).",
                settings.max_steps,
                residual.norm()
            );
        }

        let delta = residual_jacobian(system, kind, &state)
            .lu()
            .solve(&residual)
            .ok_or_else(|| anyhow!("Jacobian is singular."))
            .context("Failed to solve linear system during Newton iteration.")?;

        for i in 0..dim {
            state[i] -= settings.damping * delta[i];
        }
        iterations += 1;
        evaluate_residual(system, kind, &state, &mut residual);
    }

    let system_jacobian = jacobian(system, 0.0, &state);
    let spectrum = eigenvalues(&system_jacobian)
        .context("Failed to compute eigenvalues of the Jacobian.")?;
    let stable = match kind {
        SystemKind::Map => spectrum.iter().all(|l| l.modulus() < 1.0),
        SystemKind::Flow => spectrum.iter().all(|l| l.re < 0.0),
    };

    Ok(FixedPoint {
        state,
        residual_norm: residual.norm(),
        iterations,
        jacobian: row_major(&system_jacobian),
        eigenvalues: spectrum,
        stable,
    })
}

fn evaluate_residual<S: DynamicalSystem<f64>>(
    system: &S,
    kind: SystemKind,
    state: &[f64],
    out: &mut DVector<f64>,
) {
    system.apply(0.0, state, out.as_mut_slice());
    if kind == SystemKind::Map {
        for i in 0..state.len() {
            out[i] -= state[i];
        }
    }
}

fn residual_jacobian<S: DynamicalSystem<Dual>>(
    system: &S,
    kind: SystemKind,
    state: &[f64],
) -> DMatrix<f64> {
    let mut matrix = jacobian(system, 0.0, state);
    if kind == SystemKind::Map {
        for i in 0..state.len() {
            matrix[(i, i)] -= 1.0;
        }
    }
    matrix
}

pub(crate) fn row_major(matrix: &DMatrix<f64>) -> Vec<f64> {
    let mut out = Vec::with_capacity(matrix.len());
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            out.push(matrix[(i, j)]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HostRefuge, NicholsonBailey, PlanarExample};

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn planar_jacobians_match_textbook_matrices() {
        let j1 = jacobian(&PlanarExample, 0.0, &PlanarExample::STABLE_FIXED_POINT);
        let expected = DMatrix::from_row_slice(2, 2, &[0.25, -0.25, 3.0, 0.75]);
        assert!((j1 - expected).abs().max() < 1e-14);

        let j2 = jacobian(&PlanarExample, 0.0, &PlanarExample::UNSTABLE_FIXED_POINT);
        let expected = DMatrix::from_row_slice(2, 2, &[0.25, -0.25, -0.75, 2.0]);
        assert!((j2 - expected).abs().max() < 1e-14);
    }

    #[test]
    fn spectral_radius_of_planar_fixed_points() {
        let stable = DMatrix::from_row_slice(2, 2, &[0.25, -0.25, 3.0, 0.75]);
        let rho_1 = spectral_radius(&stable).expect("eigenvalues");
        // Complex pair with |λ|² = det = 0.9375.
        assert!((rho_1 - 0.9375_f64.sqrt()).abs() < 1e-12);

        let unstable = DMatrix::from_row_slice(2, 2, &[0.25, -0.25, -0.75, 2.0]);
        let rho_2 = spectral_radius(&unstable).expect("eigenvalues");
        let expected = (2.25 + (1.75_f64 * 1.75 + 0.75).sqrt()) / 2.0;
        assert!((rho_2 - expected).abs() < 1e-12);
        assert!(rho_2 > 1.0);
    }

    #[test]
    fn newton_finds_planar_fixed_points() {
        let stable = fixed_point(&PlanarExample, SystemKind::Map, &[2.5, 10.0], NewtonSettings::default())
            .expect("fixed point");
        assert!((stable.state[0] - 3.0).abs() < 1e-9);
        assert!((stable.state[1] - 11.0).abs() < 1e-9);
        assert!(stable.stable);

        let unstable = fixed_point(&PlanarExample, SystemKind::Map, &[8.5, -4.5], NewtonSettings::default())
            .expect("fixed point");
        assert!((unstable.state[0] - 8.0).abs() < 1e-9);
        assert!(!unstable.stable);
    }

    #[test]
    fn nicholson_bailey_equilibrium_is_unstable() {
        let model = NicholsonBailey::default();
        let eq = fixed_point(&model, SystemKind::Map, &[6.0, 7.5], NewtonSettings::default())
            .expect("fixed point");
        let expected = model.equilibrium();
        assert!((eq.state[0] - expected[0]).abs() < 1e-8);
        assert!((eq.state[1] - expected[1]).abs() < 1e-8);
        assert!(!eq.stable);
    }

    #[test]
    fn jury_functions_signal_instability_at_r_two() {
        let [j1, j2, j3] = nicholson_bailey_jury(2.0);
        assert!((j1 - 2.0_f64.ln()).abs() < 1e-15);
        assert!(j1 > 0.0);
        assert!(j2 > 0.0);
        assert!(j3 < 0.0);
    }

    #[test]
    fn generic_jury_matches_textbook_functions() {
        for r in [1.5, 2.0, 3.0, 6.0] {
            let model = NicholsonBailey { r, ..NicholsonBailey::default() };
            let j = jacobian(&model, 0.0, &model.equilibrium());
            let generic = jury_conditions(&j).expect("2x2");
            let closed = nicholson_bailey_jury(r);
            for (a, b) in generic.iter().zip(closed.iter()) {
                assert!((a - b).abs() < 1e-12, "R = {r}: {generic:?} vs {closed:?}");
            }
        }
    }

    #[test]
    fn strong_refuge_stabilizes_coexistence() {
        let model = HostRefuge::with_alpha(0.4);
        let eq = fixed_point(&model, SystemKind::Map, &[18.0, 17.0], NewtonSettings::default())
            .expect("fixed point");
        assert!(eq.stable);
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert_err_contains(
            fixed_point(&PlanarExample, SystemKind::Map, &[1.0], NewtonSettings::default()),
            "dimension mismatch",
        );
        let settings = NewtonSettings { max_steps: 0, ..NewtonSettings::default() };
        assert_err_contains(
            fixed_point(&PlanarExample, SystemKind::Map, &[1.0, 1.0], settings),
            "max_steps",
        );
        assert_err_contains(
            jury_conditions(&DMatrix::identity(3, 3)),
            "2x2",
        );
        assert_err_contains(
            eigenvalues(&DMatrix::from_row_slice(1, 1, &[f64::NAN])),
            "non-finite",
        );
    }
}
