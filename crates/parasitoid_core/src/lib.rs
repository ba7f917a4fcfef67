//! Numerical engine for host-parasitoid population dynamics.
//!
//! Models are written once, generic over [`traits::Scalar`], and evaluated on
//! `f64` for simulation or on [`autodiff::Dual`] for Jacobians.
//!
//! Key components:
//! - **Trajectory**: repeated application of a one-period transition (closed-form
//!   maps and semi-discrete models alike).
//! - **Integrator**: adaptive Dormand–Prince and Rosenbrock steppers for the
//!   vulnerable-period ODEs.
//! - **Tracer**: secant root searches over a parameter sweep, producing stability
//!   boundaries.
//! - **Linearization**: fixed points, eigenvalues and Jury conditions.
//! - **Scenario**: the textbook computations, each returning renderer-ready figure data.
pub mod autodiff;
pub mod error;
pub mod figure;
pub mod integrator;
pub mod linearization;
pub mod models;
pub mod scenario;
pub mod semi_discrete;
pub mod tracer;
pub mod traits;
pub mod trajectory;

pub use error::DynamicsError;
pub use scenario::{Report, RunSettings, Scenario};
