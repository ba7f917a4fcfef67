use thiserror::Error;

use crate::integrator::IntegrationMethod;

/// Failures surfaced by the generator, the integrator and the boundary tracer.
///
/// Numerical divergence is not represented here: NaN and infinite states are
/// valid model output and flow through a trajectory unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DynamicsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{method:?} integration failed at t = {time}: {reason}")]
    IntegrationFailure {
        method: IntegrationMethod,
        time: f64,
        reason: String,
    },

    #[error(
        "root not found for control value {control} after {evaluations} evaluations \
         (last iterate {last_iterate}, |f| = {residual})"
    )]
    RootNotFound {
        control: f64,
        last_iterate: f64,
        residual: f64,
        evaluations: usize,
    },
}

impl DynamicsError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type Result<T, E = DynamicsError> = std::result::Result<T, E>;
