//! Discrete-time trajectory generation.

use crate::error::{DynamicsError, Result};
use crate::traits::{DynamicalSystem, Transition};
use serde::{Deserialize, Serialize};

/// States `x_0, ..., x_N` stored row-major, one row per state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    dimension: usize,
    data: Vec<f64>,
}

impl Trajectory {
    pub(crate) fn with_capacity(dimension: usize, states: usize) -> Self {
        Self {
            dimension,
            data: Vec::with_capacity(dimension * states),
        }
    }

    pub(crate) fn push(&mut self, state: &[f64]) {
        debug_assert_eq!(state.len(), self.dimension);
        self.data.extend_from_slice(state);
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored states (`steps + 1` for a generated trajectory).
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn state(&self, index: usize) -> &[f64] {
        let start = index * self.dimension;
        &self.data[start..start + self.dimension]
    }

    pub fn first(&self) -> Option<&[f64]> {
        (!self.is_empty()).then(|| self.state(0))
    }

    pub fn last(&self) -> Option<&[f64]> {
        self.len().checked_sub(1).map(|i| self.state(i))
    }

    pub fn states(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.dimension.max(1))
    }

    /// Time series of one state variable.
    pub fn component(&self, index: usize) -> Vec<f64> {
        self.states().map(|s| s[index]).collect()
    }

    /// `(t, x_t[index])` pairs with `t = 0, 1, ...`.
    pub fn indexed(&self, index: usize) -> Vec<[f64; 2]> {
        self.states()
            .enumerate()
            .map(|(t, s)| [t as f64, s[index]])
            .collect()
    }

    /// Phase-plane points `(x_t[a], x_t[b])`.
    pub fn phase(&self, a: usize, b: usize) -> Vec<[f64; 2]> {
        self.states().map(|s| [s[a], s[b]]).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Adapts a closed-form map to a [`Transition`]; `advance` never returns an error.
#[derive(Debug, Clone, Copy)]
pub struct MapTransition<S> {
    pub system: S,
}

impl<S> MapTransition<S> {
    pub fn new(system: S) -> Self {
        Self { system }
    }
}

impl<S: DynamicalSystem<f64>> Transition for MapTransition<S> {
    type Error = DynamicsError;

    fn dimension(&self) -> usize {
        self.system.dimension()
    }

    fn advance(&mut self, state: &[f64], next: &mut [f64]) -> Result<()> {
        self.system.apply(0.0, state, next);
        Ok(())
    }
}

/// Iterates `transition` `steps` times from `initial_state`.
///
/// Entry 0 is `initial_state` bit for bit and entry `t + 1` is the transition
/// of entry `t`. Non-finite states are carried forward unchanged; a transition
/// error aborts the run with no partial result.
pub fn generate<P>(
    transition: &mut P,
    initial_state: &[f64],
    steps: usize,
) -> Result<Trajectory, P::Error>
where
    P: Transition,
    P::Error: From<DynamicsError>,
{
    let dim = transition.dimension();
    if dim == 0 {
        return Err(DynamicsError::invalid("transition has zero dimension").into());
    }
    if initial_state.len() != dim {
        return Err(DynamicsError::invalid(format!(
            "initial state dimension mismatch: expected {}, got {}",
            dim,
            initial_state.len()
        ))
        .into());
    }

    let mut trajectory = Trajectory::with_capacity(dim, steps + 1);
    trajectory.push(initial_state);

    let mut current = initial_state.to_vec();
    let mut next = vec![0.0; dim];
    for _ in 0..steps {
        transition.advance(&current, &mut next)?;
        trajectory.push(&next);
        std::mem::swap(&mut current, &mut next);
    }

    Ok(trajectory)
}

/// [`generate`] for a closed-form map.
pub fn iterate_map<S: DynamicalSystem<f64>>(
    system: S,
    initial_state: &[f64],
    steps: usize,
) -> Result<Trajectory> {
    generate(&mut MapTransition::new(system), initial_state, steps)
}
