//! Dense (state, action) value table.

use coping_core::{CopingError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    n_states: usize,
    n_actions: usize,
    /// Row-major: `values[state * n_actions + action]`.
    values: Vec<f32>,
}

impl QTable {
    /// Zero-initialized table. Dimensions are fixed for its lifetime.
    pub fn zeros(n_states: usize, n_actions: usize) -> Self {
        Self {
            n_states,
            n_actions,
            values: vec![0.0; n_states * n_actions],
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    pub fn check_state(&self, state: usize) -> Result<()> {
        if state < self.n_states {
            Ok(())
        } else {
            Err(CopingError::InvalidState {
                index: state,
                n_states: self.n_states,
            })
        }
    }

    pub fn check_action(&self, action: usize) -> Result<()> {
        if action < self.n_actions {
            Ok(())
        } else {
            Err(CopingError::InvalidAction {
                index: action,
                n_actions: self.n_actions,
            })
        }
    }

    pub fn get(&self, state: usize, action: usize) -> Result<f32> {
        self.check_state(state)?;
        self.check_action(action)?;
        Ok(self.values[state * self.n_actions + action])
    }

    pub(crate) fn set(&mut self, state: usize, action: usize, value: f32) {
        self.values[state * self.n_actions + action] = value;
    }

    pub fn row(&self, state: usize) -> Result<&[f32]> {
        self.check_state(state)?;
        let start = state * self.n_actions;
        Ok(&self.values[start..start + self.n_actions])
    }

    /// Largest value in the row of `state`.
    pub fn max_value(&self, state: usize) -> Result<f32> {
        Ok(self
            .row(state)?
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max))
    }

    /// Every action whose value equals the row maximum.
    pub fn maximizers(&self, state: usize) -> Result<Vec<usize>> {
        let row = self.row(state)?;
        let best = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Ok(row
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == best)
            .map(|(a, _)| a)
            .collect())
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
