//! Action-selection policies over one row of the value table.

use coping_core::{CopingError, PolicyConfig, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    /// Random action with probability epsilon, else greedy with random tie-breaking.
    EpsilonGreedy,
    /// Sample from the softmax of the row divided by `temperature`.
    Softmax { temperature: f32 },
    /// Upper confidence bound with exploration constant `c`.
    Ucb { c: f32 },
}

impl Policy {
    /// Resolve a policy by name. Parameters a policy does not use are ignored;
    /// parameters it needs must be present.
    pub fn from_name(name: &str, c: Option<f32>, temperature: Option<f32>) -> Result<Self> {
        match name {
            "epsilon_greedy" => Ok(Policy::EpsilonGreedy),
            "softmax" => {
                let temperature = temperature.unwrap_or(1.0);
                if !temperature.is_finite() || temperature <= 0.0 {
                    return Err(CopingError::config(format!(
                        "softmax temperature must be positive, got {temperature}"
                    )));
                }
                Ok(Policy::Softmax { temperature })
            }
            "ucb" => {
                let c = c.ok_or(CopingError::MissingParameter {
                    policy: "ucb",
                    parameter: "c",
                })?;
                if !c.is_finite() || c < 0.0 {
                    return Err(CopingError::config(format!(
                        "ucb exploration constant must be nonnegative, got {c}"
                    )));
                }
                Ok(Policy::Ucb { c })
            }
            other => Err(CopingError::UnsupportedPolicy(other.to_string())),
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        Self::from_name(&config.name, config.c, config.temperature)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Policy::EpsilonGreedy => "epsilon_greedy",
            Policy::Softmax { .. } => "softmax",
            Policy::Ucb { .. } => "ucb",
        }
    }

    pub fn needs_warm_up(&self) -> bool {
        matches!(self, Policy::Ucb { .. })
    }
}

/// Index of a maximal entry, ties broken uniformly at random.
pub(crate) fn argmax_random_tie<R: Rng + ?Sized>(values: &[f32], rng: &mut R) -> usize {
    let best = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let ties: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v == best)
        .map(|(i, _)| i)
        .collect();
    // NaN rows have no maximizer; fall back to a uniform draw.
    match ties.choose(rng) {
        Some(&i) => i,
        None => rng.gen_range(0..values.len()),
    }
}

pub(crate) fn epsilon_greedy<R: Rng + ?Sized>(row: &[f32], epsilon: f32, rng: &mut R) -> usize {
    if rng.gen::<f32>() < epsilon {
        rng.gen_range(0..row.len())
    } else {
        argmax_random_tie(row, rng)
    }
}

/// Softmax probabilities of `row` at `temperature`, shifted by the row
/// maximum so large values cannot overflow.
pub fn softmax(row: &[f32], temperature: f32) -> Vec<f32> {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = row.iter().map(|q| ((q - max) / temperature).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

pub(crate) fn softmax_sample<R: Rng + ?Sized>(
    row: &[f32],
    temperature: f32,
    rng: &mut R,
) -> Result<usize> {
    let probs = softmax(row, temperature);
    let dist = WeightedIndex::new(&probs)
        .map_err(|e| CopingError::config(format!("softmax over {row:?} is not a distribution: {e}")))?;
    Ok(dist.sample(rng))
}

/// UCB score of every action. Fails if an action was never selected.
pub fn ucb_scores(row: &[f32], counts: &[u64], total: u64, c: f32) -> Result<Vec<f32>> {
    if let Some(action) = counts.iter().position(|n| *n == 0) {
        return Err(CopingError::UcbWarmUpRequired { action });
    }
    let ln_t = (total as f32).ln();
    Ok(row
        .iter()
        .zip(counts)
        .map(|(q, n)| q + c * (ln_t / *n as f32).sqrt())
        .collect())
}
