use coping_core::Action;
use serde::Serialize;
use std::fmt;

/// Per-action totals accumulated over a training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingStats {
    action_counts: Vec<u64>,
    reward_sums: Vec<f64>,
    /// Running action totals, one row per step.
    cumulative: Vec<Vec<u64>>,
    episodes: u64,
}

impl TrainingStats {
    pub fn new(n_actions: usize) -> Self {
        Self {
            action_counts: vec![0; n_actions],
            reward_sums: vec![0.0; n_actions],
            cumulative: Vec::new(),
            episodes: 0,
        }
    }

    pub(crate) fn record(&mut self, action: usize, reward: f32, done: bool) {
        self.action_counts[action] += 1;
        self.reward_sums[action] += f64::from(reward);
        self.cumulative.push(self.action_counts.clone());
        if done {
            self.episodes += 1;
        }
    }

    pub fn steps(&self) -> usize {
        self.cumulative.len()
    }

    /// Completed episodes (steps that reported `done`).
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn action_counts(&self) -> &[u64] {
        &self.action_counts
    }

    pub fn count(&self, action: Action) -> u64 {
        self.action_counts[action.index()]
    }

    /// Fraction of all steps spent on `action`.
    pub fn share(&self, action: Action) -> f64 {
        if self.cumulative.is_empty() {
            return 0.0;
        }
        self.count(action) as f64 / self.steps() as f64
    }

    pub fn total_reward(&self) -> f64 {
        self.reward_sums.iter().sum()
    }

    /// Mean reward per action; `None` for actions never taken.
    pub fn mean_rewards(&self) -> Vec<Option<f64>> {
        self.reward_sums
            .iter()
            .zip(&self.action_counts)
            .map(|(sum, n)| (*n > 0).then(|| sum / *n as f64))
            .collect()
    }

    /// Action totals after `step` steps (1-based), or `None` past the end.
    pub fn cumulative_at(&self, step: usize) -> Option<&[u64]> {
        step.checked_sub(1)
            .and_then(|i| self.cumulative.get(i))
            .map(Vec::as_slice)
    }

    pub fn cumulative(&self) -> &[Vec<u64>] {
        &self.cumulative
    }
}

impl fmt::Display for TrainingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "steps: {}, episodes: {}", self.steps(), self.episodes)?;
        let means = self.mean_rewards();
        for action in Action::ALL {
            let i = action.index();
            if i >= self.action_counts.len() {
                break;
            }
            match means[i] {
                Some(mean) => writeln!(
                    f,
                    "  {:<10} {:>8}  mean reward {:.4}",
                    action.label(),
                    self.action_counts[i],
                    mean
                )?,
                None => writeln!(f, "  {:<10} {:>8}  mean reward -", action.label(), 0)?,
            }
        }
        Ok(())
    }
}
