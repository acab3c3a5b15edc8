//! Tabular Q-learning agent.
//!
//! Holds the value table plus the per-action selection counts that the UCB
//! policy needs. Epsilon is left for the caller to anneal.

use crate::policy::{self, Policy};
use crate::table::QTable;
use coping_core::{CopingError, LearningConfig, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentConfig {
    pub n_states: usize,
    pub n_actions: usize,
    /// Learning rate, in (0, 1].
    pub alpha: f32,
    /// Discount factor, in [0, 1].
    pub gamma: f32,
    /// Exploration rate for epsilon-greedy, in [0, 1].
    pub epsilon: f32,
}

impl AgentConfig {
    pub fn new(n_states: usize, n_actions: usize, learning: &LearningConfig) -> Self {
        Self {
            n_states,
            n_actions,
            alpha: learning.alpha,
            gamma: learning.gamma,
            epsilon: learning.epsilon,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_states == 0 || self.n_actions == 0 {
            return Err(CopingError::config(format!(
                "value table needs at least one state and one action, got {}x{}",
                self.n_states, self.n_actions
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(CopingError::config(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(CopingError::config(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        check_epsilon(self.epsilon)
    }
}

fn check_epsilon(epsilon: f32) -> Result<()> {
    if (0.0..=1.0).contains(&epsilon) {
        Ok(())
    } else {
        Err(CopingError::config(format!(
            "epsilon must be in [0, 1], got {epsilon}"
        )))
    }
}

/// Q-learning agent over a fixed `n_states x n_actions` value table.
pub struct QTableAgent {
    table: QTable,
    alpha: f32,
    gamma: f32,
    epsilon: f32,
    /// N(a): how often each action has been selected.
    counts: Vec<u64>,
    /// t: total selections.
    total: u64,
    rng: StdRng,
}

impl QTableAgent {
    pub fn new(config: AgentConfig) -> Result<Self> {
        Self::build(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: AgentConfig, seed: u64) -> Result<Self> {
        Self::build(config, StdRng::seed_from_u64(seed))
    }

    fn build(config: AgentConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            table: QTable::zeros(config.n_states, config.n_actions),
            alpha: config.alpha,
            gamma: config.gamma,
            epsilon: config.epsilon,
            counts: vec![0; config.n_actions],
            total: 0,
            rng,
        })
    }

    /// Select an action for `state` under `policy` and count the selection.
    pub fn choose_action(&mut self, state: usize, policy: &Policy) -> Result<usize> {
        let row = self.table.row(state)?;
        let action = match *policy {
            Policy::EpsilonGreedy => policy::epsilon_greedy(row, self.epsilon, &mut self.rng),
            Policy::Softmax { temperature } => {
                policy::softmax_sample(row, temperature, &mut self.rng)?
            }
            Policy::Ucb { c } => {
                let scores = policy::ucb_scores(row, &self.counts, self.total, c)?;
                policy::argmax_random_tie(&scores, &mut self.rng)
            }
        };
        self.counts[action] += 1;
        self.total += 1;
        Ok(action)
    }

    /// Greedy action without exploration and without counting it.
    pub fn best_action(&mut self, state: usize) -> Result<usize> {
        let row = self.table.row(state)?;
        Ok(policy::argmax_random_tie(row, &mut self.rng))
    }

    /// Actions never selected so far, in index order. UCB selection is only
    /// permitted once this is empty; callers run them round-robin and report
    /// each through [`record_selection`](Self::record_selection).
    pub fn warm_up_actions(&self) -> Vec<usize> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(a, _)| a)
            .collect()
    }

    /// Count an action chosen outside `choose_action`.
    pub fn record_selection(&mut self, action: usize) -> Result<()> {
        self.table.check_action(action)?;
        self.counts[action] += 1;
        self.total += 1;
        Ok(())
    }

    /// One-step Q-learning:
    /// `Q(s,a) += alpha * (reward + gamma * max_a' Q(s',a') - Q(s,a))`.
    pub fn update(
        &mut self,
        state: usize,
        next_state: usize,
        action: usize,
        reward: f32,
    ) -> Result<()> {
        let q = self.table.get(state, action)?;
        let next_max = self.table.max_value(next_state)?;
        let target = reward + self.gamma * next_max;
        let updated = q + self.alpha * (target - q);
        tracing::trace!(state, action, reward, q, updated, "q update");
        self.table.set(state, action, updated);
        Ok(())
    }

    pub fn set_epsilon(&mut self, epsilon: f32) -> Result<()> {
        check_epsilon(epsilon)?;
        tracing::debug!(from = self.epsilon, to = epsilon, "epsilon set");
        self.epsilon = epsilon;
        Ok(())
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn q(&self, state: usize, action: usize) -> Result<f32> {
        self.table.get(state, action)
    }

    pub fn selection_counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total_selections(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(n_states: usize, epsilon: f32) -> AgentConfig {
        AgentConfig {
            n_states,
            n_actions: 3,
            alpha: 0.5,
            gamma: 0.9,
            epsilon,
        }
    }

    #[test]
    fn test_table_starts_at_zero() {
        let agent = QTableAgent::with_seed(config(5, 0.1), 1).unwrap();
        assert!(agent.table().values().iter().all(|v| *v == 0.0));
        assert_eq!(agent.table().n_states(), 5);
        assert_eq!(agent.total_selections(), 0);
    }

    #[test]
    fn test_update_rule() {
        let mut agent = QTableAgent::with_seed(config(2, 0.1), 1).unwrap();
        // Q(1, 2) = 0 + 0.5 * (4 + 0.9 * 0 - 0) = 2
        agent.update(1, 0, 2, 4.0).unwrap();
        assert!((agent.q(1, 2).unwrap() - 2.0).abs() < 1e-6);
        // Q(0, 0) = 0 + 0.5 * (1 + 0.9 * 2 - 0) = 1.4
        agent.update(0, 1, 0, 1.0).unwrap();
        assert!((agent.q(0, 0).unwrap() - 1.4).abs() < 1e-6);
        // Nothing else moved.
        assert_eq!(agent.q(0, 1).unwrap(), 0.0);
        assert_eq!(agent.q(1, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_update_rejects_bad_indices_without_mutation() {
        let mut agent = QTableAgent::with_seed(config(2, 0.1), 1).unwrap();
        let before = agent.table().clone();
        assert!(agent.update(2, 0, 0, 1.0).is_err());
        assert!(agent.update(0, 9, 0, 1.0).is_err());
        assert!(agent.update(0, 0, 3, 1.0).is_err());
        assert_eq!(agent.table(), &before);
    }

    #[test]
    fn test_greedy_picks_a_maximizer() {
        let mut agent = QTableAgent::with_seed(config(1, 0.0), 3).unwrap();
        agent.update(0, 0, 1, 5.0).unwrap();
        for _ in 0..100 {
            assert_eq!(agent.choose_action(0, &Policy::EpsilonGreedy).unwrap(), 1);
        }
        assert_eq!(agent.selection_counts(), &[0, 100, 0]);
    }

    #[test]
    fn test_choose_action_invalid_state() {
        let mut agent = QTableAgent::with_seed(config(2, 0.1), 1).unwrap();
        assert!(matches!(
            agent.choose_action(2, &Policy::EpsilonGreedy),
            Err(CopingError::InvalidState { index: 2, n_states: 2 })
        ));
        assert_eq!(agent.total_selections(), 0);
    }

    #[test]
    fn test_ucb_requires_warm_up() {
        let mut agent = QTableAgent::with_seed(config(1, 0.1), 1).unwrap();
        let ucb = Policy::Ucb { c: 1.0 };
        assert_eq!(
            agent.choose_action(0, &ucb),
            Err(CopingError::UcbWarmUpRequired { action: 0 })
        );
        assert_eq!(agent.warm_up_actions(), vec![0, 1, 2]);

        for a in agent.warm_up_actions() {
            agent.record_selection(a).unwrap();
        }
        assert!(agent.warm_up_actions().is_empty());
        assert_eq!(agent.total_selections(), 3);
        assert!(agent.choose_action(0, &ucb).is_ok());
        assert_eq!(agent.total_selections(), 4);
    }

    #[test]
    fn test_ucb_prefers_least_tried_on_equal_values() {
        let mut agent = QTableAgent::with_seed(config(1, 0.1), 1).unwrap();
        for a in [0, 0, 0, 1, 1, 1, 2] {
            agent.record_selection(a).unwrap();
        }
        assert_eq!(agent.choose_action(0, &Policy::Ucb { c: 2.0 }).unwrap(), 2);
    }

    #[test]
    fn test_config_validation() {
        let mut c = config(1, 0.1);
        c.alpha = 0.0;
        assert!(QTableAgent::new(c).is_err());

        let mut c = config(1, 0.1);
        c.gamma = 1.5;
        assert!(QTableAgent::new(c).is_err());

        let mut c = config(1, 0.1);
        c.epsilon = -0.1;
        assert!(QTableAgent::new(c).is_err());

        assert!(QTableAgent::new(config(0, 0.1)).is_err());
    }

    #[test]
    fn test_set_epsilon() {
        let mut agent = QTableAgent::with_seed(config(1, 0.1), 1).unwrap();
        agent.set_epsilon(0.7).unwrap();
        assert_eq!(agent.epsilon(), 0.7);
        assert!(agent.set_epsilon(1.2).is_err());
        assert_eq!(agent.epsilon(), 0.7);
    }

    #[test]
    fn test_record_selection_rejects_unknown_action() {
        let mut agent = QTableAgent::with_seed(config(1, 0.1), 1).unwrap();
        assert!(agent.record_selection(3).is_err());
        assert_eq!(agent.total_selections(), 0);
    }
}
