use thiserror::Error;

/// Every failure the simulation core can report.
///
/// Invalid-input variants guarantee that nothing was mutated. Configuration
/// variants are raised at construction or call time and never fall back to a
/// default.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CopingError {
    #[error("invalid action {index}: the action space is 0..{n_actions}")]
    InvalidAction { index: usize, n_actions: usize },

    #[error("invalid state {index}: the state space is 0..{n_states}")]
    InvalidState { index: usize, n_states: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported policy '{0}' (expected epsilon_greedy, softmax or ucb)")]
    UnsupportedPolicy(String),

    #[error("policy '{policy}' requires parameter '{parameter}'")]
    MissingParameter {
        policy: &'static str,
        parameter: &'static str,
    },

    #[error("UCB selection requires every action to be tried once; action {action} has never been selected")]
    UcbWarmUpRequired { action: usize },

    #[error("unsupported render mode '{0}' (expected human or log)")]
    UnsupportedMode(String),

    #[error("episode finished; call reset() before stepping again")]
    EpisodeFinished,

    #[error("failed to serialize snapshot: {0}")]
    Snapshot(String),
}

impl CopingError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors caused by a bad argument to a single call.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidAction { .. } | Self::InvalidState { .. })
    }
}

pub type Result<T> = std::result::Result<T, CopingError>;
