//! # Coping Agent
//!
//! Tabular Q-learning over the coping environment's discrete states.
//!
//! The agent owns a zero-initialized value table of fixed dimensions and
//! selects actions with one of three policies:
//!
//! - **epsilon-greedy**: uniform exploration with probability epsilon,
//!   otherwise a maximizing action with random tie-breaking.
//! - **softmax**: Boltzmann sampling at a positive temperature.
//! - **UCB**: `Q(s,a) + c * sqrt(ln t / N(a))`, valid only once every action
//!   has been tried.

mod agent;
mod policy;
mod table;

pub use agent::{AgentConfig, QTableAgent};
pub use policy::{softmax, ucb_scores, Policy};
pub use table::QTable;
