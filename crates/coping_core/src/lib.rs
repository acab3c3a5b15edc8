//! # Coping Core
//!
//! Shared vocabulary of the coping simulator: the three coping actions,
//! stimulus records, the agent's appraisal memory, experiment configuration
//! and the error type every other crate reports through.

pub mod action;
pub mod appraisal;
pub mod config;
pub mod error;
pub mod stimulus;

pub use action::Action;
pub use appraisal::AgentStatus;
pub use config::{
    EnvConfig, EnvironmentVariant, EpsilonSchedule, ExperimentConfig, IntensityModel,
    LearningConfig, PolicyConfig, PopulationConfig, ResetMode, RunConfig, Sampling,
    ScalarEpisode, StateRepresentation, StimulusKind,
};
pub use error::{CopingError, Result};
pub use stimulus::{Bounds, Intensity, Stimulus, StimulusId};
