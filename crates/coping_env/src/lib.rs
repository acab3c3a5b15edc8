//! # Coping Environment
//!
//! Simulates recurring affective triggers and the effect of the three coping
//! actions on their intensity.
//!
//! ## Dynamics
//!
//! - **Inaction** lets the encounter advance one step unchanged.
//! - **Disengage** lowers the intensity of the current encounter only.
//! - **Engage** lowers the current intensity and, for resolvable stimuli,
//!   permanently lowers the stored intensity so later encounters start lower.
//!   Unresolvable stimuli instead give relief that grows with the number of
//!   reappraisals.
//!
//! Reward is always the complement of the intensity the agent feels after
//! acting: lower intensity is better.

mod environment;
mod render;
mod sampler;

pub use environment::{CopingEnv, Transition};
pub use render::{RenderMode, Snapshot};
pub use sampler::StimulusSampler;
