//! Read-only views of the environment for logging and plotting.

use coping_core::{CopingError, StimulusId};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Emit the snapshot as a tracing event and return the text.
    Human,
    /// Return the snapshot as a JSON line.
    Log,
}

impl FromStr for RenderMode {
    type Err = CopingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(RenderMode::Human),
            "log" => Ok(RenderMode::Log),
            other => Err(CopingError::UnsupportedMode(other.to_string())),
        }
    }
}

/// State of the active encounter at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub stimulus_id: StimulusId,
    pub slot: usize,
    pub step: usize,
    pub state: usize,
    pub intensity: f32,
    /// Working copy of the encounter's intensity.
    pub trajectory: Vec<f32>,
    /// Intensity stored on the stimulus record (what the next encounter starts from).
    pub stored_intensity: Vec<f32>,
    pub resolvable: bool,
    pub encounter_count: u32,
    pub reappraisal_count: u32,
    pub appraisals: usize,
    pub done: bool,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stimulus {} (slot {}) step {} state {}: intensity {:.3}, trajectory {:?}, stored {:?}, \
             resolvable={}, encounters={}, reappraisals={}, appraised={}{}",
            self.stimulus_id,
            self.slot,
            self.step,
            self.state,
            self.intensity,
            self.trajectory,
            self.stored_intensity,
            self.resolvable,
            self.encounter_count,
            self.reappraisal_count,
            self.appraisals,
            if self.done { " [done]" } else { "" }
        )
    }
}
