//! Stimulus records: the recurring affective triggers the agent meets.
//!
//! A stimulus carries either a single intensity or a trajectory of
//! intensities consumed one step at a time. Intensities are clipped to the
//! bounds of the configured intensity model after every mutation.

use crate::error::{CopingError, Result};
use serde::{Deserialize, Serialize};

pub type StimulusId = u32;

/// Closed interval an intensity must stay inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, v: f32) -> f32 {
        v.clamp(self.min, self.max)
    }

    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }

    pub fn width(&self) -> f32 {
        self.max - self.min
    }
}

/// Emotional intensity of a stimulus.
///
/// Deserializes from either a number or an array, so a config file can write
/// `intensity = 9.0` or `intensity = [0.8, 0.8, 0.8]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Intensity {
    Scalar(f32),
    Trajectory(Vec<f32>),
}

impl Intensity {
    /// Intensity experienced at internal step `step`.
    ///
    /// Trajectories saturate at their last entry.
    pub fn at(&self, step: usize) -> f32 {
        match self {
            Intensity::Scalar(v) => *v,
            Intensity::Trajectory(values) => values
                .get(step)
                .or_else(|| values.last())
                .copied()
                .unwrap_or(0.0),
        }
    }

    /// Number of steps in a trajectory; `None` for a scalar.
    pub fn trajectory_len(&self) -> Option<usize> {
        match self {
            Intensity::Scalar(_) => None,
            Intensity::Trajectory(values) => Some(values.len()),
        }
    }

    /// Lower every entry at index `>= from` by `amount`, then clip.
    pub fn lower_from(&mut self, from: usize, amount: f32, bounds: Bounds) {
        match self {
            Intensity::Scalar(v) => {
                if from == 0 {
                    *v = bounds.clamp(*v - amount);
                }
            }
            Intensity::Trajectory(values) => {
                for v in values.iter_mut().skip(from) {
                    *v = bounds.clamp(*v - amount);
                }
            }
        }
    }

    pub fn lower(&mut self, amount: f32, bounds: Bounds) {
        self.lower_from(0, amount, bounds);
    }

    pub fn clamp_to(&mut self, bounds: Bounds) {
        self.lower(0.0, bounds);
    }

    pub fn values(&self) -> Vec<f32> {
        match self {
            Intensity::Scalar(v) => vec![*v],
            Intensity::Trajectory(values) => values.clone(),
        }
    }

    fn validate(&self, id: StimulusId) -> Result<()> {
        match self {
            Intensity::Scalar(v) if !v.is_finite() => Err(CopingError::config(format!(
                "stimulus {id}: intensity must be finite, got {v}"
            ))),
            Intensity::Trajectory(values) if values.is_empty() => Err(CopingError::config(
                format!("stimulus {id}: intensity trajectory is empty"),
            )),
            Intensity::Trajectory(values) if values.iter().any(|v| !v.is_finite()) => Err(
                CopingError::config(format!("stimulus {id}: trajectory contains a non-finite value")),
            ),
            _ => Ok(()),
        }
    }
}

fn default_probability() -> f32 {
    1.0
}

fn default_resolvable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub id: StimulusId,
    pub intensity: Intensity,
    /// Relative weight; normalized across the whole set by the sampler.
    #[serde(default = "default_probability")]
    pub occurrence_probability: f32,
    #[serde(default = "default_resolvable")]
    pub resolvable: bool,
    #[serde(default)]
    pub encounter_count: u32,
    #[serde(default)]
    pub reappraisal_count: u32,
}

impl Stimulus {
    pub fn scalar(id: StimulusId, intensity: f32) -> Self {
        Self::new(id, Intensity::Scalar(intensity))
    }

    pub fn trajectory(id: StimulusId, trajectory: Vec<f32>) -> Self {
        Self::new(id, Intensity::Trajectory(trajectory))
    }

    fn new(id: StimulusId, intensity: Intensity) -> Self {
        Self {
            id,
            intensity,
            occurrence_probability: default_probability(),
            resolvable: default_resolvable(),
            encounter_count: 0,
            reappraisal_count: 0,
        }
    }

    pub fn with_probability(mut self, p: f32) -> Self {
        self.occurrence_probability = p;
        self
    }

    pub fn with_resolvable(mut self, resolvable: bool) -> Self {
        self.resolvable = resolvable;
        self
    }

    /// A new instance of the same kind of trigger: fresh id, same intensity,
    /// probability and resolvability, counters reset.
    pub fn fresh_twin(&self, id: StimulusId) -> Self {
        Self {
            id,
            intensity: self.intensity.clone(),
            occurrence_probability: self.occurrence_probability,
            resolvable: self.resolvable,
            encounter_count: 0,
            reappraisal_count: 0,
        }
    }

    /// Check the record is usable, clipping its intensity into `bounds`.
    pub fn validate(&mut self, bounds: Bounds) -> Result<()> {
        self.intensity.validate(self.id)?;
        if !self.occurrence_probability.is_finite() || self.occurrence_probability < 0.0 {
            return Err(CopingError::config(format!(
                "stimulus {}: occurrence probability must be a nonnegative number, got {}",
                self.id, self.occurrence_probability
            )));
        }
        let before = self.intensity.clone();
        self.intensity.clamp_to(bounds);
        if before != self.intensity {
            tracing::warn!(
                "stimulus {}: intensity clipped into [{}, {}]",
                self.id,
                bounds.min,
                bounds.max
            );
        }
        Ok(())
    }
}
