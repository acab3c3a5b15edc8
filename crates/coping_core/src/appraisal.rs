//! Appraisal memory: what the agent remembers about stimuli it has met.
//!
//! Appraisals accumulate for the life of the status object and are never
//! removed. The `current_*` fields are a denormalized view of the appraisal
//! that is active right now.

use crate::stimulus::{Stimulus, StimulusId};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentStatus {
    appraisals: Vec<Stimulus>,
    #[serde(skip)]
    index: HashMap<StimulusId, usize>,

    pub current_id: Option<StimulusId>,
    pub current_intensity: f32,
    pub expected_probability: f32,
    pub current_encounter_count: u32,
}

impl AgentStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appraise `stimulus` as the active trigger.
    ///
    /// The first encounter stores a copy; later encounters only refresh the
    /// stored copy's counters. `expected_probability` is the normalized
    /// likelihood the sampler assigned to this stimulus.
    pub fn appraise(&mut self, stimulus: &Stimulus, expected_probability: f32, intensity: f32) {
        match self.index.get(&stimulus.id) {
            Some(&i) => {
                let known = &mut self.appraisals[i];
                known.encounter_count = stimulus.encounter_count;
                known.reappraisal_count = stimulus.reappraisal_count;
            }
            None => {
                self.index.insert(stimulus.id, self.appraisals.len());
                self.appraisals.push(stimulus.clone());
            }
        }

        self.current_id = Some(stimulus.id);
        self.current_intensity = intensity;
        self.expected_probability = expected_probability;
        self.current_encounter_count = stimulus.encounter_count;
    }

    /// Mirror a reappraisal of the active stimulus into memory.
    pub fn record_reappraisal(&mut self, id: StimulusId, reappraisal_count: u32) {
        if let Some(&i) = self.index.get(&id) {
            self.appraisals[i].reappraisal_count = reappraisal_count;
        }
    }

    pub fn set_current_intensity(&mut self, intensity: f32) {
        self.current_intensity = intensity;
    }

    pub fn get(&self, id: StimulusId) -> Option<&Stimulus> {
        self.index.get(&id).map(|&i| &self.appraisals[i])
    }

    /// Appraisals in first-encounter order.
    pub fn appraisals(&self) -> &[Stimulus] {
        &self.appraisals
    }

    pub fn len(&self) -> usize {
        self.appraisals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appraisals.is_empty()
    }
}
