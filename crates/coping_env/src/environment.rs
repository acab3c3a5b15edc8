//! The coping environment: one stimulus encounter at a time.
//!
//! Each `step` applies a coping action to the active encounter, computes the
//! reward from the intensity the agent experiences at that step, and decides
//! whether the encounter is over. `reset` retires worn-out stimuli, samples
//! the next one and appraises it into the agent's memory.
//!
//! Every variant (scalar vs trajectory intensity, auto vs manual reset,
//! uniform vs weighted sampling, slot vs intensity-level state) is a field of
//! [`EnvironmentVariant`] rather than a separate type.

use crate::render::{RenderMode, Snapshot};
use crate::sampler::StimulusSampler;
use coping_core::{
    Action, AgentStatus, Bounds, CopingError, EnvConfig, EnvironmentVariant, Intensity,
    IntensityModel, ResetMode, Result, ScalarEpisode, StateRepresentation, Stimulus, StimulusId,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

/// Outcome of one `step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next_state: usize,
    pub reward: f32,
    pub done: bool,
}

/// The encounter currently being lived through.
#[derive(Debug, Clone)]
struct Encounter {
    slot: usize,
    id: StimulusId,
    /// Working copy of the stimulus intensity for this encounter only.
    intensity: Intensity,
    step: usize,
    /// Reappraisals of this stimulus so far, including earlier encounters.
    reappraisals: u32,
    finished: bool,
}

/// Recurring-stimulus environment the agent copes with, one encounter at a time.
pub struct CopingEnv {
    config: EnvConfig,
    stimuli: Vec<Stimulus>,
    status: AgentStatus,
    sampler: StimulusSampler,
    encounter: Encounter,
    /// Id for the next refreshed twin; `None` once the id space is used up.
    next_id: Option<StimulusId>,
    rng: StdRng,
}

impl CopingEnv {
    /// Build an environment that owns `stimuli`. Randomness comes from entropy.
    pub fn new(config: EnvConfig, stimuli: Vec<Stimulus>) -> Result<Self> {
        Self::build(config, stimuli, StdRng::from_entropy())
    }

    /// Build a reproducible environment.
    pub fn with_seed(config: EnvConfig, stimuli: Vec<Stimulus>, seed: u64) -> Result<Self> {
        Self::build(config, stimuli, StdRng::seed_from_u64(seed))
    }

    fn build(config: EnvConfig, mut stimuli: Vec<Stimulus>, rng: StdRng) -> Result<Self> {
        config.validate()?;
        if stimuli.is_empty() {
            return Err(CopingError::config("stimulus set is empty"));
        }

        let bounds = config.variant.intensity_model.bounds();
        let mut seen = HashSet::with_capacity(stimuli.len());
        for s in stimuli.iter_mut() {
            if !seen.insert(s.id) {
                return Err(CopingError::config(format!("duplicate stimulus id {}", s.id)));
            }
            s.validate(bounds)?;
            check_intensity_model(s, config.variant.intensity_model)?;
        }

        let sampler = StimulusSampler::new(config.variant.sampling, &stimuli)?;
        let next_id = match stimuli.iter().map(|s| s.id).max() {
            Some(max) => max.checked_add(1),
            None => Some(0),
        };
        if next_id.is_none() && config.stimulus_max_occurrence.is_some() {
            return Err(CopingError::config(format!(
                "stimulus id {} leaves no fresh id for refreshed stimuli",
                StimulusId::MAX
            )));
        }
        let first = &stimuli[0];
        let encounter = Encounter {
            slot: 0,
            id: first.id,
            intensity: first.intensity.clone(),
            step: 0,
            reappraisals: first.reappraisal_count,
            finished: true,
        };

        let mut env = Self {
            config,
            stimuli,
            status: AgentStatus::new(),
            sampler,
            encounter,
            next_id,
            rng,
        };
        env.reset()?;
        tracing::debug!(
            "CopingEnv ready: {} stimuli, {} states, variant {:?}",
            env.stimuli.len(),
            env.n_states(),
            env.config.variant
        );
        Ok(env)
    }

    // ------------------------------------------------------------------
    // Agent-environment loop
    // ------------------------------------------------------------------

    /// Apply `action` to the active encounter.
    ///
    /// Fails without mutating anything when `action` is outside the action
    /// space, or when a manual-reset episode has already finished. An
    /// auto-reset can also fail once refresh runs out of fresh ids.
    pub fn step(&mut self, action: usize) -> Result<Transition> {
        let action = Action::try_from(action)?;
        if self.encounter.finished {
            return Err(CopingError::EpisodeFinished);
        }

        match action {
            Action::Inaction => {}
            Action::Disengage => self.disengage(),
            Action::Engage => self.engage(),
        }

        let experienced = self.encounter.intensity.at(self.encounter.step);
        let reward = self.model().reward(experienced);
        self.encounter.step += 1;
        self.status.set_current_intensity(experienced);

        let done = self.episode_over();
        tracing::debug!(
            stimulus = self.encounter.id,
            step = self.encounter.step,
            %action,
            intensity = experienced,
            reward,
            done,
            "step"
        );

        if done {
            match self.config.variant.reset_mode {
                ResetMode::Auto => {
                    self.reset()?;
                }
                ResetMode::Manual => self.encounter.finished = true,
            }
        }

        Ok(Transition {
            next_state: self.state(),
            reward,
            done,
        })
    }

    /// Start a new encounter and return its state.
    ///
    /// Fails only when a stimulus is due for refresh and no fresh id is left.
    pub fn reset(&mut self) -> Result<usize> {
        self.refresh_stimuli_list()?;

        let slot = self.sampler.sample(&mut self.rng);
        let stimulus = &mut self.stimuli[slot];
        stimulus.encounter_count += 1;

        self.encounter = Encounter {
            slot,
            id: stimulus.id,
            intensity: stimulus.intensity.clone(),
            step: 0,
            reappraisals: stimulus.reappraisal_count,
            finished: false,
        };
        self.status.appraise(
            stimulus,
            self.sampler.probability(slot),
            self.encounter.intensity.at(0),
        );

        tracing::debug!(
            stimulus = self.encounter.id,
            slot,
            encounters = self.stimuli[slot].encounter_count,
            "reset"
        );
        Ok(self.state())
    }

    /// Replace every stimulus that reached `stimulus_max_occurrence`
    /// encounters with a fresh-id twin. Returns the retired ids.
    ///
    /// Ids are never reused: once the id space is exhausted, a stimulus due
    /// for refresh is an error and the remaining stimuli are left in place.
    pub fn refresh_stimuli_list(&mut self) -> Result<Vec<StimulusId>> {
        let Some(max) = self.config.stimulus_max_occurrence else {
            return Ok(Vec::new());
        };

        let mut retired = Vec::new();
        for slot in 0..self.stimuli.len() {
            if self.stimuli[slot].encounter_count >= max {
                let id = self.next_id.ok_or_else(|| {
                    CopingError::config(format!(
                        "no fresh id left to refresh stimulus {}",
                        self.stimuli[slot].id
                    ))
                })?;
                self.next_id = id.checked_add(1);
                retired.push(self.stimuli[slot].id);
                self.stimuli[slot] = self.stimuli[slot].fresh_twin(id);
            }
        }

        if !retired.is_empty() {
            tracing::debug!("Retired {} stimuli after {} encounters", retired.len(), max);
        }
        Ok(retired)
    }

    // ------------------------------------------------------------------
    // Action effects
    // ------------------------------------------------------------------

    fn disengage(&mut self) {
        let bounds = self.bounds();
        let from = match self.model() {
            IntensityModel::Scalar => 0,
            IntensityModel::Trajectory => self.encounter.step,
        };
        self.encounter
            .intensity
            .lower_from(from, self.config.disengage_benefit, bounds);
    }

    fn engage(&mut self) {
        let bounds = self.bounds();
        let from = match self.model() {
            IntensityModel::Scalar => 0,
            IntensityModel::Trajectory => self.encounter.step.max(self.config.engage_delay()),
        };

        let prior = self.encounter.reappraisals;
        self.encounter.reappraisals += 1;

        let slot = self.encounter.slot;
        // A mid-encounter refresh can detach the record from this encounter.
        let live = self.stimuli[slot].id == self.encounter.id;
        let resolvable = self.stimuli[slot].resolvable;

        if resolvable {
            self.encounter
                .intensity
                .lower_from(from, self.config.engage_benefit, bounds);
            if live {
                self.stimuli[slot]
                    .intensity
                    .lower(self.config.engage_adaptation, bounds);
                self.generalize_adaptation(slot, bounds);
            }
        } else {
            let relief = self.config.engage_benefit + prior as f32 * self.config.engage_adaptation;
            self.encounter.intensity.lower_from(from, relief, bounds);
        }

        if live {
            self.stimuli[slot].reappraisal_count = self.encounter.reappraisals;
            self.status
                .record_reappraisal(self.encounter.id, self.encounter.reappraisals);
        }
    }

    fn generalize_adaptation(&mut self, engaged_slot: usize, bounds: Bounds) {
        let Some(g) = self.config.adaptation_generalization else {
            return;
        };
        let amount = g * self.config.engage_adaptation;
        if amount <= 0.0 {
            return;
        }
        for (slot, s) in self.stimuli.iter_mut().enumerate() {
            if slot != engaged_slot && s.resolvable {
                s.intensity.lower(amount, bounds);
            }
        }
    }

    fn episode_over(&self) -> bool {
        match self.model() {
            IntensityModel::Trajectory => {
                let len = self.encounter.intensity.trajectory_len().unwrap_or(0);
                self.encounter.step >= len
            }
            IntensityModel::Scalar => match self.config.variant.scalar_episode {
                ScalarEpisode::Steps(n) => self.encounter.step >= n as usize,
                ScalarEpisode::Never => false,
            },
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// State index of the active encounter under the configured representation.
    pub fn state(&self) -> usize {
        match self.config.variant.state_representation {
            StateRepresentation::StimulusSlot => self.encounter.slot,
            StateRepresentation::IntensityLevel { levels } => {
                let bounds = self.bounds();
                let x = self.encounter.intensity.at(self.encounter.step);
                let frac = (x - bounds.min) / bounds.width();
                ((frac * levels as f32) as usize).min(levels - 1)
            }
        }
    }

    pub fn n_states(&self) -> usize {
        match self.config.variant.state_representation {
            StateRepresentation::StimulusSlot => self.stimuli.len(),
            StateRepresentation::IntensityLevel { levels } => levels,
        }
    }

    pub fn n_actions(&self) -> usize {
        Action::COUNT
    }

    /// Intensity the agent faces at the current step.
    pub fn current_intensity(&self) -> f32 {
        self.encounter.intensity.at(self.encounter.step)
    }

    pub fn current_stimulus_id(&self) -> StimulusId {
        self.encounter.id
    }

    /// True once a manual-reset episode has ended and awaits `reset`.
    pub fn is_finished(&self) -> bool {
        self.encounter.finished
    }

    pub fn stimuli(&self) -> &[Stimulus] {
        &self.stimuli
    }

    pub fn stimulus(&self, id: StimulusId) -> Option<&Stimulus> {
        self.stimuli.iter().find(|s| s.id == id)
    }

    pub fn status(&self) -> &AgentStatus {
        &self.status
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn variant(&self) -> &EnvironmentVariant {
        &self.config.variant
    }

    pub fn bounds(&self) -> Bounds {
        self.model().bounds()
    }

    fn model(&self) -> IntensityModel {
        self.config.variant.intensity_model
    }

    pub fn snapshot(&self) -> Snapshot {
        let record = &self.stimuli[self.encounter.slot];
        let live = record.id == self.encounter.id;
        Snapshot {
            stimulus_id: self.encounter.id,
            slot: self.encounter.slot,
            step: self.encounter.step,
            state: self.state(),
            intensity: self.current_intensity(),
            trajectory: self.encounter.intensity.values(),
            stored_intensity: if live { record.intensity.values() } else { Vec::new() },
            resolvable: record.resolvable,
            encounter_count: if live { record.encounter_count } else { 0 },
            reappraisal_count: self.encounter.reappraisals,
            appraisals: self.status.len(),
            done: self.encounter.finished,
        }
    }

    /// Render the active encounter. `mode` is `"human"` or `"log"`.
    pub fn render(&self, mode: &str) -> Result<String> {
        let mode: RenderMode = mode.parse()?;
        let snapshot = self.snapshot();
        match mode {
            RenderMode::Human => {
                let text = snapshot.to_string();
                tracing::info!("{}", text);
                Ok(text)
            }
            RenderMode::Log => {
                serde_json::to_string(&snapshot).map_err(|e| CopingError::Snapshot(e.to_string()))
            }
        }
    }
}

fn check_intensity_model(s: &Stimulus, model: IntensityModel) -> Result<()> {
    match (&s.intensity, model) {
        (Intensity::Scalar(_), IntensityModel::Scalar)
        | (Intensity::Trajectory(_), IntensityModel::Trajectory) => Ok(()),
        (Intensity::Scalar(_), IntensityModel::Trajectory) => Err(CopingError::config(format!(
            "stimulus {} has a scalar intensity but the environment expects trajectories",
            s.id
        ))),
        (Intensity::Trajectory(_), IntensityModel::Scalar) => Err(CopingError::config(format!(
            "stimulus {} has a trajectory but the environment expects scalar intensities",
            s.id
        ))),
    }
}
