use crate::error::{CopingError, Result as CopingResult};
use crate::stimulus::{Bounds, Intensity, Stimulus, StimulusId};
use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub run: RunConfig,
    pub env: EnvConfig,
    pub learning: LearningConfig,
    pub policy: PolicyConfig,
    pub epsilon_schedule: Option<EpsilonSchedule>,
    /// Explicit stimuli. When empty, `population` generates them.
    pub stimuli: Vec<Stimulus>,
    pub population: PopulationConfig,
}

impl ExperimentConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: ExperimentConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("COPING_SEED") {
            match v.parse() {
                Ok(n) => self.run.seed = Some(n),
                Err(_) => tracing::warn!("Ignoring COPING_SEED={}: not an integer", v),
            }
        }
        if let Ok(v) = std::env::var("COPING_STEPS") {
            match v.parse() {
                Ok(n) => self.run.steps = n,
                Err(_) => tracing::warn!("Ignoring COPING_STEPS={}: not an integer", v),
            }
        }
        if let Ok(v) = std::env::var("COPING_POLICY") {
            self.policy.name = v;
        }
    }

    /// The stimulus set for this experiment: the explicit list if one was
    /// given, otherwise a freshly generated population.
    pub fn build_stimuli<R: Rng + ?Sized>(&self, rng: &mut R) -> CopingResult<Vec<Stimulus>> {
        if self.stimuli.is_empty() {
            self.population.generate(rng)
        } else {
            Ok(self.stimuli.clone())
        }
    }
}

// ============================================================================
// Run
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of agent-environment interactions.
    pub steps: usize,
    /// Seed for every RNG in the run; `None` draws from entropy.
    pub seed: Option<u64>,
    /// The driver resets the environment after this many steps on one
    /// encounter. Required for the recurring scalar variant, which never
    /// reports `done` itself.
    pub episode_steps: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: 10_000,
            seed: None,
            episode_steps: None,
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// How stimulus intensity is represented, which also fixes the legal
/// intensity range and the reward formula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityModel {
    /// One value in [0, 10]; reward is `10 - intensity`.
    Scalar,
    /// A per-step trajectory in [0, 1]; reward is `-intensity`.
    #[default]
    Trajectory,
}

impl IntensityModel {
    pub fn bounds(self) -> Bounds {
        match self {
            IntensityModel::Scalar => Bounds::new(0.0, 10.0),
            IntensityModel::Trajectory => Bounds::new(0.0, 1.0),
        }
    }

    pub fn reward(self, intensity: f32) -> f32 {
        match self {
            IntensityModel::Scalar => self.bounds().max - intensity,
            IntensityModel::Trajectory => -intensity,
        }
    }
}

/// When a scalar-intensity episode ends. Trajectory episodes always end when
/// the trajectory is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarEpisode {
    /// Episode ends after this many internal steps.
    Steps(u32),
    /// Recurring appraisal: `step` never reports `done`; the caller resets.
    Never,
}

impl Default for ScalarEpisode {
    fn default() -> Self {
        ScalarEpisode::Steps(10)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetMode {
    /// On `done` the environment resets itself before returning.
    #[default]
    Auto,
    /// `done` is returned and the caller must call `reset`.
    Manual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    #[default]
    Uniform,
    /// Weighted by each stimulus's `occurrence_probability`.
    Weighted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateRepresentation {
    /// State is the active stimulus's slot in the stimulus set.
    StimulusSlot,
    /// State is the current intensity binned into `levels` equal-width bins.
    IntensityLevel { levels: usize },
}

impl Default for StateRepresentation {
    fn default() -> Self {
        StateRepresentation::StimulusSlot
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentVariant {
    pub intensity_model: IntensityModel,
    pub scalar_episode: ScalarEpisode,
    pub reset_mode: ResetMode,
    pub sampling: Sampling,
    pub state_representation: StateRepresentation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub engage_benefit: f32,
    pub disengage_benefit: f32,
    /// How much a resolvable stimulus's stored intensity drops per engagement.
    pub engage_adaptation: f32,
    /// Fraction of `engage_adaptation` transferred to every other resolvable stimulus.
    pub adaptation_generalization: Option<f32>,
    /// Retire a stimulus after this many encounters (see `refresh_stimuli_list`).
    pub stimulus_max_occurrence: Option<u32>,
    /// Steps into a trajectory before engagement brings relief.
    pub engage_delay: Option<usize>,
    pub variant: EnvironmentVariant,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            engage_benefit: 0.3,
            disengage_benefit: 0.5,
            engage_adaptation: 0.2,
            adaptation_generalization: None,
            stimulus_max_occurrence: None,
            engage_delay: Some(1),
            variant: EnvironmentVariant::default(),
        }
    }
}

impl EnvConfig {
    pub fn validate(&self) -> CopingResult<()> {
        for (name, v) in [
            ("engage_benefit", self.engage_benefit),
            ("disengage_benefit", self.disengage_benefit),
            ("engage_adaptation", self.engage_adaptation),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(CopingError::config(format!(
                    "{name} must be a nonnegative number, got {v}"
                )));
            }
        }
        if let Some(g) = self.adaptation_generalization {
            if !(0.0..=1.0).contains(&g) {
                return Err(CopingError::config(format!(
                    "adaptation_generalization must be in [0, 1], got {g}"
                )));
            }
        }
        if self.stimulus_max_occurrence == Some(0) {
            return Err(CopingError::config("stimulus_max_occurrence must be at least 1"));
        }
        if let StateRepresentation::IntensityLevel { levels: 0 } = self.variant.state_representation {
            return Err(CopingError::config("intensity_level needs at least one level"));
        }
        if self.variant.scalar_episode == ScalarEpisode::Steps(0) {
            return Err(CopingError::config("scalar_episode steps must be at least 1"));
        }
        Ok(())
    }

    pub fn engage_delay(&self) -> usize {
        self.engage_delay.unwrap_or(0)
    }
}

// ============================================================================
// Learning & policy
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub alpha: f32,
    pub gamma: f32,
    pub epsilon: f32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.001,
            gamma: 0.99,
            epsilon: 0.1,
        }
    }
}

/// Named selection policy plus its parameters, resolved into a concrete
/// policy by the agent crate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub name: String,
    /// UCB exploration constant.
    pub c: Option<f32>,
    /// Softmax temperature (1.0 when absent).
    pub temperature: Option<f32>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            name: "epsilon_greedy".to_string(),
            c: None,
            temperature: None,
        }
    }
}

/// Linear epsilon decay from `start` to `end` over `decay_steps` steps.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EpsilonSchedule {
    pub start: f32,
    pub end: f32,
    pub decay_steps: usize,
}

impl EpsilonSchedule {
    pub fn validate(&self) -> CopingResult<()> {
        for (name, v) in [("start", self.start), ("end", self.end)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(CopingError::config(format!(
                    "epsilon_schedule.{name} must be in [0, 1], got {v}"
                )));
            }
        }
        Ok(())
    }

    pub fn value_at(&self, step: usize) -> f32 {
        if self.decay_steps == 0 || step >= self.decay_steps {
            return self.end;
        }
        let t = step as f32 / self.decay_steps as f32;
        self.start + (self.end - self.start) * t
    }
}

// ============================================================================
// Stimulus population
// ============================================================================

/// Template for generated stimuli.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StimulusKind {
    pub intensity: Intensity,
    #[serde(default = "default_kind_probability")]
    pub occurrence_probability: f32,
    #[serde(default = "default_kind_resolvable")]
    pub resolvable: bool,
}

fn default_kind_probability() -> f32 {
    1.0
}

fn default_kind_resolvable() -> bool {
    true
}

/// Generates `count` stimuli with ids `0..count`, each drawn uniformly from `kinds`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub count: usize,
    pub kinds: Vec<StimulusKind>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            count: 5_000,
            kinds: vec![
                StimulusKind {
                    intensity: Intensity::Trajectory(vec![0.8, 0.8, 0.8]),
                    occurrence_probability: 1.0,
                    resolvable: true,
                },
                StimulusKind {
                    intensity: Intensity::Trajectory(vec![0.3, 0.3, 0.3]),
                    occurrence_probability: 1.0,
                    resolvable: true,
                },
            ],
        }
    }
}

impl PopulationConfig {
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> CopingResult<Vec<Stimulus>> {
        if self.count == 0 || self.kinds.is_empty() {
            return Err(CopingError::config(
                "population needs a positive count and at least one stimulus kind",
            ));
        }
        let stimuli = (0..self.count)
            .map(|i| {
                // kinds is non-empty, so choose always succeeds
                let kind = self.kinds.choose(rng).unwrap_or(&self.kinds[0]);
                Stimulus {
                    id: i as StimulusId,
                    intensity: kind.intensity.clone(),
                    occurrence_probability: kind.occurrence_probability,
                    resolvable: kind.resolvable,
                    encounter_count: 0,
                    reappraisal_count: 0,
                }
            })
            .collect();
        Ok(stimuli)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_config() {
        let cfg = ExperimentConfig::default();
        assert_eq!(cfg.run.steps, 10_000);
        assert_eq!(cfg.policy.name, "epsilon_greedy");
        assert_eq!(cfg.env.variant.intensity_model, IntensityModel::Trajectory);
        assert_eq!(cfg.env.variant.reset_mode, ResetMode::Auto);
        assert!(cfg.stimuli.is_empty());
        assert!(cfg.env.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[learning]
alpha = 0.1

[policy]
name = "ucb"
c = 2.0
"#;
        let cfg: ExperimentConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.learning.alpha, 0.1);
        assert_eq!(cfg.learning.gamma, 0.99);
        assert_eq!(cfg.policy.name, "ucb");
        assert_eq!(cfg.policy.c, Some(2.0));
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[run]
steps = 500
seed = 7

[env]
engage_benefit = 2.0
disengage_benefit = 1.0
engage_adaptation = 2.0
adaptation_generalization = 0.5
stimulus_max_occurrence = 3

[env.variant]
intensity_model = "scalar"
scalar_episode = "never"
reset_mode = "manual"
sampling = "weighted"
state_representation = { intensity_level = { levels = 3 } }

[epsilon_schedule]
start = 1.0
end = 0.05
decay_steps = 400

[[stimuli]]
id = 1
intensity = 9.0
resolvable = true
occurrence_probability = 0.7

[[stimuli]]
id = 2
intensity = 4.0
resolvable = false
occurrence_probability = 0.3
"#;
        let cfg: ExperimentConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.run.steps, 500);
        assert_eq!(cfg.run.seed, Some(7));
        assert_eq!(cfg.env.variant.intensity_model, IntensityModel::Scalar);
        assert_eq!(cfg.env.variant.scalar_episode, ScalarEpisode::Never);
        assert_eq!(cfg.env.variant.reset_mode, ResetMode::Manual);
        assert_eq!(cfg.env.variant.sampling, Sampling::Weighted);
        assert_eq!(
            cfg.env.variant.state_representation,
            StateRepresentation::IntensityLevel { levels: 3 }
        );
        assert_eq!(cfg.env.stimulus_max_occurrence, Some(3));
        assert_eq!(cfg.stimuli.len(), 2);
        assert!(!cfg.stimuli[1].resolvable);
        let sched = cfg.epsilon_schedule.unwrap();
        assert_eq!(sched.decay_steps, 400);
    }

    #[test]
    fn test_parse_scalar_episode_steps() {
        let cfg: EnvConfig = toml::from_str("[variant]\nscalar_episode = { steps = 4 }").unwrap();
        assert_eq!(cfg.variant.scalar_episode, ScalarEpisode::Steps(4));
    }

    #[test]
    fn test_env_validation() {
        let mut cfg = EnvConfig::default();
        cfg.engage_benefit = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = EnvConfig::default();
        cfg.stimulus_max_occurrence = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = EnvConfig::default();
        cfg.variant.state_representation = StateRepresentation::IntensityLevel { levels: 0 };
        assert!(cfg.validate().is_err());

        let mut cfg = EnvConfig::default();
        cfg.adaptation_generalization = Some(1.5);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_reward_formulas() {
        assert_eq!(IntensityModel::Scalar.reward(7.0), 3.0);
        assert_eq!(IntensityModel::Trajectory.reward(0.8), -0.8);
    }

    #[test]
    fn test_epsilon_schedule_is_linear_then_flat() {
        let s = EpsilonSchedule {
            start: 1.0,
            end: 0.0,
            decay_steps: 10,
        };
        assert_eq!(s.value_at(0), 1.0);
        assert!((s.value_at(5) - 0.5).abs() < 1e-6);
        assert_eq!(s.value_at(10), 0.0);
        assert_eq!(s.value_at(1_000), 0.0);
    }

    #[test]
    fn test_population_generation() {
        let mut rng = StdRng::seed_from_u64(3);
        let stimuli = PopulationConfig::default().generate(&mut rng).unwrap();
        assert_eq!(stimuli.len(), 5_000);
        assert!(stimuli.iter().enumerate().all(|(i, s)| s.id == i as u32));
        let high = stimuli.iter().filter(|s| s.intensity.at(0) > 0.5).count();
        assert!(high > 2_000 && high < 3_000, "kinds should be drawn evenly, got {high}");

        let empty = PopulationConfig {
            count: 0,
            ..Default::default()
        };
        assert!(empty.generate(&mut rng).is_err());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let cfg: ExperimentConfig = toml::from_str(include_str!("../../../coping.toml")).unwrap();
        let defaults = ExperimentConfig::default();
        assert_eq!(cfg.run.steps, defaults.run.steps);
        assert_eq!(cfg.env, defaults.env);
        assert_eq!(cfg.population.count, defaults.population.count);
        assert_eq!(cfg.population.kinds, defaults.population.kinds);
        assert_eq!(cfg.policy.name, "epsilon_greedy");
        assert!(cfg.epsilon_schedule.is_none());
    }

    // Everything that reads COPING_* lives in one test so no other test
    // observes the variables.
    #[test]
    fn test_load_and_env_overrides() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[run]\nsteps = 42\nseed = 1\n\n[policy]\nname = \"softmax\"").unwrap();

        // Part 0: plain load and fallback
        let cfg = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(cfg.run.steps, 42);
        let cfg = ExperimentConfig::load_or_default("/nonexistent/coping.toml");
        assert_eq!(cfg.learning.alpha, 0.001);
        assert_eq!(cfg.run.steps, 10_000);

        // Part 1: every override wins over the file
        std::env::set_var("COPING_SEED", "99");
        std::env::set_var("COPING_STEPS", "7");
        std::env::set_var("COPING_POLICY", "ucb");
        let cfg = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(cfg.run.seed, Some(99));
        assert_eq!(cfg.run.steps, 7);
        assert_eq!(cfg.policy.name, "ucb");

        // Part 2: unparsable numbers are ignored, the file value stays
        std::env::set_var("COPING_STEPS", "many");
        std::env::set_var("COPING_SEED", "-3");
        let cfg = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(cfg.run.steps, 42);
        assert_eq!(cfg.run.seed, Some(1));

        // Part 3: overrides also apply on the fallback path
        std::env::set_var("COPING_STEPS", "11");
        let cfg = ExperimentConfig::load_or_default("/nonexistent/coping.toml");
        assert_eq!(cfg.run.steps, 11);
        assert_eq!(cfg.policy.name, "ucb");

        std::env::remove_var("COPING_SEED");
        std::env::remove_var("COPING_STEPS");
        std::env::remove_var("COPING_POLICY");

        let cfg = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(cfg.run.steps, 42);
        assert_eq!(cfg.policy.name, "softmax");
    }

    #[test]
    fn test_epsilon_schedule_validation() {
        let ok = EpsilonSchedule {
            start: 1.0,
            end: 0.05,
            decay_steps: 10,
        };
        assert!(ok.validate().is_ok());
        let bad_start = EpsilonSchedule { start: 1.5, ..ok };
        assert!(matches!(bad_start.validate(), Err(CopingError::Config(_))));
        let bad_end = EpsilonSchedule { end: -0.1, ..ok };
        assert!(bad_end.validate().is_err());
    }

    #[test]
    fn test_run_episode_steps_parses() {
        let cfg: ExperimentConfig = toml::from_str("[run]\nepisode_steps = 8").unwrap();
        assert_eq!(cfg.run.episode_steps, Some(8));
        assert_eq!(ExperimentConfig::default().run.episode_steps, None);
    }
}
