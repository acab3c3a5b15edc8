use crate::observer::{NullObserver, StepRecord, TrainingObserver};
use crate::stats::TrainingStats;
use coping_agent::{AgentConfig, Policy, QTableAgent};
use coping_core::{
    CopingError, EpsilonSchedule, ExperimentConfig, IntensityModel, ResetMode, Result,
    ScalarEpisode,
};
use coping_env::CopingEnv;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Drives an agent against an environment:
/// select, step, update, then advance the state.
pub struct Trainer {
    env: CopingEnv,
    agent: QTableAgent,
    policy: Policy,
    schedule: Option<EpsilonSchedule>,
    /// Encounter length the driver enforces, if any.
    episode_steps: Option<usize>,
    state: usize,
    /// Steps taken across every `run` call.
    step: usize,
    /// Steps taken on the current encounter.
    encounter_step: usize,
}

impl Trainer {
    /// Pair an agent with an environment.
    ///
    /// `episode_steps` makes the trainer reset the environment after that
    /// many steps on one encounter. The recurring scalar variant never ends
    /// an encounter on its own, so it requires one.
    pub fn new(
        env: CopingEnv,
        agent: QTableAgent,
        policy: Policy,
        schedule: Option<EpsilonSchedule>,
        episode_steps: Option<usize>,
    ) -> Result<Self> {
        if let Some(schedule) = &schedule {
            schedule.validate()?;
        }
        if episode_steps == Some(0) {
            return Err(CopingError::config("episode_steps must be at least 1"));
        }
        let variant = env.variant();
        if variant.intensity_model == IntensityModel::Scalar
            && variant.scalar_episode == ScalarEpisode::Never
            && episode_steps.is_none()
        {
            return Err(CopingError::config(
                "scalar_episode = never needs run.episode_steps so the trainer can reset",
            ));
        }
        let table = agent.table();
        if table.n_states() != env.n_states() || table.n_actions() != env.n_actions() {
            return Err(CopingError::config(format!(
                "agent table is {}x{} but the environment has {} states and {} actions",
                table.n_states(),
                table.n_actions(),
                env.n_states(),
                env.n_actions()
            )));
        }
        let state = env.state();
        Ok(Self {
            env,
            agent,
            policy,
            schedule,
            episode_steps,
            state,
            step: 0,
            encounter_step: 0,
        })
    }

    /// Build the stimulus set, environment, agent and policy an experiment
    /// describes. With a seed, the whole run is reproducible.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        let policy = Policy::from_config(&config.policy)?;
        let (env, agent) = match config.run.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                let stimuli = config.build_stimuli(&mut rng)?;
                let env = CopingEnv::with_seed(config.env.clone(), stimuli, seed)?;
                let agent_config = AgentConfig::new(env.n_states(), env.n_actions(), &config.learning);
                let agent = QTableAgent::with_seed(agent_config, seed.wrapping_add(1))?;
                (env, agent)
            }
            None => {
                let stimuli = config.build_stimuli(&mut rand::thread_rng())?;
                let env = CopingEnv::new(config.env.clone(), stimuli)?;
                let agent_config = AgentConfig::new(env.n_states(), env.n_actions(), &config.learning);
                let agent = QTableAgent::new(agent_config)?;
                (env, agent)
            }
        };
        tracing::info!(
            policy = policy.name(),
            stimuli = env.stimuli().len(),
            n_states = env.n_states(),
            seed = ?config.run.seed,
            "experiment ready"
        );
        Self::new(
            env,
            agent,
            policy,
            config.epsilon_schedule,
            config.run.episode_steps,
        )
    }

    pub fn run(&mut self, steps: usize) -> Result<TrainingStats> {
        self.run_with(steps, &mut NullObserver)
    }

    /// Run `steps` interactions, reporting each to `observer`.
    pub fn run_with(
        &mut self,
        steps: usize,
        observer: &mut dyn TrainingObserver,
    ) -> Result<TrainingStats> {
        let mut stats = TrainingStats::new(self.env.n_actions());
        let manual = self.env.variant().reset_mode == ResetMode::Manual;

        for _ in 0..steps {
            if let Some(schedule) = &self.schedule {
                self.agent.set_epsilon(schedule.value_at(self.step))?;
            }

            let state = self.state;
            let action = self.select(state)?;
            let transition = self.env.step(action)?;
            self.agent
                .update(state, transition.next_state, action, transition.reward)?;

            self.encounter_step += 1;
            let cut = !transition.done
                && self
                    .episode_steps
                    .is_some_and(|limit| self.encounter_step >= limit);
            let done = transition.done || cut;

            stats.record(action, transition.reward, done);
            observer.on_step(&StepRecord {
                step: self.step,
                state,
                action,
                reward: transition.reward,
                next_state: transition.next_state,
                done,
            });

            // Auto mode has already moved on to the next encounter.
            self.state = if cut || (transition.done && manual) {
                self.env.reset()?
            } else {
                transition.next_state
            };
            if done {
                self.encounter_step = 0;
            }
            self.step += 1;
        }

        tracing::info!(
            steps,
            episodes = stats.episodes(),
            total_reward = stats.total_reward(),
            "training run finished"
        );
        Ok(stats)
    }

    /// UCB may not select until every action has been tried, so untried
    /// actions are played first in index order.
    fn select(&mut self, state: usize) -> Result<usize> {
        if self.policy.needs_warm_up() {
            if let Some(&action) = self.agent.warm_up_actions().first() {
                self.agent.record_selection(action)?;
                tracing::debug!(action, "ucb warm-up");
                return Ok(action);
            }
        }
        self.agent.choose_action(state, &self.policy)
    }

    pub fn env(&self) -> &CopingEnv {
        &self.env
    }

    pub fn agent(&self) -> &QTableAgent {
        &self.agent
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// State the next step will act on.
    pub fn state(&self) -> usize {
        self.state
    }

    pub fn steps_taken(&self) -> usize {
        self.step
    }
}
