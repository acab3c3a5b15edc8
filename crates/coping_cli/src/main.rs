use anyhow::Context;
use clap::Parser;
use coping_bench::{Trainer, TrainingStats};
use coping_core::{Action, ExperimentConfig};
use serde::Serialize;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the experiment config (TOML)
    #[arg(short, long, default_value = "coping.toml")]
    config: String,

    /// Number of agent-environment interactions
    #[arg(short, long)]
    steps: Option<usize>,

    /// Seed for every random number generator in the run
    #[arg(long)]
    seed: Option<u64>,

    /// Reset the environment after this many steps on one encounter
    #[arg(long)]
    episode_steps: Option<usize>,

    /// Selection policy: epsilon_greedy, softmax or ucb
    #[arg(short, long)]
    policy: Option<String>,

    /// UCB exploration constant
    #[arg(long)]
    ucb_c: Option<f32>,

    /// Softmax temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Emit logs as JSON lines
    #[arg(long, env = "COPING_JSON_LOGS")]
    json_logs: bool,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    policy: &'a str,
    seed: Option<u64>,
    steps: usize,
    episodes: u64,
    action_counts: &'a [u64],
    mean_rewards: Vec<Option<f64>>,
    total_reward: f64,
    epsilon: f32,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &Args) -> anyhow::Result<ExperimentConfig> {
    let mut config = if Path::new(&args.config).exists() {
        ExperimentConfig::load(&args.config)?
    } else {
        ExperimentConfig::load_or_default(&args.config)
    };

    if let Some(steps) = args.steps {
        config.run.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    if args.episode_steps.is_some() {
        config.run.episode_steps = args.episode_steps;
    }
    if let Some(policy) = &args.policy {
        config.policy.name = policy.clone();
    }
    if args.ucb_c.is_some() {
        config.policy.c = args.ucb_c;
    }
    if args.temperature.is_some() {
        config.policy.temperature = args.temperature;
    }
    Ok(config)
}

fn print_text(trainer: &Trainer, stats: &TrainingStats) {
    println!("policy: {}", trainer.policy().name());
    print!("{stats}");
    let engage = stats.share(Action::Engage) * 100.0;
    println!("engaged on {engage:.1}% of steps");
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = load_config(&args)?;
    info!(
        steps = config.run.steps,
        policy = %config.policy.name,
        "Starting training run"
    );

    let mut trainer =
        Trainer::from_config(&config).context("Failed to set up the experiment")?;
    let stats = trainer
        .run(config.run.steps)
        .context("Training run aborted")?;

    if args.json {
        let summary = Summary {
            policy: trainer.policy().name(),
            seed: config.run.seed,
            steps: stats.steps(),
            episodes: stats.episodes(),
            action_counts: stats.action_counts(),
            mean_rewards: stats.mean_rewards(),
            total_reward: stats.total_reward(),
            epsilon: trainer.agent().epsilon(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_text(&trainer, &stats);
    }
    Ok(())
}
