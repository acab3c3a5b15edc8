//! coping_bench: training loop and long-run learning simulations.
//!
//! [`Trainer`] runs the select / step / update loop and collects
//! [`TrainingStats`]. The tests below check behavior that only emerges over
//! thousands of steps:
//! - engagement wins on resolvable, intense stimuli
//! - disengagement wins when engaging cannot resolve anything
//! - seeded runs are reproducible

mod observer;
mod stats;
mod trainer;

pub use observer::{NullObserver, StepLog, StepRecord, TrainingObserver};
pub use stats::TrainingStats;
pub use trainer::Trainer;
