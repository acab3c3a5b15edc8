use serde::Serialize;

/// One agent-environment interaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepRecord {
    /// Zero-based index of the step within the run.
    pub step: usize,
    pub state: usize,
    pub action: usize,
    pub reward: f32,
    /// State the update bootstrapped from.
    pub next_state: usize,
    /// The encounter ended here, reported by the environment or cut short
    /// by the trainer's episode length.
    pub done: bool,
}

/// Receives every step of a training run.
pub trait TrainingObserver {
    fn on_step(&mut self, record: &StepRecord);
}

impl<F: FnMut(&StepRecord)> TrainingObserver for F {
    fn on_step(&mut self, record: &StepRecord) {
        self(record)
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl TrainingObserver for NullObserver {
    fn on_step(&mut self, _record: &StepRecord) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct StepLog {
    pub records: Vec<StepRecord>,
}

impl TrainingObserver for StepLog {
    fn on_step(&mut self, record: &StepRecord) {
        self.records.push(*record);
    }
}
