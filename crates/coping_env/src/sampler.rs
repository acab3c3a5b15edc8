//! Chooses which stimulus the agent meets next.

use coping_core::{CopingError, Result, Sampling, Stimulus};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Draws stimulus slots either uniformly or by occurrence probability.
///
/// Weights are normalized once here; refreshed stimuli keep their
/// predecessor's weight, so the distribution never has to be rebuilt.
#[derive(Debug, Clone)]
pub struct StimulusSampler {
    weighted: Option<WeightedIndex<f32>>,
    probabilities: Vec<f32>,
}

impl StimulusSampler {
    pub fn new(mode: Sampling, stimuli: &[Stimulus]) -> Result<Self> {
        if stimuli.is_empty() {
            return Err(CopingError::config("stimulus set is empty"));
        }
        let total: f32 = stimuli.iter().map(|s| s.occurrence_probability).sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(CopingError::config(format!(
                "occurrence probabilities must sum to a positive number, got {total}"
            )));
        }

        match mode {
            Sampling::Uniform => {
                let p = 1.0 / stimuli.len() as f32;
                Ok(Self {
                    weighted: None,
                    probabilities: vec![p; stimuli.len()],
                })
            }
            Sampling::Weighted => {
                let weights: Vec<f32> = stimuli.iter().map(|s| s.occurrence_probability).collect();
                let index = WeightedIndex::new(&weights)
                    .map_err(|e| CopingError::config(format!("invalid occurrence weights: {e}")))?;
                Ok(Self {
                    weighted: Some(index),
                    probabilities: weights.iter().map(|w| w / total).collect(),
                })
            }
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match &self.weighted {
            Some(index) => index.sample(rng),
            None => rng.gen_range(0..self.probabilities.len()),
        }
    }

    /// Normalized probability of drawing `slot`.
    pub fn probability(&self, slot: usize) -> f32 {
        self.probabilities.get(slot).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn set(weights: &[f32]) -> Vec<Stimulus> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| Stimulus::scalar(i as u32, 5.0).with_probability(*w))
            .collect()
    }

    #[test]
    fn test_empty_set_rejected() {
        assert!(StimulusSampler::new(Sampling::Uniform, &[]).is_err());
    }

    #[test]
    fn test_zero_mass_rejected() {
        assert!(StimulusSampler::new(Sampling::Weighted, &set(&[0.0, 0.0])).is_err());
        assert!(StimulusSampler::new(Sampling::Uniform, &set(&[0.0])).is_err());
    }

    #[test]
    fn test_weights_normalized_once() {
        let sampler = StimulusSampler::new(Sampling::Weighted, &set(&[2.0, 6.0])).unwrap();
        assert!((sampler.probability(0) - 0.25).abs() < 1e-6);
        assert!((sampler.probability(1) - 0.75).abs() < 1e-6);
        assert_eq!(sampler.probability(5), 0.0);
    }

    #[test]
    fn test_weighted_draws_follow_weights() {
        let sampler = StimulusSampler::new(Sampling::Weighted, &set(&[1.0, 3.0])).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let ones = (0..n).filter(|_| sampler.sample(&mut rng) == 1).count();
        let share = ones as f32 / n as f32;
        assert!((share - 0.75).abs() < 0.02, "expected ~0.75, got {share}");
    }

    #[test]
    fn test_uniform_ignores_weights() {
        let sampler = StimulusSampler::new(Sampling::Uniform, &set(&[0.1, 9.0])).unwrap();
        assert_eq!(sampler.probability(0), 0.5);
        let mut rng = StdRng::seed_from_u64(5);
        let n = 20_000;
        let zeros = (0..n).filter(|_| sampler.sample(&mut rng) == 0).count();
        let share = zeros as f32 / n as f32;
        assert!((share - 0.5).abs() < 0.02, "expected ~0.5, got {share}");
    }
}
