//! Property-based tests for core value types.

use coping_core::{AgentStatus, Bounds, EpsilonSchedule, Intensity, IntensityModel, Stimulus};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_model() -> impl Strategy<Value = IntensityModel> {
    prop_oneof![Just(IntensityModel::Scalar), Just(IntensityModel::Trajectory)]
}

fn arb_intensity() -> impl Strategy<Value = Intensity> {
    prop_oneof![
        (-20.0f32..20.0).prop_map(Intensity::Scalar),
        prop::collection::vec(-2.0f32..2.0, 1..8).prop_map(Intensity::Trajectory),
    ]
}

fn within(bounds: Bounds, intensity: &Intensity) -> bool {
    intensity.values().iter().all(|v| bounds.contains(*v))
}

// ============================================================================
// Intensity
// ============================================================================

proptest! {
    /// Any sequence of reductions keeps every entry inside the bounds.
    #[test]
    fn lowering_stays_in_bounds(
        model in arb_model(),
        mut intensity in arb_intensity(),
        cuts in prop::collection::vec((0usize..10, 0.0f32..5.0), 0..20),
    ) {
        let bounds = model.bounds();
        intensity.clamp_to(bounds);
        prop_assert!(within(bounds, &intensity));
        for (from, amount) in cuts {
            intensity.lower_from(from, amount, bounds);
            prop_assert!(within(bounds, &intensity));
        }
    }

    /// Entries before `from` are untouched; the rest never rise.
    #[test]
    fn lower_from_only_touches_the_tail(
        values in prop::collection::vec(0.0f32..=1.0, 1..8),
        from in 0usize..10,
        amount in 0.0f32..1.0,
    ) {
        let bounds = IntensityModel::Trajectory.bounds();
        let mut intensity = Intensity::Trajectory(values.clone());
        intensity.lower_from(from, amount, bounds);
        for (i, (before, after)) in values.iter().zip(intensity.values()).enumerate() {
            if i < from {
                prop_assert_eq!(*before, after);
            } else {
                prop_assert!(after <= *before);
            }
        }
    }

    /// Trajectories saturate at their last entry.
    #[test]
    fn trajectory_reads_saturate(values in prop::collection::vec(0.0f32..=1.0, 1..8), step in 0usize..20) {
        let intensity = Intensity::Trajectory(values.clone());
        let expected = values.get(step).copied().unwrap_or(values[values.len() - 1]);
        prop_assert_eq!(intensity.at(step), expected);
    }

    #[test]
    fn reward_is_monotone_decreasing(model in arb_model(), a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
        let bounds = model.bounds();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (lo, hi) = (bounds.min + lo * bounds.width(), bounds.min + hi * bounds.width());
        prop_assert!(model.reward(lo) >= model.reward(hi));
    }
}

// ============================================================================
// Schedules & appraisal memory
// ============================================================================

proptest! {
    #[test]
    fn epsilon_schedule_stays_between_endpoints(
        start in 0.0f32..=1.0,
        end in 0.0f32..=1.0,
        decay_steps in 0usize..1_000,
        step in 0usize..2_000,
    ) {
        let schedule = EpsilonSchedule { start, end, decay_steps };
        let v = schedule.value_at(step);
        prop_assert!(v >= start.min(end) - 1e-6 && v <= start.max(end) + 1e-6);
        if step >= decay_steps {
            prop_assert_eq!(v, end);
        }
    }

    /// Appraising the same ids repeatedly never duplicates an entry.
    #[test]
    fn appraisals_unique_per_id(ids in prop::collection::vec(0u32..10, 1..100)) {
        let mut status = AgentStatus::default();
        for id in &ids {
            let stimulus = Stimulus::scalar(*id, 5.0);
            status.appraise(&stimulus, 0.5, 5.0);
        }
        let mut distinct = ids.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(status.len(), distinct.len());
        prop_assert_eq!(status.current_id, ids.last().copied());
    }
}
