mod support;

use clipreel_assembly_engine::{compose, CompositionPlan};
use clipreel_common::error::ClipreelError;
use clipreel_compilation_model::{FrameSize, TransitionPolicy};
use proptest::prelude::*;
use support::FakeBackend;

fn plan_of(
    backend: &mut FakeBackend,
    durations: &[f64],
    transition: TransitionPolicy,
) -> CompositionPlan<support::FakeMedia> {
    let mut plan = CompositionPlan::new(FrameSize::HD, transition);
    for (index, secs) in durations.iter().enumerate() {
        let segment = backend.segment(&format!("s{index}"), *secs);
        plan.push(segment).unwrap();
    }
    plan
}

#[test]
fn two_ten_second_segments_crossfade_to_nineteen_seconds() {
    let mut backend = FakeBackend::new();
    let plan = plan_of(&mut backend, &[10.0, 10.0], TransitionPolicy::crossfade(1.0));

    let timeline = compose(&mut backend, plan).unwrap();

    assert_eq!(timeline.duration_secs, 19.0);
    assert_eq!(backend.crossfade_calls, vec![(9.0, 1.0)]);
}

#[test]
fn crossfades_chain_pairwise_from_running_duration() {
    let mut backend = FakeBackend::new();
    let plan = plan_of(&mut backend, &[5.0, 10.0, 8.0], TransitionPolicy::crossfade(1.0));

    let timeline = compose(&mut backend, plan).unwrap();

    // 5 -> 4 + 10 = 14 -> 13 + 8 = 21
    assert_eq!(backend.crossfade_calls, vec![(4.0, 1.0), (13.0, 1.0)]);
    assert_eq!(timeline.duration_secs, 21.0);
    assert_eq!(timeline.media.labels, vec!["s0", "s1", "s2"]);
}

#[test]
fn hard_cuts_concatenate_to_exact_sum() {
    let mut backend = FakeBackend::new();
    let plan = plan_of(&mut backend, &[300.0, 300.0], TransitionPolicy::None);

    let timeline = compose(&mut backend, plan).unwrap();

    assert_eq!(timeline.duration_secs, 600.0);
    assert_eq!(backend.concat_calls, 1);
    assert!(backend.crossfade_calls.is_empty());
}

#[test]
fn single_segment_passes_through_without_blending() {
    let mut backend = FakeBackend::new();
    let plan = plan_of(&mut backend, &[7.0], TransitionPolicy::crossfade(1.0));

    let timeline = compose(&mut backend, plan).unwrap();

    assert_eq!(timeline.duration_secs, 7.0);
    assert!(backend.crossfade_calls.is_empty());
    assert_eq!(backend.concat_calls, 0);
}

#[test]
fn empty_plan_is_a_compose_error() {
    let mut backend = FakeBackend::new();
    let plan = plan_of(&mut backend, &[], TransitionPolicy::None);

    let err = compose(&mut backend, plan).unwrap_err();
    assert!(matches!(err, ClipreelError::Compose { .. }));
}

#[test]
fn failed_overlay_aborts_and_releases_everything() {
    let mut backend = FakeBackend::new();
    backend.fail_crossfade_at = Some(2);
    let counters = backend.counters();
    let plan = plan_of(&mut backend, &[10.0, 10.0, 10.0, 10.0], TransitionPolicy::crossfade(1.0));

    let err = compose(&mut backend, plan).unwrap_err();

    assert!(matches!(err, ClipreelError::Compose { .. }));
    assert!(err.is_run_fatal());
    assert_eq!(backend.crossfade_calls.len(), 2);
    assert_eq!(counters.opened(), 4);
    assert_eq!(counters.outstanding(), 0);
}

#[test]
fn segment_shorter_than_crossfade_is_rejected() {
    let mut backend = FakeBackend::new();
    let plan = plan_of(&mut backend, &[10.0, 0.5], TransitionPolicy::crossfade(1.0));

    let err = compose(&mut backend, plan).unwrap_err();

    assert!(matches!(err, ClipreelError::Compose { .. }));
    assert!(backend.crossfade_calls.is_empty());
}

proptest! {
    #[test]
    fn crossfaded_duration_matches_sum_minus_overlaps(
        durations in proptest::collection::vec(1.0f64..120.0, 1..12),
        fade in 0.1f64..1.0,
    ) {
        let mut backend = FakeBackend::new();
        let counters = backend.counters();
        let plan = plan_of(&mut backend, &durations, TransitionPolicy::crossfade(fade));

        let timeline = compose(&mut backend, plan).unwrap();

        let expected = durations.iter().sum::<f64>() - (durations.len() - 1) as f64 * fade;
        prop_assert!((timeline.duration_secs - expected).abs() < 1e-6);
        prop_assert_eq!(backend.crossfade_calls.len(), durations.len() - 1);
        drop(timeline);
        prop_assert_eq!(counters.outstanding(), 0);
    }
}
