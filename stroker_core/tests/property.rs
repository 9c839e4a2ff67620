use proptest::prelude::*;
use stroker_core::axis::{AxisConfigs, AxisId, RANGE_MAX_BOUNDS, RANGE_MIN_BOUNDS};
use stroker_core::keyframe::{Keyframe, KeyframeTrack};

prop_compose! {
    fn track_strategy()(
        points in prop::collection::vec((0i64..100_000, 0.0f64..=100.0), 1..64)
    ) -> KeyframeTrack {
        KeyframeTrack::from_keyframes(
            points.into_iter().map(|(t, p)| Keyframe::new(t, p)).collect(),
        )
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn value_at_keyframe_is_exact(track in track_strategy()) {
        for k in track.keyframes() {
            prop_assert!((track.value_at(k.at_ms) - k.pos).abs() < 1e-9);
        }
    }

    #[test]
    fn interpolation_never_overshoots_neighbours(track in track_strategy(), t in -1_000i64..101_000) {
        let v = track.value_at(t);
        let frames = track.keyframes();
        let idx = track.lower_bound(t);
        let (lo, hi) = match (idx.checked_sub(1).and_then(|i| frames.get(i)), frames.get(idx)) {
            (Some(a), Some(b)) => (a.pos.min(b.pos), a.pos.max(b.pos)),
            (Some(a), None) => (a.pos, a.pos),
            (None, Some(b)) => (b.pos, b.pos),
            (None, None) => unreachable!("track is never empty here"),
        };
        prop_assert!(v >= lo - 1e-9 && v <= hi + 1e-9, "{v} outside [{lo}, {hi}]");
    }

    #[test]
    fn keyframes_are_strictly_ascending(track in track_strategy()) {
        prop_assert!(track.keyframes().windows(2).all(|w| w[0].at_ms < w[1].at_ms));
    }

    #[test]
    fn lower_bound_partitions(track in track_strategy(), t in -1_000i64..101_000) {
        let idx = track.lower_bound(t);
        let frames = track.keyframes();
        prop_assert!(frames[..idx].iter().all(|k| k.at_ms < t));
        prop_assert!(frames[idx..].iter().all(|k| k.at_ms >= t));
    }

    #[test]
    fn range_invariant_survives_any_mutation(
        ops in prop::collection::vec((any::<i16>(), any::<i16>()), 1..32)
    ) {
        let mut axes = AxisConfigs::default();
        for (min, max) in ops {
            let _ = axes.set_range(AxisId::Twist, min, max);
            let _ = axes.set_min(AxisId::Twist, min);
            let _ = axes.set_max(AxisId::Twist, max);
            let cfg = axes[AxisId::Twist];
            prop_assert!(cfg.min() < cfg.max());
            prop_assert!((RANGE_MIN_BOUNDS.0..=RANGE_MIN_BOUNDS.1).contains(&cfg.min()));
            prop_assert!((RANGE_MAX_BOUNDS.0..=RANGE_MAX_BOUNDS.1).contains(&cfg.max()));
        }
    }
}
