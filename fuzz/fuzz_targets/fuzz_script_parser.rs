#![no_main]
use libfuzzer_sys::fuzz_target;
use stroker_core::{AxisId, parse_script};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must either parse into well-formed tracks or error.
    if let Ok(set) = parse_script(data, AxisId::Stroke) {
        for axis in set.axes() {
            let Some(track) = set.get(axis) else { continue };
            let frames = track.keyframes();
            assert!(!frames.is_empty());
            assert!(frames.windows(2).all(|w| w[0].at_ms < w[1].at_ms));
            assert!(frames.iter().all(|k| (0.0..=100.0).contains(&k.pos)));
            let _ = track.value_at(i64::MIN);
            let _ = track.value_at(i64::MAX);
        }
    }
});
