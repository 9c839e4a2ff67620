//! Keyframe tracks and their interpolation.
//!
//! A track is immutable once built. Lookup is a binary search for the first
//! keyframe at or after the query time; the same `lower_bound` is used by the
//! engine and by anything drawing the script, so both agree on tie-breaks.

/// Lowest and highest script position.
pub const POS_MIN: f64 = 0.0;
pub const POS_MAX: f64 = 100.0;
/// Value reported for an axis with nothing to say.
pub const MIDPOINT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub at_ms: i64,
    pub pos: f64,
}

impl Keyframe {
    pub fn new(at_ms: i64, pos: f64) -> Self {
        Self { at_ms, pos }
    }
}

/// Index of the first keyframe with `at_ms >= t`, or `frames.len()` when every
/// keyframe is earlier. An exact match returns that keyframe's index.
///
/// `frames` must be sorted by `at_ms`.
#[inline]
pub fn lower_bound(frames: &[Keyframe], t: i64) -> usize {
    frames.partition_point(|k| k.at_ms < t)
}

/// Time-ordered positions for one axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyframeTrack {
    frames: Vec<Keyframe>,
}

impl KeyframeTrack {
    /// Build a track, establishing its invariants in place:
    /// positions clamped to 0..100, stable sort by time, and for repeated
    /// timestamps only the last-seen position survives.
    ///
    /// Never grows `frames`; a vector allocated at exact capacity stays so.
    pub fn from_keyframes(mut frames: Vec<Keyframe>) -> Self {
        for k in &mut frames {
            k.pos = if k.pos.is_finite() {
                k.pos.clamp(POS_MIN, POS_MAX)
            } else {
                MIDPOINT
            };
        }
        if !frames.is_sorted_by_key(|k| k.at_ms) {
            frames.sort_by_key(|k| k.at_ms);
        }
        // `later` is removed, so fold its position into the retained one.
        frames.dedup_by(|later, kept| {
            if later.at_ms == kept.at_ms {
                kept.pos = later.pos;
                true
            } else {
                false
            }
        });
        Self { frames }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.frames.capacity()
    }

    pub fn first(&self) -> Option<&Keyframe> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&Keyframe> {
        self.frames.last()
    }

    /// Time span from the first to the last keyframe.
    pub fn duration_ms(&self) -> i64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(a), Some(b)) => b.at_ms.saturating_sub(a.at_ms),
            _ => 0,
        }
    }

    #[inline]
    pub fn lower_bound(&self, t: i64) -> usize {
        lower_bound(&self.frames, t)
    }

    /// Keyframes inside `[start_ms, end_ms]` plus one neighbour on each side,
    /// enough to draw the segments crossing the window edges.
    pub fn window(&self, start_ms: i64, end_ms: i64) -> &[Keyframe] {
        if self.frames.is_empty() || end_ms < start_ms {
            return &[];
        }
        let lo = self.lower_bound(start_ms).saturating_sub(1);
        let hi = (lower_bound(&self.frames, end_ms.saturating_add(1)) + 1).min(self.frames.len());
        &self.frames[lo..hi]
    }

    /// Position at time `t`.
    ///
    /// Before the first keyframe the first position holds, after the last the
    /// last position holds, in between positions are linearly interpolated.
    /// An empty track reports the midpoint.
    pub fn value_at(&self, t: i64) -> f64 {
        let idx = self.lower_bound(t);
        let Some(next) = self.frames.get(idx) else {
            return self.frames.last().map_or(MIDPOINT, |k| k.pos);
        };
        if idx == 0 || next.at_ms == t {
            return next.pos;
        }
        let prev = &self.frames[idx - 1];
        // prev.at_ms < t < next.at_ms; abs_diff keeps extreme timestamps from overflowing.
        let span = next.at_ms.abs_diff(prev.at_ms);
        if span == 0 {
            return prev.pos;
        }
        let frac = t.abs_diff(prev.at_ms) as f64 / span as f64;
        prev.pos + (next.pos - prev.pos) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(points: &[(i64, f64)]) -> KeyframeTrack {
        KeyframeTrack::from_keyframes(points.iter().map(|&(t, p)| Keyframe::new(t, p)).collect())
    }

    #[test]
    fn lower_bound_tie_break() {
        let t = track(&[(1000, 50.0), (2000, 100.0), (3000, 0.0)]);
        assert_eq!(t.lower_bound(2000), 1);
        assert_eq!(t.lower_bound(500), 0);
        assert_eq!(t.lower_bound(5000), 3);
        assert_eq!(t.lower_bound(2500), 2);
    }

    #[test]
    fn clamps_outside_the_track() {
        let t = track(&[(1000, 20.0), (2000, 80.0)]);
        assert!((t.value_at(-5) - 20.0).abs() < 1e-12);
        assert!((t.value_at(9_999) - 80.0).abs() < 1e-12);
    }

    #[test]
    fn interpolates_linearly() {
        let t = track(&[(0, 0.0), (500, 100.0), (1000, 0.0)]);
        assert!((t.value_at(250) - 50.0).abs() < 1e-12);
        assert!((t.value_at(750) - 50.0).abs() < 1e-12);
        assert!((t.value_at(500) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn duplicate_timestamps_keep_last_value() {
        let t = track(&[(0, 10.0), (100, 20.0), (100, 70.0), (200, 0.0)]);
        assert_eq!(t.len(), 3);
        assert!((t.value_at(100) - 70.0).abs() < 1e-12);
    }

    #[test]
    fn unsorted_input_is_ordered_and_positions_clamped() {
        let t = track(&[(300, 150.0), (100, -20.0), (200, 50.0)]);
        let times: Vec<i64> = t.keyframes().iter().map(|k| k.at_ms).collect();
        assert_eq!(times, [100, 200, 300]);
        assert!((t.keyframes()[0].pos - 0.0).abs() < 1e-12);
        assert!((t.keyframes()[2].pos - 100.0).abs() < 1e-12);
    }

    #[test]
    fn empty_track_reports_midpoint() {
        let t = KeyframeTrack::default();
        assert!((t.value_at(0) - MIDPOINT).abs() < 1e-12);
        assert_eq!(t.duration_ms(), 0);
        assert!(t.window(0, 100).is_empty());
    }

    #[test]
    fn dedup_keeps_capacity() {
        let mut v = Vec::with_capacity(4);
        v.extend([(0, 1.0), (0, 2.0), (5, 3.0), (9, 4.0)].map(|(t, p)| Keyframe::new(t, p)));
        let t = KeyframeTrack::from_keyframes(v);
        assert_eq!(t.len(), 3);
        assert_eq!(t.frames.capacity(), 4);
    }

    #[test]
    fn window_includes_edge_neighbours() {
        let t = track(&[(0, 0.0), (100, 1.0), (200, 2.0), (300, 3.0), (400, 4.0)]);
        let w: Vec<i64> = t.window(150, 250).iter().map(|k| k.at_ms).collect();
        assert_eq!(w, [100, 200, 300]);
        let w: Vec<i64> = t.window(-50, 0).iter().map(|k| k.at_ms).collect();
        assert_eq!(w, [0, 100]);
    }
}
