//! Per-frame routing between exposure correction and saving.
//!
//! Correction always preempts saving, so a badly exposed frame is never
//! stored. The settle delay of a correction lets the save interval run long.

use std::time::{Duration, Instant};

/// What to do with the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Brightness is out of tolerance; correct exposure, do not save.
    Adjust,
    /// Save the frame under this sequence number.
    Save {
        /// Sequence number for the file name.
        sequence: u32,
    },
    /// Nothing to do.
    Idle,
}

/// Tolerance gate plus save-interval timer.
#[derive(Debug, Clone)]
pub struct Cadence {
    tolerance: f64,
    interval: Duration,
    last_saved_at: Option<Instant>,
    sequence: u32,
}

impl Cadence {
    /// `tolerance` is the absolute error threshold; `interval` the minimum
    /// spacing between saves. The first in-tolerance frame saves immediately.
    #[must_use]
    pub const fn new(tolerance: f64, interval: Duration) -> Self {
        Self {
            tolerance,
            interval,
            last_saved_at: None,
            sequence: 0,
        }
    }

    /// Route a frame with brightness `error` observed at `now`.
    #[must_use]
    pub fn decide(&self, error: f64, now: Instant) -> Decision {
        if error.abs() > self.tolerance {
            return Decision::Adjust;
        }

        let due = self
            .last_saved_at
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if due {
            Decision::Save {
                sequence: self.sequence,
            }
        } else {
            Decision::Idle
        }
    }

    /// Record a completed save at `now`.
    pub fn mark_saved(&mut self, now: Instant) {
        self.last_saved_at = Some(now);
        self.sequence += 1;
    }

    /// Sequence number the next save will use.
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TOLERANCE: f64 = 0.035 * 150.0;
    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_first_in_tolerance_frame_saves() {
        let cadence = Cadence::new(TOLERANCE, MINUTE);
        assert_eq!(
            cadence.decide(0.0, Instant::now()),
            Decision::Save { sequence: 0 }
        );
    }

    #[test]
    fn test_tolerance_boundary() {
        let cadence = Cadence::new(TOLERANCE, MINUTE);
        let now = Instant::now();
        assert_eq!(cadence.decide(5.25, now), Decision::Save { sequence: 0 });
        assert_eq!(cadence.decide(-5.25, now), Decision::Save { sequence: 0 });
        assert_eq!(cadence.decide(5.26, now), Decision::Adjust);
        assert_eq!(cadence.decide(-5.26, now), Decision::Adjust);
    }

    #[test]
    fn test_adjust_preempts_due_save() {
        let mut cadence = Cadence::new(TOLERANCE, MINUTE);
        let start = Instant::now();
        cadence.mark_saved(start);
        assert_eq!(cadence.decide(40.0, start + MINUTE * 10), Decision::Adjust);
        assert_eq!(cadence.sequence(), 1);
    }

    #[test]
    fn test_interval_gating() {
        let mut cadence = Cadence::new(TOLERANCE, MINUTE);
        let start = Instant::now();
        cadence.mark_saved(start);

        assert_eq!(cadence.decide(0.0, start + Duration::from_secs(59)), Decision::Idle);
        assert_eq!(
            cadence.decide(0.0, start + MINUTE),
            Decision::Save { sequence: 1 }
        );
    }

    #[test]
    fn test_sequence_only_advances_on_save() {
        let mut cadence = Cadence::new(TOLERANCE, MINUTE);
        let start = Instant::now();
        let _ = cadence.decide(100.0, start);
        let _ = cadence.decide(0.0, start);
        assert_eq!(cadence.sequence(), 0);

        cadence.mark_saved(start);
        cadence.mark_saved(start + MINUTE);
        assert_eq!(cadence.sequence(), 2);
    }

    proptest! {
        #[test]
        fn in_tolerance_never_adjusts(error in -5.25f64..=5.25, secs in 0u64..600) {
            let mut cadence = Cadence::new(TOLERANCE, MINUTE);
            let start = Instant::now();
            cadence.mark_saved(start);
            let decision = cadence.decide(error, start + Duration::from_secs(secs));
            prop_assert_ne!(decision, Decision::Adjust);
            prop_assert_eq!(decision == Decision::Idle, secs < 60);
        }

        #[test]
        fn at_most_one_save_per_interval(offsets in proptest::collection::vec(0u64..59_999, 1..20)) {
            let mut cadence = Cadence::new(TOLERANCE, MINUTE);
            let start = Instant::now();

            let mut sorted = offsets;
            sorted.sort_unstable();
            let mut saves = 0;
            for ms in sorted {
                let now = start + Duration::from_millis(ms);
                if let Decision::Save { .. } = cadence.decide(0.0, now) {
                    cadence.mark_saved(now);
                    saves += 1;
                }
            }
            prop_assert_eq!(saves, 1);
        }
    }
}
