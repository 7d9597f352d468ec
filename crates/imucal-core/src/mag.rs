use crate::sample::Sample3;
use serde::Serialize;
use std::collections::VecDeque;

/// Most recent magnetometer samples, newest first, kept for
/// [`MagRangeTracker`] and for external hard/soft-iron fits. No statistics
/// are derived here.
#[derive(Debug, Clone)]
pub struct MagSampleLog {
    samples: VecDeque<Sample3>,
    capacity: usize,
}

impl MagSampleLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample3) {
        self.samples.push_front(sample);
        self.samples.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample3> {
        self.samples.iter()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> Vec<Sample3> {
        self.samples.iter().copied().collect()
    }
}

/// Hard-iron offset and per-axis half-span of the magnetometer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MagRange {
    pub offset: Sample3,
    pub scale: Sample3,
}

/// Per-axis extremes of the mag log mean, reported when either one moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagOutcome {
    pub min: Sample3,
    pub max: Sample3,
    pub range: Option<MagRange>,
}

/// Tracks the per-axis min/max of the mean of a full [`MagSampleLog`] while
/// the device is turned through every orientation.
///
/// The offset is the midpoint of the extremes and the scale is half their
/// span. A range is only reported once every axis spans at least `min_span`.
#[derive(Debug, Clone)]
pub struct MagRangeTracker {
    extremes: Option<(Sample3, Sample3)>,
    min_span: f64,
}

impl MagRangeTracker {
    pub fn new(min_span: f64) -> Self {
        Self {
            extremes: None,
            min_span,
        }
    }

    /// Folds the mean of `log` into the extremes. Returns an outcome when an
    /// extreme was extended; a log that is not yet full is ignored.
    pub fn update(&mut self, log: &MagSampleLog) -> Option<MagOutcome> {
        if log.len() < log.capacity() || log.is_empty() {
            return None;
        }
        let mean = log.iter().sum::<Sample3>() / log.len() as f64;

        let (min, max) = match self.extremes {
            None => (mean, mean),
            Some((min, max)) => {
                let (new_min, new_max) = (min.inf(&mean), max.sup(&mean));
                if new_min == min && new_max == max {
                    return None;
                }
                (new_min, new_max)
            }
        };
        self.extremes = Some((min, max));

        Some(MagOutcome {
            min,
            max,
            range: self.range(),
        })
    }

    pub fn extremes(&self) -> Option<(Sample3, Sample3)> {
        self.extremes
    }

    pub fn range(&self) -> Option<MagRange> {
        let (min, max) = self.extremes?;
        let span = max - min;
        let narrowest = span.min();
        if narrowest <= 0.0 || narrowest < self.min_span {
            return None;
        }
        Some(MagRange {
            offset: (max + min) / 2.0,
            scale: span / 2.0,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.range().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fill(log: &mut MagSampleLog, s: Sample3) {
        for _ in 0..log.capacity() {
            log.push(s);
        }
    }

    #[test]
    fn test_bounded_newest_first() {
        let mut log = MagSampleLog::new(32);
        for i in 0..40 {
            log.push(Sample3::new(i as f64, 0.0, 0.0));
        }
        assert_eq!(log.len(), 32);
        let snap = log.snapshot();
        assert_eq!(snap[0].x, 39.0);
        assert_eq!(snap[31].x, 8.0);
    }

    #[test]
    fn test_tracker_waits_for_full_log() {
        let mut log = MagSampleLog::new(4);
        let mut tracker = MagRangeTracker::new(0.1);
        log.push(Sample3::new(0.3, 0.0, 0.0));
        assert!(tracker.update(&log).is_none());
        assert!(tracker.extremes().is_none());
    }

    #[test]
    fn test_tracker_range_after_full_turn() {
        let mut log = MagSampleLog::new(4);
        let mut tracker = MagRangeTracker::new(0.1);
        let offset = Sample3::new(0.05, -0.02, 0.1);

        fill(&mut log, offset + Sample3::new(0.4, 0.0, 0.0));
        let first = tracker.update(&log).unwrap();
        assert!(first.range.is_none());

        // Same orientation again: nothing moved.
        assert!(tracker.update(&log).is_none());

        for up in [
            Sample3::new(-0.4, 0.0, 0.0),
            Sample3::new(0.0, 0.4, 0.0),
            Sample3::new(0.0, -0.4, 0.0),
            Sample3::new(0.0, 0.0, 0.4),
            Sample3::new(0.0, 0.0, -0.4),
        ] {
            fill(&mut log, offset + up);
            tracker.update(&log);
        }

        let range = tracker.range().unwrap();
        assert_relative_eq!(range.offset, offset, epsilon = 1e-12);
        assert_relative_eq!(range.scale, Sample3::new(0.4, 0.4, 0.4), epsilon = 1e-12);
    }

    #[test]
    fn test_narrow_span_is_not_a_range() {
        let mut log = MagSampleLog::new(2);
        let mut tracker = MagRangeTracker::new(0.5);
        fill(&mut log, Sample3::new(0.1, 0.1, 0.1));
        tracker.update(&log);
        fill(&mut log, Sample3::new(-0.1, -0.1, -0.1));
        tracker.update(&log);
        assert!(!tracker.is_valid());
    }
}
