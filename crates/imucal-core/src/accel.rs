//! Accelerometer six-pose calibration.
//!
//! The device is held still in each of the six canonical orientations (each
//! principal axis pointing up, then down). A full window whose sigma beats the
//! best seen so far is treated as a stable pose; its mean is classified against
//! the six axis directions and the gravity magnitude is recorded in that slot.
//!
//! A sigma spike far above the current best (the device was moved or bumped)
//! resets the threshold so the next stable pose can be accepted even if it is
//! noisier than the previous one. Recorded slots survive a reset.

use crate::config::CalibrationConfig;
use crate::sample::{Axis, Polarity, Sample3, Slot};
use crate::window::SampleWindow;
use serde::Serialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Order in which the pose checks run. The first match wins, so a direction
/// that satisfies several predicates lands in the earliest one.
pub const CLASSIFICATION_ORDER: [Slot; 6] = [
    Slot::new(Axis::X, Polarity::Positive),
    Slot::new(Axis::Y, Polarity::Positive),
    Slot::new(Axis::Z, Polarity::Positive),
    Slot::new(Axis::X, Polarity::Negative),
    Slot::new(Axis::Y, Polarity::Negative),
    Slot::new(Axis::Z, Polarity::Negative),
];

/// First slot in [`CLASSIFICATION_ORDER`] whose cone contains `norm`.
pub fn classify(norm: &Sample3, cos_tol: f64) -> Option<Slot> {
    CLASSIFICATION_ORDER
        .iter()
        .copied()
        .find(|slot| slot.matches(norm, cos_tol))
}

// ---------------------------------------------------------------------------
// Axis range table
// ---------------------------------------------------------------------------

/// Offset and scale of one accelerometer axis, derived from the magnitudes
/// recorded with the axis pointing up and down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub offset: f64,
    pub scale: f64,
}

/// Recorded gravity magnitude per (axis, polarity). Zero means "not yet
/// observed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisRangeTable {
    /// Indexed `[axis][polarity]`.
    slots: [[f64; 2]; 3],
}

impl AxisRangeTable {
    pub fn get(&self, slot: Slot) -> f64 {
        self.slots[slot.axis.index()][slot.polarity.index()]
    }

    pub fn set(&mut self, slot: Slot, magnitude: f64) {
        self.slots[slot.axis.index()][slot.polarity.index()] = magnitude;
    }

    pub fn is_observed(&self, slot: Slot) -> bool {
        self.get(slot) != 0.0
    }

    /// Labels of slots never observed, in `+x, -x, +y, -y, +z, -z` order.
    pub fn still_needed(&self) -> Vec<&'static str> {
        Axis::ALL
            .into_iter()
            .flat_map(|axis| Polarity::ALL.into_iter().map(move |p| Slot::new(axis, p)))
            .filter(|&slot| !self.is_observed(slot))
            .map(Slot::label)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().flatten().all(|&v| v != 0.0)
    }

    /// Offset/scale for `axis` once both of its poses have been recorded.
    ///
    /// With the axis up the sensor reads `+pos`, with it down `-neg`; the
    /// midpoint is the offset and the half-span the per-g scale.
    pub fn axis_range(&self, axis: Axis) -> Option<AxisRange> {
        let pos = self.get(Slot::new(axis, Polarity::Positive));
        let neg = self.get(Slot::new(axis, Polarity::Negative));
        if pos == 0.0 || neg == 0.0 {
            return None;
        }
        Some(AxisRange {
            offset: (pos - neg) / 2.0,
            scale: (pos + neg) / 2.0,
        })
    }

    pub fn ranges(&self) -> [Option<AxisRange>; 3] {
        [
            self.axis_range(Axis::X),
            self.axis_range(Axis::Y),
            self.axis_range(Axis::Z),
        ]
    }
}

// ---------------------------------------------------------------------------
// Calibrator
// ---------------------------------------------------------------------------

/// Result of one full-window evaluation that changed calibrator state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccelOutcome {
    /// Sigma spiked above `threshold * reset_multiplier`; threshold restored.
    Reset { sigma: f64, previous_threshold: f64 },
    /// New best stillness. `slot` is `None` when the pose was not close enough
    /// to a principal axis or the magnitude was degenerate.
    StableAxis {
        slot: Option<Slot>,
        magnitude: f64,
        sigma: f64,
        still_needed: Vec<&'static str>,
    },
}

#[derive(Debug, Clone)]
pub struct AccelCalibrator {
    window: SampleWindow,
    threshold: f64,
    table: AxisRangeTable,
    initial_threshold: f64,
    reset_multiplier: f64,
    cos_tol: f64,
    min_magnitude: f64,
}

impl Default for AccelCalibrator {
    fn default() -> Self {
        Self::new(&CalibrationConfig::default())
    }
}

impl AccelCalibrator {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            window: SampleWindow::new(config.window_capacity),
            threshold: config.initial_threshold,
            table: AxisRangeTable::default(),
            initial_threshold: config.initial_threshold,
            reset_multiplier: config.reset_multiplier,
            cos_tol: config.axis_cos_tolerance(),
            min_magnitude: config.min_magnitude,
        }
    }

    pub fn update(&mut self, sample: Sample3) -> Option<AccelOutcome> {
        self.window.push(sample);
        if !self.window.is_full() {
            return None;
        }

        let d = self.window.dispersion()?;

        if d.sigma > self.threshold * self.reset_multiplier {
            let previous_threshold = self.threshold;
            self.threshold = self.initial_threshold;
            return Some(AccelOutcome::Reset {
                sigma: d.sigma,
                previous_threshold,
            });
        }

        // Positive test: a NaN sigma must never become the threshold.
        let improved = d.sigma < self.threshold;
        if !improved {
            return None;
        }

        self.threshold = d.sigma;

        let magnitude = d.mean.norm();
        let slot = if magnitude < self.min_magnitude {
            debug!(magnitude, "accel magnitude degenerate, skipping classification");
            None
        } else {
            classify(&(d.mean / magnitude), self.cos_tol)
        };

        if let Some(slot) = slot {
            self.table.set(slot, magnitude);
        }

        Some(AccelOutcome::StableAxis {
            slot,
            magnitude,
            sigma: d.sigma,
            still_needed: self.table.still_needed(),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn table(&self) -> &AxisRangeTable {
        &self.table
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn feed(accel: &mut AccelCalibrator, s: Sample3, n: usize) -> Vec<AccelOutcome> {
        (0..n).filter_map(|_| accel.update(s)).collect()
    }

    fn slot(axis: Axis, polarity: Polarity) -> Slot {
        Slot::new(axis, polarity)
    }

    #[test]
    fn test_plus_z_pose_sets_only_plus_z() {
        let mut accel = AccelCalibrator::default();
        let out = feed(&mut accel, Sample3::new(0.0, 0.0, 9.8), 32);
        assert_eq!(out.len(), 1);

        let table = accel.table();
        assert_relative_eq!(table.get(slot(Axis::Z, Polarity::Positive)), 9.8, epsilon = 1e-9);
        for s in CLASSIFICATION_ORDER.iter().filter(|s| s.label() != "+z") {
            assert_eq!(table.get(*s), 0.0, "slot {} should be unset", s);
        }
    }

    #[test]
    fn test_plus_x_progress_reports_remaining() {
        let mut accel = AccelCalibrator::default();
        let out = feed(&mut accel, Sample3::new(9.8, 0.0, 0.0), 32);
        match &out[..] {
            [AccelOutcome::StableAxis {
                slot: Some(s),
                magnitude,
                still_needed,
                ..
            }] => {
                assert_eq!(s.label(), "+x");
                assert_relative_eq!(*magnitude, 9.8, epsilon = 1e-9);
                assert_eq!(still_needed, &vec!["-x", "+y", "-y", "+z", "-z"]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_negative_pose() {
        let mut accel = AccelCalibrator::default();
        feed(&mut accel, Sample3::new(0.0, -9.7, 0.1), 32);
        assert!(accel.table().is_observed(slot(Axis::Y, Polarity::Negative)));
        assert!(!accel.table().is_observed(slot(Axis::Y, Polarity::Positive)));
    }

    #[test]
    fn test_off_axis_pose_improves_threshold_without_slot() {
        let mut accel = AccelCalibrator::default();
        // 45 degrees between x and z.
        let out = feed(&mut accel, Sample3::new(6.93, 0.0, 6.93), 32);
        assert!(matches!(
            out.as_slice(),
            [AccelOutcome::StableAxis { slot: None, .. }]
        ));
        assert!(accel.threshold() < 100.0);
        assert_eq!(accel.table().still_needed().len(), 6);
    }

    #[test]
    fn test_degenerate_magnitude_skips_classification() {
        let mut accel = AccelCalibrator::default();
        let out = feed(&mut accel, Sample3::zeros(), 32);
        assert!(matches!(
            out.as_slice(),
            [AccelOutcome::StableAxis { slot: None, .. }]
        ));
        assert_eq!(*accel.table(), AxisRangeTable::default());
    }

    #[test]
    fn test_spike_resets_threshold_only() {
        let mut accel = AccelCalibrator::default();
        feed(&mut accel, Sample3::new(0.0, 0.0, 9.8), 32);
        let table_before = *accel.table();
        let t = accel.threshold();
        assert!(t < 100.0 / 300.0);

        // A bump large enough to exceed 300x the current best.
        let out = accel.update(Sample3::new(40.0, -30.0, 9.8));
        match out {
            Some(AccelOutcome::Reset {
                sigma,
                previous_threshold,
            }) => {
                assert!(sigma > previous_threshold * 300.0);
                assert_eq!(previous_threshold, t);
            }
            other => panic!("expected reset, got {:?}", other),
        }
        assert_eq!(accel.threshold(), 100.0);
        assert_eq!(*accel.table(), table_before);
    }

    #[test]
    fn test_within_band_no_change() {
        let cfg = CalibrationConfig::default();
        let mut accel = AccelCalibrator::new(&cfg);
        // Alternating noise gives a stable, non-zero sigma.
        for i in 0..32 {
            let n = if i % 2 == 0 { 0.05 } else { -0.05 };
            accel.update(Sample3::new(n, 0.0, 9.8));
        }
        let t = accel.threshold();
        assert!(t > 0.0);

        // Slightly noisier window: above threshold, below the reset band.
        let mut outputs = Vec::new();
        for i in 0..32 {
            let n = if i % 2 == 0 { 0.08 } else { -0.08 };
            outputs.extend(accel.update(Sample3::new(n, 0.0, 9.8)));
        }
        assert!(outputs.is_empty());
        assert_eq!(accel.threshold(), t);
    }

    #[test]
    fn test_classification_priority_order() {
        let cos5 = 5.0_f64.to_radians().cos();
        // Not a unit vector: satisfies both +x and +y.
        let both = Sample3::new(1.0, 1.0, 0.0);
        assert_eq!(classify(&both, cos5), Some(slot(Axis::X, Polarity::Positive)));

        // +z beats -x.
        let zx = Sample3::new(-1.0, 0.0, 1.0);
        assert_eq!(classify(&zx, cos5), Some(slot(Axis::Z, Polarity::Positive)));

        assert_eq!(classify(&Sample3::new(0.5, 0.5, 0.5), cos5), None);
    }

    #[test]
    fn test_nan_window_leaves_threshold_alone() {
        let mut accel = AccelCalibrator::default();
        let mut out = feed(&mut accel, Sample3::new(0.0, 0.0, 9.8), 31);
        out.extend(accel.update(Sample3::new(f64::NAN, 0.0, 9.8)));
        assert!(out.is_empty());
        assert_eq!(accel.threshold(), 100.0);

        // Once the NaN has left the window, a clean pose is accepted as usual.
        let out = feed(&mut accel, Sample3::new(0.0, 0.0, 9.8), 32);
        assert_eq!(out.len(), 1);
        assert_eq!(accel.threshold(), 0.0);
        assert!(accel.table().is_observed(slot(Axis::Z, Polarity::Positive)));
    }

    #[test]
    fn test_axis_range_derivation() {
        let mut table = AxisRangeTable::default();
        assert!(table.axis_range(Axis::X).is_none());
        table.set(slot(Axis::X, Polarity::Positive), 10.0);
        assert!(table.axis_range(Axis::X).is_none());
        table.set(slot(Axis::X, Polarity::Negative), 9.6);

        let r = table.axis_range(Axis::X).unwrap();
        assert_relative_eq!(r.offset, 0.2, epsilon = 1e-12);
        assert_relative_eq!(r.scale, 9.8, epsilon = 1e-12);
        assert!(!table.is_complete());
    }
}
