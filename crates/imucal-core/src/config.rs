use serde::{Deserialize, Serialize};

/// Tuning for a calibration session.
///
/// The defaults are the empirically chosen constants; changing the reset
/// multiplier or axis tolerance changes which poses are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Samples per accel/gyro statistics window.
    pub window_capacity: usize,
    /// Magnetometer samples kept for external fitting.
    pub mag_capacity: usize,
    /// Starting (and accel reset) value of the best-sigma threshold.
    pub initial_threshold: f64,
    /// Accel sigma above `threshold * reset_multiplier` resets the threshold.
    pub reset_multiplier: f64,
    /// Half-angle (degrees) of the cone around each principal axis.
    pub axis_tolerance_deg: f64,
    /// Mean accel magnitude below this skips orientation classification.
    pub min_magnitude: f64,
    /// Rate requested from upstream when the session starts.
    pub sample_rate_hz: u32,
    /// Smallest per-axis span of the mag mean extremes that counts as a
    /// full turn, in magnetometer units (the default suits Gauss).
    pub mag_min_span: f64,
    /// Also require a magnetometer range before reporting calibrated.
    pub require_mag: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window_capacity: 32,
            mag_capacity: 32,
            initial_threshold: 100.0,
            reset_multiplier: 300.0,
            axis_tolerance_deg: 5.0,
            min_magnitude: 1e-9,
            sample_rate_hz: 100,
            mag_min_span: 0.3,
            require_mag: false,
        }
    }
}

impl CalibrationConfig {
    /// Cosine of the axis tolerance, the per-component bound for a match.
    pub fn axis_cos_tolerance(&self) -> f64 {
        self.axis_tolerance_deg.to_radians().cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CalibrationConfig::default();
        assert_eq!(cfg.window_capacity, 32);
        assert_eq!(cfg.initial_threshold, 100.0);
        assert_eq!(cfg.reset_multiplier, 300.0);
        assert!((cfg.axis_cos_tolerance() - 0.996_194_698).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let cfg: CalibrationConfig = serde_json::from_str(r#"{"sample_rate_hz": 10}"#).unwrap();
        assert_eq!(cfg.sample_rate_hz, 10);
        assert_eq!(cfg.window_capacity, 32);
        assert_eq!(cfg.mag_capacity, 32);
        assert!(!cfg.require_mag);
    }
}
