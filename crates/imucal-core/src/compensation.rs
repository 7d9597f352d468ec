use crate::accel::{AxisRange, AxisRangeTable};
use crate::mag::MagRange;
use crate::sample::{Axis, Sample3, Stream};
use serde::Serialize;

/// Applies the current gyro bias and per-axis accel ranges to raw readings.
///
/// Axes without a known range pass through unchanged, as does the gyro until
/// a bias has been found and the magnetometer until it has been turned
/// through every orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Compensation {
    pub gyro_bias: Option<Sample3>,
    pub accel_ranges: [Option<AxisRange>; 3],
    pub mag_range: Option<MagRange>,
}

impl Compensation {
    pub fn new(
        gyro_bias: Option<Sample3>,
        table: &AxisRangeTable,
        mag_range: Option<MagRange>,
    ) -> Self {
        Self {
            gyro_bias,
            accel_ranges: table.ranges(),
            mag_range,
        }
    }

    pub fn apply_gyro(&self, raw: Sample3) -> Sample3 {
        match self.gyro_bias {
            Some(bias) => raw - bias,
            None => raw,
        }
    }

    /// Accel reading in units of g on each calibrated axis.
    pub fn apply_accel(&self, raw: Sample3) -> Sample3 {
        let mut out = raw;
        for axis in Axis::ALL {
            if let Some(r) = self.accel_ranges[axis.index()] {
                out[axis.index()] = (raw[axis.index()] - r.offset) / r.scale;
            }
        }
        out
    }

    /// Mag reading with the hard-iron offset removed, normalised per axis.
    pub fn apply_mag(&self, raw: Sample3) -> Sample3 {
        match self.mag_range {
            Some(r) => (raw - r.offset).component_div(&r.scale),
            None => raw,
        }
    }

    pub fn apply(&self, stream: Stream, raw: Sample3) -> Sample3 {
        match stream {
            Stream::Gyro => self.apply_gyro(raw),
            Stream::Accel => self.apply_accel(raw),
            Stream::Mag => self.apply_mag(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Polarity, Slot};
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_until_calibrated() {
        let comp = Compensation::default();
        let s = Sample3::new(1.0, -2.0, 3.0);
        assert_eq!(comp.apply_gyro(s), s);
        assert_eq!(comp.apply_accel(s), s);
    }

    #[test]
    fn test_apply() {
        let mut table = AxisRangeTable::default();
        table.set(Slot::new(Axis::Z, Polarity::Positive), 10.0);
        table.set(Slot::new(Axis::Z, Polarity::Negative), 9.6);
        let comp = Compensation::new(Some(Sample3::new(0.1, 0.0, -0.1)), &table, None);

        assert_relative_eq!(
            comp.apply_gyro(Sample3::new(0.1, 1.0, 0.0)),
            Sample3::new(0.0, 1.0, 0.1),
            epsilon = 1e-12
        );

        // +z pose reads +10.0 → 1 g; -z pose reads -9.6 → -1 g.
        let up = comp.apply_accel(Sample3::new(0.5, 0.0, 10.0));
        assert_relative_eq!(up.z, 1.0, epsilon = 1e-12);
        assert_eq!(up.x, 0.5);
        let down = comp.apply_accel(Sample3::new(0.0, 0.0, -9.6));
        assert_relative_eq!(down.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mag_until_ranged() {
        let mut comp = Compensation {
            gyro_bias: Some(Sample3::new(1.0, 1.0, 1.0)),
            ..Default::default()
        };
        let s = Sample3::new(0.25, 0.0, -0.45);
        assert_eq!(comp.apply(Stream::Mag, s), s);
        assert_eq!(comp.apply(Stream::Gyro, s), s - Sample3::new(1.0, 1.0, 1.0));

        comp.mag_range = Some(MagRange {
            offset: Sample3::new(0.05, 0.0, -0.05),
            scale: Sample3::new(0.4, 0.5, 0.4),
        });
        assert_relative_eq!(
            comp.apply(Stream::Mag, s),
            Sample3::new(0.5, 0.0, -1.0),
            epsilon = 1e-12
        );
    }
}
