use crate::error::CalibrationError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// One 3-axis reading (x, y, z) for one instant.
pub type Sample3 = Vector3<f64>;

/// Sample as delivered by the bus. Every axis is optional on the wire so a
/// missing field can be detected instead of silently reading as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl RawSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// Validates all three axes. The first missing or non-finite axis
    /// (x, y, z order) is reported.
    pub fn into_sample(self, stream: Stream) -> Result<Sample3, CalibrationError> {
        let check = |axis: Axis, v: Option<f64>| match v {
            None => Err(CalibrationError::MalformedSample { stream, axis }),
            Some(v) if !v.is_finite() => Err(CalibrationError::NonFinite { stream, axis }),
            Some(v) => Ok(v),
        };
        Ok(Sample3::new(
            check(Axis::X, self.x)?,
            check(Axis::Y, self.y)?,
            check(Axis::Z, self.z)?,
        ))
    }
}

impl From<Sample3> for RawSample {
    fn from(s: Sample3) -> Self {
        Self::new(s.x, s.y, s.z)
    }
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Mag,
    Accel,
    Gyro,
}

impl Stream {
    pub const ALL: [Stream; 3] = [Stream::Mag, Stream::Accel, Stream::Gyro];

    pub fn label(self) -> &'static str {
        match self {
            Self::Mag => "mag",
            Self::Accel => "accel",
            Self::Gyro => "gyro",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stream {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mag" => Ok(Self::Mag),
            "accel" => Ok(Self::Accel),
            "gyro" => Ok(Self::Gyro),
            other => Err(CalibrationError::UnknownStream(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Axes & orientation slots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }

    /// Component of `v` along this axis.
    pub fn component(self, v: &Vector3<f64>) -> f64 {
        v[self.index()]
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Polarity {
    Positive = 0,
    Negative = 1,
}

impl Polarity {
    pub const ALL: [Polarity; 2] = [Polarity::Positive, Polarity::Negative];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn sign(self) -> &'static str {
        match self {
            Self::Positive => "+",
            Self::Negative => "-",
        }
    }
}

/// One of the six (axis, polarity) accelerometer calibration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub axis: Axis,
    pub polarity: Polarity,
}

impl Slot {
    pub const fn new(axis: Axis, polarity: Polarity) -> Self {
        Self { axis, polarity }
    }

    /// Human-readable token, e.g. `"+x"` or `"-z"`.
    pub fn label(self) -> &'static str {
        match (self.polarity, self.axis) {
            (Polarity::Positive, Axis::X) => "+x",
            (Polarity::Positive, Axis::Y) => "+y",
            (Polarity::Positive, Axis::Z) => "+z",
            (Polarity::Negative, Axis::X) => "-x",
            (Polarity::Negative, Axis::Y) => "-y",
            (Polarity::Negative, Axis::Z) => "-z",
        }
    }

    /// Whether the direction `norm` lies within the cone `cos_tol` around
    /// this slot's axis direction.
    pub fn matches(self, norm: &Vector3<f64>, cos_tol: f64) -> bool {
        let c = self.axis.component(norm);
        match self.polarity {
            Polarity::Positive => c > cos_tol,
            Polarity::Negative => c < -cos_tol,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
