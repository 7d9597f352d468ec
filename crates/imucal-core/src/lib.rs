//! # imucal core
//!
//! Online calibration of a 9-axis IMU from streaming raw samples:
//! - Sliding sample windows with mean / sigma statistics
//! - Gyroscope bias from the stillest window ever seen
//! - Accelerometer six-pose range detection with spike reset
//! - Magnetometer sample buffering and a min/max hard-iron range
//! - A session that routes tagged samples and emits calibration events
//!
//! Transport, topic naming and persistence live outside this crate; the
//! session talks to them through [`ConfigSink`] and returned
//! [`CalibrationEvent`]s.

pub mod accel;
pub mod compensation;
pub mod config;
pub mod error;
pub mod gyro;
pub mod mag;
pub mod sample;
pub mod session;
pub mod window;

// Re-export core types
pub use accel::{classify, AccelCalibrator, AccelOutcome, AxisRange, AxisRangeTable};
pub use compensation::Compensation;
pub use config::CalibrationConfig;
pub use error::CalibrationError;
pub use gyro::{GyroBias, GyroCalibrator};
pub use mag::{MagOutcome, MagRange, MagRangeTracker, MagSampleLog};
pub use sample::{Axis, Polarity, RawSample, Sample3, Slot, Stream};
pub use session::{CalibrationEvent, CalibrationSession, CalibrationStatus, ConfigSink, NullSink};
pub use window::{Dispersion, SampleWindow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
