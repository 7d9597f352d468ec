//! imucal simulation library
//!
//! Synthetic IMU feeds for exercising the calibrator: an operator holding the
//! device still in each of the six poses, with noise, static biases and
//! handling motion in between.

pub mod record;
pub mod sensor;

// Re-export main types
pub use record::{read_csv, write_csv, SampleRecord};
pub use sensor::{generate_session, pose_up, SensorConfig, TaggedSample, POSE_SEQUENCE};
