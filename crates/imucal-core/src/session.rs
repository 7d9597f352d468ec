//! Routes tagged samples to the per-sensor calibrators and hands results to
//! the outside world.
//!
//! The session owns every calibrator exclusively and handles one sample to
//! completion per call. Outbound requests go through [`ConfigSink`], whose
//! implementations are expected to queue and return immediately; the session
//! never waits on or retries them.

use crate::accel::{AccelCalibrator, AccelOutcome, AxisRange, AxisRangeTable};
use crate::compensation::Compensation;
use crate::config::CalibrationConfig;
use crate::error::CalibrationError;
use crate::gyro::{GyroBias, GyroCalibrator};
use crate::mag::{MagOutcome, MagRange, MagRangeTracker, MagSampleLog};
use crate::sample::{RawSample, Sample3, Stream};
use nalgebra::Vector3;
use serde::Serialize;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Outbound collaborator
// ---------------------------------------------------------------------------

/// Configuration push target (the remote-call side of the message bus).
pub trait ConfigSink {
    /// Ask upstream to deliver samples at `hz`.
    fn request_sample_rate(&mut self, hz: u32) -> Result<(), CalibrationError>;

    /// Apply a new zero-rate offset.
    fn push_gyro_bias(&mut self, bias: &Vector3<f64>) -> Result<(), CalibrationError>;
}

/// Sink that accepts and drops every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ConfigSink for NullSink {
    fn request_sample_rate(&mut self, _hz: u32) -> Result<(), CalibrationError> {
        Ok(())
    }

    fn push_gyro_bias(&mut self, _bias: &Vector3<f64>) -> Result<(), CalibrationError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Events & status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalibrationEvent {
    GyroBias(GyroBias),
    AccelProgress(AccelOutcome),
    MagRange(MagOutcome),
}

impl CalibrationEvent {
    /// True when the event refined a calibration value. A reset only
    /// reopens the accel gate.
    pub fn is_progress(&self) -> bool {
        !matches!(self, CalibrationEvent::AccelProgress(AccelOutcome::Reset { .. }))
    }
}

/// Snapshot of everything the session has learned so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationStatus {
    pub gyro_bias: Option<Sample3>,
    pub gyro_threshold: f64,
    pub accel_threshold: f64,
    pub accel_table: AxisRangeTable,
    pub accel_ranges: [Option<AxisRange>; 3],
    pub still_needed: Vec<&'static str>,
    pub mag_samples: usize,
    pub mag_range: Option<MagRange>,
    pub accepted: u64,
    pub dropped: u64,
    pub calibrated: bool,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct CalibrationSession<S: ConfigSink> {
    config: CalibrationConfig,
    gyro: GyroCalibrator,
    accel: AccelCalibrator,
    mag: MagSampleLog,
    mag_range: MagRangeTracker,
    sink: S,
    accepted: u64,
    dropped: u64,
}

impl<S: ConfigSink> CalibrationSession<S> {
    /// Builds the calibrators and issues the one-off sample-rate request.
    /// A failed request is logged; the session starts regardless.
    pub fn start(config: CalibrationConfig, mut sink: S) -> Self {
        match sink.request_sample_rate(config.sample_rate_hz) {
            Ok(()) => info!(hz = config.sample_rate_hz, "requested sample rate"),
            Err(e) => warn!(hz = config.sample_rate_hz, "sample rate request failed: {}", e),
        }

        Self {
            gyro: GyroCalibrator::new(&config),
            accel: AccelCalibrator::new(&config),
            mag: MagSampleLog::new(config.mag_capacity),
            mag_range: MagRangeTracker::new(config.mag_min_span),
            config,
            sink,
            accepted: 0,
            dropped: 0,
        }
    }

    /// Validates and handles one sample from the bus. Malformed samples are
    /// dropped and logged; the session keeps running.
    pub fn handle_raw(
        &mut self,
        stream: Stream,
        raw: RawSample,
    ) -> Result<Option<CalibrationEvent>, CalibrationError> {
        let sample = raw.into_sample(stream).map_err(|e| self.reject(e))?;
        Ok(self.handle(stream, sample))
    }

    /// Same as [`handle_raw`](Self::handle_raw) with the stream given by tag.
    pub fn handle_tagged(
        &mut self,
        tag: &str,
        raw: RawSample,
    ) -> Result<Option<CalibrationEvent>, CalibrationError> {
        let stream = tag.parse::<Stream>().map_err(|e| self.reject(e))?;
        self.handle_raw(stream, raw)
    }

    /// Counts and logs a sample that failed validation before reaching
    /// [`handle`](Self::handle). Returns the error for propagation.
    pub fn reject(&mut self, err: CalibrationError) -> CalibrationError {
        self.dropped += 1;
        warn!("dropping sample: {}", err);
        err
    }

    pub fn handle(&mut self, stream: Stream, sample: Sample3) -> Option<CalibrationEvent> {
        self.accepted += 1;
        match stream {
            Stream::Mag => {
                self.mag.push(sample);
                let outcome = self.mag_range.update(&self.mag)?;
                debug!(
                    valid = outcome.range.is_some(),
                    "mag extremes: min {:.4} {:.4} {:.4}, max {:.4} {:.4} {:.4}",
                    outcome.min.x,
                    outcome.min.y,
                    outcome.min.z,
                    outcome.max.x,
                    outcome.max.y,
                    outcome.max.z
                );
                Some(CalibrationEvent::MagRange(outcome))
            }
            Stream::Gyro => {
                let bias = self.gyro.update(sample)?;
                info!(
                    sigma = bias.sigma,
                    "gyro bias: {:.5} {:.5} {:.5}", bias.bias.x, bias.bias.y, bias.bias.z
                );
                if let Err(e) = self.sink.push_gyro_bias(&bias.bias) {
                    warn!("gyro bias push failed: {}", e);
                }
                Some(CalibrationEvent::GyroBias(bias))
            }
            Stream::Accel => {
                let outcome = self.accel.update(sample)?;
                log_accel(&outcome);
                Some(CalibrationEvent::AccelProgress(outcome))
            }
        }
    }

    /// Gyro bias found and all six accel poses recorded. With
    /// `require_mag` the magnetometer range must be known as well.
    pub fn is_calibrated(&self) -> bool {
        self.gyro.bias().is_some()
            && self.accel.table().is_complete()
            && (!self.config.require_mag || self.mag_range.is_valid())
    }

    pub fn compensation(&self) -> Compensation {
        Compensation::new(
            self.gyro.bias().map(|b| b.bias),
            self.accel.table(),
            self.mag_range.range(),
        )
    }

    pub fn status(&self) -> CalibrationStatus {
        let table = *self.accel.table();
        CalibrationStatus {
            gyro_bias: self.gyro.bias().map(|b| b.bias),
            gyro_threshold: self.gyro.threshold(),
            accel_threshold: self.accel.threshold(),
            accel_table: table,
            accel_ranges: table.ranges(),
            still_needed: table.still_needed(),
            mag_samples: self.mag.len(),
            mag_range: self.mag_range.range(),
            accepted: self.accepted,
            dropped: self.dropped,
            calibrated: self.is_calibrated(),
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn gyro(&self) -> &GyroCalibrator {
        &self.gyro
    }

    pub fn accel(&self) -> &AccelCalibrator {
        &self.accel
    }

    pub fn mag(&self) -> &MagSampleLog {
        &self.mag
    }

    pub fn mag_range(&self) -> &MagRangeTracker {
        &self.mag_range
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

fn log_accel(outcome: &AccelOutcome) {
    match outcome {
        AccelOutcome::Reset {
            sigma,
            previous_threshold,
        } => info!(sigma, previous_threshold, "accel reset"),
        AccelOutcome::StableAxis {
            slot,
            magnitude,
            sigma,
            still_needed,
        } => info!(
            axis = slot.map(|s| s.label()).unwrap_or("none"),
            magnitude,
            sigma,
            "accel stable, still needed: {}",
            still_needed.join(" ")
        ),
    }
}
