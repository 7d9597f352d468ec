use imucal_core::{CalibrationError, ConfigSink};
use nalgebra::Vector3;
use tracing::info;

/// Batch-mode sink: there is no bus to push to, so requests are logged and
/// counted for the run summary.
#[derive(Debug, Default)]
pub struct LogSink {
    pub rate_requests: usize,
    pub bias_pushes: usize,
    pub last_bias: Option<Vector3<f64>>,
}

impl ConfigSink for LogSink {
    fn request_sample_rate(&mut self, hz: u32) -> Result<(), CalibrationError> {
        self.rate_requests += 1;
        info!(hz, "sample rate request (not sent)");
        Ok(())
    }

    fn push_gyro_bias(&mut self, bias: &Vector3<f64>) -> Result<(), CalibrationError> {
        self.bias_pushes += 1;
        self.last_bias = Some(*bias);
        info!(x = bias.x, y = bias.y, z = bias.z, "gyro bias push (not sent)");
        Ok(())
    }
}
