use crate::config::CalibrationConfig;
use crate::sample::Sample3;
use crate::window::SampleWindow;
use serde::Serialize;

/// Zero-rate offset: the mean of the most stable gyro window seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GyroBias {
    pub bias: Sample3,
    /// Sigma of the window the bias was taken from.
    pub sigma: f64,
}

/// Tracks the stillest gyro window and reports its mean as the bias.
///
/// The threshold only ever decreases. Only the best-ever stillness reading is
/// trusted, so there is no reset path.
#[derive(Debug, Clone)]
pub struct GyroCalibrator {
    window: SampleWindow,
    threshold: f64,
    bias: Option<GyroBias>,
}

impl Default for GyroCalibrator {
    fn default() -> Self {
        Self::new(&CalibrationConfig::default())
    }
}

impl GyroCalibrator {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            window: SampleWindow::new(config.window_capacity),
            threshold: config.initial_threshold,
            bias: None,
        }
    }

    /// Feed one sample. Returns a new bias when the full window is strictly
    /// stiller than anything seen before.
    pub fn update(&mut self, sample: Sample3) -> Option<GyroBias> {
        self.window.push(sample);
        if !self.window.is_full() {
            return None;
        }

        let d = self.window.dispersion()?;
        if d.sigma < self.threshold {
            self.threshold = d.sigma;
            let bias = GyroBias {
                bias: d.mean,
                sigma: d.sigma,
            };
            self.bias = Some(bias);
            Some(bias)
        } else {
            None
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn bias(&self) -> Option<GyroBias> {
        self.bias
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }
}
