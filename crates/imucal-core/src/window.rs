use crate::sample::Sample3;
use std::collections::VecDeque;

/// Spread of a window around its mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispersion {
    /// `sqrt((var_x + var_y + var_z) / 3)`, population variances.
    pub sigma: f64,
    pub mean: Sample3,
}

/// Most-recent-N buffer of 3-axis samples, newest first.
///
/// Length never exceeds `capacity`; once full, every push slides the window
/// by one.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample3>,
    capacity: usize,
}

impl SampleWindow {
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

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Sample3> {
        self.samples.iter()
    }

    /// Per-axis arithmetic mean. `None` on an empty window.
    pub fn mean(&self) -> Option<Sample3> {
        if self.samples.is_empty() {
            return None;
        }
        let sum = self
            .samples
            .iter()
            .fold(Sample3::zeros(), |acc, s| acc + s);
        Some(sum / self.samples.len() as f64)
    }

    /// Mean and sigma of the current contents. `None` on an empty window.
    pub fn dispersion(&self) -> Option<Dispersion> {
        let mean = self.mean()?;
        let n = self.samples.len() as f64;

        let sq_dev = self.samples.iter().fold(Sample3::zeros(), |acc, s| {
            let d = s - mean;
            acc + d.component_mul(&d)
        });
        let variance = sq_dev / n;
        let sigma = (variance.sum() / 3.0).sqrt();

        Some(Dispersion { sigma, mean })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut w = SampleWindow::new(32);
        for i in 0..100 {
            w.push(Sample3::new(i as f64, 0.0, 0.0));
            assert!(w.len() <= 32);
            if i + 1 >= 32 {
                assert_eq!(w.len(), 32);
                assert!(w.is_full());
            } else {
                assert!(!w.is_full());
            }
        }
    }

    #[test]
    fn test_keeps_newest_first() {
        let mut w = SampleWindow::new(3);
        for i in 0..5 {
            w.push(Sample3::new(i as f64, 0.0, 0.0));
        }
        let xs: Vec<f64> = w.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_constant_window() {
        let mut w = SampleWindow::new(32);
        for _ in 0..32 {
            w.push(Sample3::new(1.0, 2.0, 3.0));
        }
        let d = w.dispersion().unwrap();
        assert_relative_eq!(d.mean, Sample3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        assert_relative_eq!(d.sigma, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_window_has_no_statistics() {
        let w = SampleWindow::new(4);
        assert!(w.mean().is_none());
        assert!(w.dispersion().is_none());
    }

    #[test]
    fn test_sigma_known_value() {
        // x alternates ±1 → var_x = 1, var_y = var_z = 0 → sigma = sqrt(1/3)
        let mut w = SampleWindow::new(4);
        for x in [1.0, -1.0, 1.0, -1.0] {
            w.push(Sample3::new(x, 5.0, 5.0));
        }
        let d = w.dispersion().unwrap();
        assert_relative_eq!(d.sigma, (1.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(d.mean.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_statistics_ignore_sample_order() {
        let samples = [
            Sample3::new(0.3, -1.2, 9.7),
            Sample3::new(0.1, -1.0, 9.9),
            Sample3::new(-0.4, -0.8, 9.8),
            Sample3::new(0.2, -1.1, 9.6),
        ];
        let mut forward = SampleWindow::new(4);
        let mut backward = SampleWindow::new(4);
        for s in samples.iter() {
            forward.push(*s);
        }
        for s in samples.iter().rev() {
            backward.push(*s);
        }
        let a = forward.dispersion().unwrap();
        let b = backward.dispersion().unwrap();
        assert_relative_eq!(a.sigma, b.sigma, epsilon = 1e-12);
        assert_relative_eq!(a.mean, b.mean, epsilon = 1e-12);
    }
}
