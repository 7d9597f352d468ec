use anyhow::{Context, Result};
use imucal_core::{Axis, Polarity, Sample3, Slot, Stream};
use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

/// Order the simulated operator walks through the poses.
pub const POSE_SEQUENCE: [Slot; 6] = [
    Slot::new(Axis::X, Polarity::Positive),
    Slot::new(Axis::X, Polarity::Negative),
    Slot::new(Axis::Y, Polarity::Positive),
    Slot::new(Axis::Y, Polarity::Negative),
    Slot::new(Axis::Z, Polarity::Positive),
    Slot::new(Axis::Z, Polarity::Negative),
];

pub struct SensorConfig {
    pub noise_scale: f64,
    pub accel_noise_std: f64, // m/s^2
    pub gyro_noise_std: f64,  // rad/s
    pub mag_noise_std: f64,   // Gauss
    pub gravity: f64,         // m/s^2

    // Static errors the calibrator should recover
    pub accel_bias: Vector3<f64>,
    pub accel_gain: Vector3<f64>,
    pub gyro_bias: Vector3<f64>,
    /// Hard-iron offset added to every mag reading (Gauss).
    pub mag_bias: Vector3<f64>,

    /// Stationary ticks per pose.
    pub hold_samples: usize,
    /// Ticks of rotation between poses.
    pub motion_samples: usize,
    /// Sideways jolt when the device is picked up, decaying to zero by the
    /// time it settles in the next pose (m/s^2).
    pub handling_accel: f64,
    /// One mag sample every `mag_divider` ticks.
    pub mag_divider: usize,

    pub seed: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            noise_scale: 1.0,
            accel_noise_std: 0.02,
            gyro_noise_std: 0.002,
            mag_noise_std: 0.001,
            gravity: 9.80665,
            accel_bias: Vector3::new(0.05, -0.08, 0.12),
            accel_gain: Vector3::new(1.01, 0.99, 1.02),
            gyro_bias: Vector3::new(0.012, -0.007, 0.003),
            mag_bias: Vector3::new(0.08, -0.05, 0.03),
            hold_samples: 200,
            motion_samples: 100,
            handling_accel: 40.0,
            mag_divider: 4,
            seed: 42,
        }
    }
}

/// One simulated bus delivery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedSample {
    pub tick: usize,
    pub stream: Stream,
    pub sample: Sample3,
}

/// Unit vector (body frame) pointing up while the device rests in `pose`.
pub fn pose_up(pose: Slot) -> Vector3<f64> {
    let mut v = Vector3::zeros();
    v[pose.axis.index()] = match pose.polarity {
        Polarity::Positive => 1.0,
        Polarity::Negative => -1.0,
    };
    v
}

/// Rotation taking the body frame to the level frame (body `up` onto +z).
fn pose_attitude(up: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::rotation_between(up, &Vector3::z())
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI))
}

/// Generates a full six-pose calibration session: each pose held still for
/// `hold_samples` ticks, separated by `motion_samples` ticks of rotation.
/// Accel and gyro arrive every tick, mag every `mag_divider` ticks.
pub fn generate_session(cfg: &SensorConfig) -> Result<Vec<TaggedSample>> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    let d_accel = Normal::new(0.0, cfg.noise_scale * cfg.accel_noise_std)
        .context("invalid accel noise")?;
    let d_gyro =
        Normal::new(0.0, cfg.noise_scale * cfg.gyro_noise_std).context("invalid gyro noise")?;
    let d_mag =
        Normal::new(0.0, cfg.noise_scale * cfg.mag_noise_std).context("invalid mag noise")?;

    // ~0.5 Gauss, dipping down (northern hemisphere), level frame
    let mag_field = Vector3::new(0.25, 0.0, -0.45);

    let ticks_per_pose = cfg.hold_samples + cfg.motion_samples;
    let mut out = Vec::with_capacity(POSE_SEQUENCE.len() * ticks_per_pose * 3);
    let mut tick = 0;

    for (i, &pose) in POSE_SEQUENCE.iter().enumerate() {
        let up = pose_up(pose);
        let attitude = pose_attitude(&up);

        // 1. Stationary hold
        for _ in 0..cfg.hold_samples {
            let noise = Vector3::new(
                d_accel.sample(&mut rng),
                d_accel.sample(&mut rng),
                d_accel.sample(&mut rng),
            );
            let accel = (up * cfg.gravity).component_mul(&cfg.accel_gain) + cfg.accel_bias + noise;
            out.push(TaggedSample {
                tick,
                stream: Stream::Accel,
                sample: accel,
            });

            let gyro = cfg.gyro_bias
                + Vector3::new(
                    d_gyro.sample(&mut rng),
                    d_gyro.sample(&mut rng),
                    d_gyro.sample(&mut rng),
                );
            out.push(TaggedSample {
                tick,
                stream: Stream::Gyro,
                sample: gyro,
            });

            if cfg.mag_divider > 0 && tick % cfg.mag_divider == 0 {
                let mag = attitude.inverse_transform_vector(&mag_field)
                    + cfg.mag_bias
                    + Vector3::new(
                        d_mag.sample(&mut rng),
                        d_mag.sample(&mut rng),
                        d_mag.sample(&mut rng),
                    );
                out.push(TaggedSample {
                    tick,
                    stream: Stream::Mag,
                    sample: mag,
                });
            }
            tick += 1;
        }

        // 2. Rotate towards the next pose (skipped after the last one)
        let Some(&next) = POSE_SEQUENCE.get(i + 1) else {
            break;
        };
        let next_up = pose_up(next);
        // Diagonal sideways direction: keeps opposite poses from interpolating
        // through zero and never lines up with a principal axis.
        let side = Vector3::new(
            up.y.abs() + up.z.abs(),
            up.x.abs() + up.z.abs(),
            up.x.abs() + up.y.abs(),
        )
        .normalize();
        for k in 0..cfg.motion_samples {
            let t = (k + 1) as f64 / cfg.motion_samples as f64;
            let swing = (t * PI).sin();
            let dir = (up * (1.0 - t) + next_up * t + side * swing).normalize();
            let shove = side * (cfg.handling_accel * (1.0 - t));
            let accel = (dir * cfg.gravity).component_mul(&cfg.accel_gain)
                + cfg.accel_bias
                + shove
                + Vector3::new(
                    d_accel.sample(&mut rng),
                    d_accel.sample(&mut rng),
                    d_accel.sample(&mut rng),
                );
            out.push(TaggedSample {
                tick,
                stream: Stream::Accel,
                sample: accel,
            });

            let rate = up.cross(&next_up) * (2.0 * swing) + Vector3::new(0.3, 0.3, 0.3) * swing;
            out.push(TaggedSample {
                tick,
                stream: Stream::Gyro,
                sample: rate + cfg.gyro_bias,
            });
            tick += 1;
        }
    }

    Ok(out)
}
