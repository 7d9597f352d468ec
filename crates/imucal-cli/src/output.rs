//! File outputs of a batch run: per-stream tab-separated sample logs, the
//! event log and the final report.

use anyhow::{Context, Result};
use imucal_core::{AccelOutcome, CalibrationEvent, CalibrationStatus, Sample3, Stream};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Raw and compensated readings, one tab-separated line per accepted sample.
pub struct SampleLogs {
    dir: PathBuf,
    writers: HashMap<(Stream, bool), csv::Writer<File>>,
}

impl SampleLogs {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            writers: HashMap::new(),
        })
    }

    pub fn path(dir: &Path, stream: Stream, calibrated: bool) -> PathBuf {
        let prefix = if calibrated { "calibrated" } else { "raw" };
        dir.join(format!("{}_{}.tsv", prefix, stream))
    }

    pub fn write(&mut self, stream: Stream, raw: Sample3, calibrated: Sample3) -> Result<()> {
        self.line(stream, false, raw)?;
        self.line(stream, true, calibrated)
    }

    fn line(&mut self, stream: Stream, calibrated: bool, s: Sample3) -> Result<()> {
        let wtr = match self.writers.entry((stream, calibrated)) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let path = Self::path(&self.dir, stream, calibrated);
                let w = csv::WriterBuilder::new()
                    .delimiter(b'\t')
                    .has_headers(false)
                    .from_path(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                e.insert(w)
            }
        };
        wtr.write_record(&[
            format!("{:.6}", s.x),
            format!("{:.6}", s.y),
            format!("{:.6}", s.z),
        ])?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for w in self.writers.values_mut() {
            w.flush()?;
        }
        Ok(())
    }
}

/// `events.csv`: one row per calibration event.
pub struct EventLog {
    wtr: csv::Writer<File>,
}

impl EventLog {
    pub fn create(path: &Path) -> Result<Self> {
        let mut wtr =
            csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
        wtr.write_record([
            "index",
            "event",
            "slot",
            "magnitude",
            "sigma",
            "x",
            "y",
            "z",
            "still_needed",
        ])?;
        Ok(Self { wtr })
    }

    pub fn write(&mut self, index: usize, event: &CalibrationEvent) -> Result<()> {
        let row = event_row(index, event);
        self.wtr.write_record(&row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.wtr.flush()?;
        Ok(())
    }
}

fn event_row(index: usize, event: &CalibrationEvent) -> [String; 9] {
    let blank = String::new;
    match event {
        CalibrationEvent::GyroBias(b) => [
            index.to_string(),
            "gyro_bias".into(),
            blank(),
            blank(),
            format!("{:.6}", b.sigma),
            format!("{:.6}", b.bias.x),
            format!("{:.6}", b.bias.y),
            format!("{:.6}", b.bias.z),
            blank(),
        ],
        CalibrationEvent::AccelProgress(AccelOutcome::Reset { sigma, .. }) => [
            index.to_string(),
            "accel_reset".into(),
            blank(),
            blank(),
            format!("{:.6}", sigma),
            blank(),
            blank(),
            blank(),
            blank(),
        ],
        CalibrationEvent::AccelProgress(AccelOutcome::StableAxis {
            slot,
            magnitude,
            sigma,
            still_needed,
        }) => [
            index.to_string(),
            "accel_stable".into(),
            slot.map(|s| s.label().to_string()).unwrap_or_default(),
            format!("{:.6}", magnitude),
            format!("{:.6}", sigma),
            blank(),
            blank(),
            blank(),
            still_needed.join(" "),
        ],
        CalibrationEvent::MagRange(m) => {
            let (x, y, z) = match &m.range {
                Some(r) => (
                    format!("{:.6}", r.offset.x),
                    format!("{:.6}", r.offset.y),
                    format!("{:.6}", r.offset.z),
                ),
                None => (blank(), blank(), blank()),
            };
            [
                index.to_string(),
                "mag_range".into(),
                blank(),
                blank(),
                blank(),
                x,
                y,
                z,
                blank(),
            ]
        }
    }
}

/// Final report as `report.csv` (key/value rows) or `report.json`.
pub fn write_report_csv(path: &Path, status: &CalibrationStatus) -> Result<()> {
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(["key", "value"])?;

    let fmt_vec = |v: &Sample3| format!("{:.6} {:.6} {:.6}", v.x, v.y, v.z);
    wtr.write_record([
        "gyro_bias".to_string(),
        status.gyro_bias.as_ref().map(fmt_vec).unwrap_or_default(),
    ])?;
    wtr.write_record(["gyro_threshold".to_string(), format!("{:.6}", status.gyro_threshold)])?;
    wtr.write_record(["accel_threshold".to_string(), format!("{:.6}", status.accel_threshold)])?;
    for (axis, range) in ["x", "y", "z"].iter().zip(status.accel_ranges.iter()) {
        let (offset, scale) = match range {
            Some(r) => (format!("{:.6}", r.offset), format!("{:.6}", r.scale)),
            None => (String::new(), String::new()),
        };
        wtr.write_record([format!("accel_offset_{}", axis), offset])?;
        wtr.write_record([format!("accel_scale_{}", axis), scale])?;
    }
    let (mag_offset, mag_scale) = match &status.mag_range {
        Some(r) => (fmt_vec(&r.offset), fmt_vec(&r.scale)),
        None => (String::new(), String::new()),
    };
    wtr.write_record(["mag_offset".to_string(), mag_offset])?;
    wtr.write_record(["mag_scale".to_string(), mag_scale])?;
    wtr.write_record(["still_needed".to_string(), status.still_needed.join(" ")])?;
    wtr.write_record(["mag_samples".to_string(), status.mag_samples.to_string()])?;
    wtr.write_record(["accepted".to_string(), status.accepted.to_string()])?;
    wtr.write_record(["dropped".to_string(), status.dropped.to_string()])?;
    wtr.write_record(["calibrated".to_string(), status.calibrated.to_string()])?;
    wtr.flush()?;
    Ok(())
}

pub fn write_report_json(path: &Path, status: &CalibrationStatus) -> Result<()> {
    let json = serde_json::to_string_pretty(status)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
