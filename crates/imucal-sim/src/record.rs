//! Recorded sample files: CSV with a `stream,x,y,z` header, one delivery per
//! row. An empty cell is a missing axis and is kept as such.

use crate::sensor::TaggedSample;
use anyhow::{Context, Result};
use imucal_core::RawSample;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub stream: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl SampleRecord {
    pub fn raw(&self) -> RawSample {
        RawSample {
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }
}

impl From<&TaggedSample> for SampleRecord {
    fn from(t: &TaggedSample) -> Self {
        Self {
            stream: t.stream.label().to_string(),
            x: Some(t.sample.x),
            y: Some(t.sample.y),
            z: Some(t.sample.z),
        }
    }
}

pub fn write_csv(path: &Path, samples: &[TaggedSample]) -> Result<()> {
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for s in samples {
        wtr.serialize(SampleRecord::from(s))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_csv(path: &Path) -> Result<Vec<SampleRecord>> {
    let mut rdr =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut records = Vec::new();
    for (i, row) in rdr.deserialize().enumerate() {
        let record: SampleRecord = row.with_context(|| format!("row {}", i + 1))?;
        records.push(record);
    }
    Ok(records)
}
