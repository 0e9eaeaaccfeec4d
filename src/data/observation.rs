use crate::foundation::error::{FitError, FitResult};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One measured sample: sky offset, measured value, and its 1-sigma error.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObservationPoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
    pub error: f64,
}

/// Observations taken at one epoch.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObservationSet {
    /// Characteristic (average) time of the epoch, in the scene clock's units.
    pub time: f64,
    pub points: Vec<ObservationPoint>,
}

impl ObservationSet {
    pub fn new(time: f64, points: Vec<ObservationPoint>) -> Self {
        Self { time, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Reject sets that cannot produce finite residuals.
    pub fn validate(&self) -> FitResult<()> {
        if !self.time.is_finite() {
            return Err(FitError::data("observation time must be finite"));
        }
        if self.points.is_empty() {
            return Err(FitError::data("observation set has no points"));
        }
        for (i, p) in self.points.iter().enumerate() {
            if !(p.x.is_finite() && p.y.is_finite() && p.value.is_finite()) {
                return Err(FitError::data(format!("point {i} has non-finite fields")));
            }
            if !(p.error.is_finite() && p.error > 0.0) {
                return Err(FitError::data(format!(
                    "point {i} error must be finite and > 0, got {}",
                    p.error
                )));
            }
        }
        Ok(())
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum DataFile {
    Many { sets: Vec<ObservationSet> },
    One(ObservationSet),
}

/// Where a load request takes its observations from.
#[derive(Clone, Debug, PartialEq)]
pub enum DataSource {
    /// JSON file holding one set or `{"sets": [...]}`.
    Path(PathBuf),
    /// Sets already in memory.
    Sets(Vec<ObservationSet>),
}

impl DataSource {
    /// Materialize and validate every set.
    pub fn read(&self) -> FitResult<Vec<ObservationSet>> {
        let sets = match self {
            Self::Path(path) => read_data_file(path)?,
            Self::Sets(sets) => sets.clone(),
        };
        if sets.is_empty() {
            return Err(FitError::data("data source holds no observation sets"));
        }
        for (i, s) in sets.iter().enumerate() {
            s.validate()
                .map_err(|e| FitError::data(format!("set {i}: {e}")))?;
        }
        Ok(sets)
    }
}

fn read_data_file(path: &Path) -> FitResult<Vec<ObservationSet>> {
    let f = File::open(path)
        .map_err(|e| FitError::data(format!("open data file '{}': {e}", path.display())))?;
    let parsed: DataFile = serde_json::from_reader(BufReader::new(f))
        .map_err(|e| FitError::data(format!("parse data file '{}': {e}", path.display())))?;
    Ok(match parsed {
        DataFile::Many { sets } => sets,
        DataFile::One(set) => vec![set],
    })
}

#[cfg(test)]
#[path = "../../tests/unit/data/observation.rs"]
mod tests;
