use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use zplsc::{CalibrationCoefficients, EnvironmentParameters, RecordDecoder};

/// Calibration file contents. Any missing section or field uses the built-in defaults.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub calibration: CalibrationCoefficients,
    pub environment: EnvironmentParameters,
}

impl Config {
    /// Load from a JSON file, or the defaults if no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let file =
            File::open(path).with_context(|| format!("opening calibration file {path:?}"))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing calibration file {path:?}"))
    }

    pub fn with_bins_to_average(mut self, bins_to_average: Option<usize>) -> Self {
        if let Some(n) = bins_to_average {
            self.environment.bins_to_average = n;
        }
        self
    }

    pub fn decoder(&self) -> RecordDecoder {
        RecordDecoder::builder()
            .calibration(self.calibration.clone())
            .environment(self.environment.clone())
            .build()
    }
}
