//! Static instrument calibration and deployment parameters.
//!
//! Coefficients are indexed by channel position, which for the deployed instruments
//! corresponds to the 38, 125, 200 and 455 kHz boards.
use serde::{Deserialize, Serialize};

use crate::header::MAX_CHANNELS;

/// Thermistor coefficients used to convert temperature counts to degrees C.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Thermistor {
    pub ka: f64,
    pub kb: f64,
    pub kc: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for Thermistor {
    fn default() -> Self {
        Thermistor {
            ka: 464.5,
            kb: 3000.0,
            kc: 1.893,
            a: 0.001466,
            b: 0.000_238_8,
            c: 0.000_000_100_335,
        }
    }
}

/// Per-channel calibration coefficients.
///
/// Fields missing from a deserialized document take their default values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CalibrationCoefficients {
    /// Detector slope, scales log averaged data into counts.
    pub ds: [f64; MAX_CHANNELS],
    /// Transmit voltage response
    pub tvr: [f64; MAX_CHANNELS],
    /// Transmit voltage
    pub vtx: [f64; MAX_CHANNELS],
    /// Equivalent beam angle
    pub bp: [f64; MAX_CHANNELS],
    /// Echo level at detector intercept
    pub el: [f64; MAX_CHANNELS],
    pub thermistor: Thermistor,
}

impl Default for CalibrationCoefficients {
    #[allow(clippy::excessive_precision)]
    fn default() -> Self {
        CalibrationCoefficients {
            ds: [
                2.280000038445e-2,
                2.280000038445e-2,
                2.250000089407e-2,
                2.300000004470e-2,
            ],
            tvr: [
                1.691999969482e2,
                1.668999938965e2,
                1.688999938965e2,
                1.696000061035e2,
            ],
            vtx: [
                1.533999938965e2,
                5.8e1,
                9.619999694824e1,
                1.301000061035e2,
            ],
            bp: [
                8.609999902546e-3,
                1.530000048131e-2,
                1.530000048131e-2,
                8.609999902546e-3,
            ],
            el: [
                1.623000030518e2,
                1.376999969482e2,
                1.456000061035e2,
                1.491999969482e2,
            ],
            thermistor: Thermistor::default(),
        }
    }
}

/// Deployment parameters used by the backscatter model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EnvironmentParameters {
    /// Salinity in psu
    pub salinity: f64,
    /// Pressure in dbar, roughly the depth of the instrument in meters
    pub pressure: f64,
    /// Number of range bins to average; 1 is no averaging
    pub bins_to_average: usize,
}

impl Default for EnvironmentParameters {
    fn default() -> Self {
        EnvironmentParameters {
            salinity: 32.0,
            pressure: 150.0,
            bins_to_average: 1,
        }
    }
}
