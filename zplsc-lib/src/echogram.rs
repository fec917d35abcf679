//! Volume backscatter computation and echogram data collection.
//!
//! The default [AslModel] follows the ASL processing for AZFP data: temperature from
//! the thermistor counts, speed of sound, per-frequency seawater absorption, bin depth
//! ranges, and finally the sonar equation for volume backscatter (Sv, dB).
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationCoefficients, EnvironmentParameters, Thermistor};
use crate::header::{ProfileHeader, MAX_CHANNELS};
use crate::particle::ProfileRecord;

/// Counts per dB of echo level
const COUNTS_PER_DB: f64 = 26214.0;

/// Values derived from a header needed to compute backscatter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EchogramMetadata {
    /// Speed of sound (m/s)
    pub sound_speed: f64,
    /// Range (m) to the center of each bin, per channel in use
    pub depth_range: Vec<Vec<f64>>,
    /// Seawater absorption coefficient, per channel in use
    pub sea_absorption: Vec<f64>,
}

/// Converts channel counts into calibrated backscatter.
pub trait EchogramModel: Send + Sync {
    /// Compute the speed of sound, depth ranges and absorption for `header`.
    fn compute_echogram_metadata(&self, header: &ProfileHeader) -> EchogramMetadata;

    /// Compute calibrated values from per-channel counts.
    fn compute_backscatter(
        &self,
        header: &ProfileHeader,
        counts: &[Vec<f64>],
        metadata: &EchogramMetadata,
    ) -> Vec<Vec<f64>>;
}

/// Temperature (C) from thermistor counts.
#[must_use]
pub fn temperature_from_counts(counts: u16, thermistor: &Thermistor) -> f64 {
    let vin = 2.5 * (f64::from(counts) / 65535.0);
    let r = (thermistor.ka + thermistor.kb * vin) / (thermistor.kc - vin);
    let ln_r = r.ln();
    1.0 / (thermistor.a + thermistor.b * ln_r + thermistor.c * ln_r.powi(3)) - 273.0
}

/// Speed of sound (m/s) for temperature (C), pressure (dbar) and salinity (psu).
#[must_use]
pub fn sound_speed(temperature: f64, pressure: f64, salinity: f64) -> f64 {
    let z = temperature / 10.0;
    1449.05
        + z * (45.7 + z * (-5.21 + 0.23 * z))
        + (1.333 + z * (-0.126 + z * 0.009)) * (salinity - 35.0)
        + (pressure / 1000.0) * (16.3 + 0.18 * (pressure / 1000.0))
}

/// Seawater absorption for `frequency` (kHz) using the Francois & Garrison relaxation
/// model.
#[must_use]
pub fn sea_absorption(temperature: f64, pressure: f64, salinity: f64, frequency: f64) -> f64 {
    let t_k = temperature + 273.0;
    let f1 = 1320.0 * t_k * (-1700.0 / t_k).exp();
    let f2 = 1.55e7 * t_k * (-3052.0 / t_k).exp();

    let k = 1.0 + pressure / 10.0;
    let a = 8.95e-8 * (1.0 + temperature * (2.29e-2 - 5.08e-4 * temperature));
    let b = (salinity / 35.0)
        * 4.88e-7
        * (1.0 + 0.0134 * temperature)
        * (1.0 - 0.00103 * k + 3.7e-7 * k * k);
    let c = 4.86e-13
        * (1.0 + temperature * (-0.042 + temperature * (8.53e-4 - temperature * 6.23e-6)))
        * (1.0 + k * (-3.84e-4 + k * 7.57e-8));

    let freq = frequency * 1000.0;
    let freq2 = freq * freq;
    (a * f1 * freq2) / (f1 * f1 + freq2) + (b * f2 * freq2) / (f2 * f2 + freq2) + c * freq2
}

/// Sv correction for a non-square transmit pulse.
#[must_use]
pub fn sv_offset(frequency: u16, pulse_length: u16) -> f64 {
    if frequency > 38 {
        match pulse_length {
            300 => 1.1,
            500 => 0.8,
            700 => 0.5,
            900 | 1000 => 0.3,
            _ => 0.0,
        }
    } else {
        match pulse_length {
            500 => 0.8,
            1000 => 0.5,
            _ => 0.0,
        }
    }
}

/// Range to the center of each (possibly averaged) bin of `chan`.
///
/// Uses the first channel's digitization rate, lockout, range samples and pulse length for
/// every channel.
#[must_use]
pub fn depth_range(
    header: &ProfileHeader,
    chan: usize,
    sound_speed: f64,
    bins_to_average: usize,
) -> Vec<f64> {
    let bins_to_average = bins_to_average.max(1);
    let num_bins = usize::from(header.num_bins[chan]) / bins_to_average;
    let dig_rate = f64::from(header.digitization_rate[0]);
    let lockout = f64::from(header.lockout_index[0]);
    let range_samples = f64::from(header.range_samples[0]);
    let pulse_length = f64::from(header.pulse_length[0]);
    #[allow(clippy::cast_precision_loss)]
    let avg = bins_to_average as f64;

    let start = sound_speed * lockout / (2.0 * dig_rate);
    (1..=num_bins)
        .map(|m| {
            #[allow(clippy::cast_precision_loss)]
            let m = m as f64;
            start
                + (sound_speed / 4.0)
                    * (((2.0 * m - 1.0) * range_samples * avg - 1.0) / dig_rate
                        + pulse_length / 1e6)
        })
        .collect()
}

/// Default backscatter model.
#[derive(Debug, Clone, Default)]
pub struct AslModel {
    pub calibration: CalibrationCoefficients,
    pub environment: EnvironmentParameters,
}

impl AslModel {
    #[must_use]
    pub fn new(calibration: CalibrationCoefficients, environment: EnvironmentParameters) -> Self {
        AslModel {
            calibration,
            environment,
        }
    }

    fn num_channels(header: &ProfileHeader) -> usize {
        usize::from(header.num_channels).min(MAX_CHANNELS)
    }

    /// Water temperature, or 0 if the instrument has no sensor.
    #[must_use]
    pub fn temperature(&self, header: &ProfileHeader) -> f64 {
        if header.is_sensor_available == 0 {
            return 0.0;
        }
        temperature_from_counts(header.temperature, &self.calibration.thermistor)
    }

    // Echo level averaged over groups of `bins_to_average` bins in the power domain.
    fn bin_average(&self, chan: usize, counts: &[f64]) -> Vec<f64> {
        let n = self.environment.bins_to_average;
        let el = self.calibration.el[chan];
        let ds = self.calibration.ds[chan];
        let power: Vec<f64> = counts
            .iter()
            .map(|x| {
                let level = el - 2.5 / ds + x / (COUNTS_PER_DB * ds);
                10f64.powf(level / 10.0)
            })
            .collect();
        power
            .chunks_exact(n)
            .map(|chunk| {
                #[allow(clippy::cast_precision_loss)]
                let mean = chunk.iter().sum::<f64>() / n as f64;
                10.0 * mean.log10()
            })
            .collect()
    }
}

impl EchogramModel for AslModel {
    fn compute_echogram_metadata(&self, header: &ProfileHeader) -> EchogramMetadata {
        let temperature = self.temperature(header);
        let env = &self.environment;
        let c = sound_speed(temperature, env.pressure, env.salinity);

        let num_channels = Self::num_channels(header);
        let depth_range = (0..num_channels)
            .map(|chan| depth_range(header, chan, c, env.bins_to_average))
            .collect();
        let sea_absorption = (0..num_channels)
            .map(|chan| {
                sea_absorption(
                    temperature,
                    env.pressure,
                    env.salinity,
                    f64::from(header.frequency[chan]),
                )
            })
            .collect();

        EchogramMetadata {
            sound_speed: c,
            depth_range,
            sea_absorption,
        }
    }

    fn compute_backscatter(
        &self,
        header: &ProfileHeader,
        counts: &[Vec<f64>],
        metadata: &EchogramMetadata,
    ) -> Vec<Vec<f64>> {
        let cc = &self.calibration;
        let num_channels = Self::num_channels(header).min(counts.len());

        (0..num_channels)
            .map(|chan| {
                let n = if self.environment.bins_to_average > 1 {
                    self.bin_average(chan, &counts[chan])
                } else {
                    counts[chan].clone()
                };
                let pulse_length = f64::from(header.pulse_length[chan]);
                let constant = cc.el[chan] - 2.5 / cc.ds[chan]
                    - cc.tvr[chan]
                    - 20.0 * cc.vtx[chan].log10()
                    - 10.0
                        * (0.5 * metadata.sound_speed * pulse_length / 1e6 * cc.bp[chan]).log10()
                    + sv_offset(header.frequency[chan], header.pulse_length[chan]);
                let alpha = metadata.sea_absorption[chan];

                n.iter()
                    .zip(&metadata.depth_range[chan])
                    .map(|(x, r)| {
                        constant
                            + x / (COUNTS_PER_DB * cc.ds[chan])
                            + 20.0 * r.log10()
                            + 2.0 * alpha * r
                    })
                    .collect()
            })
            .collect()
    }
}

/// Backscatter for every record of a file, organized for echogram display.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct EchogramData {
    /// Record times in seconds since 1900.
    pub times: Vec<f64>,
    /// Frequency (kHz) of each channel, taken from the first record.
    pub frequencies: Vec<f64>,
    /// Per channel, one row of values per record.
    pub values: Vec<Vec<Vec<f64>>>,
    /// Bin ranges of the first channel of the most recent record.
    pub depth_range: Vec<f64>,
}

impl EchogramData {
    /// Add a record. The number of channels is fixed by the first record; later records
    /// only contribute to the channels that exist in both.
    pub fn push(&mut self, record: &ProfileRecord) {
        if self.values.is_empty() {
            self.values = vec![Vec::new(); record.values.len()];
            self.frequencies = (0..record.values.len())
                .map(|chan| f64::from(record.header.frequency[chan]))
                .collect();
        }
        for (rows, values) in self.values.iter_mut().zip(&record.values) {
            rows.push(values.clone());
        }
        if let Some(depth) = record.depth_range.first() {
            self.depth_range.clone_from(depth);
        }
        self.times.push(record.timestamp);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Values for `chan` as a (record, bin) matrix. `None` if the channel does not exist
    /// or the number of bins changed between records.
    #[must_use]
    pub fn channel_matrix(&self, chan: usize) -> Option<Array2<f64>> {
        let rows = self.values.get(chan)?;
        let num_bins = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != num_bins) {
            return None;
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Array2::from_shape_vec((rows.len(), num_bins), flat).ok()
    }

    /// Deepest and shallowest bin range, in that order.
    #[must_use]
    pub fn depth_bounds(&self) -> Option<(f64, f64)> {
        Some((*self.depth_range.last()?, *self.depth_range.first()?))
    }
}
