use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::header::{ProfileHeader, MAX_CHANNELS};

/// Stream name of particles produced from profile records.
pub const STREAM_NAME: &str = "zplsc_echogram_data";

/// Particle value identifiers.
pub mod keys {
    pub const TRANS_TIMESTAMP: &str = "zplsc_c_transmission_timestamp";
    pub const SERIAL_NUMBER: &str = "serial_number";
    pub const PHASE: &str = "zplsc_c_phase";
    pub const BURST_NUMBER: &str = "burst_number";
    pub const TILT_X: &str = "zplsc_c_tilt_x_counts";
    pub const TILT_Y: &str = "zplsc_c_tilt_y_counts";
    pub const BATTERY_VOLTAGE: &str = "zplsc_c_battery_voltage_counts";
    pub const PRESSURE: &str = "zplsc_c_pressure_counts";
    pub const TEMPERATURE: &str = "zplsc_c_temperature_counts";
    pub const IS_AVERAGED_DATA: &str = "zplsc_c_is_averaged_data";
    pub const FREQ_CHAN: [&str; 4] = [
        "zplsc_frequency_channel_1",
        "zplsc_frequency_channel_2",
        "zplsc_frequency_channel_3",
        "zplsc_frequency_channel_4",
    ];
    pub const VALS_CHAN: [&str; 4] = [
        "zplsc_values_channel_1",
        "zplsc_values_channel_2",
        "zplsc_values_channel_3",
        "zplsc_values_channel_4",
    ];
    pub const DEPTH_CHAN: [&str; 4] = [
        "zplsc_depth_range_channel_1",
        "zplsc_depth_range_channel_2",
        "zplsc_depth_range_channel_3",
        "zplsc_depth_range_channel_4",
    ];
}

/// A fully decoded profile record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub header: ProfileHeader,
    /// Transmission time in seconds since 1900.
    pub timestamp: f64,
    /// Calibrated values, one array per channel in use.
    pub values: Vec<Vec<f64>>,
    /// Bin ranges, one array per channel in use.
    pub depth_range: Vec<Vec<f64>>,
}

impl ProfileRecord {
    /// Assemble the particle for this record. Channels that are not in use are reported
    /// with their header frequency and empty value and depth arrays.
    #[must_use]
    pub fn to_particle(&self) -> Particle {
        let hdr = &self.header;
        let mut values = vec![
            ParticleValue::new(keys::TRANS_TIMESTAMP, json!(self.timestamp)),
            ParticleValue::new(keys::SERIAL_NUMBER, json!(hdr.serial_num.to_string())),
            ParticleValue::new(keys::PHASE, json!(hdr.phase)),
            ParticleValue::new(keys::BURST_NUMBER, json!(hdr.burst_num)),
            ParticleValue::new(keys::TILT_X, json!(hdr.tilt_x)),
            ParticleValue::new(keys::TILT_Y, json!(hdr.tilt_y)),
            ParticleValue::new(keys::BATTERY_VOLTAGE, json!(hdr.battery_voltage)),
            ParticleValue::new(keys::PRESSURE, json!(hdr.pressure)),
            ParticleValue::new(keys::TEMPERATURE, json!(hdr.temperature)),
            ParticleValue::new(keys::IS_AVERAGED_DATA, json!(hdr.is_averaged_data)),
        ];
        let empty = Vec::new();
        for chan in 0..MAX_CHANNELS {
            values.push(ParticleValue::new(
                keys::FREQ_CHAN[chan],
                json!(f64::from(hdr.frequency[chan])),
            ));
            values.push(ParticleValue::new(
                keys::VALS_CHAN[chan],
                json!(self.values.get(chan).unwrap_or(&empty)),
            ));
            values.push(ParticleValue::new(
                keys::DEPTH_CHAN[chan],
                json!(self.depth_range.get(chan).unwrap_or(&empty)),
            ));
        }

        Particle {
            stream_name: STREAM_NAME.to_string(),
            port_timestamp: self.timestamp,
            internal_timestamp: self.timestamp,
            values,
        }
    }
}

/// One named particle value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParticleValue {
    pub value_id: String,
    pub value: Value,
}

impl ParticleValue {
    pub fn new(value_id: &str, value: Value) -> Self {
        ParticleValue {
            value_id: value_id.to_string(),
            value,
        }
    }
}

/// Output unit handed to a [ParticleSink](crate::ParticleSink).
///
/// Values are kept in a fixed order; see [keys].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Particle {
    pub stream_name: String,
    /// Seconds since 1900
    pub port_timestamp: f64,
    /// Seconds since 1900
    pub internal_timestamp: f64,
    pub values: Vec<ParticleValue>,
}

impl Particle {
    /// Lookup a value by its id.
    #[must_use]
    pub fn get(&self, value_id: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|v| v.value_id == value_id)
            .map(|v| &v.value)
    }

    /// Value ids, in order.
    pub fn value_ids(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.value_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProfileRecord {
        ProfileRecord {
            header: ProfileHeader {
                serial_num: 55075,
                burst_num: 9,
                phase: 1,
                tilt_x: 10,
                tilt_y: 11,
                battery_voltage: 12,
                pressure: 13,
                temperature: 14,
                num_channels: 2,
                is_averaged_data: [1, 0, 0, 0],
                frequency: [38, 125, 200, 455],
                ..Default::default()
            },
            timestamp: 3_617_268_900.5,
            values: vec![vec![1.5, 2.5], vec![3.5]],
            depth_range: vec![vec![0.5, 1.0], vec![0.25]],
        }
    }

    #[test]
    fn particle_value_order() {
        let particle = record().to_particle();
        let ids: Vec<&str> = particle.value_ids().collect();
        assert_eq!(ids.len(), 22);
        assert_eq!(
            &ids[..10],
            &[
                keys::TRANS_TIMESTAMP,
                keys::SERIAL_NUMBER,
                keys::PHASE,
                keys::BURST_NUMBER,
                keys::TILT_X,
                keys::TILT_Y,
                keys::BATTERY_VOLTAGE,
                keys::PRESSURE,
                keys::TEMPERATURE,
                keys::IS_AVERAGED_DATA,
            ]
        );
        assert_eq!(ids[10], "zplsc_frequency_channel_1");
        assert_eq!(ids[11], "zplsc_values_channel_1");
        assert_eq!(ids[12], "zplsc_depth_range_channel_1");
        assert_eq!(ids[21], "zplsc_depth_range_channel_4");
    }

    #[test]
    fn particle_values() {
        let particle = record().to_particle();
        assert_eq!(particle.stream_name, STREAM_NAME);
        assert_eq!(particle.port_timestamp, 3_617_268_900.5);
        assert_eq!(particle.get(keys::SERIAL_NUMBER), Some(&json!("55075")));
        assert_eq!(particle.get(keys::BURST_NUMBER), Some(&json!(9)));
        assert_eq!(particle.get(keys::IS_AVERAGED_DATA), Some(&json!([1, 0, 0, 0])));
        assert_eq!(particle.get(keys::FREQ_CHAN[0]), Some(&json!(38.0)));
        assert_eq!(particle.get(keys::VALS_CHAN[0]), Some(&json!([1.5, 2.5])));
        assert_eq!(particle.get(keys::DEPTH_CHAN[1]), Some(&json!([0.25])));
        // unused channels
        assert_eq!(particle.get(keys::FREQ_CHAN[3]), Some(&json!(455.0)));
        assert_eq!(particle.get(keys::VALS_CHAN[2]), Some(&json!([])));
        assert_eq!(particle.get(keys::DEPTH_CHAN[3]), Some(&json!([])));
        assert!(particle.get("nope").is_none());
    }
}
