use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of channels an instrument can carry.
pub const MAX_CHANNELS: usize = 4;

/// AZFP profile header.
///
/// The header immediately follows the record delimiter and is the only description of
/// the record body: there is no length field, the body length is derived from `num_bins`
/// and `is_averaged_data` for each of the first `num_channels` channels.
///
/// Per-channel arrays always have [MAX_CHANNELS] entries; entries past `num_channels` are
/// decoded but meaningless.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileHeader {
    pub burst_num: u16,
    pub serial_num: u16,
    pub ping_status: u16,
    /// Burst interval in seconds
    pub burst_interval: u32,
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub hundredths: u16,
    /// Digitization rate (64000, 40000 or 20000)
    pub digitization_rate: [u16; MAX_CHANNELS],
    /// Number of samples skipped at the start of a ping
    pub lockout_index: [u16; MAX_CHANNELS],
    pub num_bins: [u16; MAX_CHANNELS],
    /// Range samples per bin
    pub range_samples: [u16; MAX_CHANNELS],
    pub num_pings_profile: u16,
    /// Non-zero if pings are averaged in time
    pub is_averaged_pings: u16,
    /// Number of pings acquired in this burst
    pub num_pings_burst: u16,
    /// Ping period in seconds
    pub ping_period: u16,
    /// First ping number, or first averaged ping number
    pub first_ping: u16,
    /// Last ping number, or last averaged ping number
    pub second_ping: u16,
    /// 1 = averaged data (5 bytes per bin), 0 = not averaged (2 bytes per bin)
    pub is_averaged_data: [u8; MAX_CHANNELS],
    pub error_num: u16,
    pub phase: u8,
    pub is_overrun: u8,
    pub num_channels: u8,
    /// Obsolete
    pub gain: [u8; MAX_CHANNELS],
    pub spare: u8,
    /// Pulse length in microseconds
    pub pulse_length: [u16; MAX_CHANNELS],
    pub board_num: [u16; MAX_CHANNELS],
    /// Board frequency in kHz
    pub frequency: [u16; MAX_CHANNELS],
    /// Non-zero when the pressure/temperature sensor is available
    pub is_sensor_available: u16,
    pub tilt_x: u16,
    pub tilt_y: u16,
    pub battery_voltage: u16,
    pub pressure: u16,
    pub temperature: u16,
    pub ad_channel_6: u16,
    pub ad_channel_7: u16,
}

fn be_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([buf[off], buf[off + 1]])
}

fn be_u16x4(buf: &[u8], off: usize) -> [u16; MAX_CHANNELS] {
    [
        be_u16(buf, off),
        be_u16(buf, off + 2),
        be_u16(buf, off + 4),
        be_u16(buf, off + 6),
    ]
}

fn u8x4(buf: &[u8], off: usize) -> [u8; MAX_CHANNELS] {
    [buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]
}

fn put_u16(buf: &mut [u8], off: usize, val: u16) {
    buf[off..off + 2].copy_from_slice(&val.to_be_bytes());
}

fn put_u16x4(buf: &mut [u8], off: usize, vals: &[u16; MAX_CHANNELS]) {
    for (i, val) in vals.iter().enumerate() {
        put_u16(buf, off + 2 * i, *val);
    }
}

impl ProfileHeader {
    /// Size of a ``ProfileHeader``, not including the record delimiter.
    pub const LEN: usize = 122;

    /// Decode from bytes positioned immediately after the record delimiter. Returns
    /// `None` if there are not enough bytes to construct the header.
    ///
    /// Offsets in the comments are from the start of the delimiter, as they appear in the
    /// instrument documentation.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }

        Some(ProfileHeader {
            burst_num: be_u16(buf, 0),                                                // 002
            serial_num: be_u16(buf, 2),                                               // 004
            ping_status: be_u16(buf, 4),                                              // 006
            burst_interval: u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]),     // 008
            year: be_u16(buf, 10),                                                    // 012
            month: be_u16(buf, 12),                                                   // 014
            day: be_u16(buf, 14),                                                     // 016
            hour: be_u16(buf, 16),                                                    // 018
            minute: be_u16(buf, 18),                                                  // 020
            second: be_u16(buf, 20),                                                  // 022
            hundredths: be_u16(buf, 22),                                              // 024
            digitization_rate: be_u16x4(buf, 24),                                     // 026
            lockout_index: be_u16x4(buf, 32),                                         // 034
            num_bins: be_u16x4(buf, 40),                                              // 042
            range_samples: be_u16x4(buf, 48),                                         // 050
            num_pings_profile: be_u16(buf, 56),                                       // 058
            is_averaged_pings: be_u16(buf, 58),                                       // 060
            num_pings_burst: be_u16(buf, 60),                                         // 062
            ping_period: be_u16(buf, 62),                                             // 064
            first_ping: be_u16(buf, 64),                                              // 066
            second_ping: be_u16(buf, 66),                                             // 068
            is_averaged_data: u8x4(buf, 68),                                          // 070
            error_num: be_u16(buf, 72),                                               // 074
            phase: buf[74],                                                           // 076
            is_overrun: buf[75],                                                      // 077
            num_channels: buf[76],                                                    // 078
            gain: u8x4(buf, 77),                                                      // 079
            spare: buf[81],                                                           // 083
            pulse_length: be_u16x4(buf, 82),                                          // 084
            board_num: be_u16x4(buf, 90),                                             // 092
            frequency: be_u16x4(buf, 98),                                             // 100
            is_sensor_available: be_u16(buf, 106),                                    // 108
            tilt_x: be_u16(buf, 108),                                                 // 110
            tilt_y: be_u16(buf, 110),                                                 // 112
            battery_voltage: be_u16(buf, 112),                                        // 114
            pressure: be_u16(buf, 114),                                               // 116
            temperature: be_u16(buf, 116),                                            // 118
            ad_channel_6: be_u16(buf, 118),                                           // 120
            ad_channel_7: be_u16(buf, 120),                                           // 122
        })
    }

    /// Encode to the on-disk layout, not including the record delimiter.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        put_u16(&mut buf, 0, self.burst_num);
        put_u16(&mut buf, 2, self.serial_num);
        put_u16(&mut buf, 4, self.ping_status);
        buf[6..10].copy_from_slice(&self.burst_interval.to_be_bytes());
        put_u16(&mut buf, 10, self.year);
        put_u16(&mut buf, 12, self.month);
        put_u16(&mut buf, 14, self.day);
        put_u16(&mut buf, 16, self.hour);
        put_u16(&mut buf, 18, self.minute);
        put_u16(&mut buf, 20, self.second);
        put_u16(&mut buf, 22, self.hundredths);
        put_u16x4(&mut buf, 24, &self.digitization_rate);
        put_u16x4(&mut buf, 32, &self.lockout_index);
        put_u16x4(&mut buf, 40, &self.num_bins);
        put_u16x4(&mut buf, 48, &self.range_samples);
        put_u16(&mut buf, 56, self.num_pings_profile);
        put_u16(&mut buf, 58, self.is_averaged_pings);
        put_u16(&mut buf, 60, self.num_pings_burst);
        put_u16(&mut buf, 62, self.ping_period);
        put_u16(&mut buf, 64, self.first_ping);
        put_u16(&mut buf, 66, self.second_ping);
        buf[68..72].copy_from_slice(&self.is_averaged_data);
        put_u16(&mut buf, 72, self.error_num);
        buf[74] = self.phase;
        buf[75] = self.is_overrun;
        buf[76] = self.num_channels;
        buf[77..81].copy_from_slice(&self.gain);
        buf[81] = self.spare;
        put_u16x4(&mut buf, 82, &self.pulse_length);
        put_u16x4(&mut buf, 90, &self.board_num);
        put_u16x4(&mut buf, 98, &self.frequency);
        put_u16(&mut buf, 106, self.is_sensor_available);
        put_u16(&mut buf, 108, self.tilt_x);
        put_u16(&mut buf, 110, self.tilt_y);
        put_u16(&mut buf, 112, self.battery_voltage);
        put_u16(&mut buf, 114, self.pressure);
        put_u16(&mut buf, 116, self.temperature);
        put_u16(&mut buf, 118, self.ad_channel_6);
        put_u16(&mut buf, 120, self.ad_channel_7);
        buf
    }

    /// Number of channels in use.
    ///
    /// # Errors
    /// [Error::InvalidChannelCount] if `num_channels` is not 1 to [MAX_CHANNELS].
    pub fn channel_count(&self) -> Result<usize> {
        let n = usize::from(self.num_channels);
        if !(1..=MAX_CHANNELS).contains(&n) {
            return Err(Error::InvalidChannelCount(self.num_channels));
        }
        Ok(n)
    }

    #[must_use]
    pub fn is_averaged(&self, chan: usize) -> bool {
        self.is_averaged_data[chan] != 0
    }

    /// Number of body bytes for `chan`.
    #[must_use]
    pub fn channel_len(&self, chan: usize) -> usize {
        let bins = usize::from(self.num_bins[chan]);
        if self.is_averaged(chan) {
            bins * 5
        } else {
            bins * 2
        }
    }
}
