#![allow(dead_code)]
use zplsc::synchronizer::DELIMITER;
use zplsc::{AslModel, EchogramMetadata, EchogramModel, ProfileHeader};

/// Header for a record with raw channels of the given number of bins, timestamped
/// 2014-08-17T12:55:00.
pub fn raw_header(num_bins: &[u16]) -> ProfileHeader {
    let mut header = ProfileHeader {
        burst_num: 1,
        serial_num: 55075,
        year: 2014,
        month: 8,
        day: 17,
        hour: 12,
        minute: 55,
        num_channels: u8::try_from(num_bins.len()).unwrap(),
        range_samples: [1; 4],
        digitization_rate: [40000; 4],
        lockout_index: [0; 4],
        pulse_length: [300; 4],
        frequency: [38, 125, 200, 455],
        num_pings_profile: 1,
        ..Default::default()
    };
    header.num_bins[..num_bins.len()].copy_from_slice(num_bins);
    header
}

/// Body for raw channels. Counts avoid the delimiter bytes so a dropped record's body
/// is never mistaken for a record.
pub fn raw_body(header: &ProfileHeader) -> Vec<u8> {
    let mut body = Vec::new();
    for chan in 0..usize::from(header.num_channels) {
        for bin in 0..header.num_bins[chan] {
            let count = 0x1000 + bin * 0x10 + u16::try_from(chan).unwrap();
            body.extend_from_slice(&count.to_be_bytes());
        }
    }
    body
}

/// Body for a single averaged channel.
pub fn averaged_body(sums: &[u32], overflow: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    for sum in sums {
        body.extend_from_slice(&sum.to_be_bytes());
    }
    body.extend_from_slice(overflow);
    body
}

pub fn encode_record(header: &ProfileHeader, body: &[u8]) -> Vec<u8> {
    let mut buf = DELIMITER.to_vec();
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(body);
    buf
}

/// A record with raw channels and burst number `burst_num`.
pub fn raw_record(burst_num: u16, num_bins: &[u16]) -> Vec<u8> {
    let mut header = raw_header(num_bins);
    header.burst_num = burst_num;
    encode_record(&header, &raw_body(&header))
}

/// Stream of `count` raw records with burst numbers starting at 1.
pub fn raw_stream(count: u16) -> Vec<u8> {
    (1..=count).flat_map(|n| raw_record(n, &[4, 2])).collect()
}

/// Model reporting channel counts as is.
pub struct Counts;

impl EchogramModel for Counts {
    fn compute_echogram_metadata(&self, header: &ProfileHeader) -> EchogramMetadata {
        AslModel::default().compute_echogram_metadata(header)
    }

    fn compute_backscatter(
        &self,
        _header: &ProfileHeader,
        counts: &[Vec<f64>],
        _metadata: &EchogramMetadata,
    ) -> Vec<Vec<f64>> {
        counts.to_vec()
    }
}
