use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::header::ProfileHeader;
use crate::synchronizer::{Synchronizer, DELIMITER};
use crate::{Error, Result};

/// Decoded science data for a single channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ChannelData {
    /// Digitized 16-bit counts, one per bin.
    Raw(Vec<u16>),
    /// Summed linear data, one 32-bit sum and one 8-bit overflow count per bin.
    Averaged { sums: Vec<u32>, overflow: Vec<u8> },
}

impl ChannelData {
    /// Decode one channel of `num_bins` bins. Returns `None` if there are not enough
    /// bytes.
    #[must_use]
    pub fn decode(buf: &[u8], num_bins: usize, averaged: bool) -> Option<Self> {
        if averaged {
            let (sums, overflow) = buf.split_at_checked(num_bins * 4)?;
            if overflow.len() < num_bins {
                return None;
            }
            let sums = sums
                .chunks_exact(4)
                .map(|x| u32::from_be_bytes([x[0], x[1], x[2], x[3]]))
                .collect();
            Some(ChannelData::Averaged {
                sums,
                overflow: overflow[..num_bins].to_vec(),
            })
        } else {
            let counts = buf.get(..num_bins * 2)?;
            Some(ChannelData::Raw(
                counts
                    .chunks_exact(2)
                    .map(|x| u16::from_be_bytes([x[0], x[1]]))
                    .collect(),
            ))
        }
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ChannelData::Raw(counts) => counts.len(),
            ChannelData::Averaged { sums, .. } => sums.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_averaged(&self) -> bool {
        matches!(self, ChannelData::Averaged { .. })
    }
}

// Truncation error for a body with only `available` of its bytes.
fn truncated(header: &ProfileHeader, num_channels: usize, available: usize) -> Error {
    let mut start = 0;
    for chan in 0..num_channels {
        let wanted = header.channel_len(chan);
        if available < start + wanted {
            return Error::Truncated {
                channel: chan,
                wanted,
                actual: available - start,
            };
        }
        start += wanted;
    }
    // only reachable with a complete body; blame the last channel
    let channel = num_channels.saturating_sub(1);
    let wanted = header.channel_len(channel);
    Error::Truncated {
        channel,
        wanted,
        actual: wanted,
    }
}

/// Read the body of a record for each channel in use, as described by `header`.
///
/// A full body that is not followed by a delimiter or end-of-stream, and that itself
/// contains a delimiter, belongs to a record cut short by the next one. The bytes from
/// that delimiter onward are pushed back so the next scan finds them.
///
/// # Errors
/// [Error::InvalidChannelCount] if the header channel count is out of range, in which case
/// nothing is read. [Error::Truncated] if the stream ends before a channel's data, or the
/// next record starts inside the body. [Error::Io] on read errors.
pub fn read_channels<R>(
    sync: &mut Synchronizer<R>,
    header: &ProfileHeader,
) -> Result<Vec<ChannelData>>
where
    R: Read + Send,
{
    let num_channels = header.channel_count()?;
    let body_len: usize = (0..num_channels).map(|c| header.channel_len(c)).sum();
    let body = sync.read(body_len)?;

    if body.len() == body_len {
        let next = sync.peek(DELIMITER.len())?;
        if !next.is_empty() && next[..] != DELIMITER[..] {
            // a delimiter may straddle the end of the body
            let mut tail = body.clone();
            tail.extend(next.first());
            if let Some(pos) = tail.windows(DELIMITER.len()).position(|w| w == DELIMITER) {
                trace!(pos, body_len, "next record starts inside body");
                sync.push(&body[pos..]);
                return Err(truncated(header, num_channels, pos));
            }
        }
    }

    let mut channels = Vec::with_capacity(num_channels);
    let mut start = 0;
    for chan in 0..num_channels {
        let wanted = header.channel_len(chan);
        let num_bins = usize::from(header.num_bins[chan]);
        let buf = body.get(start..).unwrap_or_default();
        let Some(data) = ChannelData::decode(buf, num_bins, header.is_averaged(chan)) else {
            return Err(truncated(header, num_channels, body.len()));
        };
        trace!(
            chan,
            num_bins,
            averaged = data.is_averaged(),
            "decoded channel"
        );
        channels.push(data);
        start += wanted;
    }

    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_raw() {
        let buf = [0x00, 0x01, 0xff, 0xfe, 0x12, 0x34];
        let data = ChannelData::decode(&buf, 3, false).unwrap();
        assert_eq!(data, ChannelData::Raw(vec![1, 0xfffe, 0x1234]));
    }

    #[test]
    fn decode_averaged() {
        let buf = [
            0x00, 0x00, 0x00, 0x64, // 100
            0xff, 0xff, 0xff, 0xff, // u32::MAX
            0x00, 0x02, // overflow
        ];
        let data = ChannelData::decode(&buf, 2, true).unwrap();
        assert_eq!(
            data,
            ChannelData::Averaged {
                sums: vec![100, u32::MAX],
                overflow: vec![0, 2],
            }
        );
    }

    #[test]
    fn decode_zero_bins_is_empty() {
        let raw = ChannelData::decode(&[], 0, false).unwrap();
        assert!(raw.is_empty());
        let avg = ChannelData::decode(&[], 0, true).unwrap();
        assert!(avg.is_empty());
        assert!(avg.is_averaged());
    }

    #[test]
    fn decode_short_buffers() {
        assert!(ChannelData::decode(&[0x00], 1, false).is_none());
        // sums present, overflow missing
        assert!(ChannelData::decode(&[0, 0, 0, 1], 1, true).is_none());
        assert!(ChannelData::decode(&[0, 0, 0], 1, true).is_none());
    }

    #[test]
    fn read_channels_in_order() {
        let header = ProfileHeader {
            num_channels: 2,
            num_bins: [2, 1, 9, 9],
            is_averaged_data: [0, 1, 0, 0],
            ..Default::default()
        };
        let body: &[u8] = &[0x00, 0x0a, 0x00, 0x0b, 0x00, 0x00, 0x01, 0x00, 0x03, 0xfd];
        let mut sync = Synchronizer::new(body);

        let channels = read_channels(&mut sync, &header).unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0], ChannelData::Raw(vec![10, 11]));
        assert_eq!(
            channels[1],
            ChannelData::Averaged {
                sums: vec![256],
                overflow: vec![3]
            }
        );
        assert_eq!(sync.read(1).unwrap(), [0xfd], "reads only the declared body");
    }

    #[test]
    fn read_channels_truncated() {
        let header = ProfileHeader {
            num_channels: 2,
            num_bins: [1, 4, 0, 0],
            ..Default::default()
        };
        let body: &[u8] = &[0x00, 0x01, 0x00, 0x02, 0x00];
        let mut sync = Synchronizer::new(body);

        let err = read_channels(&mut sync, &header).unwrap_err();
        assert!(
            matches!(
                err,
                Error::Truncated {
                    channel: 1,
                    wanted: 8,
                    actual: 3
                }
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn read_channels_next_record_inside_body() {
        let header = ProfileHeader {
            num_channels: 2,
            num_bins: [2, 2, 0, 0],
            ..Default::default()
        };
        // 6 of 8 body bytes, then the next record
        let body: &[u8] = &[0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0xfd, 0x02, 0x11, 0x22];
        let mut sync = Synchronizer::new(body);

        let err = read_channels(&mut sync, &header).unwrap_err();
        assert!(
            matches!(
                err,
                Error::Truncated {
                    channel: 1,
                    wanted: 4,
                    actual: 2
                }
            ),
            "got {err:?}"
        );
        let loc = sync.scan().unwrap().unwrap();
        assert_eq!(loc.skipped, 0);
        assert_eq!(loc.offset, 8);
        assert_eq!(sync.read(2).unwrap(), [0x11, 0x22]);
    }

    #[test]
    fn read_channels_delimiter_straddles_body_end() {
        let header = ProfileHeader {
            num_channels: 1,
            num_bins: [2, 0, 0, 0],
            ..Default::default()
        };
        // one byte short, so the body ends with the first delimiter byte
        let body: &[u8] = &[0x00, 0x01, 0x00, 0xfd, 0x02, 0x11];
        let mut sync = Synchronizer::new(body);

        let err = read_channels(&mut sync, &header).unwrap_err();
        assert!(
            matches!(
                err,
                Error::Truncated {
                    channel: 0,
                    wanted: 4,
                    actual: 3
                }
            ),
            "got {err:?}"
        );
        let loc = sync.scan().unwrap().unwrap();
        assert_eq!(loc.skipped, 0);
        assert_eq!(sync.read(1).unwrap(), [0x11]);
    }

    #[test]
    fn read_channels_keeps_body_without_delimiter() {
        let header = ProfileHeader {
            num_channels: 1,
            num_bins: [2, 0, 0, 0],
            ..Default::default()
        };
        // trailing garbage, but no record starts inside the body
        let body: &[u8] = &[0x00, 0x01, 0x00, 0x02, 0x33, 0x44];
        let mut sync = Synchronizer::new(body);

        let channels = read_channels(&mut sync, &header).unwrap();
        assert_eq!(channels, vec![ChannelData::Raw(vec![1, 2])]);
        assert_eq!(sync.offset(), 4);
    }

    #[test]
    fn read_channels_invalid_count_reads_nothing() {
        let header = ProfileHeader {
            num_channels: 7,
            ..Default::default()
        };
        let body: &[u8] = &[0x01, 0x02];
        let mut sync = Synchronizer::new(body);

        assert!(matches!(
            read_channels(&mut sync, &header),
            Err(Error::InvalidChannelCount(7))
        ));
        assert_eq!(sync.offset(), 0);
    }
}
