//! Record parsing.
//!
//! A [Parser] walks a byte stream through the following states for every record:
//!
//! 1. *SeekDelimiter*: scan for the next delimiter. Any bytes skipped are reported as a
//!    single [Error::InvalidDelimiter] failure.
//! 2. *DecodeHeader*: read the fixed size [ProfileHeader]. A stream that ends here is
//!    simply done.
//! 3. *DecodeChannels*: read the channel data described by the header.
//! 4. *Transform*: compute the timestamp and calibrated values.
//! 5. *Emit*: produce the [ProfileRecord].
//!
//! Failures in states 3 and 4 drop only the current record and the parser goes back to
//! seeking. The body of a record with an invalid channel count is skipped by that scan
//! without a second failure. I/O errors stop parsing.
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, span, trace, warn, Level};
use typed_builder::TypedBuilder;

use crate::calibration::{CalibrationCoefficients, EnvironmentParameters};
use crate::channel::{read_channels, ChannelData};
use crate::echogram::{AslModel, EchogramModel};
use crate::header::ProfileHeader;
use crate::particle::{Particle, ProfileRecord};
use crate::synchronizer::{Synchronizer, DELIMITER};
use crate::transform::{channel_counts, transmission_timestamp};
use crate::{Error, Result};

/// Receives the output of a parse.
pub trait ParticleSink {
    /// Accept a particle for a successfully decoded record.
    fn accept(&mut self, particle: Particle);

    /// Receive a failure. Parsing continues after this call if the error is
    /// [recoverable](Error::is_recoverable).
    fn report_failure(&mut self, error: Error);
}

/// A [ParticleSink] that keeps everything it receives.
#[derive(Debug, Default)]
pub struct ParticleBuffer {
    pub particles: Vec<Particle>,
    pub failures: Vec<Error>,
}

impl ParticleSink for ParticleBuffer {
    fn accept(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    fn report_failure(&mut self, error: Error) {
        self.failures.push(error);
    }
}

/// Output of a [Parser].
#[derive(Debug)]
pub enum Event {
    Record(ProfileRecord),
    /// A recoverable failure; the affected bytes or record were dropped.
    Failure(Error),
}

/// Parse counters.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct Summary {
    /// Records emitted
    pub records: usize,
    /// Records found but dropped due to a failure
    pub dropped: usize,
    /// Contiguous spans of bytes that did not belong to a record
    pub misaligned_spans: usize,
    /// Total bytes in misaligned spans
    pub bytes_skipped: usize,
    /// Timestamp of the first record emitted
    pub first_timestamp: Option<f64>,
    /// Timestamp of the last record emitted
    pub last_timestamp: Option<f64>,
}

/// Profile record decoder configuration.
///
/// Decoding consumes the decoder and produces a [Parser] for a single stream.
///
/// ```
/// use zplsc::{ParticleBuffer, RecordDecoder};
///
/// let mut sink = ParticleBuffer::default();
/// let summary = RecordDecoder::builder()
///     .build()
///     .parse(std::io::empty(), &mut sink)
///     .unwrap();
/// assert_eq!(summary.records, 0);
/// ```
#[derive(TypedBuilder)]
pub struct RecordDecoder {
    /// Calibration used for averaged data and, unless a model is provided, backscatter.
    #[builder(default)]
    calibration: CalibrationCoefficients,
    /// Deployment parameters for the default model.
    #[builder(default)]
    environment: EnvironmentParameters,
    /// Backscatter model. The default is [AslModel] using this decoder's calibration and
    /// environment.
    #[builder(default, setter(strip_option))]
    model: Option<Box<dyn EchogramModel>>,
}

impl Default for RecordDecoder {
    fn default() -> Self {
        RecordDecoder::builder().build()
    }
}

impl RecordDecoder {
    /// Return a [Parser] producing [Event]s from `reader`.
    pub fn decode<R>(self, reader: R) -> Parser<R>
    where
        R: Read + Send,
    {
        let model = match self.model {
            Some(model) => model,
            None => Box::new(AslModel::new(
                self.calibration.clone(),
                self.environment.clone(),
            )),
        };
        Parser {
            sync: Synchronizer::new(reader),
            calibration: self.calibration,
            model,
            state: State::SeekDelimiter,
            pending: VecDeque::default(),
            summary: Summary::default(),
            unread_body: false,
        }
    }

    /// Parse all of `reader`, handing particles and recoverable failures to `sink`.
    ///
    /// # Errors
    /// [Error::Io] if reading fails. The error is also reported to `sink`, after anything
    /// already parsed.
    pub fn parse<R, S>(self, reader: R, sink: &mut S) -> Result<Summary>
    where
        R: Read + Send,
        S: ParticleSink + ?Sized,
    {
        self.decode(reader).parse(sink)
    }

    /// Parse the file at `path`.
    ///
    /// # Errors
    /// [Error::Io] if the file cannot be opened or read.
    pub fn parse_file<S>(self, path: &Path, sink: &mut S) -> Result<Summary>
    where
        S: ParticleSink + ?Sized,
    {
        let file = File::open(path)?;
        self.parse(BufReader::new(file), sink)
    }
}

enum State {
    SeekDelimiter,
    DecodeHeader,
    DecodeChannels(Box<ProfileHeader>),
    Transform(Box<ProfileHeader>, Vec<ChannelData>),
    Emit(Box<ProfileRecord>),
    Done,
}

/// Iterator of [Event]s for a single stream. See the module docs.
///
/// The iterator yields at most one `Err`, after which it is exhausted.
pub struct Parser<R>
where
    R: Read + Send,
{
    sync: Synchronizer<R>,
    calibration: CalibrationCoefficients,
    model: Box<dyn EchogramModel>,
    state: State,
    pending: VecDeque<Event>,
    summary: Summary,
    // Set when a dropped record's body was left in the stream
    unread_body: bool,
}

impl<R> Parser<R>
where
    R: Read + Send,
{
    /// Counters for the events produced so far.
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Drive this parser to completion, handing its output to `sink`.
    ///
    /// # Errors
    /// [Error::Io] if reading fails.
    pub fn parse<S>(mut self, sink: &mut S) -> Result<Summary>
    where
        S: ParticleSink + ?Sized,
    {
        let span = span!(Level::DEBUG, "parse");
        let _guard = span.enter();

        for event in self.by_ref() {
            match event {
                Ok(Event::Record(record)) => sink.accept(record.to_particle()),
                Ok(Event::Failure(err)) => sink.report_failure(err),
                Err(Error::Io(err)) => {
                    sink.report_failure(Error::Io(io::Error::new(err.kind(), err.to_string())));
                    return Err(Error::Io(err));
                }
                Err(err) => return Err(err),
            }
        }
        debug!(summary = ?self.summary, "parse complete");
        Ok(self.summary)
    }

    fn fail(&mut self, err: Error) {
        warn!(offset = self.sync.offset(), "{err}");
        if !matches!(err, Error::InvalidDelimiter { .. }) {
            self.summary.dropped += 1;
        }
        self.unread_body = matches!(err, Error::InvalidChannelCount(_));
        self.pending.push_back(Event::Failure(err));
    }

    fn transform(
        &self,
        header: ProfileHeader,
        channels: &[ChannelData],
    ) -> Result<ProfileRecord> {
        let timestamp = transmission_timestamp(&header)?;
        let counts = channel_counts(&header, channels, &self.calibration);
        let metadata = self.model.compute_echogram_metadata(&header);
        let values = self.model.compute_backscatter(&header, &counts, &metadata);
        Ok(ProfileRecord {
            header,
            timestamp,
            values,
            depth_range: metadata.depth_range,
        })
    }

    // Advance one state.
    fn step(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, State::Done);
        self.state = match state {
            State::SeekDelimiter => {
                let loc = self.sync.scan()?;
                // end of the span is the delimiter, or end-of-stream
                let (end, skipped) = match &loc {
                    Some(loc) => (loc.offset - DELIMITER.len(), loc.skipped),
                    None => (self.sync.offset(), self.sync.skipped()),
                };
                if std::mem::take(&mut self.unread_body) {
                    trace!(skipped, "skipped body of dropped record");
                } else if skipped > 0 {
                    self.summary.misaligned_spans += 1;
                    self.summary.bytes_skipped += skipped;
                    self.fail(Error::InvalidDelimiter {
                        offset: end - skipped,
                        skipped,
                    });
                }
                match loc {
                    Some(_) => State::DecodeHeader,
                    None => State::Done,
                }
            }
            State::DecodeHeader => {
                let mut buf = [0u8; ProfileHeader::LEN];
                if self.sync.fill(&mut buf)? {
                    match ProfileHeader::decode(&buf) {
                        Some(header) => State::DecodeChannels(Box::new(header)),
                        None => State::Done,
                    }
                } else {
                    trace!("stream ended within a header");
                    State::Done
                }
            }
            State::DecodeChannels(header) => match read_channels(&mut self.sync, &header) {
                Ok(channels) => State::Transform(header, channels),
                Err(err) if err.is_recoverable() => {
                    self.fail(err);
                    State::SeekDelimiter
                }
                Err(err) => return Err(err),
            },
            State::Transform(header, channels) => match self.transform(*header, &channels) {
                Ok(record) => State::Emit(Box::new(record)),
                Err(err) if err.is_recoverable() => {
                    self.fail(err);
                    State::SeekDelimiter
                }
                Err(err) => return Err(err),
            },
            State::Emit(record) => {
                self.summary.records += 1;
                self.summary.first_timestamp.get_or_insert(record.timestamp);
                self.summary.last_timestamp = Some(record.timestamp);
                self.pending.push_back(Event::Record(*record));
                State::SeekDelimiter
            }
            State::Done => State::Done,
        };
        Ok(())
    }
}

impl<R> Iterator for Parser<R>
where
    R: Read + Send,
{
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if matches!(self.state, State::Done) {
                return None;
            }
            if let Err(err) = self.step() {
                warn!(offset = self.sync.offset(), "parsing stopped: {err}");
                self.state = State::Done;
                return Some(Err(err));
            }
        }
    }
}
