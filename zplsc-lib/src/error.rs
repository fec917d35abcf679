#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Bytes between records that did not start with the record delimiter.
    #[error("Invalid record delimiter found; skipped {skipped} bytes at offset {offset}")]
    InvalidDelimiter { offset: usize, skipped: usize },

    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(u8),

    /// The channel data declared by the header is incomplete, because the stream ended or
    /// the next record started.
    #[error("Unpacking channel {channel} data: wanted {wanted} bytes, got {actual}")]
    Truncated {
        channel: usize,
        wanted: usize,
        actual: usize,
    },

    #[error("Transmission timestamp has invalid format: {0}")]
    InvalidTimestamp(String),
}

impl Error {
    /// True for anomalies confined to a single record or inter-record gap. Only stream
    /// I/O failures end a parse.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Io(_))
    }

    /// Variant name, for grouping failures.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "Io",
            Error::InvalidDelimiter { .. } => "InvalidDelimiter",
            Error::InvalidChannelCount(_) => "InvalidChannelCount",
            Error::Truncated { .. } => "Truncated",
            Error::InvalidTimestamp(_) => "InvalidTimestamp",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
