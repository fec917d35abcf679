#![doc = include_str!("../README.md")]

mod error;

pub mod bytes;
pub mod calibration;
pub mod channel;
pub mod echogram;
pub mod header;
pub mod particle;
pub mod parser;
pub mod synchronizer;
pub mod transform;

pub use calibration::{CalibrationCoefficients, EnvironmentParameters, Thermistor};
pub use channel::ChannelData;
pub use echogram::{AslModel, EchogramData, EchogramMetadata, EchogramModel};
pub use error::{Error, Result};
pub use header::ProfileHeader;
pub use particle::{Particle, ParticleValue, ProfileRecord};
pub use parser::{Event, ParticleBuffer, ParticleSink, Parser, RecordDecoder, Summary};
